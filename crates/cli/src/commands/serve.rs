//! `supperclub serve`: Start the HTTP/SSE gateway.

use supperclub_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host_override {
        config.gateway.host = host;
    }
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        return Err(super::plan::missing_key_message().into());
    }

    println!("supperclub gateway");
    println!("   Listening: http://{}:{}/api", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.default_model);
    if config.gateway.allowed_origins.is_empty() {
        println!("   CORS:      any origin");
    } else {
        println!("   CORS:      {}", config.gateway.allowed_origins.join(", "));
    }

    supperclub_gateway::start(config).await?;

    Ok(())
}
