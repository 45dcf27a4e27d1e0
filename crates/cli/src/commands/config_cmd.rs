//! `supperclub config`: Configuration management commands.

use std::path::Path;

use supperclub_config::AppConfig;

/// Print a complete config file with every default filled in.
pub fn print_default() {
    println!("{}", AppConfig::default_toml());
}

/// Print the effective configuration with secrets masked.
pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_effective(config)?);
    Ok(())
}

pub fn path(override_path: Option<&Path>) {
    match override_path {
        Some(p) => println!("{}", p.display()),
        None => println!("{}", AppConfig::config_dir().join("config.toml").display()),
    }
}

fn render_effective(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut masked = config.clone();
    mask(&mut masked.api_key);
    mask(&mut masked.tools.google_maps_api_key);
    mask(&mut masked.tools.yelp_api_key);
    for provider in masked.providers.values_mut() {
        mask(&mut provider.api_key);
    }
    toml::to_string_pretty(&masked)
}

fn mask(secret: &mut Option<String>) {
    if secret.is_some() {
        *secret = Some("***".into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn effective_config_masks_secrets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_key = "sk-live-secret"
default_model = "gpt-4o-mini"

[tools]
yelp_api_key = "yelp-secret"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        let rendered = render_effective(&config).unwrap();

        assert!(rendered.contains(r#"default_model = "gpt-4o-mini""#));
        assert!(!rendered.contains("sk-live-secret"));
        assert!(!rendered.contains("yelp-secret"));
        assert!(rendered.contains(r#""***""#));
    }

    #[test]
    fn default_toml_round_trips() {
        let parsed: AppConfig = toml::from_str(&AppConfig::default_toml()).unwrap();
        assert_eq!(parsed.gateway.port, AppConfig::default().gateway.port);
    }
}
