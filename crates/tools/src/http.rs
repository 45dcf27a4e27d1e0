//! Shared HTTP plumbing for the tools that call Google Maps and Yelp.

use std::time::Duration;

use supperclub_config::ToolsConfig;
use supperclub_core::error::ToolError;
use tracing::debug;

pub const GOOGLE_MAPS_BASE: &str = "https://maps.googleapis.com/maps/api";
pub const YELP_BASE: &str = "https://api.yelp.com/v3";

/// One `reqwest::Client` plus credentials, shared by every upstream-backed tool.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    google_maps_key: Option<String>,
    yelp_key: Option<String>,
    google_base: String,
    yelp_base: String,
}

impl ApiClient {
    pub fn new(config: &ToolsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            google_maps_key: config.google_maps_api_key.clone().filter(|k| !k.is_empty()),
            yelp_key: config.yelp_api_key.clone().filter(|k| !k.is_empty()),
            google_base: GOOGLE_MAPS_BASE.into(),
            yelp_base: YELP_BASE.into(),
        }
    }

    /// Point both upstreams somewhere else (self-hosted proxies, test servers).
    pub fn with_base_urls(mut self, google: impl Into<String>, yelp: impl Into<String>) -> Self {
        self.google_base = google.into().trim_end_matches('/').to_string();
        self.yelp_base = yelp.into().trim_end_matches('/').to_string();
        self
    }

    pub fn google_key(&self) -> Option<&str> {
        self.google_maps_key.as_deref()
    }

    pub fn yelp_key(&self) -> Option<&str> {
        self.yelp_key.as_deref()
    }

    /// GET `{google_base}/{path}` with the API key appended to `params`.
    pub async fn google_get(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, ToolError> {
        let key = self
            .google_key()
            .ok_or_else(|| ToolError::Upstream("GOOGLE_MAPS_API_KEY not configured".into()))?;

        let url = format!("{}/{}", self.google_base, path);
        debug!(url = %url, "Google Maps request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("Invalid Google Maps response: {e}")))
    }

    /// GET `{yelp_base}/{path}` with bearer auth.
    pub async fn yelp_get(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, ToolError> {
        let key = self
            .yelp_key()
            .ok_or_else(|| ToolError::Upstream("YELP_API_KEY not configured".into()))?;

        let url = format!("{}/{}", self.yelp_base, path);
        debug!(url = %url, "Yelp request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(key)
            .query(params)
            .send()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("Invalid Yelp response: {e}")))
    }
}

/// `{"error": "<api> error: <status> - <message>"}` from a Google status payload.
pub fn google_status_error(api: &str, data: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "error": format!(
            "{api} error: {} - {}",
            data["status"].as_str().unwrap_or("UNKNOWN"),
            data["error_message"].as_str().unwrap_or("")
        )
    })
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// First `max` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keys_count_as_missing() {
        let config = ToolsConfig {
            google_maps_api_key: Some(String::new()),
            yelp_api_key: Some("y".into()),
            ..ToolsConfig::default()
        };
        let client = ApiClient::new(&config);
        assert!(client.google_key().is_none());
        assert_eq!(client.yelp_key(), Some("y"));
    }

    #[tokio::test]
    async fn missing_google_key_is_upstream_error() {
        let client = ApiClient::new(&ToolsConfig::default());
        let err = client.google_get("place/textsearch/json", &[]).await.unwrap_err();
        assert!(err.to_string().contains("GOOGLE_MAPS_API_KEY"));
    }

    #[test]
    fn status_error_text() {
        let v = google_status_error(
            "Google Places API",
            &serde_json::json!({"status": "REQUEST_DENIED", "error_message": "bad key"}),
        );
        assert_eq!(v["error"], "Google Places API error: REQUEST_DENIED - bad key");
    }

    #[test]
    fn helpers() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
