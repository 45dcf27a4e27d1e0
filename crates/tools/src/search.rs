//! `search_restaurants` via Google Places Text Search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};

use crate::http::{ApiClient, google_status_error};

const MAX_RESULTS: usize = 15;
const BLENDED_MIN_RADIUS: u64 = 8_000;

/// One search hit, in the shape downstream tools expect to be passed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    pub place_id: String,
    pub address: String,
    pub location: serde_json::Value,
    pub rating: f64,
    pub price_level: Option<i64>,
    pub total_ratings: u64,
    pub open_now: Option<bool>,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub lat: f64,
    pub lng: f64,
    pub radius: u64,
}

impl SearchArea {
    /// Pull the center toward the user and widen the radius so the user's
    /// own side of the group is covered too.
    pub fn blend_with_user(self, ctx: &ToolContext) -> Self {
        match ctx.known_location() {
            Some(user) => Self {
                lat: (self.lat + user.lat) / 2.0,
                lng: (self.lng + user.lng) / 2.0,
                radius: self.radius.max(BLENDED_MIN_RADIUS),
            },
            None => self,
        }
    }
}

/// Convert a Text Search payload, dropping results outside the price band.
pub fn parse_places(data: &serde_json::Value, min_price: i64, max_price: i64) -> Vec<Restaurant> {
    data["results"]
        .as_array()
        .map(|results| results.as_slice())
        .unwrap_or_default()
        .iter()
        .take(MAX_RESULTS)
        .filter_map(|place| {
            let price_level = place["price_level"].as_i64();
            if let Some(p) = price_level {
                if p < min_price || p > max_price {
                    return None;
                }
            }
            Some(Restaurant {
                name: place["name"].as_str()?.to_string(),
                place_id: place["place_id"].as_str().unwrap_or_default().to_string(),
                address: place["formatted_address"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                location: place["geometry"]["location"].clone(),
                rating: place["rating"].as_f64().unwrap_or(0.0),
                price_level,
                total_ratings: place["user_ratings_total"].as_u64().unwrap_or(0),
                open_now: place["opening_hours"]["open_now"].as_bool(),
                types: place["types"]
                    .as_array()
                    .map(|t| {
                        t.iter()
                            .filter_map(|v| v.as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
        })
        .collect()
}

pub struct SearchRestaurantsTool {
    api: ApiClient,
}

impl SearchRestaurantsTool {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for SearchRestaurantsTool {
    fn name(&self) -> &str {
        "search_restaurants"
    }

    fn description(&self) -> &str {
        "Search for restaurants using Google Places API. Provide a descriptive query \
         (e.g. 'Japanese restaurant', 'Italian fine dining') and a center location. \
         Returns up to 15 matching restaurants with rating, price, and address."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query, e.g. 'Japanese restaurant', 'Korean BBQ'" },
                "latitude": { "type": "number", "description": "Center latitude for the search area" },
                "longitude": { "type": "number", "description": "Center longitude for the search area" },
                "radius": { "type": "integer", "description": "Search radius in meters (default 5000, max 50000)", "default": 5000 },
                "min_price": { "type": "integer", "description": "Minimum Google price level 0-4 (0=cheapest)", "default": 0 },
                "max_price": { "type": "integer", "description": "Maximum Google price level 0-4 (4=most expensive)", "default": 4 },
                "open_now": { "type": "boolean", "description": "Only return restaurants that are currently open", "default": true }
            },
            "required": ["query", "latitude", "longitude"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let lat = arguments["latitude"]
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'latitude' argument".into()))?;
        let lng = arguments["longitude"]
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'longitude' argument".into()))?;

        let area = SearchArea {
            lat,
            lng,
            radius: arguments["radius"].as_u64().unwrap_or(5_000).min(50_000),
        }
        .blend_with_user(ctx);
        let min_price = arguments["min_price"].as_i64().unwrap_or(0);
        let max_price = arguments["max_price"].as_i64().unwrap_or(4);
        let open_now = arguments["open_now"].as_bool().unwrap_or(true);

        let mut params = vec![
            ("query", query.to_string()),
            ("location", format!("{},{}", area.lat, area.lng)),
            ("radius", area.radius.to_string()),
            ("type", "restaurant".to_string()),
        ];
        if open_now {
            params.push(("opennow", String::new()));
        }

        let data = self.api.google_get("place/textsearch/json", &params).await?;

        match data["status"].as_str() {
            Some("OK") | Some("ZERO_RESULTS") => {}
            _ => {
                return Ok(serde_json::json!([google_status_error(
                    "Google Places API",
                    &data
                )]));
            }
        }

        let restaurants = parse_places(&data, min_price, max_price);
        serde_json::to_value(restaurants).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supperclub_config::ToolsConfig;
    use supperclub_core::UserLocation;

    fn place(name: &str, price: Option<i64>) -> serde_json::Value {
        let mut p = serde_json::json!({
            "name": name,
            "place_id": format!("pid-{name}"),
            "formatted_address": "1 Main St",
            "geometry": { "location": { "lat": 37.5, "lng": -122.2 } },
            "rating": 4.5,
            "user_ratings_total": 321,
            "opening_hours": { "open_now": true },
            "types": ["restaurant", "food"]
        });
        if let Some(price) = price {
            p["price_level"] = serde_json::json!(price);
        }
        p
    }

    #[test]
    fn blending_uses_midpoint_and_widens_radius() {
        let ctx = ToolContext::new(Some(UserLocation::new(37.0, -122.0, "home")));
        let area = SearchArea {
            lat: 38.0,
            lng: -121.0,
            radius: 3_000,
        }
        .blend_with_user(&ctx);
        assert_eq!(area.lat, 37.5);
        assert_eq!(area.lng, -121.5);
        assert_eq!(area.radius, 8_000);
    }

    #[test]
    fn no_blending_without_a_fix() {
        let ctx = ToolContext::new(Some(UserLocation::new(0.0, 0.0, "")));
        let area = SearchArea {
            lat: 38.0,
            lng: -121.0,
            radius: 3_000,
        };
        assert_eq!(area.blend_with_user(&ctx), area);
    }

    #[test]
    fn parse_filters_price_band_and_caps_results() {
        let mut results: Vec<_> = (0..20).map(|i| place(&format!("R{i}"), None)).collect();
        results[0] = place("Pricey", Some(4));
        results[1] = place("Cheap", Some(1));
        let data = serde_json::json!({ "status": "OK", "results": results });

        let parsed = parse_places(&data, 0, 2);
        assert_eq!(parsed.len(), MAX_RESULTS - 1);
        assert_eq!(parsed[0].name, "Cheap");
        assert_eq!(parsed[0].price_level, Some(1));
        assert_eq!(parsed[1].total_ratings, 321);
        assert_eq!(parsed[1].open_now, Some(true));
        assert_eq!(parsed[1].location["lat"], 37.5);
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let tool = SearchRestaurantsTool::new(ApiClient::new(&ToolsConfig::default()));
        let err = tool
            .execute(serde_json::json!({"latitude": 1.0}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
