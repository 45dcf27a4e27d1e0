//! `get_restaurant_details` via the Google Places Details API.

use async_trait::async_trait;
use serde_json::Value;
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};

use crate::http::{ApiClient, truncate_chars};

const MAX_PLACES: usize = 5;
const MAX_REVIEWS: usize = 3;
const FIELDS: &str =
    "name,formatted_phone_number,website,url,opening_hours,reviews,photos,editorial_summary";

/// Shape one Details `result` into what the model sees.
pub fn summarize_place(place_id: &str, place: &Value) -> Value {
    let reviews: Vec<Value> = place["reviews"]
        .as_array()
        .map(|r| r.as_slice())
        .unwrap_or_default()
        .iter()
        .take(MAX_REVIEWS)
        .map(|rev| {
            serde_json::json!({
                "author": rev["author_name"].as_str().unwrap_or_default(),
                "rating": rev["rating"],
                "text": truncate_chars(rev["text"].as_str().unwrap_or_default(), 200),
                "time": rev["relative_time_description"].as_str().unwrap_or_default(),
            })
        })
        .collect();

    serde_json::json!({
        "place_id": place_id,
        "name": place["name"].as_str().unwrap_or_default(),
        "phone": place["formatted_phone_number"].as_str().unwrap_or_default(),
        "website": place["website"].as_str().unwrap_or_default(),
        "google_maps_url": place["url"].as_str().unwrap_or_default(),
        "hours": place["opening_hours"]["weekday_text"].as_array().cloned().unwrap_or_default(),
        "summary": place["editorial_summary"]["overview"].as_str().unwrap_or_default(),
        "reviews": reviews,
        "photo_count": place["photos"].as_array().map_or(0, |p| p.len()),
    })
}

pub struct RestaurantDetailsTool {
    api: ApiClient,
}

impl RestaurantDetailsTool {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for RestaurantDetailsTool {
    fn name(&self) -> &str {
        "get_restaurant_details"
    }

    fn description(&self) -> &str {
        "Fetch detailed information for specific restaurants via Google Places Details API. \
         Returns reviews, phone number, website, opening hours, and editorial summary. \
         Call this for the top-ranked restaurants to enrich your final recommendations."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "place_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Google Place IDs of restaurants to look up (max 5)"
                }
            },
            "required": ["place_ids"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let place_ids: Vec<&str> = arguments["place_ids"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'place_ids' argument".into()))?
            .iter()
            .filter_map(|v| v.as_str())
            .take(MAX_PLACES)
            .collect();

        let mut results = Vec::with_capacity(place_ids.len());
        for pid in place_ids {
            let params = [("place_id", pid.to_string()), ("fields", FIELDS.to_string())];
            let data = self.api.google_get("place/details/json", &params).await?;

            if data["status"].as_str() == Some("OK") {
                results.push(summarize_place(pid, &data["result"]));
            } else {
                results.push(serde_json::json!({
                    "place_id": pid,
                    "error": data["status"],
                }));
            }
        }

        Ok(Value::Array(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_keeps_top_three_reviews_trimmed() {
        let long = "x".repeat(500);
        let place = json!({
            "name": "Kaiseki House",
            "formatted_phone_number": "(650) 555-1234",
            "opening_hours": { "weekday_text": ["Monday: 5–10 PM"] },
            "editorial_summary": { "overview": "Seasonal tasting menus." },
            "photos": [{}, {}],
            "reviews": [
                { "author_name": "A", "rating": 5, "text": long },
                { "author_name": "B", "rating": 4, "text": "ok" },
                { "author_name": "C", "rating": 3, "text": "meh" },
                { "author_name": "D", "rating": 1, "text": "no" }
            ]
        });

        let out = summarize_place("p1", &place);
        assert_eq!(out["phone"], "(650) 555-1234");
        assert_eq!(out["reviews"].as_array().unwrap().len(), 3);
        assert_eq!(out["reviews"][0]["text"].as_str().unwrap().len(), 200);
        assert_eq!(out["hours"][0], "Monday: 5–10 PM");
        assert_eq!(out["photo_count"], 2);
        assert_eq!(out["website"], "");
    }
}
