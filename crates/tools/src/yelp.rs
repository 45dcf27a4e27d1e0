//! `get_yelp_info`: Yelp rating, reviews and popular dishes.
//!
//! Two stages per restaurant: a business search to find the match, then the
//! reviews endpoint. A failed search marks that entry with an error; failed
//! reviews leave the entry with what the search returned.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};
use tracing::debug;

use crate::http::{ApiClient, truncate_chars};

const MAX_RESTAURANTS: usize = 5;
const MAX_REVIEWS: usize = 3;
const MAX_DISHES: usize = 8;

static DISH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:the|their|try the|loved the|order the|get the|had the|recommend the)\s+([A-Z][a-z]+(?:\s+[A-Za-z]+){0,3})",
        r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)\s+(?:was|were|is)\s+(?:amazing|excellent|great|delicious|fantastic|incredible|good|outstanding)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

const STOP_WORDS: &[&str] = &[
    "the", "this", "that", "they", "their", "very", "really", "also", "just", "been", "will",
    "would",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YelpReview {
    pub author: String,
    pub rating: Option<f64>,
    pub text: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct YelpEntry {
    pub name: String,
    pub yelp_match: bool,
    pub yelp_rating: Option<f64>,
    pub yelp_review_count: Option<u64>,
    pub yelp_price: Option<String>,
    pub yelp_url: Option<String>,
    pub reviews: Vec<YelpReview>,
    pub popular_dishes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dish names mentioned in review text, most frequent first.
pub fn extract_popular_dishes(reviews: &[YelpReview]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for review in reviews {
        for pattern in DISH_PATTERNS.iter() {
            for caps in pattern.captures_iter(&review.text) {
                let Some(m) = caps.get(1) else { continue };
                let dish = m
                    .as_str()
                    .trim()
                    .trim_end_matches(['.', ',', '!', '?'])
                    .to_string();
                let words: Vec<String> =
                    dish.split_whitespace().map(|w| w.to_lowercase()).collect();
                if words.is_empty() || words.len() > 5 || STOP_WORDS.contains(&words[0].as_str()) {
                    continue;
                }
                let count = counts.entry(dish.clone()).or_insert(0);
                if *count == 0 {
                    first_seen.push(dish);
                }
                *count += 1;
            }
        }
    }

    // Stable sort keeps first-mention order among ties.
    first_seen.sort_by_key(|d| std::cmp::Reverse(counts.get(d).copied().unwrap_or(0)));
    first_seen.truncate(MAX_DISHES);
    first_seen
}

/// Fill match fields from a business-search payload. Returns the business id.
pub fn apply_search(entry: &mut YelpEntry, data: &Value) -> Option<String> {
    let biz = data["businesses"].as_array()?.first()?;
    entry.yelp_match = true;
    entry.yelp_rating = biz["rating"].as_f64();
    entry.yelp_review_count = biz["review_count"].as_u64();
    entry.yelp_price = biz["price"].as_str().map(String::from);
    entry.yelp_url = biz["url"].as_str().map(String::from);
    biz["id"].as_str().map(String::from)
}

pub fn parse_reviews(data: &Value) -> Vec<YelpReview> {
    data["reviews"]
        .as_array()
        .map(|r| r.as_slice())
        .unwrap_or_default()
        .iter()
        .take(MAX_REVIEWS)
        .map(|rev| YelpReview {
            author: rev["user"]["name"].as_str().unwrap_or_default().to_string(),
            rating: rev["rating"].as_f64(),
            text: truncate_chars(rev["text"].as_str().unwrap_or_default(), 300),
            time: rev["time_created"].as_str().unwrap_or_default().to_string(),
        })
        .collect()
}

pub struct YelpInfoTool {
    api: ApiClient,
}

impl YelpInfoTool {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn lookup(&self, restaurant: &Value) -> YelpEntry {
        let mut entry = YelpEntry {
            name: restaurant["name"].as_str().unwrap_or_default().to_string(),
            ..YelpEntry::default()
        };

        let params = [
            ("term", entry.name.clone()),
            ("latitude", restaurant["latitude"].as_f64().unwrap_or(0.0).to_string()),
            ("longitude", restaurant["longitude"].as_f64().unwrap_or(0.0).to_string()),
            ("limit", "1".to_string()),
        ];
        let biz_id = match self.api.yelp_get("businesses/search", &params).await {
            Ok(data) => match apply_search(&mut entry, &data) {
                Some(id) => id,
                None => {
                    entry.error = Some("No Yelp match found".into());
                    return entry;
                }
            },
            Err(e) => {
                entry.error = Some(format!("Yelp search failed: {e}"));
                return entry;
            }
        };

        let params = [
            ("limit", MAX_REVIEWS.to_string()),
            ("sort_by", "yelp_sort".to_string()),
        ];
        match self
            .api
            .yelp_get(&format!("businesses/{biz_id}/reviews"), &params)
            .await
        {
            Ok(data) => {
                entry.reviews = parse_reviews(&data);
                entry.popular_dishes = extract_popular_dishes(&entry.reviews);
            }
            Err(e) => debug!(business = %biz_id, error = %e, "Yelp reviews unavailable"),
        }

        entry
    }
}

#[async_trait]
impl Tool for YelpInfoTool {
    fn name(&self) -> &str {
        "get_yelp_info"
    }

    fn description(&self) -> &str {
        "Fetch Yelp rating, reviews and popular dishes for restaurants. Combines Yelp data \
         with Google data for better dish recommendations. Call this AFTER \
         get_restaurant_details for the top-ranked restaurants."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "restaurants": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "description": "Restaurant name" },
                            "latitude": { "type": "number", "description": "Restaurant latitude" },
                            "longitude": { "type": "number", "description": "Restaurant longitude" }
                        },
                        "required": ["name", "latitude", "longitude"]
                    },
                    "description": "Restaurants to look up on Yelp (max 5)"
                }
            },
            "required": ["restaurants"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let restaurants = arguments["restaurants"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'restaurants' argument".into()))?;

        if self.api.yelp_key().is_none() {
            return Ok(serde_json::json!([{ "error": "YELP_API_KEY not configured" }]));
        }

        let mut results = Vec::new();
        for restaurant in restaurants.iter().take(MAX_RESTAURANTS) {
            results.push(self.lookup(restaurant).await);
        }

        serde_json::to_value(results).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })
    }
}
