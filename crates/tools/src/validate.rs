//! `validate_restaurants`: filter candidates against group constraints.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};

/// Group constraints, lowercased for matching.
#[derive(Debug, Default)]
pub struct Constraints {
    pub allergies: Vec<String>,
    pub dislikes: Vec<String>,
    pub blacklist: Vec<String>,
    /// 0 disables the drive-time check.
    pub max_drive_seconds: u64,
}

/// Worst drive time per restaurant name.
fn worst_drive_times(drive_times: &[Value]) -> HashMap<&str, u64> {
    let mut worst: HashMap<&str, u64> = HashMap::new();
    for dt in drive_times {
        let name = dt["restaurant"].as_str().unwrap_or_default();
        let secs = dt["duration_seconds"].as_u64().unwrap_or(0);
        let entry = worst.entry(name).or_insert(0);
        *entry = (*entry).max(secs);
    }
    worst
}

/// Reasons a single restaurant fails the constraints; empty means it passes.
fn rejection_reasons(
    restaurant: &Value,
    constraints: &Constraints,
    worst: &HashMap<&str, u64>,
) -> Vec<String> {
    let name = restaurant["name"].as_str().unwrap_or_default();
    let name_lower = name.to_lowercase();
    let mut reasons = Vec::new();

    if constraints
        .blacklist
        .iter()
        .any(|b| !b.is_empty() && name_lower.contains(b.as_str()))
    {
        reasons.push(format!("Blacklisted: matches '{name_lower}'"));
    }
    for allergen in constraints.allergies.iter().filter(|a| !a.is_empty()) {
        if name_lower.contains(allergen.as_str()) {
            reasons.push(format!("Allergy conflict: '{allergen}' found in name"));
        }
    }
    for dislike in constraints.dislikes.iter().filter(|d| !d.is_empty()) {
        if name_lower.contains(dislike.as_str()) {
            reasons.push(format!("Dislike conflict: '{dislike}' found in name"));
        }
    }

    if constraints.max_drive_seconds > 0 {
        if let Some(&actual) = worst.get(name) {
            if actual > constraints.max_drive_seconds {
                reasons.push(format!(
                    "Drive time {}min exceeds limit {}min",
                    actual / 60,
                    constraints.max_drive_seconds / 60
                ));
            }
        }
    }

    reasons
}

/// Split `restaurants` into kept and removed.
pub fn validate(restaurants: &[Value], constraints: &Constraints, drive_times: &[Value]) -> Value {
    let worst = worst_drive_times(drive_times);
    let mut kept = Vec::new();
    let mut removed = Vec::new();

    for r in restaurants {
        let reasons = rejection_reasons(r, constraints, &worst);
        if reasons.is_empty() {
            kept.push(r.clone());
        } else {
            removed.push(serde_json::json!({
                "restaurant": r["name"],
                "reasons": reasons,
            }));
        }
    }

    serde_json::json!({
        "kept_count": kept.len(),
        "removed_count": removed.len(),
        "kept": kept,
        "removed": removed,
    })
}

fn lowered(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

pub struct ValidateRestaurantsTool;

#[async_trait]
impl Tool for ValidateRestaurantsTool {
    fn name(&self) -> &str {
        "validate_restaurants"
    }

    fn description(&self) -> &str {
        "Filter restaurant candidates against group constraints: allergies, dislikes, \
         blacklisted restaurants, and max drive time. Returns which restaurants pass and \
         which are removed (with reasons). Call this AFTER getting drive times."
    }

    fn parameters_schema(&self) -> Value {
        let strings = serde_json::json!({ "type": "array", "items": { "type": "string" } });
        serde_json::json!({
            "type": "object",
            "properties": {
                "restaurants": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "place_id": { "type": "string" },
                            "rating": { "type": "number" },
                            "price_level": { "type": "integer" },
                            "total_ratings": { "type": "integer" },
                            "address": { "type": "string" }
                        }
                    },
                    "description": "Restaurant candidates to validate"
                },
                "allergies": strings,
                "dislikes": strings,
                "blacklist": strings,
                "max_drive_seconds": {
                    "type": "integer",
                    "description": "Maximum allowed drive time in seconds (0 = no limit)",
                    "default": 0
                },
                "drive_times": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "restaurant": { "type": "string" },
                            "duration_seconds": { "type": "integer" }
                        }
                    },
                    "description": "Drive time results from calculate_drive_times"
                }
            },
            "required": ["restaurants", "allergies", "dislikes", "blacklist"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let restaurants = arguments["restaurants"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'restaurants' argument".into()))?;

        let constraints = Constraints {
            allergies: lowered(&arguments["allergies"]),
            dislikes: lowered(&arguments["dislikes"]),
            blacklist: lowered(&arguments["blacklist"]),
            max_drive_seconds: arguments["max_drive_seconds"].as_u64().unwrap_or(0),
        };
        let drive_times = arguments["drive_times"]
            .as_array()
            .map(|v| v.as_slice())
            .unwrap_or_default();

        Ok(validate(restaurants, &constraints, drive_times))
    }
}
