//! `rank_and_score`: weighted scoring of the surviving candidates.
//!
//! Weights: drive time 35%, rating 30%, fairness 20%, price fit 15%.
//! Each component is on a 0–10 scale.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};

use crate::http::round_to;

const DRIVE_WEIGHT: f64 = 0.35;
const RATING_WEIGHT: f64 = 0.30;
const FAIRNESS_WEIGHT: f64 = 0.20;
const PRICE_WEIGHT: f64 = 0.15;

#[derive(Debug, Default, Clone)]
struct DriveStats {
    times: Vec<u64>,
}

static NO_DRIVE_DATA: DriveStats = DriveStats { times: Vec::new() };

impl DriveStats {
    fn max(&self) -> u64 {
        self.times.iter().copied().max().unwrap_or(0)
    }

    fn min(&self) -> u64 {
        self.times.iter().copied().min().unwrap_or(0)
    }

    fn avg(&self) -> Option<f64> {
        if self.times.is_empty() {
            None
        } else {
            Some(self.times.iter().sum::<u64>() as f64 / self.times.len() as f64)
        }
    }

    fn spread(&self) -> u64 {
        self.max() - self.min()
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Breakdown {
    pub drive_score: f64,
    pub rating_score: f64,
    pub fairness_score: f64,
    pub price_score: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DriveSummary {
    pub avg_minutes: Option<f64>,
    pub max_minutes: Option<f64>,
    pub spread_minutes: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct Scored {
    pub name: String,
    pub total_score: f64,
    pub breakdown: Breakdown,
    pub rating: f64,
    pub total_ratings: u64,
    pub price_level: Option<i64>,
    pub address: String,
    pub place_id: String,
    pub location: Value,
    pub drive_stats: DriveSummary,
}

/// Scoring knobs supplied by the model.
#[derive(Debug, Clone)]
pub struct ScoringInput {
    pub max_rating: f64,
    pub budget_level: i64,
}

impl Default for ScoringInput {
    fn default() -> Self {
        Self {
            max_rating: 5.0,
            budget_level: 2,
        }
    }
}

fn stats_for<'a>(stats: &'a HashMap<&str, DriveStats>, name: &str) -> &'a DriveStats {
    stats.get(name).unwrap_or(&NO_DRIVE_DATA)
}

/// Rating scaled to 10, nudged by review volume.
fn rating_score(rating: f64, total_ratings: u64, max_rating: f64) -> f64 {
    let base = if max_rating > 0.0 {
        rating / max_rating * 10.0
    } else {
        0.0
    };
    match total_ratings {
        n if n >= 500 => (base * 1.1).min(10.0),
        n if n >= 200 => (base * 1.05).min(10.0),
        n if n < 50 => base * 0.75,
        _ => base,
    }
}

/// Shorter average commute scores higher; 5 when nothing is known.
fn drive_score(stats: &DriveStats) -> f64 {
    match stats.avg() {
        Some(avg) => (10.0 - avg / 240.0).max(0.0),
        None => 5.0,
    }
}

/// Normalized across candidates: most balanced → 9, least → 2, all equal → 7.
fn fairness_score(spread: u64, min_spread: u64, max_spread: u64) -> f64 {
    if max_spread == min_spread {
        7.0
    } else {
        let t = (spread - min_spread) as f64 / (max_spread - min_spread) as f64;
        9.0 - t * 7.0
    }
}

fn price_score(price_level: Option<i64>, budget_level: i64) -> f64 {
    match price_level {
        Some(p) => (10.0 - (p - budget_level).abs() as f64 * 3.0).max(0.0),
        None => 6.0,
    }
}

/// Score `candidates` and return them best first.
pub fn rank(candidates: &[Value], drive_times: &[Value], input: &ScoringInput) -> Vec<Scored> {
    let mut stats: HashMap<&str, DriveStats> = HashMap::new();
    for dt in drive_times {
        stats
            .entry(dt["restaurant"].as_str().unwrap_or_default())
            .or_default()
            .times
            .push(dt["duration_seconds"].as_u64().unwrap_or(0));
    }


    let spreads: Vec<u64> = candidates
        .iter()
        .map(|c| stats_for(&stats, c["name"].as_str().unwrap_or_default()).spread())
        .collect();
    let min_spread = spreads.iter().copied().min().unwrap_or(0);
    let max_spread = spreads.iter().copied().max().unwrap_or(0);

    let mut scored: Vec<Scored> = candidates
        .iter()
        .zip(spreads)
        .map(|(c, spread)| {
            let name = c["name"].as_str().unwrap_or_default();
            let s = stats_for(&stats, name);
            let rating = c["rating"].as_f64().unwrap_or(0.0);
            let total_ratings = c["total_ratings"].as_u64().unwrap_or(0);
            let price_level = c["price_level"].as_i64();

            let breakdown = Breakdown {
                drive_score: drive_score(s),
                rating_score: rating_score(rating, total_ratings, input.max_rating),
                fairness_score: fairness_score(spread, min_spread, max_spread),
                price_score: price_score(price_level, input.budget_level),
            };
            let total = breakdown.drive_score * DRIVE_WEIGHT
                + breakdown.rating_score * RATING_WEIGHT
                + breakdown.fairness_score * FAIRNESS_WEIGHT
                + breakdown.price_score * PRICE_WEIGHT;

            let has_times = !s.times.is_empty();
            Scored {
                name: name.to_string(),
                total_score: round_to(total, 2),
                breakdown: Breakdown {
                    drive_score: round_to(breakdown.drive_score, 2),
                    rating_score: round_to(breakdown.rating_score, 2),
                    fairness_score: round_to(breakdown.fairness_score, 2),
                    price_score: round_to(breakdown.price_score, 2),
                },
                rating,
                total_ratings,
                price_level,
                address: c["address"].as_str().unwrap_or_default().to_string(),
                place_id: c["place_id"].as_str().unwrap_or_default().to_string(),
                location: c["location"].clone(),
                drive_stats: DriveSummary {
                    avg_minutes: s.avg().map(|a| round_to(a / 60.0, 1)),
                    max_minutes: has_times.then(|| round_to(s.max() as f64 / 60.0, 1)),
                    spread_minutes: has_times.then(|| round_to(s.spread() as f64 / 60.0, 1)),
                },
            }
        })
        .collect();

    scored.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    scored
}

pub struct RankAndScoreTool;

#[async_trait]
impl Tool for RankAndScoreTool {
    fn name(&self) -> &str {
        "rank_and_score"
    }

    fn description(&self) -> &str {
        "Score and rank restaurant candidates using weighted criteria: drive time (35%), \
         rating & reviews (30%), drive-time fairness (20%), price fit (15%). Returns a \
         sorted list with score breakdowns. Call this AFTER validate_restaurants."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "candidates": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "place_id": { "type": "string", "description": "Google Place ID; pass through from search results" },
                            "rating": { "type": "number" },
                            "total_ratings": { "type": "integer" },
                            "price_level": { "type": "integer" },
                            "address": { "type": "string" },
                            "location": {
                                "type": "object",
                                "properties": { "lat": { "type": "number" }, "lng": { "type": "number" } },
                                "description": "Lat/lng; pass through from search results"
                            }
                        }
                    },
                    "description": "Validated restaurant candidates to score. Include place_id and location from the original search results."
                },
                "drive_times": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "friend": { "type": "string" },
                            "restaurant": { "type": "string" },
                            "duration_seconds": { "type": "integer" }
                        }
                    },
                    "description": "Drive time data for fairness scoring"
                },
                "budget_level": {
                    "type": "integer",
                    "description": "Target Google price level 0-4 (e.g. 2 for moderate)",
                    "default": 2
                },
                "preferred_cuisines": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Preferred cuisine keywords"
                }
            },
            "required": ["candidates", "drive_times"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let candidates = arguments["candidates"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'candidates' argument".into()))?;
        let drive_times = arguments["drive_times"]
            .as_array()
            .map(|v| v.as_slice())
            .unwrap_or_default();
        let input = ScoringInput {
            max_rating: arguments["max_rating"].as_f64().unwrap_or(5.0),
            budget_level: arguments["budget_level"].as_i64().unwrap_or(2),
        };

        serde_json::to_value(rank(candidates, drive_times, &input)).map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn component_scores() {
        assert_eq!(rating_score(5.0, 600, 5.0), 10.0);
        assert_eq!(rating_score(4.0, 10, 5.0), 6.0);
        assert_eq!(price_score(Some(2), 2), 10.0);
        assert_eq!(price_score(Some(1), 2), 7.0);
        assert_eq!(price_score(Some(0), 4), 0.0);
        assert_eq!(price_score(None, 2), 6.0);
        assert_eq!(fairness_score(5, 5, 5), 7.0);
        assert_eq!(fairness_score(0, 0, 10), 9.0);
        assert_eq!(fairness_score(10, 0, 10), 2.0);
        assert_eq!(drive_score(&DriveStats::default()), 5.0);
    }

    #[test]
    fn balanced_close_candidate_wins() {
        let candidates = [
            json!({ "name": "Lopsided", "rating": 4.5, "total_ratings": 300, "price_level": 2 }),
            json!({ "name": "Balanced", "rating": 4.5, "total_ratings": 300, "price_level": 2, "place_id": "pb" }),
        ];
        let drive_times = [
            json!({ "friend": "A", "restaurant": "Lopsided", "duration_seconds": 300 }),
            json!({ "friend": "B", "restaurant": "Lopsided", "duration_seconds": 2700 }),
            json!({ "friend": "A", "restaurant": "Balanced", "duration_seconds": 900 }),
            json!({ "friend": "B", "restaurant": "Balanced", "duration_seconds": 1200 }),
        ];

        let ranked = rank(&candidates, &drive_times, &ScoringInput::default());
        assert_eq!(ranked[0].name, "Balanced");
        assert_eq!(ranked[0].place_id, "pb");
        assert_eq!(ranked[0].breakdown.fairness_score, 9.0);
        assert_eq!(ranked[1].breakdown.fairness_score, 2.0);
        assert_eq!(ranked[0].drive_stats.max_minutes, Some(20.0));
        assert_eq!(ranked[0].drive_stats.spread_minutes, Some(5.0));
        assert!(ranked[0].total_score > ranked[1].total_score);
    }

    #[tokio::test]
    async fn candidates_without_drive_data() {
        let out = RankAndScoreTool
            .execute(
                json!({ "candidates": [{ "name": "Solo" }], "drive_times": [] }),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(out[0]["breakdown"]["drive_score"], 5.0);
        assert!(out[0]["drive_stats"]["avg_minutes"].is_null());
    }
}
