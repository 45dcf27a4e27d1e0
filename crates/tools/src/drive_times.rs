//! `calculate_drive_times` via the Google Distance Matrix API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};

use crate::http::{ApiClient, google_status_error};

/// Seconds reported for a pair Google could not route.
pub const UNREACHABLE_SECONDS: u64 = 99_999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveTime {
    pub friend: String,
    pub restaurant: String,
    pub duration_text: String,
    pub duration_seconds: u64,
    pub distance_text: String,
}

/// Replace whatever the model guessed for the user with the real fix.
///
/// Any `Me`/`User` origin is dropped and `Me` is appended at the user's
/// coordinates. Without a known location the origins pass through untouched.
pub fn resolve_origins(origins: Vec<NamedPoint>, ctx: &ToolContext) -> Vec<NamedPoint> {
    let Some(user) = ctx.known_location() else {
        return origins;
    };
    let mut resolved: Vec<NamedPoint> = origins
        .into_iter()
        .filter(|o| {
            let name = o.name.to_lowercase();
            name != "me" && name != "user"
        })
        .collect();
    resolved.push(NamedPoint {
        name: "Me".into(),
        lat: user.lat,
        lng: user.lng,
    });
    resolved
}

fn pipe_join(points: &[NamedPoint]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.lat, p.lng))
        .collect::<Vec<_>>()
        .join("|")
}

/// One row per origin × destination, origin-major.
pub fn parse_matrix(
    data: &serde_json::Value,
    origins: &[NamedPoint],
    destinations: &[NamedPoint],
) -> Vec<DriveTime> {
    let mut rows = Vec::with_capacity(origins.len() * destinations.len());
    for (i, origin) in origins.iter().enumerate() {
        for (j, dest) in destinations.iter().enumerate() {
            let element = &data["rows"][i]["elements"][j];
            let row = if element["status"].as_str() == Some("OK") {
                DriveTime {
                    friend: origin.name.clone(),
                    restaurant: dest.name.clone(),
                    duration_text: element["duration"]["text"]
                        .as_str()
                        .unwrap_or("N/A")
                        .to_string(),
                    duration_seconds: element["duration"]["value"]
                        .as_u64()
                        .unwrap_or(UNREACHABLE_SECONDS),
                    distance_text: element["distance"]["text"]
                        .as_str()
                        .unwrap_or("N/A")
                        .to_string(),
                }
            } else {
                DriveTime {
                    friend: origin.name.clone(),
                    restaurant: dest.name.clone(),
                    duration_text: "N/A".into(),
                    duration_seconds: UNREACHABLE_SECONDS,
                    distance_text: "N/A".into(),
                }
            };
            rows.push(row);
        }
    }
    rows
}

fn points(arguments: &serde_json::Value, field: &str) -> Result<Vec<NamedPoint>, ToolError> {
    serde_json::from_value(arguments[field].clone())
        .map_err(|e| ToolError::InvalidArguments(format!("Invalid '{field}': {e}")))
}

pub struct CalculateDriveTimesTool {
    api: ApiClient,
}

impl CalculateDriveTimesTool {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for CalculateDriveTimesTool {
    fn name(&self) -> &str {
        "calculate_drive_times"
    }

    fn description(&self) -> &str {
        "Calculate driving time from multiple friends to multiple restaurants using \
         Google Maps Distance Matrix API. Returns duration and distance for each pair."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let point = serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "lat": { "type": "number" },
                "lng": { "type": "number" }
            },
            "required": ["name", "lat", "lng"]
        });
        serde_json::json!({
            "type": "object",
            "properties": {
                "origins": {
                    "type": "array",
                    "items": point,
                    "description": "Friends with their lat/lng locations"
                },
                "destinations": {
                    "type": "array",
                    "items": point,
                    "description": "Restaurants with their lat/lng locations"
                }
            },
            "required": ["origins", "destinations"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let origins = resolve_origins(points(&arguments, "origins")?, ctx);
        let destinations = points(&arguments, "destinations")?;

        let params = [
            ("origins", pipe_join(&origins)),
            ("destinations", pipe_join(&destinations)),
            ("mode", "driving".to_string()),
        ];
        let data = self.api.google_get("distancematrix/json", &params).await?;

        if data["status"].as_str() != Some("OK") {
            return Ok(serde_json::json!([google_status_error(
                "Distance Matrix API",
                &data
            )]));
        }

        let rows = parse_matrix(&data, &origins, &destinations);
        serde_json::to_value(rows).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })
    }
}
