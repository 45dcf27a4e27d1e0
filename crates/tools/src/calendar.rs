//! `add_to_calendar`: a Google Calendar event template link.

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};
use url::Url;

const CALENDAR_RENDER: &str = "https://calendar.google.com/calendar/render";
const GCAL_FORMAT: &str = "%Y%m%dT%H%M%S";

fn default_dinner_time() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default()
}

/// When the dinner starts.
///
/// An explicit `YYYY-MM-DD` date is used as given. Without one, the dinner is
/// today, or tomorrow if that time has already passed. An unparseable date or
/// time falls back to 19:00.
pub fn event_start(date: Option<&str>, time: &str, now: NaiveDateTime) -> NaiveDateTime {
    let parsed_time = NaiveTime::parse_from_str(time, "%H:%M").ok();

    if let Some(date) = date.filter(|d| !d.is_empty()) {
        if let (Ok(day), Some(t)) = (NaiveDate::parse_from_str(date, "%Y-%m-%d"), parsed_time) {
            return day.and_time(t);
        }
    }

    let start = now.date().and_time(parsed_time.unwrap_or_else(default_dinner_time));
    if start < now {
        start + Duration::days(1)
    } else {
        start
    }
}

pub fn calendar_link(
    title: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    details: &str,
    location: &str,
) -> Result<Url, url::ParseError> {
    let dates = format!("{}/{}", start.format(GCAL_FORMAT), end.format(GCAL_FORMAT));
    Url::parse_with_params(
        CALENDAR_RENDER,
        &[
            ("action", "TEMPLATE"),
            ("text", title),
            ("dates", dates.as_str()),
            ("details", details),
            ("location", location),
        ],
    )
}

pub struct AddToCalendarTool;

#[async_trait]
impl Tool for AddToCalendarTool {
    fn name(&self) -> &str {
        "add_to_calendar"
    }

    fn description(&self) -> &str {
        "Generate a Google Calendar link to create a dinner event. Call this when the \
         user wants to schedule the dinner or add it to their calendar."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "restaurant_name": { "type": "string", "description": "Name of the restaurant" },
                "restaurant_address": { "type": "string", "description": "Restaurant street address" },
                "date": { "type": "string", "description": "Dinner date in YYYY-MM-DD format (default: today or tomorrow)" },
                "time": { "type": "string", "description": "Dinner time in HH:MM 24h format (default: 19:00)", "default": "19:00" },
                "duration_hours": { "type": "number", "description": "Duration in hours (default: 2)", "default": 2 },
                "friends": { "type": "array", "items": { "type": "string" }, "description": "List of friend names attending" },
                "notes": { "type": "string", "description": "Additional notes for the calendar event" }
            },
            "required": ["restaurant_name", "restaurant_address"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let name = arguments["restaurant_name"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'restaurant_name' argument".into())
        })?;
        let address = arguments["restaurant_address"].as_str().unwrap_or_default();
        let hours = arguments["duration_hours"].as_f64().unwrap_or(2.0).max(0.0);
        let friends: Vec<&str> = arguments["friends"]
            .as_array()
            .map(|f| f.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        let notes = arguments["notes"].as_str().unwrap_or_default();

        let start = event_start(
            arguments["date"].as_str(),
            arguments["time"].as_str().unwrap_or("19:00"),
            Local::now().naive_local(),
        );
        let end = start + Duration::minutes((hours * 60.0).round() as i64);

        let mut details = if friends.is_empty() {
            "Group dinner.".to_string()
        } else {
            format!("Group dinner with {}.", friends.join(", "))
        };
        if !notes.is_empty() {
            details.push('\n');
            details.push_str(notes);
        }

        let link = calendar_link(
            &format!("Dinner at {name}"),
            start,
            end,
            &details,
            &format!("{name}, {address}"),
        )
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })?;

        Ok(serde_json::json!({
            "restaurant": name,
            "date": start.format("%B %d, %Y").to_string(),
            "time": start.format("%I:%M %p").to_string(),
            "calendar_link": link.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn explicit_date_and_time() {
        let now = at(2024, 5, 1, 12, 0);
        assert_eq!(
            event_start(Some("2024-06-15"), "18:30", now),
            at(2024, 6, 15, 18, 30)
        );
    }

    #[test]
    fn no_date_rolls_to_tomorrow_once_passed() {
        assert_eq!(event_start(None, "19:00", at(2024, 5, 1, 12, 0)), at(2024, 5, 1, 19, 0));
        assert_eq!(event_start(None, "19:00", at(2024, 5, 1, 20, 0)), at(2024, 5, 2, 19, 0));
    }

    #[test]
    fn garbage_falls_back_to_seven() {
        assert_eq!(
            event_start(Some("soon"), "late", at(2024, 5, 1, 8, 0)),
            at(2024, 5, 1, 19, 0)
        );
    }

    #[tokio::test]
    async fn link_has_template_fields() {
        let out = AddToCalendarTool
            .execute(
                json!({
                    "restaurant_name": "Kaiseki House",
                    "restaurant_address": "200 Castro St",
                    "date": "2030-01-02",
                    "time": "19:00",
                    "duration_hours": 1.5,
                    "friends": ["Alice", "Bob"],
                    "notes": "Ask for the window table"
                }),
                &ToolContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(out["date"], "January 02, 2030");
        assert_eq!(out["time"], "07:00 PM");

        let url = Url::parse(out["calendar_link"].as_str().unwrap()).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["action"], "TEMPLATE");
        assert_eq!(pairs["text"], "Dinner at Kaiseki House");
        assert_eq!(pairs["dates"], "20300102T190000/20300102T203000");
        assert_eq!(
            pairs["details"],
            "Group dinner with Alice, Bob.\nAsk for the window table"
        );
        assert_eq!(pairs["location"], "Kaiseki House, 200 Castro St");
    }
}
