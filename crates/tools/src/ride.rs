//! `book_ride`: an Uber deep link with prefilled pickup and dropoff.

use async_trait::async_trait;
use serde_json::Value;
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};
use url::Url;

const UBER_PRODUCT_SELECTION: &str = "https://m.uber.com/go/product-selection";

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub line1: String,
    pub line2: String,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    fn to_uber_json(&self) -> String {
        serde_json::json!({
            "addressLine1": self.line1,
            "addressLine2": self.line2,
            "id": uuid::Uuid::new_v4().to_string(),
            "source": "SEARCH",
            "latitude": self.lat,
            "longitude": self.lng,
            "provider": "uber_places",
        })
        .to_string()
    }
}

/// Pickup from explicit arguments, else the user's own location.
///
/// An address like `"1 Main St, Palo Alto, CA"` splits into
/// `"1 Main St"` / `"Palo Alto, CA"`.
pub fn pickup_from(arguments: &Value, ctx: &ToolContext) -> Option<Place> {
    let explicit = (
        arguments["pickup_lat"].as_f64().filter(|v| *v != 0.0),
        arguments["pickup_lng"].as_f64().filter(|v| *v != 0.0),
    );
    let (lat, lng, address) = match explicit {
        (Some(lat), Some(lng)) => (
            lat,
            lng,
            arguments["pickup_address"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        ),
        _ => {
            let user = ctx.known_location()?;
            (user.lat, user.lng, user.address.clone())
        }
    };

    let (line1, line2) = if address.is_empty() {
        ("My Location".to_string(), String::new())
    } else {
        match address.split_once(", ") {
            Some((a, b)) => (a.to_string(), b.to_string()),
            None => (address, String::new()),
        }
    };

    Some(Place {
        line1,
        line2,
        lat,
        lng,
    })
}

pub fn uber_link(dropoff: &Place, pickup: Option<&Place>) -> Result<Url, url::ParseError> {
    let mut params = vec![("drop[0]", dropoff.to_uber_json())];
    if let Some(p) = pickup {
        params.push(("pickup", p.to_uber_json()));
    }
    Url::parse_with_params(UBER_PRODUCT_SELECTION, &params)
}

pub struct BookRideTool;

#[async_trait]
impl Tool for BookRideTool {
    fn name(&self) -> &str {
        "book_ride"
    }

    fn description(&self) -> &str {
        "Generate an Uber ride request link with prefilled pickup and dropoff. Call this \
         when the user asks for a ride, Uber, or wants to go to a restaurant. Pickup \
         defaults to the user's current location."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "restaurant_name": { "type": "string", "description": "Name of the restaurant" },
                "restaurant_lat": { "type": "number", "description": "Restaurant latitude" },
                "restaurant_lng": { "type": "number", "description": "Restaurant longitude" },
                "restaurant_address": { "type": "string", "description": "Restaurant street address" },
                "pickup_lat": { "type": "number", "description": "Pickup latitude (user's current location)" },
                "pickup_lng": { "type": "number", "description": "Pickup longitude (user's current location)" },
                "pickup_address": { "type": "string", "description": "Pickup address" }
            },
            "required": ["restaurant_name", "restaurant_lat", "restaurant_lng", "restaurant_address"]
        })
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let name = arguments["restaurant_name"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'restaurant_name' argument".into())
        })?;
        let lat = arguments["restaurant_lat"].as_f64().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'restaurant_lat' argument".into())
        })?;
        let lng = arguments["restaurant_lng"].as_f64().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'restaurant_lng' argument".into())
        })?;
        let address = arguments["restaurant_address"].as_str().unwrap_or_default();

        let dropoff = Place {
            line1: name.to_string(),
            line2: address.to_string(),
            lat,
            lng,
        };
        let pickup = pickup_from(&arguments, ctx);
        let link = uber_link(&dropoff, pickup.as_ref()).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })?;

        Ok(serde_json::json!({
            "restaurant": name,
            "address": address,
            "uber_link": link.to_string(),
        }))
    }
}
