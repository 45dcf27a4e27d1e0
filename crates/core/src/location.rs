//! The planning user's own position.
//!
//! Location is per request. It travels explicitly with each run (into the
//! system prompt and into every tool invocation) and is never stored as
//! process-wide state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserLocation {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default)]
    pub address: String,
}

impl UserLocation {
    pub fn new(lat: f64, lng: f64, address: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            address: address.into(),
        }
    }

    /// A zero latitude is what clients send when they have no fix.
    pub fn is_known(&self) -> bool {
        self.lat != 0.0
    }

    /// The address, or `"Unknown"` when the client sent none.
    pub fn address_or_unknown(&self) -> &str {
        if self.address.is_empty() {
            "Unknown"
        } else {
            &self.address
        }
    }

    /// `Lat: …, Lng: …, Address: …` as rendered into the system prompt.
    pub fn describe(&self) -> String {
        format!(
            "Lat: {}, Lng: {}, Address: {}",
            self.lat,
            self.lng,
            self.address_or_unknown()
        )
    }

    /// The system note appended to a session when a follow-up turn carries a location.
    pub fn follow_up_note(&self) -> String {
        format!(
            "[User's current location: Lat {}, Lng {}, Address: {}]",
            self.lat,
            self.lng,
            self.address_or_unknown()
        )
    }
}

/// Only locations with a real fix count; everything else is treated as absent.
pub fn known(location: Option<&UserLocation>) -> Option<&UserLocation> {
    location.filter(|loc| loc.is_known())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_latitude_is_unknown() {
        assert!(!UserLocation::default().is_known());
        assert!(UserLocation::new(37.44, -122.16, "Palo Alto").is_known());
        assert!(known(Some(&UserLocation::default())).is_none());
    }

    #[test]
    fn describe_fills_missing_address() {
        let loc = UserLocation::new(37.5, -122.2, "");
        assert_eq!(loc.describe(), "Lat: 37.5, Lng: -122.2, Address: Unknown");
    }

    #[test]
    fn follow_up_note_format() {
        let loc = UserLocation::new(37.5, -122.2, "1 Main St");
        assert_eq!(
            loc.follow_up_note(),
            "[User's current location: Lat 37.5, Lng -122.2, Address: 1 Main St]"
        );
    }
}
