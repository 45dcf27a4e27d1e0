//! Group dining tools for supperclub.
//!
//! Tools give the planner its view of the world: who the friends are and
//! where they live, which restaurants exist, how long everyone would drive,
//! how candidates compare, and how to get there or put it on a calendar.
//!
//! Upstream-backed tools share one [`ApiClient`]. The rest are pure.

pub mod calendar;
pub mod details;
pub mod drive_times;
pub mod friends;
pub mod http;
pub mod rank;
pub mod ride;
pub mod search;
pub mod validate;
pub mod yelp;

use std::sync::Arc;

use supperclub_config::ToolsConfig;
use supperclub_core::tool::ToolRegistry;

pub use friends::{Friend, FriendRoster, RosterError};
pub use http::ApiClient;

/// Create the registry with every dining tool, in the order they are
/// advertised to the model.
pub fn default_registry(config: &ToolsConfig, roster: Arc<FriendRoster>) -> ToolRegistry {
    let api = ApiClient::new(config);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(friends::GetFriendsInfoTool::new(roster)));
    registry.register(Box::new(search::SearchRestaurantsTool::new(api.clone())));
    registry.register(Box::new(drive_times::CalculateDriveTimesTool::new(api.clone())));
    registry.register(Box::new(validate::ValidateRestaurantsTool));
    registry.register(Box::new(rank::RankAndScoreTool));
    registry.register(Box::new(details::RestaurantDetailsTool::new(api.clone())));
    registry.register(Box::new(ride::BookRideTool));
    registry.register(Box::new(calendar::AddToCalendarTool));
    registry.register(Box::new(yelp::YelpInfoTool::new(api)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_advertises_all_tools_in_order() {
        let roster = Arc::new(FriendRoster::builtin().unwrap());
        let registry = default_registry(&ToolsConfig::default(), roster);
        assert_eq!(
            registry.names(),
            vec![
                "get_friends_info",
                "search_restaurants",
                "calculate_drive_times",
                "validate_restaurants",
                "rank_and_score",
                "get_restaurant_details",
                "book_ride",
                "add_to_calendar",
                "get_yelp_info",
            ]
        );
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }
}
