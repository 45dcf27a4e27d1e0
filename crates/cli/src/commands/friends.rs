//! `supperclub friends`: Print the friend roster.

use supperclub_config::AppConfig;
use supperclub_tools::{Friend, FriendRoster};

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let roster = FriendRoster::load_or_builtin(config.tools.friends_path.as_deref())?;

    if roster.is_empty() {
        println!("No friends in the roster.");
        return Ok(());
    }

    for friend in &roster.friends {
        println!("{}", describe(friend));
    }
    Ok(())
}

fn describe(friend: &Friend) -> String {
    let mut line = friend.name.clone();
    if !friend.location.address.is_empty() {
        line.push_str(&format!(" ({})", friend.location.address));
    }
    let likes = &friend.preferences.likes;
    if !likes.is_empty() {
        line.push_str(&format!("\n    likes: {}", likes.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_includes_address_and_likes() {
        let roster = FriendRoster::from_json(
            r#"{"friends":[{"name":"Ana","location":{"address":"Oakland, CA","lat":37.8,"lng":-122.27},"preferences":{"likes":["tapas","ramen"]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            describe(&roster.friends[0]),
            "Ana (Oakland, CA)\n    likes: tapas, ramen"
        );
    }

    #[test]
    fn describe_without_address() {
        let roster = FriendRoster::from_json(
            r#"{"friends":[{"name":"Kai","location":{"lat":1.0,"lng":2.0}}]}"#,
        )
        .unwrap();
        assert_eq!(describe(&roster.friends[0]), "Kai");
    }
}
