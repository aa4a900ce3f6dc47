//! Small text and arithmetic helpers shared by the narrator and the engine.

use serde::Serialize;

use crate::error::GameError;

/// Join names into an English list. Returns the text and whether it reads
/// as plural. An empty list yields `alt`.
pub fn list_to_plural_string(items: &[String], alt: &str) -> (String, bool) {
    match items {
        [] => (alt.to_owned(), false),
        [only] => (only.clone(), false),
        [first, second] => (format!("{first} and {second}"), true),
        [rest @ .., last] => (format!("{}, and {last}", rest.join(", ")), true),
    }
}

/// Read a yes/no answer.
pub fn parse_vote(text: &str) -> Result<bool, GameError> {
    match text.trim().to_lowercase().as_str() {
        "y" | "ye" | "yes" | "ok" | "true" | "t" | "1" => Ok(true),
        "n" | "no" | "nope" | "false" | "f" | "0" => Ok(false),
        _ => Err(GameError::invalid(format!(
            "{text} is not a valid response, try 'yes', 'y', 'no' or 'n'"
        ))),
    }
}

/// A character-type split for a given number of non-traveler players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Distribution {
    /// Townsfolk.
    pub townsfolk: u32,
    /// Outsiders.
    pub outsiders: u32,
    /// Minions.
    pub minions: u32,
    /// Demons.
    pub demons: u32,
}

/// The standard split for `players` non-travelers, or `None` outside 5 to 15.
pub const fn default_distribution(players: u32) -> Option<Distribution> {
    let (outsiders, minions) = match players {
        5 => (0, 1),
        6 => (1, 1),
        7..=15 => {
            let less_one = players.saturating_sub(1);
            (less_one % 3, (less_one / 3).saturating_sub(1))
        }
        _ => return None,
    };
    Some(Distribution {
        townsfolk: players
            .saturating_sub(outsiders)
            .saturating_sub(minions)
            .saturating_sub(1),
        outsiders,
        minions,
        demons: 1,
    })
}
