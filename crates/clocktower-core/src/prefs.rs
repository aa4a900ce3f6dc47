//! Per-user preferences the engine reads but never stores.
//!
//! Nicknames, aliases and pronouns belong to the platform user, not to the
//! game. The engine reaches them through [`PreferencesStore`], which the
//! collaborator implements over whatever storage it has.

use std::collections::BTreeMap;

use clocktower_types::PlayerId;
use serde::{Deserialize, Serialize};

/// A set of personal pronouns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pronouns {
    /// "they"
    pub subject: String,
    /// "them"
    pub object: String,
    /// "their"
    pub possessive: String,
    /// "theirs"
    pub possessive_pronoun: String,
    /// "themselves"
    pub reflexive: String,
    /// Whether verbs agree in the plural ("they are").
    pub plural: bool,
}

impl Pronouns {
    /// they/them
    pub fn they() -> Self {
        Self::from_parts(["they", "them", "their", "theirs", "themselves"], true)
    }

    /// she/her
    pub fn she() -> Self {
        Self::from_parts(["she", "her", "her", "hers", "herself"], false)
    }

    /// he/him
    pub fn he() -> Self {
        Self::from_parts(["he", "him", "his", "his", "himself"], false)
    }

    fn from_parts(parts: [&str; 5], plural: bool) -> Self {
        let [subject, object, possessive, possessive_pronoun, reflexive] = parts.map(str::to_owned);
        Self {
            subject,
            object,
            possessive,
            possessive_pronoun,
            reflexive,
            plural,
        }
    }

    /// Pick the singular or plural form of a verb.
    pub const fn verb<'a>(&self, singular: &'a str, plural: &'a str) -> &'a str {
        if self.plural { plural } else { singular }
    }
}

impl Default for Pronouns {
    fn default() -> Self {
        Self::they()
    }
}

/// Lookup of user preferences, keyed by platform id.
pub trait PreferencesStore {
    /// The user's chosen nickname, if any.
    fn nick(&self, player: PlayerId) -> Option<String>;

    /// Extra names the user answers to.
    fn aliases(&self, player: PlayerId) -> Vec<String>;

    /// The user's pronouns. they/them unless set.
    fn pronouns(&self, player: PlayerId) -> Pronouns;
}

/// An in-memory [`PreferencesStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPreferences {
    #[serde(default)]
    nicks: BTreeMap<PlayerId, String>,
    #[serde(default)]
    aliases: BTreeMap<PlayerId, Vec<String>>,
    #[serde(default)]
    pronouns: BTreeMap<PlayerId, Pronouns>,
}

impl MemoryPreferences {
    /// Set a nickname.
    pub fn set_nick(&mut self, player: PlayerId, nick: impl Into<String>) {
        self.nicks.insert(player, nick.into());
    }

    /// Add an alias.
    pub fn add_alias(&mut self, player: PlayerId, alias: impl Into<String>) {
        self.aliases.entry(player).or_default().push(alias.into());
    }

    /// Set pronouns.
    pub fn set_pronouns(&mut self, player: PlayerId, pronouns: Pronouns) {
        self.pronouns.insert(player, pronouns);
    }
}

impl PreferencesStore for MemoryPreferences {
    fn nick(&self, player: PlayerId) -> Option<String> {
        self.nicks.get(&player).cloned()
    }

    fn aliases(&self, player: PlayerId) -> Vec<String> {
        self.aliases.get(&player).cloned().unwrap_or_default()
    }

    fn pronouns(&self, player: PlayerId) -> Pronouns {
        self.pronouns.get(&player).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_preferences_fall_back() {
        let prefs = MemoryPreferences::default();
        let someone = PlayerId(3);
        assert_eq!(prefs.nick(someone), None);
        assert!(prefs.aliases(someone).is_empty());
        assert_eq!(prefs.pronouns(someone), Pronouns::they());
        assert_eq!(prefs.pronouns(someone).verb("is", "are"), "are");
    }

    #[test]
    fn set_preferences_are_returned() {
        let mut prefs = MemoryPreferences::default();
        let someone = PlayerId(3);
        prefs.set_nick(someone, "Ash");
        prefs.add_alias(someone, "ash");
        prefs.add_alias(someone, "asher");
        prefs.set_pronouns(someone, Pronouns::she());
        assert_eq!(prefs.nick(someone).as_deref(), Some("Ash"));
        assert_eq!(prefs.aliases(someone), vec!["ash", "asher"]);
        assert_eq!(prefs.pronouns(someone).verb("is", "are"), "is");
    }
}
