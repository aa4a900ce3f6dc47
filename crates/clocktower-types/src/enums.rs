//! Enumeration types shared across the Clocktower workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// A boolean property of a player derived by folding over their effects.
///
/// No status is ever stored on a player directly. Every query scans the
/// player's effect list, so the closed set here is the full vocabulary an
/// effect may assert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Status {
    /// Ability produces false results.
    Poisoned,
    /// Ability produces false results; the player believes they are someone else.
    Drunk,
    /// The player is a ghost.
    Dead,
    /// Dead, drunk or poisoned unless an effect says otherwise.
    NotFunctioning,
    /// Does not die from any cause.
    Safe,
    /// Does not die to demon kills.
    SafeFromDemon,
    /// Yes votes count negative.
    Thiefed,
    /// Yes votes count triple.
    Bureaucrated,
    /// A one-time ability has been spent.
    UsedAbility,
    /// May vote while dead without spending a token.
    CanDeadVoteWithoutToken,
    /// May nominate while dead.
    CanNominateWhileDead,
    /// May nominate twice in one day.
    CanNominateTwice,
    /// Appears twice in every vote order.
    CanVoteTwice,
    /// Good alignment.
    Good,
    /// Evil alignment.
    Evil,
    /// Townsfolk character type.
    Townsfolk,
    /// Outsider character type.
    Outsider,
    /// Minion character type.
    Minion,
    /// Demon character type.
    Demon,
    /// Traveler character type.
    Traveler,
    /// Storyteller sentinel.
    Storyteller,
}

impl Status {
    /// Human-readable name used in logs and narration.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Poisoned => "poisoned",
            Self::Drunk => "drunk",
            Self::Dead => "dead",
            Self::NotFunctioning => "not functioning",
            Self::Safe => "safe",
            Self::SafeFromDemon => "safe from the demon",
            Self::Thiefed => "thiefed",
            Self::Bureaucrated => "bureaucrated",
            Self::UsedAbility => "used ability",
            Self::CanDeadVoteWithoutToken => "can dead vote without a token",
            Self::CanNominateWhileDead => "can nominate while dead",
            Self::CanNominateTwice => "can nominate twice",
            Self::CanVoteTwice => "can vote twice",
            Self::Good => "good",
            Self::Evil => "evil",
            Self::Townsfolk => "townsfolk",
            Self::Outsider => "outsider",
            Self::Minion => "minion",
            Self::Demon => "demon",
            Self::Traveler => "traveler",
            Self::Storyteller => "storyteller",
        }
    }
}

// ---------------------------------------------------------------------------
// Character types and alignment
// ---------------------------------------------------------------------------

/// The category a character belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CharacterType {
    /// Good information and protection roles.
    Townsfolk,
    /// Good roles with a drawback.
    Outsider,
    /// Evil helpers of the demon.
    Minion,
    /// The evil killer.
    Demon,
    /// Players who join or leave mid-game.
    Traveler,
    /// The storyteller sentinel.
    Storyteller,
}

impl CharacterType {
    /// All types in status-search order.
    pub const ALL: [Self; 6] = [
        Self::Townsfolk,
        Self::Outsider,
        Self::Minion,
        Self::Demon,
        Self::Traveler,
        Self::Storyteller,
    ];

    /// The status asserting membership in this type.
    pub const fn status(self) -> Status {
        match self {
            Self::Townsfolk => Status::Townsfolk,
            Self::Outsider => Status::Outsider,
            Self::Minion => Status::Minion,
            Self::Demon => Status::Demon,
            Self::Traveler => Status::Traveler,
            Self::Storyteller => Status::Storyteller,
        }
    }
}

/// A player's team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Alignment {
    /// The good team.
    Good,
    /// The evil team.
    Evil,
}

impl Alignment {
    /// The status asserting this alignment.
    pub const fn status(self) -> Status {
        match self {
            Self::Good => Status::Good,
            Self::Evil => Status::Evil,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Winner declared when a game ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Winner {
    /// The good team won.
    Good,
    /// The evil team won.
    Evil,
    /// The game was abandoned without a winner.
    Neutral,
}

/// What happened when a player was executed or exiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ExecutionOutcome {
    /// The player died.
    Died,
    /// The player was already dead.
    AlreadyDead,
    /// A protection kept the player alive.
    Survived,
}
