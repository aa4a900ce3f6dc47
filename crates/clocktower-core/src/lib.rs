//! Game-state engine for Blood on the Clocktower.
//!
//! The engine keeps the authoritative state of one game: seating, characters,
//! effects, nights, days, nominations and votes. It never talks to a chat
//! platform. Operations return typed results, push [`Announcement`]s onto a
//! queue and expect their human input as [`Reply`] values.
//!
//! # Modules
//!
//! - [`ability`] -- Generic resolvers for character abilities.
//! - [`announce`] -- Typed announcements and their audiences.
//! - [`character`] -- The character roster, ability shapes and guards.
//! - [`config`] -- Configuration loading from `clocktower-config.yaml`.
//! - [`day`] -- PM and nomination windows, nominations, end of day.
//! - [`effect`] -- Effects, policies and source cascades.
//! - [`error`] -- [`GameError`].
//! - [`game`] -- The [`Game`] aggregate.
//! - [`narrate`] -- Plain-text rendering through a [`PreferencesStore`].
//! - [`night`] -- The night state machine.
//! - [`player`] -- Players, status derivation and single-player operations.
//! - [`prefs`] -- The [`PreferencesStore`] lookup and an in-memory store.
//! - [`prompt`] -- [`Reply`] and [`Selection`].
//! - [`script`] -- Scripts and night orders.
//! - [`snapshot`] -- JSON snapshots.
//! - [`tools`] -- Text helpers and the default distribution.
//! - [`vote`] -- Votes, prevotes and results.
//!
//! [`Announcement`]: announce::Announcement
//! [`Reply`]: prompt::Reply
//! [`Selection`]: prompt::Selection
//! [`GameError`]: error::GameError
//! [`Game`]: game::Game
//! [`PreferencesStore`]: prefs::PreferencesStore

pub mod ability;
pub mod announce;
pub mod character;
pub mod config;
pub mod day;
pub mod effect;
pub mod error;
pub mod game;
pub mod narrate;
pub mod night;
pub mod player;
pub mod prefs;
pub mod prompt;
pub mod script;
pub mod snapshot;
pub mod tools;
pub mod vote;

pub use announce::{Announcement, Audience, Notice};
pub use character::Character;
pub use config::{ClocktowerConfig, ConfigError, RulesConfig};
pub use effect::{Cleanup, Effect, EffectKind, EffectPolicy};
pub use error::GameError;
pub use game::{Game, Seat};
pub use narrate::Narrator;
pub use night::{NightCall, NightProgress, NightStep};
pub use prefs::{MemoryPreferences, PreferencesStore, Pronouns};
pub use prompt::{Reply, Selection};
pub use script::Script;
