//! Shared type definitions for the Clocktower game engine.
//!
//! Identifiers and closed enumerations used by the engine and by whatever
//! chat front end drives it. Types here flow to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Engine-minted UUID ids and opaque platform handles
//! - [`enums`] -- Statuses, character types, alignments and outcomes

pub mod enums;
pub mod ids;

pub use enums::{Alignment, CharacterType, ExecutionOutcome, Status, Winner};
pub use ids::{EffectId, GameId, MessageRef, PlayerId};
