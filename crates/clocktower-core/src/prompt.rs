//! Answers collected from humans by the command layer.
//!
//! The engine never blocks. When an operation needs a human answer, the
//! caller collects it however it likes and passes it in as a [`Reply`].
//! Cancelled or timed-out replies abort the operation with
//! [`GameError::Cancelled`] before anything is mutated.

use clocktower_types::PlayerId;
use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Outcome of asking a human for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// The human answered.
    Answer(T),
    /// The human issued a cancel.
    Cancelled,
    /// No answer arrived in time.
    TimedOut,
}

impl<T> Reply<T> {
    /// Unwrap the answer or turn the cancellation into an error naming
    /// `prompt`.
    pub fn into_answer(self, prompt: &str) -> Result<T, GameError> {
        match self {
            Self::Answer(value) => Ok(value),
            Self::Cancelled => Err(GameError::Cancelled {
                reason: format!("{prompt} cancelled"),
            }),
            Self::TimedOut => Err(GameError::Cancelled {
                reason: format!("{prompt} timed out"),
            }),
        }
    }
}

/// Players chosen by the storyteller for a night ability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// The main target. `None` passes.
    pub target: Option<PlayerId>,
    /// A second choice some abilities need: the decoy for information
    /// abilities, the new demon on a starpass, the poisoned neighbor.
    pub follow_up: Option<PlayerId>,
}

impl Selection {
    /// Choose nobody.
    pub const fn pass() -> Self {
        Self {
            target: None,
            follow_up: None,
        }
    }

    /// Choose a single player.
    pub const fn target(player: PlayerId) -> Self {
        Self {
            target: Some(player),
            follow_up: None,
        }
    }

    /// Add a second choice.
    pub const fn with_follow_up(self, player: PlayerId) -> Self {
        Self {
            follow_up: Some(player),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_replies_become_errors() {
        let reply: Reply<u8> = Reply::TimedOut;
        let err = reply.into_answer("vote").err();
        assert!(
            matches!(err, Some(GameError::Cancelled { ref reason }) if reason == "vote timed out")
        );
        assert_eq!(Reply::Answer(3).into_answer("vote").ok(), Some(3));
    }

    #[test]
    fn selection_builders() {
        let selection = Selection::target(PlayerId(4)).with_follow_up(PlayerId(5));
        assert_eq!(selection.target, Some(PlayerId(4)));
        assert_eq!(selection.follow_up, Some(PlayerId(5)));
        assert_eq!(Selection::pass(), Selection::default());
    }
}
