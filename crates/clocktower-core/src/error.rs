//! Error types for game operations.
//!
//! Every public mutating operation on [`Game`](crate::game::Game) validates
//! before it commits, so an `Err` always means the game is unchanged. Rule
//! violations get their own variants so the command layer can phrase a
//! specific reply instead of a generic "bad input".

use clocktower_types::PlayerId;

/// Errors returned by game operations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Malformed or inconsistent input.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// No player matched the given id or name.
    #[error("player not found: {query}")]
    PlayerNotFound {
        /// The id or name that was looked up.
        query: String,
    },

    /// A name matched more than one player.
    #[error("\"{query}\" matches more than one player: {}", matches.join(", "))]
    AmbiguousPlayer {
        /// The name that was looked up.
        query: String,
        /// Names of every matching player.
        matches: Vec<String>,
    },

    /// The nominator has used up their nominations today.
    #[error("player {player} has already nominated today")]
    AlreadyNominated {
        /// The would-be nominator.
        player: PlayerId,
    },

    /// The nominator is dead and has no exemption.
    #[error("player {player} is dead and cannot nominate")]
    DeadNominator {
        /// The would-be nominator.
        player: PlayerId,
    },

    /// The nominee has already been nominated today.
    #[error("player {player} cannot be nominated today")]
    CannotBeNominated {
        /// The would-be nominee.
        player: PlayerId,
    },

    /// Nominations are closed.
    #[error("nominations are closed")]
    NominationsClosed,

    /// A vote is already running.
    #[error("a vote is already in progress")]
    VoteInProgress,

    /// The voter's place in the vote order has already passed.
    #[error("player {player} has already voted")]
    AlreadyVoted {
        /// The voter.
        player: PlayerId,
    },

    /// No vote is running.
    #[error("there is no ongoing vote")]
    NoOngoingVote,

    /// Someone other than the current voter tried to vote.
    #[error("it is {expected}'s turn to vote, not {actual}'s")]
    NotYourTurn {
        /// The player whose turn it is.
        expected: PlayerId,
        /// The player who tried to vote.
        actual: PlayerId,
    },

    /// The operation needs a night in progress.
    #[error("it is not currently night")]
    NoCurrentNight,

    /// The operation needs a day in progress.
    #[error("it is not currently day")]
    NoCurrentDay,

    /// A day or night is already running.
    #[error("a day or night is already in progress")]
    PhaseInProgress,

    /// A reseat list does not match the current seating length.
    #[error("unmatched seating order length: expected {expected}, got {actual}")]
    SeatingLengthMismatch {
        /// Current number of seats.
        expected: usize,
        /// Number of seats supplied.
        actual: usize,
    },

    /// The game has already ended.
    #[error("the game is over")]
    GameOver,

    /// The human at the other end cancelled or did not answer in time.
    #[error("cancelled: {reason}")]
    Cancelled {
        /// Why the prompt was abandoned.
        reason: String,
    },

    /// Snapshot serialization or parsing failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

impl GameError {
    /// Shorthand for [`GameError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`GameError::PlayerNotFound`] from an id.
    pub fn missing(player: PlayerId) -> Self {
        Self::PlayerNotFound {
            query: player.to_string(),
        }
    }
}
