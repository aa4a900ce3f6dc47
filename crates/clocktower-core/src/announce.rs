//! Typed announcements produced by game operations.
//!
//! Operations push [`Announcement`]s onto the game's pending queue as side
//! effects happen. The command layer drains them with
//! [`Game::take_announcements`](crate::game::Game::take_announcements),
//! renders them through [`Narrator`](crate::narrate::Narrator) and delivers
//! them. Message references are opaque handles the collaborator hands back.

use clocktower_types::{ExecutionOutcome, MessageRef, PlayerId, Winner};
use serde::{Deserialize, Serialize};

use crate::character::Character;

/// Who should see an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// The whole town.
    Public,
    /// Storytellers only.
    Storytellers,
    /// A single player.
    Player(PlayerId),
}

/// Something that happened, described without presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Notice {
    /// Night has fallen.
    NightFalls,
    /// These players died in the night, in shuffled order.
    Deaths {
        /// The dead, possibly empty.
        players: Vec<PlayerId>,
    },
    /// Everyone should wake up.
    WakeUp,
    /// Everyone should go to sleep.
    GoToSleep,
    /// Private messages opened.
    PmsOpened,
    /// Private messages closed.
    PmsClosed,
    /// Nominations opened.
    NominationsOpened,
    /// Nominations closed.
    NominationsClosed,
    /// A nomination started a vote.
    Nomination {
        /// Who nominated.
        nominator: PlayerId,
        /// Who was nominated.
        nominee: PlayerId,
        /// True for exile votes on travelers.
        exile: bool,
        /// Yes votes needed to pass.
        needed: u32,
        /// Yes votes that would tie the current leader, if any.
        to_tie: Option<i32>,
    },
    /// It is this player's turn to vote.
    VoteCalled {
        /// The voter.
        voter: PlayerId,
        /// The nominee.
        nominee: PlayerId,
    },
    /// The voter was auto-voted no for lack of dead votes.
    NoDeadVotes {
        /// The voter.
        voter: PlayerId,
    },
    /// A vote was cast.
    VoteCast {
        /// The voter.
        voter: PlayerId,
        /// Whether it was a yes.
        yes: bool,
        /// Running tally.
        votes: i32,
    },
    /// A vote finished.
    VoteEnded {
        /// The nominee.
        nominee: PlayerId,
        /// The nominator.
        nominator: PlayerId,
        /// Final tally.
        votes: i32,
        /// Players who voted yes.
        voted: Vec<PlayerId>,
        /// Whether the vote passed.
        passed: bool,
        /// True for exile votes on travelers.
        exile: bool,
    },
    /// The previous leader is no longer about to die; the collaborator edits
    /// the referenced result message.
    LeaderSpared {
        /// The previous leader.
        player: PlayerId,
        /// Their result message, if one was recorded.
        message: Option<MessageRef>,
    },
    /// Pinned vote messages should be unpinned.
    Unpin {
        /// The messages to unpin.
        messages: Vec<MessageRef>,
    },
    /// The running nomination was cancelled.
    NominationCancelled,
    /// A player was executed.
    Executed {
        /// The player.
        player: PlayerId,
        /// What happened to them.
        outcome: ExecutionOutcome,
    },
    /// A traveler was exiled.
    Exiled {
        /// The traveler.
        player: PlayerId,
        /// What happened to them.
        outcome: ExecutionOutcome,
    },
    /// The day ended with nobody executed.
    NoExecution,
    /// A player came back to life.
    Revived {
        /// The player.
        player: PlayerId,
    },
    /// A player's character changed.
    CharacterChanged {
        /// The player.
        player: PlayerId,
        /// Their new character.
        character: Character,
    },
    /// A private message was delivered.
    PrivateMessage {
        /// Sender.
        from: PlayerId,
        /// Recipient.
        to: PlayerId,
        /// Body.
        content: String,
    },
    /// At most one living player has not spoken today.
    SpeakingStatus {
        /// Living players still silent.
        silent: Vec<PlayerId>,
    },
    /// A player chose to skip their nomination.
    Skipped {
        /// The player.
        player: PlayerId,
    },
    /// A traveler joined the town.
    TravelerJoined {
        /// The traveler.
        player: PlayerId,
        /// Their character.
        character: Character,
    },
    /// A traveler left the town.
    TravelerLeft {
        /// The traveler.
        player: PlayerId,
    },
    /// The day ended without an execution with three players alive and a
    /// working Mayor.
    MayorWin {
        /// The Mayor.
        mayor: PlayerId,
    },
    /// The game ended.
    GameEnded {
        /// The winning team.
        winner: Winner,
    },
}

/// A notice addressed to an audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Who should see it.
    pub audience: Audience,
    /// What happened.
    pub notice: Notice,
}

impl Announcement {
    /// Public announcement.
    pub const fn public(notice: Notice) -> Self {
        Self {
            audience: Audience::Public,
            notice,
        }
    }

    /// Storyteller-only announcement.
    pub const fn storytellers(notice: Notice) -> Self {
        Self {
            audience: Audience::Storytellers,
            notice,
        }
    }

    /// Announcement for one player.
    pub const fn to_player(player: PlayerId, notice: Notice) -> Self {
        Self {
            audience: Audience::Player(player),
            notice,
        }
    }
}
