//! Votes: voter order, majority, tallying and results.
//!
//! A vote walks the seating clockwise starting after the nominee. Players
//! who cannot vote, and players with a queued prevote, are handled without
//! waiting; the vote then stops on the next player who has to answer.

use std::collections::BTreeMap;

use clocktower_types::{CharacterType, MessageRef, PlayerId, Status};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::announce::{Announcement, Notice};
use crate::day::AboutToDie;
use crate::error::GameError;
use crate::game::Game;
use crate::player::Player;
use crate::prompt::Reply;

/// A vote on one nominee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub(crate) nominee: PlayerId,
    pub(crate) nominator: PlayerId,
    pub(crate) order: Vec<PlayerId>,
    pub(crate) position: usize,
    pub(crate) votes: i32,
    pub(crate) voted: Vec<PlayerId>,
    /// Twice the majority, so half-vote majorities stay exact.
    pub(crate) majority_halves: u32,
    pub(crate) prevotes: BTreeMap<PlayerId, bool>,
    pub(crate) traveler: bool,
    pub(crate) storyteller: bool,
    pub(crate) counted_nomination: bool,
    pub(crate) announcements: Vec<MessageRef>,
    pub(crate) passed: Option<bool>,
}

impl Vote {
    pub(crate) fn new(game: &Game, nominee: PlayerId, nominator: PlayerId, counted: bool) -> Self {
        let storyteller = game.is_storyteller(nominee);
        let traveler = game
            .player(nominee)
            .is_some_and(|p| p.character().character_type() == CharacterType::Traveler);

        let seating: Vec<PlayerId> = game.seating().iter().map(Player::id).collect();
        let base = match seating.iter().position(|id| *id == nominee) {
            Some(index) if !storyteller => {
                let split = index.saturating_add(1);
                let mut rotated = seating.get(split..).unwrap_or_default().to_vec();
                rotated.extend_from_slice(seating.get(..split).unwrap_or_default());
                rotated
            }
            _ => seating,
        };

        let mut majority_halves = if traveler {
            count(base.len())
        } else {
            count(base.iter().filter(|id| !game.registers(**id, Status::Dead)).count())
        };
        if !traveler {
            let leader = game.current_day().and_then(|day| day.about_to_die());
            if let Some(AboutToDie { votes, .. }) = leader {
                let floor = i64::from(*votes).saturating_add(1).saturating_mul(2);
                if floor > i64::from(majority_halves) {
                    majority_halves = u32::try_from(floor).unwrap_or(majority_halves);
                }
            }
        }

        let mut order = Vec::with_capacity(base.len());
        for id in base {
            if game.is_status(id, Status::CanVoteTwice) {
                order.push(id);
            }
            order.push(id);
        }

        Self {
            nominee,
            nominator,
            order,
            position: 0,
            votes: 0,
            voted: Vec::new(),
            majority_halves,
            prevotes: BTreeMap::new(),
            traveler,
            storyteller,
            counted_nomination: counted,
            announcements: Vec::new(),
            passed: None,
        }
    }

    /// The nominee.
    pub const fn nominee(&self) -> PlayerId {
        self.nominee
    }

    /// The nominator.
    pub const fn nominator(&self) -> PlayerId {
        self.nominator
    }

    /// Voters in order. Double voters appear twice in a row.
    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    /// Index of the next voter.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Current tally.
    pub const fn votes(&self) -> i32 {
        self.votes
    }

    /// Players who voted yes, once per yes.
    pub fn voted(&self) -> &[PlayerId] {
        &self.voted
    }

    /// Votes needed, possibly a half.
    pub fn majority(&self) -> f64 {
        f64::from(self.majority_halves) / 2.0
    }

    /// Smallest whole number of votes that reaches the majority.
    pub const fn needed(&self) -> u32 {
        self.majority_halves.div_ceil(2)
    }

    /// Whose turn it is, if anyone's.
    pub fn to_vote(&self) -> Option<PlayerId> {
        self.order.get(self.position).copied()
    }

    /// Whether this is an exile vote on a traveler.
    pub const fn is_traveler(&self) -> bool {
        self.traveler
    }

    /// Whether the nominee is the storyteller.
    pub const fn is_storyteller(&self) -> bool {
        self.storyteller
    }

    /// Queued prevotes.
    pub const fn prevotes(&self) -> &BTreeMap<PlayerId, bool> {
        &self.prevotes
    }

    /// Collaborator messages tied to this vote.
    pub fn announcements(&self) -> &[MessageRef] {
        &self.announcements
    }

    /// The result, once the vote is over.
    pub const fn passed(&self) -> Option<bool> {
        self.passed
    }

    fn reaches_majority(&self) -> bool {
        i64::from(self.votes).saturating_mul(2) >= i64::from(self.majority_halves)
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// What [`Game::prevote`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrevoteOutcome {
    /// It is already the voter's turn; confirm with
    /// [`Game::confirm_prevote`].
    ConfirmNow,
    /// Queued for when the vote reaches the voter.
    Queued,
}

impl Game {
    fn running_vote(&self) -> Result<&Vote, GameError> {
        self.current_day
            .as_ref()
            .ok_or(GameError::NoCurrentDay)?
            .current_vote
            .as_ref()
            .ok_or(GameError::NoOngoingVote)
    }

    fn running_vote_mut(&mut self) -> Result<&mut Vote, GameError> {
        self.current_day
            .as_mut()
            .ok_or(GameError::NoCurrentDay)?
            .current_vote
            .as_mut()
            .ok_or(GameError::NoOngoingVote)
    }

    /// Cast `voter`'s vote. Only the voter whose turn it is may vote.
    pub fn vote(&mut self, voter: PlayerId, yes: bool) -> Result<(), GameError> {
        self.ensure_running()?;
        let expected = self
            .running_vote()?
            .to_vote()
            .ok_or(GameError::NoOngoingVote)?;
        if expected != voter {
            return Err(GameError::NotYourTurn {
                expected,
                actual: voter,
            });
        }
        self.cast(yes);
        self.advance_vote();
        Ok(())
    }

    /// Record a vote for the current voter and move on.
    fn cast(&mut self, yes: bool) {
        let Ok(vote) = self.running_vote() else {
            return;
        };
        let Some(voter) = vote.to_vote() else {
            return;
        };
        let traveler = vote.traveler;
        let (value, spends_token) = match self.player(voter) {
            Some(p) if yes => (
                p.vote_value(self, traveler),
                !traveler
                    && p.ghost(self, true)
                    && !p.is_status(self, Status::CanDeadVoteWithoutToken, false),
            ),
            _ => (0, false),
        };
        if spends_token {
            if let Some(p) = self.player_mut(voter) {
                p.dead_votes = p.dead_votes.saturating_sub(1);
            }
        }
        let Ok(vote) = self.running_vote_mut() else {
            return;
        };
        vote.position = vote.position.saturating_add(1);
        if yes {
            vote.votes = vote.votes.saturating_add(value);
            vote.voted.push(voter);
        }
        let votes = vote.votes;
        debug!(voter = %voter, yes, votes, "vote cast");
        self.announce(Announcement::public(Notice::VoteCast { voter, yes, votes }));
    }

    /// Handle every voter that needs no answer, then either call the next
    /// voter or end the vote.
    pub(crate) fn advance_vote(&mut self) {
        loop {
            let Ok(vote) = self.running_vote() else {
                return;
            };
            let Some(voter) = vote.to_vote() else {
                self.end_vote();
                return;
            };
            let nominee = vote.nominee;
            let traveler = vote.traveler;
            let prevote = vote.prevotes.get(&voter).copied();
            let able = self.player(voter).is_some_and(|p| p.can_vote(self, traveler));
            if !able {
                self.announce(Announcement::to_player(voter, Notice::NoDeadVotes { voter }));
                self.cast(false);
                continue;
            }
            if let Some(yes) = prevote {
                self.cast(yes);
                continue;
            }
            self.announce(Announcement::public(Notice::VoteCalled { voter, nominee }));
            return;
        }
    }

    fn end_vote(&mut self) {
        let Some(day) = self.current_day.as_mut() else {
            return;
        };
        let Some(mut vote) = day.current_vote.take() else {
            return;
        };
        let passed = vote.reaches_majority();
        vote.passed = Some(passed);
        let nominee = vote.nominee;
        let nominator = vote.nominator;
        let votes = vote.votes;
        let traveler = vote.traveler;
        let voted = vote.voted.clone();
        let unpin = vote.announcements.clone();
        day.past_votes.push(vote);

        info!(nominee = %nominee, votes, passed, exile = traveler, "vote ended");
        self.announce(Announcement::public(Notice::VoteEnded {
            nominee,
            nominator,
            votes,
            voted,
            passed,
            exile: traveler,
        }));

        if traveler {
            if passed {
                let outcome = self.kill_by_execution(nominee);
                self.announce(Announcement::public(Notice::Exiled {
                    player: nominee,
                    outcome,
                }));
            }
        } else {
            self.settle_leader(nominee, votes, passed);
        }

        self.reopen_windows();
        if !unpin.is_empty() {
            self.announce(Announcement::public(Notice::Unpin { messages: unpin }));
        }
    }

    /// Update the leading execution candidate after a vote.
    fn settle_leader(&mut self, nominee: PlayerId, votes: i32, passed: bool) {
        let Some(day) = self.current_day.as_mut() else {
            return;
        };
        let previous = day.about_to_die;
        let tied = previous.is_some_and(|atd| atd.votes == votes);
        if passed {
            day.about_to_die = Some(AboutToDie {
                player: nominee,
                votes,
                announcement: None,
            });
        } else if tied {
            day.about_to_die = None;
        }
        if let Some(atd) = previous.filter(|_| passed || tied) {
            self.announce(Announcement::public(Notice::LeaderSpared {
                player: atd.player,
                message: atd.announcement,
            }));
        }
    }

    fn reopen_windows(&mut self) {
        if let Some(day) = self.current_day.as_mut() {
            day.is_pms = true;
            day.is_noms = true;
        }
        self.announce(Announcement::public(Notice::PmsOpened));
        self.announce(Announcement::public(Notice::NominationsOpened));
    }

    /// Cancel the running vote, undoing the nomination it came from.
    pub fn cancel_vote(&mut self) -> Result<(), GameError> {
        self.ensure_running()?;
        self.running_vote()?;
        self.drop_vote();
        Ok(())
    }

    /// Cancel the running vote if there is one.
    pub(crate) fn drop_vote(&mut self) {
        let Some(vote) = self
            .current_day
            .as_mut()
            .and_then(|day| day.current_vote.take())
        else {
            return;
        };
        info!(nominee = %vote.nominee, "vote cancelled");
        self.announce(Announcement::public(Notice::NominationCancelled));
        self.reopen_windows();
        if vote.counted_nomination {
            if let Some(p) = self.player_mut(vote.nominator) {
                p.nominations_today = p.nominations_today.saturating_sub(1);
            }
        }
        self.mark_nominated(vote.nominee, vote.storyteller, false);
        if !vote.announcements.is_empty() {
            self.announce(Announcement::public(Notice::Unpin {
                messages: vote.announcements,
            }));
        }
    }

    /// Queue a vote for when the vote reaches `voter`.
    pub fn prevote(&mut self, voter: PlayerId, yes: bool) -> Result<PrevoteOutcome, GameError> {
        self.ensure_running()?;
        let vote = self.running_vote()?;
        if vote.to_vote() == Some(voter) {
            return Ok(PrevoteOutcome::ConfirmNow);
        }
        let upcoming = vote
            .order
            .get(vote.position..)
            .unwrap_or_default()
            .contains(&voter);
        if !upcoming {
            return Err(if vote.order.contains(&voter) {
                GameError::AlreadyVoted { player: voter }
            } else {
                GameError::invalid(format!("{voter} is not in this vote"))
            });
        }
        self.running_vote_mut()?.prevotes.insert(voter, yes);
        debug!(voter = %voter, yes, "prevote queued");
        Ok(PrevoteOutcome::Queued)
    }

    /// Confirm a prevote made on the voter's own turn. Returns whether the
    /// vote was cast.
    pub fn confirm_prevote(
        &mut self,
        voter: PlayerId,
        yes: bool,
        confirmation: Reply<bool>,
    ) -> Result<bool, GameError> {
        if !confirmation.into_answer("vote confirmation")? {
            return Ok(false);
        }
        self.vote(voter, yes)?;
        Ok(true)
    }

    /// Tie a collaborator message to the running vote so it is unpinned
    /// when the vote ends.
    pub fn record_vote_announcement(&mut self, message: MessageRef) -> Result<(), GameError> {
        self.running_vote_mut()?.announcements.push(message);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clocktower_types::Winner;

    use super::*;
    use crate::character::Character;
    use crate::effect::{EffectKind, EffectPolicy};
    use crate::prefs::MemoryPreferences;
    use crate::testing::{finish_first_night, game_with, id};

    fn nominated(characters: &[Character], nominee: &str, nominator: PlayerId) -> Game {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(characters);
        finish_first_night(&mut game);
        game.open_noms().unwrap();
        game.nominate(nominee, nominator, &prefs).unwrap();
        game
    }

    fn current(game: &Game) -> &Vote {
        game.current_day().unwrap().current_vote().unwrap()
    }

    const SEVEN: [Character; 7] = [
        Character::Chef,
        Character::Empath,
        Character::Imp,
        Character::Monk,
        Character::Soldier,
        Character::Poisoner,
        Character::Mayor,
    ];

    #[test]
    fn order_starts_after_the_nominee() {
        let game = nominated(&SEVEN, "player 3", id(1));
        let vote = current(&game);
        assert_eq!(vote.order(), &[id(4), id(5), id(6), id(7), id(1), id(2), id(3)]);
        assert_eq!(vote.to_vote(), Some(id(4)));
        assert!((vote.majority() - 3.5).abs() < f64::EPSILON);
        assert_eq!(vote.needed(), 4);
    }

    #[test]
    fn majority_counts_only_the_living() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&SEVEN[..6]);
        finish_first_night(&mut game);
        game.add_effect(id(6), EffectKind::Dead, EffectPolicy::permanent(), id(6))
            .unwrap();
        game.open_noms().unwrap();
        game.nominate("player 3", id(1), &prefs).unwrap();
        assert!((current(&game).majority() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn only_the_current_voter_may_vote() {
        let mut game = nominated(&SEVEN, "player 3", id(1));
        assert!(matches!(
            game.vote(id(1), true),
            Err(GameError::NotYourTurn { expected, actual }) if expected == id(4) && actual == id(1)
        ));
        game.vote(id(4), true).unwrap();
        assert_eq!(current(&game).votes(), 1);
        assert_eq!(current(&game).voted(), &[id(4)]);
    }

    #[test]
    fn passing_vote_sets_the_leader_and_a_tie_clears_it() {
        let mut game = nominated(&SEVEN, "player 3", id(1));
        for n in [4, 5, 6, 7] {
            game.vote(id(n), true).unwrap();
        }
        for n in [1, 2, 3] {
            game.vote(id(n), false).unwrap();
        }
        let day = game.current_day().unwrap();
        assert!(day.current_vote().is_none());
        assert_eq!(day.past_votes().first().unwrap().passed(), Some(true));
        assert_eq!(day.about_to_die().unwrap().player, id(3));
        assert_eq!(day.about_to_die().unwrap().votes, 4);

        let prefs = MemoryPreferences::default();
        game.nominate("player 5", id(2), &prefs).unwrap();
        // The leader's tally raises the bar to five.
        assert!((current(&game).majority() - 5.0).abs() < f64::EPSILON);
        let order = current(&game).order().to_vec();
        for (i, voter) in order.into_iter().enumerate() {
            game.vote(voter, i < 4).unwrap();
        }
        let day = game.current_day().unwrap();
        assert_eq!(day.past_votes().get(1).unwrap().passed(), Some(false));
        assert!(day.about_to_die().is_none());
        assert!(
            game.take_announcements()
                .iter()
                .any(|a| matches!(a.notice, Notice::LeaderSpared { player, .. } if player == id(3)))
        );
    }

    #[test]
    fn dead_players_without_tokens_vote_no_automatically() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.add_effect(id(3), EffectKind::Dead, EffectPolicy::permanent(), id(3))
            .unwrap();
        game.player_mut(id(3)).unwrap().dead_votes = 0;
        game.open_noms().unwrap();
        game.nominate("player 2", id(1), &prefs).unwrap();
        // Player 3 is first and skipped straight away.
        let vote = current(&game);
        assert_eq!(vote.position(), 1);
        assert_eq!(vote.to_vote(), Some(id(1)));
        assert!(
            game.take_announcements()
                .iter()
                .any(|a| a.notice == Notice::NoDeadVotes { voter: id(3) })
        );
    }

    #[test]
    fn dead_voters_spend_their_token() {
        let mut game = nominated(
            &[Character::Chef, Character::Imp, Character::Empath],
            "player 2",
            id(1),
        );
        game.add_effect(id(3), EffectKind::Dead, EffectPolicy::permanent(), id(3))
            .unwrap();
        assert_eq!(game.player(id(3)).unwrap().dead_votes(), 1);
        game.vote(id(3), true).unwrap();
        assert_eq!(game.player(id(3)).unwrap().dead_votes(), 0);
        assert_eq!(current(&game).votes(), 1);
    }

    #[test]
    fn prevotes_apply_when_the_vote_arrives() {
        let mut game = nominated(&SEVEN, "player 3", id(1));
        assert_eq!(game.prevote(id(6), true).unwrap(), PrevoteOutcome::Queued);
        assert_eq!(game.prevote(id(4), true).unwrap(), PrevoteOutcome::ConfirmNow);
        assert!(!game.confirm_prevote(id(4), true, Reply::Answer(false)).unwrap());
        assert!(game.confirm_prevote(id(4), true, Reply::Answer(true)).unwrap());
        game.vote(id(5), false).unwrap();
        let vote = current(&game);
        assert_eq!(vote.to_vote(), Some(id(7)));
        assert_eq!(vote.voted(), &[id(4), id(6)]);
        assert!(matches!(
            game.prevote(id(4), false),
            Err(GameError::AlreadyVoted { .. })
        ));
        assert!(matches!(
            game.confirm_prevote(id(7), true, Reply::Cancelled),
            Err(GameError::Cancelled { .. })
        ));
    }

    #[test]
    fn thiefed_and_bureaucrated_votes_scale() {
        let mut game = nominated(&SEVEN, "player 3", id(1));
        game.add_effect(id(4), EffectKind::Thiefed, EffectPolicy::permanent(), id(1))
            .unwrap();
        game.add_effect(id(5), EffectKind::Bureaucrated, EffectPolicy::permanent(), id(1))
            .unwrap();
        game.vote(id(4), true).unwrap();
        assert_eq!(current(&game).votes(), -1);
        game.vote(id(5), true).unwrap();
        assert_eq!(current(&game).votes(), -4);
    }

    #[test]
    fn double_voters_appear_twice() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.add_effect(id(1), EffectKind::VoteTwice, EffectPolicy::permanent(), id(1))
            .unwrap();
        game.open_noms().unwrap();
        game.nominate("player 2", id(1), &prefs).unwrap();
        assert_eq!(current(&game).order(), &[id(3), id(1), id(1), id(2)]);
    }

    #[test]
    fn traveler_exile_counts_everyone_and_exiles() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.add_traveler(
            id(9),
            "player 9",
            Character::Gunslinger,
            id(3),
            clocktower_types::Alignment::Good,
        )
        .unwrap();
        game.add_effect(id(1), EffectKind::Dead, EffectPolicy::permanent(), id(1))
            .unwrap();
        game.player_mut(id(1)).unwrap().dead_votes = 0;
        game.open_noms().unwrap();
        game.nominate("player 9", id(1), &prefs).unwrap();
        let vote = current(&game);
        assert!(vote.is_traveler());
        assert!((vote.majority() - 2.0).abs() < f64::EPSILON);
        assert_eq!(vote.order(), &[id(1), id(2), id(3), id(9)]);
        for voter in [id(1), id(2), id(3), id(9)] {
            game.vote(voter, voter != id(9)).unwrap();
        }
        assert!(game.ghost(id(9)));
        assert!(game.current_day().unwrap().about_to_die().is_none());
        // Dead nominators may nominate travelers, and it costs no nomination.
        assert_eq!(game.player(id(1)).unwrap().nominations_today(), 0);
    }

    #[test]
    fn cancelling_restores_the_nomination() {
        let mut game = nominated(&SEVEN, "player 3", id(1));
        game.record_vote_announcement(MessageRef(77)).unwrap();
        game.take_announcements();
        game.cancel_vote().unwrap();
        assert_eq!(game.player(id(1)).unwrap().nominations_today(), 0);
        assert!(!game.player(id(3)).unwrap().has_been_nominated());
        assert!(
            game.take_announcements()
                .iter()
                .any(|a| a.notice == Notice::Unpin { messages: vec![MessageRef(77)] })
        );
        assert!(matches!(game.vote(id(4), true), Err(GameError::NoOngoingVote)));
        assert!(matches!(game.cancel_vote(), Err(GameError::NoOngoingVote)));
    }

    #[test]
    fn cancelling_needs_a_running_game_and_day() {
        let mut game = game_with(&[Character::Chef, Character::Imp]);
        assert!(matches!(game.cancel_vote(), Err(GameError::NoCurrentDay)));
        let mut game = nominated(&SEVEN, "player 3", id(1));
        game.end_game(Winner::Good).unwrap();
        assert!(matches!(game.cancel_vote(), Err(GameError::GameOver)));
        assert!(matches!(
            game.record_about_to_die_message(MessageRef(5)),
            Err(GameError::GameOver)
        ));
    }
}
