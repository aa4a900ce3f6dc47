//! The day: PM and nomination windows, nominations, and the end of day.

use clocktower_types::{CharacterType, EffectId, MessageRef, PlayerId, Status};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::announce::{Announcement, Notice};
use crate::character::Character;
use crate::effect::Cleanup;
use crate::error::GameError;
use crate::game::Game;
use crate::player::Player;
use crate::prefs::PreferencesStore;
use crate::vote::Vote;

/// The leading execution candidate of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutToDie {
    /// The player.
    pub player: PlayerId,
    /// Yes votes they received.
    pub votes: i32,
    /// The result message announcing it, once the collaborator posts one.
    pub announcement: Option<MessageRef>,
}

/// Result of a nomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nomination {
    /// A vote began on the nominee.
    Started {
        /// The nominee.
        nominee: PlayerId,
    },
    /// A nomination hook vetoed the vote.
    Vetoed {
        /// The nominee.
        nominee: PlayerId,
    },
}

/// State of a day in progress (or archived).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub(crate) is_pms: bool,
    pub(crate) is_noms: bool,
    pub(crate) past_votes: Vec<Vote>,
    pub(crate) current_vote: Option<Vote>,
    pub(crate) about_to_die: Option<AboutToDie>,
}

impl Day {
    pub(crate) const fn new() -> Self {
        Self {
            is_pms: true,
            is_noms: false,
            past_votes: Vec::new(),
            current_vote: None,
            about_to_die: None,
        }
    }

    /// Whether PMs are open.
    pub const fn is_pms(&self) -> bool {
        self.is_pms
    }

    /// Whether nominations are open.
    pub const fn is_noms(&self) -> bool {
        self.is_noms
    }

    /// Finished votes, oldest first.
    pub fn past_votes(&self) -> &[Vote] {
        &self.past_votes
    }

    /// The running vote.
    pub const fn current_vote(&self) -> Option<&Vote> {
        self.current_vote.as_ref()
    }

    /// The leading execution candidate.
    pub const fn about_to_die(&self) -> Option<&AboutToDie> {
        self.about_to_die.as_ref()
    }
}

/// The four window flags of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Pms(bool),
    Noms(bool),
}

impl Game {
    /// Open private messages.
    pub fn open_pms(&mut self) -> Result<(), GameError> {
        self.set_window(Window::Pms(true))
    }

    /// Close private messages.
    pub fn close_pms(&mut self) -> Result<(), GameError> {
        self.set_window(Window::Pms(false))
    }

    /// Open nominations.
    pub fn open_noms(&mut self) -> Result<(), GameError> {
        self.set_window(Window::Noms(true))
    }

    /// Close nominations.
    pub fn close_noms(&mut self) -> Result<(), GameError> {
        self.set_window(Window::Noms(false))
    }

    fn set_window(&mut self, window: Window) -> Result<(), GameError> {
        self.ensure_running()?;
        let day = self.current_day.as_mut().ok_or(GameError::NoCurrentDay)?;
        let notice = match window {
            Window::Pms(open) => {
                day.is_pms = open;
                if open { Notice::PmsOpened } else { Notice::PmsClosed }
            }
            Window::Noms(open) => {
                day.is_noms = open;
                if open {
                    Notice::NominationsOpened
                } else {
                    Notice::NominationsClosed
                }
            }
        };
        self.announce(Announcement::public(notice));
        Ok(())
    }

    /// Nominate the player named by `nominee`.
    ///
    /// Every seated player's character and every effect gets a say through
    /// its nomination hook. All hooks run even after one vetoes, so their
    /// side effects always happen; the vote starts only if none vetoed.
    /// Storyteller nominators bypass the nominator checks and closed
    /// nominations.
    #[allow(clippy::too_many_lines)]
    pub fn nominate(
        &mut self,
        nominee: &str,
        nominator: PlayerId,
        prefs: &dyn PreferencesStore,
    ) -> Result<Nomination, GameError> {
        self.ensure_running()?;
        let day = self.current_day.as_ref().ok_or(GameError::NoCurrentDay)?;
        if day.current_vote.is_some() {
            return Err(GameError::VoteInProgress);
        }
        let by_storyteller = self.is_storyteller(nominator);
        if !by_storyteller {
            self.seated(nominator)?;
            if !day.is_noms {
                return Err(GameError::NominationsClosed);
            }
        }

        let nominee = self.resolve_nominee(nominee, prefs)?;
        let at_storyteller = self.is_storyteller(nominee);
        let at_traveler = self
            .player(nominee)
            .is_some_and(|p| p.character().character_type() == CharacterType::Traveler);

        if !by_storyteller && !at_traveler {
            let nominating = self.seated(nominator)?;
            if !nominating.can_nominate(self) {
                let dead = nominating.ghost(self, true)
                    && !nominating.is_status(self, Status::CanNominateWhileDead, false);
                return Err(if dead {
                    GameError::DeadNominator { player: nominator }
                } else {
                    GameError::AlreadyNominated { player: nominator }
                });
            }
        }
        let nominee_free = if at_storyteller {
            self.storytellers().iter().all(Player::can_be_nominated)
        } else {
            self.player(nominee).is_some_and(Player::can_be_nominated)
        };
        if !nominee_free {
            return Err(GameError::CannotBeNominated { player: nominee });
        }

        let mut proceed = true;
        let owners: Vec<PlayerId> = self.seating().iter().map(Player::id).collect();
        for owner in owners {
            proceed = self.character_nomination(owner, nominee, nominator) && proceed;
            let effects: Vec<EffectId> = self
                .player(owner)
                .map(|p| p.effects().iter().map(|e| e.id).collect())
                .unwrap_or_default();
            for id in effects {
                if let Some(effect) = self.effect(id) {
                    proceed = effect.nomination(nominee, nominator) && proceed;
                }
            }
        }
        if !proceed || self.current_day.is_none() {
            info!(nominee = %nominee, nominator = %nominator, "nomination vetoed");
            return Ok(Nomination::Vetoed { nominee });
        }

        let counted = !at_storyteller && !at_traveler && !by_storyteller;
        if counted {
            if let Some(p) = self.seated_mut(nominator) {
                p.nominations_today = p.nominations_today.saturating_add(1);
            }
        }
        self.mark_nominated(nominee, at_storyteller, true);

        self.close_pms()?;
        self.close_noms()?;
        let vote = Vote::new(self, nominee, nominator, counted);
        let notice = Notice::Nomination {
            nominator,
            nominee,
            exile: vote.is_traveler(),
            needed: vote.needed(),
            to_tie: self
                .current_day
                .as_ref()
                .and_then(|day| day.about_to_die)
                .filter(|_| !vote.is_traveler())
                .map(|atd| atd.votes),
        };
        info!(
            nominee = %nominee,
            nominator = %nominator,
            majority = vote.majority(),
            voters = vote.order().len(),
            "nomination"
        );
        if let Some(day) = self.current_day.as_mut() {
            day.current_vote = Some(vote);
        }
        self.announce(Announcement::public(notice));
        self.advance_vote();
        Ok(Nomination::Started { nominee })
    }

    pub(crate) fn mark_nominated(&mut self, nominee: PlayerId, storytellers: bool, flag: bool) {
        if storytellers {
            for st in &mut self.storytellers {
                st.has_been_nominated = flag;
            }
        } else if let Some(p) = self.player_mut(nominee) {
            p.has_been_nominated = flag;
        }
    }

    fn resolve_nominee(
        &self,
        query: &str,
        prefs: &dyn PreferencesStore,
    ) -> Result<PlayerId, GameError> {
        if query.to_lowercase().contains("storyteller") && self.script().has(Character::Atheist) {
            return self
                .storytellers()
                .first()
                .map(Player::id)
                .ok_or_else(|| GameError::PlayerNotFound {
                    query: query.to_owned(),
                });
        }
        self.find_player(query, prefs)
    }

    /// End the day. A running vote is cancelled first.
    pub fn end_day(&mut self) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.current_day.is_none() {
            return Err(GameError::NoCurrentDay);
        }
        self.finish_day(false);
        Ok(())
    }

    /// End the day announcing that nobody was executed.
    pub fn announce_no_execution(&mut self) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.current_day.is_none() {
            return Err(GameError::NoCurrentDay);
        }
        self.announce(Announcement::public(Notice::NoExecution));
        self.finish_day(false);
        Ok(())
    }

    /// Record the collaborator's message announcing the current leader.
    pub fn record_about_to_die_message(&mut self, message: MessageRef) -> Result<(), GameError> {
        self.ensure_running()?;
        let day = self.current_day.as_mut().ok_or(GameError::NoCurrentDay)?;
        let leader = day
            .about_to_die
            .as_mut()
            .ok_or_else(|| GameError::invalid("nobody is about to die"))?;
        leader.announcement = Some(message);
        Ok(())
    }

    pub(crate) fn finish_day(&mut self, executed: bool) {
        self.drop_vote();
        let owners: Vec<PlayerId> = self.seating().iter().map(Player::id).collect();
        for owner in owners {
            self.character_evening(owner, executed);
        }
        self.run_cleanup(Cleanup::Evening);
        if let Some(day) = self.current_day.take() {
            info!(day = self.past_days.len().saturating_add(1), votes = day.past_votes.len(), "day ends");
            self.past_days.push(day);
        }
        self.announce(Announcement::public(Notice::GoToSleep));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::effect::{EffectKind, EffectPolicy};
    use crate::prefs::MemoryPreferences;
    use crate::prompt::{Reply, Selection};
    use crate::testing::{finish_first_night, game_with, id, storyteller};

    #[test]
    fn windows_need_a_day() {
        let mut game = game_with(&[Character::Chef, Character::Imp]);
        assert!(matches!(game.open_noms(), Err(GameError::NoCurrentDay)));
        finish_first_night(&mut game);
        let day = game.current_day().unwrap();
        assert!(day.is_pms());
        assert!(!day.is_noms());
        game.open_noms().unwrap();
        game.close_pms().unwrap();
        let day = game.current_day().unwrap();
        assert!(day.is_noms());
        assert!(!day.is_pms());
    }

    #[test]
    fn nominations_need_open_noms_unless_storyteller() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        assert!(matches!(
            game.nominate("player 2", id(1), &prefs),
            Err(GameError::NominationsClosed)
        ));
        let started = game.nominate("player 2", storyteller(), &prefs).unwrap();
        assert_eq!(started, Nomination::Started { nominee: id(2) });
        assert_eq!(game.player(storyteller()).unwrap().nominations_today(), 0);
    }

    #[test]
    fn one_nomination_each_and_once_each() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.open_noms().unwrap();
        game.nominate("player 2", id(1), &prefs).unwrap();
        assert!(matches!(
            game.nominate("player 3", id(1), &prefs),
            Err(GameError::VoteInProgress)
        ));
        for voter in [id(3), id(1), id(2)] {
            game.vote(voter, false).unwrap();
        }
        game.open_noms().unwrap();
        assert!(matches!(
            game.nominate("player 3", id(1), &prefs),
            Err(GameError::AlreadyNominated { .. })
        ));
        assert!(matches!(
            game.nominate("player 2", id(3), &prefs),
            Err(GameError::CannotBeNominated { .. })
        ));
    }

    #[test]
    fn dead_nominators_are_told_so() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.add_effect(id(1), EffectKind::Dead, EffectPolicy::permanent(), id(2))
            .unwrap();
        game.open_noms().unwrap();
        assert!(matches!(
            game.nominate("player 2", id(1), &prefs),
            Err(GameError::DeadNominator { .. })
        ));
        assert!(matches!(
            game.nominate("nobody", id(3), &prefs),
            Err(GameError::PlayerNotFound { .. })
        ));
        assert!(matches!(
            game.nominate("player", id(3), &prefs),
            Err(GameError::AmbiguousPlayer { .. })
        ));
    }

    #[test]
    fn storyteller_nomination_needs_the_atheist() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&[Character::Atheist, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.open_noms().unwrap();
        // Not on the script: falls back to name search.
        assert!(matches!(
            game.nominate("the storyteller", id(1), &prefs),
            Err(GameError::PlayerNotFound { .. })
        ));

        let mut script = game.script().clone();
        script.characters.push(Character::Atheist);
        let mut game = crate::testing::game_with_script(
            &[Character::Atheist, Character::Imp, Character::Empath],
            script,
        );
        finish_first_night(&mut game);
        game.open_noms().unwrap();
        let started = game.nominate("storyteller", id(1), &prefs).unwrap();
        assert_eq!(started, Nomination::Started {
            nominee: storyteller()
        });
        let vote = game.current_day().unwrap().current_vote().unwrap();
        assert!(vote.is_storyteller());
        assert_eq!(vote.order(), &[id(1), id(2), id(3)]);
        assert!(game.player(storyteller()).unwrap().has_been_nominated());
        assert_eq!(game.player(id(1)).unwrap().nominations_today(), 0);
    }

    #[test]
    fn the_storyteller_can_be_nominated_again_the_next_day() {
        let prefs = MemoryPreferences::default();
        let mut script = crate::script::Script::trouble_brewing();
        script.characters.push(Character::Atheist);
        let mut game = crate::testing::game_with_script(
            &[Character::Atheist, Character::Imp, Character::Empath],
            script,
        );
        finish_first_night(&mut game);
        game.open_noms().unwrap();
        game.nominate("storyteller", id(1), &prefs).unwrap();
        for voter in [id(1), id(2), id(3)] {
            game.vote(voter, false).unwrap();
        }
        game.open_noms().unwrap();
        assert!(matches!(
            game.nominate("storyteller", id(2), &prefs),
            Err(GameError::CannotBeNominated { .. })
        ));

        game.end_day().unwrap();
        game.start_night().unwrap();
        while game.current_day().is_none() {
            game.next_step(Reply::Answer(Selection::pass())).unwrap();
        }
        assert!(!game.player(storyteller()).unwrap().has_been_nominated());
        game.open_noms().unwrap();
        let started = game.nominate("storyteller", id(3), &prefs).unwrap();
        assert_eq!(started, Nomination::Started {
            nominee: storyteller()
        });
    }

    #[test]
    fn ending_the_day_cancels_the_vote_and_restores_nomination_state() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.open_noms().unwrap();
        game.nominate("player 2", id(1), &prefs).unwrap();
        game.take_announcements();
        game.end_day().unwrap();
        assert_eq!(game.player(id(1)).unwrap().nominations_today(), 0);
        assert!(!game.player(id(2)).unwrap().has_been_nominated());
        assert!(game.current_day().is_none());
        let notices: Vec<Notice> = game
            .take_announcements()
            .into_iter()
            .map(|a| a.notice)
            .collect();
        assert_eq!(notices.first(), Some(&Notice::NominationCancelled));
        assert_eq!(notices.last(), Some(&Notice::GoToSleep));
    }

    #[test]
    fn the_mayor_is_flagged_at_dusk_with_three_alive_and_no_execution() {
        let mayor_win = |game: &mut Game| {
            game.take_announcements()
                .iter()
                .any(|a| a.notice == Notice::MayorWin { mayor: id(1) })
        };
        let mut game = game_with(&[Character::Mayor, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.take_announcements();
        game.announce_no_execution().unwrap();
        assert!(mayor_win(&mut game));

        let four = [Character::Mayor, Character::Imp, Character::Empath, Character::Chef];
        let mut game = game_with(&four);
        finish_first_night(&mut game);
        game.end_day().unwrap();
        assert!(!mayor_win(&mut game));

        let mut game = game_with(&four);
        finish_first_night(&mut game);
        game.execute(id(4)).unwrap();
        assert!(!mayor_win(&mut game));

        let mut game = game_with(&[Character::Mayor, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.add_effect(id(1), EffectKind::Poisoned, EffectPolicy::permanent(), id(2))
            .unwrap();
        game.end_day().unwrap();
        assert!(!mayor_win(&mut game));
    }

    #[test]
    fn evening_cleanup_runs_when_the_day_ends() {
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Poisoner]);
        finish_first_night(&mut game);
        let poison = game
            .add_effect(
                id(1),
                EffectKind::Poisoned,
                EffectPolicy::ongoing().until_evening(),
                id(3),
            )
            .unwrap();
        game.announce_no_execution().unwrap();
        assert!(game.effect(poison).is_none());
        assert!(
            game.take_announcements()
                .iter()
                .any(|a| a.notice == Notice::NoExecution)
        );
        assert!(matches!(game.end_day(), Err(GameError::NoCurrentDay)));
    }
}
