//! The night: stepping through the wake order.
//!
//! A [`Night`] is built once when night falls. Its order is the script's wake
//! list for the night, intersected with the characters of living seated
//! players, plus synthetic steps for minion and demon info on the first night
//! and a dawn marker at the end.
//!
//! The night never blocks. [`Game::current_step`] reports what the storyteller
//! must do now, moving past steps with nothing to do. [`Game::next_step`]
//! resolves the current step with the storyteller's selection and moves on.
//! When the index passes the end, the night is archived and a day begins.

use clocktower_types::{CharacterType, PlayerId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ability::AbilityError;
use crate::announce::{Announcement, Notice};
use crate::character::Character;
use crate::day::Day;
use crate::effect::{Cleanup, EffectKind, EffectPolicy};
use crate::error::GameError;
use crate::game::Game;
use crate::prompt::{Reply, Selection};

/// One entry in the night order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum NightStep {
    /// Show the minions each other and the demon.
    MinionInfo,
    /// Show the demon its minions and bluffs.
    DemonInfo,
    /// Wake a player to use their character's ability.
    Ability {
        /// The player.
        player: PlayerId,
        /// The character they held when the step was added.
        character: Character,
    },
    /// Wake everyone.
    Dawn,
}

/// What the storyteller is asked to do at a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NightCall {
    /// Wake the minions.
    MinionInfo {
        /// Seated minions.
        minions: Vec<PlayerId>,
        /// Seated demons.
        demons: Vec<PlayerId>,
    },
    /// Wake the demon.
    DemonInfo {
        /// Seated demons.
        demons: Vec<PlayerId>,
        /// Seated minions.
        minions: Vec<PlayerId>,
        /// Good characters nobody holds.
        bluffs: Vec<Character>,
    },
    /// Ask a player to choose a target.
    ChooseTarget {
        /// The player.
        player: PlayerId,
        /// Their character.
        character: Character,
        /// What the choice does, e.g. "protect".
        verb: &'static str,
        /// Whether they may choose nobody.
        optional: bool,
    },
    /// Show a player one correct and one incorrect player.
    SeesTwo {
        /// The player.
        player: PlayerId,
        /// Their character.
        character: Character,
        /// The character type shown.
        sees: CharacterType,
        /// False when drunk or poisoned; any two players will do.
        enabled: bool,
    },
    /// Resolve this character by hand.
    Manual {
        /// The player.
        player: PlayerId,
        /// Their character.
        character: Character,
    },
    /// The night is over.
    Dawn,
}

/// Kills and messages produced by resolving a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightOutcome {
    /// Players who died.
    pub kills: Vec<PlayerId>,
    /// Public messages for dawn.
    pub messages: Vec<Notice>,
}

/// The step awaiting the storyteller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightPrompt {
    /// Index into the night order.
    pub step: usize,
    /// The step itself.
    pub entry: NightStep,
    /// What to do.
    pub call: NightCall,
}

/// What happened at dawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DawnReport {
    /// The dead, shuffled.
    pub deaths: Vec<PlayerId>,
    /// Messages from the night.
    pub messages: Vec<Notice>,
}

/// Where the night stands after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NightProgress {
    /// Waiting on the storyteller.
    Awaiting(NightPrompt),
    /// The night ended and a day began.
    Dawn(DawnReport),
}

/// State of a night in progress (or archived).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Night {
    pub(crate) order: Vec<NightStep>,
    pub(crate) step: usize,
    pub(crate) kills: Vec<PlayerId>,
    pub(crate) messages: Vec<Notice>,
}

impl Night {
    /// Build the order for the night following `game.day_number()` days.
    pub(crate) fn build(game: &Game) -> Self {
        let day_number = game.day_number();
        let wake_order = game.script().night_order(day_number);
        let mut ranked: Vec<(usize, usize, NightStep)> = game
            .seating()
            .iter()
            .enumerate()
            .filter(|(_, player)| !player.ghost(game, false))
            .filter_map(|(seat, player)| {
                let rank = wake_order.iter().position(|c| *c == player.character())?;
                Some((
                    rank,
                    seat,
                    NightStep::Ability {
                        player: player.id(),
                        character: player.character(),
                    },
                ))
            })
            .collect();
        ranked.sort_by_key(|(rank, seat, _)| (*rank, *seat));

        let mut order = Vec::with_capacity(ranked.len().saturating_add(3));
        if day_number == 0 {
            order.push(NightStep::MinionInfo);
            order.push(NightStep::DemonInfo);
        }
        order.extend(ranked.into_iter().map(|(_, _, step)| step));
        order.push(NightStep::Dawn);
        Self {
            order,
            step: 0,
            kills: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// The full order.
    pub fn order(&self) -> &[NightStep] {
        &self.order
    }

    /// Index of the current step.
    pub const fn step(&self) -> usize {
        self.step
    }

    /// Steps not yet resolved, starting with the current one.
    pub fn remaining(&self) -> &[NightStep] {
        self.order.get(self.step..).unwrap_or_default()
    }

    /// Kills so far, in resolution order.
    pub fn kills(&self) -> &[PlayerId] {
        &self.kills
    }

    /// Dawn messages so far.
    pub fn messages(&self) -> &[Notice] {
        &self.messages
    }

    /// Insert a step right after the current one.
    pub(crate) fn insert_next(&mut self, entry: NightStep) {
        let at = self.step.saturating_add(1).min(self.order.len());
        self.order.insert(at, entry);
    }

    fn current(&self) -> Option<NightStep> {
        self.order.get(self.step).copied()
    }

    fn advance(&mut self) {
        self.step = self.step.saturating_add(1);
    }
}

impl Game {
    /// Begin a night. Only valid between a finished day and the next night,
    /// or before the first night.
    pub fn start_night(&mut self) -> Result<NightProgress, GameError> {
        self.ensure_running()?;
        if self.current_day.is_some() || self.current_night.is_some() {
            return Err(GameError::PhaseInProgress);
        }
        let night = Night::build(self);
        info!(
            night = self.day_number(),
            steps = night.order.len(),
            "night falls"
        );
        self.current_night = Some(night);
        self.announce(Announcement::public(Notice::NightFalls));
        self.current_step()
    }

    /// What the storyteller must do now. Steps with nothing to do are passed
    /// over, and if that reaches the end of the order the night ends.
    pub fn current_step(&mut self) -> Result<NightProgress, GameError> {
        loop {
            let night = self.current_night.as_ref().ok_or(GameError::NoCurrentNight)?;
            let Some(entry) = night.current() else {
                return Ok(NightProgress::Dawn(self.end_night()));
            };
            let step = night.step;
            if let Some(call) = self.night_call(&entry) {
                return Ok(NightProgress::Awaiting(NightPrompt { step, entry, call }));
            }
            debug!(step, entry = ?entry, "nothing to do at night step, moving on");
            if let Some(night) = self.current_night.as_mut() {
                night.advance();
            }
        }
    }

    /// Resolve the current step with the storyteller's selection, then move
    /// to the next step that needs them.
    ///
    /// A selection failing the ability's condition resolves to the
    /// ability's default and the night moves on. A malformed selection is
    /// returned as an error and the night stays on the same step.
    pub fn next_step(&mut self, reply: Reply<Selection>) -> Result<NightProgress, GameError> {
        self.ensure_running()?;
        let night = self.current_night.as_ref().ok_or(GameError::NoCurrentNight)?;
        let selection = reply.into_answer("night action")?;
        let Some(entry) = night.current() else {
            return self.current_step();
        };

        let outcome = match entry {
            NightStep::Ability { player, character } => {
                match self.resolve_ability(player, character, selection) {
                    Ok(outcome) => outcome,
                    Err(AbilityError::InvalidTarget(fallback)) => {
                        debug!(player = %player, character = %character, "invalid target, using default outcome");
                        fallback
                    }
                    Err(AbilityError::Rejected(err)) => return Err(err),
                }
            }
            NightStep::MinionInfo | NightStep::DemonInfo | NightStep::Dawn => {
                NightOutcome::default()
            }
        };

        if let Some(night) = self.current_night.as_mut() {
            night.kills.extend(outcome.kills);
            night.messages.extend(outcome.messages);
            night.advance();
        }
        self.current_step()
    }

    /// Kill a player outside any ability, announced at dawn.
    pub fn add_night_kill(&mut self, player: PlayerId) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.current_night.is_none() {
            return Err(GameError::NoCurrentNight);
        }
        self.seated(player)?;
        if !self.ghost(player) {
            self.attach(player, EffectKind::Dead, EffectPolicy::permanent(), player);
        }
        if let Some(night) = self.current_night.as_mut() {
            night.kills.push(player);
        }
        Ok(())
    }

    /// Skip the rest of the night and begin the day.
    ///
    /// `kills` are added as night kills, every remaining step is resolved as
    /// a pass, and dawn follows. If anything fails the game is left exactly
    /// as it was before the call.
    pub fn start_day(&mut self, kills: &[PlayerId]) -> Result<DawnReport, GameError> {
        self.ensure_running()?;
        if self.current_night.is_none() {
            return Err(GameError::NoCurrentNight);
        }
        for &player in kills {
            self.seated(player)?;
        }
        let backup = self.clone();
        match self.pass_rest_of_night(kills) {
            Ok(report) => Ok(report),
            Err(err) => {
                warn!(error = %err, "start of day failed, restoring the night");
                *self = backup;
                Err(err)
            }
        }
    }

    fn pass_rest_of_night(&mut self, kills: &[PlayerId]) -> Result<DawnReport, GameError> {
        for &player in kills {
            self.add_night_kill(player)?;
        }
        loop {
            if let NightProgress::Dawn(report) = self.next_step(Reply::Answer(Selection::pass()))? {
                return Ok(report);
            }
        }
    }

    fn end_night(&mut self) -> DawnReport {
        self.reset_daily_flags();
        self.run_cleanup(Cleanup::Morning);

        let Some(night) = self.current_night.take() else {
            return DawnReport {
                deaths: Vec::new(),
                messages: Vec::new(),
            };
        };
        let mut deaths = night.kills.clone();
        let mut rng = StdRng::seed_from_u64(
            self.rules()
                .seed
                .wrapping_add(u64::from(self.day_number())),
        );
        deaths.shuffle(&mut rng);
        let messages = night.messages.clone();

        info!(day = self.day_number().saturating_add(1), deaths = deaths.len(), "dawn");
        self.announce(Announcement::public(Notice::Deaths {
            players: deaths.clone(),
        }));
        for message in &messages {
            self.announce(Announcement::public(message.clone()));
        }
        self.announce(Announcement::public(Notice::WakeUp));

        self.past_nights.push(night);
        self.current_day = Some(Day::new());
        DawnReport { deaths, messages }
    }
}
