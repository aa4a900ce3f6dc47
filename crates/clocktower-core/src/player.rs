//! Players and the operations that act on a single player.
//!
//! A [`Player`] holds a character, an effect list and per-day bookkeeping.
//! Status queries fold over the effect list on every call. Nothing about
//! life, death or alignment is cached.

use chrono::{DateTime, Utc};
use clocktower_types::{Alignment, CharacterType, ExecutionOutcome, PlayerId, Status};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::announce::{Announcement, Notice};
use crate::character::Character;
use crate::effect::{Effect, EffectKind, EffectPolicy, SourceHook};
use crate::error::GameError;
use crate::game::Game;
use crate::prompt::Reply;

/// One entry in a player's message history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Sender.
    pub from: PlayerId,
    /// Recipient.
    pub to: PlayerId,
    /// Body.
    pub content: String,
    /// Day number the message was sent on.
    pub day: u32,
    /// When the collaborator received it.
    pub time: DateTime<Utc>,
}

/// A seated player or a storyteller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    pub(crate) character: Character,
    pub(crate) position: Option<usize>,
    pub(crate) effects: Vec<Effect>,
    pub(crate) dead_votes: u32,
    pub(crate) message_history: Vec<MessageRecord>,
    pub(crate) has_spoken: bool,
    pub(crate) nominations_today: u32,
    pub(crate) has_been_nominated: bool,
    pub(crate) has_skipped: bool,
    pub(crate) is_inactive: bool,
}

impl Player {
    pub(crate) fn new(
        id: PlayerId,
        name: String,
        character: Character,
        position: Option<usize>,
        dead_votes: u32,
    ) -> Self {
        let effects = character
            .default_effects()
            .into_iter()
            .map(|kind| Effect::new(kind, id, id, EffectPolicy::permanent()))
            .collect();
        Self {
            id,
            name,
            character,
            position,
            effects,
            dead_votes,
            message_history: Vec::new(),
            has_spoken: false,
            nominations_today: 0,
            has_been_nominated: false,
            has_skipped: false,
            is_inactive: false,
        }
    }

    /// Platform id.
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current character.
    pub const fn character(&self) -> Character {
        self.character
    }

    /// Seat index. `None` for storytellers.
    pub const fn position(&self) -> Option<usize> {
        self.position
    }

    /// Attached effects in insertion order.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Remaining dead vote tokens.
    pub const fn dead_votes(&self) -> u32 {
        self.dead_votes
    }

    /// Messages sent or received.
    pub fn message_history(&self) -> &[MessageRecord] {
        &self.message_history
    }

    /// Whether the player has sent a message today.
    pub const fn has_spoken(&self) -> bool {
        self.has_spoken
    }

    /// Nominations made today.
    pub const fn nominations_today(&self) -> u32 {
        self.nominations_today
    }

    /// Whether the player has been nominated today.
    pub const fn has_been_nominated(&self) -> bool {
        self.has_been_nominated
    }

    /// Whether the player has skipped today.
    pub const fn has_skipped(&self) -> bool {
        self.has_skipped
    }

    /// Whether the player is marked inactive.
    pub const fn is_inactive(&self) -> bool {
        self.is_inactive
    }

    // -----------------------------------------------------------------------
    // Status derivation
    // -----------------------------------------------------------------------

    /// Whether any effect asserts `status`. With `registers`, effects that
    /// make the player merely register as `status` count too.
    pub fn is_status(&self, game: &Game, status: Status, registers: bool) -> bool {
        self.status_at(game, status, registers, 0)
    }

    pub(crate) fn status_at(&self, game: &Game, status: Status, registers: bool, depth: u32) -> bool {
        if depth > game.rules().max_status_depth {
            warn!(
                player = %self.id,
                status = ?status,
                depth,
                "status derivation recursed past the depth limit, treating as true"
            );
            return true;
        }
        if registers && self.effects.iter().any(|e| e.registers_status(status)) {
            return true;
        }
        let next = depth.saturating_add(1);
        self.effects.iter().any(|e| e.status_at(game, status, next))
    }

    /// Whether the player is dead.
    pub fn ghost(&self, game: &Game, registers: bool) -> bool {
        self.is_status(game, Status::Dead, registers)
    }

    /// Whether the player's ability works.
    pub fn functioning(&self, game: &Game) -> bool {
        !self.is_status(game, Status::NotFunctioning, false)
    }

    /// The player's alignment, Good checked first.
    ///
    /// With `registers`, an alignment the player registers as wins over
    /// their true one.
    pub fn alignment(&self, game: &Game, registers: bool) -> Option<Alignment> {
        let candidates = [Alignment::Good, Alignment::Evil];
        registers
            .then(|| candidates.into_iter().find(|a| self.registers_as(a.status())))
            .flatten()
            .or_else(|| {
                candidates
                    .into_iter()
                    .find(|a| self.is_status(game, a.status(), false))
            })
    }

    /// The player's character type. With `registers`, a registered type
    /// wins over the true one.
    pub fn character_type(&self, game: &Game, registers: bool) -> Option<CharacterType> {
        registers
            .then(|| {
                CharacterType::ALL
                    .into_iter()
                    .find(|kind| self.registers_as(kind.status()))
            })
            .flatten()
            .or_else(|| {
                CharacterType::ALL
                    .into_iter()
                    .find(|kind| self.is_status(game, kind.status(), false))
            })
    }

    fn registers_as(&self, status: Status) -> bool {
        self.effects.iter().any(|e| e.registers_status(status))
    }

    // -----------------------------------------------------------------------
    // Nomination and vote eligibility
    // -----------------------------------------------------------------------

    /// Whether the player may nominate right now.
    pub fn can_nominate(&self, game: &Game) -> bool {
        let alive_enough = !self.ghost(game, true)
            || self.is_status(game, Status::CanNominateWhileDead, false);
        let nominations_left = self.nominations_today == 0
            || (self.nominations_today == 1
                && self.is_status(game, Status::CanNominateTwice, false));
        alive_enough && nominations_left
    }

    /// Whether the player may still be nominated today.
    pub const fn can_be_nominated(&self) -> bool {
        !self.has_been_nominated
    }

    /// Whether the player may vote. Everyone votes on travelers.
    pub fn can_vote(&self, game: &Game, traveler: bool) -> bool {
        traveler
            || !self.ghost(game, true)
            || self.dead_votes > 0
            || self.is_status(game, Status::CanDeadVoteWithoutToken, false)
    }

    /// How many votes a yes from this player counts for.
    pub fn vote_value(&self, game: &Game, traveler: bool) -> i32 {
        if traveler {
            return 1;
        }
        let mut multiplier: i32 = 1;
        if self.is_status(game, Status::Thiefed, false) {
            multiplier = multiplier.saturating_mul(-1);
        }
        if self.is_status(game, Status::Bureaucrated, false) {
            multiplier = multiplier.saturating_mul(-3);
        }
        multiplier
    }
}

// ---------------------------------------------------------------------------
// Game operations on single players
// ---------------------------------------------------------------------------

impl Game {
    /// Whether `player` has `status`.
    pub fn is_status(&self, player: PlayerId, status: Status) -> bool {
        self.player(player)
            .is_some_and(|p| p.is_status(self, status, false))
    }

    /// Whether `player` has or registers as `status`.
    pub fn registers(&self, player: PlayerId, status: Status) -> bool {
        self.player(player)
            .is_some_and(|p| p.is_status(self, status, true))
    }

    /// Whether `player` is dead.
    pub fn ghost(&self, player: PlayerId) -> bool {
        self.player(player).is_some_and(|p| p.ghost(self, false))
    }

    /// Whether `player`'s ability works.
    pub fn functioning(&self, player: PlayerId) -> bool {
        self.player(player).is_some_and(|p| p.functioning(self))
    }

    /// Nearest seated players on each side of `player` satisfying
    /// `condition`, as (upward, downward). Seating wraps around.
    pub fn neighbors(
        &self,
        player: PlayerId,
        condition: impl Fn(&Self, &Player) -> bool,
    ) -> (Option<PlayerId>, Option<PlayerId>) {
        let Some(position) = self.player(player).and_then(Player::position) else {
            return (None, None);
        };
        let seating = self.seating();
        let after = seating.get(position.saturating_add(1)..).unwrap_or_default();
        let before = seating.get(..position).unwrap_or_default();
        let others = || after.iter().chain(before.iter());
        let upward = others().rev().find(|p| condition(self, p)).map(Player::id);
        let downward = others().find(|p| condition(self, p)).map(Player::id);
        (upward, downward)
    }

    /// Execute a player. Ends the current day whatever the outcome.
    pub fn execute(&mut self, player: PlayerId) -> Result<ExecutionOutcome, GameError> {
        self.ensure_running()?;
        self.seated(player)?;
        Ok(self.perform_execution(player))
    }

    pub(crate) fn perform_execution(&mut self, player: PlayerId) -> ExecutionOutcome {
        let outcome = self.kill_by_execution(player);
        info!(player = %player, outcome = ?outcome, "player executed");
        self.announce(Announcement::public(Notice::Executed { player, outcome }));
        if self.current_day.is_some() {
            self.finish_day(true);
        }
        outcome
    }

    /// Exile a traveler. Unlike execution, the day continues.
    pub fn exile(&mut self, traveler: PlayerId) -> Result<ExecutionOutcome, GameError> {
        self.ensure_running()?;
        let seated = self.seated(traveler)?;
        if seated.character.character_type() != CharacterType::Traveler {
            return Err(GameError::invalid(format!(
                "{} is not a traveler",
                seated.name
            )));
        }
        let outcome = self.kill_by_execution(traveler);
        info!(player = %traveler, outcome = ?outcome, "traveler exiled");
        self.announce(Announcement::public(Notice::Exiled {
            player: traveler,
            outcome,
        }));
        Ok(outcome)
    }

    pub(crate) fn kill_by_execution(&mut self, player: PlayerId) -> ExecutionOutcome {
        if self.ghost(player) {
            ExecutionOutcome::AlreadyDead
        } else if self.is_status(player, Status::Safe) {
            ExecutionOutcome::Survived
        } else {
            self.attach(player, EffectKind::Dead, EffectPolicy::permanent(), player);
            ExecutionOutcome::Died
        }
    }

    /// Bring a player back to life.
    ///
    /// Strips every effect currently asserting death or a used ability,
    /// whoever sourced it, then tells the player's sourced effects that the
    /// player functions again.
    pub fn revive(&mut self, player: PlayerId) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.player(player).is_none() {
            return Err(GameError::missing(player));
        }
        self.restore_life(player);
        self.announce(Announcement::public(Notice::Revived { player }));
        Ok(())
    }

    pub(crate) fn restore_life(&mut self, player: PlayerId) {
        let Some(target) = self.player(player) else {
            return;
        };
        let stripped: Vec<_> = target
            .effects
            .iter()
            .filter(|e| e.status(self, Status::Dead) || e.status(self, Status::UsedAbility))
            .map(|e| e.id)
            .collect();
        if let Some(target) = self.player_mut(player) {
            target.effects.retain(|e| !stripped.contains(&e.id));
        }
        for id in self.sourced_effects(player) {
            self.notify_source_change(id, SourceHook::StartsFunctioning, 1);
        }
        info!(player = %player, stripped = stripped.len(), "player revived");
    }

    /// Give a player a new character.
    ///
    /// Every effect the player sourced is deleted, then the new character's
    /// default effects are attached.
    pub fn change_character(
        &mut self,
        player: PlayerId,
        character: Character,
    ) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.player(player).is_none() {
            return Err(GameError::missing(player));
        }
        self.replace_character(player, character);
        Ok(())
    }

    pub(crate) fn replace_character(&mut self, player: PlayerId, character: Character) {
        for id in self.sourced_effects(player) {
            self.delete_at(id, 0);
        }
        if let Some(target) = self.player_mut(player) {
            target.character = character;
        }
        for kind in character.default_effects() {
            self.attach(player, kind, EffectPolicy::permanent(), player);
        }
        info!(player = %player, character = %character, "character changed");
        self.announce(Announcement::storytellers(Notice::CharacterChanged {
            player,
            character,
        }));
    }

    // -----------------------------------------------------------------------
    // Messaging and daily flags
    // -----------------------------------------------------------------------

    /// Deliver a private message.
    ///
    /// `content` is whatever the collaborator collected from the sender; a
    /// cancelled or timed-out reply records nothing. Players may only
    /// message each other while PMs are open. Storytellers may always
    /// message and be messaged.
    pub fn send_message(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        content: Reply<String>,
        time: DateTime<Utc>,
    ) -> Result<(), GameError> {
        self.ensure_running()?;
        let content = content.into_answer("message")?;
        if self.player(from).is_none() {
            return Err(GameError::missing(from));
        }
        if self.player(to).is_none() {
            return Err(GameError::missing(to));
        }
        if from == to {
            return Err(GameError::invalid("cannot message yourself"));
        }
        let storyteller_involved = self.is_storyteller(from) || self.is_storyteller(to);
        let pms_open = self.current_day.as_ref().is_some_and(|day| day.is_pms);
        if !storyteller_involved && !pms_open {
            return Err(GameError::invalid("PMs are closed"));
        }

        let record = MessageRecord {
            from,
            to,
            content: content.clone(),
            day: self.day_number(),
            time,
        };
        if let Some(sender) = self.player_mut(from) {
            sender.message_history.push(record.clone());
        }
        if let Some(recipient) = self.player_mut(to) {
            recipient.message_history.push(record);
        }
        self.announce(Announcement::to_player(
            to,
            Notice::PrivateMessage { from, to, content },
        ));
        if !self.is_storyteller(from) {
            self.make_active(from);
        }
        Ok(())
    }

    fn make_active(&mut self, player: PlayerId) {
        if self.current_day.is_none() {
            return;
        }
        let Some(speaker) = self.player_mut(player) else {
            return;
        };
        if speaker.has_spoken {
            return;
        }
        speaker.has_spoken = true;
        let silent = self.not_spoken();
        if silent.len() <= 1 {
            self.announce(Announcement::storytellers(Notice::SpeakingStatus { silent }));
        }
    }

    /// Messages exchanged between `a` and `b`, oldest first.
    pub fn history(&self, a: PlayerId, b: PlayerId) -> Vec<&MessageRecord> {
        self.player(a)
            .map(|player| {
                player
                    .message_history
                    .iter()
                    .filter(|m| (m.from == a && m.to == b) || (m.from == b && m.to == a))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mark that a player passes on nominating today.
    pub fn skip(&mut self, player: PlayerId) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.current_day.is_none() {
            return Err(GameError::NoCurrentDay);
        }
        let target = self
            .seated_mut(player)
            .ok_or_else(|| GameError::missing(player))?;
        target.has_skipped = true;
        self.announce(Announcement::storytellers(Notice::Skipped { player }));
        Ok(())
    }

    /// Mark a player as inactive. Inactive players start each day counted
    /// as having spoken and skipped.
    pub fn set_inactive(&mut self, player: PlayerId, inactive: bool) -> Result<(), GameError> {
        self.ensure_running()?;
        let target = self
            .seated_mut(player)
            .ok_or_else(|| GameError::missing(player))?;
        target.is_inactive = inactive;
        if inactive {
            target.has_spoken = true;
            target.has_skipped = true;
        }
        Ok(())
    }

    /// Living players who have not spoken today.
    pub fn not_spoken(&self) -> Vec<PlayerId> {
        self.seating()
            .iter()
            .filter(|p| !p.has_spoken && !p.ghost(self, false))
            .map(Player::id)
            .collect()
    }

    /// Players who may still nominate today.
    pub fn can_still_nominate(&self) -> Vec<PlayerId> {
        self.seating()
            .iter()
            .filter(|p| p.can_nominate(self))
            .map(Player::id)
            .collect()
    }

    /// Living players who have neither nominated nor skipped today.
    pub fn not_skipped(&self) -> Vec<PlayerId> {
        self.seating()
            .iter()
            .filter(|p| !p.has_skipped && p.nominations_today == 0 && !p.ghost(self, false))
            .map(Player::id)
            .collect()
    }

    /// Reset daily flags at dawn.
    pub(crate) fn reset_daily_flags(&mut self) {
        for player in &mut self.seating {
            player.has_spoken = player.is_inactive;
            player.has_skipped = player.is_inactive;
            player.nominations_today = 0;
            player.has_been_nominated = false;
        }
        for storyteller in &mut self.storytellers {
            storyteller.nominations_today = 0;
            storyteller.has_been_nominated = false;
        }
    }
}
