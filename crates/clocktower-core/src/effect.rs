//! Effects: the atomic unit of derived player state.
//!
//! A player's statuses are never stored. Each [`Effect`] attached to a player
//! declares which [`Status`] values it asserts, and every query folds over the
//! player's current effect list. Effects change each other through cascades:
//! when attaching or enabling an effect makes a player stop functioning, every
//! other effect that player is the *source* of is told about it, and when
//! removing or disabling an effect makes them function again, those effects
//! are told that too. What each effect does on those notifications is data
//! carried in its [`EffectPolicy`].

use clocktower_types::{Alignment, CharacterType, EffectId, PlayerId, Status};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GameError;
use crate::game::Game;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The closed set of effect kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// The player is drunk.
    Drunk,
    /// The player is poisoned.
    Poisoned,
    /// The player is dead.
    Dead,
    /// The player cannot die.
    Safe,
    /// The player cannot be killed by the demon.
    SafeFromDemon,
    /// A one-time ability has been used.
    UsedAbility,
    /// The player may vote while dead without spending a token.
    NoDeadVoteNeeded,
    /// The player appears twice in vote orders.
    VoteTwice,
    /// The player may nominate twice a day.
    NominateTwice,
    /// The player may nominate while dead.
    NominateWhileDead,
    /// The player's yes votes are negated.
    Thiefed,
    /// The player's yes votes are multiplied.
    Bureaucrated,
    /// Baseline alignment marker.
    Alignment(Alignment),
    /// Baseline character type marker.
    CharacterType(CharacterType),
    /// The player registers as having a status they may not truly have.
    Registers(Status),
    /// Reminder: the player shown as the correct answer to an information ability.
    Correct,
    /// Reminder: the player shown as the decoy to an information ability.
    Wrong,
    /// Death that leaves a killed minion's ability working while its killer functions.
    VigormortisDead,
}

/// How a kind answers a status query.
enum Predicate {
    /// Always true while enabled.
    Asserts,
    /// Derived from other players' state.
    Computed,
    /// Not declared; fall back to composite rules.
    Unset,
}

impl EffectKind {
    /// The status this kind asserts outright, if any.
    pub const fn asserts(self) -> Option<Status> {
        match self {
            Self::Drunk => Some(Status::Drunk),
            Self::Poisoned => Some(Status::Poisoned),
            Self::Dead | Self::VigormortisDead => Some(Status::Dead),
            Self::Safe => Some(Status::Safe),
            Self::SafeFromDemon => Some(Status::SafeFromDemon),
            Self::UsedAbility => Some(Status::UsedAbility),
            Self::NoDeadVoteNeeded => Some(Status::CanDeadVoteWithoutToken),
            Self::VoteTwice => Some(Status::CanVoteTwice),
            Self::NominateTwice => Some(Status::CanNominateTwice),
            Self::NominateWhileDead => Some(Status::CanNominateWhileDead),
            Self::Thiefed => Some(Status::Thiefed),
            Self::Bureaucrated => Some(Status::Bureaucrated),
            Self::Alignment(alignment) => Some(alignment.status()),
            Self::CharacterType(kind) => Some(kind.status()),
            Self::Registers(_) | Self::Correct | Self::Wrong => None,
        }
    }

    /// Whether the kind is shown on the grimoire. Baseline markers are not.
    pub const fn appears(self) -> bool {
        !matches!(self, Self::Alignment(_) | Self::CharacterType(_))
    }

    /// Display name.
    pub fn label(self) -> String {
        match self {
            Self::Registers(status) => format!("Registers as {}", status.label()),
            Self::Alignment(alignment) => format!("{alignment:?}"),
            Self::CharacterType(kind) => format!("{kind:?}"),
            Self::NoDeadVoteNeeded => "No dead vote needed".to_owned(),
            Self::VoteTwice => "Votes twice".to_owned(),
            Self::NominateTwice => "Nominates twice".to_owned(),
            Self::NominateWhileDead => "Nominates while dead".to_owned(),
            Self::SafeFromDemon => "Safe from demon".to_owned(),
            Self::UsedAbility => "Used ability".to_owned(),
            Self::VigormortisDead => "Dead".to_owned(),
            other => format!("{other:?}"),
        }
    }

    fn predicate(self, status: Status) -> Predicate {
        if self.asserts() == Some(status) {
            Predicate::Asserts
        } else if self == Self::VigormortisDead && status == Status::NotFunctioning {
            Predicate::Computed
        } else {
            Predicate::Unset
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle policy
// ---------------------------------------------------------------------------

/// When an expiring effect is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cleanup {
    /// At dawn, when the night ends.
    Morning,
    /// At dusk, when the day ends.
    Evening,
}

/// Automatic deletion after a number of cleanups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    /// Which cleanup counts down this expiry.
    pub phase: Cleanup,
    /// Cleanups remaining, including the one that deletes the effect.
    pub days: u32,
}

/// What an effect does when its source changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceAction {
    /// Set the disabled flag.
    Disable,
    /// Remove the effect.
    Delete,
    /// Clear the disabled flag.
    Enable,
}

/// Notification delivered to effects sourced from a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceHook {
    DrunkPoisoned,
    Death,
    StartsFunctioning,
}

/// Orthogonal lifecycle rules attached to an effect instance.
///
/// The default policy is permanent: no expiry and no reaction to the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectPolicy {
    /// Automatic deletion at a cleanup.
    pub expiry: Option<Expiry>,
    /// Reaction when the source becomes drunk or poisoned.
    pub on_source_drunkpoisoned: Option<SourceAction>,
    /// Reaction when the source dies.
    pub on_source_death: Option<SourceAction>,
    /// Reaction when the source starts functioning again.
    pub on_source_functioning: Option<SourceAction>,
}

impl EffectPolicy {
    /// A policy with no expiry and no source reactions.
    pub const fn permanent() -> Self {
        Self {
            expiry: None,
            on_source_drunkpoisoned: None,
            on_source_death: None,
            on_source_functioning: None,
        }
    }

    /// Lasts only while the source functions: disabled while the source is
    /// drunk or poisoned, deleted when the source dies, re-enabled when the
    /// source recovers.
    pub const fn ongoing() -> Self {
        Self {
            expiry: None,
            on_source_drunkpoisoned: Some(SourceAction::Disable),
            on_source_death: Some(SourceAction::Delete),
            on_source_functioning: Some(SourceAction::Enable),
        }
    }

    /// Delete at the given cleanup after `days` occurrences.
    pub const fn expiring(self, phase: Cleanup, days: u32) -> Self {
        Self {
            expiry: Some(Expiry { phase, days }),
            ..self
        }
    }

    /// Delete at the next dawn.
    pub const fn until_morning(self) -> Self {
        self.expiring(Cleanup::Morning, 1)
    }

    /// Delete at the next dusk.
    pub const fn until_evening(self) -> Self {
        self.expiring(Cleanup::Evening, 1)
    }

    pub(crate) const fn action_for(&self, hook: SourceHook) -> Option<SourceAction> {
        match hook {
            SourceHook::DrunkPoisoned => self.on_source_drunkpoisoned,
            SourceHook::Death => self.on_source_death,
            SourceHook::StartsFunctioning => self.on_source_functioning,
        }
    }
}

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

/// A status-asserting object held in the affected player's effect list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    /// Unique identifier.
    pub id: EffectId,
    /// What the effect asserts.
    pub kind: EffectKind,
    /// The player holding the effect.
    pub affected: PlayerId,
    /// The player that caused it. May be the affected player or a storyteller.
    pub source: PlayerId,
    /// Disabled effects assert nothing but stay for bookkeeping.
    pub disabled: bool,
    /// Expiry and source reactions.
    pub policy: EffectPolicy,
}

impl Effect {
    pub(crate) fn new(
        kind: EffectKind,
        affected: PlayerId,
        source: PlayerId,
        policy: EffectPolicy,
    ) -> Self {
        Self {
            id: EffectId::new(),
            kind,
            affected,
            source,
            disabled: false,
            policy,
        }
    }

    /// Whether this effect asserts `status`.
    pub fn status(&self, game: &Game, status: Status) -> bool {
        self.status_at(game, status, 0)
    }

    pub(crate) fn status_at(&self, game: &Game, status: Status, depth: u32) -> bool {
        if self.disabled {
            return false;
        }
        match self.kind.predicate(status) {
            Predicate::Asserts => true,
            Predicate::Computed => self.computed(game, depth),
            Predicate::Unset => match status {
                Status::NotFunctioning => [Status::Poisoned, Status::Drunk, Status::Dead]
                    .into_iter()
                    .any(|composite| self.status_at(game, composite, depth)),
                Status::SafeFromDemon => self.status_at(game, Status::Safe, depth),
                _ => false,
            },
        }
    }

    /// A killed minion keeps functioning while the killer does.
    fn computed(&self, game: &Game, depth: u32) -> bool {
        let minion = game
            .player(self.affected)
            .is_some_and(|p| p.status_at(game, Status::Minion, true, depth));
        let source_functioning = game
            .player(self.source)
            .is_some_and(|p| !p.status_at(game, Status::NotFunctioning, false, depth));
        !(minion && source_functioning)
    }

    /// Whether this effect makes the player register as `status`.
    pub fn registers_status(&self, status: Status) -> bool {
        !self.disabled && self.kind == EffectKind::Registers(status)
    }

    /// Nomination hook; returning false vetoes the nomination.
    #[allow(clippy::unused_self)]
    pub const fn nomination(&self, _nominee: PlayerId, _nominator: PlayerId) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Attaching, disabling and deleting with cascades
// ---------------------------------------------------------------------------

impl Game {
    /// Attach a new effect to `target`.
    ///
    /// This is the only way to attach effects beyond a character's defaults.
    /// If the effect stops `target` from functioning, the effects `target`
    /// is the source of are notified.
    pub fn add_effect(
        &mut self,
        target: PlayerId,
        kind: EffectKind,
        policy: EffectPolicy,
        source: PlayerId,
    ) -> Result<EffectId, GameError> {
        self.ensure_running()?;
        if self.player(target).is_none() {
            return Err(GameError::missing(target));
        }
        if self.player(source).is_none() {
            return Err(GameError::missing(source));
        }
        Ok(self.attach(target, kind, policy, source))
    }

    /// Disable an effect, keeping it on the player.
    pub fn disable_effect(&mut self, id: EffectId) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.effect(id).is_none() {
            return Err(GameError::invalid(format!("no effect with id {id}")));
        }
        self.disable_at(id, 0);
        Ok(())
    }

    /// Remove an effect from its player.
    pub fn delete_effect(&mut self, id: EffectId) -> Result<(), GameError> {
        self.ensure_running()?;
        if self.effect(id).is_none() {
            return Err(GameError::invalid(format!("no effect with id {id}")));
        }
        self.delete_at(id, 0);
        Ok(())
    }

    /// Look up an effect anywhere in the game.
    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.players()
            .flat_map(|player| player.effects.iter())
            .find(|effect| effect.id == id)
    }

    /// Ids of every effect sourced from `source`, in seating order.
    pub fn sourced_effects(&self, source: PlayerId) -> Vec<EffectId> {
        self.players()
            .flat_map(|player| player.effects.iter())
            .filter(|effect| effect.source == source)
            .map(|effect| effect.id)
            .collect()
    }

    pub(crate) fn attach(
        &mut self,
        target: PlayerId,
        kind: EffectKind,
        policy: EffectPolicy,
        source: PlayerId,
    ) -> EffectId {
        let effect = Effect::new(kind, target, source, policy);
        let id = effect.id;
        debug!(effect_id = %id, player = %target, source = %source, kind = ?kind, "attaching effect");
        self.turn_on(target, id, 0, move |game| {
            if let Some(player) = game.player_mut(target) {
                player.effects.push(effect);
            }
        });
        id
    }

    pub(crate) fn disable_at(&mut self, id: EffectId, depth: u32) {
        let Some(affected) = self.effect(id).map(|e| e.affected) else {
            return;
        };
        debug!(effect_id = %id, player = %affected, "disabling effect");
        self.turn_off(affected, id, depth, |game| {
            if let Some(effect) = game.effect_mut(id) {
                effect.disabled = true;
            }
        });
    }

    pub(crate) fn delete_at(&mut self, id: EffectId, depth: u32) {
        let Some(affected) = self.effect(id).map(|e| e.affected) else {
            return;
        };
        debug!(effect_id = %id, player = %affected, "deleting effect");
        self.turn_off(affected, id, depth, |game| {
            if let Some(player) = game.player_mut(affected) {
                player.effects.retain(|effect| effect.id != id);
            }
        });
    }

    fn enable_at(&mut self, id: EffectId, depth: u32) {
        let Some(affected) = self.effect(id).map(|e| e.affected) else {
            return;
        };
        self.turn_on(affected, id, depth, |game| {
            if let Some(effect) = game.effect_mut(id) {
                effect.disabled = false;
            }
        });
    }

    fn effect_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.players_mut()
            .flat_map(|player| player.effects.iter_mut())
            .find(|effect| effect.id == id)
    }

    /// Apply `enabler`; if the player stops functioning because of it,
    /// notify the effects they are the source of.
    fn turn_on(
        &mut self,
        affected: PlayerId,
        trigger: EffectId,
        depth: u32,
        enabler: impl FnOnce(&mut Self),
    ) {
        let was_functioning = self.functioning(affected);
        let was_dead = self.ghost(affected);
        enabler(self);
        if !was_functioning || self.functioning(affected) {
            return;
        }
        let hook = if !was_dead && self.ghost(affected) {
            SourceHook::Death
        } else {
            SourceHook::DrunkPoisoned
        };
        self.cascade(affected, trigger, hook, depth);
    }

    /// Apply `disabler`; if the player starts functioning because of it,
    /// notify the effects they are the source of.
    fn turn_off(
        &mut self,
        affected: PlayerId,
        trigger: EffectId,
        depth: u32,
        disabler: impl FnOnce(&mut Self),
    ) {
        let was_functioning = self.functioning(affected);
        disabler(self);
        if was_functioning || !self.functioning(affected) {
            return;
        }
        self.cascade(affected, trigger, SourceHook::StartsFunctioning, depth);
    }

    fn cascade(&mut self, source: PlayerId, trigger: EffectId, hook: SourceHook, depth: u32) {
        let next = depth.saturating_add(1);
        if next > self.rules().max_status_depth {
            warn!(player = %source, hook = ?hook, depth = next, "effect cascade exceeded depth limit, stopping");
            return;
        }
        let sourced: Vec<EffectId> = self
            .sourced_effects(source)
            .into_iter()
            .filter(|id| *id != trigger)
            .collect();
        debug!(player = %source, hook = ?hook, count = sourced.len(), "notifying sourced effects");
        for id in sourced {
            self.notify_source_change(id, hook, next);
        }
    }

    pub(crate) fn notify_source_change(&mut self, id: EffectId, hook: SourceHook, depth: u32) {
        // An earlier notification in the same cascade may have removed it.
        let Some(action) = self.effect(id).map(|effect| effect.policy.action_for(hook)) else {
            return;
        };
        match action {
            Some(SourceAction::Disable) => self.disable_at(id, depth),
            Some(SourceAction::Delete) => self.delete_at(id, depth),
            Some(SourceAction::Enable) => self.enable_at(id, depth),
            None => {}
        }
    }

    /// Count down and delete expiring effects for `phase`.
    pub(crate) fn run_cleanup(&mut self, phase: Cleanup) {
        let ids: Vec<EffectId> = self
            .players()
            .flat_map(|player| player.effects.iter())
            .map(|effect| effect.id)
            .collect();
        for id in ids {
            let expired = match self.effect_mut(id).and_then(|e| e.policy.expiry.as_mut()) {
                Some(expiry) if expiry.phase == phase => {
                    if expiry.days <= 1 {
                        true
                    } else {
                        expiry.days = expiry.days.saturating_sub(1);
                        false
                    }
                }
                _ => false,
            };
            if expired {
                self.delete_at(id, 0);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::testing::{game_with, id};

    #[test]
    fn disabled_effects_assert_nothing() {
        let mut game = game_with(&[Character::Chef, Character::Imp]);
        let effect = game
            .add_effect(id(1), EffectKind::Poisoned, EffectPolicy::permanent(), id(2))
            .unwrap();
        assert!(game.is_status(id(1), Status::Poisoned));
        game.disable_effect(effect).unwrap();
        assert!(!game.is_status(id(1), Status::Poisoned));
        assert!(game.effect(effect).is_some());
    }

    #[test]
    fn not_functioning_falls_back_to_drunk_poisoned_dead() {
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Monk]);
        game.add_effect(id(1), EffectKind::Drunk, EffectPolicy::permanent(), id(1))
            .unwrap();
        game.add_effect(id(3), EffectKind::Dead, EffectPolicy::permanent(), id(3))
            .unwrap();
        assert!(game.is_status(id(1), Status::NotFunctioning));
        assert!(game.is_status(id(3), Status::NotFunctioning));
        assert!(!game.is_status(id(2), Status::NotFunctioning));
    }

    #[test]
    fn safe_implies_safe_from_demon() {
        let mut game = game_with(&[Character::Chef, Character::Imp]);
        game.add_effect(id(1), EffectKind::Safe, EffectPolicy::permanent(), id(1))
            .unwrap();
        assert!(game.is_status(id(1), Status::SafeFromDemon));
        assert!(!game.is_status(id(2), Status::SafeFromDemon));
    }

    #[test]
    fn fold_is_independent_of_effect_order() {
        let kinds = [
            EffectKind::Safe,
            EffectKind::Poisoned,
            EffectKind::Registers(Status::Evil),
            EffectKind::Dead,
        ];
        let mut answers = Vec::new();
        for rotation in 0..kinds.len() {
            for reversed in [false, true] {
                let mut order: Vec<EffectKind> = kinds.to_vec();
                order.rotate_left(rotation);
                if reversed {
                    order.reverse();
                }
                let mut game = game_with(&[Character::Chef, Character::Imp]);
                for kind in order {
                    game.add_effect(id(1), kind, EffectPolicy::permanent(), id(2))
                        .unwrap();
                }
                let poison = game
                    .player(id(1))
                    .unwrap()
                    .effects()
                    .iter()
                    .find(|effect| effect.kind == EffectKind::Poisoned)
                    .map(|effect| effect.id)
                    .unwrap();
                game.disable_effect(poison).unwrap();
                answers.push([
                    game.is_status(id(1), Status::Dead),
                    game.is_status(id(1), Status::Poisoned),
                    game.is_status(id(1), Status::SafeFromDemon),
                    game.registers(id(1), Status::Evil),
                ]);
            }
        }
        assert!(answers.windows(2).all(|pair| pair.first() == pair.get(1)));
    }

    #[test]
    fn poisoning_the_source_disables_ongoing_effects() {
        // Player 1 (Poisoner) has an ongoing poison on player 2.
        let mut game = game_with(&[Character::Poisoner, Character::Chef, Character::Imp]);
        let ongoing = game
            .add_effect(id(2), EffectKind::Poisoned, EffectPolicy::ongoing(), id(1))
            .unwrap();
        assert!(game.is_status(id(2), Status::Poisoned));

        let drunk = game
            .add_effect(id(1), EffectKind::Drunk, EffectPolicy::permanent(), id(3))
            .unwrap();
        assert!(game.effect(ongoing).unwrap().disabled);
        assert!(!game.is_status(id(2), Status::Poisoned));

        game.delete_effect(drunk).unwrap();
        assert!(!game.effect(ongoing).unwrap().disabled);
        assert!(game.is_status(id(2), Status::Poisoned));
    }

    #[test]
    fn source_death_deletes_ongoing_effects() {
        let mut game = game_with(&[Character::Poisoner, Character::Chef, Character::Imp]);
        let ongoing = game
            .add_effect(id(2), EffectKind::Poisoned, EffectPolicy::ongoing(), id(1))
            .unwrap();
        game.add_effect(id(1), EffectKind::Dead, EffectPolicy::permanent(), id(3))
            .unwrap();
        assert!(game.effect(ongoing).is_none());
        assert!(!game.is_status(id(2), Status::Poisoned));
    }

    #[test]
    fn permanent_effects_ignore_their_source() {
        let mut game = game_with(&[Character::Poisoner, Character::Chef, Character::Imp]);
        let lasting = game
            .add_effect(id(2), EffectKind::Poisoned, EffectPolicy::permanent(), id(1))
            .unwrap();
        game.add_effect(id(1), EffectKind::Dead, EffectPolicy::permanent(), id(3))
            .unwrap();
        assert!(game.effect(lasting).is_some_and(|e| !e.disabled));
    }

    #[test]
    fn expiring_effects_count_down() {
        let mut game = game_with(&[Character::Chef, Character::Imp]);
        let effect = game
            .add_effect(
                id(1),
                EffectKind::Safe,
                EffectPolicy::permanent().expiring(Cleanup::Evening, 2),
                id(1),
            )
            .unwrap();
        game.run_cleanup(Cleanup::Morning);
        assert!(game.effect(effect).is_some());
        game.run_cleanup(Cleanup::Evening);
        assert_eq!(
            game.effect(effect).unwrap().policy.expiry.unwrap().days,
            1
        );
        game.run_cleanup(Cleanup::Evening);
        assert!(game.effect(effect).is_none());
    }

    #[test]
    fn vigormortis_kill_keeps_minion_functioning() {
        let mut game = game_with(&[Character::Vigormortis, Character::Poisoner, Character::Chef]);
        game.add_effect(id(2), EffectKind::VigormortisDead, EffectPolicy::permanent(), id(1))
            .unwrap();
        assert!(game.ghost(id(2)));
        assert!(game.functioning(id(2)));

        game.add_effect(id(1), EffectKind::Poisoned, EffectPolicy::permanent(), id(3))
            .unwrap();
        assert!(!game.functioning(id(2)));
    }

    #[test]
    fn labels_and_visibility() {
        assert_eq!(
            EffectKind::Registers(Status::Evil).label(),
            "Registers as evil"
        );
        assert!(!EffectKind::Alignment(Alignment::Good).appears());
        assert!(EffectKind::Poisoned.appears());
        assert_eq!(EffectKind::VigormortisDead.asserts(), Some(Status::Dead));
    }
}
