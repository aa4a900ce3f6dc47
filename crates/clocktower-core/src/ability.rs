//! Generic resolvers for character abilities.
//!
//! Each [`Ability`] shape has one resolver. Every hook is wrapped by the
//! character's [`Guards`](crate::character::Guards): a character that is not
//! functioning is skipped, unless its guards let it run with its effects
//! disabled while drunk or poisoned, and a one-time ability is skipped after
//! use.
//!
//! Resolvers validate every choice before touching the game. A choice that
//! fails an ability condition yields [`AbilityError::InvalidTarget`], which
//! the night swallows by falling back to the carried outcome. Malformed input
//! yields [`AbilityError::Rejected`], which reaches the caller and leaves the
//! night on the same step.

use clocktower_types::{CharacterType, PlayerId, Status};
use tracing::{debug, info};

use crate::announce::{Announcement, Notice};
use crate::character::{Ability, Character, Evening, FollowUp};
use crate::effect::{EffectKind, EffectPolicy};
use crate::error::GameError;
use crate::game::Game;
use crate::night::{NightCall, NightOutcome, NightStep};
use crate::player::Player;
use crate::prompt::Selection;

/// Whether a guarded hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    /// Run; with `enabled == false` the effects produced are disabled.
    Run { enabled: bool },
    /// Do not run; use the hook's default.
    Skip,
}

/// Why an ability could not resolve as asked.
#[derive(Debug)]
pub(crate) enum AbilityError {
    /// The choice failed an ability condition; use the carried outcome.
    InvalidTarget(NightOutcome),
    /// The choice is malformed; ask again.
    Rejected(GameError),
}

impl From<GameError> for AbilityError {
    fn from(err: GameError) -> Self {
        Self::Rejected(err)
    }
}

/// Validated follow-up of a demon kill.
enum Plan {
    Nothing,
    Starpass(PlayerId),
    Poison(PlayerId),
}

impl Game {
    pub(crate) fn gate(&self, player: PlayerId, character: Character) -> Gate {
        let guards = character.guards();
        let enabled = if self.functioning(player) {
            true
        } else if guards.run_if_drunkpoisoned
            && !self.ghost(player)
            && (self.is_status(player, Status::Drunk) || self.is_status(player, Status::Poisoned))
        {
            false
        } else {
            return Gate::Skip;
        };
        if guards.one_time && self.is_status(player, Status::UsedAbility) {
            return Gate::Skip;
        }
        Gate::Run { enabled }
    }

    /// The call a step makes on the storyteller. `None` means nothing to
    /// do, and the night moves straight past the step.
    pub(crate) fn night_call(&self, step: &NightStep) -> Option<NightCall> {
        match *step {
            NightStep::MinionInfo => Some(NightCall::MinionInfo {
                minions: self.players_of_type(CharacterType::Minion),
                demons: self.players_of_type(CharacterType::Demon),
            }),
            NightStep::DemonInfo => Some(NightCall::DemonInfo {
                demons: self.players_of_type(CharacterType::Demon),
                minions: self.players_of_type(CharacterType::Minion),
                bluffs: self.bluff_candidates(),
            }),
            NightStep::Dawn => Some(NightCall::Dawn),
            NightStep::Ability { player, character } => {
                if self.player(player).map(Player::character) != Some(character) {
                    return None;
                }
                let Gate::Run { enabled } = self.gate(player, character) else {
                    return None;
                };
                Some(match character.ability() {
                    Ability::Manual | Ability::NominationTrap => {
                        NightCall::Manual { player, character }
                    }
                    Ability::Apply { verb, .. } => NightCall::ChooseTarget {
                        player,
                        character,
                        verb,
                        optional: true,
                    },
                    Ability::SeesTwo { sees } => NightCall::SeesTwo {
                        player,
                        character,
                        sees,
                        enabled,
                    },
                    Ability::DemonKill { .. } => NightCall::ChooseTarget {
                        player,
                        character,
                        verb: "kill",
                        optional: false,
                    },
                    Ability::Revive => NightCall::ChooseTarget {
                        player,
                        character,
                        verb: "revive",
                        optional: true,
                    },
                })
            }
        }
    }

    fn players_of_type(&self, kind: CharacterType) -> Vec<PlayerId> {
        self.seating()
            .iter()
            .filter(|p| p.character_type(self, false) == Some(kind))
            .map(Player::id)
            .collect()
    }

    /// Good characters on the script that nobody holds.
    fn bluff_candidates(&self) -> Vec<Character> {
        self.script()
            .characters
            .iter()
            .copied()
            .filter(|c| {
                matches!(
                    c.character_type(),
                    CharacterType::Townsfolk | CharacterType::Outsider
                )
            })
            .filter(|c| self.seating().iter().all(|p| p.character() != *c))
            .collect()
    }

    /// Resolve a step's ability with the storyteller's selection.
    pub(crate) fn resolve_ability(
        &mut self,
        player: PlayerId,
        character: Character,
        selection: Selection,
    ) -> Result<NightOutcome, AbilityError> {
        if self.player(player).map(Player::character) != Some(character) {
            debug!(player = %player, character = %character, "character changed since the night began, skipping");
            return Ok(NightOutcome::default());
        }
        let Gate::Run { enabled } = self.gate(player, character) else {
            debug!(player = %player, character = %character, "ability gated off");
            return Ok(NightOutcome::default());
        };
        match character.ability() {
            Ability::Manual | Ability::NominationTrap => Ok(NightOutcome::default()),
            Ability::Apply {
                kind,
                policy,
                self_target,
                ..
            } => self.apply_to_target(player, kind, policy, self_target, enabled, selection),
            Ability::SeesTwo { sees } => self.show_two(player, sees, enabled, selection),
            Ability::DemonKill { kind, follow_up } => {
                self.demon_kill(player, character, kind, follow_up, selection)
            }
            Ability::Revive => self.professor_revive(player, enabled, selection),
        }
    }

    fn apply_to_target(
        &mut self,
        player: PlayerId,
        kind: EffectKind,
        policy: EffectPolicy,
        self_target: bool,
        enabled: bool,
        selection: Selection,
    ) -> Result<NightOutcome, AbilityError> {
        let Some(target) = selection.target else {
            return Err(AbilityError::InvalidTarget(NightOutcome::default()));
        };
        self.seated(target)?;
        if !self_target && target == player {
            return Err(AbilityError::InvalidTarget(NightOutcome::default()));
        }
        let id = self.attach(target, kind, policy, player);
        if !enabled {
            self.disable_at(id, 0);
        }
        let kills = if kind == EffectKind::Dead && enabled {
            vec![target]
        } else {
            Vec::new()
        };
        Ok(NightOutcome {
            kills,
            messages: Vec::new(),
        })
    }

    fn show_two(
        &mut self,
        player: PlayerId,
        sees: CharacterType,
        enabled: bool,
        selection: Selection,
    ) -> Result<NightOutcome, AbilityError> {
        let (Some(correct), Some(wrong)) = (selection.target, selection.follow_up) else {
            return Err(AbilityError::InvalidTarget(NightOutcome::default()));
        };
        let correct_name = self.seated(correct)?.name().to_owned();
        self.seated(wrong)?;
        if correct == wrong {
            return Err(GameError::invalid("choose two different players").into());
        }
        if enabled && !self.registers(correct, sees.status()) {
            return Err(GameError::invalid(format!(
                "{correct_name} does not register as a {}",
                sees.status().label()
            ))
            .into());
        }
        for (target, kind) in [(correct, EffectKind::Correct), (wrong, EffectKind::Wrong)] {
            let id = self.attach(target, kind, EffectPolicy::permanent(), player);
            if !enabled {
                self.disable_at(id, 0);
            }
        }
        Ok(NightOutcome::default())
    }

    fn demon_kill(
        &mut self,
        player: PlayerId,
        character: Character,
        kind: EffectKind,
        follow_up: FollowUp,
        selection: Selection,
    ) -> Result<NightOutcome, AbilityError> {
        let Some(target) = selection.target else {
            return Err(AbilityError::InvalidTarget(NightOutcome::default()));
        };
        self.seated(target)?;

        let plan = match (follow_up, selection.follow_up) {
            (FollowUp::Starpass, Some(heir)) if target == player => {
                let heir_name = self.seated(heir)?.name().to_owned();
                if heir == player || !self.registers(heir, Status::Minion) {
                    return Err(GameError::invalid(format!("{heir_name} is not a minion")).into());
                }
                if self.ghost(heir) {
                    return Err(GameError::invalid(format!("{heir_name} is dead")).into());
                }
                Plan::Starpass(heir)
            }
            (FollowUp::PoisonNeighbor, Some(neighbor))
                if self.registers(target, Status::Minion) =>
            {
                let neighbor_name = self.seated(neighbor)?.name().to_owned();
                let (up, down) = self.neighbors(target, |game, p| {
                    p.is_status(game, Status::Townsfolk, true)
                });
                if up != Some(neighbor) && down != Some(neighbor) {
                    return Err(GameError::invalid(format!(
                        "{neighbor_name} is not a townsfolk neighbor of the target"
                    ))
                    .into());
                }
                Plan::Poison(neighbor)
            }
            _ => Plan::Nothing,
        };

        if self.is_status(target, Status::SafeFromDemon) || self.ghost(target) {
            debug!(player = %player, target = %target, "demon kill target is protected or already dead");
            return Err(AbilityError::InvalidTarget(NightOutcome::default()));
        }

        self.attach(target, kind, EffectPolicy::permanent(), player);
        info!(demon = %player, target = %target, "demon kill");
        match plan {
            Plan::Starpass(heir) => {
                info!(demon = %player, heir = %heir, "starpass");
                self.replace_character(heir, character);
                if let Some(night) = self.current_night.as_mut() {
                    night.insert_next(NightStep::Ability {
                        player: heir,
                        character,
                    });
                }
            }
            Plan::Poison(neighbor) => {
                self.attach(neighbor, EffectKind::Poisoned, EffectPolicy::ongoing(), player);
            }
            Plan::Nothing => {}
        }
        Ok(NightOutcome {
            kills: vec![target],
            messages: Vec::new(),
        })
    }

    fn professor_revive(
        &mut self,
        player: PlayerId,
        enabled: bool,
        selection: Selection,
    ) -> Result<NightOutcome, AbilityError> {
        let Some(target) = selection.target else {
            return Err(AbilityError::InvalidTarget(NightOutcome::default()));
        };
        self.seated(target)?;
        if !self.registers(target, Status::Dead) {
            return Err(AbilityError::InvalidTarget(NightOutcome::default()));
        }
        self.attach(player, EffectKind::UsedAbility, EffectPolicy::permanent(), player);
        let mut outcome = NightOutcome::default();
        if enabled && self.registers(target, Status::Townsfolk) {
            self.restore_life(target);
            outcome
                .messages
                .push(crate::announce::Notice::Revived { player: target });
        }
        Ok(outcome)
    }

    /// Character nomination hook. Returning false vetoes the nomination.
    pub(crate) fn character_nomination(
        &mut self,
        owner: PlayerId,
        nominee: PlayerId,
        nominator: PlayerId,
    ) -> bool {
        let Some(character) = self.player(owner).map(Player::character) else {
            return true;
        };
        if character.ability() != Ability::NominationTrap || nominee != owner {
            return true;
        }
        let Gate::Run { enabled } = self.gate(owner, character) else {
            return true;
        };
        self.attach(owner, EffectKind::UsedAbility, EffectPolicy::permanent(), owner);
        if enabled && self.registers(nominator, Status::Townsfolk) {
            info!(virgin = %owner, nominator = %nominator, "nominated by a townsfolk, executing the nominator");
            self.perform_execution(nominator);
            return false;
        }
        true
    }

    /// Character evening hook, run for every seated player as the day ends.
    pub(crate) fn character_evening(&mut self, owner: PlayerId, executed: bool) {
        let Some(character) = self.player(owner).map(Player::character) else {
            return;
        };
        match character.evening() {
            Evening::Idle => {}
            Evening::MayorWin => {
                let living = self
                    .seating()
                    .iter()
                    .filter(|p| !p.ghost(self, false))
                    .count();
                if !executed && living == 3 && self.functioning(owner) {
                    info!(mayor = %owner, "three alive and no execution");
                    self.announce(Announcement::storytellers(Notice::MayorWin { mayor: owner }));
                }
            }
        }
    }
}
