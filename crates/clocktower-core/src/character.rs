//! The character roster.
//!
//! A [`Character`] is plain data: its category, the baseline effects a player
//! receives for it, and the shape of its ability. Behavior lives in the
//! generic resolvers of [`crate::ability`], which dispatch on [`Ability`].

use clocktower_types::{Alignment, CharacterType};
use serde::{Deserialize, Serialize};

use crate::effect::{EffectKind, EffectPolicy};

/// Every character the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    /// Learns that one of two players is a particular townsfolk.
    Washerwoman,
    /// Learns that one of two players is a particular outsider.
    Librarian,
    /// Learns that one of two players is a particular minion.
    Investigator,
    /// Learns how many pairs of evil players sit together.
    Chef,
    /// Learns how many living neighbors are evil.
    Empath,
    /// Picks two players each night to look for the demon.
    FortuneTeller,
    /// Learns the character executed today.
    Undertaker,
    /// Protects another player from the demon each night.
    Monk,
    /// Learns a character if killed at night.
    Ravenkeeper,
    /// Executes the first townsfolk to nominate them.
    Virgin,
    /// Once per game publicly shoots at the demon.
    Slayer,
    /// Cannot be killed by the demon.
    Soldier,
    /// May win with three players alive and no execution.
    Mayor,
    /// Once per game revives a dead townsfolk.
    Professor,
    /// The storyteller may be nominated.
    Atheist,
    /// Votes only with their master.
    Butler,
    /// Believes they are a townsfolk.
    Drunk,
    /// May register as evil or as a minion or demon.
    Recluse,
    /// Good loses if they are executed.
    Saint,
    /// Poisons a player each night.
    Poisoner,
    /// Sees the grimoire.
    Spy,
    /// Becomes the demon if the demon dies with five or more alive.
    ScarletWoman,
    /// Adds outsiders at setup.
    Baron,
    /// Kills each night; killing themself passes demonhood to a minion.
    Imp,
    /// Killed minions keep their ability and poison a townsfolk neighbor.
    Vigormortis,
    /// Picks a player whose yes votes count negative today.
    Thief,
    /// Picks a player whose yes votes count thrice today.
    Bureaucrat,
    /// May kill a voter after a vote.
    Gunslinger,
    /// Exiled in place of an ally.
    Scapegoat,
    /// Needs a token to vote.
    Beggar,
    /// The storyteller sentinel.
    Storyteller,
}

/// The shape of a character's ability, resolved by a generic resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    /// The storyteller resolves the ability by hand.
    Manual,
    /// Attach an effect to a chosen player.
    Apply {
        /// The effect to attach.
        kind: EffectKind,
        /// Its lifecycle.
        policy: EffectPolicy,
        /// Verb used in the night call.
        verb: &'static str,
        /// Whether the character may choose themself.
        self_target: bool,
    },
    /// Shown one correct and one incorrect player of a character type.
    SeesTwo {
        /// The character type the correct player must register as.
        sees: CharacterType,
    },
    /// Demon kill, with an optional follow-up choice.
    DemonKill {
        /// The death effect attached to the target.
        kind: EffectKind,
        /// What the second choice does, if made.
        follow_up: FollowUp,
    },
    /// Revive a dead player.
    Revive,
    /// Reacts only to being nominated.
    NominationTrap,
}

/// What a character does when the day ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evening {
    /// Nothing.
    Idle,
    /// Good may win with three players alive and no execution today.
    MayorWin,
}

/// The second choice of a demon kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Killing themself turns the chosen minion into this demon.
    Starpass,
    /// Killing a minion poisons the chosen townsfolk neighbor of that minion.
    PoisonNeighbor,
}

/// Guards wrapped around every ability hook of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Guards {
    /// Run with real effects disabled while drunk or poisoned, instead of
    /// skipping entirely.
    pub run_if_drunkpoisoned: bool,
    /// Skip once a [`EffectKind::UsedAbility`] effect is present.
    pub one_time: bool,
}

impl Character {
    /// Every character, in roster order.
    pub const ALL: [Self; 31] = [
        Self::Washerwoman,
        Self::Librarian,
        Self::Investigator,
        Self::Chef,
        Self::Empath,
        Self::FortuneTeller,
        Self::Undertaker,
        Self::Monk,
        Self::Ravenkeeper,
        Self::Virgin,
        Self::Slayer,
        Self::Soldier,
        Self::Mayor,
        Self::Professor,
        Self::Atheist,
        Self::Butler,
        Self::Drunk,
        Self::Recluse,
        Self::Saint,
        Self::Poisoner,
        Self::Spy,
        Self::ScarletWoman,
        Self::Baron,
        Self::Imp,
        Self::Vigormortis,
        Self::Thief,
        Self::Bureaucrat,
        Self::Gunslinger,
        Self::Scapegoat,
        Self::Beggar,
        Self::Storyteller,
    ];

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Washerwoman => "Washerwoman",
            Self::Librarian => "Librarian",
            Self::Investigator => "Investigator",
            Self::Chef => "Chef",
            Self::Empath => "Empath",
            Self::FortuneTeller => "Fortune Teller",
            Self::Undertaker => "Undertaker",
            Self::Monk => "Monk",
            Self::Ravenkeeper => "Ravenkeeper",
            Self::Virgin => "Virgin",
            Self::Slayer => "Slayer",
            Self::Soldier => "Soldier",
            Self::Mayor => "Mayor",
            Self::Professor => "Professor",
            Self::Atheist => "Atheist",
            Self::Butler => "Butler",
            Self::Drunk => "Drunk",
            Self::Recluse => "Recluse",
            Self::Saint => "Saint",
            Self::Poisoner => "Poisoner",
            Self::Spy => "Spy",
            Self::ScarletWoman => "Scarlet Woman",
            Self::Baron => "Baron",
            Self::Imp => "Imp",
            Self::Vigormortis => "Vigormortis",
            Self::Thief => "Thief",
            Self::Bureaucrat => "Bureaucrat",
            Self::Gunslinger => "Gunslinger",
            Self::Scapegoat => "Scapegoat",
            Self::Beggar => "Beggar",
            Self::Storyteller => "Storyteller",
        }
    }

    /// Look a character up by display name, ignoring case and spacing.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = squash(name);
        Self::ALL
            .into_iter()
            .find(|character| squash(character.name()) == wanted)
    }

    /// The category this character belongs to.
    pub const fn character_type(self) -> CharacterType {
        match self {
            Self::Washerwoman
            | Self::Librarian
            | Self::Investigator
            | Self::Chef
            | Self::Empath
            | Self::FortuneTeller
            | Self::Undertaker
            | Self::Monk
            | Self::Ravenkeeper
            | Self::Virgin
            | Self::Slayer
            | Self::Soldier
            | Self::Mayor
            | Self::Professor
            | Self::Atheist => CharacterType::Townsfolk,
            Self::Butler | Self::Drunk | Self::Recluse | Self::Saint => CharacterType::Outsider,
            Self::Poisoner | Self::Spy | Self::ScarletWoman | Self::Baron => CharacterType::Minion,
            Self::Imp | Self::Vigormortis => CharacterType::Demon,
            Self::Thief | Self::Bureaucrat | Self::Gunslinger | Self::Scapegoat | Self::Beggar => {
                CharacterType::Traveler
            }
            Self::Storyteller => CharacterType::Storyteller,
        }
    }

    /// Effects every player with this character starts with, sourced from
    /// themself. Travelers get their alignment when they join.
    pub fn default_effects(self) -> Vec<EffectKind> {
        let kind = self.character_type();
        let marker = EffectKind::CharacterType(kind);
        match kind {
            CharacterType::Townsfolk | CharacterType::Outsider => {
                vec![EffectKind::Alignment(Alignment::Good), marker]
            }
            CharacterType::Minion | CharacterType::Demon => {
                vec![EffectKind::Alignment(Alignment::Evil), marker]
            }
            CharacterType::Traveler | CharacterType::Storyteller => vec![marker],
        }
    }

    /// The character's end-of-day hook.
    pub const fn evening(self) -> Evening {
        match self {
            Self::Mayor => Evening::MayorWin,
            _ => Evening::Idle,
        }
    }

    /// The shape of this character's ability.
    pub const fn ability(self) -> Ability {
        match self {
            Self::Washerwoman => Ability::SeesTwo {
                sees: CharacterType::Townsfolk,
            },
            Self::Librarian => Ability::SeesTwo {
                sees: CharacterType::Outsider,
            },
            Self::Investigator => Ability::SeesTwo {
                sees: CharacterType::Minion,
            },
            Self::Monk => Ability::Apply {
                kind: EffectKind::SafeFromDemon,
                policy: EffectPolicy::ongoing().until_morning(),
                verb: "protect",
                self_target: false,
            },
            Self::Poisoner => Ability::Apply {
                kind: EffectKind::Poisoned,
                policy: EffectPolicy::ongoing().until_evening(),
                verb: "poison",
                self_target: true,
            },
            Self::Thief => Ability::Apply {
                kind: EffectKind::Thiefed,
                policy: EffectPolicy::permanent().until_evening(),
                verb: "steal votes from",
                self_target: true,
            },
            Self::Bureaucrat => Ability::Apply {
                kind: EffectKind::Bureaucrated,
                policy: EffectPolicy::permanent().until_evening(),
                verb: "give three votes to",
                self_target: true,
            },
            Self::Imp => Ability::DemonKill {
                kind: EffectKind::Dead,
                follow_up: FollowUp::Starpass,
            },
            Self::Vigormortis => Ability::DemonKill {
                kind: EffectKind::VigormortisDead,
                follow_up: FollowUp::PoisonNeighbor,
            },
            Self::Professor => Ability::Revive,
            Self::Virgin => Ability::NominationTrap,
            _ => Ability::Manual,
        }
    }

    /// Guards applied to every hook of this character.
    pub const fn guards(self) -> Guards {
        match self {
            Self::Professor | Self::Virgin => Guards {
                run_if_drunkpoisoned: true,
                one_time: true,
            },
            Self::Washerwoman
            | Self::Librarian
            | Self::Investigator
            | Self::Monk
            | Self::Poisoner
            | Self::Thief
            | Self::Bureaucrat => Guards {
                run_if_drunkpoisoned: true,
                one_time: false,
            },
            _ => Guards {
                run_if_drunkpoisoned: false,
                one_time: false,
            },
        }
    }
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl core::fmt::Display for Character {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for character in Character::ALL {
            assert_eq!(Character::from_name(character.name()), Some(character));
        }
        assert_eq!(
            Character::from_name("fortune teller"),
            Some(Character::FortuneTeller)
        );
        assert_eq!(
            Character::from_name("SCARLETWOMAN"),
            Some(Character::ScarletWoman)
        );
        assert_eq!(Character::from_name("Legion"), None);
    }

    #[test]
    fn default_effects_follow_category() {
        assert_eq!(
            Character::Chef.default_effects(),
            vec![
                EffectKind::Alignment(Alignment::Good),
                EffectKind::CharacterType(CharacterType::Townsfolk)
            ]
        );
        assert_eq!(
            Character::Imp.default_effects(),
            vec![
                EffectKind::Alignment(Alignment::Evil),
                EffectKind::CharacterType(CharacterType::Demon)
            ]
        );
        assert_eq!(
            Character::Thief.default_effects(),
            vec![EffectKind::CharacterType(CharacterType::Traveler)]
        );
    }

    #[test]
    fn guards_match_ability_shapes() {
        assert!(Character::Professor.guards().one_time);
        assert!(Character::Monk.guards().run_if_drunkpoisoned);
        assert!(!Character::Imp.guards().run_if_drunkpoisoned);
        assert_eq!(Character::Chef.ability(), Ability::Manual);
    }
}
