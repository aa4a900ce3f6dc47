//! Plain-text rendering of announcements and night calls.
//!
//! The narrator reads the game and a [`PreferencesStore`] but changes
//! nothing. Players are named by nickname when they have one.

use std::fmt::Write as _;

use clocktower_types::{CharacterType, ExecutionOutcome, PlayerId, Winner};

use crate::announce::{Announcement, Notice};
use crate::character::Character;
use crate::game::Game;
use crate::night::NightCall;
use crate::prefs::{PreferencesStore, Pronouns};
use crate::tools::{default_distribution, list_to_plural_string};

/// Renders game events for people.
pub struct Narrator<'a> {
    game: &'a Game,
    prefs: &'a dyn PreferencesStore,
}

impl<'a> Narrator<'a> {
    /// A narrator over `game`.
    pub const fn new(game: &'a Game, prefs: &'a dyn PreferencesStore) -> Self {
        Self { game, prefs }
    }

    /// Nickname, falling back to the player's name, then the raw id.
    pub fn name(&self, player: PlayerId) -> String {
        self.prefs
            .nick(player)
            .or_else(|| self.game.player(player).map(|p| p.name().to_owned()))
            .unwrap_or_else(|| player.to_string())
    }

    fn pronouns(&self, player: PlayerId) -> Pronouns {
        self.prefs.pronouns(player)
    }

    /// How a nominator or nominee is referred to in public.
    fn mention(&self, player: PlayerId) -> String {
        if self.game.is_storyteller(player) {
            "the storytellers".to_owned()
        } else {
            self.name(player)
        }
    }

    fn list(&self, players: &[PlayerId], alt: &str) -> (String, bool) {
        let names: Vec<String> = players.iter().map(|p| self.name(*p)).collect();
        list_to_plural_string(&names, alt)
    }

    /// Render an announcement.
    pub fn render(&self, announcement: &Announcement) -> String {
        self.render_notice(&announcement.notice)
    }

    /// Render a notice.
    #[allow(clippy::too_many_lines)]
    pub fn render_notice(&self, notice: &Notice) -> String {
        match notice {
            Notice::NightFalls => "Night has fallen.".to_owned(),
            Notice::Deaths { players } => {
                let (names, plural) = self.list(players, "No one");
                format!("{names} {} died.", if plural { "have" } else { "has" })
            }
            Notice::WakeUp => "Wake up!".to_owned(),
            Notice::GoToSleep => "Go to sleep!".to_owned(),
            Notice::PmsOpened => "PMs are now open.".to_owned(),
            Notice::PmsClosed => "PMs are now closed.".to_owned(),
            Notice::NominationsOpened => "Nominations are now open.".to_owned(),
            Notice::NominationsClosed => "Nominations are now closed.".to_owned(),
            Notice::Nomination {
                nominator,
                nominee,
                exile,
                needed,
                to_tie,
            } => self.nomination(*nominator, *nominee, *exile, *needed, *to_tie),
            Notice::VoteCalled { voter, nominee } => {
                format!("{}, your vote on {}.", self.name(*voter), self.mention(*nominee))
            }
            Notice::NoDeadVotes { .. } => "You have no dead votes. Voting no.".to_owned(),
            Notice::VoteCast { voter, yes, votes } => format!(
                "{} votes {}. {votes} votes.",
                self.name(*voter),
                if *yes { "yes" } else { "no" }
            ),
            Notice::VoteEnded {
                nominee,
                nominator,
                votes,
                voted,
                passed,
                exile,
            } => {
                let (voters, _) = self.list(voted, "no one");
                let pronouns = self.pronouns(*nominee);
                format!(
                    "{votes} votes on {} (nominated by {}): {voters}. {} {}{} about to be {}.",
                    self.mention(*nominee),
                    self.mention(*nominator),
                    capitalize(&pronouns.subject),
                    pronouns.verb("is", "are"),
                    if *passed { "" } else { " not" },
                    if *exile { "exiled" } else { "executed" },
                )
            }
            Notice::LeaderSpared { player, .. } => {
                let pronouns = self.pronouns(*player);
                format!(
                    "{} {} no longer about to be executed.",
                    self.mention(*player),
                    pronouns.verb("is", "are")
                )
            }
            Notice::Unpin { messages } => format!("{} vote messages to unpin.", messages.len()),
            Notice::NominationCancelled => "Nomination cancelled.".to_owned(),
            Notice::Executed { player, outcome } => self.removal(*player, *outcome, "executed"),
            Notice::Exiled { player, outcome } => self.removal(*player, *outcome, "exiled"),
            Notice::NoExecution => "No one was executed.".to_owned(),
            Notice::Revived { player } => {
                format!("{} has come back to life.", self.name(*player))
            }
            Notice::CharacterChanged { player, character } => {
                format!("{} is now the {character}.", self.name(*player))
            }
            Notice::PrivateMessage { from, content, .. } => {
                format!("Message from {}: **{content}**", self.name(*from))
            }
            Notice::SpeakingStatus { silent } => match silent.as_slice() {
                [] => "Everyone has spoken!".to_owned(),
                [last] => format!("Just {} to speak.", self.name(*last)),
                many => format!("{} players have not spoken.", many.len()),
            },
            Notice::Skipped { player } => format!(
                "{} has skipped {} nomination.",
                self.name(*player),
                self.pronouns(*player).possessive
            ),
            Notice::TravelerJoined { player, character } => format!(
                "{} has joined the town as the {character}.",
                self.name(*player)
            ),
            Notice::TravelerLeft { player } => {
                format!("{} has left the town.", self.name(*player))
            }
            Notice::MayorWin { mayor } => format!(
                "{} (Mayor): three players live and no one was executed. Good may win.",
                self.name(*mayor)
            ),
            Notice::GameEnded { winner } => match winner {
                Winner::Good => "Good has won!".to_owned(),
                Winner::Evil => "Evil has won!".to_owned(),
                Winner::Neutral => "The game has ended.".to_owned(),
            },
        }
    }

    fn nomination(
        &self,
        nominator: PlayerId,
        nominee: PlayerId,
        exile: bool,
        needed: u32,
        to_tie: Option<i32>,
    ) -> String {
        let has = |player| {
            if self.game.is_storyteller(player) {
                "have"
            } else {
                "has"
            }
        };
        let mut text = if exile {
            format!(
                "{} {} called for {}'s exile. {needed} to exile.",
                self.mention(nominator),
                has(nominator),
                self.mention(nominee)
            )
        } else {
            format!(
                "{} {} been nominated by {}. {needed} to execute.",
                self.mention(nominee),
                has(nominee),
                self.mention(nominator)
            )
        };
        if let Some(tie) = to_tie {
            let _ = write!(text, " {tie} to tie.");
        }
        text
    }

    fn removal(&self, player: PlayerId, outcome: ExecutionOutcome, how: &str) -> String {
        let name = self.name(player);
        let pronouns = self.pronouns(player);
        match outcome {
            ExecutionOutcome::Died => format!(
                "{name} has been {how}, and {} {}.",
                pronouns.subject,
                pronouns.verb("dies", "die")
            ),
            ExecutionOutcome::AlreadyDead => format!(
                "{name} has been {how}, but {} {} already dead.",
                pronouns.subject,
                pronouns.verb("is", "are")
            ),
            ExecutionOutcome::Survived => format!(
                "{name} has been {how}, but {} {} not die.",
                pronouns.subject,
                pronouns.verb("does", "do")
            ),
        }
    }

    /// Render what the storyteller must do at a night step.
    pub fn render_call(&self, call: &NightCall) -> String {
        match call {
            NightCall::MinionInfo { minions, demons } => format!(
                "Wake the minions ({}) and show them the demon: {}.",
                self.list(minions, "none").0,
                self.list(demons, "none").0
            ),
            NightCall::DemonInfo {
                demons,
                minions,
                bluffs,
            } => format!(
                "Wake the demon ({}) and show them their minions ({}). Unused good characters: {}.",
                self.list(demons, "none").0,
                self.list(minions, "none").0,
                Self::character_list(bluffs)
            ),
            NightCall::ChooseTarget {
                player,
                character,
                verb,
                optional,
            } => {
                let pronouns = self.pronouns(*player);
                let mut text = format!(
                    "Wake {} ({character}). Who {} {} {verb}?",
                    self.name(*player),
                    pronouns.verb("does", "do"),
                    pronouns.subject
                );
                if *optional {
                    let _ = write!(text, " {} may choose no one.", capitalize(&pronouns.subject));
                }
                text
            }
            NightCall::SeesTwo {
                player,
                character,
                sees,
                enabled,
            } => {
                let mut text = format!(
                    "Wake {} ({character}). Choose two players, the first of whom is a {}.",
                    self.name(*player),
                    sees.status().label()
                );
                if !*enabled {
                    let pronouns = self.pronouns(*player);
                    let _ = write!(
                        text,
                        " {} {} drunk or poisoned, so any two players will do.",
                        capitalize(&pronouns.subject),
                        pronouns.verb("is", "are")
                    );
                }
                text
            }
            NightCall::Manual { player, character } => format!(
                "Wake {} ({character}) and resolve {} ability by hand.",
                self.name(*player),
                self.pronouns(*player).possessive
            ),
            NightCall::Dawn => "Dawn is coming. Confirm to wake the town.".to_owned(),
        }
    }

    /// The seating order with dead-vote tokens, followed by the default
    /// character distribution for the number of non-travelers.
    pub fn seating_message(&self) -> String {
        let mut text = "**Seating Order:**".to_owned();
        for player in self.game.seating() {
            text.push('\n');
            let name = self.name(player.id());
            if player.ghost(self.game, true) {
                let tokens = if player.dead_votes() == 0 {
                    "X".to_owned()
                } else {
                    "O".repeat(usize::try_from(player.dead_votes()).unwrap_or(usize::MAX))
                };
                let _ = write!(text, "~~{name}~~ {tokens}");
            } else {
                text.push_str(&name);
            }
            if player.character().character_type() == CharacterType::Traveler {
                let _ = write!(text, " - {}", player.character());
            }
        }

        let residents = self
            .game
            .seating()
            .iter()
            .filter(|p| p.character().character_type() != CharacterType::Traveler)
            .count();
        let _ = write!(text, "\n\nThere are {residents} non-Traveler players. ");
        match u32::try_from(residents).ok().and_then(default_distribution) {
            Some(split) => {
                let _ = write!(
                    text,
                    "The default distribution is {} Townsfolk, {} {}, {} {}, and {} Demon.",
                    split.townsfolk,
                    split.outsiders,
                    plural(split.outsiders, "Outsider"),
                    split.minions,
                    plural(split.minions, "Minion"),
                    split.demons
                );
            }
            None => text.push_str("There is no default distribution for that many players."),
        }
        text
    }

    /// Characters rendered by name.
    pub fn character_list(characters: &[Character]) -> String {
        let names: Vec<String> = characters.iter().map(|c| c.name().to_owned()).collect();
        list_to_plural_string(&names, "none").0
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn plural(count: u32, noun: &str) -> String {
    if count == 1 {
        noun.to_owned()
    } else {
        format!("{noun}s")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::effect::{EffectKind, EffectPolicy};
    use crate::prefs::MemoryPreferences;
    use crate::testing::{game_with, id, storyteller};

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
    fn names_prefer_nicknames() {
        let mut prefs = MemoryPreferences::default();
        prefs.set_nick(id(1), "Ash");
        let game = game_with(&SEVEN);
        let narrator = Narrator::new(&game, &prefs);
        assert_eq!(narrator.name(id(1)), "Ash");
        assert_eq!(narrator.name(id(2)), "player 2");
        assert_eq!(narrator.name(id(404)), "404");
    }

    #[test]
    fn vote_end_uses_pronouns() {
        let mut prefs = MemoryPreferences::default();
        prefs.set_pronouns(id(3), crate::prefs::Pronouns::she());
        let game = game_with(&SEVEN);
        let narrator = Narrator::new(&game, &prefs);
        let text = narrator.render_notice(&Notice::VoteEnded {
            nominee: id(3),
            nominator: id(1),
            votes: 2,
            voted: vec![id(4), id(5)],
            passed: false,
            exile: false,
        });
        assert_eq!(
            text,
            "2 votes on player 3 (nominated by player 1): player 4 and player 5. She is not about to be executed."
        );
        let text = narrator.render_notice(&Notice::Executed {
            player: id(2),
            outcome: ExecutionOutcome::Died,
        });
        assert_eq!(text, "player 2 has been executed, and they die.");
    }

    #[test]
    fn nominations_mention_storytellers() {
        let prefs = MemoryPreferences::default();
        let game = game_with(&SEVEN);
        let narrator = Narrator::new(&game, &prefs);
        let text = narrator.render_notice(&Notice::Nomination {
            nominator: id(1),
            nominee: storyteller(),
            exile: false,
            needed: 4,
            to_tie: Some(3),
        });
        assert_eq!(
            text,
            "the storytellers have been nominated by player 1. 4 to execute. 3 to tie."
        );
    }

    #[test]
    fn seating_message_shows_tokens_and_distribution() {
        let prefs = MemoryPreferences::default();
        let mut game = game_with(&SEVEN);
        game.add_effect(id(2), EffectKind::Dead, EffectPolicy::permanent(), id(2))
            .unwrap();
        game.add_effect(id(4), EffectKind::Dead, EffectPolicy::permanent(), id(4))
            .unwrap();
        game.player_mut(id(4)).unwrap().dead_votes = 0;
        game.add_traveler(
            id(9),
            "player 9",
            Character::Beggar,
            id(7),
            clocktower_types::Alignment::Good,
        )
        .unwrap();
        let text = Narrator::new(&game, &prefs).seating_message();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"**Seating Order:**"));
        assert!(lines.contains(&"~~player 2~~ O"));
        assert!(lines.contains(&"~~player 4~~ X"));
        assert!(lines.contains(&"player 9 - Beggar"));
        assert!(text.ends_with(
            "There are 7 non-Traveler players. The default distribution is 5 Townsfolk, 0 Outsiders, 1 Minion, and 1 Demon."
        ));
    }

    #[test]
    fn night_calls_read_naturally() {
        let prefs = MemoryPreferences::default();
        let game = game_with(&SEVEN);
        let narrator = Narrator::new(&game, &prefs);
        let text = narrator.render_call(&NightCall::ChooseTarget {
            player: id(4),
            character: Character::Monk,
            verb: "protect",
            optional: true,
        });
        assert_eq!(
            text,
            "Wake player 4 (Monk). Who do they protect? They may choose no one."
        );
        let text = narrator.render_call(&NightCall::SeesTwo {
            player: id(1),
            character: Character::Washerwoman,
            sees: CharacterType::Townsfolk,
            enabled: false,
        });
        assert!(text.ends_with("They are drunk or poisoned, so any two players will do."));
    }
}
