//! YAML scenarios: a seating, a script and the storyteller's commands.
//!
//! A scenario stands in for the chat platform. Each command is the call
//! the platform would make after collecting input, and every announcement
//! the game queues is rendered through the [`Narrator`] into a transcript.

use chrono::Utc;
use clocktower_core::tools::parse_vote;
use clocktower_core::vote::PrevoteOutcome;
use clocktower_core::{
    Audience, Character, Game, GameError, MemoryPreferences, Narrator, NightProgress, Reply,
    RulesConfig, Script, Seat, Selection,
};
use clocktower_types::{Alignment, PlayerId, Status, Winner};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::EngineError;

/// A whole scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Built-in script name.
    #[serde(default = "default_script")]
    pub script: String,

    /// Players in clockwise order.
    pub seating: Vec<SeatSpec>,

    /// Storytellers. Defaults to a single storyteller with id 0.
    #[serde(default = "default_storytellers")]
    pub storytellers: Vec<StorytellerSpec>,

    /// Nicknames, aliases and pronouns.
    #[serde(default)]
    pub preferences: MemoryPreferences,

    /// Commands to run, in order.
    #[serde(default)]
    pub commands: Vec<Command>,
}

fn default_script() -> String {
    String::from("Trouble Brewing")
}

fn default_storytellers() -> Vec<StorytellerSpec> {
    vec![StorytellerSpec {
        id: PlayerId(0),
        name: String::from("Storyteller"),
    }]
}

/// A seated player.
#[derive(Debug, Clone, Deserialize)]
pub struct SeatSpec {
    /// Platform id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Starting character.
    pub character: Character,
}

/// A storyteller.
#[derive(Debug, Clone, Deserialize)]
pub struct StorytellerSpec {
    /// Platform id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
}

/// One storyteller or player action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Print the seating order.
    Seating,
    /// Begin a night.
    StartNight,
    /// Resolve the current night step.
    Step(Selection),
    /// Resolve the current night step choosing nobody.
    Pass,
    /// Kill a player outside any ability during the night.
    NightKill(PlayerId),
    /// Open private messages.
    OpenPms,
    /// Close private messages.
    ClosePms,
    /// Open nominations.
    OpenNoms,
    /// Close nominations.
    CloseNoms,
    /// Send a private message.
    Message {
        /// Sender.
        from: PlayerId,
        /// Recipient.
        to: PlayerId,
        /// Body.
        content: String,
    },
    /// Nominate someone by name.
    Nominate {
        /// Name, nickname or alias of the nominee.
        nominee: String,
        /// Who nominates.
        nominator: PlayerId,
    },
    /// Vote now.
    Vote {
        /// The voter.
        voter: PlayerId,
        /// "yes", "no" and the like.
        answer: String,
    },
    /// Vote ahead of one's turn. Confirmed at once if it is already the
    /// voter's turn.
    Prevote {
        /// The voter.
        voter: PlayerId,
        /// "yes", "no" and the like.
        answer: String,
    },
    /// Cancel the running nomination.
    CancelVote,
    /// Skip one's nomination.
    Skip(PlayerId),
    /// Execute a player.
    Execute(PlayerId),
    /// Exile a traveler.
    Exile(PlayerId),
    /// Bring a player back to life.
    Revive(PlayerId),
    /// Poison a player, optionally sourced from another player.
    Poison {
        /// Who is poisoned.
        target: PlayerId,
        /// Who poisons them.
        #[serde(default)]
        source: Option<PlayerId>,
    },
    /// Make a player register as a status.
    Register {
        /// The player.
        player: PlayerId,
        /// What they register as.
        status: Status,
    },
    /// Drop every registration effect from a player.
    ClearRegistrations(PlayerId),
    /// Give a player a new character.
    ChangeCharacter {
        /// The player.
        player: PlayerId,
        /// The new character.
        character: Character,
    },
    /// Seat a traveler.
    AddTraveler {
        /// Platform id.
        id: PlayerId,
        /// Display name.
        name: String,
        /// Traveler character.
        character: Character,
        /// Seated clockwise after this player.
        neighbor: PlayerId,
        /// Chosen alignment.
        alignment: Alignment,
    },
    /// Unseat a traveler.
    RemoveTraveler(PlayerId),
    /// Replace the seating order.
    Reseat(Vec<PlayerId>),
    /// Skip the rest of the night, killing `kills`, and begin the day.
    StartDay {
        /// Extra night kills.
        #[serde(default)]
        kills: Vec<PlayerId>,
    },
    /// End the day.
    EndDay,
    /// End the day announcing that nobody was executed.
    NoExecution,
    /// End the game.
    EndGame(Winner),
}

impl Command {
    /// Short name for logs and errors.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Seating => "seating",
            Self::StartNight => "start_night",
            Self::Step(_) => "step",
            Self::Pass => "pass",
            Self::NightKill(_) => "night_kill",
            Self::OpenPms => "open_pms",
            Self::ClosePms => "close_pms",
            Self::OpenNoms => "open_noms",
            Self::CloseNoms => "close_noms",
            Self::Message { .. } => "message",
            Self::Nominate { .. } => "nominate",
            Self::Vote { .. } => "vote",
            Self::Prevote { .. } => "prevote",
            Self::CancelVote => "cancel_vote",
            Self::Skip(_) => "skip",
            Self::Execute(_) => "execute",
            Self::Exile(_) => "exile",
            Self::Revive(_) => "revive",
            Self::Poison { .. } => "poison",
            Self::Register { .. } => "register",
            Self::ClearRegistrations(_) => "clear_registrations",
            Self::ChangeCharacter { .. } => "change_character",
            Self::AddTraveler { .. } => "add_traveler",
            Self::RemoveTraveler(_) => "remove_traveler",
            Self::Reseat(_) => "reseat",
            Self::StartDay { .. } => "start_day",
            Self::EndDay => "end_day",
            Self::NoExecution => "no_execution",
            Self::EndGame(_) => "end_game",
        }
    }
}

impl Scenario {
    /// Parse a scenario from YAML.
    pub fn parse(yaml: &str) -> Result<Self, EngineError> {
        serde_yml::from_str(yaml).map_err(|e| EngineError::Scenario {
            message: format!("failed to parse scenario YAML: {e}"),
        })
    }

    /// Set up the game described by the scenario.
    pub fn build(&self, rules: RulesConfig) -> Result<Game, EngineError> {
        let script = Script::builtin(&self.script).ok_or_else(|| EngineError::Scenario {
            message: format!("unknown script: {}", self.script),
        })?;
        let seats = self
            .seating
            .iter()
            .map(|seat| Seat::new(seat.id, seat.name.clone()))
            .collect();
        let characters = self.seating.iter().map(|seat| seat.character).collect();
        let storytellers = self
            .storytellers
            .iter()
            .map(|st| Seat::new(st.id, st.name.clone()))
            .collect();
        Ok(Game::new(seats, characters, storytellers, script, rules)?)
    }
}

/// Drives a game through a scenario's commands and collects the
/// narrated transcript.
pub struct Runner {
    game: Game,
    prefs: MemoryPreferences,
    transcript: Vec<String>,
}

impl Runner {
    /// Wrap a freshly built game.
    pub const fn new(game: Game, prefs: MemoryPreferences) -> Self {
        Self {
            game,
            prefs,
            transcript: Vec::new(),
        }
    }

    /// The game as it stands.
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Everything rendered so far.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Run every command, stopping at the first the game rejects.
    pub fn run_all(&mut self, commands: &[Command]) -> Result<(), EngineError> {
        for (index, command) in commands.iter().enumerate() {
            debug!(index, command = command.name(), "running command");
            self.run(command).map_err(|source| EngineError::Command {
                index,
                command: command.name(),
                source,
            })?;
            self.flush();
        }
        info!(
            commands = commands.len(),
            lines = self.transcript.len(),
            "scenario finished"
        );
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn run(&mut self, command: &Command) -> Result<(), GameError> {
        let game = &mut self.game;
        match command {
            Command::Seating => {
                let seating = Narrator::new(game, &self.prefs).seating_message();
                self.transcript.push(seating);
            }
            Command::StartNight => {
                let progress = game.start_night()?;
                self.record_progress(&progress);
            }
            Command::Step(selection) => {
                let progress = game.next_step(Reply::Answer(*selection))?;
                self.record_progress(&progress);
            }
            Command::Pass => {
                let progress = game.next_step(Reply::Answer(Selection::pass()))?;
                self.record_progress(&progress);
            }
            Command::NightKill(player) => game.add_night_kill(*player)?,
            Command::StartDay { kills } => {
                let report = game.start_day(kills)?;
                self.record_progress(&NightProgress::Dawn(report));
            }
            Command::OpenPms => game.open_pms()?,
            Command::ClosePms => game.close_pms()?,
            Command::OpenNoms => game.open_noms()?,
            Command::CloseNoms => game.close_noms()?,
            Command::Message { from, to, content } => {
                game.send_message(*from, *to, Reply::Answer(content.clone()), Utc::now())?;
            }
            Command::Nominate { nominee, nominator } => {
                let result = game.nominate(nominee, *nominator, &self.prefs)?;
                debug!(result = ?result, "nomination resolved");
            }
            Command::Vote { voter, answer } => game.vote(*voter, parse_vote(answer)?)?,
            Command::Prevote { voter, answer } => {
                let yes = parse_vote(answer)?;
                if game.prevote(*voter, yes)? == PrevoteOutcome::ConfirmNow {
                    game.confirm_prevote(*voter, yes, Reply::Answer(true))?;
                }
            }
            Command::CancelVote => game.cancel_vote()?,
            Command::Skip(player) => game.skip(*player)?,
            Command::Execute(player) => {
                game.execute(*player)?;
            }
            Command::Exile(player) => {
                game.exile(*player)?;
            }
            Command::Revive(player) => game.revive(*player)?,
            Command::Poison { target, source } => {
                game.poison(*target, *source)?;
            }
            Command::Register { player, status } => {
                game.make_register(*player, *status)?;
            }
            Command::ClearRegistrations(player) => {
                game.clear_registrations(*player)?;
            }
            Command::ChangeCharacter { player, character } => {
                game.change_character(*player, *character)?;
            }
            Command::AddTraveler {
                id,
                name,
                character,
                neighbor,
                alignment,
            } => game.add_traveler(*id, name.clone(), *character, *neighbor, *alignment)?,
            Command::RemoveTraveler(player) => game.remove_traveler(*player)?,
            Command::Reseat(order) => game.reseat(order)?,
            Command::EndDay => game.end_day()?,
            Command::NoExecution => game.announce_no_execution()?,
            Command::EndGame(winner) => game.end_game(*winner)?,
        }
        Ok(())
    }

    fn record_progress(&mut self, progress: &NightProgress) {
        if let NightProgress::Awaiting(prompt) = progress {
            let line = Narrator::new(&self.game, &self.prefs).render_call(&prompt.call);
            self.transcript.push(format!("[storyteller] {line}"));
        }
    }

    /// Render and record the queued announcements.
    fn flush(&mut self) {
        let announcements = self.game.take_announcements();
        let narrator = Narrator::new(&self.game, &self.prefs);
        for announcement in &announcements {
            let text = narrator.render(announcement);
            let line = match announcement.audience {
                Audience::Public => text,
                Audience::Storytellers => format!("[storyteller] {text}"),
                Audience::Player(player) => {
                    format!("[to {}] {text}", narrator.name(player))
                }
            };
            self.transcript.push(line);
        }
    }
}
