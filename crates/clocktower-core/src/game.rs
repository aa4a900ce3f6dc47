//! The game aggregate.
//!
//! [`Game`] owns the seating, the storytellers, the script, the current and
//! past days and nights, and the queue of pending announcements. Players
//! refer to each other only by [`PlayerId`]; every lookup goes through the
//! game.
//!
//! Operations are split by concern across the crate: effect bookkeeping in
//! [`effect`](crate::effect), single-player operations in
//! [`player`](crate::player), night resolution in [`night`](crate::night),
//! and nominations and votes in [`day`](crate::day) and
//! [`vote`](crate::vote). This module holds construction, lookups, seating
//! changes and the end of the game.

use std::collections::BTreeSet;

use clocktower_types::{Alignment, CharacterType, EffectId, GameId, PlayerId, Status, Winner};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::announce::{Announcement, Notice};
use crate::character::Character;
use crate::config::RulesConfig;
use crate::day::Day;
use crate::effect::{EffectKind, EffectPolicy};
use crate::error::GameError;
use crate::night::Night;
use crate::player::Player;
use crate::prefs::PreferencesStore;
use crate::script::Script;

/// A platform member taking part in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Platform id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
}

impl Seat {
    /// Create a seat.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A game of Blood on the Clocktower.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub(crate) id: GameId,
    pub(crate) seating: Vec<Player>,
    pub(crate) storytellers: Vec<Player>,
    pub(crate) script: Script,
    pub(crate) rules: RulesConfig,
    pub(crate) current_day: Option<Day>,
    pub(crate) current_night: Option<Night>,
    pub(crate) past_days: Vec<Day>,
    pub(crate) past_nights: Vec<Night>,
    pub(crate) winner: Option<Winner>,
    #[serde(skip)]
    pub(crate) pending: Vec<Announcement>,
}

impl Game {
    /// Set up a game. `characters[i]` goes to `seats[i]`, and the seat order
    /// is the clockwise seating.
    pub fn new(
        seats: Vec<Seat>,
        characters: Vec<Character>,
        storytellers: Vec<Seat>,
        script: Script,
        rules: RulesConfig,
    ) -> Result<Self, GameError> {
        if seats.len() != characters.len() {
            return Err(GameError::invalid(format!(
                "{} players but {} characters",
                seats.len(),
                characters.len()
            )));
        }
        if seats.is_empty() {
            return Err(GameError::invalid("a game needs at least one player"));
        }
        let mut ids = BTreeSet::new();
        for seat in seats.iter().chain(storytellers.iter()) {
            if !ids.insert(seat.id) {
                return Err(GameError::invalid(format!(
                    "{} appears more than once",
                    seat.name
                )));
            }
        }
        if characters.contains(&Character::Storyteller) {
            return Err(GameError::invalid("the storyteller character cannot be seated"));
        }

        let seating: Vec<Player> = seats
            .into_iter()
            .zip(characters)
            .enumerate()
            .map(|(position, (seat, character))| {
                Player::new(
                    seat.id,
                    seat.name,
                    character,
                    Some(position),
                    rules.starting_dead_votes,
                )
            })
            .collect();
        let storytellers = storytellers
            .into_iter()
            .map(|seat| Player::new(seat.id, seat.name, Character::Storyteller, None, 0))
            .collect();

        let game = Self {
            id: GameId::new(),
            seating,
            storytellers,
            script,
            rules,
            current_day: None,
            current_night: None,
            past_days: Vec::new(),
            past_nights: Vec::new(),
            winner: None,
            pending: Vec::new(),
        };
        info!(game = %game.id, players = game.seating.len(), script = %game.script.name, "game created");
        Ok(game)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Game id.
    pub const fn id(&self) -> GameId {
        self.id
    }

    /// Seated players in clockwise order.
    pub fn seating(&self) -> &[Player] {
        &self.seating
    }

    /// Storytellers.
    pub fn storytellers(&self) -> &[Player] {
        &self.storytellers
    }

    /// Seated players followed by storytellers.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.seating.iter().chain(self.storytellers.iter())
    }

    pub(crate) fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.seating.iter_mut().chain(self.storytellers.iter_mut())
    }

    /// Any player or storyteller by id.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players().find(|p| p.id == id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players_mut().find(|p| p.id == id)
    }

    /// A seated player by id.
    pub fn seated(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.seating
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::missing(id))
    }

    pub(crate) fn seated_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.seating.iter_mut().find(|p| p.id == id)
    }

    /// Whether `id` is a storyteller.
    pub fn is_storyteller(&self, id: PlayerId) -> bool {
        self.storytellers.iter().any(|st| st.id == id)
    }

    /// The script in play.
    pub const fn script(&self) -> &Script {
        &self.script
    }

    /// The rules this game was started with.
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// The day in progress.
    pub const fn current_day(&self) -> Option<&Day> {
        self.current_day.as_ref()
    }

    /// The night in progress.
    pub const fn current_night(&self) -> Option<&Night> {
        self.current_night.as_ref()
    }

    /// Finished days, oldest first.
    pub fn past_days(&self) -> &[Day] {
        &self.past_days
    }

    /// Finished nights, oldest first.
    pub fn past_nights(&self) -> &[Night] {
        &self.past_nights
    }

    /// Days begun so far, counting the current one.
    pub fn day_number(&self) -> u32 {
        let days = self
            .past_days
            .len()
            .saturating_add(usize::from(self.current_day.is_some()));
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    /// The winner, once the game has ended.
    pub const fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub(crate) const fn ensure_running(&self) -> Result<(), GameError> {
        if self.winner.is_some() {
            return Err(GameError::GameOver);
        }
        Ok(())
    }

    /// Resolve a seated player from a name, nickname or alias.
    ///
    /// A case-insensitive exact match wins; otherwise the query must be a
    /// substring of exactly one player's names.
    pub fn find_player(
        &self,
        query: &str,
        prefs: &dyn PreferencesStore,
    ) -> Result<PlayerId, GameError> {
        let wanted = query.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(GameError::PlayerNotFound {
                query: query.to_owned(),
            });
        }
        let names_of = |p: &Player| -> Vec<String> {
            let mut names = vec![p.name.to_lowercase()];
            names.extend(prefs.nick(p.id).map(|n| n.to_lowercase()));
            names.extend(prefs.aliases(p.id).iter().map(|a| a.to_lowercase()));
            names
        };

        let exact: Vec<&Player> = self
            .seating
            .iter()
            .filter(|p| names_of(p).iter().any(|n| *n == wanted))
            .collect();
        let matches = if exact.is_empty() {
            self.seating
                .iter()
                .filter(|p| names_of(p).iter().any(|n| n.contains(&wanted)))
                .collect()
        } else {
            exact
        };

        match matches.as_slice() {
            [] => Err(GameError::PlayerNotFound {
                query: query.to_owned(),
            }),
            [only] => Ok(only.id),
            many => Err(GameError::AmbiguousPlayer {
                query: query.to_owned(),
                matches: many.iter().map(|p| p.name.clone()).collect(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Announcements
    // -----------------------------------------------------------------------

    pub(crate) fn announce(&mut self, announcement: Announcement) {
        self.pending.push(announcement);
    }

    /// Drain everything announced since the last call, oldest first.
    pub fn take_announcements(&mut self) -> Vec<Announcement> {
        std::mem::take(&mut self.pending)
    }

    // -----------------------------------------------------------------------
    // Seating changes
    // -----------------------------------------------------------------------

    /// Rearrange the seating. `order` must be a permutation of the seated
    /// players.
    pub fn reseat(&mut self, order: &[PlayerId]) -> Result<(), GameError> {
        self.ensure_running()?;
        if order.len() != self.seating.len() {
            return Err(GameError::SeatingLengthMismatch {
                expected: self.seating.len(),
                actual: order.len(),
            });
        }
        let unique: BTreeSet<PlayerId> = order.iter().copied().collect();
        if unique.len() != order.len() {
            return Err(GameError::invalid("a player appears twice in the new seating"));
        }
        if let Some(stranger) = order.iter().find(|id| self.seated(**id).is_err()) {
            return Err(GameError::missing(*stranger));
        }
        self.seating
            .sort_by_key(|p| order.iter().position(|id| *id == p.id));
        self.renumber();
        info!(players = order.len(), "seating rearranged");
        Ok(())
    }

    fn renumber(&mut self) {
        for (position, player) in self.seating.iter_mut().enumerate() {
            player.position = Some(position);
        }
    }

    /// Seat a traveler clockwise of `upward_neighbor`.
    pub fn add_traveler(
        &mut self,
        id: PlayerId,
        name: impl Into<String>,
        character: Character,
        upward_neighbor: PlayerId,
        alignment: Alignment,
    ) -> Result<(), GameError> {
        self.ensure_running()?;
        if character.character_type() != CharacterType::Traveler {
            return Err(GameError::invalid(format!("{character} is not a traveler")));
        }
        if self.player(id).is_some() {
            return Err(GameError::invalid(format!("{id} is already in the game")));
        }
        let at = self
            .seated(upward_neighbor)?
            .position
            .unwrap_or(0)
            .saturating_add(1);

        let name = name.into();
        let player = Player::new(
            id,
            name.clone(),
            character,
            Some(at),
            self.rules.starting_dead_votes,
        );
        self.seating.insert(at.min(self.seating.len()), player);
        self.renumber();
        self.attach(
            id,
            EffectKind::Alignment(alignment),
            EffectPolicy::permanent(),
            id,
        );
        info!(player = %id, character = %character, alignment = ?alignment, "traveler joined");
        self.announce(Announcement::public(Notice::TravelerJoined {
            player: id,
            character,
        }));
        Ok(())
    }

    /// Remove a traveler from the seating. Effects they caused on others end
    /// with them.
    pub fn remove_traveler(&mut self, id: PlayerId) -> Result<(), GameError> {
        self.ensure_running()?;
        let traveler = self.seated(id)?;
        if traveler.character.character_type() != CharacterType::Traveler {
            return Err(GameError::invalid(format!("{} is not a traveler", traveler.name)));
        }
        let in_vote = self
            .current_day
            .as_ref()
            .and_then(Day::current_vote)
            .is_some_and(|vote| vote.nominee() == id || vote.order().contains(&id));
        if in_vote {
            return Err(GameError::VoteInProgress);
        }
        for effect in self.sourced_effects(id) {
            self.delete_at(effect, 0);
        }
        self.seating.retain(|p| p.id != id);
        self.renumber();
        info!(player = %id, "traveler left");
        self.announce(Announcement::public(Notice::TravelerLeft { player: id }));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Storyteller overrides
    // -----------------------------------------------------------------------

    fn storyteller_source(&self, fallback: PlayerId) -> PlayerId {
        self.storytellers.first().map_or(fallback, |st| st.id)
    }

    /// Make `player` register as `status` until cleared.
    pub fn make_register(
        &mut self,
        player: PlayerId,
        status: Status,
    ) -> Result<EffectId, GameError> {
        self.ensure_running()?;
        self.seated(player)?;
        let source = self.storyteller_source(player);
        Ok(self.attach(
            player,
            EffectKind::Registers(status),
            EffectPolicy::permanent(),
            source,
        ))
    }

    /// Remove every registration override from `player`.
    pub fn clear_registrations(&mut self, player: PlayerId) -> Result<usize, GameError> {
        self.ensure_running()?;
        let ids: Vec<EffectId> = self
            .seated(player)?
            .effects
            .iter()
            .filter(|e| matches!(e.kind, EffectKind::Registers(_)))
            .map(|e| e.id)
            .collect();
        for id in &ids {
            self.delete_at(*id, 0);
        }
        Ok(ids.len())
    }

    /// Poison `target`. The poison follows its source: it lapses while the
    /// source is drunk, poisoned or dead.
    pub fn poison(
        &mut self,
        target: PlayerId,
        source: Option<PlayerId>,
    ) -> Result<EffectId, GameError> {
        self.ensure_running()?;
        self.seated(target)?;
        let source = match source {
            Some(source) => {
                if self.player(source).is_none() {
                    return Err(GameError::missing(source));
                }
                source
            }
            None => self.storyteller_source(target),
        };
        Ok(self.attach(target, EffectKind::Poisoned, EffectPolicy::ongoing(), source))
    }

    // -----------------------------------------------------------------------
    // End of game
    // -----------------------------------------------------------------------

    /// End the game. Everything but snapshots fails afterwards.
    pub fn end_game(&mut self, winner: Winner) -> Result<(), GameError> {
        self.ensure_running()?;
        self.drop_vote();
        if let Some(day) = self.current_day.take() {
            self.past_days.push(day);
        }
        if let Some(night) = self.current_night.take() {
            self.past_nights.push(night);
        }
        self.winner = Some(winner);
        info!(game = %self.id, winner = ?winner, "game over");
        self.announce(Announcement::public(Notice::GameEnded { winner }));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferences;
    use crate::testing::{finish_first_night, game_with, id, storyteller};

    #[test]
    fn construction_checks_lengths_and_ids() {
        let seats = vec![Seat::new(id(1), "alice"), Seat::new(id(2), "bob")];
        let err = Game::new(
            seats.clone(),
            vec![Character::Chef],
            Vec::new(),
            Script::trouble_brewing(),
            RulesConfig::default(),
        );
        assert!(matches!(err, Err(GameError::InvalidArgument { .. })));

        let err = Game::new(
            seats.clone(),
            vec![Character::Chef, Character::Imp],
            vec![Seat::new(id(2), "bob again")],
            Script::trouble_brewing(),
            RulesConfig::default(),
        );
        assert!(matches!(err, Err(GameError::InvalidArgument { .. })));

        let game = Game::new(
            seats,
            vec![Character::Chef, Character::Imp],
            vec![Seat::new(id(100), "st")],
            Script::trouble_brewing(),
            RulesConfig::default(),
        )
        .unwrap();
        assert_eq!(game.seating().len(), 2);
        assert_eq!(game.player(id(2)).unwrap().position(), Some(1));
        assert_eq!(game.player(id(100)).unwrap().position(), None);
        assert_eq!(game.player(id(1)).unwrap().dead_votes(), 1);
        assert!(game.is_storyteller(id(100)));
        assert_eq!(game.day_number(), 0);
    }

    #[test]
    fn find_player_prefers_exact_matches() {
        let mut prefs = MemoryPreferences::default();
        prefs.set_nick(id(2), "Bobby");
        prefs.add_alias(id(3), "tiny");
        let game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        assert_eq!(game.find_player("Player 1", &prefs).unwrap(), id(1));
        assert_eq!(game.find_player("bobby", &prefs).unwrap(), id(2));
        assert_eq!(game.find_player("TIN", &prefs).unwrap(), id(3));
        assert!(matches!(
            game.find_player("player", &prefs),
            Err(GameError::AmbiguousPlayer { matches, .. }) if matches.len() == 3
        ));
        assert!(matches!(
            game.find_player("  ", &prefs),
            Err(GameError::PlayerNotFound { .. })
        ));
    }

    #[test]
    fn reseat_checks_the_permutation() {
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        assert!(matches!(
            game.reseat(&[id(1), id(2)]),
            Err(GameError::SeatingLengthMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            game.reseat(&[id(1), id(1), id(2)]),
            Err(GameError::InvalidArgument { .. })
        ));
        assert!(matches!(
            game.reseat(&[id(1), id(2), storyteller()]),
            Err(GameError::PlayerNotFound { .. })
        ));
        game.reseat(&[id(3), id(1), id(2)]).unwrap();
        let order: Vec<PlayerId> = game.seating().iter().map(Player::id).collect();
        assert_eq!(order, vec![id(3), id(1), id(2)]);
        assert_eq!(game.player(id(3)).unwrap().position(), Some(0));
        assert_eq!(game.player(id(2)).unwrap().position(), Some(2));
    }

    #[test]
    fn travelers_join_beside_their_neighbor_and_leave() {
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        assert!(matches!(
            game.add_traveler(id(9), "player 9", Character::Chef, id(1), Alignment::Good),
            Err(GameError::InvalidArgument { .. })
        ));
        game.add_traveler(id(9), "player 9", Character::Thief, id(1), Alignment::Evil)
            .unwrap();
        let order: Vec<PlayerId> = game.seating().iter().map(Player::id).collect();
        assert_eq!(order, vec![id(1), id(9), id(2), id(3)]);
        assert!(game.is_status(id(9), Status::Evil));
        assert!(game.is_status(id(9), Status::Traveler));

        game.add_effect(id(2), EffectKind::Thiefed, EffectPolicy::permanent(), id(9))
            .unwrap();
        game.remove_traveler(id(9)).unwrap();
        assert!(game.player(id(9)).is_none());
        assert!(!game.is_status(id(2), Status::Thiefed));
        assert_eq!(game.player(id(3)).unwrap().position(), Some(2));
        assert!(matches!(
            game.remove_traveler(id(1)),
            Err(GameError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn registrations_can_be_added_and_cleared() {
        let mut game = game_with(&[Character::Recluse, Character::Imp, Character::Empath]);
        game.make_register(id(1), Status::Demon).unwrap();
        game.make_register(id(1), Status::Evil).unwrap();
        assert!(game.registers(id(1), Status::Demon));
        assert!(!game.is_status(id(1), Status::Demon));
        assert_eq!(game.clear_registrations(id(1)).unwrap(), 2);
        assert!(!game.registers(id(1), Status::Demon));
    }

    #[test]
    fn storyteller_poison_defaults_to_the_storyteller() {
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        let poison = game.poison(id(3), None).unwrap();
        assert_eq!(game.effect(poison).unwrap().source, storyteller());
        assert!(!game.functioning(id(3)));
        assert!(matches!(
            game.poison(id(3), Some(id(55))),
            Err(GameError::PlayerNotFound { .. })
        ));
    }

    #[test]
    fn ended_games_refuse_further_play() {
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.end_game(Winner::Good).unwrap();
        assert_eq!(game.winner(), Some(Winner::Good));
        assert!(game.current_day().is_none());
        assert!(matches!(game.start_night(), Err(GameError::GameOver)));
        assert!(matches!(game.execute(id(2)), Err(GameError::GameOver)));
        assert!(matches!(game.end_game(Winner::Evil), Err(GameError::GameOver)));
        assert!(
            game.take_announcements()
                .iter()
                .any(|a| a.notice == Notice::GameEnded { winner: Winner::Good })
        );
    }
}
