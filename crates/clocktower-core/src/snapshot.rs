//! Opaque snapshots of a whole game.
//!
//! A snapshot is JSON and holds everything but pending announcements.
//! Platform handles ([`PlayerId`](clocktower_types::PlayerId),
//! [`MessageRef`](clocktower_types::MessageRef)) are stored as plain numbers;
//! the collaborator re-resolves them after a restore.

use tracing::info;

use crate::error::GameError;
use crate::game::Game;

impl Game {
    /// Serialize the game.
    pub fn snapshot(&self) -> Result<String, GameError> {
        let json = serde_json::to_string(self)?;
        info!(game = %self.id, bytes = json.len(), "snapshot taken");
        Ok(json)
    }

    /// Rebuild a game from [`Game::snapshot`] output.
    pub fn restore(json: &str) -> Result<Self, GameError> {
        let game: Self = serde_json::from_str(json)?;
        info!(game = %game.id, day = game.day_number(), "game restored");
        Ok(game)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::testing::{finish_first_night, game_with, id};

    #[test]
    fn round_trip_keeps_state_but_not_announcements() {
        let mut game = game_with(&[Character::Chef, Character::Imp, Character::Empath]);
        finish_first_night(&mut game);
        game.open_noms().unwrap();
        let json = game.snapshot().unwrap();

        let mut restored = Game::restore(&json).unwrap();
        assert_eq!(restored.id(), game.id());
        assert_eq!(restored.day_number(), 1);
        assert!(restored.current_day().unwrap().is_noms());
        assert!(restored.take_announcements().is_empty());
        assert_eq!(restored.snapshot().unwrap(), json);
        assert_eq!(
            restored.player(id(2)).unwrap().effects(),
            game.player(id(2)).unwrap().effects()
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            Game::restore("{\"not\": \"a game\"}"),
            Err(GameError::Snapshot { .. })
        ));
    }
}
