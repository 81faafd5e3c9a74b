//! Game rows.
//!
//! A game row owns the whole aggregate: the game state, the current turn and
//! its move ledger, and the players. Deleting the row deletes all of it.

use super::{key_for, Session, TreeKind};
use tuicub::error::Error;
use tuicub::game::Game;
use uuid::Uuid;

impl Session {
    /// Loads a game under its row lock, for mutation.
    pub async fn get_game_by_id(&mut self, id: Uuid) -> Result<Game, Error> {
        self.lock_row(id).await?;
        self.get_game_unlocked(id)
    }

    /// Loads a game without locking.
    pub fn get_game_unlocked(&self, id: Uuid) -> Result<Game, Error> {
        self.read_json(TreeKind::Games, &key_for(id))?
            .ok_or(Error::NotFound)
    }

    pub fn save_game(&mut self, game: &Game) -> Result<(), Error> {
        self.stage_put(TreeKind::Games, key_for(game.id), game)
    }

    pub fn delete_game(&mut self, game: &Game) {
        self.stage_delete(TreeKind::Games, key_for(game.id));
    }
}

#[cfg(test)]
mod tests {
    use crate::store::Store;
    use pretty_assertions::assert_eq;
    use tuicub::error::Error;
    use tuicub::gameroom::Gameroom;
    use tuicub::rng::GameRng;
    use tuicub::rules::create_game;
    use tuicub::user::User;

    fn sample_game() -> tuicub::game::Game {
        let gameroom = Gameroom::create(&User::new("Alice"))
            .unwrap()
            .with_joining(&User::new("Bob"))
            .unwrap();
        create_game(&gameroom, &mut GameRng::seeded(21)).unwrap()
    }

    #[tokio::test]
    async fn games_round_trip_with_their_whole_aggregate() {
        let store = Store::temporary();
        let game = sample_game();

        let mut session = store.session();
        session.save_game(&game).unwrap();
        session.commit().unwrap();

        let mut session = store.session();
        let loaded = session.get_game_by_id(game.id).await.unwrap();
        assert_eq!(game, loaded);
    }

    #[tokio::test]
    async fn deleting_a_game_removes_the_aggregate() {
        let store = Store::temporary();
        let game = sample_game();

        let mut session = store.session();
        session.save_game(&game).unwrap();
        session.commit().unwrap();

        let mut session = store.session();
        session.delete_game(&game);
        session.commit().unwrap();

        let mut session = store.session();
        assert!(matches!(
            session.get_game_by_id(game.id).await,
            Err(Error::NotFound)
        ));
    }
}
