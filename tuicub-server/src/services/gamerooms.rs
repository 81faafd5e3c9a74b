//! Lobby operations: gameroom lifecycle and membership.

use super::games::GamesService;
use crate::store::Session;
use std::sync::Mutex;
use tuicub::error::Error;
use tuicub::game::Game;
use tuicub::gameroom::Gameroom;
use tuicub::rng::GameRng;
use tuicub::rules;
use tuicub::user::User;
use uuid::Uuid;

/// The outcome of deleting a gameroom.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteGameroomResult {
    /// The gameroom after deletion.
    pub gameroom: Gameroom,
    /// The members that were in the gameroom, not counting the owner.
    pub remaining_users: Vec<User>,
}

/// The outcome of a lobby-level disconnect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisconnectResult {
    /// The gameroom the user was in, if any.
    pub gameroom: Option<Gameroom>,
    /// The running game of that gameroom, if any. When present, the
    /// game-layer disconnect owns the actual mutation.
    pub game: Option<Game>,
    /// The users remaining in the gameroom after the disconnect.
    pub remaining_users: Vec<User>,
}

pub struct GameroomsService {
    rng: Mutex<GameRng>,
}

impl GameroomsService {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(GameRng::from_entropy()),
        }
    }

    /// A service with a deterministic generator, for tests.
    pub fn with_rng(rng: GameRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// All gamerooms that have not been deleted.
    pub fn get_gamerooms(&self, session: &Session) -> Result<Vec<Gameroom>, Error> {
        session.get_gamerooms()
    }

    /// Creates a gameroom owned by the requesting user.
    pub fn create_gameroom(
        &self,
        session: &mut Session,
        user: &User,
    ) -> Result<Gameroom, Error> {
        let gameroom = Gameroom::create(user)?;
        session.save_gameroom(&gameroom)?;
        Ok(gameroom)
    }

    /// Adds the user to a starting gameroom.
    pub async fn join_gameroom(
        &self,
        session: &mut Session,
        user: &User,
        gameroom_id: Uuid,
    ) -> Result<Gameroom, Error> {
        let gameroom = session.get_gameroom_by_id(gameroom_id).await?;
        let gameroom = gameroom.with_joining(user)?;
        session.save_gameroom(&gameroom)?;
        Ok(gameroom)
    }

    /// Removes the user from a starting gameroom they are in.
    pub async fn leave_gameroom(
        &self,
        session: &mut Session,
        user: &User,
        gameroom_id: Uuid,
    ) -> Result<Gameroom, Error> {
        let gameroom = session.get_gameroom_by_id(gameroom_id).await?;
        let gameroom = gameroom.with_leaving(user)?;
        session.save_gameroom(&gameroom)?;
        Ok(gameroom)
    }

    /// Deletes a gameroom on behalf of its owner.
    pub async fn delete_gameroom(
        &self,
        session: &mut Session,
        user: &User,
        gameroom_id: Uuid,
    ) -> Result<DeleteGameroomResult, Error> {
        let gameroom = session.get_gameroom_by_id(gameroom_id).await?;
        let remaining_users: Vec<User> = gameroom
            .users
            .iter()
            .filter(|member| member.id != user.id)
            .cloned()
            .collect();

        let gameroom = gameroom.deleted(user)?;
        session.save_gameroom(&gameroom)?;
        Ok(DeleteGameroomResult {
            gameroom,
            remaining_users,
        })
    }

    /// Starts the game in a gameroom. Owner only, two players minimum.
    pub async fn start_game(
        &self,
        session: &mut Session,
        user: &User,
        gameroom_id: Uuid,
    ) -> Result<Game, Error> {
        let gameroom = session.get_gameroom_by_id(gameroom_id).await?;
        gameroom.ensure_is_owner(user)?;
        gameroom.ensure_starting()?;

        let game = {
            let mut rng = self.rng.lock().unwrap();
            rules::create_game(&gameroom, &mut *rng)?
        };
        session.save_game(&game)?;
        session.save_gameroom(&gameroom.with_started_game(game.clone()))?;
        Ok(game)
    }

    /// Handles a disconnect at the lobby level.
    ///
    /// If the user's gameroom has a running game the lobby stays untouched
    /// and the result carries the game for the game-layer disconnect.
    /// Otherwise the owner's disconnect deletes the gameroom and anyone
    /// else's makes them leave.
    pub async fn disconnect(
        &self,
        session: &mut Session,
        user: &User,
    ) -> Result<DisconnectResult, Error> {
        let Some(gameroom_id) = user.current_gameroom_id else {
            return Ok(DisconnectResult::default());
        };
        let Ok(gameroom) = session.get_gameroom_by_id(gameroom_id).await else {
            return Ok(DisconnectResult::default());
        };

        if gameroom.game.is_some() {
            return Ok(DisconnectResult {
                game: gameroom.game.clone(),
                remaining_users: gameroom.users.clone(),
                gameroom: Some(gameroom),
            });
        }

        if gameroom.is_owner(user) {
            let result = self.delete_gameroom(session, user, gameroom.id).await?;
            Ok(DisconnectResult {
                gameroom: Some(result.gameroom),
                game: None,
                remaining_users: result.remaining_users,
            })
        } else {
            let gameroom = self.leave_gameroom(session, user, gameroom.id).await?;
            Ok(DisconnectResult {
                remaining_users: gameroom.users.clone(),
                gameroom: Some(gameroom),
                game: None,
            })
        }
    }

    /// Finishes a game: deletes the game aggregate and its gameroom in the
    /// same transaction.
    pub async fn finish_game(
        &self,
        session: &mut Session,
        games: &GamesService,
        gameroom_id: Uuid,
    ) -> Result<(), Error> {
        let gameroom = session.get_gameroom_by_id(gameroom_id).await?;

        if let Some(game) = &gameroom.game {
            games.delete(session, game);
        }
        session.delete_gameroom(&gameroom.clone().without_game())?;
        Ok(())
    }
}
