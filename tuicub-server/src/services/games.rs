//! Operations on running games.

use crate::store::Session;
use std::sync::Mutex;
use tuicub::error::Error;
use tuicub::game::{Game, Player, Turn};
use tuicub::rng::GameRng;
use tuicub::rules;
use tuicub::tile::{Board, Tile};
use tuicub::user::User;
use uuid::Uuid;

/// The outcome of disconnecting a player from a running game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameDisconnectResult {
    /// The game after the disconnect.
    pub game: Game,
    /// The player that left.
    pub player: Player,
    /// The fresh turn, when the leaver held the turn.
    pub turn: Option<Turn>,
}

pub struct GamesService {
    rng: Mutex<GameRng>,
}

impl GamesService {
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

    /// Moves tiles from the user's rack and/or around the board.
    pub async fn move_tiles(
        &self,
        session: &mut Session,
        user: &User,
        game_id: Uuid,
        board: &[Vec<u8>],
    ) -> Result<Game, Error> {
        let (game, player) = self.ensure_game_player(session, user, game_id).await?;

        let candidate = Board::from_ids(board)?;
        let (rack, board) =
            rules::perform_move(&player.rack, &game.game_state.board, candidate)?;
        let game = game.with_new_move(rack, board, &player)?;

        session.save_game(&game)?;
        Ok(game)
    }

    /// Undoes the player's latest move this turn.
    pub async fn undo(
        &self,
        session: &mut Session,
        user: &User,
        game_id: Uuid,
    ) -> Result<Game, Error> {
        let (game, player) = self.ensure_game_player(session, user, game_id).await?;

        let game = game.with_undo(&player)?;

        session.save_game(&game)?;
        Ok(game)
    }

    /// Redoes a previously undone move.
    pub async fn redo(
        &self,
        session: &mut Session,
        user: &User,
        game_id: Uuid,
    ) -> Result<Game, Error> {
        let (game, player) = self.ensure_game_player(session, user, game_id).await?;

        let game = game.with_redo(&player)?;

        session.save_game(&game)?;
        Ok(game)
    }

    /// Ends the turn after validating the board and, for players that have
    /// not opened yet, the opening-meld rule.
    pub async fn end_turn(
        &self,
        session: &mut Session,
        user: &User,
        game_id: Uuid,
    ) -> Result<Game, Error> {
        let (game, _) = self.ensure_game_player(session, user, game_id).await?;
        game.turn.ensure_has_moves()?;
        rules::ensure_board_valid(&game)?;

        let game = if !game.has_made_meld(user.id) {
            rules::ensure_meld_valid(
                &game.turn.starting_rack,
                &game.game_state.board,
                &game.turn.starting_board,
            )?;
            game.with_new_meld(user.id)
        } else {
            game
        };
        let game = game.with_next_turn()?;

        session.save_game(&game)?;
        Ok(game)
    }

    /// Draws a random tile for the user and ends their turn.
    pub async fn draw(
        &self,
        session: &mut Session,
        user: &User,
        game_id: Uuid,
    ) -> Result<(Tile, Game), Error> {
        let (mut game, player) = self.ensure_game_player(session, user, game_id).await?;
        game.turn.ensure_has_no_moves()?;

        let tile = {
            let mut rng = self.rng.lock().unwrap();
            game.game_state.pile.draw(&mut *rng)?
        };
        let game = game.with_drawn_tile(tile, &player)?;
        let game = game.with_next_turn()?;

        session.save_game(&game)?;
        Ok((tile, game))
    }

    /// Removes a disconnected user's player from the game.
    pub async fn disconnect(
        &self,
        session: &mut Session,
        user: &User,
        game: Game,
    ) -> Result<GameDisconnectResult, Error> {
        // Reload under the game's row lock so a concurrent move serializes
        // with the disconnect.
        let game = session.get_game_by_id(game.id).await?;
        game.ensure_not_ended()?;
        let player = game.player_for_user_id(user.id)?.clone();

        let (game, turn) = {
            let mut rng = self.rng.lock().unwrap();
            game.with_disconnected_player(&player, &mut *rng)?
        };

        session.save_game(&game)?;
        Ok(GameDisconnectResult { game, player, turn })
    }

    /// Deletes a game and everything it owns.
    pub fn delete(&self, session: &mut Session, game: &Game) {
        session.delete_game(game);
    }

    async fn ensure_game_player(
        &self,
        session: &mut Session,
        user: &User,
        game_id: Uuid,
    ) -> Result<(Game, Player), Error> {
        let game = session.get_game_by_id(game_id).await?;
        game.ensure_not_ended()?;

        let player = game.player_for_user_id(user.id)?.clone();
        game.ensure_has_turn(&player)?;

        Ok((game, player))
    }
}
