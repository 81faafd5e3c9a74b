//! Event batch composition for every mutation, and the service that sends
//! the batches over the bus.
//!
//! The batch builders are pure so their contents and ordering can be tested
//! without a socket; [`MessagesService`] glues them to the client. A batch
//! that cannot be built (which would mean the mutation itself produced an
//! inconsistent result) is logged and dropped, never surfaced to the request
//! that already committed.

use super::MessagesClient;
use crate::services::gamerooms::DisconnectResult;
use crate::services::games::GameDisconnectResult;
use tracing::error;
use tuicub::error::Error;
use tuicub::events::Message;
use tuicub::game::Game;
use tuicub::gameroom::Gameroom;
use tuicub::tile::Tile;
use tuicub::user::User;

/// Events after a move, undo or redo: the board and player list for
/// everyone, the changed rack for the actor.
pub fn tiles_moved_batch(sender: &User, game: &Game) -> Result<Vec<Message>, Error> {
    Ok(vec![
        Message::board_changed(game),
        Message::players_changed(game),
        Message::rack_changed(game, sender)?,
    ])
}

/// Events after a draw: board, pile count and players for everyone; the
/// drawn tile, the new rack and the turn end for the drawer; the turn start
/// for the next player.
pub fn tile_drawn_batch(
    sender: &User,
    tile: Tile,
    game: &Game,
) -> Result<Vec<Message>, Error> {
    Ok(vec![
        Message::board_changed(game),
        Message::pile_count_changed(game),
        Message::tile_drawn(tile, sender),
        Message::rack_changed(game, sender)?,
        Message::players_changed(game),
        Message::turn_ended(sender),
        Message::turn_started(game)?,
    ])
}

/// Events after ending a turn. A win collapses the batch to `player_won`.
pub fn turn_ended_batch(sender: &User, game: &Game) -> Result<Vec<Message>, Error> {
    if let Some(winner) = &game.winner {
        return Ok(vec![Message::player_won(winner, game)]);
    }
    Ok(vec![
        Message::board_changed(game),
        Message::players_changed(game),
        Message::turn_ended(sender),
        Message::turn_started(game)?,
    ])
}

/// Events after a player disconnects from a running game.
pub fn game_disconnect_batch(result: &GameDisconnectResult) -> Result<Vec<Message>, Error> {
    let game = &result.game;
    let mut batch = vec![
        Message::player_left(&result.player, game),
        Message::players_changed(game),
    ];

    if let Some(winner) = &game.winner {
        batch.push(Message::player_won(winner, game));
        return Ok(batch);
    }

    batch.push(Message::pile_count_changed(game));
    if result.turn.is_some() {
        batch.push(Message::board_changed(game));
        batch.push(Message::turn_started(game)?);
    }
    Ok(batch)
}

/// Events after a lobby-level disconnect: the gameroom deletion when the
/// owner drops, otherwise a plain leave. No gameroom, no events.
pub fn gameroom_disconnect_batch(sender: &User, result: &DisconnectResult) -> Vec<Message> {
    let Some(gameroom) = &result.gameroom else {
        return Vec::new();
    };

    if gameroom.owner_id == sender.id {
        vec![Message::gameroom_deleted(gameroom, &result.remaining_users)]
    } else {
        vec![Message::user_left(sender, gameroom)]
    }
}

/// `game_started`, one message per player other than the starter, each with
/// that player's private view.
pub fn game_started_batch(sender: &User, game: &Game) -> Vec<Message> {
    game.game_state
        .players
        .iter()
        .filter(|player| player.user_id != sender.id)
        .map(|player| Message::game_started(game, player))
        .collect()
}

/// Builds and delivers event batches for every mutation.
pub struct MessagesService {
    client: MessagesClient,
}

impl MessagesService {
    pub fn new(client: MessagesClient) -> Self {
        Self { client }
    }

    pub async fn user_joined(&self, sender: &User, gameroom: &Gameroom) {
        self.client
            .send(&[Message::user_joined(sender, gameroom)])
            .await;
    }

    pub async fn user_left(&self, sender: &User, gameroom: &Gameroom) {
        self.client
            .send(&[Message::user_left(sender, gameroom)])
            .await;
    }

    pub async fn gameroom_deleted(&self, gameroom: &Gameroom, remaining_users: &[User]) {
        self.client
            .send(&[Message::gameroom_deleted(gameroom, remaining_users)])
            .await;
    }

    pub async fn game_started(&self, sender: &User, game: &Game) {
        self.client.send(&game_started_batch(sender, game)).await;
    }

    pub async fn tiles_moved(&self, sender: &User, game: &Game) {
        self.send_batch(tiles_moved_batch(sender, game)).await;
    }

    pub async fn tile_drawn(&self, sender: &User, tile: Tile, game: &Game) {
        self.send_batch(tile_drawn_batch(sender, tile, game)).await;
    }

    pub async fn turn_ended(&self, sender: &User, game: &Game) {
        self.send_batch(turn_ended_batch(sender, game)).await;
    }

    pub async fn disconnected_game(&self, result: &GameDisconnectResult) {
        self.send_batch(game_disconnect_batch(result)).await;
    }

    pub async fn disconnected_gameroom(&self, sender: &User, result: &DisconnectResult) {
        self.client
            .send(&gameroom_disconnect_batch(sender, result))
            .await;
    }

    async fn send_batch(&self, batch: Result<Vec<Message>, Error>) {
        match batch {
            Ok(batch) => self.client.send(&batch).await,
            Err(err) => {
                error!(error_name = err.error_name(), "Failed to build event batch")
            }
        }
    }
}
