//! The JSON shapes the API and events put on the wire.

use crate::game::{Game, Player};
use crate::gameroom::{Gameroom, GameroomStatus};
use crate::user::User;
use serde::Serialize;
use uuid::Uuid;

/// The wire form of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
}

impl UserDto {
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// The wire form of a player. Racks are never exposed here, only their size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerDto {
    pub user_id: Uuid,
    pub name: String,
    pub tiles_count: usize,
    pub has_turn: bool,
}

/// The wire form of a game state, rendered for one recipient.
///
/// `rack` holds the recipient's own tiles; it is empty when the recipient is
/// not a player of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStateDto {
    pub players: Vec<PlayerDto>,
    pub board: Vec<Vec<u8>>,
    pub pile_count: usize,
    pub rack: Vec<u8>,
}

impl GameStateDto {
    /// Renders the game state for a user, who may or may not be a player.
    pub fn for_user(game: &Game, user_id: Uuid) -> Self {
        let rack = game
            .player_for_user_id(user_id)
            .map(|player| rack_ids(player))
            .unwrap_or_default();
        Self {
            players: create_players(game),
            board: game.game_state.board.as_ids(),
            pile_count: game.game_state.pile.len(),
            rack,
        }
    }

    /// Renders the game state for a known player.
    pub fn for_player(game: &Game, player: &Player) -> Self {
        Self {
            players: create_players(game),
            board: game.game_state.board.as_ids(),
            pile_count: game.game_state.pile.len(),
            rack: rack_ids(player),
        }
    }
}

/// The wire form of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameDto {
    pub id: Uuid,
    pub gameroom_id: Uuid,
    pub game_state: GameStateDto,
    pub winner: Option<PlayerDto>,
}

impl GameDto {
    pub fn for_user(game: &Game, user_id: Uuid) -> Self {
        Self {
            id: game.id,
            gameroom_id: game.gameroom_id,
            game_state: GameStateDto::for_user(game, user_id),
            winner: winner_dto(game),
        }
    }

    pub fn for_player(game: &Game, player: &Player) -> Self {
        Self {
            id: game.id,
            gameroom_id: game.gameroom_id,
            game_state: GameStateDto::for_player(game, player),
            winner: winner_dto(game),
        }
    }
}

/// The wire form of a gameroom. `created_at` is milliseconds since epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameroomDto {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub status: GameroomStatus,
    pub created_at: i64,
    pub users: Vec<UserDto>,
    pub game_id: Option<Uuid>,
}

impl GameroomDto {
    pub fn new(gameroom: &Gameroom) -> Self {
        Self {
            id: gameroom.id,
            name: gameroom.name.clone(),
            owner_id: gameroom.owner_id,
            status: gameroom.status,
            created_at: gameroom.created_at.timestamp_millis(),
            users: gameroom.users.iter().map(UserDto::new).collect(),
            game_id: gameroom.game.as_ref().map(|game| game.id),
        }
    }
}

/// The player list of a game, ordered by the turn order.
pub fn create_players(game: &Game) -> Vec<PlayerDto> {
    let mut players: Vec<PlayerDto> = game
        .game_state
        .players
        .iter()
        .map(|player| PlayerDto {
            user_id: player.user_id,
            name: player.name.clone(),
            tiles_count: player.rack.len(),
            has_turn: game.turn.player_id == player.id,
        })
        .collect();
    players.sort_by_key(|player| {
        game.turn_order
            .iter()
            .position(|&user_id| user_id == player.user_id)
            .unwrap_or(usize::MAX)
    });
    players
}

fn rack_ids(player: &Player) -> Vec<u8> {
    player.rack.tiles().iter().map(|tile| tile.id()).collect()
}

fn winner_dto(game: &Game) -> Option<PlayerDto> {
    game.winner.as_ref().map(|winner| PlayerDto {
        user_id: winner.user_id,
        name: winner.name.clone(),
        tiles_count: winner.rack.len(),
        has_turn: game.turn.player_id == winner.id,
    })
}
