//! The events pushed to connected users, and the recipient derivation for
//! each of them.
//!
//! An [`Event`] serializes as `{"name": ..., "data": {...}}`; a [`Message`]
//! pairs an event with the user ids it should reach. Constructors compute
//! the recipient set the moment the event is built, from the game or
//! gameroom that produced it.

use crate::dto::{create_players, GameDto, GameroomDto, PlayerDto, UserDto};
use crate::error::Error;
use crate::game::{Game, Player};
use crate::gameroom::Gameroom;
use crate::tile::Tile;
use crate::user::User;
use serde::Serialize;
use uuid::Uuid;

/// An event and its payload, as delivered to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", content = "data", rename_all = "snake_case")]
pub enum Event {
    UserJoined { user: UserDto },
    UserLeft { user: UserDto },
    GameroomDeleted { gameroom: GameroomDto },
    GameStarted { game: GameDto },
    BoardChanged { board: Vec<Vec<u8>>, new_tiles: Vec<u8> },
    PlayersChanged { players: Vec<PlayerDto> },
    RackChanged { rack: Vec<u8> },
    PileCountChanged { pile_count: usize },
    TileDrawn { tile: u8 },
    TurnEnded {},
    TurnStarted {},
    PlayerLeft { player: PlayerDto },
    PlayerWon { winner: PlayerDto },
}

impl Event {
    /// The wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserJoined { .. } => "user_joined",
            Event::UserLeft { .. } => "user_left",
            Event::GameroomDeleted { .. } => "gameroom_deleted",
            Event::GameStarted { .. } => "game_started",
            Event::BoardChanged { .. } => "board_changed",
            Event::PlayersChanged { .. } => "players_changed",
            Event::RackChanged { .. } => "rack_changed",
            Event::PileCountChanged { .. } => "pile_count_changed",
            Event::TileDrawn { .. } => "tile_drawn",
            Event::TurnEnded {} => "turn_ended",
            Event::TurnStarted {} => "turn_started",
            Event::PlayerLeft { .. } => "player_left",
            Event::PlayerWon { .. } => "player_won",
        }
    }
}

/// An event addressed to a set of users.
///
/// The field spelling `recipents` is part of the bus wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub recipents: Vec<Uuid>,
    pub event: Event,
}

impl Message {
    /// `user_joined`, to all gameroom users except the joiner.
    pub fn user_joined(sender: &User, gameroom: &Gameroom) -> Message {
        Message {
            recipents: all_users_but(sender, gameroom),
            event: Event::UserJoined {
                user: UserDto::new(sender),
            },
        }
    }

    /// `user_left`, to all gameroom users except the leaver.
    pub fn user_left(sender: &User, gameroom: &Gameroom) -> Message {
        Message {
            recipents: all_users_but(sender, gameroom),
            event: Event::UserLeft {
                user: UserDto::new(sender),
            },
        }
    }

    /// `gameroom_deleted`, to the users that were in the gameroom when it
    /// was deleted, except the owner.
    pub fn gameroom_deleted(gameroom: &Gameroom, remaining_users: &[User]) -> Message {
        Message {
            recipents: remaining_users.iter().map(|user| user.id).collect(),
            event: Event::GameroomDeleted {
                gameroom: GameroomDto::new(gameroom),
            },
        }
    }

    /// `game_started`, to one player, with their private view of the game.
    pub fn game_started(game: &Game, player: &Player) -> Message {
        Message {
            recipents: vec![player.user_id],
            event: Event::GameStarted {
                game: GameDto::for_player(game, player),
            },
        }
    }

    /// `board_changed`, to all players.
    pub fn board_changed(game: &Game) -> Message {
        let board = game
            .game_state
            .board
            .tilesets()
            .iter()
            .map(|tileset| {
                tileset
                    .presentation_order()
                    .iter()
                    .map(|tile| tile.id())
                    .collect()
            })
            .collect();
        Message {
            recipents: all_players(game),
            event: Event::BoardChanged {
                board,
                new_tiles: ids(&game.new_tiles()),
            },
        }
    }

    /// `players_changed`, to all players, in turn order.
    pub fn players_changed(game: &Game) -> Message {
        Message {
            recipents: all_players(game),
            event: Event::PlayersChanged {
                players: create_players(game),
            },
        }
    }

    /// `rack_changed`, to the acting player only.
    pub fn rack_changed(game: &Game, user: &User) -> Result<Message, Error> {
        let player = game.player_for_user_id(user.id)?;
        Ok(Message {
            recipents: vec![user.id],
            event: Event::RackChanged {
                rack: ids(&player.rack.presentation_order()),
            },
        })
    }

    /// `pile_count_changed`, to all players.
    pub fn pile_count_changed(game: &Game) -> Message {
        Message {
            recipents: all_players(game),
            event: Event::PileCountChanged {
                pile_count: game.game_state.pile.len(),
            },
        }
    }

    /// `tile_drawn`, to the drawer only.
    pub fn tile_drawn(tile: Tile, user: &User) -> Message {
        Message {
            recipents: vec![user.id],
            event: Event::TileDrawn { tile: tile.id() },
        }
    }

    /// `turn_ended`, to the player whose turn ended.
    pub fn turn_ended(user: &User) -> Message {
        Message {
            recipents: vec![user.id],
            event: Event::TurnEnded {},
        }
    }

    /// `turn_started`, to the new turn holder.
    pub fn turn_started(game: &Game) -> Result<Message, Error> {
        let current = game.current_player()?;
        Ok(Message {
            recipents: vec![current.user_id],
            event: Event::TurnStarted {},
        })
    }

    /// `player_left`, to all remaining players.
    pub fn player_left(player: &Player, game: &Game) -> Message {
        Message {
            recipents: all_players(game),
            event: Event::PlayerLeft {
                player: departed_dto(player),
            },
        }
    }

    /// `player_won`, to all players.
    pub fn player_won(winner: &Player, game: &Game) -> Message {
        Message {
            recipents: all_players(game),
            event: Event::PlayerWon {
                winner: departed_dto(winner),
            },
        }
    }
}

fn all_users_but(sender: &User, gameroom: &Gameroom) -> Vec<Uuid> {
    gameroom
        .users
        .iter()
        .filter(|user| user.id != sender.id)
        .map(|user| user.id)
        .collect()
}

fn all_players(game: &Game) -> Vec<Uuid> {
    game.game_state
        .players
        .iter()
        .map(|player| player.user_id)
        .collect()
}

fn ids(tiles: &[Tile]) -> Vec<u8> {
    tiles.iter().map(|tile| tile.id()).collect()
}

/// The fixed shape used for players leaving or winning: no tiles, no turn.
fn departed_dto(player: &Player) -> PlayerDto {
    PlayerDto {
        user_id: player.user_id,
        name: player.name.clone(),
        tiles_count: 0,
        has_turn: false,
    }
}
