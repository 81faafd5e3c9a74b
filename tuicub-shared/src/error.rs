//! The application error type.
//!
//! Every error the server can surface to a client is a variant of [`Error`].
//! A variant carries the context that caused it; the HTTP status code, the
//! stable `error_name` used in logs, and the user-facing message are all
//! derived from the tag.

use crate::gameroom::GameroomStatus;
use crate::tile::{Board, Tileset};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

/// Board and rack context attached to move validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveInfo {
    pub rack: Tileset,
    pub current_board: Board,
    pub candidate_board: Board,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("The authentication token is either missing or is invalid.")]
    Unauthorized,

    #[error("Forbidden.")]
    Forbidden,

    #[error("Resource not found.")]
    NotFound,

    #[error("Invalid input: {reason}")]
    Validation { reason: String },

    #[error("The identifier is not a valid UUID.")]
    InvalidIdentifier,

    #[error("Another operation is pending. Try again.")]
    Conflict,

    #[error("Internal server error.")]
    Internal { reason: String },

    #[error("You are already in a gameroom.")]
    AlreadyInGameroom { gameroom_id: Uuid },

    #[error("Gameroom is full.")]
    GameroomFull { users: Vec<Uuid> },

    #[error("A game has already started in this gameroom.")]
    GameAlreadyStarted { status: GameroomStatus },

    #[error("You are not in this gameroom.")]
    UserNotInGameroom { user_id: Uuid, users: Vec<Uuid> },

    #[error("Can't leave your own gameroom. Delete it instead.")]
    LeavingOwnGameroom,

    #[error("Only the gameroom's owner can perform this action.")]
    NotGameroomOwner { user_id: Uuid, owner_id: Uuid },

    #[error("At least two users are needed to start the game.")]
    NotEnoughPlayers,

    #[error("You are not in this game.")]
    UserNotInGame { user_id: Uuid, users: Vec<Uuid> },

    #[error("Please wait for your turn.")]
    NotUserTurn { player_id: Uuid, current_player_id: Uuid },

    #[error("Game has already ended.")]
    GameEnded,

    #[error("Player not found.")]
    PlayerNotFound { player_id: Uuid },

    #[error("No moves to undo.")]
    NoMoveToUndo { revision: u32 },

    #[error("No moves to redo.")]
    NoMoveToRedo { revision: u32 },

    #[error("You can't end a turn without playing any tiles.")]
    NoMovesPerformed { revision: u32 },

    #[error("You can't draw a tile after performing a move.")]
    MovesPerformed { revision: u32 },

    #[error("Board contains duplicate tiles.")]
    DuplicateTiles(MoveInfo),

    #[error("The new board is missing tiles from the current one.")]
    MissingBoardTiles(MoveInfo),

    #[error("Not all played tiles are from your rack.")]
    NewTilesNotFromRack(MoveInfo),

    #[error("There are no new tiles on the board.")]
    NoNewTiles(MoveInfo),

    #[error("There are invalid tile sets on the board.")]
    InvalidTilesets(MoveInfo),

    #[error("The attempted meld is invalid.")]
    InvalidMeld(MoveInfo),

    #[error("The pile is empty.")]
    PileEmpty,
}

impl Error {
    /// The HTTP status code this error responds with.
    pub fn code(&self) -> u16 {
        match self {
            Error::Unauthorized => 401,
            Error::Forbidden
            | Error::UserNotInGameroom { .. }
            | Error::NotGameroomOwner { .. }
            | Error::UserNotInGame { .. }
            | Error::NotUserTurn { .. } => 403,
            Error::NotFound => 404,
            Error::Internal { .. } => 500,
            _ => 400,
        }
    }

    /// The stable name of the error, used in logs.
    pub fn error_name(&self) -> &'static str {
        match self {
            Error::Unauthorized => "unauthorized",
            Error::Forbidden => "forbidden",
            Error::NotFound => "not_found",
            Error::Validation { .. } => "validation",
            Error::InvalidIdentifier => "invalid_identifier",
            Error::Conflict => "conflict",
            Error::Internal { .. } => "internal",
            Error::AlreadyInGameroom { .. } => "already_in_gameroom",
            Error::GameroomFull { .. } => "gameroom_full",
            Error::GameAlreadyStarted { .. } => "game_already_started",
            Error::UserNotInGameroom { .. } => "user_not_in_gameroom",
            Error::LeavingOwnGameroom => "leaving_own_gameroom",
            Error::NotGameroomOwner { .. } => "not_gameroom_owner",
            Error::NotEnoughPlayers => "not_enough_players",
            Error::UserNotInGame { .. } => "user_not_in_game",
            Error::NotUserTurn { .. } => "not_user_turn",
            Error::GameEnded => "game_ended",
            Error::PlayerNotFound { .. } => "player_not_found",
            Error::NoMoveToUndo { .. } => "no_move_to_undo",
            Error::NoMoveToRedo { .. } => "no_move_to_redo",
            Error::NoMovesPerformed { .. } => "no_moves_performed",
            Error::MovesPerformed { .. } => "moves_performed",
            Error::DuplicateTiles(_) => "duplicate_tiles",
            Error::MissingBoardTiles(_) => "missing_board_tiles",
            Error::NewTilesNotFromRack(_) => "new_tiles_not_from_rack",
            Error::NoNewTiles(_) => "no_new_tiles",
            Error::InvalidTilesets(_) => "invalid_tilesets",
            Error::InvalidMeld(_) => "invalid_meld",
            Error::PileEmpty => "pile_empty",
        }
    }

    /// Structured context for logging, mirroring the parameters that caused
    /// the error. `Value::Null` when a variant has nothing useful to attach.
    pub fn info(&self) -> Value {
        match self {
            Error::AlreadyInGameroom { gameroom_id } => {
                json!({ "gameroom_id": gameroom_id })
            }
            Error::GameroomFull { users } => json!({ "users": users }),
            Error::GameAlreadyStarted { status } => {
                json!({ "gameroom_status": status })
            }
            Error::UserNotInGameroom { user_id, users } => {
                json!({ "user_id": user_id, "users": users })
            }
            Error::NotGameroomOwner { user_id, owner_id } => {
                json!({ "user_id": user_id, "owner_id": owner_id })
            }
            Error::UserNotInGame { user_id, users } => {
                json!({ "user_id": user_id, "users": users })
            }
            Error::NotUserTurn {
                player_id,
                current_player_id,
            } => json!({
                "player_id": player_id,
                "current_player_id": current_player_id,
            }),
            Error::PlayerNotFound { player_id } => json!({ "player_id": player_id }),
            Error::NoMoveToUndo { revision }
            | Error::NoMoveToRedo { revision }
            | Error::NoMovesPerformed { revision }
            | Error::MovesPerformed { revision } => json!({ "revision": revision }),
            Error::DuplicateTiles(info)
            | Error::MissingBoardTiles(info)
            | Error::NewTilesNotFromRack(info)
            | Error::NoNewTiles(info)
            | Error::InvalidTilesets(info)
            | Error::InvalidMeld(info) => json!({
                "rack": info.rack,
                "current_board": info.current_board,
                "candidate_board": info.candidate_board,
            }),
            Error::Validation { reason } | Error::Internal { reason } => {
                json!({ "reason": reason })
            }
            _ => Value::Null,
        }
    }
}

impl From<crate::tile::InvalidTileError> for Error {
    fn from(err: crate::tile::InvalidTileError) -> Self {
        Error::Validation {
            reason: err.to_string(),
        }
    }
}
