//! The running-game model: players, turns, the move ledger, and the pure
//! state transitions the engine is built from.
//!
//! Every operation consumes a [`Game`] and returns a new one (or a typed
//! error); persistence and event delivery live elsewhere.

use crate::error::Error;
use crate::pile::Pile;
use crate::rng::GameRng;
use crate::tile::{Board, Tile, Tileset};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A user's seat in a running game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub rack: Tileset,
}

impl Player {
    pub fn new(user_id: Uuid, name: impl Into<String>, rack: Tileset) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            rack,
        }
    }

    /// Returns a copy of the player holding a different rack.
    pub fn with_rack(&self, rack: Tileset) -> Player {
        Player {
            rack,
            ..self.clone()
        }
    }
}

/// A snapshot of the board and the acting player's rack at one point within
/// a turn. Revisions start at 1; revision 0 is the turn's starting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub id: Uuid,
    pub turn_id: Uuid,
    pub revision: u32,
    pub board: Board,
    pub rack: Tileset,
}

/// One player's editing session over the board.
///
/// `revision` indexes the currently visible move; undo and redo walk it up
/// and down the ledger. Making a new move discards any moves above the
/// current revision, so an undone branch cannot be redone once the player
/// moves again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub starting_rack: Tileset,
    pub starting_board: Board,
    pub moves: Vec<Move>,
    pub revision: u32,
}

impl Turn {
    /// Starts a fresh turn for a player, with an empty move ledger.
    pub fn new(game_id: Uuid, player: &Player, starting_board: Board) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            player_id: player.id,
            starting_rack: player.rack.clone(),
            starting_board,
            moves: Vec::new(),
            revision: 0,
        }
    }

    /// Appends a new move, cutting off any undone branch above the current
    /// revision.
    fn push_move(&mut self, rack: Tileset, board: Board) {
        let revision = self.revision + 1;
        self.moves.retain(|mv| mv.revision <= self.revision);
        self.moves.push(Move {
            id: Uuid::new_v4(),
            turn_id: self.id,
            revision,
            board,
            rack,
        });
        self.revision = revision;
    }

    /// The move to restore on undo. `None` means the turn's starting
    /// snapshot (revision is 1); an error means there is nothing to undo.
    fn previous_move(&self) -> Result<Option<&Move>, Error> {
        if self.revision == 1 {
            return Ok(None);
        }
        self.moves
            .iter()
            .find(|mv| mv.revision + 1 == self.revision)
            .map(Some)
            .ok_or(Error::NoMoveToUndo {
                revision: self.revision,
            })
    }

    /// The previously undone move to restore on redo.
    fn next_move(&self) -> Result<&Move, Error> {
        self.moves
            .iter()
            .find(|mv| mv.revision == self.revision + 1)
            .ok_or(Error::NoMoveToRedo {
                revision: self.revision,
            })
    }

    /// Verifies that the player has made at least one move this turn.
    pub fn ensure_has_moves(&self) -> Result<(), Error> {
        if self.revision == 0 {
            return Err(Error::NoMovesPerformed {
                revision: self.revision,
            });
        }
        Ok(())
    }

    /// Verifies that the player has not made any moves this turn.
    pub fn ensure_has_no_moves(&self) -> Result<(), Error> {
        if self.revision > 0 {
            return Err(Error::MovesPerformed {
                revision: self.revision,
            });
        }
        Ok(())
    }
}

/// The mutable substance of a game: who holds what, the board, and the pile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub id: Uuid,
    pub game_id: Uuid,
    pub players: Vec<Player>,
    pub board: Board,
    pub pile: Pile,
}

impl GameState {
    pub fn player_for_id(&self, id: Uuid) -> Result<&Player, Error> {
        self.players
            .iter()
            .find(|player| player.id == id)
            .ok_or(Error::PlayerNotFound { player_id: id })
    }

    fn update_player(&mut self, player: Player) -> Result<(), Error> {
        let index = self
            .players
            .iter()
            .position(|candidate| candidate.id == player.id)
            .ok_or(Error::PlayerNotFound {
                player_id: player.id,
            })?;
        self.players[index] = player;
        Ok(())
    }
}

/// A running game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub gameroom_id: Uuid,
    pub game_state: GameState,
    pub turn: Turn,
    /// The fixed cyclic order of user ids established at game start.
    pub turn_order: Vec<Uuid>,
    /// Users that have satisfied the opening-meld rule. Append-only.
    pub made_meld: Vec<Uuid>,
    pub winner: Option<Player>,
}

impl Game {
    /// All tile ids on the current board that were not on the board at the
    /// start of the turn, in canonical order.
    pub fn new_tiles(&self) -> Vec<Tile> {
        let starting: HashSet<Tile> = self.turn.starting_board.tile_set();
        let mut tiles: Vec<Tile> = self
            .game_state
            .board
            .tile_set()
            .into_iter()
            .filter(|tile| !starting.contains(tile))
            .collect();
        tiles.sort_unstable();
        tiles
    }

    /// The player that currently holds the turn.
    pub fn current_player(&self) -> Result<&Player, Error> {
        self.game_state.player_for_id(self.turn.player_id)
    }

    /// The player that follows `player` in the cyclic turn order.
    pub fn player_after(&self, player: &Player) -> Result<&Player, Error> {
        let index = self
            .turn_order
            .iter()
            .position(|&user_id| user_id == player.user_id)
            .ok_or_else(|| self.user_not_in_game(player.user_id))?;
        let next = self.turn_order[(index + 1) % self.turn_order.len()];
        self.player_for_user_id(next)
    }

    /// The player seat belonging to a user.
    pub fn player_for_user_id(&self, user_id: Uuid) -> Result<&Player, Error> {
        self.game_state
            .players
            .iter()
            .find(|player| player.user_id == user_id)
            .ok_or_else(|| self.user_not_in_game(user_id))
    }

    /// Verifies that the player holds the turn.
    pub fn ensure_has_turn(&self, player: &Player) -> Result<(), Error> {
        if player.id != self.turn.player_id {
            return Err(Error::NotUserTurn {
                player_id: player.id,
                current_player_id: self.turn.player_id,
            });
        }
        Ok(())
    }

    /// Verifies that the game has no winner yet.
    pub fn ensure_not_ended(&self) -> Result<(), Error> {
        if self.winner.is_some() {
            return Err(Error::GameEnded);
        }
        Ok(())
    }

    pub fn has_made_meld(&self, user_id: Uuid) -> bool {
        self.made_meld.contains(&user_id)
    }

    /// Returns a copy of the game with the user registered as having made
    /// their opening meld.
    pub fn with_new_meld(mut self, user_id: Uuid) -> Game {
        self.made_meld.push(user_id);
        self
    }

    /// Returns a copy of the game with a new move on the ledger, the board
    /// replaced and the player's rack updated.
    pub fn with_new_move(
        mut self,
        rack: Tileset,
        board: Board,
        player: &Player,
    ) -> Result<Game, Error> {
        self.game_state.update_player(player.with_rack(rack.clone()))?;
        self.game_state.board = board.clone();
        self.turn.push_move(rack, board);
        Ok(self)
    }

    /// Returns a copy of the game advanced to the next turn.
    ///
    /// If the current player's rack is empty, they win instead and the game
    /// is terminal. Otherwise a fresh turn starts for the next player in the
    /// turn order, with the current board as its starting board.
    pub fn with_next_turn(mut self) -> Result<Game, Error> {
        let current = self.current_player()?.clone();
        if current.rack.is_empty() {
            self.winner = Some(current);
            return Ok(self);
        }

        let next = self.player_after(&current)?.clone();
        self.turn = Turn::new(self.id, &next, self.game_state.board.clone());
        Ok(self)
    }

    /// Returns a copy of the game with the last move undone.
    pub fn with_undo(mut self, player: &Player) -> Result<Game, Error> {
        if self.turn.revision == 0 {
            return Err(Error::NoMoveToUndo {
                revision: self.turn.revision,
            });
        }

        let (rack, board, revision) = match self.turn.previous_move()? {
            None => (
                self.turn.starting_rack.clone(),
                self.turn.starting_board.clone(),
                0,
            ),
            Some(mv) => (mv.rack.clone(), mv.board.clone(), mv.revision),
        };

        self.game_state.update_player(player.with_rack(rack))?;
        self.game_state.board = board;
        self.turn.revision = revision;
        Ok(self)
    }

    /// Returns a copy of the game with a previously undone move reapplied.
    pub fn with_redo(mut self, player: &Player) -> Result<Game, Error> {
        let (rack, board, revision) = {
            let mv = self.turn.next_move()?;
            (mv.rack.clone(), mv.board.clone(), mv.revision)
        };

        self.game_state.update_player(player.with_rack(rack))?;
        self.game_state.board = board;
        self.turn.revision = revision;
        Ok(self)
    }

    /// Returns a copy of the game with the drawn tile added to the player's
    /// rack.
    pub fn with_drawn_tile(mut self, tile: Tile, player: &Player) -> Result<Game, Error> {
        let rack = player.rack.with_new_tile(tile);
        self.game_state.update_player(player.with_rack(rack))?;
        Ok(self)
    }

    /// Returns a copy of the game after a player disconnects, along with the
    /// fresh turn if the disconnect handed the turn over.
    ///
    /// The player leaves `players` and the turn order. If exactly one player
    /// remains, that player wins. Otherwise the leaver's rack is shuffled
    /// back into the pile, and if the leaver held the turn, the board
    /// reverts to the turn's starting state and the next player's turn
    /// begins.
    pub fn with_disconnected_player(
        mut self,
        player: &Player,
        rng: &mut GameRng,
    ) -> Result<(Game, Option<Turn>), Error> {
        let remaining: Vec<Player> = self
            .game_state
            .players
            .iter()
            .filter(|candidate| candidate.id != player.id)
            .cloned()
            .collect();

        if remaining.len() == 1 {
            let winner = remaining[0].clone();
            self.game_state.players = remaining;
            self.winner = Some(winner);
            return Ok((self, None));
        }

        // The leaver's tiles go back into the pile. When they held the turn
        // the board reverts below, so the returned rack is the turn's
        // starting rack; otherwise it is their current rack. Either way the
        // deck stays conserved.
        let held_turn = self.turn.player_id == player.id;
        let returned_rack = if held_turn {
            self.turn.starting_rack.clone()
        } else {
            player.rack.clone()
        };
        self.game_state.pile.return_rack(&returned_rack, rng);

        // The successor is computed against the pre-removal order.
        let next = if held_turn {
            Some(self.player_after(player)?.clone())
        } else {
            None
        };

        self.turn_order.retain(|&user_id| user_id != player.user_id);
        self.game_state.players = remaining;

        match next {
            Some(next) => {
                let board = self.turn.starting_board.clone();
                self.game_state.board = board.clone();
                let turn = Turn::new(self.id, &next, board);
                self.turn = turn.clone();
                Ok((self, Some(turn)))
            }
            None => Ok((self, None)),
        }
    }

    fn user_not_in_game(&self, user_id: Uuid) -> Error {
        Error::UserNotInGame {
            user_id,
            users: self
                .game_state
                .players
                .iter()
                .map(|player| player.user_id)
                .collect(),
        }
    }
}
