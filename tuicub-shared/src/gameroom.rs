//! Gamerooms: the lobby containers users gather in before and during a game.

use crate::error::Error;
use crate::game::Game;
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The most users a gameroom can hold.
pub const MAX_GAMEROOM_USERS: usize = 4;

/// The lifecycle state of a gameroom.
///
/// Transitions are `Starting -> Running -> Finished` or
/// `Starting -> Deleted`; `Finished` and `Deleted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameroomStatus {
    Starting,
    Running,
    Finished,
    Deleted,
}

/// A gameroom and its members.
///
/// The owner is always one of `users`. A game is attached exactly while the
/// status is `Running`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gameroom {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub users: Vec<User>,
    pub created_at: DateTime<Utc>,
    pub game: Option<Game>,
    pub status: GameroomStatus,
}

impl Gameroom {
    /// Creates a new gameroom owned by `user`, named after them.
    ///
    /// Fails if the user is already in a gameroom.
    pub fn create(user: &User) -> Result<Self, Error> {
        user.ensure_not_in_gameroom()?;
        let id = Uuid::new_v4();
        Ok(Self {
            id,
            name: format!("{}'s gameroom.", user.name),
            owner_id: user.id,
            users: vec![User {
                current_gameroom_id: Some(id),
                ..user.clone()
            }],
            created_at: Utc::now(),
            game: None,
            status: GameroomStatus::Starting,
        })
    }

    /// Returns a copy of the gameroom with a new member appended.
    ///
    /// The gameroom must still be starting, have room left, and the user
    /// must not be in another gameroom.
    pub fn with_joining(mut self, user: &User) -> Result<Self, Error> {
        user.ensure_not_in_gameroom()?;
        self.ensure_starting()?;

        if self.users.len() == MAX_GAMEROOM_USERS {
            return Err(Error::GameroomFull {
                users: self.users.iter().map(|user| user.id).collect(),
            });
        }

        self.users.push(User {
            current_gameroom_id: Some(self.id),
            ..user.clone()
        });
        Ok(self)
    }

    /// Returns a copy of the gameroom without the leaving member.
    ///
    /// The owner cannot leave; they delete the gameroom instead.
    pub fn with_leaving(mut self, user: &User) -> Result<Self, Error> {
        self.ensure_has_user(user)?;
        self.ensure_starting()?;

        if self.owner_id == user.id {
            return Err(Error::LeavingOwnGameroom);
        }

        self.users.retain(|member| member.id != user.id);
        Ok(self)
    }

    /// Returns a copy of the gameroom with the game attached and the status
    /// advanced to running.
    pub fn with_started_game(mut self, game: Game) -> Self {
        self.game = Some(game);
        self.status = GameroomStatus::Running;
        self
    }

    /// Returns a copy of the gameroom with the game detached.
    pub fn without_game(mut self) -> Self {
        self.game = None;
        self
    }

    /// Returns a copy of the gameroom deleted by its owner: no members, no
    /// game pending, status `Deleted`.
    pub fn deleted(mut self, by: &User) -> Result<Self, Error> {
        self.ensure_is_owner(by)?;
        self.ensure_starting()?;

        self.users.clear();
        self.status = GameroomStatus::Deleted;
        Ok(self)
    }

    pub fn is_owner(&self, user: &User) -> bool {
        self.owner_id == user.id
    }

    /// Verifies that the user owns this gameroom.
    pub fn ensure_is_owner(&self, user: &User) -> Result<(), Error> {
        if !self.is_owner(user) {
            return Err(Error::NotGameroomOwner {
                user_id: user.id,
                owner_id: self.owner_id,
            });
        }
        Ok(())
    }

    /// Verifies that the gameroom still has a starting status.
    pub fn ensure_starting(&self) -> Result<(), Error> {
        if self.status != GameroomStatus::Starting {
            return Err(Error::GameAlreadyStarted {
                status: self.status,
            });
        }
        Ok(())
    }

    fn ensure_has_user(&self, user: &User) -> Result<(), Error> {
        if !self.users.iter().any(|member| member.id == user.id) {
            return Err(Error::UserNotInGameroom {
                user_id: user.id,
                users: self.users.iter().map(|member| member.id).collect(),
            });
        }
        Ok(())
    }
}
