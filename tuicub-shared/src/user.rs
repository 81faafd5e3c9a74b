//! Users and their authentication tokens.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
///
/// `current_gameroom_id` is the authoritative membership pointer: a user is
/// in at most one gameroom at a time, and the lobby consults this pointer
/// when the events server reports a disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub current_gameroom_id: Option<Uuid>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            current_gameroom_id: None,
        }
    }

    /// Verifies that the user is not currently in any gameroom.
    pub fn ensure_not_in_gameroom(&self) -> Result<(), Error> {
        match self.current_gameroom_id {
            Some(gameroom_id) => Err(Error::AlreadyInGameroom { gameroom_id }),
            None => Ok(()),
        }
    }
}

/// An opaque bearer credential issued once, at user creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
}

impl UserToken {
    pub fn new(user_id: Uuid, token: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_in_no_gameroom() {
        let user = User::new("Alice");

        assert_eq!("Alice", user.name);
        assert_eq!(None, user.current_gameroom_id);
        assert!(user.ensure_not_in_gameroom().is_ok());
    }

    #[test]
    fn user_in_gameroom_fails_the_membership_check() {
        let mut user = User::new("Alice");
        user.current_gameroom_id = Some(Uuid::new_v4());

        assert!(matches!(
            user.ensure_not_in_gameroom(),
            Err(Error::AlreadyInGameroom { .. })
        ));
    }
}
