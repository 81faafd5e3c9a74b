//! User and token rows.

use super::{key_for, Session, TreeKind};
use tuicub::error::Error;
use tuicub::user::{User, UserToken};
use uuid::Uuid;

impl Session {
    /// Loads a user by id.
    pub fn get_user_by_id(&self, id: Uuid) -> Result<User, Error> {
        self.read_json(TreeKind::Users, &key_for(id))?
            .ok_or(Error::NotFound)
    }

    /// Resolves a bearer token to its user. Any miss is `unauthorized`, so
    /// callers never learn whether the token or the user was the problem.
    pub fn get_user_by_token(&self, token: &str) -> Result<User, Error> {
        let user_token = self.get_user_token(token)?;
        self.get_user_by_id(user_token.user_id)
            .map_err(|_| Error::Unauthorized)
    }

    /// Loads a token row by its exact value.
    pub fn get_user_token(&self, token: &str) -> Result<UserToken, Error> {
        self.read_json(TreeKind::Tokens, token.as_bytes())?
            .ok_or(Error::Unauthorized)
    }

    pub fn save_user(&mut self, user: &User) -> Result<(), Error> {
        self.stage_put(TreeKind::Users, key_for(user.id), user)
    }

    pub fn save_user_token(&mut self, user_token: &UserToken) -> Result<(), Error> {
        self.stage_put(
            TreeKind::Tokens,
            user_token.token.as_bytes().to_vec(),
            user_token,
        )
    }
}
