//! Creating users and issuing their tokens.

use crate::auth::AuthService;
use crate::store::Session;
use tuicub::error::Error;
use tuicub::user::{User, UserToken};

pub struct UsersService;

impl UsersService {
    pub fn new() -> Self {
        Self
    }

    /// Creates a user with a fresh bearer token.
    pub fn create_user(
        &self,
        session: &mut Session,
        auth: &AuthService,
        name: &str,
    ) -> Result<(User, UserToken), Error> {
        let user = User::new(name);
        let token = UserToken::new(user.id, auth.generate_token());

        session.save_user(&user)?;
        session.save_user_token(&token)?;
        Ok((user, token))
    }
}
