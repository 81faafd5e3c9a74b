//! The service layer: orchestration of store sessions and the game engine.

pub mod gamerooms;
pub mod games;
pub mod users;

use crate::auth::AuthService;
use crate::config::Config;
use gamerooms::GameroomsService;
use games::GamesService;
use users::UsersService;

/// The container wiring every service together for the API process.
pub struct Services {
    pub auth: AuthService,
    pub users: UsersService,
    pub gamerooms: GameroomsService,
    pub games: GamesService,
}

impl Services {
    pub fn new(config: &Config) -> Self {
        Self {
            auth: AuthService::new(
                config.events_secret.clone(),
                config.messages_secret.clone(),
            ),
            users: UsersService::new(),
            gamerooms: GameroomsService::new(),
            games: GamesService::new(),
        }
    }
}
