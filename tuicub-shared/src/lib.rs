//! Domain logic for the tuicub server: tiles, the rules of the game, the
//! lobby model, and the event and wire shapes both server processes share.

pub mod dictionary;
pub mod dto;
pub mod error;
pub mod events;
pub mod game;
pub mod gameroom;
pub mod pile;
pub mod rng;
pub mod rules;
pub mod tile;
pub mod user;
