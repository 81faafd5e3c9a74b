//! The API side of the internal message bus: batch composition per mutation
//! and the TCP client that delivers frames to the events process.

mod client;
mod service;

pub use client::MessagesClient;
pub use service::MessagesService;
pub use service::{
    game_disconnect_batch, game_started_batch, gameroom_disconnect_batch,
    tile_drawn_batch, tiles_moved_batch, turn_ended_batch,
};
