//! The events process: long-lived client connections, the bus listener, and
//! the disconnect callback to the API.

mod api_client;
mod server;

pub use api_client::EventsApiClient;
pub use server::{EventsServer, TokenResolver};
