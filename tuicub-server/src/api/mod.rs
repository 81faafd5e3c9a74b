//! The HTTP API process: routes, handlers and error mapping.

mod error;
mod handlers;
#[cfg(test)]
mod tests;

pub use error::handle_rejection;

use crate::messages::MessagesService;
use crate::services::Services;
use crate::store::Store;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;

/// Everything the handlers share.
pub struct AppState {
    pub store: Arc<Store>,
    pub services: Services,
    pub messages: MessagesService,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
    pub board: Vec<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
pub struct DisconnectBody {
    pub user_id: Uuid,
}

/// Builds the route tree for the API server. Callers attach
/// [`handle_rejection`] when serving.
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let create_user = warp::path!("users")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handlers::create_user);

    let get_gamerooms = warp::path!("gamerooms")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::get_gamerooms);

    let create_gameroom = warp::path!("gamerooms")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::create_gameroom);

    let join_gameroom = warp::path!("gamerooms" / String / "users")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::join_gameroom);

    let leave_gameroom = warp::path!("gamerooms" / String / "users")
        .and(warp::delete())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::leave_gameroom);

    let delete_gameroom = warp::path!("gamerooms" / String)
        .and(warp::delete())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::delete_gameroom);

    let start_game = warp::path!("gamerooms" / String / "game")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::start_game);

    let disconnect = warp::path!("gamerooms" / "disconnect")
        .and(warp::post())
        .and(auth_header())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handlers::disconnect);

    let move_tiles = warp::path!("games" / String / "moves")
        .and(warp::post())
        .and(auth_header())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handlers::move_tiles);

    let undo = warp::path!("games" / String / "moves")
        .and(warp::delete())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::undo);

    let redo = warp::path!("games" / String / "moves")
        .and(warp::patch())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::redo);

    let end_turn = warp::path!("games" / String / "turns" / "end")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::end_turn);

    let draw = warp::path!("games" / String / "turns" / "draw")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state))
        .and_then(handlers::draw);

    create_user
        .or(get_gamerooms)
        .or(create_gameroom)
        .or(disconnect)
        .or(join_gameroom)
        .or(leave_gameroom)
        .or(delete_gameroom)
        .or(start_game)
        .or(move_tiles)
        .or(undo)
        .or(redo)
        .or(end_turn)
        .or(draw)
        .with(warp::trace::request())
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

fn auth_header(
) -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization")
}
