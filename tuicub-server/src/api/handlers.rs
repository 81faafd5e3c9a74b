//! Request handlers.
//!
//! Every handler opens a session, authenticates, runs the services, commits,
//! and only then pushes events for the committed mutation. An error anywhere
//! before the commit drops the session, rolling the request back.

use super::error::reject;
use super::{AppState, CreateUserBody, DisconnectBody, MoveBody};
use serde_json::json;
use std::sync::Arc;
use tuicub::dto::{GameDto, GameStateDto, GameroomDto, UserDto};
use tuicub::error::Error;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

pub async fn create_user(
    body: CreateUserBody,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    if body.name.trim().is_empty() {
        return Err(reject(Error::Validation {
            reason: "Name cannot be empty.".into(),
        }));
    }

    let mut session = state.store.session();
    let (user, token) = state
        .services
        .users
        .create_user(&mut session, &state.services.auth, body.name.trim())
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({
            "user": UserDto::new(&user),
            "token": token.token,
        })),
        StatusCode::CREATED,
    ))
}

pub async fn get_gamerooms(
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let session = state.store.session();
    state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let gamerooms = state
        .services
        .gamerooms
        .get_gamerooms(&session)
        .map_err(reject)?;
    let dtos: Vec<GameroomDto> = gamerooms.iter().map(GameroomDto::new).collect();
    Ok(warp::reply::json(&dtos))
}

pub async fn create_gameroom(
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let gameroom = state
        .services
        .gamerooms
        .create_gameroom(&mut session, &user)
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&GameroomDto::new(&gameroom)),
        StatusCode::CREATED,
    ))
}

pub async fn join_gameroom(
    id: String,
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let gameroom_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let gameroom = state
        .services
        .gamerooms
        .join_gameroom(&mut session, &user, gameroom_id)
        .await
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    state.messages.user_joined(&user, &gameroom).await;
    Ok(warp::reply::json(&GameroomDto::new(&gameroom)))
}

pub async fn leave_gameroom(
    id: String,
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let gameroom_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let gameroom = state
        .services
        .gamerooms
        .leave_gameroom(&mut session, &user, gameroom_id)
        .await
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    state.messages.user_left(&user, &gameroom).await;
    Ok(warp::reply::json(&GameroomDto::new(&gameroom)))
}

pub async fn delete_gameroom(
    id: String,
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let gameroom_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let result = state
        .services
        .gamerooms
        .delete_gameroom(&mut session, &user, gameroom_id)
        .await
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    state
        .messages
        .gameroom_deleted(&result.gameroom, &result.remaining_users)
        .await;
    Ok(warp::reply::json(&GameroomDto::new(&result.gameroom)))
}

pub async fn start_game(
    id: String,
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let gameroom_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let game = state
        .services
        .gamerooms
        .start_game(&mut session, &user, gameroom_id)
        .await
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    state.messages.game_started(&user, &game).await;
    Ok(warp::reply::with_status(
        warp::reply::json(&GameDto::for_user(&game, user.id)),
        StatusCode::CREATED,
    ))
}

pub async fn move_tiles(
    id: String,
    auth: Option<String>,
    body: MoveBody,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let game_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let game = state
        .services
        .games
        .move_tiles(&mut session, &user, game_id, &body.board)
        .await
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    state.messages.tiles_moved(&user, &game).await;
    Ok(warp::reply::json(&GameStateDto::for_user(&game, user.id)))
}

pub async fn undo(
    id: String,
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let game_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let game = state
        .services
        .games
        .undo(&mut session, &user, game_id)
        .await
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    state.messages.tiles_moved(&user, &game).await;
    Ok(warp::reply::json(&GameStateDto::for_user(&game, user.id)))
}

pub async fn redo(
    id: String,
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let game_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let game = state
        .services
        .games
        .redo(&mut session, &user, game_id)
        .await
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    state.messages.tiles_moved(&user, &game).await;
    Ok(warp::reply::json(&GameStateDto::for_user(&game, user.id)))
}

pub async fn end_turn(
    id: String,
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let game_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let game = state
        .services
        .games
        .end_turn(&mut session, &user, game_id)
        .await
        .map_err(reject)?;

    // A win finishes the game: the aggregate and its gameroom go away in
    // the same transaction that recorded the winner.
    if game.winner.is_some() {
        state
            .services
            .gamerooms
            .finish_game(&mut session, &state.services.games, game.gameroom_id)
            .await
            .map_err(reject)?;
    }
    session.commit().map_err(reject)?;

    state.messages.turn_ended(&user, &game).await;
    Ok(warp::reply::json(&GameStateDto::for_user(&game, user.id)))
}

pub async fn draw(
    id: String,
    auth: Option<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let game_id = parse_uuid(&id)?;
    let mut session = state.store.session();
    let user = state
        .services
        .auth
        .authorize(&session, auth.as_deref())
        .map_err(reject)?;

    let (tile, game) = state
        .services
        .games
        .draw(&mut session, &user, game_id)
        .await
        .map_err(reject)?;
    session.commit().map_err(reject)?;

    state.messages.tile_drawn(&user, tile, &game).await;
    Ok(warp::reply::json(&GameStateDto::for_user(&game, user.id)))
}

/// The disconnect callback from the events process.
pub async fn disconnect(
    auth: Option<String>,
    body: DisconnectBody,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    state
        .services
        .auth
        .authorize_events_server(auth.as_deref())
        .map_err(reject)?;

    let mut session = state.store.session();
    let user = session.get_user_by_id(body.user_id).map_err(reject)?;

    let lobby_result = state
        .services
        .gamerooms
        .disconnect(&mut session, &user)
        .await
        .map_err(reject)?;

    if lobby_result.gameroom.is_none() {
        session.commit().map_err(reject)?;
        return Ok(success());
    }

    if let Some(game) = lobby_result.game.clone() {
        let game_result = state
            .services
            .games
            .disconnect(&mut session, &user, game)
            .await
            .map_err(reject)?;

        if game_result.game.winner.is_some() {
            state
                .services
                .gamerooms
                .finish_game(
                    &mut session,
                    &state.services.games,
                    game_result.game.gameroom_id,
                )
                .await
                .map_err(reject)?;
        }
        session.commit().map_err(reject)?;

        state.messages.disconnected_game(&game_result).await;
    } else {
        session.commit().map_err(reject)?;

        state
            .messages
            .disconnected_gameroom(&user, &lobby_result)
            .await;
    }

    Ok(success())
}

fn success() -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&json!({ "success": true })),
        StatusCode::OK,
    )
}

fn parse_uuid(raw: &str) -> Result<Uuid, Rejection> {
    Uuid::parse_str(raw).map_err(|_| reject(Error::InvalidIdentifier))
}
