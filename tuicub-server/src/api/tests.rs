//! Request-level tests driving the API the way clients do.

use super::{routes, AppState};
use crate::config::{sha256, Config};
use crate::messages::{MessagesClient, MessagesService};
use crate::services::Services;
use crate::store::Store;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::Filter;

fn test_config() -> Config {
    Config {
        db_path: "unused".into(),
        logfile_path: "unused".into(),
        messages_host: "127.0.0.1".into(),
        messages_port: 1,
        messages_secret: sha256("messages"),
        events_secret: sha256("events"),
    }
}

/// A fresh state over a temporary store. The bus client points at a closed
/// port, so event sends fail quietly, which is what these tests want.
fn test_state() -> Arc<AppState> {
    let config = test_config();
    Arc::new(AppState {
        store: Store::temporary(),
        services: Services::new(&config),
        messages: MessagesService::new(MessagesClient::new(
            "127.0.0.1",
            1,
            config.messages_secret.clone(),
        )),
    })
}

async fn create_user(state: &Arc<AppState>, name: &str) -> (Uuid, String) {
    let response = warp::test::request()
        .method("POST")
        .path("/users")
        .json(&json!({ "name": name }))
        .reply(&routes(Arc::clone(state)).recover(super::handle_rejection))
        .await;
    assert_eq!(StatusCode::CREATED, response.status());

    let body: Value = serde_json::from_slice(response.body()).unwrap();
    let user_id = Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    (user_id, token)
}

async fn request(
    state: &Arc<AppState>,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = warp::test::request().method(method).path(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    if let Some(body) = body {
        builder = builder.json(&body);
    }
    let response = builder
        .reply(&routes(Arc::clone(state)).recover(super::handle_rejection))
        .await;
    let status = response.status();
    let body: Value =
        serde_json::from_slice(response.body()).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn create_user_returns_the_user_and_a_token() {
    let state = test_state();

    let (status, body) = request(
        &state,
        "POST",
        "/users",
        None,
        Some(json!({ "name": "Alice" })),
    )
    .await;

    assert_eq!(StatusCode::CREATED, status);
    assert_eq!("Alice", body["user"]["name"]);
    assert_eq!(64, body["token"].as_str().unwrap().len());
}

#[tokio::test]
async fn create_user_rejects_an_empty_name() {
    let state = test_state();

    let (status, body) = request(
        &state,
        "POST",
        "/users",
        None,
        Some(json!({ "name": "  " })),
    )
    .await;

    assert_eq!(StatusCode::BAD_REQUEST, status);
    assert_eq!("Invalid input: Name cannot be empty.", body["message"]);
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let state = test_state();

    let (status, body) = request(&state, "GET", "/gamerooms", None, None).await;

    assert_eq!(StatusCode::UNAUTHORIZED, status);
    assert_eq!(
        "The authentication token is either missing or is invalid.",
        body["message"]
    );
}

#[tokio::test]
async fn gameroom_lifecycle_over_http() {
    let state = test_state();
    let (alice_id, alice_token) = create_user(&state, "Alice").await;
    let (_, bob_token) = create_user(&state, "Bob").await;

    // Alice opens a gameroom.
    let (status, gameroom) =
        request(&state, "POST", "/gamerooms", Some(&alice_token), None).await;
    assert_eq!(StatusCode::CREATED, status);
    assert_eq!("Alice's gameroom.", gameroom["name"]);
    assert_eq!("STARTING", gameroom["status"]);
    assert_eq!(alice_id.to_string(), gameroom["owner_id"]);
    let gameroom_id = gameroom["id"].as_str().unwrap().to_string();

    // Bob joins it.
    let (status, joined) = request(
        &state,
        "POST",
        &format!("/gamerooms/{gameroom_id}/users"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    let members: Vec<&str> = joined["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["name"].as_str().unwrap())
        .collect();
    assert_eq!(vec!["Alice", "Bob"], members);

    // Both see it listed.
    let (status, listed) =
        request(&state, "GET", "/gamerooms", Some(&bob_token), None).await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(1, listed.as_array().unwrap().len());

    // Bob leaves again.
    let (status, left) = request(
        &state,
        "DELETE",
        &format!("/gamerooms/{gameroom_id}/users"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(1, left["users"].as_array().unwrap().len());

    // Alice cannot leave her own gameroom.
    let (status, body) = request(
        &state,
        "DELETE",
        &format!("/gamerooms/{gameroom_id}/users"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status);
    assert_eq!(
        "Can't leave your own gameroom. Delete it instead.",
        body["message"]
    );

    // But she can delete it.
    let (status, deleted) = request(
        &state,
        "DELETE",
        &format!("/gamerooms/{gameroom_id}"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!("DELETED", deleted["status"]);

    // It no longer shows up anywhere.
    let (_, listed) = request(&state, "GET", "/gamerooms", Some(&bob_token), None).await;
    assert_eq!(0, listed.as_array().unwrap().len());
    let (status, _) = request(
        &state,
        "POST",
        &format!("/gamerooms/{gameroom_id}/users"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::NOT_FOUND, status);
}

#[tokio::test]
async fn starting_a_game_deals_and_rotates_turns() {
    let state = test_state();
    let (alice_id, alice_token) = create_user(&state, "Alice").await;
    let (_, bob_token) = create_user(&state, "Bob").await;

    let (_, gameroom) =
        request(&state, "POST", "/gamerooms", Some(&alice_token), None).await;
    let gameroom_id = gameroom["id"].as_str().unwrap().to_string();
    request(
        &state,
        "POST",
        &format!("/gamerooms/{gameroom_id}/users"),
        Some(&bob_token),
        None,
    )
    .await;

    // Only the owner can start.
    let (status, _) = request(
        &state,
        "POST",
        &format!("/gamerooms/{gameroom_id}/game"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::FORBIDDEN, status);

    let (status, game) = request(
        &state,
        "POST",
        &format!("/gamerooms/{gameroom_id}/game"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::CREATED, status);
    assert_eq!(gameroom_id, game["gameroom_id"]);
    assert!(game["winner"].is_null());

    let game_state = &game["game_state"];
    assert_eq!(78, game_state["pile_count"]);
    assert_eq!(14, game_state["rack"].as_array().unwrap().len());
    let players = game_state["players"].as_array().unwrap();
    assert_eq!(2, players.len());
    for player in players {
        assert_eq!(14, player["tiles_count"]);
    }

    // Exactly one player holds the turn; find their token and draw.
    let holder_id = players
        .iter()
        .find(|player| player["has_turn"].as_bool().unwrap())
        .map(|player| player["user_id"].as_str().unwrap().to_string())
        .unwrap();
    let (holder_token, waiter_token) = if holder_id == alice_id.to_string() {
        (&alice_token, &bob_token)
    } else {
        (&bob_token, &alice_token)
    };

    let game_id = game["id"].as_str().unwrap().to_string();

    // The waiting player cannot draw.
    let (status, body) = request(
        &state,
        "POST",
        &format!("/games/{game_id}/turns/draw"),
        Some(waiter_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::FORBIDDEN, status);
    assert_eq!("Please wait for your turn.", body["message"]);

    // The holder draws; their rack grows and the turn moves on.
    let (status, drawn) = request(
        &state,
        "POST",
        &format!("/games/{game_id}/turns/draw"),
        Some(holder_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(77, drawn["pile_count"]);
    assert_eq!(15, drawn["rack"].as_array().unwrap().len());
    let now_waiting = drawn["players"]
        .as_array()
        .unwrap()
        .iter()
        .find(|player| player["user_id"] == json!(holder_id))
        .unwrap();
    assert_eq!(false, now_waiting["has_turn"]);
}

#[tokio::test]
async fn game_endpoints_validate_their_input() {
    let state = test_state();
    let (_, token) = create_user(&state, "Alice").await;

    // A malformed id is a validation error, not a 404.
    let (status, body) = request(
        &state,
        "POST",
        "/games/not-a-uuid/turns/draw",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status);
    assert_eq!("The identifier is not a valid UUID.", body["message"]);

    // Tile ids outside the deck are rejected.
    let (status, _) = request(
        &state,
        "POST",
        &format!("/games/{}/moves", Uuid::new_v4()),
        Some(&token),
        Some(json!({ "board": [[0, 1, 200]] })),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status);

    // A missing body is rejected before any game lookup.
    let (status, _) = request(
        &state,
        "POST",
        &format!("/games/{}/moves", Uuid::new_v4()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status);
}

#[tokio::test]
async fn disconnect_callback_requires_the_events_secret() {
    let state = test_state();
    let (user_id, _) = create_user(&state, "Alice").await;

    let (status, _) = request(
        &state,
        "POST",
        "/gamerooms/disconnect",
        Some("not-the-secret"),
        Some(json!({ "user_id": user_id })),
    )
    .await;
    assert_eq!(StatusCode::UNAUTHORIZED, status);

    let secret = sha256("events");
    let (status, body) = request(
        &state,
        "POST",
        "/gamerooms/disconnect",
        Some(&secret),
        Some(json!({ "user_id": user_id })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(json!({ "success": true }), body);

    // An unknown user is a 404.
    let (status, _) = request(
        &state,
        "POST",
        "/gamerooms/disconnect",
        Some(&secret),
        Some(json!({ "user_id": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(StatusCode::NOT_FOUND, status);
}

#[tokio::test]
async fn disconnect_during_a_running_game_finishes_it() {
    let state = test_state();
    let (alice_id, alice_token) = create_user(&state, "Alice").await;
    let (_, bob_token) = create_user(&state, "Bob").await;

    let (_, gameroom) =
        request(&state, "POST", "/gamerooms", Some(&alice_token), None).await;
    let gameroom_id = gameroom["id"].as_str().unwrap().to_string();
    request(
        &state,
        "POST",
        &format!("/gamerooms/{gameroom_id}/users"),
        Some(&bob_token),
        None,
    )
    .await;
    let (_, game) = request(
        &state,
        "POST",
        &format!("/gamerooms/{gameroom_id}/game"),
        Some(&alice_token),
        None,
    )
    .await;
    let game_id = game["id"].as_str().unwrap().to_string();

    // Alice's connection drops mid-game: Bob wins, and the finished game
    // takes the gameroom down with it.
    let secret = sha256("events");
    let (status, body) = request(
        &state,
        "POST",
        "/gamerooms/disconnect",
        Some(&secret),
        Some(json!({ "user_id": alice_id })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(json!({ "success": true }), body);

    let (_, listed) = request(&state, "GET", "/gamerooms", Some(&bob_token), None).await;
    assert_eq!(0, listed.as_array().unwrap().len());

    // The game aggregate is gone too.
    let (status, _) = request(
        &state,
        "POST",
        &format!("/games/{game_id}/turns/draw"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::NOT_FOUND, status);

    // Both membership pointers cleared with the gameroom.
    let (status, _) = request(&state, "POST", "/gamerooms", Some(&bob_token), None).await;
    assert_eq!(StatusCode::CREATED, status);
}

#[tokio::test]
async fn disconnect_callback_tears_down_an_abandoned_gameroom() {
    let state = test_state();
    let (alice_id, alice_token) = create_user(&state, "Alice").await;
    let (_, bob_token) = create_user(&state, "Bob").await;

    let (_, gameroom) =
        request(&state, "POST", "/gamerooms", Some(&alice_token), None).await;
    let gameroom_id = gameroom["id"].as_str().unwrap().to_string();
    request(
        &state,
        "POST",
        &format!("/gamerooms/{gameroom_id}/users"),
        Some(&bob_token),
        None,
    )
    .await;

    // The owner's connection drops.
    let secret = sha256("events");
    let (status, body) = request(
        &state,
        "POST",
        "/gamerooms/disconnect",
        Some(&secret),
        Some(json!({ "user_id": alice_id })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(json!({ "success": true }), body);

    // The gameroom went with them.
    let (_, listed) = request(&state, "GET", "/gamerooms", Some(&bob_token), None).await;
    assert_eq!(0, listed.as_array().unwrap().len());

    // And Bob is free to open his own.
    let (status, _) = request(&state, "POST", "/gamerooms", Some(&bob_token), None).await;
    assert_eq!(StatusCode::CREATED, status);
}
