//! Mapping application errors onto HTTP responses.

use serde_json::json;
use std::convert::Infallible;
use tracing::error;
use tuicub::error::Error;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

/// The rejection wrapper carrying an application [`Error`] out of a handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl warp::reject::Reject for ApiError {}

/// Turns an application error into a warp rejection.
pub fn reject(err: Error) -> Rejection {
    warp::reject::custom(ApiError(err))
}

/// Renders every rejection as the uniform `{"message": ...}` body.
///
/// Application errors are logged with their stable name and context before
/// responding; transport-level rejections map to the closest status.
pub async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(ApiError(err)) = rejection.find::<ApiError>() {
        error!(
            error_name = err.error_name(),
            info = %err.info(),
            "error"
        );
        (
            StatusCode::from_u16(err.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            err.to_string(),
        )
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, Error::NotFound.to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>()
    {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid input: {err}"),
        )
    } else if rejection.find::<warp::reject::InvalidHeader>().is_some() {
        (StatusCode::UNAUTHORIZED, Error::Unauthorized.to_string())
    } else if rejection
        .find::<warp::reject::MethodNotAllowed>()
        .is_some()
    {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.".into())
    } else {
        error!(?rejection, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error.".into(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "message": message })),
        status,
    ))
}
