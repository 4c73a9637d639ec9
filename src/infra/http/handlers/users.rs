use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::users::{RegisterUserCommand, UserService};
use crate::infra::http::error::{ApiError, access_to_api};
use crate::infra::http::models::{DataEnvelope, FollowRequest, RegisterUserRequest};

const SOURCE: &str = "infra::http::users";

pub async fn get_user(
    State(users): State<Arc<UserService>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = users
        .get(id)
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(Json(DataEnvelope::new(user)))
}

pub async fn register_user(
    State(users): State<Arc<UserService>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password_hash = hex::decode(payload.password_hash.trim()).map_err(|err| {
        ApiError::bad_request("Invalid password hash", Some(format!("expected hex: {err}")))
    })?;

    let registration = users
        .register(RegisterUserCommand {
            username: payload.username,
            email: payload.email,
            password_hash,
            role: payload.role,
        })
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok((StatusCode::CREATED, Json(DataEnvelope::new(registration))))
}

pub async fn follow_user(
    State(users): State<Arc<UserService>>,
    Path(id): Path<i64>,
    Json(payload): Json<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    users
        .follow(id, payload.follower_id)
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow_user(
    State(users): State<Arc<UserService>>,
    Path(id): Path<i64>,
    Json(payload): Json<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    users
        .unfollow(id, payload.follower_id)
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_user(
    State(users): State<Arc<UserService>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    users
        .activate(&token)
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(StatusCode::NO_CONTENT)
}
