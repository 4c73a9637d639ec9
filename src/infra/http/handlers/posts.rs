use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::posts::{
    CreateCommentCommand, CreatePostCommand, PostService, UpdatePostCommand,
};
use crate::infra::http::error::{ApiError, access_to_api};
use crate::infra::http::models::{
    CreateCommentRequest, CreatePostRequest, DataEnvelope, FeedParams, UpdatePostRequest,
};

const SOURCE: &str = "infra::http::posts";

pub async fn create_post(
    State(posts): State<Arc<PostService>>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = posts
        .create(CreatePostCommand {
            title: payload.title,
            content: payload.content,
            user_id: payload.user_id,
            tags: payload.tags,
        })
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok((StatusCode::CREATED, Json(DataEnvelope::new(post))))
}

pub async fn get_post(
    State(posts): State<Arc<PostService>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = posts
        .detail(id)
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(Json(DataEnvelope::new(detail)))
}

pub async fn update_post(
    State(posts): State<Arc<PostService>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = posts
        .update(
            id,
            UpdatePostCommand {
                title: payload.title,
                content: payload.content,
                version: payload.version,
            },
        )
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(Json(DataEnvelope::new(post)))
}

pub async fn delete_post(
    State(posts): State<Arc<PostService>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    posts
        .delete(id)
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_comment(
    State(posts): State<Arc<PostService>>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = posts
        .add_comment(
            id,
            CreateCommentCommand {
                user_id: payload.user_id,
                content: payload.content,
            },
        )
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok((StatusCode::CREATED, Json(DataEnvelope::new(comment))))
}

pub async fn list_comments(
    State(posts): State<Arc<PostService>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = posts
        .comments(id)
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(Json(DataEnvelope::new(comments)))
}

pub async fn user_feed(
    State(posts): State<Arc<PostService>>,
    Path(user_id): Path<i64>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, ApiError> {
    let feed = posts
        .feed(user_id, &params.into_query())
        .await
        .map_err(|err| access_to_api(SOURCE, err))?;

    Ok(Json(DataEnvelope::new(feed)))
}
