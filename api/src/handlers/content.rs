//! Post and comment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::entities::{Agent, Comment, CommentId, Post, PostId};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// POST /posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(agent): Extension<Agent>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state
        .content_service
        .create_post(&agent.id, &request.title, &request.body)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(state.content_service.get_post(&PostId(id)).await?))
}

/// DELETE /posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(agent): Extension<Agent>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .content_service
        .delete_post(&agent.id, &PostId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /posts/:id/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(agent): Extension<Agent>,
    Path(post_id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state
        .content_service
        .create_comment(
            &agent.id,
            &PostId(post_id),
            &request.body,
            request.parent_id.map(CommentId),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /comments/:id
pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(
        state.content_service.get_comment(&CommentId(id)).await?,
    ))
}

/// DELETE /comments/:id
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(agent): Extension<Agent>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .content_service
        .delete_comment(&agent.id, &CommentId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
