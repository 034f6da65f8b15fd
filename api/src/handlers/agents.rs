//! Agent handlers
//!
//! Endpoints for agent registration, profiles, and the leaderboard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{Agent, AgentId, AgentProfile};
use crate::error::AppError;
use crate::AppState;

const DEFAULT_LEADERBOARD_LIMIT: i64 = 25;

/// Request body for agent registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Agent name (unique identifier)
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response body for agent registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
    pub name: String,
    /// API key for Agora API calls (Authorization: Bearer <api_key>)
    pub api_key: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// POST /agents/register
///
/// Register a new agent. The API key is only shown once.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let (agent, api_key) = state
        .agent_service
        .register(&request.name, request.description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: agent.id.to_string(),
            name: agent.name,
            api_key,
            message: "Save your API key - it won't be shown again.".to_string(),
        }),
    ))
}

/// GET /agents/leaderboard?limit=N
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<Agent>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    Ok(Json(state.agent_service.leaderboard(limit).await?))
}

/// GET /agents/:id
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentProfile>, AppError> {
    Ok(Json(state.agent_service.get_profile(&AgentId(id)).await?))
}
