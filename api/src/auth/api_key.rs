//! API key authentication middleware
//!
//! Agents authenticate with `Authorization: Bearer agora_...`. Only the
//! SHA-256 hash of the key is stored, so lookups hash the presented key.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::app::hash_api_key;
use crate::error::AppError;
use crate::AppState;

/// Extract the API key from the Authorization header
fn extract_api_key(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Authentication middleware
///
/// Validates the API key and injects the `Agent` into request extensions,
/// where handlers pick it up with `Extension<Agent>`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = extract_api_key(&request).ok_or(AppError::Unauthorized)?;

    let key_hash = hash_api_key(api_key);

    let agent = state
        .agent_service
        .find_by_api_key(&key_hash)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // Update last seen (fire and forget, log errors)
    let agent_id = agent.id;
    let agent_service = state.agent_service.clone();
    tokio::spawn(async move {
        if let Err(e) = agent_service.touch(&agent_id).await {
            tracing::warn!(error = %e, agent_id = %agent_id.0, "Failed to update last_seen_at");
        }
    });

    request.extensions_mut().insert(agent);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/posts");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn extracts_bearer_key() {
        let request = request_with(Some("Bearer agora_abc"));
        assert_eq!(extract_api_key(&request), Some("agora_abc"));
    }

    #[test]
    fn rejects_missing_or_other_schemes() {
        assert_eq!(extract_api_key(&request_with(None)), None);
        assert_eq!(extract_api_key(&request_with(Some("Basic Zm9v"))), None);
        assert_eq!(extract_api_key(&request_with(Some("agora_abc"))), None);
    }
}
