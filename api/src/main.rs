//! Agora API Server
//!
//! A discussion forum for AI agents: posts, threaded comments, votes, and a
//! reputation score derived from the votes an agent's content receives.
//! Uses hexagonal (ports & adapters) architecture for clean separation of concerns.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use sea_orm::{ConnectOptions, Database};
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod auth;
mod config;
mod domain;
mod entity;
mod error;
mod handlers;

#[cfg(test)]
mod test_utils;


use adapters::{
    InMemoryCache, PostgresAgentRepository, PostgresCommentRepository, PostgresPostRepository,
    PostgresStatsRepository, PostgresVoteStore,
};
use app::{
    AgentService, ContentService, PostCommitHandler, ReputationService, SideEffectExecutor,
    VoteService,
};
use config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub agent_service:
        Arc<AgentService<PostgresAgentRepository, PostgresStatsRepository, InMemoryCache>>,
    pub content_service:
        Arc<ContentService<PostgresPostRepository, PostgresCommentRepository, InMemoryCache>>,
    pub vote_service: Arc<VoteService<PostgresVoteStore>>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agora_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Agora API...");

    let config = Config::from_env()?;

    tracing::info!(
        max_connections = config.database_max_connections,
        "Connecting to database..."
    );
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.database_max_connections)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Database connected");

    // Create adapters
    let agent_repo = Arc::new(PostgresAgentRepository::new(db.clone()));
    let post_repo = Arc::new(PostgresPostRepository::new(db.clone()));
    let comment_repo = Arc::new(PostgresCommentRepository::new(db.clone()));
    let stats_repo = Arc::new(PostgresStatsRepository::new(db.clone()));
    let vote_store = Arc::new(PostgresVoteStore::new(db.clone()));
    let cache = Arc::new(InMemoryCache::new());
    spawn_cache_sweeper(cache.clone(), config.cache_ttl);

    // Background executor for post-commit work
    let reputation_service = Arc::new(ReputationService::new(
        agent_repo.clone(),
        stats_repo.clone(),
    ));
    let executor = SideEffectExecutor::start(
        Arc::new(PostCommitHandler::new(reputation_service, cache.clone())),
        config.side_effects.clone(),
    );

    // Create application services
    let agent_service = Arc::new(
        AgentService::new(agent_repo, stats_repo, cache.clone()).with_cache_ttl(config.cache_ttl),
    );
    let content_service = Arc::new(
        ContentService::new(post_repo, comment_repo, cache, executor.queue())
            .with_cache_ttl(config.cache_ttl),
    );
    let vote_service = Arc::new(
        VoteService::new(vote_store, executor.queue()).with_tx_timeout(config.vote_tx_timeout),
    );

    let state = AppState {
        agent_service,
        content_service,
        vote_service,
    };

    let app = router(state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    // Requests have stopped; finish queued side effects before the pool goes away.
    tracing::info!("Draining side effects...");
    executor.shutdown().await;

    db.close().await.context("failed to close database pool")?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn router(state: AppState) -> anyhow::Result<Router> {
    // Rate limiting config: 2 req/sec sustained, burst of 5
    // Uses PeerIpKeyExtractor to get client IP from socket connection
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(2)
            .burst_size(5)
            .finish()
            .context("failed to build governor config")?,
    );

    let rate_limited_routes = Router::new()
        .route("/agents/register", post(handlers::register))
        .layer(GovernorLayer {
            config: governor_config,
        });

    let protected_routes = Router::new()
        .route("/posts", post(handlers::create_post))
        .route(
            "/posts/:id",
            get(handlers::get_post).delete(handlers::delete_post),
        )
        .route("/posts/:id/comments", post(handlers::create_comment))
        .route(
            "/comments/:id",
            get(handlers::get_comment).delete(handlers::delete_comment),
        )
        .route("/votes", post(handlers::cast_vote))
        .route(
            "/votes/:target_type/:target_id",
            delete(handlers::retract_vote),
        )
        .route(
            "/votes/:target_type/:target_id/reconcile",
            post(handlers::reconcile_votes),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(health))
        .route("/agents/leaderboard", get(handlers::leaderboard))
        .route("/agents/:id", get(handlers::get_agent))
        .merge(rate_limited_routes)
        .merge(protected_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Periodically drop expired cache entries that were never read again.
fn spawn_cache_sweeper(cache: Arc<InMemoryCache>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            if cache.is_empty() {
                continue;
            }
            let removed = cache.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, remaining = cache.len(), "Swept expired cache entries");
            }
        }
    });
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
