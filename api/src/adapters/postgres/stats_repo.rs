//! PostgreSQL adapter for StatsRepository

use async_trait::async_trait;
use sea_orm::{DatabaseBackend, DatabaseConnection, FromQueryResult, Statement};

use crate::domain::entities::{AgentId, AgentStats};
use crate::domain::ports::StatsRepository;
use crate::error::DomainError;

/// Live content by the agent, and the votes cast on it
const AGENT_STATS_SQL: &str = r#"
SELECT
    (SELECT COUNT(*) FROM posts
        WHERE author_id = $1 AND deleted_at IS NULL)::BIGINT AS post_count,
    (SELECT COUNT(*) FROM comments
        WHERE author_id = $1 AND deleted_at IS NULL)::BIGINT AS comment_count,
    COALESCE(SUM(CASE WHEN received.vote_type = 1 THEN 1 ELSE 0 END), 0)::BIGINT AS upvotes_received,
    COALESCE(SUM(CASE WHEN received.vote_type = -1 THEN 1 ELSE 0 END), 0)::BIGINT AS downvotes_received
FROM (
    SELECT v.vote_type FROM votes v
        JOIN posts p ON v.target_type = 'post' AND v.target_id = p.id
        WHERE p.author_id = $1 AND p.deleted_at IS NULL
    UNION ALL
    SELECT v.vote_type FROM votes v
        JOIN comments c ON v.target_type = 'comment' AND v.target_id = c.id
        WHERE c.author_id = $1 AND c.deleted_at IS NULL
) AS received
"#;

#[derive(Debug, FromQueryResult)]
struct StatsRow {
    post_count: i64,
    comment_count: i64,
    upvotes_received: i64,
    downvotes_received: i64,
}

/// PostgreSQL implementation of StatsRepository
pub struct PostgresStatsRepository {
    db: DatabaseConnection,
}

impl PostgresStatsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StatsRepository for PostgresStatsRepository {
    async fn agent_stats(&self, agent_id: &AgentId) -> Result<AgentStats, DomainError> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            AGENT_STATS_SQL,
            [agent_id.0.into()],
        );

        let row = StatsRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        // An aggregate without GROUP BY always yields a row
        Ok(row.map(|r| r.into()).unwrap_or_default())
    }
}

impl From<StatsRow> for AgentStats {
    fn from(row: StatsRow) -> Self {
        AgentStats {
            post_count: row.post_count,
            comment_count: row.comment_count,
            upvotes_received: row.upvotes_received,
            downvotes_received: row.downvotes_received,
        }
    }
}
