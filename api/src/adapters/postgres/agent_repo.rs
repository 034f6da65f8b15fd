//! PostgreSQL adapter for AgentRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::is_unique_violation;
use crate::domain::entities::{Agent, AgentId, NewAgent, Tier};
use crate::domain::ports::AgentRepository;
use crate::entity::agents;
use crate::error::DomainError;

/// PostgreSQL implementation of AgentRepository
pub struct PostgresAgentRepository {
    db: DatabaseConnection,
}

impl PostgresAgentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, DomainError> {
        let result = agents::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_api_key_hash(&self, hash: &str) -> Result<Option<Agent>, DomainError> {
        let result = agents::Entity::find()
            .filter(agents::Column::ApiKeyHash.eq(hash))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Agent>, DomainError> {
        let result = agents::Entity::find()
            .filter(agents::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn create(&self, agent: &NewAgent) -> Result<Agent, DomainError> {
        let now = Utc::now().fixed_offset();

        let model = agents::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(agent.name.clone()),
            description: Set(agent.description.clone()),
            api_key_hash: Set(agent.api_key_hash.clone()),
            reputation: Set(0),
            tier: Set(Tier::Newcomer.to_string()),
            created_at: Set(now),
            last_seen_at: Set(None),
        };

        // Two registrations can pass the name check at once; the unique index decides
        let result = model.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::AlreadyExists(format!(
                    "Agent with name '{}' already exists",
                    agent.name
                ))
            } else {
                DomainError::Database(e.to_string())
            }
        })?;

        Ok(result.into())
    }

    async fn update_last_seen(&self, id: &AgentId) -> Result<(), DomainError> {
        let now = Utc::now().fixed_offset();

        agents::ActiveModel {
            id: Set(id.0),
            last_seen_at: Set(Some(now)),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(())
    }

    async fn update_reputation(&self, id: &AgentId, reputation: i32) -> Result<(), DomainError> {
        let tier = Tier::from_reputation(reputation).to_string();

        agents::ActiveModel {
            id: Set(id.0),
            reputation: Set(reputation),
            tier: Set(tier),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                DomainError::NotFound(format!("Agent {} not found", id))
            }
            e => DomainError::Database(e.to_string()),
        })?;

        Ok(())
    }

    async fn find_top_by_reputation(&self, limit: i64) -> Result<Vec<Agent>, DomainError> {
        let results = agents::Entity::find()
            .order_by_desc(agents::Column::Reputation)
            .order_by_asc(agents::Column::CreatedAt)
            .limit(limit.max(0) as u64)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }
}

/// Convert SeaORM model to domain entity
impl From<agents::Model> for Agent {
    fn from(model: agents::Model) -> Self {
        Agent {
            id: AgentId(model.id),
            name: model.name,
            description: model.description,
            api_key_hash: model.api_key_hash,
            reputation: model.reputation,
            // The stored tier is derived; recompute rather than trust a stale column
            tier: Tier::from_reputation(model.reputation),
            created_at: model.created_at.with_timezone(&Utc),
            last_seen_at: model.last_seen_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}
