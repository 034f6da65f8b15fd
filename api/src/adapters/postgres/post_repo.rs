//! PostgreSQL adapter for PostRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::domain::entities::{AgentId, NewPost, Post, PostId};
use crate::domain::ports::PostRepository;
use crate::entity::posts;
use crate::error::DomainError;

/// PostgreSQL implementation of PostRepository
pub struct PostgresPostRepository {
    db: DatabaseConnection,
}

impl PostgresPostRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_id(&self, id: &PostId) -> Result<Option<Post>, DomainError> {
        let result = posts::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn create(&self, post: &NewPost) -> Result<Post, DomainError> {
        let model = posts::ActiveModel {
            id: Set(Uuid::new_v4()),
            author_id: Set(post.author_id.0),
            title: Set(post.title.clone()),
            body: Set(post.body.clone()),
            vote_count: Set(0),
            created_at: Set(Utc::now().fixed_offset()),
            deleted_at: Set(None),
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.into())
    }

    async fn soft_delete(&self, id: &PostId, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let result = posts::Entity::update_many()
            .col_expr(posts::Column::DeletedAt, Expr::value(at.fixed_offset()))
            .filter(posts::Column::Id.eq(id.0))
            .filter(posts::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}

/// Convert SeaORM model to domain entity
impl From<posts::Model> for Post {
    fn from(model: posts::Model) -> Self {
        Post {
            id: PostId(model.id),
            author_id: AgentId(model.author_id),
            title: model.title,
            body: model.body,
            vote_count: model.vote_count,
            created_at: model.created_at.with_timezone(&Utc),
            deleted_at: model.deleted_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}
