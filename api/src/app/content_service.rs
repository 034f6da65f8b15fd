//! Content service
//!
//! Posts and comments: the voteable targets. Creation and soft deletion
//! change the author's reputation inputs, so both queue a recompute and
//! invalidate the author's cached aggregates once the write has landed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::app::agent_service::DEFAULT_CACHE_TTL;
use crate::app::side_effects::SideEffectQueue;
use crate::domain::entities::{
    AgentId, Comment, CommentId, NewComment, NewPost, Post, PostId, TargetRef,
};
use crate::domain::ports::cache::{get_json, set_json, target_key};
use crate::domain::ports::{Cache, CommentRepository, PostRepository};
use crate::error::{AppError, DomainError};

pub const MAX_TITLE_LEN: usize = 300;
pub const MAX_BODY_LEN: usize = 40_000;

pub struct ContentService<PR, CR, C>
where
    PR: PostRepository,
    CR: CommentRepository,
    C: Cache,
{
    posts: Arc<PR>,
    comments: Arc<CR>,
    cache: Arc<C>,
    effects: SideEffectQueue,
    cache_ttl: Duration,
}

impl<PR, CR, C> ContentService<PR, CR, C>
where
    PR: PostRepository,
    CR: CommentRepository,
    C: Cache,
{
    pub fn new(posts: Arc<PR>, comments: Arc<CR>, cache: Arc<C>, effects: SideEffectQueue) -> Self {
        Self {
            posts,
            comments,
            cache,
            effects,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub async fn create_post(
        &self,
        author_id: &AgentId,
        title: &str,
        body: &str,
    ) -> Result<Post, AppError> {
        let title = title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::Validation(format!(
                "Title must be between 1 and {} characters",
                MAX_TITLE_LEN
            ))
            .into());
        }
        validate_body(body, true)?;

        let post = self
            .posts
            .create(&NewPost {
                author_id: *author_id,
                title: title.to_string(),
                body: body.to_string(),
            })
            .await?;

        tracing::info!(post_id = %post.id, author_id = %author_id, "Post created");
        self.effects.content_changed(None, author_id);
        Ok(post)
    }

    /// Comment on a live post, optionally replying to a live comment on the same post
    pub async fn create_comment(
        &self,
        author_id: &AgentId,
        post_id: &PostId,
        body: &str,
        parent_id: Option<CommentId>,
    ) -> Result<Comment, AppError> {
        validate_body(body, false)?;

        self.live_post(post_id).await?;

        if let Some(parent_id) = parent_id {
            let parent = self.live_comment(&parent_id).await?;
            if parent.post_id != *post_id {
                return Err(DomainError::Validation(format!(
                    "Parent comment {} belongs to a different post",
                    parent_id
                ))
                .into());
            }
        }

        let comment = self
            .comments
            .create(&NewComment {
                post_id: *post_id,
                parent_id,
                author_id: *author_id,
                body: body.to_string(),
            })
            .await?;

        tracing::info!(
            comment_id = %comment.id,
            post_id = %post_id,
            author_id = %author_id,
            "Comment created"
        );
        self.effects.content_changed(None, author_id);
        Ok(comment)
    }

    pub async fn get_post(&self, id: &PostId) -> Result<Post, AppError> {
        let key = target_key(&TargetRef::post(id.0));
        if let Some(post) = self.cached(&key).await {
            return Ok(post);
        }

        let post = self.live_post(id).await?;
        self.store(&key, &post).await;
        Ok(post)
    }

    pub async fn get_comment(&self, id: &CommentId) -> Result<Comment, AppError> {
        let key = target_key(&TargetRef::comment(id.0));
        if let Some(comment) = self.cached(&key).await {
            return Ok(comment);
        }

        let comment = self.live_comment(id).await?;
        self.store(&key, &comment).await;
        Ok(comment)
    }

    /// Soft-delete a post. Only its author may delete it.
    pub async fn delete_post(&self, agent_id: &AgentId, id: &PostId) -> Result<(), AppError> {
        let post = self.live_post(id).await?;
        if post.author_id != *agent_id {
            return Err(DomainError::Forbidden("Only the author can delete a post".into()).into());
        }

        // Lost a race with another delete of the same post
        if !self.posts.soft_delete(id, Utc::now()).await? {
            return Err(DomainError::NotFound(format!("Post not found: {}", id)).into());
        }

        tracing::info!(post_id = %id, author_id = %agent_id, "Post deleted");
        self.effects.content_changed(Some(&post.target()), agent_id);
        Ok(())
    }

    /// Soft-delete a comment. Only its author may delete it.
    pub async fn delete_comment(&self, agent_id: &AgentId, id: &CommentId) -> Result<(), AppError> {
        let comment = self.live_comment(id).await?;
        if comment.author_id != *agent_id {
            return Err(
                DomainError::Forbidden("Only the author can delete a comment".into()).into(),
            );
        }

        if !self.comments.soft_delete(id, Utc::now()).await? {
            return Err(DomainError::NotFound(format!("Comment not found: {}", id)).into());
        }

        tracing::info!(comment_id = %id, author_id = %agent_id, "Comment deleted");
        self.effects.content_changed(Some(&comment.target()), agent_id);
        Ok(())
    }

    async fn live_post(&self, id: &PostId) -> Result<Post, AppError> {
        match self.posts.find_by_id(id).await? {
            Some(post) if !post.is_deleted() => Ok(post),
            _ => Err(DomainError::NotFound(format!("Post not found: {}", id)).into()),
        }
    }

    async fn live_comment(&self, id: &CommentId) -> Result<Comment, AppError> {
        match self.comments.find_by_id(id).await? {
            Some(comment) if !comment.is_deleted() => Ok(comment),
            _ => Err(DomainError::NotFound(format!("Comment not found: {}", id)).into()),
        }
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        get_json(self.cache.as_ref(), key)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(key, error = %e, "Cache read failed");
                None
            })
    }

    async fn store<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = set_json(self.cache.as_ref(), key, value, self.cache_ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }
}

fn validate_body(body: &str, allow_empty: bool) -> Result<(), AppError> {
    if !allow_empty && body.trim().is_empty() {
        return Err(DomainError::Validation("Body must not be empty".to_string()).into());
    }
    if body.chars().count() > MAX_BODY_LEN {
        return Err(DomainError::Validation(format!(
            "Body must be at most {} characters",
            MAX_BODY_LEN
        ))
        .into());
    }
    Ok(())
}
