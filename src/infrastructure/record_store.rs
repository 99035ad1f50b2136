// Record Store Interface - the persistence capability the engagement core is written against
// Implementations: SqliteStore (sqlx) and MemoryStore (tests, single-process deployments)

use async_trait::async_trait;

use crate::core::{CommentId, EntityKind, PostId, Timestamp, UserId};
use crate::entities::{EntComment, EntPost, EntUser};
use crate::error::{AppError, AppResult};

/// Filter shared by queries and counts.
///
/// `author_id` matches the comment/post author, or the user id itself for users.
/// `post_id` matches the owning post of a comment, or the post id itself for posts;
/// it has no meaning for users. `created_from`/`created_to` are inclusive bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub author_id: Option<UserId>,
    pub post_id: Option<PostId>,
    pub created_from: Option<Timestamp>,
    pub created_to: Option<Timestamp>,
}

impl RecordFilter {
    pub fn by_author(author_id: UserId) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::default()
        }
    }

    pub fn by_post(post_id: PostId) -> Self {
        Self {
            post_id: Some(post_id),
            ..Self::default()
        }
    }

    pub fn created_between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.created_from = Some(from);
        self.created_to = Some(to);
        self
    }

    /// Reject filters that cannot apply to the given collection.
    pub fn check_applies_to(&self, kind: EntityKind) -> AppResult<()> {
        match kind {
            EntityKind::User if self.post_id.is_some() => Err(AppError::Validation(
                "post filter does not apply to users".to_string(),
            )),
            EntityKind::Dashboard => Err(AppError::Validation(
                "dashboard is not a stored collection".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn matches_created(&self, created_at: Timestamp) -> bool {
        self.created_from.map_or(true, |from| created_at >= from)
            && self.created_to.map_or(true, |to| created_at <= to)
    }
}

/// Sort keys; every sort is descending with the record id as tie-breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    UpdatedDesc,
    CreatedDesc,
}

/// Offset query: skip `offset` sorted records, return at most `limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub filter: RecordFilter,
    pub sort: SortKey,
    pub offset: u64,
    pub limit: Option<u32>,
}

impl RecordQuery {
    pub fn new(filter: RecordFilter, sort: SortKey) -> Self {
        Self {
            filter,
            sort,
            offset: 0,
            limit: None,
        }
    }

    pub fn page(mut self, offset: u64, limit: u32) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Result of an atomic like toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeToggle {
    pub comment: EntComment,
    pub liked: bool,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    // Comment operations
    async fn insert_comment(&self, comment: &EntComment) -> AppResult<()>;
    async fn get_comment(&self, id: CommentId) -> AppResult<Option<EntComment>>;
    /// Returns `None` when the comment no longer exists.
    async fn update_comment_content(
        &self,
        id: CommentId,
        content: &str,
        updated_at: Timestamp,
    ) -> AppResult<Option<EntComment>>;
    /// Atomically flips membership of `user_id` in `liked_by`.
    /// Returns `None` when the comment no longer exists.
    async fn toggle_comment_like(
        &self,
        id: CommentId,
        user_id: UserId,
        updated_at: Timestamp,
    ) -> AppResult<Option<LikeToggle>>;
    async fn delete_comment(&self, id: CommentId) -> AppResult<bool>;
    async fn delete_comments_for_post(&self, post_id: PostId) -> AppResult<u64>;
    async fn query_comments(&self, query: &RecordQuery) -> AppResult<Vec<EntComment>>;

    // Post operations
    async fn insert_post(&self, post: &EntPost) -> AppResult<()>;
    async fn get_post(&self, id: PostId) -> AppResult<Option<EntPost>>;
    async fn delete_post(&self, id: PostId) -> AppResult<bool>;
    async fn query_posts(&self, query: &RecordQuery) -> AppResult<Vec<EntPost>>;

    // User operations
    async fn insert_user(&self, user: &EntUser) -> AppResult<()>;
    async fn get_user(&self, id: UserId) -> AppResult<Option<EntUser>>;
    async fn query_users(&self, query: &RecordQuery) -> AppResult<Vec<EntUser>>;

    // Aggregates
    async fn count(&self, kind: EntityKind, filter: &RecordFilter) -> AppResult<u64>;

    async fn health_check(&self) -> AppResult<()>;
}
