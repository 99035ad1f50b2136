// In-memory record store - every mutation happens under one write lock,
// which gives the same per-record atomicity the SQLite store gets from transactions

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::core::{CommentId, EntityKind, PostId, Timestamp, UserId};
use crate::entities::{EntComment, EntPost, EntUser};
use crate::error::{AppError, AppResult};
use crate::infrastructure::record_store::{
    LikeToggle, RecordFilter, RecordQuery, RecordStore, SortKey,
};

#[derive(Debug, Default)]
struct MemoryTables {
    comments: HashMap<CommentId, EntComment>,
    posts: HashMap<PostId, EntPost>,
    users: HashMap<UserId, EntUser>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Common view over the three record types for filtering and sorting.
trait StoredRecord: Clone {
    fn key(&self) -> i64;
    fn author_key(&self) -> i64;
    fn post_key(&self) -> Option<i64>;
    fn created(&self) -> Timestamp;
    fn updated(&self) -> Timestamp;
}

impl StoredRecord for EntComment {
    fn key(&self) -> i64 {
        self.id.value()
    }
    fn author_key(&self) -> i64 {
        self.author_id.value()
    }
    fn post_key(&self) -> Option<i64> {
        Some(self.post_id.value())
    }
    fn created(&self) -> Timestamp {
        self.created_at
    }
    fn updated(&self) -> Timestamp {
        self.updated_at
    }
}

impl StoredRecord for EntPost {
    fn key(&self) -> i64 {
        self.id.value()
    }
    fn author_key(&self) -> i64 {
        self.author_id.value()
    }
    fn post_key(&self) -> Option<i64> {
        Some(self.id.value())
    }
    fn created(&self) -> Timestamp {
        self.created_at
    }
    fn updated(&self) -> Timestamp {
        self.updated_at
    }
}

impl StoredRecord for EntUser {
    fn key(&self) -> i64 {
        self.id.value()
    }
    fn author_key(&self) -> i64 {
        self.id.value()
    }
    fn post_key(&self) -> Option<i64> {
        None
    }
    fn created(&self) -> Timestamp {
        self.created_at
    }
    // Users have no update timestamp in this core
    fn updated(&self) -> Timestamp {
        self.created_at
    }
}

fn matches<R: StoredRecord>(record: &R, filter: &RecordFilter) -> bool {
    filter.author_id.map_or(true, |author| record.author_key() == author.value())
        && filter.post_id.map_or(true, |post| record.post_key() == Some(post.value()))
        && filter.matches_created(record.created())
}

fn run_query<'a, R, I>(records: I, query: &RecordQuery) -> Vec<R>
where
    R: StoredRecord + 'a,
    I: Iterator<Item = &'a R>,
{
    let mut selected: Vec<&R> = records.filter(|r| matches(*r, &query.filter)).collect();
    selected.sort_by(|a, b| {
        let (ka, kb) = match query.sort {
            SortKey::UpdatedDesc => (a.updated(), b.updated()),
            SortKey::CreatedDesc => (a.created(), b.created()),
        };
        kb.cmp(&ka).then_with(|| b.key().cmp(&a.key()))
    });

    let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
    let limit = query.limit.map_or(usize::MAX, |l| l as usize);
    selected
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_comment(&self, comment: &EntComment) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.comments.contains_key(&comment.id) {
            return Err(AppError::Store(format!("Comment {} already exists", comment.id)));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn get_comment(&self, id: CommentId) -> AppResult<Option<EntComment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn update_comment_content(
        &self,
        id: CommentId,
        content: &str,
        updated_at: Timestamp,
    ) -> AppResult<Option<EntComment>> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.get_mut(&id).map(|comment| {
            comment.content = content.to_string();
            comment.updated_at = updated_at;
            comment.clone()
        }))
    }

    async fn toggle_comment_like(
        &self,
        id: CommentId,
        user_id: UserId,
        updated_at: Timestamp,
    ) -> AppResult<Option<LikeToggle>> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.get_mut(&id).map(|comment| {
            let liked = if comment.liked_by.remove(&user_id) {
                false
            } else {
                comment.liked_by.insert(user_id);
                true
            };
            comment.updated_at = updated_at;
            LikeToggle {
                comment: comment.clone(),
                liked,
            }
        }))
    }

    async fn delete_comment(&self, id: CommentId) -> AppResult<bool> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }

    async fn delete_comments_for_post(&self, post_id: PostId) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|_, c| c.post_id != post_id);
        Ok((before - tables.comments.len()) as u64)
    }

    async fn query_comments(&self, query: &RecordQuery) -> AppResult<Vec<EntComment>> {
        query.filter.check_applies_to(EntityKind::Comment)?;
        let tables = self.tables.read().await;
        Ok(run_query(tables.comments.values(), query))
    }

    async fn insert_post(&self, post: &EntPost) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.posts.contains_key(&post.id) {
            return Err(AppError::Store(format!("Post {} already exists", post.id)));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn get_post(&self, id: PostId) -> AppResult<Option<EntPost>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn delete_post(&self, id: PostId) -> AppResult<bool> {
        Ok(self.tables.write().await.posts.remove(&id).is_some())
    }

    async fn query_posts(&self, query: &RecordQuery) -> AppResult<Vec<EntPost>> {
        query.filter.check_applies_to(EntityKind::Post)?;
        let tables = self.tables.read().await;
        Ok(run_query(tables.posts.values(), query))
    }

    async fn insert_user(&self, user: &EntUser) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) {
            return Err(AppError::Store(format!("User {} already exists", user.id)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<EntUser>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn query_users(&self, query: &RecordQuery) -> AppResult<Vec<EntUser>> {
        query.filter.check_applies_to(EntityKind::User)?;
        let tables = self.tables.read().await;
        Ok(run_query(tables.users.values(), query))
    }

    async fn count(&self, kind: EntityKind, filter: &RecordFilter) -> AppResult<u64> {
        filter.check_applies_to(kind)?;
        let tables = self.tables.read().await;
        let count = match kind {
            EntityKind::Comment => tables.comments.values().filter(|r| matches(*r, filter)).count(),
            EntityKind::Post => tables.posts.values().filter(|r| matches(*r, filter)).count(),
            EntityKind::User => tables.users.values().filter(|r| matches(*r, filter)).count(),
            EntityKind::Dashboard => 0,
        };
        Ok(count as u64)
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}
