// ListingService - offset pages of comments, posts and users
// Pages are independent reads; records written between two calls may shift later pages

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::{EntityKind, PostId, UserId};
use crate::ent_framework::{PrivacyContext, PrivacyOperation, PrivacyRegistry};
use crate::entities::{EntComment, EntPost, EntUser};
use crate::error::{AppError, AppResult};
use crate::infrastructure::record_store::{RecordFilter, RecordQuery, RecordStore, SortKey};
use crate::infrastructure::viewer::ViewerContext;

pub const DEFAULT_PAGE_SIZE: u32 = 9;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 50;

/// One page of results.
///
/// `has_more` is true exactly when the page came back full, so a full last
/// page still reports more and the next request returns an empty page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub start_index: u64,
    pub next_index: u64,
}

impl<T> Page<T> {
    pub fn from_items(items: Vec<T>, start_index: u64, page_size: u32) -> Self {
        let has_more = items.len() == page_size as usize;
        let next_index = start_index + items.len() as u64;
        Self {
            items,
            has_more,
            start_index,
            next_index,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            has_more: self.has_more,
            start_index: self.start_index,
            next_index: self.next_index,
        }
    }
}

/// Where a page starts and how big it may be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub start_index: u64,
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new(start_index: u64, limit: Option<u32>) -> Self {
        Self { start_index, limit }
    }
}

#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn RecordStore>,
    privacy: Arc<PrivacyRegistry>,
    page_size: u32,
    max_page_size: u32,
}

impl ListingService {
    pub fn new(store: Arc<dyn RecordStore>, privacy: Arc<PrivacyRegistry>) -> Self {
        Self::with_page_sizes(store, privacy, DEFAULT_PAGE_SIZE, DEFAULT_MAX_PAGE_SIZE)
    }

    pub fn with_page_sizes(
        store: Arc<dyn RecordStore>,
        privacy: Arc<PrivacyRegistry>,
        page_size: u32,
        max_page_size: u32,
    ) -> Self {
        Self {
            store,
            privacy,
            page_size,
            max_page_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn resolve_page_size(&self, limit: Option<u32>) -> AppResult<u32> {
        match limit {
            None => Ok(self.page_size),
            Some(size) if (1..=self.max_page_size).contains(&size) => Ok(size),
            Some(size) => Err(AppError::Validation(format!(
                "Page size must be between 1 and {}, got {}",
                self.max_page_size, size
            ))),
        }
    }

    /// Moderation list, most recently updated first. Admins see everything;
    /// anyone else may only list their own comments.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn list_comments(
        &self,
        vc: &ViewerContext,
        author_id: Option<UserId>,
        page: PageRequest,
    ) -> AppResult<Page<EntComment>> {
        vc.require_actor()?;
        let ctx = PrivacyContext::new(EntityKind::Comment, PrivacyOperation::Query, vc)
            .owned_by(author_id);
        self.privacy.enforce(&ctx).await?;

        let size = self.resolve_page_size(page.limit)?;
        let filter = author_id.map(RecordFilter::by_author).unwrap_or_default();
        let query = RecordQuery::new(filter, SortKey::UpdatedDesc).page(page.start_index, size);

        let items = self.store.query_comments(&query).await?;
        debug!(count = items.len(), start = page.start_index, "comments page");
        Ok(Page::from_items(items, page.start_index, size))
    }

    /// Comments under one post, newest created first. Public.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn list_post_comments(
        &self,
        vc: &ViewerContext,
        post_id: PostId,
        page: PageRequest,
    ) -> AppResult<Page<EntComment>> {
        self.privacy
            .enforce(&PrivacyContext::new(EntityKind::Comment, PrivacyOperation::Read, vc))
            .await?;
        let size = self.resolve_page_size(page.limit)?;

        if self.store.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        let query = RecordQuery::new(RecordFilter::by_post(post_id), SortKey::CreatedDesc)
            .page(page.start_index, size);
        let items = self.store.query_comments(&query).await?;
        debug!(%post_id, count = items.len(), "post comments page");
        Ok(Page::from_items(items, page.start_index, size))
    }

    /// Posts, most recently updated first. Public.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn list_posts(
        &self,
        vc: &ViewerContext,
        author_id: Option<UserId>,
        page: PageRequest,
    ) -> AppResult<Page<EntPost>> {
        let ctx =
            PrivacyContext::new(EntityKind::Post, PrivacyOperation::Query, vc).owned_by(author_id);
        self.privacy.enforce(&ctx).await?;

        let size = self.resolve_page_size(page.limit)?;
        let filter = author_id.map(RecordFilter::by_author).unwrap_or_default();
        let query = RecordQuery::new(filter, SortKey::UpdatedDesc).page(page.start_index, size);

        let items = self.store.query_posts(&query).await?;
        debug!(count = items.len(), start = page.start_index, "posts page");
        Ok(Page::from_items(items, page.start_index, size))
    }

    /// Users, most recently created first. Administrators only.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn list_users(
        &self,
        vc: &ViewerContext,
        user_id: Option<UserId>,
        page: PageRequest,
    ) -> AppResult<Page<EntUser>> {
        vc.require_actor()?;
        self.privacy
            .enforce(&PrivacyContext::new(EntityKind::User, PrivacyOperation::Query, vc))
            .await?;

        let size = self.resolve_page_size(page.limit)?;
        let filter = user_id.map(RecordFilter::by_author).unwrap_or_default();
        let query = RecordQuery::new(filter, SortKey::CreatedDesc).page(page.start_index, size);

        let items = self.store.query_users(&query).await?;
        debug!(count = items.len(), start = page.start_index, "users page");
        Ok(Page::from_items(items, page.start_index, size))
    }
}
