// EngagementService - comment lifecycle: create, edit, delete, like toggle
// Every operation re-reads the stored comment before deciding; nothing is cached

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::{CommentId, EntityKind, PostId};
use crate::ent_framework::{PrivacyContext, PrivacyOperation, PrivacyRegistry};
use crate::entities::EntComment;
use crate::error::{AppError, AppResult};
use crate::infrastructure::clock::Clock;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::record_store::RecordStore;
use crate::infrastructure::viewer::ViewerContext;

/// Content must carry at least one non-whitespace character.
pub fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Comment content cannot be empty".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct EngagementService {
    store: Arc<dyn RecordStore>,
    privacy: Arc<PrivacyRegistry>,
    ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl EngagementService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        privacy: Arc<PrivacyRegistry>,
        ids: Arc<IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            privacy,
            ids,
            clock,
        }
    }

    async fn load(&self, id: CommentId) -> AppResult<EntComment> {
        self.store
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }

    /// New comment by the calling user on an existing post, with no likes.
    #[instrument(skip(self, vc, content), fields(request_id = %vc.request_id))]
    pub async fn create(
        &self,
        vc: &ViewerContext,
        post_id: PostId,
        content: &str,
    ) -> AppResult<EntComment> {
        let actor = vc.require_actor()?;
        self.privacy
            .enforce(&PrivacyContext::new(EntityKind::Comment, PrivacyOperation::Create, vc))
            .await?;
        validate_content(content)?;

        if self.store.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        let comment = EntComment::new(
            CommentId(self.ids.next_id()),
            post_id,
            actor.user_id,
            content.to_string(),
            self.clock.now(),
        );
        self.store.insert_comment(&comment).await?;

        info!(comment_id = %comment.id, %post_id, author_id = %actor.user_id, "comment created");
        Ok(comment)
    }

    /// Only the author may edit; administrators get no exception here.
    #[instrument(skip(self, vc, content), fields(request_id = %vc.request_id))]
    pub async fn edit(
        &self,
        vc: &ViewerContext,
        id: CommentId,
        content: &str,
    ) -> AppResult<EntComment> {
        vc.require_actor()?;
        let existing = self.load(id).await?;

        let ctx = PrivacyContext::new(EntityKind::Comment, PrivacyOperation::Update, vc)
            .owned_by(Some(existing.author_id));
        self.privacy.enforce(&ctx).await?;
        validate_content(content)?;

        // A delete racing this edit leaves nothing to update
        let updated = self
            .store
            .update_comment_content(id, content, self.clock.now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;

        info!(comment_id = %id, "comment edited");
        Ok(updated)
    }

    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn delete(&self, vc: &ViewerContext, id: CommentId) -> AppResult<()> {
        let actor = vc.require_actor()?;
        let existing = self.load(id).await?;

        let ctx = PrivacyContext::new(EntityKind::Comment, PrivacyOperation::Delete, vc)
            .owned_by(Some(existing.author_id));
        self.privacy.enforce(&ctx).await?;

        if !self.store.delete_comment(id).await? {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }

        info!(comment_id = %id, deleted_by = %actor.user_id, admin = actor.is_admin, "comment deleted");
        Ok(())
    }

    /// Flips the caller's membership in `liked_by`. Liking your own comment is allowed.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn toggle_like(&self, vc: &ViewerContext, id: CommentId) -> AppResult<EntComment> {
        let actor = vc.require_actor()?;
        self.privacy
            .enforce(&PrivacyContext::new(EntityKind::Comment, PrivacyOperation::Like, vc))
            .await?;

        let toggle = self
            .store
            .toggle_comment_like(id, actor.user_id, self.clock.now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;

        info!(
            comment_id = %id,
            user_id = %actor.user_id,
            liked = toggle.liked,
            likes = toggle.comment.number_of_likes(),
            "comment like toggled"
        );
        Ok(toggle.comment)
    }

    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn get(&self, vc: &ViewerContext, id: CommentId) -> AppResult<EntComment> {
        self.privacy
            .enforce(&PrivacyContext::new(EntityKind::Comment, PrivacyOperation::Read, vc))
            .await?;
        let comment = self.load(id).await?;
        debug!(comment_id = %id, "comment loaded");
        Ok(comment)
    }

    /// Removes comments left behind by a post whose cascade did not finish.
    /// Administrators only; refuses while the post still exists.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn purge_orphans(&self, vc: &ViewerContext, post_id: PostId) -> AppResult<u64> {
        vc.require_actor()?;
        // No owner: only the admin rule can allow this
        self.privacy
            .enforce(&PrivacyContext::new(EntityKind::Comment, PrivacyOperation::Delete, vc))
            .await?;

        if self.store.get_post(post_id).await?.is_some() {
            return Err(AppError::Validation(format!(
                "Post {} still exists; delete the post instead",
                post_id
            )));
        }

        let removed = self.store.delete_comments_for_post(post_id).await?;
        info!(%post_id, removed, "orphaned comments purged");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UserId;
    use crate::ent_framework::create_blog_privacy_registry;
    use crate::entities::EntPost;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::memory_store::MemoryStore;
    use chrono::{Duration, Utc};

    struct Harness {
        service: EngagementService,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        post_id: PostId,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let post_id = PostId(500);
        store
            .insert_post(&EntPost::new(post_id, UserId(1), "hello", clock.now()))
            .await
            .unwrap();

        let service = EngagementService::new(
            store.clone(),
            Arc::new(create_blog_privacy_registry()),
            Arc::new(IdGenerator::new(1).unwrap()),
            clock.clone(),
        );
        Harness {
            service,
            store,
            clock,
            post_id,
        }
    }

    fn user(id: i64) -> ViewerContext {
        ViewerContext::authenticated_user(UserId(id), format!("req-user-{}", id))
    }

    fn admin() -> ViewerContext {
        ViewerContext::admin(UserId(1000), "req-admin".to_string())
    }

    #[tokio::test]
    async fn test_create_validates_then_checks_post() {
        let h = harness().await;

        let empty = h.service.create(&user(1), h.post_id, "   ").await;
        assert!(matches!(empty, Err(AppError::Validation(_))));

        let missing = h.service.create(&user(1), PostId(404), "hi").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        // Empty content on a missing post reports the validation failure
        let both = h.service.create(&user(1), PostId(404), "").await;
        assert!(matches!(both, Err(AppError::Validation(_))));

        let anon = ViewerContext::anonymous("req-anon".to_string());
        assert!(matches!(
            h.service.create(&anon, h.post_id, "hi").await,
            Err(AppError::Unauthorized(_))
        ));

        let created = h.service.create(&user(1), h.post_id, "hi").await.unwrap();
        assert!(created.liked_by.is_empty());
        assert_eq!(created.author_id, UserId(1));
        assert_eq!(created.created_at, created.updated_at);
    }

    #[tokio::test]
    async fn test_edit_is_author_only() {
        let h = harness().await;
        let comment = h.service.create(&user(1), h.post_id, "first").await.unwrap();

        assert!(matches!(
            h.service.edit(&admin(), comment.id, "admin edit").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.edit(&user(2), comment.id, "other edit").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.edit(&user(1), comment.id, "").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            h.service.edit(&user(1), CommentId(1), "x").await,
            Err(AppError::NotFound(_))
        ));

        h.clock.advance(Duration::minutes(3));
        let edited = h.service.edit(&user(1), comment.id, "second").await.unwrap();
        assert_eq!(edited.content, "second");
        assert_eq!(edited.created_at, comment.created_at);
        assert_eq!(edited.updated_at, h.clock.now());
    }

    #[tokio::test]
    async fn test_forbidden_edit_leaves_content_untouched() {
        let h = harness().await;
        let comment = h.service.create(&user(1), h.post_id, "keep me").await.unwrap();

        let _ = h.service.edit(&user(2), comment.id, "").await;
        let stored = h.store.get_comment(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "keep me");
    }

    #[tokio::test]
    async fn test_delete_by_author_admin_or_nobody_else() {
        let h = harness().await;
        let mine = h.service.create(&user(1), h.post_id, "a").await.unwrap();
        let theirs = h.service.create(&user(2), h.post_id, "b").await.unwrap();

        assert!(matches!(
            h.service.delete(&user(3), mine.id).await,
            Err(AppError::Forbidden(_))
        ));
        h.service.delete(&user(1), mine.id).await.unwrap();
        h.service.delete(&admin(), theirs.id).await.unwrap();

        assert!(matches!(
            h.service.delete(&user(1), mine.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_double_toggle_restores_likes() {
        let h = harness().await;
        let comment = h.service.create(&user(1), h.post_id, "like me").await.unwrap();

        let liked = h.service.toggle_like(&user(2), comment.id).await.unwrap();
        assert!(liked.is_liked_by(UserId(2)));
        assert_eq!(liked.number_of_likes(), liked.liked_by.len());

        let own = h.service.toggle_like(&user(1), comment.id).await.unwrap();
        assert_eq!(own.number_of_likes(), 2);

        h.service.toggle_like(&user(2), comment.id).await.unwrap();
        let restored = h.service.toggle_like(&user(1), comment.id).await.unwrap();
        assert_eq!(restored.liked_by, comment.liked_by);

        assert!(matches!(
            h.service.toggle_like(&user(2), CommentId(77)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_orphans_requires_admin_and_absent_post() {
        let h = harness().await;
        h.service.create(&user(1), h.post_id, "a").await.unwrap();
        h.service.create(&user(2), h.post_id, "b").await.unwrap();

        assert!(matches!(
            h.service.purge_orphans(&admin(), h.post_id).await,
            Err(AppError::Validation(_))
        ));

        h.store.delete_post(h.post_id).await.unwrap();
        assert!(matches!(
            h.service.purge_orphans(&user(1), h.post_id).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(h.service.purge_orphans(&admin(), h.post_id).await.unwrap(), 2);
    }
}
