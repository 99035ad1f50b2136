// PostService - post removal and the comment cascade that follows it

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::{EntityKind, PostId};
use crate::ent_framework::{PrivacyContext, PrivacyOperation, PrivacyRegistry};
use crate::entities::EntPost;
use crate::error::{AppError, AppResult};
use crate::infrastructure::record_store::RecordStore;
use crate::infrastructure::viewer::ViewerContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDeletion {
    pub post_id: PostId,
    pub comments_removed: u64,
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn RecordStore>,
    privacy: Arc<PrivacyRegistry>,
}

impl PostService {
    pub fn new(store: Arc<dyn RecordStore>, privacy: Arc<PrivacyRegistry>) -> Self {
        Self { store, privacy }
    }

    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn get(&self, vc: &ViewerContext, id: PostId) -> AppResult<EntPost> {
        self.privacy
            .enforce(&PrivacyContext::new(EntityKind::Post, PrivacyOperation::Read, vc))
            .await?;
        self.store
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    /// Deletes the post, then every comment that points at it.
    ///
    /// The two steps are not atomic. If the cascade fails the post is already
    /// gone and the error is returned; `EngagementService::purge_orphans`
    /// removes what is left.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn delete(&self, vc: &ViewerContext, id: PostId) -> AppResult<PostDeletion> {
        vc.require_actor()?;
        let post = self
            .store
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

        let ctx = PrivacyContext::new(EntityKind::Post, PrivacyOperation::Delete, vc)
            .owned_by(Some(post.author_id));
        self.privacy.enforce(&ctx).await?;

        if !self.store.delete_post(id).await? {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        let comments_removed = match self.store.delete_comments_for_post(id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(post_id = %id, error = %e, "post deleted but comment cascade failed");
                return Err(e);
            }
        };

        info!(post_id = %id, comments_removed, "post deleted");
        Ok(PostDeletion {
            post_id: id,
            comments_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommentId, UserId};
    use crate::ent_framework::create_blog_privacy_registry;
    use crate::entities::EntComment;
    use crate::infrastructure::memory_store::MemoryStore;
    use crate::infrastructure::record_store::RecordFilter;
    use chrono::Utc;

    async fn setup() -> (PostService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store
            .insert_post(&EntPost::new(PostId(1), UserId(5), "mine", now))
            .await
            .unwrap();
        store
            .insert_post(&EntPost::new(PostId(2), UserId(6), "theirs", now))
            .await
            .unwrap();
        for (id, post) in [(10, 1), (11, 1), (12, 2)] {
            store
                .insert_comment(&EntComment::new(
                    CommentId(id),
                    PostId(post),
                    UserId(7),
                    "c".to_string(),
                    now,
                ))
                .await
                .unwrap();
        }
        let service = PostService::new(store.clone(), Arc::new(create_blog_privacy_registry()));
        (service, store)
    }

    #[tokio::test]
    async fn test_author_delete_cascades_to_comments() {
        let (service, store) = setup().await;
        let author = ViewerContext::authenticated_user(UserId(5), "req".to_string());

        let deletion = service.delete(&author, PostId(1)).await.unwrap();
        assert_eq!(deletion.comments_removed, 2);
        assert!(store.get_post(PostId(1)).await.unwrap().is_none());
        assert_eq!(
            store.count(EntityKind::Comment, &RecordFilter::default()).await.unwrap(),
            1
        );

        assert!(matches!(
            service.delete(&author, PostId(1)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_author_or_admin() {
        let (service, store) = setup().await;
        let stranger = ViewerContext::authenticated_user(UserId(5), "req".to_string());
        assert!(matches!(
            service.delete(&stranger, PostId(2)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(store.get_post(PostId(2)).await.unwrap().is_some());

        let admin = ViewerContext::admin(UserId(99), "req".to_string());
        assert_eq!(service.delete(&admin, PostId(2)).await.unwrap().comments_removed, 1);
    }
}
