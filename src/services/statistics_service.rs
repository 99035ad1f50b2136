// StatisticsService - totals and trailing 30-day cohort counts for the admin overview
// Nothing is cached; every call counts against the store

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::{EntityKind, Timestamp};
use crate::ent_framework::{PrivacyContext, PrivacyOperation, PrivacyRegistry};
use crate::entities::{CommentView, EntPost, EntUser};
use crate::error::AppResult;
use crate::infrastructure::clock::Clock;
use crate::infrastructure::record_store::{RecordFilter, RecordQuery, RecordStore, SortKey};
use crate::infrastructure::viewer::ViewerContext;

pub const ROLLING_WINDOW_DAYS: i64 = 30;
pub const RECENT_ITEMS: u32 = 5;

/// Inclusive window `[now - 30 days, now]`.
pub fn rolling_window(now: Timestamp) -> (Timestamp, Timestamp) {
    (now - Duration::days(ROLLING_WINDOW_DAYS), now)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary<T> {
    pub total: u64,
    pub last_month: u64,
    pub recent: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub users: CollectionSummary<EntUser>,
    pub posts: CollectionSummary<EntPost>,
    pub comments: CollectionSummary<CommentView>,
    pub generated_at: Timestamp,
}

#[derive(Clone)]
pub struct StatisticsService {
    store: Arc<dyn RecordStore>,
    privacy: Arc<PrivacyRegistry>,
    clock: Arc<dyn Clock>,
}

impl StatisticsService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        privacy: Arc<PrivacyRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            privacy,
            clock,
        }
    }

    async fn authorize(&self, vc: &ViewerContext) -> AppResult<()> {
        vc.require_actor()?;
        self.privacy
            .enforce(&PrivacyContext::new(
                EntityKind::Dashboard,
                PrivacyOperation::Aggregate,
                vc,
            ))
            .await
    }

    async fn count_since(
        &self,
        kind: EntityKind,
        filter: &RecordFilter,
        now: Timestamp,
    ) -> AppResult<u64> {
        let (from, to) = rolling_window(now);
        let windowed = filter.clone().created_between(from, to);
        self.store.count(kind, &windowed).await
    }

    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn total(
        &self,
        vc: &ViewerContext,
        kind: EntityKind,
        filter: RecordFilter,
    ) -> AppResult<u64> {
        self.authorize(vc).await?;
        let total = self.store.count(kind, &filter).await?;
        debug!(%kind, total, "total counted");
        Ok(total)
    }

    /// Records created in the 30 days up to the moment of the call.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn last_month(
        &self,
        vc: &ViewerContext,
        kind: EntityKind,
        filter: RecordFilter,
    ) -> AppResult<u64> {
        self.authorize(vc).await?;
        let count = self.count_since(kind, &filter, self.clock.now()).await?;
        debug!(%kind, count, "last month counted");
        Ok(count)
    }

    /// Counts and the five newest records for users, posts and comments.
    /// The three collections are read concurrently against a single `now`.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn overview(&self, vc: &ViewerContext) -> AppResult<DashboardOverview> {
        self.authorize(vc).await?;
        let now = self.clock.now();
        let all = RecordFilter::default();

        let users = async {
            let recent = RecordQuery::new(all.clone(), SortKey::CreatedDesc).page(0, RECENT_ITEMS);
            let (total, last_month, recent) = futures::try_join!(
                self.store.count(EntityKind::User, &all),
                self.count_since(EntityKind::User, &all, now),
                self.store.query_users(&recent),
            )?;
            AppResult::Ok(CollectionSummary {
                total,
                last_month,
                recent,
            })
        };

        let posts = async {
            let recent = RecordQuery::new(all.clone(), SortKey::UpdatedDesc).page(0, RECENT_ITEMS);
            let (total, last_month, recent) = futures::try_join!(
                self.store.count(EntityKind::Post, &all),
                self.count_since(EntityKind::Post, &all, now),
                self.store.query_posts(&recent),
            )?;
            AppResult::Ok(CollectionSummary {
                total,
                last_month,
                recent,
            })
        };

        let comments = async {
            let recent = RecordQuery::new(all.clone(), SortKey::UpdatedDesc).page(0, RECENT_ITEMS);
            let (total, last_month, recent) = futures::try_join!(
                self.store.count(EntityKind::Comment, &all),
                self.count_since(EntityKind::Comment, &all, now),
                self.store.query_comments(&recent),
            )?;
            AppResult::Ok(CollectionSummary {
                total,
                last_month,
                recent: recent.into_iter().map(CommentView::from).collect(),
            })
        };

        let (users, posts, comments) = futures::try_join!(users, posts, comments)?;
        debug!(
            users = users.total,
            posts = posts.total,
            comments = comments.total,
            "dashboard overview computed"
        );

        Ok(DashboardOverview {
            users,
            posts,
            comments,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommentId, PostId, UserId};
    use crate::ent_framework::create_blog_privacy_registry;
    use crate::entities::EntComment;
    use crate::error::AppError;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::memory_store::MemoryStore;
    use chrono::Utc;

    fn admin() -> ViewerContext {
        ViewerContext::admin(UserId(1), "req".to_string())
    }

    fn service(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> StatisticsService {
        StatisticsService::new(store, Arc::new(create_blog_privacy_registry()), clock)
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));

        let created = [
            now,
            now - Duration::days(30),
            now - Duration::days(30) - Duration::milliseconds(1),
            now + Duration::seconds(1),
        ];
        for (i, at) in created.iter().enumerate() {
            store
                .insert_post(&EntPost::new(PostId(i as i64), UserId(1), "p", *at))
                .await
                .unwrap();
        }

        let stats = service(store, clock);
        assert_eq!(stats.total(&admin(), EntityKind::Post, RecordFilter::default()).await.unwrap(), 4);
        assert_eq!(
            stats.last_month(&admin(), EntityKind::Post, RecordFilter::default()).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_last_month_non_decreasing_until_records_age_out() {
        let store = Arc::new(MemoryStore::new());
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let stats = service(store.clone(), clock.clone());

        let mut previous = 0;
        for day in 0..10 {
            let now = start + Duration::days(day);
            clock.set(now);
            store
                .insert_user(&EntUser::new(UserId(day), format!("u{}", day), false, now))
                .await
                .unwrap();

            let count = stats
                .last_month(&admin(), EntityKind::User, RecordFilter::default())
                .await
                .unwrap();
            assert!(count >= previous);
            previous = count;
        }
        assert_eq!(previous, 10);

        // Day 0's user drops out once the window has moved past it
        clock.set(start + Duration::days(30) + Duration::milliseconds(1));
        let aged = stats
            .last_month(&admin(), EntityKind::User, RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(aged, 9);
    }

    #[tokio::test]
    async fn test_filtered_counts() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        for i in 0..6 {
            store
                .insert_comment(&EntComment::new(
                    CommentId(i),
                    PostId(i % 2),
                    UserId(i % 3),
                    "x".to_string(),
                    now - Duration::days(i * 10),
                ))
                .await
                .unwrap();
        }
        let stats = service(store, Arc::new(ManualClock::new(now)));

        let by_post = stats
            .total(&admin(), EntityKind::Comment, RecordFilter::by_post(PostId(0)))
            .await
            .unwrap();
        assert_eq!(by_post, 3);

        // created 0, 10, 20, 30 days ago fall in the window
        let recent = stats
            .last_month(&admin(), EntityKind::Comment, RecordFilter::default())
            .await
            .unwrap();
        assert_eq!(recent, 4);
    }

    #[tokio::test]
    async fn test_overview_admin_only() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        for i in 0..7 {
            store
                .insert_post(&EntPost::new(PostId(i), UserId(1), "p", now - Duration::days(i * 6)))
                .await
                .unwrap();
        }
        let stats = service(store, Arc::new(ManualClock::new(now)));

        let overview = stats.overview(&admin()).await.unwrap();
        assert_eq!(overview.posts.total, 7);
        assert_eq!(overview.posts.last_month, 6);
        assert_eq!(overview.posts.recent.len(), 5);
        assert_eq!(overview.posts.recent[0].id, PostId(0));
        assert_eq!(overview.users.total, 0);
        assert!(overview.comments.recent.is_empty());

        let user = ViewerContext::authenticated_user(UserId(2), "req".to_string());
        assert!(matches!(stats.overview(&user).await, Err(AppError::Forbidden(_))));
        let anon = ViewerContext::anonymous("req".to_string());
        assert!(matches!(stats.overview(&anon).await, Err(AppError::Unauthorized(_))));
    }
}
