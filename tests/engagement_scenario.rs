// The end-to-end comment scenario, run against both record stores

use chrono::Utc;
use std::sync::Arc;

use blog_engagement::{
    app_state::AppState,
    config::EngagementConfig,
    core::{PostId, UserId},
    entities::{EntPost, EntUser},
    error::AppError,
    infrastructure::{
        ManualClock, MemoryStore, RecordStore, SqliteStore, SystemClock, ViewerContext,
    },
    services::PageRequest,
};

fn engagement_config() -> EngagementConfig {
    EngagementConfig {
        node_id: 3,
        page_size: 9,
        max_page_size: 50,
    }
}

fn user(id: i64) -> ViewerContext {
    ViewerContext::authenticated_user(UserId(id), format!("req-{}", id))
}

async fn run_scenario(store: Arc<dyn RecordStore>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let state = AppState::with_store(store.clone(), clock.clone(), &engagement_config()).unwrap();

    let now = Utc::now();
    for (id, admin) in [(1, false), (2, false), (3, false), (9, true)] {
        store
            .insert_user(&EntUser::new(UserId(id), format!("u{}", id), admin, now))
            .await
            .unwrap();
    }
    let post = PostId(100);
    store
        .insert_post(&EntPost::new(post, UserId(1), "P", now))
        .await
        .unwrap();

    // U1 comments
    let comment = state.engagement.create(&user(1), post, "nice post").await.unwrap();
    assert!(comment.liked_by.is_empty());
    assert_eq!(comment.number_of_likes(), 0);

    // U2 likes, then unlikes
    let liked = state.engagement.toggle_like(&user(2), comment.id).await.unwrap();
    assert_eq!(liked.liked_by.iter().copied().collect::<Vec<_>>(), vec![UserId(2)]);
    assert_eq!(liked.number_of_likes(), 1);

    let unliked = state.engagement.toggle_like(&user(2), comment.id).await.unwrap();
    assert!(unliked.liked_by.is_empty());
    assert_eq!(unliked.number_of_likes(), 0);

    // U1 edits
    let edited = state
        .engagement
        .edit(&user(1), comment.id, "nice post indeed")
        .await
        .unwrap();
    assert_eq!(edited.content, "nice post indeed");

    // U3 cannot delete
    assert!(matches!(
        state.engagement.delete(&user(3), comment.id).await,
        Err(AppError::Forbidden(_))
    ));

    // Admin can
    let admin = ViewerContext::admin(UserId(9), "req-admin".to_string());
    state.engagement.delete(&admin, comment.id).await.unwrap();

    assert!(matches!(
        state.engagement.get(&user(1), comment.id).await,
        Err(AppError::NotFound(_))
    ));
}

async fn run_cascade(store: Arc<dyn RecordStore>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let state = AppState::with_store(store.clone(), clock, &engagement_config()).unwrap();
    let now = Utc::now();

    store
        .insert_post(&EntPost::new(PostId(1), UserId(1), "doomed", now))
        .await
        .unwrap();
    for i in 0..11 {
        state
            .engagement
            .create(&user(2 + i % 2), PostId(1), &format!("comment {}", i))
            .await
            .unwrap();
    }

    let anon = ViewerContext::anonymous("req-anon".to_string());
    let first = state
        .listing
        .list_post_comments(&anon, PostId(1), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(first.items.len(), 9);
    assert!(first.has_more);

    let deletion = state.posts.delete(&user(1), PostId(1)).await.unwrap();
    assert_eq!(deletion.comments_removed, 11);

    let admin = ViewerContext::admin(UserId(9), "req-admin".to_string());
    let page = state
        .listing
        .list_comments(&admin, None, PageRequest::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn scenario_memory_store() {
    run_scenario(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn scenario_sqlite_store() {
    run_scenario(Arc::new(SqliteStore::new_in_memory().await.unwrap())).await;
}

#[tokio::test]
async fn cascade_memory_store() {
    run_cascade(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn cascade_sqlite_store() {
    run_cascade(Arc::new(SqliteStore::new_in_memory().await.unwrap())).await;
}

async fn created_at_is_stable(store: Arc<dyn RecordStore>) {
    let state = AppState::with_store(store.clone(), Arc::new(SystemClock), &engagement_config())
        .unwrap();
    store
        .insert_post(&EntPost::new(PostId(1), UserId(1), "p", Utc::now()))
        .await
        .unwrap();

    let created = state.engagement.create(&user(2), PostId(1), "first").await.unwrap();
    let edited = state.engagement.edit(&user(2), created.id, "second").await.unwrap();
    let liked = state.engagement.toggle_like(&user(3), created.id).await.unwrap();
    let read = state.engagement.get(&user(2), created.id).await.unwrap();

    assert_eq!(created.created_at, edited.created_at);
    assert_eq!(created.created_at, liked.created_at);
    assert_eq!(created.created_at, read.created_at);
    assert_eq!(liked.updated_at, read.updated_at);
}

#[tokio::test]
async fn created_at_survives_sqlite_round_trip() {
    created_at_is_stable(Arc::new(SqliteStore::new_in_memory().await.unwrap())).await;
}

#[tokio::test]
async fn created_at_survives_memory_round_trip() {
    created_at_is_stable(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn concurrent_likes_on_file_backed_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("engagement.db").display());

    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::connect(&url, 4).await.unwrap());
    let state = AppState::with_store(
        store.clone(),
        Arc::new(ManualClock::new(Utc::now())),
        &engagement_config(),
    )
    .unwrap();
    store
        .insert_post(&EntPost::new(PostId(1), UserId(1), "p", Utc::now()))
        .await
        .unwrap();
    let comment = state.engagement.create(&user(1), PostId(1), "like me").await.unwrap();
    let comment_id = comment.id;

    let tasks: Vec<_> = (10..30)
        .map(|id| {
            let engagement = state.engagement.clone();
            tokio::spawn(async move { engagement.toggle_like(&user(id), comment_id).await })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let stored = state.engagement.get(&user(1), comment.id).await.unwrap();
    assert_eq!(stored.number_of_likes(), 20);
    drop(state);
    drop(store);

    // Data survives reopening the file
    let reopened = SqliteStore::connect(&url, 1).await.unwrap();
    let again = reopened.get_comment(comment.id).await.unwrap().unwrap();
    assert_eq!(again.liked_by.len(), 20);
    assert_eq!(again.content, "like me");
}
