// Blog HTTP Interface - thin transport adapter over the engagement services
// Handlers parse input, call one service operation, and shape the JSON

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    core::{CommentId, PostId, UserId},
    entities::{CommentView, EntPost, EntUser},
    error::{AppError, AppResult},
    infrastructure::middleware::{viewer_context_middleware, ApiJson, ApiPath, ApiQuery, Vc},
    services::{DashboardOverview, Page, PageRequest, PostDeletion},
};

pub const MAX_COMMENT_CHARS: usize = 200;

/// Client-visible length bound. Blank content is left to the engine so that
/// authentication and lookup failures are reported first.
pub fn check_comment_length(content: &str) -> AppResult<()> {
    let length = content.chars().count();
    if length > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment content is limited to {} characters, got {}",
            MAX_COMMENT_CHARS, length
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub post_id: PostId,
    pub content: String,
}

impl CreateCommentInput {
    pub fn validate(&self) -> AppResult<()> {
        check_comment_length(&self.content)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditCommentInput {
    pub content: String,
}

impl EditCommentInput {
    pub fn validate(&self) -> AppResult<()> {
        check_comment_length(&self.content)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub start_index: Option<u64>,
    pub limit: Option<u32>,
    pub author_id: Option<UserId>,
}

impl PageParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.start_index.unwrap_or(0), self.limit)
    }
}

// Comment handlers

pub async fn create_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(input): ApiJson<CreateCommentInput>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    input.validate()?;
    let comment = state
        .engagement
        .create(&vc, input.post_id, &input.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub async fn edit_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<CommentId>,
    ApiJson(input): ApiJson<EditCommentInput>,
) -> AppResult<Json<CommentView>> {
    input.validate()?;
    let comment = state.engagement.edit(&vc, id, &input.content).await?;
    Ok(Json(comment.into()))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<CommentId>,
) -> AppResult<StatusCode> {
    state.engagement.delete(&vc, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_like_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<CommentId>,
) -> AppResult<Json<CommentView>> {
    let comment = state.engagement.toggle_like(&vc, id).await?;
    Ok(Json(comment.into()))
}

pub async fn get_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<CommentId>,
) -> AppResult<Json<CommentView>> {
    let comment = state.engagement.get(&vc, id).await?;
    Ok(Json(comment.into()))
}

pub async fn list_comments_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<Json<Page<CommentView>>> {
    let page = state
        .listing
        .list_comments(&vc, params.author_id, params.page_request())
        .await?;
    Ok(Json(page.map(CommentView::from)))
}

// Post handlers

pub async fn list_post_comments_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(post_id): ApiPath<PostId>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<Json<Page<CommentView>>> {
    let page = state
        .listing
        .list_post_comments(&vc, post_id, params.page_request())
        .await?;
    Ok(Json(page.map(CommentView::from)))
}

pub async fn purge_orphans_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(post_id): ApiPath<PostId>,
) -> AppResult<Json<Value>> {
    let removed = state.engagement.purge_orphans(&vc, post_id).await?;
    Ok(Json(json!({ "postId": post_id, "commentsRemoved": removed })))
}

pub async fn list_posts_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<Json<Page<EntPost>>> {
    let page = state
        .listing
        .list_posts(&vc, params.author_id, params.page_request())
        .await?;
    Ok(Json(page))
}

pub async fn get_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<PostId>,
) -> AppResult<Json<EntPost>> {
    Ok(Json(state.posts.get(&vc, id).await?))
}

pub async fn delete_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<PostId>,
) -> AppResult<Json<PostDeletion>> {
    Ok(Json(state.posts.delete(&vc, id).await?))
}

// Admin handlers

pub async fn list_users_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<Json<Page<EntUser>>> {
    let page = state
        .listing
        .list_users(&vc, params.author_id, params.page_request())
        .await?;
    Ok(Json(page))
}

pub async fn dashboard_handler(
    State(state): State<AppState>,
    vc: Vc,
) -> AppResult<Json<DashboardOverview>> {
    Ok(Json(state.statistics.overview(&vc).await?))
}

pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.store.health_check().await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub fn create_blog_router(state: AppState) -> Router {
    let api = Router::new()
        // Engagement
        .route("/comments", post(create_comment_handler).get(list_comments_handler))
        .route(
            "/comments/{id}",
            get(get_comment_handler)
                .put(edit_comment_handler)
                .delete(delete_comment_handler),
        )
        .route("/comments/{id}/like", put(toggle_like_handler))
        // Posts
        .route("/posts", get(list_posts_handler))
        .route("/posts/{id}", get(get_post_handler).delete(delete_post_handler))
        .route(
            "/posts/{id}/comments",
            get(list_post_comments_handler).delete(purge_orphans_handler),
        )
        // Admin
        .route("/users", get(list_users_handler))
        .route("/dashboard", get(dashboard_handler));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(viewer_context_middleware))
        .with_state(state)
}
