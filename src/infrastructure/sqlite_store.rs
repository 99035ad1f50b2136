use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::core::strong_types::{from_millis, to_millis, to_millis_ceil};
use crate::core::{CommentId, EntityKind, PostId, Timestamp, UserId};
use crate::entities::{EntComment, EntPost, EntUser};
use crate::error::{AppError, AppResult};
use crate::infrastructure::record_store::{
    LikeToggle, RecordFilter, RecordQuery, RecordStore, SortKey,
};

const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, created_at, updated_at";
const POST_COLUMNS: &str = "id, author_id, title, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, is_admin, created_at";

/// SQLite implementation of the record store.
///
/// `liked_by` lives in `comment_likes` keyed by `(comment_id, user_id)`, so set
/// uniqueness is enforced by the primary key and concurrent likes from
/// different users touch different rows.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid database URL {}: {}", database_url, e))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // Each connection to an in-memory database is its own database
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(8))
            .connect_with(options)
            .await
            .map_err(|e| AppError::Store(format!("Failed to connect to {}: {}", database_url, e)))?;

        let store = Self { pool };
        store.initialize().await?;
        debug!("SQLite record store ready at {}", database_url);
        Ok(store)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create tables and indexes if they are missing
    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                author_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY,
                post_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comment_likes (
                comment_id INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL,
                PRIMARY KEY (comment_id, user_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at DESC, id DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_updated ON posts(updated_at DESC, id DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id, updated_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_comments_updated ON comments(updated_at DESC, id DESC)",
            "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_comments_author ON comments(author_id, updated_at DESC)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Store(format!("Failed to initialize schema: {}", e)))?;
        }
        Ok(())
    }

    async fn load_likes(
        conn: &mut SqliteConnection,
        ids: &[i64],
    ) -> AppResult<HashMap<i64, BTreeSet<UserId>>> {
        let mut likes: HashMap<i64, BTreeSet<UserId>> = HashMap::new();
        if ids.is_empty() {
            return Ok(likes);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT comment_id, user_id FROM comment_likes WHERE comment_id IN (",
        );
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let rows = qb
            .build()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::Store(format!("Failed to load comment likes: {}", e)))?;

        for row in rows {
            likes
                .entry(row.get::<i64, _>("comment_id"))
                .or_default()
                .insert(UserId(row.get::<i64, _>("user_id")));
        }
        Ok(likes)
    }

    async fn fetch_comment(
        conn: &mut SqliteConnection,
        id: CommentId,
    ) -> AppResult<Option<EntComment>> {
        let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
            .bind(id.value())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::Store(format!("Failed to get comment {}: {}", id, e)))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut likes = Self::load_likes(conn, &[id.value()]).await?;
        let liked_by = likes.remove(&id.value()).unwrap_or_default();
        comment_from_row(&row, liked_by).map(Some)
    }
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow, liked_by: BTreeSet<UserId>) -> AppResult<EntComment> {
    Ok(EntComment {
        id: CommentId(row.get("id")),
        post_id: PostId(row.get("post_id")),
        author_id: UserId(row.get("author_id")),
        content: row.get("content"),
        liked_by,
        created_at: from_millis(row.get("created_at"))?,
        updated_at: from_millis(row.get("updated_at"))?,
    })
}

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<EntPost> {
    Ok(EntPost {
        id: PostId(row.get("id")),
        author_id: UserId(row.get("author_id")),
        title: row.get("title"),
        created_at: from_millis(row.get("created_at"))?,
        updated_at: from_millis(row.get("updated_at"))?,
    })
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<EntUser> {
    Ok(EntUser {
        id: UserId(row.get("id")),
        username: row.get("username"),
        is_admin: row.get("is_admin"),
        created_at: from_millis(row.get("created_at"))?,
    })
}

fn table_name(kind: EntityKind) -> AppResult<&'static str> {
    match kind {
        EntityKind::Comment => Ok("comments"),
        EntityKind::Post => Ok("posts"),
        EntityKind::User => Ok("users"),
        EntityKind::Dashboard => Err(AppError::Validation(
            "dashboard is not a stored collection".to_string(),
        )),
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, kind: EntityKind, filter: &RecordFilter) {
    if let Some(author_id) = filter.author_id {
        let column = match kind {
            EntityKind::User => "id",
            _ => "author_id",
        };
        qb.push(format!(" AND {} = ", column));
        qb.push_bind(author_id.value());
    }
    if let Some(post_id) = filter.post_id {
        let column = match kind {
            EntityKind::Post => "id",
            _ => "post_id",
        };
        qb.push(format!(" AND {} = ", column));
        qb.push_bind(post_id.value());
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND created_at >= ");
        qb.push_bind(to_millis_ceil(from));
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND created_at <= ");
        qb.push_bind(to_millis(to));
    }
}

fn push_order_and_page(qb: &mut QueryBuilder<'_, Sqlite>, kind: EntityKind, query: &RecordQuery) {
    let column = match (kind, query.sort) {
        (EntityKind::User, _) | (_, SortKey::CreatedDesc) => "created_at",
        (_, SortKey::UpdatedDesc) => "updated_at",
    };
    qb.push(format!(" ORDER BY {} DESC, id DESC", column));

    // SQLite requires LIMIT before OFFSET; -1 means unbounded
    qb.push(" LIMIT ");
    qb.push_bind(query.limit.map_or(-1, i64::from));
    qb.push(" OFFSET ");
    qb.push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_comment(&self, comment: &EntComment) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(comment.id.value())
        .bind(comment.post_id.value())
        .bind(comment.author_id.value())
        .bind(&comment.content)
        .bind(to_millis(comment.created_at))
        .bind(to_millis(comment.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Store(format!("Failed to insert comment {}: {}", comment.id, e)))?;

        for user_id in &comment.liked_by {
            sqlx::query("INSERT INTO comment_likes (comment_id, user_id) VALUES (?, ?)")
                .bind(comment.id.value())
                .bind(user_id.value())
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Store(format!("Failed to insert comment like: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Store(format!("Failed to commit transaction: {}", e)))
    }

    async fn get_comment(&self, id: CommentId) -> AppResult<Option<EntComment>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::Store(format!("Failed to acquire connection: {}", e)))?;
        Self::fetch_comment(&mut conn, id).await
    }

    async fn update_comment_content(
        &self,
        id: CommentId,
        content: &str,
        updated_at: Timestamp,
    ) -> AppResult<Option<EntComment>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

        let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(to_millis(updated_at))
            .bind(id.value())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Store(format!("Failed to update comment {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let comment = Self::fetch_comment(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::Store(format!("Failed to commit transaction: {}", e)))?;
        Ok(comment)
    }

    async fn toggle_comment_like(
        &self,
        id: CommentId,
        user_id: UserId,
        updated_at: Timestamp,
    ) -> AppResult<Option<LikeToggle>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

        // Write first so the transaction takes the write lock before it reads
        let touched = sqlx::query("UPDATE comments SET updated_at = ? WHERE id = ?")
            .bind(to_millis(updated_at))
            .bind(id.value())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Store(format!("Failed to touch comment {}: {}", id, e)))?;

        if touched.rows_affected() == 0 {
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND user_id = ?")
            .bind(id.value())
            .bind(user_id.value())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Store(format!("Failed to remove like: {}", e)))?;

        let liked = removed.rows_affected() == 0;
        if liked {
            sqlx::query("INSERT INTO comment_likes (comment_id, user_id) VALUES (?, ?)")
                .bind(id.value())
                .bind(user_id.value())
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Store(format!("Failed to add like: {}", e)))?;
        }

        let comment = Self::fetch_comment(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::Store(format!("Failed to commit transaction: {}", e)))?;

        Ok(comment.map(|comment| LikeToggle { comment, liked }))
    }

    async fn delete_comment(&self, id: CommentId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Failed to delete comment {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comments_for_post(&self, post_id: PostId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(post_id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::Store(format!("Failed to delete comments of post {}: {}", post_id, e))
            })?;
        Ok(result.rows_affected())
    }

    async fn query_comments(&self, query: &RecordQuery) -> AppResult<Vec<EntComment>> {
        query.filter.check_applies_to(EntityKind::Comment)?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM comments WHERE 1 = 1",
            COMMENT_COLUMNS
        ));
        push_filter(&mut qb, EntityKind::Comment, &query.filter);
        push_order_and_page(&mut qb, EntityKind::Comment, query);

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::Store(format!("Failed to acquire connection: {}", e)))?;

        let rows = qb
            .build()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::Store(format!("Failed to query comments: {}", e)))?;

        let ids: Vec<i64> = rows.iter().map(|row| row.get::<i64, _>("id")).collect();
        let mut likes = Self::load_likes(&mut conn, &ids).await?;

        rows.iter()
            .map(|row| {
                let liked_by = likes.remove(&row.get::<i64, _>("id")).unwrap_or_default();
                comment_from_row(row, liked_by)
            })
            .collect()
    }

    async fn insert_post(&self, post: &EntPost) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO posts (id, author_id, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post.id.value())
        .bind(post.author_id.value())
        .bind(&post.title)
        .bind(to_millis(post.created_at))
        .bind(to_millis(post.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Store(format!("Failed to insert post {}: {}", post.id, e)))?;
        Ok(())
    }

    async fn get_post(&self, id: PostId) -> AppResult<Option<EntPost>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Failed to get post {}: {}", id, e)))?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn delete_post(&self, id: PostId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Failed to delete post {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_posts(&self, query: &RecordQuery) -> AppResult<Vec<EntPost>> {
        query.filter.check_applies_to(EntityKind::Post)?;

        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM posts WHERE 1 = 1", POST_COLUMNS));
        push_filter(&mut qb, EntityKind::Post, &query.filter);
        push_order_and_page(&mut qb, EntityKind::Post, query);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Failed to query posts: {}", e)))?;
        rows.iter().map(post_from_row).collect()
    }

    async fn insert_user(&self, user: &EntUser) -> AppResult<()> {
        sqlx::query("INSERT INTO users (id, username, is_admin, created_at) VALUES (?, ?, ?, ?)")
            .bind(user.id.value())
            .bind(&user.username)
            .bind(user.is_admin)
            .bind(to_millis(user.created_at))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Failed to insert user {}: {}", user.id, e)))?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<EntUser>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Failed to get user {}: {}", id, e)))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn query_users(&self, query: &RecordQuery) -> AppResult<Vec<EntUser>> {
        query.filter.check_applies_to(EntityKind::User)?;

        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users WHERE 1 = 1", USER_COLUMNS));
        push_filter(&mut qb, EntityKind::User, &query.filter);
        push_order_and_page(&mut qb, EntityKind::User, query);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Failed to query users: {}", e)))?;
        rows.iter().map(user_from_row).collect()
    }

    async fn count(&self, kind: EntityKind, filter: &RecordFilter) -> AppResult<u64> {
        filter.check_applies_to(kind)?;
        let table = table_name(kind)?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT COUNT(*) AS count FROM {} WHERE 1 = 1",
            table
        ));
        push_filter(&mut qb, kind, filter);

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Failed to count {}: {}", table, e)))?;
        Ok(row.get::<i64, _>("count").max(0) as u64)
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Store(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}
