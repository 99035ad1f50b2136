// Loads sample users, posts, comments and likes into the configured database
// Records are back-dated over the last 60 days so the dashboard has both cohorts

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use blog_engagement::{
    app_state::AppState,
    config::Config,
    core::{PostId, UserId},
    entities::{EntPost, EntUser},
    error::AppResult,
    infrastructure::{Clock, ManualClock, SqliteStore, ViewerContext},
};

const USERS: i64 = 12;
const POSTS_PER_USER: i64 = 2;
const COMMENTS_PER_POST: i64 = 4;
const DAYS_BACK: i64 = 60;

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!("Seeding sample data into {}", config.database.url);

    let store = Arc::new(
        SqliteStore::connect(&config.database.url, config.database.max_connections).await?,
    );
    let now = Utc::now();
    let clock = Arc::new(ManualClock::new(now - Duration::days(DAYS_BACK)));
    let state = AppState::with_store(store.clone(), clock.clone(), &config.engagement)?;

    // Spread creation times evenly from DAYS_BACK ago until now
    let total_steps = USERS * (1 + POSTS_PER_USER * (1 + COMMENTS_PER_POST));
    let step = Duration::days(DAYS_BACK) / total_steps as i32;

    let mut users = Vec::new();
    for i in 0..USERS {
        clock.advance(step);
        let user = EntUser::new(
            UserId(state.ids.next_id()),
            format!("user{:02}", i),
            i == 0,
            clock.now(),
        );
        state.store.insert_user(&user).await?;
        users.push(user);
    }
    info!("Created {} users ({} is admin)", users.len(), users[0].username);

    let mut comments = 0;
    let mut likes = 0;
    for (u, author) in users.iter().enumerate() {
        for p in 0..POSTS_PER_USER {
            clock.advance(step);
            let post = EntPost::new(
                PostId(state.ids.next_id()),
                author.id,
                format!("{}'s post #{}", author.username, p + 1),
                clock.now(),
            );
            state.store.insert_post(&post).await?;

            for c in 0..COMMENTS_PER_POST {
                clock.advance(step);
                let commenter = &users[(u + 1 + c as usize) % users.len()];
                let vc = ViewerContext::authenticated_user(commenter.id, "seed".to_string());
                let comment = state
                    .engagement
                    .create(&vc, post.id, &format!("Comment {} on {}", c + 1, post.title))
                    .await?;
                comments += 1;

                // A varying handful of likes per comment
                for liker in users.iter().skip(c as usize).take((u + c as usize) % 4) {
                    let vc = ViewerContext::authenticated_user(liker.id, "seed".to_string());
                    state.engagement.toggle_like(&vc, comment.id).await?;
                    likes += 1;
                }
            }
        }
    }

    info!(
        "Seeded {} users, {} posts, {} comments, {} likes",
        users.len(),
        users.len() as i64 * POSTS_PER_USER,
        comments,
        likes
    );
    Ok(())
}
