// Blog engagement server

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use blog_engagement::{app_state::AppState, blog_interface::create_blog_router, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("blog_engagement=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    let app: Router = create_blog_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server_address();
    info!("Blog engagement server starting on http://{}", addr);
    info!("  POST   /api/v1/comments                 - Create comment");
    info!("  PUT    /api/v1/comments/{{id}}            - Edit comment");
    info!("  DELETE /api/v1/comments/{{id}}            - Delete comment");
    info!("  PUT    /api/v1/comments/{{id}}/like       - Toggle like");
    info!("  GET    /api/v1/posts/{{id}}/comments      - Comments of a post");
    info!("  GET    /api/v1/dashboard                - Admin overview");

    let listener = TcpListener::bind(addr.as_str()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
