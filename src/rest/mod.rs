// rest/mod.rs — Public REST API server.
//
// Axum HTTP server, local only by default.
//
// Endpoints:
//   GET    /api/v1/health
//   POST   /api/v1/auth/register
//   POST   /api/v1/auth/token
//   GET    /api/v1/users/me
//   PATCH  /api/v1/users/me
//   DELETE /api/v1/users/me
//   GET    /api/v1/tasks          POST /api/v1/tasks
//   GET    /api/v1/tasks/{id}     PATCH /api/v1/tasks/{id}   DELETE /api/v1/tasks/{id}
//   POST   /api/v1/sessions       GET  /api/v1/sessions
//   GET    /api/v1/sessions/stats
//   POST   /api/v1/sessions/{id}/complete
//   POST   /api/v1/sessions/{id}/cancel
//   GET    /api/v1/streaks
//   GET    /api/v1/achievements
//   GET    /api/v1/achievements/unlocked

pub mod auth;
pub mod routes;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config.allowed_origins);

    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(routes::health::health))
        // Auth
        .route("/api/v1/auth/register", post(routes::auth::register))
        .route("/api/v1/auth/token", post(routes::auth::rotate_token))
        // Users
        .route(
            "/api/v1/users/me",
            get(routes::users::get_me)
                .patch(routes::users::update_me)
                .delete(routes::users::delete_me),
        )
        // Tasks
        .route(
            "/api/v1/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/api/v1/tasks/{id}", get(routes::tasks::get_task))
        .route("/api/v1/tasks/{id}", patch(routes::tasks::update_task))
        .route("/api/v1/tasks/{id}", delete(routes::tasks::delete_task))
        // Focus sessions
        .route(
            "/api/v1/sessions",
            get(routes::sessions::list_sessions).post(routes::sessions::start_session),
        )
        .route("/api/v1/sessions/stats", get(routes::sessions::stats))
        .route(
            "/api/v1/sessions/{id}/complete",
            post(routes::sessions::complete_session),
        )
        .route(
            "/api/v1/sessions/{id}/cancel",
            post(routes::sessions::cancel_session),
        )
        // Streaks
        .route("/api/v1/streaks", get(routes::streaks::get_streak))
        // Achievements
        .route(
            "/api/v1/achievements",
            get(routes::achievements::list_achievements),
        )
        .route(
            "/api/v1/achievements/unlocked",
            get(routes::achievements::list_unlocked),
        )
        .layer(cors)
        .with_state(ctx)
}

/// CORS layer from the configured origin list. `"*"` (the default) allows
/// any origin; unparseable entries are dropped with a warning.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "invalid allowed_origins entry — skipping");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
