use std::sync::Arc;

use axum::{
    extract::State, http::StatusCode, middleware, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Serialize;

use super::{
    rate_limit::{self, FixedWindowLimiter},
    AppState,
};

pub fn router(limiter: Arc<FixedWindowLimiter>) -> Router<AppState> {
    Router::new()
        .route("/", get(info))
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::enforce))
}

#[derive(Serialize)]
struct Info {
    message: &'static str,
    version: &'static str,
    status: &'static str,
}

async fn info() -> Json<Info> {
    Json(Info {
        message: "Mailing list API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

/// Liveness: the process is up and serving requests.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Serialize)]
struct Readiness {
    status: &'static str,
}

/// Readiness: the database answers.
#[tracing::instrument(name = "Readiness probe", skip(state))]
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (StatusCode::OK, Json(Readiness { status: "ready" })),
        Err(e) => {
            tracing::warn!(error = %e, "database is not reachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "unavailable",
                }),
            )
        }
    }
}
