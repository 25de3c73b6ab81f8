use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use super::{
    rate_limit::{self, FixedWindowLimiter},
    AppState,
};

pub mod route;
pub mod schema;

pub fn router(limiter: Arc<FixedWindowLimiter>) -> Router<AppState> {
    Router::new()
        .route("/api/subscribers", post(route::subscribe))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::enforce))
}
