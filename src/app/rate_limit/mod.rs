use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::error::{AppError, AppResult};
use crate::config::RateLimitSettings;

pub mod limiter;

pub use limiter::{FixedWindowLimiter, RateLimitDecision};

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// The limiter policies of the service.
#[derive(Clone)]
pub struct RateLimiters {
    /// Guards `POST /api/subscribers`
    pub subscription: Arc<FixedWindowLimiter>,
    /// Guards every other route
    pub general: Arc<FixedWindowLimiter>,
}

impl RateLimiters {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            subscription: Arc::new(FixedWindowLimiter::new(
                "subscription",
                settings.subscription,
            )),
            general: Arc::new(FixedWindowLimiter::new("general", settings.general)),
        }
    }

    /// Periodically forgets closed windows. The task ends with the runtime.
    pub fn spawn_purge_task(&self) {
        let limiters = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                limiters.subscription.purge_expired().await;
                limiters.general.purge_expired().await;
            }
        });
    }
}

/// Middleware rejecting requests once the peer has used up its window.
///
/// Keys on the connection's peer address rather than `X-Forwarded-For`, which any
/// client could rotate to dodge the limit.
pub async fn enforce(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let key = peer_key(&request);

    match limiter.check(&key).await {
        RateLimitDecision::Allowed { .. } => Ok(next.run(request).await),
        RateLimitDecision::Limited { retry_after } => {
            tracing::warn!(
                ip = %key,
                path = %request.uri().path(),
                limiter = limiter.name(),
                "rate limit exceeded"
            );
            Err(AppError::RateLimited(retry_after))
        }
    }
}

fn peer_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}
