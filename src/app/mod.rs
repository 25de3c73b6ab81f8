use std::{io, net::SocketAddr};

use anyhow::Context;
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method, Request},
    Router,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Settings;

use self::rate_limit::RateLimiters;

pub mod error;
pub mod extractor;
mod health;
pub mod rate_limit;
pub mod subscription;

#[derive(Clone)]
pub struct AppState {
    db: PgPool,
}

fn app_router(limiters: &RateLimiters) -> Router<AppState> {
    health::router(limiters.general.clone())
        .merge(subscription::router(limiters.subscription.clone()))
}

pub struct App {
    listener: TcpListener,
    addr: SocketAddr,
    limiters: RateLimiters,
    cors: CorsLayer,
    timeout: TimeoutLayer,
}

impl App {
    /// Binds the listener and prepares the middleware stack.
    pub async fn build(config: &Settings) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(format!(
            "{}:{}",
            config.application.host, config.application.port
        ))
        .await
        .context("Failed to bind the application address.")?;
        let addr = listener.local_addr()?;

        Ok(Self {
            listener,
            addr,
            limiters: RateLimiters::new(&config.rate_limit),
            cors: cors_layer(&config.application.allowed_origins)?,
            timeout: TimeoutLayer::new(config.application.request_timeout()),
        })
    }

    pub fn host(&self) -> std::net::IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn serve(self, db: PgPool) -> Result<(), io::Error> {
        self.limiters.spawn_purge_task();

        let app = app_router(&self.limiters)
            .with_state(AppState { db })
            .layer(self.timeout)
            .layer(self.cors)
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                    let id = uuid::Uuid::new_v4();
                    tracing::info_span!(
                        "request",
                        method = ?request.method(),
                        uri = ?request.uri(),
                        %id,
                    )
                }),
            );

        tracing::info!(addr = %self.addr, "listening");
        // connect info feeds the rate limiter and client ip resolution
        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin `{origin}`."))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true))
}
