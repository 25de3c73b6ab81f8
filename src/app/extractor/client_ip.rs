use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// The address of the client that originated the request, if it can be told.
///
/// Prefers the first hop of `X-Forwarded-For` so the service can sit behind a proxy,
/// falling back to the peer address of the connection. The header is client controlled:
/// the value is only fit for auditing, never for identifying anyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self(
            resolve_client_ip(&parts.headers, peer).map(|ip| ip.to_string()),
        ))
    }
}

pub(crate) fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    forwarded_for(headers).or_else(|| peer.map(|addr| addr.ip()))
}

/// First entry of `X-Forwarded-For`, if it is an address (with or without a port).
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let first = headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim();

    first
        .parse::<IpAddr>()
        .ok()
        .or_else(|| first.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}
