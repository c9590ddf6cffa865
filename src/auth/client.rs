use crate::state::AppState;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Where a request came from, recorded on new sessions.
///
/// The socket peer address is used unless `TRUST_PROXY` is on. Behind a
/// trusted proxy the first `X-Forwarded-For` entry wins, then `X-Real-IP`,
/// then the peer address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let proxied = if trust_proxy {
            header_str("x-forwarded-for")
                .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
                .filter(|ip| !ip.is_empty())
                .or_else(|| header_str("x-real-ip"))
        } else {
            None
        };

        Self {
            ip_address: proxied.or_else(|| peer.map(|addr| addr.ip().to_string())),
            user_agent: header_str(header::USER_AGENT.as_str()),
        }
    }
}

impl FromRequestParts<AppState> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, peer, state.config.trust_proxy))
    }
}
