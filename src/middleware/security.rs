//! Security headers added to every response.

use crate::config::Config;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use url::Url;

/// Header set applied in every environment.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-dns-prefetch-control", "on"),
    ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
];

pub const HSTS: &str = "max-age=63072000; includeSubDomains; preload";

/// Wrap `router` with the security headers. HSTS is only sent in
/// production, where the app is expected to sit behind TLS.
pub fn with_security_headers<S>(router: Router<S>, config: &Config) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = router;
    for &(name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    if config.environment.is_production() {
        router = router.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS),
        ));
    }

    router
}

/// Origins allowed to call the API with credentials: the application and,
/// when hosted apart, the auth base URL.
pub fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for raw in [&config.app_url, &config.auth_url] {
        let origin = match Url::parse(raw) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => continue,
        };
        match HeaderValue::from_str(&origin) {
            Ok(value) if !origins.contains(&value) => origins.push(value),
            Ok(_) => {}
            Err(_) => tracing::warn!(origin = %origin, "not a valid origin header, skipped"),
        }
    }
    origins
}

/// CORS limited to the application's own origins, with credentials.
pub fn cors_layer(config: &Config) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .allow_origin(AllowOrigin::list(allowed_origins(config)))
}
