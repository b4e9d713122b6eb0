//! Rate limiting middleware using governor and `tower_governor`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor that prefers proxy headers over the peer address.
///
/// Requests with no usable address share the loopback bucket.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        // Cloudflare's real client IP
        if let Some(ip) = headers
            .get("cf-connecting-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // First IP in the X-Forwarded-For chain
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            return Ok(addr.ip());
        }

        Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Replenish interval and burst size for `per_minute` requests per minute.
fn quota(per_minute: u32) -> (u64, u32) {
    let per_minute = per_minute.max(1);
    let replenish_ms = (60_000 / u64::from(per_minute)).max(1);
    let burst = (per_minute / 6).max(1);
    (replenish_ms, burst)
}

/// Create the API rate limiter: `per_minute` requests per minute per client,
/// with a burst of ten seconds' worth of requests.
///
/// Returns `None` if governor rejects the derived configuration.
#[must_use]
pub fn api_rate_limiter(per_minute: u32) -> Option<RateLimiterLayer> {
    let (replenish_ms, burst) = quota(per_minute);
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_millisecond(replenish_ms)
        .burst_size(burst)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}
