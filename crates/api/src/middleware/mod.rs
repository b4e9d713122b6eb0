//! HTTP middleware stack for the marketplace API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (storefront and admin origins)
//! 5. Rate limiting (governor)

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{RateLimiterLayer, api_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
