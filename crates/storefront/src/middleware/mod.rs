//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Rate limiting (governor) on cart and checkout mutations
//!
//! The [`StorefrontScope`] extractor resolves the site and template of each
//! scoped request.

pub mod rate_limit;
pub mod request_id;
pub mod scope;
pub mod session;

pub use rate_limit::{cart_rate_limiter, checkout_rate_limiter};
pub use request_id::request_id_middleware;
pub use scope::StorefrontScope;
pub use session::create_session_layer;
