// # agdns-webhook
//
// HTTP surface of the provider, spoken by the external-dns webhook source.
//
// ## Route Structure
//
// ```text
// /
// ├── GET       /                      - negotiation, returns the domain filter
// ├── GET       /records               - current endpoints
// ├── POST      /records               - apply a change-set
// ├── GET|POST  /adjustendpoints       - endpoints in, endpoints out
// ├── GET|POST  /propertyvaluesequals  - compare provider-specific values
// └── GET       /healthz               - liveness
// ```
//
// Every JSON response uses the webhook media type and sets
// `Vary: Content-Type`. The router holds no state besides the shared
// reconciler; each request reads the rule list afresh.

mod handlers;

use agdns_core::Reconciler;
use axum::{Router, routing::get};
use std::sync::Arc;

pub use handlers::{PropertyValuesEqualsRequest, PropertyValuesEqualsResponse, WebhookError};

/// Media type of every webhook JSON payload
pub const MEDIA_TYPE: &str = "application/external.dns.webhook+json;version=1";

/// Build the webhook router
///
/// # Example
///
/// ```rust,no_run
/// use agdns_core::{DomainFilter, ManagedBy, MemoryRuleStore, Reconciler};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let reconciler = Reconciler::new(
///         Box::new(MemoryRuleStore::new()),
///         ManagedBy::default(),
///         DomainFilter::allow_all(),
///     );
///
///     let app = agdns_webhook::router(Arc::new(reconciler));
///     let listener = tokio::net::TcpListener::bind("127.0.0.1:8888").await?;
///     axum::serve(listener, app).await
/// }
/// ```
pub fn router(reconciler: Arc<Reconciler>) -> Router {
    Router::new()
        .route("/", get(handlers::negotiate))
        .route(
            "/records",
            get(handlers::records).post(handlers::apply_changes),
        )
        .route(
            "/adjustendpoints",
            get(handlers::adjust_endpoints).post(handlers::adjust_endpoints),
        )
        .route(
            "/propertyvaluesequals",
            get(handlers::property_values_equal).post(handlers::property_values_equal),
        )
        .route("/healthz", get(handlers::healthz))
        .with_state(reconciler)
}
