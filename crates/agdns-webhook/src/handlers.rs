//! Webhook request handlers
//!
//! Bodies are taken as raw bytes and decoded here so that malformed JSON
//! maps to 400 regardless of the request's `Content-Type`.

use agdns_core::{Changes, Endpoint, Reconciler};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::MEDIA_TYPE;

type SharedReconciler = Arc<Reconciler>;

/// Body of `/propertyvaluesequals`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValuesEqualsRequest {
    pub name: String,
    pub previous: String,
    pub current: String,
}

/// Answer of `/propertyvaluesequals`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValuesEqualsResponse {
    pub equals: bool,
}

/// Handler failure
#[derive(Debug)]
pub enum WebhookError {
    /// The request body could not be decoded (400)
    BadRequest(String),

    /// The reconciler or rule store failed (500)
    Internal(agdns_core::Error),
}

impl From<agdns_core::Error> for WebhookError {
    fn from(err: agdns_core::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => {
                tracing::warn!(error = %msg, "rejected webhook request");
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "webhook request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

/// JSON body carrying the webhook media type
pub(crate) struct WebhookJson<T>(pub T);

impl<T: Serialize> IntoResponse for WebhookJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => (
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE)),
                    (header::VARY, HeaderValue::from_static("Content-Type")),
                ],
                body,
            )
                .into_response(),
            Err(e) => WebhookError::Internal(e.into()).into_response(),
        }
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, WebhookError> {
    serde_json::from_slice(body)
        .map_err(|e| WebhookError::BadRequest(format!("invalid request body: {e}")))
}

/// `GET /`
pub(crate) async fn negotiate(State(reconciler): State<SharedReconciler>) -> impl IntoResponse {
    WebhookJson(reconciler.domain_filter().clone())
}

/// `GET /records`
pub(crate) async fn records(
    State(reconciler): State<SharedReconciler>,
) -> Result<WebhookJson<Vec<Endpoint>>, WebhookError> {
    let endpoints = reconciler.records().await?;
    tracing::debug!(count = endpoints.len(), "returning records");
    Ok(WebhookJson(endpoints))
}

/// `POST /records`
pub(crate) async fn apply_changes(
    State(reconciler): State<SharedReconciler>,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    let changes: Changes = decode(&body)?;
    reconciler.apply_changes(&changes).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET|POST /adjustendpoints`
pub(crate) async fn adjust_endpoints(
    State(reconciler): State<SharedReconciler>,
    body: Bytes,
) -> Result<WebhookJson<Vec<Endpoint>>, WebhookError> {
    let endpoints: Vec<Endpoint> = decode(&body)?;
    Ok(WebhookJson(reconciler.adjust_endpoints(endpoints)))
}

/// `GET|POST /propertyvaluesequals`
pub(crate) async fn property_values_equal(
    State(reconciler): State<SharedReconciler>,
    body: Bytes,
) -> Result<WebhookJson<PropertyValuesEqualsResponse>, WebhookError> {
    let request: PropertyValuesEqualsRequest = decode(&body)?;
    let equals = reconciler.property_values_equal(&request.name, &request.previous, &request.current);
    Ok(WebhookJson(PropertyValuesEqualsResponse { equals }))
}

/// `GET /healthz`
pub(crate) async fn healthz() -> &'static str {
    "ok"
}
