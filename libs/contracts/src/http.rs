//! HTTP boundary shared by platform services.
//!
//! Exposes `GET /health` and `POST /events/{domain}` on top of any
//! [`ServiceContract`], and maps contract failures to JSON error bodies of
//! the form `{"error": {"type": "...", "message": "..."}}`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::debug;
use unison_events::{EventEnvelope, SchemaValidationError};

use crate::{dispatch_event, ContractError, HealthResponse, ServiceContract};

/// Shared handle to the service behind the routes.
pub type SharedService = Arc<dyn ServiceContract>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

/// A contract failure on its way to an HTTP client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error_type(&self) -> &'static str {
        self.body.error.kind
    }
}

impl From<ContractError> for ApiError {
    fn from(err: ContractError) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            body: ErrorBody {
                error: ErrorDetail {
                    kind: err.error_type(),
                    message: err.to_string(),
                    field: err.field().map(str::to_string),
                },
            },
        }
    }
}

impl From<SchemaValidationError> for ApiError {
    fn from(err: SchemaValidationError) -> Self {
        ContractError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Response to an accepted event.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Always `"accepted"`.
    pub status: String,
    pub event_id: String,
    pub reply: Option<EventEnvelope>,
}

/// Create the shared routes.
pub fn routes(service: SharedService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events/{domain}", post(ingest_event))
        .with_state(service)
}

/// Serving statuses answer 200, everything else 503.
async fn health(State(service): State<SharedService>) -> (StatusCode, Json<HealthResponse>) {
    let health = service.health().await;
    let status = if health.status.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

/// Accepts one serialized envelope for the domain named in the path.
async fn ingest_event(
    State(service): State<SharedService>,
    Path(domain): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let value: serde_json::Value =
        serde_json::from_slice(&body).map_err(SchemaValidationError::from)?;
    let envelope = EventEnvelope::from_value(value)?;

    if envelope.event_type().domain() != domain {
        return Err(ContractError::validation(
            "event_type",
            format!(
                "event type '{}' does not belong to domain '{}'",
                envelope.event_type(),
                domain
            ),
        )
        .into());
    }

    let event_id = envelope.event_id().to_string();
    debug!(event_id = %event_id, domain = %domain, "event received");
    let reply = dispatch_event(service.as_ref(), envelope).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            status: "accepted".to_string(),
            event_id,
            reply,
        }),
    ))
}
