//! Health check handler for service monitoring

use crate::metadata::MetadataStatus;
use crate::state::GateState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

/// Health check handler
///
/// Reports `503` until provider metadata is available, since no
/// authentication can complete before then.
pub async fn health_handler(
    State(state): State<GateState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let metadata = state.metadata.status();
    let status = if metadata == MetadataStatus::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if status.is_success() { "healthy" } else { "degraded" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "metadata": metadata,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
