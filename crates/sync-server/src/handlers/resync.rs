//! Resynchronization API handlers.
//!
//! A held source (status RUNNING) refuses non-forced resyncs with
//! `405 Method Not Allowed`; `force` bypasses the gate, `sync` runs the
//! refresh inside the request instead of queueing it.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::{ResyncAllReceipt, ResyncReceipt, ResyncService};

/// Resync options. Both default to false.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResyncRequest {
    /// Run the refresh inside this request instead of queueing it.
    #[serde(default)]
    pub sync: bool,

    /// Dispatch even when a job is still running on the source.
    #[serde(default)]
    pub force: bool,
}

/// Resync one source.
///
/// POST /api/sources/{source}/resync
///
/// # Returns
///
/// - `200 OK` with the job receipt
/// - `404 Not Found` for an unknown id or slug
/// - `405 Method Not Allowed` when a job is still running and `force` is false
pub async fn resync(
    State(service): State<ResyncService>,
    Path(reference): Path<String>,
    Json(request): Json<ResyncRequest>,
) -> Result<Json<ResyncReceipt>, AppError> {
    let receipt = service
        .resync_by_ref(&reference, request.sync, request.force)
        .await?;

    Ok(Json(receipt))
}

/// Resync every source.
///
/// POST /api/sources/resync-all
///
/// Fails as a whole, dispatching nothing, when any source is held and
/// `force` is false.
pub async fn resync_all(
    State(service): State<ResyncService>,
    Json(request): Json<ResyncRequest>,
) -> Result<Json<ResyncAllReceipt>, AppError> {
    let receipt = service.resync_all(request.sync, request.force).await?;
    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: ResyncRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.sync);
        assert!(!request.force);
    }

    #[test]
    fn test_request_deserialization() {
        let request: ResyncRequest =
            serde_json::from_str(r#"{"sync": true, "force": true}"#).unwrap();
        assert!(request.sync);
        assert!(request.force);
    }
}
