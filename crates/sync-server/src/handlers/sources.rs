//! Source management API handlers.
//!
//! Registration, listing, detail, update and deletion of geodata sources.
//! Detail routes accept either a numeric id or a slug.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::db::models::{CreateSourceRequest, SourceResponse, UpdateSourceRequest};
use crate::error::AppError;
use crate::services::SourceService;

/// Query parameters for listing sources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSourcesQuery {
    pub status: Option<String>,
    pub kind: Option<String>,
}

/// Register a new source.
///
/// POST /api/sources
pub async fn create(
    State(service): State<SourceService>,
    Json(request): Json<CreateSourceRequest>,
) -> Result<Json<SourceResponse>, AppError> {
    let source = service.create(&request).await?;
    Ok(Json(source.into()))
}

/// List sources.
///
/// GET /api/sources
pub async fn list(
    State(service): State<SourceService>,
    Query(query): Query<ListSourcesQuery>,
) -> Result<Json<Vec<SourceResponse>>, AppError> {
    let sources = service
        .list(query.status.as_deref(), query.kind.as_deref())
        .await?;

    Ok(Json(sources.into_iter().map(SourceResponse::from).collect()))
}

/// Get source details.
///
/// GET /api/sources/{source}
pub async fn get(
    State(service): State<SourceService>,
    Path(reference): Path<String>,
) -> Result<Json<SourceResponse>, AppError> {
    let source = service.resolve(&reference).await?;
    Ok(Json(source.into()))
}

/// Update a source.
///
/// PATCH /api/sources/{source}
pub async fn update(
    State(service): State<SourceService>,
    Path(reference): Path<String>,
    Json(request): Json<UpdateSourceRequest>,
) -> Result<Json<SourceResponse>, AppError> {
    let source = service.resolve(&reference).await?;
    let updated = service.update(source.id, &request).await?;
    Ok(Json(updated.into()))
}

/// Delete a source and its job history.
///
/// DELETE /api/sources/{source}
pub async fn delete(
    State(service): State<SourceService>,
    Path(reference): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let source = service.resolve(&reference).await?;
    service.delete(source.id).await?;

    Ok(Json(serde_json::json!({
        "status": "deleted",
        "source_id": source.id.to_string(),
        "slug": source.slug,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_default() {
        let query = ListSourcesQuery::default();
        assert!(query.status.is_none());
        assert!(query.kind.is_none());
    }

    #[test]
    fn test_list_query_deserialization() {
        let query: ListSourcesQuery =
            serde_json::from_str(r#"{"status": "RUNNING", "kind": "geojson"}"#).unwrap();
        assert_eq!(query.status.as_deref(), Some("RUNNING"));
        assert_eq!(query.kind.as_deref(), Some("geojson"));
    }
}
