//! Database API handlers.
//!
//! Endpoints for applying and validating the geosync schema.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::db::DbPool;
use crate::error::AppError;

/// Schema DDL, applied by the init endpoint.
const SCHEMA_SQL: &str = include_str!("../../schema.sql");

/// Tables the schema must provide.
const REQUIRED_TABLES: [&str; 2] = ["source", "refresh_job"];

/// Response for database schema operations.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaOperationResponse {
    /// Operation status.
    pub status: String,

    /// Operation message.
    pub message: String,

    /// Whether the schema is valid (for validate endpoint).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,

    /// List of found tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,

    /// List of missing tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

/// Initialize the database schema.
///
/// POST /api/db/init
///
/// Applies the embedded DDL. Every statement is idempotent, so re-running
/// against an existing schema is safe.
pub async fn init_database(
    State(db): State<DbPool>,
) -> Result<Json<SchemaOperationResponse>, AppError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(&db).await?;

    tracing::info!("Database schema applied");

    Ok(Json(SchemaOperationResponse {
        status: "ok".to_string(),
        message: "Schema 'geosync' applied".to_string(),
        valid: Some(true),
        tables: None,
        missing: None,
    }))
}

/// Validate the database schema.
///
/// GET /api/db/validate
///
/// Checks that the required tables exist in the geosync schema.
pub async fn validate_database(
    State(db): State<DbPool>,
) -> Result<Json<SchemaOperationResponse>, AppError> {
    let existing_tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables WHERE table_schema = 'geosync'",
    )
    .fetch_all(&db)
    .await?;

    let missing: Vec<String> = REQUIRED_TABLES
        .iter()
        .filter(|t| !existing_tables.contains(&t.to_string()))
        .map(|s| s.to_string())
        .collect();

    let valid = missing.is_empty();

    Ok(Json(SchemaOperationResponse {
        status: "ok".to_string(),
        message: if valid {
            "Database schema is valid".to_string()
        } else {
            format!("Missing tables: {}", missing.join(", "))
        },
        valid: Some(valid),
        tables: Some(existing_tables),
        missing: Some(missing),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_ddl_embedded() {
        assert!(SCHEMA_SQL.contains("CREATE SCHEMA IF NOT EXISTS geosync"));
        for table in REQUIRED_TABLES {
            assert!(SCHEMA_SQL.contains(table));
        }
    }

    #[test]
    fn test_schema_response_serialization() {
        let response = SchemaOperationResponse {
            status: "ok".to_string(),
            message: "Schema valid".to_string(),
            valid: Some(true),
            tables: Some(vec!["source".to_string()]),
            missing: Some(vec![]),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"valid\":true"));
    }
}
