//! Source database queries.

use chrono::{DateTime, Utc};

use crate::db::models::{Source, SourceStatus, UpdateSourceRequest};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

type SourceRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    serde_json::Value,
    String,
    Option<i32>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn row_to_source(row: SourceRow) -> AppResult<Source> {
    let (
        id,
        name,
        slug,
        kind,
        geom_type,
        uri,
        settings,
        status,
        refresh_interval_minutes,
        last_refresh_at,
        created_at,
        updated_at,
    ) = row;

    Ok(Source {
        id,
        name,
        slug,
        kind: kind
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt source row {}: {}", id, e)))?,
        geom_type: geom_type
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt source row {}: {}", id, e)))?,
        uri,
        settings,
        status: status
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt source row {}: {}", id, e)))?,
        refresh_interval_minutes,
        last_refresh_at,
        created_at,
        updated_at,
    })
}

/// Get a source by ID.
pub async fn get_source(pool: &DbPool, id: i64) -> AppResult<Option<Source>> {
    let row: Option<SourceRow> = sqlx::query_as(
        r#"
        SELECT id, name, slug, kind, geom_type, uri, settings, status,
               refresh_interval_minutes, last_refresh_at, created_at, updated_at
        FROM geosync.source
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_source).transpose()
}

/// Get a source by slug.
pub async fn get_source_by_slug(pool: &DbPool, slug: &str) -> AppResult<Option<Source>> {
    let row: Option<SourceRow> = sqlx::query_as(
        r#"
        SELECT id, name, slug, kind, geom_type, uri, settings, status,
               refresh_interval_minutes, last_refresh_at, created_at, updated_at
        FROM geosync.source
        WHERE slug = $1
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_source).transpose()
}

/// List sources with optional status and kind filters.
pub async fn list_sources(
    pool: &DbPool,
    status: Option<&str>,
    kind: Option<&str>,
) -> AppResult<Vec<Source>> {
    let rows: Vec<SourceRow> = sqlx::query_as(
        r#"
        SELECT id, name, slug, kind, geom_type, uri, settings, status,
               refresh_interval_minutes, last_refresh_at, created_at, updated_at
        FROM geosync.source
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::TEXT IS NULL OR kind = $2)
        ORDER BY slug
        "#,
    )
    .bind(status)
    .bind(kind)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_source).collect()
}

/// Insert a new source.
#[allow(clippy::too_many_arguments)]
pub async fn insert_source(
    pool: &DbPool,
    name: &str,
    slug: &str,
    kind: &str,
    geom_type: &str,
    uri: &str,
    settings: &serde_json::Value,
    refresh_interval_minutes: Option<i32>,
) -> AppResult<i64> {
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO geosync.source (name, slug, kind, geom_type, uri, settings, refresh_interval_minutes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(kind)
    .bind(geom_type)
    .bind(uri)
    .bind(settings)
    .bind(refresh_interval_minutes)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

/// Update a source. Omitted request fields are left unchanged.
pub async fn update_source(
    pool: &DbPool,
    id: i64,
    request: &UpdateSourceRequest,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE geosync.source SET
            name = COALESCE($1, name),
            uri = COALESCE($2, uri),
            settings = COALESCE($3, settings),
            refresh_interval_minutes = COALESCE($4, refresh_interval_minutes),
            updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(&request.name)
    .bind(&request.uri)
    .bind(&request.settings)
    .bind(request.refresh_interval_minutes)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a source and its refresh jobs.
pub async fn delete_source(pool: &DbPool, id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM geosync.source WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Take the sync gate for a source.
///
/// Without `force` this is a compare-and-set: the row only flips to RUNNING
/// if no refresh already holds it, so two concurrent resyncs cannot both
/// win. Returns whether this caller took the gate.
pub async fn mark_running(pool: &DbPool, id: i64, force: bool) -> AppResult<bool> {
    let result = if force {
        sqlx::query(
            "UPDATE geosync.source SET status = 'RUNNING', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?
    } else {
        sqlx::query(
            r#"
            UPDATE geosync.source
            SET status = 'RUNNING', updated_at = NOW()
            WHERE id = $1 AND status <> 'RUNNING'
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?
    };

    Ok(result.rows_affected() > 0)
}

/// Set a source's sync status.
pub async fn update_status(pool: &DbPool, id: i64, status: SourceStatus) -> AppResult<bool> {
    let result =
        sqlx::query("UPDATE geosync.source SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// List sources due for a periodic refresh.
pub async fn list_due_sources(pool: &DbPool) -> AppResult<Vec<Source>> {
    let rows: Vec<SourceRow> = sqlx::query_as(
        r#"
        SELECT id, name, slug, kind, geom_type, uri, settings, status,
               refresh_interval_minutes, last_refresh_at, created_at, updated_at
        FROM geosync.source
        WHERE refresh_interval_minutes IS NOT NULL
          AND status <> 'RUNNING'
          AND (last_refresh_at IS NULL
               OR last_refresh_at < NOW() - INTERVAL '1 minute' * refresh_interval_minutes)
        ORDER BY slug
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_source).collect()
}

/// Whether a database error is a unique constraint violation.
pub fn is_unique_violation(err: &AppError) -> bool {
    if let AppError::Database(sqlx::Error::Database(db_err)) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_source_rejects_unknown_status() {
        let row: SourceRow = (
            1,
            "Towns".to_string(),
            "towns".to_string(),
            "geojson".to_string(),
            "point".to_string(),
            "/tmp/towns.json".to_string(),
            serde_json::json!({}),
            "PAUSED".to_string(),
            None,
            None,
            Utc::now(),
            Utc::now(),
        );
        assert!(matches!(row_to_source(row), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_row_to_source_parses_enums() {
        let row: SourceRow = (
            1,
            "Towns".to_string(),
            "towns".to_string(),
            "geojson".to_string(),
            "point".to_string(),
            "/tmp/towns.json".to_string(),
            serde_json::json!({}),
            "IDLE".to_string(),
            Some(60),
            None,
            Utc::now(),
            Utc::now(),
        );
        let source = row_to_source(row).unwrap();
        assert_eq!(source.status, SourceStatus::Idle);
        assert_eq!(source.refresh_interval_minutes, Some(60));
    }
}
