//! Source management service.

use crate::db::models::{CreateSourceRequest, Source, UpdateSourceRequest};
use crate::db::queries;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Derive a URL-safe slug from a display name.
///
/// Lowercases, keeps ASCII alphanumerics and collapses everything else
/// into single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Service for managing geospatial sources.
#[derive(Clone)]
pub struct SourceService {
    db: DbPool,
}

impl SourceService {
    /// Create a new source service.
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Register a new source.
    pub async fn create(&self, request: &CreateSourceRequest) -> AppResult<Source> {
        request.validate().map_err(AppError::Validation)?;

        let slug = request
            .slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| slugify(&request.name));

        if slug.is_empty() {
            return Err(AppError::Validation(format!(
                "Could not derive a slug from name: {}",
                request.name
            )));
        }

        let settings = if request.settings.is_null() {
            serde_json::json!({})
        } else {
            request.settings.clone()
        };

        let id = match queries::source::insert_source(
            &self.db,
            &request.name,
            &slug,
            request.kind.as_str(),
            request.geom_type.as_str(),
            &request.uri,
            &settings,
            request.refresh_interval_minutes,
        )
        .await
        {
            Ok(id) => id,
            Err(e) if queries::source::is_unique_violation(&e) => {
                return Err(AppError::Conflict(format!(
                    "Source slug already exists: {}",
                    slug
                )));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(source = %slug, id, "Source registered");

        self.get(id).await
    }

    /// Get a source by id.
    pub async fn get(&self, id: i64) -> AppResult<Source> {
        queries::source::get_source(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Source not found: {}", id)))
    }

    /// Resolve an id-or-slug reference from the API surface.
    pub async fn resolve(&self, reference: &str) -> AppResult<Source> {
        if let Ok(id) = reference.parse::<i64>() {
            if let Some(source) = queries::source::get_source(&self.db, id).await? {
                return Ok(source);
            }
        }

        queries::source::get_source_by_slug(&self.db, reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Source not found: {}", reference)))
    }

    /// List sources, optionally filtered by status and kind.
    pub async fn list(&self, status: Option<&str>, kind: Option<&str>) -> AppResult<Vec<Source>> {
        queries::source::list_sources(&self.db, status, kind).await
    }

    /// Apply a partial update to a source.
    pub async fn update(&self, id: i64, request: &UpdateSourceRequest) -> AppResult<Source> {
        if let Some(name) = &request.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("'name' cannot be empty".to_string()));
            }
        }
        if let Some(uri) = &request.uri {
            if uri.trim().is_empty() {
                return Err(AppError::Validation("'uri' cannot be empty".to_string()));
            }
        }

        let updated = queries::source::update_source(&self.db, id, request).await?;

        if !updated {
            return Err(AppError::NotFound(format!("Source not found: {}", id)));
        }

        self.get(id).await
    }

    /// Delete a source and its job history.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !queries::source::delete_source(&self.db, id).await? {
            return Err(AppError::NotFound(format!("Source not found: {}", id)));
        }

        tracing::info!(id, "Source deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Towns of Provence"), "towns-of-provence");
        assert_eq!(slugify("roads"), "roads");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("A  --  B"), "a-b");
        assert_eq!(slugify("  trimmed  "), "trimmed");
    }

    #[test]
    fn test_slugify_keeps_digits() {
        assert_eq!(slugify("Zone 51 (v2)"), "zone-51-v2");
    }

    #[test]
    fn test_slugify_empty_for_symbols_only() {
        assert_eq!(slugify("***"), "");
        assert_eq!(slugify(""), "");
    }
}
