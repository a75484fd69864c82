// src/handlers/content.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    catalog::{self, CatalogQuery},
    error::AppError,
    models::content::{ContentKind, ContentRecord, CreateContentRequest, UpdateContentRequest},
    utils::{html::clean_html, jwt::Claims},
};

/// Loads one collection, newest uploads first. The catalog contract: the
/// database orders, the filter narrows in memory.
async fn load_collection(pool: &PgPool, kind: ContentKind) -> Result<Vec<ContentRecord>, AppError> {
    let records = sqlx::query_as::<_, ContentRecord>(
        r#"
        SELECT id, kind, title, description, subject, class_level,
               resource_url, uploaded_at, uploaded_by
        FROM content_records
        WHERE kind = $1
        ORDER BY uploaded_at DESC
        "#,
    )
    .bind(kind.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list {} records: {:?}", kind.as_str(), e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(records)
}

/// Lists a content collection (notes, PYQs or lectures), optionally
/// narrowed by free text, subject and class.
pub async fn list_content(
    State(pool): State<PgPool>,
    Path(kind): Path<ContentKind>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = load_collection(&pool, kind).await?;
    let filtered = catalog::apply_query(&records, &query);

    Ok(Json(serde_json::json!(filtered)))
}

/// Returns the distinct subjects and classes of a collection, in first-seen
/// order. These populate the filter dropdowns.
pub async fn content_facets(
    State(pool): State<PgPool>,
    Path(kind): Path<ContentKind>,
) -> Result<impl IntoResponse, AppError> {
    let records = load_collection(&pool, kind).await?;

    Ok(Json(serde_json::json!({
        "subjects": catalog::distinct_subjects(&records),
        "classes": catalog::distinct_class_levels(&records),
    })))
}

/// Retrieves a single content record by id.
pub async fn get_content(
    State(pool): State<PgPool>,
    Path((kind, id)): Path<(ContentKind, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let record = fetch_record(&pool, kind, id).await?;
    Ok(Json(record))
}

/// Publishes a new content record. Teacher only; the uploader becomes the
/// owner. The actual file or video lives in the external object store —
/// only its URL is recorded here.
pub async fn create_content(
    State(pool): State<PgPool>,
    Path(kind): Path<ContentKind>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let description = payload.description.as_deref().map(clean_html);

    let record = sqlx::query_as::<_, ContentRecord>(
        r#"
        INSERT INTO content_records (kind, title, description, subject, class_level, resource_url, uploaded_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, kind, title, description, subject, class_level,
                  resource_url, uploaded_at, uploaded_by
        "#,
    )
    .bind(kind.as_str())
    .bind(&payload.title)
    .bind(&description)
    .bind(&payload.subject)
    .bind(&payload.class_level)
    .bind(&payload.resource_url)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create content record: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Edits a content record. Only the uploading teacher may edit; fields are
/// applied individually so a partial payload leaves the rest untouched.
pub async fn update_content(
    State(pool): State<PgPool>,
    Path((kind, id)): Path<(ContentKind, i64)>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing = fetch_record(&pool, kind, id).await?;
    if existing.uploaded_by != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the uploading teacher can edit this record".to_string(),
        ));
    }

    if let Some(title) = payload.title {
        sqlx::query("UPDATE content_records SET title = $1 WHERE id = $2")
            .bind(title)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(description) = payload.description {
        sqlx::query("UPDATE content_records SET description = $1 WHERE id = $2")
            .bind(clean_html(&description))
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(subject) = payload.subject {
        sqlx::query("UPDATE content_records SET subject = $1 WHERE id = $2")
            .bind(subject)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(class_level) = payload.class_level {
        sqlx::query("UPDATE content_records SET class_level = $1 WHERE id = $2")
            .bind(class_level)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(resource_url) = payload.resource_url {
        sqlx::query("UPDATE content_records SET resource_url = $1 WHERE id = $2")
            .bind(resource_url)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    let updated = fetch_record(&pool, kind, id).await?;
    Ok(Json(updated))
}

/// Deletes a content record. Only the uploading teacher may delete.
pub async fn delete_content(
    State(pool): State<PgPool>,
    Path((kind, id)): Path<(ContentKind, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let existing = fetch_record(&pool, kind, id).await?;
    if existing.uploaded_by != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the uploading teacher can delete this record".to_string(),
        ));
    }

    sqlx::query("DELETE FROM content_records WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete content record {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_record(pool: &PgPool, kind: ContentKind, id: i64) -> Result<ContentRecord, AppError> {
    sqlx::query_as::<_, ContentRecord>(
        r#"
        SELECT id, kind, title, description, subject, class_level,
               resource_url, uploaded_at, uploaded_by
        FROM content_records
        WHERE id = $1 AND kind = $2
        "#,
    )
    .bind(id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Content record not found".to_string()))
}
