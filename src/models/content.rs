// src/models/content.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use validator::Validate;

use crate::catalog::CatalogEntry;

/// The three content collections teachers publish into.
/// Structurally identical; stored in one table behind a discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Notes,
    Pyqs,
    Lectures,
}

impl ContentKind {
    /// Database value of the discriminator column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Notes => "notes",
            ContentKind::Pyqs => "pyqs",
            ContentKind::Lectures => "lectures",
        }
    }
}

/// Represents the 'content_records' table in the database.
/// A teacher-uploaded learning asset with subject/class metadata; the
/// referenced file or video itself lives in the external object store.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,

    /// Collection discriminator: 'notes', 'pyqs' or 'lectures'.
    pub kind: String,

    pub title: String,

    pub description: Option<String>,

    pub subject: String,

    /// Class this asset targets (e.g. "7"). Kept as text; the portal
    /// treats it as an opaque label.
    pub class_level: String,

    /// URL of the uploaded file or the video link.
    pub resource_url: String,

    pub uploaded_at: chrono::DateTime<chrono::Utc>,

    /// Id of the uploading teacher, who owns the record.
    pub uploaded_by: i64,
}

impl CatalogEntry for ContentRecord {
    fn title(&self) -> &str {
        &self.title
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn class_level(&self) -> &str {
        &self.class_level
    }
}

/// DTO for a teacher publishing a new content record.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, max = 20))]
    pub class_level: String,
    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub resource_url: String,
}

/// DTO for editing a content record. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateContentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub class_level: Option<String>,
    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub resource_url: Option<String>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
