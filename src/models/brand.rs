use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

/// A manufacturer or owner that certificates belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    /// The unique identifier for the brand.
    pub id: Uuid,
    /// The brand's display name.
    pub name: String,
    /// The URL-safe identifier used in verification links.
    pub slug: String,
    /// The timestamp when the brand was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the brand was last updated.
    pub updated_at: DateTime<Utc>,
}

impl From<&Row> for Brand {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// The brand fields embedded in certificate listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}
