use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::models::brand::BrandSummary;

/// A per-product authenticity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    /// The unique identifier for the certificate.
    pub id: Uuid,
    /// The owning brand.
    pub brand_id: Uuid,
    /// The product's display name.
    pub product_name: String,
    /// The product identifier, unique within the brand.
    pub product_slug: String,
    /// The public verification URL encoded in QR codes.
    pub certificate_url: String,
    /// An externally hosted document, if any.
    pub file_url: Option<String>,
    /// The document encoded as a `data:` URL, if uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    /// The MIME type of the uploaded document.
    pub file_mime_type: Option<String>,
    /// The original filename of the uploaded document.
    pub file_name: Option<String>,
    /// BLAKE3 checksum of the uploaded document bytes.
    pub file_checksum: Option<String>,
    /// The timestamp when the certificate was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the certificate was last updated.
    pub updated_at: DateTime<Utc>,
    /// The owning brand, when the query joined it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<BrandSummary>,
}

impl Certificate {
    /// Maps a row from `certificates` joined with `brands` (aliased `brand_*`).
    pub fn from_joined_row(row: &Row) -> Self {
        let mut certificate = Self::from(row);
        certificate.brand = Some(BrandSummary {
            id: row.get("brand_id"),
            name: row.get("brand_name"),
            slug: row.get("brand_slug"),
        });
        certificate
    }

    /// Drops the inline document so listings stay small.
    pub fn without_document(mut self) -> Self {
        self.file_data = None;
        self
    }
}

impl From<&Row> for Certificate {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            brand_id: row.get("brand_id"),
            product_name: row.get("product_name"),
            product_slug: row.get("product_slug"),
            certificate_url: row.get("certificate_url"),
            file_url: row.get("file_url"),
            file_data: row.get("file_data"),
            file_mime_type: row.get("file_mime_type"),
            file_name: row.get("file_name"),
            file_checksum: row.get("file_checksum"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            brand: None,
        }
    }
}

/// Uploaded document contents, already encoded for storage.
#[derive(Debug, Clone)]
pub struct EncodedDocument {
    pub data_url: String,
    pub mime_type: String,
    pub file_name: String,
    pub checksum: String,
}

/// Input for a new certificate.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub brand_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub certificate_url: String,
    pub file_url: Option<String>,
    pub document: Option<EncodedDocument>,
}

/// Metadata changes to an existing certificate.
#[derive(Debug, Clone, Default)]
pub struct CertificateChanges {
    pub product_name: Option<String>,
    pub product_slug: Option<String>,
    pub file_url: Option<String>,
    pub certificate_url: Option<String>,
}
