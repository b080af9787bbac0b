use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::certificate::{Certificate, CertificateChanges, NewCertificate},
    repositories::{brand as brand_repo, certificate as certificate_repo},
    services::documents,
    state::AppState,
    validation::catalog::{
        certificate_url, resolve_slug, validate_display_name, validate_file_url, validate_slug,
    },
};

/// A document attached to a new certificate.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub declared_mime: Option<String>,
}

/// Input for a new certificate.
#[derive(Debug, Clone)]
pub struct CreateCertificate {
    pub brand_id: Uuid,
    pub product_name: String,
    pub product_slug: Option<String>,
    pub file_url: Option<String>,
    pub document: Option<UploadedDocument>,
}

/// Metadata edits for an existing certificate.
#[derive(Debug, Clone, Default)]
pub struct UpdateCertificate {
    pub product_name: Option<String>,
    pub product_slug: Option<String>,
    pub file_url: Option<String>,
}

/// What the public document route serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Inline {
        mime_type: String,
        file_name: Option<String>,
        bytes: Vec<u8>,
    },
    External(String),
}

fn check_document_size(len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(AppError::Validation(format!(
            "Document exceeds the {} byte limit",
            max
        )));
    }
    Ok(())
}

/// Creates a certificate under an existing brand.
pub async fn create_certificate(state: &AppState, input: CreateCertificate) -> Result<Certificate> {
    validate_display_name("Product name", &input.product_name)?;
    let product_name = input.product_name.trim().to_string();
    let product_slug = resolve_slug(input.product_slug.as_deref(), &product_name)?;

    let file_url = input
        .file_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    if let Some(ref url) = file_url {
        validate_file_url(url)?;
    }

    let brand = brand_repo::find_by_id(&state.db, &input.brand_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("❌ Certificate for unknown brand {}", input.brand_id);
            AppError::NotFound
        })?;

    let document = match input.document {
        Some(upload) => {
            check_document_size(upload.bytes.len(), state.config.max_document_bytes)?;
            Some(documents::encode(
                &upload.bytes,
                &upload.file_name,
                upload.declared_mime.as_deref(),
            )?)
        }
        None => None,
    };

    let new = NewCertificate {
        brand_id: brand.id,
        certificate_url: certificate_url(&state.config.app_url, &brand.slug, &product_slug),
        product_name,
        product_slug,
        file_url,
        document,
    };

    let certificate = certificate_repo::create_certificate(&state.db, &new).await?;
    tracing::info!(
        "✅ Certificate created: {} ({}/{})",
        certificate.id,
        brand.slug,
        certificate.product_slug
    );
    Ok(certificate.without_document())
}

pub async fn list_certificates(state: &AppState) -> Result<Vec<Certificate>> {
    certificate_repo::list_certificates(&state.db).await
}

/// Updates metadata. A new product slug also moves the verification URL.
pub async fn update_certificate(
    state: &AppState,
    certificate_id: Uuid,
    input: UpdateCertificate,
) -> Result<Certificate> {
    if let Some(ref name) = input.product_name {
        validate_display_name("Product name", name)?;
    }
    if let Some(ref slug) = input.product_slug {
        validate_slug(slug)?;
    }
    if let Some(ref url) = input.file_url {
        validate_file_url(url)?;
    }

    let existing = certificate_repo::find_by_id(&state.db, &certificate_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let certificate_url = match (&input.product_slug, &existing.brand) {
        (Some(slug), Some(brand)) if *slug != existing.product_slug => {
            Some(certificate_url(&state.config.app_url, &brand.slug, slug))
        }
        _ => None,
    };

    let changes = CertificateChanges {
        product_name: input.product_name.map(|n| n.trim().to_string()),
        product_slug: input.product_slug,
        file_url: input.file_url,
        certificate_url,
    };

    let certificate = certificate_repo::update_certificate(&state.db, &certificate_id, &changes)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!("✅ Certificate updated: {}", certificate.id);
    Ok(certificate)
}

pub async fn delete_certificate(state: &AppState, certificate_id: Uuid) -> Result<()> {
    if !certificate_repo::delete_certificate(&state.db, &certificate_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!("✅ Certificate deleted: {}", certificate_id);
    Ok(())
}

/// Public lookup for the verification page.
pub async fn verify(state: &AppState, brand_slug: &str, product_slug: &str) -> Result<Certificate> {
    let certificate = certificate_repo::get_certificate_by_slugs(&state.db, brand_slug, product_slug)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(certificate.without_document())
}

/// Resolves the document behind a verification URL.
pub async fn document(state: &AppState, brand_slug: &str, product_slug: &str) -> Result<DocumentSource> {
    let certificate = certificate_repo::get_certificate_by_slugs(&state.db, brand_slug, product_slug)
        .await?
        .ok_or(AppError::NotFound)?;
    document_source(certificate)
}

/// Picks the inline document when present, else the external URL.
pub fn document_source(certificate: Certificate) -> Result<DocumentSource> {
    if let Some(ref data_url) = certificate.file_data {
        let (mime, bytes) = documents::decode_data_url(data_url).map_err(|e| {
            tracing::error!("❌ Stored document for {} is corrupt: {}", certificate.id, e);
            AppError::Internal("Stored document is corrupt".to_string())
        })?;
        return Ok(DocumentSource::Inline {
            mime_type: certificate.file_mime_type.unwrap_or(mime),
            file_name: certificate.file_name,
            bytes,
        });
    }

    certificate
        .file_url
        .map(DocumentSource::External)
        .ok_or(AppError::NotFound)
}
