use deadpool_postgres::Pool;
use tokio_postgres::GenericClient;
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError, Result},
    models::certificate::{Certificate, CertificateChanges, NewCertificate},
};

const CERTIFICATE_COLUMNS: &str = "c.id, c.brand_id, c.product_name, c.product_slug, \
     c.certificate_url, c.file_url, c.file_data, c.file_mime_type, c.file_name, \
     c.file_checksum, c.created_at, c.updated_at";

const BRAND_JOIN: &str = "b.name AS brand_name, b.slug AS brand_slug \
     FROM certificates c JOIN brands b ON b.id = c.brand_id";

fn slug_taken(e: tokio_postgres::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Validation("Product slug already exists for this brand".to_string())
    } else {
        AppError::from(e)
    }
}

/// Inserts a certificate. The brand must already exist.
pub async fn create_certificate(pool: &Pool, new: &NewCertificate) -> Result<Certificate> {
    let client = pool.get().await?;
    let document = new.document.as_ref();
    let data_url = document.map(|d| d.data_url.as_str());
    let mime_type = document.map(|d| d.mime_type.as_str());
    let file_name = document.map(|d| d.file_name.as_str());
    let checksum = document.map(|d| d.checksum.as_str());

    let row = client
        .query_one(
            r#"
            INSERT INTO certificates (
                brand_id, product_name, product_slug, certificate_url, file_url,
                file_data, file_mime_type, file_name, file_checksum
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, brand_id, product_name, product_slug, certificate_url, file_url,
                      file_data, file_mime_type, file_name, file_checksum, created_at, updated_at
            "#,
            &[
                &new.brand_id,
                &new.product_name,
                &new.product_slug,
                &new.certificate_url,
                &new.file_url,
                &data_url,
                &mime_type,
                &file_name,
                &checksum,
            ],
        )
        .await
        .map_err(slug_taken)?;

    Ok(Certificate::from(&row))
}

/// Lists certificates with their brand, newest first. Inline documents are
/// left out.
pub async fn list_certificates(pool: &Pool) -> Result<Vec<Certificate>> {
    let client = pool.get().await?;
    let query = format!(
        "SELECT {CERTIFICATE_COLUMNS}, {BRAND_JOIN} ORDER BY c.created_at DESC"
    );
    let rows = client.query(query.as_str(), &[]).await?;
    Ok(rows
        .iter()
        .map(|r| Certificate::from_joined_row(r).without_document())
        .collect())
}

/// Finds a certificate by its ID.
pub async fn find_by_id(pool: &Pool, certificate_id: &Uuid) -> Result<Option<Certificate>> {
    let client = pool.get().await?;
    let query = format!("SELECT {CERTIFICATE_COLUMNS}, {BRAND_JOIN} WHERE c.id = $1");
    let row = client.query_opt(query.as_str(), &[certificate_id]).await?;
    Ok(row.as_ref().map(Certificate::from_joined_row))
}

/// Public lookup by brand slug and product slug.
pub async fn get_certificate_by_slugs(
    pool: &Pool,
    brand_slug: &str,
    product_slug: &str,
) -> Result<Option<Certificate>> {
    let client = pool.get().await?;
    let query = format!(
        "SELECT {CERTIFICATE_COLUMNS}, {BRAND_JOIN} WHERE b.slug = $1 AND c.product_slug = $2"
    );
    let row = client
        .query_opt(query.as_str(), &[&brand_slug, &product_slug])
        .await?;
    Ok(row.as_ref().map(Certificate::from_joined_row))
}

/// Applies metadata changes.
pub async fn update_certificate(
    pool: &Pool,
    certificate_id: &Uuid,
    changes: &CertificateChanges,
) -> Result<Option<Certificate>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE certificates
            SET
                product_name = COALESCE($2, product_name),
                product_slug = COALESCE($3, product_slug),
                file_url = COALESCE($4, file_url),
                certificate_url = COALESCE($5, certificate_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, brand_id, product_name, product_slug, certificate_url, file_url,
                      file_data, file_mime_type, file_name, file_checksum, created_at, updated_at
            "#,
            &[
                certificate_id,
                &changes.product_name,
                &changes.product_slug,
                &changes.file_url,
                &changes.certificate_url,
            ],
        )
        .await
        .map_err(slug_taken)?;
    Ok(row.as_ref().map(|r| Certificate::from(r).without_document()))
}

/// Deletes a certificate. Returns `false` when no row matched.
pub async fn delete_certificate(pool: &Pool, certificate_id: &Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let deleted = client
        .execute("DELETE FROM certificates WHERE id = $1", &[certificate_id])
        .await?;
    Ok(deleted > 0)
}

/// Counts certificates, and those carrying a document of either kind.
pub async fn count_certificates(pool: &Pool) -> Result<(i64, i64)> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE file_data IS NOT NULL OR file_url IS NOT NULL)
            FROM certificates
            "#,
            &[],
        )
        .await?;
    Ok((row.get(0), row.get(1)))
}

/// Rebuilds the verification URLs of a brand's certificates after its slug
/// changed. Runs inside the transaction that changed the slug.
pub async fn rewrite_certificate_urls<C: GenericClient>(
    client: &C,
    brand_id: &Uuid,
    app_url: &str,
    brand_slug: &str,
) -> Result<u64> {
    let prefix = format!("{}/{}/", app_url.trim_end_matches('/'), brand_slug);
    let updated = client
        .execute(
            r#"
            UPDATE certificates
            SET certificate_url = $2 || product_slug, updated_at = NOW()
            WHERE brand_id = $1
            "#,
            &[brand_id, &prefix],
        )
        .await?;
    Ok(updated)
}
