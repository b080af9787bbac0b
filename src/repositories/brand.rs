use deadpool_postgres::Pool;
use tokio_postgres::GenericClient;
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError, Result},
    models::brand::Brand,
};

const BRAND_COLUMNS: &str = "id, name, slug, created_at, updated_at";

fn slug_taken(e: tokio_postgres::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Validation("Brand slug already exists".to_string())
    } else {
        AppError::from(e)
    }
}

/// Creates a new brand.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `name` - The display name.
/// * `slug` - The URL identifier, already validated.
pub async fn create_brand(pool: &Pool, name: &str, slug: &str) -> Result<Brand> {
    let client = pool.get().await?;
    let query = format!(
        "INSERT INTO brands (name, slug) VALUES ($1, $2) RETURNING {BRAND_COLUMNS}"
    );
    let row = client
        .query_one(query.as_str(), &[&name, &slug])
        .await
        .map_err(slug_taken)?;
    Ok(Brand::from(&row))
}

/// Lists all brands, newest first.
pub async fn list_brands(pool: &Pool) -> Result<Vec<Brand>> {
    let client = pool.get().await?;
    let query = format!("SELECT {BRAND_COLUMNS} FROM brands ORDER BY created_at DESC");
    let rows = client.query(query.as_str(), &[]).await?;
    Ok(rows.iter().map(Brand::from).collect())
}

/// Finds a brand by its ID.
pub async fn find_by_id(pool: &Pool, brand_id: &Uuid) -> Result<Option<Brand>> {
    let client = pool.get().await?;
    let query = format!("SELECT {BRAND_COLUMNS} FROM brands WHERE id = $1");
    let row = client.query_opt(query.as_str(), &[brand_id]).await?;
    Ok(row.as_ref().map(Brand::from))
}

/// Applies a name and/or slug change.
///
/// Takes a client rather than the pool so it can join a transaction.
pub async fn update_brand<C: GenericClient>(
    client: &C,
    brand_id: &Uuid,
    name: Option<&str>,
    slug: Option<&str>,
) -> Result<Option<Brand>> {
    let query = format!(
        r#"
        UPDATE brands
        SET
            name = COALESCE($2, name),
            slug = COALESCE($3, slug),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {BRAND_COLUMNS}
        "#
    );
    let row = client
        .query_opt(query.as_str(), &[brand_id, &name, &slug])
        .await
        .map_err(slug_taken)?;
    Ok(row.as_ref().map(Brand::from))
}

/// Deletes a brand. Its certificates go with it (`ON DELETE CASCADE`).
pub async fn delete_brand(pool: &Pool, brand_id: &Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let deleted = client
        .execute("DELETE FROM brands WHERE id = $1", &[brand_id])
        .await?;
    Ok(deleted > 0)
}

/// Counts all brands.
pub async fn count_brands(pool: &Pool) -> Result<i64> {
    let client = pool.get().await?;
    let row = client.query_one("SELECT COUNT(*) FROM brands", &[]).await?;
    Ok(row.get(0))
}
