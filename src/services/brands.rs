use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::brand::Brand,
    repositories::{brand as brand_repo, certificate as certificate_repo},
    state::AppState,
    validation::catalog::{resolve_slug, validate_brand_slug, validate_display_name},
};

/// Creates a brand. The slug is derived from the name when not given.
pub async fn create_brand(state: &AppState, name: String, slug: Option<String>) -> Result<Brand> {
    validate_display_name("Brand name", &name)?;
    let name = name.trim().to_string();
    let slug = resolve_slug(slug.as_deref(), &name)?;
    validate_brand_slug(&slug)?;

    let brand = brand_repo::create_brand(&state.db, &name, &slug).await?;
    tracing::info!("✅ Brand created: {} ({})", brand.id, brand.slug);
    Ok(brand)
}

pub async fn list_brands(state: &AppState) -> Result<Vec<Brand>> {
    brand_repo::list_brands(&state.db).await
}

/// Renames a brand and/or changes its slug.
///
/// Renaming alone keeps the slug so printed QR codes stay valid. A slug
/// change rewrites the verification URLs of the brand's certificates.
pub async fn update_brand(
    state: &AppState,
    brand_id: Uuid,
    name: Option<String>,
    slug: Option<String>,
) -> Result<Brand> {
    if let Some(ref name) = name {
        validate_display_name("Brand name", name)?;
    }
    if let Some(ref slug) = slug {
        validate_brand_slug(slug)?;
    }

    let before = brand_repo::find_by_id(&state.db, &brand_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let name = name.map(|n| n.trim().to_string());

    let mut client = state.db.get().await?;
    let transaction = client.transaction().await?;

    let brand = brand_repo::update_brand(&*transaction, &brand_id, name.as_deref(), slug.as_deref())
        .await?
        .ok_or(AppError::NotFound)?;

    if brand.slug != before.slug {
        let rewritten = certificate_repo::rewrite_certificate_urls(
            &*transaction,
            &brand.id,
            &state.config.app_url,
            &brand.slug,
        )
        .await?;
        tracing::info!("🔗 Rewrote {} verification URLs for brand {}", rewritten, brand.id);
    }

    transaction.commit().await?;

    tracing::info!("✅ Brand updated: {}", brand.id);
    Ok(brand)
}

/// Deletes a brand together with its certificates.
pub async fn delete_brand(state: &AppState, brand_id: Uuid) -> Result<()> {
    if !brand_repo::delete_brand(&state.db, &brand_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!("✅ Brand deleted: {}", brand_id);
    Ok(())
}
