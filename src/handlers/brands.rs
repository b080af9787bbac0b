use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Result,
    handlers::auth::MessageResponse,
    models::{brand::Brand, session::Session},
    services::{
        access::{authorize, Capability},
        brands as brand_service,
    },
    state::AppState,
};

/// The request payload for creating a brand.
#[derive(Deserialize, Validate)]
pub struct CreateBrandRequest {
    #[serde(default)]
    #[garde(length(min = 1, max = 500))]
    pub name: String,
    #[garde(skip)]
    pub slug: Option<String>,
}

/// The request payload for updating a brand.
#[derive(Deserialize)]
pub struct UpdateBrandRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Serialize)]
struct BrandResponse {
    success: bool,
    brand: Brand,
}

#[derive(Serialize)]
struct BrandsResponse {
    success: bool,
    brands: Vec<Brand>,
}

#[axum::debug_handler]
pub async fn list_brands(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    authorize(&session, Capability::Brands)?;

    let brands = brand_service::list_brands(&state).await?;
    Ok((StatusCode::OK, Json(BrandsResponse { success: true, brands })).into_response())
}

#[axum::debug_handler]
pub async fn create_brand(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateBrandRequest>,
) -> Result<Response> {
    authorize(&session, Capability::Brands)?;
    req.validate()?;

    let brand = brand_service::create_brand(&state, req.name, req.slug).await?;
    Ok((StatusCode::CREATED, Json(BrandResponse { success: true, brand })).into_response())
}

#[axum::debug_handler]
pub async fn update_brand(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(brand_id): Path<Uuid>,
    Json(req): Json<UpdateBrandRequest>,
) -> Result<Response> {
    authorize(&session, Capability::Brands)?;

    let brand = brand_service::update_brand(&state, brand_id, req.name, req.slug).await?;
    Ok((StatusCode::OK, Json(BrandResponse { success: true, brand })).into_response())
}

/// Deletes a brand and, through the foreign key, its certificates.
#[axum::debug_handler]
pub async fn delete_brand(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(brand_id): Path<Uuid>,
) -> Result<Response> {
    authorize(&session, Capability::Brands)?;

    brand_service::delete_brand(&state, brand_id).await?;
    let response = MessageResponse {
        success: true,
        message: "Brand deleted successfully".to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}
