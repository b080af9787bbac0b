use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{
    error::Result,
    models::certificate::Certificate,
    services::{
        certificates::{self as certificate_service, DocumentSource},
        documents::is_allowed_mime,
    },
    state::AppState,
};

#[derive(Serialize)]
struct VerifyResponse {
    success: bool,
    certificate: Certificate,
}

/// Certificate metadata behind a verification URL.
#[axum::debug_handler]
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path((brand_slug, product_slug)): Path<(String, String)>,
) -> Result<Response> {
    tracing::debug!("🔎 Verify {}/{}", brand_slug, product_slug);
    let certificate = certificate_service::verify(&state, &brand_slug, &product_slug).await?;
    Ok((StatusCode::OK, Json(VerifyResponse { success: true, certificate })).into_response())
}

/// The document behind a verification URL, which is where QR codes land.
#[axum::debug_handler]
pub async fn certificate_document(
    State(state): State<AppState>,
    Path((brand_slug, product_slug)): Path<(String, String)>,
) -> Result<Response> {
    let source = certificate_service::document(&state, &brand_slug, &product_slug).await?;
    Ok(document_response(source))
}

fn document_response(source: DocumentSource) -> Response {
    match source {
        DocumentSource::Inline {
            mime_type,
            file_name,
            bytes,
        } => {
            // Anything outside the upload allowlist is downloaded, never rendered.
            let (content_type, disposition_kind) = if is_allowed_mime(&mime_type) {
                let value = HeaderValue::from_str(&mime_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
                (value, "inline")
            } else {
                tracing::warn!("⚠️ Serving stored {} document as an attachment", mime_type);
                (HeaderValue::from_static("application/octet-stream"), "attachment")
            };
            let disposition = file_name
                .and_then(|name| {
                    HeaderValue::from_str(&format!("{}; filename=\"{}\"", disposition_kind, name)).ok()
                })
                .unwrap_or_else(|| HeaderValue::from_static(disposition_kind));

            let mut response = (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
                ],
                bytes,
            )
                .into_response();
            if disposition_kind == "attachment" {
                response.headers_mut().insert(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static("sandbox"),
                );
            }
            response
        }
        DocumentSource::External(url) => match HeaderValue::from_str(&url) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(_) => {
                tracing::error!("❌ Stored file_url is not a valid header value");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
    }
}
