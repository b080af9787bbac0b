use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    handlers::auth::MessageResponse,
    models::{certificate::Certificate, session::Session},
    services::{
        access::{authorize, Capability},
        certificates::{self as certificate_service, CreateCertificate, UpdateCertificate, UploadedDocument},
    },
    state::AppState,
};

/// How long a client may take to deliver one multipart field.
const UPLOAD_TIMEOUT: u64 = 60;

/// The request payload for updating certificate metadata.
#[derive(Deserialize)]
pub struct UpdateCertificateRequest {
    pub product_name: Option<String>,
    pub product_slug: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Serialize)]
struct CertificateResponse {
    success: bool,
    certificate: Certificate,
}

#[derive(Serialize)]
struct CertificatesResponse {
    success: bool,
    certificates: Vec<Certificate>,
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reads the certificate form: `brand_id`, `product_name`, optional
/// `product_slug`, and a `file` upload or a `file_url`.
async fn read_certificate_form(mut multipart: Multipart, max_bytes: usize) -> Result<CreateCertificate> {
    let mut brand_id: Option<String> = None;
    let mut product_name: Option<String> = None;
    let mut product_slug: Option<String> = None;
    let mut file_url: Option<String> = None;
    let mut document: Option<UploadedDocument> = None;

    let timeout_duration = Duration::from_secs(UPLOAD_TIMEOUT);

    loop {
        match timeout(timeout_duration, multipart.next_field()).await {
            Ok(Ok(Some(field))) => {
                let field_name = field.name().unwrap_or("").to_string();
                match field_name.as_str() {
                    "brand_id" => brand_id = non_empty(field.text().await?),
                    "product_name" => product_name = non_empty(field.text().await?),
                    "product_slug" => product_slug = non_empty(field.text().await?),
                    "file_url" => file_url = non_empty(field.text().await?),
                    "file" => {
                        let file_name = field.file_name().unwrap_or("certificate").to_string();
                        let declared_mime = field.content_type().map(str::to_string);
                        let bytes = field.bytes().await?;
                        if bytes.len() > max_bytes {
                            return Err(AppError::Validation(format!(
                                "Document exceeds the {} byte limit",
                                max_bytes
                            )));
                        }
                        if !bytes.is_empty() {
                            document = Some(UploadedDocument {
                                bytes: bytes.to_vec(),
                                file_name,
                                declared_mime,
                            });
                        }
                    }
                    other => tracing::debug!("Ignoring multipart field {:?}", other),
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => return Err(AppError::from(e)),
            Err(_) => return Err(AppError::Multipart("Upload timeout exceeded".into())),
        }
    }

    let brand_id = brand_id.ok_or_else(|| AppError::Validation("Missing brand_id".into()))?;
    let brand_id = Uuid::parse_str(&brand_id)
        .map_err(|_| AppError::Validation("Invalid brand_id".into()))?;
    let product_name =
        product_name.ok_or_else(|| AppError::Validation("Missing product_name".into()))?;

    Ok(CreateCertificate {
        brand_id,
        product_name,
        product_slug,
        file_url,
        document,
    })
}

#[axum::debug_handler]
pub async fn list_certificates(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    authorize(&session, Capability::Certificates)?;

    let certificates = certificate_service::list_certificates(&state).await?;
    Ok((StatusCode::OK, Json(CertificatesResponse { success: true, certificates })).into_response())
}

/// Creates a certificate from a multipart form.
#[axum::debug_handler]
pub async fn create_certificate(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Result<Response> {
    authorize(&session, Capability::Certificates)?;

    let input = read_certificate_form(multipart, state.config.max_document_bytes).await?;
    tracing::info!(
        "📤 Certificate upload by {} (document: {})",
        session.user_id,
        input.document.as_ref().map_or(0, |d| d.bytes.len())
    );

    let certificate = certificate_service::create_certificate(&state, input).await?;
    Ok((StatusCode::CREATED, Json(CertificateResponse { success: true, certificate })).into_response())
}

#[axum::debug_handler]
pub async fn update_certificate(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(certificate_id): Path<Uuid>,
    Json(req): Json<UpdateCertificateRequest>,
) -> Result<Response> {
    authorize(&session, Capability::Certificates)?;

    let certificate = certificate_service::update_certificate(
        &state,
        certificate_id,
        UpdateCertificate {
            product_name: req.product_name,
            product_slug: req.product_slug,
            file_url: req.file_url,
        },
    )
    .await?;
    Ok((StatusCode::OK, Json(CertificateResponse { success: true, certificate })).into_response())
}

#[axum::debug_handler]
pub async fn delete_certificate(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(certificate_id): Path<Uuid>,
) -> Result<Response> {
    authorize(&session, Capability::Certificates)?;

    certificate_service::delete_certificate(&state, certificate_id).await?;
    let response = MessageResponse {
        success: true,
        message: "Certificate deleted successfully".to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}
