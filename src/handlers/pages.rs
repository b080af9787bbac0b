use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{
    error::{AppError, Result},
    middleware_layer::guard::{DASHBOARD_PATH, LOGIN_PATH},
    models::session::Session,
    services::{
        access::{authorize, Capability},
        dashboard::{self, DashboardStats},
    },
    state::AppState,
};

#[derive(Serialize)]
struct StatsResponse {
    success: bool,
    stats: DashboardStats,
}

pub const LOGIN_PAGE: &str = "login.html";
pub const DASHBOARD_PAGE: &str = "dashboard.html";

async fn serve_page(state: &AppState, page: &str, request: Request<Body>) -> Result<Response> {
    let path = state.config.public_dir.join(page);
    let Ok(response) = ServeFile::new(&path).oneshot(request).await;

    if response.status() == StatusCode::NOT_FOUND {
        tracing::error!("❌ Shell page missing: {}", path.display());
        return Err(AppError::NotFound);
    }
    Ok(response.map(Body::new).into_response())
}

/// `/` has no page of its own.
pub async fn root() -> Redirect {
    Redirect::temporary(LOGIN_PATH)
}

pub async fn login_page(State(state): State<AppState>, request: Request<Body>) -> Result<Response> {
    serve_page(&state, LOGIN_PAGE, request).await
}

/// Serves the dashboard shell for `/dashboard` and its sections, after
/// checking the section's capability.
pub async fn dashboard_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    request: Request<Body>,
) -> Result<Response> {
    let section = request
        .uri()
        .path()
        .strip_prefix(DASHBOARD_PATH)
        .unwrap_or_default()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();

    let capability = Capability::for_section(section).ok_or(AppError::NotFound)?;
    authorize(&session, capability)?;

    serve_page(&state, DASHBOARD_PAGE, request).await
}

/// Headline counts for the dashboard.
#[axum::debug_handler]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    authorize(&session, Capability::Dashboard)?;

    let stats = dashboard::stats(&state).await?;
    Ok((StatusCode::OK, Json(StatsResponse { success: true, stats })).into_response())
}
