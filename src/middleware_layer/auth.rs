use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    models::session::Session,
    state::AppState,
};

/// The HttpOnly cookie carrying the session token. The only cookie the
/// server trusts.
pub const SESSION_COOKIE: &str = "admin-token";

/// Extracts the session token from the request cookies.
pub fn extract_session_token(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolves the request's session, if any.
pub async fn current_session(state: &AppState, cookies: &Cookies) -> Option<Session> {
    let token = extract_session_token(cookies)?;
    state.sessions.current(&token).await
}

/// A middleware that requires a valid session to be present.
///
/// The resolved `Session` is inserted as a request extension. Role and user
/// id come from the stored session, never from client-readable cookies.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let session = current_session(&state, &cookies).await.ok_or_else(|| {
        tracing::warn!("❌ No valid session for {}", request.uri().path());
        AppError::Authentication("Not authenticated".to_string())
    })?;

    tracing::debug!("✅ User authenticated: {} ({})", session.user_id, session.role);

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
