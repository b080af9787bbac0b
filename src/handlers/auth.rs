use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::{extract_session_token, SESSION_COOKIE},
    models::session::{Session, SessionUser},
    models::user::User,
    services::{access::Capability, auth as auth_service, credentials::BackendKind},
    state::AppState,
};

/// Client-readable copy of the session role. Display only.
pub const ROLE_COOKIE: &str = "user-role";
/// Client-readable copy of the user id. Display only.
pub const USER_ID_COOKIE: &str = "user-id";
/// URL-safe base64 of the user JSON. Display only.
pub const USER_COOKIE: &str = "admin-user";

const SESSION_COOKIES: [&str; 4] = [SESSION_COOKIE, ROLE_COOKIE, USER_ID_COOKIE, USER_COOKIE];

/// The request payload for login and credential validation.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The response payload for a successful login or validation.
#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: SessionUser,
}

/// The response payload for the current session.
#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: SessionUser,
    pub capabilities: &'static [Capability],
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// A bare success message.
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Creates a session cookie with the given name, value, and max age.
fn create_session_cookie(
    name: &'static str,
    value: String,
    max_age_days: i64,
    http_only: bool,
    secure: bool,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(http_only);
    cookie.set_secure(secure);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_days * 86400));
    cookie.set_path("/");
    cookie
}

/// Writes the four login cookies. Only `admin-token` carries authority.
fn set_session_cookies(cookies: &Cookies, state: &AppState, session: &Session) -> Result<()> {
    let days = state.sessions.duration_days();
    let secure = state.config.production;

    let user_json = sonic_rs::to_string(&session.user)
        .map_err(|e| AppError::Internal(format!("User serialization failed: {}", e)))?;

    cookies.add(create_session_cookie(SESSION_COOKIE, session.token.clone(), days, true, secure));
    cookies.add(create_session_cookie(ROLE_COOKIE, session.role.to_string(), days, false, secure));
    cookies.add(create_session_cookie(USER_ID_COOKIE, session.user_id.to_string(), days, false, secure));
    cookies.add(create_session_cookie(
        USER_COOKIE,
        general_purpose::URL_SAFE_NO_PAD.encode(user_json),
        days,
        false,
        secure,
    ));
    Ok(())
}

fn clear_session_cookies(cookies: &Cookies) {
    for name in SESSION_COOKIES {
        let mut cookie = Cookie::new(name, "");
        cookie.set_path("/");
        cookies.remove(cookie);
    }
}

fn user_response(user: &User) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        user: SessionUser::from(user),
    })
}

/// Handles login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt: {:?}", payload);

    let (user, session) = auth_service::login(&state, &payload.email, payload.password).await?;
    set_session_cookies(&cookies, &state, &session)?;

    tracing::info!("✅ Session cookies set for user: {}", user.id);
    Ok((StatusCode::OK, user_response(&user)).into_response())
}

/// Handles logout. Succeeds with or without a session.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    let token = extract_session_token(&cookies);
    state.sessions.revoke(token.as_deref()).await?;
    clear_session_cookies(&cookies);

    tracing::info!("👋 Logout completed");

    let response = MessageResponse {
        success: true,
        message: "Logout successful".to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the caller's session as the server sees it.
#[axum::debug_handler]
pub async fn session(Extension(session): Extension<Session>) -> Result<Response> {
    let response = SessionResponse {
        success: true,
        capabilities: session.role.capabilities(),
        user: session.user,
        expires_at: session.expires_at,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Checks credentials against the whole backend chain without issuing a
/// session.
#[axum::debug_handler]
pub async fn validate(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response> {
    let user = auth_service::authenticate(&state.credentials, &payload.email, payload.password).await?;
    Ok((StatusCode::OK, user_response(&user)).into_response())
}

/// Checks credentials against the database backend only.
#[axum::debug_handler]
pub async fn validate_db(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response> {
    let user = auth_service::authenticate_in(
        &state.credentials,
        BackendKind::Database,
        &payload.email,
        payload.password,
    )
    .await?;
    Ok((StatusCode::OK, user_response(&user)).into_response())
}
