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
    error::{AppError, Result},
    handlers::auth::MessageResponse,
    models::{
        session::Session,
        user::{Role, User},
    },
    services::{
        access::{authorize, has_at_least_role, Capability},
        users::{CreateUser, UpdateUser},
    },
    state::AppState,
    validation::auth::{validate_password, validate_user_name},
};

/// The request payload for creating a user.
#[derive(Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[garde(email)]
    pub email: String,
    #[serde(default)]
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[garde(skip)]
    pub role: String,
}

/// The request payload for updating a user.
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
struct UsersResponse {
    success: bool,
    users: Vec<User>,
}

#[derive(Serialize)]
struct UserResponse {
    success: bool,
    user: User,
}

fn parse_role(raw: &str) -> Result<Role> {
    raw.parse()
        .map_err(|e: crate::models::user::UnknownRole| AppError::Validation(e.to_string()))
}

/// A caller may only hand out roles up to their own.
fn ensure_can_grant(session: &Session, role: Role) -> Result<()> {
    if has_at_least_role(Some(session.role), role) {
        Ok(())
    } else {
        tracing::warn!("❌ {} tried to grant {}", session.user_id, role);
        Err(AppError::Unauthorized)
    }
}

/// Lists users from every credential backend.
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    authorize(&session, Capability::Users)?;

    let users = state.users.list().await?;
    Ok((StatusCode::OK, Json(UsersResponse { success: true, users })).into_response())
}

/// Creates a user.
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Response> {
    authorize(&session, Capability::Users)?;

    if req.email.trim().is_empty()
        || req.name.trim().is_empty()
        || req.password.is_empty()
        || req.role.is_empty()
    {
        return Err(AppError::Validation("All fields are required".to_string()));
    }
    let role = parse_role(&req.role)?;
    req.validate()?;
    ensure_can_grant(&session, role)?;

    let user = state
        .users
        .create(CreateUser {
            email: req.email,
            name: req.name,
            password: req.password,
            role,
        })
        .await?;

    tracing::info!("👤 {} created user {}", session.user_id, user.id);
    Ok((StatusCode::CREATED, Json(UserResponse { success: true, user })).into_response())
}

/// Updates a user's name, role or password.
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Response> {
    authorize(&session, Capability::Users)?;

    if let Some(ref name) = req.name {
        validate_user_name(name)?;
    }
    if let Some(ref password) = req.password {
        validate_password(password)?;
    }
    let role = req.role.as_deref().map(parse_role).transpose()?;
    if let Some(role) = role {
        ensure_can_grant(&session, role)?;
    }

    let user = state
        .users
        .update(
            user_id,
            UpdateUser {
                name: req.name,
                role,
                password: req.password,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(UserResponse { success: true, user })).into_response())
}

/// Deletes a user. Super admins are refused.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
) -> Result<Response> {
    authorize(&session, Capability::Users)?;

    state.users.delete(user_id).await?;
    tracing::info!("👤 {} deleted user {}", session.user_id, user_id);
    let response = MessageResponse {
        success: true,
        message: "User deleted successfully".to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}
