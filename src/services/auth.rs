use zeroize::Zeroize;

use crate::{
    error::{AppError, Result},
    models::{session::Session, user::User},
    services::credentials::{BackendKind, CredentialChain, Resolution},
    state::AppState,
};

/// Shown for every failed login, whichever backend or check rejected it.
pub const INVALID_CREDENTIALS: &str = "Email atau password salah";
/// Shown when no backend could be consulted.
pub const SYSTEM_ERROR: &str = "Terjadi kesalahan sistem";

fn check_present(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok(())
}

fn into_result(resolution: Resolution) -> Result<User> {
    match resolution {
        Resolution::Matched(user) => Ok(user),
        Resolution::NoMatch => Err(AppError::Authentication(INVALID_CREDENTIALS.to_string())),
        Resolution::Unavailable => Err(AppError::Unavailable(SYSTEM_ERROR.to_string())),
    }
}

/// Checks credentials against every backend in order.
pub async fn authenticate(chain: &CredentialChain, email: &str, password: String) -> Result<User> {
    let mut password = password;
    check_present(email, &password)?;
    tracing::debug!("🔐 Authenticating {}", email);

    let resolution = chain.resolve(email, &password).await;
    password.zeroize();
    into_result(resolution)
}

/// Checks credentials against a single backend.
pub async fn authenticate_in(
    chain: &CredentialChain,
    kind: BackendKind,
    email: &str,
    password: String,
) -> Result<User> {
    let mut password = password;
    check_present(email, &password)?;
    tracing::debug!("🔐 Authenticating {} against {} backend", email, kind);

    let resolution = chain.resolve_in(kind, email, &password).await;
    password.zeroize();
    into_result(resolution)
}

/// Authenticates and issues a session.
pub async fn login(state: &AppState, email: &str, password: String) -> Result<(User, Session)> {
    let user = authenticate(&state.credentials, email, password).await?;
    let session = state.sessions.issue(&user).await?;
    tracing::info!("✅ User logged in: {}", user.id);
    Ok((user, session))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::user::Role;
    use crate::repositories::user_memory::MemoryUserBackend;
    use crate::services::credentials::tests::{record, DownBackend};
    use crate::services::credentials::{EmailPolicy, UserBackend};

    const POLICY: EmailPolicy = EmailPolicy { case_insensitive: true };

    fn chain(backends: Vec<Arc<dyn UserBackend>>) -> CredentialChain {
        CredentialChain::new(backends, POLICY)
    }

    fn seed() -> Arc<dyn UserBackend> {
        Arc::new(MemoryUserBackend::new(
            vec![record(2, "admin@example.com", "admin123", Role::Admin)],
            POLICY,
        ))
    }

    #[tokio::test]
    async fn missing_fields_are_input_errors() {
        let chain = chain(vec![seed()]);
        let err = authenticate(&chain, "", "admin123".into()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = authenticate(&chain, "admin@example.com", String::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_email_and_wrong_password_look_the_same() {
        let chain = chain(vec![seed()]);
        let a = authenticate(&chain, "nobody@example.com", "admin123".into()).await.unwrap_err();
        let b = authenticate(&chain, "admin@example.com", "nope".into()).await.unwrap_err();
        assert_eq!(a.to_string(), b.to_string());
        assert!(matches!(a, AppError::Authentication(ref m) if m == INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn all_backends_down_is_a_system_error() {
        let chain = chain(vec![Arc::new(DownBackend(BackendKind::Database))]);
        let err = authenticate(&chain, "admin@example.com", "admin123".into()).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(ref m) if m == SYSTEM_ERROR));
    }

    #[tokio::test]
    async fn single_backend_validation_ignores_the_others() {
        let chain = chain(vec![seed(), Arc::new(DownBackend(BackendKind::Database))]);
        let user = authenticate(&chain, "admin@example.com", "admin123".into()).await.unwrap();
        assert_eq!(user.role, Role::Admin);

        let err = authenticate_in(&chain, BackendKind::Database, "admin@example.com", "admin123".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }
}
