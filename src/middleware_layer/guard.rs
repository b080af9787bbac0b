//! Page-level redirects based on whether the visitor is logged in.
//!
//! The guard only decides authentication. Capability checks run in the
//! handlers afterwards.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;

use crate::{middleware_layer::auth::current_session, state::AppState};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// What the guard does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Authorized,
    Redirect(&'static str),
}

fn is_dashboard(path: &str) -> bool {
    path == DASHBOARD_PATH
        || path
            .strip_prefix(DASHBOARD_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Whether `decide` depends on the session for this path.
pub fn needs_session(path: &str) -> bool {
    path == LOGIN_PATH || is_dashboard(path)
}

/// Decides what to do with `path`. First matching rule wins:
/// `/` goes to the login page, dashboard pages need a session, and a logged
/// in visitor on the login page goes to the dashboard.
pub fn decide(path: &str, has_valid_session: bool) -> Decision {
    if path == "/" {
        return Decision::Redirect(LOGIN_PATH);
    }
    if is_dashboard(path) && !has_valid_session {
        return Decision::Redirect(LOGIN_PATH);
    }
    if path == LOGIN_PATH && has_valid_session {
        return Decision::Redirect(DASHBOARD_PATH);
    }
    Decision::Authorized
}

/// Applies `decide` to every request. Redirects are `307 Temporary Redirect`.
pub async fn route_guard(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let has_session = if needs_session(&path) {
        current_session(&state, &cookies).await.is_some()
    } else {
        false
    };

    match decide(&path, has_session) {
        Decision::Authorized => next.run(request).await,
        Decision::Redirect(to) => {
            tracing::debug!("↪️ Guard redirect {} → {}", path, to);
            Redirect::temporary(to).into_response()
        }
    }
}
