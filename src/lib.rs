use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod crypto {
    pub mod secret;
    pub mod token;
}

pub mod models {
    pub mod brand;
    pub mod certificate;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod brand;
    pub mod certificate;
    pub mod session;
    pub mod user;
    pub mod user_file;
    pub mod user_memory;
}

pub mod services {
    pub mod access;
    pub mod auth;
    pub mod brands;
    pub mod certificates;
    pub mod credentials;
    pub mod dashboard;
    pub mod documents;
    pub mod session;
    pub mod users;
}

pub mod handlers {
    pub mod auth;
    pub mod brands;
    pub mod certificates;
    pub mod pages;
    pub mod public;
    pub mod users;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod guard;
}

pub mod validation {
    pub mod auth;
    pub mod catalog;
}

use error::AppError;
use state::AppState;

/// Room for multipart framing and the text fields around a document.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Builds the application router.
///
/// Rate limiting and CORS need the peer address and deployment origin, so
/// `main` layers them on top.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::pages::root))
        .route("/login", get(handlers::pages::login_page))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/validate", post(handlers::auth::validate))
        .route("/api/auth/validate-db", post(handlers::auth::validate_db))
        .route(
            "/api/verify/{brand_slug}/{product_slug}",
            get(handlers::public::verify_certificate),
        )
        .route(
            "/{brand_slug}/{product_slug}",
            get(handlers::public::certificate_document),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/session", get(handlers::auth::session))
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/{user_id}",
            patch(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route(
            "/api/brands",
            get(handlers::brands::list_brands).post(handlers::brands::create_brand),
        )
        .route(
            "/api/brands/{brand_id}",
            patch(handlers::brands::update_brand).delete(handlers::brands::delete_brand),
        )
        .route(
            "/api/certificates",
            get(handlers::certificates::list_certificates)
                .post(handlers::certificates::create_certificate),
        )
        .route(
            "/api/certificates/{certificate_id}",
            patch(handlers::certificates::update_certificate)
                .delete(handlers::certificates::delete_certificate),
        )
        .route("/api/dashboard/stats", get(handlers::pages::dashboard_stats))
        .route("/dashboard", get(handlers::pages::dashboard_page))
        .route("/dashboard/", get(handlers::pages::dashboard_page))
        .route("/dashboard/{*section}", get(handlers::pages::dashboard_page))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let body_limit = state.config.max_document_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware_layer::guard::route_guard,
        ))
        .layer(CookieManagerLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(body_limit))
}
