use serde::Serialize;

use crate::{
    error::Result,
    repositories::{brand as brand_repo, certificate as certificate_repo},
    state::AppState,
};

/// Headline counts for the dashboard landing page.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub brands: i64,
    pub certificates: i64,
    pub certificates_with_document: i64,
    /// Users across every credential backend, de-duplicated by email.
    pub users: usize,
}

pub async fn stats(state: &AppState) -> Result<DashboardStats> {
    let brands = brand_repo::count_brands(&state.db).await?;
    let (certificates, certificates_with_document) =
        certificate_repo::count_certificates(&state.db).await?;
    let users = state.users.list().await?.len();

    Ok(DashboardStats {
        brands,
        certificates,
        certificates_with_document,
        users,
    })
}
