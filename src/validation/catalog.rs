use crate::error::{AppError, Result};

/// Derives a URL slug from free text: lowercase, keep `[a-z0-9]`, whitespace
/// and `-`, turn whitespace runs into `-`, collapse repeated `-`, trim `-`.
pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    slug
}

/// Validates a slug supplied by a client.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 200 {
        return Err(AppError::Validation(
            "Slug must be between 1 and 200 characters".to_string(),
        ));
    }

    if !slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(AppError::Validation(
            "Slug can only contain lowercase letters, numbers, and hyphens".to_string(),
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(AppError::Validation(
            "Slug cannot start or end with a hyphen or repeat hyphens".to_string(),
        ));
    }

    Ok(())
}

/// First path segments owned by the console itself.
pub const RESERVED_BRAND_SLUGS: [&str; 3] = ["dashboard", "login", "api"];

/// Validates a brand slug. Brand slugs lead verification URLs, so they must
/// not collide with the console's own routes.
pub fn validate_brand_slug(slug: &str) -> Result<()> {
    validate_slug(slug)?;
    if RESERVED_BRAND_SLUGS.contains(&slug) {
        return Err(AppError::Validation(format!("Brand slug '{}' is reserved", slug)));
    }
    Ok(())
}

/// Uses `explicit` when given, otherwise derives a slug from `source`.
pub fn resolve_slug(explicit: Option<&str>, source: &str) -> Result<String> {
    let slug = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => generate_slug(source),
    };
    validate_slug(&slug)?;
    Ok(slug)
}

/// Validates a display name (brand or product).
pub fn validate_display_name(field: &str, name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > 500 {
        return Err(AppError::Validation(format!(
            "{} must be between 1 and 500 characters",
            field
        )));
    }
    Ok(())
}

/// Validates an external document URL.
pub fn validate_file_url(url: &str) -> Result<()> {
    if !(url.starts_with("https://") || url.starts_with("http://")) || url.len() > 2048 {
        return Err(AppError::Validation(
            "File URL must be an http(s) URL of at most 2048 characters".to_string(),
        ));
    }
    Ok(())
}

/// Builds the public verification URL for a certificate.
pub fn certificate_url(app_url: &str, brand_slug: &str, product_slug: &str) -> String {
    format!("{}/{}/{}", app_url.trim_end_matches('/'), brand_slug, product_slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_follow_the_documented_rules() {
        assert_eq!(generate_slug("Acme Corp"), "acme-corp");
        assert_eq!(generate_slug("  Hello,   World!  "), "hello-world");
        assert_eq!(generate_slug("a -- b"), "a-b");
        assert_eq!(generate_slug("-Leading and trailing-"), "leading-and-trailing");
        assert_eq!(generate_slug("Kopi Luwak №1"), "kopi-luwak-1");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn generated_slugs_validate() {
        for text in ["Acme Corp", "Produk 2024 Baru", "x"] {
            assert!(validate_slug(&generate_slug(text)).is_ok());
        }
    }

    #[test]
    fn bad_slugs_are_rejected() {
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Upper").is_err());
        assert!(validate_slug("has space").is_err());
        assert!(validate_slug("-edge").is_err());
        assert!(validate_slug("a--b").is_err());
    }

    #[test]
    fn explicit_slug_wins_over_derived() {
        assert_eq!(resolve_slug(Some("custom"), "Acme Corp").unwrap(), "custom");
        assert_eq!(resolve_slug(Some("  "), "Acme Corp").unwrap(), "acme-corp");
        assert!(resolve_slug(None, "!!!").is_err());
    }

    #[test]
    fn brand_slugs_cannot_shadow_console_routes() {
        for reserved in ["dashboard", "login", "api"] {
            assert!(validate_brand_slug(reserved).is_err());
        }
        let derived = resolve_slug(None, "Dashboard").unwrap();
        assert!(validate_brand_slug(&derived).is_err());
        assert!(validate_brand_slug("dashboard-co").is_ok());
    }

    #[test]
    fn verification_url_joins_slugs() {
        assert_eq!(
            certificate_url("http://localhost:3000/", "acme", "widget"),
            "http://localhost:3000/acme/widget"
        );
    }
}
