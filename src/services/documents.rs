//! Certificate documents stored as `data:` URLs.

use base64::{Engine as _, engine::general_purpose};

use crate::error::{AppError, Result};
use crate::models::certificate::EncodedDocument;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Document types accepted for upload and rendered inline.
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["application/pdf", "image/jpeg", "image/png"];

pub fn is_allowed_mime(mime: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime)
}

/// Picks a MIME type: sniffed from the bytes first, then the client's
/// declared type, then `application/octet-stream`.
pub fn detect_mime(bytes: &[u8], declared: Option<&str>) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    declared
        .map(str::trim)
        .filter(|m| !m.is_empty() && m.contains('/'))
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

/// Encodes raw document bytes for storage.
pub fn encode(bytes: &[u8], file_name: &str, declared_mime: Option<&str>) -> Result<EncodedDocument> {
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let mime_type = detect_mime(bytes, declared_mime);
    if !is_allowed_mime(&mime_type) {
        tracing::warn!("❌ Rejected document of type {}", mime_type);
        return Err(AppError::Validation(
            "Only PDF, JPG and PNG documents are supported".to_string(),
        ));
    }

    let data_url = format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    );

    Ok(EncodedDocument {
        data_url,
        mime_type,
        file_name: sanitize_file_name(file_name),
        checksum: blake3::hash(bytes).to_hex().to_string(),
    })
}

/// Splits a `data:<mime>;base64,<payload>` URL into its MIME type and bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::Validation("Not a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::Validation("Data URL has no payload".to_string()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::Validation("Only base64 data URLs are supported".to_string()))?;

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Invalid base64 payload: {}", e)))?;

    let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
    Ok((mime.to_string(), bytes))
}

/// Keeps the last path component and drops characters that would break a
/// `Content-Disposition` header.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != ';')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "certificate".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n";

    #[test]
    fn pdf_is_sniffed_regardless_of_declared_type() {
        assert_eq!(detect_mime(PDF, Some("text/plain")), "application/pdf");
    }

    #[test]
    fn unknown_bytes_use_declared_type_or_fallback() {
        assert_eq!(detect_mime(b"hello", Some("text/plain")), "text/plain");
        assert_eq!(detect_mime(b"hello", Some("nonsense")), FALLBACK_MIME);
        assert_eq!(detect_mime(b"hello", None), FALLBACK_MIME);
    }

    #[test]
    fn encoded_document_decodes_to_the_same_bytes() {
        let doc = encode(PDF, "../cert.pdf", None).unwrap();
        assert!(doc.data_url.starts_with("data:application/pdf;base64,"));
        assert_eq!(doc.file_name, "cert.pdf");
        assert_eq!(doc.checksum.len(), 64);

        let (mime, bytes) = decode_data_url(&doc.data_url).unwrap();
        assert_eq!(mime, "application/pdf");
        assert_eq!(bytes, PDF);
    }

    #[test]
    fn only_pdf_and_images_are_accepted() {
        let err = encode(b"<script>alert(1)</script>", "x.pdf", Some("text/html")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(encode(b"hello", "x.bin", None).is_err());

        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(encode(&png, "x.png", Some("text/html")).unwrap().mime_type, "image/png");
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(encode(b"", "x.pdf", None).is_err());
    }

    #[test]
    fn malformed_data_urls_are_errors() {
        assert!(decode_data_url("https://example.com/a.pdf").is_err());
        assert!(decode_data_url("data:application/pdf;base64").is_err());
        assert!(decode_data_url("data:text/plain,hello").is_err());
        assert!(decode_data_url("data:application/pdf;base64,@@@").is_err());
    }

    #[test]
    fn file_names_are_cleaned() {
        assert_eq!(sanitize_file_name("C:\\docs\\a\"b;.pdf"), "ab.pdf");
        assert_eq!(sanitize_file_name("   "), "certificate");
    }
}
