//! Decoding helpers for the billing-file endpoint and artifact responses.
//!
//! `POST /gerar-bpa` answers with the artifact bytes directly, but smuggles
//! error reports through the same endpoint as JSON or short text bodies.
//! The backend cannot be changed, so the heuristic lives here, in one
//! place, with its own tests: a genuine billing file is `text/plain` or
//! `application/octet-stream` and at least [`MIN_BILLING_FILE_BYTES`] long.

use esusync_domain::SyncError;

/// Bodies smaller than this are error messages, not billing files.
pub const MIN_BILLING_FILE_BYTES: usize = 64;

/// Validate a `gerar-bpa` response body. Returns the smuggled error when
/// the payload is not a genuine billing file.
pub fn ensure_billing_payload(content_type: Option<&str>, body: &[u8]) -> Result<(), SyncError> {
    let media_type = content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let type_ok = media_type == "text/plain" || media_type == "application/octet-stream";
    if type_ok && body.len() >= MIN_BILLING_FILE_BYTES {
        return Ok(());
    }

    Err(SyncError::Internal(extract_error_message(body)))
}

/// Pull a human-readable message out of a smuggled error body.
fn extract_error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["error", "message", "detail"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "backend returned an empty billing response".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Extract the filename from a `Content-Disposition` header, falling back
/// when the header is absent or malformed.
pub fn filename_from_disposition(header: Option<&str>, fallback: &str) -> String {
    let Some(header) = header else {
        return fallback.to_string();
    };

    for part in header.split(';') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("filename=") {
            let name = value.trim_matches('"').trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    fallback.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_file_of_sufficient_size_is_accepted() {
        let body = vec![b'0'; 4096];
        assert!(ensure_billing_payload(Some("text/plain; charset=utf-8"), &body).is_ok());
    }

    #[test]
    fn octet_stream_is_accepted() {
        let body = vec![0u8; 512];
        assert!(ensure_billing_payload(Some("application/octet-stream"), &body).is_ok());
    }

    #[test]
    fn json_error_body_is_rejected_with_its_message() {
        let body = br#"{"error": "competencia sem atendimentos"}"#;
        let err = ensure_billing_payload(Some("application/json"), body).unwrap_err();
        assert_eq!(err, SyncError::Internal("competencia sem atendimentos".to_string()));
    }

    #[test]
    fn tiny_text_body_is_rejected_even_with_plain_content_type() {
        let err = ensure_billing_payload(Some("text/plain"), b"erro interno").unwrap_err();
        assert!(matches!(err, SyncError::Internal(m) if m.contains("erro interno")));
    }

    #[test]
    fn html_error_page_is_rejected() {
        let body = vec![b'x'; 1024];
        assert!(ensure_billing_payload(Some("text/html"), &body).is_err());
    }

    #[test]
    fn missing_content_type_is_rejected() {
        let body = vec![b'0'; 1024];
        assert!(ensure_billing_payload(None, &body).is_err());
    }

    #[test]
    fn disposition_filename_is_extracted() {
        assert_eq!(
            filename_from_disposition(
                Some("attachment; filename=\"bpa_202403.txt\""),
                "fallback.txt"
            ),
            "bpa_202403.txt"
        );
        assert_eq!(
            filename_from_disposition(Some("attachment; filename=visitas.xlsx"), "f.txt"),
            "visitas.xlsx"
        );
    }

    #[test]
    fn missing_or_malformed_disposition_uses_fallback() {
        assert_eq!(filename_from_disposition(None, "bpa_export.xlsx"), "bpa_export.xlsx");
        assert_eq!(filename_from_disposition(Some("attachment"), "x.txt"), "x.txt");
        assert_eq!(filename_from_disposition(Some("attachment; filename="), "x.txt"), "x.txt");
    }
}
