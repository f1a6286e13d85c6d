use crate::error::ApiError;

pub mod admin;
pub mod agents;
pub mod claims;
pub mod missions;
pub mod payouts;
pub mod session;

/// Trims `raw` and requires it to be non-empty and at most `max_len` chars.
fn required_text(field: &str, raw: &str, max_len: usize) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(ApiError::bad_request(format!("{field} must be at most {max_len} characters")));
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`] but `None` and blank strings pass through as `None`.
fn optional_text(field: &str, raw: Option<&str>, max_len: usize) -> Result<Option<String>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => required_text(field, value, max_len).map(Some),
    }
}

fn http_url(field: &str, raw: &str) -> Result<String, ApiError> {
    let value = required_text(field, raw, 2048)?;
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Ok(value)
        }
        _ => Err(ApiError::bad_request(format!("{field} must be an http(s) URL"))),
    }
}

fn clamp_limit(requested: Option<u32>, default: u32, max: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(http_url("proof_url", "https://youtu.be/abc").is_ok());
        assert!(http_url("proof_url", "  http://example.com/x  ").is_ok());
        assert!(http_url("proof_url", "ftp://example.com").is_err());
        assert!(http_url("proof_url", "not a url").is_err());
        assert!(http_url("proof_url", "").is_err());
    }

    #[test]
    fn text_limits() {
        assert_eq!(required_text("name", "  neo ", 10).unwrap(), "neo");
        assert!(required_text("name", "   ", 10).is_err());
        assert!(required_text("name", "abcdefghijk", 10).is_err());
        assert_eq!(optional_text("tagline", Some("  "), 10).unwrap(), None);
        assert_eq!(optional_text("tagline", None, 10).unwrap(), None);
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None, 25, 100), 25);
        assert_eq!(clamp_limit(Some(0), 25, 100), 1);
        assert_eq!(clamp_limit(Some(1000), 25, 100), 100);
    }
}
