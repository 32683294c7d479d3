use crate::error::InvalidUrlError;
use url::Url;

/// Maximum accepted length of a submitted URL.
pub const MAX_URL_LENGTH: usize = 2048;

/// Checks that `candidate` is a well-formed absolute http(s) URL with a host.
///
/// Reachability is not checked. Returns the parsed URL so later stages don't
/// parse it again.
pub fn validate_url(candidate: &str) -> Result<Url, InvalidUrlError> {
    if candidate.is_empty() {
        return Err(InvalidUrlError::Empty);
    }

    if candidate.len() > MAX_URL_LENGTH {
        return Err(InvalidUrlError::TooLong {
            len: candidate.len(),
            max: MAX_URL_LENGTH,
        });
    }

    // The parser silently trims, which would let " http://x" through.
    if candidate.trim() != candidate {
        return Err(InvalidUrlError::Malformed(
            "surrounding whitespace".to_string(),
        ));
    }

    let url = Url::parse(candidate).map_err(|e| InvalidUrlError::Malformed(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(InvalidUrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(InvalidUrlError::MissingHost(candidate.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_http_urls() {
        assert!(validate_url("https://example.com/path").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://sub.example.com:8443/a?b=c#d").is_ok());
        assert!(validate_url("http://127.0.0.1:3000/").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(validate_url(""), Err(InvalidUrlError::Empty));
    }

    #[test]
    fn rejects_free_text() {
        assert!(matches!(
            validate_url("not a url"),
            Err(InvalidUrlError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_relative_references() {
        assert!(validate_url("/just/a/path").is_err());
        assert!(validate_url("example.com/path").is_err());
        assert!(validate_url("//example.com/path").is_err());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(InvalidUrlError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_url("mailto:someone@example.com"),
            Err(InvalidUrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        assert!(matches!(
            validate_url(" https://example.com"),
            Err(InvalidUrlError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_overlong_input() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(
            validate_url(&long),
            Err(InvalidUrlError::TooLong { .. })
        ));
    }
}
