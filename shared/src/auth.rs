use http::HeaderMap;
use http::header::AUTHORIZATION;

const BEARER_SCHEME: &str = "bearer";

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively and may be followed by any number
/// of spaces. Anything else (missing header, other schemes, tokens containing
/// whitespace) yields `None` rather than an error.
pub fn get_bearer_token_from_authorization_header(header: Option<&str>) -> Option<&str> {
    let header = header?;

    let scheme = header.get(..BEARER_SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let rest = &header[BEARER_SCHEME.len()..];
    if !rest.starts_with(' ') {
        return None;
    }

    let token = rest.trim_start_matches(' ');
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return None;
    }

    Some(token)
}

/// Same as [`get_bearer_token_from_authorization_header`] but reads the header
/// from a request's header map. Non-UTF8 header values are ignored.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    get_bearer_token_from_authorization_header(header)
}
