use axum::http::{header::COOKIE, HeaderMap};

/// Name of the HttpOnly cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

pub fn build_session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Expires the session cookie on the client.
pub fn clear_session_cookie(secure: bool) -> String {
    build_session_cookie("", 0, secure)
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_cookie_flags() {
        let c = build_session_cookie("tok", 60, true);
        assert!(c.starts_with("session=tok;"));
        assert!(c.contains("HttpOnly"));
        assert!(c.contains("Max-Age=60"));
        assert!(c.ends_with("; Secure"));
        assert!(!build_session_cookie("tok", 60, false).contains("Secure"));
    }

    #[test]
    fn cleared_cookie_has_zero_max_age() {
        let c = clear_session_cookie(false);
        assert!(c.starts_with("session=;"));
        assert!(c.contains("Max-Age=0"));
    }

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; session=abc.def"));
        assert_eq!(read_cookie(&headers, "session").as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session="));
        assert_eq!(read_cookie(&headers, "session"), None);
    }
}
