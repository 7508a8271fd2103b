use crate::api::v1::error::ApiErrorCode;
use warp::http::Method;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Mint the double-submit value. It is random but not secret: the guard
/// rests on an attacker being unable to read the cookie cross-origin.
pub fn mint() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Only state-changing methods are guarded.
pub fn requires_check(method: &Method) -> bool {
    *method == Method::POST
        || *method == Method::PUT
        || *method == Method::PATCH
        || *method == Method::DELETE
}

/// Double-submit check: cookie and header both present and exactly equal.
pub fn check(cookie: Option<&str>, header: Option<&str>) -> bool {
    match (cookie, header) {
        (Some(c), Some(h)) => !c.is_empty() && c == h,
        _ => false,
    }
}

pub fn enforce(
    method: &Method,
    cookie: Option<&str>,
    header: Option<&str>,
) -> Result<(), ApiErrorCode> {
    if !requires_check(method) {
        return Ok(());
    }
    if check(cookie, header) {
        Ok(())
    } else {
        Err(ApiErrorCode::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_pair_passes_a_post() {
        assert!(enforce(&Method::POST, Some("tok"), Some("tok")).is_ok());
    }

    #[test]
    fn mismatch_or_absence_is_forbidden() {
        assert!(enforce(&Method::POST, Some("tok"), Some("other")).is_err());
        assert!(enforce(&Method::POST, Some("tok"), None).is_err());
        assert!(enforce(&Method::POST, None, Some("tok")).is_err());
        assert!(enforce(&Method::POST, None, None).is_err());
        assert!(enforce(&Method::DELETE, Some(""), Some("")).is_err());
    }

    #[test]
    fn safe_methods_bypass_the_guard() {
        assert!(enforce(&Method::GET, None, None).is_ok());
        assert!(enforce(&Method::GET, Some("tok"), Some("other")).is_ok());
        assert!(enforce(&Method::HEAD, None, None).is_ok());
        assert!(enforce(&Method::OPTIONS, None, None).is_ok());
    }

    #[test]
    fn minted_tokens_are_unique() {
        assert_ne!(mint(), mint());
    }
}
