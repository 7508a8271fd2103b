use crate::api::v1::csrf;
use crate::application_port::SessionTokens;
use warp::http::HeaderValue;
use warp::http::header::SET_COOKIE;
use warp::reply::Response;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

const ACCESS_MAX_AGE_SECS: i64 = 15 * 60;
const REFRESH_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;
const CSRF_MAX_AGE_SECS: i64 = 60 * 60;

/// Cross-site SPA contract: Secure + SameSite=None; the token cookies are
/// HttpOnly, the CSRF cookie stays readable so the client can mirror it
/// into a header.
fn build(name: &str, value: &str, max_age_secs: i64, http_only: bool) -> String {
    let http_only = if http_only { "; HttpOnly" } else { "" };
    format!(
        "{name}={value}; Max-Age={max_age_secs}; Path=/; Secure; SameSite=None{http_only}"
    )
}

fn clear(name: &str, http_only: bool) -> String {
    build(name, "", 0, http_only)
}

pub fn session_cookies(tokens: &SessionTokens, csrf_token: &str) -> Vec<String> {
    vec![
        build(
            ACCESS_COOKIE,
            &tokens.access_token.0,
            ACCESS_MAX_AGE_SECS,
            true,
        ),
        build(
            REFRESH_COOKIE,
            &tokens.refresh_token.0,
            REFRESH_MAX_AGE_SECS,
            true,
        ),
        build(csrf::CSRF_COOKIE, csrf_token, CSRF_MAX_AGE_SECS, false),
    ]
}

pub fn clear_session_cookies() -> Vec<String> {
    vec![
        clear(ACCESS_COOKIE, true),
        clear(REFRESH_COOKIE, true),
        clear(csrf::CSRF_COOKIE, false),
    ]
}

/// Append Set-Cookie headers to a reply.
pub fn apply(mut response: Response, cookies: &[String]) -> Response {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}
