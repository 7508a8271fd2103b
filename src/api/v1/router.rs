use super::error::*;
use super::handler;
use crate::api::v1::{cookie, csrf};
use crate::application_port::AuthService;
use crate::domain_model::{AccessToken, Identity, Role, SessionMeta};
use crate::server::Server;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_meta())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let register_client = warp::post()
        .and(warp::path("register-client"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_meta())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register_client);

    let register_seller = warp::post()
        .and(warp::path("register-seller"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_meta())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register_seller);

    let register_admin = warp::post()
        .and(warp::path("register-admin"))
        .and(warp::path::end())
        .and(require_csrf())
        .and(with_identity(server.auth_service.clone(), &[Role::Admin]))
        .and(warp::body::json())
        .and(with_meta())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register_admin);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(cookie::REFRESH_COOKIE))
        .and(with_meta())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(cookie::REFRESH_COOKIE))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::get()
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(with_identity(server.auth_service.clone(), &[]))
        .and_then(handler::me);

    let revoke_all = warp::post()
        .and(warp::path("sessions"))
        .and(warp::path("revoke-all"))
        .and(warp::path::end())
        .and(require_csrf())
        .and(with_identity(server.auth_service.clone(), &[]))
        .and(with(server.auth_service.clone()))
        .and_then(handler::revoke_all);

    login
        .or(register_client)
        .or(register_seller)
        .or(register_admin)
        .or(refresh)
        .or(logout)
        .or(me)
        .or(revoke_all)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Client context recorded alongside issued refresh tokens.
fn with_meta() -> impl Filter<Extract = (SessionMeta,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("user-agent")
        .and(warp::addr::remote())
        .map(|user_agent: Option<String>, addr: Option<SocketAddr>| SessionMeta {
            user_agent,
            ip: addr.map(|a| a.ip().to_string()),
        })
}

/// The access token travels in an HttpOnly cookie; a bearer header is
/// accepted for non-browser clients.
fn access_token_from(cookie_token: Option<String>, bearer: Option<String>) -> Option<AccessToken> {
    if let Some(token) = cookie_token {
        return Some(AccessToken(token));
    }
    bearer.and_then(|h| h.strip_prefix("Bearer ").map(|t| AccessToken(t.to_string())))
}

/// Authentication plus the role gate, parameterized per route. An empty
/// role slice admits any authenticated identity.
fn with_identity(
    auth_service: Arc<dyn AuthService>,
    required: &'static [Role],
) -> impl Filter<Extract = (Identity,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(cookie::ACCESS_COOKIE)
        .and(warp::header::optional::<String>("authorization"))
        .and_then(
            move |cookie_token: Option<String>, bearer: Option<String>| {
                let auth_service = auth_service.clone();
                async move {
                    let token = access_token_from(cookie_token, bearer)
                        .ok_or_else(|| reject::custom(ApiErrorCode::Unauthorized))?;
                    let identity = auth_service
                        .authenticate(&token)
                        .await
                        .map_err(ApiErrorCode::from)
                        .map_err(reject::custom)?;
                    if !identity.permits(required) {
                        return Err(reject::custom(ApiErrorCode::Forbidden));
                    }
                    Ok::<Identity, warp::Rejection>(identity)
                }
            },
        )
}

/// Double-submit guard for state-changing protected routes.
fn require_csrf() -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::method()
        .and(warp::cookie::optional::<String>(csrf::CSRF_COOKIE))
        .and(warp::header::optional::<String>(csrf::CSRF_HEADER))
        .and_then(
            |method: http::Method, cookie_token: Option<String>, header: Option<String>| async move {
                csrf::enforce(&method, cookie_token.as_deref(), header.as_deref())
                    .map_err(reject::custom)
            },
        )
        .untuple_one()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_token_is_preferred_over_bearer() {
        let token = access_token_from(
            Some("cookie-token".to_string()),
            Some("Bearer header-token".to_string()),
        )
        .unwrap();
        assert_eq!(token.0, "cookie-token");
    }

    #[test]
    fn bearer_header_is_the_fallback() {
        let token = access_token_from(None, Some("Bearer header-token".to_string())).unwrap();
        assert_eq!(token.0, "header-token");

        assert!(access_token_from(None, Some("Basic abc".to_string())).is_none());
        assert!(access_token_from(None, None).is_none());
    }
}
