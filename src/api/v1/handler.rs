use super::error::*;
use crate::api::v1::{cookie, csrf};
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Reply;
use warp::{self, Rejection, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(body: RegisterRequest) -> Self {
        RegisterInput {
            full_name: body.full_name,
            email: body.email,
            password: body.password,
            phone: body.phone,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Identity,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeAllResponse {
    pub revoked: u64,
}

/// JSON body plus the three session cookies; a fresh CSRF value is minted
/// with every issued session.
fn session_reply(session: &AuthSession) -> warp::reply::Response {
    let csrf_token = csrf::mint();
    let cookies = cookie::session_cookies(&session.tokens, &csrf_token);
    let json = warp::reply::json(&ApiResponse::ok(SessionResponse {
        user: session.identity.clone(),
    }));
    cookie::apply(json.into_response(), &cookies)
}

pub async fn login(
    body: LoginRequest,
    meta: SessionMeta,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, Rejection> {
    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let session = auth_service
        .login(login_input, meta)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(session_reply(&session))
}

pub async fn register_client(
    body: RegisterRequest,
    meta: SessionMeta,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, Rejection> {
    let session = auth_service
        .register_client(body.into(), meta)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(session_reply(&session))
}

pub async fn register_seller(
    body: RegisterRequest,
    meta: SessionMeta,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, Rejection> {
    let session = auth_service
        .register_seller(body.into(), meta)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(session_reply(&session))
}

pub async fn register_admin(
    actor: Identity,
    body: RegisterRequest,
    meta: SessionMeta,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, Rejection> {
    let session = auth_service
        .register_admin(body.into(), &actor, meta)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(session_reply(&session))
}

pub async fn refresh(
    refresh_cookie: Option<String>,
    meta: SessionMeta,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, Rejection> {
    let Some(raw) = refresh_cookie else {
        // no cookie: clear whatever stale session cookies the client still has
        let json = warp::reply::json(&ApiResponse::<SessionResponse>::err(
            ApiErrorCode::Unauthorized,
            ApiErrorCode::Unauthorized.to_string(),
        ));
        let response =
            warp::reply::with_status(json, StatusCode::UNAUTHORIZED).into_response();
        return Ok(cookie::apply(response, &cookie::clear_session_cookies()));
    };

    let session = auth_service
        .refresh(&RefreshToken(raw), meta)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(session_reply(&session))
}

pub async fn logout(
    refresh_cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, Rejection> {
    if let Some(raw) = refresh_cookie {
        auth_service.logout(&RefreshToken(raw)).await;
    }

    let json = warp::reply::json(&ApiResponse::ok(MessageResponse {
        message: "logged out".to_string(),
    }));
    Ok(cookie::apply(
        json.into_response(),
        &cookie::clear_session_cookies(),
    ))
}

pub async fn me(identity: Identity) -> Result<impl warp::Reply, Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(SessionResponse {
        user: identity,
    })))
}

pub async fn revoke_all(
    identity: Identity,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, Rejection> {
    let revoked = auth_service
        .revoke_all_sessions(identity.user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(RevokeAllResponse {
        revoked,
    })))
}
