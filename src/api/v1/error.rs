use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiErrorCode>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone(), err.to_string()));
        Ok(warp::reply::with_status(json, err.status()))
    } else if err.is_not_found() {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::NotFound,
            "no such route",
        ));
        Ok(warp::reply::with_status(json, StatusCode::NOT_FOUND))
    } else {
        let json = warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiError {
                code: ApiErrorCode::InternalError,
                message: format!("Unhandled error: {:?}", err),
            }),
        });
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

/// Caller-visible error classes. Deliberately coarser than [`AuthError`]:
/// a denial never says which factor failed.
#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired session")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("account already exists")]
    Conflict,
    #[error("not found")]
    NotFound,
    #[error("internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials | ApiErrorCode::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            // one denial for unknown email and wrong password alike
            AuthError::NotFound | AuthError::InvalidCredential => ApiErrorCode::InvalidCredentials,
            AuthError::Unauthorized
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::SubjectMismatch => ApiErrorCode::Unauthorized,
            AuthError::Forbidden => ApiErrorCode::Forbidden,
            AuthError::Conflict => ApiErrorCode::Conflict,
            AuthError::Store(e) | AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_collapse_into_one_denial() {
        for err in [
            AuthError::Unauthorized,
            AuthError::TokenInvalid,
            AuthError::TokenExpired,
            AuthError::SubjectMismatch,
        ] {
            assert!(matches!(
                ApiErrorCode::from(err),
                ApiErrorCode::Unauthorized
            ));
        }
    }

    #[test]
    fn credential_failures_do_not_reveal_the_factor() {
        assert!(matches!(
            ApiErrorCode::from(AuthError::NotFound),
            ApiErrorCode::InvalidCredentials
        ));
        assert!(matches!(
            ApiErrorCode::from(AuthError::InvalidCredential),
            ApiErrorCode::InvalidCredentials
        ));
    }
}
