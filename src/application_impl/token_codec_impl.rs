use crate::application_port::{AuthError, TokenCodec, VerifiedAccess, VerifiedRefresh};
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_key: Vec<u8>,
    pub refresh_key: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl JwtConfig {
    pub fn new(access_key: Vec<u8>, refresh_key: Vec<u8>) -> Self {
        JwtConfig {
            access_key,
            refresh_key,
            access_ttl: ACCESS_TOKEN_TTL,
            refresh_ttl: REFRESH_TOKEN_TTL,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    roles: Vec<Role>,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String,
    roles: Vec<Role>,
    jti: String,
    iat: i64,
    exp: i64,
}

fn encode_access(
    uid: UserId,
    roles: &[Role],
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.access_ttl;
    let claims = AccessClaims {
        sub: uid.to_string(),
        roles: roles.to_vec(),
        iat: iat_dt.timestamp(),
        exp: exp_dt.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.access_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn encode_refresh(
    uid: UserId,
    roles: &[Role],
    jti: TokenId,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.refresh_ttl;
    let claims = RefreshClaims {
        sub: uid.to_string(),
        roles: roles.to_vec(),
        jti: jti.to_string(),
        iat: iat_dt.timestamp(),
        exp: exp_dt.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.refresh_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn validation() -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    // no leeway: a token expiring exactly now is expired
    v.leeway = 0;
    v
}

fn decode_access(token: &str, cfg: &JwtConfig) -> Result<AccessClaims, AuthError> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(&cfg.access_key),
        &validation(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })?;
    Ok(data.claims)
}

fn decode_refresh(token: &str, cfg: &JwtConfig) -> Result<RefreshClaims, AuthError> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(&cfg.refresh_key),
        &validation(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })?;
    Ok(data.claims)
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::TokenInvalid)
    }

    #[inline]
    fn timestamp(exp: i64) -> Result<DateTime<Utc>, AuthError> {
        DateTime::<Utc>::from_timestamp(exp, 0).ok_or(AuthError::TokenInvalid)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access(
        &self,
        user: UserId,
        roles: &[Role],
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(user, roles, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh(
        &self,
        user: UserId,
        roles: &[Role],
    ) -> Result<(RefreshToken, TokenId, DateTime<Utc>), AuthError> {
        let jti = TokenId::generate();
        let (token, exp_dt) = encode_refresh(user, roles, jti, &self.cfg)?;
        Ok((RefreshToken(token), jti, exp_dt))
    }

    async fn verify_access(&self, token: &AccessToken) -> Result<VerifiedAccess, AuthError> {
        let claims = decode_access(&token.0, &self.cfg)?;
        Ok(VerifiedAccess {
            user_id: Self::parse_user_id(&claims.sub)?,
            roles: claims.roles,
            expires_at: Self::timestamp(claims.exp)?,
        })
    }

    async fn verify_refresh(&self, token: &RefreshToken) -> Result<VerifiedRefresh, AuthError> {
        let claims = decode_refresh(&token.0, &self.cfg)?;
        Ok(VerifiedRefresh {
            user_id: Self::parse_user_id(&claims.sub)?,
            roles: claims.roles,
            token_id: claims.jti.parse().map_err(|_| AuthError::TokenInvalid)?,
            expires_at: Self::timestamp(claims.exp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JwtHs256Codec {
        JwtHs256Codec::new(JwtConfig::new(
            b"test-access-secret".to_vec(),
            b"test-refresh-secret".to_vec(),
        ))
    }

    #[tokio::test]
    async fn access_round_trip_carries_subject_and_roles() {
        let codec = codec();
        let uid = UserId(uuid::Uuid::new_v4());

        let (token, exp) = codec.issue_access(uid, &[Role::Seller]).await.unwrap();
        let verified = codec.verify_access(&token).await.unwrap();

        assert_eq!(verified.user_id, uid);
        assert_eq!(verified.roles, vec![Role::Seller]);
        assert_eq!(verified.expires_at.timestamp(), exp.timestamp());
    }

    #[tokio::test]
    async fn refresh_round_trip_carries_jti() {
        let codec = codec();
        let uid = UserId(uuid::Uuid::new_v4());

        let (token, jti, _) = codec.issue_refresh(uid, &[Role::Client]).await.unwrap();
        let verified = codec.verify_refresh(&token).await.unwrap();

        assert_eq!(verified.user_id, uid);
        assert_eq!(verified.token_id, jti);
    }

    #[tokio::test]
    async fn each_refresh_gets_a_fresh_jti() {
        let codec = codec();
        let uid = UserId(uuid::Uuid::new_v4());

        let (_, a, _) = codec.issue_refresh(uid, &[]).await.unwrap();
        let (_, b, _) = codec.issue_refresh(uid, &[]).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn token_classes_do_not_cross_verify() {
        let codec = codec();
        let uid = UserId(uuid::Uuid::new_v4());

        let (access, _) = codec.issue_access(uid, &[]).await.unwrap();
        let (refresh, _, _) = codec.issue_refresh(uid, &[]).await.unwrap();

        // an access token is not a refresh token, and vice versa
        assert!(matches!(
            codec.verify_refresh(&RefreshToken(access.0)).await,
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            codec.verify_access(&AccessToken(refresh.0)).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn foreign_signature_is_invalid() {
        let codec = codec();
        let other = JwtHs256Codec::new(JwtConfig::new(
            b"other-access-secret".to_vec(),
            b"other-refresh-secret".to_vec(),
        ));
        let uid = UserId(uuid::Uuid::new_v4());

        let (token, _) = other.issue_access(uid, &[]).await.unwrap();
        assert!(matches!(
            codec.verify_access(&token).await,
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            codec.verify_access(&AccessToken("garbage".into())).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let cfg = JwtConfig {
            access_ttl: Duration::ZERO,
            ..JwtConfig::new(b"a".to_vec(), b"r".to_vec())
        };
        let codec = JwtHs256Codec::new(cfg);
        let uid = UserId(uuid::Uuid::new_v4());

        let (token, _) = codec.issue_access(uid, &[]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(matches!(
            codec.verify_access(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }
}
