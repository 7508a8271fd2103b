use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique id of one issued refresh token, equal to the `jti` claim inside
/// the signed token and to the primary key of its server-side record.
#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct TokenId(pub uuid::Uuid);

impl TokenId {
    pub fn generate() -> Self {
        TokenId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TokenId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(TokenId)
    }
}

/// Short-lived signed credential; stateless, never stored server-side.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

/// Long-lived signed credential; tracked server-side by its [`TokenId`].
#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

/// Client context captured alongside an issued refresh token.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}
