use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

/// Marketplace principal roles. Wire and storage names match the upstream
/// directory (`ADMIN`/`SELLER`/`CLIENT`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "SELLER")]
    Seller,
    #[serde(rename = "CLIENT")]
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "ADMIN",
            Role::Seller => "SELLER",
            Role::Client => "CLIENT",
        };
        f.write_str(s)
    }
}

/// A verified principal: the outcome of authenticating an access token.
/// The role set is a snapshot taken at issuance time; callers that need
/// live roles must re-fetch the user through the directory.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Identity {
    /// Role gate: an empty requirement admits any authenticated identity,
    /// otherwise at least one required role must be held.
    pub fn permits(&self, required: &[Role]) -> bool {
        required.is_empty() || required.iter().any(|r| self.roles.contains(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(roles: &[Role]) -> Identity {
        Identity {
            user_id: UserId(uuid::Uuid::new_v4()),
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn empty_requirement_admits_any_identity() {
        assert!(identity(&[Role::Client]).permits(&[]));
        assert!(identity(&[]).permits(&[]));
    }

    #[test]
    fn disjoint_roles_are_denied() {
        assert!(!identity(&[Role::Seller]).permits(&[Role::Admin]));
        assert!(!identity(&[]).permits(&[Role::Client]));
    }

    #[test]
    fn any_overlapping_role_is_admitted() {
        assert!(identity(&[Role::Seller]).permits(&[Role::Admin, Role::Seller]));
        assert!(identity(&[Role::Admin]).permits(&[Role::Admin, Role::Seller]));
        assert!(identity(&[Role::Client, Role::Admin]).permits(&[Role::Admin]));
    }
}
