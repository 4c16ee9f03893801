//! Role checks driven by the `X-User-Role` request header.

use std::fmt;
use std::str::FromStr;

use axum::http::HeaderMap;

use super::error::ApiError;
use crate::config::AuthConfig;

pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Owner,
    Staff,
    Tenant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Owner => "Owner",
            Self::Staff => "Staff",
            Self::Tenant => "Tenant",
        }
    }

    /// Admin satisfies every requirement; other roles only their own.
    pub fn satisfies(self, required: Role) -> bool {
        self == Role::Admin || self == required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            "staff" => Ok(Self::Staff),
            "tenant" => Ok(Self::Tenant),
            _ => Err(ApiError::UnknownRole(s.to_string())),
        }
    }
}

/// Checks that the caller's role satisfies `required`.
///
/// Does nothing when role enforcement is disabled in config.
///
/// # Errors
///
/// - [`ApiError::MissingRole`] when the header is absent or not text.
/// - [`ApiError::UnknownRole`] when the header names no known role.
/// - [`ApiError::Forbidden`] when the role is not allowed.
pub fn require_role(auth: &AuthConfig, headers: &HeaderMap, required: Role) -> Result<(), ApiError> {
    if !auth.enforce_roles {
        return Ok(());
    }
    let value = headers
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::MissingRole)?;
    let role: Role = value.parse()?;
    if role.satisfies(required) {
        Ok(())
    } else {
        Err(ApiError::Forbidden { role, required })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(role: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        headers
    }

    fn enforced() -> AuthConfig {
        AuthConfig { enforce_roles: true }
    }

    #[test]
    fn admin_satisfies_every_role() {
        for required in [Role::Owner, Role::Staff, Role::Tenant] {
            assert!(require_role(&enforced(), &headers("Admin"), required).is_ok());
        }
    }

    #[test]
    fn role_names_are_case_insensitive() {
        assert!(require_role(&enforced(), &headers("staff"), Role::Staff).is_ok());
        assert!(require_role(&enforced(), &headers(" OWNER "), Role::Owner).is_ok());
    }

    #[test]
    fn wrong_or_missing_role_is_rejected() {
        assert!(matches!(
            require_role(&enforced(), &headers("Tenant"), Role::Staff),
            Err(ApiError::Forbidden { role: Role::Tenant, required: Role::Staff })
        ));
        assert!(matches!(
            require_role(&enforced(), &HeaderMap::new(), Role::Owner),
            Err(ApiError::MissingRole)
        ));
        assert!(matches!(
            require_role(&enforced(), &headers("Landlord"), Role::Owner),
            Err(ApiError::UnknownRole(_))
        ));
    }

    #[test]
    fn disabled_enforcement_allows_anonymous_callers() {
        let open = AuthConfig { enforce_roles: false };
        assert!(require_role(&open, &HeaderMap::new(), Role::Staff).is_ok());
    }
}
