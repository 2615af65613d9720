//! Authenticated caller passed explicitly into dashboard handlers
//!
//! Session resolution happens upstream; the gateway forwards the resolved
//! user id and role as `x-user-id` and `x-user-role` headers. Handlers take a
//! [`Principal`] argument instead of reading any ambient state.

use std::str::FromStr;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Builder,
    Broker,
    Client,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "builder" => Ok(Role::Builder),
            "broker" => Ok(Role::Broker),
            "client" => Ok(Role::Client),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Builders and brokers own listings and receive leads.
    pub fn is_owner_role(&self) -> bool {
        matches!(self.role, Role::Builder | Role::Broker)
    }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn can_manage(&self, owner_id: Option<&str>) -> bool {
        self.is_admin() || owner_id == Some(self.user_id.as_str())
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin role required".to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER).ok_or(ApiError::Unauthorized)?;
        let role = header(parts, USER_ROLE_HEADER)
            .and_then(|r| r.parse::<Role>().ok())
            .ok_or(ApiError::Unauthorized)?;

        Ok(Principal {
            user_id: user_id.to_string(),
            role,
        })
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: "u1".to_string(),
            role,
        }
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Broker".parse::<Role>(), Ok(Role::Broker));
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn owners_manage_only_their_records() {
        let broker = principal(Role::Broker);
        assert!(broker.can_manage(Some("u1")));
        assert!(!broker.can_manage(Some("u2")));
        assert!(!broker.can_manage(None));
        assert!(principal(Role::Admin).can_manage(None));
    }
}
