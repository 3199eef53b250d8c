use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::validation::Validator;

pub const AVATAR_FOLDER: &str = "avatar";
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::invalid_field(
                "role",
                &format!("unknown role '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Avatar {
    pub public_id: String,
    pub url: String,
}

/// A user as exposed to clients. The password hash never leaves the
/// repository except through [`UserCredentials`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<Avatar>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Identity of the authenticated caller, handed explicitly to services.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and administrators may act on a resource.
    pub fn ensure_owner_or_admin(&self, owner: Uuid) -> Result<(), DomainError> {
        if self.id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "not allowed to access this resource".to_string(),
            ))
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut v = Validator::new();
        v.require(&self.name, "name", "user name must be provided");
        v.require(&self.email, "email", "user email must be provided");
        v.email(&self.email, "email", "email must be valid");
        v.check(
            self.password.len() >= MIN_PASSWORD_LEN,
            "password",
            "password must be at least 8 characters",
        );
        v.require(&self.avatar, "avatar", "user avatar must be provided");
        v.finish()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: Avatar,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChanges {
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

impl ProfileChanges {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut v = Validator::new();
        v.require(&self.name, "name", "name must be provided");
        v.require(&self.email, "email", "email must be provided");
        v.email(&self.email, "email", "email must be valid");
        v.finish()
    }
}

/// Fields an administrator may change on any account.
#[derive(Debug, Clone, PartialEq)]
pub struct UserChanges {
    pub name: String,
    pub email: String,
    pub role: Role,
}
