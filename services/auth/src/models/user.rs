//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::role::{Role, UserStatus};

/// User entity as stored
///
/// Not `Serialize`; clients only ever see [`UserResponse`].
#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub contact_number: Option<String>,
    pub profile_image: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub is_temporary_password: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("contact_number", &self.contact_number)
            .field("role", &self.role)
            .field("status", &self.status)
            .field("is_temporary_password", &self.is_temporary_password)
            .finish_non_exhaustive()
    }
}

/// New user creation payload; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub contact_number: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub is_temporary_password: bool,
}

/// User update payload
///
/// `None` leaves a column untouched. `profile_image` is doubly optional:
/// `Some(None)` clears the image.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub profile_image: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub is_temporary_password: Option<bool>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UpdateUser {
    /// Apply the changes to an in-memory record, bumping `updated_at`
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(contact_number) = &self.contact_number {
            user.contact_number = Some(contact_number.clone());
        }
        if let Some(profile_image) = &self.profile_image {
            user.profile_image = profile_image.clone();
        }
        if let Some(password_hash) = &self.password_hash {
            user.password_hash = password_hash.clone();
        }
        if let Some(flag) = self.is_temporary_password {
            user.is_temporary_password = flag;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
        if let Some(last_login) = self.last_login {
            user.last_login = Some(last_login);
        }
        user.updated_at = Utc::now();
    }
}

/// Sanitized user, safe to hand to clients
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub profile_image: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub is_temporary_password: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            contact_number: user.contact_number.clone(),
            profile_image: user.profile_image.clone(),
            role: user.role,
            status: user.status,
            is_temporary_password: user.is_temporary_password,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse::from(&user)
    }
}
