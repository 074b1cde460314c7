//! Account lifecycle operations
//!
//! [`AccountService`] owns every credential write. Callers are expected to
//! have passed route-level access control already; operations here only
//! validate their own input and the state of the store.

use chrono::Utc;
use common::error::DatabaseError;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{AccountError, AccountResult};
use crate::jwt::JwtService;
use crate::models::{
    BulkUpdateRequest, CreateStaffRequest, LoginRequest, NewUser, Page, Pagination,
    RegisterRequest, Role, UpdatePasswordRequest, UpdateProfileRequest, UpdateUser, User,
    UserQuery, UserResponse, UserStatus,
};
use crate::password::{
    generate_temporary_password, hash_password_async, verify_against_dummy, verify_password_async,
};
use crate::repositories::UserRepository;
use crate::{access, validation};

pub const SUPERADMIN_EMAIL: &str = "super_admin@root.com";
pub const SUPERADMIN_NAME: &str = "Super Admin";
pub const SUPERADMIN_CONTACT: &str = "1234567890";

pub const STAFF_INSTRUCTIONS: &str =
    "Share this temporary password with the staff member. They should change it on first login.";

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/";

/// Token plus sanitized user, returned by register and login
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: UserResponse,
}

/// A freshly provisioned staff account
///
/// `temporary_password` exists only here; the store keeps its hash.
#[derive(Debug, Clone)]
pub struct StaffAccount {
    pub user: UserResponse,
    pub temporary_password: String,
}

/// Parse a user id supplied by a client
pub fn parse_user_id(raw: &str) -> AccountResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AccountError::validation(format!("Invalid user id: {}", raw)))
}

/// Placeholder avatar for a display name
pub fn avatar_url(name: &str) -> String {
    match Url::parse_with_params(
        AVATAR_BASE_URL,
        &[
            ("name", name),
            ("background", "e53e3e"),
            ("color", "fff"),
            ("size", "256"),
        ],
    ) {
        Ok(url) => url.into(),
        Err(_) => AVATAR_BASE_URL.to_string(),
    }
}

/// Treat absent and blank strings alike
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct AccountService<R: UserRepository> {
    users: R,
    jwt: JwtService,
}

impl<R: UserRepository> AccountService<R> {
    pub fn new(users: R, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    pub fn users(&self) -> &R {
        &self.users
    }

    async fn load(&self, id: Uuid) -> AccountResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(AccountError::not_found)
    }

    async fn apply(&self, id: Uuid, changes: UpdateUser) -> AccountResult<User> {
        self.users
            .update(id, changes)
            .await?
            .ok_or_else(AccountError::not_found)
    }

    /// Self-registration: role `user`, status `active`
    pub async fn register(&self, request: RegisterRequest) -> AccountResult<AuthSession> {
        let (Some(name), Some(email), Some(password)) = (
            present(request.name),
            present(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AccountError::validation(
                "Name, email, and password are required",
            ));
        };
        let contact_number = present(request.contact_number);

        validation::validate_name(&name).map_err(AccountError::Validation)?;
        validation::validate_email(&email).map_err(AccountError::Validation)?;
        validation::validate_password(&password).map_err(AccountError::Validation)?;
        if let Some(contact) = &contact_number {
            validation::validate_contact_number(contact).map_err(AccountError::Validation)?;
        }

        let email = validation::normalize_email(&email);
        const TAKEN: &str = "User already exists with this email";
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::Conflict(TAKEN.to_string()));
        }

        let password_hash = hash_password_async(password).await?;
        let user = self
            .users
            .create(NewUser {
                name,
                email,
                password_hash,
                contact_number,
                role: Role::User,
                status: UserStatus::Active,
                is_temporary_password: false,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => AccountError::Conflict(TAKEN.to_string()),
                other => other.into(),
            })?;

        info!("Registered user {}", user.id);
        let token = self.jwt.issue(&user)?;
        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    /// Unknown email and wrong password fail identically
    pub async fn login(&self, request: LoginRequest) -> AccountResult<AuthSession> {
        let (Some(email), Some(password)) = (
            present(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AccountError::validation("Email and password are required"));
        };

        let email = validation::normalize_email(&email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            verify_against_dummy(password).await;
            info!("Login rejected: unknown account");
            return Err(AccountError::Authentication(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password_async(password, user.password_hash.clone()).await {
            info!("Login rejected for {}: wrong password", user.id);
            return Err(AccountError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        if user.status != UserStatus::Active {
            info!("Login rejected for {}: account is {}", user.id, user.status);
            return Err(AccountError::Authorization(
                access::inactive_account_message(user.status),
            ));
        }

        let user = self
            .apply(
                user.id,
                UpdateUser {
                    last_login: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!("User {} logged in", user.id);
        let token = self.jwt.issue(&user)?;
        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    /// Provision an account with a one-time temporary password
    pub async fn create_staff(&self, request: CreateStaffRequest) -> AccountResult<StaffAccount> {
        let (Some(name), Some(email), Some(contact_number)) = (
            present(request.name),
            present(request.email),
            present(request.contact_number),
        ) else {
            return Err(AccountError::validation(
                "Name, email, and contact number are required",
            ));
        };

        let role = match present(request.role) {
            Some(role) => role
                .parse::<Role>()
                .map_err(|_| AccountError::validation("Invalid role specified"))?,
            None => Role::Staff,
        };

        validation::validate_name(&name).map_err(AccountError::Validation)?;
        validation::validate_email(&email).map_err(AccountError::Validation)?;
        validation::validate_contact_number(&contact_number).map_err(AccountError::Validation)?;

        let email = validation::normalize_email(&email);
        const EMAIL_TAKEN: &str = "Email already registered";
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::Conflict(EMAIL_TAKEN.to_string()));
        }
        if self
            .users
            .find_by_contact_number(&contact_number)
            .await?
            .is_some()
        {
            return Err(AccountError::Conflict(
                "Contact number already registered".to_string(),
            ));
        }

        let temporary_password = generate_temporary_password();
        let password_hash = hash_password_async(temporary_password.clone()).await?;

        let user = self
            .users
            .create(NewUser {
                name,
                email,
                password_hash,
                contact_number: Some(contact_number),
                role,
                status: UserStatus::Active,
                is_temporary_password: true,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(_) => {
                    AccountError::Conflict(EMAIL_TAKEN.to_string())
                }
                other => other.into(),
            })?;

        info!("Provisioned {} account {}", user.role, user.id);
        Ok(StaffAccount {
            user: user.into(),
            temporary_password,
        })
    }

    pub async fn profile(&self, user_id: Uuid) -> AccountResult<UserResponse> {
        Ok(self.load(user_id).await?.into())
    }

    /// Update name and contact number of the caller's own record
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> AccountResult<UserResponse> {
        let current = self.load(user_id).await?;

        if let Some(email) = present(request.email) {
            if validation::normalize_email(&email) != current.email {
                return Err(AccountError::validation("Email address cannot be changed"));
            }
        }

        let name = present(request.name);
        if let Some(name) = &name {
            validation::validate_name(name).map_err(AccountError::Validation)?;
        }

        let contact_number = present(request.contact_number);
        if let Some(contact) = &contact_number {
            validation::validate_contact_number(contact).map_err(AccountError::Validation)?;
            if let Some(holder) = self.users.find_by_contact_number(contact).await? {
                if holder.id != user_id {
                    return Err(AccountError::Conflict(
                        "Contact number already registered".to_string(),
                    ));
                }
            }
        }

        let user = self
            .apply(
                user_id,
                UpdateUser {
                    name,
                    contact_number,
                    ..Default::default()
                },
            )
            .await?;
        Ok(user.into())
    }

    /// Replace the password and clear the temporary flag
    pub async fn update_password(
        &self,
        user_id: Uuid,
        request: UpdatePasswordRequest,
    ) -> AccountResult<()> {
        let (Some(current_password), Some(new_password)) = (
            request.current_password.filter(|p| !p.is_empty()),
            request.new_password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AccountError::validation(
                "Current password and new password are required",
            ));
        };

        if new_password.chars().count() < validation::MIN_PASSWORD_LENGTH {
            return Err(AccountError::validation(format!(
                "New password must be at least {} characters",
                validation::MIN_PASSWORD_LENGTH
            )));
        }

        let user = self.load(user_id).await?;
        if !verify_password_async(current_password, user.password_hash).await {
            return Err(AccountError::Authentication(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = hash_password_async(new_password).await?;
        self.apply(
            user_id,
            UpdateUser {
                password_hash: Some(password_hash),
                is_temporary_password: Some(false),
                ..Default::default()
            },
        )
        .await?;

        info!("User {} changed password", user_id);
        Ok(())
    }

    pub async fn update_status(
        &self,
        user_id: Uuid,
        status: Option<String>,
    ) -> AccountResult<UserResponse> {
        let status = status
            .and_then(|s| s.parse::<UserStatus>().ok())
            .ok_or_else(|| AccountError::validation("Valid status is required"))?;

        let user = self
            .apply(
                user_id,
                UpdateUser {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;

        info!("User {} status set to {}", user_id, status);
        Ok(user.into())
    }

    pub async fn update_role(
        &self,
        user_id: Uuid,
        role: Option<String>,
    ) -> AccountResult<UserResponse> {
        let role = role
            .and_then(|r| r.parse::<Role>().ok())
            .ok_or_else(|| AccountError::validation("Valid role is required"))?;

        let user = self
            .apply(
                user_id,
                UpdateUser {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await?;

        info!("User {} role set to {}", user_id, role);
        Ok(user.into())
    }

    /// Returns the number of records that actually changed
    pub async fn bulk_update(&self, request: BulkUpdateRequest) -> AccountResult<u64> {
        let raw_ids = request.user_ids.unwrap_or_default();
        if raw_ids.is_empty() {
            return Err(AccountError::validation("User IDs array is required"));
        }
        let ids = raw_ids
            .iter()
            .map(|id| parse_user_id(id))
            .collect::<AccountResult<Vec<_>>>()?;

        // Unknown values are dropped rather than rejected.
        let status = request.status.and_then(|s| s.parse::<UserStatus>().ok());
        let role = request.role.and_then(|r| r.parse::<Role>().ok());
        if status.is_none() && role.is_none() {
            return Err(AccountError::validation(
                "Either status or role must be provided for update",
            ));
        }

        let modified = self.users.bulk_update(&ids, status, role).await?;
        info!(
            "Bulk update over {} ids modified {} users",
            ids.len(),
            modified
        );
        Ok(modified)
    }

    /// Permanent removal
    pub async fn delete_user(&self, user_id: Uuid) -> AccountResult<()> {
        if !self.users.delete(user_id).await? {
            return Err(AccountError::not_found());
        }
        info!("Deleted user {}", user_id);
        Ok(())
    }

    pub async fn get_user(&self, user_id: Uuid) -> AccountResult<UserResponse> {
        Ok(self.load(user_id).await?.into())
    }

    pub async fn list_users(&self, query: &UserQuery) -> AccountResult<Page<UserResponse>> {
        let (users, total) = self.users.list(query).await?;
        Ok(Page {
            items: users.into_iter().map(UserResponse::from).collect(),
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    /// Store a profile image reference, or clear it with `None`
    pub async fn set_profile_image(
        &self,
        user_id: Uuid,
        reference: Option<String>,
    ) -> AccountResult<UserResponse> {
        let user = self
            .apply(
                user_id,
                UpdateUser {
                    profile_image: Some(reference),
                    ..Default::default()
                },
            )
            .await?;
        Ok(user.into())
    }

    /// Point the profile image at a generated avatar of the user's name
    pub async fn assign_avatar(&self, user_id: Uuid) -> AccountResult<UserResponse> {
        let user = self.load(user_id).await?;
        self.set_profile_image(user_id, Some(avatar_url(&user.name)))
            .await
    }

    /// Create the well-known superadmin if absent; returns whether it was created
    ///
    /// An existing record is left untouched, whatever its state.
    pub async fn bootstrap_superadmin(&self, password: &str) -> AccountResult<bool> {
        if self.users.find_by_email(SUPERADMIN_EMAIL).await?.is_some() {
            info!("Super admin user already exists");
            return Ok(false);
        }

        if password.is_empty() {
            warn!("Super admin password is empty");
        }

        let password_hash = hash_password_async(password.to_string()).await?;
        let user = self
            .users
            .create(NewUser {
                name: SUPERADMIN_NAME.to_string(),
                email: SUPERADMIN_EMAIL.to_string(),
                password_hash,
                contact_number: Some(SUPERADMIN_CONTACT.to_string()),
                role: Role::Superadmin,
                status: UserStatus::Active,
                is_temporary_password: false,
            })
            .await?;

        info!("Super admin user created: {}", user.id);
        Ok(true)
    }
}
