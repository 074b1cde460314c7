//! Bearer token resolution and role allow-list enforcement
//!
//! Every request with a token is resolved against a fresh read of the user
//! record, so role and status changes apply on the very next request.
//! Roles are a flat set: a route admits exactly the roles it lists.

use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{AccountError, AccountResult};
use crate::jwt::JwtService;
use crate::models::{Role, User, UserStatus};
use crate::repositories::UserRepository;

pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";
pub const INVALID_TOKEN: &str = "Invalid or expired token";
pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

/// Identity of the caller, produced only by [`Authenticator::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            status: user.status,
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Check a role against an allow-list; an empty list admits everyone
pub fn authorize(role: Role, allowed: &[Role]) -> AccountResult<()> {
    if allowed.is_empty() || allowed.contains(&role) {
        Ok(())
    } else {
        Err(AccountError::Authorization(
            INSUFFICIENT_PERMISSIONS.to_string(),
        ))
    }
}

/// Message for a login or request by a non-active account
pub fn inactive_account_message(status: UserStatus) -> String {
    format!("Account is {}. Please contact administrator.", status)
}

/// Resolves bearer tokens to callers
#[derive(Clone)]
pub struct Authenticator<R: UserRepository> {
    users: R,
    jwt: JwtService,
}

impl<R: UserRepository> Authenticator<R> {
    pub fn new(users: R, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    /// Resolve an optional token against a route's allow-list
    ///
    /// `Ok(None)` means the caller proceeds anonymously, which only happens
    /// when the allow-list is empty.
    pub async fn resolve(
        &self,
        token: Option<&str>,
        allowed: &[Role],
    ) -> AccountResult<Option<AuthContext>> {
        let user = match token {
            Some(token) => self.lookup(token).await?,
            None => None,
        };

        let Some(user) = user else {
            return if allowed.is_empty() {
                Ok(None)
            } else {
                Err(AccountError::Authentication(
                    AUTHENTICATION_REQUIRED.to_string(),
                ))
            };
        };

        if user.status != UserStatus::Active {
            debug!("Rejected request from {} account {}", user.status, user.id);
            return Err(AccountError::Authorization(inactive_account_message(
                user.status,
            )));
        }

        authorize(user.role, allowed)?;

        Ok(Some(AuthContext::from(&user)))
    }

    /// Verify the token and load its user; a deleted user resolves to `None`
    async fn lookup(&self, token: &str) -> AccountResult<Option<User>> {
        let claims = match self.jwt.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                let subject = self.jwt.decode_unverified(token).ok().map(|c| c.id);
                debug!("Token rejected ({}), claimed subject {:?}", e, subject);
                return Err(AccountError::Authentication(INVALID_TOKEN.to_string()));
            }
        };

        self.users.find_by_id(claims.id).await.map_err(|e| {
            error!("User lookup failed during authentication: {}", e);
            AccountError::Database(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{DEFAULT_TOKEN_EXPIRY, JwtConfig};
    use crate::models::{NewUser, UpdateUser};
    use crate::repositories::MemoryUserRepository;

    async fn setup(role: Role) -> (Authenticator<MemoryUserRepository>, MemoryUserRepository, User, String) {
        let repo = MemoryUserRepository::new();
        let jwt = JwtService::new(JwtConfig {
            secret: "access-test".into(),
            token_expiry: DEFAULT_TOKEN_EXPIRY,
        });
        let user = repo
            .create(NewUser {
                name: "Carol".into(),
                email: "carol@example.com".into(),
                password_hash: "hash".into(),
                contact_number: None,
                role,
                status: UserStatus::Active,
                is_temporary_password: false,
            })
            .await
            .unwrap();
        let token = jwt.issue(&user).unwrap();
        (Authenticator::new(repo.clone(), jwt), repo, user, token)
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn allow_list_has_no_hierarchy() {
        assert!(authorize(Role::Manager, &[]).is_ok());
        assert!(authorize(Role::Manager, &[Role::Manager]).is_ok());
        assert!(authorize(Role::Admin, &[Role::Manager]).is_err());
        assert!(authorize(Role::Superadmin, &[Role::User]).is_err());
    }

    #[tokio::test]
    async fn missing_token_depends_on_allow_list() {
        let (auth, _, _, _) = setup(Role::User).await;

        assert_eq!(auth.resolve(None, &[]).await.unwrap(), None);
        let err = auth.resolve(None, &[Role::Admin]).await.unwrap_err();
        assert!(matches!(err, AccountError::Authentication(m) if m == AUTHENTICATION_REQUIRED));
    }

    #[tokio::test]
    async fn invalid_token_is_401_even_on_public_routes() {
        let (auth, _, _, _) = setup(Role::User).await;

        let err = auth.resolve(Some("garbage"), &[]).await.unwrap_err();
        assert!(matches!(err, AccountError::Authentication(m) if m == INVALID_TOKEN));
    }

    #[tokio::test]
    async fn role_is_read_fresh_on_each_request() {
        let (auth, repo, user, token) = setup(Role::User).await;

        let err = auth.resolve(Some(&token), &[Role::Admin]).await.unwrap_err();
        assert!(matches!(err, AccountError::Authorization(_)));

        repo.update(
            user.id,
            UpdateUser {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let ctx = auth
            .resolve(Some(&token), &[Role::Admin])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.role, Role::Admin);
    }

    #[tokio::test]
    async fn deleted_user_counts_as_no_token() {
        let (auth, repo, user, token) = setup(Role::Admin).await;
        repo.delete(user.id).await.unwrap();

        assert_eq!(auth.resolve(Some(&token), &[]).await.unwrap(), None);
        let err = auth.resolve(Some(&token), &[Role::Admin]).await.unwrap_err();
        assert!(matches!(err, AccountError::Authentication(m) if m == AUTHENTICATION_REQUIRED));
    }

    #[tokio::test]
    async fn banned_user_is_forbidden() {
        let (auth, repo, user, token) = setup(Role::User).await;
        repo.update(
            user.id,
            UpdateUser {
                status: Some(UserStatus::Banned),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = auth.resolve(Some(&token), &[]).await.unwrap_err();
        assert!(matches!(err, AccountError::Authorization(m) if m.contains("banned")));
    }
}
