//! Accounts, credentials and access control
//!
//! This crate holds the user model, the credential store, password hashing,
//! bearer tokens, and the account lifecycle operations. It has no HTTP
//! dependency: the `api` service binds it to routes.
//!
//! # Example
//!
//! ```no_run
//! use auth::jwt::{JwtConfig, JwtService};
//! use auth::models::LoginRequest;
//! use auth::repositories::PgUserRepository;
//! use auth::service::AccountService;
//! use common::database::{DatabaseConfig, connect_with_retry};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let pool = connect_with_retry(&DatabaseConfig::from_env()?).await;
//!     auth::database::run_migrations(&pool).await?;
//!
//!     let jwt = JwtService::new(JwtConfig::from_env()?);
//!     let accounts = AccountService::new(PgUserRepository::new(pool), jwt);
//!
//!     let session = accounts
//!         .login(LoginRequest {
//!             email: Some("alice@example.com".into()),
//!             password: Some("secret1".into()),
//!         })
//!         .await?;
//!     println!("token: {}", session.token);
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod database;
pub mod error;
pub mod jwt;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod service;
pub mod validation;

pub use access::{AuthContext, Authenticator};
pub use error::{AccountError, AccountResult};
pub use service::AccountService;
