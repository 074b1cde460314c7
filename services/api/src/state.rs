//! Application state shared across handlers

use std::sync::Arc;

use auth::jwt::JwtService;
use auth::rate_limiter::{RateLimiter, RateLimiterConfig};
use auth::repositories::UserRepository;
use auth::{AccountService, Authenticator};
use media::Storage;

use crate::config::ServerConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState<R: UserRepository> {
    pub accounts: AccountService<R>,
    pub authenticator: Authenticator<R>,
    pub storage: Storage,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl<R: UserRepository> AppState<R> {
    pub fn new(users: R, jwt: JwtService, storage: Storage, config: ServerConfig) -> Self {
        let rate_limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: config.rate_limit_max_requests(),
            window_seconds: config.rate_limit_window_secs,
        });

        Self {
            accounts: AccountService::new(users.clone(), jwt.clone()),
            authenticator: Authenticator::new(users, jwt),
            storage,
            rate_limiter,
            config: Arc::new(config),
        }
    }
}
