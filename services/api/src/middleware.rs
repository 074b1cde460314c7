//! Request middleware: authentication, role allow-lists and rate limiting

use std::net::SocketAddr;

use auth::access::{AUTHENTICATION_REQUIRED, bearer_token};
use auth::models::Role;
use auth::AuthContext;
use auth::repositories::UserRepository;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use crate::{error::ApiError, state::AppState};

/// Resolve the bearer token and enforce the route's allow-list
///
/// Used through `from_fn_with_state((state, allowed), authenticate)`. On
/// success the resolved [`AuthContext`] is stored in the request
/// extensions; anonymous callers (empty allow-list, no token) get none.
pub async fn authenticate<R: UserRepository>(
    State((state, allowed)): State<(AppState<R>, &'static [Role])>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = bearer_token(header);

    let context = state.authenticator.resolve(token, allowed).await?;
    if let Some(context) = context {
        req.extensions_mut().insert(context);
    }

    Ok(next.run(req).await)
}

/// The authenticated caller of a handler
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized(AUTHENTICATION_REQUIRED.to_string()))
    }
}

/// Fixed-window rate limit per client address
pub async fn rate_limit<R: UserRepository>(
    State(state): State<AppState<R>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.rate_limiter.is_allowed(&client).await {
        return Err(ApiError::TooManyRequests);
    }

    Ok(next.run(req).await)
}
