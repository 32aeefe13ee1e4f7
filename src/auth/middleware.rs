// Request extractors for protected routes

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{error::AuthError, models::Role, token::IdentityVerifier};

/// Authenticated caller, resolved from the bearer credential
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!(
            "Authorization header missing 'Bearer ' prefix for endpoint: {}",
            parts.uri.path()
        );
        AuthError::InvalidToken
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn IdentityVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let verifier = Arc::<dyn IdentityVerifier>::from_ref(state);
        let identity = verifier.verify(token)?;

        Ok(AuthenticatedUser {
            user_id: identity.user_id,
            role: identity.role,
        })
    }
}

/// Caller holding the admin role
///
/// Rejects with 403 when the credential is valid but carries another role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<dyn IdentityVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(
                "Authorization failed: user_id={}, role={}, endpoint={}",
                user.user_id,
                user.role,
                parts.uri.path()
            );
            return Err(AuthError::InsufficientPermissions {
                required: Role::Admin,
                actual: user.role,
            });
        }
        debug!("Admin access granted: user_id={}", user.user_id);
        Ok(AdminUser(user))
    }
}
