//! Authentication extractors.
//!
//! Bearer tokens arrive as `Authorization: Bearer <token>`. The token's role
//! claim, not the live account, decides admin access: a promotion or demotion
//! takes effect when the user next obtains a token.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use authentic_core::UserRole;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extractor that requires a valid bearer token for an existing user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(auth: RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", auth.user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth {
    /// The account named by the token.
    pub user: User,
    /// Role claimed by the token at issuance.
    pub role: UserRole,
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let (user, claims) = state.auth().resolve(token).await?;
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self {
            user,
            role: claims.role,
        })
    }
}

/// Extractor that requires a token whose role claim is `admin`.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub RequireAuth);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = RequireAuth::from_request_parts(parts, state).await?;
        if auth.role != UserRole::Admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(auth))
    }
}

/// Extractor that resolves a bearer token when one is present.
///
/// Unlike `RequireAuth`, this never rejects: a missing, invalid or expired
/// token, or one naming a deleted user, yields `None`.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<User>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };

        match state.auth().resolve(token).await {
            Ok((user, _)) => Ok(Self(Some(user))),
            Err(e) => {
                tracing::warn!(error = %e, "Bearer token not accepted, continuing as guest");
                Ok(Self(None))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer"))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
