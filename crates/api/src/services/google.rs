//! Google sign-in (OAuth 2.0 authorization code flow).
//!
//! # Flow
//!
//! 1. `GET /api/auth/google` redirects to [`GoogleClient::authorization_url`]
//!    with a signed, expiring `state` ([`GoogleClient::issue_state`])
//! 2. Google redirects back to the callback with `code` and `state`
//! 3. The state is verified, the code exchanged for an access token and the
//!    userinfo profile fetched
//! 4. [`link_or_create`] resolves the local account: Google id first, then
//!    email (linking the accounts), then a new customer account

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use authentic_core::{Email, UserRole};

use crate::config::GoogleConfig;
use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};
use crate::services::auth::{AuthError, hash_password};

type HmacSha256 = Hmac<Sha256>;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// How long a sign-in attempt may take between redirect and callback.
const STATE_TTL_MINUTES: i64 = 10;

/// Errors that can occur during Google sign-in.
#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("invalid or expired state")]
    InvalidState,

    #[error("unusable profile: {0}")]
    Profile(String),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// The userinfo fields used for account resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account id.
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Client for Google's OAuth and userinfo endpoints.
#[derive(Clone)]
pub struct GoogleClient {
    inner: Arc<GoogleClientInner>,
}

struct GoogleClientInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    state_key: SecretString,
}

impl GoogleClient {
    /// Create a new client.
    ///
    /// `state_key` signs the `state` parameter; the bearer-token secret is
    /// used in practice.
    #[must_use]
    pub fn new(config: &GoogleConfig, redirect_uri: String, state_key: SecretString) -> Self {
        Self {
            inner: Arc::new(GoogleClientInner {
                client: reqwest::Client::new(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                redirect_uri,
                state_key,
            }),
        }
    }

    /// Consent screen URL for a sign-in attempt carrying `state`.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{AUTHORIZE_URL}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20email%20profile&\
            state={}",
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(&self.inner.redirect_uri),
            urlencoding::encode(state)
        )
    }

    fn state_mac(&self, payload: &str) -> Result<HmacSha256, GoogleError> {
        let mut mac =
            HmacSha256::new_from_slice(self.inner.state_key.expose_secret().as_bytes())
                .map_err(|_| GoogleError::InvalidState)?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    /// Create a signed `state` value valid for ten minutes.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::InvalidState` if the signing key is unusable.
    pub fn issue_state(&self, now: DateTime<Utc>) -> Result<String, GoogleError> {
        let nonce: [u8; 16] = rand::rng().random();
        let expires = (now + Duration::minutes(STATE_TTL_MINUTES)).timestamp();
        let payload = format!("{}.{expires}", hex::encode(nonce));
        let signature = hex::encode(self.state_mac(&payload)?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Check signature and expiry of a `state` returned by Google.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::InvalidState` on any mismatch.
    pub fn verify_state(&self, state: &str, now: DateTime<Utc>) -> Result<(), GoogleError> {
        let (payload, signature) = state.rsplit_once('.').ok_or(GoogleError::InvalidState)?;
        let (_, expires) = payload.split_once('.').ok_or(GoogleError::InvalidState)?;
        let signature = hex::decode(signature).map_err(|_| GoogleError::InvalidState)?;

        self.state_mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| GoogleError::InvalidState)?;

        let expires: i64 = expires.parse().map_err(|_| GoogleError::InvalidState)?;
        if expires <= now.timestamp() {
            return Err(GoogleError::InvalidState);
        }
        Ok(())
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    pub async fn exchange_code(&self, code: &str) -> Result<String, GoogleError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", self.inner.redirect_uri.as_str()),
        ];

        let response = self.inner.client.post(TOKEN_URL).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GoogleError::OAuth(format!("Token exchange failed: {text}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn userinfo(&self, access_token: &str) -> Result<GoogleProfile, GoogleError> {
        let response = self
            .inner
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GoogleError::OAuth(format!("Userinfo request failed: {text}")));
        }

        Ok(response.json().await?)
    }
}

/// Resolve the local account for a Google profile.
///
/// Matches on Google id, then on email (linking the Google id and picture to
/// the existing account), and otherwise creates a customer account with a
/// random placeholder password.
///
/// # Errors
///
/// Returns `GoogleError::Profile` when the profile has no usable email.
pub async fn link_or_create(
    users: &dyn UserRepository,
    profile: &GoogleProfile,
) -> Result<User, GoogleError> {
    if let Some(user) = users.get_by_google_id(&profile.sub).await? {
        return Ok(user);
    }

    let email = profile
        .email
        .as_deref()
        .ok_or_else(|| GoogleError::Profile("no email address".to_owned()))
        .and_then(|e| Email::parse(e).map_err(|e| GoogleError::Profile(e.to_string())))?;

    if let Some(user) = users.get_by_email(&email).await? {
        if user.google_id.is_some() {
            return Ok(user);
        }
        let linked = users
            .link_google(user.id, &profile.sub, profile.picture.as_deref())
            .await?;
        tracing::info!(user_id = %linked.id, "Linked Google account");
        return Ok(linked);
    }

    let suffix: [u8; 8] = rand::rng().random();
    let placeholder = format!("google-oauth-login-{}", hex::encode(suffix));
    let name = profile
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.local_part().to_owned());

    let user = users
        .create(NewUser {
            name,
            email,
            password_hash: hash_password(&placeholder)?,
            role: UserRole::Customer,
            phone: None,
            google_id: Some(profile.sub.clone()),
            image: profile.picture.clone(),
        })
        .await?;
    tracing::info!(user_id = %user.id, "Created account from Google sign-in");
    Ok(user)
}
