//! Google sign-in handlers.
//!
//! The callback hands the bearer token to the storefront client as a query
//! parameter on `/login`, so it ends up in browser history. The client is
//! expected to move it into storage and replace the URL.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::google::{GoogleClient, GoogleError, link_or_create};
use crate::state::AppState;

/// Query parameters Google appends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn client(state: &AppState) -> Result<&GoogleClient> {
    state
        .google()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))
}

/// Redirect to Google's consent screen.
pub async fn login(State(state): State<AppState>) -> Result<Redirect> {
    let google = client(&state)?;
    let oauth_state = google
        .issue_state(Utc::now())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Redirect::to(&google.authorization_url(&oauth_state)))
}

/// Finish Google sign-in and send the browser back to the storefront.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let google = client(&state)?;
    let login_url = format!("{}/login", state.config().client_url);

    match complete_sign_in(&state, google, params).await {
        Ok(query) => Ok(Redirect::to(&format!("{login_url}?{query}"))),
        Err(e) => {
            tracing::warn!(error = %e, "Google sign-in failed");
            Ok(Redirect::to(&format!("{login_url}?error=google_failed")))
        }
    }
}

async fn complete_sign_in(
    state: &AppState,
    google: &GoogleClient,
    params: CallbackParams,
) -> std::result::Result<String, GoogleError> {
    if let Some(error) = params.error {
        return Err(GoogleError::OAuth(error));
    }
    google.verify_state(params.state.as_deref().unwrap_or_default(), Utc::now())?;
    let code = params
        .code
        .ok_or_else(|| GoogleError::OAuth("missing authorization code".to_owned()))?;

    let access_token = google.exchange_code(&code).await?;
    let profile = google.userinfo(&access_token).await?;
    let user = link_or_create(state.store().users.as_ref(), &profile).await?;
    let session = state.auth().session(user)?;
    tracing::info!(user_id = %session.user.id, "Google sign-in completed");

    Ok(format!(
        "token={}&role={}&name={}&email={}&image={}",
        urlencoding::encode(&session.token),
        session.user.role,
        urlencoding::encode(&session.user.name),
        urlencoding::encode(session.user.email.as_str()),
        urlencoding::encode(session.user.image.as_deref().unwrap_or_default()),
    ))
}
