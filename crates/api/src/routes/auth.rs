//! Email/password authentication handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ApiJson, Result};
use crate::middleware::RequireAuth;
use crate::models::{User, UserSummary};
use crate::services::auth::{Registration, Session};
use crate::state::AppState;

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Login form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Response for a successful register or login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserSummary,
}

impl SessionResponse {
    fn new(message: &'static str, session: &Session) -> Self {
        Self {
            message,
            token: session.token.clone(),
            user: UserSummary::from(&session.user),
        }
    }
}

/// Create a customer account and sign it in.
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterForm>,
) -> Result<impl IntoResponse> {
    let session = state
        .auth()
        .register(Registration {
            name: &form.name,
            email: &form.email,
            password: &form.password,
            phone: form.phone.as_deref(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new("User registered successfully", &session)),
    ))
}

/// Sign in with email and password.
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<Json<SessionResponse>> {
    let session = state.auth().login(&form.email, &form.password).await?;
    Ok(Json(SessionResponse::new("Login successful", &session)))
}

/// The signed-in account.
pub async fn me(auth: RequireAuth) -> Json<User> {
    Json(auth.user)
}
