//! Authentication service.
//!
//! Password registration and login over a [`UserRepository`], Argon2id
//! password hashing, and signed bearer tokens ([`token`]).

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tracing::instrument;

use authentic_core::{Email, UserId, UserRole};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Registration input.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'r> {
    pub name: &'r str,
    pub email: &'r str,
    pub password: &'r str,
    pub phone: Option<&'r str>,
}

/// A user together with a freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Authentication service.
///
/// Handles user registration, login, and token resolution.
pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
    tokens: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository, tokens: &'a TokenSigner) -> Self {
        Self { users, tokens }
    }

    /// Register a new customer with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if name, email or password is blank.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration<'_>) -> Result<Session, AuthError> {
        let name = registration.name.trim();
        if name.is_empty() || registration.email.trim().is_empty() || registration.password.is_empty()
        {
            return Err(AuthError::MissingFields(
                "Name, email, and password are required",
            ));
        }

        validate_password(registration.password)?;
        let email = Email::parse(registration.email)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(registration.password)?;
        let user = self
            .users
            .create(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
                role: UserRole::Customer,
                phone: registration
                    .phone
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_owned),
                google_id: None,
                image: None,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Customer registered");
        self.session(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if email or password is blank.
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields("Email and password are required"));
        }

        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        self.session(user)
    }

    /// Issue a token for an already authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn session(&self, user: User) -> Result<Session, AuthError> {
        let token = self.tokens.issue(user.id, user.role, Utc::now())?;
        Ok(Session { user, token })
    }

    /// Verify `token` and load the user it names.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for an invalid or expired token and
    /// `AuthError::UserNotFound` if the user has been deleted since.
    pub async fn resolve(&self, token: &str) -> Result<(User, Claims), AuthError> {
        let claims = self.tokens.verify(token, Utc::now())?;
        let user = self.get_user(claims.sub).await?;
        Ok((user, claims))
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
