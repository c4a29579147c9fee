//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AUTHENTIC_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `AUTHENTIC_JWT_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `AUTHENTIC_HOST` - Bind address (default: 127.0.0.1)
//! - `AUTHENTIC_PORT` - Listen port (default: 5000)
//! - `AUTHENTIC_CLIENT_URL` - Public storefront client origin (default: <http://localhost:5173>)
//! - `AUTHENTIC_BASE_URL` - Public URL of this API (default: <http://localhost:5000>)
//! - `AUTHENTIC_ADMIN_EMAIL` - Mailbox receiving new-order alerts
//! - `AUTHENTIC_ORDER_TOTAL_POLICY` - `trust` (default) or `enforce`
//! - `AUTHENTIC_RATE_LIMIT` - Rate limit auth endpoints per IP (default: true)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Mail relay
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` - Google sign-in
//! - `SEED_ADMIN_EMAIL`, `SEED_ADMIN_NAME`, `SEED_ADMIN_PASSWORD` - Bootstrap admin account
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use authentic_core::Email;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: &str = "587";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How the server treats a client-submitted order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalPolicy {
    /// Store the client total; log a warning when it disagrees with the items.
    #[default]
    Trust,
    /// Reject orders whose total disagrees with the items.
    Enforce,
}

impl FromStr for TotalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" => Ok(Self::Trust),
            "enforce" => Ok(Self::Enforce),
            other => Err(format!("expected 'trust' or 'enforce', got '{other}'")),
        }
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing secret
    pub jwt_secret: SecretString,
    /// Public origin of the storefront client (links and OAuth redirects)
    pub client_url: String,
    /// Public URL of this API (OAuth callback)
    pub base_url: String,
    /// Mailbox that receives new-order alerts
    pub admin_email: Option<Email>,
    /// Order total verification policy
    pub order_total_policy: TotalPolicy,
    /// Whether auth endpoints are rate limited
    pub rate_limit: bool,
    /// SMTP relay; `None` disables outgoing mail
    pub email: Option<EmailConfig>,
    /// Google sign-in; `None` disables the Google routes
    pub google: Option<GoogleConfig>,
    /// Bootstrap admin account created at startup
    pub seed_admin: Option<SeedAdminConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 - 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry performance traces sample rate (0.0 - 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// SMTP relay configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
    /// Sender mailbox, e.g. `Authentic Shop <shop@authentic-ctg.com>`
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Google OAuth client configuration.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Bootstrap admin account.
#[derive(Clone)]
pub struct SeedAdminConfig {
    pub email: Email,
    pub name: String,
    pub password: SecretString,
}

impl std::fmt::Debug for SeedAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdminConfig")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("AUTHENTIC_DATABASE_URL")?;
        let host = parse_env("AUTHENTIC_HOST", "127.0.0.1")?;
        let port = parse_env("AUTHENTIC_PORT", "5000")?;
        let jwt_secret = get_validated_secret("AUTHENTIC_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "AUTHENTIC_JWT_SECRET")?;

        let client_url = trim_trailing_slash(get_env_or_default(
            "AUTHENTIC_CLIENT_URL",
            "http://localhost:5173",
        ));
        let base_url = trim_trailing_slash(get_env_or_default(
            "AUTHENTIC_BASE_URL",
            "http://localhost:5000",
        ));
        let admin_email = get_optional_env("AUTHENTIC_ADMIN_EMAIL")
            .map(|raw| {
                Email::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("AUTHENTIC_ADMIN_EMAIL".to_string(), e.to_string())
                })
            })
            .transpose()?;
        let order_total_policy = parse_env("AUTHENTIC_ORDER_TOTAL_POLICY", "trust")?;
        let rate_limit = parse_env("AUTHENTIC_RATE_LIMIT", "true")?;

        let email = EmailConfig::from_env()?;
        let google = GoogleConfig::from_env();
        let seed_admin = SeedAdminConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_env("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?;

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            client_url,
            base_url,
            admin_email,
            order_total_policy,
            rate_limit,
            email,
            google,
            seed_admin,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Callback URL registered with Google.
    #[must_use]
    pub fn google_callback_url(&self) -> String {
        format!("{}/api/auth/google/callback", self.base_url)
    }
}

impl EmailConfig {
    /// Load the relay settings.
    ///
    /// Returns `Ok(None)` when the username or password is missing so the
    /// server runs with mail disabled instead of refusing to start.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(smtp_username), Some(smtp_password)) = (
            get_optional_env("SMTP_USERNAME"),
            get_optional_env("SMTP_PASSWORD"),
        ) else {
            return Ok(None);
        };

        let from_address = get_optional_env("EMAIL_FROM")
            .unwrap_or_else(|| format!("Authentic Shop <{smtp_username}>"));

        Ok(Some(Self {
            smtp_host: get_env_or_default("SMTP_HOST", DEFAULT_SMTP_HOST),
            smtp_port: parse_env("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            smtp_username,
            smtp_password: SecretString::from(smtp_password),
            from_address,
        }))
    }
}

impl GoogleConfig {
    fn from_env() -> Option<Self> {
        let client_id = get_optional_env("GOOGLE_CLIENT_ID")?;
        let client_secret = get_optional_env("GOOGLE_CLIENT_SECRET")?;
        Some(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
        })
    }
}

impl SeedAdminConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(email), Some(password)) = (
            get_optional_env("SEED_ADMIN_EMAIL"),
            get_optional_env("SEED_ADMIN_PASSWORD"),
        ) else {
            return Ok(None);
        };

        let email = Email::parse(&email).map_err(|e| {
            ConfigError::InvalidEnvVar("SEED_ADMIN_EMAIL".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            email,
            name: get_env_or_default("SEED_ADMIN_NAME", "Admin"),
            password: SecretString::from(password),
        }))
    }

    /// Load only the bootstrap admin settings (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `SEED_ADMIN_EMAIL` is malformed.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::from_env()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable; blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// Validate that the signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_jwt_secret_length() {
        let short = SecretString::from("short");
        assert!(validate_jwt_secret(&short, "TEST_JWT").is_err());
        let long = SecretString::from("a".repeat(32));
        assert!(validate_jwt_secret(&long, "TEST_JWT").is_ok());
    }

    #[test]
    fn test_total_policy_parse() {
        assert_eq!("trust".parse::<TotalPolicy>().unwrap(), TotalPolicy::Trust);
        assert_eq!(" Enforce ".parse::<TotalPolicy>().unwrap(), TotalPolicy::Enforce);
        assert!("strict".parse::<TotalPolicy>().is_err());
    }

    #[test]
    fn test_trim_trailing_slash() {
        assert_eq!(
            trim_trailing_slash("http://localhost:5173//".to_string()),
            "http://localhost:5173"
        );
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_username: "shop@authentic-ctg.com".to_string(),
            smtp_password: SecretString::from("app-password-value"),
            from_address: "Authentic Shop <shop@authentic-ctg.com>".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.gmail.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("app-password-value"));
    }

    #[test]
    fn test_google_config_debug_redacts_secret() {
        let config = GoogleConfig {
            client_id: "client-id.apps.googleusercontent.com".to_string(),
            client_secret: SecretString::from("gocspx-very-private"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("client-id.apps.googleusercontent.com"));
        assert!(!debug_output.contains("gocspx-very-private"));
    }
}
