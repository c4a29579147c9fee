//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::auth::{AuthService, TokenSigner};
use crate::services::google::GoogleClient;
use crate::services::notifications::{MailSettings, MailTransport, NotificationDispatcher};
use crate::services::orders::OrderService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and owns the store, the token
/// signer, the notification dispatcher and the optional Google client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Store,
    tokens: TokenSigner,
    notifier: NotificationDispatcher,
    google: Option<GoogleClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Starts the notification worker, so this must run inside a tokio
    /// runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `store` - Repositories (Postgres or in-memory)
    /// * `transport` - Mail transport used by the notification worker
    #[must_use]
    pub fn new(config: ApiConfig, store: Store, transport: Arc<dyn MailTransport>) -> Self {
        let tokens = TokenSigner::new(&config.jwt_secret);
        let notifier = NotificationDispatcher::spawn(
            transport,
            MailSettings {
                admin_email: config.admin_email.clone(),
                client_url: config.client_url.clone(),
            },
        );
        let google = config.google.as_ref().map(|google| {
            GoogleClient::new(
                google,
                config.google_callback_url(),
                config.jwt_secret.clone(),
            )
        });

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                notifier,
                google,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the repositories.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Get a reference to the bearer-token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Get a reference to the notification dispatcher.
    #[must_use]
    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.inner.notifier
    }

    /// Google sign-in client, when configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleClient> {
        self.inner.google.as_ref()
    }

    /// Authentication service bound to this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.store.users.as_ref(), &self.inner.tokens)
    }

    /// Order workflow bound to this state.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(
            &self.inner.store,
            &self.inner.notifier,
            self.inner.config.order_total_policy,
        )
    }
}
