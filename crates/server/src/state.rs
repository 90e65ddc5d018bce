//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::cache::CacheRegistry;
use crate::config::ServerConfig;
use crate::services::email::EmailService;
use crate::services::token::TokenService;
use crate::services::verification::VerificationStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to shared
/// resources: configuration, the connection pool, the token service, the
/// verification store, the cache registry, and the mailer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    tokens: TokenService,
    verification: VerificationStore,
    cache: CacheRegistry,
    mailer: EmailService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let tokens = TokenService::new(&config.jwt_secret, config.token_lifetime);
        let mailer = EmailService::new(&config.email)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                verification: VerificationStore::new(),
                cache: CacheRegistry::new(),
                mailer,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the verification store.
    #[must_use]
    pub fn verification(&self) -> &VerificationStore {
        &self.inner.verification
    }

    /// Get a reference to the cache registry.
    #[must_use]
    pub fn cache(&self) -> &CacheRegistry {
        &self.inner.cache
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn mailer(&self) -> &EmailService {
        &self.inner.mailer
    }
}
