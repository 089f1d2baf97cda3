//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_API_URL` - Base URL of the storefront API
//!
//! ## Optional
//! - `SHOPFRONT_REQUEST_TIMEOUT_SECS` - Timeout for every remote call (default: 10)
//! - `SHOPFRONT_STORAGE_PATH` - Durable storage file (default: .shopfront/storage.json)
//! - `SHOPFRONT_TOKEN_STORAGE_KEY` - Durable storage key for the credential (default: authToken)
//! - `SHOPFRONT_TOKEN_COOKIE` - Cookie carrying the credential (default: `auth_token`)
//! - `SHOPFRONT_TOKEN_QUERY_PARAM` - One-time federated login parameter (default: token)
//! - `SHOPFRONT_DEFAULT_ROUTE` - Where the route guard sends rejected navigations (default: /)
//! - `SHOPFRONT_CART_SYNC` - `optimistic` or `refetch` (default: optimistic)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How the cart store reconciles a newly added product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartSyncPolicy {
    /// Insert a placeholder line (price pending) and wait for the next full fetch.
    #[default]
    Optimistic,
    /// Re-fetch the whole cart after every successful add.
    RefetchOnAdd,
}

impl FromStr for CartSyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optimistic" => Ok(Self::Optimistic),
            "refetch" => Ok(Self::RefetchOnAdd),
            _ => Err(format!("expected 'optimistic' or 'refetch', got '{s}'")),
        }
    }
}

/// Names of the places a credential can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSources {
    /// Durable storage key.
    pub storage_key: String,
    /// Readable cookie name.
    pub cookie_name: String,
    /// Query parameter used for federated login handoff.
    pub query_param: String,
}

impl Default for TokenSources {
    fn default() -> Self {
        Self {
            storage_key: "authToken".to_string(),
            cookie_name: "auth_token".to_string(),
            query_param: "token".to_string(),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the storefront API
    pub api_url: Url,
    /// Upper bound for every remote call
    pub request_timeout: Duration,
    /// File backing durable storage
    pub storage_path: PathBuf,
    /// Credential source names
    pub tokens: TokenSources,
    /// Route the guard falls back to
    pub default_route: String,
    /// Cart reconciliation policy
    pub cart_sync: CartSyncPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// A configuration with defaults for everything but the API URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_path: PathBuf::from(".shopfront/storage.json"),
            tokens: TokenSources::default(),
            default_route: "/".to_string(),
            cart_sync: CartSyncPolicy::default(),
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let api_url = env.required("SHOPFRONT_API_URL")?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPFRONT_API_URL".to_string(), e.to_string())
        })?;

        let timeout_secs = env.parsed::<u64>(
            "SHOPFRONT_REQUEST_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_REQUEST_TIMEOUT_SECS".to_string(),
                "must be at least 1 second".to_string(),
            ));
        }

        let defaults = TokenSources::default();
        let tokens = TokenSources {
            storage_key: env.or_default("SHOPFRONT_TOKEN_STORAGE_KEY", &defaults.storage_key),
            cookie_name: env.or_default("SHOPFRONT_TOKEN_COOKIE", &defaults.cookie_name),
            query_param: env.or_default("SHOPFRONT_TOKEN_QUERY_PARAM", &defaults.query_param),
        };

        let cart_sync = env
            .optional("SHOPFRONT_CART_SYNC")
            .map(|value| {
                value
                    .parse::<CartSyncPolicy>()
                    .map_err(|e| ConfigError::InvalidEnvVar("SHOPFRONT_CART_SYNC".to_string(), e))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            api_url,
            request_timeout: Duration::from_secs(timeout_secs),
            storage_path: PathBuf::from(
                env.or_default("SHOPFRONT_STORAGE_PATH", ".shopfront/storage.json"),
            ),
            tokens,
            default_route: env.or_default("SHOPFRONT_DEFAULT_ROUTE", "/"),
            cart_sync,
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get a variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}
