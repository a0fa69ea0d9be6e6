//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Database
//! - `ATELIER_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! ## Payment providers (each block optional, all-or-nothing)
//! - `PAYPAL_CLIENT_ID`, `PAYPAL_CLIENT_SECRET` - `PayPal` REST credentials
//! - `PAYPAL_API_BASE` - API host (default: `PayPal` sandbox)
//! - `STRIPE_SECRET_KEY` - Stripe secret key
//! - `STRIPE_API_BASE` - API host (default: <https://api.stripe.com>)
//! - `MOLLIE_API_KEY` - Mollie API key
//! - `MOLLIE_API_BASE` - API host (default: <https://api.mollie.com/v2>)
//!
//! ## Checkout
//! - `ATELIER_CURRENCY` - ISO 4217 currency code (default: EUR)
//! - `ATELIER_RETURN_URL` - Where providers send the payer after approval
//! - `ATELIER_CANCEL_URL` - Where providers send the payer after aborting
//! - `ATELIER_ABANDONMENT_WINDOW_HOURS` - Hours after the follow-up reminder
//!   before an order counts as abandoned (default: 48)
//! - `ATELIER_CHECKOUT_CACHE_TTL_SECS` - Provisional checkout lifetime
//!   (default: 1800)
//! - `ATELIER_CHECKOUT_CACHE_SWEEP_SECS` - Cache sweep period (default: 1800)
//!
//! ## Reminders
//! - `ATELIER_ORDER_URL_BASE` - Base of the order link placed in reminders
//! - `ATELIER_REMINDER_INITIAL_DELAY_SECS` - Default: 60
//! - `ATELIER_REMINDER_FOLLOWUP_DELAY_SECS` - Default: 86400
//! - `ATELIER_REMINDER_POLL_INTERVAL_SECS` - Default: 60
//! - `ATELIER_REMINDER_BATCH_SIZE` - Tasks claimed per tick (default: 50)
//! - `ATELIER_REMINDER_LEASE_SECS` - Claim lease length (default: 300)
//! - `ATELIER_REMINDER_MAX_ATTEMPTS` - Failed sends before a task is
//!   cancelled; `0` retries forever (default: 10)
//!
//! ## Notifications
//! - `NOTIFICATION_WEBHOOK_URL`, `NOTIFICATION_WEBHOOK_KEY` - Mail service
//!   webhook endpoint and shared key
//!
//! ## Logging
//! - `ATELIER_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `RUST_LOG` - `tracing` filter directives

use std::fmt::Display;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

use crate::order::services::{CacheSettings, CheckoutSettings};
use crate::reminder::services::ReminderSettings;
use crate::telemetry::LogFormat;

const DEFAULT_PAYPAL_API_BASE: &str = "https://api-m.sandbox.paypal.com";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_MOLLIE_API_BASE: &str = "https://api.mollie.com/v2";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
    /// A variable is set but cannot be used.
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection URL, when durable storage is configured.
    pub database_url: Option<SecretString>,
    /// `PayPal` credentials, when enabled.
    pub paypal: Option<PaypalConfig>,
    /// Stripe credentials, when enabled.
    pub stripe: Option<StripeConfig>,
    /// Mollie credentials, when enabled.
    pub mollie: Option<MollieConfig>,
    /// Mail service webhook, when enabled.
    pub notification_webhook: Option<WebhookConfig>,
    /// Checkout behaviour.
    pub checkout: CheckoutSettings,
    /// Provisional checkout cache behaviour.
    pub cache: CacheSettings,
    /// Reminder scheduling behaviour.
    pub reminders: ReminderSettings,
    /// Log output format.
    pub log_format: LogFormat,
}

/// `PayPal` REST API configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct PaypalConfig {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: SecretString,
    /// API host, without trailing slash.
    pub api_base: String,
}

impl std::fmt::Debug for PaypalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key.
    pub secret_key: SecretString,
    /// API host, without trailing slash.
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Mollie API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct MollieConfig {
    /// API key.
    pub api_key: SecretString,
    /// API base URL including the version segment.
    pub api_base: String,
}

impl std::fmt::Debug for MollieConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MollieConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Mail service webhook configuration.
///
/// Implements `Debug` manually to redact the shared key.
#[derive(Clone)]
pub struct WebhookConfig {
    /// Endpoint receiving notification payloads.
    pub url: String,
    /// Shared key sent with every request.
    pub api_key: SecretString,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv()` to load a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is malformed or a credential
    /// block is only partially set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; real deployments set variables directly.
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!(error = %err, "no .env file loaded");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is malformed or a credential
    /// block is only partially set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup: &lookup };

        let database_url = env
            .optional("ATELIER_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from);

        Ok(Self {
            database_url,
            paypal: PaypalConfig::from_env(&env)?,
            stripe: StripeConfig::from_env(&env),
            mollie: MollieConfig::from_env(&env),
            notification_webhook: WebhookConfig::from_env(&env)?,
            checkout: checkout_settings(&env)?,
            cache: cache_settings(&env)?,
            reminders: reminder_settings(&env)?,
            log_format: env.parsed_or("ATELIER_LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    /// Returns the database URL or an error naming the missing variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when neither database variable
    /// is set.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("ATELIER_DATABASE_URL".to_owned()))
    }
}

impl PaypalConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let client_id = env.optional("PAYPAL_CLIENT_ID");
        let client_secret = env.optional("PAYPAL_CLIENT_SECRET");

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => Ok(Some(Self {
                client_id: id,
                client_secret: SecretString::from(secret),
                api_base: env.or_default("PAYPAL_API_BASE", DEFAULT_PAYPAL_API_BASE),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "PAYPAL_*".to_owned(),
                "Both PAYPAL_CLIENT_ID and PAYPAL_CLIENT_SECRET must be set together".to_owned(),
            )),
        }
    }
}

impl StripeConfig {
    fn from_env(env: &Env<'_>) -> Option<Self> {
        env.optional("STRIPE_SECRET_KEY").map(|key| Self {
            secret_key: SecretString::from(key),
            api_base: env.or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
        })
    }
}

impl MollieConfig {
    fn from_env(env: &Env<'_>) -> Option<Self> {
        env.optional("MOLLIE_API_KEY").map(|key| Self {
            api_key: SecretString::from(key),
            api_base: env.or_default("MOLLIE_API_BASE", DEFAULT_MOLLIE_API_BASE),
        })
    }
}

impl WebhookConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let url = env.optional("NOTIFICATION_WEBHOOK_URL");
        let api_key = env.optional("NOTIFICATION_WEBHOOK_KEY");

        match (url, api_key) {
            (Some(endpoint), Some(key)) => Ok(Some(Self {
                url: endpoint,
                api_key: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "NOTIFICATION_WEBHOOK_*".to_owned(),
                "Both NOTIFICATION_WEBHOOK_URL and NOTIFICATION_WEBHOOK_KEY must be set together"
                    .to_owned(),
            )),
        }
    }
}

fn checkout_settings(env: &Env<'_>) -> Result<CheckoutSettings, ConfigError> {
    let defaults = CheckoutSettings::default();
    let currency = env.or_default("ATELIER_CURRENCY", &defaults.currency);
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidEnvVar(
            "ATELIER_CURRENCY".to_owned(),
            format!("'{currency}' is not a three-letter currency code"),
        ));
    }
    let abandonment_hours = env.parsed_or(
        "ATELIER_ABANDONMENT_WINDOW_HOURS",
        defaults.abandonment_window.num_hours(),
    )?;

    Ok(CheckoutSettings {
        currency: currency.to_ascii_uppercase(),
        return_url: env.optional("ATELIER_RETURN_URL"),
        cancel_url: env.optional("ATELIER_CANCEL_URL"),
        abandonment_window: chrono::Duration::hours(abandonment_hours),
    })
}

fn cache_settings(env: &Env<'_>) -> Result<CacheSettings, ConfigError> {
    let defaults = CacheSettings::default();
    let ttl_secs = env.parsed_or("ATELIER_CHECKOUT_CACHE_TTL_SECS", defaults.ttl.num_seconds())?;
    let sweep_secs = env.parsed_or(
        "ATELIER_CHECKOUT_CACHE_SWEEP_SECS",
        defaults.sweep_interval.as_secs(),
    )?;

    Ok(CacheSettings {
        ttl: chrono::Duration::seconds(ttl_secs),
        sweep_interval: std::time::Duration::from_secs(sweep_secs),
    })
}

fn reminder_settings(env: &Env<'_>) -> Result<ReminderSettings, ConfigError> {
    let defaults = ReminderSettings::default();
    let initial_secs = env.parsed_or(
        "ATELIER_REMINDER_INITIAL_DELAY_SECS",
        defaults.initial_delay.num_seconds(),
    )?;
    let followup_secs = env.parsed_or(
        "ATELIER_REMINDER_FOLLOWUP_DELAY_SECS",
        defaults.followup_delay.num_seconds(),
    )?;
    let poll_secs = env.parsed_or(
        "ATELIER_REMINDER_POLL_INTERVAL_SECS",
        defaults.poll_interval.as_secs(),
    )?;
    let lease_secs = env.parsed_or(
        "ATELIER_REMINDER_LEASE_SECS",
        defaults.lease_duration.num_seconds(),
    )?;
    let max_attempts = env.parsed_or(
        "ATELIER_REMINDER_MAX_ATTEMPTS",
        defaults.max_attempts.unwrap_or(0),
    )?;

    Ok(ReminderSettings {
        initial_delay: chrono::Duration::seconds(initial_secs),
        followup_delay: chrono::Duration::seconds(followup_secs),
        poll_interval: std::time::Duration::from_secs(poll_secs),
        batch_size: env.parsed_or("ATELIER_REMINDER_BATCH_SIZE", defaults.batch_size)?,
        lease_duration: chrono::Duration::seconds(lease_secs),
        max_attempts: (max_attempts > 0).then_some(max_attempts),
        order_url_base: env.or_default("ATELIER_ORDER_URL_BASE", &defaults.order_url_base),
        auto_start: defaults.auto_start,
    })
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    /// Returns the trimmed value, treating empty values as unset.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_owned())
    }

    fn parsed_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(name).map_or(Ok(default), |raw| {
            raw.parse::<T>()
                .map_err(|err| ConfigError::InvalidEnvVar(name.to_owned(), err.to_string()))
        })
    }
}
