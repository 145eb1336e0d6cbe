//! Environment-driven settings shared by the API binary and the vendor
//! bootstraps.

use std::env;

use thiserror::Error;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const OWNER_ID: &str = "OWNER_ID";
pub const FLAGS_API_HOST: &str = "FLAGS_API_HOST";
pub const FLAGS_API_KEY: &str = "FLAGS_API_KEY";
pub const PROJECT_REF: &str = "PROJECT_REF";
pub const IDENTITY_URL: &str = "IDENTITY_URL";
pub const IDENTITY_ANON_KEY: &str = "IDENTITY_ANON_KEY";
pub const PAYMENTS_SECRET_KEY: &str = "PAYMENTS_SECRET_KEY";
pub const API_BIND_ADDRESS: &str = "API_BIND_ADDRESS";

/// Keys whose absence aborts [`Settings`] loading.
pub const REQUIRED_KEYS: [&str; 3] = [PROJECT_REF, IDENTITY_URL, IDENTITY_ANON_KEY];

/// Process-wide settings resolved once at startup. Required keys are
/// guaranteed non-empty; optional keys carry their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    database_url: String,
    owner_id: Option<String>,
    flags_api_host: Option<String>,
    flags_api_key: Option<String>,
    project_ref: String,
    identity_url: String,
    identity_anon_key: String,
    payments_secret_key: Option<String>,
}

impl Settings {
    /// Hydrates `.env` (if present) and reads the process environment.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves every recognized key through `lookup`. The payment secret is
    /// optional here; the payment bootstrap enforces it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: optional_var(&lookup, DATABASE_URL).unwrap_or_default(),
            owner_id: optional_var(&lookup, OWNER_ID),
            flags_api_host: optional_var(&lookup, FLAGS_API_HOST),
            flags_api_key: optional_var(&lookup, FLAGS_API_KEY),
            project_ref: required_var(&lookup, PROJECT_REF)?,
            identity_url: required_var(&lookup, IDENTITY_URL)?,
            identity_anon_key: required_var(&lookup, IDENTITY_ANON_KEY)?,
            payments_secret_key: optional_var(&lookup, PAYMENTS_SECRET_KEY),
        })
    }

    /// Empty when no database is configured.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn flags_api_host(&self) -> Option<&str> {
        self.flags_api_host.as_deref()
    }

    pub fn flags_api_key(&self) -> Option<&str> {
        self.flags_api_key.as_deref()
    }

    /// Feature flags are only usable when both host and key are present.
    pub fn feature_flags(&self) -> Option<(&str, &str)> {
        self.flags_api_host().zip(self.flags_api_key())
    }

    pub fn project_ref(&self) -> &str {
        &self.project_ref
    }

    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    pub fn identity_anon_key(&self) -> &str {
        &self.identity_anon_key
    }

    pub fn payments_secret_key(&self) -> Option<&str> {
        self.payments_secret_key.as_deref()
    }

    /// Returns the payment secret or the error the payment bootstrap must
    /// surface when it is absent.
    pub fn require_payments_secret_key(&self) -> Result<&str, ConfigError> {
        self.payments_secret_key().ok_or(ConfigError::MissingVar {
            key: PAYMENTS_SECRET_KEY,
        })
    }
}

/// HTTP surface configuration, kept apart from [`Settings`] so vendor
/// bootstraps never depend on listener variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    bind_address: String,
}

impl ApiConfig {
    pub const DEFAULT_BIND_ADDRESS: &'static str = "127.0.0.1:8080";

    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;
        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            bind_address: optional_var(&lookup, API_BIND_ADDRESS)
                .unwrap_or_else(|| Self::DEFAULT_BIND_ADDRESS.to_string()),
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }
}

fn required_var<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_var(lookup, key).ok_or(ConfigError::MissingVar { key })
}

fn optional_var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Loads `.env` into the process environment unless
/// `CREDIT_DESK_SKIP_DOTENV` is set. A missing file is not an error.
pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("CREDIT_DESK_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
