//! Identity-provider (sign-in/session) client bootstrap.

use std::env;
use std::fmt;

use credit_desk_domain::config::{ConfigError, Settings, IDENTITY_ANON_KEY, IDENTITY_URL};
use credit_desk_domain::services::telemetry::CLIENTS_BUILT_METRIC;
use metrics::counter;
use reqwest::{
    header::{HeaderMap, AUTHORIZATION},
    Method, RequestBuilder,
};
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::{join_endpoint, parse_base_url, secret_header, ConstructionError};

const AUTH_PATH: &str = "auth/v1/";

/// The runtime the identity client is built in. Only a host that can report
/// a current origin gets redirect options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostContext {
    origin: Option<Url>,
}

impl HostContext {
    /// A context without a current origin (server process, CLI, tests).
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn with_origin(origin: Url) -> Self {
        Self {
            origin: Some(origin),
        }
    }

    /// Reads `PUBLIC_ORIGIN`; unset, empty or unparseable values yield a
    /// headless context.
    pub fn from_env() -> Self {
        env::var("PUBLIC_ORIGIN")
            .ok()
            .and_then(|value| Url::parse(value.trim()).ok())
            .map(Self::with_origin)
            .unwrap_or_default()
    }

    /// Serialized origin (`scheme://host[:port]`) when the host exposes one.
    pub fn origin(&self) -> Option<String> {
        self.origin
            .as_ref()
            .map(|url| url.origin())
            .filter(|origin| origin.is_tuple())
            .map(|origin| origin.ascii_serialization())
    }
}

/// Session handling options handed to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    pub auto_refresh_token: bool,
    pub persist_session: bool,
    pub detect_session_in_url: bool,
}

impl AuthOptions {
    pub fn for_host(host: &HostContext) -> Self {
        Self {
            redirect_to: host.origin(),
            auto_refresh_token: true,
            persist_session: true,
            detect_session_in_url: true,
        }
    }

    pub fn has_redirect(&self) -> bool {
        self.redirect_to.is_some()
    }
}

/// Browser-safe subset of the identity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicIdentityConfig {
    pub url: String,
    pub anon_key: String,
    pub auth: AuthOptions,
}

#[derive(Clone)]
pub struct IdentityClient {
    base_url: Url,
    anon_key: String,
    options: AuthOptions,
    headers: HeaderMap,
    http: reqwest::Client,
}

impl IdentityClient {
    pub fn from_settings(
        settings: &Settings,
        host: &HostContext,
    ) -> Result<Self, ConstructionError> {
        Self::new(
            settings.identity_url(),
            settings.identity_anon_key(),
            AuthOptions::for_host(host),
        )
    }

    pub fn new(
        base_url: &str,
        anon_key: &str,
        options: AuthOptions,
    ) -> Result<Self, ConstructionError> {
        if base_url.trim().is_empty() {
            return Err(ConfigError::MissingVar { key: IDENTITY_URL }.into());
        }
        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(ConfigError::MissingVar {
                key: IDENTITY_ANON_KEY,
            }
            .into());
        }

        let base_url = parse_base_url(base_url)?;
        let mut headers = HeaderMap::new();
        headers.insert("apikey", secret_header("apikey", anon_key)?);
        headers.insert(
            AUTHORIZATION,
            secret_header("authorization", &format!("Bearer {anon_key}"))?,
        );
        let http = reqwest::Client::builder().build()?;

        counter!(CLIENTS_BUILT_METRIC, "client" => "identity").increment(1);
        info!(
            base_url = %base_url,
            redirect_to = options.redirect_to.as_deref().unwrap_or(""),
            "identity client ready"
        );

        Ok(Self {
            base_url,
            anon_key: anon_key.to_owned(),
            options,
            headers,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    pub fn auth_url(&self) -> Result<Url, ConstructionError> {
        join_endpoint(&self.base_url, AUTH_PATH)
    }

    /// Starts a request against the auth API with the project key attached.
    pub fn auth_request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, ConstructionError> {
        let url = join_endpoint(&self.auth_url()?, path)?;
        Ok(self.http.request(method, url).headers(self.headers.clone()))
    }

    pub fn public_config(&self) -> PublicIdentityConfig {
        PublicIdentityConfig {
            url: self.base_url.as_str().trim_end_matches('/').to_owned(),
            anon_key: self.anon_key.clone(),
            auth: self.options.clone(),
        }
    }
}

impl fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url.as_str())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
