//! Payment-provider client bootstrap plus the locally pinned credit packs.

use std::fmt;

use credit_desk_domain::config::{ConfigError, Settings, PAYMENTS_SECRET_KEY};
use credit_desk_domain::model::{validate_price_table, PriceEntry, CREDIT_PACKS};
use credit_desk_domain::services::telemetry::CLIENTS_BUILT_METRIC;
use metrics::counter;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Method, RequestBuilder,
};
use tracing::info;
use url::Url;

use crate::{join_endpoint, parse_base_url, secret_header, ConstructionError};

/// API version every request is pinned to.
pub const PAYMENTS_API_VERSION: &str = "2024-06-20";
pub const DEFAULT_PAYMENTS_API_BASE: &str = "https://api.stripe.com/v1/";

const VERSION_HEADER: &str = "stripe-version";

#[derive(Clone)]
pub struct PaymentClient {
    base_url: Url,
    live_mode: bool,
    headers: HeaderMap,
    http: reqwest::Client,
    credit_packs: &'static [PriceEntry],
}

impl PaymentClient {
    /// Builds the client from `PAYMENTS_SECRET_KEY`. A missing secret fails
    /// here, before any request can be issued.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConstructionError> {
        Self::new(settings.require_payments_secret_key()?)
    }

    pub fn new(secret_key: &str) -> Result<Self, ConstructionError> {
        Self::with_base_url(secret_key, DEFAULT_PAYMENTS_API_BASE)
    }

    pub fn with_base_url(secret_key: &str, base_url: &str) -> Result<Self, ConstructionError> {
        let secret_key = secret_key.trim();
        if secret_key.is_empty() {
            return Err(ConfigError::MissingVar {
                key: PAYMENTS_SECRET_KEY,
            }
            .into());
        }
        validate_price_table(&CREDIT_PACKS)?;

        let base_url = parse_base_url(base_url)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            secret_header("authorization", &format!("Bearer {secret_key}"))?,
        );
        headers.insert(
            VERSION_HEADER,
            HeaderValue::from_static(PAYMENTS_API_VERSION),
        );
        let http = reqwest::Client::builder().build()?;
        let live_mode = secret_key.starts_with("sk_live_");

        counter!(CLIENTS_BUILT_METRIC, "client" => "payments").increment(1);
        info!(
            base_url = %base_url,
            api_version = PAYMENTS_API_VERSION,
            live_mode,
            "payment client ready"
        );

        Ok(Self {
            base_url,
            live_mode,
            headers,
            http,
            credit_packs: &CREDIT_PACKS,
        })
    }

    pub fn api_version(&self) -> &'static str {
        PAYMENTS_API_VERSION
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_live_mode(&self) -> bool {
        self.live_mode
    }

    pub fn credit_packs(&self) -> &'static [PriceEntry] {
        self.credit_packs
    }

    /// Starts an authenticated, version-pinned request against the provider.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ConstructionError> {
        let url = join_endpoint(&self.base_url, path)?;
        Ok(self.http.request(method, url).headers(self.headers.clone()))
    }
}

impl fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &PAYMENTS_API_VERSION)
            .field("live_mode", &self.live_mode)
            .finish_non_exhaustive()
    }
}
