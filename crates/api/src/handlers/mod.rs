pub mod identity;
pub mod locale;
pub mod metrics;
pub mod packs;

pub use identity::auth_config_handler;
pub use locale::{change_locale_handler, locale_handler};
pub use metrics::metrics_handler;
pub use packs::credit_packs_handler;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use credit_desk_domain::locale::LanguageError;
use credit_desk_domain::services::telemetry::API_REQUESTS_METRIC;
use serde::Serialize;
use strum_macros::IntoStaticStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    CreditPacks,
    AuthConfig,
    Locale,
    ChangeLocale,
}

pub(crate) fn record_request(endpoint: Endpoint) {
    let label: &'static str = endpoint.into();
    ::metrics::counter!(API_REQUESTS_METRIC, "endpoint" => label).increment(1);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payments are not configured")]
    PaymentsUnavailable,
    #[error("invalid language: {0}")]
    InvalidLanguage(#[from] LanguageError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::PaymentsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidLanguage(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
