use credit_desk_domain::{config::ConfigError, model::PriceTableError};
use thiserror::Error;

/// Errors raised while building a vendor client. All of them are fatal at
/// startup.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid url `{value}`: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("url `{0}` must use http or https")]
    UnsupportedScheme(String),
    #[error("`{name}` is not a valid header value")]
    InvalidHeader { name: &'static str },
    #[error("price table rejected: {0}")]
    PriceTable(#[from] PriceTableError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}
