//! Domain-level building blocks shared by the API binary and the vendor
//! client bootstraps: environment settings, the credit-pack price table,
//! language preference persistence and telemetry wiring.

pub mod config;
pub mod locale;
pub mod model;
pub mod services;

pub use config::{ApiConfig, ConfigError, Settings};
pub use model::{PriceEntry, CREDIT_PACKS};
