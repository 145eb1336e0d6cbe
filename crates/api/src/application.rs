use actix_web::{middleware::Logger, web, App, HttpServer};
use credit_desk_domain::config::{ApiConfig, ConfigError, Settings};
use credit_desk_domain::locale::Catalog;
use credit_desk_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use credit_desk_vendors::{ConstructionError, HostContext, IdentityClient, PaymentClient};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    handlers::{
        auth_config_handler, change_locale_handler, credit_packs_handler, locale_handler,
        metrics_handler,
    },
    state::AppState,
};

/// Validates configuration, builds the vendor clients and serves the HTTP
/// surface. Any failure before the listener binds aborts startup.
pub async fn run() -> Result<(), BootstrapError> {
    // 1. Load configuration
    let settings = Settings::load_from_env()?;
    let api_config = ApiConfig::load_from_env()?;

    // 2. Telemetry from API_-prefixed variables
    let telemetry_config = TelemetryConfig::from_env("API");
    let telemetry = init_telemetry(&telemetry_config)?;

    // 3. Vendor clients; payments stay off without a secret
    let identity = IdentityClient::from_settings(&settings, &HostContext::from_env())?;
    let payments = build_payments(&settings)?;
    info!(
        project_ref = settings.project_ref(),
        feature_flags = settings.feature_flags().is_some(),
        payments = payments.is_some(),
        "vendor clients ready"
    );

    // 4. Shared state
    let state = AppState::new(identity, payments, default_catalog(), telemetry);

    // 5. Bind and serve
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(routes)
    })
    .bind(api_config.bind_address())?;

    info!(bind_address = api_config.bind_address(), "api listening");
    server.run().await?;

    Ok(())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/credit-packs", web::get().to(credit_packs_handler))
        .route("/api/v1/auth/config", web::get().to(auth_config_handler))
        .route("/api/v1/locale", web::get().to(locale_handler))
        .route("/api/v1/locale", web::put().to(change_locale_handler))
        .route("/metrics", web::get().to(metrics_handler));
}

/// Builds the payment client when `PAYMENTS_SECRET_KEY` is set. Without it
/// the API still serves identity and locale routes.
pub fn build_payments(settings: &Settings) -> Result<Option<PaymentClient>, ConstructionError> {
    if settings.payments_secret_key().is_none() {
        warn!("PAYMENTS_SECRET_KEY not set; credit pack routes disabled");
        return Ok(None);
    }
    PaymentClient::from_settings(settings).map(Some)
}

/// Messages served by the locale endpoints.
pub fn default_catalog() -> Catalog {
    Catalog::default()
        .with_messages("en", [("greeting", "Welcome back"), ("credits", "Credits")])
        .with_messages("fr", [("greeting", "Bon retour"), ("credits", "Crédits")])
        .with_messages("de", [("greeting", "Willkommen zurück"), ("credits", "Guthaben")])
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("vendor client error: {0}")]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
