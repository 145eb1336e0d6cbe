use std::sync::Arc;

use credit_desk_domain::locale::Catalog;
use credit_desk_domain::services::telemetry::TelemetryGuard;
use credit_desk_vendors::{IdentityClient, PaymentClient};

/// Everything handlers need, constructed once at startup and injected
/// through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    identity: IdentityClient,
    payments: Option<PaymentClient>,
    catalog: Arc<Catalog>,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(
        identity: IdentityClient,
        payments: Option<PaymentClient>,
        catalog: Catalog,
        telemetry: TelemetryGuard,
    ) -> Self {
        Self {
            identity,
            payments,
            catalog: Arc::new(catalog),
            telemetry,
        }
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    /// `None` when no payment secret was configured.
    pub fn payments(&self) -> Option<&PaymentClient> {
        self.payments.as_ref()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}
