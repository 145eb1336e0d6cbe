use actix_web::{web, HttpResponse};

use crate::state::AppState;

/// Prometheus text exposition format.
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

/// Renders every counter recorded in this process: client bootstraps,
/// locale sink writes and per-endpoint requests.
pub async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(PROMETHEUS_TEXT)
        .body(state.telemetry().render_metrics())
}
