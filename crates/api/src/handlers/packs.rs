use actix_web::{web, HttpResponse};
use credit_desk_domain::model::PriceEntry;
use serde::Serialize;

use crate::state::AppState;

use super::{record_request, ApiError, Endpoint};

#[derive(Debug, Serialize)]
pub struct CreditPacksResponse {
    pub api_version: &'static str,
    pub packs: &'static [PriceEntry],
}

/// 503 when the process started without a payment secret.
pub async fn credit_packs_handler(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    record_request(Endpoint::CreditPacks);
    let payments = state.payments().ok_or(ApiError::PaymentsUnavailable)?;
    Ok(HttpResponse::Ok().json(CreditPacksResponse {
        api_version: payments.api_version(),
        packs: payments.credit_packs(),
    }))
}
