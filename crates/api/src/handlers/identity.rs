use actix_web::{web, HttpResponse};

use crate::state::AppState;

use super::{record_request, Endpoint};

/// Identity options a browser client needs to talk to the provider itself.
pub async fn auth_config_handler(state: web::Data<AppState>) -> HttpResponse {
    record_request(Endpoint::AuthConfig);
    HttpResponse::Ok().json(state.identity().public_config())
}
