use actix_web::{http::StatusCode, test, web, App};
use credit_desk_domain::config::Settings;
use credit_desk_domain::model::CREDIT_PACKS;
use credit_desk_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
use credit_desk_vendors::{HostContext, IdentityClient};
use serde_json::Value;
use url::Url;

use crate::application::{build_payments, default_catalog, routes};
use crate::handlers::locale::{LanguageSource, LocaleResponse};
use crate::state::AppState;

fn settings_with_secret(secret: Option<&str>) -> Settings {
    let secret = secret.map(str::to_owned);
    Settings::from_lookup(|key| match key {
        "PROJECT_REF" => Some("abcd1234".into()),
        "IDENTITY_URL" => Some("https://abcd1234.identity.example.com".into()),
        "IDENTITY_ANON_KEY" => Some("anon-key".into()),
        "PAYMENTS_SECRET_KEY" => secret.clone(),
        _ => None,
    })
    .expect("settings load")
}

fn telemetry() -> TelemetryGuard {
    std::env::set_var("CREDIT_DESK_SKIP_DOTENV", "1");
    let config = TelemetryConfig::from_env("API_TEST");
    init_telemetry(&config).expect("telemetry inits")
}

fn state_for(settings: &Settings, host: HostContext) -> AppState {
    // The recorder must exist before the clients bump their counters.
    let telemetry = telemetry();
    let identity = IdentityClient::from_settings(settings, &host).expect("identity client");
    let payments = build_payments(settings).expect("payment client");
    AppState::new(identity, payments, default_catalog(), telemetry)
}

fn build_state(host: HostContext) -> AppState {
    state_for(&settings_with_secret(Some("sk_test_123")), host)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(routes),
        )
        .await
    };
}

#[actix_web::test]
async fn lists_credit_packs_in_order() {
    let app = app!(build_state(HostContext::headless()));
    let req = test::TestRequest::get()
        .uri("/api/v1/credit-packs")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["api_version"], "2024-06-20");
    let packs = body["packs"].as_array().expect("packs array");
    assert_eq!(packs.len(), CREDIT_PACKS.len());
    for (json, entry) in packs.iter().zip(CREDIT_PACKS.iter()) {
        assert_eq!(json["identifier"], entry.identifier);
        assert_eq!(json["amount_minor_units"], entry.amount_minor_units);
        assert_eq!(json["credit_units"], entry.credit_units);
        assert_eq!(json["currency_code"], "usd");
    }
}

#[actix_web::test]
async fn auth_config_has_no_redirect_when_headless() {
    let app = app!(build_state(HostContext::headless()));
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/config")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["url"], "https://abcd1234.identity.example.com");
    assert_eq!(body["anon_key"], "anon-key");
    assert!(body["auth"].get("redirect_to").is_none());
    assert_eq!(body["auth"]["auto_refresh_token"], true);
    assert_eq!(body["auth"]["detect_session_in_url"], true);
}

#[actix_web::test]
async fn auth_config_redirects_to_public_origin() {
    let origin = Url::parse("https://credits.example.com/app").unwrap();
    let app = app!(build_state(HostContext::with_origin(origin)));
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/config")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["auth"]["redirect_to"], "https://credits.example.com");
}

#[actix_web::test]
async fn locale_reads_language_cookie() {
    let app = app!(build_state(HostContext::headless()));
    let req = test::TestRequest::get()
        .uri("/api/v1/locale")
        .insert_header(("cookie", "session=abc; i18nextLng=fr"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-language").unwrap(), "fr");

    let body: LocaleResponse = test::read_body_json(resp).await;
    assert_eq!(body.language, "fr");
    assert_eq!(body.source, LanguageSource::Cookie);
    assert_eq!(body.greeting, "Bon retour");
}

#[actix_web::test]
async fn locale_falls_back_on_malformed_cookie() {
    let app = app!(build_state(HostContext::headless()));
    let req = test::TestRequest::get()
        .uri("/api/v1/locale")
        .insert_header(("cookie", "i18nextLng=../../etc"))
        .to_request();
    let body: LocaleResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.language, "en");
    assert_eq!(body.source, LanguageSource::Fallback);
    assert_eq!(body.greeting, "Welcome back");
}

#[actix_web::test]
async fn metrics_endpoint_renders_text() {
    let app = app!(build_state(HostContext::headless()));
    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/plain; version=0.0.4"
    );
}

#[actix_web::test]
async fn missing_payment_secret_only_disables_credit_packs() {
    let state = state_for(&settings_with_secret(None), HostContext::headless());
    assert!(state.payments().is_none());
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/config")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/credit-packs")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "payments are not configured");
}

#[actix_web::test]
async fn change_locale_sets_cookie_and_reports_sinks() {
    let app = app!(build_state(HostContext::headless()));
    let req = test::TestRequest::put()
        .uri("/api/v1/locale")
        .set_json(serde_json::json!({ "language": " fr " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-language").unwrap(), "fr");

    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .expect("set-cookie header")
        .to_owned();
    assert!(cookie.starts_with("i18nextLng=fr; Path=/; Max-Age=31536000; Expires="));
    assert!(cookie.ends_with("GMT; SameSite=Lax"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["language"], "fr");
    assert_eq!(body["complete"], true);
    assert_eq!(body["storage"]["i18nextLng"], "fr");
    assert_eq!(body["greeting"], "Bon retour");
    let sinks: Vec<&str> = body["sinks"]
        .as_array()
        .expect("sinks array")
        .iter()
        .filter(|sink| sink["written"] == true)
        .filter_map(|sink| sink["sink"].as_str())
        .collect();
    assert_eq!(sinks, vec!["runtime", "storage", "cookie"]);
}

#[actix_web::test]
async fn change_locale_rejects_malformed_code() {
    let app = app!(build_state(HostContext::headless()));
    let req = test::TestRequest::put()
        .uri("/api/v1/locale")
        .set_json(serde_json::json!({ "language": "fr; Domain=evil" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.headers().get("set-cookie").is_none());
}

#[actix_web::test]
async fn metrics_count_requests_clients_and_sink_writes() {
    let app = app!(build_state(HostContext::headless()));

    let req = test::TestRequest::get()
        .uri("/api/v1/credit-packs")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::put()
        .uri("/api/v1/locale")
        .set_json(serde_json::json!({ "language": "de" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).expect("utf-8 exposition");

    assert!(text.contains(r#"api_requests_total{endpoint="credit_packs"}"#));
    assert!(text.contains(r#"vendor_clients_built_total{client="payments"}"#));
    assert!(text.contains(r#"vendor_clients_built_total{client="identity"}"#));
    assert!(text.contains("locale_sink_writes_total{"));
    assert!(text.contains(r#"sink="cookie""#));
}
