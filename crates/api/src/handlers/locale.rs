use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use chrono::Utc;
use credit_desk_domain::locale::{
    language_from_cookie_header, ActiveCatalog, CookieSink, DurableStore, LanguagePreference,
    PreferenceCookie, Sink, SinkError, SinkOutcome,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::AsRefStr;

use crate::state::AppState;

use super::{record_request, ApiError, Endpoint};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LanguageSource {
    Cookie,
    Fallback,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocaleResponse {
    pub language: String,
    pub source: LanguageSource,
    pub greeting: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeLocaleRequest {
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct SinkReport {
    pub sink: Sink,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChangeLocaleResponse {
    pub language: String,
    pub complete: bool,
    pub sinks: Vec<SinkReport>,
    /// Items the browser should copy into local storage.
    pub storage: BTreeMap<String, String>,
    pub greeting: String,
}

/// Collects storage writes so they can be echoed to the browser.
#[derive(Debug, Default)]
struct ResponseStorage(BTreeMap<String, String>);

impl DurableStore for ResponseStorage {
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), SinkError> {
        self.0.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Collects cookies that become `Set-Cookie` headers.
#[derive(Debug, Default)]
struct ResponseCookies(Vec<PreferenceCookie>);

impl CookieSink for ResponseCookies {
    fn set_cookie(&mut self, cookie: PreferenceCookie) -> Result<(), SinkError> {
        self.0.push(cookie);
        Ok(())
    }
}

/// Resolves the caller's language from the `i18nextLng` cookie alone.
pub async fn locale_handler(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    record_request(Endpoint::Locale);

    let catalog = state.catalog();
    let from_cookie = req
        .headers()
        .get_all(header::COOKIE)
        .filter_map(|value| value.to_str().ok())
        .find_map(language_from_cookie_header);
    let (language, source) = match from_cookie {
        Some(language) => (language, LanguageSource::Cookie),
        None => (catalog.fallback(), LanguageSource::Fallback),
    };
    tracing::debug!(language, source = source.as_ref(), "resolved locale");

    HttpResponse::Ok()
        .insert_header((header::CONTENT_LANGUAGE, language.to_owned()))
        .json(LocaleResponse {
            language: language.to_owned(),
            source,
            greeting: catalog.translate(language, "greeting"),
        })
}

/// Switches the caller's language: the choice comes back as an `i18nextLng`
/// cookie plus the storage items to persist client side.
pub async fn change_locale_handler(
    state: web::Data<AppState>,
    body: web::Json<ChangeLocaleRequest>,
) -> Result<HttpResponse, ApiError> {
    record_request(Endpoint::ChangeLocale);

    let now = Utc::now();
    let mut preference = LanguagePreference::new(
        ActiveCatalog::new(Arc::clone(state.catalog())),
        ResponseStorage::default(),
        ResponseCookies::default(),
    );
    let report = preference.change_language_at(&body.language, now)?;
    let greeting = preference.t("greeting");
    let (_, storage, cookies) = preference.into_parts();

    let sinks = Sink::iter()
        .map(|sink| match report.outcome(sink) {
            SinkOutcome::Written => SinkReport {
                sink,
                written: true,
                error: None,
            },
            SinkOutcome::Failed(err) => SinkReport {
                sink,
                written: false,
                error: Some(err.to_string()),
            },
        })
        .collect();

    let mut response = HttpResponse::Ok();
    response.insert_header((header::CONTENT_LANGUAGE, report.language.clone()));
    for cookie in &cookies.0 {
        response.append_header((header::SET_COOKIE, cookie.to_header_value(now)));
    }

    Ok(response.json(ChangeLocaleResponse {
        complete: report.is_complete(),
        language: report.language,
        sinks,
        storage: storage.0,
        greeting,
    }))
}
