//! Active UI language plus the two persistence sinks that keep the choice
//! alive across reloads (durable storage) and cookie-only requests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::Serialize;
use strum_macros::{AsRefStr, EnumIter, IntoStaticStr};
use thiserror::Error;
use tracing::warn;

use crate::services::telemetry::SINK_WRITES_METRIC;

/// Storage key and cookie name shared by every sink.
pub const LANGUAGE_KEY: &str = "i18nextLng";
/// Cookie lifetime as handed to the cookie sink: one year.
pub const COOKIE_MAX_AGE_MS: i64 = 31_536_000_000;
pub const FALLBACK_LANGUAGE: &str = "en";

const MAX_LANGUAGE_LEN: usize = 35;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LanguageError {
    #[error("language code must not be empty")]
    Empty,
    #[error("language code `{0}` is not a valid BCP 47 tag")]
    Malformed(String),
}

/// Validates a language tag loosely (`en`, `pt-BR`, `zh_Hant`) so it can be
/// written verbatim into a cookie.
pub fn validate_language(code: &str) -> Result<(), LanguageError> {
    if code.is_empty() {
        return Err(LanguageError::Empty);
    }
    let well_formed = code.len() <= MAX_LANGUAGE_LEN
        && code.starts_with(|c: char| c.is_ascii_alphabetic())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(LanguageError::Malformed(code.to_owned()))
    }
}

/// Failure reported by a single persistence sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("translation runtime rejected language: {0}")]
    Runtime(String),
    #[error("storage write failed: {0}")]
    Storage(String),
    #[error("cookie write failed: {0}")]
    Cookie(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, AsRefStr, IntoStaticStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sink {
    Runtime,
    Storage,
    Cookie,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Written,
    Failed(SinkError),
}

impl SinkOutcome {
    fn from_result(sink: Sink, result: Result<(), SinkError>) -> Self {
        let label: &'static str = sink.into();
        match result {
            Ok(()) => {
                counter!(SINK_WRITES_METRIC, "sink" => label, "result" => "ok").increment(1);
                Self::Written
            }
            Err(err) => {
                counter!(SINK_WRITES_METRIC, "sink" => label, "result" => "error").increment(1);
                warn!(sink = label, error = %err, "language preference write failed");
                Self::Failed(err)
            }
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Per-sink record of a [`LanguagePreference::change_language`] call. Sinks
/// are independent: a failure in one never rolls back the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    pub language: String,
    pub runtime: SinkOutcome,
    pub storage: SinkOutcome,
    pub cookie: SinkOutcome,
}

impl ChangeReport {
    pub fn outcome(&self, sink: Sink) -> &SinkOutcome {
        match sink {
            Sink::Runtime => &self.runtime,
            Sink::Storage => &self.storage,
            Sink::Cookie => &self.cookie,
        }
    }

    /// True when all three sinks accepted the new language.
    pub fn is_complete(&self) -> bool {
        self.runtime.is_written() && self.storage.is_written() && self.cookie.is_written()
    }

    pub fn failures(&self) -> Vec<(Sink, &SinkError)> {
        [
            (Sink::Runtime, &self.runtime),
            (Sink::Storage, &self.storage),
            (Sink::Cookie, &self.cookie),
        ]
        .into_iter()
        .filter_map(|(sink, outcome)| match outcome {
            SinkOutcome::Failed(err) => Some((sink, err)),
            SinkOutcome::Written => None,
        })
        .collect()
    }
}

/// In-memory translation state the preference wraps.
pub trait TranslationRuntime {
    fn language(&self) -> &str;
    fn set_language(&mut self, code: &str) -> Result<(), SinkError>;
    fn translate(&self, key: &str) -> String;
}

/// Key/value storage without expiry, e.g. browser local storage.
pub trait DurableStore {
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), SinkError>;
}

pub trait CookieSink {
    fn set_cookie(&mut self, cookie: PreferenceCookie) -> Result<(), SinkError>;
}

/// Cookie carrying the language choice. The lifetime is supplied in
/// milliseconds and serialized with second/date precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceCookie {
    name: String,
    value: String,
    expires: DateTime<Utc>,
}

impl PreferenceCookie {
    pub fn new(value: impl Into<String>, issued_at: DateTime<Utc>, max_age_ms: i64) -> Self {
        Self {
            name: LANGUAGE_KEY.to_owned(),
            value: value.into(),
            expires: issued_at + Duration::milliseconds(max_age_ms),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    /// Remaining lifetime in whole seconds relative to `now`.
    pub fn max_age_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires - now).num_seconds().max(0)
    }

    /// Renders a `Set-Cookie` header value.
    pub fn to_header_value(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; Expires={}; SameSite=Lax",
            self.name,
            self.value,
            self.max_age_secs(now),
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
        )
    }
}

/// Extracts the language cookie from a `Cookie` request header.
pub fn language_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == LANGUAGE_KEY)
        .map(|(_, value)| value.trim())
        .filter(|value| validate_language(value).is_ok())
}

/// Language state that mirrors every change into durable storage and a
/// cookie.
#[derive(Debug)]
pub struct LanguagePreference<R, S, C> {
    runtime: R,
    storage: S,
    cookies: C,
}

impl<R, S, C> LanguagePreference<R, S, C>
where
    R: TranslationRuntime,
    S: DurableStore,
    C: CookieSink,
{
    pub fn new(runtime: R, storage: S, cookies: C) -> Self {
        Self {
            runtime,
            storage,
            cookies,
        }
    }

    pub fn language(&self) -> &str {
        self.runtime.language()
    }

    pub fn t(&self, key: &str) -> String {
        self.runtime.translate(key)
    }

    pub fn change_language(&mut self, code: &str) -> Result<ChangeReport, LanguageError> {
        self.change_language_at(code, Utc::now())
    }

    /// Same as [`Self::change_language`] with an explicit cookie issue time.
    pub fn change_language_at(
        &mut self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ChangeReport, LanguageError> {
        let code = code.trim();
        validate_language(code)?;

        let runtime = SinkOutcome::from_result(Sink::Runtime, self.runtime.set_language(code));
        let storage =
            SinkOutcome::from_result(Sink::Storage, self.storage.set_item(LANGUAGE_KEY, code));
        let cookie = PreferenceCookie::new(code, now, COOKIE_MAX_AGE_MS);
        let cookie = SinkOutcome::from_result(Sink::Cookie, self.cookies.set_cookie(cookie));

        Ok(ChangeReport {
            language: code.to_owned(),
            runtime,
            storage,
            cookie,
        })
    }

    pub fn into_parts(self) -> (R, S, C) {
        (self.runtime, self.storage, self.cookies)
    }
}

/// Translation table keyed by language then message key. Shared read-only;
/// [`ActiveCatalog`] carries the per-caller language.
#[derive(Debug, Clone)]
pub struct Catalog {
    fallback: String,
    resources: HashMap<String, HashMap<String, String>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(FALLBACK_LANGUAGE)
    }
}

impl Catalog {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            resources: HashMap::new(),
        }
    }

    pub fn with_messages<I, K, V>(mut self, language: &str, messages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.resources
            .entry(language.to_owned())
            .or_default()
            .extend(messages.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Looks `key` up in `language`, then its base language (`fr-CA` ->
    /// `fr`), then the fallback language, and finally returns the key.
    pub fn translate(&self, language: &str, key: &str) -> String {
        let base = language.split(['-', '_']).next().unwrap_or(language);
        self.lookup(language, key)
            .or_else(|| self.lookup(base, key))
            .or_else(|| self.lookup(&self.fallback, key))
            .cloned()
            .unwrap_or_else(|| key.to_owned())
    }

    fn lookup(&self, language: &str, key: &str) -> Option<&String> {
        self.resources.get(language).and_then(|table| table.get(key))
    }
}

/// A shared [`Catalog`] plus the language one caller has selected.
#[derive(Debug, Clone)]
pub struct ActiveCatalog {
    catalog: Arc<Catalog>,
    active: String,
}

impl ActiveCatalog {
    /// Starts on the catalog's fallback language.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let active = catalog.fallback().to_owned();
        Self { catalog, active }
    }
}

impl TranslationRuntime for ActiveCatalog {
    fn language(&self) -> &str {
        &self.active
    }

    fn set_language(&mut self, code: &str) -> Result<(), SinkError> {
        validate_language(code).map_err(|err| SinkError::Runtime(err.to_string()))?;
        self.active = code.to_owned();
        Ok(())
    }

    fn translate(&self, key: &str) -> String {
        self.catalog.translate(&self.active, key)
    }
}
