//! Long-lived vendor clients built once from validated [`Settings`] at the
//! composition root and handed to whoever needs them.
//!
//! [`Settings`]: credit_desk_domain::Settings

pub mod error;
pub mod identity;
pub mod payments;

pub use error::ConstructionError;
pub use identity::{AuthOptions, HostContext, IdentityClient, PublicIdentityConfig};
pub use payments::{PaymentClient, PAYMENTS_API_VERSION};

use reqwest::header::HeaderValue;
use url::Url;

/// Parses a vendor base URL, insisting on http(s) and a trailing slash so
/// relative endpoint joins keep the full path.
pub(crate) fn parse_base_url(value: &str) -> Result<Url, ConstructionError> {
    let mut url = Url::parse(value.trim()).map_err(|source| ConstructionError::InvalidUrl {
        value: value.to_owned(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConstructionError::UnsupportedScheme(value.to_owned()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn join_endpoint(base: &Url, path: &str) -> Result<Url, ConstructionError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|source| ConstructionError::InvalidUrl {
            value: path.to_owned(),
            source,
        })
}

/// Header value flagged sensitive so it never shows up in debug output.
pub(crate) fn secret_header(
    name: &'static str,
    value: &str,
) -> Result<HeaderValue, ConstructionError> {
    let mut header =
        HeaderValue::from_str(value).map_err(|_| ConstructionError::InvalidHeader { name })?;
    header.set_sensitive(true);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = parse_base_url("https://abcd.identity.example.com/v2").unwrap();
        assert_eq!(url.as_str(), "https://abcd.identity.example.com/v2/");
        assert_eq!(
            join_endpoint(&url, "/auth/v1/token").unwrap().as_str(),
            "https://abcd.identity.example.com/v2/auth/v1/token"
        );
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(matches!(
            parse_base_url("ftp://files.example.com"),
            Err(ConstructionError::UnsupportedScheme(_))
        ));
        assert!(matches!(parse_base_url("not a url"), Err(ConstructionError::InvalidUrl { .. })));
    }

    #[test]
    fn control_characters_are_rejected_in_headers() {
        assert!(matches!(
            secret_header("apikey", "bad\nkey"),
            Err(ConstructionError::InvalidHeader { name: "apikey" })
        ));
        assert!(secret_header("apikey", "good-key").unwrap().is_sensitive());
    }
}
