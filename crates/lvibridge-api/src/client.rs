// Vendor API HTTP client
//
// Wraps `reqwest::Client` with URL construction relative to the API root
// and envelope unwrapping. Endpoint groups (auth, homes, devices) are
// inherent methods in sibling modules; this file only deals with
// transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::LviResponse;
use crate::transport::TransportConfig;

/// Header carrying the access token on every data endpoint.
pub(crate) const ACCESS_TOKEN_HEADER: &str = "access_token";

/// Default API root of the public cloud.
pub const DEFAULT_BASE_URL: &str = "https://e3.lvi.eu/api/v0.1/human/";

/// Raw HTTP client for the vendor cloud API.
///
/// All methods return the unwrapped `data` payload; the envelope is
/// stripped before the caller sees it.
#[derive(Debug, Clone)]
pub struct LviClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LviClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `https://e3.lvi.eu/api/v0.1/human/`.
    /// A missing trailing slash is added so relative joins keep the path.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(base_url),
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve an endpoint path (e.g. `uds/selectHomeList`) against the root.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    /// Endpoint URL with query parameters appended.
    pub(crate) fn endpoint_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Url, Error> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// `POST` with the access-token header and unwrap the envelope.
    pub(crate) async fn post_authorized<T>(
        &self,
        url: Url,
        access_token: &SecretString,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned + Default,
    {
        debug!("POST {}", redact_query(&url));

        let resp = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "*/*")
            .header(ACCESS_TOKEN_HEADER, access_token.expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_envelope(resp).await
    }

    /// Send a prepared request and unwrap the envelope.
    pub(crate) async fn send<T>(&self, builder: reqwest::RequestBuilder) -> Result<T, Error>
    where
        T: DeserializeOwned + Default,
    {
        let resp = builder.send().await.map_err(Error::Transport)?;
        parse_envelope(resp).await
    }
}

/// Parse the `{ errorCode, message, data }` envelope, returning `data` on
/// success.
///
/// A missing or `null` `data` on success decodes as `T::default()`; some
/// control endpoints answer with an empty payload.
async fn parse_envelope<T>(resp: reqwest::Response) -> Result<T, Error>
where
    T: DeserializeOwned + Default,
{
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "access token rejected (HTTP 401)".into(),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Http {
            status: status.as_u16(),
            message: preview(&body),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    trace!(len = body.len(), "envelope received");

    let envelope: LviResponse<T> =
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })?;

    if envelope.error_code != 0 {
        return Err(Error::Vendor {
            code: envelope.error_code,
            message: envelope
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("errorCode={}", envelope.error_code)),
        });
    }

    Ok(envelope.data.unwrap_or_default())
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Strip query values from a URL before it reaches the logs.
///
/// Token and credential exchanges carry secrets in the query string.
pub(crate) fn redact_query(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = LviClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://e3.lvi.eu/api/v0.1/human").unwrap(),
        );
        assert_eq!(
            client.endpoint("uds/selectHomeList").unwrap().as_str(),
            "https://e3.lvi.eu/api/v0.1/human/uds/selectHomeList"
        );
    }

    #[test]
    fn query_is_encoded() {
        let client = LviClient::with_client(
            reqwest::Client::new(),
            Url::parse(DEFAULT_BASE_URL).unwrap(),
        );
        let url = client
            .endpoint_with_query("share/applyAccessToken", &[("password", "a&b c")])
            .unwrap();
        assert_eq!(url.query(), Some("password=a%26b+c"));
        assert!(!redact_query(&url).contains("password"));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(300);
        assert_eq!(preview(&body).chars().count(), 200);
    }
}
