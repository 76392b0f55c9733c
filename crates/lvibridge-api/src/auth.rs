// Vendor authentication endpoints
//
// Two-step login: `user/auth` trades account credentials for a one-time
// authorization code, `share/applyAccessToken` trades that code for an
// access/refresh token pair. `share/refreshtoken` rotates the pair.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::{LviClient, redact_query};
use crate::error::Error;
use crate::models::{AuthCodeData, LviTokens};

impl LviClient {
    /// Obtain an authorization code.
    ///
    /// `POST user/auth` with a form body of `email`, `password`, `token`
    /// (the API secret token) and `smarthome_id` (the API access key).
    pub async fn request_authorization_code(
        &self,
        email: &str,
        password: &SecretString,
        secret_token: &SecretString,
        access_key: &str,
    ) -> Result<String, Error> {
        let url = self.endpoint("user/auth")?;
        debug!(email, "requesting authorization code");

        let form = [
            ("email", email),
            ("password", password.expose_secret()),
            ("token", secret_token.expose_secret()),
            ("smarthome_id", access_key),
        ];
        let data: AuthCodeData = self
            .send(
                self.http()
                    .post(url)
                    .header(reqwest::header::ACCEPT, "*/*")
                    .form(&form),
            )
            .await?;

        if data.authorization_code.is_empty() {
            return Err(Error::Authentication {
                message: "no authorization code in response".into(),
            });
        }
        Ok(data.authorization_code)
    }

    /// Exchange an authorization code for an access/refresh token pair.
    ///
    /// `POST share/applyAccessToken?username=..&password=..` with the code in
    /// the `authorization_code` header.
    pub async fn apply_access_token(
        &self,
        authorization_code: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<LviTokens, Error> {
        let url = self.endpoint_with_query(
            "share/applyAccessToken",
            &[("username", username), ("password", password.expose_secret())],
        )?;
        debug!("POST {}", redact_query(&url));

        let tokens: LviTokens = self
            .send(
                self.http()
                    .post(url)
                    .header(reqwest::header::ACCEPT, "*/*")
                    .header("authorization_code", authorization_code),
            )
            .await?;

        ensure_complete(tokens, "token exchange")
    }

    /// Rotate the token pair.
    ///
    /// `POST share/refreshtoken?refreshtoken=..`
    pub async fn refresh_token(&self, refresh_token: &SecretString) -> Result<LviTokens, Error> {
        let url = self.endpoint_with_query(
            "share/refreshtoken",
            &[("refreshtoken", refresh_token.expose_secret())],
        )?;
        debug!("POST {}", redact_query(&url));

        let tokens: LviTokens = self
            .send(self.http().post(url).header(reqwest::header::ACCEPT, "*/*"))
            .await?;

        ensure_complete(tokens, "token refresh")
    }
}

fn ensure_complete(tokens: LviTokens, step: &str) -> Result<LviTokens, Error> {
    if tokens.is_complete() {
        Ok(tokens)
    } else {
        Err(Error::Authentication {
            message: format!("{step} returned an empty token or expiry"),
        })
    }
}
