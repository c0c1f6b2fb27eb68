use url::form_urlencoded;

use crate::app::{Result, WarblerError};
use crate::auth::{KeyMaterial, RequestSigner, TokenPair};
use crate::fetcher::{ApiRequest, Transport};

/// One-time exchange of a username/password for a long-lived token pair
/// (xAuth). The request is signed with the consumer key only.
pub struct TokenExchange<'a> {
    signer: &'a RequestSigner,
    endpoint: &'a str,
}

impl<'a> TokenExchange<'a> {
    pub fn new(signer: &'a RequestSigner, endpoint: &'a str) -> Self {
        Self { signer, endpoint }
    }

    pub async fn exchange(
        &self,
        transport: &dyn Transport,
        username: &str,
        password: &str,
    ) -> Result<TokenPair> {
        let consumer_only = RequestSigner::new(KeyMaterial {
            token: None,
            ..self.signer.keys().clone()
        });

        let mut request = ApiRequest::post(self.endpoint)
            .param("x_auth_mode", "client_auth")
            .param("x_auth_password", password)
            .param("x_auth_username", username);
        consumer_only.sign(&mut request)?;

        let response = transport.execute(&request).await?;
        if !response.is_success() {
            return Err(WarblerError::Status {
                code: response.status,
                body: Some(response.text()),
            });
        }

        let pair = parse_token_response(&response.text())?;
        tracing::info!(username, "obtained access token");
        Ok(pair)
    }
}

/// Parse `oauth_token=...&oauth_token_secret=...`; both fields are required.
pub fn parse_token_response(body: &str) -> Result<TokenPair> {
    let mut key = None;
    let mut secret = None;

    for (k, v) in form_urlencoded::parse(body.trim().as_bytes()) {
        match k.as_ref() {
            "oauth_token" => key = Some(v.into_owned()),
            "oauth_token_secret" => secret = Some(v.into_owned()),
            _ => {}
        }
    }

    let key = key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| WarblerError::Auth("response is missing oauth_token".into()))?;
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WarblerError::Auth("response is missing oauth_token_secret".into()))?;

    Ok(TokenPair { key, secret })
}
