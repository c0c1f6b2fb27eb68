//! OAuth 1.0a request signing (HMAC-SHA1).

pub mod token;

pub use token::{parse_token_response, TokenExchange};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Method;
use sha1::Sha1;
use url::Url;

use crate::app::{Result, WarblerError};
use crate::fetcher::ApiRequest;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Absent until the bootstrap exchange has been done.
    pub token: Option<TokenPair>,
}

impl KeyMaterial {
    pub fn with_token(&self, token: TokenPair) -> Self {
        Self {
            token: Some(token),
            ..self.clone()
        }
    }
}

/// RFC 3986 encoding as OAuth requires it: everything but `A-Z a-z 0-9 - . _ ~`.
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub struct RequestSigner {
    keys: KeyMaterial,
}

impl RequestSigner {
    pub fn new(keys: KeyMaterial) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Sign `request` in place by attaching an `Authorization: OAuth ...`
    /// header. A fresh nonce and timestamp are drawn on every call.
    pub fn sign(&self, request: &mut ApiRequest) -> Result<()> {
        let header =
            self.authorization_header(&request.method, &request.url, &request.params)?;
        request.authorization = Some(header);
        Ok(())
    }

    pub fn authorization_header(
        &self,
        method: &Method,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String> {
        let oauth = self.sign_with(method, url, params, &nonce(), Utc::now().timestamp())?;
        let fields = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {}", fields))
    }

    /// Signed URL form: the `oauth_*` parameters are appended to the query.
    pub fn signed_url(
        &self,
        method: &Method,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String> {
        let oauth = self.sign_with(method, url, params, &nonce(), Utc::now().timestamp())?;
        let mut signed = Url::parse(url)?;
        {
            let mut query = signed.query_pairs_mut();
            for (k, v) in params.iter().chain(oauth.iter()) {
                query.append_pair(k, v);
            }
        }
        Ok(signed.into())
    }

    /// Produce the sorted `oauth_*` parameters, including `oauth_signature`.
    pub(crate) fn sign_with(
        &self,
        method: &Method,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<Vec<(String, String)>> {
        let mut oauth = vec![
            ("oauth_consumer_key".to_string(), self.keys.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
        ];
        if let Some(token) = &self.keys.token {
            oauth.push(("oauth_token".to_string(), token.key.clone()));
        }
        oauth.push(("oauth_version".to_string(), "1.0".to_string()));

        let parsed = Url::parse(url)?;
        let mut all: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (encode(&k), encode(&v)))
            .collect();
        all.extend(params.iter().map(|(k, v)| (encode(k), encode(v))));
        all.extend(oauth.iter().map(|(k, v)| (encode(k), encode(v))));
        all.sort();

        let parameter_string = all
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.as_str().to_ascii_uppercase(),
            encode(&base_url(&parsed)),
            encode(&parameter_string)
        );

        let signing_key = format!(
            "{}&{}",
            encode(&self.keys.consumer_secret),
            self.keys
                .token
                .as_ref()
                .map(|t| encode(&t.secret))
                .unwrap_or_default()
        );

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
            .map_err(|e| WarblerError::Auth(e.to_string()))?;
        mac.update(base_string.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        oauth.push(("oauth_signature".to_string(), signature));
        oauth.sort();
        Ok(oauth)
    }
}

/// Scheme and host lowercased, default port dropped, no query or fragment.
fn base_url(url: &Url) -> String {
    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let port = match url.port() {
        Some(port) => format!(":{}", port),
        None => String::new(),
    };
    format!("{}://{}{}{}", scheme, host, port, url.path())
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signer() -> RequestSigner {
        RequestSigner::new(KeyMaterial {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".into(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".into(),
            token: Some(TokenPair {
                key: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".into(),
                secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".into(),
            }),
        })
    }

    fn value<'a>(params: &'a [(String, String)], key: &str) -> &'a str {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn test_known_signature() {
        let params = vec![
            ("include_entities".to_string(), "true".to_string()),
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
        ];
        let oauth = sample_signer()
            .sign_with(
                &Method::POST,
                "https://api.twitter.com/1.1/statuses/update.json",
                &params,
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
                1318622958,
            )
            .unwrap();

        assert_eq!(value(&oauth, "oauth_signature"), "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
        assert_eq!(value(&oauth, "oauth_signature_method"), "HMAC-SHA1");
    }

    #[test]
    fn test_query_in_url_is_signed_like_params() {
        let signer = sample_signer();
        let in_url = signer
            .sign_with(
                &Method::GET,
                "https://api.example.com/1/statuses/home_timeline.xml?since_id=10",
                &[],
                "n",
                1,
            )
            .unwrap();
        let as_param = signer
            .sign_with(
                &Method::GET,
                "https://api.example.com/1/statuses/home_timeline.xml",
                &[("since_id".to_string(), "10".to_string())],
                "n",
                1,
            )
            .unwrap();
        assert_eq!(
            value(&in_url, "oauth_signature"),
            value(&as_param, "oauth_signature")
        );
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let signer = sample_signer();
        let first = signer
            .authorization_header(&Method::GET, "https://api.example.com/a", &[])
            .unwrap();
        let second = signer
            .authorization_header(&Method::GET, "https://api.example.com/a", &[])
            .unwrap();
        assert!(first.starts_with("OAuth "));
        assert_ne!(first, second);
    }

    #[test]
    fn test_consumer_only_omits_token() {
        let signer = RequestSigner::new(KeyMaterial {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            token: None,
        });
        let oauth = signer
            .sign_with(&Method::POST, "https://api.example.com/oauth/access_token", &[], "n", 1)
            .unwrap();
        assert!(oauth.iter().all(|(k, _)| k != "oauth_token"));
    }

    #[test]
    fn test_signed_url_carries_oauth_params() {
        let url = sample_signer()
            .signed_url(
                &Method::GET,
                "https://api.example.com/1/statuses/home_timeline.xml",
                &[("since_id".to_string(), "5".to_string())],
            )
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let keys: Vec<String> = parsed.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert!(keys.contains(&"since_id".to_string()));
        assert!(keys.contains(&"oauth_signature".to_string()));
        assert!(keys.contains(&"oauth_token".to_string()));
    }

    #[test]
    fn test_base_url_normalization() {
        let url = Url::parse("HTTPS://API.Example.com:443/1/a.xml?x=1#frag").unwrap();
        assert_eq!(base_url(&url), "https://api.example.com/1/a.xml");
        let url = Url::parse("http://localhost:8080/a").unwrap();
        assert_eq!(base_url(&url), "http://localhost:8080/a");
    }
}
