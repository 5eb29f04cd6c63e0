use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Method;
use std::error::Error as _;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

use super::provider::{
    expand_template, CredentialTransport, ParamSource, ProviderProfile, RedirectPlacement,
    TokenMethod,
};
use crate::error::{ExchangeError, FlowError, Result};
use crate::settings::SettingsStore;

/// Fully shaped HTTP request, built before anything touches the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub method: TokenMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TokenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Form parameters, from the body for POST or the query string for GET
    pub fn params(&self) -> Vec<(String, String)> {
        let raw = match self.method {
            TokenMethod::Post => self.body.clone().unwrap_or_default(),
            TokenMethod::Get => Url::parse(&self.url)
                .ok()
                .and_then(|u| u.query().map(str::to_string))
                .unwrap_or_default(),
        };
        form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

/// Completed HTTP exchange, any status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResponse {
    pub status: u16,
    pub body: String,
}

impl ExchangeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues token and bind requests for one flow.
///
/// The underlying HTTP client accepts invalid certificates and host names:
/// SSL errors are ignored for this flow's requests only. The client is owned
/// by a single flow and dropped with it.
pub struct TokenExchangeClient {
    http_client: reqwest::Client,
}

impl TokenExchangeClient {
    /// Fails with `TransportUnavailable` when no TLS backend can be set up
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| FlowError::TransportUnavailable(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Shape the token request for `profile`.
    ///
    /// Per-user parameters (stored usernames, passwords, user keys) are read
    /// from `settings`. Missing client credentials only omit their fields.
    pub fn build_request(
        profile: &ProviderProfile,
        code: &str,
        base_url: Option<&str>,
        settings: &dyn SettingsStore,
    ) -> Result<TokenRequest> {
        let raw = expand_template(&profile.token_url, base_url);
        let mut url = Url::parse(&raw).map_err(|e| FlowError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        if profile.token_redirect == RedirectPlacement::Query {
            url.query_pairs_mut()
                .append_pair("redirect_uri", profile.token_redirect_uri);
        }

        let client_secret = profile
            .client_secret_setting
            .map(|key| settings.get_string(profile.provider, key, ""))
            .filter(|v| !v.is_empty())
            .or_else(|| profile.client_secret.clone());

        let mut headers = Vec::new();
        let mut params: Vec<(String, String)> = Vec::new();

        match profile.credential_transport {
            CredentialTransport::BodyParams => {
                if let Some(client_id) = &profile.client_id {
                    params.push((profile.client_id_param.to_string(), client_id.clone()));
                }
                if let Some(secret) = &client_secret {
                    params.push(("client_secret".to_string(), secret.clone()));
                }
            }
            CredentialTransport::BasicAuthHeader => {
                match (&profile.client_id, &client_secret) {
                    (Some(id), Some(secret)) => {
                        let encoded = STANDARD.encode(format!("{id}:{secret}"));
                        headers.push(("Authorization".to_string(), format!("Basic {encoded}")));
                    }
                    _ => warn!(
                        "{} client id/secret not configured, sending token request without Basic credentials",
                        profile.provider
                    ),
                }
            }
        }

        params.push((
            "grant_type".to_string(),
            profile.grant_type.as_str().to_string(),
        ));

        if profile.token_redirect == RedirectPlacement::Body {
            params.push((
                "redirect_uri".to_string(),
                profile.token_redirect_uri.to_string(),
            ));
        }

        for (name, source) in profile.extra_token_params {
            let value = match source {
                ParamSource::Literal(value) => value.to_string(),
                ParamSource::Setting(key) => settings.get_string(profile.provider, key, ""),
            };
            params.push((name.to_string(), value));
        }

        // Credential-based providers still carry the sentinel code
        params.push(("code".to_string(), code.to_string()));

        let body = match profile.token_method {
            TokenMethod::Get => {
                url.query_pairs_mut().extend_pairs(&params);
                None
            }
            TokenMethod::Post => {
                headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                Some(
                    form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(&params)
                        .finish(),
                )
            }
        };

        Ok(TokenRequest {
            method: profile.token_method,
            url: url.to_string(),
            headers,
            body,
        })
    }

    /// Shape the identity bind call made with the fresh access token
    pub fn build_bind_request(bind_url: &str, access_token: &str, member_id: &str) -> TokenRequest {
        TokenRequest {
            method: TokenMethod::Post,
            url: bind_url.to_string(),
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {access_token}")),
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Some(serde_json::json!({ "member-id": member_id }).to_string()),
        }
    }

    /// Issue a request and read the whole body, whatever the status
    pub async fn send(
        &self,
        request: &TokenRequest,
    ) -> std::result::Result<ExchangeResponse, ExchangeError> {
        let method = match request.method {
            TokenMethod::Post => Method::POST,
            TokenMethod::Get => Method::GET,
        };

        let mut builder = self.http_client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(classify_transport_error)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkFailure(format!("Failed to read response body: {e}")))?;

        debug!("Response status {} ({} bytes)", status, body.len());

        Ok(ExchangeResponse { status, body })
    }
}

fn classify_transport_error(err: reqwest::Error) -> ExchangeError {
    // GET token requests carry stored passwords in the query string
    let err = err.without_url();
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }

    if is_handshake_failure(&err, err.is_connect()) {
        ExchangeError::SslHandshakeFailure(detail)
    } else {
        ExchangeError::NetworkFailure(detail)
    }
}

/// A connect error whose cause chain holds no I/O error came from the TLS
/// layer; refused connections, resets and DNS failures all carry an
/// `io::Error`.
fn is_handshake_failure(err: &(dyn std::error::Error + 'static), is_connect: bool) -> bool {
    if !is_connect {
        return false;
    }
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return false;
        }
        source = cause.source();
    }
    true
}
