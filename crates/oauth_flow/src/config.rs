//! Runtime configuration
//!
//! Client credentials used to be compiled into the application. They are
//! now resolved once at startup from the environment and injected into the
//! flow. A provider without credentials still works up to the point where
//! its endpoint rejects the request; builders only omit the missing fields.
//!
//! Recognized variables, per provider prefix (`STRAVA`, `POLARFLOW`, ...):
//! - `<PREFIX>_CLIENT_ID`, `<PREFIX>_CLIENT_SECRET`
//! - `<PREFIX>_AUTHORIZE_URL`, `<PREFIX>_TOKEN_URL`, `<PREFIX>_BIND_URL`
//! - `OAUTH_FLOW_SETTINGS`: path of the JSON settings file

use std::collections::HashMap;
use std::path::PathBuf;

use crate::Provider;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Endpoint replacements, mainly for staging servers and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub bind_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FlowConfig {
    credentials: HashMap<Provider, ClientCredentials>,
    endpoints: HashMap<Provider, EndpointOverrides>,
    pub settings_path: Option<PathBuf>,
}

impl FlowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: String| {
            lookup(&name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::new();

        for provider in Provider::ALL {
            let prefix = provider.env_prefix();

            let credentials = ClientCredentials {
                client_id: get(format!("{prefix}_CLIENT_ID")),
                client_secret: get(format!("{prefix}_CLIENT_SECRET")),
            };
            if credentials != ClientCredentials::default() {
                config.credentials.insert(provider, credentials);
            }

            let endpoints = EndpointOverrides {
                authorize_url: get(format!("{prefix}_AUTHORIZE_URL")),
                token_url: get(format!("{prefix}_TOKEN_URL")),
                bind_url: get(format!("{prefix}_BIND_URL")),
            };
            if endpoints != EndpointOverrides::default() {
                config.endpoints.insert(provider, endpoints);
            }
        }

        config.settings_path = get("OAUTH_FLOW_SETTINGS".to_string()).map(PathBuf::from);

        config
    }

    pub fn with_client(
        mut self,
        provider: Provider,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> Self {
        self.credentials.insert(
            provider,
            ClientCredentials {
                client_id: client_id.map(str::to_string),
                client_secret: client_secret.map(str::to_string),
            },
        );
        self
    }

    pub fn with_endpoints(mut self, provider: Provider, endpoints: EndpointOverrides) -> Self {
        self.endpoints.insert(provider, endpoints);
        self
    }

    pub fn credentials(&self, provider: Provider) -> Option<&ClientCredentials> {
        self.credentials.get(&provider)
    }

    pub fn endpoints(&self, provider: Provider) -> Option<&EndpointOverrides> {
        self.endpoints.get(&provider)
    }

    /// Providers that have at least a client id configured
    pub fn configured_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| {
                self.credentials
                    .get(p)
                    .is_some_and(|c| c.client_id.is_some())
            })
            .collect()
    }
}
