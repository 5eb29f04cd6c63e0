use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::config::FlowConfig;
use crate::error::FlowError;

/// Landing page registered as redirect URI with most providers.
pub const LANDING_REDIRECT_URI: &str = "http://www.goldencheetah.org/";
const LANDING_REDIRECT_URI_NO_SLASH: &str = "http://www.goldencheetah.org";
const LANDING_REDIRECT_URI_HTTPS: &str = "https://www.goldencheetah.org";
const BLANK_PAGE_REDIRECT_URI: &str = "https://goldencheetah.github.io/blank.html";

/// Third-party services that can be authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Strava,
    Dropbox,
    CyclingAnalytics,
    Nolio,
    Withings,
    PolarFlow,
    SportTracks,
    Xert,
    RideWithGps,
    Azum,
}

impl Provider {
    pub const ALL: [Provider; 10] = [
        Provider::Strava,
        Provider::Dropbox,
        Provider::CyclingAnalytics,
        Provider::Nolio,
        Provider::Withings,
        Provider::PolarFlow,
        Provider::SportTracks,
        Provider::Xert,
        Provider::RideWithGps,
        Provider::Azum,
    ];

    /// Stable snake_case key, also used as the settings namespace
    pub fn key(&self) -> &'static str {
        match self {
            Provider::Strava => "strava",
            Provider::Dropbox => "dropbox",
            Provider::CyclingAnalytics => "cycling_analytics",
            Provider::Nolio => "nolio",
            Provider::Withings => "withings",
            Provider::PolarFlow => "polar_flow",
            Provider::SportTracks => "sport_tracks",
            Provider::Xert => "xert",
            Provider::RideWithGps => "ride_with_gps",
            Provider::Azum => "azum",
        }
    }

    /// Identifier the host application uses for the cloud service
    pub fn service_id(&self) -> &'static str {
        match self {
            Provider::Strava => "Strava",
            Provider::Dropbox => "Dropbox",
            Provider::CyclingAnalytics => "Cycling Analytics",
            Provider::Nolio => "Nolio",
            Provider::Withings => "Withings",
            Provider::PolarFlow => "PolarFlow",
            Provider::SportTracks => "SportTracks.mobi",
            Provider::Xert => "Xert",
            Provider::RideWithGps => "RideWithGPS",
            Provider::Azum => "Azum",
        }
    }

    /// Prefix for `<PREFIX>_CLIENT_ID` style environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Provider::Strava => "STRAVA",
            Provider::Dropbox => "DROPBOX",
            Provider::CyclingAnalytics => "CYCLINGANALYTICS",
            Provider::Nolio => "NOLIO",
            Provider::Withings => "WITHINGS",
            Provider::PolarFlow => "POLARFLOW",
            Provider::SportTracks => "SPORTTRACKS",
            Provider::Xert => "XERT",
            Provider::RideWithGps => "RWGPS",
            Provider::Azum => "AZUM",
        }
    }

    /// Builtin profile without client credentials
    pub fn profile(&self) -> ProviderProfile {
        match self {
            Provider::Strava => ProviderProfile::strava(),
            Provider::Dropbox => ProviderProfile::dropbox(),
            Provider::CyclingAnalytics => ProviderProfile::cycling_analytics(),
            Provider::Nolio => ProviderProfile::nolio(),
            Provider::Withings => ProviderProfile::withings(),
            Provider::PolarFlow => ProviderProfile::polar_flow(),
            Provider::SportTracks => ProviderProfile::sport_tracks(),
            Provider::Xert => ProviderProfile::xert(),
            Provider::RideWithGps => ProviderProfile::ride_with_gps(),
            Provider::Azum => ProviderProfile::azum(),
        }
    }
}

impl FromStr for Provider {
    type Err = FlowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Provider::ALL
            .into_iter()
            .find(|p| {
                p.key().eq_ignore_ascii_case(value) || p.service_id().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| FlowError::UnknownProvider(value.to_string()))
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Strava => write!(f, "Strava"),
            Provider::Dropbox => write!(f, "Dropbox"),
            Provider::CyclingAnalytics => write!(f, "Cycling Analytics"),
            Provider::Nolio => write!(f, "Nolio"),
            Provider::Withings => write!(f, "Withings"),
            Provider::PolarFlow => write!(f, "Polar Flow"),
            Provider::SportTracks => write!(f, "SportTracks"),
            Provider::Xert => write!(f, "Xert"),
            Provider::RideWithGps => write!(f, "Ride With GPS"),
            Provider::Azum => write!(f, "Azum"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    Password,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Password => "password",
        }
    }
}

/// Where the client id and secret travel in the token request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTransport {
    BodyParams,
    BasicAuthHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMethod {
    Post,
    /// Parameters go into the query string instead of a form body
    Get,
}

/// Where the token request repeats the redirect URI, if at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPlacement {
    Omit,
    Body,
    Query,
}

/// Value of an extra token parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Literal(&'static str),
    /// Per-user setting, read from the settings store (empty when unset)
    Setting(&'static str),
}

/// JSON paths of the fields the normalizer extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFieldPaths {
    pub access_token: &'static [&'static str],
    pub refresh_token: Option<&'static [&'static str]>,
    /// logical field name -> path
    pub extra: &'static [(&'static str, &'static [&'static str])],
}

impl Default for ResponseFieldPaths {
    fn default() -> Self {
        Self {
            access_token: &["access_token"],
            refresh_token: Some(&["refresh_token"]),
            extra: &[],
        }
    }
}

/// Settings keys the flow writes on success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsKeys {
    pub access_token: &'static str,
    pub refresh_token: Option<&'static str>,
    pub last_refresh: Option<&'static str>,
    /// logical field name -> settings key
    pub extra: &'static [(&'static str, &'static str)],
}

/// Runtime-configurable base URL for self-hosted-style providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseUrl {
    pub setting: &'static str,
    pub default: &'static str,
}

/// Per-provider request shaping and response mapping.
///
/// URL templates may contain `{base}`, substituted with the session's
/// resolved base URL. A profile without an authorize URL authenticates with
/// stored user credentials and never shows a browser page.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider: Provider,
    pub authorize_url: Option<String>,
    pub token_url: String,
    pub base_url: Option<BaseUrl>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub client_id_param: &'static str,
    /// Per-user setting that replaces the configured secret when non-empty
    pub client_secret_setting: Option<&'static str>,
    pub scopes: &'static [&'static str],
    pub scope_separator: &'static str,
    pub redirect_uri: &'static str,
    pub grant_type: GrantType,
    pub credential_transport: CredentialTransport,
    pub token_method: TokenMethod,
    pub token_redirect: RedirectPlacement,
    pub token_redirect_uri: &'static str,
    pub extra_authorize_params: &'static [(&'static str, &'static str)],
    pub extra_token_params: &'static [(&'static str, ParamSource)],
    pub response_fields: ResponseFieldPaths,
    pub settings_keys: SettingsKeys,
    /// Follow-up call binding the local athlete to the remote account
    pub bind_url: Option<String>,
    /// Report success without a notification dialog
    pub quiet_success: bool,
}

impl ProviderProfile {
    fn base(provider: Provider, token_url: &str, settings_keys: SettingsKeys) -> Self {
        Self {
            provider,
            authorize_url: None,
            token_url: token_url.to_string(),
            base_url: None,
            client_id: None,
            client_secret: None,
            client_id_param: "client_id",
            client_secret_setting: None,
            scopes: &[],
            scope_separator: ",",
            redirect_uri: LANDING_REDIRECT_URI,
            grant_type: GrantType::AuthorizationCode,
            credential_transport: CredentialTransport::BodyParams,
            token_method: TokenMethod::Post,
            token_redirect: RedirectPlacement::Omit,
            token_redirect_uri: LANDING_REDIRECT_URI,
            extra_authorize_params: &[],
            extra_token_params: &[],
            response_fields: ResponseFieldPaths::default(),
            settings_keys,
            bind_url: None,
            quiet_success: false,
        }
    }

    pub fn strava() -> Self {
        Self {
            authorize_url: Some("https://www.strava.com/oauth/authorize".to_string()),
            scopes: &["activity:read_all", "activity:write"],
            extra_authorize_params: &[("approval_prompt", "force")],
            ..Self::base(
                Provider::Strava,
                "https://www.strava.com/oauth/token",
                SettingsKeys {
                    access_token: "strava_token",
                    refresh_token: Some("strava_refresh_token"),
                    last_refresh: Some("strava_last_refresh"),
                    extra: &[],
                },
            )
        }
    }

    pub fn dropbox() -> Self {
        Self {
            authorize_url: Some("https://www.dropbox.com/oauth2/authorize".to_string()),
            redirect_uri: BLANK_PAGE_REDIRECT_URI,
            token_redirect: RedirectPlacement::Query,
            token_redirect_uri: BLANK_PAGE_REDIRECT_URI,
            extra_authorize_params: &[("force_reapprove", "true")],
            ..Self::base(
                Provider::Dropbox,
                "https://api.dropboxapi.com/oauth2/token",
                SettingsKeys {
                    access_token: "dropbox_token",
                    refresh_token: None,
                    last_refresh: None,
                    extra: &[],
                },
            )
        }
    }

    pub fn cycling_analytics() -> Self {
        Self {
            authorize_url: Some("https://www.cyclinganalytics.com/api/auth".to_string()),
            scopes: &["modify_rides"],
            extra_authorize_params: &[("approval_prompt", "force")],
            ..Self::base(
                Provider::CyclingAnalytics,
                "https://www.cyclinganalytics.com/api/token",
                SettingsKeys {
                    access_token: "cyclinganalytics_token",
                    refresh_token: None,
                    last_refresh: None,
                    extra: &[],
                },
            )
        }
    }

    pub fn nolio() -> Self {
        Self {
            authorize_url: Some("https://www.nolio.io/api/authorize/".to_string()),
            credential_transport: CredentialTransport::BasicAuthHeader,
            token_redirect: RedirectPlacement::Body,
            ..Self::base(
                Provider::Nolio,
                "https://www.nolio.io/api/token/",
                SettingsKeys {
                    access_token: "nolio_access_token",
                    refresh_token: Some("nolio_refresh_token"),
                    last_refresh: Some("nolio_last_refresh"),
                    extra: &[],
                },
            )
        }
    }

    pub fn withings() -> Self {
        Self {
            authorize_url: Some(
                "https://account.withings.com/oauth2_user/authorize2".to_string(),
            ),
            scopes: &["user.info", "user.metrics"],
            redirect_uri: LANDING_REDIRECT_URI_HTTPS,
            token_redirect: RedirectPlacement::Body,
            token_redirect_uri: LANDING_REDIRECT_URI_HTTPS,
            extra_authorize_params: &[("state", "xyzzy")],
            extra_token_params: &[("action", ParamSource::Literal("requesttoken"))],
            response_fields: ResponseFieldPaths {
                access_token: &["body", "access_token"],
                refresh_token: Some(&["body", "refresh_token"]),
                extra: &[],
            },
            ..Self::base(
                Provider::Withings,
                "https://wbsapi.withings.net/v2/oauth2",
                SettingsKeys {
                    access_token: "withings_token",
                    refresh_token: Some("withings_refresh_token"),
                    last_refresh: None,
                    extra: &[],
                },
            )
        }
    }

    pub fn polar_flow() -> Self {
        Self {
            authorize_url: Some("https://flow.polar.com/oauth2/authorization".to_string()),
            redirect_uri: LANDING_REDIRECT_URI_NO_SLASH,
            credential_transport: CredentialTransport::BasicAuthHeader,
            token_redirect: RedirectPlacement::Query,
            token_redirect_uri: LANDING_REDIRECT_URI_NO_SLASH,
            response_fields: ResponseFieldPaths {
                access_token: &["access_token"],
                refresh_token: None,
                extra: &[("user_id", &["x_user_id"])],
            },
            bind_url: Some("https://www.polaraccesslink.com/v3/users".to_string()),
            ..Self::base(
                Provider::PolarFlow,
                "https://polarremote.com/v2/oauth2/token",
                SettingsKeys {
                    access_token: "polarflow_token",
                    refresh_token: None,
                    last_refresh: None,
                    extra: &[("user_id", "polarflow_user_id")],
                },
            )
        }
    }

    pub fn sport_tracks() -> Self {
        Self {
            authorize_url: Some("https://api.sporttracks.mobi/oauth2/authorize".to_string()),
            redirect_uri: LANDING_REDIRECT_URI_NO_SLASH,
            token_redirect: RedirectPlacement::Body,
            token_redirect_uri: LANDING_REDIRECT_URI_NO_SLASH,
            extra_authorize_params: &[("state", "xyzzy")],
            ..Self::base(
                Provider::SportTracks,
                "https://api.sporttracks.mobi/oauth2/token",
                SettingsKeys {
                    access_token: "sporttracks_token",
                    refresh_token: Some("sporttracks_refresh_token"),
                    last_refresh: Some("sporttracks_last_refresh"),
                    extra: &[],
                },
            )
        }
    }

    pub fn xert() -> Self {
        Self {
            grant_type: GrantType::Password,
            credential_transport: CredentialTransport::BasicAuthHeader,
            extra_token_params: &[
                ("username", ParamSource::Setting("xert_user")),
                ("password", ParamSource::Setting("xert_pass")),
            ],
            quiet_success: true,
            ..Self::base(
                Provider::Xert,
                "https://www.xertonline.com/oauth/token",
                SettingsKeys {
                    access_token: "xert_token",
                    refresh_token: Some("xert_refresh_token"),
                    last_refresh: None,
                    extra: &[],
                },
            )
        }
    }

    pub fn ride_with_gps() -> Self {
        Self {
            client_id_param: "apikey",
            grant_type: GrantType::Password,
            token_method: TokenMethod::Get,
            extra_token_params: &[
                ("version", ParamSource::Literal("2")),
                ("email", ParamSource::Setting("rwgps_user")),
                ("password", ParamSource::Setting("rwgps_pass")),
            ],
            response_fields: ResponseFieldPaths {
                access_token: &["user", "auth_token"],
                refresh_token: None,
                extra: &[],
            },
            quiet_success: true,
            ..Self::base(
                Provider::RideWithGps,
                "https://ridewithgps.com/users/current.json",
                SettingsKeys {
                    access_token: "rwgps_auth_token",
                    refresh_token: None,
                    last_refresh: None,
                    extra: &[],
                },
            )
        }
    }

    pub fn azum() -> Self {
        Self {
            authorize_url: Some("{base}/oauth/authorize/".to_string()),
            base_url: Some(BaseUrl {
                setting: "azum_url",
                default: "https://training.azum.com",
            }),
            client_secret_setting: Some("azum_userkey"),
            token_redirect: RedirectPlacement::Body,
            ..Self::base(
                Provider::Azum,
                "{base}/oauth/token/",
                SettingsKeys {
                    access_token: "azum_access_token",
                    refresh_token: Some("azum_refresh_token"),
                    last_refresh: None,
                    extra: &[],
                },
            )
        }
    }

    /// Builtin profile with credentials and endpoint overrides from `config`
    pub fn resolve(provider: Provider, config: &FlowConfig) -> Self {
        let mut profile = provider.profile();

        if let Some(credentials) = config.credentials(provider) {
            profile.client_id = credentials.client_id.clone();
            profile.client_secret = credentials.client_secret.clone();
        }

        if let Some(endpoints) = config.endpoints(provider) {
            // Credential-based providers stay browserless even if a URL is configured
            if profile.authorize_url.is_some() {
                if let Some(url) = &endpoints.authorize_url {
                    profile.authorize_url = Some(url.clone());
                }
            }
            if let Some(url) = &endpoints.token_url {
                profile.token_url = url.clone();
            }
            if profile.bind_url.is_some() {
                if let Some(url) = &endpoints.bind_url {
                    profile.bind_url = Some(url.clone());
                }
            }
        }

        profile
    }

    pub fn bypasses_browser(&self) -> bool {
        self.authorize_url.is_none()
    }

    pub fn needs_bind(&self) -> bool {
        self.bind_url.is_some()
    }

    pub fn success_message(&self) -> String {
        format!("{} authorization was successful.", self.provider)
    }
}

/// Substitute `{base}` in a URL template
pub fn expand_template(template: &str, base_url: Option<&str>) -> String {
    match base_url {
        Some(base) => template.replace("{base}", base.trim_end_matches('/')),
        None => template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointOverrides;

    #[test]
    fn test_provider_from_service_id_and_key() {
        assert_eq!("PolarFlow".parse::<Provider>().unwrap(), Provider::PolarFlow);
        assert_eq!("polar_flow".parse::<Provider>().unwrap(), Provider::PolarFlow);
        assert_eq!(
            "SportTracks.mobi".parse::<Provider>().unwrap(),
            Provider::SportTracks
        );
        assert_eq!(
            "Cycling Analytics".parse::<Provider>().unwrap(),
            Provider::CyclingAnalytics
        );
        assert!("garmin".parse::<Provider>().is_err());
    }

    #[test]
    fn test_credential_providers_bypass_browser() {
        let bypassing: Vec<Provider> = Provider::ALL
            .into_iter()
            .filter(|p| p.profile().bypasses_browser())
            .collect();
        assert_eq!(bypassing, vec![Provider::Xert, Provider::RideWithGps]);

        for provider in bypassing {
            assert_eq!(provider.profile().grant_type, GrantType::Password);
        }
    }

    #[test]
    fn test_only_polar_binds() {
        let binding: Vec<Provider> = Provider::ALL
            .into_iter()
            .filter(|p| p.profile().needs_bind())
            .collect();
        assert_eq!(binding, vec![Provider::PolarFlow]);
    }

    #[test]
    fn test_resolve_applies_config() {
        let config = FlowConfig::new()
            .with_client(Provider::Strava, Some("1234"), Some("s3cret"))
            .with_endpoints(
                Provider::Strava,
                EndpointOverrides {
                    token_url: Some("http://127.0.0.1:9000/token".to_string()),
                    ..Default::default()
                },
            );

        let profile = ProviderProfile::resolve(Provider::Strava, &config);
        assert_eq!(profile.client_id.as_deref(), Some("1234"));
        assert_eq!(profile.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(profile.token_url, "http://127.0.0.1:9000/token");
        assert_eq!(
            profile.authorize_url.as_deref(),
            Some("https://www.strava.com/oauth/authorize")
        );
    }

    #[test]
    fn test_resolve_without_credentials() {
        let profile = ProviderProfile::resolve(Provider::Dropbox, &FlowConfig::new());
        assert!(profile.client_id.is_none());
        assert!(profile.client_secret.is_none());
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(
            expand_template("{base}/oauth/token/", Some("https://azum.example/")),
            "https://azum.example/oauth/token/"
        );
        assert_eq!(
            expand_template("https://www.strava.com/oauth/token", None),
            "https://www.strava.com/oauth/token"
        );
    }

    #[test]
    fn test_success_message() {
        assert_eq!(
            ProviderProfile::polar_flow().success_message(),
            "Polar Flow authorization was successful."
        );
    }
}
