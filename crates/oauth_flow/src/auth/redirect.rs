use url::Url;

/// Navigation used to start credential-based flows without a consent page
pub const SENTINEL_REDIRECT: &str = "http://www.goldencheetah.org/?code=0";

/// Prefixes of the landing page redirect carrying the authorization code
const REDIRECT_PREFIXES: [&str; 3] = [
    "http://www.goldencheetah.org/?state=&code=",
    "https://www.goldencheetah.org/?code=",
    "http://www.goldencheetah.org/?code=",
];

/// Marker of the static blank page redirect (any host)
const BLANK_PAGE_MARKER: &str = "blank.html?code=";

/// Recognize the provider's redirect among browser navigations.
///
/// Returns the authorization code, which may be empty when consent was
/// denied. Every other navigation (login pages, provider-internal hops)
/// yields `None`.
pub fn intercept(url: &str) -> Option<String> {
    let is_redirect = REDIRECT_PREFIXES.iter().any(|p| url.starts_with(p))
        || url.contains(BLANK_PAGE_MARKER);
    if !is_redirect {
        return None;
    }

    let parsed = Url::parse(url).ok()?;
    let code = parsed
        .query_pairs()
        .find(|(name, _)| name == "code")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    Some(code)
}
