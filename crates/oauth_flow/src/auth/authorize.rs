use url::Url;

use super::provider::{expand_template, ProviderProfile};
use crate::error::{FlowError, Result};

/// Build the consent page URL the browser surface loads.
///
/// Returns `None` for credential-based providers, which have no consent page.
/// Parameter order: `client_id` (when configured), `response_type`,
/// `redirect_uri`, `scope` (when non-empty), then provider flags.
pub fn authorization_url(profile: &ProviderProfile, base_url: Option<&str>) -> Result<Option<String>> {
    let Some(template) = profile.authorize_url.as_deref() else {
        return Ok(None);
    };

    let raw = expand_template(template, base_url);
    let mut url = Url::parse(&raw).map_err(|e| FlowError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;

    {
        let mut query = url.query_pairs_mut();
        if let Some(client_id) = profile.client_id.as_deref() {
            query.append_pair(profile.client_id_param, client_id);
        }
        query
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", profile.redirect_uri);
        if !profile.scopes.is_empty() {
            query.append_pair("scope", &profile.scopes.join(profile.scope_separator));
        }
        for (name, value) in profile.extra_authorize_params {
            query.append_pair(name, value);
        }
    }

    Ok(Some(url.to_string()))
}
