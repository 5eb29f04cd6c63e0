use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use super::provider::ResponseFieldPaths;
use crate::error::ExchangeError;

const ERROR_SNIPPET_LIMIT: usize = 240;

/// Tokens extracted from a successful exchange
#[derive(Clone, PartialEq)]
pub struct TokenResult {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Provider-specific extras, keyed by logical field name
    pub provider_fields: BTreeMap<String, Value>,
    pub obtained_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResult")
            .field("access_token", &mask_token(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask_token))
            .field("provider_fields", &self.provider_fields)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Keep the first four characters of a credential for log correlation
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}***")
}

/// Parse a token endpoint body with the provider's field paths.
///
/// A body that is not JSON, or that has no non-empty access token, is a
/// parse failure; there is no partial success.
pub fn normalize(body: &str, fields: &ResponseFieldPaths) -> Result<TokenResult, ExchangeError> {
    let document: Value = serde_json::from_str(body)
        .map_err(|e| ExchangeError::ParseFailure(format!("invalid JSON: {e}")))?;

    let access_token = lookup(&document, fields.access_token)
        .and_then(non_empty_string)
        .ok_or_else(|| {
            ExchangeError::ParseFailure(format!(
                "missing {}",
                fields.access_token.join(".")
            ))
        })?;

    let refresh_token = fields
        .refresh_token
        .and_then(|path| lookup(&document, path))
        .and_then(non_empty_string);

    let provider_fields = fields
        .extra
        .iter()
        .filter_map(|(name, path)| {
            lookup(&document, path)
                .filter(|v| !v.is_null())
                .map(|v| (name.to_string(), v.clone()))
        })
        .collect();

    Ok(TokenResult {
        access_token,
        refresh_token,
        provider_fields,
        obtained_at: Utc::now(),
    })
}

/// Build the rejection for a non-success status, preferring the provider's
/// own error fields over the raw body.
pub fn rejection(status: u16, body: &str) -> ExchangeError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| provider_error_detail(&v))
        .unwrap_or_else(|| body.trim().chars().take(ERROR_SNIPPET_LIMIT).collect());

    ExchangeError::ProviderRejected { status, detail }
}

fn provider_error_detail(document: &Value) -> Option<String> {
    let text = |key: &str| document.get(key).and_then(Value::as_str).map(str::trim);

    let code = text("error").filter(|v| !v.is_empty());
    let message = text("error_description")
        .or_else(|| text("message"))
        .filter(|v| !v.is_empty());

    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (Some(code), None) => Some(code.to_string()),
        (None, Some(message)) => Some(message.to_string()),
        (None, None) => None,
    }
}

fn lookup<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(document, |node, key| node.get(key))
}

fn non_empty_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
