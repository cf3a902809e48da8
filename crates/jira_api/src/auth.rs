//! Basic authentication header for Jira Cloud API tokens.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::header::HeaderValue;

use crate::error::{JiraError, Result};

/// Builds `Basic base64(username:token)`, marked sensitive so it never shows up in debug output.
pub fn basic_authorization(username: &str, api_token: &str) -> Result<HeaderValue> {
    let encoded = BASE64_STANDARD.encode(format!("{}:{}", username, api_token));
    let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
        .map_err(|err| JiraError::Config(err.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}
