//! Uniform envelope for every gateway call and the typed Jira error body.

use std::collections::BTreeMap;

use reqwest::{Method, StatusCode};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{JiraError, Result};

const ERROR_BODY_PREVIEW_CHARS: usize = 500;

/// Normalized outcome of a gateway call.
///
/// `payload` and `raw_text` are mutually exclusive; a 204 carries neither.
/// `error_message` is set exactly when `success` is false. A failed call whose
/// body was JSON still exposes it through `payload`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub payload: Option<Value>,
    pub raw_text: Option<String>,
    pub error_message: Option<String>,
}

impl RequestResult {
    pub fn no_content(status: StatusCode) -> Self {
        Self {
            success: true,
            status_code: Some(status.as_u16()),
            ..Self::default()
        }
    }

    /// Builds the result for a 2xx response carrying a body.
    pub fn from_body(status: StatusCode, text: String) -> Self {
        let success = status.is_success();
        match serde_json::from_str::<Value>(&text) {
            Ok(payload) => Self {
                success,
                status_code: Some(status.as_u16()),
                payload: Some(payload),
                ..Self::default()
            },
            Err(_) => Self {
                success,
                status_code: Some(status.as_u16()),
                raw_text: Some(text),
                ..Self::default()
            },
        }
    }

    /// Builds the result for a non-2xx response, folding any Jira error fields
    /// into the message.
    pub fn http_failure(status: StatusCode, method: &Method, url: &str, text: String) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown status");
        let mut message = format!(
            "HTTP {} from Jira API ({} {}): {}",
            status.as_u16(),
            method,
            url,
            reason
        );
        message.push_str("\nResponse: ");
        message.push_str(&preview(&text, ERROR_BODY_PREVIEW_CHARS));

        let payload = serde_json::from_str::<Value>(&text).ok();
        if let Some(api_error) = payload.as_ref().and_then(ApiErrorBody::from_value) {
            if !api_error.error_messages.is_empty() {
                message.push_str("\nJira messages: ");
                message.push_str(&api_error.error_messages.join("; "));
            }
            if !api_error.errors.is_empty() {
                message.push_str("\nJira details: ");
                message.push_str(&api_error.details());
            }
        }

        let raw_text = if payload.is_some() { None } else { Some(text) };
        Self {
            success: false,
            status_code: Some(status.as_u16()),
            payload,
            raw_text,
            error_message: Some(message),
        }
    }

    /// Builds the result for a call that never produced a response.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_no_content(&self) -> bool {
        self.success && self.status_code == Some(StatusCode::NO_CONTENT.as_u16())
    }

    /// Structured Jira error fields, when the body carried any.
    pub fn api_error(&self) -> Option<ApiErrorBody> {
        self.payload.as_ref().and_then(ApiErrorBody::from_value)
    }

    /// Converts a failed result into a typed error; `None` on success.
    pub fn error(&self) -> Option<JiraError> {
        if self.success {
            return None;
        }
        let message = self
            .error_message
            .clone()
            .unwrap_or_else(|| "Jira API request failed".to_string());
        Some(match self.status_code.and_then(|code| StatusCode::from_u16(code).ok()) {
            Some(status) => JiraError::http(status, message),
            None => JiraError::Transport(message),
        })
    }

    pub fn ensure_success(&self) -> Result<()> {
        match self.error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Decodes the JSON payload of a successful call.
    pub fn decode<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.ensure_success()?;
        match &self.payload {
            Some(payload) => serde_json::from_value(payload.clone()).map_err(JiraError::from),
            None => Err(JiraError::Serialization(format!(
                "expected a JSON body (status {})",
                self.status_code.map(|code| code.to_string()).unwrap_or_else(|| "n/a".into())
            ))),
        }
    }
}

/// The two error shapes Jira embeds in failed responses: a list of messages
/// and a mapping of field name to complaint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default, deserialize_with = "deserialize_messages")]
    pub error_messages: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_field_errors")]
    pub errors: BTreeMap<String, String>,
}

impl ApiErrorBody {
    /// Parses a JSON value, returning `None` unless at least one known field is populated.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value::<ApiErrorBody>(value.clone())
            .ok()
            .filter(|body| !body.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.error_messages.is_empty() && self.errors.is_empty()
    }

    /// Renders field errors as `field: complaint, ...`.
    pub fn details(&self) -> String {
        self.errors
            .iter()
            .map(|(field, complaint)| format!("{}: {}", field, complaint))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn deserialize_messages<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().filter_map(coerce_text).collect(),
        Some(other) => coerce_text(other).into_iter().collect(),
        None => Vec::new(),
    })
}

fn deserialize_field_errors<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(field, complaint)| coerce_text(complaint).map(|text| (field, text)))
            .collect(),
        _ => BTreeMap::new(),
    })
}

fn coerce_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Null => None,
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => serde_json::to_string(&other).ok(),
    }
}

fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_found_message_includes_jira_error_messages() {
        let body = json!({"errorMessages": ["Issue does not exist"], "errors": {}}).to_string();
        let result = RequestResult::http_failure(
            StatusCode::NOT_FOUND,
            &Method::GET,
            "https://acme.atlassian.net/rest/api/3/issue/FOC-1",
            body,
        );

        assert!(!result.success);
        assert_eq!(result.status_code, Some(404));
        let message = result.error_message.as_deref().unwrap_or_default();
        assert!(message.contains("Issue does not exist"));
        assert!(message.starts_with("HTTP 404 from Jira API (GET "));
        assert!(result.payload.is_some());
        assert!(result.raw_text.is_none());
    }

    #[test]
    fn field_errors_are_rendered_as_details() {
        let body = json!({
            "errorMessages": [],
            "errors": {"summary": "You must specify a summary of the issue.", "priority": 3}
        })
        .to_string();
        let result =
            RequestResult::http_failure(StatusCode::BAD_REQUEST, &Method::POST, "u/issue", body);

        let message = result.error_message.unwrap_or_default();
        assert!(message.contains("Jira details: priority: 3, summary: You must specify a summary of the issue."));
        assert!(!message.contains("Jira messages"));
    }

    #[test]
    fn non_json_error_body_keeps_generic_message_and_raw_text() {
        let result = RequestResult::http_failure(
            StatusCode::BAD_GATEWAY,
            &Method::GET,
            "u/myself",
            "<html>bad gateway</html>".to_string(),
        );

        let message = result.error_message.as_deref().unwrap_or_default();
        assert!(message.contains("HTTP 502 from Jira API (GET u/myself): Bad Gateway"));
        assert!(!message.contains("Jira messages"));
        assert_eq!(result.raw_text.as_deref(), Some("<html>bad gateway</html>"));
        assert!(result.payload.is_none());
    }

    #[test]
    fn long_error_bodies_are_truncated_in_message() {
        let body = "x".repeat(900);
        let result =
            RequestResult::http_failure(StatusCode::INTERNAL_SERVER_ERROR, &Method::GET, "u", body);
        let message = result.error_message.unwrap_or_default();
        assert!(message.ends_with("..."));
        assert!(message.len() < 700);
    }

    #[test]
    fn success_body_that_is_not_json_falls_back_to_raw_text() {
        let result = RequestResult::from_body(StatusCode::OK, "plain text".to_string());
        assert!(result.success);
        assert_eq!(result.raw_text.as_deref(), Some("plain text"));
        assert!(result.payload.is_none());
        assert!(result.error_message.is_none());
    }

    #[test]
    fn no_content_has_neither_payload_nor_raw_text() {
        let result = RequestResult::no_content(StatusCode::NO_CONTENT);
        assert!(result.is_no_content());
        assert!(result.payload.is_none() && result.raw_text.is_none());
        assert!(result.error().is_none());
    }

    #[test]
    fn transport_failure_maps_to_transport_error() {
        let result = RequestResult::transport_failure("Jira API timeout (GET u): deadline");
        assert_eq!(result.status_code, None);
        match result.error() {
            Some(JiraError::Transport(message)) => assert!(message.contains("timeout")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn decode_requires_success_and_payload() {
        #[derive(Deserialize)]
        struct Keyed {
            key: String,
        }

        let ok = RequestResult::from_body(StatusCode::CREATED, r#"{"key":"FOC-7"}"#.to_string());
        assert_eq!(ok.decode::<Keyed>().map(|k| k.key).ok().as_deref(), Some("FOC-7"));

        let empty = RequestResult::no_content(StatusCode::NO_CONTENT);
        assert!(matches!(empty.decode::<Keyed>(), Err(JiraError::Serialization(_))));

        let failed = RequestResult::http_failure(
            StatusCode::FORBIDDEN,
            &Method::GET,
            "u",
            "{}".to_string(),
        );
        assert!(matches!(failed.decode::<Keyed>(), Err(JiraError::Http { .. })));
    }

    #[test]
    fn api_error_body_accepts_single_string_message() {
        let body = ApiErrorBody::from_value(&json!({"errorMessages": "Boom"}));
        assert_eq!(body.map(|b| b.error_messages), Some(vec!["Boom".to_string()]));
        assert!(ApiErrorBody::from_value(&json!({"key": "FOC-1"})).is_none());
        assert!(ApiErrorBody::from_value(&json!(["not", "an", "object"])).is_none());
    }
}
