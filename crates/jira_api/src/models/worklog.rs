use serde::{Deserialize, Serialize};

use super::document::AdfDocument;
use super::field::deserialize_string_field;

/// Body of `POST issue/{key}/worklog`.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorklogCreateRequest {
    pub time_spent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<AdfDocument>,
}

/// Created worklog; Jira echoes back its id.
#[derive(Debug, Deserialize, Clone)]
pub struct WorklogCreated {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
}
