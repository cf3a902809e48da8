//! Identity models returned by the `myself` endpoint.

use serde::Deserialize;

/// The authenticated user; only the account id is required downstream.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Myself {
    pub account_id: String,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}
