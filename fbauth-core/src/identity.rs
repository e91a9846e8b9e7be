use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A verified caller, as handed to request handlers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub claims: Option<HashMap<String, String>>,
}

impl Identity {
    /// Fixed identity returned for the emulator's `owner` token.
    pub(crate) fn emulator_owner() -> Self {
        Self {
            uid: "owner".to_string(),
            email: Some("owner@example.com".to_string()),
            email_verified: Some(true),
            claims: Some(HashMap::from([("admin".to_string(), "true".to_string())])),
        }
    }

    /// Value of a custom claim, if present.
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims
            .as_ref()
            .and_then(|claims| claims.get(name))
            .map(String::as_str)
    }
}
