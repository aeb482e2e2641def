//! Wire DTOs for the component server endpoints.
//!
//! DESIGN
//! ======
//! Field names mirror the server's JSON exactly (`newState` is camel-cased on
//! the wire, everything else snake-cased).

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/event`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventRequest<'a> {
    pub event_name: &'a str,
    pub args: Vec<Value>,
    pub component_id: Option<String>,
}

/// Body of `POST /api/load-component`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadComponentRequest<'a> {
    pub component_name: &'a str,
    pub props: Value,
}

/// Response of `POST /api/event`. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct EventResponse {
    #[serde(rename = "newState", default)]
    pub new_state: Option<Value>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl EventResponse {
    /// A `newState` that is present and not `null`.
    pub fn state(&self) -> Option<&Value> {
        self.new_state.as_ref().filter(|v| !v.is_null())
    }

    /// Non-empty markup.
    pub fn markup(&self) -> Option<&str> {
        self.html.as_deref().filter(|h| !h.is_empty())
    }

    /// Non-empty error message.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}
