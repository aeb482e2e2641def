//! Runtime configuration.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host page may set `window.RUNTIME_CONFIG` to a JSON object before the
//! runtime starts. Any field it omits keeps the default below, and the
//! defaults match the markup the component server emits.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::Deserialize;

use crate::binder::EventKind;

/// Tunables and DOM-contract names for one runtime instance.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Attribute carrying the component name on a component root.
    pub component_attr: String,
    /// Attribute carrying the component instance identifier.
    pub component_id_attr: String,
    /// Attribute naming the interaction kind an element fires.
    pub event_attr: String,
    /// Attribute marking anchors handled by the router.
    pub link_attr: String,
    /// Tag name of declarative placeholders.
    pub placeholder_tag: String,
    /// Placeholder attribute naming the component to load.
    pub placeholder_link_attr: String,
    /// Placeholder attribute holding JSON props.
    pub placeholder_props_attr: String,
    /// Element id whose content the router replaces.
    pub root_id: String,
    /// `GET {component_endpoint}/{name}` returns fresh component markup.
    pub component_endpoint: String,
    /// `POST` target for dispatched events.
    pub event_endpoint: String,
    /// `POST` target for placeholder loads.
    pub load_endpoint: String,
    /// Path of the live-reload socket.
    pub reload_socket_path: String,
    /// Skip elements already bound for a kind instead of stacking listeners.
    pub idempotent_binding: bool,
    /// Connect the live-reload socket (plaintext pages only).
    pub live_reload: bool,
    /// Markup injected into a placeholder whose load failed. `None` leaves it untouched.
    pub load_error_markup: Option<String>,
    /// `log` level name used by the browser logger.
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            component_attr: "data-pyreact-component".to_owned(),
            component_id_attr: "data-component-id".to_owned(),
            event_attr: "data-event".to_owned(),
            link_attr: "data-pyreact-link".to_owned(),
            placeholder_tag: "component".to_owned(),
            placeholder_link_attr: "data-link".to_owned(),
            placeholder_props_attr: "data-props".to_owned(),
            root_id: "root".to_owned(),
            component_endpoint: "/api/component".to_owned(),
            event_endpoint: "/api/event".to_owned(),
            load_endpoint: "/api/load-component".to_owned(),
            reload_socket_path: "/ws".to_owned(),
            idempotent_binding: true,
            live_reload: true,
            load_error_markup: None,
            log_level: "info".to_owned(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a config overlay, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns the serde error when `value` is not an object of known shape.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// `data-<kind>-handler`.
    pub fn handler_attr(&self, kind: EventKind) -> String {
        format!("data-{}-handler", kind.as_str())
    }

    /// URL that renders the named component.
    pub fn component_url(&self, name: &str) -> String {
        format!("{}/{name}", self.component_endpoint.trim_end_matches('/'))
    }

    /// Resolved `log` level, defaulting to `Info` for unknown names.
    pub fn level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }
}
