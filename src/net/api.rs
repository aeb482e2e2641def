//! Calls to the component server, expressed as host requests.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures come back as [`RuntimeError`]; the caller decides
//! whether to log, fall back or propagate. Nothing here retries.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use serde_json::Value;

use super::types::{EventRequest, EventResponse, LoadComponentRequest};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::host::{Host, HttpRequest};

fn event_request(config: &RuntimeConfig, body: &EventRequest<'_>) -> Result<HttpRequest, RuntimeError> {
    HttpRequest::post_json(config.event_endpoint.as_str(), body)
}

fn load_request(config: &RuntimeConfig, name: &str, props: Value) -> Result<HttpRequest, RuntimeError> {
    let body = LoadComponentRequest { component_name: name, props };
    HttpRequest::post_json(config.load_endpoint.as_str(), &body)
}

/// Send an event to `POST /api/event` and decode the JSON reply.
///
/// # Errors
///
/// Transport errors, or [`RuntimeError::Json`] for a body that is not JSON.
pub async fn post_event<H: Host>(
    host: &H,
    config: &RuntimeConfig,
    body: &EventRequest<'_>,
) -> Result<EventResponse, RuntimeError> {
    let text = host.fetch_text(event_request(config, body)?).await?;
    Ok(serde_json::from_str(&text)?)
}

/// Render a placeholder component via `POST /api/load-component`.
///
/// # Errors
///
/// Returns the transport error of the request.
pub async fn load_component<H: Host>(
    host: &H,
    config: &RuntimeConfig,
    name: &str,
    props: Value,
) -> Result<String, RuntimeError> {
    host.fetch_text(load_request(config, name, props)?).await
}

/// Fetch fresh markup for a registered component via `GET /api/component/{name}`.
///
/// # Errors
///
/// Returns the transport error of the request.
pub async fn fetch_component<H: Host>(host: &H, config: &RuntimeConfig, name: &str) -> Result<String, RuntimeError> {
    host.fetch_text(HttpRequest::get(config.component_url(name))).await
}

/// Fetch a page's HTML for the router.
///
/// # Errors
///
/// Returns the transport error of the request.
pub async fn fetch_page<H: Host>(host: &H, url: &str) -> Result<String, RuntimeError> {
    host.fetch_text(HttpRequest::get(url)).await
}
