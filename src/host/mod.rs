//! Platform seam between the runtime core and the browser.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything the runtime needs from its environment goes through [`Host`]:
//! DOM queries and writes, listener registration, the structural observer,
//! HTTP, task spawning, history and the live-reload socket. The browser
//! implementation lives in `browser` (behind `hydrate`). Tests drive the real
//! runtime against the in-memory `fake` host.
//!
//! TRADE-OFFS
//! ==========
//! The trait is deliberately coarse (one method per platform call the core
//! makes) rather than a general DOM binding. Element handles are opaque; the
//! runtime never caches anything about an element beyond the handle itself.


#[cfg(feature = "hydrate")]
pub mod browser;
#[cfg(test)]
pub mod fake;

use std::fmt;

use futures::future::LocalBoxFuture;
use futures::stream::LocalBoxStream;
use serde::Serialize;

use crate::binder::EventKind;
use crate::error::RuntimeError;

/// Future returned by host calls that suspend.
pub type HostFuture<T> = LocalBoxFuture<'static, T>;

/// Callback invoked by the host for a platform event.
pub type Listener<E> = Box<dyn Fn(E)>;

/// Callback receiving one coalesced batch of structural changes.
pub type MutationCallback<N> = Box<dyn Fn(Vec<Mutation<N>>)>;

/// One structural change record, restricted to element nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation<N> {
    /// An attribute on `target` was set or removed.
    Attribute { target: N, name: String },
    /// Direct children of some node were added and/or removed.
    ChildList { added: Vec<N>, removed: Vec<N> },
}

/// Element selector understood by [`Host::select`] and [`Host::matches`].
///
/// Covers the three shapes the runtime needs: by tag, by attribute presence
/// and by exact attribute value, optionally combined with a tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Query<'a> {
    pub tag: Option<&'a str>,
    pub attr: Option<&'a str>,
    pub value: Option<&'a str>,
}

impl<'a> Query<'a> {
    pub fn tag(tag: &'a str) -> Self {
        Self { tag: Some(tag), ..Self::default() }
    }

    pub fn attr(attr: &'a str) -> Self {
        Self { attr: Some(attr), ..Self::default() }
    }

    pub fn attr_eq(attr: &'a str, value: &'a str) -> Self {
        Self { tag: None, attr: Some(attr), value: Some(value) }
    }

    /// Restrict an attribute query to one tag name.
    #[must_use]
    pub fn on_tag(self, tag: &'a str) -> Self {
        Self { tag: Some(tag), ..self }
    }

    /// CSS selector equivalent, e.g. `link[rel="stylesheet"]`.
    pub fn to_selector(&self) -> String {
        let mut out = self.tag.unwrap_or("").to_owned();
        match (self.attr, self.value) {
            (Some(attr), Some(value)) => {
                out.push('[');
                out.push_str(attr);
                out.push_str("=\"");
                for ch in value.chars() {
                    if ch == '"' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push_str("\"]");
            }
            (Some(attr), None) => {
                out.push('[');
                out.push_str(attr);
                out.push(']');
            }
            (None, _) => {}
        }
        if out.is_empty() {
            out.push('*');
        }
        out
    }
}

impl fmt::Display for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_selector())
    }
}

/// HTTP verb used by the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A request handed to [`Host::fetch_text`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::Get, url: url.into(), body: None }
    }

    /// Build a JSON `POST`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Json`] if `body` cannot be serialized.
    pub fn post_json<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self, RuntimeError> {
        Ok(Self { method: Method::Post, url: url.into(), body: Some(serde_json::to_string(body)?) })
    }
}

/// The parts of `window.location` the runtime reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    /// Scheme with trailing colon, e.g. `"http:"`.
    pub protocol: String,
    /// Host and port, e.g. `"localhost:3000"`.
    pub host: String,
    pub pathname: String,
}

/// Everything the runtime needs from its platform.
pub trait Host: 'static {
    /// Element handle. Equality is identity.
    type Node: Clone + PartialEq + fmt::Debug + 'static;
    /// Platform event object passed to listeners.
    type Event: 'static;

    // --- DOM reads ---

    /// The document element (`<html>`).
    fn document_root(&self) -> Option<Self::Node>;
    fn body(&self) -> Option<Self::Node>;
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;
    /// Descendants of `root` matching `query`, in document order, `root` excluded.
    fn select(&self, root: &Self::Node, query: &Query<'_>) -> Vec<Self::Node>;
    fn matches(&self, node: &Self::Node, query: &Query<'_>) -> bool;
    /// Nearest ancestor-or-self carrying `attr`.
    fn closest(&self, node: &Self::Node, attr: &str) -> Option<Self::Node>;
    /// Lower-cased tag name.
    fn tag_name(&self, node: &Self::Node) -> String;
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn is_connected(&self, node: &Self::Node) -> bool;

    // --- DOM writes ---

    /// Set an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when the platform rejects the name.
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), RuntimeError>;
    fn set_inner_html(&self, node: &Self::Node, html: &str);
    /// Deep clone of `node`, detached.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when the platform refuses the clone.
    fn clone_node(&self, node: &Self::Node) -> Result<Self::Node, RuntimeError>;
    /// Put `new` where `old` is.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when `old` has no parent.
    fn replace_node(&self, old: &Self::Node, new: &Self::Node) -> Result<(), RuntimeError>;

    // --- Events ---

    /// Attach a listener for `kind` on `node`. Listeners are never removed.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when the platform refuses the listener.
    fn listen(&self, node: &Self::Node, kind: &str, listener: Listener<Self::Event>) -> Result<(), RuntimeError>;
    /// Attach a listener on the window (`popstate`).
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when the platform refuses the listener.
    fn listen_window(&self, kind: &str, listener: Listener<Self::Event>) -> Result<(), RuntimeError>;
    /// Whether this runtime already attached a `kind` listener to `node`.
    fn is_bound(&self, node: &Self::Node, kind: EventKind) -> bool;
    /// Record a `kind` listener on `node`. The record belongs to the element
    /// object itself and is not carried over by cloning or by re-serialized
    /// markup.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when the record cannot be stored.
    fn mark_bound(&self, node: &Self::Node, kind: EventKind) -> Result<(), RuntimeError>;
    fn event_target(&self, event: &Self::Event) -> Option<Self::Node>;
    fn prevent_default(&self, event: &Self::Event);
    /// JSON summary of an event for the server (`{"type": ..., "value"?: ...}`).
    fn describe_event(&self, event: &Self::Event) -> serde_json::Value;

    /// Subscribe to attribute and child-list changes under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when the observer cannot be created.
    fn observe(&self, root: &Self::Node, callback: MutationCallback<Self::Node>) -> Result<(), RuntimeError>;

    // --- Network / tasks ---

    /// Perform a request and return the body text of a 2xx response.
    fn fetch_text(&self, request: HttpRequest) -> HostFuture<Result<String, RuntimeError>>;
    fn spawn(&self, task: HostFuture<()>);
    fn sleep(&self, ms: u32) -> HostFuture<()>;
    /// Open a text-message socket; the stream ends when the socket closes.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when the socket cannot be opened.
    fn open_socket(&self, url: &str) -> Result<LocalBoxStream<'static, String>, RuntimeError>;

    // --- Page ---

    fn location(&self) -> Location;
    /// Push a history entry without navigating.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when history is unavailable.
    fn push_history(&self, url: &str) -> Result<(), RuntimeError>;
    fn reload_page(&self);
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Run a synchronous DOM update, inside a view transition when supported.
    fn view_transition(&self, update: Box<dyn FnOnce()>) {
        update();
    }
}
