//! [`Host`] implementation over `web-sys`, `gloo-net` and `gloo-timers`.
//!
//! Listener and observer closures are leaked with `Closure::forget`; they
//! live as long as the page.

use std::time::Duration;

use futures::StreamExt;
use futures::future;
use futures::stream::LocalBoxStream;
use gloo_net::websocket::Message;
use gloo_net::websocket::futures::WebSocket;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Event, MutationObserver, MutationObserverInit, MutationRecord, Window};

use super::{Host, HostFuture, HttpRequest, Listener, Location, Method, Mutation, MutationCallback, Query};
use crate::binder::{EventKind, kinds_contain, kinds_with};
use crate::error::RuntimeError;

/// Expando property on element objects listing the kinds bound by the runtime.
const BOUND_PROPERTY: &str = "__componentRuntimeBound";

fn js_err(err: JsValue) -> RuntimeError {
    RuntimeError::Host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn net_err(err: gloo_net::Error) -> RuntimeError {
    RuntimeError::Network(err.to_string())
}

/// The live browser page.
#[derive(Debug)]
pub struct BrowserHost {
    window: Window,
    document: Document,
}

impl BrowserHost {
    /// Bind to the current window and document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] outside a browser window.
    pub fn new() -> Result<Self, RuntimeError> {
        let window = web_sys::window().ok_or_else(|| RuntimeError::Host("no window".to_owned()))?;
        let document = window
            .document()
            .ok_or_else(|| RuntimeError::Host("no document".to_owned()))?;
        Ok(Self { window, document })
    }

    /// Read `window[name]` as JSON. `None` when unset or not serializable.
    pub fn read_global_json(&self, name: &str) -> Option<serde_json::Value> {
        let value = js_sys::Reflect::get(&self.window, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED);
        if value.is_undefined() || value.is_null() {
            return None;
        }
        match js_to_json(&value) {
            Ok(json) => Some(json),
            Err(e) => {
                log::warn!("window.{name} is not JSON-compatible: {e}");
                None
            }
        }
    }

    /// Run `callback` once the document has been parsed.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when the listener cannot be attached.
    pub fn on_ready(&self, callback: impl FnOnce() + 'static) -> Result<(), RuntimeError> {
        if self.document.ready_state() != "loading" {
            callback();
            return Ok(());
        }
        let closure = Closure::once_into_js(callback);
        self.document
            .add_event_listener_with_callback("DOMContentLoaded", closure.unchecked_ref())
            .map_err(js_err)
    }

    fn add_listener(
        target: &web_sys::EventTarget,
        kind: &str,
        listener: Listener<Event>,
    ) -> Result<(), RuntimeError> {
        let closure = Closure::wrap(listener);
        target
            .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
            .map_err(js_err)?;
        closure.forget();
        Ok(())
    }
}

/// Convert a JS value through `JSON.stringify`. Values with no JSON form
/// (`undefined`, functions) become `null`.
pub(crate) fn js_to_json(value: &JsValue) -> Result<serde_json::Value, RuntimeError> {
    let text = js_sys::JSON::stringify(value).map_err(js_err)?;
    match text.as_string() {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(serde_json::Value::Null),
    }
}

pub(crate) fn json_to_js(value: &serde_json::Value) -> Result<JsValue, RuntimeError> {
    js_sys::JSON::parse(&serde_json::to_string(value)?).map_err(js_err)
}

fn elements_of(list: &web_sys::NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_ref::<Element>().cloned())
        .collect()
}

fn convert_record(record: &MutationRecord) -> Option<Mutation<Element>> {
    match record.type_().as_str() {
        "attributes" => {
            let target = record.target()?.dyn_ref::<Element>()?.clone();
            let name = record.attribute_name()?;
            Some(Mutation::Attribute { target, name })
        }
        "childList" => Some(Mutation::ChildList {
            added: elements_of(&record.added_nodes()),
            removed: elements_of(&record.removed_nodes()),
        }),
        _ => None,
    }
}

fn event_value(event: &Event) -> Option<serde_json::Value> {
    let target = event.target()?;
    if let Some(input) = target.dyn_ref::<web_sys::HtmlInputElement>() {
        if input.type_() == "checkbox" || input.type_() == "radio" {
            return Some(serde_json::Value::Bool(input.checked()));
        }
        return Some(serde_json::Value::String(input.value()));
    }
    if let Some(area) = target.dyn_ref::<web_sys::HtmlTextAreaElement>() {
        return Some(serde_json::Value::String(area.value()));
    }
    if let Some(select) = target.dyn_ref::<web_sys::HtmlSelectElement>() {
        return Some(serde_json::Value::String(select.value()));
    }
    None
}

impl Host for BrowserHost {
    type Node = Element;
    type Event = Event;

    fn document_root(&self) -> Option<Element> {
        self.document.document_element()
    }

    fn body(&self) -> Option<Element> {
        self.document.body().map(Element::from)
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn select(&self, root: &Element, query: &Query<'_>) -> Vec<Element> {
        match root.query_selector_all(&query.to_selector()) {
            Ok(list) => elements_of(&list),
            Err(e) => {
                log::warn!("selector {query} failed: {}", js_err(e));
                Vec::new()
            }
        }
    }

    fn matches(&self, node: &Element, query: &Query<'_>) -> bool {
        node.matches(&query.to_selector()).unwrap_or(false)
    }

    fn closest(&self, node: &Element, attr: &str) -> Option<Element> {
        node.closest(&Query::attr(attr).to_selector()).unwrap_or(None)
    }

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name().to_ascii_lowercase()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) -> Result<(), RuntimeError> {
        node.set_attribute(name, value).map_err(js_err)
    }

    fn set_inner_html(&self, node: &Element, html: &str) {
        node.set_inner_html(html);
    }

    fn clone_node(&self, node: &Element) -> Result<Element, RuntimeError> {
        node.clone_node_with_deep(true)
            .map_err(js_err)?
            .dyn_into::<Element>()
            .map_err(|_| RuntimeError::Host("clone is not an element".to_owned()))
    }

    fn replace_node(&self, old: &Element, new: &Element) -> Result<(), RuntimeError> {
        let parent = old
            .parent_node()
            .ok_or_else(|| RuntimeError::Host("node has no parent".to_owned()))?;
        parent.replace_child(new, old).map_err(js_err)?;
        Ok(())
    }

    fn listen(&self, node: &Element, kind: &str, listener: Listener<Event>) -> Result<(), RuntimeError> {
        Self::add_listener(node, kind, listener)
    }

    fn listen_window(&self, kind: &str, listener: Listener<Event>) -> Result<(), RuntimeError> {
        Self::add_listener(&self.window, kind, listener)
    }

    fn is_bound(&self, node: &Element, kind: EventKind) -> bool {
        let kinds = js_sys::Reflect::get(node, &JsValue::from_str(BOUND_PROPERTY))
            .unwrap_or(JsValue::UNDEFINED)
            .as_string();
        kinds_contain(kinds.as_deref(), kind)
    }

    fn mark_bound(&self, node: &Element, kind: EventKind) -> Result<(), RuntimeError> {
        let key = JsValue::from_str(BOUND_PROPERTY);
        let kinds = js_sys::Reflect::get(node, &key).unwrap_or(JsValue::UNDEFINED).as_string();
        js_sys::Reflect::set(node, &key, &JsValue::from_str(&kinds_with(kinds.as_deref(), kind))).map_err(js_err)?;
        Ok(())
    }

    fn event_target(&self, event: &Event) -> Option<Element> {
        event.target()?.dyn_ref::<Element>().cloned()
    }

    fn prevent_default(&self, event: &Event) {
        event.prevent_default();
    }

    fn describe_event(&self, event: &Event) -> serde_json::Value {
        let mut summary = serde_json::json!({ "type": event.type_() });
        if let Some(value) = event_value(event) {
            summary["value"] = value;
        }
        summary
    }

    fn observe(&self, root: &Element, callback: MutationCallback<Element>) -> Result<(), RuntimeError> {
        let closure = Closure::<dyn Fn(js_sys::Array, MutationObserver)>::wrap(Box::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                let batch = records
                    .iter()
                    .filter_map(|r| r.dyn_ref::<MutationRecord>().and_then(convert_record))
                    .collect();
                callback(batch);
            },
        ));
        let observer = MutationObserver::new(closure.as_ref().unchecked_ref()).map_err(js_err)?;
        let init = MutationObserverInit::new();
        init.set_attributes(true);
        init.set_child_list(true);
        init.set_subtree(true);
        observer.observe_with_options(root, &init).map_err(js_err)?;
        closure.forget();
        Ok(())
    }

    fn fetch_text(&self, request: HttpRequest) -> HostFuture<Result<String, RuntimeError>> {
        Box::pin(async move {
            let HttpRequest { method, url, body } = request;
            let response = match method {
                Method::Get => gloo_net::http::Request::get(&url).send().await,
                Method::Post => {
                    gloo_net::http::Request::post(&url)
                        .header("Content-Type", "application/json")
                        .body(body.unwrap_or_default())
                        .map_err(net_err)?
                        .send()
                        .await
                }
            }
            .map_err(net_err)?;
            if !(200..300).contains(&response.status()) {
                return Err(RuntimeError::Status { url, status: response.status() });
            }
            response.text().await.map_err(net_err)
        })
    }

    fn spawn(&self, task: HostFuture<()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn sleep(&self, ms: u32) -> HostFuture<()> {
        Box::pin(gloo_timers::future::sleep(Duration::from_millis(u64::from(ms))))
    }

    fn open_socket(&self, url: &str) -> Result<LocalBoxStream<'static, String>, RuntimeError> {
        let socket = WebSocket::open(url).map_err(|e| RuntimeError::Host(e.to_string()))?;
        let (_sink, messages) = socket.split();
        Ok(messages
            .take_while(|msg| future::ready(msg.is_ok()))
            .filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => Some(text),
                    _ => None,
                })
            })
            .boxed_local())
    }

    fn location(&self) -> Location {
        let location = self.window.location();
        Location {
            protocol: location.protocol().unwrap_or_default(),
            host: location.host().unwrap_or_default(),
            pathname: location.pathname().unwrap_or_default(),
        }
    }

    fn push_history(&self, url: &str) -> Result<(), RuntimeError> {
        self.window
            .history()
            .map_err(js_err)?
            .push_state_with_url(&JsValue::NULL, "", Some(url))
            .map_err(js_err)
    }

    fn reload_page(&self) {
        if let Err(e) = self.window.location().reload() {
            log::error!("reload failed: {}", js_err(e));
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn view_transition(&self, update: Box<dyn FnOnce()>) {
        let document: &JsValue = self.document.as_ref();
        let start = js_sys::Reflect::get(document, &JsValue::from_str("startViewTransition"))
            .unwrap_or(JsValue::UNDEFINED);
        let Some(start) = start.dyn_ref::<js_sys::Function>() else {
            update();
            return;
        };
        let callback = Closure::once_into_js(move || update());
        if let Err(e) = start.call1(document, &callback) {
            log::warn!("view transition failed: {}", js_err(e));
        }
    }
}
