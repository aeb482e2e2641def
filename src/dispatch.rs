//! Dispatch engine: forward an interaction to the server and reconcile the reply.
//!
//! SYSTEM CONTEXT
//! ==============
//! `trigger` posts `{event_name, args, component_id}` to the event endpoint.
//! The reply is reduced to exactly one [`DispatchOutcome`]:
//!
//! | Reply carries | Outcome | DOM effect |
//! |---------------|---------|------------|
//! | `newState` | `StateRefresh` | state replaced, every registered component re-fetched |
//! | `html` | `MarkupPatch` | content of the one element with the resolved id replaced |
//! | `error` | `Error` | none, logged |
//! | nothing | `NoOp` | none |
//!
//! `newState` wins when several fields are present.
//!
//! ERROR HANDLING
//! ==============
//! Transport and decode failures are returned (and logged by the listener that
//! spawned the dispatch). There is no retry and no cancellation; a second
//! trigger for the same component races the first.

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;

use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::error::RuntimeError;
use crate::host::{Host, Query};
use crate::net::api;
use crate::net::types::{EventRequest, EventResponse};
use crate::runtime::Runtime;

/// One argument of a dispatch.
#[derive(Clone, Debug)]
pub enum DispatchArg<E> {
    /// A platform event. The first one determines the target component.
    Event(E),
    /// Any JSON value.
    Value(Value),
}

/// What a dispatch reply asks the runtime to do.
///
/// Serializes as `{"kind": "stateRefresh" | "markupPatch" | "error" | "noOp", "detail"?: ...}`
/// for page script.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum DispatchOutcome {
    StateRefresh(Value),
    MarkupPatch { component_id: Option<String>, html: String },
    Error(String),
    NoOp,
}

impl DispatchOutcome {
    /// Reduce a reply to its single active case.
    pub fn from_response(response: EventResponse, component_id: Option<String>) -> Self {
        if let Some(state) = response.state() {
            return Self::StateRefresh(state.clone());
        }
        if let Some(html) = response.markup() {
            return Self::MarkupPatch { component_id, html: html.to_owned() };
        }
        if let Some(message) = response.error_message() {
            return Self::Error(message.to_owned());
        }
        Self::NoOp
    }
}

impl<H: Host> Runtime<H> {
    /// Send `handler` with `args` to the server and apply the reply.
    ///
    /// # Errors
    ///
    /// Transport errors and undecodable replies. Server-reported errors are
    /// `Ok(DispatchOutcome::Error(_))`.
    pub async fn trigger(
        self: &Rc<Self>,
        handler: &str,
        args: Vec<DispatchArg<H::Event>>,
    ) -> Result<DispatchOutcome, RuntimeError> {
        let component_id = self.resolve_component_id(&args);
        let body = EventRequest {
            event_name: handler,
            args: args.iter().map(|arg| self.arg_to_json(arg)).collect(),
            component_id: component_id.clone(),
        };
        let response = api::post_event(self.host.as_ref(), &self.config, &body).await?;
        let outcome = DispatchOutcome::from_response(response, component_id);
        self.apply_outcome(&outcome).await;
        Ok(outcome)
    }

    /// [`trigger`](Self::trigger) for page script, with the outcome as JSON.
    ///
    /// # Errors
    ///
    /// As [`trigger`](Self::trigger).
    pub async fn trigger_json(
        self: &Rc<Self>,
        handler: &str,
        args: Vec<DispatchArg<H::Event>>,
    ) -> Result<Value, RuntimeError> {
        let outcome = self.trigger(handler, args).await?;
        Ok(serde_json::to_value(&outcome)?)
    }

    /// Instance id of the component owning the first event's target.
    pub fn resolve_component_id(&self, args: &[DispatchArg<H::Event>]) -> Option<String> {
        let event = args.iter().find_map(|arg| match arg {
            DispatchArg::Event(event) => Some(event),
            DispatchArg::Value(_) => None,
        })?;
        let target = self.host.event_target(event)?;
        let owner = self.host.closest(&target, &self.config.component_id_attr)?;
        self.host.attribute(&owner, &self.config.component_id_attr)
    }

    fn arg_to_json(&self, arg: &DispatchArg<H::Event>) -> Value {
        match arg {
            DispatchArg::Event(event) => self.host.describe_event(event),
            DispatchArg::Value(value) => value.clone(),
        }
    }

    async fn apply_outcome(self: &Rc<Self>, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::StateRefresh(snapshot) => {
                {
                    let mut state = self.state.borrow_mut();
                    state.replace(snapshot.clone());
                    self.registry.borrow_mut().sync_state(&state);
                }
                self.update_components().await;
            }
            DispatchOutcome::MarkupPatch { component_id, html } => {
                if !self.patch_component(component_id.as_deref(), html) {
                    log::debug!("markup patch matched no component (id {component_id:?})");
                }
            }
            DispatchOutcome::Error(message) => log::error!("event error: {message}"),
            DispatchOutcome::NoOp => {}
        }
    }

    /// Replace the content of the element whose instance id is `component_id`.
    ///
    /// Returns whether an element matched.
    pub(crate) fn patch_component(self: &Rc<Self>, component_id: Option<&str>, html: &str) -> bool {
        let Some(id) = component_id else {
            return false;
        };
        let Some(doc) = self.host.document_root() else {
            return false;
        };
        let query = Query::attr_eq(&self.config.component_id_attr, id);
        let Some(el) = self.host.select(&doc, &query).into_iter().next() else {
            return false;
        };
        self.host.set_inner_html(&el, html);
        match self.host.attribute(&el, &self.config.component_attr) {
            Some(name) => self.register_element(&name, &el),
            None => {
                self.bind(&el);
            }
        }
        true
    }
}
