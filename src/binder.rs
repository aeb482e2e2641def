//! Event binder: attach dispatch listeners to declaratively marked elements.
//!
//! An interactive element opts in with `data-event="<kind>"` plus
//! `data-<kind>-handler="<server handler>"`. A bind pass over a subtree
//! (root included) attaches one listener per such element and kind.
//!
//! DESIGN
//! ======
//! With `idempotent_binding` on (the default) the host records each
//! (element, kind) pair once its listener is attached and later passes skip
//! it, so any number of passes leaves exactly one listener. The record lives
//! on the element object, not in its markup, so a cloned or re-rendered copy
//! of a bound element is bound afresh. With the option off, every pass stacks
//! another listener.
//!
//! The handler name is read when the listener fires, not when it is bound.

#[cfg(test)]
#[path = "binder_test.rs"]
mod binder_test;

use std::rc::Rc;

use crate::dispatch::DispatchArg;
use crate::host::{Host, Query};
use crate::runtime::Runtime;

/// Interaction kinds the binder understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Input,
    Change,
    Submit,
}

impl EventKind {
    pub const ALL: [Self; 4] = [Self::Click, Self::Input, Self::Change, Self::Submit];

    /// DOM event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Input => "input",
            Self::Change => "change",
            Self::Submit => "submit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name.trim())
    }
}

/// Whether a space-separated list of bound kinds contains `kind`.
pub(crate) fn kinds_contain(kinds: Option<&str>, kind: EventKind) -> bool {
    kinds.is_some_and(|m| m.split_whitespace().any(|k| k == kind.as_str()))
}

/// Bound-kinds list with `kind` added.
pub(crate) fn kinds_with(kinds: Option<&str>, kind: EventKind) -> String {
    match kinds.map(str::trim) {
        Some(m) if !m.is_empty() => format!("{m} {}", kind.as_str()),
        _ => kind.as_str().to_owned(),
    }
}

impl<H: Host> Runtime<H> {
    /// Run a bind pass over `root` and its descendants.
    ///
    /// Returns the number of listeners attached.
    pub fn bind(self: &Rc<Self>, root: &H::Node) -> usize {
        let mut attached = 0;
        for kind in EventKind::ALL {
            let query = Query::attr_eq(&self.config.event_attr, kind.as_str());
            let mut targets = Vec::new();
            if self.host.matches(root, &query) {
                targets.push(root.clone());
            }
            targets.extend(self.host.select(root, &query));
            for el in &targets {
                if self.bind_element(el, kind) {
                    attached += 1;
                }
            }
        }
        attached
    }

    /// Bind every kind `el` declares via its event marker.
    pub(crate) fn bind_declared(self: &Rc<Self>, el: &H::Node) -> usize {
        let Some(kind) = self
            .host
            .attribute(el, &self.config.event_attr)
            .and_then(|name| EventKind::from_name(&name))
        else {
            return 0;
        };
        usize::from(self.bind_element(el, kind))
    }

    /// Attach a `kind` listener to `el` if it declares a handler.
    ///
    /// Returns `false` when there is no handler, the element is already bound
    /// for `kind` (idempotent mode), or the host refused the listener. A
    /// refused element stays unrecorded so a later pass retries it.
    pub(crate) fn bind_element(self: &Rc<Self>, el: &H::Node, kind: EventKind) -> bool {
        if self.handler_for(el, kind).is_none() {
            return false;
        }
        if self.config.idempotent_binding && self.host.is_bound(el, kind) {
            return false;
        }

        let weak = Rc::downgrade(self);
        let target = el.clone();
        let listener = Box::new(move |event: H::Event| {
            if let Some(rt) = weak.upgrade() {
                rt.on_interaction(&target, kind, event);
            }
        });
        if let Err(e) = self.host.listen(el, kind.as_str(), listener) {
            log::warn!("could not attach {} listener: {e}", kind.as_str());
            return false;
        }
        if self.config.idempotent_binding {
            if let Err(e) = self.host.mark_bound(el, kind) {
                log::warn!("could not record {} binding: {e}", kind.as_str());
            }
        }
        true
    }

    /// Current handler name declared on `el` for `kind`.
    pub(crate) fn handler_for(&self, el: &H::Node, kind: EventKind) -> Option<String> {
        self.host
            .attribute(el, &self.config.handler_attr(kind))
            .filter(|h| !h.trim().is_empty())
    }

    fn on_interaction(self: &Rc<Self>, el: &H::Node, kind: EventKind, event: H::Event) {
        self.host.prevent_default(&event);
        let Some(handler) = self.handler_for(el, kind) else {
            log::debug!("{} fired on element without handler", kind.as_str());
            return;
        };
        let rt = Rc::clone(self);
        self.spawn_logged("event trigger error", async move {
            rt.trigger(&handler, vec![DispatchArg::Event(event)]).await.map(|_| ())
        });
    }
}
