//! The runtime context shared by every engine component.
//!
//! SYSTEM CONTEXT
//! ==============
//! A [`Runtime`] is built once at startup from an injected [`Host`], the
//! configuration and the bootstrap state snapshot, and is shared as
//! `Rc<Runtime<H>>`. Binder, loader, dispatch, observer, router and
//! live-reload are `impl` blocks on this type in their own modules.
//!
//! CONCURRENCY
//! ===========
//! Single-threaded. Registry and state live in `RefCell`s and are never
//! borrowed across an `.await`. In-flight requests are not serialized, so
//! overlapping dispatches race and the last response to arrive wins.

#[cfg(test)]
#[path = "runtime_test.rs"]
mod runtime_test;

use std::cell::{Ref, RefCell};
use std::future::Future;
use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::host::Host;
use crate::registry::Registry;
use crate::state::GlobalState;

/// Process-wide runtime state, owned through an `Rc`.
pub struct Runtime<H: Host> {
    pub(crate) host: Rc<H>,
    pub(crate) config: RuntimeConfig,
    pub(crate) registry: RefCell<Registry<H::Node>>,
    pub(crate) state: RefCell<GlobalState>,
}

impl<H: Host> Runtime<H> {
    /// Build a runtime. `initial_state` is the bootstrap snapshot.
    pub fn new(host: Rc<H>, config: RuntimeConfig, initial_state: serde_json::Value) -> Rc<Self> {
        Rc::new(Self {
            host,
            config,
            registry: RefCell::new(Registry::new()),
            state: RefCell::new(GlobalState::from_value(initial_state)),
        })
    }

    /// Page-load sequence: discover and bind components, install the router,
    /// connect live-reload, then start observing the document.
    pub fn start(self: &Rc<Self>) {
        self.initialize_components();
        if let Err(e) = self.setup_routing() {
            log::error!("router setup failed: {e}");
        }
        self.start_live_reload();
        if let Err(e) = self.observe() {
            log::error!("mutation observer setup failed: {e}");
        }
        log::debug!("runtime started with {} component(s)", self.registry.borrow().len());
    }

    pub fn registry(&self) -> Ref<'_, Registry<H::Node>> {
        self.registry.borrow()
    }

    pub fn state(&self) -> Ref<'_, GlobalState> {
        self.state.borrow()
    }

    /// Register `element` under `name` and bind its subtree.
    pub(crate) fn register_element(self: &Rc<Self>, name: &str, element: &H::Node) {
        let id = self.host.attribute(element, &self.config.component_id_attr);
        let created = {
            let state = self.state.borrow();
            self.registry.borrow_mut().register(name, element.clone(), id, &state)
        };
        if created {
            log::debug!("registered component `{name}`");
        }
        self.bind(element);
    }

    /// Spawn a task whose error, if any, is logged under `context`.
    pub(crate) fn spawn_logged<F>(&self, context: &'static str, task: F)
    where
        F: Future<Output = Result<(), RuntimeError>> + 'static,
    {
        self.host.spawn(Box::pin(async move {
            if let Err(e) = task.await {
                log::error!("{context}: {e}");
            }
        }));
    }
}
