//! Mutation observer bridge.
//!
//! Every DOM change, whether the runtime made it or some other script did,
//! funnels through [`Runtime::handle_mutations`]. That is what keeps listeners
//! and the registry consistent without a virtual DOM.
//!
//! | Record | Reaction |
//! |--------|----------|
//! | placeholder `data-link` / `data-props` changed | reload all placeholders |
//! | `data-event` or `data-<kind>-handler` changed | bind that element |
//! | element added | bind its subtree, register component roots in it |
//! | placeholder added | load that placeholder |
//! | element removed | prune registry handles no longer in the document |
//!
//! A batch is processed completely, in record order, before returning.

#[cfg(test)]
#[path = "observer_test.rs"]
mod observer_test;

use std::rc::Rc;

use crate::binder::EventKind;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::host::{Host, Mutation, Query};
use crate::runtime::Runtime;

/// What an attribute change means to the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeChange {
    /// A placeholder's source or props changed.
    ReloadPlaceholders,
    /// The element's event marker changed; bind whatever it now declares.
    BindDeclared,
    /// The handler for one kind changed.
    BindKind(EventKind),
    Ignore,
}

/// Classify an attribute change on an element with tag `tag`.
pub fn classify_attribute(config: &RuntimeConfig, tag: &str, attr: &str) -> AttributeChange {
    if tag.eq_ignore_ascii_case(&config.placeholder_tag)
        && (attr == config.placeholder_link_attr || attr == config.placeholder_props_attr)
    {
        return AttributeChange::ReloadPlaceholders;
    }
    if attr == config.event_attr {
        return AttributeChange::BindDeclared;
    }
    attr.strip_prefix("data-")
        .and_then(|rest| rest.strip_suffix("-handler"))
        .and_then(EventKind::from_name)
        .map_or(AttributeChange::Ignore, AttributeChange::BindKind)
}

impl<H: Host> Runtime<H> {
    /// Subscribe to structural changes on the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when there is no document or the host
    /// cannot create the observer.
    pub fn observe(self: &Rc<Self>) -> Result<(), RuntimeError> {
        let root = self
            .host
            .document_root()
            .ok_or_else(|| RuntimeError::Host("no document to observe".to_owned()))?;
        let weak = Rc::downgrade(self);
        self.host.observe(
            &root,
            Box::new(move |batch: Vec<Mutation<H::Node>>| {
                if let Some(rt) = weak.upgrade() {
                    rt.handle_mutations(batch);
                }
            }),
        )
    }

    /// React to one coalesced batch of change records.
    pub fn handle_mutations(self: &Rc<Self>, batch: Vec<Mutation<H::Node>>) {
        let mut removed_any = false;
        for record in batch {
            match record {
                Mutation::Attribute { target, name } => self.handle_attribute_change(&target, &name),
                Mutation::ChildList { added, removed } => {
                    for node in &added {
                        self.handle_added(node);
                    }
                    removed_any |= !removed.is_empty();
                }
            }
        }
        if removed_any {
            let dropped = self.registry.borrow_mut().prune(|el| self.host.is_connected(el));
            if dropped > 0 {
                log::debug!("pruned {dropped} detached component element(s)");
            }
        }
    }

    fn handle_attribute_change(self: &Rc<Self>, el: &H::Node, attr: &str) {
        let tag = self.host.tag_name(el);
        match classify_attribute(&self.config, &tag, attr) {
            AttributeChange::ReloadPlaceholders => {
                self.load_all();
            }
            AttributeChange::BindDeclared => {
                self.bind_declared(el);
            }
            AttributeChange::BindKind(kind) => {
                let declared = self.host.attribute(el, &self.config.event_attr);
                if declared.as_deref().and_then(EventKind::from_name) == Some(kind) {
                    self.bind_element(el, kind);
                }
            }
            AttributeChange::Ignore => {}
        }
    }

    fn handle_added(self: &Rc<Self>, node: &H::Node) {
        self.bind(node);

        let roots = Query::attr(&self.config.component_attr);
        let mut found = Vec::new();
        if self.host.matches(node, &roots) {
            found.push(node.clone());
        }
        found.extend(self.host.select(node, &roots));
        for el in &found {
            if let Some(name) = self.host.attribute(el, &self.config.component_attr) {
                self.register_element(&name, el);
            }
        }

        if self.host.tag_name(node).eq_ignore_ascii_case(&self.config.placeholder_tag) {
            self.spawn_placeholder_load(node.clone());
        }
    }
}
