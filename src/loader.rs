//! Component loader: placeholders, discovery and full component refresh.
//!
//! SYSTEM CONTEXT
//! ==============
//! `<component data-link="card" data-props='{"id":7}'>` asks the loader to
//! render `card` with those props on the server and inject the result. Each
//! placeholder loads in its own task, so completions arrive in any order.
//! After injection the page's stylesheets are re-inserted with a fresh
//! cache-busting stamp and the placeholder is bound.
//!
//! ERROR HANDLING
//! ==============
//! A placeholder with malformed props or a failed request is reported and
//! left alone (or given `load_error_markup` if configured); its siblings
//! still load. A failed refresh of one component does not stop the others.

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::assets;
use crate::error::RuntimeError;
use crate::host::{Host, Query};
use crate::net::api;
use crate::runtime::Runtime;

/// Parse a placeholder's props. A missing or empty attribute means `{}`.
///
/// # Errors
///
/// Returns [`RuntimeError::MalformedProps`] for invalid JSON.
pub fn parse_props(raw: Option<&str>, link: &str) -> Result<Value, RuntimeError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Value::Object(Map::new())),
        Some(text) => serde_json::from_str(text).map_err(|source| RuntimeError::MalformedProps {
            link: link.to_owned(),
            source,
        }),
    }
}

impl<H: Host> Runtime<H> {
    /// Discover every component root in the document, register and bind it,
    /// then load all placeholders.
    pub fn initialize_components(self: &Rc<Self>) {
        if let Some(doc) = self.host.document_root() {
            for el in self.host.select(&doc, &Query::attr(&self.config.component_attr)) {
                if let Some(name) = self.host.attribute(&el, &self.config.component_attr) {
                    self.register_element(&name, &el);
                }
            }
        }
        self.load_all();
    }

    /// Start a load for every placeholder in the document.
    ///
    /// Returns the number of loads started.
    pub fn load_all(self: &Rc<Self>) -> usize {
        let Some(doc) = self.host.document_root() else {
            return 0;
        };
        let placeholders = self.host.select(&doc, &Query::tag(&self.config.placeholder_tag));
        let count = placeholders.len();
        for tag in placeholders {
            self.spawn_placeholder_load(tag);
        }
        count
    }

    pub(crate) fn spawn_placeholder_load(self: &Rc<Self>, tag: H::Node) {
        let rt = Rc::clone(self);
        self.spawn_logged("error loading component", async move { rt.load_placeholder(&tag).await });
    }

    /// Load one placeholder: render it on the server, inject, restyle, bind.
    ///
    /// # Errors
    ///
    /// Malformed props or the transport error of the request.
    pub async fn load_placeholder(self: &Rc<Self>, tag: &H::Node) -> Result<(), RuntimeError> {
        let Some(link) = self.host.attribute(tag, &self.config.placeholder_link_attr) else {
            log::warn!("placeholder without {} skipped", self.config.placeholder_link_attr);
            return Ok(());
        };
        let raw_props = self.host.attribute(tag, &self.config.placeholder_props_attr);
        let props = parse_props(raw_props.as_deref(), &link)?;

        let html = match api::load_component(self.host.as_ref(), &self.config, &link, props).await {
            Ok(html) => html,
            Err(e) => {
                if let Some(fallback) = &self.config.load_error_markup {
                    self.host.set_inner_html(tag, fallback);
                }
                return Err(e);
            }
        };

        self.host.set_inner_html(tag, &html);
        self.reapply_stylesheets();
        self.bind(tag);
        Ok(())
    }

    /// Re-insert every stylesheet link (with a fresh stamp) and style block so
    /// freshly injected markup picks up current styles.
    ///
    /// Returns the number of nodes replaced.
    pub fn reapply_stylesheets(&self) -> usize {
        let Some(doc) = self.host.document_root() else {
            return 0;
        };
        let stamp = self.host.now_ms();
        let mut replaced = 0;

        for link in self.host.select(&doc, &Query::attr_eq("rel", "stylesheet").on_tag("link")) {
            let result = self.host.clone_node(&link).and_then(|clone| {
                if let Some(href) = self.host.attribute(&clone, "href") {
                    self.host.set_attribute(&clone, "href", &assets::cache_bust(&href, stamp))?;
                }
                self.host.replace_node(&link, &clone)
            });
            match result {
                Ok(()) => replaced += 1,
                Err(e) => log::warn!("stylesheet re-apply failed: {e}"),
            }
        }

        for style in self.host.select(&doc, &Query::tag("style")) {
            match self.host.clone_node(&style).and_then(|clone| self.host.replace_node(&style, &clone)) {
                Ok(()) => replaced += 1,
                Err(e) => log::warn!("style re-apply failed: {e}"),
            }
        }
        replaced
    }

    /// Re-fetch every registered component, one name at a time.
    pub async fn update_components(self: &Rc<Self>) {
        let names = self.registry.borrow().names();
        for name in names {
            if let Err(e) = self.update_component(&name).await {
                log::error!("update error for `{name}`: {e}");
            }
        }
    }

    /// Re-fetch `name` and replace the content of every element rendering it.
    ///
    /// Returns the number of elements updated.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the request; the DOM is untouched.
    pub async fn update_component(self: &Rc<Self>, name: &str) -> Result<usize, RuntimeError> {
        let html = api::fetch_component(self.host.as_ref(), &self.config, name).await?;
        let Some(doc) = self.host.document_root() else {
            return Ok(0);
        };
        let elements = self.host.select(&doc, &Query::attr_eq(&self.config.component_attr, name));
        for el in &elements {
            self.host.set_inner_html(el, &html);
            self.register_element(name, el);
        }
        Ok(elements.len())
    }
}
