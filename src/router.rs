//! Client-side navigation for internal links.
//!
//! Clicks on anchors marked with the link attribute whose `href` is a path
//! (`/orders`) are intercepted: the URL is pushed onto history, its HTML is
//! fetched and swapped into the root container, and components inside are
//! initialized. Back/forward replays the fetch without pushing. A failed
//! fetch leaves the current content in place.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::host::Host;
use crate::net::api;
use crate::runtime::Runtime;

/// Whether `href` stays on this origin as a path (`/x`, not `//host/x`).
pub fn is_internal_href(href: &str) -> bool {
    href.starts_with('/') && !href.starts_with("//")
}

impl<H: Host> Runtime<H> {
    /// Install the delegated click listener and the `popstate` listener.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Host`] when there is no body or a listener is refused.
    pub fn setup_routing(self: &Rc<Self>) -> Result<(), RuntimeError> {
        let body = self
            .host
            .body()
            .ok_or_else(|| RuntimeError::Host("no document body for router".to_owned()))?;

        let weak = Rc::downgrade(self);
        self.host.listen(
            &body,
            "click",
            Box::new(move |event: H::Event| {
                if let Some(rt) = weak.upgrade() {
                    rt.on_document_click(event);
                }
            }),
        )?;

        let weak = Rc::downgrade(self);
        self.host.listen_window(
            "popstate",
            Box::new(move |_event: H::Event| {
                if let Some(rt) = weak.upgrade() {
                    let path = rt.host.location().pathname;
                    let task_rt = Rc::clone(&rt);
                    rt.spawn_logged("navigation error", async move { task_rt.update_content(&path).await });
                }
            }),
        )
    }

    fn on_document_click(self: &Rc<Self>, event: H::Event) {
        let Some(target) = self.host.event_target(&event) else {
            return;
        };
        let Some(link) = self.host.closest(&target, &self.config.link_attr) else {
            return;
        };
        let Some(href) = self.host.attribute(&link, "href").filter(|h| is_internal_href(h)) else {
            return;
        };
        self.host.prevent_default(&event);
        let rt = Rc::clone(self);
        self.spawn_logged("navigation error", async move { rt.navigate(&href).await });
    }

    /// Push `url` onto history and show its content.
    ///
    /// # Errors
    ///
    /// History or fetch failure; the current content stays.
    pub async fn navigate(self: &Rc<Self>, url: &str) -> Result<(), RuntimeError> {
        self.host.push_history(url)?;
        self.update_content(url).await
    }

    /// Fetch `url` and swap it into the root container.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; nothing is replaced.
    pub async fn update_content(self: &Rc<Self>, url: &str) -> Result<(), RuntimeError> {
        let html = api::fetch_page(self.host.as_ref(), url).await?;
        let rt = Rc::clone(self);
        self.host.view_transition(Box::new(move || rt.swap_root(&html)));
        Ok(())
    }

    fn swap_root(self: &Rc<Self>, html: &str) {
        let Some(root) = self.host.element_by_id(&self.config.root_id) else {
            log::error!("navigation error: no #{} container", self.config.root_id);
            return;
        };
        self.host.set_inner_html(&root, html);
        self.initialize_components();
    }
}
