//! Live-reload bridge for development servers.
//!
//! Only pages served over plain `http:` connect, to avoid mixed-content socket
//! errors on secure pages. The socket at `/ws` sends the literal message
//! `reload`; on receipt every script and stylesheet URL gets a fresh
//! cache-busting stamp and the page reloads. When the socket closes (the dev
//! server restarted) the bridge reconnects with exponential backoff.

#[cfg(test)]
#[path = "reload_test.rs"]
mod reload_test;

use std::rc::Rc;

use futures::StreamExt;

use crate::assets;
use crate::host::{Host, Location, Query};
use crate::runtime::Runtime;

/// Message that triggers a reload.
pub const RELOAD_MESSAGE: &str = "reload";

const INITIAL_BACKOFF_MS: u32 = 1000;
const MAX_BACKOFF_MS: u32 = 10_000;

/// Socket URL for a page at `location`, or `None` on secure pages.
pub fn reload_socket_url(location: &Location, path: &str) -> Option<String> {
    if location.protocol != "http:" || location.host.is_empty() {
        return None;
    }
    Some(format!("ws://{}{path}", location.host))
}

/// Next reconnect delay after waiting `current_ms`.
pub fn next_backoff(current_ms: u32) -> u32 {
    current_ms.saturating_mul(2).min(MAX_BACKOFF_MS)
}

impl<H: Host> Runtime<H> {
    /// Connect the reload socket when enabled and the page is plaintext.
    ///
    /// Returns whether the bridge was started.
    pub fn start_live_reload(self: &Rc<Self>) -> bool {
        if !self.config.live_reload {
            return false;
        }
        let Some(url) = reload_socket_url(&self.host.location(), &self.config.reload_socket_path) else {
            log::debug!("live reload disabled on non-plaintext page");
            return false;
        };
        let rt = Rc::clone(self);
        self.host.spawn(Box::pin(async move { rt.live_reload_loop(url).await }));
        true
    }

    async fn live_reload_loop(self: Rc<Self>, url: String) {
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        loop {
            match self.host.open_socket(&url) {
                Ok(mut messages) => {
                    while let Some(message) = messages.next().await {
                        // A delivered message proves the server is back.
                        backoff_ms = INITIAL_BACKOFF_MS;
                        if message == RELOAD_MESSAGE {
                            self.reload_page();
                            return;
                        }
                    }
                    log::info!("live reload socket closed");
                }
                Err(e) => log::warn!("live reload socket failed: {e}"),
            }
            self.host.sleep(backoff_ms).await;
            backoff_ms = next_backoff(backoff_ms);
        }
    }

    /// Stamp every asset URL and force a full reload.
    pub fn reload_page(&self) {
        let stamped = self.bust_assets(self.host.now_ms());
        log::info!("reloading page ({stamped} asset URL(s) stamped)");
        self.host.reload_page();
    }

    /// Set `v=<stamp>` on every script `src` and stylesheet `href`.
    ///
    /// Returns the number of attributes rewritten.
    pub fn bust_assets(&self, stamp: u64) -> usize {
        let Some(doc) = self.host.document_root() else {
            return 0;
        };
        let targets = [
            (Query::attr("src").on_tag("script"), "src"),
            (Query::attr_eq("rel", "stylesheet").on_tag("link"), "href"),
        ];
        let mut stamped = 0;
        for (query, attr) in &targets {
            for el in self.host.select(&doc, query) {
                let Some(url) = self.host.attribute(&el, attr) else {
                    continue;
                };
                match self.host.set_attribute(&el, attr, &assets::cache_bust(&url, stamp)) {
                    Ok(()) => stamped += 1,
                    Err(e) => log::warn!("could not stamp {attr}: {e}"),
                }
            }
        }
        stamped
    }
}
