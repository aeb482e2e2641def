//! # component-runtime
//!
//! WASM runtime that keeps a browser document in sync with server-rendered
//! components: named DOM fragments whose markup, state and behavior live on
//! the server.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`runtime`] | Shared [`Runtime`] context and page-load sequence |
//! | [`registry`] | Component name → elements and state |
//! | [`state`] | Global state snapshot |
//! | [`binder`] | Attaches listeners to `data-event` elements |
//! | [`dispatch`] | Round-trips events and reconciles replies |
//! | [`loader`] | Placeholder loading, discovery, full refresh |
//! | [`observer`] | Mutation observer bridge |
//! | [`router`] | Internal link navigation |
//! | [`reload`] | Development live-reload socket |
//! | [`assets`] | Cache-busting URL rewriting |
//! | [`host`] | Platform seam (browser implementation behind `hydrate`) |
//! | [`net`] | Endpoint DTOs and request builders |
//! | `page_api` | `triggerEvent` export for page script (`hydrate`) |
//! | [`config`] | Runtime configuration |
//! | [`error`] | Error taxonomy |

pub mod assets;
pub mod binder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod loader;
pub mod net;
pub mod observer;
#[cfg(feature = "hydrate")]
pub mod page_api;
pub mod registry;
pub mod reload;
pub mod router;
pub mod runtime;
pub mod state;

pub use config::RuntimeConfig;
pub use dispatch::{DispatchArg, DispatchOutcome};
pub use error::RuntimeError;
pub use host::Host;
pub use runtime::Runtime;

/// Browser entry point: read the bootstrap globals, install logging and start
/// the runtime once the document is parsed.
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    use std::rc::Rc;

    use host::browser::BrowserHost;

    console_error_panic_hook::set_once();

    let host = match BrowserHost::new() {
        Ok(host) => Rc::new(host),
        Err(e) => {
            web_sys::console::error_1(&format!("runtime not started: {e}").into());
            return;
        }
    };

    let config = match host.read_global_json("RUNTIME_CONFIG").map(RuntimeConfig::from_value) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            web_sys::console::warn_1(&format!("ignoring invalid RUNTIME_CONFIG: {e}").into());
            RuntimeConfig::default()
        }
        None => RuntimeConfig::default(),
    };
    if let Err(e) = console_log::init_with_level(config.level()) {
        web_sys::console::warn_1(&format!("logger already installed: {e}").into());
    }

    let initial_state = host.read_global_json("INITIAL_STATE").unwrap_or_default();
    let runtime = Runtime::new(Rc::clone(&host), config, initial_state);
    page_api::install(Rc::clone(&runtime));
    if let Err(e) = host.on_ready(move || runtime.start()) {
        log::error!("could not schedule runtime start: {e}");
    }
}
