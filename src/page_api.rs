//! JavaScript entry points for page script.
//!
//! SYSTEM CONTEXT
//! ==============
//! Bound listeners cover declared interactions. Script on the page can
//! dispatch a handler itself through the exported `triggerEvent`:
//!
//! ```js
//! const outcome = await triggerEvent("set_count", [{ count: 9 }]);
//! // { kind: "markupPatch", detail: { component_id: null, html: "..." } }
//! ```
//!
//! ERROR HANDLING
//! ==============
//! The promise rejects with the error message when the runtime has not been
//! started, an argument has no JSON form, or the request fails. Reply-level
//! errors resolve as `{ kind: "error" }` outcomes.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Event;

use crate::dispatch::DispatchArg;
use crate::error::RuntimeError;
use crate::host::browser::{BrowserHost, js_to_json, json_to_js};
use crate::runtime::Runtime;

thread_local! {
    static RUNTIME: RefCell<Option<Rc<Runtime<BrowserHost>>>> = const { RefCell::new(None) };
}

/// Make `runtime` the target of page-script calls.
pub(crate) fn install(runtime: Rc<Runtime<BrowserHost>>) {
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));
}

fn installed() -> Result<Rc<Runtime<BrowserHost>>, RuntimeError> {
    RUNTIME
        .with(|slot| slot.borrow().clone())
        .ok_or_else(|| RuntimeError::Host("component runtime not started".to_owned()))
}

/// DOM events stay events (the first one picks the component); anything else
/// is sent as JSON.
fn to_arg(value: JsValue) -> Result<DispatchArg<Event>, RuntimeError> {
    match value.dyn_into::<Event>() {
        Ok(event) => Ok(DispatchArg::Event(event)),
        Err(value) => js_to_json(&value).map(DispatchArg::Value),
    }
}

async fn dispatch(handler: String, args: js_sys::Array) -> Result<JsValue, RuntimeError> {
    let runtime = installed()?;
    let args = args.iter().map(to_arg).collect::<Result<Vec<_>, _>>()?;
    let outcome = runtime.trigger_json(&handler, args).await?;
    json_to_js(&outcome)
}

/// Dispatch `handler` with `args`; resolves to the applied outcome.
#[wasm_bindgen(js_name = triggerEvent)]
pub fn trigger_event(handler: String, args: js_sys::Array) -> js_sys::Promise {
    wasm_bindgen_futures::future_to_promise(async move {
        dispatch(handler, args).await.map_err(|e| {
            log::warn!("triggerEvent failed: {e}");
            JsValue::from_str(&e.to_string())
        })
    })
}
