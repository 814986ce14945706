//! Reflection helpers for the host-page glue object.
//!
//! The hosting page wires the third-party SDKs (identity provider, realtime
//! document store) into a single global:
//!
//! ```text
//! window.studydeskCloud = { auth: {...}, store: {...} }
//! ```
//!
//! Everything crossing the boundary is either a JSON-serializable value or a
//! plain function; promises are awaited through `wasm-bindgen-futures`.

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

pub(crate) const BRIDGE_GLOBAL: &str = "studydeskCloud";

/// Look up `window.studydeskCloud.<section>`.
pub(crate) fn bridge_section(section: &str) -> Result<Object, String> {
    let window = web_sys::window().ok_or_else(|| "no window".to_string())?;
    let root = Reflect::get(&window, &BRIDGE_GLOBAL.into())
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
        .ok_or_else(|| format!("window.{BRIDGE_GLOBAL} is not configured"))?;
    let section_val = Reflect::get(&root, &section.into())
        .ok()
        .filter(|v| v.is_object())
        .ok_or_else(|| format!("window.{BRIDGE_GLOBAL}.{section} is not configured"))?;
    Ok(section_val.unchecked_into())
}

pub(crate) fn bridge_fn(obj: &Object, name: &str) -> Result<Function, String> {
    Reflect::get(obj, &name.into())
        .ok()
        .and_then(|v| v.dyn_into::<Function>().ok())
        .ok_or_else(|| format!("bridge function `{name}` is missing"))
}

/// Call a bridge function that returns a promise and await its settlement.
pub(crate) async fn call_promise(
    f: &Function,
    this: &JsValue,
    args: &[JsValue],
) -> Result<JsValue, String> {
    let arg_array = Array::new();
    for a in args {
        arg_array.push(a);
    }

    let raw = f
        .apply(this, &arg_array)
        .map_err(|e| js_error_message(&e))?;
    let promise: js_sys::Promise = raw
        .dyn_into()
        .map_err(|_| "bridge call did not return a promise".to_string())?;

    JsFuture::from(promise)
        .await
        .map_err(|e| js_error_message(&e))
}

/// Best-effort human-readable message for an arbitrary thrown JS value.
pub(crate) fn js_error_message(v: &JsValue) -> String {
    if let Some(s) = v.as_string() {
        return s;
    }
    if let Ok(msg) = Reflect::get(v, &"message".into()) {
        if let Some(s) = msg.as_string() {
            return s;
        }
    }
    js_sys::JSON::stringify(v)
        .ok()
        .and_then(|s| s.as_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Convert an arbitrary JS value into `serde_json::Value` by round-tripping
/// through `JSON.stringify`. Lossy for non-JSON values, which is fine: the
/// bridge contract is JSON-shaped.
pub(crate) fn json_value(v: &JsValue) -> Result<serde_json::Value, String> {
    if v.is_null() || v.is_undefined() {
        return Ok(serde_json::Value::Null);
    }
    let text = js_sys::JSON::stringify(v)
        .ok()
        .and_then(|s| s.as_string())
        .ok_or_else(|| "bridge value is not JSON-serializable".to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}
