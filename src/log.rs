//! Browser console logging.
//!
//! Thin wrappers over `web_sys::console`. Off the wasm target (native unit and
//! integration tests) they compile to nothing, since imported JS functions
//! cannot be called there.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

const PREFIX: &str = "[claw-wish]";

pub fn info(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str(&format!("{PREFIX} {msg}")));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = (PREFIX, msg);
}

pub fn warn(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(&format!("{PREFIX} {msg}")));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = (PREFIX, msg);
}
