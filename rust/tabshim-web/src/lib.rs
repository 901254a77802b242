//! Browser bindings for tabshim.
//!
//! Compiled for `wasm32-unknown-unknown` and loaded by an extension's
//! background script, this crate exports a [`Shim`] class whose methods keep
//! the familiar promise-returning shape:
//!
//! ```text
//! const shim = new Shim({ forceLegacyScripting: false });
//!
//! await shim.executeScript({ target: { tabId }, func: (a, b) => a + b, args: [1, 2] });
//! await shim.insertCSS({ target: { tabId }, css: "body { margin: 0 }" });
//! await shim.setToSessionStorage("token", value);
//! await shim.createAlarm("refresh", { periodInMinutes: 30 });
//! ```
//!
//! [`ChromeHost`] is the provider behind it: every effect from
//! [`tabshim_effects`] is performed against the `chrome` global. Host APIs
//! are called with a completion callback and `chrome.runtime.lastError` is
//! checked, which works on hosts that predate promise-returning APIs as well
//! as on ones that have them.
//!
//! On any other target this crate is empty.

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod chrome;
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use chrome::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod convert;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod shim;
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use shim::*;
