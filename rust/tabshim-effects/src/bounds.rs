//! Cross-target bound compatibility traits
//!
//! Host bindings on `wasm32-unknown-unknown` hold `JsValue` handles, which are
//! neither `Send` nor `Sync`, and run on the single browser event loop. The
//! in-memory host used on native targets may be shared across tokio worker
//! threads.
//!
//! On `wasm32` targets these traits add no bound at all. Elsewhere they stand
//! for `Send` or `Send + Sync` (depending on which one is used).

#[allow(missing_docs)]
#[cfg(not(target_arch = "wasm32"))]
pub trait ConditionalSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<S> ConditionalSend for S where S: Send {}

#[allow(missing_docs)]
#[cfg(not(target_arch = "wasm32"))]
pub trait ConditionalSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<S> ConditionalSync for S where S: Send + Sync {}

#[allow(missing_docs)]
#[cfg(target_arch = "wasm32")]
pub trait ConditionalSend {}

#[cfg(target_arch = "wasm32")]
impl<S> ConditionalSend for S {}

#[allow(missing_docs)]
#[cfg(target_arch = "wasm32")]
pub trait ConditionalSync {}

#[cfg(target_arch = "wasm32")]
impl<S> ConditionalSync for S {}
