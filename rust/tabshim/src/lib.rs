//! One injection API, two extension platforms.
//!
//! Browser extension hosts expose two incompatible ways to put script or CSS
//! into a page. The capability-scoped `chrome.scripting` API addresses frames
//! and worlds and takes callables with structured arguments; the legacy
//! `chrome.tabs.executeScript` API takes a tab, at most one frame, at most one
//! file, and pre-serialized code. `tabshim` lets callers always speak the
//! first shape and narrows it to the second when that is all the host has.
//!
//! ```text
//! caller ──▸ Injector ──┬──▸ ExecuteScript / InsertCss            (scripting host)
//!                       └──▸ translate ──▸ TabsExecuteScript /     (legacy host)
//!                                          TabsInsertCss
//!
//! caller ──▸ SessionStore ──┬──▸ storage::Get / Set (session)      (host store)
//!                           └──▸ in-process map                    (fallback)
//!
//! caller ──▸ AlarmRegistrar ──▸ GetAlarm, then CreateAlarm if absent
//! ```
//!
//! Every component probes the host's [`Capabilities`] once, when it is
//! constructed, and keeps that decision for its whole life.
//!
//! # Example
//!
//! ```
//! use tabshim::{Extension, ShimSettings, emulator::{HostProfile, VolatileHost}};
//! use tabshim_effects::scripting::InjectionRequest;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tabshim::ShimError> {
//! let host = VolatileHost::new(HostProfile::legacy());
//! let mut extension = Extension::new(host, ShimSettings::default());
//!
//! let request = InjectionRequest::for_tab(4)
//!     .with_function("function (greeting) { console.log(greeting) }")
//!     .with_args(vec!["hello".into()]);
//!
//! extension.execute_script(request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`translate`]: the pure request narrowing from scripting to legacy shape
//! - [`inject`]: route selection and dispatch
//! - [`session`]: ephemeral key/value storage with in-process fallback
//! - [`alarm`]: idempotent alarm registration
//! - [`emulator`]: an in-memory host for native targets and tests

#![warn(missing_docs)]

mod error;
pub use error::*;

mod settings;
pub use settings::*;

mod host;
pub use host::*;

pub mod alarm;
pub mod emulator;
pub mod inject;
pub mod session;
pub mod translate;

mod extension;
pub use extension::*;

pub use tabshim_effects::{Capabilities, HostApi, HostError};
