//! Host effect vocabulary for tabshim.
//!
//! This crate describes everything tabshim asks of a browser extension host,
//! without saying how the host fulfils it. Each host call is modelled as an
//! [`Effect`]: a plain serializable value with an associated `Output`. A host
//! binding implements [`Provider<E>`] for every effect it can perform.
//!
//! # Effect Domains
//!
//! - [`scripting`]: the capability-scoped injection API (`ExecuteScript`, `InsertCss`)
//! - [`tabs`]: the legacy per-tab injection API plus tab query/update
//! - [`storage`]: key/value areas (`session`, `local`, `managed`)
//! - [`alarms`]: named scheduled alarms (`GetAlarm`, `CreateAlarm`, `ListAlarms`)
//! - [`runtime`]: extension metadata, broadcast messaging, uninstall URL
//! - [`action`]: the toolbar icon
//!
//! # Example
//!
//! ```
//! use tabshim_effects::scripting::{ExecuteScript, InjectionRequest, ScriptFunction};
//!
//! let request = InjectionRequest::for_tab(7)
//!     .with_function(ScriptFunction::new("function (a, b) { return a + b }"))
//!     .with_args(vec![1.into(), 2.into()]);
//!
//! let effect = ExecuteScript::new(request);
//! assert_eq!(effect.request.target.tab_id, 7);
//! ```
//!
//! Which of these APIs exist is a property of the running host, probed through
//! [`Capabilities`]. Callers decide once, at construction time, which effects
//! they will issue.

mod bounds;
pub use bounds::*;

mod capabilities;
pub use capabilities::*;

mod effect;
pub use effect::*;

mod error;
pub use error::*;

pub mod action;
pub mod alarms;
pub mod runtime;
pub mod scripting;
pub mod storage;
pub mod tabs;
