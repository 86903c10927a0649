//! Positional-memory reactive runtime.
//!
//! This crate runs plain functions as *instances*: a main function is
//! re-invoked whenever the state it declared through the primitive hooks
//! changes, and each invocation reads and writes the same ordered list of
//! memory cells. There is no view layer and no diffing; what a component
//! framework would render, an instance simply returns, and the runtime
//! delivers the returned values to its consumer.
//!
//! ## Entry shapes
//!
//! - [`start`] runs a body returning `Option<T>` for a single `on_result`
//!   consumer; `None` means "publish nothing this pass". The returned
//!   [`Runner`] owns the instance.
//! - [`Subject`] multicasts a body returning `T` to any number of
//!   [`Observer`]s, retains the latest value for late subscribers, and
//!   starts lazily on the first subscription.
//!
//! ## The calling convention
//!
//! Inside the main function (and only there), call [`state_slot`],
//! [`effect_slot`] and [`memo_slot`] (or the ergonomic wrappers from the
//! companion hooks crate) in the same count, kind and order on every
//! invocation. Conditional or reordered hook calls are shape violations
//! and terminate the instance with a [`HookError`].
//!
//! ## Scheduling
//!
//! All work runs from a thread-local task queue; see [`scheduler`]. Tests
//! and plain binaries drive it with [`scheduler::run_until_idle`]; hosts
//! with an event loop register [`scheduler::set_waker`].
//!
//! The runtime is single-threaded by construction. Handles are `!Send`,
//! and instances on different threads are fully independent.

mod cell;
mod completion;
mod error;
mod identity;
mod instance;
mod runner;
pub mod scheduler;
mod subject;

pub use cell::{CellKind, Cleanup};
pub use completion::Completion;
pub use error::HookError;
pub use identity::{DepList, Identity};
pub use instance::{effect_slot, memo_slot, state_slot, StateSetter};
pub use runner::{start, Runner};
pub use subject::{Observer, Subject, Subscriber, Subscription};
