//! Ergonomic hooks over the `stochelo-reactive` engine.
//!
//! The engine exposes three primitive slot operations; this crate wraps
//! them in the calling convention most code actually wants:
//!
//! - [`use_state`] / [`use_state_with`] for reactive values
//! - [`use_effect`] / [`use_effect_with`] for side effects with cleanup
//! - [`use_memo`] / [`use_callback`] for caching keyed by dependencies
//! - [`use_reducer`] for action-driven state
//! - [`use_ref`] for mutable storage outside reactivity
//!
//! All of them obey the engine's positional contract: call them in the
//! same count, kind and order on every invocation of the main function.

mod effect;
mod memo;
mod reducer;
mod state;

pub use effect::{use_effect, use_effect_with, IntoCleanup};
pub use memo::{use_callback, use_memo, Callback};
pub use reducer::{use_reducer, Dispatch};
pub use state::{use_ref, use_state, use_state_with, RefHandle};
