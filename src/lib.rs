//! # Stochelo
//!
//! A hooks-style reactive runtime for plain Rust functions, outside any
//! rendering context.
//!
//! A *main function* declares state, effects and memoized values by calling
//! hooks positionally; the runtime re-invokes it whenever that state
//! changes and delivers each return value to the function's consumers.
//! There is no view tree and no diffing: the returned value is the whole
//! output.
//!
//! ## Example
//!
//! ```
//! use stochelo::prelude::*;
//!
//! let runner = start(
//! 	|| {
//! 		let (count, set_count) = use_state(0);
//! 		if *count < 3 {
//! 			set_count.update(|count| count + 1);
//! 		}
//! 		Some(*count)
//! 	},
//! 	|value| println!("saw {value}"),
//! );
//!
//! // Drive the thread-local scheduler manually (a host event loop would
//! // do this from a `set_waker` callback instead).
//! stochelo::scheduler::run_until_idle();
//! runner.stop();
//! ```
//!
//! ## Crates
//!
//! - `stochelo-reactive` (re-exported here): the engine, the scheduler and
//!   the two entry shapes, [`start`] and [`Subject`].
//! - `stochelo-hooks` (re-exported here): the ergonomic `use_*` wrappers
//!   over the engine's slot primitives.

pub use stochelo_hooks::{
	use_callback, use_effect, use_effect_with, use_memo, use_reducer, use_ref, use_state,
	use_state_with, Callback, Dispatch, IntoCleanup, RefHandle,
};
pub use stochelo_reactive::{
	effect_slot, memo_slot, scheduler, start, state_slot, CellKind, Cleanup, Completion, DepList,
	HookError, Identity, Observer, Runner, StateSetter, Subject, Subscriber, Subscription,
};

/// Everything a main function and its host typically need.
pub mod prelude {
	pub use stochelo_hooks::{
		use_callback, use_effect, use_effect_with, use_memo, use_reducer, use_ref, use_state,
		use_state_with,
	};
	pub use stochelo_reactive::{start, Observer, Runner, Subject, Subscriber};
}
