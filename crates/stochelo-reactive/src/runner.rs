//! The single-consumer entry shape: [`start`] and the [`Runner`] handle.
//!
//! `start` binds a main function to a fresh instance and schedules its
//! first invocation as a deferred task, so the call itself returns
//! immediately and the handle exists before any user code runs. Results
//! flow to one `on_result` callback; a main function signals "nothing to
//! publish this pass" by returning `None`, which is filtered out before
//! delivery.
//!
//! The handle owns the instance: dropping it stops the instance, exactly
//! like calling [`Runner::stop`].

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::completion::{Completion, CompletionSource};
use crate::error::panic_message;
use crate::instance::{Engine, InstanceCore};
use crate::scheduler::{schedule, Tier};

struct RunnerShared<T> {
	engine: Engine<Option<T>>,
	on_result: RefCell<Box<dyn FnMut(T)>>,
	source: CompletionSource,
}

impl<T: 'static> RunnerShared<T> {
	/// One pump task: run the invocation loop, deliver the results it
	/// produced, then settle any stop that happened along the way.
	fn pump(self: &Rc<Self>) {
		let core = self.engine.core();
		if !core.begin_task() {
			return;
		}
		let outcome = self.engine.run();
		core.set_publishing(true);
		for value in outcome.results.into_iter().flatten() {
			let delivery =
				panic::catch_unwind(AssertUnwindSafe(|| (*self.on_result.borrow_mut())(value)));
			if let Err(payload) = delivery {
				tracing::error!(
					target: "stochelo::reactive",
					"result callback panicked while publishing value: {}",
					panic_message(payload)
				);
			}
		}
		core.set_publishing(false);
		if let Some(error) = outcome.error {
			// The engine already forced cleanup and marked the instance
			// stopped; only the terminal signal is left.
			self.source.resolve(Err(error));
		} else if core.is_stopped() {
			core.force_cleanup();
			core.clear_wake();
			self.source.resolve(Ok(()));
		}
	}
}

/// Owning handle for an instance started with [`start`].
///
/// Not cloneable: exactly one owner controls the instance lifetime.
/// Dropping the handle stops the instance.
pub struct Runner {
	core: Rc<InstanceCore>,
	source: CompletionSource,
	completion: Completion,
	// Keeps the engine and callback alive for the handle's lifetime.
	_shared: Rc<dyn Any>,
}

impl Runner {
	/// The instance's end-of-life signal.
	pub fn completion(&self) -> Completion {
		self.completion.clone()
	}

	/// Whether the instance has been stopped or has failed.
	pub fn is_stopped(&self) -> bool {
		self.core.is_stopped()
	}

	/// Stops the instance: pending invocations are cancelled, every stored
	/// cleanup runs, and the completion resolves with `Ok(())`. Idempotent,
	/// and a no-op after a fatal error.
	pub fn stop(&self) {
		if self.core.mark_stopped() {
			return;
		}
		if self.core.is_busy() {
			// Called from inside the result callback (or the loop); the
			// pump finalizes once delivery is done.
			return;
		}
		self.core.force_cleanup();
		self.core.clear_wake();
		self.source.resolve(Ok(()));
	}
}

impl Drop for Runner {
	fn drop(&mut self) {
		self.stop();
	}
}

/// Starts a main function as a new instance and returns its owning handle.
///
/// The first invocation runs from a deferred task, never inline. Each pass
/// of the invocation loop produces one return value of `body`; the `Some`
/// values reach `on_result` in production order and the `None` values are
/// dropped. A panic in `on_result` is isolated and reported via `tracing`.
pub fn start<T, F, C>(body: F, on_result: C) -> Runner
where
	T: 'static,
	F: FnMut() -> Option<T> + 'static,
	C: FnMut(T) + 'static,
{
	let (source, completion) = CompletionSource::new();
	let shared = Rc::new(RunnerShared {
		engine: Engine::new(body),
		on_result: RefCell::new(Box::new(on_result) as Box<dyn FnMut(T)>),
		source: source.clone(),
	});
	let core = shared.engine.core().clone();
	let weak = Rc::downgrade(&shared);
	core.set_wake(move || {
		if let Some(shared) = weak.upgrade() {
			schedule(Tier::Deferred, Box::new(move || shared.pump()));
		}
	});
	core.mark_scheduled();
	let kick = shared.clone();
	schedule(Tier::Deferred, Box::new(move || kick.pump()));
	Runner {
		core,
		source,
		completion,
		_shared: shared,
	}
}
