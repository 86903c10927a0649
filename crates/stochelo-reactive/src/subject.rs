//! The multicast entry shape: [`Subject`], [`Observer`] and
//! [`Subscription`].
//!
//! A subject binds a main function to an instance lazily: nothing runs
//! until the first observer subscribes, and that first invocation is
//! scheduled as a microtask so it settles ahead of externally deferred
//! work. Every return value of the body is a published value (there is no
//! `None` filtering here) and the latest one is retained, so an observer
//! that subscribes after values were produced receives the current value
//! synchronously during `subscribe`.
//!
//! Terminal signals are exclusive and final. After `error` or `complete`
//! has been delivered no observer method is called again, and later
//! subscriptions are inert.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::completion::{Completion, CompletionSource};
use crate::error::{panic_message, HookError};
use crate::instance::Engine;
use crate::scheduler::{schedule, Tier};

/// Receiver for a subject's value stream and terminal signals.
///
/// `error` and `complete` default to no-ops so a bare closure works as an
/// observer (see the blanket impl). A panic in any observer method is
/// isolated: it is reported via `tracing` and the remaining observers are
/// still notified.
pub trait Observer<T> {
	fn next(&self, value: &T);
	fn error(&self, _error: &HookError) {}
	fn complete(&self) {}
}

/// Any `Fn(&T)` closure is a values-only observer.
impl<T, F: Fn(&T)> Observer<T> for F {
	fn next(&self, value: &T) {
		self(value)
	}
}

/// Closure-based observer with optional terminal handlers.
pub struct Subscriber<T> {
	next: Box<dyn Fn(&T)>,
	error: Option<Box<dyn Fn(&HookError)>>,
	complete: Option<Box<dyn Fn()>>,
}

impl<T> Subscriber<T> {
	pub fn new(next: impl Fn(&T) + 'static) -> Self {
		Self {
			next: Box::new(next),
			error: None,
			complete: None,
		}
	}

	pub fn on_error(mut self, error: impl Fn(&HookError) + 'static) -> Self {
		self.error = Some(Box::new(error));
		self
	}

	pub fn on_complete(mut self, complete: impl Fn() + 'static) -> Self {
		self.complete = Some(Box::new(complete));
		self
	}
}

impl<T> Observer<T> for Subscriber<T> {
	fn next(&self, value: &T) {
		(self.next)(value);
	}

	fn error(&self, error: &HookError) {
		if let Some(handler) = &self.error {
			handler(error);
		}
	}

	fn complete(&self) {
		if let Some(handler) = &self.complete {
			handler();
		}
	}
}

fn isolate(action: &str, call: impl FnOnce()) {
	if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(call)) {
		tracing::error!(
			target: "stochelo::reactive",
			"observer panicked while {action}: {}",
			panic_message(payload)
		);
	}
}

struct SubjectShared<T> {
	engine: Engine<T>,
	observers: RefCell<Vec<(u64, Rc<dyn Observer<T>>)>>,
	next_key: Cell<u64>,
	/// Latest published value, handed synchronously to late subscribers.
	latest: RefCell<Option<T>>,
	/// Set by the first subscription; the body never runs before it.
	started: Cell<bool>,
	/// Set once a terminal signal has been delivered.
	terminated: Cell<bool>,
	source: CompletionSource,
}

impl<T: 'static> SubjectShared<T> {
	fn pump(self: &Rc<Self>) {
		let core = self.engine.core();
		if !core.begin_task() {
			return;
		}
		let outcome = self.engine.run();
		core.set_publishing(true);
		for value in outcome.results {
			// The retained value is updated before delivery, so an
			// observer that subscribes another observer mid-delivery hands
			// it this value, not the previous one.
			*self.latest.borrow_mut() = Some(value);
			let snapshot: Vec<_> = self.observers.borrow().clone();
			let latest = self.latest.borrow();
			if let Some(value) = latest.as_ref() {
				for (_, observer) in &snapshot {
					isolate("publishing value", || observer.next(value));
				}
			}
		}
		core.set_publishing(false);
		if let Some(error) = outcome.error {
			self.terminate_with_error(error);
		} else if core.is_stopped() {
			self.finish();
		}
	}
}

impl<T> SubjectShared<T> {
	fn terminate_with_error(&self, error: HookError) {
		if self.terminated.replace(true) {
			return;
		}
		let observers = std::mem::take(&mut *self.observers.borrow_mut());
		for (_, observer) in observers {
			isolate("publishing error", || observer.error(&error));
		}
		self.engine.core().clear_wake();
		self.source.resolve(Err(error));
	}

	/// Normal termination: cleanup runs before the completion signal is
	/// delivered, so observers see a fully torn-down instance.
	fn finish(&self) {
		if self.terminated.replace(true) {
			return;
		}
		let core = self.engine.core();
		core.mark_stopped();
		core.force_cleanup();
		let observers = std::mem::take(&mut *self.observers.borrow_mut());
		for (_, observer) in observers {
			isolate("completing", || observer.complete());
		}
		core.clear_wake();
		self.source.resolve(Ok(()));
	}
}

/// Detachment handle for one subscription.
///
/// Dropping it does nothing: the observer stays subscribed for the
/// subject's lifetime unless [`unsubscribe`](Self::unsubscribe) is called.
pub struct Subscription {
	detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	fn inert() -> Self {
		Self { detach: None }
	}

	/// Removes the observer. It receives no further values and no terminal
	/// signal. A subscription obtained after termination detaches nothing.
	pub fn unsubscribe(mut self) {
		if let Some(detach) = self.detach.take() {
			detach();
		}
	}
}

/// A lazily started, multicast instance.
///
/// Unlike [`start`](crate::start), the body's return type is the published
/// value type itself; every invocation pass publishes. Dropping the subject
/// completes it, as if [`complete`](Self::complete) were called.
pub struct Subject<T> {
	shared: Rc<SubjectShared<T>>,
	completion: Completion,
}

impl<T: 'static> Subject<T> {
	/// Binds `body` to a new instance without running it. The first
	/// invocation is scheduled when the first observer subscribes.
	pub fn new(body: impl FnMut() -> T + 'static) -> Self {
		let (source, completion) = CompletionSource::new();
		let shared = Rc::new(SubjectShared {
			engine: Engine::new(body),
			observers: RefCell::new(Vec::new()),
			next_key: Cell::new(0),
			latest: RefCell::new(None),
			started: Cell::new(false),
			terminated: Cell::new(false),
			source,
		});
		let weak = Rc::downgrade(&shared);
		shared.engine.core().set_wake(move || {
			if let Some(shared) = weak.upgrade() {
				schedule(Tier::Deferred, Box::new(move || shared.pump()));
			}
		});
		Self { shared, completion }
	}

	/// The instance's end-of-life signal.
	pub fn completion(&self) -> Completion {
		self.completion.clone()
	}

	/// Registers an observer.
	///
	/// The first subscription schedules the first invocation as a
	/// microtask. Later subscriptions receive the latest published value
	/// synchronously, before `subscribe` returns. Subscribing to a
	/// terminated subject returns an inert subscription and the observer
	/// is never called.
	pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
		if self.shared.terminated.get() || self.shared.engine.core().is_stopped() {
			return Subscription::inert();
		}
		let observer: Rc<dyn Observer<T>> = Rc::new(observer);
		let key = self.shared.next_key.get();
		self.shared.next_key.set(key + 1);
		self.shared
			.observers
			.borrow_mut()
			.push((key, observer.clone()));
		if !self.shared.started.replace(true) {
			let core = self.shared.engine.core();
			core.mark_scheduled();
			let shared = self.shared.clone();
			schedule(Tier::Microtask, Box::new(move || shared.pump()));
		} else {
			let latest = self.shared.latest.borrow();
			if let Some(value) = latest.as_ref() {
				isolate("publishing value", || observer.next(value));
			}
		}
		let weak = Rc::downgrade(&self.shared);
		Subscription {
			detach: Some(Box::new(move || {
				if let Some(shared) = weak.upgrade() {
					shared.observers.borrow_mut().retain(|(k, _)| *k != key);
				}
			})),
		}
	}

	/// Completes the subject: pending invocations are cancelled, cleanup
	/// runs, observers receive `complete`, and the completion resolves
	/// with `Ok(())`. Idempotent, and a no-op after a fatal error.
	pub fn complete(&self) {
		if self.shared.terminated.get() {
			return;
		}
		let core = self.shared.engine.core();
		if core.mark_stopped() {
			return;
		}
		if core.is_busy() {
			// The pump delivers the values already produced, then
			// finalizes.
			return;
		}
		self.shared.finish();
	}
}

impl<T> Drop for Subject<T> {
	fn drop(&mut self) {
		if self.shared.terminated.get() {
			return;
		}
		let core = self.shared.engine.core();
		if core.mark_stopped() || core.is_busy() {
			return;
		}
		self.shared.finish();
	}
}
