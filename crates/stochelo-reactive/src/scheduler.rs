//! Two-tier deferred task queue.
//!
//! All engine work is scheduled through this queue rather than run inline,
//! which is what gives the runtime its run-to-completion guarantee: a task
//! never preempts another, and cancellation is checked at the top of each
//! task body.
//!
//! The two tiers preserve the timing split between the two entry shapes:
//!
//! 1. **Microtask**: runs before any deferred task; used for the first
//!    invocation of a [`Subject`](crate::Subject), which is expected to
//!    settle faster than externally scheduled work.
//! 2. **Deferred**: the macrotask equivalent; used for
//!    [`start`](crate::start) kick-off and for every state-change wakeup.
//!
//! The queue is thread-local and does not depend on a host runtime. In a
//! plain binary or test, call [`run_until_idle`] to drain it. To embed the
//! runtime in a host event loop, register a [`set_waker`] callback and
//! schedule a drain whenever it fires, the same integration seam the
//! team's reactive runtime exposes for WASM schedulers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tier {
	Microtask,
	Deferred,
}

struct TaskQueue {
	microtasks: VecDeque<Task>,
	deferred: VecDeque<Task>,
	draining: bool,
	waker: Option<Rc<dyn Fn()>>,
}

thread_local! {
	static QUEUE: RefCell<TaskQueue> = RefCell::new(TaskQueue {
		microtasks: VecDeque::new(),
		deferred: VecDeque::new(),
		draining: false,
		waker: None,
	});
}

pub(crate) fn schedule(tier: Tier, task: Task) {
	let wake = QUEUE.with(|queue| {
		let mut queue = queue.borrow_mut();
		let was_idle = queue.microtasks.is_empty() && queue.deferred.is_empty();
		match tier {
			Tier::Microtask => queue.microtasks.push_back(task),
			Tier::Deferred => queue.deferred.push_back(task),
		}
		was_idle && !queue.draining
	});
	if wake {
		let waker = QUEUE.with(|queue| queue.borrow().waker.clone());
		if let Some(waker) = waker {
			(*waker)();
		}
	}
}

/// Registers a callback invoked when the queue transitions from idle to
/// non-idle outside of a drain.
///
/// Hosts with their own event loop use this to learn that
/// [`run_until_idle`] should be scheduled. Without a waker the queue must
/// be drained manually, which is the normal mode for tests.
pub fn set_waker(waker: impl Fn() + 'static) {
	QUEUE.with(|queue| queue.borrow_mut().waker = Some(Rc::new(waker)));
}

struct DrainGuard;

impl Drop for DrainGuard {
	fn drop(&mut self) {
		QUEUE.with(|queue| queue.borrow_mut().draining = false);
	}
}

/// Drains the task queue until no work remains, and returns the number of
/// tasks that ran.
///
/// Microtasks always run before deferred tasks; a microtask scheduled by a
/// deferred task still runs before the next deferred task. Calling this
/// from inside a running task is a no-op returning zero; tasks cannot
/// nest drains.
pub fn run_until_idle() -> usize {
	let nested = QUEUE.with(|queue| {
		let mut queue = queue.borrow_mut();
		if queue.draining {
			true
		} else {
			queue.draining = true;
			false
		}
	});
	if nested {
		return 0;
	}
	let _guard = DrainGuard;
	let mut executed = 0;
	loop {
		let task = QUEUE.with(|queue| {
			let mut queue = queue.borrow_mut();
			queue
				.microtasks
				.pop_front()
				.or_else(|| queue.deferred.pop_front())
		});
		match task {
			Some(task) => {
				task();
				executed += 1;
			}
			None => break,
		}
	}
	executed
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;
	use std::cell::RefCell;
	use std::rc::Rc;

	#[test]
	fn microtasks_run_before_deferred_tasks() {
		let order = Rc::new(RefCell::new(Vec::new()));
		let a = order.clone();
		let b = order.clone();
		schedule(
			Tier::Deferred,
			Box::new(move || a.borrow_mut().push("deferred")),
		);
		schedule(
			Tier::Microtask,
			Box::new(move || b.borrow_mut().push("micro")),
		);
		assert_eq!(run_until_idle(), 2);
		assert_eq!(*order.borrow(), vec!["micro", "deferred"]);
	}

	#[test]
	fn microtask_scheduled_by_deferred_task_runs_next() {
		let order = Rc::new(RefCell::new(Vec::new()));
		let first = order.clone();
		let second = order.clone();
		let inner = order.clone();
		schedule(
			Tier::Deferred,
			Box::new(move || {
				first.borrow_mut().push("first");
				schedule(
					Tier::Microtask,
					Box::new(move || inner.borrow_mut().push("micro")),
				);
			}),
		);
		schedule(
			Tier::Deferred,
			Box::new(move || second.borrow_mut().push("second")),
		);
		run_until_idle();
		assert_eq!(*order.borrow(), vec!["first", "micro", "second"]);
	}

	#[test]
	fn nested_drain_is_a_no_op() {
		let nested = Rc::new(RefCell::new(None));
		let slot = nested.clone();
		schedule(
			Tier::Deferred,
			Box::new(move || {
				*slot.borrow_mut() = Some(run_until_idle());
			}),
		);
		assert_eq!(run_until_idle(), 1);
		assert_eq!(*nested.borrow(), Some(0));
	}

	// The registered waker outlives the test on its thread, so anything
	// touching it runs serialized.
	#[test]
	#[serial]
	fn waker_fires_on_idle_to_busy_transition() {
		let count = Rc::new(RefCell::new(0));
		let observed = count.clone();
		set_waker(move || *observed.borrow_mut() += 1);
		schedule(Tier::Deferred, Box::new(|| {}));
		schedule(Tier::Deferred, Box::new(|| {}));
		assert_eq!(*count.borrow(), 1);
		run_until_idle();
		schedule(Tier::Microtask, Box::new(|| {}));
		assert_eq!(*count.borrow(), 2);
		run_until_idle();
	}
}
