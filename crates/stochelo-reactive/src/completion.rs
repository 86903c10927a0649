//! The completion signal: a one-shot, observable end-of-life marker.
//!
//! Every instance exposes a [`Completion`] that settles exactly once, with
//! `Ok(())` on a normal stop/complete or with the fatal [`HookError`]
//! otherwise. It can be awaited as a `Future` or inspected synchronously
//! with [`Completion::peek`]. A completion that settles with an error and
//! is dropped without ever being observed is reported on the diagnostic
//! channel, the analogue of an unhandled rejection.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::HookError;

struct Inner {
	state: RefCell<Option<Result<(), HookError>>>,
	observed: Cell<bool>,
	wakers: RefCell<Vec<Waker>>,
}

impl Drop for Inner {
	fn drop(&mut self) {
		if !self.observed.get() {
			if let Some(Err(error)) = self.state.get_mut() {
				tracing::error!(
					target: "stochelo::reactive",
					"unobserved completion settled with an error: {error}"
				);
			}
		}
	}
}

/// Handle to an instance's end-of-life signal.
///
/// Cloning is cheap; all clones observe the same resolution. Settles at
/// most once: stopping an already-stopped instance never produces a
/// second signal.
#[derive(Clone)]
pub struct Completion {
	inner: Rc<Inner>,
}

impl Completion {
	/// Returns the resolution if the instance has already terminated.
	pub fn peek(&self) -> Option<Result<(), HookError>> {
		self.inner.observed.set(true);
		self.inner.state.borrow().clone()
	}

	/// Returns `true` once the instance has terminated, without counting
	/// as an observation.
	pub fn is_settled(&self) -> bool {
		self.inner.state.borrow().is_some()
	}
}

impl Future for Completion {
	type Output = Result<(), HookError>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.inner.observed.set(true);
		if let Some(result) = self.inner.state.borrow().clone() {
			return Poll::Ready(result);
		}
		self.inner.wakers.borrow_mut().push(cx.waker().clone());
		Poll::Pending
	}
}

/// Resolution side of a [`Completion`]. Held by the runner or subject.
#[derive(Clone)]
pub(crate) struct CompletionSource {
	inner: Rc<Inner>,
}

impl CompletionSource {
	pub(crate) fn new() -> (Self, Completion) {
		let inner = Rc::new(Inner {
			state: RefCell::new(None),
			observed: Cell::new(false),
			wakers: RefCell::new(Vec::new()),
		});
		(
			Self {
				inner: inner.clone(),
			},
			Completion { inner },
		)
	}

	/// Settles the completion. Idempotent: only the first resolution wins.
	pub(crate) fn resolve(&self, result: Result<(), HookError>) {
		{
			let mut state = self.inner.state.borrow_mut();
			if state.is_some() {
				return;
			}
			*state = Some(result);
		}
		for waker in self.inner.wakers.borrow_mut().drain(..) {
			waker.wake();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolves_once() {
		let (source, completion) = CompletionSource::new();
		assert!(!completion.is_settled());
		source.resolve(Ok(()));
		source.resolve(Err(HookError::BodyPanic("late".into())));
		assert!(matches!(completion.peek(), Some(Ok(()))));
	}

	#[test]
	fn clones_share_resolution() {
		let (source, completion) = CompletionSource::new();
		let other = completion.clone();
		source.resolve(Err(HookError::BodyPanic("boom".into())));
		assert!(matches!(other.peek(), Some(Err(HookError::BodyPanic(_)))));
		assert!(matches!(
			completion.peek(),
			Some(Err(HookError::BodyPanic(_)))
		));
	}

	#[test]
	fn future_resolves_after_settlement() {
		let (source, completion) = CompletionSource::new();
		source.resolve(Ok(()));
		let mut completion = Box::pin(completion);
		let waker = Waker::noop();
		let mut cx = Context::from_waker(waker);
		assert!(matches!(
			completion.as_mut().poll(&mut cx),
			Poll::Ready(Ok(()))
		));
	}
}
