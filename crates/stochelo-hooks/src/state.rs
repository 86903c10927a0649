//! State hooks: [`use_state`], [`use_state_with`] and [`use_ref`].

use std::cell::RefCell;
use std::rc::Rc;

use stochelo_reactive::{memo_slot, state_slot, Identity, StateSetter};

/// Declares a state cell initialized with `initial`.
///
/// Returns the current value and a setter. The initial value is only used
/// on the first invocation; later invocations return the stored value and
/// drop `initial`. Use [`use_state_with`] when construction is costly.
///
/// Setting a value identical to the current one (under [`Identity`]) does
/// not re-invoke the main function.
pub fn use_state<T: Identity + 'static>(initial: T) -> (Rc<T>, StateSetter<T>) {
	state_slot(move || initial)
}

/// Declares a state cell initialized lazily.
///
/// `init` runs exactly once, on the invocation that creates the cell.
pub fn use_state_with<T, F>(init: F) -> (Rc<T>, StateSetter<T>)
where
	T: Identity + 'static,
	F: FnOnce() -> T,
{
	state_slot(init)
}

/// A mutable box that survives re-invocations without participating in
/// reactivity: writing through it never schedules anything.
///
/// Compares identical by allocation, so it is safe in dependency lists.
pub struct RefHandle<T> {
	inner: Rc<RefCell<T>>,
}

impl<T> Clone for RefHandle<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> Identity for RefHandle<T> {
	fn identical(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl<T: 'static> RefHandle<T> {
	pub fn set(&self, value: T) {
		*self.inner.borrow_mut() = value;
	}

	pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
		read(&self.inner.borrow())
	}

	pub fn with_mut<R>(&self, write: impl FnOnce(&mut T) -> R) -> R {
		write(&mut self.inner.borrow_mut())
	}
}

impl<T: Clone + 'static> RefHandle<T> {
	pub fn get(&self) -> T {
		self.inner.borrow().clone()
	}
}

/// Declares a stable mutable reference, created once per instance.
pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> RefHandle<T> {
	let inner = memo_slot((), || Rc::new(RefCell::new(init())));
	RefHandle {
		inner: (*inner).clone(),
	}
}
