//! The reducer hook: [`use_reducer`] and its [`Dispatch`] handle.

use std::rc::Rc;

use stochelo_reactive::{memo_slot, state_slot, Identity};

/// Stable handle for sending actions to a reducer-managed state cell.
///
/// Dispatching queues an update through the state setter; the reducer runs
/// when pending changes are applied, seeing the state left by any earlier
/// queued change. Identical by allocation, so safe in dependency lists.
pub struct Dispatch<A> {
	send: Rc<dyn Fn(A)>,
}

impl<A> Dispatch<A> {
	pub fn dispatch(&self, action: A) {
		(self.send)(action);
	}
}

impl<A> Clone for Dispatch<A> {
	fn clone(&self) -> Self {
		Self {
			send: self.send.clone(),
		}
	}
}

impl<A> Identity for Dispatch<A> {
	fn identical(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.send, &other.send)
	}
}

/// Declares a state cell driven by a reducer instead of a setter.
///
/// `init` runs once to produce the initial state. Each dispatched action
/// is folded into the state with `reducer`; actions dispatched in the same
/// pass compound in dispatch order. The reducer captured on the first
/// invocation is the one used for the instance's lifetime.
pub fn use_reducer<S, A, R, I>(reducer: R, init: I) -> (Rc<S>, Dispatch<A>)
where
	S: Identity + 'static,
	A: 'static,
	R: Fn(&S, A) -> S + 'static,
	I: FnOnce() -> S,
{
	let (state, setter) = state_slot(init);
	let dispatch = memo_slot((), move || {
		let reducer = Rc::new(reducer);
		Dispatch {
			send: Rc::new(move |action: A| {
				let reducer = reducer.clone();
				setter.update(move |state| reducer(state, action));
			}),
		}
	});
	(state, (*dispatch).clone())
}
