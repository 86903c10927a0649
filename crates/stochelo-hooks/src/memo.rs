//! Memoization hooks: [`use_memo`] and [`use_callback`].

use std::fmt;
use std::rc::Rc;

use stochelo_reactive::{memo_slot, DepList, Identity};

/// Declares a cached computation keyed by `deps`.
///
/// `compute` runs on the first invocation and whenever `deps` differs
/// element-wise by identity from the previous invocation; otherwise the
/// cached value is returned. The dependency list's length must not change
/// between invocations.
pub fn use_memo<T, D>(deps: D, compute: impl FnOnce() -> T) -> Rc<T>
where
	T: 'static,
	D: DepList,
{
	memo_slot(deps, compute)
}

/// A cheaply clonable, identity-comparable closure handle.
///
/// Two callbacks are identical when they share the same allocation, which
/// is what [`use_callback`] guarantees across invocations with unchanged
/// dependencies. That makes a `Callback` safe to pass down and to put in
/// dependency lists without defeating memoization.
pub struct Callback<Args, Ret = ()> {
	call: Rc<dyn Fn(Args) -> Ret>,
}

impl<Args, Ret> Callback<Args, Ret> {
	pub fn new(call: impl Fn(Args) -> Ret + 'static) -> Self {
		Self {
			call: Rc::new(call),
		}
	}

	pub fn call(&self, args: Args) -> Ret {
		(self.call)(args)
	}
}

impl<Args, Ret> Clone for Callback<Args, Ret> {
	fn clone(&self) -> Self {
		Self {
			call: self.call.clone(),
		}
	}
}

impl<Args, Ret> Identity for Callback<Args, Ret> {
	fn identical(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.call, &other.call)
	}
}

impl<Args, Ret> PartialEq for Callback<Args, Ret> {
	fn eq(&self, other: &Self) -> bool {
		self.identical(other)
	}
}

impl<Args, Ret> fmt::Debug for Callback<Args, Ret> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callback").finish_non_exhaustive()
	}
}

/// Declares a callback whose allocation is stable while `deps` is
/// unchanged by identity.
pub fn use_callback<Args, Ret, D>(
	deps: D,
	callback: impl Fn(Args) -> Ret + 'static,
) -> Callback<Args, Ret>
where
	Args: 'static,
	Ret: 'static,
	D: DepList,
{
	(*use_memo(deps, move || Callback::new(callback))).clone()
}
