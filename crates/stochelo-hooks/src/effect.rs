//! Effect hooks: [`use_effect`] and [`use_effect_with`].
//!
//! Effects never run during an invocation. They are committed after the
//! invocation loop settles: outdated cleanups first, across all effect
//! cells, then the outdated effects in cell order.

use stochelo_reactive::{effect_slot, Cleanup, DepList};

/// Conversion for effect return values, so an effect can return nothing
/// or a cleanup closure without wrapping either by hand.
pub trait IntoCleanup {
	fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
	fn into_cleanup(self) -> Option<Cleanup> {
		None
	}
}

impl<F: FnOnce() + 'static> IntoCleanup for F {
	fn into_cleanup(self) -> Option<Cleanup> {
		Some(Box::new(self))
	}
}

/// Declares an effect that runs after every invocation.
///
/// The returned cleanup (if any) runs before the next run of this effect
/// and on instance teardown. A panicking effect is fatal; a panicking
/// cleanup is isolated and reported via `tracing`.
pub fn use_effect<R: IntoCleanup>(effect: impl FnOnce() -> R + 'static) {
	effect_slot(None::<()>, move || effect().into_cleanup());
}

/// Declares an effect that re-runs only when `deps` changed by identity
/// since the previous invocation.
///
/// An empty dependency list (`()`) gives a run-once effect whose cleanup
/// runs on teardown. The list's length is part of the instance's shape and
/// must not change between invocations; the same hook call must also not
/// alternate with [`use_effect`] at the same position.
pub fn use_effect_with<D, R>(deps: D, effect: impl FnOnce() -> R + 'static)
where
	D: DepList,
	R: IntoCleanup,
{
	effect_slot(Some(deps), move || effect().into_cleanup());
}
