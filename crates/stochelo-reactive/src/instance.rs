//! The execution engine: instance memory, the active-instance marker and
//! the invocation loop.
//!
//! ## Architecture
//!
//! An [`InstanceCore`] owns the memory-cell list for one running main
//! function, together with the cursor and lifecycle flags. The primitive
//! hook operations ([`state_slot`], [`effect_slot`], [`memo_slot`]) do not
//! take an instance parameter (that is the ergonomic point of the hooks
//! calling convention), so the engine routes them through a thread-local
//! *active instance* slot, set for the duration of exactly one invocation
//! of the main function and restored on every exit path, including unwind.
//!
//! The invocation loop itself lives on [`Engine`]:
//!
//! 1. Apply all pending state changes (identity-compared, so re-setting a
//!    value to itself changes nothing).
//! 2. If memory was never allocated, or step 1 changed a cell, run the
//!    main function with the cursor reset and this instance active.
//! 3. Repeat 1–2 until a pass produces no pending changes, so updates
//!    issued synchronously inside the body compound before publication.
//! 4. Commit effects: cleanup phase, then trigger phase.
//! 5. Effects may enqueue more state changes; repeat 1–4 until a pass
//!    starts with none.
//! 6. Hand the ordered result list to the caller for publication.
//!
//! ## Error tiers
//!
//! The body, state updaters, lazy initializers and effect triggers run
//! inside an unwind boundary; a panic there is fatal and terminates the
//! instance after every stored cleanup has been force-run. Shape
//! violations detected by the primitives are recorded as structured
//! [`HookError`]s before unwinding so they survive the boundary intact.
//! Cleanup panics are isolated: caught per cell and reported via
//! `tracing`, never rethrown.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::cell::{
	CellKind, Cleanup, DynValue, EffectCell, EffectFn, MemoCell, MemoryCell, StateCell,
	StateChange,
};
use crate::error::{panic_message, HookError};
use crate::identity::{DepList, ErasedDeps, Identity};

thread_local! {
	static ACTIVE: RefCell<Option<Rc<InstanceCore>>> = RefCell::new(None);
}

/// Message for primitive hook calls made with no instance active.
const NO_ACTIVE_INSTANCE: &str = "hooks may only be called while an instance is active: \
	call them from the main function passed to `start` or `Subject::new`, \
	or from a function it calls synchronously (not from an effect, a timer \
	callback, or after the main function has returned)";

/// Unwind payload used by the primitives after recording a structured
/// fatal error on the active instance.
struct HookAbort;

fn bail(core: &InstanceCore, error: HookError) -> ! {
	core.fatal.replace(Some(error));
	panic::resume_unwind(Box::new(HookAbort));
}

/// Scoped acquisition of the active-instance slot. The previous occupant
/// is restored on drop, which also runs during unwind.
struct ActiveScope {
	previous: Option<Rc<InstanceCore>>,
}

impl ActiveScope {
	fn enter(core: Rc<InstanceCore>) -> Self {
		let previous = ACTIVE.with(|slot| slot.borrow_mut().replace(core));
		Self { previous }
	}
}

impl Drop for ActiveScope {
	fn drop(&mut self) {
		let previous = self.previous.take();
		ACTIVE.with(|slot| {
			*slot.borrow_mut() = previous;
		});
	}
}

fn active_core() -> Rc<InstanceCore> {
	ACTIVE
		.with(|slot| slot.borrow().clone())
		.unwrap_or_else(|| panic!("{NO_ACTIVE_INSTANCE}"))
}

fn compare_any<T: Identity + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
	match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
		(Some(a), Some(b)) => a.identical(b),
		_ => false,
	}
}

fn run_cleanup(cleanup: Cleanup, index: usize) {
	if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
		tracing::error!(
			target: "stochelo::reactive",
			index,
			"effect cleanup panicked: {}",
			panic_message(payload)
		);
	}
}

/// Decision taken by a primitive after inspecting the cell at the cursor.
enum Slot {
	Keep,
	Refresh,
	Create,
}

/// Per-instance engine state: the memory-cell list, the cursor used while
/// an invocation is in flight, and the lifecycle flags.
pub(crate) struct InstanceCore {
	memory: RefCell<Vec<MemoryCell>>,
	cursor: Cell<usize>,
	/// True once the first invocation completed without error; from then
	/// on the cell sequence is fixed and shape checks are strict.
	allocated: Cell<bool>,
	stopped: Cell<bool>,
	/// Re-entrancy guard for the invocation loop.
	running: Cell<bool>,
	/// True while results from a finished loop are being delivered.
	publishing: Cell<bool>,
	/// Coalesces wakeups: at most one scheduled task per instance.
	scheduled: Cell<bool>,
	/// Structured error recorded by a primitive before unwinding.
	fatal: RefCell<Option<HookError>>,
	/// Wakeup installed by the runner or subject; schedules a pump task.
	wake: RefCell<Option<Box<dyn Fn()>>>,
}

impl InstanceCore {
	fn new() -> Self {
		Self {
			memory: RefCell::new(Vec::new()),
			cursor: Cell::new(0),
			allocated: Cell::new(false),
			stopped: Cell::new(false),
			running: Cell::new(false),
			publishing: Cell::new(false),
			scheduled: Cell::new(false),
			fatal: RefCell::new(None),
			wake: RefCell::new(None),
		}
	}

	pub(crate) fn set_wake(&self, wake: impl Fn() + 'static) {
		*self.wake.borrow_mut() = Some(Box::new(wake));
	}

	pub(crate) fn clear_wake(&self) {
		*self.wake.borrow_mut() = None;
	}

	/// Requests a re-run of the instance. No-op while the invocation loop
	/// is in flight (its compounding passes pick the change up) or when a
	/// task is already scheduled.
	pub(crate) fn request_run(&self) {
		if self.stopped.get() || self.running.get() || self.scheduled.get() {
			return;
		}
		self.scheduled.set(true);
		if let Some(wake) = self.wake.borrow().as_ref() {
			wake();
		}
	}

	/// Marks a pump task as scheduled without going through the wakeup,
	/// for the initial kick-off.
	pub(crate) fn mark_scheduled(&self) {
		self.scheduled.set(true);
	}

	/// Called at the top of every pump task. Returns `false` when the
	/// task body must be suppressed because the instance was stopped
	/// after the task was scheduled.
	pub(crate) fn begin_task(&self) -> bool {
		self.scheduled.set(false);
		!self.stopped.get()
	}

	/// Flips the stopped flag, returning its previous value.
	pub(crate) fn mark_stopped(&self) -> bool {
		let previous = self.stopped.get();
		self.stopped.set(true);
		previous
	}

	pub(crate) fn is_stopped(&self) -> bool {
		self.stopped.get()
	}

	/// True while the invocation loop runs or its results are being
	/// delivered; a stop/complete arriving then is finalized by the pump.
	pub(crate) fn is_busy(&self) -> bool {
		self.running.get() || self.publishing.get()
	}

	pub(crate) fn set_publishing(&self, publishing: bool) {
		self.publishing.set(publishing);
	}

	/// Forced cleanup on teardown: runs every stored cleanup regardless
	/// of the outdated flag, isolating each failure.
	pub(crate) fn force_cleanup(&self) {
		let len = self.memory.borrow().len();
		for index in 0..len {
			let cleanup = {
				let mut memory = self.memory.borrow_mut();
				match &mut memory[index] {
					MemoryCell::Effect(cell) => cell.cleanup.take(),
					_ => None,
				}
			};
			if let Some(cleanup) = cleanup {
				run_cleanup(cleanup, index);
			}
		}
	}

	fn has_pending(&self) -> bool {
		self.memory
			.borrow()
			.iter()
			.any(|cell| matches!(cell, MemoryCell::State(state) if !state.pending.is_empty()))
	}

	/// Applies every queued state change across all state cells. Returns
	/// whether any cell's value actually changed under the identity rule.
	fn apply_pending(&self) -> Result<bool, HookError> {
		let mut any_changed = false;
		let len = self.memory.borrow().len();
		for index in 0..len {
			let (value, queue, compare) = {
				let mut memory = self.memory.borrow_mut();
				let MemoryCell::State(cell) = &mut memory[index] else {
					continue;
				};
				if cell.pending.is_empty() {
					continue;
				}
				(
					cell.value.clone(),
					std::mem::take(&mut cell.pending),
					cell.compare,
				)
			};
			let mut current = value.clone();
			for change in queue {
				current = match change {
					StateChange::Replace(next) => next,
					StateChange::Update(update) => {
						panic::catch_unwind(AssertUnwindSafe(|| update(current.as_ref())))
							.map_err(|payload| {
								self.fatal.take().unwrap_or_else(|| {
									HookError::UpdaterPanic(panic_message(payload))
								})
							})?
					}
				};
			}
			// The whole queue folds first; only the folded result is
			// compared, so a queue that nets out to the starting value
			// does not re-invoke anything.
			if !(compare)(value.as_ref(), current.as_ref()) {
				let mut memory = self.memory.borrow_mut();
				if let MemoryCell::State(cell) = &mut memory[index] {
					cell.value = current;
				}
				any_changed = true;
			}
		}
		Ok(any_changed)
	}

	/// Cleanup phase followed by trigger phase for all outdated effect
	/// cells. Cleanup failures are isolated; trigger failures are fatal.
	fn commit_effects(&self) -> Result<(), HookError> {
		let len = self.memory.borrow().len();
		for index in 0..len {
			let cleanup = {
				let mut memory = self.memory.borrow_mut();
				match &mut memory[index] {
					MemoryCell::Effect(cell) if cell.outdated => cell.cleanup.take(),
					_ => None,
				}
			};
			if let Some(cleanup) = cleanup {
				run_cleanup(cleanup, index);
			}
		}
		for index in 0..len {
			let effect = {
				let mut memory = self.memory.borrow_mut();
				match &mut memory[index] {
					MemoryCell::Effect(cell) if cell.outdated => {
						// Cleared before the call so a synchronous
						// re-trigger within the same effect is impossible.
						cell.outdated = false;
						cell.effect.take()
					}
					_ => None,
				}
			};
			let Some(effect) = effect else {
				continue;
			};
			match panic::catch_unwind(AssertUnwindSafe(effect)) {
				Ok(cleanup) => {
					if let Some(cleanup) = cleanup {
						let mut memory = self.memory.borrow_mut();
						if let MemoryCell::Effect(cell) = &mut memory[index] {
							cell.cleanup = Some(cleanup);
						}
					}
				}
				Err(payload) => {
					return Err(self
						.fatal
						.take()
						.unwrap_or_else(|| HookError::EffectPanic(panic_message(payload))));
				}
			}
		}
		Ok(())
	}

	fn state_slot<T: Identity + 'static>(
		self: &Rc<Self>,
		init: impl FnOnce() -> T,
	) -> (Rc<T>, StateSetter<T>) {
		let index = self.cursor.get();
		let decision = {
			let memory = self.memory.borrow();
			if index < memory.len() {
				match &memory[index] {
					MemoryCell::State(cell) => match cell.value.clone().downcast::<T>() {
						Ok(value) => Ok(Some(value)),
						Err(_) => Err(HookError::TypeMismatch {
							index,
							kind: CellKind::State,
						}),
					},
					other => Err(HookError::KindMismatch {
						index,
						expected: CellKind::State,
						found: other.kind(),
					}),
				}
			} else if self.allocated.get() {
				Err(HookError::ExtraCell {
					expected: memory.len(),
				})
			} else {
				Ok(None)
			}
		};
		let value = match decision {
			Err(error) => bail(self, error),
			Ok(Some(value)) => value,
			Ok(None) => {
				// Lazy initializer, run exactly once; a panic here fails
				// the current invocation before the cell exists.
				let value = Rc::new(init());
				self.memory.borrow_mut().push(MemoryCell::State(StateCell {
					value: value.clone(),
					pending: Vec::new(),
					compare: compare_any::<T>,
				}));
				value
			}
		};
		self.cursor.set(index + 1);
		let setter = StateSetter {
			core: Rc::downgrade(self),
			index,
			_marker: PhantomData,
		};
		(value, setter)
	}

	fn effect_slot(self: &Rc<Self>, deps: Option<Box<dyn ErasedDeps>>, effect: EffectFn) {
		let index = self.cursor.get();
		let decision = {
			let memory = self.memory.borrow();
			if index < memory.len() {
				match &memory[index] {
					MemoryCell::Effect(cell) => match (cell.deps.as_deref(), deps.as_deref()) {
						(Some(previous), Some(current)) => {
							if previous.len() != current.len() {
								Err(HookError::DepsLength {
									kind: CellKind::Effect,
									index,
									previous: previous.len(),
									current: current.len(),
								})
							} else if previous.identical_to(current) {
								Ok(Slot::Keep)
							} else {
								Ok(Slot::Refresh)
							}
						}
						(None, None) => Ok(Slot::Refresh),
						_ => Err(HookError::DepsPresence { index }),
					},
					other => Err(HookError::KindMismatch {
						index,
						expected: CellKind::Effect,
						found: other.kind(),
					}),
				}
			} else if self.allocated.get() {
				Err(HookError::ExtraCell {
					expected: memory.len(),
				})
			} else {
				Ok(Slot::Create)
			}
		};
		match decision {
			Err(error) => bail(self, error),
			Ok(Slot::Keep) => {}
			Ok(Slot::Refresh) => {
				let mut memory = self.memory.borrow_mut();
				if let MemoryCell::Effect(cell) = &mut memory[index] {
					cell.effect = Some(effect);
					cell.deps = deps;
					cell.outdated = true;
				}
			}
			Ok(Slot::Create) => {
				self.memory
					.borrow_mut()
					.push(MemoryCell::Effect(EffectCell {
						effect: Some(effect),
						deps,
						outdated: true,
						cleanup: None,
					}));
			}
		}
		self.cursor.set(index + 1);
	}

	fn memo_slot<T: 'static>(
		self: &Rc<Self>,
		deps: Box<dyn ErasedDeps>,
		compute: impl FnOnce() -> T,
	) -> Rc<T> {
		let index = self.cursor.get();
		let decision = {
			let memory = self.memory.borrow();
			if index < memory.len() {
				match &memory[index] {
					MemoryCell::Memo(cell) => {
						if cell.deps.len() != deps.len() {
							Err(HookError::DepsLength {
								kind: CellKind::Memo,
								index,
								previous: cell.deps.len(),
								current: deps.len(),
							})
						} else if cell.deps.identical_to(deps.as_ref()) {
							match cell.value.clone().downcast::<T>() {
								Ok(value) => Ok(Some(value)),
								Err(_) => Err(HookError::TypeMismatch {
									index,
									kind: CellKind::Memo,
								}),
							}
						} else {
							Ok(None)
						}
					}
					other => Err(HookError::KindMismatch {
						index,
						expected: CellKind::Memo,
						found: other.kind(),
					}),
				}
			} else if self.allocated.get() {
				Err(HookError::ExtraCell {
					expected: memory.len(),
				})
			} else {
				Ok(None)
			}
		};
		match decision {
			Err(error) => bail(self, error),
			Ok(Some(cached)) => {
				self.cursor.set(index + 1);
				cached
			}
			Ok(None) => {
				// The cell is allocated and the cursor advanced before the
				// thunk runs, so hook calls made synchronously inside it
				// land at the following positions.
				{
					let mut memory = self.memory.borrow_mut();
					if index < memory.len() {
						if let MemoryCell::Memo(cell) = &mut memory[index] {
							cell.deps = deps;
						}
					} else {
						memory.push(MemoryCell::Memo(MemoCell {
							value: Rc::new(()) as DynValue,
							deps,
						}));
					}
				}
				self.cursor.set(index + 1);
				let value = Rc::new(compute());
				if let MemoryCell::Memo(cell) = &mut self.memory.borrow_mut()[index] {
					cell.value = value.clone();
				}
				value
			}
		}
	}
}

/// Stable handle for enqueueing changes to one state cell.
///
/// Calling [`set`](Self::set) or [`update`](Self::update) never mutates the
/// state synchronously and never re-invokes the main function inline; it
/// queues the change and requests a re-run through the deferred scheduler.
/// The handle stays valid for the instance's lifetime; calls after the
/// instance terminated are accepted and have no effect.
pub struct StateSetter<T> {
	core: Weak<InstanceCore>,
	index: usize,
	_marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for StateSetter<T> {
	fn clone(&self) -> Self {
		Self {
			core: self.core.clone(),
			index: self.index,
			_marker: PhantomData,
		}
	}
}

impl<T: Identity + 'static> StateSetter<T> {
	/// Enqueues a replacement value.
	pub fn set(&self, value: T) {
		self.enqueue(StateChange::Replace(Rc::new(value)));
	}

	/// Enqueues an updater applied to the value current at apply time.
	pub fn update(&self, update: impl FnOnce(&T) -> T + 'static) {
		self.enqueue(StateChange::Update(Box::new(move |previous: &dyn Any| {
			let previous = previous
				.downcast_ref::<T>()
				.expect("state cell value type is fixed at creation");
			Rc::new(update(previous)) as DynValue
		})));
	}

	fn enqueue(&self, change: StateChange) {
		let Some(core) = self.core.upgrade() else {
			return;
		};
		{
			let mut memory = core.memory.borrow_mut();
			if let Some(MemoryCell::State(cell)) = memory.get_mut(self.index) {
				cell.pending.push(change);
			}
		}
		core.request_run();
	}
}

/// Setters compare identical when they address the same cell of the same
/// instance, so they are safe to put in dependency lists.
impl<T> Identity for StateSetter<T> {
	fn identical(&self, other: &Self) -> bool {
		self.index == other.index && Weak::ptr_eq(&self.core, &other.core)
	}
}

/// Allocates or reuses the state cell at the current memory position.
///
/// On first call the cell is created from `init` (run exactly once). On
/// later calls the existing value and its setter are returned unchanged.
/// Must be called while an instance is active; see the crate docs for the
/// calling convention.
pub fn state_slot<T: Identity + 'static>(init: impl FnOnce() -> T) -> (Rc<T>, StateSetter<T>) {
	active_core().state_slot(init)
}

/// Allocates or reuses the effect cell at the current memory position.
///
/// With `deps: None` the effect is stored and marked outdated on every
/// invocation. With a dependency list, the stored effect is only replaced
/// (and marked outdated) when the list differs element-wise by identity
/// from the previous one. Presence and length of the list are part of the
/// instance's fixed shape.
pub fn effect_slot<D: DepList>(deps: Option<D>, effect: impl FnOnce() -> Option<Cleanup> + 'static) {
	let deps = deps.map(|deps| Box::new(deps) as Box<dyn ErasedDeps>);
	active_core().effect_slot(deps, Box::new(effect));
}

/// Allocates or reuses the memo cell at the current memory position,
/// recomputing only when the dependency list changed by identity.
/// Dependencies are mandatory for memo cells.
pub fn memo_slot<T: 'static, D: DepList>(deps: D, compute: impl FnOnce() -> T) -> Rc<T> {
	active_core().memo_slot(Box::new(deps), compute)
}

/// Ordered outcome of one run of the invocation loop.
pub(crate) struct RunOutcome<T> {
	/// Every result produced, in production order.
	pub(crate) results: Vec<T>,
	/// The fatal error that terminated the loop, if any. Cleanup has
	/// already been force-run and the instance marked stopped.
	pub(crate) error: Option<HookError>,
}

/// One main function bound to one instance core; drives the invocation
/// loop.
pub(crate) struct Engine<T> {
	core: Rc<InstanceCore>,
	body: RefCell<Box<dyn FnMut() -> T>>,
}

impl<T> Engine<T> {
	pub(crate) fn new(body: impl FnMut() -> T + 'static) -> Self {
		Self {
			core: Rc::new(InstanceCore::new()),
			body: RefCell::new(Box::new(body)),
		}
	}

	pub(crate) fn core(&self) -> &Rc<InstanceCore> {
		&self.core
	}

	/// Runs the invocation loop to completion and returns every produced
	/// result in order. On a fatal error the instance is torn down before
	/// this returns: cleanup is forced and the stopped flag set, so the
	/// caller only has to deliver the pending results and the terminal
	/// signal.
	pub(crate) fn run(&self) -> RunOutcome<T> {
		if self.core.running.get() {
			return RunOutcome {
				results: Vec::new(),
				error: None,
			};
		}
		self.core.running.set(true);
		let mut results = Vec::new();
		let error = self.run_loop(&mut results).err();
		self.core.running.set(false);
		if error.is_some() {
			self.core.stopped.set(true);
			self.core.force_cleanup();
			self.core.clear_wake();
		}
		RunOutcome { results, error }
	}

	fn run_loop(&self, results: &mut Vec<T>) -> Result<(), HookError> {
		loop {
			loop {
				let changed = self.core.apply_pending()?;
				if self.core.allocated.get() && !changed {
					break;
				}
				results.push(self.execute_body()?);
			}
			self.core.commit_effects()?;
			if !self.core.has_pending() {
				return Ok(());
			}
		}
	}

	fn execute_body(&self) -> Result<T, HookError> {
		self.core.cursor.set(0);
		let outcome = {
			let scope = ActiveScope::enter(self.core.clone());
			let mut body = self.body.borrow_mut();
			let body: &mut dyn FnMut() -> T = &mut **body;
			let outcome = panic::catch_unwind(AssertUnwindSafe(|| body()));
			drop(scope);
			outcome
		};
		match outcome {
			Ok(value) => {
				let expected = self.core.memory.borrow().len();
				let found = self.core.cursor.get();
				if found != expected {
					return Err(HookError::MissingCells { expected, found });
				}
				self.core.allocated.set(true);
				Ok(value)
			}
			Err(payload) => Err(self
				.core
				.fatal
				.take()
				.unwrap_or_else(|| HookError::BodyPanic(panic_message(payload)))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;

	fn drain<T>(engine: &Engine<T>) -> RunOutcome<T> {
		engine.run()
	}

	#[test]
	fn first_run_executes_once_without_state() {
		let engine = Engine::new(|| 7);
		let outcome = drain(&engine);
		assert!(outcome.error.is_none());
		assert_eq!(outcome.results, vec![7]);
		// No pending changes: a second run produces nothing new.
		let outcome = drain(&engine);
		assert!(outcome.results.is_empty());
	}

	#[test]
	fn synchronous_update_compounds_within_one_run() {
		let engine = Engine::new(|| {
			let (count, set_count) = state_slot(|| 0);
			if *count == 0 {
				set_count.set(1);
			}
			*count
		});
		let outcome = drain(&engine);
		assert!(outcome.error.is_none());
		assert_eq!(outcome.results, vec![0, 1]);
	}

	#[test]
	fn identical_value_does_not_re_execute() {
		let engine = Engine::new(|| {
			let (count, set_count) = state_slot(|| 5);
			// Same value by identity: queued, applied, discarded.
			set_count.set(5);
			*count
		});
		let outcome = drain(&engine);
		assert_eq!(outcome.results, vec![5]);
	}

	#[test]
	fn queue_folding_back_to_start_does_not_re_execute() {
		let engine = Engine::new(|| {
			let (count, set_count) = state_slot(|| 0);
			if *count == 0 {
				set_count.update(|count| count + 5);
				set_count.set(0);
			}
			*count
		});
		let outcome = drain(&engine);
		assert!(outcome.error.is_none());
		assert_eq!(outcome.results, vec![0]);
	}

	#[test]
	fn kind_mismatch_is_fatal() {
		let first = Cell::new(true);
		let engine = Engine::new(move || {
			if first.get() {
				first.set(false);
				let (count, set_count) = state_slot(|| 0);
				set_count.set(*count + 1);
			} else {
				let _ = memo_slot((), || 0);
			}
		});
		let outcome = drain(&engine);
		assert!(matches!(
			outcome.error,
			Some(HookError::KindMismatch {
				index: 0,
				expected: CellKind::Memo,
				found: CellKind::State,
			})
		));
		assert!(engine.core().is_stopped());
	}

	#[test]
	fn missing_cells_is_fatal() {
		let first = Cell::new(true);
		let engine = Engine::new(move || {
			if first.get() {
				first.set(false);
				let (_, set_a) = state_slot(|| 0);
				let _ = state_slot(|| 1);
				set_a.set(9);
			} else {
				let _ = state_slot(|| 0);
			}
		});
		let outcome = drain(&engine);
		assert!(matches!(
			outcome.error,
			Some(HookError::MissingCells {
				expected: 2,
				found: 1,
			})
		));
	}

	#[test]
	fn effect_runs_after_body_and_can_enqueue_state() {
		let engine = Engine::new(|| {
			let (count, set_count) = state_slot(|| 0);
			let value = *count;
			effect_slot(Some((value,)), move || {
				if value == 0 {
					set_count.set(10);
				}
				None::<Cleanup>
			});
			value
		});
		let outcome = drain(&engine);
		assert_eq!(outcome.results, vec![0, 10]);
	}

	#[test]
	fn effect_deps_presence_change_is_fatal() {
		let first = Cell::new(true);
		let engine = Engine::new(move || {
			let (count, set_count) = state_slot(|| 0);
			if first.get() {
				first.set(false);
				effect_slot(Some((0,)), || None::<Cleanup>);
				set_count.set(*count + 1);
			} else {
				effect_slot(None::<()>, || None::<Cleanup>);
			}
		});
		let outcome = drain(&engine);
		assert!(matches!(
			outcome.error,
			Some(HookError::DepsPresence { index: 1 })
		));
	}

	#[test]
	fn body_panic_is_fatal_and_forces_cleanup() {
		let cleaned = Rc::new(Cell::new(false));
		let setter = Rc::new(RefCell::new(None));
		let engine = Engine::new({
			let cleaned = cleaned.clone();
			let setter = setter.clone();
			move || {
				let (count, set_count) = state_slot(|| 0);
				*setter.borrow_mut() = Some(set_count);
				let cleaned = cleaned.clone();
				effect_slot(Some(()), move || {
					Some(Box::new(move || cleaned.set(true)) as Cleanup)
				});
				if *count != 0 {
					panic!("second run fails");
				}
			}
		});
		let outcome = drain(&engine);
		assert!(outcome.error.is_none());
		assert!(!cleaned.get());
		if let Some(set_count) = setter.borrow().as_ref() {
			set_count.set(1);
		}
		let outcome = drain(&engine);
		assert!(matches!(outcome.error, Some(HookError::BodyPanic(ref m)) if m.contains("second run")));
		assert!(outcome.results.is_empty());
		assert!(cleaned.get());
		assert!(engine.core().is_stopped());
	}

	#[test]
	fn cleanup_panic_is_isolated() {
		let engine = Engine::new(|| {
			let (count, set_count) = state_slot(|| 0);
			let value = *count;
			effect_slot(Some((value,)), move || {
				if value == 0 {
					set_count.set(1);
				}
				Some(Box::new(|| -> () { panic!("cleanup boom") }) as Cleanup)
			});
			value
		});
		let outcome = drain(&engine);
		assert!(outcome.error.is_none());
		assert_eq!(outcome.results, vec![0, 1]);
	}

	#[test]
	fn memo_recomputes_only_on_dependency_change() {
		let computations = Rc::new(Cell::new(0));
		let engine = Engine::new({
			let computations = computations.clone();
			move || {
				let (count, set_count) = state_slot(|| 0);
				let bucket = *count / 2;
				let computations = computations.clone();
				let doubled = memo_slot((bucket,), move || {
					computations.set(computations.get() + 1);
					bucket * 2
				});
				if *count < 3 {
					set_count.set(*count + 1);
				}
				*doubled
			}
		});
		let outcome = drain(&engine);
		assert!(outcome.error.is_none());
		// count 0,1 share bucket 0; count 2,3 share bucket 1.
		assert_eq!(outcome.results, vec![0, 0, 2, 2]);
		assert_eq!(computations.get(), 2);
	}

	#[test]
	fn hooks_outside_an_active_instance_panic_with_usage_error() {
		let payload = match std::panic::catch_unwind(|| state_slot(|| 0)) {
			Err(payload) => payload,
			Ok(_) => panic!("must panic outside an instance"),
		};
		let message = payload
			.downcast_ref::<String>()
			.cloned()
			.unwrap_or_default();
		assert!(message.contains("`start` or `Subject::new`"));
	}

	#[test]
	fn updater_sees_previously_applied_change() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let engine = Engine::new({
			let log = log.clone();
			move || {
				let (count, set_count) = state_slot(|| 0);
				log.borrow_mut().push(*count);
				if *count == 0 {
					set_count.set(3);
					set_count.update(|previous| previous + 1);
				}
				*count
			}
		});
		let outcome = drain(&engine);
		// 3 is applied first, the updater folds it to 4; only 4 is seen.
		assert_eq!(outcome.results, vec![0, 4]);
		assert_eq!(*log.borrow(), vec![0, 4]);
	}
}
