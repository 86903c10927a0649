//! Memory cells: the per-instance slots behind every hook call.
//!
//! An instance owns an ordered list of cells, one per primitive hook call
//! in its main function. Cells are created lazily on the first invocation,
//! indexed positionally by call order, and mutated in place afterwards.
//! They are never removed before instance teardown.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::identity::ErasedDeps;

/// A cleanup closure returned by an effect, run before the effect re-runs
/// and on instance teardown.
pub type Cleanup = Box<dyn FnOnce()>;

pub(crate) type EffectFn = Box<dyn FnOnce() -> Option<Cleanup>>;
pub(crate) type DynValue = Rc<dyn Any>;
pub(crate) type Comparator = fn(&dyn Any, &dyn Any) -> bool;

/// Kind tag of a memory cell, used in shape-violation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
	/// Persistent state with a pending-change queue.
	State,
	/// A side effect with optional dependencies and a stored cleanup.
	Effect,
	/// A cached computation keyed by its dependencies.
	Memo,
}

impl fmt::Display for CellKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CellKind::State => write!(f, "state"),
			CellKind::Effect => write!(f, "effect"),
			CellKind::Memo => write!(f, "memo"),
		}
	}
}

/// A queued request to change a state cell, applied at the start of the
/// next invocation loop pass.
pub(crate) enum StateChange {
	Replace(DynValue),
	Update(Box<dyn FnOnce(&dyn Any) -> DynValue>),
}

pub(crate) struct StateCell {
	/// Current value, type-erased; the concrete type is fixed at creation.
	pub(crate) value: DynValue,
	/// Pending change requests, drained in order by the invocation loop.
	pub(crate) pending: Vec<StateChange>,
	/// Monomorphized identity comparator for the cell's value type.
	pub(crate) compare: Comparator,
}

pub(crate) struct EffectCell {
	/// Latest effect closure; taken when the trigger phase runs it.
	pub(crate) effect: Option<EffectFn>,
	/// `None` means "run on every invocation". Presence is fixed for the
	/// instance's lifetime.
	pub(crate) deps: Option<Box<dyn ErasedDeps>>,
	/// Set when the effect must run on the next commit.
	pub(crate) outdated: bool,
	/// Cleanup returned by the last run, if any.
	pub(crate) cleanup: Option<Cleanup>,
}

pub(crate) struct MemoCell {
	pub(crate) value: DynValue,
	pub(crate) deps: Box<dyn ErasedDeps>,
}

/// Closed sum of the three cell kinds. Positional matching plus the kind
/// tag is all the engine needs; there is deliberately no polymorphism here.
pub(crate) enum MemoryCell {
	State(StateCell),
	Effect(EffectCell),
	Memo(MemoCell),
}

impl MemoryCell {
	pub(crate) fn kind(&self) -> CellKind {
		match self {
			MemoryCell::State(_) => CellKind::State,
			MemoryCell::Effect(_) => CellKind::Effect,
			MemoryCell::Memo(_) => CellKind::Memo,
		}
	}
}
