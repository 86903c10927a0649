//! Error types for the hooks runtime.
//!
//! Errors come in two tiers. Fatal errors terminate an instance and reach
//! its consumers exactly once as a terminal signal (a rejected completion,
//! or `Observer::error`). Isolated errors, such as a panicking cleanup
//! closure or a panicking observer callback, are caught per offender and reported on
//! the diagnostic channel via `tracing`, without stopping the instance.

use std::any::Any;

use thiserror::Error;

use crate::cell::CellKind;

/// A fatal instance error.
///
/// Shape violations mean the main function stopped calling hooks in the
/// same count, kind and order as earlier invocations; they are programming
/// errors and are not recoverable. The panic variants carry the payload of
/// a panic that escaped the main function, a state updater or an effect.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum HookError {
	/// The invocation called more hooks than earlier invocations did.
	#[error(
		"hook call order changed: invocation used more than the {expected} memory cell(s) established by earlier invocations"
	)]
	ExtraCell {
		/// Cell count established by the first complete invocation.
		expected: usize,
	},

	/// The invocation called fewer hooks than earlier invocations did.
	#[error(
		"hook call order changed: invocation used {found} of the {expected} memory cell(s) established by earlier invocations"
	)]
	MissingCells {
		/// Cell count established by the first complete invocation.
		expected: usize,
		/// Cells actually visited by this invocation.
		found: usize,
	},

	/// A hook of one kind was called at a position that holds a cell of a
	/// different kind.
	#[error("hook kind mismatch at cell {index}: expected {expected}, found {found}")]
	KindMismatch {
		index: usize,
		expected: CellKind,
		found: CellKind,
	},

	/// A cell was reused with a different value type than it was created
	/// with. The positional model fixes the type at creation.
	#[error("{kind} cell {index} was reused with a different value type")]
	TypeMismatch { index: usize, kind: CellKind },

	/// A dependency list changed length between invocations.
	#[error(
		"dependency list of the {kind} cell at position {index} changed length from {previous} to {current}"
	)]
	DepsLength {
		kind: CellKind,
		index: usize,
		previous: usize,
		current: usize,
	},

	/// An effect switched between having and not having a dependency list.
	#[error("effect cell {index} switched between having and not having a dependency list")]
	DepsPresence { index: usize },

	/// The main function panicked.
	#[error("main function panicked: {0}")]
	BodyPanic(String),

	/// A state updater closure panicked while pending changes were applied.
	#[error("state updater panicked: {0}")]
	UpdaterPanic(String),

	/// An effect closure panicked during the trigger phase. (A panicking
	/// *cleanup* closure is an isolated error instead.)
	#[error("effect panicked: {0}")]
	EffectPanic(String),
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
