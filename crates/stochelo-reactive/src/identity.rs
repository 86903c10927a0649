//! Identity comparisons for state de-duplication and dependency lists.
//!
//! The engine never uses generic equality or hashing to decide whether a
//! value "changed". It uses a dedicated identity relation, [`Identity`],
//! modelled on the `Object.is` semantics the hooks programming model was
//! designed around:
//!
//! - `NaN` is identical to `NaN` (a state cell set to `NaN` twice does not
//!   re-run anything)
//! - `+0.0` is *not* identical to `-0.0`
//! - plain values (integers, booleans, strings) compare by value
//! - shared pointers (`Rc`, `Arc`) compare by allocation, not by contents
//!
//! Dependency lists build on top of this: a [`DepList`] compares
//! element-wise, and its shape (length, and for effects: presence) is fixed
//! for the lifetime of the owning instance.

use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

/// Identity relation used for state de-duplication and dependency
/// comparison.
///
/// Implementations must be reflexive and symmetric. The provided
/// implementations reproduce `Object.is` semantics: value identity for
/// primitives and strings, pointer identity for shared pointers, and
/// NaN-equals-NaN (but `+0.0` ≠ `-0.0`) for floats.
///
/// # Example
///
/// ```
/// use stochelo_reactive::Identity;
///
/// assert!(f64::NAN.identical(&f64::NAN));
/// assert!(!0.0_f64.identical(&-0.0_f64));
/// assert!("a".identical(&"a"));
/// ```
pub trait Identity {
	/// Returns `true` when `self` and `other` are the same value under the
	/// identity relation.
	fn identical(&self, other: &Self) -> bool;
}

macro_rules! identity_by_value {
	($( $ty:ty ),+ $(,)?) => {
		$(
			impl Identity for $ty {
				fn identical(&self, other: &Self) -> bool {
					self == other
				}
			}
		)+
	};
}

identity_by_value!(
	i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char,
);

identity_by_value!(&'static str, String);

macro_rules! identity_for_float {
	($( $ty:ty ),+ $(,)?) => {
		$(
			impl Identity for $ty {
				fn identical(&self, other: &Self) -> bool {
					if self.is_nan() && other.is_nan() {
						return true;
					}
					// IEEE equality plus a sign check so that +0.0 and -0.0
					// count as different values.
					self == other && self.is_sign_positive() == other.is_sign_positive()
				}
			}
		)+
	};
}

identity_for_float!(f32, f64);

impl<T: ?Sized> Identity for Rc<T> {
	fn identical(&self, other: &Self) -> bool {
		Rc::ptr_eq(self, other)
	}
}

impl<T: ?Sized> Identity for Arc<T> {
	fn identical(&self, other: &Self) -> bool {
		Arc::ptr_eq(self, other)
	}
}

impl<T: Identity> Identity for Option<T> {
	fn identical(&self, other: &Self) -> bool {
		match (self, other) {
			(Some(a), Some(b)) => a.identical(b),
			(None, None) => true,
			_ => false,
		}
	}
}

/// A fixed-shape list of dependencies compared element-wise by identity.
///
/// Dependency lists are how effect and memo cells decide whether to re-run.
/// Two lists are identical only when every position holds an identical
/// element; element order matters. The *shape* of a list (its length, and
/// whether one is supplied at all for an effect) must not change between
/// invocations of the same instance; the engine treats that as a fatal
/// shape violation, not as "changed dependencies".
///
/// Implemented for the unit type (empty list), tuples up to eight elements,
/// arrays, and `Vec`.
pub trait DepList: 'static {
	/// Number of dependencies in the list.
	fn len(&self) -> usize;

	/// Returns `true` when the list is empty.
	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Element-wise identity comparison against a list of the same type.
	fn identical(&self, other: &Self) -> bool;
}

impl DepList for () {
	fn len(&self) -> usize {
		0
	}

	fn identical(&self, _other: &Self) -> bool {
		true
	}
}

macro_rules! dep_list_for_tuple {
	($len:expr => $( $ty:ident . $idx:tt ),+) => {
		impl<$( $ty: Identity + 'static ),+> DepList for ($( $ty, )+) {
			fn len(&self) -> usize {
				$len
			}

			fn identical(&self, other: &Self) -> bool {
				true $( && Identity::identical(&self.$idx, &other.$idx) )+
			}
		}
	};
}

dep_list_for_tuple!(1 => A.0);
dep_list_for_tuple!(2 => A.0, B.1);
dep_list_for_tuple!(3 => A.0, B.1, C.2);
dep_list_for_tuple!(4 => A.0, B.1, C.2, D.3);
dep_list_for_tuple!(5 => A.0, B.1, C.2, D.3, E.4);
dep_list_for_tuple!(6 => A.0, B.1, C.2, D.3, E.4, F.5);
dep_list_for_tuple!(7 => A.0, B.1, C.2, D.3, E.4, F.5, G.6);
dep_list_for_tuple!(8 => A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);

impl<T: Identity + 'static, const N: usize> DepList for [T; N] {
	fn len(&self) -> usize {
		N
	}

	fn identical(&self, other: &Self) -> bool {
		self.iter().zip(other.iter()).all(|(a, b)| a.identical(b))
	}
}

impl<T: Identity + 'static> DepList for Vec<T> {
	fn len(&self) -> usize {
		self.as_slice().len()
	}

	fn identical(&self, other: &Self) -> bool {
		self.as_slice().len() == other.as_slice().len()
			&& self.iter().zip(other.iter()).all(|(a, b)| a.identical(b))
	}
}

/// Object-safe wrapper so dependency lists of different concrete types can
/// be stored in memory cells. A downcast failure between invocations simply
/// compares as "not identical"; the length is still observable for the
/// shape check.
pub(crate) trait ErasedDeps {
	fn as_any(&self) -> &dyn Any;
	fn len(&self) -> usize;
	fn identical_to(&self, other: &dyn ErasedDeps) -> bool;
}

impl<D: DepList> ErasedDeps for D {
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn len(&self) -> usize {
		DepList::len(self)
	}

	fn identical_to(&self, other: &dyn ErasedDeps) -> bool {
		other
			.as_any()
			.downcast_ref::<D>()
			.is_some_and(|other| DepList::identical(self, other))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(f64::NAN, f64::NAN, true)]
	#[case(0.0, -0.0, false)]
	#[case(-0.0, -0.0, true)]
	#[case(1.5, 1.5, true)]
	#[case(1.5, 2.5, false)]
	fn float_identity(#[case] a: f64, #[case] b: f64, #[case] expected: bool) {
		assert_eq!(a.identical(&b), expected);
	}

	#[test]
	fn rc_identity_is_pointer_identity() {
		let a = Rc::new(1);
		let b = Rc::new(1);
		assert!(a.identical(&a.clone()));
		assert!(!a.identical(&b));
	}

	#[test]
	fn string_identity_is_value_identity() {
		assert!("abc".identical(&"abc"));
		assert!(String::from("abc").identical(&String::from("abc")));
		assert!(!"abc".identical(&"abd"));
	}

	#[test]
	fn tuple_dep_list_order_matters() {
		let a = ("a", "b", "c");
		let b = ("a", "c", "b");
		assert!(a.identical(&a));
		assert!(!a.identical(&b));
	}

	#[test]
	fn erased_deps_of_different_types_are_not_identical() {
		let a: Box<dyn ErasedDeps> = Box::new((1_i32,));
		let b: Box<dyn ErasedDeps> = Box::new(("one",));
		assert_eq!(a.len(), 1);
		assert!(!a.identical_to(b.as_ref()));
	}

	#[test]
	fn vec_dep_list_compares_length_and_elements() {
		let a = vec![1, 2, 3];
		assert!(a.identical(&vec![1, 2, 3]));
		assert!(!a.identical(&vec![1, 2]));
		assert!(!a.identical(&vec![1, 2, 4]));
	}
}
