//! Arena-based storage with typed handles.
//!
//! An [`Arena`] has two layers. The base layer is a frozen `&'static` slice shared by every compilation (this is
//! where the builtin types and functions live), and on top of it sits an owned, growable layer for everything a
//! single compilation declares. Handles index both layers with one number, so a handle to a builtin and a handle
//! to a user declaration look and compare the same.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Index;

/// A typed handle into an [`Arena`].
pub struct Handle<T> {
	index: u32,
	_phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Handle<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
	fn eq(&self, other: &Self) -> bool {
		self.index == other.index
	}
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T> Ord for Handle<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.index.cmp(&other.index)
	}
}

impl<T> Hash for Handle<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.index.hash(state);
	}
}

impl<T> fmt::Debug for Handle<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}]", self.index)
	}
}

impl<T> Handle<T> {
	pub(crate) const fn new(index: u32) -> Self {
		Self {
			index,
			_phantom: PhantomData,
		}
	}

	/// Returns the zero-based index of this handle.
	pub fn index(self) -> usize {
		self.index as usize
	}
}

/// A two-layer arena.
///
/// # Invariants
/// Handles are never invalidated: values are only ever appended, and the base layer is immutable.
#[derive(Debug, Clone)]
pub struct Arena<T: 'static> {
	base: &'static [T],
	items: Vec<T>,
}

impl<T: 'static> Arena<T> {
	/// Constructs an arena with an empty base layer.
	pub fn new() -> Self {
		Self {
			base: &[],
			items: Vec::new(),
		}
	}

	/// Constructs an arena on top of a frozen base layer.
	pub fn with_base(base: &'static [T]) -> Self {
		Self {
			base,
			items: Vec::new(),
		}
	}

	/// Appends a value and returns its handle.
	pub fn append(&mut self, value: T) -> Handle<T> {
		let index = self.base.len() + self.items.len();
		self.items.push(value);
		Handle::new(index as u32)
	}

	/// Returns the value behind the handle.
	pub fn get(&self, handle: Handle<T>) -> Option<&T> {
		let index = handle.index();
		if index < self.base.len() {
			self.base.get(index)
		} else {
			self.items.get(index - self.base.len())
		}
	}

	/// Returns the value behind the handle mutably. Values in the base layer are frozen, so this returns `None` for
	/// them.
	pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
		let index = handle.index();
		if index < self.base.len() {
			None
		} else {
			self.items.get_mut(index - self.base.len())
		}
	}

	/// Returns whether the handle points into the frozen base layer.
	pub fn is_base(&self, handle: Handle<T>) -> bool {
		handle.index() < self.base.len()
	}

	/// Returns the total number of values in both layers.
	pub fn len(&self) -> usize {
		self.base.len() + self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Iterates over the values of the owned layer only, in insertion order.
	pub fn iter_owned(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
		let offset = self.base.len();
		self.items
			.iter()
			.enumerate()
			.map(move |(i, v)| (Handle::new((offset + i) as u32), v))
	}
}

impl<T: 'static> Default for Arena<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> Index<Handle<T>> for Arena<T> {
	type Output = T;

	fn index(&self, handle: Handle<T>) -> &T {
		let index = handle.index();
		if index < self.base.len() {
			&self.base[index]
		} else {
			&self.items[index - self.base.len()]
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	static BASE: [&str; 2] = ["a", "b"];

	#[test]
	fn layered() {
		let mut arena = Arena::with_base(&BASE);
		let c = arena.append("c");
		assert_eq!(c.index(), 2);
		assert_eq!(arena[Handle::new(0)], "a");
		assert_eq!(arena[c], "c");
		assert!(arena.is_base(Handle::new(1)));
		assert!(!arena.is_base(c));
		assert!(arena.get_mut(Handle::new(0)).is_none());
		assert!(arena.get_mut(c).is_some());
		assert_eq!(arena.len(), 3);
		assert_eq!(arena.iter_owned().count(), 1);
	}
}
