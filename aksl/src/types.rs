//! The type system.
//!
//! Types are interned in an [`Arena`]: the builtin types live in the frozen base layer and are shared by every
//! compilation, structs and arrays declared by a program are appended on top. Two types are the same type if and
//! only if their handles are equal. [`Types::array_of()`] reuses an existing array type when the element type and
//! size match, so structural array construction never produces duplicates.
//!
//! Numeric scalars are ordered on a widening ladder, lowest rank first:
//!
//! ```text
//! ushort < short < uint < int < half < float
//! ```
//!
//! A value may be implicitly converted to any type of equal or higher rank with the same shape. `bool` never
//! converts implicitly.

use crate::{
	arena::{Arena, Handle},
	ast::Operator,
	builtins,
	modifiers::Modifiers,
	Span,
};
use std::collections::HashMap;

pub type TypeHandle = Handle<Type>;

/// The kind of a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
	Float,
	Signed,
	Unsigned,
	Boolean,
}

/// A scalar type description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scalar {
	pub kind: ScalarKind,
	/// The storage width in bits.
	pub width: u8,
	/// The minimum precision in bits. Lower than `width` for the relaxed-precision types `half`, `short` and
	/// `ushort`.
	pub min_width: u8,
	/// The position on the widening ladder; `0` for `bool`.
	pub rank: u8,
}

impl Scalar {
	pub fn is_numeric(&self) -> bool {
		self.kind != ScalarKind::Boolean
	}

	pub fn is_integer(&self) -> bool {
		matches!(self.kind, ScalarKind::Signed | ScalarKind::Unsigned)
	}

	pub fn is_float(&self) -> bool {
		self.kind == ScalarKind::Float
	}

	/// Returns whether this type only guarantees less precision than its storage width.
	pub fn is_relaxed_precision(&self) -> bool {
		self.min_width < self.width
	}

	/// Returns the smallest value representable in this type.
	pub fn min_value(&self) -> f64 {
		match (self.kind, self.min_width) {
			(ScalarKind::Float, 16) => -65504.0,
			(ScalarKind::Float, _) => -(f32::MAX as f64),
			(ScalarKind::Signed, 16) => i16::MIN as f64,
			(ScalarKind::Signed, _) => i32::MIN as f64,
			(ScalarKind::Unsigned, _) | (ScalarKind::Boolean, _) => 0.0,
		}
	}

	/// Returns the largest value representable in this type.
	pub fn max_value(&self) -> f64 {
		match (self.kind, self.min_width) {
			(ScalarKind::Float, 16) => 65504.0,
			(ScalarKind::Float, _) => f32::MAX as f64,
			(ScalarKind::Signed, 16) => i16::MAX as f64,
			(ScalarKind::Signed, _) => i32::MAX as f64,
			(ScalarKind::Unsigned, 16) => u16::MAX as f64,
			(ScalarKind::Unsigned, _) => u32::MAX as f64,
			(ScalarKind::Boolean, _) => 1.0,
		}
	}
}

/// The size of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArraySize {
	/// A fixed element count, always at least one.
	Fixed(u32),
	/// No size; only legal in a few positions.
	Unsized,
}

/// A field of a struct or interface block.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
	pub name: String,
	pub ty: TypeHandle,
	pub modifiers: Modifiers,
	pub span: Span,
}

/// What kind of type a [`Type`] is.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
	Void,
	Scalar(Scalar),
	/// A vector of 2 to 4 scalar components.
	Vector { component: TypeHandle, size: u8 },
	/// A matrix of 2 to 4 columns, each column being a float vector.
	Matrix { column: TypeHandle, columns: u8 },
	Array { element: TypeHandle, size: ArraySize },
	Struct {
		fields: Vec<Field>,
		/// Whether this is the type of an interface block rather than a plain struct.
		interface_block: bool,
	},
	/// A placeholder that stands for any of the listed types. Only appears in builtin function signatures.
	Generic { coercible: Vec<TypeHandle> },
	/// The type of an expression that failed to convert. Compatible with everything, so one error does not cause
	/// a cascade of follow-up errors.
	Poison,
	/// Stands in for a type name that could not be resolved.
	Invalid,
}

/// An interned type.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
	pub name: String,
	pub kind: TypeKind,
}

/// The deepest permitted nesting of structs and arrays.
pub const MAX_NESTING_DEPTH: usize = 8;

/// The type table of one compilation.
#[derive(Debug, Clone)]
pub struct Types {
	arena: Arena<Type>,
	arrays: HashMap<(TypeHandle, ArraySize), TypeHandle>,
}

impl Default for Types {
	fn default() -> Self {
		Self::new()
	}
}

impl std::ops::Index<TypeHandle> for Types {
	type Output = Type;

	fn index(&self, handle: TypeHandle) -> &Type {
		&self.arena[handle]
	}
}

impl Types {
	/// Constructs a type table containing just the builtin types.
	pub fn new() -> Self {
		Self {
			arena: Arena::with_base(&builtins::module().types),
			arrays: HashMap::new(),
		}
	}

	/// Returns the well-known builtin type handles.
	pub fn builtin(&self) -> &'static builtins::BuiltinTypes {
		&builtins::module().ty
	}

	pub fn name(&self, ty: TypeHandle) -> &str {
		&self[ty].name
	}

	/// Returns the array type of `element` with `size`, creating it if it doesn't exist yet.
	pub fn array_of(&mut self, element: TypeHandle, size: ArraySize) -> TypeHandle {
		if let Some(ty) = self.arrays.get(&(element, size)) {
			return *ty;
		}
		// The outer dimension is written first: an array of two `float[3]` is `float[2][3]`.
		let element_name = self.name(element);
		let (base, dimensions) = element_name.split_at(element_name.find('[').unwrap_or(element_name.len()));
		let name = match size {
			ArraySize::Fixed(n) => format!("{base}[{n}]{dimensions}"),
			ArraySize::Unsized => format!("{base}[]{dimensions}"),
		};
		let ty = self.arena.append(Type {
			name,
			kind: TypeKind::Array { element, size },
		});
		self.arrays.insert((element, size), ty);
		ty
	}

	/// Appends a new struct type. Every struct declaration is a distinct type.
	pub fn add_struct(
		&mut self,
		name: String,
		fields: Vec<Field>,
		interface_block: bool,
	) -> TypeHandle {
		self.arena.append(Type {
			name,
			kind: TypeKind::Struct {
				fields,
				interface_block,
			},
		})
	}

	/// Iterates over the types declared by the program, in declaration order.
	pub fn iter_declared(&self) -> impl Iterator<Item = (TypeHandle, &Type)> {
		self.arena.iter_owned()
	}

	/* Classification */

	/// Returns the scalar description of a scalar, or of the components of a vector or matrix.
	pub fn scalar(&self, ty: TypeHandle) -> Option<Scalar> {
		match &self[ty].kind {
			TypeKind::Scalar(s) => Some(*s),
			TypeKind::Vector { component, .. } => self.scalar(*component),
			TypeKind::Matrix { column, .. } => self.scalar(*column),
			_ => None,
		}
	}

	/// Returns the scalar component type of a scalar, vector or matrix, or the type itself otherwise.
	pub fn component(&self, ty: TypeHandle) -> TypeHandle {
		match &self[ty].kind {
			TypeKind::Vector { component, .. } => *component,
			TypeKind::Matrix { column, .. } => self.component(*column),
			_ => ty,
		}
	}

	/// Returns the number of rows: the size of a vector, the column size of a matrix, `1` otherwise.
	pub fn rows(&self, ty: TypeHandle) -> u8 {
		match &self[ty].kind {
			TypeKind::Vector { size, .. } => *size,
			TypeKind::Matrix { column, .. } => self.rows(*column),
			_ => 1,
		}
	}

	/// Returns the number of columns of a matrix, `1` otherwise.
	pub fn columns(&self, ty: TypeHandle) -> u8 {
		match &self[ty].kind {
			TypeKind::Matrix { columns, .. } => *columns,
			_ => 1,
		}
	}

	/// Returns the column vector type of a matrix.
	pub fn column(&self, ty: TypeHandle) -> Option<TypeHandle> {
		match &self[ty].kind {
			TypeKind::Matrix { column, .. } => Some(*column),
			_ => None,
		}
	}

	/// Returns the element type and size of an array.
	pub fn array(&self, ty: TypeHandle) -> Option<(TypeHandle, ArraySize)> {
		match &self[ty].kind {
			TypeKind::Array { element, size } => Some((*element, *size)),
			_ => None,
		}
	}

	/// Returns the fields of a struct or interface block.
	pub fn fields(&self, ty: TypeHandle) -> Option<&[Field]> {
		match &self[ty].kind {
			TypeKind::Struct { fields, .. } => Some(fields),
			_ => None,
		}
	}

	/// Returns the number of scalar slots a value of this type occupies.
	pub fn slot_count(&self, ty: TypeHandle) -> usize {
		match &self[ty].kind {
			TypeKind::Scalar(_) => 1,
			TypeKind::Vector { size, .. } => *size as usize,
			TypeKind::Matrix { column, columns } => {
				self.rows(*column) as usize * *columns as usize
			}
			TypeKind::Array {
				element,
				size: ArraySize::Fixed(n),
			} => self.slot_count(*element) * *n as usize,
			TypeKind::Struct { fields, .. } => {
				fields.iter().map(|f| self.slot_count(f.ty)).sum()
			}
			_ => 0,
		}
	}

	pub fn is_scalar(&self, ty: TypeHandle) -> bool {
		matches!(self[ty].kind, TypeKind::Scalar(_))
	}

	pub fn is_vector(&self, ty: TypeHandle) -> bool {
		matches!(self[ty].kind, TypeKind::Vector { .. })
	}

	pub fn is_matrix(&self, ty: TypeHandle) -> bool {
		matches!(self[ty].kind, TypeKind::Matrix { .. })
	}

	pub fn is_array(&self, ty: TypeHandle) -> bool {
		matches!(self[ty].kind, TypeKind::Array { .. })
	}

	pub fn is_struct(&self, ty: TypeHandle) -> bool {
		matches!(self[ty].kind, TypeKind::Struct { .. })
	}

	pub fn is_void(&self, ty: TypeHandle) -> bool {
		matches!(self[ty].kind, TypeKind::Void)
	}

	pub fn is_generic(&self, ty: TypeHandle) -> bool {
		matches!(self[ty].kind, TypeKind::Generic { .. })
	}

	/// Returns whether this is the poison or the invalid type.
	pub fn is_poison(&self, ty: TypeHandle) -> bool {
		matches!(self[ty].kind, TypeKind::Poison | TypeKind::Invalid)
	}

	pub fn is_unsized_array(&self, ty: TypeHandle) -> bool {
		matches!(
			self[ty].kind,
			TypeKind::Array {
				size: ArraySize::Unsized,
				..
			}
		)
	}

	/// Returns whether this is a numeric scalar, vector or matrix.
	pub fn is_numeric(&self, ty: TypeHandle) -> bool {
		self.scalar(ty).map_or(false, |s| s.is_numeric())
	}

	/// Returns whether this is a boolean scalar or vector.
	pub fn is_boolean(&self, ty: TypeHandle) -> bool {
		self.scalar(ty)
			.map_or(false, |s| s.kind == ScalarKind::Boolean)
	}

	/// Returns whether this is an integer scalar or vector.
	pub fn is_integer(&self, ty: TypeHandle) -> bool {
		self.scalar(ty).map_or(false, |s| s.is_integer())
	}

	/// Returns whether this type or any type nested within it contains an unsized array.
	pub fn contains_unsized_array(&self, ty: TypeHandle) -> bool {
		match &self[ty].kind {
			TypeKind::Array {
				size: ArraySize::Unsized,
				..
			} => true,
			TypeKind::Array { element, .. } => {
				self.contains_unsized_array(*element)
			}
			TypeKind::Struct { fields, .. } => {
				fields.iter().any(|f| self.contains_unsized_array(f.ty))
			}
			_ => false,
		}
	}

	/// Returns how deeply structs and arrays are nested within this type.
	pub fn nesting_depth(&self, ty: TypeHandle) -> usize {
		match &self[ty].kind {
			TypeKind::Array { element, .. } => 1 + self.nesting_depth(*element),
			TypeKind::Struct { fields, .. } => {
				1 + fields
					.iter()
					.map(|f| self.nesting_depth(f.ty))
					.max()
					.unwrap_or(0)
			}
			_ => 0,
		}
	}

	/// Returns the type with the shape of `shape` and the component type `component`, e.g. `float3` and `int`
	/// yield `int3`. Returns `None` if no such type exists, e.g. there are no integer matrices.
	pub fn with_component(
		&self,
		shape: TypeHandle,
		component: TypeHandle,
	) -> Option<TypeHandle> {
		let module = builtins::module();
		match &self[shape].kind {
			TypeKind::Scalar(_) => Some(component),
			TypeKind::Vector { size, .. } => module.vector(component, *size),
			TypeKind::Matrix { column, columns } => {
				module.matrix(component, *columns, self.rows(*column))
			}
			_ => None,
		}
	}

	/// Returns the vector type with the component type and size; a size of one yields the scalar itself.
	pub fn vector(&self, component: TypeHandle, size: u8) -> Option<TypeHandle> {
		if size == 1 {
			Some(component)
		} else {
			builtins::module().vector(component, size)
		}
	}

	/// Returns the matrix type with the component type and dimensions.
	pub fn matrix(
		&self,
		component: TypeHandle,
		columns: u8,
		rows: u8,
	) -> Option<TypeHandle> {
		builtins::module().matrix(component, columns, rows)
	}

	/* Coercion */

	/// Returns the cost of implicitly converting a value of type `from` to type `to`, or `None` if that is not
	/// possible. Identical types cost nothing; each step up the widening ladder costs one.
	pub fn coercion_cost(&self, from: TypeHandle, to: TypeHandle) -> Option<u32> {
		if from == to {
			return Some(0);
		}
		match (&self[from].kind, &self[to].kind) {
			(_, TypeKind::Generic { coercible }) => coercible
				.iter()
				.filter_map(|c| self.coercion_cost(from, *c))
				.min(),
			(TypeKind::Poison | TypeKind::Invalid, _)
			| (_, TypeKind::Poison | TypeKind::Invalid) => Some(0),
			(TypeKind::Scalar(a), TypeKind::Scalar(b)) => {
				if a.is_numeric() && b.is_numeric() && a.rank <= b.rank {
					Some(u32::from(b.rank - a.rank))
				} else {
					None
				}
			}
			(
				TypeKind::Vector {
					component: a,
					size: n,
				},
				TypeKind::Vector {
					component: b,
					size: m,
				},
			) if n == m => self.coercion_cost(*a, *b),
			(
				TypeKind::Matrix {
					column: a,
					columns: n,
				},
				TypeKind::Matrix {
					column: b,
					columns: m,
				},
			) if n == m => self.coercion_cost(*a, *b),
			_ => None,
		}
	}

	pub fn can_coerce(&self, from: TypeHandle, to: TypeHandle) -> bool {
		self.coercion_cost(from, to).is_some()
	}

	/// Returns the type both operands can be converted to, if there is one.
	fn common_type(&self, a: TypeHandle, b: TypeHandle) -> Option<TypeHandle> {
		if self.can_coerce(a, b) {
			Some(b)
		} else if self.can_coerce(b, a) {
			Some(a)
		} else {
			None
		}
	}

	/// Determines the operand and result types of a binary operator.
	///
	/// Returns `(left, right, result)` where `left` and `right` are the types the operands must be converted to
	/// before applying the operator, or `None` if the operator cannot be applied to these types at all.
	///
	/// For the symmetric operators this is commutative up to operand order, and the result never has a lower
	/// rank than either operand.
	pub fn determine_binary_type(
		&self,
		op: Operator,
		left: TypeHandle,
		right: TypeHandle,
	) -> Option<(TypeHandle, TypeHandle, TypeHandle)> {
		let b = self.builtin();
		match op {
			Operator::Comma => return Some((left, right, right)),
			Operator::Assign => {
				return self.can_coerce(right, left).then_some((left, left, left));
			}
			_ => {}
		}

		if op.is_assignment() {
			// Compound assignment: apply the operator, and the result must be storable into the left side.
			let (l, r, result) =
				self.determine_binary_type(op.remove_assignment(), left, right)?;
			return (l == left && self.can_coerce(result, left))
				.then_some((left, r, left));
		}

		match op {
			Operator::LogicalAnd | Operator::LogicalOr | Operator::LogicalXor => {
				(left == b.bool && right == b.bool)
					.then_some((b.bool, b.bool, b.bool))
			}
			Operator::Eq | Operator::Ne => {
				if self.is_array(left) || self.is_struct(left) {
					return (left == right).then_some((left, right, b.bool));
				}
				let common = self.common_type(left, right)?;
				self.scalar(common)?;
				Some((common, common, b.bool))
			}
			Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => {
				if !(self.is_scalar(left) && self.is_scalar(right)) {
					return None;
				}
				let common = self.common_type(left, right)?;
				self.is_numeric(common).then_some((common, common, b.bool))
			}
			Operator::Add
			| Operator::Sub
			| Operator::Mul
			| Operator::Div
			| Operator::Rem
			| Operator::Shl
			| Operator::Shr
			| Operator::BitwiseAnd
			| Operator::BitwiseOr
			| Operator::BitwiseXor => self.determine_arithmetic_type(op, left, right),
			_ => None,
		}
	}

	fn determine_arithmetic_type(
		&self,
		op: Operator,
		left: TypeHandle,
		right: TypeHandle,
	) -> Option<(TypeHandle, TypeHandle, TypeHandle)> {
		if !self.is_numeric(left) || !self.is_numeric(right) {
			return None;
		}
		let integer_only = matches!(
			op,
			Operator::Rem
				| Operator::Shl | Operator::Shr
				| Operator::BitwiseAnd
				| Operator::BitwiseOr
				| Operator::BitwiseXor
		);
		if integer_only && !(self.is_integer(left) && self.is_integer(right)) {
			return None;
		}

		if matches!(op, Operator::Shl | Operator::Shr) {
			// The shift amount does not need the same signedness; it only needs a matching shape or be a scalar.
			return (self.is_scalar(right) || self.rows(left) == self.rows(right))
				.then_some((left, right, left));
		}

		let component =
			self.common_type(self.component(left), self.component(right))?;

		if op == Operator::Mul {
			let (l_mat, r_mat) = (self.is_matrix(left), self.is_matrix(right));
			let (l_vec, r_vec) = (self.is_vector(left), self.is_vector(right));
			if l_mat && r_mat {
				// (C1 x R1) * (C2 x R2) requires C1 == R2 and yields a C2 x R1 matrix.
				if self.columns(left) != self.rows(right) {
					return None;
				}
				let result =
					self.matrix(component, self.columns(right), self.rows(left))?;
				return Some((
					self.with_component(left, component)?,
					self.with_component(right, component)?,
					result,
				));
			}
			if l_mat && r_vec {
				if self.columns(left) != self.rows(right) {
					return None;
				}
				let result = self.vector(component, self.rows(left))?;
				return Some((
					self.with_component(left, component)?,
					self.with_component(right, component)?,
					result,
				));
			}
			if l_vec && r_mat {
				if self.rows(left) != self.rows(right) {
					return None;
				}
				let result = self.vector(component, self.columns(right))?;
				return Some((
					self.with_component(left, component)?,
					self.with_component(right, component)?,
					result,
				));
			}
		}

		let l = self.with_component(left, component)?;
		let r = self.with_component(right, component)?;
		if self.is_scalar(left) && !self.is_scalar(right) {
			return Some((l, r, r));
		}
		if !self.is_scalar(left) && self.is_scalar(right) {
			return Some((l, r, l));
		}
		// Same shape required from here on.
		(self.rows(left) == self.rows(right)
			&& self.columns(left) == self.columns(right))
		.then_some((l, r, l))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn types() -> Types {
		Types::new()
	}

	#[test]
	fn interned_arrays() {
		let mut t = types();
		let float = t.builtin().float;
		let a = t.array_of(float, ArraySize::Fixed(4));
		let b = t.array_of(float, ArraySize::Fixed(4));
		let c = t.array_of(float, ArraySize::Fixed(5));
		let d = t.array_of(float, ArraySize::Unsized);
		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(t.name(a), "float[4]");
		assert_eq!(t.name(d), "float[]");
		let nested = t.array_of(a, ArraySize::Fixed(2));
		assert_eq!(t.nesting_depth(nested), 2);
	}

	#[test]
	fn widening_ladder() {
		let t = types();
		let b = t.builtin();
		assert_eq!(t.coercion_cost(b.int, b.float), Some(2));
		assert_eq!(t.coercion_cost(b.ushort, b.short), Some(1));
		assert_eq!(t.coercion_cost(b.uint, b.int), Some(1));
		assert_eq!(t.coercion_cost(b.float, b.int), None);
		assert_eq!(t.coercion_cost(b.bool, b.int), None);
		assert_eq!(t.coercion_cost(b.int, b.bool), None);
		assert_eq!(t.coercion_cost(b.int2, b.float2), Some(2));
		assert_eq!(t.coercion_cost(b.int2, b.float3), None);
		assert_eq!(t.coercion_cost(b.float2, b.gen_ftype), Some(0));
		assert_eq!(t.coercion_cost(b.int3, b.gen_ftype), Some(2));
	}

	#[test]
	fn binary_types() {
		let t = types();
		let b = t.builtin();
		assert_eq!(
			t.determine_binary_type(Operator::Add, b.int, b.float),
			Some((b.float, b.float, b.float))
		);
		assert_eq!(
			t.determine_binary_type(Operator::Mul, b.float, b.float3),
			Some((b.float, b.float3, b.float3))
		);
		assert_eq!(
			t.determine_binary_type(Operator::Mul, b.float4x4, b.float4),
			Some((b.float4x4, b.float4, b.float4))
		);
		assert_eq!(
			t.determine_binary_type(Operator::Lt, b.int, b.float),
			Some((b.float, b.float, b.bool))
		);
		assert_eq!(t.determine_binary_type(Operator::Rem, b.float, b.float), None);
		assert_eq!(t.determine_binary_type(Operator::Add, b.float2, b.float3), None);
		assert_eq!(t.determine_binary_type(Operator::LogicalAnd, b.bool, b.int), None);
		assert_eq!(
			t.determine_binary_type(Operator::AddAssign, b.float, b.int),
			Some((b.float, b.float, b.float))
		);
		assert_eq!(t.determine_binary_type(Operator::AddAssign, b.int, b.float), None);
		assert_eq!(
			t.determine_binary_type(Operator::Assign, b.float, b.int),
			Some((b.float, b.float, b.float))
		);
	}

	#[test]
	fn symmetric_operators_commute() {
		let t = types();
		let b = t.builtin();
		let all = [
			b.bool, b.int, b.uint, b.short, b.ushort, b.float, b.half, b.float2, b.float3,
			b.int3, b.half4, b.float2x2, b.float3x3, b.uint2, b.bool2,
		];
		let symmetric = [
			Operator::Add,
			Operator::Mul,
			Operator::Eq,
			Operator::Ne,
			Operator::BitwiseAnd,
			Operator::BitwiseOr,
			Operator::BitwiseXor,
			Operator::LogicalAnd,
			Operator::LogicalOr,
			Operator::LogicalXor,
		];
		for op in symmetric {
			for &x in &all {
				for &y in &all {
					let xy = t.determine_binary_type(op, x, y);
					let yx = t.determine_binary_type(op, y, x);
					// Matrix products are the one place where operand order matters.
					if op == Operator::Mul && (t.is_matrix(x) || t.is_matrix(y)) {
						continue;
					}
					match (xy, yx) {
						(Some((l1, r1, res1)), Some((l2, r2, res2))) => {
							assert_eq!((l1, r1, res1), (r2, l2, res2), "{op:?} {x:?} {y:?}");
							let rank = |ty| t.scalar(ty).map_or(0, |s| s.rank);
							if op.is_arithmetic() {
								assert!(rank(res1) >= rank(x) && rank(res1) >= rank(y));
							}
						}
						(None, None) => {}
						_ => panic!("{op:?} is not commutative for {x:?} and {y:?}"),
					}
				}
			}
		}
	}

	#[test]
	fn ranges() {
		let t = types();
		let b = t.builtin();
		let int = t.scalar(b.int).unwrap();
		assert_eq!(int.max_value(), 2147483647.0);
		let ushort = t.scalar(b.ushort).unwrap();
		assert_eq!(ushort.max_value(), 65535.0);
		assert!(t.scalar(b.half).unwrap().is_relaxed_precision());
		assert!(!t.scalar(b.float).unwrap().is_relaxed_precision());
	}
}
