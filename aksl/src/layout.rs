//! Memory layouts of block members: the std140 and std430 alignment rules.
//!
//! Both layouts place scalars at 4 byte alignment, 2-component vectors at 8 and 3- and 4-component vectors at 16.
//! Matrices are stored column-major as an array of their column vectors. std140 additionally rounds the alignment
//! of arrays, structs and matrix columns up to 16 bytes, which std430 does not.

use crate::types::{ArraySize, Field, TypeHandle, TypeKind, Types};
use std::cmp::Reverse;

/// A block memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryLayout {
	/// Uniform blocks.
	Std140,
	/// Storage buffers and push constants.
	Std430,
}

/// The placement-relevant metrics of a type under a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeLayout {
	pub alignment: u32,
	/// The size, including the padding at the end of arrays and structs. An unsized array has size `0`.
	pub size: u32,
	/// The stride between columns, for a matrix or an array of matrices; `0` otherwise.
	pub matrix_stride: u32,
	/// The stride between elements, for an array; `0` otherwise.
	pub array_stride: u32,
}

impl TypeLayout {
	/// Returns whether the size or the stride did not fit in 32 bits. Both saturate at `u32::MAX`, which no
	/// real size can reach since every size is a multiple of four.
	pub fn overflows(&self) -> bool {
		self.size == u32::MAX || self.array_stride == u32::MAX
	}
}

/// An explicit `offset` which cannot be honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetError {
	/// The offset overlaps the previous field.
	TooSmall { minimum: u32 },
	/// The offset is not a multiple of the field alignment.
	Misaligned { alignment: u32 },
	/// The field ends past 4 GiB.
	Overflow,
}

/// Where a field of a struct is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPlacement {
	pub offset: u32,
	pub layout: TypeLayout,
	/// Set when the field has an explicit offset which breaks the rules; the explicit offset is used anyway.
	pub error: Option<OffsetError>,
}

/// Rounds `offset` up to a multiple of `alignment`, which must be a power of two. Saturates at `u32::MAX`.
pub fn align_to(offset: u32, alignment: u32) -> u32 {
	debug_assert!(alignment.is_power_of_two());
	match offset.checked_add(alignment - 1) {
		Some(end) => end & !(alignment - 1),
		None => u32::MAX,
	}
}

impl MemoryLayout {
	pub fn name(self) -> &'static str {
		match self {
			MemoryLayout::Std140 => "std140",
			MemoryLayout::Std430 => "std430",
		}
	}

	/// Rounds a compound alignment up as the layout requires.
	fn round_up(self, alignment: u32) -> u32 {
		match self {
			MemoryLayout::Std140 => alignment.max(16),
			MemoryLayout::Std430 => alignment,
		}
	}

	/// Returns whether a type can be placed in a block with this layout. Booleans have no defined memory
	/// representation, nor do the intermediate types.
	pub fn is_supported(self, types: &Types, ty: TypeHandle) -> bool {
		match &types[ty].kind {
			TypeKind::Scalar(_) | TypeKind::Vector { .. } | TypeKind::Matrix { .. } => {
				!types.is_boolean(ty)
			}
			TypeKind::Array { element, .. } => self.is_supported(types, *element),
			TypeKind::Struct { fields, .. } => {
				fields.iter().all(|f| self.is_supported(types, f.ty))
			}
			_ => false,
		}
	}

	/// Computes the layout metrics of a supported type.
	pub fn layout(self, types: &Types, ty: TypeHandle) -> TypeLayout {
		match &types[ty].kind {
			TypeKind::Scalar(_) => TypeLayout {
				alignment: 4,
				size: 4,
				..Default::default()
			},
			TypeKind::Vector { size, .. } => TypeLayout {
				alignment: if *size == 2 { 8 } else { 16 },
				size: 4 * u32::from(*size),
				..Default::default()
			},
			TypeKind::Matrix { column, columns } => {
				let stride = self.round_up(self.layout(types, *column).alignment);
				TypeLayout {
					alignment: stride,
					size: stride * u32::from(*columns),
					matrix_stride: stride,
					array_stride: 0,
				}
			}
			TypeKind::Array { element, size } => {
				let element = self.layout(types, *element);
				let alignment = self.round_up(element.alignment);
				let stride = align_to(element.size, alignment);
				let count = match size {
					ArraySize::Fixed(n) => *n,
					ArraySize::Unsized => 0,
				};
				let size = match count {
					0 => 0,
					_ => stride.checked_mul(count).unwrap_or(u32::MAX),
				};
				TypeLayout {
					alignment,
					size,
					matrix_stride: element.matrix_stride,
					array_stride: stride,
				}
			}
			TypeKind::Struct { fields, .. } => {
				let placements = self.place_fields(types, fields);
				let alignment = self.round_up(
					placements
						.iter()
						.map(|p| p.layout.alignment)
						.max()
						.unwrap_or(4),
				);
				let end = match placements.last() {
					Some(p) if p.error == Some(OffsetError::Overflow) => u32::MAX,
					Some(p) => p.offset.saturating_add(p.layout.size),
					None => 0,
				};
				TypeLayout {
					alignment,
					size: align_to(end, alignment),
					..Default::default()
				}
			}
			_ => TypeLayout::default(),
		}
	}

	pub fn alignment(self, types: &Types, ty: TypeHandle) -> u32 {
		self.layout(types, ty).alignment
	}

	pub fn size(self, types: &Types, ty: TypeHandle) -> u32 {
		self.layout(types, ty).size
	}

	/// Returns the element stride of an array type.
	pub fn stride(self, types: &Types, ty: TypeHandle) -> u32 {
		self.layout(types, ty).array_stride
	}

	/// Places the fields of a struct in declaration order.
	///
	/// A field without an explicit `offset` goes at the next offset rounded up to its alignment. An explicit
	/// offset must be at least the next offset and aligned; it is used even when it is not, and the placement
	/// records why it is wrong.
	///
	/// The first field which ends past 4 GiB is marked with [`OffsetError::Overflow`], unless its explicit offset
	/// is already wrong; the fields after it are placed at `u32::MAX` without an error of their own.
	pub fn place_fields(self, types: &Types, fields: &[Field]) -> Vec<FieldPlacement> {
		let mut offset = 0;
		let mut overflowed = false;
		let mut placements = Vec::with_capacity(fields.len());
		for field in fields {
			if overflowed {
				placements.push(FieldPlacement {
					offset: u32::MAX,
					layout: self.layout(types, field.ty),
					error: None,
				});
				continue;
			}
			let mut layout = self.layout(types, field.ty);
			if let Some(align) = field.modifiers.layout.align {
				if align.is_power_of_two() {
					layout.alignment = layout.alignment.max(align);
				}
			}
			let mut error = None;
			match field.modifiers.layout.offset {
				Some(explicit) => {
					if explicit < offset {
						error = Some(OffsetError::TooSmall { minimum: offset });
					} else if explicit & (layout.alignment - 1) != 0 {
						error = Some(OffsetError::Misaligned {
							alignment: layout.alignment,
						});
					}
					offset = explicit;
				}
				None => offset = align_to(offset, layout.alignment),
			}
			let end = offset
				.checked_add(layout.size)
				.filter(|_| !layout.overflows() && offset != u32::MAX);
			match end {
				Some(end) => {
					placements.push(FieldPlacement {
						offset,
						layout,
						error,
					});
					offset = end;
				}
				None => {
					overflowed = true;
					placements.push(FieldPlacement {
						offset,
						layout,
						error: error.or(Some(OffsetError::Overflow)),
					});
				}
			}
		}
		placements
	}
}

/// Reorders loose uniforms to minimise padding: a stable sort by descending alignment.
///
/// Items of equal alignment keep their declaration order, so the result only depends on the input sequence.
pub fn reorder_uniforms<T>(items: &mut [T], alignment: impl Fn(&T) -> u32) {
	items.sort_by_key(|item| Reverse(alignment(item)));
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{modifiers::Modifiers, Span};

	fn field(name: &str, ty: TypeHandle) -> Field {
		Field {
			name: name.into(),
			ty,
			modifiers: Modifiers::default(),
			span: Span::default(),
		}
	}

	#[test]
	fn array_strides() {
		let mut types = Types::new();
		let float = types.builtin().float;
		let array = types.array_of(float, ArraySize::Fixed(3));
		assert_eq!(MemoryLayout::Std430.stride(&types, array), 4);
		assert_eq!(MemoryLayout::Std140.stride(&types, array), 16);
		assert_eq!(MemoryLayout::Std140.size(&types, array), 48);
		let unsized_ = types.array_of(float, ArraySize::Unsized);
		assert_eq!(MemoryLayout::Std430.size(&types, unsized_), 0);
	}

	#[test]
	fn std140_vec3_then_vec4() {
		let types = Types::new();
		let b = types.builtin();
		let fields = [field("a", b.float3), field("b", b.float4)];
		let offsets = MemoryLayout::Std140
			.place_fields(&types, &fields)
			.iter()
			.map(|p| p.offset)
			.collect::<Vec<_>>();
		assert_eq!(offsets, [0, 16]);
	}

	#[test]
	fn vec3_is_followed_by_a_scalar() {
		let types = Types::new();
		let b = types.builtin();
		let fields = [field("a", b.float3), field("b", b.float)];
		let placements = MemoryLayout::Std430.place_fields(&types, &fields);
		assert_eq!(placements[1].offset, 12);
	}

	#[test]
	fn matrices() {
		let types = Types::new();
		let b = types.builtin();
		let m = types.matrix(b.float, 3, 2).unwrap();
		assert_eq!(MemoryLayout::Std430.layout(&types, m).matrix_stride, 8);
		assert_eq!(MemoryLayout::Std140.layout(&types, m).matrix_stride, 16);
		assert_eq!(MemoryLayout::Std430.size(&types, b.float3x3), 48);
	}

	#[test]
	fn explicit_offsets() {
		let types = Types::new();
		let b = types.builtin();
		let mut fields = [field("a", b.float4), field("b", b.float4)];
		fields[1].modifiers.layout.offset = Some(8);
		let placements = MemoryLayout::Std430.place_fields(&types, &fields);
		assert_eq!(
			placements[1].error,
			Some(OffsetError::TooSmall { minimum: 16 })
		);
		fields[1].modifiers.layout.offset = Some(20);
		let placements = MemoryLayout::Std430.place_fields(&types, &fields);
		assert_eq!(
			placements[1].error,
			Some(OffsetError::Misaligned { alignment: 16 })
		);
		fields[1].modifiers.layout.offset = Some(32);
		let placements = MemoryLayout::Std430.place_fields(&types, &fields);
		assert_eq!(placements[1].error, None);
		assert_eq!(placements[1].offset, 32);
	}

	#[test]
	fn sizes_saturate_past_four_gigabytes() {
		let mut types = Types::new();
		let float4 = types.builtin().float4;
		let huge = types.array_of(float4, ArraySize::Fixed(2_000_000_000));
		let layout = MemoryLayout::Std140.layout(&types, huge);
		assert!(layout.overflows());
		assert_eq!(layout.array_stride, 16);
		let nested = types.array_of(huge, ArraySize::Unsized);
		assert!(MemoryLayout::Std430.layout(&types, nested).overflows());
		assert_eq!(align_to(u32::MAX - 2, 16), u32::MAX);
		assert_eq!(align_to(0xFFFF_FFE1, 16), 0xFFFF_FFF0);

		let b = types.builtin();
		let fields = [field("a", huge), field("b", b.float)];
		let placements = MemoryLayout::Std140.place_fields(&types, &fields);
		assert_eq!(placements[0].error, Some(OffsetError::Overflow));
		assert_eq!(placements[1].error, None);
		assert_eq!(placements[1].offset, u32::MAX);
	}

	#[test]
	fn explicit_offsets_near_the_limit() {
		let types = Types::new();
		let b = types.builtin();
		let mut fields = [field("a", b.float), field("b", b.float4)];
		fields[1].modifiers.layout.offset = Some(0xFFFF_FFF0);
		let placements = MemoryLayout::Std430.place_fields(&types, &fields);
		assert_eq!(placements[1].error, Some(OffsetError::Overflow));
		assert_eq!(placements[1].offset, 0xFFFF_FFF0);

		// A misplaced offset is reported as such, even though the field would not fit either.
		fields[1].modifiers.layout.offset = Some(0xFFFF_FFFC);
		let placements = MemoryLayout::Std430.place_fields(&types, &fields);
		assert_eq!(
			placements[1].error,
			Some(OffsetError::Misaligned { alignment: 16 })
		);

		fields[1].modifiers.layout.offset = Some(0xFFFF_FFE0);
		let placements = MemoryLayout::Std430.place_fields(&types, &fields);
		assert_eq!(placements[1].error, None);
	}

	#[test]
	fn booleans_are_not_supported() {
		let types = Types::new();
		let b = types.builtin();
		assert!(!MemoryLayout::Std140.is_supported(&types, b.bool2));
		assert!(MemoryLayout::Std140.is_supported(&types, b.half4));
	}

	#[test]
	fn reorder_is_stable() {
		let mut items = [("a", 4), ("b", 16), ("c", 8), ("d", 16), ("e", 4)];
		reorder_uniforms(&mut items, |(_, align)| *align);
		let names = items.iter().map(|(n, _)| *n).collect::<Vec<_>>();
		assert_eq!(names, ["b", "d", "c", "a", "e"]);
	}
}
