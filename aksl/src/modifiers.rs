//! Declaration modifiers: qualifier keywords and `layout(...)` qualifiers.

use crate::Span;
use bitflags::bitflags;

bitflags! {
	/// Qualifier keywords.
	#[derive(Default)]
	pub struct Flags: u32 {
		const CONST = 1 << 0;
		const UNIFORM = 1 << 1;
		const IN = 1 << 2;
		const OUT = 1 << 3;
		const FLAT = 1 << 4;
		const NO_PERSPECTIVE = 1 << 5;
		const SMOOTH = 1 << 6;
		const COHERENT = 1 << 7;
		const VOLATILE = 1 << 8;
		const RESTRICT = 1 << 9;
		const READONLY = 1 << 10;
		const WRITEONLY = 1 << 11;
		const BUFFER = 1 << 12;
		const WORKGROUP = 1 << 13;
		const PURE = 1 << 14;
		const INLINE = 1 << 15;
		const NOINLINE = 1 << 16;
		const EXPORT = 1 << 17;

		const INTERPOLATION = Self::FLAT.bits | Self::NO_PERSPECTIVE.bits | Self::SMOOTH.bits;
		const MEMORY = Self::COHERENT.bits | Self::VOLATILE.bits | Self::RESTRICT.bits | Self::READONLY.bits
			| Self::WRITEONLY.bits;
		const STORAGE = Self::UNIFORM.bits | Self::IN.bits | Self::OUT.bits | Self::BUFFER.bits
			| Self::WORKGROUP.bits;
		const FUNCTION = Self::PURE.bits | Self::INLINE.bits | Self::NOINLINE.bits | Self::EXPORT.bits;
	}
}

bitflags! {
	/// Boolean `layout(...)` qualifiers.
	#[derive(Default)]
	pub struct LayoutFlags: u32 {
		const ORIGIN_UPPER_LEFT = 1 << 0;
		const PIXEL_CENTER_INTEGER = 1 << 1;
		const EARLY_FRAGMENT_TESTS = 1 << 2;
		const BLEND_SUPPORT_ALL_EQUATIONS = 1 << 3;
		const PUSH_CONSTANT = 1 << 4;
		const STD140 = 1 << 5;
		const STD430 = 1 << 6;
	}
}

impl Flags {
	/// Returns the keyword of a single flag.
	pub fn keyword(self) -> &'static str {
		match self {
			Flags::CONST => "const",
			Flags::UNIFORM => "uniform",
			Flags::IN => "in",
			Flags::OUT => "out",
			Flags::FLAT => "flat",
			Flags::NO_PERSPECTIVE => "noperspective",
			Flags::SMOOTH => "smooth",
			Flags::COHERENT => "coherent",
			Flags::VOLATILE => "volatile",
			Flags::RESTRICT => "restrict",
			Flags::READONLY => "readonly",
			Flags::WRITEONLY => "writeonly",
			Flags::BUFFER => "buffer",
			Flags::WORKGROUP => "workgroup",
			Flags::PURE => "pure",
			Flags::INLINE => "inline",
			Flags::NOINLINE => "noinline",
			Flags::EXPORT => "export",
			_ => "<flags>",
		}
	}

	/// Iterates over the single flags set, lowest bit first.
	pub fn each(self) -> impl Iterator<Item = Flags> {
		(0..u32::BITS)
			.map(|i| Flags::from_bits_truncate(1 << i))
			.filter(move |f| !f.is_empty() && self.contains(*f))
	}
}

impl LayoutFlags {
	/// Returns the layout key of a single flag.
	pub fn keyword(self) -> &'static str {
		match self {
			LayoutFlags::ORIGIN_UPPER_LEFT => "origin_upper_left",
			LayoutFlags::PIXEL_CENTER_INTEGER => "pixel_center_integer",
			LayoutFlags::EARLY_FRAGMENT_TESTS => "early_fragment_tests",
			LayoutFlags::BLEND_SUPPORT_ALL_EQUATIONS => {
				"blend_support_all_equations"
			}
			LayoutFlags::PUSH_CONSTANT => "push_constant",
			LayoutFlags::STD140 => "std140",
			LayoutFlags::STD430 => "std430",
			_ => "<layout>",
		}
	}
}

/// The `layout(...)` qualifier record.
///
/// # Invariants
/// A layout produced by the parser never combines `binding`, `set` or `input_attachment_index` with
/// `push_constant`; the offending key is reported and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Layout {
	pub flags: LayoutFlags,
	pub location: Option<u32>,
	pub component: Option<u32>,
	pub index: Option<u32>,
	pub binding: Option<u32>,
	pub offset: Option<u32>,
	pub align: Option<u32>,
	pub set: Option<u32>,
	pub input_attachment_index: Option<u32>,
	pub builtin: Option<u32>,
}

impl Layout {
	/// Returns whether no qualifier at all is set.
	pub fn is_empty(&self) -> bool {
		*self == Layout::default()
	}

	/// Returns the named integer qualifiers which are set, in a fixed order.
	pub fn integers(&self) -> impl Iterator<Item = (&'static str, u32)> {
		[
			("location", self.location),
			("component", self.component),
			("index", self.index),
			("binding", self.binding),
			("offset", self.offset),
			("align", self.align),
			("set", self.set),
			("input_attachment_index", self.input_attachment_index),
			("builtin", self.builtin),
		]
		.into_iter()
		.filter_map(|(name, value)| value.map(|v| (name, v)))
	}
}

/// The modifiers in front of a declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
	pub flags: Flags,
	pub layout: Layout,
	/// The span of the modifier list; zero-width in front of the declaration if there are none.
	pub span: Span,
}

impl Modifiers {
	pub fn new(span: Span) -> Self {
		Self {
			flags: Flags::empty(),
			layout: Layout::default(),
			span,
		}
	}

	pub fn is_const(&self) -> bool {
		self.flags.contains(Flags::CONST)
	}

	/// Returns whether this declares a builtin variable or field.
	pub fn is_builtin(&self) -> bool {
		self.layout.builtin.is_some()
	}
}

/// The values of `layout(builtin = N)` understood by the code generators.
pub mod builtin {
	pub const POSITION: u32 = 0;
	pub const POINT_SIZE: u32 = 1;
	pub const VERTEX_ID: u32 = 5;
	pub const INSTANCE_ID: u32 = 6;
	pub const FRAG_COORD: u32 = 15;
	pub const FRONT_FACING: u32 = 17;
	pub const FRAG_DEPTH: u32 = 22;
	pub const VERTEX_INDEX: u32 = 42;
	pub const INSTANCE_INDEX: u32 = 43;

	/// Returns the GLSL name of a builtin.
	pub fn glsl_name(builtin: u32) -> Option<&'static str> {
		let name = match builtin {
			POSITION => "gl_Position",
			POINT_SIZE => "gl_PointSize",
			VERTEX_ID => "gl_VertexID",
			INSTANCE_ID => "gl_InstanceID",
			FRAG_COORD => "gl_FragCoord",
			FRONT_FACING => "gl_FrontFacing",
			FRAG_DEPTH => "gl_FragDepth",
			VERTEX_INDEX => "gl_VertexIndex",
			INSTANCE_INDEX => "gl_InstanceIndex",
			_ => return None,
		};
		Some(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn each_flag() {
		let flags = Flags::CONST | Flags::IN | Flags::OUT;
		let keywords = flags.each().map(Flags::keyword).collect::<Vec<_>>();
		assert_eq!(keywords, ["const", "in", "out"]);
	}

	#[test]
	fn layout_integers() {
		let layout = Layout {
			binding: Some(2),
			set: Some(1),
			..Default::default()
		};
		assert_eq!(
			layout.integers().collect::<Vec<_>>(),
			[("binding", 2), ("set", 1)]
		);
		assert!(!layout.is_empty());
		assert!(Layout::default().is_empty());
	}
}
