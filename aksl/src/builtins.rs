//! The builtin module: every builtin type, the GLSL spelling aliases, and the signatures of the intrinsic
//! functions.
//!
//! The module is built once per process on first use and is immutable afterwards. Every compilation layers its own
//! declarations on top of it (see [`Arena::with_base()`](crate::arena::Arena::with_base)), so builtin handles are
//! identical across compilations and can be compared directly.

use crate::{
	arena::Handle,
	ast::{FunctionDecl, Intrinsic, Parameter},
	modifiers::Modifiers,
	symbols::Symbol,
	types::{Scalar, ScalarKind, Type, TypeHandle, TypeKind},
	Span,
};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Handles of the builtin types that the compiler refers to by name.
#[derive(Debug, Clone)]
pub struct BuiltinTypes {
	pub void: TypeHandle,
	pub bool: TypeHandle,
	pub int: TypeHandle,
	pub uint: TypeHandle,
	pub short: TypeHandle,
	pub ushort: TypeHandle,
	pub float: TypeHandle,
	pub half: TypeHandle,

	pub float2: TypeHandle,
	pub float3: TypeHandle,
	pub float4: TypeHandle,
	pub half2: TypeHandle,
	pub half3: TypeHandle,
	pub half4: TypeHandle,
	pub int2: TypeHandle,
	pub int3: TypeHandle,
	pub int4: TypeHandle,
	pub uint2: TypeHandle,
	pub uint3: TypeHandle,
	pub uint4: TypeHandle,
	pub bool2: TypeHandle,
	pub bool3: TypeHandle,
	pub bool4: TypeHandle,

	pub float2x2: TypeHandle,
	pub float3x3: TypeHandle,
	pub float4x4: TypeHandle,
	pub half2x2: TypeHandle,
	pub half3x3: TypeHandle,
	pub half4x4: TypeHandle,

	pub gen_ftype: TypeHandle,
	pub gen_htype: TypeHandle,
	pub gen_itype: TypeHandle,
	pub gen_utype: TypeHandle,
	pub gen_btype: TypeHandle,

	pub poison: TypeHandle,
	pub invalid: TypeHandle,
}

/// The frozen builtin module.
#[derive(Debug)]
pub struct Module {
	/// All builtin types; the base layer of every type arena.
	pub types: Vec<Type>,
	/// All builtin function signatures; the base layer of every function arena.
	pub functions: Vec<FunctionDecl>,
	/// The root scope: type names, aliases and function overload sets.
	pub scope: HashMap<String, Symbol>,
	pub ty: BuiltinTypes,
	vectors: HashMap<(TypeHandle, u8), TypeHandle>,
	matrices: HashMap<(TypeHandle, u8, u8), TypeHandle>,
}

impl Module {
	/// Returns the vector type with `size` components of type `component`.
	pub fn vector(&self, component: TypeHandle, size: u8) -> Option<TypeHandle> {
		self.vectors.get(&(component, size)).copied()
	}

	/// Returns the matrix type with the given component type and dimensions.
	pub fn matrix(
		&self,
		component: TypeHandle,
		columns: u8,
		rows: u8,
	) -> Option<TypeHandle> {
		self.matrices.get(&(component, columns, rows)).copied()
	}
}

/// Returns the builtin module, building it on first use.
pub fn module() -> &'static Module {
	static MODULE: OnceLock<Module> = OnceLock::new();
	MODULE.get_or_init(build)
}

struct Builder {
	types: Vec<Type>,
	functions: Vec<FunctionDecl>,
	scope: HashMap<String, Symbol>,
	vectors: HashMap<(TypeHandle, u8), TypeHandle>,
	matrices: HashMap<(TypeHandle, u8, u8), TypeHandle>,
}

impl Builder {
	fn push(&mut self, name: &str, kind: TypeKind) -> TypeHandle {
		let handle = Handle::new(self.types.len() as u32);
		self.types.push(Type {
			name: name.to_owned(),
			kind,
		});
		handle
	}

	/// Adds a type which can be named in source.
	fn named(&mut self, name: &str, kind: TypeKind) -> TypeHandle {
		let handle = self.push(name, kind);
		self.scope.insert(name.to_owned(), Symbol::Type(handle));
		handle
	}

	fn alias(&mut self, name: &str, ty: TypeHandle) {
		self.scope.insert(name.to_owned(), Symbol::Type(ty));
	}

	fn scalar(&mut self, name: &str, kind: ScalarKind, min_width: u8, rank: u8) -> TypeHandle {
		self.named(
			name,
			TypeKind::Scalar(Scalar {
				kind,
				width: 32,
				min_width,
				rank,
			}),
		)
	}

	/// Adds the 2, 3 and 4 component vectors of a scalar, plus the GLSL aliases if there is a prefix for them.
	fn vectors(&mut self, component: TypeHandle, alias_prefix: Option<&str>) -> [TypeHandle; 3] {
		let base = self.types[component.index()].name.clone();
		let mut out = [component; 3];
		for size in 2..=4u8 {
			let ty = self.named(
				&format!("{base}{size}"),
				TypeKind::Vector { component, size },
			);
			if let Some(prefix) = alias_prefix {
				self.alias(&format!("{prefix}{size}"), ty);
			}
			self.vectors.insert((component, size), ty);
			out[size as usize - 2] = ty;
		}
		out
	}

	/// Adds every matrix with a component type, and returns the square ones.
	fn matrices(&mut self, component: TypeHandle, glsl_aliases: bool) -> [TypeHandle; 3] {
		let base = self.types[component.index()].name.clone();
		let mut square = [component; 3];
		for columns in 2..=4u8 {
			for rows in 2..=4u8 {
				let column = self.vectors[&(component, rows)];
				let ty = self.named(
					&format!("{base}{columns}x{rows}"),
					TypeKind::Matrix { column, columns },
				);
				if glsl_aliases {
					self.alias(&format!("mat{columns}x{rows}"), ty);
					if columns == rows {
						self.alias(&format!("mat{columns}"), ty);
					}
				}
				if columns == rows {
					square[columns as usize - 2] = ty;
				}
				self.matrices.insert((component, columns, rows), ty);
			}
		}
		square
	}

	fn generic(&mut self, name: &str, scalar: TypeHandle) -> TypeHandle {
		let mut coercible = vec![scalar];
		coercible.extend((2..=4).map(|size| self.vectors[&(scalar, size)]));
		self.push(name, TypeKind::Generic { coercible })
	}

	fn function(
		&mut self,
		name: &str,
		intrinsic: Intrinsic,
		parameters: &[TypeHandle],
		return_type: TypeHandle,
	) {
		let handle = Handle::new(self.functions.len() as u32);
		self.functions.push(FunctionDecl {
			name: name.to_owned(),
			return_type,
			parameters: parameters
				.iter()
				.map(|ty| Parameter {
					ty: *ty,
					modifiers: Modifiers::default(),
				})
				.collect(),
			modifiers: Modifiers::default(),
			span: Span::default(),
			intrinsic: Some(intrinsic),
			defined: true,
			ordinal: 0,
		});
		match self.scope.get_mut(name) {
			Some(Symbol::Function(overloads)) => overloads.push(handle),
			_ => {
				self.scope
					.insert(name.to_owned(), Symbol::Function(vec![handle]));
			}
		}
	}
}

fn build() -> Module {
	let mut b = Builder {
		types: Vec::new(),
		functions: Vec::new(),
		scope: HashMap::new(),
		vectors: HashMap::new(),
		matrices: HashMap::new(),
	};

	let void = b.named("void", TypeKind::Void);
	let bool = b.named(
		"bool",
		TypeKind::Scalar(Scalar {
			kind: ScalarKind::Boolean,
			width: 32,
			min_width: 32,
			rank: 0,
		}),
	);
	let int = b.scalar("int", ScalarKind::Signed, 32, 4);
	let uint = b.scalar("uint", ScalarKind::Unsigned, 32, 3);
	let short = b.scalar("short", ScalarKind::Signed, 16, 2);
	let ushort = b.scalar("ushort", ScalarKind::Unsigned, 16, 1);
	let float = b.scalar("float", ScalarKind::Float, 32, 6);
	let half = b.scalar("half", ScalarKind::Float, 16, 5);

	let [float2, float3, float4] = b.vectors(float, Some("vec"));
	let [half2, half3, half4] = b.vectors(half, None);
	let [int2, int3, int4] = b.vectors(int, Some("ivec"));
	let [uint2, uint3, uint4] = b.vectors(uint, Some("uvec"));
	let [bool2, bool3, bool4] = b.vectors(bool, Some("bvec"));
	b.vectors(short, None);
	b.vectors(ushort, None);

	let [float2x2, float3x3, float4x4] = b.matrices(float, true);
	let [half2x2, half3x3, half4x4] = b.matrices(half, false);

	let gen_ftype = b.generic("__genFType", float);
	let gen_htype = b.generic("__genHType", half);
	let gen_itype = b.generic("__genIType", int);
	let gen_utype = b.generic("__genUType", uint);
	let gen_btype = b.generic("__genBType", bool);

	let poison = b.push("<poison>", TypeKind::Poison);
	let invalid = b.push("<invalid>", TypeKind::Invalid);

	use Intrinsic::*;
	// (generic, matching scalar, 3-vector) for each family of float-like types.
	let floats = [(gen_ftype, float, float3), (gen_htype, half, half3)];
	let numeric = [
		(gen_ftype, float),
		(gen_htype, half),
		(gen_itype, int),
		(gen_utype, uint),
	];

	for (g, _) in &numeric[..3] {
		b.function("abs", Abs, &[*g], *g);
		b.function("sign", Sign, &[*g], *g);
	}
	for (g, s, v3) in floats {
		for (name, intrinsic) in [
			("floor", Floor),
			("ceil", Ceil),
			("fract", Fract),
			("sqrt", Sqrt),
			("inversesqrt", InverseSqrt),
			("exp", Exp),
			("log", Log),
			("exp2", Exp2),
			("log2", Log2),
			("sin", Sin),
			("cos", Cos),
			("tan", Tan),
			("normalize", Normalize),
			("saturate", Saturate),
		] {
			b.function(name, intrinsic, &[g], g);
		}
		b.function("pow", Pow, &[g, g], g);
		b.function("mix", Mix, &[g, g, g], g);
		b.function("mix", Mix, &[g, g, s], g);
		b.function("step", Step, &[g, g], g);
		b.function("step", Step, &[s, g], g);
		b.function("smoothstep", SmoothStep, &[g, g, g], g);
		b.function("smoothstep", SmoothStep, &[s, s, g], g);
		b.function("length", Length, &[g], s);
		b.function("distance", Distance, &[g, g], s);
		b.function("dot", Dot, &[g, g], s);
		b.function("cross", Cross, &[v3, v3], v3);
		b.function("reflect", Reflect, &[g, g], g);
		b.function("fma", Fma, &[g, g, g], g);
	}
	for (g, s) in numeric {
		b.function("min", Min, &[g, g], g);
		b.function("min", Min, &[g, s], g);
		b.function("max", Max, &[g, g], g);
		b.function("max", Max, &[g, s], g);
		b.function("clamp", Clamp, &[g, g, g], g);
		b.function("clamp", Clamp, &[g, s, s], g);
	}

	let ty = BuiltinTypes {
		void,
		bool,
		int,
		uint,
		short,
		ushort,
		float,
		half,
		float2,
		float3,
		float4,
		half2,
		half3,
		half4,
		int2,
		int3,
		int4,
		uint2,
		uint3,
		uint4,
		bool2,
		bool3,
		bool4,
		float2x2,
		float3x3,
		float4x4,
		half2x2,
		half3x3,
		half4x4,
		gen_ftype,
		gen_htype,
		gen_itype,
		gen_utype,
		gen_btype,
		poison,
		invalid,
	};

	log::trace!(
		"Built the builtin module: {} types, {} functions.",
		b.types.len(),
		b.functions.len()
	);

	Module {
		types: b.types,
		functions: b.functions,
		scope: b.scope,
		ty,
		vectors: b.vectors,
		matrices: b.matrices,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aliases_resolve_to_the_same_type() {
		let m = module();
		let lookup = |name: &str| match m.scope.get(name) {
			Some(Symbol::Type(ty)) => *ty,
			other => panic!("{name} is {other:?}"),
		};
		assert_eq!(lookup("vec3"), m.ty.float3);
		assert_eq!(lookup("float3"), m.ty.float3);
		assert_eq!(lookup("ivec2"), m.ty.int2);
		assert_eq!(lookup("mat4"), m.ty.float4x4);
		assert_eq!(lookup("mat4x4"), m.ty.float4x4);
		assert_eq!(m.types[lookup("mat2x3").index()].name, "float2x3");
		assert!(m.scope.get("__genFType").is_none());
	}

	#[test]
	fn vectors_and_matrices() {
		let m = module();
		assert_eq!(m.vector(m.ty.half, 4), Some(m.ty.half4));
		assert_eq!(m.matrix(m.ty.float, 3, 3), Some(m.ty.float3x3));
		assert_eq!(m.matrix(m.ty.int, 2, 2), None);
		let mat = m.matrix(m.ty.float, 4, 2).unwrap();
		assert_eq!(
			m.types[mat.index()].kind,
			TypeKind::Matrix {
				column: m.ty.float2,
				columns: 4
			}
		);
	}

	#[test]
	fn overload_sets() {
		let m = module();
		let Some(Symbol::Function(clamp)) = m.scope.get("clamp") else {
			panic!("clamp is not a function");
		};
		assert_eq!(clamp.len(), 8);
		for f in clamp {
			assert_eq!(m.functions[f.index()].intrinsic, Some(Intrinsic::Clamp));
			assert_eq!(m.functions[f.index()].parameters.len(), 3);
		}
	}
}
