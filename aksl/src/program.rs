//! The result of a successful parse.

use crate::{
	arena::Arena,
	ast::{FunctionDecl, FunctionHandle, ProgramElement, Variable, VariableHandle},
	context::Context,
	layout::{align_to, reorder_uniforms, MemoryLayout},
	modifiers::Flags,
	options::{CompileOptions, ShaderKind},
	symbols::SymbolTable,
	types::{TypeHandle, Types},
};

/// A parsed and checked program.
///
/// # Invariants
/// The program was produced without any error; every expression has a resolved type and every handle points into
/// the arenas stored here. A program is immutable once built.
#[derive(Debug, Clone)]
pub struct Program {
	pub kind: ShaderKind,
	pub options: CompileOptions,
	pub types: Types,
	pub variables: Arena<Variable>,
	pub functions: Arena<FunctionDecl>,
	/// The global scope as it was at the end of the source.
	pub symbols: SymbolTable,
	/// The top-level elements in source order.
	pub elements: Vec<ProgramElement>,
}

/// A loose uniform variable, placed as it would be in a default uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UniformInfo {
	pub name: String,
	pub type_name: String,
	pub offset: u32,
	pub size: u32,
	pub alignment: u32,
}

impl Program {
	pub(crate) fn new(ctx: Context, elements: Vec<ProgramElement>) -> Self {
		Self {
			kind: ctx.kind,
			options: ctx.options,
			types: ctx.types,
			variables: ctx.variables,
			functions: ctx.functions,
			symbols: ctx.symbols,
			elements,
		}
	}

	/// Returns the definition of `void main()`, if there is one.
	pub fn entry_point(&self) -> Option<FunctionHandle> {
		self.elements.iter().find_map(|e| match e {
			ProgramElement::FunctionDefinition { function, .. }
				if self.functions[*function].is_main() =>
			{
				Some(*function)
			}
			_ => None,
		})
	}

	/// Iterates over the global variables outside of interface blocks, in declaration order.
	pub fn global_variables(&self) -> impl Iterator<Item = VariableHandle> + '_ {
		self.elements.iter().filter_map(|e| match e {
			ProgramElement::GlobalVariable { variable, .. } => Some(*variable),
			_ => None,
		})
	}

	/// Returns the loose `uniform` variables, reordered by descending alignment and placed one after the other
	/// under `layout`. Uniforms of a type that the layout cannot hold are skipped, and placement stops at the first
	/// uniform which would end past 4 GiB.
	pub fn uniforms(&self, layout: MemoryLayout) -> Vec<UniformInfo> {
		let mut uniforms: Vec<(VariableHandle, TypeHandle, u32, u32)> = self
			.global_variables()
			.filter_map(|handle| {
				let variable = &self.variables[handle];
				if !variable.modifiers.flags.contains(Flags::UNIFORM)
					|| !layout.is_supported(&self.types, variable.ty)
				{
					return None;
				}
				let metrics = layout.layout(&self.types, variable.ty);
				if metrics.overflows() {
					log::warn!("Uniform '{}' does not fit in a uniform block", variable.name);
					return None;
				}
				Some((handle, variable.ty, metrics.alignment, metrics.size))
			})
			.collect();
		reorder_uniforms(&mut uniforms, |(_, _, alignment, _)| *alignment);

		let mut offset = 0;
		uniforms
			.into_iter()
			.map_while(|(handle, ty, alignment, size)| {
				let start = align_to(offset, alignment);
				let Some(end) = start.checked_add(size).filter(|_| start != u32::MAX) else {
					log::warn!("Uniform '{}' ends past 4 GiB", self.variables[handle].name);
					return None;
				};
				offset = end;
				Some(UniformInfo {
					name: self.variables[handle].name.clone(),
					type_name: self.types.name(ty).to_owned(),
					offset: start,
					size,
					alignment,
				})
			})
			.collect()
	}
}
