//! The compilation context.

use crate::{
	arena::Arena,
	ast::{FunctionDecl, Variable},
	builtins,
	diag::{DiagKind, Diagnostics},
	options::{CompileOptions, ShaderKind},
	symbols::SymbolTable,
	types::Types,
	Span,
};

/// Everything one compilation needs, passed explicitly to each stage.
///
/// There is no global or thread-local compilation state: two contexts never share anything except the frozen
/// builtin module, so independent compilations can run concurrently on different threads.
#[derive(Debug, Clone)]
pub struct Context {
	pub options: CompileOptions,
	pub kind: ShaderKind,
	pub types: Types,
	pub variables: Arena<Variable>,
	pub functions: Arena<FunctionDecl>,
	pub symbols: SymbolTable,
	pub diagnostics: Diagnostics,
}

impl Context {
	pub fn new(kind: ShaderKind, options: CompileOptions) -> Self {
		Self {
			options,
			kind,
			types: Types::new(),
			variables: Arena::new(),
			functions: Arena::with_base(&builtins::module().functions),
			symbols: SymbolTable::new(),
			diagnostics: Diagnostics::new(),
		}
	}

	/// Records a semantic error.
	pub fn error(&mut self, span: Span, message: impl Into<String>) {
		self.diagnostics.error(DiagKind::Semantic, span, message);
	}

	pub fn has_errors(&self) -> bool {
		self.diagnostics.has_errors()
	}

	/// Returns the name of a type.
	pub fn type_name(&self, ty: crate::types::TypeHandle) -> &str {
		self.types.name(ty)
	}
}
