//! The scoped symbol table.

use crate::{
	ast::{FunctionHandle, VariableHandle},
	builtins,
	types::TypeHandle,
};
use std::collections::HashMap;

/// A named entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
	Type(TypeHandle),
	Variable(VariableHandle),
	/// An overload set; always contains at least one function.
	Function(Vec<FunctionHandle>),
	/// A field of an anonymous interface block, which is visible at global scope by its own name.
	Field { block: VariableHandle, field: u32 },
}

/// Inserting a name which is already bound in the current scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("symbol '{name}' was already defined")]
pub struct DuplicateSymbol {
	pub name: String,
}

/// A stack of scopes over the frozen builtin scope.
///
/// # Invariants
/// There is always at least one user scope: the global scope of the program. It is pushed on construction and is
/// never popped.
#[derive(Debug, Clone)]
pub struct SymbolTable {
	builtin: &'static HashMap<String, Symbol>,
	scopes: Vec<HashMap<String, Symbol>>,
}

impl Default for SymbolTable {
	fn default() -> Self {
		Self::new()
	}
}

impl SymbolTable {
	pub fn new() -> Self {
		Self {
			builtin: &builtins::module().scope,
			scopes: vec![HashMap::new()],
		}
	}

	/// Pushes a child scope.
	pub fn enter_scope(&mut self) {
		self.scopes.push(HashMap::new());
	}

	/// Pops the innermost scope.
	pub fn leave_scope(&mut self) {
		debug_assert!(self.scopes.len() > 1, "attempted to leave the global scope");
		if self.scopes.len() > 1 {
			self.scopes.pop();
		}
	}

	/// Returns the nesting depth; `0` is the global scope.
	pub fn depth(&self) -> usize {
		self.scopes.len() - 1
	}

	pub fn is_global_scope(&self) -> bool {
		self.scopes.len() == 1
	}

	/// Binds a name in the current scope.
	///
	/// Shadowing a name of an outer scope (including a builtin) is allowed. Inserting a function into a name that
	/// holds an overload set in the current scope extends the set; a global function which overloads a builtin
	/// function starts with a copy of the builtin overloads so that both stay callable.
	pub fn insert(&mut self, name: &str, symbol: Symbol) -> Result<(), DuplicateSymbol> {
		let global = self.scopes.len() == 1;
		let builtin = self.builtin;
		let Some(scope) = self.scopes.last_mut() else {
			return Ok(());
		};
		if let Some(existing) = scope.get_mut(name) {
			return match (existing, symbol) {
				(Symbol::Function(existing), Symbol::Function(new)) => {
					existing.extend(new);
					Ok(())
				}
				_ => Err(DuplicateSymbol {
					name: name.to_owned(),
				}),
			};
		}

		let symbol = match symbol {
			Symbol::Function(new) => {
				let mut overloads = match builtin.get(name) {
					Some(Symbol::Function(builtins)) if global => builtins.clone(),
					_ => Vec::new(),
				};
				overloads.extend(new);
				Symbol::Function(overloads)
			}
			symbol => symbol,
		};
		scope.insert(name.to_owned(), symbol);
		Ok(())
	}

	/// Looks a name up, innermost scope first, then the builtin scope.
	pub fn find(&self, name: &str) -> Option<&Symbol> {
		self.scopes
			.iter()
			.rev()
			.find_map(|scope| scope.get(name))
			.or_else(|| self.builtin.get(name))
	}

	/// Returns whether the name currently resolves to a type.
	pub fn is_type(&self, name: &str) -> bool {
		matches!(self.find(name), Some(Symbol::Type(_)))
	}

	/// Returns whether the name is a builtin type name. Constant time, independent of scoping.
	pub fn is_builtin_type(&self, name: &str) -> bool {
		matches!(self.builtin.get(name), Some(Symbol::Type(_)))
	}

	/// Returns the type a name resolves to.
	pub fn find_type(&self, name: &str) -> Option<TypeHandle> {
		match self.find(name) {
			Some(Symbol::Type(ty)) => Some(*ty),
			_ => None,
		}
	}

	/// Returns whether a name is bound in the current scope itself, ignoring outer scopes.
	pub fn is_in_current_scope(&self, name: &str) -> bool {
		self.scopes
			.last()
			.map_or(false, |scope| scope.contains_key(name))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::arena::Handle;

	#[test]
	fn shadowing_and_duplicates() {
		let mut table = SymbolTable::new();
		let a = Symbol::Variable(Handle::new(0));
		let b = Symbol::Variable(Handle::new(1));
		table.insert("x", a.clone()).unwrap();
		assert_eq!(
			table.insert("x", b.clone()),
			Err(DuplicateSymbol { name: "x".into() })
		);

		table.enter_scope();
		table.insert("x", b.clone()).unwrap();
		assert_eq!(table.find("x"), Some(&b));
		table.leave_scope();
		assert_eq!(table.find("x"), Some(&a));
		assert_eq!(table.find("y"), None);
	}

	#[test]
	fn builtin_types() {
		let mut table = SymbolTable::new();
		assert!(table.is_type("float3"));
		assert!(table.is_builtin_type("vec4"));
		assert!(!table.is_type("x"));

		// A local variable may shadow a builtin type name.
		table.enter_scope();
		table.insert("float3", Symbol::Variable(Handle::new(0))).unwrap();
		assert!(!table.is_type("float3"));
		assert!(table.is_builtin_type("float3"));
		table.leave_scope();
		assert!(table.is_type("float3"));
	}

	#[test]
	fn overloading_a_builtin_keeps_it_callable() {
		let mut table = SymbolTable::new();
		let builtin_count = match table.find("abs") {
			Some(Symbol::Function(f)) => f.len(),
			other => panic!("{other:?}"),
		};
		let user = Handle::new(10_000);
		table.insert("abs", Symbol::Function(vec![user])).unwrap();
		let Some(Symbol::Function(f)) = table.find("abs") else {
			panic!("abs is not a function");
		};
		assert_eq!(f.len(), builtin_count + 1);
		assert_eq!(f.last(), Some(&user));
	}

	#[test]
	#[should_panic(expected = "attempted to leave the global scope")]
	#[cfg(debug_assertions)]
	fn leaving_global_scope_asserts() {
		SymbolTable::new().leave_scope();
	}
}
