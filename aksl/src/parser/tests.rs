//! Behaviour tests for the [`Parser`].
//!
//! Most tests parse a complete program and compare the list of diagnostic messages; an empty list means the
//! program was accepted.

use super::Parser;
use crate::{
	ast::{Literal, ProgramElement, StatementKind},
	context::Context,
	diag::DiagKind,
	options::{CompileOptions, ShaderKind},
	program::Program,
	span::span,
	symbols::Symbol,
	Diagnostics,
};

fn parse(kind: ShaderKind, source: &str) -> Result<Program, Diagnostics> {
	Parser::new(Context::new(kind, CompileOptions::default()), source).parse()
}

/// Returns the messages of all diagnostics, or an empty list if the program was accepted.
fn errors(kind: ShaderKind, source: &str) -> Vec<String> {
	match parse(kind, source) {
		Ok(_) => Vec::new(),
		Err(diagnostics) => diagnostics.iter().map(|d| d.message.clone()).collect(),
	}
}

fn constant(program: &Program, name: &str) -> Option<Literal> {
	match program.symbols.find(name) {
		Some(Symbol::Variable(v)) => program.variables[*v].constant_value,
		_ => None,
	}
}

macro_rules! assert_errors {
	($kind:expr, $src:expr, $($msg:expr),*) => {
		assert_eq!(errors($kind, $src), vec![$($msg.to_owned(),)*] as Vec<String>);
	};
}

#[test]
fn peek_does_not_consume() {
	let source = "a  b";
	let mut parser = Parser::new(Context::new(ShaderKind::Base, CompileOptions::default()), source);
	let first = parser.peek();
	assert_eq!(parser.peek(), first);
	assert_eq!(parser.next_token(), first);
	assert_eq!(parser.next_token().span(), span(3, 4));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "pushback slot")]
fn pushback_holds_one_token() {
	let source = "a b";
	let mut parser = Parser::new(Context::new(ShaderKind::Base, CompileOptions::default()), source);
	let a = parser.next_token();
	let b = parser.next_token();
	parser.push_back(b);
	parser.push_back(a);
}

#[test]
fn constants_are_folded() {
	let program = parse(
		ShaderKind::Base,
		"const int a = 2 + 3 * 4;
		const float b = 1.0 / 4.0;
		const bool c = a > 10 && !false;",
	)
	.unwrap();
	assert_eq!(constant(&program, "a"), Some(Literal::Int(14)));
	assert_eq!(constant(&program, "b"), Some(Literal::Float(0.25)));
	assert_eq!(constant(&program, "c"), Some(Literal::Bool(true)));
}

#[test]
fn constants_flow_into_later_expressions() {
	let program = parse(ShaderKind::Base, "const int a = 3; const int b = a * a;").unwrap();
	assert_eq!(constant(&program, "b"), Some(Literal::Int(9)));
}

#[test]
fn integer_literals() {
	let program = parse(
		ShaderKind::Base,
		"const int a = 0xFFFFFFFF; const uint b = 017u; const int c = -2147483648;",
	)
	.unwrap();
	assert_eq!(constant(&program, "a"), Some(Literal::Int(-1)));
	assert_eq!(constant(&program, "b"), Some(Literal::Int(15)));
	assert_eq!(constant(&program, "c"), Some(Literal::Int(-2147483648)));

	assert_errors!(
		ShaderKind::Base,
		"const uint big = 4294967296u;",
		"integer value is too large: 4294967296u"
	);
	assert_errors!(
		ShaderKind::Base,
		"const int bad = 09;",
		"invalid integer literal '09'"
	);
}

#[test]
fn division_by_constant_zero() {
	assert_errors!(ShaderKind::Base, "const int a = 1 / 0;", "division by zero");
}

#[test]
fn type_mismatch() {
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { int a = true; }",
		"expected 'int', but found 'bool'"
	);
}

#[test]
fn one_error_per_mistake() {
	// The unknown names poison their expressions; nothing derived from them is reported again.
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { float a = b + 1.0 * c; float d = a * b; }",
		"no symbol named 'b'",
		"no symbol named 'c'",
		"no symbol named 'b'"
	);
}

#[test]
fn syntax_errors_are_fatal() {
	let diagnostics = parse(
		ShaderKind::Vertex,
		"void main() { int a = ; }\nint b = true;",
	)
	.unwrap_err();
	assert_eq!(diagnostics.len(), 1);
	let diagnostic = diagnostics.iter().next().unwrap();
	assert_eq!(diagnostic.kind, DiagKind::Syntax);
	assert_eq!(diagnostic.message, "expected an expression, but found ';'");
	assert_eq!(diagnostic.span, span(22, 23));
}

#[test]
fn lexical_errors_are_not_fatal() {
	let diagnostics = parse(ShaderKind::Vertex, "void main() { int a = 1 @; }").unwrap_err();
	let kinds = diagnostics.iter().map(|d| d.kind).collect::<Vec<_>>();
	assert_eq!(kinds, [DiagKind::Lexical]);
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { int a = 1 @; int b = true; }",
		"invalid character '@'",
		"expected 'int', but found 'bool'"
	);
}

#[test]
fn reserved_words() {
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { int class = 1; }",
		"'class' is a reserved keyword"
	);
}

#[test]
fn entry_point() {
	assert_errors!(
		ShaderKind::Vertex,
		"float f() { return 1.0; }",
		"program does not contain a main() function"
	);
	assert_errors!(ShaderKind::Base, "float f() { return 1.0; }",);
	assert_errors!(
		ShaderKind::Fragment,
		"int main() { return 0; }",
		"'main' must be declared as 'void main()'"
	);
}

#[test]
fn duplicate_symbols() {
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { int a; float a; }",
		"symbol 'a' was already defined"
	);
	// Shadowing in an inner scope is fine.
	assert_errors!(
		ShaderKind::Vertex,
		"int a; void main() { float a = 1.0; { bool a = true; } }",
	);
}

#[test]
fn overloads() {
	assert_errors!(
		ShaderKind::Vertex,
		"float f(float x) { return x; }
		int f(int x) { return x; }
		void main() { float a = f(1.0); int b = f(1); }",
	);
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { float x = dot(1.0, true); }",
		"no overload of 'dot' matches the arguments (float, bool)"
	);
	assert_errors!(
		ShaderKind::Base,
		"float f(float x) { return x; } int f(float x) { return 1; }",
		"functions 'f' differ only in return type"
	);
}

#[test]
fn prototypes() {
	assert_errors!(
		ShaderKind::Vertex,
		"float f(float x);
		void main() { float a = f(2.0); }
		float f(float x) { return x * 2.0; }",
	);
	assert_errors!(
		ShaderKind::Vertex,
		"float f(float x);
		void main() { float a = f(2.0); }",
		"function 'f' is not defined"
	);
	assert_errors!(
		ShaderKind::Base,
		"void f() {} void f() {}",
		"duplicate definition of 'f'"
	);
}

#[test]
fn function_ordinals_count_user_functions() {
	let program = parse(
		ShaderKind::Base,
		"void a(); void b() {} void a() {} float c(float x) { return x; }",
	)
	.unwrap();
	let ordinals = program
		.functions
		.iter_owned()
		.map(|(_, f)| (f.name.as_str(), f.ordinal))
		.collect::<Vec<_>>();
	assert_eq!(ordinals, [("a", 0), ("b", 1), ("c", 2)]);
}

#[test]
fn return_checks() {
	assert_errors!(
		ShaderKind::Base,
		"float f(float x) { if (x > 0.0) { return 1.0; } }",
		"function 'f' can exit without returning a value"
	);
	assert_errors!(
		ShaderKind::Base,
		"float f(float x) { if (x > 0.0) { return 1.0; } else { return 2.0; } }",
	);
	assert_errors!(
		ShaderKind::Base,
		"void f() { return 1; }",
		"may not return a value from a void function"
	);
}

#[test]
fn jump_statements() {
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { break; }",
		"break statement must be inside a loop or switch"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { int x = 0; switch (x) { case 0: continue; } }",
		"continue statement must be inside a loop"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { discard; }",
		"discard statement is only permitted in fragment shaders"
	);
	assert_errors!(
		ShaderKind::Fragment,
		"void main() { for (int i = 0; i < 4; i++) { if (i == 2) { continue; } discard; } }",
	);
}

#[test]
fn switch_cases() {
	assert_errors!(
		ShaderKind::Vertex,
		"void main() {
			int x = 1;
			switch (x) { case 1: break; case 1: break; default: break; default: break; }
		}",
		"duplicate case value '1'",
		"duplicate default case"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { float x = 1.0; switch (x) { default: break; } }",
		"expected 'int', but found 'float'"
	);
}

#[test]
fn loops_are_lowered() {
	let program = parse(
		ShaderKind::Base,
		"void f() { int i = 0; while (i < 3) { i++; } do { i--; } while (i > 0); }",
	)
	.unwrap();
	let Some(ProgramElement::FunctionDefinition { body, .. }) = program.elements.last() else {
		panic!("expected a function definition");
	};
	let StatementKind::Block { statements, .. } = &body.kind else {
		panic!("expected a block");
	};
	let loops = statements
		.iter()
		.filter_map(|s| match &s.kind {
			StatementKind::For { kind, init, step, .. } => {
				assert!(init.is_none() && step.is_none());
				Some(*kind)
			}
			_ => None,
		})
		.collect::<Vec<_>>();
	assert_eq!(
		loops,
		[crate::ast::LoopKind::While, crate::ast::LoopKind::DoWhile]
	);
}

#[test]
fn assignment_targets() {
	assert_errors!(
		ShaderKind::Vertex,
		"uniform float u; void main() { u = 1.0; }",
		"cannot modify uniform variable 'u'"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { float4 v = float4(1.0); v.xx = float2(0.0); }",
		"cannot write to the same swizzle field more than once"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"void main() { float4 v = float4(1.0); v.zx = float2(0.0); v.y += 1.0; }",
	);
}

#[test]
fn global_variable_rules() {
	assert_errors!(
		ShaderKind::Vertex,
		"const float c; void main() {}",
		"'const' variable 'c' must be initialized"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"uniform float u = 1.0; void main() {}",
		"'uniform' variables cannot be initialized"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"void v; void main() {}",
		"variable 'v' may not be of type 'void'"
	);
}

#[test]
fn structs() {
	assert_errors!(
		ShaderKind::Vertex,
		"struct Light { float3 position; float intensity; };
		void main() { Light l = Light(float3(0.0), 1.0); float i = l.intensity; }",
	);
	assert_errors!(
		ShaderKind::Base,
		"struct S { float a; int a; };",
		"field 'a' was already defined in the same struct 'S'"
	);
	assert_errors!(
		ShaderKind::Base,
		"struct S { float a; }; void f(S s) { float b = s.c; }",
		"type 'S' does not have a field named 'c'"
	);
}

#[test]
fn interface_blocks() {
	assert_errors!(
		ShaderKind::Fragment,
		"layout(binding = 0) uniform Globals { float4 color; float scale; };
		void main() { float4 c = color * scale; }",
	);
	assert_errors!(
		ShaderKind::Compute,
		"layout(binding = 1) buffer Data { int count; float values[]; } data;
		void main() { data.values[0] = float(data.count); }",
	);
	assert_errors!(
		ShaderKind::Compute,
		"buffer Data { float values[]; float after; }; void main() {}",
		"unsized array field 'values' is not permitted here"
	);
}

#[test]
fn layout_qualifiers() {
	assert_errors!(
		ShaderKind::Vertex,
		"layout(push_constant, binding = 1) uniform P { float x; }; void main() {}",
		"'binding' is not permitted with 'push_constant'"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"layout(location = 0, location = 1) in float4 p; void main() {}",
		"layout qualifier 'location' appears more than once"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"layout(colour = 2) in float4 p; void main() {}",
		"'colour' is not a valid layout qualifier"
	);
	assert_errors!(
		ShaderKind::Vertex,
		"uniform B { layout(align = 12) float x; layout(align = 16) float y; }; void main() {}",
		"alignment must be a power of two, but found 12"
	);
}

#[test]
fn push_constant_conflicts_point_at_the_key() {
	let diagnostics = parse(
		ShaderKind::Vertex,
		"layout(push_constant, binding = 1) uniform P { float x; }; void main() {}",
	)
	.unwrap_err();
	let diagnostic = diagnostics.iter().next().unwrap();
	assert_eq!(diagnostic.span, span(22, 29));
}

#[test]
fn multi_dimensional_arrays() {
	let program = parse(ShaderKind::Base, "float a[2][3];").unwrap();
	let Some(Symbol::Variable(a)) = program.symbols.find("a") else {
		panic!("expected a variable");
	};
	let ty = program.variables[*a].ty;
	assert_eq!(program.types.name(ty), "float[2][3]");
	assert_eq!(
		program.types.array(ty).map(|(_, size)| size),
		Some(crate::types::ArraySize::Fixed(2))
	);
}

#[test]
fn array_sizes() {
	assert_errors!(
		ShaderKind::Base,
		"const int n = 4; float a[n * 2];",
	);
	assert_errors!(ShaderKind::Base, "float a[0];", "array size must be positive");
	assert_errors!(
		ShaderKind::Base,
		"float n = 1.0; float a[n];",
		"array size must be an integer constant"
	);
}

#[test]
fn unsigned_arithmetic_keeps_its_type() {
	let program = parse(
		ShaderKind::Base,
		"uint f(uint u) { return u + 1; } half g(half h) { return h * 0.5; }",
	)
	.unwrap();
	let returns = program
		.elements
		.iter()
		.filter_map(|e| match e {
			ProgramElement::FunctionDefinition { body, .. } => match &body.kind {
				StatementKind::Block { statements, .. } => match &statements[0].kind {
					StatementKind::Return(Some(value)) => Some(program.types.name(value.ty).to_owned()),
					_ => None,
				},
				_ => None,
			},
			_ => None,
		})
		.collect::<Vec<_>>();
	assert_eq!(returns, ["uint", "half"]);
}
