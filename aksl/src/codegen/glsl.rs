//! The GLSL generator.
//!
//! Output is produced in one pass over the program elements, in source order. The writer handles the two output
//! styles: pretty output indents by four spaces and puts whitespace around operators, while minified output drops
//! every character which is not needed to tokenize the result the same way.
//!
//! Parentheses are derived from operator precedence rather than copied from the source, so that parsing the
//! output again yields the same tree.

use super::CodeGenerator;
use crate::{
	ast::{
		precedence, ConstructorKind, Expression, ExpressionKind, FunctionHandle, Intrinsic, Literal, LoopKind,
		Operator, Precedence, ProgramElement, Statement, StatementKind, VariableHandle,
	},
	diag::{DiagKind, Diagnostics},
	error::CompileError,
	modifiers::{builtin, Flags, Layout, LayoutFlags, Modifiers},
	options::{GlslVersion, TargetApi},
	program::Program,
	types::{ArraySize, Field, ScalarKind, TypeHandle, TypeKind},
	Span,
};

/// Number of spaces to indent by.
const INDENT: usize = 4;

struct Writer {
	buffer: String,
	indent: usize,
	minify: bool,
}

impl Writer {
	/// Appends text. Two `+` or two `-` never end up adjacent, since that would read as `++` or `--`.
	fn write(&mut self, text: &str) {
		if let (Some(last), Some(first)) = (self.buffer.chars().next_back(), text.chars().next()) {
			if last == first && (first == '+' || first == '-') {
				self.buffer.push(' ');
			}
		}
		self.buffer.push_str(text);
	}

	/// Appends a space which is only there for readability.
	fn space(&mut self) {
		if !self.minify {
			self.buffer.push(' ');
		}
	}

	fn begin_line(&mut self) {
		if !self.minify {
			self.buffer
				.extend(std::iter::repeat(' ').take(self.indent * INDENT));
		}
	}

	fn end_line(&mut self) {
		if !self.minify {
			self.buffer.push('\n');
		}
	}

	fn indent(&mut self) {
		self.indent += 1;
	}

	fn de_indent(&mut self) {
		self.indent -= 1;
	}
}

/// Splits a GLSL type name into the base type and the array dimensions, e.g. `float[2][3]` into `float` and
/// `[2][3]`.
fn split_dimensions(name: &str) -> (&str, &str) {
	name.split_at(name.find('[').unwrap_or(name.len()))
}

/// Generates GLSL source text.
pub struct GlslCodeGenerator<'p> {
	program: &'p Program,
	api: TargetApi,
	version: GlslVersion,
	out: Writer,
	diagnostics: Diagnostics,
}

impl<'p> GlslCodeGenerator<'p> {
	pub fn new(program: &'p Program, api: TargetApi, version: GlslVersion) -> Self {
		Self {
			program,
			api,
			version,
			out: Writer {
				buffer: String::with_capacity(1_000),
				indent: 0,
				minify: program.options.minify_code,
			},
			diagnostics: Diagnostics::new(),
		}
	}

	fn error(&mut self, span: Span, message: impl Into<String>) {
		self.diagnostics.error(DiagKind::Semantic, span, message);
	}

	/* TYPES AND NAMES */

	/// Returns the GLSL spelling of a type. The relaxed-precision types are spelled as their full-width
	/// counterparts.
	fn type_name(&self, ty: TypeHandle) -> String {
		let types = &self.program.types;
		match &types[ty].kind {
			TypeKind::Void => "void".to_owned(),
			TypeKind::Scalar(scalar) => match scalar.kind {
				ScalarKind::Float => "float",
				ScalarKind::Signed => "int",
				ScalarKind::Unsigned => "uint",
				ScalarKind::Boolean => "bool",
			}
			.to_owned(),
			TypeKind::Vector { component, size } => {
				let prefix = match types.scalar(*component).map(|s| s.kind) {
					Some(ScalarKind::Signed) => "i",
					Some(ScalarKind::Unsigned) => "u",
					Some(ScalarKind::Boolean) => "b",
					_ => "",
				};
				format!("{prefix}vec{size}")
			}
			TypeKind::Matrix { column, columns } => {
				let rows = types.rows(*column);
				if rows == *columns {
					format!("mat{columns}")
				} else {
					format!("mat{columns}x{rows}")
				}
			}
			TypeKind::Array { element, size } => {
				let element = self.type_name(*element);
				let (base, dimensions) = split_dimensions(&element);
				match size {
					ArraySize::Fixed(n) => format!("{base}[{n}]{dimensions}"),
					ArraySize::Unsized => format!("{base}[]{dimensions}"),
				}
			}
			_ => types.name(ty).to_owned(),
		}
	}

	/// Returns the precision qualifier for a declaration of a type, including the trailing space.
	fn precision(&self, ty: TypeHandle) -> &'static str {
		let options = &self.program.options;
		if !options.use_precision_qualifiers {
			return "";
		}
		let types = &self.program.types;
		let mut ty = ty;
		while let Some((element, _)) = types.array(ty) {
			ty = element;
		}
		match types.scalar(ty) {
			Some(s) if s.kind == ScalarKind::Boolean => "",
			Some(s) if s.min_width < s.width && !options.force_high_precision => "mediump ",
			Some(_) => "highp ",
			None => "",
		}
	}

	fn function_name(&self, function: FunctionHandle) -> String {
		let decl = &self.program.functions[function];
		if decl.is_main() || decl.intrinsic.is_some() {
			decl.name.clone()
		} else {
			format!("_{}_{}", decl.name, decl.ordinal)
		}
	}

	/// Returns the GLSL name of a builtin, reporting builtins that GLSL has no name for.
	fn builtin_name(&mut self, id: u32, fallback: &str, span: Span) -> String {
		match builtin::glsl_name(id) {
			Some(name) => name.to_owned(),
			None => {
				self.error(span, format!("builtin {id} has no GLSL equivalent"));
				fallback.to_owned()
			}
		}
	}

	fn lower_fma(&self) -> bool {
		if self.version.is_es_profile() {
			self.version.number() < 320
		} else {
			self.version.number() < 400
		}
	}

	/* MODIFIERS AND DECLARATIONS */

	fn layout(&mut self, layout: &Layout) {
		let vulkan = self.api == TargetApi::Vulkan;
		let mut parts = Vec::new();
		for flag in [
			LayoutFlags::ORIGIN_UPPER_LEFT,
			LayoutFlags::PIXEL_CENTER_INTEGER,
			LayoutFlags::EARLY_FRAGMENT_TESTS,
			LayoutFlags::BLEND_SUPPORT_ALL_EQUATIONS,
			LayoutFlags::PUSH_CONSTANT,
			LayoutFlags::STD140,
			LayoutFlags::STD430,
		] {
			if layout.flags.contains(flag) && (vulkan || flag != LayoutFlags::PUSH_CONSTANT) {
				parts.push(flag.keyword().to_owned());
			}
		}
		let eq = if self.out.minify { "=" } else { " = " };
		for (name, value) in layout.integers() {
			match name {
				"builtin" => continue,
				"set" | "input_attachment_index" if !vulkan => continue,
				_ => parts.push(format!("{name}{eq}{value}")),
			}
		}
		if !parts.is_empty() {
			let separator = if self.out.minify { "," } else { ", " };
			self.out.write(&format!("layout({}) ", parts.join(separator)));
		}
	}

	/// Writes the modifiers of a declaration, each followed by a space.
	fn modifiers(&mut self, modifiers: &Modifiers, parameter: bool) {
		if !parameter {
			self.layout(&modifiers.layout);
		}
		let flags = modifiers.flags;
		for (flag, keyword) in [
			(Flags::FLAT, "flat "),
			(Flags::NO_PERSPECTIVE, "noperspective "),
			(Flags::SMOOTH, "smooth "),
			(Flags::COHERENT, "coherent "),
			(Flags::VOLATILE, "volatile "),
			(Flags::RESTRICT, "restrict "),
			(Flags::READONLY, "readonly "),
			(Flags::WRITEONLY, "writeonly "),
			(Flags::CONST, "const "),
		] {
			if flags.contains(flag) {
				self.out.write(keyword);
			}
		}
		if parameter {
			if flags.contains(Flags::IN | Flags::OUT) {
				self.out.write("inout ");
			} else if flags.contains(Flags::OUT) {
				self.out.write("out ");
			} else if flags.contains(Flags::IN) {
				self.out.write("in ");
			}
			return;
		}
		for (flag, keyword) in [
			(Flags::IN, "in "),
			(Flags::OUT, "out "),
			(Flags::UNIFORM, "uniform "),
			(Flags::BUFFER, "buffer "),
			(Flags::WORKGROUP, "shared "),
		] {
			if flags.contains(flag) {
				self.out.write(keyword);
			}
		}
	}

	/// Writes a declaration with one or more declarators, without the semicolon. The declarators share the
	/// modifiers and base type of the first one.
	fn declaration(&mut self, declarators: &[(VariableHandle, Option<&Expression>)]) {
		let program = self.program;
		let Some(&(first, _)) = declarators.first() else {
			return;
		};
		let first = &program.variables[first];
		self.modifiers(&first.modifiers, false);
		let type_name = self.type_name(first.ty);
		self.out.write(self.precision(first.ty));
		self.out.write(split_dimensions(&type_name).0);
		self.out.write(" ");
		for (i, (handle, initializer)) in declarators.iter().enumerate() {
			if i > 0 {
				self.out.write(",");
				self.out.space();
			}
			let variable = &program.variables[*handle];
			self.out.write(&variable.name);
			let type_name = self.type_name(variable.ty);
			self.out.write(split_dimensions(&type_name).1);
			if let Some(initializer) = initializer {
				self.out.space();
				self.out.write("=");
				self.out.space();
				self.expression(initializer, precedence::ASSIGNMENT);
			}
		}
	}

	/// Writes the fields of a struct or block, one per line. Builtin fields are skipped.
	fn fields(&mut self, fields: &[Field], block: bool) {
		for field in fields.iter().filter(|f| !f.modifiers.is_builtin()) {
			self.out.begin_line();
			if block {
				self.modifiers(&field.modifiers, false);
			}
			let type_name = self.type_name(field.ty);
			let (base, dimensions) = split_dimensions(&type_name);
			self.out.write(self.precision(field.ty));
			self.out.write(base);
			self.out.write(" ");
			self.out.write(&field.name);
			self.out.write(dimensions);
			self.out.write(";");
			self.out.end_line();
		}
	}

	fn signature(&mut self, function: FunctionHandle, names: Option<&[VariableHandle]>) {
		let program = self.program;
		let decl = &program.functions[function];
		self.out.write(self.precision(decl.return_type));
		self.out.write(&self.type_name(decl.return_type));
		self.out.write(" ");
		self.out.write(&self.function_name(function));
		self.out.write("(");
		for (i, parameter) in decl.parameters.iter().enumerate() {
			if i > 0 {
				self.out.write(",");
				self.out.space();
			}
			self.modifiers(&parameter.modifiers, true);
			let type_name = self.type_name(parameter.ty);
			let (base, dimensions) = split_dimensions(&type_name);
			self.out.write(self.precision(parameter.ty));
			self.out.write(base);
			let name = names
				.and_then(|names| names.get(i))
				.map_or("", |v| program.variables[*v].name.as_str());
			if !name.is_empty() {
				self.out.write(" ");
				self.out.write(name);
			}
			self.out.write(dimensions);
		}
		self.out.write(")");
	}

	/* ELEMENTS */

	fn element(&mut self, element: &ProgramElement) {
		let program = self.program;
		match element {
			ProgramElement::StructDefinition { ty, .. } => {
				self.out.begin_line();
				self.out.write("struct ");
				self.out.write(program.types.name(*ty));
				self.out.space();
				self.out.write("{");
				self.out.end_line();
				self.out.indent();
				self.fields(program.types.fields(*ty).unwrap_or_default(), false);
				self.out.de_indent();
				self.out.begin_line();
				self.out.write("};");
				self.out.end_line();
			}
			ProgramElement::InterfaceBlock { variable, .. } => {
				let variable = &program.variables[*variable];
				let mut block = variable.ty;
				while let Some((element, _)) = program.types.array(block) {
					block = element;
				}
				let fields = program.types.fields(block).unwrap_or_default();
				if fields.iter().all(|f| f.modifiers.is_builtin()) {
					return;
				}
				self.out.begin_line();
				self.modifiers(&variable.modifiers, false);
				self.out.write(program.types.name(block));
				self.out.space();
				self.out.write("{");
				self.out.end_line();
				self.out.indent();
				self.fields(fields, true);
				self.out.de_indent();
				self.out.begin_line();
				self.out.write("}");
				if !variable.name.is_empty() {
					self.out.write(" ");
					self.out.write(&variable.name);
					let type_name = self.type_name(variable.ty);
					self.out.write(split_dimensions(&type_name).1);
				}
				self.out.write(";");
				self.out.end_line();
			}
			ProgramElement::GlobalVariable {
				variable,
				initializer,
				..
			} => {
				if program.variables[*variable].modifiers.is_builtin() {
					return;
				}
				self.out.begin_line();
				self.declaration(&[(*variable, initializer.as_ref())]);
				self.out.write(";");
				self.out.end_line();
			}
			ProgramElement::FunctionPrototype { function, .. } => {
				self.out.begin_line();
				self.signature(*function, None);
				self.out.write(";");
				self.out.end_line();
			}
			ProgramElement::FunctionDefinition {
				function,
				parameters,
				body,
				..
			} => {
				self.out.begin_line();
				self.signature(*function, Some(parameters));
				self.out.space();
				match &body.kind {
					StatementKind::Block { statements, .. } => self.block(statements),
					_ => self.block(std::slice::from_ref(body)),
				}
				self.out.end_line();
			}
		}
	}

	/* STATEMENTS */

	/// Writes `{`, the statements, and `}`, leaving the line open after the closing brace.
	fn block(&mut self, statements: &[Statement]) {
		self.out.write("{");
		self.out.end_line();
		self.out.indent();
		for statement in statements {
			self.statement(statement);
		}
		self.out.de_indent();
		self.out.begin_line();
		self.out.write("}");
	}

	/// Writes the body of a control statement after its header.
	///
	/// Returns whether the line is still open, which is the case after a block.
	fn body(&mut self, body: &Statement) -> bool {
		match &body.kind {
			StatementKind::Block {
				statements,
				scoped: true,
			} => {
				self.out.space();
				self.block(statements);
				true
			}
			_ => {
				if self.out.minify {
					self.out.write(" ");
				}
				self.out.end_line();
				self.out.indent();
				self.statement(body);
				self.out.de_indent();
				false
			}
		}
	}

	/// Collects the declarators of a declaration statement, or returns `None` for any other statement.
	fn declarators(statement: &Statement) -> Option<Vec<(VariableHandle, Option<&Expression>)>> {
		match &statement.kind {
			StatementKind::VariableDecl {
				variable,
				initializer,
			} => Some(vec![(*variable, initializer.as_ref())]),
			StatementKind::Block {
				statements,
				scoped: false,
			} => statements
				.iter()
				.map(|s| match &s.kind {
					StatementKind::VariableDecl {
						variable,
						initializer,
					} => Some((*variable, initializer.as_ref())),
					_ => None,
				})
				.collect(),
			_ => None,
		}
	}

	fn statement(&mut self, statement: &Statement) {
		if let Some(declarators) = Self::declarators(statement) {
			self.out.begin_line();
			self.declaration(&declarators);
			self.out.write(";");
			self.out.end_line();
			return;
		}

		self.out.begin_line();
		match &statement.kind {
			StatementKind::Block {
				statements,
				scoped: true,
			} => {
				self.block(statements);
				self.out.end_line();
			}
			StatementKind::Block { statements, .. } => {
				self.out.end_line();
				for statement in statements {
					self.statement(statement);
				}
			}
			StatementKind::If {
				condition,
				when_true,
				when_false,
			} => self.if_chain(condition, when_true, when_false.as_deref()),
			StatementKind::For {
				kind,
				init,
				condition,
				step,
				body,
			} => self.loop_(*kind, init.as_deref(), condition.as_ref(), step.as_ref(), body),
			StatementKind::Switch { selector, cases } => {
				self.out.write("switch");
				self.out.space();
				self.out.write("(");
				self.expression(selector, precedence::EXPRESSION);
				self.out.write(")");
				self.out.space();
				self.out.write("{");
				self.out.end_line();
				self.out.indent();
				let unsigned = self
					.program
					.types
					.scalar(selector.ty)
					.map_or(false, |s| s.kind == ScalarKind::Unsigned);
				for case in cases {
					self.out.begin_line();
					match case.value {
						Some(v) if unsigned => self.out.write(&format!("case {}u:", v as u32)),
						Some(v) => self.out.write(&format!("case {}:", v as i32)),
						None => self.out.write("default:"),
					}
					self.out.end_line();
					self.out.indent();
					for statement in &case.statements {
						self.statement(statement);
					}
					self.out.de_indent();
				}
				self.out.de_indent();
				self.out.begin_line();
				self.out.write("}");
				self.out.end_line();
			}
			StatementKind::Return(value) => {
				self.out.write("return");
				if let Some(value) = value {
					self.out.write(" ");
					self.expression(value, precedence::EXPRESSION);
				}
				self.out.write(";");
				self.out.end_line();
			}
			StatementKind::Break => self.simple("break;"),
			StatementKind::Continue => self.simple("continue;"),
			StatementKind::Discard => self.simple("discard;"),
			StatementKind::Expression(expr) => {
				self.expression(expr, precedence::EXPRESSION);
				self.out.write(";");
				self.out.end_line();
			}
			StatementKind::Empty => self.simple(";"),
			StatementKind::VariableDecl { .. } => {}
		}
	}

	fn simple(&mut self, text: &str) {
		self.out.write(text);
		self.out.end_line();
	}

	/// Writes an `if` statement, chaining `else if` on one line. Closes the line.
	fn if_chain(&mut self, condition: &Expression, when_true: &Statement, when_false: Option<&Statement>) {
		self.out.write("if");
		self.out.space();
		self.out.write("(");
		self.expression(condition, precedence::EXPRESSION);
		self.out.write(")");
		let open = self.body(when_true);
		let Some(when_false) = when_false else {
			if open {
				self.out.end_line();
			}
			return;
		};
		if open {
			self.out.space();
		} else {
			self.out.begin_line();
		}
		self.out.write("else");
		if let StatementKind::If {
			condition,
			when_true,
			when_false,
		} = &when_false.kind
		{
			self.out.write(" ");
			self.if_chain(condition, when_true, when_false.as_deref());
		} else if self.body(when_false) {
			self.out.end_line();
		}
	}

	fn loop_(
		&mut self,
		kind: LoopKind,
		init: Option<&Statement>,
		condition: Option<&Expression>,
		step: Option<&Expression>,
		body: &Statement,
	) {
		match kind {
			LoopKind::For => {
				self.out.write("for");
				self.out.space();
				self.out.write("(");
				if let Some(init) = init {
					match (Self::declarators(init), &init.kind) {
						(Some(declarators), _) => self.declaration(&declarators),
						(None, StatementKind::Expression(expr)) => {
							self.expression(expr, precedence::EXPRESSION)
						}
						_ => {}
					}
				}
				self.out.write(";");
				if let Some(condition) = condition {
					self.out.space();
					self.expression(condition, precedence::EXPRESSION);
				}
				self.out.write(";");
				if let Some(step) = step {
					self.out.space();
					self.expression(step, precedence::EXPRESSION);
				}
				self.out.write(")");
				if self.body(body) {
					self.out.end_line();
				}
			}
			LoopKind::While => {
				self.out.write("while");
				self.out.space();
				self.out.write("(");
				if let Some(condition) = condition {
					self.expression(condition, precedence::EXPRESSION);
				}
				self.out.write(")");
				if self.body(body) {
					self.out.end_line();
				}
			}
			LoopKind::DoWhile => {
				self.out.write("do");
				if self.body(body) {
					self.out.space();
				} else {
					self.out.begin_line();
				}
				self.out.write("while");
				self.out.space();
				self.out.write("(");
				if let Some(condition) = condition {
					self.expression(condition, precedence::EXPRESSION);
				}
				self.out.write(");");
				self.out.end_line();
			}
		}
	}

	/* EXPRESSIONS */

	/// Returns the argument of a cast which GLSL does not need, i.e. between types with the same GLSL name.
	fn elided_cast<'e>(&self, expr: &'e Expression) -> Option<&'e Expression> {
		match &expr.kind {
			ExpressionKind::Constructor {
				kind: ConstructorKind::ScalarCast | ConstructorKind::CompoundCast,
				arguments,
			} if arguments.len() == 1 => {
				let argument = &arguments[0];
				(self.type_name(argument.ty) == self.type_name(expr.ty)).then_some(argument)
			}
			_ => None,
		}
	}

	fn lowers_to_parentheses(&self, function: FunctionHandle) -> bool {
		self.program.functions[function].intrinsic == Some(Intrinsic::Fma) && self.lower_fma()
	}

	/// Returns how tightly an expression binds as printed.
	fn precedence_of(&self, expr: &Expression) -> Precedence {
		match &expr.kind {
			ExpressionKind::Literal(Literal::Int(i)) if *i < 0 => precedence::PREFIX,
			ExpressionKind::Literal(Literal::Float(f)) if f.is_sign_negative() => precedence::PREFIX,
			ExpressionKind::Prefix { .. } => precedence::PREFIX,
			ExpressionKind::Postfix { .. }
			| ExpressionKind::Index { .. }
			| ExpressionKind::FieldAccess { .. }
			| ExpressionKind::Swizzle { .. } => precedence::POSTFIX,
			ExpressionKind::Binary { op, .. } => op.binary_precedence(),
			ExpressionKind::Conditional { .. } => precedence::CONDITIONAL,
			_ => precedence::PARENTHESES,
		}
	}

	fn arguments(&mut self, arguments: &[Expression]) {
		self.out.write("(");
		for (i, argument) in arguments.iter().enumerate() {
			if i > 0 {
				self.out.write(",");
				self.out.space();
			}
			self.expression(argument, precedence::ASSIGNMENT);
		}
		self.out.write(")");
	}

	/// Writes an expression, parenthesised if it binds more loosely than `allowed`.
	fn expression(&mut self, expr: &Expression, allowed: Precedence) {
		if let Some(argument) = self.elided_cast(expr) {
			return self.expression(argument, allowed);
		}
		let parenthesize = self.precedence_of(expr) > allowed;
		if parenthesize {
			self.out.write("(");
		}
		let program = self.program;
		match &expr.kind {
			ExpressionKind::Literal(value) => {
				let text = self.literal(*value, expr.ty);
				self.out.write(&text);
			}
			ExpressionKind::Prefix { op, operand } => {
				self.out.write(op.symbol());
				self.expression(operand, precedence::PREFIX);
			}
			ExpressionKind::Postfix { op, operand } => {
				self.expression(operand, precedence::POSTFIX);
				self.out.write(op.symbol());
			}
			ExpressionKind::Binary { left, op, right } => {
				let own = op.binary_precedence();
				let (left_allowed, right_allowed) = if op.is_assignment() {
					(own - 1, own)
				} else {
					(own, own - 1)
				};
				self.expression(left, left_allowed);
				if *op == Operator::Comma {
					self.out.write(",");
					self.out.space();
				} else {
					self.out.space();
					self.out.write(op.symbol());
					self.out.space();
				}
				self.expression(right, right_allowed);
			}
			ExpressionKind::Conditional {
				condition,
				when_true,
				when_false,
			} => {
				self.expression(condition, precedence::LOGICAL_OR);
				self.out.space();
				self.out.write("?");
				self.out.space();
				self.expression(when_true, precedence::SEQUENCE);
				self.out.space();
				self.out.write(":");
				self.out.space();
				self.expression(when_false, precedence::ASSIGNMENT);
			}
			ExpressionKind::VariableRef(handle) => {
				let variable = &program.variables[*handle];
				match variable.modifiers.layout.builtin {
					Some(id) => {
						let name = self.builtin_name(id, &variable.name, expr.span);
						self.out.write(&name);
					}
					None => self.out.write(&variable.name),
				}
			}
			ExpressionKind::Index { base, index } => {
				self.expression(base, precedence::POSTFIX);
				self.out.write("[");
				self.expression(index, precedence::EXPRESSION);
				self.out.write("]");
			}
			ExpressionKind::FieldAccess {
				base,
				field,
				anonymous_block,
			} => {
				let mut block = base.ty;
				while let Some((element, _)) = program.types.array(block) {
					block = element;
				}
				let Some(field) = program
					.types
					.fields(block)
					.and_then(|fields| fields.get(*field as usize))
				else {
					return;
				};
				if let Some(id) = field.modifiers.layout.builtin {
					let name = self.builtin_name(id, &field.name, expr.span);
					self.out.write(&name);
				} else {
					if !anonymous_block {
						self.expression(base, precedence::POSTFIX);
						self.out.write(".");
					}
					self.out.write(&field.name);
				}
			}
			ExpressionKind::Swizzle { base, components } => {
				self.expression(base, precedence::POSTFIX);
				self.out.write(".");
				let mask = components
					.iter()
					.map(|&c| ['x', 'y', 'z', 'w'][usize::from(c & 3)])
					.collect::<String>();
				self.out.write(&mask);
			}
			ExpressionKind::Constructor { arguments, .. } => {
				self.out.write(&self.type_name(expr.ty));
				self.arguments(arguments);
			}
			ExpressionKind::FunctionCall {
				function,
				arguments,
			} => self.call(*function, arguments),
			// A checked program never contains poison.
			ExpressionKind::Poison => self.out.write("0"),
		}
		if parenthesize {
			self.out.write(")");
		}
	}

	fn call(&mut self, function: FunctionHandle, arguments: &[Expression]) {
		let decl = &self.program.functions[function];
		match (decl.intrinsic, arguments) {
			(Some(Intrinsic::Saturate), [x]) => {
				self.out.write("clamp(");
				self.expression(x, precedence::ASSIGNMENT);
				self.out.write(",");
				self.out.space();
				self.out.write("0.0,");
				self.out.space();
				self.out.write("1.0)");
			}
			(Some(Intrinsic::Fma), [a, b, c]) if self.lowers_to_parentheses(function) => {
				self.out.write("((");
				self.expression(a, precedence::EXPRESSION);
				self.out.write(")");
				self.out.space();
				self.out.write("*");
				self.out.space();
				self.out.write("(");
				self.expression(b, precedence::EXPRESSION);
				self.out.write(")");
				self.out.space();
				self.out.write("+");
				self.out.space();
				self.out.write("(");
				self.expression(c, precedence::EXPRESSION);
				self.out.write("))");
			}
			_ => {
				self.out.write(&self.function_name(function));
				self.arguments(arguments);
			}
		}
	}

	fn literal(&self, value: Literal, ty: TypeHandle) -> String {
		match value {
			Literal::Bool(b) => b.to_string(),
			Literal::Int(i) => {
				let unsigned = self
					.program
					.types
					.scalar(ty)
					.map_or(false, |s| s.kind == ScalarKind::Unsigned);
				if unsigned {
					format!("{}u", i as u32)
				} else {
					(i as i32).to_string()
				}
			}
			Literal::Float(f) => format!("{f:?}"),
		}
	}
}

impl CodeGenerator for GlslCodeGenerator<'_> {
	type Output = String;

	fn generate(mut self) -> Result<String, CompileError> {
		let program = self.program;
		debug_assert!(
			program.entry_point().is_some() || !program.kind.requires_entry_point(),
			"generating code for a program which did not pass checking"
		);
		log::debug!(
			"Generating {} for {:?} ({} elements)",
			self.version.directive(),
			self.api,
			program.elements.len()
		);

		self.out.buffer.push_str(&self.version.directive());
		self.out.buffer.push('\n');
		if self.version.is_es_profile() && program.options.use_precision_qualifiers {
			self.out.write("precision mediump float;");
			self.out.end_line();
		}
		for element in &program.elements {
			self.element(element);
		}
		if !self.out.buffer.ends_with('\n') {
			self.out.buffer.push('\n');
		}

		if self.diagnostics.has_errors() {
			return Err(CompileError::Failed(self.diagnostics));
		}
		log::debug!("Generated {} bytes of GLSL", self.out.buffer.len());
		Ok(self.out.buffer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		context::Context,
		options::{CompileOptions, ShaderKind},
		parser::Parser,
	};

	fn generate(
		kind: ShaderKind,
		source: &str,
		options: CompileOptions,
		api: TargetApi,
		version: GlslVersion,
	) -> String {
		let program = Parser::new(Context::new(kind, options), source)
			.parse()
			.unwrap();
		GlslCodeGenerator::new(&program, api, version)
			.generate()
			.unwrap()
	}

	fn glsl(kind: ShaderKind, source: &str) -> String {
		generate(
			kind,
			source,
			CompileOptions::default(),
			TargetApi::OpenGl,
			GlslVersion::V450,
		)
	}

	#[test]
	fn pretty_output() {
		let output = glsl(
			ShaderKind::Vertex,
			"void main() { float a = 1.0; if (a > 0.5) { a = 0.0; } else a += 1.0; }",
		);
		assert_eq!(
			output,
			"#version 450
void main() {
    float a = 1.0;
    if (a > 0.5) {
        a = 0.0;
    } else
        a += 1.0;
}
"
		);
	}

	#[test]
	fn minified_output() {
		let options = CompileOptions {
			minify_code: true,
			..Default::default()
		};
		let output = generate(
			ShaderKind::Vertex,
			"void main() { float a = 1.0; float b = a - -a; }",
			options,
			TargetApi::OpenGl,
			GlslVersion::V450,
		);
		assert_eq!(output, "#version 450\nvoid main(){float a=1.0;float b=a- -a;}\n");
	}

	#[test]
	fn user_functions_are_mangled() {
		let output = glsl(
			ShaderKind::Vertex,
			"float f(float x) { return x; }
			float f(int x) { return 1.0; }
			void main() { float a = f(1.0) + f(2); }",
		);
		assert!(output.contains("float _f_0(float x) {"));
		assert!(output.contains("float _f_1(int x) {"));
		assert!(output.contains("float a = _f_0(1.0) + _f_1(2);"));
		assert!(output.contains("void main() {"));
	}

	#[test]
	fn parentheses_follow_precedence() {
		let output = glsl(
			ShaderKind::Vertex,
			"void main() { float a = 1.0; float b = (a + 2.0) * a; float c = a - (a - a); float d = (a - a) - a; }",
		);
		assert!(output.contains("float b = (a + 2.0) * a;"));
		assert!(output.contains("float c = a - (a - a);"));
		assert!(output.contains("float d = a - a - a;"));
	}

	#[test]
	fn type_names() {
		let output = glsl(
			ShaderKind::Vertex,
			"void main() { half3 h = half3(1.0); ushort u = ushort(3); float3x2 m = float3x2(1.0); int i[2] = int[2](1, 2); }",
		);
		assert!(output.contains("vec3 h = vec3(1.0);"));
		assert!(output.contains("uint u = 3u;"));
		assert!(output.contains("mat3x2 m = mat3x2(1.0);"));
		assert!(output.contains("int i[2] = int[2](1, 2);"));
	}

	#[test]
	fn same_name_casts_are_elided() {
		let output = glsl(
			ShaderKind::Vertex,
			"void main() { half h = 1.0; float f = h; int i = int(f); }",
		);
		assert!(output.contains("float f = h;"));
		assert!(output.contains("int i = int(f);"));
	}

	#[test]
	fn intrinsic_lowering() {
		let source = "void main() { float a = 0.5; float b = saturate(a); float c = fma(a, b, a); }";
		let old = generate(
			ShaderKind::Vertex,
			source,
			CompileOptions::default(),
			TargetApi::OpenGl,
			GlslVersion::V330,
		);
		assert!(old.contains("float b = clamp(a, 0.0, 1.0);"));
		assert!(old.contains("float c = ((a) * (b) + (a));"));
		let new = glsl(ShaderKind::Vertex, source);
		assert!(new.contains("float c = fma(a, b, a);"));
	}

	#[test]
	fn builtins_use_glsl_names() {
		let output = glsl(
			ShaderKind::Vertex,
			"layout(builtin = 0) out float4 sk_Position;
			void main() { sk_Position = float4(0.0); }",
		);
		assert!(!output.contains("sk_Position"));
		assert!(output.contains("gl_Position = vec4(0.0);"));

		let output = glsl(
			ShaderKind::Vertex,
			"out PerVertex { layout(builtin = 0) float4 position; };
			void main() { position = float4(1.0); }",
		);
		assert!(!output.contains("PerVertex"));
		assert!(output.contains("gl_Position = vec4(1.0);"));
	}

	#[test]
	fn layouts_depend_on_the_api() {
		let source = "layout(set = 1, binding = 2) uniform Globals { float4 tint; };
			void main() { float4 t = tint; }";
		let vulkan = generate(
			ShaderKind::Fragment,
			source,
			CompileOptions::default(),
			TargetApi::Vulkan,
			GlslVersion::V450,
		);
		assert!(vulkan.contains("layout(binding = 2, set = 1) uniform Globals {\n    vec4 tint;\n};"));
		let opengl = glsl(ShaderKind::Fragment, source);
		assert!(opengl.contains("layout(binding = 2) uniform Globals {"));
	}

	#[test]
	fn precision_qualifiers() {
		let options = CompileOptions {
			use_precision_qualifiers: true,
			..Default::default()
		};
		let output = generate(
			ShaderKind::Fragment,
			"void main() { half h = 1.0; float f = 2.0; bool b = true; }",
			options.clone(),
			TargetApi::OpenGlEs,
			GlslVersion::V300Es,
		);
		assert!(output.starts_with("#version 300 es\nprecision mediump float;\n"));
		assert!(output.contains("mediump float h = 1.0;"));
		assert!(output.contains("highp float f = 2.0;"));
		assert!(output.contains("    bool b = true;"));

		let forced = generate(
			ShaderKind::Fragment,
			"void main() { half h = 1.0; }",
			CompileOptions {
				force_high_precision: true,
				..options
			},
			TargetApi::OpenGlEs,
			GlslVersion::V300Es,
		);
		assert!(forced.contains("highp float h = 1.0;"));
	}

	#[test]
	fn control_flow() {
		let output = glsl(
			ShaderKind::Fragment,
			"void main() {
				int n = 0;
				for (int i = 0, j = 1; i < 4; i++) { n += j; }
				while (n > 0) n--;
				do { n++; } while (n < 2);
				switch (n) { case 1: n = 2; break; default: break; }
			}",
		);
		assert!(output.contains("    for (int i = 0, j = 1; i < 4; i++) {\n        n += j;\n    }\n"));
		assert!(output.contains("    while (n > 0)\n        n--;\n"));
		assert!(output.contains("    do {\n        n++;\n    } while (n < 2);\n"));
		assert!(output.contains(
			"    switch (n) {\n        case 1:\n            n = 2;\n            break;\n        default:\n            break;\n    }\n"
		));
	}
}
