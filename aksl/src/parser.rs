//! The recursive-descent parser, which produces a checked [`Program`] directly from the token stream.
//!
//! Parsing and semantic analysis happen in a single pass: every expression node is built through the checked
//! constructors in [`convert`](self::convert), which resolve types, insert implicit conversions, and fold
//! constants on the spot. Semantic errors are recorded and parsing continues with a poison value in place of the
//! broken expression. A syntax error on the other hand is fatal; the parser stops at the first one.
//!
//! # Lookahead
//! The grammar is LL(1) once type names are known, so the parser keeps a single pushback slot. Peeking pulls the
//! next significant token and parks it in the slot; the next call to `next_token()` hands it back. The slot never
//! holds more than one token.

mod convert;
mod expression;
mod statement;
#[cfg(test)]
mod tests;

use crate::{
	ast::{
		Expression, ExpressionKind, FunctionDecl, FunctionHandle, Literal, Parameter, ProgramElement,
		Storage, Variable, VariableHandle,
	},
	context::Context,
	diag::{DiagKind, Diagnostics},
	fold,
	lexer::{Lexer, Token, TokenKind},
	modifiers::{Flags, Layout, LayoutFlags, Modifiers},
	program::Program,
	symbols::Symbol,
	types::{ArraySize, Field, TypeHandle, MAX_NESTING_DEPTH},
	Span,
};
use std::collections::{HashMap, HashSet};

/// The maximum depth of nested blocks and parenthesised expressions.
const MAX_DEPTH: u32 = 64;

/// Marker for a syntax error which has already been reported. Parsing unwinds to the top when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fatal;

pub(crate) type PResult<T> = Result<T, Fatal>;

/// The parser.
///
/// # Invariants
/// `pushback` holds at most one token. Every token handed out has passed through `next_token()`, so trivia,
/// invalid characters and reserved words never reach the grammar functions.
pub struct Parser<'a> {
	ctx: Context,
	source: &'a str,
	lexer: Lexer<'a>,
	pushback: Option<Token>,
	/// The end offset of the last token handed out.
	last_end: usize,
	elements: Vec<ProgramElement>,
	/// The function whose body is being parsed.
	current_function: Option<FunctionHandle>,
	loop_depth: u32,
	switch_depth: u32,
	depth: u32,
	next_ordinal: u32,
	/// Calls to user functions, to check that every called function has a body.
	called: Vec<(FunctionHandle, Span)>,
}

impl<'a> Parser<'a> {
	pub fn new(ctx: Context, source: &'a str) -> Self {
		Self {
			ctx,
			source,
			lexer: Lexer::new(source),
			pushback: None,
			last_end: 0,
			elements: Vec::new(),
			current_function: None,
			loop_depth: 0,
			switch_depth: 0,
			depth: 0,
			next_ordinal: 0,
			called: Vec::new(),
		}
	}

	/// Parses the whole source.
	///
	/// Returns the program if no error of any kind was reported, and all of the diagnostics otherwise.
	pub fn parse(mut self) -> Result<Program, Diagnostics> {
		log::debug!("Parsing {} bytes as a {:?} program", self.source.len(), self.ctx.kind);
		if self.program().is_ok() {
			self.check_entry_point();
			self.check_called_functions();
		}
		if self.ctx.has_errors() {
			log::debug!("Parsing failed with {} error(s)", self.ctx.diagnostics.error_count());
			return Err(self.ctx.diagnostics);
		}
		Ok(Program::new(self.ctx, self.elements))
	}

	/* TOKEN PLUMBING */

	/// Returns the next significant token.
	fn next_token(&mut self) -> Token {
		if let Some(token) = self.pushback.take() {
			self.last_end = token.span().end;
			return token;
		}
		loop {
			let mut token = self.lexer.next();
			match token.kind {
				kind if kind.is_trivia() => continue,
				TokenKind::Invalid => {
					let text = token.text(self.source);
					let message = if text.starts_with("/*") {
						"unterminated block comment".to_owned()
					} else {
						format!("invalid character '{text}'")
					};
					self.ctx
						.diagnostics
						.error(DiagKind::Lexical, token.span(), message);
				}
				TokenKind::Reserved => {
					let message = format!("'{}' is a reserved keyword", token.text(self.source));
					self.ctx.error(token.span(), message);
					token.kind = TokenKind::Identifier;
					self.last_end = token.span().end;
					return token;
				}
				_ => {
					self.last_end = token.span().end;
					return token;
				}
			}
		}
	}

	/// Puts a token back so that the next call to `next_token()` returns it.
	fn push_back(&mut self, token: Token) {
		debug_assert!(
			self.pushback.is_none(),
			"the pushback slot already holds a token"
		);
		self.pushback = Some(token);
	}

	/// Returns the next significant token without consuming it.
	fn peek(&mut self) -> Token {
		let token = self.next_token();
		self.push_back(token);
		token
	}

	/// Consumes the next token if it is of the given kind.
	fn check_next(&mut self, kind: TokenKind) -> Option<Token> {
		let token = self.next_token();
		if token.kind == kind {
			Some(token)
		} else {
			self.push_back(token);
			None
		}
	}

	fn text(&self, token: Token) -> &'a str {
		token.text(self.source)
	}

	/// Describes a token for an "expected X, but found Y" message.
	fn describe(&self, token: Token) -> String {
		match token.kind {
			TokenKind::EndOfFile => "end of file".to_owned(),
			_ => format!("'{}'", self.text(token)),
		}
	}

	/// Reports a syntax error at a token.
	fn syntax_error(&mut self, token: Token, expected: &str) -> Fatal {
		let message = format!("expected {expected}, but found {}", self.describe(token));
		self.ctx
			.diagnostics
			.error(DiagKind::Syntax, token.span(), message);
		Fatal
	}

	/// Consumes a token of the given kind, or reports a syntax error.
	fn expect(&mut self, kind: TokenKind, expected: &str) -> PResult<Token> {
		let token = self.next_token();
		if token.kind == kind {
			Ok(token)
		} else {
			Err(self.syntax_error(token, expected))
		}
	}

	fn expect_identifier(&mut self) -> PResult<(&'a str, Span)> {
		let token = self.expect(TokenKind::Identifier, "an identifier")?;
		Ok((self.text(token), token.span()))
	}

	/// Enters a nested block or parenthesised expression.
	fn enter_nesting(&mut self, token: Token) -> PResult<()> {
		self.depth += 1;
		if self.depth > MAX_DEPTH {
			self.ctx.diagnostics.error(
				DiagKind::Syntax,
				token.span(),
				"code is too deeply nested",
			);
			return Err(Fatal);
		}
		Ok(())
	}

	fn leave_nesting(&mut self) {
		self.depth -= 1;
	}

	/* DECLARATIONS */

	fn program(&mut self) -> PResult<()> {
		loop {
			let token = self.peek();
			match token.kind {
				TokenKind::EndOfFile => return Ok(()),
				TokenKind::Semicolon => {
					self.next_token();
				}
				_ => self.global_declaration()?,
			}
		}
	}

	fn global_declaration(&mut self) -> PResult<()> {
		let start = self.peek().span().start;
		let modifiers = self.modifiers()?;
		let token = self.peek();
		match token.kind {
			TokenKind::Struct => self.struct_declaration(start, modifiers),
			TokenKind::Identifier if !self.ctx.symbols.is_type(self.text(token)) => {
				self.next_token();
				let next = self.peek();
				if next.kind == TokenKind::LBrace {
					self.interface_block(start, modifiers, token)
				} else {
					Err(self.syntax_error(token, "a type"))
				}
			}
			_ => {
				let ty = self.type_()?;
				let (name, name_span) = self.expect_identifier()?;
				if self.peek().kind == TokenKind::LParen {
					self.function(start, modifiers, ty, name, name_span)
				} else {
					self.global_variables(start, modifiers, ty, name, name_span)
				}
			}
		}
	}

	/// Parses a possibly empty list of qualifier keywords and `layout(...)` qualifiers.
	fn modifiers(&mut self) -> PResult<Modifiers> {
		let start = self.peek().span().start;
		let mut modifiers = Modifiers::new(Span::new_zero_width(start));
		let mut end = start;
		loop {
			let token = self.next_token();
			let flag = match token.kind {
				TokenKind::Layout => {
					self.layout(&mut modifiers.layout)?;
					end = self.last_end;
					continue;
				}
				TokenKind::Const => Flags::CONST,
				TokenKind::Uniform => Flags::UNIFORM,
				TokenKind::In => Flags::IN,
				TokenKind::Out => Flags::OUT,
				TokenKind::InOut => Flags::IN | Flags::OUT,
				TokenKind::Flat => Flags::FLAT,
				TokenKind::NoPerspective => Flags::NO_PERSPECTIVE,
				TokenKind::Smooth => Flags::SMOOTH,
				TokenKind::Coherent => Flags::COHERENT,
				TokenKind::Volatile => Flags::VOLATILE,
				TokenKind::Restrict => Flags::RESTRICT,
				TokenKind::ReadOnly => Flags::READONLY,
				TokenKind::WriteOnly => Flags::WRITEONLY,
				TokenKind::Buffer => Flags::BUFFER,
				TokenKind::Workgroup => Flags::WORKGROUP,
				TokenKind::Pure => Flags::PURE,
				TokenKind::Inline => Flags::INLINE,
				TokenKind::NoInline => Flags::NOINLINE,
				TokenKind::Export => Flags::EXPORT,
				_ => {
					self.push_back(token);
					break;
				}
			};
			if modifiers.flags.intersects(flag) {
				let message = format!("'{}' was specified more than once", self.text(token));
				self.ctx.error(token.span(), message);
			}
			modifiers.flags |= flag;
			end = token.span().end;
		}
		modifiers.span = Span::new(start, end);
		Ok(modifiers)
	}

	/// Parses the parenthesised part of a `layout(...)` qualifier into `layout`.
	fn layout(&mut self, layout: &mut Layout) -> PResult<()> {
		self.expect(TokenKind::LParen, "'('")?;
		let mut seen = HashMap::new();
		loop {
			let (key, key_span) = self.expect_identifier()?;
			let value = if self.check_next(TokenKind::Eq).is_some() {
				let token = self.expect(TokenKind::IntLiteral, "an integer")?;
				match parse_int(self.text(token)) {
					Some((value, _)) if value <= u64::from(u32::MAX) => {
						if key == "align" && !value.is_power_of_two() {
							let message = format!("alignment must be a power of two, but found {value}");
							self.ctx.error(token.span(), message);
						}
						Some(value as u32)
					}
					_ => {
						let message = format!("invalid layout value '{}'", self.text(token));
						self.ctx.error(token.span(), message);
						Some(0)
					}
				}
			} else {
				None
			};

			if seen.insert(key, key_span).is_some() {
				self.ctx
					.error(key_span, format!("layout qualifier '{key}' appears more than once"));
			}
			let flag = match key {
				"origin_upper_left" => Some(LayoutFlags::ORIGIN_UPPER_LEFT),
				"pixel_center_integer" => Some(LayoutFlags::PIXEL_CENTER_INTEGER),
				"early_fragment_tests" => Some(LayoutFlags::EARLY_FRAGMENT_TESTS),
				"blend_support_all_equations" => Some(LayoutFlags::BLEND_SUPPORT_ALL_EQUATIONS),
				"push_constant" => Some(LayoutFlags::PUSH_CONSTANT),
				"std140" => Some(LayoutFlags::STD140),
				"std430" => Some(LayoutFlags::STD430),
				_ => None,
			};
			if let Some(flag) = flag {
				if value.is_some() {
					self.ctx
						.error(key_span, format!("layout qualifier '{key}' does not take a value"));
				}
				layout.flags |= flag;
			} else {
				let slot = match key {
					"location" => Some(&mut layout.location),
					"component" => Some(&mut layout.component),
					"index" => Some(&mut layout.index),
					"binding" => Some(&mut layout.binding),
					"offset" => Some(&mut layout.offset),
					"align" => Some(&mut layout.align),
					"set" => Some(&mut layout.set),
					"input_attachment_index" => Some(&mut layout.input_attachment_index),
					"builtin" => Some(&mut layout.builtin),
					_ => None,
				};
				match (slot, value) {
					(Some(slot), Some(value)) => *slot = Some(value),
					(Some(_), None) => self
						.ctx
						.error(key_span, format!("layout qualifier '{key}' requires a value")),
					(None, _) => self
						.ctx
						.error(key_span, format!("'{key}' is not a valid layout qualifier")),
				}
			}

			let token = self.next_token();
			match token.kind {
				TokenKind::Comma => continue,
				TokenKind::RParen => break,
				_ => return Err(self.syntax_error(token, "',' or ')'")),
			}
		}

		if layout.flags.contains(LayoutFlags::PUSH_CONSTANT) {
			for (name, slot) in [
				("binding", &mut layout.binding),
				("set", &mut layout.set),
				("input_attachment_index", &mut layout.input_attachment_index),
			] {
				if slot.take().is_some() {
					let span = seen
						.get(name)
						.copied()
						.unwrap_or_else(|| Span::new_zero_width(self.last_end));
					self.ctx
						.error(span, format!("'{name}' is not permitted with 'push_constant'"));
				}
			}
		}
		Ok(())
	}

	/// Parses a type name with optional array suffixes.
	fn type_(&mut self) -> PResult<TypeHandle> {
		let token = self.next_token();
		let ty = match token.kind {
			TokenKind::Identifier => self.ctx.symbols.find_type(self.text(token)),
			_ => None,
		};
		match ty {
			Some(ty) => self.array_suffixes(ty, token.span()),
			None => Err(self.syntax_error(token, "a type")),
		}
	}

	/// Parses any number of `[size]` or `[]` suffixes and wraps `ty` in them. `float a[2][3]` is two arrays of
	/// three floats, so the innermost suffix is applied first.
	fn array_suffixes(&mut self, ty: TypeHandle, span: Span) -> PResult<TypeHandle> {
		let mut sizes = Vec::new();
		while let Some(open) = self.check_next(TokenKind::LBracket) {
			let size = if self.check_next(TokenKind::RBracket).is_some() {
				ArraySize::Unsized
			} else {
				let expr = self.expression()?;
				self.expect(TokenKind::RBracket, "']'")?;
				self.array_size(&expr)
			};
			sizes.push((size, Span::new(open.span().start, self.last_end)));
		}

		let mut ty = ty;
		for (size, suffix) in sizes.into_iter().rev() {
			if self.ctx.types.is_void(ty) {
				self.ctx
					.error(suffix, "type 'void' may not be used in an array");
				return Ok(self.ctx.types.builtin().poison);
			}
			if self.ctx.types.is_unsized_array(ty) {
				self.ctx
					.error(suffix, "only the outermost array dimension may be unsized");
			}
			ty = self.ctx.types.array_of(ty, size);
			if self.ctx.types.nesting_depth(ty) > MAX_NESTING_DEPTH {
				let message = format!("type '{}' is too deeply nested", self.ctx.type_name(ty));
				self.ctx.error(Span::cover(span, suffix), message);
			}
		}
		Ok(ty)
	}

	fn array_size(&mut self, expr: &Expression) -> ArraySize {
		if expr.is_poison() {
			return ArraySize::Fixed(1);
		}
		match fold::get_constant_int(expr) {
			Some(n) if n > 0 && n <= i64::from(i32::MAX) => ArraySize::Fixed(n as u32),
			Some(_) => {
				self.ctx.error(expr.span, "array size must be positive");
				ArraySize::Fixed(1)
			}
			None => {
				self.ctx
					.error(expr.span, "array size must be an integer constant");
				ArraySize::Fixed(1)
			}
		}
	}

	/// `struct S { fields };`, optionally followed by variable declarators.
	fn struct_declaration(&mut self, start: usize, modifiers: Modifiers) -> PResult<()> {
		self.expect(TokenKind::Struct, "'struct'")?;
		let (name, name_span) = self.expect_identifier()?;
		self.expect(TokenKind::LBrace, "'{'")?;
		let fields = self.fields(name, false)?;
		if fields.is_empty() {
			self.ctx
				.error(name_span, format!("struct '{name}' must contain at least one field"));
		}

		let ty = self.ctx.types.add_struct(name.to_owned(), fields, false);
		if self.ctx.types.nesting_depth(ty) > MAX_NESTING_DEPTH {
			self.ctx
				.error(name_span, format!("struct '{name}' is too deeply nested"));
		}
		if let Err(e) = self.ctx.symbols.insert(name, Symbol::Type(ty)) {
			self.ctx.error(name_span, e.to_string());
		}
		self.elements.push(ProgramElement::StructDefinition {
			ty,
			span: Span::new(start, self.last_end),
		});

		if self.peek().kind == TokenKind::Identifier {
			let (name, name_span) = self.expect_identifier()?;
			return self.global_variables(start, modifiers, ty, name, name_span);
		}
		if !modifiers.flags.is_empty() || !modifiers.layout.is_empty() {
			self.ctx
				.error(modifiers.span, "modifiers are not permitted on a struct declaration");
		}
		self.expect(TokenKind::Semicolon, "';'")?;
		Ok(())
	}

	/// Parses struct or block fields up to and including the closing brace.
	///
	/// Only the last field of a `buffer` block may be an unsized array, and only when the kind of program allows
	/// unsized arrays at all.
	fn fields(&mut self, owner: &str, buffer: bool) -> PResult<Vec<Field>> {
		let mut fields: Vec<Field> = Vec::new();
		while self.check_next(TokenKind::RBrace).is_none() {
			let modifiers = self.modifiers()?;
			let base = self.type_()?;
			loop {
				let (name, name_span) = self.expect_identifier()?;
				let ty = self.array_suffixes(base, name_span)?;
				if self.ctx.types.is_void(ty) {
					self.ctx
						.error(name_span, format!("field '{name}' may not be of type 'void'"));
				}
				if fields.iter().any(|f| f.name == name) {
					let message = format!("field '{name}' was already defined in the same struct '{owner}'");
					self.ctx.error(name_span, message);
				}
				fields.push(Field {
					name: name.to_owned(),
					ty,
					modifiers,
					span: name_span,
				});
				if self.check_next(TokenKind::Comma).is_none() {
					break;
				}
			}
			self.expect(TokenKind::Semicolon, "';'")?;
		}

		let last = fields.len().saturating_sub(1);
		for (i, field) in fields.iter().enumerate() {
			if !self.ctx.types.contains_unsized_array(field.ty) {
				continue;
			}
			let allowed = buffer
				&& i == last
				&& self.ctx.types.is_unsized_array(field.ty)
				&& self.ctx.kind.allows_unsized_arrays();
			if !allowed {
				let message = format!("unsized array field '{}' is not permitted here", field.name);
				self.ctx.error(field.span, message);
			}
		}
		Ok(fields)
	}

	/// `uniform Name { fields } instance;` where the instance name is optional.
	fn interface_block(&mut self, start: usize, modifiers: Modifiers, name_token: Token) -> PResult<()> {
		let name = self.text(name_token);
		let storage = modifiers.flags & (Flags::UNIFORM | Flags::IN | Flags::OUT | Flags::BUFFER);
		if storage.bits().count_ones() != 1 {
			let message = format!("interface block '{name}' must be exactly one of 'uniform', 'in', 'out' or 'buffer'");
			self.ctx.error(name_token.span(), message);
		}
		self.expect(TokenKind::LBrace, "'{'")?;
		let fields = self.fields(name, storage == Flags::BUFFER)?;
		if fields.is_empty() {
			self.ctx.error(
				name_token.span(),
				format!("interface block '{name}' must contain at least one field"),
			);
		}
		let field_names = fields.iter().map(|f| (f.name.clone(), f.span)).collect::<Vec<_>>();
		let ty = self.ctx.types.add_struct(name.to_owned(), fields, true);

		let instance = if self.peek().kind == TokenKind::Identifier {
			let (instance, instance_span) = self.expect_identifier()?;
			let ty = self.array_suffixes(ty, instance_span)?;
			Some((instance, instance_span, ty))
		} else {
			None
		};
		self.expect(TokenKind::Semicolon, "';'")?;

		let (variable_name, variable_span, variable_ty) =
			instance.unwrap_or(("", name_token.span(), ty));
		let variable = self.ctx.variables.append(Variable {
			name: variable_name.to_owned(),
			ty: variable_ty,
			modifiers,
			storage: Storage::InterfaceBlock,
			span: variable_span,
			constant_value: None,
		});
		if instance.is_some() {
			if let Err(e) = self.ctx.symbols.insert(variable_name, Symbol::Variable(variable)) {
				self.ctx.error(variable_span, e.to_string());
			}
		} else {
			for (i, (field, span)) in field_names.iter().enumerate() {
				let symbol = Symbol::Field {
					block: variable,
					field: i as u32,
				};
				if let Err(e) = self.ctx.symbols.insert(field, symbol) {
					self.ctx.error(*span, e.to_string());
				}
			}
		}
		self.elements.push(ProgramElement::InterfaceBlock {
			variable,
			span: Span::new(start, self.last_end),
		});
		Ok(())
	}

	/// A function prototype or definition, starting at the opening parenthesis of the parameter list.
	fn function(
		&mut self,
		start: usize,
		modifiers: Modifiers,
		return_type: TypeHandle,
		name: &'a str,
		name_span: Span,
	) -> PResult<()> {
		self.expect(TokenKind::LParen, "'('")?;
		let parameters = self.parameters()?;

		let misplaced = modifiers.flags - Flags::FUNCTION;
		if !misplaced.is_empty() || !modifiers.layout.is_empty() {
			self.ctx
				.error(modifiers.span, "only function modifiers are permitted on a function");
		}
		if self.ctx.kind.requires_entry_point()
			&& name == "main"
			&& (!self.ctx.types.is_void(return_type) || !parameters.is_empty())
		{
			self.ctx
				.error(name_span, "'main' must be declared as 'void main()'");
		}

		let signature = parameters
			.iter()
			.map(|(parameter, _, _)| *parameter)
			.collect::<Vec<_>>();
		let handle = self.declare_function(modifiers, return_type, name, name_span, signature);

		let token = self.next_token();
		match token.kind {
			TokenKind::Semicolon => {
				if let Some(function) = handle {
					self.elements.push(ProgramElement::FunctionPrototype {
						function,
						span: Span::new(start, token.span().end),
					});
				}
				Ok(())
			}
			TokenKind::LBrace => {
				let duplicate = match handle {
					Some(h) if self.ctx.functions[h].defined => {
						self.ctx
							.error(name_span, format!("duplicate definition of '{name}'"));
						true
					}
					Some(h) => {
						if let Some(decl) = self.ctx.functions.get_mut(h) {
							decl.defined = true;
						}
						false
					}
					None => false,
				};

				self.ctx.symbols.enter_scope();
				let mut variables = Vec::with_capacity(parameters.len());
				for (parameter, name, span) in &parameters {
					let variable = self.ctx.variables.append(Variable {
						name: name.unwrap_or("").to_owned(),
						ty: parameter.ty,
						modifiers: parameter.modifiers,
						storage: Storage::Parameter,
						span: *span,
						constant_value: None,
					});
					if let Some(name) = name {
						if let Err(e) = self.ctx.symbols.insert(name, Symbol::Variable(variable)) {
							self.ctx.error(*span, e.to_string());
						}
					}
					variables.push(variable);
				}

				self.current_function = handle;
				let body = self.block_body(token);
				self.current_function = None;
				self.ctx.symbols.leave_scope();
				let body = body?;

				if !self.ctx.types.is_void(return_type) && !body.always_exits() {
					self.ctx.error(
						name_span,
						format!("function '{name}' can exit without returning a value"),
					);
				}
				if let (Some(function), false) = (handle, duplicate) {
					self.elements.push(ProgramElement::FunctionDefinition {
						function,
						parameters: variables,
						body,
						span: Span::new(start, self.last_end),
					});
				}
				Ok(())
			}
			_ => Err(self.syntax_error(token, "'{' or ';'")),
		}
	}

	/// Parses a parameter list after the opening parenthesis, up to and including the closing one.
	fn parameters(&mut self) -> PResult<Vec<(Parameter, Option<&'a str>, Span)>> {
		let mut parameters = Vec::new();
		if self.check_next(TokenKind::RParen).is_some() {
			return Ok(parameters);
		}
		loop {
			let start = self.peek().span().start;
			let modifiers = self.modifiers()?;
			let base = self.type_()?;
			let name = match self.peek().kind {
				TokenKind::Identifier => Some(self.expect_identifier()?),
				_ => None,
			};
			let ty = match name {
				Some((_, span)) => self.array_suffixes(base, span)?,
				None => base,
			};
			let span = Span::new(start, self.last_end);

			if self.ctx.types.is_void(ty) {
				if parameters.is_empty() && name.is_none() && self.check_next(TokenKind::RParen).is_some() {
					return Ok(parameters);
				}
				self.ctx.error(span, "parameters may not be of type 'void'");
			}
			let misplaced = modifiers.flags - (Flags::CONST | Flags::IN | Flags::OUT);
			if !misplaced.is_empty() || !modifiers.layout.is_empty() {
				self.ctx.error(modifiers.span, "modifier is not permitted on a parameter");
			}
			if modifiers.is_const() && modifiers.flags.contains(Flags::OUT) {
				self.ctx
					.error(modifiers.span, "'const' parameters cannot be 'out' or 'inout'");
			}
			if self.ctx.types.contains_unsized_array(ty) && !self.ctx.kind.allows_unsized_arrays() {
				self.ctx.error(span, "unsized arrays are not permitted here");
			}
			parameters.push((Parameter { ty, modifiers }, name.map(|(n, _)| n), span));

			let token = self.next_token();
			match token.kind {
				TokenKind::Comma => continue,
				TokenKind::RParen => return Ok(parameters),
				_ => return Err(self.syntax_error(token, "',' or ')'")),
			}
		}
	}

	/// Finds the declaration with the same parameter types, or appends a new one.
	///
	/// Returns `None` if the signature clashes with an existing one badly enough that no declaration can be used.
	fn declare_function(
		&mut self,
		modifiers: Modifiers,
		return_type: TypeHandle,
		name: &str,
		name_span: Span,
		parameters: Vec<Parameter>,
	) -> Option<FunctionHandle> {
		let same_types = |a: &[Parameter], b: &[Parameter]| {
			a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.ty == b.ty)
		};
		let existing = match self.ctx.symbols.find(name) {
			Some(Symbol::Function(overloads)) => overloads
				.iter()
				.copied()
				.find(|&h| same_types(&self.ctx.functions[h].parameters, &parameters)),
			_ => None,
		};

		if let Some(existing) = existing {
			if self.ctx.functions.is_base(existing) {
				self.ctx
					.error(name_span, format!("duplicate definition of intrinsic function '{name}'"));
				return None;
			}
			let decl = &self.ctx.functions[existing];
			let same_return = decl.return_type == return_type;
			let same_modifiers = decl
				.parameters
				.iter()
				.zip(&parameters)
				.all(|(a, b)| a.modifiers.flags == b.modifiers.flags);
			if !same_return {
				let message = format!("functions '{name}' differ only in return type");
				self.ctx.error(name_span, message);
				return None;
			}
			if !same_modifiers {
				let message = format!("modifiers of the parameters of '{name}' differ between declarations");
				self.ctx.error(name_span, message);
			}
			return Some(existing);
		}

		let ordinal = self.next_ordinal;
		self.next_ordinal += 1;
		let handle = self.ctx.functions.append(FunctionDecl {
			name: name.to_owned(),
			return_type,
			parameters,
			modifiers,
			span: name_span,
			intrinsic: None,
			defined: false,
			ordinal,
		});
		if let Err(e) = self.ctx.symbols.insert(name, Symbol::Function(vec![handle])) {
			self.ctx.error(name_span, e.to_string());
			return None;
		}
		log::trace!("Declared function '{name}' as #{ordinal}");
		Some(handle)
	}

	/// Parses the declarators of a global variable declaration, starting after the first name.
	fn global_variables(
		&mut self,
		start: usize,
		modifiers: Modifiers,
		base: TypeHandle,
		name: &'a str,
		name_span: Span,
	) -> PResult<()> {
		let misplaced = modifiers.flags & Flags::FUNCTION;
		if !misplaced.is_empty() {
			self.ctx.error(modifiers.span, "function modifiers are not permitted on a variable");
		}
		let (mut name, mut name_span) = (name, name_span);
		loop {
			let ty = self.array_suffixes(base, name_span)?;
			let initializer = match self.check_next(TokenKind::Eq) {
				Some(_) => Some(self.assignment_expression()?),
				None => None,
			};
			let (variable, initializer) =
				self.declare_variable(modifiers, ty, name, name_span, initializer, Storage::Global);
			self.elements.push(ProgramElement::GlobalVariable {
				variable,
				initializer,
				span: Span::new(start, self.last_end),
			});
			if self.check_next(TokenKind::Comma).is_none() {
				break;
			}
			(name, name_span) = self.expect_identifier()?;
		}
		self.expect(TokenKind::Semicolon, "';'")?;
		Ok(())
	}

	/// Checks and declares a variable; the initializer is converted to the variable type.
	fn declare_variable(
		&mut self,
		modifiers: Modifiers,
		ty: TypeHandle,
		name: &str,
		name_span: Span,
		initializer: Option<Expression>,
		storage: Storage,
	) -> (VariableHandle, Option<Expression>) {
		if self.ctx.types.is_void(ty) {
			self.ctx
				.error(name_span, format!("variable '{name}' may not be of type 'void'"));
		}
		if self.ctx.types.contains_unsized_array(ty) {
			self.ctx.error(name_span, "unsized arrays are not permitted here");
		}
		let interface = modifiers.flags & (Flags::UNIFORM | Flags::IN | Flags::OUT | Flags::BUFFER);
		if let Some(flag) = interface.each().next() {
			if initializer.is_some() {
				let message = format!("'{}' variables cannot be initialized", flag.keyword());
				self.ctx.error(name_span, message);
			}
		}
		if modifiers.is_const() && initializer.is_none() {
			self.ctx
				.error(name_span, format!("'const' variable '{name}' must be initialized"));
		}

		let initializer = initializer.map(|expr| convert::coerce(&mut self.ctx, expr, ty));
		let mut constant_value = None;
		if let (true, Some(expr)) = (modifiers.is_const(), &initializer) {
			constant_value = expr.as_literal();
			if !expr.is_poison() && !self.is_constant_expression(expr) {
				self.ctx.error(
					expr.span,
					"'const' variable initializer must be a constant expression",
				);
			}
		}

		let variable = self.ctx.variables.append(Variable {
			name: name.to_owned(),
			ty,
			modifiers,
			storage,
			span: name_span,
			constant_value,
		});
		if let Err(e) = self.ctx.symbols.insert(name, Symbol::Variable(variable)) {
			self.ctx.error(name_span, e.to_string());
		}
		(variable, initializer)
	}

	/// Returns whether an expression only reads literals and `const` variables.
	fn is_constant_expression(&self, expr: &Expression) -> bool {
		match &expr.kind {
			ExpressionKind::Literal(_) => true,
			ExpressionKind::VariableRef(v) => self.ctx.variables[*v].modifiers.is_const(),
			ExpressionKind::Prefix { op, operand } => {
				!matches!(op, crate::ast::Operator::Inc | crate::ast::Operator::Dec)
					&& self.is_constant_expression(operand)
			}
			ExpressionKind::Binary { left, op, right } => {
				!op.is_assignment()
					&& self.is_constant_expression(left)
					&& self.is_constant_expression(right)
			}
			ExpressionKind::Conditional {
				condition,
				when_true,
				when_false,
			} => {
				self.is_constant_expression(condition)
					&& self.is_constant_expression(when_true)
					&& self.is_constant_expression(when_false)
			}
			ExpressionKind::Index { base, index } => {
				self.is_constant_expression(base) && self.is_constant_expression(index)
			}
			ExpressionKind::FieldAccess {
				base,
				anonymous_block: false,
				..
			}
			| ExpressionKind::Swizzle { base, .. } => self.is_constant_expression(base),
			ExpressionKind::Constructor { arguments, .. } => {
				arguments.iter().all(|a| self.is_constant_expression(a))
			}
			ExpressionKind::FunctionCall { function, arguments } => {
				self.ctx.functions[*function].intrinsic.is_some()
					&& arguments.iter().all(|a| self.is_constant_expression(a))
			}
			_ => false,
		}
	}

	/* END OF SOURCE CHECKS */

	fn check_entry_point(&mut self) {
		if !self.ctx.kind.requires_entry_point() {
			return;
		}
		let has_main = self.elements.iter().any(|e| match e {
			ProgramElement::FunctionDefinition { function, .. } => self.ctx.functions[*function].is_main(),
			_ => false,
		});
		if !has_main {
			self.ctx.error(
				Span::new_zero_width(self.source.len()),
				"program does not contain a main() function",
			);
		}
	}

	fn check_called_functions(&mut self) {
		let mut reported = HashSet::new();
		for (function, span) in std::mem::take(&mut self.called) {
			let decl = &self.ctx.functions[function];
			if !decl.defined && reported.insert(function) {
				let message = format!("function '{}' is not defined", decl.name);
				self.ctx.error(span, message);
			}
		}
	}
}

/// Parses the text of an integer literal into its value and whether it has a `u` suffix.
///
/// Returns `None` for malformed literals, such as octal literals with the digit `8`.
pub(crate) fn parse_int(text: &str) -> Option<(u64, bool)> {
	let (digits, unsigned) = match text.strip_suffix(|c| c == 'u' || c == 'U') {
		Some(digits) => (digits, true),
		None => (text, false),
	};
	let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
		if hex.is_empty() {
			return None;
		}
		u64::from_str_radix(hex, 16).ok()?
	} else if digits.len() > 1 && digits.starts_with('0') {
		u64::from_str_radix(&digits[1..], 8).ok()?
	} else {
		digits.parse::<u64>().ok()?
	};
	Some((value, unsigned))
}

/// Builds the literal expression for an integer literal token, reporting out-of-range values.
///
/// An unsuffixed literal above `i32::MAX` but within `u32::MAX` keeps its bit pattern as an `int`, which is how
/// `-2147483648` and `0xFFFFFFFF` come out right.
pub(crate) fn int_literal(ctx: &mut Context, text: &str, span: Span) -> Expression {
	let builtin = ctx.types.builtin();
	match parse_int(text) {
		Some((value, unsigned)) if value <= u64::from(u32::MAX) => {
			let (value, ty) = if unsigned {
				(value as i64, builtin.uint)
			} else {
				(i64::from(value as u32 as i32), builtin.int)
			};
			Expression::literal(Literal::Int(value), ty, span)
		}
		Some(_) => {
			ctx.error(span, format!("integer value is too large: {text}"));
			Expression::literal(Literal::Int(0), builtin.int, span)
		}
		None => {
			ctx.error(span, format!("invalid integer literal '{text}'"));
			Expression::literal(Literal::Int(0), builtin.int, span)
		}
	}
}

/// Builds the literal expression for a floating-point literal token.
pub(crate) fn float_literal(ctx: &mut Context, text: &str, span: Span) -> Expression {
	let float = ctx.types.builtin().float;
	let digits = text.trim_end_matches(|c| c == 'f' || c == 'F');
	match digits.parse::<f64>() {
		Ok(value) if value.is_finite() && value.abs() <= f64::from(f32::MAX) => {
			Expression::literal(Literal::Float(value), float, span)
		}
		Ok(_) => {
			ctx.error(span, format!("floating-point value is too large: {text}"));
			Expression::literal(Literal::Float(0.0), float, span)
		}
		Err(_) => {
			ctx.error(span, format!("invalid floating-point literal '{text}'"));
			Expression::literal(Literal::Float(0.0), float, span)
		}
	}
}
