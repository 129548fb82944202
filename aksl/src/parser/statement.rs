//! Statement grammar.

use super::{convert, PResult, Parser};
use crate::{
	ast::{Expression, LoopKind, Statement, StatementKind, SwitchCase},
	fold,
	lexer::{Token, TokenKind},
	options::ShaderKind,
	Span,
};
use std::collections::HashSet;

impl<'a> Parser<'a> {
	pub(super) fn statement(&mut self) -> PResult<Statement> {
		let token = self.peek();
		match token.kind {
			TokenKind::LBrace => {
				self.next_token();
				self.ctx.symbols.enter_scope();
				let block = self.block_body(token);
				self.ctx.symbols.leave_scope();
				block
			}
			TokenKind::Semicolon => {
				self.next_token();
				Ok(Statement::new(StatementKind::Empty, token.span()))
			}
			TokenKind::If => self.if_statement(),
			TokenKind::For => self.for_statement(),
			TokenKind::While => self.while_statement(),
			TokenKind::Do => self.do_statement(),
			TokenKind::Switch => self.switch_statement(),
			TokenKind::Return => self.return_statement(),
			TokenKind::Break | TokenKind::Continue | TokenKind::Discard => self.jump_statement(),
			_ if self.is_declaration_start(token) => self.variable_declaration(),
			_ => self.expression_statement(),
		}
	}

	/// Returns whether a token begins a local variable declaration: a modifier or a type name.
	fn is_declaration_start(&self, token: Token) -> bool {
		match token.kind {
			TokenKind::Const
			| TokenKind::Layout
			| TokenKind::Uniform
			| TokenKind::In
			| TokenKind::Out
			| TokenKind::InOut
			| TokenKind::Flat
			| TokenKind::NoPerspective
			| TokenKind::Smooth
			| TokenKind::Buffer
			| TokenKind::Workgroup => true,
			TokenKind::Identifier => self.ctx.symbols.is_type(self.text(token)),
			_ => false,
		}
	}

	/// Parses statements after an opening brace, up to and including the closing one. The caller manages the
	/// scope, since a function body shares its scope with the parameters.
	pub(super) fn block_body(&mut self, open: Token) -> PResult<Statement> {
		self.enter_nesting(open)?;
		let mut statements = Vec::new();
		loop {
			let token = self.peek();
			match token.kind {
				TokenKind::RBrace => {
					self.next_token();
					break;
				}
				TokenKind::EndOfFile => return Err(self.syntax_error(token, "'}'")),
				_ => statements.push(self.statement()?),
			}
		}
		self.leave_nesting();
		Ok(Statement::new(
			StatementKind::Block {
				statements,
				scoped: true,
			},
			Span::new(open.span().start, self.last_end),
		))
	}

	/// Parses a parenthesised condition and converts it to `bool`.
	fn condition(&mut self) -> PResult<Expression> {
		self.expect(TokenKind::LParen, "'('")?;
		let condition = self.expression()?;
		self.expect(TokenKind::RParen, "')'")?;
		let bool = self.ctx.types.builtin().bool;
		Ok(convert::coerce(&mut self.ctx, condition, bool))
	}

	fn if_statement(&mut self) -> PResult<Statement> {
		let start = self.next_token().span().start;
		let condition = self.condition()?;
		let when_true = Box::new(self.statement()?);
		let when_false = match self.check_next(TokenKind::Else) {
			Some(_) => Some(Box::new(self.statement()?)),
			None => None,
		};
		Ok(Statement::new(
			StatementKind::If {
				condition,
				when_true,
				when_false,
			},
			Span::new(start, self.last_end),
		))
	}

	/// Parses a loop body with `break` and `continue` permitted.
	fn loop_body(&mut self) -> PResult<Box<Statement>> {
		self.loop_depth += 1;
		let body = self.statement();
		self.loop_depth -= 1;
		body.map(Box::new)
	}

	fn for_statement(&mut self) -> PResult<Statement> {
		let start = self.next_token().span().start;
		self.expect(TokenKind::LParen, "'('")?;
		self.ctx.symbols.enter_scope();

		let token = self.peek();
		let init = if token.kind == TokenKind::Semicolon {
			self.next_token();
			None
		} else if self.is_declaration_start(token) {
			Some(Box::new(self.variable_declaration()?))
		} else {
			Some(Box::new(self.expression_statement()?))
		};

		let condition = if self.peek().kind == TokenKind::Semicolon {
			None
		} else {
			let condition = self.expression()?;
			let bool = self.ctx.types.builtin().bool;
			Some(convert::coerce(&mut self.ctx, condition, bool))
		};
		self.expect(TokenKind::Semicolon, "';'")?;

		let step = if self.peek().kind == TokenKind::RParen {
			None
		} else {
			Some(self.expression()?)
		};
		self.expect(TokenKind::RParen, "')'")?;

		let body = self.loop_body()?;
		self.ctx.symbols.leave_scope();
		Ok(Statement::new(
			StatementKind::For {
				kind: LoopKind::For,
				init,
				condition,
				step,
				body,
			},
			Span::new(start, self.last_end),
		))
	}

	fn while_statement(&mut self) -> PResult<Statement> {
		let start = self.next_token().span().start;
		let condition = self.condition()?;
		let body = self.loop_body()?;
		Ok(Statement::new(
			StatementKind::For {
				kind: LoopKind::While,
				init: None,
				condition: Some(condition),
				step: None,
				body,
			},
			Span::new(start, self.last_end),
		))
	}

	fn do_statement(&mut self) -> PResult<Statement> {
		let start = self.next_token().span().start;
		let body = self.loop_body()?;
		self.expect(TokenKind::While, "'while'")?;
		let condition = self.condition()?;
		self.expect(TokenKind::Semicolon, "';'")?;
		Ok(Statement::new(
			StatementKind::For {
				kind: LoopKind::DoWhile,
				init: None,
				condition: Some(condition),
				step: None,
				body,
			},
			Span::new(start, self.last_end),
		))
	}

	/// `switch (selector) { case N: ... default: ... }`
	///
	/// The selector must be an integer scalar, and the case values distinct integer constants.
	fn switch_statement(&mut self) -> PResult<Statement> {
		let start = self.next_token().span().start;
		self.expect(TokenKind::LParen, "'('")?;
		let selector = self.expression()?;
		self.expect(TokenKind::RParen, "')'")?;
		let types = &self.ctx.types;
		let valid = selector.is_poison()
			|| types.is_poison(selector.ty)
			|| (types.is_scalar(selector.ty) && types.is_integer(selector.ty));
		if !valid {
			let message = format!("expected 'int', but found '{}'", self.ctx.type_name(selector.ty));
			self.ctx.error(selector.span, message);
		}

		let open = self.expect(TokenKind::LBrace, "'{'")?;
		self.enter_nesting(open)?;
		self.ctx.symbols.enter_scope();
		self.switch_depth += 1;

		let mut cases: Vec<SwitchCase> = Vec::new();
		let mut values = HashSet::new();
		let mut has_default = false;
		loop {
			let token = self.next_token();
			match token.kind {
				TokenKind::RBrace => break,
				TokenKind::Case => {
					let value = self.expression()?;
					let value = if valid {
						convert::coerce(&mut self.ctx, value, selector.ty)
					} else {
						value
					};
					self.expect(TokenKind::Colon, "':'")?;
					let constant = fold::get_constant_int(&value);
					match constant {
						Some(v) if !values.insert(v) => {
							self.ctx.error(value.span, format!("duplicate case value '{v}'"));
						}
						Some(_) => {}
						None if value.is_poison() => {}
						None => self.ctx.error(value.span, "case value must be a constant integer"),
					}
					cases.push(SwitchCase {
						value: Some(constant.unwrap_or(0)),
						statements: Vec::new(),
						span: Span::new(token.span().start, self.last_end),
					});
				}
				TokenKind::Default => {
					self.expect(TokenKind::Colon, "':'")?;
					if has_default {
						self.ctx.error(token.span(), "duplicate default case");
					}
					has_default = true;
					cases.push(SwitchCase {
						value: None,
						statements: Vec::new(),
						span: Span::new(token.span().start, self.last_end),
					});
				}
				_ if cases.is_empty() => return Err(self.syntax_error(token, "'case'")),
				_ => {
					self.push_back(token);
					let statement = self.statement()?;
					if let Some(case) = cases.last_mut() {
						case.span = Span::cover(case.span, statement.span);
						case.statements.push(statement);
					}
				}
			}
		}

		self.switch_depth -= 1;
		self.ctx.symbols.leave_scope();
		self.leave_nesting();
		Ok(Statement::new(
			StatementKind::Switch { selector, cases },
			Span::new(start, self.last_end),
		))
	}

	fn return_statement(&mut self) -> PResult<Statement> {
		let token = self.next_token();
		let return_type = self
			.current_function
			.map(|f| self.ctx.functions[f].return_type);
		let value = if self.peek().kind == TokenKind::Semicolon {
			if let Some(ty) = return_type.filter(|&ty| !self.ctx.types.is_void(ty)) {
				let message = format!("expected function to return '{}'", self.ctx.type_name(ty));
				self.ctx.error(token.span(), message);
			}
			None
		} else {
			let value = self.expression()?;
			match return_type {
				Some(ty) if self.ctx.types.is_void(ty) => {
					self.ctx
						.error(value.span, "may not return a value from a void function");
					Some(value)
				}
				Some(ty) => Some(convert::coerce(&mut self.ctx, value, ty)),
				None => Some(value),
			}
		};
		self.expect(TokenKind::Semicolon, "';'")?;
		Ok(Statement::new(
			StatementKind::Return(value),
			Span::new(token.span().start, self.last_end),
		))
	}

	/// `break;`, `continue;` or `discard;`
	fn jump_statement(&mut self) -> PResult<Statement> {
		let token = self.next_token();
		let kind = match token.kind {
			TokenKind::Break => {
				if self.loop_depth == 0 && self.switch_depth == 0 {
					self.ctx
						.error(token.span(), "break statement must be inside a loop or switch");
				}
				StatementKind::Break
			}
			TokenKind::Continue => {
				if self.loop_depth == 0 {
					self.ctx
						.error(token.span(), "continue statement must be inside a loop");
				}
				StatementKind::Continue
			}
			_ => {
				if self.ctx.kind != ShaderKind::Fragment {
					self.ctx.error(
						token.span(),
						"discard statement is only permitted in fragment shaders",
					);
				}
				StatementKind::Discard
			}
		};
		self.expect(TokenKind::Semicolon, "';'")?;
		Ok(Statement::new(kind, Span::new(token.span().start, self.last_end)))
	}

	/// A local variable declaration with one or more declarators. Several declarators are grouped in an unscoped
	/// block.
	fn variable_declaration(&mut self) -> PResult<Statement> {
		let start = self.peek().span().start;
		let modifiers = self.modifiers()?;
		let misplaced = modifiers.flags - crate::modifiers::Flags::CONST;
		if !misplaced.is_empty() || !modifiers.layout.is_empty() {
			self.ctx
				.error(modifiers.span, "only 'const' is permitted on a local variable");
		}
		let base = self.type_()?;

		let mut declarations = Vec::new();
		loop {
			let (name, name_span) = self.expect_identifier()?;
			let ty = self.array_suffixes(base, name_span)?;
			let initializer = match self.check_next(TokenKind::Eq) {
				Some(_) => Some(self.assignment_expression()?),
				None => None,
			};
			let end = initializer.as_ref().map_or(self.last_end, |i| i.span.end);
			let (variable, initializer) = self.declare_variable(
				modifiers,
				ty,
				name,
				name_span,
				initializer,
				crate::ast::Storage::Local,
			);
			declarations.push(Statement::new(
				StatementKind::VariableDecl {
					variable,
					initializer,
				},
				Span::new(name_span.start, end),
			));
			if self.check_next(TokenKind::Comma).is_none() {
				break;
			}
		}
		self.expect(TokenKind::Semicolon, "';'")?;

		let span = Span::new(start, self.last_end);
		if declarations.len() == 1 {
			let mut declaration = declarations.remove(0);
			declaration.span = span;
			return Ok(declaration);
		}
		Ok(Statement::new(
			StatementKind::Block {
				statements: declarations,
				scoped: false,
			},
			span,
		))
	}

	fn expression_statement(&mut self) -> PResult<Statement> {
		let expression = self.expression()?;
		let start = expression.span.start;
		self.expect(TokenKind::Semicolon, "';'")?;
		Ok(Statement::new(
			StatementKind::Expression(expression),
			Span::new(start, self.last_end),
		))
	}
}
