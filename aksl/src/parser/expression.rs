//! Expression grammar.
//!
//! Each precedence level is one function, from the comma operator down to primary expressions. Binary operators
//! between assignment and prefix share one precedence-climbing function which looks up the level of each operator
//! in [`Operator::binary_precedence()`].

use super::{convert, float_literal, int_literal, PResult, Parser};
use crate::{
	ast::{precedence, Expression, ExpressionKind, Literal, Operator, Precedence},
	lexer::TokenKind,
	symbols::Symbol,
	Span,
};

/// Maps a token to the binary operator it spells, if any. Assignment operators are not included.
fn binary_operator(kind: TokenKind) -> Option<Operator> {
	let op = match kind {
		TokenKind::Star => Operator::Mul,
		TokenKind::Slash => Operator::Div,
		TokenKind::Percent => Operator::Rem,
		TokenKind::Plus => Operator::Add,
		TokenKind::Minus => Operator::Sub,
		TokenKind::Shl => Operator::Shl,
		TokenKind::Shr => Operator::Shr,
		TokenKind::Lt => Operator::Lt,
		TokenKind::Gt => Operator::Gt,
		TokenKind::Le => Operator::Le,
		TokenKind::Ge => Operator::Ge,
		TokenKind::EqEq => Operator::Eq,
		TokenKind::BangEq => Operator::Ne,
		TokenKind::Amp => Operator::BitwiseAnd,
		TokenKind::Caret => Operator::BitwiseXor,
		TokenKind::Pipe => Operator::BitwiseOr,
		TokenKind::AmpAmp => Operator::LogicalAnd,
		TokenKind::CaretCaret => Operator::LogicalXor,
		TokenKind::PipePipe => Operator::LogicalOr,
		_ => return None,
	};
	Some(op)
}

fn assignment_operator(kind: TokenKind) -> Option<Operator> {
	let op = match kind {
		TokenKind::Eq => Operator::Assign,
		TokenKind::PlusEq => Operator::AddAssign,
		TokenKind::MinusEq => Operator::SubAssign,
		TokenKind::StarEq => Operator::MulAssign,
		TokenKind::SlashEq => Operator::DivAssign,
		TokenKind::PercentEq => Operator::RemAssign,
		TokenKind::ShlEq => Operator::ShlAssign,
		TokenKind::ShrEq => Operator::ShrAssign,
		TokenKind::AmpEq => Operator::AndAssign,
		TokenKind::PipeEq => Operator::OrAssign,
		TokenKind::CaretEq => Operator::XorAssign,
		_ => return None,
	};
	Some(op)
}

impl<'a> Parser<'a> {
	/// `assignment (',' assignment)*`
	pub(super) fn expression(&mut self) -> PResult<Expression> {
		let mut left = self.assignment_expression()?;
		while self.check_next(TokenKind::Comma).is_some() {
			let right = self.assignment_expression()?;
			left = convert::binary(&mut self.ctx, left, Operator::Comma, right);
		}
		Ok(left)
	}

	/// `conditional (assignment-op assignment)?`, which is right-associative.
	pub(super) fn assignment_expression(&mut self) -> PResult<Expression> {
		let left = self.conditional_expression()?;
		match assignment_operator(self.peek().kind) {
			Some(op) => {
				self.next_token();
				let right = self.assignment_expression()?;
				Ok(convert::binary(&mut self.ctx, left, op, right))
			}
			None => Ok(left),
		}
	}

	/// `logical-or ('?' expression ':' assignment)?`
	fn conditional_expression(&mut self) -> PResult<Expression> {
		let condition = self.binary_expression(precedence::LOGICAL_OR)?;
		if self.check_next(TokenKind::Question).is_none() {
			return Ok(condition);
		}
		let when_true = self.expression()?;
		self.expect(TokenKind::Colon, "':'")?;
		let when_false = self.assignment_expression()?;
		Ok(convert::conditional(
			&mut self.ctx,
			condition,
			when_true,
			when_false,
		))
	}

	/// Parses left-associative binary operators of the given precedence level or tighter.
	fn binary_expression(&mut self, level: Precedence) -> PResult<Expression> {
		if level <= precedence::PREFIX {
			return self.prefix_expression();
		}
		let mut left = self.binary_expression(level - 1)?;
		loop {
			let op = match binary_operator(self.peek().kind) {
				Some(op) if op.binary_precedence() == level => op,
				_ => break,
			};
			self.next_token();
			let right = self.binary_expression(level - 1)?;
			left = convert::binary(&mut self.ctx, left, op, right);
		}
		Ok(left)
	}

	fn prefix_expression(&mut self) -> PResult<Expression> {
		let token = self.peek();
		let op = match token.kind {
			TokenKind::PlusPlus => Operator::Inc,
			TokenKind::MinusMinus => Operator::Dec,
			TokenKind::Plus => Operator::Add,
			TokenKind::Minus => Operator::Sub,
			TokenKind::Bang => Operator::LogicalNot,
			TokenKind::Tilde => Operator::BitwiseNot,
			_ => return self.postfix_expression(),
		};
		self.next_token();
		self.enter_nesting(token)?;
		let operand = self.prefix_expression()?;
		self.leave_nesting();
		let span = Span::cover(token.span(), operand.span);
		Ok(convert::prefix(&mut self.ctx, op, operand, span))
	}

	/// A primary expression followed by any number of `[index]`, `.field`, `++` or `--`.
	fn postfix_expression(&mut self) -> PResult<Expression> {
		let mut expr = self.primary_expression()?;
		loop {
			let token = self.peek();
			match token.kind {
				TokenKind::LBracket => {
					self.next_token();
					if let Some(close) = self.check_next(TokenKind::RBracket) {
						return Err(self.syntax_error(close, "an index"));
					}
					let index = self.expression()?;
					self.expect(TokenKind::RBracket, "']'")?;
					let span = Span::new(expr.span.start, self.last_end);
					expr = convert::index(&mut self.ctx, expr, index, span);
				}
				TokenKind::Dot => {
					self.next_token();
					let (name, name_span) = self.expect_identifier()?;
					expr = convert::field_access(&mut self.ctx, expr, name, name_span);
				}
				TokenKind::PlusPlus | TokenKind::MinusMinus => {
					self.next_token();
					let op = if token.kind == TokenKind::PlusPlus {
						Operator::Inc
					} else {
						Operator::Dec
					};
					let span = Span::cover(expr.span, token.span());
					expr = convert::postfix(&mut self.ctx, op, expr, span);
				}
				_ => return Ok(expr),
			}
		}
	}

	fn primary_expression(&mut self) -> PResult<Expression> {
		let token = self.next_token();
		let span = token.span();
		match token.kind {
			TokenKind::IntLiteral => {
				let text = self.text(token);
				Ok(int_literal(&mut self.ctx, text, span))
			}
			TokenKind::FloatLiteral => {
				let text = self.text(token);
				Ok(float_literal(&mut self.ctx, text, span))
			}
			TokenKind::True | TokenKind::False => Ok(Expression::literal(
				Literal::Bool(token.kind == TokenKind::True),
				self.ctx.types.builtin().bool,
				span,
			)),
			TokenKind::LParen => {
				self.enter_nesting(token)?;
				let mut expr = self.expression()?;
				self.expect(TokenKind::RParen, "')'")?;
				self.leave_nesting();
				expr.span = Span::new(span.start, self.last_end);
				Ok(expr)
			}
			TokenKind::Identifier => self.identifier(token.span()),
			_ => Err(self.syntax_error(token, "an expression")),
		}
	}

	/// Resolves an identifier in expression position: a constructor, a call, or a reference.
	fn identifier(&mut self, span: Span) -> PResult<Expression> {
		let source = self.source;
		let name = &source[span.range()];
		match self.ctx.symbols.find(name).cloned() {
			Some(Symbol::Type(ty)) => {
				let ty = self.array_suffixes(ty, span)?;
				self.expect(TokenKind::LParen, "'('")?;
				let arguments = self.arguments()?;
				let span = Span::new(span.start, self.last_end);
				Ok(convert::constructor(&mut self.ctx, ty, arguments, span))
			}
			Some(Symbol::Function(overloads)) => {
				self.expect(TokenKind::LParen, "'('")?;
				let arguments = self.arguments()?;
				let span = Span::new(span.start, self.last_end);
				let call = convert::call(&mut self.ctx, name, &overloads, arguments, span);
				if let ExpressionKind::FunctionCall { function, .. } = call.kind {
					if !self.ctx.functions.is_base(function) {
						self.called.push((function, span));
					}
				}
				Ok(call)
			}
			Some(Symbol::Variable(variable)) => Ok(convert::variable_ref(&self.ctx, variable, span)),
			Some(Symbol::Field { block, field }) => {
				Ok(convert::anonymous_field(&self.ctx, block, field, span))
			}
			None => {
				self.ctx.error(span, format!("no symbol named '{name}'"));
				let mut span = span;
				if self.check_next(TokenKind::LParen).is_some() {
					self.arguments()?;
					span = Span::new(span.start, self.last_end);
				}
				Ok(convert::poison(&self.ctx, span))
			}
		}
	}

	/// Parses call arguments after the opening parenthesis, up to and including the closing one.
	fn arguments(&mut self) -> PResult<Vec<Expression>> {
		let mut arguments = Vec::new();
		if self.check_next(TokenKind::RParen).is_some() {
			return Ok(arguments);
		}
		loop {
			arguments.push(self.assignment_expression()?);
			let token = self.next_token();
			match token.kind {
				TokenKind::Comma => continue,
				TokenKind::RParen => return Ok(arguments),
				_ => return Err(self.syntax_error(token, "',' or ')'")),
			}
		}
	}
}
