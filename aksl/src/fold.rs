//! The constant folder.
//!
//! Folding only ever looks at subtrees which are already literals; references to `const` variables are replaced
//! by their literal value when the reference is built, so they fold too. Integer arithmetic wraps to the 32 bits
//! of storage every integer type has. A fold that would be undefined at runtime, such as an integer division by
//! zero, is reported and left unfolded.

use crate::{
	ast::{Expression, Literal, Operator},
	context::Context,
	types::{Scalar, ScalarKind, TypeHandle},
	Span,
};

/// Returns the value of an integer literal.
pub fn get_constant_int(expr: &Expression) -> Option<i64> {
	match expr.as_literal() {
		Some(Literal::Int(i)) => Some(i),
		_ => None,
	}
}

/// Returns the value of a boolean literal.
pub fn get_constant_bool(expr: &Expression) -> Option<bool> {
	match expr.as_literal() {
		Some(Literal::Bool(b)) => Some(b),
		_ => None,
	}
}

/// Wraps an integer to the 32-bit representation of its type.
fn wrap(value: i64, scalar: Scalar) -> i64 {
	match scalar.kind {
		ScalarKind::Unsigned => i64::from(value as u32),
		_ => i64::from(value as i32),
	}
}

fn display(value: Literal) -> String {
	match value {
		Literal::Bool(b) => b.to_string(),
		Literal::Int(i) => i.to_string(),
		Literal::Float(f) => f.to_string(),
	}
}

/// Returns the zero value of a scalar type.
pub(crate) fn zero(scalar: Scalar) -> Literal {
	match scalar.kind {
		ScalarKind::Boolean => Literal::Bool(false),
		ScalarKind::Float => Literal::Float(0.0),
		ScalarKind::Signed | ScalarKind::Unsigned => Literal::Int(0),
	}
}

/// Converts a scalar literal to the scalar type `to`.
///
/// A float converts to an integer by truncation. If the value does not fit into `to`, exactly one error is
/// reported and the result is the zero literal of `to`.
pub fn cast_literal(
	ctx: &mut Context,
	value: Literal,
	to: TypeHandle,
	span: Span,
) -> Expression {
	let Some(scalar) = ctx.types.scalar(to) else {
		return Expression::new(crate::ast::ExpressionKind::Poison, to, span);
	};
	let converted = match scalar.kind {
		ScalarKind::Boolean => Some(Literal::Bool(value.as_f64() != 0.0)),
		ScalarKind::Float => {
			let v = value.as_f64();
			(v >= scalar.min_value() && v <= scalar.max_value()).then_some(Literal::Float(v))
		}
		ScalarKind::Signed | ScalarKind::Unsigned => {
			let v = value.as_f64().trunc();
			(v >= scalar.min_value() && v <= scalar.max_value())
				.then_some(Literal::Int(v as i64))
		}
	};
	let literal = match converted {
		Some(literal) => literal,
		None => {
			ctx.error(
				span,
				format!(
					"value is out of range for type '{}': {}",
					ctx.types.name(to),
					display(value)
				),
			);
			zero(scalar)
		}
	};
	Expression::literal(literal, to, span)
}

/// Folds a prefix operator applied to a literal.
pub fn prefix(
	ctx: &Context,
	op: Operator,
	operand: &Expression,
	span: Span,
) -> Option<Expression> {
	let value = operand.as_literal()?;
	let scalar = ctx.types.scalar(operand.ty)?;
	if !ctx.types.is_scalar(operand.ty) {
		return None;
	}
	let folded = match (op, value) {
		(Operator::Add, v @ (Literal::Int(_) | Literal::Float(_))) => v,
		(Operator::Sub, Literal::Int(i)) => Literal::Int(wrap(i.wrapping_neg(), scalar)),
		(Operator::Sub, Literal::Float(f)) => Literal::Float(-f),
		(Operator::LogicalNot, Literal::Bool(b)) => Literal::Bool(!b),
		(Operator::BitwiseNot, Literal::Int(i)) => Literal::Int(wrap(!i, scalar)),
		_ => return None,
	};
	Some(Expression::literal(folded, operand.ty, span))
}

/// Folds a binary operator applied to two scalar literals whose types have already been unified.
///
/// Returns `None` when the operands are not both literals or folding is not possible; an integer division or
/// remainder by zero is additionally reported.
pub fn binary(
	ctx: &mut Context,
	left: &Expression,
	op: Operator,
	right: &Expression,
	result: TypeHandle,
	span: Span,
) -> Option<Expression> {
	let (l, r) = (left.as_literal()?, right.as_literal()?);
	if !ctx.types.is_scalar(left.ty) || !ctx.types.is_scalar(right.ty) {
		return None;
	}
	let scalar = ctx.types.scalar(left.ty)?;

	let folded = match (l, r) {
		(Literal::Bool(a), Literal::Bool(b)) => Literal::Bool(match op {
			Operator::LogicalAnd => a && b,
			Operator::LogicalOr => a || b,
			Operator::LogicalXor | Operator::Ne => a != b,
			Operator::Eq => a == b,
			_ => return None,
		}),
		(Literal::Int(a), Literal::Int(b)) => {
			let signed = scalar.kind == ScalarKind::Signed;
			match op {
				Operator::Add => Literal::Int(wrap(a.wrapping_add(b), scalar)),
				Operator::Sub => Literal::Int(wrap(a.wrapping_sub(b), scalar)),
				Operator::Mul => Literal::Int(wrap(a.wrapping_mul(b), scalar)),
				Operator::Div | Operator::Rem => {
					if b == 0 {
						ctx.error(span, "division by zero");
						return None;
					}
					let value = match (op, signed) {
						(Operator::Div, true) => i64::from((a as i32).wrapping_div(b as i32)),
						(Operator::Div, false) => i64::from((a as u32) / (b as u32)),
						(_, true) => i64::from((a as i32).wrapping_rem(b as i32)),
						(_, false) => i64::from((a as u32) % (b as u32)),
					};
					Literal::Int(value)
				}
				Operator::Shl | Operator::Shr => {
					if !(0..32).contains(&b) {
						return None;
					}
					let value = match (op, signed) {
						(Operator::Shl, _) => a << b,
						(_, true) => i64::from((a as i32) >> b),
						(_, false) => i64::from((a as u32) >> b),
					};
					Literal::Int(wrap(value, scalar))
				}
				Operator::BitwiseAnd => Literal::Int(wrap(a & b, scalar)),
				Operator::BitwiseOr => Literal::Int(wrap(a | b, scalar)),
				Operator::BitwiseXor => Literal::Int(wrap(a ^ b, scalar)),
				Operator::Eq => Literal::Bool(a == b),
				Operator::Ne => Literal::Bool(a != b),
				Operator::Lt => Literal::Bool(a < b),
				Operator::Gt => Literal::Bool(a > b),
				Operator::Le => Literal::Bool(a <= b),
				Operator::Ge => Literal::Bool(a >= b),
				_ => return None,
			}
		}
		(Literal::Float(a), Literal::Float(b)) => match op {
			Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
				let value = match op {
					Operator::Add => a + b,
					Operator::Sub => a - b,
					Operator::Mul => a * b,
					_ => {
						if b == 0.0 {
							return None;
						}
						a / b
					}
				};
				// Leave anything that would not survive as a literal to runtime.
				if !value.is_finite() || value.abs() > scalar.max_value() {
					return None;
				}
				Literal::Float(value)
			}
			Operator::Eq => Literal::Bool(a == b),
			Operator::Ne => Literal::Bool(a != b),
			Operator::Lt => Literal::Bool(a < b),
			Operator::Gt => Literal::Bool(a > b),
			Operator::Le => Literal::Bool(a <= b),
			Operator::Ge => Literal::Bool(a >= b),
			_ => return None,
		},
		_ => return None,
	};
	Some(Expression::literal(folded, result, span))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		options::{CompileOptions, ShaderKind},
		span::span,
	};

	fn ctx() -> Context {
		Context::new(ShaderKind::Base, CompileOptions::default())
	}

	#[test]
	fn truncating_cast() {
		let mut ctx = ctx();
		let int = ctx.types.builtin().int;
		let e = cast_literal(&mut ctx, Literal::Float(4.9), int, span(0, 8));
		assert_eq!(e.as_literal(), Some(Literal::Int(4)));
		assert_eq!(e.ty, int);
		assert!(ctx.diagnostics.is_empty());

		let e = cast_literal(&mut ctx, Literal::Float(-4.9), int, span(0, 8));
		assert_eq!(e.as_literal(), Some(Literal::Int(-4)));
	}

	#[test]
	fn out_of_range_cast() {
		let mut ctx = ctx();
		let short = ctx.types.builtin().short;
		let e = cast_literal(&mut ctx, Literal::Int(40000), short, span(3, 15));
		assert_eq!(e.as_literal(), Some(Literal::Int(0)));
		assert_eq!(e.ty, short);
		assert_eq!(ctx.diagnostics.error_count(), 1);
		let message = &ctx.diagnostics.iter().next().unwrap().message;
		assert_eq!(message, "value is out of range for type 'short': 40000");

		let uint = ctx.types.builtin().uint;
		let e = cast_literal(&mut ctx, Literal::Int(-1), uint, span(0, 1));
		assert_eq!(e.as_literal(), Some(Literal::Int(0)));
		assert_eq!(ctx.diagnostics.error_count(), 2);
	}

	#[test]
	fn integer_wraparound() {
		let mut ctx = ctx();
		let b = ctx.types.builtin();
		let int = |v| Expression::literal(Literal::Int(v), b.int, span(0, 1));
		let uint = |v| Expression::literal(Literal::Int(v), b.uint, span(0, 1));

		let e = binary(&mut ctx, &int(i32::MAX as i64), Operator::Add, &int(1), b.int, span(0, 1));
		assert_eq!(e.and_then(|e| e.as_literal()), Some(Literal::Int(i32::MIN as i64)));

		let e = binary(&mut ctx, &uint(0), Operator::Sub, &uint(1), b.uint, span(0, 1));
		assert_eq!(e.and_then(|e| e.as_literal()), Some(Literal::Int(u32::MAX as i64)));

		let e = binary(&mut ctx, &int(-7), Operator::Shr, &int(1), b.int, span(0, 1));
		assert_eq!(e.and_then(|e| e.as_literal()), Some(Literal::Int(-4)));

		let e = binary(&mut ctx, &int(7), Operator::Lt, &int(8), b.bool, span(0, 1));
		assert_eq!(e.and_then(|e| e.as_literal()), Some(Literal::Bool(true)));
		assert!(ctx.diagnostics.is_empty());
	}

	#[test]
	fn division_by_zero() {
		let mut ctx = ctx();
		let b = ctx.types.builtin();
		let int = |v| Expression::literal(Literal::Int(v), b.int, span(0, 1));
		assert_eq!(binary(&mut ctx, &int(1), Operator::Div, &int(0), b.int, span(0, 5)), None);
		assert_eq!(binary(&mut ctx, &int(1), Operator::Rem, &int(0), b.int, span(0, 5)), None);
		assert_eq!(ctx.diagnostics.error_count(), 2);

		let float = |v| Expression::literal(Literal::Float(v), b.float, span(0, 1));
		assert_eq!(
			binary(&mut ctx, &float(1.0), Operator::Div, &float(0.0), b.float, span(0, 5)),
			None
		);
		assert_eq!(ctx.diagnostics.error_count(), 2);
	}

	#[test]
	fn prefix_operators() {
		let ctx = ctx();
		let b = ctx.types.builtin();
		let e = Expression::literal(Literal::Int(5), b.int, span(1, 2));
		let folded = prefix(&ctx, Operator::Sub, &e, span(0, 2)).unwrap();
		assert_eq!(folded.as_literal(), Some(Literal::Int(-5)));
		assert_eq!(folded.span, span(0, 2));
		let folded = prefix(&ctx, Operator::BitwiseNot, &e, span(0, 2)).unwrap();
		assert_eq!(folded.as_literal(), Some(Literal::Int(-6)));
		let t = Expression::literal(Literal::Bool(true), b.bool, span(1, 5));
		let folded = prefix(&ctx, Operator::LogicalNot, &t, span(0, 5)).unwrap();
		assert_eq!(folded.as_literal(), Some(Literal::Bool(false)));
	}
}
