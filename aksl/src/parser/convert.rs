//! Checked construction of expression nodes.
//!
//! Every function here takes already-converted operands, validates them, inserts implicit conversions, and folds
//! the result when all operands are literals. On a type error it reports a semantic error and returns a poison
//! expression. Any poisoned operand silently poisons the result, so one mistake yields one diagnostic.

use crate::{
	ast::{
		ConstructorKind, Expression, ExpressionKind, FunctionHandle, Literal,
		Operator, Storage, VariableHandle,
	},
	context::Context,
	fold,
	modifiers::Flags,
	types::{ArraySize, ScalarKind, TypeHandle, TypeKind},
	Span,
};
use tinyvec::ArrayVec;

/// Returns a poison expression.
pub(crate) fn poison(ctx: &Context, span: Span) -> Expression {
	Expression::new(ExpressionKind::Poison, ctx.types.builtin().poison, span)
}

fn is_poisoned(ctx: &Context, expr: &Expression) -> bool {
	expr.is_poison() || ctx.types.is_poison(expr.ty)
}

/// Gives an integer or float literal a different scalar type, if the value is representable in it.
///
/// This is what lets `u + 1` stay a `uint` addition and `h * 0.5` stay a `half` multiplication, rather than
/// widening along the ladder.
fn retype_literal(ctx: &Context, expr: &Expression, to: TypeHandle) -> Option<Expression> {
	let value = expr.as_literal()?;
	if !ctx.types.is_scalar(expr.ty) || !ctx.types.is_scalar(to) || expr.ty == to {
		return None;
	}
	let scalar = ctx.types.scalar(to)?;
	let in_range = |v: f64| v >= scalar.min_value() && v <= scalar.max_value();
	let literal = match (value, scalar.kind) {
		(Literal::Int(i), ScalarKind::Signed | ScalarKind::Unsigned) if in_range(i as f64) => {
			Literal::Int(i)
		}
		(Literal::Int(i), ScalarKind::Float) if in_range(i as f64) => Literal::Float(i as f64),
		(Literal::Float(f), ScalarKind::Float) if in_range(f) => Literal::Float(f),
		_ => return None,
	};
	Some(Expression::literal(literal, to, expr.span))
}

/// Converts an expression to a type without any legality check. Literals are converted in place.
pub(crate) fn explicit_cast(ctx: &mut Context, expr: Expression, to: TypeHandle) -> Expression {
	if expr.ty == to || is_poisoned(ctx, &expr) {
		return expr;
	}
	if let Some(value) = expr.as_literal() {
		if ctx.types.is_scalar(to) {
			return fold::cast_literal(ctx, value, to, expr.span);
		}
	}
	let kind = if ctx.types.is_scalar(to) {
		ConstructorKind::ScalarCast
	} else {
		ConstructorKind::CompoundCast
	};
	let span = expr.span;
	Expression::new(
		ExpressionKind::Constructor {
			kind,
			arguments: vec![expr],
		},
		to,
		span,
	)
}

/// Implicitly converts an expression to a type, reporting an error if that is not possible.
pub(crate) fn coerce(ctx: &mut Context, expr: Expression, to: TypeHandle) -> Expression {
	if expr.ty == to || is_poisoned(ctx, &expr) || ctx.types.is_poison(to) {
		return expr;
	}
	if let Some(retyped) = retype_literal(ctx, &expr, to) {
		return retyped;
	}
	if ctx.types.can_coerce(expr.ty, to) {
		return explicit_cast(ctx, expr, to);
	}
	ctx.error(
		expr.span,
		format!(
			"expected '{}', but found '{}'",
			ctx.types.name(to),
			ctx.types.name(expr.ty)
		),
	);
	Expression::new(ExpressionKind::Poison, to, expr.span)
}

/// Checks that an expression can be written to, reporting an error if not.
pub(crate) fn check_assignable(ctx: &mut Context, expr: &Expression) -> bool {
	match &expr.kind {
		ExpressionKind::Poison => true,
		ExpressionKind::VariableRef(handle) => {
			let variable = &ctx.variables[*handle];
			let global = matches!(variable.storage, Storage::Global | Storage::InterfaceBlock);
			let problem = if variable.modifiers.is_const() {
				Some("constant")
			} else if global && variable.modifiers.flags.contains(Flags::UNIFORM) {
				Some("uniform")
			} else if global
				&& variable.modifiers.flags.contains(Flags::IN)
				&& !variable.modifiers.flags.contains(Flags::OUT)
			{
				Some("input")
			} else if variable.modifiers.flags.contains(Flags::READONLY) {
				Some("readonly")
			} else {
				None
			};
			match problem {
				Some(what) => {
					let message = format!("cannot modify {what} variable '{}'", variable.name);
					ctx.error(expr.span, message);
					false
				}
				None => true,
			}
		}
		ExpressionKind::FieldAccess { base, .. } | ExpressionKind::Index { base, .. } => {
			check_assignable(ctx, base)
		}
		ExpressionKind::Swizzle { base, components } => {
			let mut seen = 0u8;
			for &c in components.iter() {
				if seen & (1 << c) != 0 {
					ctx.error(
						expr.span,
						"cannot write to the same swizzle field more than once",
					);
					return false;
				}
				seen |= 1 << c;
			}
			check_assignable(ctx, base)
		}
		_ => {
			ctx.error(expr.span, "cannot assign to this expression");
			false
		}
	}
}

/// Builds a reference to a variable. A `const` variable with a literal value is replaced by that literal.
pub(crate) fn variable_ref(ctx: &Context, handle: VariableHandle, span: Span) -> Expression {
	let variable = &ctx.variables[handle];
	match variable.constant_value {
		Some(value) => Expression::literal(value, variable.ty, span),
		None => Expression::new(ExpressionKind::VariableRef(handle), variable.ty, span),
	}
}

/// Builds a reference to a field of an anonymous interface block.
pub(crate) fn anonymous_field(
	ctx: &Context,
	block: VariableHandle,
	field: u32,
	span: Span,
) -> Expression {
	let block_ty = ctx.variables[block].ty;
	let ty = ctx
		.types
		.fields(block_ty)
		.and_then(|f| f.get(field as usize))
		.map_or(ctx.types.builtin().poison, |f| f.ty);
	Expression::new(
		ExpressionKind::FieldAccess {
			base: Box::new(Expression::new(
				ExpressionKind::VariableRef(block),
				block_ty,
				span,
			)),
			field,
			anonymous_block: true,
		},
		ty,
		span,
	)
}

pub(crate) fn binary(
	ctx: &mut Context,
	left: Expression,
	op: Operator,
	right: Expression,
) -> Expression {
	let span = Span::cover(left.span, right.span);
	if is_poisoned(ctx, &left) || is_poisoned(ctx, &right) {
		return poison(ctx, span);
	}
	if op.is_assignment() && !check_assignable(ctx, &left) {
		return poison(ctx, span);
	}

	// A literal takes on the component type of the other operand when it fits.
	let mut left = left;
	let mut right = right;
	if op != Operator::Comma {
		if !op.is_assignment() && right.as_literal().is_none() {
			if let Some(l) = retype_literal(ctx, &left, ctx.types.component(right.ty)) {
				left = l;
			}
		}
		if left.as_literal().is_none() || op.is_assignment() {
			if let Some(r) = retype_literal(ctx, &right, ctx.types.component(left.ty)) {
				right = r;
			}
		}
	}

	let Some((l, r, result)) = ctx.types.determine_binary_type(op, left.ty, right.ty) else {
		let message = format!(
			"type mismatch: '{}' cannot operate on '{}', '{}'",
			op.symbol(),
			ctx.types.name(left.ty),
			ctx.types.name(right.ty)
		);
		ctx.error(span, message);
		return poison(ctx, span);
	};
	let left = if op.is_assignment() {
		left
	} else {
		coerce(ctx, left, l)
	};
	let right = coerce(ctx, right, r);

	if !op.is_assignment() {
		if let Some(folded) = fold::binary(ctx, &left, op, &right, result, span) {
			return folded;
		}
	}
	Expression::new(
		ExpressionKind::Binary {
			left: Box::new(left),
			op,
			right: Box::new(right),
		},
		result,
		span,
	)
}

pub(crate) fn prefix(
	ctx: &mut Context,
	op: Operator,
	operand: Expression,
	span: Span,
) -> Expression {
	if is_poisoned(ctx, &operand) {
		return poison(ctx, span);
	}
	let ty = operand.ty;
	let numeric = ctx.types.is_numeric(ty);
	let valid = match op {
		Operator::Add | Operator::Sub => numeric,
		Operator::LogicalNot => ty == ctx.types.builtin().bool,
		Operator::BitwiseNot => ctx.types.is_integer(ty),
		Operator::Inc | Operator::Dec => numeric && !ctx.types.is_matrix(ty),
		_ => false,
	};
	if !valid {
		let message = format!(
			"'{}' cannot operate on '{}'",
			op.symbol(),
			ctx.types.name(ty)
		);
		ctx.error(span, message);
		return poison(ctx, span);
	}
	if matches!(op, Operator::Inc | Operator::Dec) && !check_assignable(ctx, &operand) {
		return poison(ctx, span);
	}
	if let Some(folded) = fold::prefix(ctx, op, &operand, span) {
		return folded;
	}
	Expression::new(
		ExpressionKind::Prefix {
			op,
			operand: Box::new(operand),
		},
		ty,
		span,
	)
}

pub(crate) fn postfix(
	ctx: &mut Context,
	op: Operator,
	operand: Expression,
	span: Span,
) -> Expression {
	if is_poisoned(ctx, &operand) {
		return poison(ctx, span);
	}
	let ty = operand.ty;
	if !ctx.types.is_numeric(ty) || ctx.types.is_matrix(ty) {
		let message = format!(
			"'{}' cannot operate on '{}'",
			op.symbol(),
			ctx.types.name(ty)
		);
		ctx.error(span, message);
		return poison(ctx, span);
	}
	if !check_assignable(ctx, &operand) {
		return poison(ctx, span);
	}
	Expression::new(
		ExpressionKind::Postfix {
			op,
			operand: Box::new(operand),
		},
		ty,
		span,
	)
}

pub(crate) fn conditional(
	ctx: &mut Context,
	condition: Expression,
	when_true: Expression,
	when_false: Expression,
) -> Expression {
	let span = Span::cover(condition.span, when_false.span);
	let bool = ctx.types.builtin().bool;
	let condition = coerce(ctx, condition, bool);
	if is_poisoned(ctx, &condition)
		|| is_poisoned(ctx, &when_true)
		|| is_poisoned(ctx, &when_false)
	{
		return poison(ctx, span);
	}

	let (mut t, mut f) = (when_true, when_false);
	if t.ty != f.ty {
		if let Some(retyped) = retype_literal(ctx, &t, f.ty) {
			t = retyped;
		} else if let Some(retyped) = retype_literal(ctx, &f, t.ty) {
			f = retyped;
		}
	}
	if t.ty != f.ty {
		if ctx.types.can_coerce(t.ty, f.ty) {
			t = coerce(ctx, t, f.ty);
		} else if ctx.types.can_coerce(f.ty, t.ty) {
			f = coerce(ctx, f, t.ty);
		} else {
			let message = format!(
				"ternary operator result mismatch: '{}', '{}'",
				ctx.types.name(t.ty),
				ctx.types.name(f.ty)
			);
			ctx.error(span, message);
			return poison(ctx, span);
		}
	}

	match fold::get_constant_bool(&condition) {
		Some(true) => t,
		Some(false) => f,
		None => {
			let ty = t.ty;
			Expression::new(
				ExpressionKind::Conditional {
					condition: Box::new(condition),
					when_true: Box::new(t),
					when_false: Box::new(f),
				},
				ty,
				span,
			)
		}
	}
}

pub(crate) fn index(
	ctx: &mut Context,
	base: Expression,
	index: Expression,
	span: Span,
) -> Expression {
	if is_poisoned(ctx, &base) || is_poisoned(ctx, &index) {
		return poison(ctx, span);
	}
	if !(ctx.types.is_scalar(index.ty) && ctx.types.is_integer(index.ty)) {
		let message = format!(
			"index expression must be an integer, but found '{}'",
			ctx.types.name(index.ty)
		);
		ctx.error(index.span, message);
		return poison(ctx, span);
	}

	let (result, bound) = match &ctx.types[base.ty].kind {
		TypeKind::Array { element, size } => (
			*element,
			match size {
				ArraySize::Fixed(n) => Some(i64::from(*n)),
				ArraySize::Unsized => None,
			},
		),
		TypeKind::Vector { component, size } => (*component, Some(i64::from(*size))),
		TypeKind::Matrix { column, columns } => (*column, Some(i64::from(*columns))),
		_ => {
			let message = format!("expected array, but found '{}'", ctx.types.name(base.ty));
			ctx.error(base.span, message);
			return poison(ctx, span);
		}
	};
	if let (Some(i), Some(bound)) = (fold::get_constant_int(&index), bound) {
		if i < 0 || i >= bound {
			let message = format!(
				"index {i} out of range for type '{}'",
				ctx.types.name(base.ty)
			);
			ctx.error(index.span, message);
			return poison(ctx, span);
		}
	}
	Expression::new(
		ExpressionKind::Index {
			base: Box::new(base),
			index: Box::new(index),
		},
		result,
		span,
	)
}

/// Builds a struct field access or a swizzle.
pub(crate) fn field_access(
	ctx: &mut Context,
	base: Expression,
	name: &str,
	name_span: Span,
) -> Expression {
	let span = Span::cover(base.span, name_span);
	if is_poisoned(ctx, &base) {
		return poison(ctx, span);
	}
	if let Some(fields) = ctx.types.fields(base.ty) {
		let Some(position) = fields.iter().position(|f| f.name == name) else {
			let message = format!(
				"type '{}' does not have a field named '{name}'",
				ctx.types.name(base.ty)
			);
			ctx.error(name_span, message);
			return poison(ctx, span);
		};
		let ty = fields[position].ty;
		return Expression::new(
			ExpressionKind::FieldAccess {
				base: Box::new(base),
				field: position as u32,
				anonymous_block: false,
			},
			ty,
			span,
		);
	}
	if ctx.types.is_vector(base.ty) || ctx.types.is_scalar(base.ty) {
		return swizzle(ctx, base, name, name_span);
	}
	let message = format!("type '{}' does not have fields", ctx.types.name(base.ty));
	ctx.error(name_span, message);
	poison(ctx, span)
}

const SWIZZLE_SETS: [&[u8; 4]; 3] = [b"xyzw", b"rgba", b"stpq"];

fn swizzle(ctx: &mut Context, base: Expression, mask: &str, mask_span: Span) -> Expression {
	let span = Span::cover(base.span, mask_span);
	if mask.len() > 4 {
		ctx.error(mask_span, format!("too many components in swizzle mask '{mask}'"));
		return poison(ctx, span);
	}
	let size = ctx.types.rows(base.ty);
	let mut set = None;
	let mut components = ArrayVec::<[u8; 4]>::new();
	for c in mask.bytes() {
		let found = SWIZZLE_SETS.iter().enumerate().find_map(|(s, letters)| {
			letters.iter().position(|l| *l == c).map(|i| (s, i as u8))
		});
		let Some((s, component)) = found else {
			ctx.error(mask_span, format!("invalid swizzle component '{}'", c as char));
			return poison(ctx, span);
		};
		if *set.get_or_insert(s) != s {
			ctx.error(
				mask_span,
				format!("swizzle components of '{mask}' must come from the same set"),
			);
			return poison(ctx, span);
		}
		if component >= size {
			ctx.error(mask_span, format!("invalid swizzle component '{}'", c as char));
			return poison(ctx, span);
		}
		components.push(component);
	}

	let component = ctx.types.component(base.ty);
	let Some(ty) = ctx.types.vector(component, components.len() as u8) else {
		return poison(ctx, span);
	};
	Expression::new(
		ExpressionKind::Swizzle {
			base: Box::new(base),
			components,
		},
		ty,
		span,
	)
}

/// The cost of passing an argument to a parameter of type `to`.
fn argument_cost(ctx: &Context, arg: &Expression, to: TypeHandle) -> Option<u32> {
	ctx.types.coercion_cost(arg.ty, to).or_else(|| {
		// A literal of a wider type which still fits, e.g. `1` to a `uint` parameter.
		retype_literal(ctx, arg, to).map(|_| 1)
	})
}

/// Returns the parameter types of a signature once its generic types are bound to their `index`th choice.
fn bind_generics(ctx: &Context, parameters: &[TypeHandle], index: usize) -> Option<Vec<TypeHandle>> {
	parameters
		.iter()
		.map(|p| match &ctx.types[*p].kind {
			TypeKind::Generic { coercible } => coercible.get(index).copied(),
			_ => Some(*p),
		})
		.collect()
}

/// Finds the cheapest way to call a function with the arguments: the total cost, the parameter types and the
/// generic binding used.
fn signature_cost(
	ctx: &Context,
	function: FunctionHandle,
	arguments: &[Expression],
) -> Option<(u32, Vec<TypeHandle>, Option<usize>)> {
	let decl = &ctx.functions[function];
	if decl.parameters.len() != arguments.len() {
		return None;
	}
	let parameters = decl.parameters.iter().map(|p| p.ty).collect::<Vec<_>>();
	let choices = parameters
		.iter()
		.filter_map(|p| match &ctx.types[*p].kind {
			TypeKind::Generic { coercible } => Some(coercible.len()),
			_ => None,
		})
		.min();

	let cost_of = |types: &[TypeHandle]| -> Option<u32> {
		arguments
			.iter()
			.zip(types)
			.map(|(a, t)| argument_cost(ctx, a, *t))
			.sum()
	};
	match choices {
		None => cost_of(&parameters).map(|cost| (cost, parameters, None)),
		Some(n) => (0..n)
			.filter_map(|i| {
				let bound = bind_generics(ctx, &parameters, i)?;
				cost_of(&bound).map(|cost| (cost, bound, Some(i)))
			})
			.min_by_key(|(cost, _, _)| *cost),
	}
}

/// Resolves an overloaded call and builds the call expression.
pub(crate) fn call(
	ctx: &mut Context,
	name: &str,
	overloads: &[FunctionHandle],
	arguments: Vec<Expression>,
	span: Span,
) -> Expression {
	if arguments.iter().any(|a| is_poisoned(ctx, a)) {
		return poison(ctx, span);
	}

	let mut best: Option<(u32, FunctionHandle, Vec<TypeHandle>, Option<usize>)> = None;
	let mut ambiguous = false;
	for &function in overloads {
		let Some((cost, parameters, binding)) = signature_cost(ctx, function, &arguments) else {
			continue;
		};
		let better = match &best {
			None => true,
			Some((best_cost, _, best_params, _)) => {
				if cost == *best_cost && *best_params != parameters {
					ambiguous = true;
				}
				cost < *best_cost
			}
		};
		if better {
			ambiguous = false;
			best = Some((cost, function, parameters, binding));
		}
	}

	let signature = || {
		arguments
			.iter()
			.map(|a| ctx.types.name(a.ty).to_owned())
			.collect::<Vec<_>>()
			.join(", ")
	};
	let Some((_, function, parameters, binding)) = best else {
		let message = format!("no overload of '{name}' matches the arguments ({})", signature());
		ctx.error(span, message);
		return poison(ctx, span);
	};
	if ambiguous {
		let message = format!("call to '{name}({})' is ambiguous", signature());
		ctx.error(span, message);
		return poison(ctx, span);
	}

	let decl = &ctx.functions[function];
	let outs = decl.parameters.iter().map(|p| p.is_out()).collect::<Vec<_>>();
	let return_type = match (&ctx.types[decl.return_type].kind, binding) {
		(TypeKind::Generic { coercible }, Some(i)) => {
			coercible.get(i).copied().unwrap_or(decl.return_type)
		}
		_ => decl.return_type,
	};

	let mut converted = Vec::with_capacity(arguments.len());
	for ((argument, ty), is_out) in arguments.into_iter().zip(parameters).zip(outs) {
		if is_out {
			if argument.ty != ty {
				let message = format!(
					"expected '{}', but found '{}'",
					ctx.types.name(ty),
					ctx.types.name(argument.ty)
				);
				ctx.error(argument.span, message);
			}
			check_assignable(ctx, &argument);
			converted.push(argument);
		} else {
			converted.push(coerce(ctx, argument, ty));
		}
	}
	Expression::new(
		ExpressionKind::FunctionCall {
			function,
			arguments: converted,
		},
		return_type,
		span,
	)
}

/// Builds a constructor call, classifying it by the shape of the type and the arguments.
pub(crate) fn constructor(
	ctx: &mut Context,
	ty: TypeHandle,
	arguments: Vec<Expression>,
	span: Span,
) -> Expression {
	if arguments.iter().any(|a| is_poisoned(ctx, a)) {
		return poison(ctx, span);
	}
	let name = ctx.types.name(ty).to_owned();
	let invalid = |ctx: &mut Context, detail: String| {
		ctx.error(span, format!("invalid arguments to '{name}' constructor ({detail})"));
		poison(ctx, span)
	};
	if arguments.is_empty() {
		return invalid(ctx, "expected at least one argument".into());
	}

	match ctx.types[ty].kind.clone() {
		TypeKind::Array { element, size } => {
			let ty = match size {
				ArraySize::Fixed(n) if n as usize != arguments.len() => {
					let detail = format!("expected {n} elements, but found {}", arguments.len());
					return invalid(ctx, detail);
				}
				ArraySize::Fixed(_) => ty,
				ArraySize::Unsized => ctx
					.types
					.array_of(element, ArraySize::Fixed(arguments.len() as u32)),
			};
			let arguments = arguments
				.into_iter()
				.map(|a| coerce(ctx, a, element))
				.collect();
			Expression::new(
				ExpressionKind::Constructor {
					kind: ConstructorKind::Array,
					arguments,
				},
				ty,
				span,
			)
		}
		TypeKind::Struct {
			fields,
			interface_block: false,
		} => {
			if fields.len() != arguments.len() {
				let detail = format!("expected {} fields, but found {}", fields.len(), arguments.len());
				return invalid(ctx, detail);
			}
			let arguments = arguments
				.into_iter()
				.zip(&fields)
				.map(|(a, f)| coerce(ctx, a, f.ty))
				.collect();
			Expression::new(
				ExpressionKind::Constructor {
					kind: ConstructorKind::Struct,
					arguments,
				},
				ty,
				span,
			)
		}
		TypeKind::Scalar(_) => {
			let mut arguments = arguments;
			if arguments.len() != 1 || !ctx.types.is_scalar(arguments[0].ty) {
				return invalid(ctx, "expected a single scalar".into());
			}
			let Some(argument) = arguments.pop() else {
				return poison(ctx, span);
			};
			let mut cast = explicit_cast(ctx, argument, ty);
			cast.span = span;
			cast
		}
		TypeKind::Vector { component, size } => {
			vector_or_matrix(ctx, ty, component, usize::from(size), false, arguments, span)
		}
		TypeKind::Matrix { column, columns } => {
			let component = ctx.types.component(column);
			let slots = usize::from(columns) * usize::from(ctx.types.rows(column));
			vector_or_matrix(ctx, ty, component, slots, true, arguments, span)
		}
		_ => {
			ctx.error(span, format!("cannot construct '{name}'"));
			poison(ctx, span)
		}
	}
}

fn vector_or_matrix(
	ctx: &mut Context,
	ty: TypeHandle,
	component: TypeHandle,
	slots: usize,
	matrix: bool,
	mut arguments: Vec<Expression>,
	span: Span,
) -> Expression {
	let make = |kind, arguments| Expression::new(ExpressionKind::Constructor { kind, arguments }, ty, span);

	if arguments.len() == 1 {
		let argument = &arguments[0];
		if ctx.types.is_scalar(argument.ty) {
			let Some(argument) = arguments.pop() else {
				return poison(ctx, span);
			};
			let argument = explicit_cast(ctx, argument, component);
			let kind = if matrix {
				ConstructorKind::DiagonalMatrix
			} else {
				ConstructorKind::VectorSplat
			};
			return make(kind, vec![argument]);
		}
		let same_shape = ctx.types.rows(argument.ty) == ctx.types.rows(ty)
			&& ctx.types.columns(argument.ty) == ctx.types.columns(ty);
		if matrix && ctx.types.is_matrix(argument.ty) {
			let Some(argument) = arguments.pop() else {
				return poison(ctx, span);
			};
			if same_shape {
				let mut cast = explicit_cast(ctx, argument, ty);
				cast.span = span;
				return cast;
			}
			// Convert the components first, the resize keeps the component type.
			let Some(target) = ctx.types.with_component(argument.ty, component) else {
				return poison(ctx, span);
			};
			let argument = explicit_cast(ctx, argument, target);
			return make(ConstructorKind::MatrixResize, vec![argument]);
		}
		if !matrix && ctx.types.is_vector(argument.ty) && same_shape {
			let Some(argument) = arguments.pop() else {
				return poison(ctx, span);
			};
			let mut cast = explicit_cast(ctx, argument, ty);
			cast.span = span;
			return cast;
		}
	}

	let mut total = 0;
	let mut converted = Vec::with_capacity(arguments.len());
	for argument in arguments {
		if !(ctx.types.is_scalar(argument.ty) || ctx.types.is_vector(argument.ty)) {
			let message = format!(
				"'{}' is not a valid parameter to '{}' constructor",
				ctx.types.name(argument.ty),
				ctx.types.name(ty)
			);
			ctx.error(argument.span, message);
			return poison(ctx, span);
		}
		total += usize::from(ctx.types.rows(argument.ty));
		let Some(target) = ctx.types.with_component(argument.ty, component) else {
			return poison(ctx, span);
		};
		converted.push(explicit_cast(ctx, argument, target));
	}
	if total != slots {
		let message = format!(
			"invalid arguments to '{}' constructor (expected {slots} scalars, but found {total})",
			ctx.types.name(ty)
		);
		ctx.error(span, message);
		return poison(ctx, span);
	}
	make(ConstructorKind::Compound, converted)
}
