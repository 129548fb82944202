//! The typed abstract syntax tree.
//!
//! Every expression carries its resolved type, and every node carries the span of source it was produced from.
//! Ownership is tree-shaped: a node owns its children. The exceptions are variable references and function calls,
//! which hold a [`VariableHandle`] or [`FunctionHandle`] into the arenas of the program; these are
//! back-references to the declaration, never a second owner.

use crate::{
	arena::Handle,
	modifiers::Modifiers,
	types::TypeHandle,
	Span,
};
use tinyvec::ArrayVec;

pub type VariableHandle = Handle<Variable>;
pub type FunctionHandle = Handle<FunctionDecl>;

/// Operator precedence, lowest value binds tightest.
pub type Precedence = u8;

pub mod precedence {
	use super::Precedence;

	pub const PARENTHESES: Precedence = 1;
	pub const POSTFIX: Precedence = 2;
	pub const PREFIX: Precedence = 3;
	pub const MULTIPLICATIVE: Precedence = 4;
	pub const ADDITIVE: Precedence = 5;
	pub const SHIFT: Precedence = 6;
	pub const RELATIONAL: Precedence = 7;
	pub const EQUALITY: Precedence = 8;
	pub const BITWISE_AND: Precedence = 9;
	pub const BITWISE_XOR: Precedence = 10;
	pub const BITWISE_OR: Precedence = 11;
	pub const LOGICAL_AND: Precedence = 12;
	pub const LOGICAL_XOR: Precedence = 13;
	pub const LOGICAL_OR: Precedence = 14;
	pub const CONDITIONAL: Precedence = 15;
	pub const ASSIGNMENT: Precedence = 16;
	pub const SEQUENCE: Precedence = 17;
	/// A whole expression, e.g. a statement or an initializer. Never needs parentheses.
	pub const EXPRESSION: Precedence = 18;
}

/// A prefix, postfix or binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
	Shl,
	Shr,
	Lt,
	Gt,
	Le,
	Ge,
	Eq,
	Ne,
	LogicalAnd,
	LogicalOr,
	LogicalXor,
	BitwiseAnd,
	BitwiseOr,
	BitwiseXor,
	LogicalNot,
	BitwiseNot,
	Assign,
	AddAssign,
	SubAssign,
	MulAssign,
	DivAssign,
	RemAssign,
	ShlAssign,
	ShrAssign,
	AndAssign,
	OrAssign,
	XorAssign,
	Inc,
	Dec,
	Comma,
}

impl Operator {
	/// Returns the source spelling.
	pub fn symbol(self) -> &'static str {
		match self {
			Operator::Add => "+",
			Operator::Sub => "-",
			Operator::Mul => "*",
			Operator::Div => "/",
			Operator::Rem => "%",
			Operator::Shl => "<<",
			Operator::Shr => ">>",
			Operator::Lt => "<",
			Operator::Gt => ">",
			Operator::Le => "<=",
			Operator::Ge => ">=",
			Operator::Eq => "==",
			Operator::Ne => "!=",
			Operator::LogicalAnd => "&&",
			Operator::LogicalOr => "||",
			Operator::LogicalXor => "^^",
			Operator::BitwiseAnd => "&",
			Operator::BitwiseOr => "|",
			Operator::BitwiseXor => "^",
			Operator::LogicalNot => "!",
			Operator::BitwiseNot => "~",
			Operator::Assign => "=",
			Operator::AddAssign => "+=",
			Operator::SubAssign => "-=",
			Operator::MulAssign => "*=",
			Operator::DivAssign => "/=",
			Operator::RemAssign => "%=",
			Operator::ShlAssign => "<<=",
			Operator::ShrAssign => ">>=",
			Operator::AndAssign => "&=",
			Operator::OrAssign => "|=",
			Operator::XorAssign => "^=",
			Operator::Inc => "++",
			Operator::Dec => "--",
			Operator::Comma => ",",
		}
	}

	/// Returns the precedence when used as a binary operator.
	pub fn binary_precedence(self) -> Precedence {
		use precedence::*;
		match self {
			Operator::Mul | Operator::Div | Operator::Rem => MULTIPLICATIVE,
			Operator::Add | Operator::Sub => ADDITIVE,
			Operator::Shl | Operator::Shr => SHIFT,
			Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => RELATIONAL,
			Operator::Eq | Operator::Ne => EQUALITY,
			Operator::BitwiseAnd => BITWISE_AND,
			Operator::BitwiseXor => BITWISE_XOR,
			Operator::BitwiseOr => BITWISE_OR,
			Operator::LogicalAnd => LOGICAL_AND,
			Operator::LogicalXor => LOGICAL_XOR,
			Operator::LogicalOr => LOGICAL_OR,
			Operator::Comma => SEQUENCE,
			Operator::LogicalNot | Operator::BitwiseNot => PREFIX,
			Operator::Inc | Operator::Dec => POSTFIX,
			_ => ASSIGNMENT,
		}
	}

	/// Returns whether this is `=` or a compound assignment.
	pub fn is_assignment(self) -> bool {
		matches!(
			self,
			Operator::Assign
				| Operator::AddAssign
				| Operator::SubAssign
				| Operator::MulAssign
				| Operator::DivAssign
				| Operator::RemAssign
				| Operator::ShlAssign
				| Operator::ShrAssign
				| Operator::AndAssign
				| Operator::OrAssign
				| Operator::XorAssign
		)
	}

	/// Returns the operator a compound assignment applies, e.g. `+` for `+=`. Any other operator is returned
	/// unchanged.
	pub fn remove_assignment(self) -> Operator {
		match self {
			Operator::AddAssign => Operator::Add,
			Operator::SubAssign => Operator::Sub,
			Operator::MulAssign => Operator::Mul,
			Operator::DivAssign => Operator::Div,
			Operator::RemAssign => Operator::Rem,
			Operator::ShlAssign => Operator::Shl,
			Operator::ShrAssign => Operator::Shr,
			Operator::AndAssign => Operator::BitwiseAnd,
			Operator::OrAssign => Operator::BitwiseOr,
			Operator::XorAssign => Operator::BitwiseXor,
			op => op,
		}
	}

	/// Returns whether this is an arithmetic or bitwise operator producing a value of its operands' kind.
	pub fn is_arithmetic(self) -> bool {
		matches!(
			self,
			Operator::Add
				| Operator::Sub
				| Operator::Mul
				| Operator::Div
				| Operator::Rem
				| Operator::Shl
				| Operator::Shr
				| Operator::BitwiseAnd
				| Operator::BitwiseOr
				| Operator::BitwiseXor
		)
	}

	/// Returns whether this operator produces a `bool` from two operands.
	pub fn is_comparison(self) -> bool {
		matches!(
			self,
			Operator::Lt
				| Operator::Gt
				| Operator::Le
				| Operator::Ge
				| Operator::Eq
				| Operator::Ne
		)
	}

	pub fn is_logical(self) -> bool {
		matches!(
			self,
			Operator::LogicalAnd | Operator::LogicalOr | Operator::LogicalXor
		)
	}
}

/// A literal constant value. The type of the owning expression decides how the value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
	Bool(bool),
	/// Any integer value; always within the range of the owning expression's type.
	Int(i64),
	Float(f64),
}

impl Literal {
	/// Returns the value as a double, the way range checks see it.
	pub fn as_f64(self) -> f64 {
		match self {
			Literal::Bool(b) => f64::from(u8::from(b)),
			Literal::Int(i) => i as f64,
			Literal::Float(f) => f,
		}
	}
}

/// What a constructor call does with its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructorKind {
	/// `float[3](a, b, c)`.
	Array,
	/// A vector or matrix built from several scalars and vectors, e.g. `float4(v.xy, 0, 1)`.
	Compound,
	/// A scalar converted to another scalar type, e.g. `int(x)`.
	ScalarCast,
	/// A vector or matrix converted component-wise to another component type, e.g. `int3(v)`.
	CompoundCast,
	/// A scalar replicated into every component of a vector, e.g. `float3(1)`.
	VectorSplat,
	/// A scalar placed on the diagonal of a matrix, e.g. `float2x2(1)`.
	DiagonalMatrix,
	/// A matrix built from a matrix of different dimensions, e.g. `float3x3(m4)`.
	MatrixResize,
	/// A struct built from one argument per field.
	Struct,
}

/// The components selected by a swizzle, each `0..=3`.
pub type Components = ArrayVec<[u8; 4]>;

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
	pub kind: ExpressionKind,
	pub ty: TypeHandle,
	pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
	Literal(Literal),
	Prefix {
		op: Operator,
		operand: Box<Expression>,
	},
	Postfix {
		op: Operator,
		operand: Box<Expression>,
	},
	Binary {
		left: Box<Expression>,
		op: Operator,
		right: Box<Expression>,
	},
	Conditional {
		condition: Box<Expression>,
		when_true: Box<Expression>,
		when_false: Box<Expression>,
	},
	VariableRef(VariableHandle),
	Index {
		base: Box<Expression>,
		index: Box<Expression>,
	},
	/// Access of a struct field. For a field of an anonymous interface block, `base` is a reference to the block
	/// variable itself.
	FieldAccess {
		base: Box<Expression>,
		field: u32,
		anonymous_block: bool,
	},
	Swizzle {
		base: Box<Expression>,
		components: Components,
	},
	Constructor {
		kind: ConstructorKind,
		arguments: Vec<Expression>,
	},
	FunctionCall {
		function: FunctionHandle,
		arguments: Vec<Expression>,
	},
	/// Stands in for an expression that failed to convert. An error has always been reported already.
	Poison,
}

impl Expression {
	pub fn new(kind: ExpressionKind, ty: TypeHandle, span: Span) -> Self {
		Self { kind, ty, span }
	}

	pub fn literal(value: Literal, ty: TypeHandle, span: Span) -> Self {
		Self::new(ExpressionKind::Literal(value), ty, span)
	}

	pub fn as_literal(&self) -> Option<Literal> {
		match self.kind {
			ExpressionKind::Literal(l) => Some(l),
			_ => None,
		}
	}

	pub fn is_poison(&self) -> bool {
		matches!(self.kind, ExpressionKind::Poison)
	}

	/// Returns whether evaluating this expression can modify state or have other observable effects.
	pub fn has_side_effects(&self, functions: &crate::arena::Arena<FunctionDecl>) -> bool {
		match &self.kind {
			ExpressionKind::Literal(_)
			| ExpressionKind::VariableRef(_)
			| ExpressionKind::Poison => false,
			ExpressionKind::Prefix { op, operand } => {
				matches!(op, Operator::Inc | Operator::Dec)
					|| operand.has_side_effects(functions)
			}
			ExpressionKind::Postfix { .. } => true,
			ExpressionKind::Binary { left, op, right } => {
				op.is_assignment()
					|| left.has_side_effects(functions)
					|| right.has_side_effects(functions)
			}
			ExpressionKind::Conditional {
				condition,
				when_true,
				when_false,
			} => {
				condition.has_side_effects(functions)
					|| when_true.has_side_effects(functions)
					|| when_false.has_side_effects(functions)
			}
			ExpressionKind::Index { base, index } => {
				base.has_side_effects(functions)
					|| index.has_side_effects(functions)
			}
			ExpressionKind::FieldAccess { base, .. }
			| ExpressionKind::Swizzle { base, .. } => {
				base.has_side_effects(functions)
			}
			ExpressionKind::Constructor { arguments, .. } => {
				arguments.iter().any(|a| a.has_side_effects(functions))
			}
			ExpressionKind::FunctionCall {
				function,
				arguments,
			} => {
				!functions[*function].modifiers.flags.contains(crate::modifiers::Flags::PURE)
					&& functions[*function].intrinsic.is_none()
					|| arguments.iter().any(|a| a.has_side_effects(functions))
			}
		}
	}
}

/// How a loop evaluates its condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
	/// `for (init; condition; step) body`
	For,
	/// `while (condition) body`; never has an initializer or step.
	While,
	/// `do body while (condition);` evaluates the condition after the body.
	DoWhile,
}

/// A `case` or `default` label of a switch, with the statements up to the next label.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
	/// `None` for `default`.
	pub value: Option<i64>,
	pub statements: Vec<Statement>,
	pub span: Span,
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
	pub kind: StatementKind,
	pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
	Block {
		statements: Vec<Statement>,
		/// Whether this block introduced a scope; a function body or a lowered declaration list does not print
		/// its own braces.
		scoped: bool,
	},
	If {
		condition: Expression,
		when_true: Box<Statement>,
		when_false: Option<Box<Statement>>,
	},
	For {
		kind: LoopKind,
		init: Option<Box<Statement>>,
		condition: Option<Expression>,
		step: Option<Expression>,
		body: Box<Statement>,
	},
	Switch {
		selector: Expression,
		cases: Vec<SwitchCase>,
	},
	Return(Option<Expression>),
	Break,
	Continue,
	Discard,
	VariableDecl {
		variable: VariableHandle,
		initializer: Option<Expression>,
	},
	Expression(Expression),
	Empty,
}

impl Statement {
	pub fn new(kind: StatementKind, span: Span) -> Self {
		Self { kind, span }
	}

	/// Returns whether control can never fall off the end of this statement.
	///
	/// This is a conservative syntactic check: a return, discard, or an `if` with an `else` where both branches
	/// never fall through.
	pub fn always_exits(&self) -> bool {
		match &self.kind {
			StatementKind::Return(_) | StatementKind::Discard => true,
			StatementKind::Block { statements, .. } => {
				statements.last().map_or(false, Statement::always_exits)
			}
			StatementKind::If {
				when_true,
				when_false: Some(when_false),
				..
			} => when_true.always_exits() && when_false.always_exits(),
			_ => false,
		}
	}
}

/// Where a variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
	Global,
	/// The instance variable of an interface block.
	InterfaceBlock,
	Parameter,
	Local,
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
	/// Empty for unnamed parameters and anonymous interface blocks.
	pub name: String,
	pub ty: TypeHandle,
	pub modifiers: Modifiers,
	pub storage: Storage,
	pub span: Span,
	/// The folded value of a `const` variable whose initializer is a literal.
	pub constant_value: Option<Literal>,
}

/// A builtin function with a fixed meaning that the code generators lower directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
	Abs,
	Sign,
	Floor,
	Ceil,
	Fract,
	Min,
	Max,
	Clamp,
	Mix,
	Step,
	SmoothStep,
	Sqrt,
	InverseSqrt,
	Pow,
	Exp,
	Log,
	Exp2,
	Log2,
	Sin,
	Cos,
	Tan,
	Length,
	Distance,
	Dot,
	Cross,
	Normalize,
	Reflect,
	Fma,
	Saturate,
}

/// A function parameter in a signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
	pub ty: TypeHandle,
	pub modifiers: Modifiers,
}

impl Parameter {
	/// Returns whether the argument is written back to the caller (`out` or `inout`).
	pub fn is_out(&self) -> bool {
		self.modifiers.flags.contains(crate::modifiers::Flags::OUT)
	}
}

/// A function signature, shared by all prototypes and the definition of the function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
	pub name: String,
	pub return_type: TypeHandle,
	pub parameters: Vec<Parameter>,
	pub modifiers: Modifiers,
	pub span: Span,
	/// Set for builtin functions.
	pub intrinsic: Option<Intrinsic>,
	/// Whether a body has been seen.
	pub defined: bool,
	/// The position of this function among the user functions of the program, in declaration order.
	pub ordinal: u32,
}

impl FunctionDecl {
	pub fn is_main(&self) -> bool {
		self.name == "main"
	}
}

/// A top-level element of a program.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramElement {
	StructDefinition {
		ty: TypeHandle,
		span: Span,
	},
	/// An interface block; `variable` is the block instance, possibly anonymous.
	InterfaceBlock {
		variable: VariableHandle,
		span: Span,
	},
	GlobalVariable {
		variable: VariableHandle,
		initializer: Option<Expression>,
		span: Span,
	},
	FunctionPrototype {
		function: FunctionHandle,
		span: Span,
	},
	FunctionDefinition {
		function: FunctionHandle,
		parameters: Vec<VariableHandle>,
		body: Statement,
		span: Span,
	},
}

impl ProgramElement {
	pub fn span(&self) -> Span {
		match self {
			ProgramElement::StructDefinition { span, .. }
			| ProgramElement::InterfaceBlock { span, .. }
			| ProgramElement::GlobalVariable { span, .. }
			| ProgramElement::FunctionPrototype { span, .. }
			| ProgramElement::FunctionDefinition { span, .. } => *span,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn compound_assignment_operators() {
		assert_eq!(Operator::ShlAssign.remove_assignment(), Operator::Shl);
		assert_eq!(Operator::Add.remove_assignment(), Operator::Add);
		assert!(Operator::XorAssign.is_assignment());
		assert!(!Operator::Eq.is_assignment());
		assert_eq!(Operator::XorAssign.symbol(), "^=");
	}

	#[test]
	fn precedence_order() {
		use precedence::*;
		let ladder = [
			Operator::Mul,
			Operator::Add,
			Operator::Shl,
			Operator::Lt,
			Operator::Eq,
			Operator::BitwiseAnd,
			Operator::BitwiseXor,
			Operator::BitwiseOr,
			Operator::LogicalAnd,
			Operator::LogicalXor,
			Operator::LogicalOr,
		];
		for pair in ladder.windows(2) {
			assert!(pair[0].binary_precedence() < pair[1].binary_precedence());
		}
		assert!(Operator::LogicalOr.binary_precedence() < CONDITIONAL);
		assert!(Operator::AddAssign.binary_precedence() == ASSIGNMENT);
		assert!(Operator::Comma.binary_precedence() == SEQUENCE);
	}
}
