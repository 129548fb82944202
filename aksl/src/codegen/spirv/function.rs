//! Function bodies: statements and expressions.
//!
//! Control flow is structured the way SPIR-V requires. Every selection has a merge block and every loop has a
//! header, a continue target and a merge block, declared up front. The generator tracks the block it is
//! writing into; once a block has been terminated by a branch, a return or a `discard`, nothing is written until
//! the next label opens a new block, so statements after a `return` are never generated.

use super::{instruction::WordBuffer, SpirvCodeGenerator};
use crate::{
	ast::{
		Components, ConstructorKind, Expression, ExpressionKind, FunctionHandle, Intrinsic, Literal, LoopKind,
		Operator, Statement, StatementKind, SwitchCase, VariableHandle,
	},
	fold,
	layout::MemoryLayout,
	modifiers::Flags,
	types::{ArraySize, ScalarKind, TypeHandle, TypeKind},
};
use rspirv::spirv::{FunctionControl, GLOp, LoopControl, Op, SelectionControl, StorageClass, Word};

/// Where a variable lives in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(in crate::codegen) struct Place {
	pub pointer: Word,
	pub storage: StorageClass,
	/// The memory layout of the variable type, for the members of blocks.
	pub layout: Option<MemoryLayout>,
}

/// A `break` or `continue` target.
#[derive(Debug, Clone, Copy)]
struct Target {
	label: Word,
	/// Whether anything branched to this target.
	used: bool,
}

/// The state of the function being generated.
#[derive(Debug, Default)]
pub(in crate::codegen) struct FunctionState {
	/// The local variables, which must all be declared at the start of the first block.
	variables: WordBuffer,
	body: WordBuffer,
	/// The label of the block being written into, or `None` if the last block has been terminated.
	block: Option<Word>,
	breaks: Vec<Target>,
	continues: Vec<Target>,
}

/// A pointer into memory whose access chain has not been written yet.
#[derive(Debug, Clone)]
struct Access {
	base: Word,
	storage: StorageClass,
	layout: Option<MemoryLayout>,
	indices: Vec<Word>,
	ty: TypeHandle,
}

/// The target of an assignment.
#[derive(Debug, Clone)]
enum LValue {
	Memory(Access),
	/// Some components of a vector in memory.
	Swizzle { vector: Access, components: Components },
}

impl<'p> SpirvCodeGenerator<'p> {
	/* INSTRUCTIONS */

	fn emit(&mut self, opcode: Op, operands: &[Word]) {
		debug_assert!(self.func.block.is_some(), "writing {opcode:?} outside of a block");
		self.func.body.write(opcode, operands);
	}

	/// Returns a fresh id for a value of type `ty`.
	fn value_id(&mut self, ty: TypeHandle) -> Word {
		let id = self.fresh_id();
		self.relaxed_precision(id, ty);
		id
	}

	/// Writes an instruction producing a value of type `ty` from `operands`.
	fn op_result(&mut self, opcode: Op, ty: TypeHandle, operands: &[Word]) -> Word {
		let type_id = self.type_id(ty);
		let id = self.value_id(ty);
		let mut words = Vec::with_capacity(operands.len() + 2);
		words.push(type_id);
		words.push(id);
		words.extend_from_slice(operands);
		self.emit(opcode, &words);
		id
	}

	fn op_result_id(&mut self, opcode: Op, type_id: Word, operands: &[Word]) -> Word {
		let id = self.fresh_id();
		let mut words = Vec::with_capacity(operands.len() + 2);
		words.push(type_id);
		words.push(id);
		words.extend_from_slice(operands);
		self.emit(opcode, &words);
		id
	}

	/// Opens a new block.
	fn label(&mut self, label: Word) {
		debug_assert!(self.func.block.is_none(), "the previous block was not terminated");
		self.func.body.write(Op::Label, &[label]);
		self.func.block = Some(label);
	}

	/// Terminates the current block with a branch to `target`. Returns whether there was a block to terminate.
	fn branch(&mut self, target: Word) -> bool {
		if self.func.block.is_none() {
			return false;
		}
		self.emit(Op::Branch, &[target]);
		self.func.block = None;
		true
	}

	fn branch_conditional(&mut self, condition: Word, when_true: Word, when_false: Word) {
		self.emit(Op::BranchConditional, &[condition, when_true, when_false]);
		self.func.block = None;
	}

	fn terminate(&mut self, opcode: Op, operands: &[Word]) {
		self.emit(opcode, operands);
		self.func.block = None;
	}

	/// Declares a function-local variable.
	fn local_variable(&mut self, ty: TypeHandle) -> Word {
		let type_id = self.type_id(ty);
		let pointer = self.pointer_type(type_id, StorageClass::Function);
		let id = self.fresh_id();
		self.func
			.variables
			.write(Op::Variable, &[pointer, id, StorageClass::Function as Word]);
		self.relaxed_precision(id, ty);
		id
	}

	fn temporary(&mut self, ty: TypeHandle) -> Access {
		Access {
			base: self.local_variable(ty),
			storage: StorageClass::Function,
			layout: None,
			indices: Vec::new(),
			ty,
		}
	}

	/* FUNCTIONS */

	pub(super) fn function_definition(
		&mut self,
		function: FunctionHandle,
		parameters: &'p [VariableHandle],
		body: &'p Statement,
	) {
		let program = self.program;
		let decl = &program.functions[function];
		let Some(&id) = self.function_ids.get(&function) else {
			return;
		};
		log::trace!("Generating function '{}' as %{id}", decl.name);

		let return_type = self.type_id(decl.return_type);
		let function_type = self.function_type(function);
		let mut control = FunctionControl::NONE;
		let flags = decl.modifiers.flags;
		if flags.contains(Flags::INLINE) {
			control |= FunctionControl::INLINE;
		}
		if flags.contains(Flags::NOINLINE) {
			control |= FunctionControl::DONT_INLINE;
		}
		if flags.contains(Flags::PURE) {
			control |= FunctionControl::PURE;
		}

		self.func = Default::default();
		let mut header = WordBuffer::default();
		header.write(Op::Function, &[return_type, id, control.bits(), function_type]);
		self.name(id, &decl.name);
		for &parameter in parameters {
			let variable = &program.variables[parameter];
			let type_id = self.type_id(variable.ty);
			let pointer = self.pointer_type(type_id, StorageClass::Function);
			let parameter_id = self.fresh_id();
			header.write(Op::FunctionParameter, &[pointer, parameter_id]);
			self.name(parameter_id, &variable.name);
			self.relaxed_precision(parameter_id, variable.ty);
			self.variables.insert(
				parameter,
				Place {
					pointer: parameter_id,
					storage: StorageClass::Function,
					layout: None,
				},
			);
		}
		let entry = self.fresh_id();
		header.write(Op::Label, &[entry]);
		self.func.block = Some(entry);

		if decl.is_main() && program.kind.requires_entry_point() {
			for (variable, initializer) in std::mem::take(&mut self.deferred_initializers) {
				let value = self.expression(initializer);
				if let Some(access) = self.variable_access(variable) {
					self.store(&access, value);
				}
			}
		}

		self.statement(body);
		if self.func.block.is_some() {
			if program.types.is_void(decl.return_type) {
				self.terminate(Op::Return, &[]);
			} else {
				self.terminate(Op::Unreachable, &[]);
			}
		}

		let mut state = std::mem::take(&mut self.func);
		self.functions.append(&mut header);
		self.functions.append(&mut state.variables);
		self.functions.append(&mut state.body);
		self.functions.write(Op::FunctionEnd, &[]);
	}

	/* STATEMENTS */

	fn statement(&mut self, statement: &'p Statement) {
		if self.func.block.is_none() {
			log::trace!("Skipping unreachable statement at {:?}", statement.span);
			return;
		}
		self.span = statement.span;
		match &statement.kind {
			StatementKind::Block { statements, .. } => {
				for statement in statements {
					self.statement(statement);
				}
			}
			StatementKind::If {
				condition,
				when_true,
				when_false,
			} => self.if_statement(condition, when_true, when_false.as_deref()),
			StatementKind::For {
				kind: LoopKind::DoWhile,
				condition,
				body,
				..
			} => self.do_while(condition.as_ref(), body),
			StatementKind::For {
				init,
				condition,
				step,
				body,
				..
			} => self.for_loop(init.as_deref(), condition.as_ref(), step.as_ref(), body),
			StatementKind::Switch { selector, cases } => self.switch(selector, cases),
			StatementKind::Return(Some(value)) => {
				let value = self.expression(value);
				self.terminate(Op::ReturnValue, &[value]);
			}
			StatementKind::Return(None) => self.terminate(Op::Return, &[]),
			StatementKind::Break => {
				if let Some(target) = self.func.breaks.last_mut() {
					target.used = true;
					let label = target.label;
					self.branch(label);
				}
			}
			StatementKind::Continue => {
				if let Some(target) = self.func.continues.last_mut() {
					target.used = true;
					let label = target.label;
					self.branch(label);
				}
			}
			StatementKind::Discard => self.terminate(Op::Kill, &[]),
			StatementKind::VariableDecl {
				variable,
				initializer,
			} => {
				let program = self.program;
				let decl = &program.variables[*variable];
				let id = self.local_variable(decl.ty);
				self.name(id, &decl.name);
				self.variables.insert(
					*variable,
					Place {
						pointer: id,
						storage: StorageClass::Function,
						layout: None,
					},
				);
				if let Some(initializer) = initializer {
					let value = self.expression(initializer);
					self.emit(Op::Store, &[id, value]);
				}
			}
			StatementKind::Expression(expr) => {
				self.expression(expr);
			}
			StatementKind::Empty => {}
		}
	}

	fn if_statement(&mut self, condition: &'p Expression, when_true: &'p Statement, when_false: Option<&'p Statement>) {
		let condition = self.expression(condition);
		let true_label = self.fresh_id();
		let merge = self.fresh_id();
		let false_label = if when_false.is_some() { self.fresh_id() } else { merge };
		self.emit(Op::SelectionMerge, &[merge, SelectionControl::NONE.bits()]);
		self.branch_conditional(condition, true_label, false_label);

		self.label(true_label);
		self.statement(when_true);
		let mut reachable = self.branch(merge);
		match when_false {
			Some(when_false) => {
				self.label(false_label);
				self.statement(when_false);
				reachable |= self.branch(merge);
			}
			None => reachable = true,
		}

		self.label(merge);
		if !reachable {
			self.terminate(Op::Unreachable, &[]);
		}
	}

	fn for_loop(
		&mut self,
		init: Option<&'p Statement>,
		condition: Option<&'p Expression>,
		step: Option<&'p Expression>,
		body: &'p Statement,
	) {
		if let Some(init) = init {
			self.statement(init);
		}
		let header = self.fresh_id();
		let check = self.fresh_id();
		let body_label = self.fresh_id();
		let continue_label = self.fresh_id();
		let merge = self.fresh_id();

		self.branch(header);
		self.label(header);
		self.emit(
			Op::LoopMerge,
			&[merge, continue_label, LoopControl::NONE.bits()],
		);
		self.branch(check);
		self.label(check);
		match condition {
			Some(condition) => {
				let condition = self.expression(condition);
				self.branch_conditional(condition, body_label, merge);
			}
			None => {
				self.branch(body_label);
			}
		}

		let (breaks, continues) = self.loop_body(body_label, continue_label, merge, body);
		self.label(continue_label);
		if continues {
			if let Some(step) = step {
				self.expression(step);
			}
		}
		self.branch(header);

		self.label(merge);
		if condition.is_none() && !breaks {
			self.terminate(Op::Unreachable, &[]);
		}
	}

	fn do_while(&mut self, condition: Option<&'p Expression>, body: &'p Statement) {
		let header = self.fresh_id();
		let body_label = self.fresh_id();
		let continue_label = self.fresh_id();
		let merge = self.fresh_id();

		self.branch(header);
		self.label(header);
		self.emit(
			Op::LoopMerge,
			&[merge, continue_label, LoopControl::NONE.bits()],
		);
		self.branch(body_label);

		let (breaks, continues) = self.loop_body(body_label, continue_label, merge, body);
		self.label(continue_label);
		let mut exits = breaks;
		match condition {
			Some(condition) if continues => {
				let condition = self.expression(condition);
				self.branch_conditional(condition, header, merge);
				exits = true;
			}
			_ => {
				self.branch(header);
			}
		}

		self.label(merge);
		if !exits {
			self.terminate(Op::Unreachable, &[]);
		}
	}

	/// Generates the body of a loop. Returns whether the loop is left with a `break`, and whether the continue
	/// target is reachable.
	fn loop_body(&mut self, label: Word, continue_label: Word, merge: Word, body: &'p Statement) -> (bool, bool) {
		self.func.breaks.push(Target {
			label: merge,
			used: false,
		});
		self.func.continues.push(Target {
			label: continue_label,
			used: false,
		});
		self.label(label);
		self.statement(body);
		let falls_through = self.branch(continue_label);
		let continue_target = self.func.continues.pop();
		let break_target = self.func.breaks.pop();
		(
			break_target.map_or(false, |t| t.used),
			falls_through || continue_target.map_or(false, |t| t.used),
		)
	}

	fn switch(&mut self, selector: &'p Expression, cases: &'p [SwitchCase]) {
		let selector = self.expression(selector);
		let merge = self.fresh_id();
		let labels = cases.iter().map(|_| self.fresh_id()).collect::<Vec<_>>();
		let default = cases
			.iter()
			.position(|c| c.value.is_none())
			.map_or(merge, |i| labels[i]);
		let mut operands = vec![selector, default];
		for (case, &label) in cases.iter().zip(&labels) {
			if let Some(value) = case.value {
				operands.push(value as Word);
				operands.push(label);
			}
		}
		self.emit(Op::SelectionMerge, &[merge, SelectionControl::NONE.bits()]);
		self.terminate(Op::Switch, &operands);

		self.func.breaks.push(Target {
			label: merge,
			used: false,
		});
		let mut falls_out = false;
		for (i, case) in cases.iter().enumerate() {
			self.label(labels[i]);
			for statement in &case.statements {
				self.statement(statement);
			}
			// Falls through into the next case.
			let next = labels.get(i + 1).copied().unwrap_or(merge);
			falls_out = self.branch(next);
		}
		let break_target = self.func.breaks.pop();

		self.label(merge);
		let reachable = default == merge || falls_out || break_target.map_or(false, |t| t.used);
		if !reachable {
			self.terminate(Op::Unreachable, &[]);
		}
	}

	/* MEMORY */

	fn variable_access(&mut self, variable: VariableHandle) -> Option<Access> {
		let program = self.program;
		let decl = &program.variables[variable];
		match self.variables.get(&variable) {
			Some(place) => Some(Access {
				base: place.pointer,
				storage: place.storage,
				layout: place.layout,
				indices: Vec::new(),
				ty: decl.ty,
			}),
			None => {
				let message = format!("variable '{}' is not available here", decl.name);
				self.error(self.span, message);
				None
			}
		}
	}

	/// Returns the memory an expression refers to, or `None` if it is not stored anywhere. Writes nothing in the
	/// latter case.
	fn access(&mut self, expr: &'p Expression) -> Option<Access> {
		match &expr.kind {
			ExpressionKind::VariableRef(variable) => {
				let access = self.variable_access(*variable);
				// Report a missing variable only once, as if it were memory.
				Some(access.unwrap_or(Access {
					base: 0,
					storage: StorageClass::Function,
					layout: None,
					indices: Vec::new(),
					ty: expr.ty,
				}))
			}
			ExpressionKind::FieldAccess { base, field, .. } => {
				let mut access = self.access(base)?;
				let index = self.int_constant(*field as i32);
				access.indices.push(index);
				access.ty = expr.ty;
				Some(access)
			}
			ExpressionKind::Index { base, index } => {
				let mut access = self.access(base)?;
				let index = self.expression(index);
				access.indices.push(index);
				access.ty = expr.ty;
				Some(access)
			}
			_ => None,
		}
	}

	fn lvalue(&mut self, expr: &'p Expression) -> Option<LValue> {
		match &expr.kind {
			ExpressionKind::Swizzle { base, components } => match self.lvalue(base)? {
				LValue::Memory(vector) => Some(LValue::Swizzle {
					vector,
					components: components.clone(),
				}),
				LValue::Swizzle {
					vector,
					components: inner,
				} => Some(LValue::Swizzle {
					vector,
					components: components.iter().map(|&c| inner[usize::from(c)]).collect(),
				}),
			},
			_ => self.access(expr).map(LValue::Memory),
		}
	}

	/// Returns a pointer to the memory of an access, writing the access chain if there is one.
	fn pointer(&mut self, access: &Access) -> Word {
		if access.indices.is_empty() {
			return access.base;
		}
		let type_id = self.write_type(access.ty, access.layout);
		let pointer_type = self.pointer_type(type_id, access.storage);
		let mut operands = vec![access.base];
		operands.extend(&access.indices);
		self.op_result_id(Op::AccessChain, pointer_type, &operands)
	}

	fn load(&mut self, access: &Access) -> Word {
		let pointer = self.pointer(access);
		let type_id = self.write_type(access.ty, access.layout);
		let id = self.op_result_id(Op::Load, type_id, &[pointer]);
		self.relaxed_precision(id, access.ty);
		self.relayout(id, access.ty, access.layout, None)
	}

	fn store(&mut self, access: &Access, value: Word) {
		let value = self.relayout(value, access.ty, None, access.layout);
		let pointer = self.pointer(access);
		self.emit(Op::Store, &[pointer, value]);
	}

	fn load_lvalue(&mut self, lvalue: &LValue, ty: TypeHandle) -> Word {
		match lvalue {
			LValue::Memory(access) => self.load(access),
			LValue::Swizzle { vector, components } => {
				let value = self.load(vector);
				self.swizzle(value, components, ty)
			}
		}
	}

	fn store_lvalue(&mut self, lvalue: &LValue, value: Word) {
		match lvalue {
			LValue::Memory(access) => self.store(access, value),
			LValue::Swizzle { vector, components } => {
				let old = self.load(vector);
				let new = if let [component] = components[..] {
					self.op_result(Op::CompositeInsert, vector.ty, &[value, old, Word::from(component)])
				} else {
					let size = Word::from(self.program.types.rows(vector.ty));
					let mut operands = vec![old, value];
					for i in 0..size {
						let replacement = components.iter().position(|&c| Word::from(c) == i);
						operands.push(replacement.map_or(i, |k| size + k as Word));
					}
					self.op_result(Op::VectorShuffle, vector.ty, &operands)
				};
				self.store(vector, new);
			}
		}
	}

	/// Converts a value between the representations of a type in two memory layouts. The member types of a
	/// struct or array differ when their strides or offsets do, so these are taken apart and put back together.
	fn relayout(
		&mut self,
		value: Word,
		ty: TypeHandle,
		from: Option<MemoryLayout>,
		to: Option<MemoryLayout>,
	) -> Word {
		let from_id = self.write_type(ty, from);
		let to_id = self.write_type(ty, to);
		if from_id == to_id {
			return value;
		}
		let program = self.program;
		let types = &program.types;
		let parts = match &types[ty].kind {
			TypeKind::Struct { fields, .. } => fields
				.iter()
				.enumerate()
				.map(|(i, field)| {
					let field_type = self.write_type(field.ty, from);
					let part = self.extract_id(value, field_type, &[i as Word]);
					self.relayout(part, field.ty, from, to)
				})
				.collect::<Vec<_>>(),
			TypeKind::Array {
				element,
				size: ArraySize::Fixed(n),
			} => (0..*n)
				.map(|i| {
					let element_type = self.write_type(*element, from);
					let part = self.extract_id(value, element_type, &[i]);
					self.relayout(part, *element, from, to)
				})
				.collect::<Vec<_>>(),
			_ => {
				let message = format!("type '{}' cannot be copied here", types.name(ty));
				self.error(self.span, message);
				return value;
			}
		};
		self.op_result_id(Op::CompositeConstruct, to_id, &parts)
	}

	/* EXPRESSIONS */

	pub(super) fn expression(&mut self, expr: &'p Expression) -> Word {
		let program = self.program;
		let types = &program.types;
		match &expr.kind {
			ExpressionKind::Literal(value) => self.constant(*value, expr.ty),
			ExpressionKind::VariableRef(_) | ExpressionKind::FieldAccess { .. } | ExpressionKind::Index { .. } => {
				if let Some(access) = self.access(expr) {
					return self.load(&access);
				}
				self.rvalue_access(expr)
			}
			ExpressionKind::Swizzle { base, components } => {
				let value = self.expression(base);
				if types.is_scalar(base.ty) {
					return match components.len() {
						1 => value,
						_ => self.splat(value, expr.ty),
					};
				}
				self.swizzle(value, components, expr.ty)
			}
			ExpressionKind::Prefix { op, operand } => match op {
				Operator::Sub => {
					let value = self.expression(operand);
					self.negate(value, expr.ty)
				}
				Operator::LogicalNot => {
					let value = self.expression(operand);
					self.op_result(Op::LogicalNot, expr.ty, &[value])
				}
				Operator::BitwiseNot => {
					let value = self.expression(operand);
					self.op_result(Op::Not, expr.ty, &[value])
				}
				Operator::Inc | Operator::Dec => self.increment(operand, *op, true),
				_ => self.expression(operand),
			},
			ExpressionKind::Postfix { op, operand } => self.increment(operand, *op, false),
			ExpressionKind::Binary { left, op, right } => self.binary(left, *op, right, expr.ty),
			ExpressionKind::Conditional {
				condition,
				when_true,
				when_false,
			} => self.conditional(condition, when_true, when_false, expr.ty),
			ExpressionKind::Constructor { kind, arguments } => self.constructor(*kind, arguments, expr.ty),
			ExpressionKind::FunctionCall { function, arguments } => {
				match program.functions[*function].intrinsic {
					Some(intrinsic) => self.intrinsic(intrinsic, arguments, expr.ty),
					None => self.call(*function, arguments, expr.ty),
				}
			}
			ExpressionKind::Poison => 0,
		}
	}

	/// Reads a field or an element of a value which is not in memory.
	fn rvalue_access(&mut self, expr: &'p Expression) -> Word {
		let program = self.program;
		let types = &program.types;
		match &expr.kind {
			ExpressionKind::FieldAccess { base, field, .. } => {
				let value = self.expression(base);
				self.extract(value, expr.ty, &[*field])
			}
			ExpressionKind::Index { base, index } => {
				let value = self.expression(base);
				if let Some(i) = fold::get_constant_int(index) {
					return self.extract(value, expr.ty, &[i as Word]);
				}
				let index = self.expression(index);
				if types.is_vector(base.ty) {
					return self.op_result(Op::VectorExtractDynamic, expr.ty, &[value, index]);
				}
				// Arrays and matrices can only be indexed dynamically in memory.
				let mut temporary = self.temporary(base.ty);
				self.store(&temporary, value);
				temporary.indices.push(index);
				temporary.ty = expr.ty;
				self.load(&temporary)
			}
			_ => 0,
		}
	}

	/// Returns the constituent of a composite at `indices`, taken apart at generation time where it is a constant.
	fn extract_id(&mut self, value: Word, type_id: Word, indices: &[Word]) -> Word {
		let mut value = value;
		let mut rest = indices;
		while let Some((&first, tail)) = rest.split_first() {
			let constituent = self
				.constant_constituents(value)
				.and_then(|c| c.get(first as usize))
				.copied();
			match constituent {
				Some(c) => {
					value = c;
					rest = tail;
				}
				None => break,
			}
		}
		if rest.is_empty() {
			return value;
		}
		let mut operands = vec![value];
		operands.extend_from_slice(rest);
		self.op_result_id(Op::CompositeExtract, type_id, &operands)
	}

	fn extract(&mut self, value: Word, ty: TypeHandle, indices: &[Word]) -> Word {
		let type_id = self.type_id(ty);
		self.extract_id(value, type_id, indices)
	}

	/// Builds a composite from its constituents; a constant if they all are.
	fn composite(&mut self, ty: TypeHandle, parts: Vec<Word>) -> Word {
		if !parts.is_empty() && parts.iter().all(|&p| self.is_constant(p)) {
			return self.constant_composite(ty, parts);
		}
		self.op_result(Op::CompositeConstruct, ty, &parts)
	}

	/// Replicates a scalar into every component of the vector type `ty`.
	fn splat(&mut self, value: Word, ty: TypeHandle) -> Word {
		let size = usize::from(self.program.types.rows(ty));
		self.composite(ty, vec![value; size])
	}

	/// Splits a scalar, vector or matrix into its scalar components, column by column.
	fn flatten(&mut self, value: Word, ty: TypeHandle) -> Vec<Word> {
		let program = self.program;
		let types = &program.types;
		let component = types.component(ty);
		if types.is_scalar(ty) {
			return vec![value];
		}
		let rows = Word::from(types.rows(ty));
		if types.is_matrix(ty) {
			let columns = Word::from(types.columns(ty));
			return (0..columns)
				.flat_map(|c| (0..rows).map(move |r| (c, r)))
				.map(|(c, r)| self.extract(value, component, &[c, r]))
				.collect();
		}
		(0..rows).map(|i| self.extract(value, component, &[i])).collect()
	}

	fn swizzle(&mut self, value: Word, components: &Components, ty: TypeHandle) -> Word {
		if let [component] = components[..] {
			return self.extract(value, ty, &[Word::from(component)]);
		}
		let mut operands = vec![value, value];
		operands.extend(components.iter().map(|&c| Word::from(c)));
		self.op_result(Op::VectorShuffle, ty, &operands)
	}

	fn negate(&mut self, value: Word, ty: TypeHandle) -> Word {
		let program = self.program;
		let types = &program.types;
		if let Some(column) = types.column(ty) {
			let columns = (0..Word::from(types.columns(ty)))
				.map(|c| {
					let column_value = self.extract(value, column, &[c]);
					self.negate(column_value, column)
				})
				.collect();
			return self.composite(ty, columns);
		}
		let opcode = match types.scalar(ty).map(|s| s.kind) {
			Some(ScalarKind::Float) => Op::FNegate,
			_ => Op::SNegate,
		};
		self.op_result(opcode, ty, &[value])
	}

	/// `++` and `--`, in prefix or postfix position.
	fn increment(&mut self, operand: &'p Expression, op: Operator, prefix: bool) -> Word {
		let Some(lvalue) = self.lvalue(operand) else {
			self.error(operand.span, "expression is not assignable");
			return 0;
		};
		let ty = operand.ty;
		let old = self.load_lvalue(&lvalue, ty);
		let one = self.splat_constant(Literal::Int(1), ty);
		let op = if op == Operator::Inc { Operator::Add } else { Operator::Sub };
		let new = self.arithmetic(op, old, ty, one, ty, ty);
		self.store_lvalue(&lvalue, new);
		if prefix {
			new
		} else {
			old
		}
	}

	fn binary(&mut self, left: &'p Expression, op: Operator, right: &'p Expression, ty: TypeHandle) -> Word {
		let program = self.program;
		match op {
			Operator::Comma => {
				self.expression(left);
				self.expression(right)
			}
			Operator::Assign => {
				let Some(lvalue) = self.lvalue(left) else {
					self.error(left.span, "expression is not assignable");
					return 0;
				};
				let value = self.expression(right);
				self.store_lvalue(&lvalue, value);
				value
			}
			op if op.is_assignment() => {
				let Some(lvalue) = self.lvalue(left) else {
					self.error(left.span, "expression is not assignable");
					return 0;
				};
				let old = self.load_lvalue(&lvalue, left.ty);
				let value = self.expression(right);
				let new = self.arithmetic(op.remove_assignment(), old, left.ty, value, right.ty, left.ty);
				self.store_lvalue(&lvalue, new);
				new
			}
			Operator::LogicalAnd | Operator::LogicalOr if right.has_side_effects(&program.functions) => {
				self.short_circuit(left, op, right)
			}
			Operator::LogicalAnd | Operator::LogicalOr | Operator::LogicalXor => {
				let l = self.expression(left);
				let r = self.expression(right);
				let opcode = match op {
					Operator::LogicalAnd => Op::LogicalAnd,
					Operator::LogicalOr => Op::LogicalOr,
					_ => Op::LogicalNotEqual,
				};
				self.op_result(opcode, ty, &[l, r])
			}
			op if op.is_comparison() => {
				let l = self.expression(left);
				let r = self.expression(right);
				self.compare(op, l, r, left.ty)
			}
			op => {
				let l = self.expression(left);
				let r = self.expression(right);
				self.arithmetic(op, l, left.ty, r, right.ty, ty)
			}
		}
	}

	/// `&&` and `||` whose right operand must only be evaluated when it decides the result.
	fn short_circuit(&mut self, left: &'p Expression, op: Operator, right: &'p Expression) -> Word {
		let boolean = self.program.types.builtin().bool;
		let l = self.expression(left);
		let start = self.func.block.unwrap_or_default();
		let rhs = self.fresh_id();
		let merge = self.fresh_id();
		self.emit(Op::SelectionMerge, &[merge, SelectionControl::NONE.bits()]);
		if op == Operator::LogicalAnd {
			self.branch_conditional(l, rhs, merge);
		} else {
			self.branch_conditional(l, merge, rhs);
		}
		self.label(rhs);
		let r = self.expression(right);
		let end = self.func.block.unwrap_or(rhs);
		self.branch(merge);
		self.label(merge);
		// Coming straight from the left operand, the result is the left operand.
		self.op_result(Op::Phi, boolean, &[l, start, r, end])
	}

	/// Applies an arithmetic or bitwise operator. Operand shapes may differ where the language allows it.
	fn arithmetic(
		&mut self,
		op: Operator,
		l: Word,
		left: TypeHandle,
		r: Word,
		right: TypeHandle,
		result: TypeHandle,
	) -> Word {
		let program = self.program;
		let types = &program.types;
		let kind = types.scalar(left).map_or(ScalarKind::Float, |s| s.kind);

		if op == Operator::Mul && kind == ScalarKind::Float {
			let linear_algebra = match (
				types.is_matrix(left),
				types.is_matrix(right),
				types.is_scalar(left),
				types.is_scalar(right),
			) {
				(true, true, ..) => Some((Op::MatrixTimesMatrix, l, r)),
				(true, false, _, false) => Some((Op::MatrixTimesVector, l, r)),
				(false, true, false, _) => Some((Op::VectorTimesMatrix, l, r)),
				(true, false, _, true) => Some((Op::MatrixTimesScalar, l, r)),
				(false, true, true, _) => Some((Op::MatrixTimesScalar, r, l)),
				(false, false, false, true) => Some((Op::VectorTimesScalar, l, r)),
				(false, false, true, false) => Some((Op::VectorTimesScalar, r, l)),
				_ => None,
			};
			if let Some((opcode, a, b)) = linear_algebra {
				return self.op_result(opcode, result, &[a, b]);
			}
		}

		if let Some(column) = types.column(result) {
			// Everything else on matrices is component-wise, one column at a time.
			let columns = (0..Word::from(types.columns(result)))
				.map(|c| {
					let lc = if types.is_matrix(left) {
						self.extract(l, column, &[c])
					} else {
						self.splat(l, column)
					};
					let rc = if types.is_matrix(right) {
						self.extract(r, column, &[c])
					} else {
						self.splat(r, column)
					};
					self.arithmetic(op, lc, column, rc, column, column)
				})
				.collect();
			return self.composite(result, columns);
		}

		let shift = matches!(op, Operator::Shl | Operator::Shr);
		let (mut l, mut r) = (l, r);
		if types.is_scalar(left) && !types.is_scalar(right) {
			l = self.splat(l, result);
		}
		if !types.is_scalar(left) && types.is_scalar(right) {
			let shape = if shift {
				types
					.vector(types.component(right), types.rows(left))
					.unwrap_or(right)
			} else {
				result
			};
			r = self.splat(r, shape);
		}

		let opcode = match (op, kind) {
			(Operator::Add, ScalarKind::Float) => Op::FAdd,
			(Operator::Add, _) => Op::IAdd,
			(Operator::Sub, ScalarKind::Float) => Op::FSub,
			(Operator::Sub, _) => Op::ISub,
			(Operator::Mul, ScalarKind::Float) => Op::FMul,
			(Operator::Mul, _) => Op::IMul,
			(Operator::Div, ScalarKind::Float) => Op::FDiv,
			(Operator::Div, ScalarKind::Unsigned) => Op::UDiv,
			(Operator::Div, _) => Op::SDiv,
			(Operator::Rem, ScalarKind::Float) => Op::FMod,
			(Operator::Rem, ScalarKind::Unsigned) => Op::UMod,
			(Operator::Rem, _) => Op::SMod,
			(Operator::Shl, _) => Op::ShiftLeftLogical,
			(Operator::Shr, ScalarKind::Signed) => Op::ShiftRightArithmetic,
			(Operator::Shr, _) => Op::ShiftRightLogical,
			(Operator::BitwiseAnd, _) => Op::BitwiseAnd,
			(Operator::BitwiseOr, _) => Op::BitwiseOr,
			(Operator::BitwiseXor, _) => Op::BitwiseXor,
			_ => {
				self.error(self.span, format!("operator '{}' is not supported here", op.symbol()));
				return 0;
			}
		};
		self.op_result(opcode, result, &[l, r])
	}

	/// Compares two values of type `ty`, producing a single `bool`.
	fn compare(&mut self, op: Operator, l: Word, r: Word, ty: TypeHandle) -> Word {
		let program = self.program;
		let types = &program.types;
		let b = types.builtin();
		if types.is_array(ty) || types.is_struct(ty) {
			let message = format!("comparison of '{}' values is not supported", types.name(ty));
			self.error(self.span, message);
			return 0;
		}
		if let Some(column) = types.column(ty) {
			let mut combined = None;
			for c in 0..Word::from(types.columns(ty)) {
				let lc = self.extract(l, column, &[c]);
				let rc = self.extract(r, column, &[c]);
				let equal = self.compare(op, lc, rc, column);
				combined = Some(match combined {
					None => equal,
					Some(previous) => {
						let opcode = if op == Operator::Eq { Op::LogicalAnd } else { Op::LogicalOr };
						self.op_result(opcode, b.bool, &[previous, equal])
					}
				});
			}
			return combined.unwrap_or_default();
		}

		let kind = types.scalar(ty).map_or(ScalarKind::Float, |s| s.kind);
		let opcode = match (op, kind) {
			(Operator::Eq, ScalarKind::Boolean) => Op::LogicalEqual,
			(Operator::Ne, ScalarKind::Boolean) => Op::LogicalNotEqual,
			(Operator::Eq, ScalarKind::Float) => Op::FOrdEqual,
			(Operator::Ne, ScalarKind::Float) => Op::FUnordNotEqual,
			(Operator::Eq, _) => Op::IEqual,
			(Operator::Ne, _) => Op::INotEqual,
			(Operator::Lt, ScalarKind::Float) => Op::FOrdLessThan,
			(Operator::Lt, ScalarKind::Unsigned) => Op::ULessThan,
			(Operator::Lt, _) => Op::SLessThan,
			(Operator::Gt, ScalarKind::Float) => Op::FOrdGreaterThan,
			(Operator::Gt, ScalarKind::Unsigned) => Op::UGreaterThan,
			(Operator::Gt, _) => Op::SGreaterThan,
			(Operator::Le, ScalarKind::Float) => Op::FOrdLessThanEqual,
			(Operator::Le, ScalarKind::Unsigned) => Op::ULessThanEqual,
			(Operator::Le, _) => Op::SLessThanEqual,
			(Operator::Ge, ScalarKind::Float) => Op::FOrdGreaterThanEqual,
			(Operator::Ge, ScalarKind::Unsigned) => Op::UGreaterThanEqual,
			(_, _) => Op::SGreaterThanEqual,
		};
		if types.is_vector(ty) {
			let vector = types.vector(b.bool, types.rows(ty)).unwrap_or(b.bool);
			let components = self.op_result(opcode, vector, &[l, r]);
			let reduce = if op == Operator::Eq { Op::All } else { Op::Any };
			return self.op_result(reduce, b.bool, &[components]);
		}
		self.op_result(opcode, b.bool, &[l, r])
	}

	fn conditional(
		&mut self,
		condition: &'p Expression,
		when_true: &'p Expression,
		when_false: &'p Expression,
		ty: TypeHandle,
	) -> Word {
		let program = self.program;
		let types = &program.types;
		let pure = !when_true.has_side_effects(&program.functions)
			&& !when_false.has_side_effects(&program.functions);
		let c = self.expression(condition);
		if pure && (types.is_scalar(ty) || types.is_vector(ty)) {
			let a = self.expression(when_true);
			let b = self.expression(when_false);
			let c = match types.vector(types.builtin().bool, types.rows(ty)) {
				Some(vector) if types.is_vector(ty) => self.splat(c, vector),
				_ => c,
			};
			return self.op_result(Op::Select, ty, &[c, a, b]);
		}

		let true_label = self.fresh_id();
		let false_label = self.fresh_id();
		let merge = self.fresh_id();
		self.emit(Op::SelectionMerge, &[merge, SelectionControl::NONE.bits()]);
		self.branch_conditional(c, true_label, false_label);
		self.label(true_label);
		let a = self.expression(when_true);
		let a_block = self.func.block.unwrap_or(true_label);
		self.branch(merge);
		self.label(false_label);
		let b = self.expression(when_false);
		let b_block = self.func.block.unwrap_or(false_label);
		self.branch(merge);
		self.label(merge);
		self.op_result(Op::Phi, ty, &[a, a_block, b, b_block])
	}

	fn constructor(&mut self, kind: ConstructorKind, arguments: &'p [Expression], ty: TypeHandle) -> Word {
		let program = self.program;
		let types = &program.types;
		let values = arguments.iter().map(|a| self.expression(a)).collect::<Vec<_>>();
		let Some(&first) = values.first() else {
			return 0;
		};
		let first_type = arguments[0].ty;
		match kind {
			ConstructorKind::Array | ConstructorKind::Struct => self.composite(ty, values),
			ConstructorKind::ScalarCast | ConstructorKind::CompoundCast => self.convert(first, first_type, ty),
			ConstructorKind::VectorSplat => {
				let value = self.convert(first, first_type, types.component(ty));
				self.splat(value, ty)
			}
			ConstructorKind::Compound => {
				let constant = values.iter().all(|&v| self.is_constant(v));
				if types.is_vector(ty) && !constant {
					return self.op_result(Op::CompositeConstruct, ty, &values);
				}
				let scalars = values
					.iter()
					.zip(arguments)
					.flat_map(|(&v, a)| self.flatten(v, a.ty))
					.collect::<Vec<_>>();
				match types.column(ty) {
					Some(column) => {
						let rows = usize::from(types.rows(ty));
						let columns = scalars
							.chunks(rows)
							.map(|chunk| self.composite(column, chunk.to_vec()))
							.collect();
						self.composite(ty, columns)
					}
					None => self.composite(ty, scalars),
				}
			}
			ConstructorKind::DiagonalMatrix => {
				let component = types.component(ty);
				let value = self.convert(first, first_type, component);
				let zero = self.constant(Literal::Int(0), component);
				self.matrix_from(ty, |c, r| Some(if c == r { value } else { zero }))
			}
			ConstructorKind::MatrixResize => {
				let component = types.component(ty);
				let (columns, rows) = (Word::from(types.columns(first_type)), Word::from(types.rows(first_type)));
				let one = self.constant(Literal::Int(1), component);
				let zero = self.constant(Literal::Int(0), component);
				let mut parts = Vec::new();
				for c in 0..Word::from(types.columns(ty)) {
					for r in 0..Word::from(types.rows(ty)) {
						parts.push(if c < columns && r < rows {
							self.extract(first, component, &[c, r])
						} else if c == r {
							one
						} else {
							zero
						});
					}
				}
				self.matrix_from(ty, |c, r| parts.get((c * Word::from(types.rows(ty)) + r) as usize).copied())
			}
		}
	}

	/// Builds a matrix of type `ty` from the value at each column and row.
	fn matrix_from(&mut self, ty: TypeHandle, element: impl Fn(Word, Word) -> Option<Word>) -> Word {
		let program = self.program;
		let types = &program.types;
		let Some(column) = types.column(ty) else {
			return 0;
		};
		let columns = (0..Word::from(types.columns(ty)))
			.map(|c| {
				let parts = (0..Word::from(types.rows(ty)))
					.map(|r| element(c, r).unwrap_or_default())
					.collect();
				self.composite(column, parts)
			})
			.collect();
		self.composite(ty, columns)
	}

	/// Converts a value to another component type of the same shape.
	fn convert(&mut self, value: Word, from: TypeHandle, to: TypeHandle) -> Word {
		if self.type_id(from) == self.type_id(to) {
			return value;
		}
		let program = self.program;
		let types = &program.types;
		if let (Some(from_column), Some(to_column)) = (types.column(from), types.column(to)) {
			let columns = (0..Word::from(types.columns(from)))
				.map(|c| {
					let column = self.extract(value, from_column, &[c]);
					self.convert(column, from_column, to_column)
				})
				.collect();
			return self.composite(to, columns);
		}

		let from_kind = types.scalar(from).map_or(ScalarKind::Float, |s| s.kind);
		let to_kind = types.scalar(to).map_or(ScalarKind::Float, |s| s.kind);
		match (from_kind, to_kind) {
			(ScalarKind::Boolean, _) => {
				let one = self.splat_constant(Literal::Int(1), to);
				let zero = self.splat_constant(Literal::Int(0), to);
				self.op_result(Op::Select, to, &[value, one, zero])
			}
			(_, ScalarKind::Boolean) => {
				let zero = self.splat_constant(Literal::Int(0), from);
				let opcode = if from_kind == ScalarKind::Float {
					Op::FUnordNotEqual
				} else {
					Op::INotEqual
				};
				self.op_result(opcode, to, &[value, zero])
			}
			(ScalarKind::Float, ScalarKind::Signed) => self.op_result(Op::ConvertFToS, to, &[value]),
			(ScalarKind::Float, ScalarKind::Unsigned) => self.op_result(Op::ConvertFToU, to, &[value]),
			(ScalarKind::Signed, ScalarKind::Float) => self.op_result(Op::ConvertSToF, to, &[value]),
			(ScalarKind::Unsigned, ScalarKind::Float) => self.op_result(Op::ConvertUToF, to, &[value]),
			(ScalarKind::Float, ScalarKind::Float) => value,
			_ => self.op_result(Op::Bitcast, to, &[value]),
		}
	}

	fn intrinsic(&mut self, intrinsic: Intrinsic, arguments: &'p [Expression], ty: TypeHandle) -> Word {
		let program = self.program;
		let types = &program.types;
		let mut values = arguments.iter().map(|a| self.expression(a)).collect::<Vec<_>>();
		let Some(first) = arguments.first() else {
			return 0;
		};
		let kind = types.scalar(first.ty).map_or(ScalarKind::Float, |s| s.kind);
		let float = kind == ScalarKind::Float;

		use Intrinsic as I;
		let op = match (intrinsic, kind) {
			(I::Dot, _) if types.is_scalar(first.ty) => {
				return self.op_result(Op::FMul, ty, &values);
			}
			(I::Dot, _) => return self.op_result(Op::Dot, ty, &values),
			(I::Abs, ScalarKind::Unsigned) => return values[0],
			(I::Abs, _) if float => GLOp::FAbs,
			(I::Abs, _) => GLOp::SAbs,
			(I::Sign, _) if float => GLOp::FSign,
			(I::Sign, _) => GLOp::SSign,
			(I::Min, ScalarKind::Float) => GLOp::FMin,
			(I::Min, ScalarKind::Unsigned) => GLOp::UMin,
			(I::Min, _) => GLOp::SMin,
			(I::Max, ScalarKind::Float) => GLOp::FMax,
			(I::Max, ScalarKind::Unsigned) => GLOp::UMax,
			(I::Max, _) => GLOp::SMax,
			(I::Clamp, ScalarKind::Float) => GLOp::FClamp,
			(I::Clamp, ScalarKind::Unsigned) => GLOp::UClamp,
			(I::Clamp, _) => GLOp::SClamp,
			(I::Saturate, _) => {
				values.push(self.splat_constant(Literal::Int(0), ty));
				values.push(self.splat_constant(Literal::Int(1), ty));
				GLOp::FClamp
			}
			(I::Floor, _) => GLOp::Floor,
			(I::Ceil, _) => GLOp::Ceil,
			(I::Fract, _) => GLOp::Fract,
			(I::Mix, _) => GLOp::FMix,
			(I::Step, _) => GLOp::Step,
			(I::SmoothStep, _) => GLOp::SmoothStep,
			(I::Sqrt, _) => GLOp::Sqrt,
			(I::InverseSqrt, _) => GLOp::InverseSqrt,
			(I::Pow, _) => GLOp::Pow,
			(I::Exp, _) => GLOp::Exp,
			(I::Log, _) => GLOp::Log,
			(I::Exp2, _) => GLOp::Exp2,
			(I::Log2, _) => GLOp::Log2,
			(I::Sin, _) => GLOp::Sin,
			(I::Cos, _) => GLOp::Cos,
			(I::Tan, _) => GLOp::Tan,
			(I::Length, _) => GLOp::Length,
			(I::Distance, _) => GLOp::Distance,
			(I::Cross, _) => GLOp::Cross,
			(I::Normalize, _) => GLOp::Normalize,
			(I::Reflect, _) => GLOp::Reflect,
			(I::Fma, _) => GLOp::Fma,
		};

		let componentwise = !matches!(
			intrinsic,
			I::Length | I::Distance | I::Cross | I::Normalize | I::Reflect
		);
		if componentwise && types.is_vector(ty) {
			for (value, argument) in values.iter_mut().zip(arguments) {
				if types.is_scalar(argument.ty) {
					*value = self.splat(*value, ty);
				}
			}
		}
		let mut operands = vec![self.glsl_std_450, op as Word];
		operands.extend(values);
		self.op_result(Op::ExtInst, ty, &operands)
	}

	/// Calls a user function. Arguments are passed in temporary variables, which `out` arguments are copied back
	/// from after the call.
	fn call(&mut self, function: FunctionHandle, arguments: &'p [Expression], ty: TypeHandle) -> Word {
		let program = self.program;
		let decl = &program.functions[function];
		let Some(&callee) = self.function_ids.get(&function) else {
			let message = format!("function '{}' is not defined", decl.name);
			self.error(self.span, message);
			return 0;
		};
		let mut pointers = Vec::with_capacity(arguments.len());
		let mut writebacks = Vec::new();
		for (parameter, argument) in decl.parameters.iter().zip(arguments) {
			let temporary = self.temporary(parameter.ty);
			if parameter.is_out() {
				let Some(lvalue) = self.lvalue(argument) else {
					self.error(argument.span, "expression is not assignable");
					continue;
				};
				if parameter.modifiers.flags.contains(Flags::IN) {
					let value = self.load_lvalue(&lvalue, argument.ty);
					self.store(&temporary, value);
				}
				writebacks.push((temporary.clone(), lvalue));
			} else {
				let value = self.expression(argument);
				self.store(&temporary, value);
			}
			pointers.push(temporary.base);
		}

		let type_id = self.type_id(ty);
		let id = self.value_id(ty);
		let mut operands = vec![type_id, id, callee];
		operands.extend(pointers);
		self.emit(Op::FunctionCall, &operands);
		for (temporary, lvalue) in writebacks {
			let value = self.load(&temporary);
			self.store_lvalue(&lvalue, value);
		}
		id
	}
}

#[cfg(test)]
mod tests {
	use super::super::tests::{count, errors, generate, instructions};
	use crate::options::ShaderKind;
	use rspirv::{dr, spirv::Op};

	#[test]
	fn short_circuit_only_branches_for_side_effects() {
		let module = generate(
			ShaderKind::Fragment,
			"bool check(inout int n) { n++; return n > 2; }
			void main() {
				int n = 0;
				bool a = n > 1 && n < 5;
				bool b = n > 1 || check(n);
			}",
		);
		assert_eq!(count(&module, Op::LogicalAnd), 1);
		assert_eq!(count(&module, Op::LogicalOr), 0);
		assert_eq!(count(&module, Op::Phi), 1);
		assert_eq!(count(&module, Op::SelectionMerge), 1);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn conditionals() {
		let module = generate(
			ShaderKind::Fragment,
			"int bump(inout int n) { n++; return n; }
			void main() {
				int n = 1;
				float x = n > 1 ? 1.0 : 2.0;
				float3 v = n > 1 ? float3(1.0) : float3(0.0);
				int y = n > 2 ? bump(n) : 0;
			}",
		);
		assert_eq!(count(&module, Op::Select), 2);
		assert_eq!(count(&module, Op::Phi), 1);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn loops() {
		let module = generate(
			ShaderKind::Fragment,
			"void main() {
				int total = 0;
				for (int i = 0; i < 4; i++) { if (i == 2) continue; total += i; }
				while (total > 0) { total--; if (total == 3) break; }
				do { total++; } while (total < 10);
			}",
		);
		assert_eq!(count(&module, Op::LoopMerge), 3);
		assert_eq!(count(&module, Op::SelectionMerge), 2);
		assert_eq!(count(&module, Op::Unreachable), 0);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn switch_falls_through() {
		let module = generate(
			ShaderKind::Fragment,
			"void main() {
				int n = 2;
				switch (n) {
					case 1:
					case 2:
						n = 5;
						break;
					case -1:
						n = 6;
					default:
						n = 7;
				}
			}",
		);
		let switch = instructions(&module)
			.into_iter()
			.find(|(op, _)| *op == Op::Switch as u32)
			.unwrap();
		// Selector, default, then three literal/label pairs.
		assert_eq!(switch.1.len(), 2 + 3 * 2);
		assert_eq!(switch.1[2], 1);
		assert_eq!(switch.1[4], 2);
		assert_eq!(switch.1[6], u32::MAX);
	}

	#[test]
	fn code_after_return_is_skipped() {
		let module = generate(
			ShaderKind::Fragment,
			"float pick(bool b) { if (b) { return 1.0; } else { return 2.0; } }
			void main() { float x = pick(true); return; x = 3.0; }",
		);
		assert_eq!(count(&module, Op::Unreachable), 1);
		assert_eq!(count(&module, Op::ReturnValue), 2);
		// The only store in main initializes `x`, after the argument is stored in a temporary.
		assert_eq!(count(&module, Op::Store), 2);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn matrix_arithmetic() {
		let module = generate(
			ShaderKind::Vertex,
			"void main() {
				float2x2 m = float2x2(1.0);
				float2 v = m * float2(1.0, 2.0);
				float2x2 n = m + m;
				float2x2 s = m * 2.0;
				float2 w = -v;
			}",
		);
		assert_eq!(count(&module, Op::MatrixTimesVector), 1);
		assert_eq!(count(&module, Op::MatrixTimesScalar), 1);
		assert_eq!(count(&module, Op::FAdd), 2);
		assert_eq!(count(&module, Op::FNegate), 1);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn out_parameters_are_written_back() {
		let module = generate(
			ShaderKind::Fragment,
			"void set(out float x) { x = 1.0; }
			void main() { float a = 0.0; set(a); }",
		);
		assert_eq!(count(&module, Op::FunctionCall), 1);
		assert_eq!(count(&module, Op::FunctionParameter), 1);
		// `a = 0.0`, `x = 1.0`, and the copy back into `a`.
		assert_eq!(count(&module, Op::Store), 3);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn conversions() {
		let module = generate(
			ShaderKind::Fragment,
			"void main() {
				int i = 3;
				float f = float(i);
				uint u = uint(i);
				bool b = bool(i);
				int j = int(b);
				half h = half(f);
			}",
		);
		assert_eq!(count(&module, Op::ConvertSToF), 1);
		assert_eq!(count(&module, Op::Bitcast), 1);
		assert_eq!(count(&module, Op::INotEqual), 1);
		assert_eq!(count(&module, Op::Select), 1);
		assert_eq!(count(&module, Op::FConvert), 0);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn intrinsics_use_the_extended_instruction_set() {
		let module = generate(
			ShaderKind::Fragment,
			"void main() {
				float3 v = float3(0.5, 1.5, -1.0);
				float l = length(v);
				float3 c = clamp(v, 0.0, 1.0);
				float s = saturate(l);
				float d = dot(v, v);
				float m = fma(l, s, d);
			}",
		);
		assert_eq!(count(&module, Op::ExtInst), 4);
		assert_eq!(count(&module, Op::Dot), 1);
		assert_eq!(count(&module, Op::ExtInstImport), 1);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn swizzle_assignment() {
		let module = generate(
			ShaderKind::Fragment,
			"void main() { float4 v = float4(0.0); v.zx = float2(1.0, 2.0); v.y = 3.0; float2 w = v.wy; }",
		);
		assert_eq!(count(&module, Op::VectorShuffle), 2);
		assert_eq!(count(&module, Op::CompositeInsert), 1);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn block_members_are_read_through_access_chains() {
		let module = generate(
			ShaderKind::Fragment,
			"uniform Globals { float4 tint; float scale; };
			layout(location = 0) out float4 color;
			void main() { color = tint * scale; }",
		);
		assert_eq!(count(&module, Op::AccessChain), 2);
		assert_eq!(count(&module, Op::VectorTimesScalar), 1);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn laid_out_structs_are_copied_member_by_member() {
		let module = generate(
			ShaderKind::Fragment,
			"struct Samples { float weights[2]; };
			uniform Block { Samples samples; };
			void main() { Samples s = samples; }",
		);
		// Two for the array and one for the struct.
		assert_eq!(count(&module, Op::CompositeConstruct), 2);
		assert_eq!(count(&module, Op::CompositeExtract), 3);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn global_initializers() {
		let module = generate(
			ShaderKind::Fragment,
			"float k = 2.0; float g = sin(k); void main() { float x = g; }",
		);
		// `k` is initialized in its declaration, `g` at the start of main.
		let variables = instructions(&module)
			.into_iter()
			.filter(|(op, _)| *op == Op::Variable as u32)
			.map(|(_, operands)| operands.len())
			.collect::<Vec<_>>();
		assert_eq!(variables, [4, 3, 3]);
		assert_eq!(count(&module, Op::ExtInst), 1);

		assert_eq!(
			errors(ShaderKind::Base, "float k = 2.0; float g = sin(k);"),
			["initializer of global variable 'g' must be a constant expression"]
		);
	}
}
