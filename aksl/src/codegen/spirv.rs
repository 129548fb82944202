//! The SPIR-V generator.
//!
//! The module is built in four streams which are concatenated at the end in the order SPIR-V requires: debug
//! names, decorations, types/constants/global variables, and function bodies. The capabilities, the extended
//! instruction import, the memory model, the entry point and its execution modes go in front of them.
//!
//! Every type, constant and decoration goes through an instruction cache, so an identical instruction is only
//! ever written once and always yields the same id. A reverse cache maps ids back to their instruction, which
//! lets constant composites be taken apart at generation time.
//!
//! Struct types are the exception to deduplication: the same struct may be needed without a memory layout, and
//! with the std140 or std430 layout, and each version carries its own `Offset` decorations. These live in a
//! separate struct table.

mod function;
mod instruction;

use self::{
	function::{FunctionState, Place},
	instruction::{string_words, Instruction, ResultKind, WordBuffer},
};
use super::CodeGenerator;
use crate::{
	ast::{Expression, ExpressionKind, FunctionHandle, Literal, ProgramElement, Storage, VariableHandle},
	diag::{DiagKind, Diagnostics},
	error::CompileError,
	layout::{MemoryLayout, OffsetError},
	modifiers::{builtin, Flags, LayoutFlags, Modifiers},
	options::{ShaderKind, SpirvVersion},
	program::Program,
	types::{ArraySize, ScalarKind, TypeHandle, TypeKind},
	Span,
};
use rspirv::spirv::{
	self, AddressingModel, Capability, Decoration, ExecutionMode, ExecutionModel, LinkageType,
	MemoryModel, Op, StorageClass, Word,
};
use std::collections::{BTreeSet, HashMap};

/// The generator id written to the module header. Zero means "unregistered".
const GENERATOR_MAGIC_NUMBER: Word = 0;

/// A generated SPIR-V module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpirvModule {
	words: Vec<Word>,
}

impl SpirvModule {
	/// Returns the module as words, header first.
	pub fn words(&self) -> &[Word] {
		&self.words
	}

	pub fn into_words(self) -> Vec<Word> {
		self.words
	}

	/// Returns the module as bytes, each word in host byte order.
	pub fn to_bytes(&self) -> Vec<u8> {
		self.words.iter().flat_map(|w| w.to_ne_bytes()).collect()
	}
}

/// Which stream a cached instruction is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
	Names,
	Decorations,
	Constants,
}

/// Generates a SPIR-V module.
pub struct SpirvCodeGenerator<'p> {
	program: &'p Program,
	version: SpirvVersion,
	/// The next free id. Ids start at `1`; `0` is never a valid id.
	next_id: Word,
	glsl_std_450: Word,
	capabilities: BTreeSet<Word>,
	extensions: BTreeSet<&'static str>,
	execution_modes: Vec<(ExecutionMode, Vec<Word>)>,

	names: WordBuffer,
	decorations: WordBuffer,
	constants: WordBuffer,
	functions: WordBuffer,

	op_cache: HashMap<Instruction, Word>,
	id_cache: HashMap<Word, Instruction>,
	/// The ids of a struct type: without a layout at `[0]`, std140 at `[1]`, std430 at `[2]`. A `0` is an empty
	/// slot.
	struct_table: HashMap<TypeHandle, [Word; 3]>,

	variables: HashMap<VariableHandle, Place>,
	function_ids: HashMap<FunctionHandle, Word>,
	/// Global variables which have to be listed on the entry point.
	interface: Vec<Word>,
	/// Global variables whose initializers are stored at the start of the entry point.
	deferred_initializers: Vec<(VariableHandle, &'p Expression)>,
	func: FunctionState,

	/// The span errors are reported at.
	span: Span,
	diagnostics: Diagnostics,
}

impl<'p> SpirvCodeGenerator<'p> {
	pub fn new(program: &'p Program, version: SpirvVersion) -> Self {
		Self {
			program,
			version,
			next_id: 1,
			glsl_std_450: 0,
			capabilities: BTreeSet::new(),
			extensions: BTreeSet::new(),
			execution_modes: Vec::new(),
			names: WordBuffer::default(),
			decorations: WordBuffer::default(),
			constants: WordBuffer::default(),
			functions: WordBuffer::default(),
			op_cache: HashMap::new(),
			id_cache: HashMap::new(),
			struct_table: HashMap::new(),
			variables: HashMap::new(),
			function_ids: HashMap::new(),
			interface: Vec::new(),
			deferred_initializers: Vec::new(),
			func: FunctionState::default(),
			span: Span::default(),
			diagnostics: Diagnostics::new(),
		}
	}

	fn error(&mut self, span: Span, message: impl Into<String>) {
		self.diagnostics.error(DiagKind::Semantic, span, message);
	}

	fn fresh_id(&mut self) -> Word {
		let id = self.next_id;
		self.next_id += 1;
		id
	}

	fn section(&mut self, section: Section) -> &mut WordBuffer {
		match section {
			Section::Names => &mut self.names,
			Section::Decorations => &mut self.decorations,
			Section::Constants => &mut self.constants,
		}
	}

	/// Writes an instruction unless an identical one has been written before, and returns its result id.
	fn cached(&mut self, section: Section, instruction: Instruction) -> Word {
		if let Some(&id) = self.op_cache.get(&instruction) {
			log::trace!("Instruction cache hit: {id}");
			return id;
		}
		let id = match instruction.kind() {
			ResultKind::None => 0,
			_ => self.fresh_id(),
		};
		self.section(section).write_instruction(&instruction, id);
		match instruction.kind() {
			ResultKind::None => {
				self.op_cache.insert(instruction, id);
			}
			ResultKind::Unique => {
				self.id_cache.insert(id, instruction);
			}
			ResultKind::Default | ResultKind::Keyed(_) => {
				self.op_cache.insert(instruction.clone(), id);
				self.id_cache.insert(id, instruction);
			}
		}
		id
	}

	/// Returns the constituents of a constant composite, or `None` if the id is not one.
	fn constant_constituents(&self, id: Word) -> Option<&[Word]> {
		self.id_cache
			.get(&id)
			.filter(|i| i.is(Op::ConstantComposite))
			.map(|i| &i.operands_after_result()[..])
	}

	fn is_constant(&self, id: Word) -> bool {
		self.id_cache.get(&id).map_or(false, |i| {
			i.is(Op::Constant) || i.is(Op::ConstantTrue) || i.is(Op::ConstantFalse) || i.is(Op::ConstantComposite)
		})
	}

	fn is_relaxed_precision(&self, ty: TypeHandle) -> bool {
		let types = &self.program.types;
		let mut ty = ty;
		while let Some((element, _)) = types.array(ty) {
			ty = element;
		}
		types
			.scalar(ty)
			.map_or(false, |s| s.is_relaxed_precision())
	}

	/* TYPES */

	fn type_id(&mut self, ty: TypeHandle) -> Word {
		self.write_type(ty, None)
	}

	/// Returns the id of a type, laid out with `layout` when it is the type of (part of) a block.
	fn write_type(&mut self, ty: TypeHandle, layout: Option<MemoryLayout>) -> Word {
		let program = self.program;
		let types = &program.types;
		match &types[ty].kind {
			TypeKind::Void => self.cached(Section::Constants, Instruction::new(Op::TypeVoid).result()),
			TypeKind::Scalar(scalar) => {
				let width = Word::from(scalar.width);
				let instruction = match scalar.kind {
					ScalarKind::Boolean => Instruction::new(Op::TypeBool).result(),
					ScalarKind::Float => Instruction::new(Op::TypeFloat).result().word(width),
					ScalarKind::Signed => Instruction::new(Op::TypeInt).result().word(width).word(1),
					ScalarKind::Unsigned => Instruction::new(Op::TypeInt).result().word(width).word(0),
				};
				self.cached(Section::Constants, instruction)
			}
			TypeKind::Vector { component, size } => {
				let component = self.write_type(*component, layout);
				let instruction = Instruction::new(Op::TypeVector)
					.result()
					.word(component)
					.word(Word::from(*size));
				self.cached(Section::Constants, instruction)
			}
			TypeKind::Matrix { column, columns } => {
				let column = self.write_type(*column, layout);
				let instruction = Instruction::new(Op::TypeMatrix)
					.result()
					.word(column)
					.word(Word::from(*columns));
				self.cached(Section::Constants, instruction)
			}
			TypeKind::Array { element, size } => {
				let stride = layout.map_or(0, |layout| layout.stride(types, ty));
				let element = self.write_type(*element, layout);
				self.array_type(element, *size, stride)
			}
			TypeKind::Struct { .. } => self.write_struct(ty, layout),
			_ => {
				self.error(self.span, format!("type '{}' is not permitted here", types.name(ty)));
				0
			}
		}
	}

	/// Returns the id of an array type, decorated with `stride` unless it is zero.
	fn array_type(&mut self, element: Word, size: ArraySize, stride: Word) -> Word {
		let id = match size {
			ArraySize::Fixed(n) => {
				let length = self.int_constant(n as i32);
				let instruction = Instruction::new(Op::TypeArray)
					.keyed_result(stride)
					.word(element)
					.word(length);
				self.cached(Section::Constants, instruction)
			}
			ArraySize::Unsized => {
				let instruction = Instruction::new(Op::TypeRuntimeArray)
					.keyed_result(stride)
					.word(element);
				self.cached(Section::Constants, instruction)
			}
		};
		if stride > 0 {
			self.decorate(id, Decoration::ArrayStride, &[stride]);
		}
		id
	}

	/// Returns whether the member types of a struct are the same with and without a memory layout. Only then can
	/// one struct id serve both purposes.
	fn is_layout_independent(&self, ty: TypeHandle) -> bool {
		let types = &self.program.types;
		types.fields(ty).map_or(false, |fields| {
			fields.iter().all(|f| {
				matches!(
					types[f.ty].kind,
					TypeKind::Scalar(_) | TypeKind::Vector { .. } | TypeKind::Matrix { .. }
				)
			})
		})
	}

	/// Returns the id of a struct type in the given layout.
	///
	/// A request without a layout may reuse a version with a layout, and a request with a layout may adopt the
	/// version without one, which then leaves the layout-free slot. Either only happens when the member types do
	/// not depend on the layout.
	fn write_struct(&mut self, ty: TypeHandle, layout: Option<MemoryLayout>) -> Word {
		let program = self.program;
		let types = &program.types;
		let slot = match layout {
			None => 0,
			Some(MemoryLayout::Std140) => 1,
			Some(MemoryLayout::Std430) => 2,
		};
		let mut cached = self.struct_table.get(&ty).copied().unwrap_or_default();
		if cached[slot] != 0 {
			return cached[slot];
		}

		let independent = self.is_layout_independent(ty);
		let mut reused = 0;
		if independent {
			if slot == 0 {
				if let Some(&id) = cached[1..].iter().find(|&&id| id != 0) {
					log::trace!("Struct '{}' reuses laid out id {id}", types.name(ty));
					return id;
				}
			} else if cached[0] != 0 {
				reused = cached[0];
				cached[0] = 0;
				log::trace!("Struct '{}' adopts layout-free id {reused}", types.name(ty));
			}
		}

		let fields = types.fields(ty).unwrap_or_default();
		let id = if reused != 0 {
			reused
		} else {
			let members = fields
				.iter()
				.map(|f| {
					self.span = f.span;
					self.write_type(f.ty, layout)
				})
				.collect::<Vec<_>>();
			let id = self.cached(
				Section::Constants,
				Instruction::new(Op::TypeStruct).unique_result().words(members),
			);
			self.name(id, types.name(ty));
			for (i, field) in fields.iter().enumerate() {
				let member = i as Word;
				self.member_name(id, member, &field.name);
				if self.is_relaxed_precision(field.ty) {
					self.member_decorate(id, member, Decoration::RelaxedPrecision, &[]);
				}
				self.field_modifiers(&field.modifiers, id, member);
			}
			if matches!(
				types[ty].kind,
				TypeKind::Struct {
					interface_block: true,
					..
				}
			) {
				self.decorate(id, Decoration::Block, &[]);
			}
			id
		};
		cached[slot] = id;
		self.struct_table.insert(ty, cached);

		if let Some(layout) = layout {
			let placements = layout.place_fields(types, fields);
			for (i, (field, placement)) in fields.iter().zip(&placements).enumerate() {
				let member = i as Word;
				let mut leaf = field.ty;
				while let Some((element, _)) = types.array(leaf) {
					leaf = element;
				}
				// Nested structs report their own fields.
				if !types.is_struct(leaf) && !layout.is_supported(types, leaf) {
					let message = format!("type '{}' is not permitted here", types.name(leaf));
					self.error(field.span, message);
					continue;
				}
				match placement.error {
					Some(OffsetError::TooSmall { minimum }) => {
						let message = format!("offset of field '{}' must be at least {minimum}", field.name);
						self.error(field.span, message);
					}
					Some(OffsetError::Misaligned { alignment }) => {
						let message = format!("offset of field '{}' must be a multiple of {alignment}", field.name);
						self.error(field.span, message);
					}
					Some(OffsetError::Overflow) => {
						let message = format!("field '{}' ends past the 4 GiB limit of a block", field.name);
						self.error(field.span, message);
					}
					None => {}
				}
				if field.modifiers.is_builtin() {
					continue;
				}
				self.member_decorate(id, member, Decoration::Offset, &[placement.offset]);
				if placement.layout.matrix_stride > 0 {
					self.member_decorate(id, member, Decoration::ColMajor, &[]);
					self.member_decorate(
						id,
						member,
						Decoration::MatrixStride,
						&[placement.layout.matrix_stride],
					);
				}
			}
		}
		id
	}

	fn pointer_type(&mut self, type_id: Word, storage: StorageClass) -> Word {
		let instruction = Instruction::new(Op::TypePointer)
			.result()
			.word(storage as Word)
			.word(type_id);
		self.cached(Section::Constants, instruction)
	}

	fn function_type(&mut self, function: FunctionHandle) -> Word {
		let program = self.program;
		let decl = &program.functions[function];
		let return_type = self.type_id(decl.return_type);
		let parameters = decl
			.parameters
			.iter()
			.map(|p| {
				let ty = self.type_id(p.ty);
				self.pointer_type(ty, StorageClass::Function)
			})
			.collect::<Vec<_>>();
		let instruction = Instruction::new(Op::TypeFunction)
			.result()
			.word(return_type)
			.words(parameters);
		self.cached(Section::Constants, instruction)
	}

	/* CONSTANTS */

	/// Returns the id of a scalar constant.
	fn constant(&mut self, value: Literal, ty: TypeHandle) -> Word {
		let type_id = self.type_id(ty);
		let kind = self.program.types.scalar(ty).map(|s| s.kind);
		let instruction = match (value, kind) {
			(Literal::Bool(true), _) => Instruction::new(Op::ConstantTrue).word(type_id).result(),
			(Literal::Bool(false), _) => Instruction::new(Op::ConstantFalse).word(type_id).result(),
			(value, Some(ScalarKind::Float)) => Instruction::new(Op::Constant)
				.word(type_id)
				.result()
				.word((value.as_f64() as f32).to_bits()),
			(Literal::Int(i), _) => Instruction::new(Op::Constant)
				.word(type_id)
				.result()
				.word(i as i32 as Word),
			(Literal::Float(f), _) => Instruction::new(Op::Constant)
				.word(type_id)
				.result()
				.word(f as i64 as i32 as Word),
		};
		self.cached(Section::Constants, instruction)
	}

	fn int_constant(&mut self, value: i32) -> Word {
		let ty = self.program.types.builtin().int;
		self.constant(Literal::Int(i64::from(value)), ty)
	}

	/// Returns a constant with every component set to `value`.
	fn splat_constant(&mut self, value: Literal, ty: TypeHandle) -> Word {
		let types = &self.program.types;
		let component = types.component(ty);
		let scalar = self.constant(value, component);
		if types.is_scalar(ty) {
			return scalar;
		}
		let count = usize::from(types.rows(ty)) * usize::from(types.columns(ty));
		match types.column(ty) {
			Some(column) => {
				let rows = usize::from(types.rows(ty));
				let column = self.constant_composite(column, vec![scalar; rows]);
				let columns = count / rows;
				self.constant_composite(ty, vec![column; columns])
			}
			None => self.constant_composite(ty, vec![scalar; count]),
		}
	}

	fn constant_composite(&mut self, ty: TypeHandle, constituents: Vec<Word>) -> Word {
		let type_id = self.type_id(ty);
		let instruction = Instruction::new(Op::ConstantComposite)
			.word(type_id)
			.result()
			.words(constituents);
		self.cached(Section::Constants, instruction)
	}

	/* DECORATIONS AND NAMES */

	fn decorate(&mut self, target: Word, decoration: Decoration, operands: &[Word]) {
		let instruction = Instruction::new(Op::Decorate)
			.word(target)
			.word(decoration as Word)
			.words(operands.iter().copied());
		self.cached(Section::Decorations, instruction);
	}

	fn member_decorate(&mut self, target: Word, member: Word, decoration: Decoration, operands: &[Word]) {
		let instruction = Instruction::new(Op::MemberDecorate)
			.word(target)
			.word(member)
			.word(decoration as Word)
			.words(operands.iter().copied());
		self.cached(Section::Decorations, instruction);
	}

	fn name(&mut self, target: Word, name: &str) {
		if self.program.options.emit_names && !name.is_empty() {
			self.cached(Section::Names, Instruction::new(Op::Name).word(target).string(name));
		}
	}

	fn member_name(&mut self, target: Word, member: Word, name: &str) {
		if self.program.options.emit_names {
			let instruction = Instruction::new(Op::MemberName)
				.word(target)
				.word(member)
				.string(name);
			self.cached(Section::Names, instruction);
		}
	}

	/// Decorates a value with `RelaxedPrecision` if its type only needs 16 bits of precision.
	fn relaxed_precision(&mut self, id: Word, ty: TypeHandle) {
		if self.is_relaxed_precision(ty) {
			self.decorate(id, Decoration::RelaxedPrecision, &[]);
		}
	}

	/// Writes the interpolation and memory qualifier decorations shared by variables and block members.
	fn qualifier_decorations(flags: Flags) -> Vec<Decoration> {
		let mut decorations = Vec::new();
		if !flags.contains(Flags::SMOOTH) {
			if flags.contains(Flags::NO_PERSPECTIVE) {
				decorations.push(Decoration::NoPerspective);
			} else if flags.contains(Flags::FLAT) {
				decorations.push(Decoration::Flat);
			}
		}
		if flags.contains(Flags::VOLATILE) {
			decorations.push(Decoration::Volatile);
		}
		// Volatile implies coherent.
		if flags.intersects(Flags::COHERENT | Flags::VOLATILE) {
			decorations.push(Decoration::Coherent);
		}
		if flags.contains(Flags::RESTRICT) {
			decorations.push(Decoration::Restrict);
		}
		if flags.contains(Flags::READONLY) {
			decorations.push(Decoration::NonWritable);
		}
		if flags.contains(Flags::WRITEONLY) {
			decorations.push(Decoration::NonReadable);
		}
		decorations
	}

	fn modifiers(&mut self, modifiers: &Modifiers, target: Word) {
		let layout = &modifiers.layout;
		for (decoration, value) in [
			(Decoration::Location, layout.location),
			(Decoration::Component, layout.component),
			(Decoration::Index, layout.index),
			(Decoration::Binding, layout.binding),
			(Decoration::DescriptorSet, layout.set),
			(Decoration::InputAttachmentIndex, layout.input_attachment_index),
			(Decoration::BuiltIn, layout.builtin),
		] {
			if let Some(value) = value {
				self.decorate(target, decoration, &[value]);
			}
		}
		if layout.input_attachment_index.is_some() {
			self.capabilities.insert(Capability::InputAttachment as Word);
		}
		for decoration in Self::qualifier_decorations(modifiers.flags) {
			self.decorate(target, decoration, &[]);
		}
	}

	fn field_modifiers(&mut self, modifiers: &Modifiers, target: Word, member: Word) {
		let layout = &modifiers.layout;
		for (decoration, value) in [
			(Decoration::Location, layout.location),
			(Decoration::Component, layout.component),
			(Decoration::BuiltIn, layout.builtin),
		] {
			if let Some(value) = value {
				self.member_decorate(target, member, decoration, &[value]);
			}
		}
		for decoration in Self::qualifier_decorations(modifiers.flags) {
			self.member_decorate(target, member, decoration, &[]);
		}
	}

	/* GLOBALS */

	/// Returns whether a global variable must be listed on the entry point.
	fn is_interface(&self, storage: StorageClass) -> bool {
		self.version >= SpirvVersion::V1_4 || matches!(storage, StorageClass::Input | StorageClass::Output)
	}

	fn global_variable(&mut self, handle: VariableHandle, initializer: Option<&'p Expression>, span: Span) {
		let program = self.program;
		let variable = &program.variables[handle];
		self.span = span;
		let flags = variable.modifiers.flags;
		let storage = if flags.intersects(Flags::UNIFORM | Flags::BUFFER) {
			let keyword = if flags.contains(Flags::UNIFORM) { "uniform" } else { "buffer" };
			let message = format!("{keyword} variable '{}' must be declared in an interface block", variable.name);
			self.error(span, message);
			return;
		} else if flags.contains(Flags::IN) {
			StorageClass::Input
		} else if flags.contains(Flags::OUT) {
			StorageClass::Output
		} else if flags.contains(Flags::WORKGROUP) {
			StorageClass::Workgroup
		} else {
			StorageClass::Private
		};

		let type_id = self.type_id(variable.ty);
		let pointer = self.pointer_type(type_id, storage);
		let mut initial_value = None;
		if let Some(initializer) = initializer {
			if storage == StorageClass::Private && Self::is_constant_expression(initializer) {
				initial_value = Some(self.expression(initializer));
			} else if program.kind.requires_entry_point() {
				self.deferred_initializers.push((handle, initializer));
			} else {
				let message = format!(
					"initializer of global variable '{}' must be a constant expression",
					variable.name
				);
				self.error(initializer.span, message);
			}
		}

		let id = self.fresh_id();
		let mut operands = vec![pointer, id, storage as Word];
		operands.extend(initial_value);
		self.constants.write(Op::Variable, &operands);
		self.name(id, &variable.name);
		self.modifiers(&variable.modifiers, id);
		self.relaxed_precision(id, variable.ty);
		if variable.modifiers.layout.builtin == Some(builtin::FRAG_DEPTH) && program.kind == ShaderKind::Fragment {
			self.execution_modes.push((ExecutionMode::DepthReplacing, Vec::new()));
		}
		if self.is_interface(storage) {
			self.interface.push(id);
		}
		self.variables.insert(
			handle,
			Place {
				pointer: id,
				storage,
				layout: None,
			},
		);
	}

	/// Returns the storage class and memory layout of an interface block.
	fn block_storage(&mut self, modifiers: &Modifiers) -> (StorageClass, Option<MemoryLayout>) {
		let flags = modifiers.flags;
		let layout_flags = modifiers.layout.flags;
		let explicit = if layout_flags.contains(LayoutFlags::STD430) {
			Some(MemoryLayout::Std430)
		} else if layout_flags.contains(LayoutFlags::STD140) {
			Some(MemoryLayout::Std140)
		} else {
			None
		};
		if flags.contains(Flags::UNIFORM) {
			if layout_flags.contains(LayoutFlags::PUSH_CONSTANT) {
				(StorageClass::PushConstant, explicit.or(Some(MemoryLayout::Std430)))
			} else {
				(StorageClass::Uniform, explicit.or(Some(MemoryLayout::Std140)))
			}
		} else if flags.contains(Flags::BUFFER) {
			if self.version < SpirvVersion::V1_3 {
				self.extensions.insert("SPV_KHR_storage_buffer_storage_class");
			}
			(StorageClass::StorageBuffer, explicit.or(Some(MemoryLayout::Std430)))
		} else if flags.contains(Flags::IN) {
			(StorageClass::Input, None)
		} else {
			(StorageClass::Output, None)
		}
	}

	fn interface_block(&mut self, handle: VariableHandle, span: Span) {
		let program = self.program;
		let types = &program.types;
		let variable = &program.variables[handle];
		self.span = span;
		let (storage, layout) = self.block_storage(&variable.modifiers);

		let block = self.write_struct(types.array(variable.ty).map_or(variable.ty, |(e, _)| e), layout);
		let type_id = match types.array(variable.ty) {
			// Arrays of blocks have no stride.
			Some((_, size)) => self.array_type(block, size, 0),
			None => block,
		};
		let pointer = self.pointer_type(type_id, storage);
		let id = self.fresh_id();
		self.constants.write(Op::Variable, &[pointer, id, storage as Word]);
		self.name(id, &variable.name);
		self.modifiers(&variable.modifiers, id);
		if self.is_interface(storage) {
			self.interface.push(id);
		}
		self.variables.insert(
			handle,
			Place {
				pointer: id,
				storage,
				layout,
			},
		);
	}

	/// Returns whether an expression can be generated outside of any function, i.e. it only produces constants.
	fn is_constant_expression(expr: &Expression) -> bool {
		match &expr.kind {
			ExpressionKind::Literal(_) => true,
			ExpressionKind::Constructor { kind, arguments } => {
				!matches!(
					kind,
					crate::ast::ConstructorKind::ScalarCast | crate::ast::ConstructorKind::CompoundCast
				) && arguments.iter().all(Self::is_constant_expression)
			}
			_ => false,
		}
	}

	/* MODULE */

	fn execution_model(&self) -> Option<ExecutionModel> {
		match self.program.kind {
			ShaderKind::Base => None,
			ShaderKind::Vertex => Some(ExecutionModel::Vertex),
			ShaderKind::Fragment => Some(ExecutionModel::Fragment),
			ShaderKind::Compute => Some(ExecutionModel::GLCompute),
		}
	}

	/// Writes everything in front of the debug names.
	fn write_preamble(&mut self, out: &mut WordBuffer) {
		out.write(Op::Capability, &[Capability::Shader as Word]);
		for &capability in &self.capabilities {
			out.write(Op::Capability, &[capability]);
		}
		for extension in &self.extensions {
			out.write(Op::Extension, &string_words(extension).collect::<Vec<_>>());
		}
		let mut import = vec![self.glsl_std_450];
		import.extend(string_words("GLSL.std.450"));
		out.write(Op::ExtInstImport, &import);
		out.write(
			Op::MemoryModel,
			&[AddressingModel::Logical as Word, MemoryModel::GLSL450 as Word],
		);

		let program = self.program;
		let (Some(model), Some(main)) = (self.execution_model(), program.entry_point()) else {
			return;
		};
		let Some(&main) = self.function_ids.get(&main) else {
			return;
		};
		let mut entry_point = vec![model as Word, main];
		entry_point.extend(string_words("main"));
		entry_point.extend(&self.interface);
		out.write(Op::EntryPoint, &entry_point);
		for (mode, operands) in &self.execution_modes {
			let mut words = vec![main, *mode as Word];
			words.extend(operands);
			out.write(Op::ExecutionMode, &words);
		}
	}
}

impl CodeGenerator for SpirvCodeGenerator<'_> {
	type Output = SpirvModule;

	fn generate(mut self) -> Result<SpirvModule, CompileError> {
		let program = self.program;
		debug_assert!(
			program.entry_point().is_some() || !program.kind.requires_entry_point(),
			"generating code for a program which did not pass checking"
		);
		log::debug!(
			"Generating SPIR-V {:?} for a {:?} program ({} elements)",
			self.version,
			program.kind,
			program.elements.len()
		);

		self.glsl_std_450 = self.fresh_id();
		match program.kind {
			ShaderKind::Base => {
				self.capabilities.insert(Capability::Linkage as Word);
			}
			ShaderKind::Fragment => self
				.execution_modes
				.push((ExecutionMode::OriginUpperLeft, Vec::new())),
			ShaderKind::Compute => self
				.execution_modes
				.push((ExecutionMode::LocalSize, vec![1, 1, 1])),
			ShaderKind::Vertex => {}
		}

		for element in &program.elements {
			if let ProgramElement::FunctionDefinition { function, .. } = element {
				let id = self.fresh_id();
				self.function_ids.insert(*function, id);
			}
		}
		for element in &program.elements {
			match element {
				ProgramElement::StructDefinition { ty, span } => {
					self.span = *span;
					self.type_id(*ty);
				}
				ProgramElement::InterfaceBlock { variable, span } => self.interface_block(*variable, *span),
				ProgramElement::GlobalVariable {
					variable,
					initializer,
					span,
				} => {
					debug_assert_eq!(program.variables[*variable].storage, Storage::Global);
					self.global_variable(*variable, initializer.as_ref(), *span);
				}
				_ => {}
			}
		}
		for element in &program.elements {
			if let ProgramElement::FunctionDefinition {
				function,
				parameters,
				body,
				span,
			} = element
			{
				self.span = *span;
				self.function_definition(*function, parameters, body);
				let decl = &program.functions[*function];
				if program.kind == ShaderKind::Base && decl.modifiers.flags.contains(Flags::EXPORT) {
					if let Some(&id) = self.function_ids.get(function) {
						let mut operands = string_words(&decl.name).collect::<Vec<_>>();
						operands.push(LinkageType::Export as Word);
						self.decorate(id, Decoration::LinkageAttributes, &operands);
					}
				}
			}
		}

		if self.diagnostics.has_errors() {
			return Err(CompileError::Failed(self.diagnostics));
		}

		let mut out = WordBuffer::default();
		self.write_preamble(&mut out);
		out.append(&mut self.names);
		out.append(&mut self.decorations);
		out.append(&mut self.constants);
		out.append(&mut self.functions);
		if let Some(count) = out.oversized() {
			return Err(CompileError::TooManyWords { count });
		}

		let mut words = vec![
			spirv::MAGIC_NUMBER,
			self.version.word(),
			GENERATOR_MAGIC_NUMBER,
			self.next_id,
			0,
		];
		words.extend(out.into_words());
		log::debug!("Generated {} words of SPIR-V, id bound {}", words.len(), self.next_id);
		Ok(SpirvModule { words })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{context::Context, options::CompileOptions, parser::Parser};
	use rspirv::dr;

	fn program(kind: ShaderKind, source: &str) -> Program {
		Parser::new(Context::new(kind, CompileOptions::default()), source)
			.parse()
			.unwrap()
	}

	pub(super) fn generate(kind: ShaderKind, source: &str) -> SpirvModule {
		SpirvCodeGenerator::new(&program(kind, source), SpirvVersion::V1_0)
			.generate()
			.unwrap()
	}

	pub(super) fn errors(kind: ShaderKind, source: &str) -> Vec<String> {
		match SpirvCodeGenerator::new(&program(kind, source), SpirvVersion::V1_0).generate() {
			Err(CompileError::Failed(diagnostics)) => diagnostics.iter().map(|d| d.message.clone()).collect(),
			other => panic!("expected a failure, but got {other:?}"),
		}
	}

	/// Splits a module into `(opcode, operands)` pairs, skipping the header.
	pub(super) fn instructions(module: &SpirvModule) -> Vec<(Word, Vec<Word>)> {
		let mut words = &module.words()[5..];
		let mut list = Vec::new();
		while let Some(&first) = words.first() {
			let count = (first >> 16) as usize;
			list.push((first & 0xFFFF, words[1..count].to_vec()));
			words = &words[count..];
		}
		list
	}

	pub(super) fn count(module: &SpirvModule, opcode: Op) -> usize {
		instructions(module)
			.iter()
			.filter(|(op, _)| *op == opcode as Word)
			.count()
	}

	/// Returns the operands of every member decoration of the given kind, without the decoration word.
	fn member_decorations(module: &SpirvModule, decoration: Decoration) -> Vec<Vec<Word>> {
		instructions(module)
			.into_iter()
			.filter(|(op, operands)| *op == Op::MemberDecorate as Word && operands[2] == decoration as Word)
			.map(|(_, operands)| {
				let mut operands = operands;
				operands.remove(2);
				operands
			})
			.collect()
	}

	#[test]
	fn header() {
		let module = generate(ShaderKind::Vertex, "void main() {}");
		let words = module.words();
		assert_eq!(words[0], 0x0723_0203);
		assert_eq!(words[1], 0x0001_0000);
		assert_eq!(words[2], 0);
		assert_eq!(words[4], 0);
		let bound = words[3];
		let max_id = instructions(&module)
			.iter()
			.filter(|(op, _)| *op == Op::Label as Word)
			.map(|(_, operands)| operands[0])
			.max()
			.unwrap();
		assert!(max_id < bound);
		assert_eq!(module.to_bytes().len(), words.len() * 4);
	}

	#[test]
	fn modules_load() {
		let module = generate(
			ShaderKind::Fragment,
			"layout(location = 0) out float4 color;
			float brightness(float3 c) { return dot(c, float3(0.299, 0.587, 0.114)); }
			void main() {
				float3 c = float3(0.5, 0.25, 1.0);
				float b = brightness(c);
				if (b > 0.5) { color = float4(c, 1.0); } else { color = float4(b); }
				for (int i = 0; i < 3; i++) { b += 0.1; }
			}",
		);
		let loaded = dr::load_words(module.words()).unwrap();
		assert_eq!(loaded.entry_points.len(), 1);
		assert_eq!(loaded.functions.len(), 2);
		assert_eq!(loaded.execution_modes.len(), 1);
		assert_eq!(loaded.capabilities.len(), 1);
	}

	#[test]
	fn types_and_constants_are_deduplicated() {
		let module = generate(
			ShaderKind::Vertex,
			"void main() { float a = 1.0; half b = 1.0; float2 c = float2(1.0); half2 d = half2(1.0); }",
		);
		assert_eq!(count(&module, Op::TypeFloat), 1);
		assert_eq!(count(&module, Op::TypeVector), 1);
		assert_eq!(count(&module, Op::Constant), 1);
		assert_eq!(count(&module, Op::ConstantComposite), 1);
		// `b` and `d` are relaxed precision.
		let relaxed = instructions(&module)
			.iter()
			.filter(|(op, operands)| {
				*op == Op::Decorate as Word && operands[1] == Decoration::RelaxedPrecision as Word
			})
			.count();
		assert_eq!(relaxed, 2);
	}

	#[test]
	fn std140_and_std430_offsets() {
		let source = "
			layout(binding = 0) uniform A { float x; float3 y; float z[2]; float2x2 m; };
			layout(binding = 1, std430) buffer B { float x2; float3 y2; float z2[2]; float2x2 m2; };
			void main() {}";
		let module = generate(ShaderKind::Compute, source);
		let offsets = member_decorations(&module, Decoration::Offset)
			.into_iter()
			.map(|o| (o[1], o[2]))
			.collect::<Vec<_>>();
		assert_eq!(
			offsets,
			[(0, 0), (1, 16), (2, 32), (3, 64), (0, 0), (1, 16), (2, 28), (3, 40)]
		);
		let strides = instructions(&module)
			.into_iter()
			.filter(|(op, operands)| *op == Op::Decorate as Word && operands[1] == Decoration::ArrayStride as Word)
			.map(|(_, operands)| operands[2])
			.collect::<Vec<_>>();
		assert_eq!(strides, [16, 4]);
		let matrix_strides = member_decorations(&module, Decoration::MatrixStride)
			.into_iter()
			.map(|o| o[2])
			.collect::<Vec<_>>();
		assert_eq!(matrix_strides, [16, 8]);
		assert_eq!(member_decorations(&module, Decoration::ColMajor).len(), 2);
		// Distinct strides make distinct array types.
		assert_eq!(count(&module, Op::TypeArray), 2);
		assert!(instructions(&module).iter().any(|(op, operands)| {
			*op == Op::Extension as Word && operands[..] == string_words("SPV_KHR_storage_buffer_storage_class").collect::<Vec<_>>()[..]
		}));
	}

	#[test]
	fn struct_table_keys_on_the_layout() {
		let program = program(
			ShaderKind::Fragment,
			"struct S { float a; float3 b; float c[2]; }; void main() {}",
		);
		let (ty, _) = program
			.types
			.iter_declared()
			.find(|(ty, _)| program.types.name(*ty) == "S")
			.unwrap();
		let mut generator = SpirvCodeGenerator::new(&program, SpirvVersion::V1_0);
		let std140 = generator.write_struct(ty, Some(MemoryLayout::Std140));
		assert_eq!(generator.write_struct(ty, Some(MemoryLayout::Std140)), std140);
		let std430 = generator.write_struct(ty, Some(MemoryLayout::Std430));
		assert_ne!(std430, std140);
		assert_eq!(generator.write_struct(ty, Some(MemoryLayout::Std430)), std430);

		let module = generator.generate().unwrap();
		let offsets = |id: Word| {
			member_decorations(&module, Decoration::Offset)
				.into_iter()
				.filter(|o| o[0] == id)
				.map(|o| o[2])
				.collect::<Vec<_>>()
		};
		assert_eq!(offsets(std140), [0, 16, 32]);
		assert_eq!(offsets(std430), [0, 16, 28]);
	}

	#[test]
	fn blocks_past_four_gigabytes_are_rejected() {
		assert_eq!(
			errors(
				ShaderKind::Fragment,
				"layout(binding = 0) uniform B { float4 a[2000000000]; }; void main() {}"
			),
			["field 'a' ends past the 4 GiB limit of a block"]
		);
		assert_eq!(
			errors(
				ShaderKind::Fragment,
				"layout(binding = 0) uniform B { float a; layout(offset = 4294967280) float4 b; }; void main() {}"
			),
			["field 'b' ends past the 4 GiB limit of a block"]
		);
	}

	#[test]
	fn struct_table_reuses_layout_free_structs() {
		let source = "
			struct Light { float3 position; float intensity; };
			uniform Lights { Light sun; };
			void main() { Light l = sun; }";
		let module = generate(ShaderKind::Fragment, source);
		// The declaration writes the layout-free struct, the block adopts it, and the local reuses it.
		assert_eq!(count(&module, Op::TypeStruct), 2);

		let source = "
			struct Samples { float weights[4]; };
			uniform Block { Samples samples; };
			void main() { Samples s = samples; }";
		let module = generate(ShaderKind::Fragment, source);
		// The array member has a different type with a layout, so the struct cannot be shared.
		assert_eq!(count(&module, Op::TypeStruct), 3);
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn explicit_offsets_are_checked() {
		let source = "
			uniform A { float x; layout(offset = 6) float y; };
			uniform B { float3 u; layout(offset = 8) float v; };
			void main() {}";
		assert_eq!(
			errors(ShaderKind::Vertex, source),
			[
				"offset of field 'y' must be a multiple of 4",
				"offset of field 'v' must be at least 12"
			]
		);
	}

	#[test]
	fn decorations() {
		let source = "
			layout(location = 1) flat in int index;
			layout(set = 1, binding = 3) uniform Globals { float4 tint; };
			layout(input_attachment_index = 0, binding = 0) uniform Attachment { float4 unused; };
			layout(builtin = 15) in float4 fragCoord;
			void main() {}";
		let module = generate(ShaderKind::Fragment, source);
		let decorations = instructions(&module)
			.into_iter()
			.filter(|(op, _)| *op == Op::Decorate as Word)
			.map(|(_, operands)| operands[1..].to_vec())
			.collect::<Vec<_>>();
		for expected in [
			vec![Decoration::Location as Word, 1],
			vec![Decoration::Flat as Word],
			vec![Decoration::DescriptorSet as Word, 1],
			vec![Decoration::Binding as Word, 3],
			vec![Decoration::Block as Word],
			vec![Decoration::InputAttachmentIndex as Word, 0],
			vec![Decoration::BuiltIn as Word, 15],
		] {
			assert!(decorations.contains(&expected), "missing {expected:?}");
		}
		assert!(instructions(&module)
			.iter()
			.any(|(op, operands)| *op == Op::Capability as Word && operands[0] == Capability::InputAttachment as Word));
		// Input and output variables are listed on the entry point before SPIR-V 1.4.
		let entry = instructions(&module)
			.into_iter()
			.find(|(op, _)| *op == Op::EntryPoint as Word)
			.unwrap();
		assert_eq!(entry.1.len(), 2 + 2 + 2);
	}

	#[test]
	fn execution_modes() {
		let fragment = generate(ShaderKind::Fragment, "void main() {}");
		let compute = generate(ShaderKind::Compute, "void main() {}");
		let modes = |module: &SpirvModule| {
			instructions(module)
				.into_iter()
				.filter(|(op, _)| *op == Op::ExecutionMode as Word)
				.map(|(_, operands)| operands[1..].to_vec())
				.collect::<Vec<_>>()
		};
		assert_eq!(modes(&fragment), [vec![ExecutionMode::OriginUpperLeft as Word]]);
		assert_eq!(modes(&compute), [vec![ExecutionMode::LocalSize as Word, 1, 1, 1]]);
	}

	#[test]
	fn libraries_export_functions() {
		let module = generate(
			ShaderKind::Base,
			"export float twice(float x) { return x * 2.0; } float hidden() { return 1.0; }",
		);
		assert_eq!(count(&module, Op::EntryPoint), 0);
		assert_eq!(count(&module, Op::Function), 2);
		let linkage = instructions(&module)
			.into_iter()
			.filter(|(op, operands)| {
				*op == Op::Decorate as Word && operands[1] == Decoration::LinkageAttributes as Word
			})
			.collect::<Vec<_>>();
		assert_eq!(linkage.len(), 1);
		assert!(instructions(&module)
			.iter()
			.any(|(op, operands)| *op == Op::Capability as Word && operands[0] == Capability::Linkage as Word));
		dr::load_words(module.words()).unwrap();
	}

	#[test]
	fn names_are_optional() {
		let source = "struct S { float a; }; void main() { S s = S(1.0); }";
		let named = generate(ShaderKind::Vertex, source);
		assert_eq!(count(&named, Op::MemberName), 1);
		assert!(count(&named, Op::Name) >= 3);

		let program = Parser::new(
			Context::new(
				ShaderKind::Vertex,
				CompileOptions {
					emit_names: false,
					..Default::default()
				},
			),
			source,
		)
		.parse()
		.unwrap();
		let unnamed = SpirvCodeGenerator::new(&program, SpirvVersion::V1_0)
			.generate()
			.unwrap();
		assert_eq!(count(&unnamed, Op::Name), 0);
		assert_eq!(count(&unnamed, Op::MemberName), 0);
	}

	#[test]
	fn loose_uniforms_are_rejected() {
		assert_eq!(
			errors(ShaderKind::Fragment, "uniform float4 tint; void main() {}"),
			["uniform variable 'tint' must be declared in an interface block"]
		);
	}

	#[test]
	fn booleans_have_no_layout() {
		assert_eq!(
			errors(ShaderKind::Fragment, "uniform Flags { bool enabled; }; void main() {}"),
			["type 'bool' is not permitted here"]
		);
	}
}
