//! The compiler driver: from source text to a checked program, GLSL text, or a SPIR-V module in one call.

use crate::{
	codegen::{
		glsl::GlslCodeGenerator,
		spirv::{SpirvCodeGenerator, SpirvModule},
		CodeGenerator,
	},
	context::Context,
	error::{CompileError, MAX_SOURCE_LENGTH},
	options::{CompileOptions, GlslVersion, ShaderKind, SpirvVersion, TargetApi},
	parser::Parser,
	program::Program,
};

/// Entry points which run the whole pipeline.
///
/// Every call is an independent compilation with its own [`Context`]; calls on different threads never interfere.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler;

impl Compiler {
	/// Parses and checks a program.
	///
	/// # Errors
	/// Returns [`CompileError::SourceTooLarge`] without looking at the source if it is longer than
	/// [`MAX_SOURCE_LENGTH`] characters, and [`CompileError::Failed`] if any error was reported.
	pub fn parse(source: &str, kind: ShaderKind, options: CompileOptions) -> Result<Program, CompileError> {
		let length = source.chars().count();
		if length > MAX_SOURCE_LENGTH {
			log::debug!("Rejecting a source of {length} characters");
			return Err(CompileError::SourceTooLarge { length });
		}
		Parser::new(Context::new(kind, options), source)
			.parse()
			.map_err(CompileError::Failed)
	}

	/// Compiles a program to GLSL.
	pub fn compile_to_glsl(
		source: &str,
		kind: ShaderKind,
		options: CompileOptions,
		api: TargetApi,
		version: GlslVersion,
	) -> Result<String, CompileError> {
		let program = Self::parse(source, kind, options)?;
		GlslCodeGenerator::new(&program, api, version).generate()
	}

	/// Compiles a program to SPIR-V.
	pub fn compile_to_spirv(
		source: &str,
		kind: ShaderKind,
		options: CompileOptions,
		version: SpirvVersion,
	) -> Result<SpirvModule, CompileError> {
		let program = Self::parse(source, kind, options)?;
		SpirvCodeGenerator::new(&program, version).generate()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn oversized_sources_are_rejected_before_lexing() {
		// Not even valid syntax; the length check comes first.
		let source = "@".repeat(MAX_SOURCE_LENGTH + 1);
		match Compiler::parse(&source, ShaderKind::Base, CompileOptions::default()) {
			Err(CompileError::SourceTooLarge { length }) => assert_eq!(length, MAX_SOURCE_LENGTH + 1),
			other => panic!("expected the source to be rejected, got {other:?}"),
		}
	}

	#[test]
	fn length_is_counted_in_characters() {
		// Two bytes per character, so twice the limit in bytes.
		let comment = "é".repeat(MAX_SOURCE_LENGTH - 4);
		let source = format!("//{comment}\n");
		assert!(source.len() > MAX_SOURCE_LENGTH);
		assert!(Compiler::parse(&source, ShaderKind::Base, CompileOptions::default()).is_ok());
	}

	#[test]
	fn failures_carry_the_diagnostics() {
		let error = Compiler::compile_to_spirv(
			"void main() { int x = true; }",
			ShaderKind::Vertex,
			CompileOptions::default(),
			SpirvVersion::V1_0,
		)
		.unwrap_err();
		let diagnostics = error.diagnostics().unwrap();
		assert_eq!(diagnostics.error_count(), 1);
	}

	#[test]
	fn pipeline_types_are_send() {
		fn assert_send<T: Send>() {}
		assert_send::<Context>();
		assert_send::<Program>();
		assert_send::<GlslCodeGenerator<'static>>();
		assert_send::<SpirvCodeGenerator<'static>>();
	}

	#[test]
	fn both_targets() {
		let source = "layout(location = 0) out float4 color; void main() { color = float4(0.5); }";
		let glsl = Compiler::compile_to_glsl(
			source,
			ShaderKind::Fragment,
			CompileOptions::default(),
			TargetApi::Vulkan,
			GlslVersion::V450,
		)
		.unwrap();
		assert!(glsl.contains("void main()"));
		let spirv = Compiler::compile_to_spirv(
			source,
			ShaderKind::Fragment,
			CompileOptions::default(),
			SpirvVersion::V1_3,
		)
		.unwrap();
		assert_eq!(spirv.words()[1], 0x0001_0300);
	}
}
