//! Code generators which turn a checked [`Program`](crate::Program) into output for a graphics API.

pub mod glsl;
pub mod spirv;

use crate::error::CompileError;

/// A code generator. Each generator is single use: `generate()` consumes it.
pub trait CodeGenerator {
	type Output;

	fn generate(self) -> Result<Self::Output, CompileError>;
}
