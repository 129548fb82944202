//! The error type returned by the compiler entry points.

use crate::diag::Diagnostics;
use thiserror::Error;

/// The longest accepted source, in characters.
pub const MAX_SOURCE_LENGTH: usize = 0x7F_FFFE;

/// The largest word count a single SPIR-V instruction can encode.
pub const MAX_INSTRUCTION_WORDS: usize = 0xFFFF;

/// Why a compilation produced no artifact.
#[derive(Debug, Error)]
pub enum CompileError {
	/// The source exceeds [`MAX_SOURCE_LENGTH`]. Checked before lexing begins.
	#[error("source is too large: {length} characters, the maximum is {MAX_SOURCE_LENGTH}")]
	SourceTooLarge { length: usize },
	/// A SPIR-V instruction would exceed [`MAX_INSTRUCTION_WORDS`].
	#[error("too many words in a single instruction: {count}")]
	TooManyWords { count: usize },
	/// Compilation reported at least one error. The list is non-empty and in the order the errors were found.
	#[error("compilation failed:\n{0}")]
	Failed(Diagnostics),
}

impl CompileError {
	/// Returns the diagnostics, if this error carries any.
	pub fn diagnostics(&self) -> Option<&Diagnostics> {
		match self {
			CompileError::Failed(diagnostics) => Some(diagnostics),
			_ => None,
		}
	}
}
