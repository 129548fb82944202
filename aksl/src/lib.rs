//! *aksl* is a compiler for the **AkSL** shading language: a C-like language with GLSL-style declarations, and
//! HLSL-style type names such as `float3` and `half4x4`.
//!
//! The crate is split into modules representing the different stages of compilation:
//! - `lexer` - the token stream, produced lazily from the source string,
//! - `parser` - a recursive-descent parser which type-checks as it goes and produces a typed AST,
//! - `ast` - the typed abstract syntax tree,
//! - `codegen` - the code generators, which turn a checked [`Program`] into GLSL text or a SPIR-V module.
//!
//! The simplest way in is through the [`Compiler`](compiler::Compiler) driver:
//! ```
//! use aksl::{compiler::Compiler, CompileOptions, GlslVersion, ShaderKind, TargetApi};
//!
//! let source = "layout(location = 0) out float4 color; void main() { color = float4(1.0); }";
//! let glsl = Compiler::compile_to_glsl(
//! 	source,
//! 	ShaderKind::Fragment,
//! 	CompileOptions::default(),
//! 	TargetApi::OpenGl,
//! 	GlslVersion::V450,
//! )
//! .unwrap();
//! assert!(glsl.starts_with("#version 450\n"));
//! ```
//!
//! ## The compilation pipeline
//! Each compilation owns a [`Context`](context::Context): the options, the shader kind, the type arena, the
//! symbol table and the diagnostic sink. Nothing is shared between compilations except the frozen builtin
//! module, so any number of compilations can run in parallel on different threads.
//!
//! ### Parsing
//! The parser pulls tokens from the lexer one at a time and builds the AST bottom-up. Every node is checked as it
//! is constructed: operands are converted to a common type, constant sub-expressions are folded, and calls are
//! resolved to an overload. Errors are collected as diagnostics; a syntax error stops the parse, whilst semantic
//! errors let it continue so that as many problems as possible are reported at once.
//!
//! ### Code generation
//! A [`Program`] which parsed without any error can be handed to either generator. The GLSL generator writes text
//! for a chosen API and GLSL version; the SPIR-V generator writes a module for a chosen SPIR-V version. Both can
//! still fail on constructs the target cannot express, for example a misplaced explicit member offset.

pub mod arena;
pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod compiler;
pub mod context;
pub mod diag;
pub mod error;
pub mod fold;
pub mod layout;
pub mod lexer;
pub mod modifiers;
pub mod options;
pub mod parser;
pub mod program;
mod span;
pub mod symbols;
pub mod types;

pub use diag::{Diagnostic, Diagnostics};
pub use error::CompileError;
pub use options::{CompileOptions, GlslVersion, ShaderKind, SpirvVersion, TargetApi};
pub use program::Program;
pub use span::*;
