//! Reporting of compiler diagnostics, either rendered for a terminal or as one JSON object per line.

use crate::file::{Location, SourceFile};
use aksl::{
	diag::{DiagKind, Severity},
	Diagnostic, Diagnostics,
};
use serde::Serialize;

/// How diagnostics are written to the standard error stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MessageFormat {
	/// Rendered with source snippets.
	Human,
	/// One JSON object per diagnostic.
	Json,
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic<'a> {
	file: String,
	kind: DiagKind,
	severity: Severity,
	message: &'a str,
	start: Location,
	end: Location,
}

impl<'a> JsonDiagnostic<'a> {
	fn new(diagnostic: &'a Diagnostic, file: &SourceFile) -> Self {
		Self {
			file: file.name(),
			kind: diagnostic.kind,
			severity: diagnostic.severity,
			message: &diagnostic.message,
			start: file.location(diagnostic.span.start),
			end: file.location(diagnostic.span.end),
		}
	}
}

/// Serializes each diagnostic to a single line of JSON.
pub fn to_json_lines(diagnostics: &Diagnostics, file: &SourceFile) -> serde_json::Result<Vec<String>> {
	diagnostics
		.iter()
		.map(|diagnostic| serde_json::to_string(&JsonDiagnostic::new(diagnostic, file)))
		.collect()
}

/// Writes the diagnostics to the standard error stream.
pub fn report(diagnostics: &Diagnostics, file: &SourceFile, format: MessageFormat) -> serde_json::Result<()> {
	match format {
		MessageFormat::Human => diagnostics.emit_to_stderr(&file.contents, &file.name()),
		MessageFormat::Json => {
			for line in to_json_lines(diagnostics, file)? {
				eprintln!("{line}");
			}
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use aksl::{compiler::Compiler, CompileError, CompileOptions, ShaderKind};
	use std::path::Path;

	#[test]
	fn json_lines() {
		let source = "void main() {\n\tint a = true;\n}\n";
		let file = SourceFile::new(Path::new("shader.aksl"), source.to_owned());
		let Err(CompileError::Failed(diagnostics)) =
			Compiler::parse(source, ShaderKind::Vertex, CompileOptions::default())
		else {
			panic!("expected the compilation to fail");
		};
		let lines = to_json_lines(&diagnostics, &file).unwrap();
		assert_eq!(lines.len(), 1);
		let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
		assert_eq!(value["file"], "shader.aksl");
		assert_eq!(value["kind"], "semantic");
		assert_eq!(value["severity"], "error");
		assert_eq!(value["start"]["line"], 2);
	}
}
