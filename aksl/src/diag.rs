//! All diagnostic types.
//!
//! Diagnostics are accumulated in an ordered [`Diagnostics`] list attached to the compilation context. Lexical and
//! semantic problems are recorded and compilation keeps going, so that independent errors in the same source are
//! all surfaced in one pass. A syntax error is recorded and then stops the parser. Each diagnostic carries a
//! [`DiagKind`] describing which stage produced it.

use crate::Span;
use codespan_reporting::{
	diagnostic::{Diagnostic as Report, Label},
	files::SimpleFile,
	term::{
		self,
		termcolor::{ColorChoice, NoColor, StandardStream},
	},
};

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
	Error,
	Warning,
}

/// Which stage of compilation produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DiagKind {
	/// An invalid character sequence. Not fatal; the token stream continues.
	Lexical,
	/// An unexpected token in a required grammar position. Fatal for the whole unit.
	Syntax,
	/// A type mismatch, an undeclared or duplicate symbol, an invalid layout, a numeric range violation.
	Semantic,
	/// A size limit was exceeded.
	Capacity,
}

/// A single diagnostic: a position range plus a message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
	pub kind: DiagKind,
	pub severity: Severity,
	pub span: Span,
	pub message: String,
}

impl Diagnostic {
	/// Converts this diagnostic into a renderable report.
	fn report(&self) -> Report<()> {
		let report = match self.severity {
			Severity::Error => Report::error(),
			Severity::Warning => Report::warning(),
		};
		report
			.with_message(self.message.clone())
			.with_labels(vec![Label::primary((), self.span.range())])
	}
}

impl std::fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.span, self.message)
	}
}

/// An ordered list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
	list: Vec<Diagnostic>,
}

impl Diagnostics {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records an error.
	pub fn error(&mut self, kind: DiagKind, span: Span, message: impl Into<String>) {
		let message = message.into();
		log::trace!("{kind:?} error at {span}: {message}");
		self.list.push(Diagnostic {
			kind,
			severity: Severity::Error,
			span,
			message,
		});
	}

	/// Records a warning.
	pub fn warning(&mut self, kind: DiagKind, span: Span, message: impl Into<String>) {
		self.list.push(Diagnostic {
			kind,
			severity: Severity::Warning,
			span,
			message: message.into(),
		});
	}

	/// Returns the number of errors (warnings are not counted).
	pub fn error_count(&self) -> usize {
		self.list
			.iter()
			.filter(|d| d.severity == Severity::Error)
			.count()
	}

	pub fn has_errors(&self) -> bool {
		self.error_count() > 0
	}

	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	pub fn len(&self) -> usize {
		self.list.len()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
		self.list.iter()
	}

	/// Moves all diagnostics of `other` to the end of this list.
	pub fn append(&mut self, other: &mut Diagnostics) {
		self.list.append(&mut other.list);
	}

	/// Renders every diagnostic to a string, without colours.
	pub fn emit_to_string(&self, source: &str, path: &str) -> String {
		let files = SimpleFile::new(path, source);
		let config = term::Config::default();
		let mut writer = NoColor::new(Vec::new());
		for diagnostic in &self.list {
			// Writing into a `Vec` cannot fail, and every span was produced from this source.
			let _ = term::emit(&mut writer, &config, &files, &diagnostic.report());
		}
		String::from_utf8_lossy(&writer.into_inner()).into_owned()
	}

	/// Renders every diagnostic to the standard error stream.
	pub fn emit_to_stderr(&self, source: &str, path: &str) {
		let files = SimpleFile::new(path, source);
		let config = term::Config::default();
		let writer = StandardStream::stderr(ColorChoice::Auto);
		let mut lock = writer.lock();
		for diagnostic in &self.list {
			if let Err(e) = term::emit(&mut lock, &config, &files, &diagnostic.report()) {
				log::warn!("failed to write diagnostic: {e}");
			}
		}
	}
}

impl std::fmt::Display for Diagnostics {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (i, diagnostic) in self.list.iter().enumerate() {
			if i != 0 {
				writeln!(f)?;
			}
			write!(f, "{diagnostic}")?;
		}
		Ok(())
	}
}

impl<'a> IntoIterator for &'a Diagnostics {
	type Item = &'a Diagnostic;
	type IntoIter = std::slice::Iter<'a, Diagnostic>;

	fn into_iter(self) -> Self::IntoIter {
		self.list.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::span::span;

	#[test]
	fn ordered_and_counted() {
		let mut diags = Diagnostics::new();
		diags.error(DiagKind::Semantic, span(0, 1), "first");
		diags.warning(DiagKind::Semantic, span(2, 3), "second");
		diags.error(DiagKind::Syntax, span(4, 5), "third");
		assert_eq!(diags.len(), 3);
		assert_eq!(diags.error_count(), 2);
		let messages = diags.iter().map(|d| d.message.as_str()).collect::<Vec<_>>();
		assert_eq!(messages, ["first", "second", "third"]);
	}

	#[test]
	fn render() {
		let source = "int x = y;";
		let mut diags = Diagnostics::new();
		diags.error(DiagKind::Semantic, span(8, 9), "no symbol named 'y'");
		let rendered = diags.emit_to_string(source, "test.aksl");
		assert!(rendered.contains("error: no symbol named 'y'"));
		assert!(rendered.contains("test.aksl:1:9"));
	}
}
