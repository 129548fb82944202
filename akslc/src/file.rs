use std::path::{Path, PathBuf};

/// A line and column, both starting at `1`. The column counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Location {
	pub line: usize,
	pub column: usize,
}

/// An AkSL source file read from disk.
#[derive(Debug)]
pub struct SourceFile {
	/// The path this file was read from.
	pub path: PathBuf,
	/// Contents of this file.
	pub contents: String,
	/// The byte offset at which each line starts; the vector index is the line number minus one.
	lines: Vec<usize>,
}

impl SourceFile {
	/// Constructs a new file with the specified contents.
	pub fn new(path: &Path, contents: String) -> Self {
		Self {
			path: path.to_owned(),
			lines: Self::generate_line_table(&contents),
			contents,
		}
	}

	/// Returns the path as it should appear in diagnostics.
	pub fn name(&self) -> String {
		self.path.display().to_string()
	}

	/// Converts a byte offset produced by the compiler into a line and column.
	///
	/// Offsets past the end of the file are clamped to the end.
	pub fn location(&self, offset: usize) -> Location {
		let offset = offset.min(self.contents.len());
		// The first entry is always `0`, so at least one line starts at or before any offset.
		let index = self.lines.partition_point(|&start| start <= offset) - 1;
		let start = self.lines[index];
		let column = self
			.contents
			.get(start..offset)
			.map_or(offset - start, |prefix| prefix.chars().count());
		Location {
			line: index + 1,
			column: column + 1,
		}
	}

	fn generate_line_table(contents: &str) -> Vec<usize> {
		let mut lines = vec![0];
		let bytes = contents.as_bytes();
		let mut i = 0;
		while i < bytes.len() {
			match bytes[i] {
				b'\n' => lines.push(i + 1),
				b'\r' => {
					// `\r\n` is one line break.
					if bytes.get(i + 1) == Some(&b'\n') {
						i += 1;
					}
					lines.push(i + 1);
				}
				_ => {}
			}
			i += 1;
		}
		lines
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn file(contents: &str) -> SourceFile {
		SourceFile::new(Path::new("shader.aksl"), contents.to_owned())
	}

	#[test]
	fn line_endings() {
		let file = file("a\nb\r\nc\rd");
		assert_eq!(file.lines, [0, 2, 5, 7]);
		assert_eq!(file.location(0), Location { line: 1, column: 1 });
		assert_eq!(file.location(2), Location { line: 2, column: 1 });
		assert_eq!(file.location(6), Location { line: 3, column: 2 });
		assert_eq!(file.location(7), Location { line: 4, column: 1 });
	}

	#[test]
	fn columns_count_characters() {
		let file = file("// é\nint x;");
		assert_eq!(file.location(5), Location { line: 1, column: 5 });
		assert_eq!(file.location(6), Location { line: 2, column: 1 });
	}

	#[test]
	fn offsets_past_the_end() {
		let file = file("int x;\n");
		assert_eq!(file.location(100), Location { line: 2, column: 1 });
	}
}
