/// A span in the source string.
///
/// Keeps track of the byte offset between characters from the start of the source string, e.g. `if=abc` would be
/// stored as `0-2, 2-3, 3-6`.
///
/// Illustrated example:
/// ```text
///   i   f   =   a   b   c
///  ├─────┤ ├─┤ ├─────────┤
/// ^   ^   ^   ^   ^   ^   ^
/// 0   1   2   3   4   5   6
/// ```
///
/// Every node of the abstract syntax tree carries one of these, and every diagnostic points at one.
///
/// # Invariants
/// If this type is manually constructed or modified, the `end` position must be equal-to or greater than the
/// `start` position. If this invariant is not upheld then interacting with this span, for example to render a
/// diagnostic label, will result in logical bugs but it will never cause memory unsafety.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
	pub start: usize,
	pub end: usize,
}

impl Span {
	/// Constructs a new span between the two positions.
	pub fn new(start: usize, end: usize) -> Self {
		debug_assert!(
			start <= end,
			"[Span::new] `start: {start}` is located after `end: {end}`"
		);

		Self { start, end }
	}

	/// Constructs a zero-width span at the position.
	pub fn new_zero_width(position: usize) -> Self {
		Self {
			start: position,
			end: position,
		}
	}

	/// Constructs a span which covers both spans, and anything in between.
	pub fn cover(a: Span, b: Span) -> Self {
		Self {
			start: usize::min(a.start, b.start),
			end: usize::max(a.end, b.end),
		}
	}

	/// Returns the length of this span in bytes.
	pub fn len(&self) -> usize {
		self.end - self.start
	}

	/// Returns whether this span is zero-width.
	pub fn is_zero_width(&self) -> bool {
		self.start == self.end
	}

	/// Returns whether a span lies within this span.
	pub fn contains(&self, span: Self) -> bool {
		self.start <= span.start && span.end <= self.end
	}

	/// Returns a new zero-width span located at the end of this span.
	pub fn end_zero_width(self) -> Self {
		Self {
			start: self.end,
			end: self.end,
		}
	}

	/// Returns the byte range of this span, suitable for slicing the source string.
	pub fn range(self) -> std::ops::Range<usize> {
		self.start..self.end
	}
}

impl std::fmt::Debug for Span {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}-{}", self.start, self.end)
	}
}

impl std::fmt::Display for Span {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}..{}", self.start, self.end)
	}
}

/// Constructs a new [`Span`] from a start and end position.
///
/// This is just a shorthand for [`Span::new()`], since that becomes a bit verbose to type out again and again,
/// especially in the unit test assertions.
#[cfg(test)]
pub(crate) fn span(start: usize, end: usize) -> Span {
	Span { start, end }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cover() {
		assert_eq!(Span::cover(span(4, 6), span(0, 2)), span(0, 6));
		assert_eq!(Span::cover(span(1, 9), span(3, 4)), span(1, 9));
	}

	#[test]
	fn zero_width() {
		assert!(Span::new_zero_width(5).is_zero_width());
		assert_eq!(span(2, 7).end_zero_width(), span(7, 7));
		assert_eq!(span(2, 7).len(), 5);
	}
}
