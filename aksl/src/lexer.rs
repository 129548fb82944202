//! Types and functionality related to the lexer.
//!
//! This module contains the [`Token`] and [`TokenKind`] types, and the [`Lexer`] which lazily produces tokens from
//! a source string. Tokens are packed triples of a kind, a byte offset and a byte length; they own no text. Call
//! [`Token::text()`] with the original source to get the characters back.
//!
//! # Differences in behaviour
//! The lexer never fails. Instead:
//!
//! - When the lexer comes across a character which is not part of the allowed character set it emits an
//!   [`Invalid`](TokenKind::Invalid) token spanning that one character. Reporting it is the job of the parser.
//! - When the lexer comes across a block comment which does not have a closing delimiter, the entire rest of the
//!   source becomes a single [`Invalid`](TokenKind::Invalid) token.
//! - The lexer treats any number that matches the pattern `0[0-9]+` as an octal number, even if it contains the
//!   digits `8` or `9`. The parser reports the invalid digit, so that `009` is highlighted as one bad literal
//!   rather than two consecutive numbers.
//! - Whitespace and comments are real tokens. Concatenating the text of every token produced, up to and including
//!   the end-of-file token, reproduces the source string exactly.

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// The end of the source string. Always zero-width.
	EndOfFile,
	/// A character which is not part of the allowed character set, or an unterminated block comment.
	Invalid,
	/// A run of whitespace characters.
	Whitespace,
	/// A line comment, e.g. `// comment`.
	LineComment,
	/// A block comment, e.g. `/* comment */`.
	BlockComment,
	/// An integer literal, e.g. `1`, `517u`, `0xA9C`, `07113`.
	IntLiteral,
	/// A floating-point literal, e.g. `1.0`, `7.3e-2`, `.015f`.
	FloatLiteral,
	/// The `true` literal.
	True,
	/// The `false` literal.
	False,
	/// An identifier, e.g. `foo_bar`, `_900_a`. This includes type names; those are resolved by the symbol table.
	Identifier,
	/// A reserved keyword, e.g. `class`, `typedef`, `union`.
	Reserved,
	/* Keywords */
	If,
	Else,
	For,
	While,
	Do,
	Switch,
	Case,
	Default,
	Break,
	Continue,
	Discard,
	Return,
	Struct,
	/* Qualifiers */
	Layout,
	Const,
	Uniform,
	In,
	Out,
	InOut,
	Flat,
	NoPerspective,
	Smooth,
	Coherent,
	Volatile,
	Restrict,
	ReadOnly,
	WriteOnly,
	Buffer,
	Workgroup,
	Pure,
	Inline,
	NoInline,
	Export,
	/* Punctuation */
	LParen,
	RParen,
	LBrace,
	RBrace,
	LBracket,
	RBracket,
	Dot,
	Comma,
	Semicolon,
	Colon,
	Question,
	/* Operators */
	Eq,
	EqEq,
	Bang,
	BangEq,
	Lt,
	Le,
	Gt,
	Ge,
	Shl,
	ShlEq,
	Shr,
	ShrEq,
	Plus,
	PlusPlus,
	PlusEq,
	Minus,
	MinusMinus,
	MinusEq,
	Star,
	StarEq,
	Slash,
	SlashEq,
	Percent,
	PercentEq,
	Amp,
	AmpAmp,
	AmpEq,
	Pipe,
	PipePipe,
	PipeEq,
	Caret,
	CaretCaret,
	CaretEq,
	Tilde,
}

impl TokenKind {
	/// Returns whether this token carries no meaning for the parser, i.e. whitespace or a comment.
	pub fn is_trivia(&self) -> bool {
		matches!(
			self,
			TokenKind::Whitespace
				| TokenKind::LineComment
				| TokenKind::BlockComment
		)
	}
}

/// A token representing a unit of text in the source string.
///
/// # Invariants
/// `offset + len` never exceeds the length of the source string this token was produced from, and both ends lie
/// on character boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
	pub kind: TokenKind,
	/// The byte offset of the first character.
	pub offset: u32,
	/// The length in bytes.
	pub len: u32,
}

impl Token {
	/// Returns the text of this token by re-slicing the source it was produced from.
	pub fn text<'a>(&self, source: &'a str) -> &'a str {
		&source[self.span().range()]
	}

	/// Returns the span of this token.
	pub fn span(&self) -> crate::Span {
		let start = self.offset as usize;
		crate::Span::new(start, start + self.len as usize)
	}
}

/// Lexes the entire source string, including the final end-of-file token.
///
/// This lexer uses the "Maximal munch" principle to greedily create tokens. This means the longest possible valid
/// token is always produced. Some examples:
///
/// ```text
/// i---7      becomes (i) (--) (-) (7)
/// i----7     becomes (i) (--) (--) (7)
/// i-- - --7  becomes (i) (--) (ws) (-) (ws) (--) (7)
/// ```
///
/// # Examples
/// ```rust
/// # use aksl::lexer::{tokenize, TokenKind};
/// let tokens = tokenize("int i = 5;");
/// assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfFile);
/// ```
pub fn tokenize(source: &str) -> Vec<Token> {
	let mut lexer = Lexer::new(source);
	let mut tokens = Vec::new();
	loop {
		let token = lexer.next();
		tokens.push(token);
		if token.kind == TokenKind::EndOfFile {
			return tokens;
		}
	}
}

/// A lexer which allows stepping through a source string token by token.
///
/// The only state is the cursor, so a lexer can be cloned to look ahead an arbitrary distance and thrown away.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
	/// The source string as bytes. Multi-byte characters only ever appear inside comments or invalid tokens.
	src: &'a [u8],
	/// The byte index of the current character.
	cursor: usize,
}

impl<'a> Lexer<'a> {
	/// Constructs a new lexer at the start of the source.
	///
	/// The source must be shorter than `u32::MAX` bytes; callers enforce a much tighter limit up front.
	pub fn new(source: &'a str) -> Self {
		debug_assert!(source.len() < u32::MAX as usize);
		Self {
			src: source.as_bytes(),
			cursor: 0,
		}
	}

	/// Returns the byte offset of the cursor.
	pub fn offset(&self) -> usize {
		self.cursor
	}

	/// Produces the next token.
	///
	/// Once the end of the source has been reached, every subsequent call returns a zero-width
	/// [`EndOfFile`](TokenKind::EndOfFile) token.
	pub fn next(&mut self) -> Token {
		let start = self.cursor;
		let kind = self.lex_token();
		Token {
			kind,
			offset: start as u32,
			len: (self.cursor - start) as u32,
		}
	}

	fn lex_token(&mut self) -> TokenKind {
		let current = match self.peek() {
			Some(c) => c,
			None => return TokenKind::EndOfFile,
		};

		if is_word_start(current) {
			let start = self.cursor;
			while self.peek().map_or(false, is_word) {
				self.advance();
			}
			// Word characters are always ASCII, so this slice is valid UTF-8.
			let word = std::str::from_utf8(&self.src[start..self.cursor])
				.unwrap_or_default();
			match_word(word)
		} else if current.is_ascii_digit()
			|| (current == b'.'
				&& self.lookahead_1().map_or(false, |c| c.is_ascii_digit()))
		{
			self.lex_number()
		} else if is_whitespace(current) {
			while self.peek().map_or(false, is_whitespace) {
				self.advance();
			}
			TokenKind::Whitespace
		} else if self.take_pat("//") {
			while let Some(c) = self.peek() {
				if c == b'\n' || c == b'\r' {
					break;
				}
				self.advance();
			}
			TokenKind::LineComment
		} else if self.take_pat("/*") {
			loop {
				if self.take_pat("*/") {
					break TokenKind::BlockComment;
				}
				if self.is_done() {
					break TokenKind::Invalid;
				}
				self.advance();
			}
		} else if is_punctuation_start(current) {
			match_punctuation(self)
		} else {
			// Consume the entire character, so that the token text is always a valid string slice.
			self.advance();
			while self.peek().map_or(false, |c| (c & 0xC0) == 0x80) {
				self.advance();
			}
			TokenKind::Invalid
		}
	}

	/// Lexes an integer or floating-point literal. The cursor is on a digit, or on a `.` followed by a digit.
	fn lex_number(&mut self) -> TokenKind {
		if self.take_pat("0x") || self.take_pat("0X") {
			while self.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
				self.advance();
			}
			self.take_suffix(b'u', b'U');
			return TokenKind::IntLiteral;
		}

		let mut is_float = false;
		while self.peek().map_or(false, |c| c.is_ascii_digit()) {
			self.advance();
		}
		if self.peek() == Some(b'.') {
			is_float = true;
			self.advance();
			while self.peek().map_or(false, |c| c.is_ascii_digit()) {
				self.advance();
			}
		}
		if matches!(self.peek(), Some(b'e') | Some(b'E')) {
			// Only treat this as an exponent if digits actually follow, otherwise `1e` would swallow the `e`.
			let sign = matches!(self.lookahead_1(), Some(b'+') | Some(b'-'));
			let digit = if sign {
				self.lookahead_2()
			} else {
				self.lookahead_1()
			};
			if digit.map_or(false, |c| c.is_ascii_digit()) {
				is_float = true;
				self.advance();
				if sign {
					self.advance();
				}
				while self.peek().map_or(false, |c| c.is_ascii_digit()) {
					self.advance();
				}
			}
		}

		if is_float {
			self.take_suffix(b'f', b'F');
			TokenKind::FloatLiteral
		} else if self.take_suffix(b'f', b'F') {
			TokenKind::FloatLiteral
		} else {
			self.take_suffix(b'u', b'U');
			TokenKind::IntLiteral
		}
	}

	/// Consumes a single-character literal suffix, if present and not followed by further word characters.
	fn take_suffix(&mut self, lower: u8, upper: u8) -> bool {
		match self.peek() {
			Some(c)
				if (c == lower || c == upper)
					&& !self.lookahead_1().map_or(false, is_word) =>
			{
				self.advance();
				true
			}
			_ => false,
		}
	}

	/// Returns the current character under the cursor, without advancing the cursor.
	fn peek(&self) -> Option<u8> {
		self.src.get(self.cursor).copied()
	}

	/// Peeks the next character without advancing the cursor.
	fn lookahead_1(&self) -> Option<u8> {
		self.src.get(self.cursor + 1).copied()
	}

	/// Peeks the character after the next one without advancing the cursor.
	fn lookahead_2(&self) -> Option<u8> {
		self.src.get(self.cursor + 2).copied()
	}

	/// Advances the cursor by one byte.
	fn advance(&mut self) {
		self.cursor += 1;
	}

	/// Tries to match a pattern starting at the current character under the cursor.
	///
	/// If the match is successful, `true` is returned and the cursor is advanced to consume the pattern. If the
	/// match is unsuccessful, `false` is returned and the cursor stays in place.
	fn take_pat(&mut self, pat: &str) -> bool {
		if self.src[self.cursor..].starts_with(pat.as_bytes()) {
			self.cursor += pat.len();
			true
		} else {
			false
		}
	}

	/// Returns whether this lexer has reached the end of the source string.
	fn is_done(&self) -> bool {
		self.cursor >= self.src.len()
	}
}

/// Returns whether the character is allowed to start a word.
fn is_word_start(c: u8) -> bool {
	c.is_ascii_alphabetic() || c == b'_'
}

/// Returns whether the character is allowed to be part of a word.
fn is_word(c: u8) -> bool {
	c.is_ascii_alphanumeric() || c == b'_'
}

fn is_whitespace(c: u8) -> bool {
	matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

/// Returns whether the character is allowed to start a punctuation token.
///
/// Note that whilst the `.` is a punctuation token, a `.` followed by a digit gets caught by the number branch
/// since that executes first.
fn is_punctuation_start(c: u8) -> bool {
	matches!(
		c,
		b'=' | b',' | b'.' | b';' | b'(' | b')' | b'[' | b']' | b'{' | b'}'
			| b':' | b'+' | b'-' | b'*' | b'/' | b'%' | b'>' | b'<' | b'!'
			| b'~' | b'?' | b'&' | b'|' | b'^'
	)
}

macro_rules! match_op {
	($lexer:ident, $str:expr, $token:expr) => {
		if $lexer.take_pat($str) {
			return $token;
		}
	};
}

/// Matches a punctuation symbol. Longer patterns are tried first.
fn match_punctuation(lexer: &mut Lexer) -> TokenKind {
	match_op!(lexer, "<<=", TokenKind::ShlEq);
	match_op!(lexer, ">>=", TokenKind::ShrEq);
	match_op!(lexer, "==", TokenKind::EqEq);
	match_op!(lexer, "!=", TokenKind::BangEq);
	match_op!(lexer, ">=", TokenKind::Ge);
	match_op!(lexer, "<=", TokenKind::Le);
	match_op!(lexer, "&&", TokenKind::AmpAmp);
	match_op!(lexer, "||", TokenKind::PipePipe);
	match_op!(lexer, "^^", TokenKind::CaretCaret);
	match_op!(lexer, "++", TokenKind::PlusPlus);
	match_op!(lexer, "--", TokenKind::MinusMinus);
	match_op!(lexer, "<<", TokenKind::Shl);
	match_op!(lexer, ">>", TokenKind::Shr);
	match_op!(lexer, "+=", TokenKind::PlusEq);
	match_op!(lexer, "-=", TokenKind::MinusEq);
	match_op!(lexer, "*=", TokenKind::StarEq);
	match_op!(lexer, "/=", TokenKind::SlashEq);
	match_op!(lexer, "%=", TokenKind::PercentEq);
	match_op!(lexer, "&=", TokenKind::AmpEq);
	match_op!(lexer, "|=", TokenKind::PipeEq);
	match_op!(lexer, "^=", TokenKind::CaretEq);
	match_op!(lexer, "=", TokenKind::Eq);
	match_op!(lexer, ";", TokenKind::Semicolon);
	match_op!(lexer, ".", TokenKind::Dot);
	match_op!(lexer, ",", TokenKind::Comma);
	match_op!(lexer, "(", TokenKind::LParen);
	match_op!(lexer, ")", TokenKind::RParen);
	match_op!(lexer, "[", TokenKind::LBracket);
	match_op!(lexer, "]", TokenKind::RBracket);
	match_op!(lexer, "{", TokenKind::LBrace);
	match_op!(lexer, "}", TokenKind::RBrace);
	match_op!(lexer, "+", TokenKind::Plus);
	match_op!(lexer, "-", TokenKind::Minus);
	match_op!(lexer, "*", TokenKind::Star);
	match_op!(lexer, "/", TokenKind::Slash);
	match_op!(lexer, ">", TokenKind::Gt);
	match_op!(lexer, "<", TokenKind::Lt);
	match_op!(lexer, "!", TokenKind::Bang);
	match_op!(lexer, "~", TokenKind::Tilde);
	match_op!(lexer, "?", TokenKind::Question);
	match_op!(lexer, ":", TokenKind::Colon);
	match_op!(lexer, "%", TokenKind::Percent);
	match_op!(lexer, "&", TokenKind::Amp);
	match_op!(lexer, "|", TokenKind::Pipe);
	match_op!(lexer, "^", TokenKind::Caret);
	// `is_punctuation_start()` guarantees one of the single-character patterns matched.
	lexer.advance();
	TokenKind::Invalid
}

/// Matches a word to either the `true`/`false` literal, a keyword, a reserved word, or an identifier in that order
/// of precedence.
fn match_word(word: &str) -> TokenKind {
	match word {
		// Booleans
		"true" => TokenKind::True,
		"false" => TokenKind::False,
		// Keywords
		"if" => TokenKind::If,
		"else" => TokenKind::Else,
		"for" => TokenKind::For,
		"while" => TokenKind::While,
		"do" => TokenKind::Do,
		"switch" => TokenKind::Switch,
		"case" => TokenKind::Case,
		"default" => TokenKind::Default,
		"break" => TokenKind::Break,
		"continue" => TokenKind::Continue,
		"discard" => TokenKind::Discard,
		"return" => TokenKind::Return,
		"struct" => TokenKind::Struct,
		"layout" => TokenKind::Layout,
		"const" => TokenKind::Const,
		"uniform" => TokenKind::Uniform,
		"in" => TokenKind::In,
		"out" => TokenKind::Out,
		"inout" => TokenKind::InOut,
		"flat" => TokenKind::Flat,
		"noperspective" => TokenKind::NoPerspective,
		"smooth" => TokenKind::Smooth,
		"coherent" => TokenKind::Coherent,
		"volatile" => TokenKind::Volatile,
		"restrict" => TokenKind::Restrict,
		"readonly" => TokenKind::ReadOnly,
		"writeonly" => TokenKind::WriteOnly,
		"buffer" => TokenKind::Buffer,
		"workgroup" => TokenKind::Workgroup,
		"pure" => TokenKind::Pure,
		"inline" => TokenKind::Inline,
		"noinline" => TokenKind::NoInline,
		"export" => TokenKind::Export,
		// Reserved
		"attribute" | "varying" | "precision" | "highp" | "mediump" | "lowp"
		| "shared" | "centroid" | "sample" | "patch" | "invariant" | "precise"
		| "subroutine" | "common" | "partition" | "active" | "asm" | "class"
		| "union" | "enum" | "typedef" | "template" | "this" | "resource"
		| "goto" | "public" | "static" | "extern" | "external" | "interface"
		| "long" | "double" | "fixed" | "unsigned" | "superp" | "input"
		| "output" | "filter" | "sizeof" | "cast" | "namespace" | "using"
		| "dvec2" | "dvec3" | "dvec4" | "hvec2" | "hvec3" | "hvec4"
		| "fvec2" | "fvec3" | "fvec4" => TokenKind::Reserved,
		// Identifier
		_ => TokenKind::Identifier,
	}
}

#[cfg(test)]
use crate::span::span;

/// Asserts whether the token kinds produced for the source match the right hand side; this ignores the span
/// information and the trailing end-of-file token.
#[cfg(test)]
macro_rules! assert_tokens {
	($src:expr, $($token:expr),*) => {
		let output = tokenize($src)
			.into_iter()
			.map(|t| t.kind)
			.filter(|k| *k != TokenKind::EndOfFile)
			.collect::<Vec<_>>();
		assert_eq!(output, vec![
			$(
				$token,
			)*
		])
	};
}

/// Asserts whether the tokens (with spans) produced for the source match the right hand side.
#[cfg(test)]
macro_rules! assert_tokens2 {
	($src:expr, $(($token:expr, $span:expr)),*) => {
		let output = tokenize($src)
			.into_iter()
			.map(|t| (t.kind, t.span()))
			.collect::<Vec<_>>();
		assert_eq!(output, vec![
			$(
				($token, $span),
			)*
		])
	};
}

#[test]
fn spans() {
	assert_tokens2!(
		"return",
		(TokenKind::Return, span(0, 6)),
		(TokenKind::EndOfFile, span(6, 6))
	);
	assert_tokens2!(
		"a += 1;",
		(TokenKind::Identifier, span(0, 1)),
		(TokenKind::Whitespace, span(1, 2)),
		(TokenKind::PlusEq, span(2, 4)),
		(TokenKind::Whitespace, span(4, 5)),
		(TokenKind::IntLiteral, span(5, 6)),
		(TokenKind::Semicolon, span(6, 7)),
		(TokenKind::EndOfFile, span(7, 7))
	);
	assert_tokens2!("", (TokenKind::EndOfFile, span(0, 0)));
}

#[test]
fn identifiers() {
	assert_tokens!("ident", TokenKind::Identifier);
	assert_tokens!("gl_something", TokenKind::Identifier);
	assert_tokens!("_9ga", TokenKind::Identifier);
	assert_tokens!("float4", TokenKind::Identifier);
	assert_tokens!("half", TokenKind::Identifier);
}

#[test]
fn keywords() {
	assert_tokens!("true", TokenKind::True);
	assert_tokens!("false", TokenKind::False);
	assert_tokens!("if", TokenKind::If);
	assert_tokens!("else", TokenKind::Else);
	assert_tokens!("switch", TokenKind::Switch);
	assert_tokens!("discard", TokenKind::Discard);
	assert_tokens!("layout", TokenKind::Layout);
	assert_tokens!("inout", TokenKind::InOut);
	assert_tokens!("noperspective", TokenKind::NoPerspective);
	assert_tokens!("workgroup", TokenKind::Workgroup);
	assert_tokens!("class", TokenKind::Reserved);
	assert_tokens!("highp", TokenKind::Reserved);
	assert_tokens!("shared", TokenKind::Reserved);
}

#[test]
fn punctuation() {
	assert_tokens!("<<=", TokenKind::ShlEq);
	assert_tokens!("^^", TokenKind::CaretCaret);
	assert_tokens!(
		"i---7",
		TokenKind::Identifier,
		TokenKind::MinusMinus,
		TokenKind::Minus,
		TokenKind::IntLiteral
	);
	assert_tokens!(
		"i----7",
		TokenKind::Identifier,
		TokenKind::MinusMinus,
		TokenKind::MinusMinus,
		TokenKind::IntLiteral
	);
	assert_tokens!(
		"a.b",
		TokenKind::Identifier,
		TokenKind::Dot,
		TokenKind::Identifier
	);
}

#[test]
fn comments() {
	assert_tokens!("// comment", TokenKind::LineComment);
	assert_tokens!(
		"// a\nb",
		TokenKind::LineComment,
		TokenKind::Whitespace,
		TokenKind::Identifier
	);
	assert_tokens!("/* a */", TokenKind::BlockComment);
	assert_tokens!("/* a * / b", TokenKind::Invalid);
	assert_tokens!("/", TokenKind::Slash);
}

#[test]
#[rustfmt::skip]
fn numbers() {
	assert_tokens!("0", TokenKind::IntLiteral);
	assert_tokens!("0u", TokenKind::IntLiteral);
	assert_tokens!("123456U", TokenKind::IntLiteral);
	assert_tokens!("01715", TokenKind::IntLiteral);
	assert_tokens!("0x91fau", TokenKind::IntLiteral);
	assert_tokens!("1.0", TokenKind::FloatLiteral);
	assert_tokens!(".5", TokenKind::FloatLiteral);
	assert_tokens!("5.", TokenKind::FloatLiteral);
	assert_tokens!("1e10", TokenKind::FloatLiteral);
	assert_tokens!("7.3e-2f", TokenKind::FloatLiteral);
	assert_tokens!("2f", TokenKind::FloatLiteral);
	// The exponent needs digits, otherwise `e` starts a new word.
	assert_tokens!("1e", TokenKind::IntLiteral, TokenKind::Identifier);
	assert_tokens!("1ux", TokenKind::IntLiteral, TokenKind::Identifier);
}

#[test]
fn illegal() {
	assert_tokens!("@", TokenKind::Invalid);
	assert_tokens!("a$b", TokenKind::Identifier, TokenKind::Invalid, TokenKind::Identifier);
	// Non-ASCII characters are consumed whole.
	assert_tokens!("é", TokenKind::Invalid);
	assert_tokens!("\"", TokenKind::Invalid);
}

#[test]
fn end_of_file_forever() {
	let mut lexer = Lexer::new("a");
	assert_eq!(lexer.next().kind, TokenKind::Identifier);
	for _ in 0..3 {
		let token = lexer.next();
		assert_eq!(token.kind, TokenKind::EndOfFile);
		assert_eq!(token.len, 0);
		assert_eq!(token.offset, 1);
	}
	assert_eq!(lexer.offset(), 1);
}

#[test]
fn spans_reconstruct_source() {
	let sources = [
		"",
		"float f(float x) { return x + 1.0; }",
		"layout(binding=0) uniform Block { float4x4 m; } b;\r\n// tail",
		"  /* unterminated ",
		"a@b é .5e+3f <<= >>=\t\n",
		"int i=0x;int j=09;",
	];
	for source in sources {
		let tokens = tokenize(source);
		let rebuilt = tokens.iter().map(|t| t.text(source)).collect::<String>();
		assert_eq!(rebuilt, source);

		let last = tokens.last().unwrap();
		assert_eq!(last.kind, TokenKind::EndOfFile);
		assert_eq!(last.len, 0);
		assert_eq!(last.offset as usize, source.len());
	}
}
