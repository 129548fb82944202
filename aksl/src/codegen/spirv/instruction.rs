//! SPIR-V instructions as the generator caches them, and the word streams they are written into.

use crate::error::MAX_INSTRUCTION_WORDS;
use rspirv::spirv::{Op, Word};

/// How the result id of an instruction is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum ResultKind {
	/// Identical instructions share one id.
	Default,
	/// Like [`Default`](Self::Default), but the cache key carries an extra word which is never written out. Used
	/// for types which only differ by their decorations, such as arrays of different strides.
	Keyed(Word),
	/// Every instruction gets a fresh id. Struct types are unique so that each can carry its own member
	/// decorations.
	Unique,
	/// The instruction has no result, e.g. a decoration. Identical instructions are still only written once.
	None,
}

/// An instruction with its result id left blank.
///
/// Two instructions with equal opcodes, operands and result kinds are interchangeable; this is the key of the
/// instruction cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct Instruction {
	opcode: Word,
	/// The operand words, with `0` in the result id slot.
	operands: Vec<Word>,
	/// The index of the result id in `operands`.
	result: Option<usize>,
	kind: ResultKind,
}

impl Instruction {
	pub fn new(opcode: Op) -> Self {
		Self {
			opcode: opcode as Word,
			operands: Vec::new(),
			result: None,
			kind: ResultKind::None,
		}
	}

	fn result_slot(mut self, kind: ResultKind) -> Self {
		debug_assert!(self.result.is_none(), "an instruction has at most one result id");
		self.result = Some(self.operands.len());
		self.operands.push(0);
		self.kind = kind;
		self
	}

	pub fn result(self) -> Self {
		self.result_slot(ResultKind::Default)
	}

	pub fn keyed_result(self, key: Word) -> Self {
		self.result_slot(ResultKind::Keyed(key))
	}

	pub fn unique_result(self) -> Self {
		self.result_slot(ResultKind::Unique)
	}

	pub fn word(mut self, word: Word) -> Self {
		self.operands.push(word);
		self
	}

	pub fn words(mut self, words: impl IntoIterator<Item = Word>) -> Self {
		self.operands.extend(words);
		self
	}

	pub fn string(mut self, string: &str) -> Self {
		self.operands.extend(string_words(string));
		self
	}

	pub fn kind(&self) -> ResultKind {
		self.kind
	}

	pub fn is(&self, opcode: Op) -> bool {
		self.opcode == opcode as Word
	}

	/// Returns the operands which follow the result id.
	pub fn operands_after_result(&self) -> &[Word] {
		match self.result {
			Some(i) => &self.operands[i + 1..],
			None => &self.operands,
		}
	}
}

/// Encodes a string as a nul-terminated, zero-padded sequence of little-endian words.
pub(super) fn string_words(string: &str) -> impl Iterator<Item = Word> + '_ {
	let bytes = string.as_bytes();
	let count = bytes.len() / 4 + 1;
	(0..count).map(move |i| {
		let mut word = [0u8; 4];
		for (j, byte) in word.iter_mut().enumerate() {
			if let Some(b) = bytes.get(i * 4 + j) {
				*byte = *b;
			}
		}
		Word::from_le_bytes(word)
	})
}

/// A stream of instruction words.
#[derive(Debug, Default)]
pub(super) struct WordBuffer {
	words: Vec<Word>,
	/// The word count of the first instruction which did not fit into the 16-bit count field.
	oversized: Option<usize>,
}

impl WordBuffer {
	pub fn write(&mut self, opcode: Op, operands: &[Word]) {
		let count = operands.len() + 1;
		if count > MAX_INSTRUCTION_WORDS {
			self.oversized.get_or_insert(count);
		}
		self.words.push(((count as Word & 0xFFFF) << 16) | opcode as Word);
		self.words.extend_from_slice(operands);
	}

	/// Writes a cached instruction, filling in its result id.
	pub fn write_instruction(&mut self, instruction: &Instruction, result: Word) {
		let count = instruction.operands.len() + 1;
		if count > MAX_INSTRUCTION_WORDS {
			self.oversized.get_or_insert(count);
		}
		self.words
			.push(((count as Word & 0xFFFF) << 16) | instruction.opcode);
		for (i, word) in instruction.operands.iter().enumerate() {
			if Some(i) == instruction.result {
				self.words.push(result);
			} else {
				self.words.push(*word);
			}
		}
	}

	/// Moves the contents of `other` to the end of this stream.
	pub fn append(&mut self, other: &mut WordBuffer) {
		self.words.append(&mut other.words);
		if self.oversized.is_none() {
			self.oversized = other.oversized.take();
		}
	}

	pub fn oversized(&self) -> Option<usize> {
		self.oversized
	}

	pub fn into_words(self) -> Vec<Word> {
		self.words
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strings_are_padded() {
		assert_eq!(string_words("main").collect::<Vec<_>>(), [0x6E69_616D, 0]);
		assert_eq!(string_words("abc").collect::<Vec<_>>(), [0x0063_6261]);
		assert_eq!(string_words("").collect::<Vec<_>>(), [0]);
	}

	#[test]
	fn result_ids_are_filled_in() {
		let instruction = Instruction::new(Op::TypeVector).result().word(3).word(4);
		assert_eq!(instruction.operands_after_result(), [3, 4]);
		let mut buffer = WordBuffer::default();
		buffer.write_instruction(&instruction, 9);
		assert_eq!(buffer.into_words(), [(4 << 16) | Op::TypeVector as Word, 9, 3, 4]);
	}

	#[test]
	fn keyed_results_differ_by_key() {
		let a = Instruction::new(Op::TypeArray).keyed_result(16).word(1).word(2);
		let b = Instruction::new(Op::TypeArray).keyed_result(4).word(1).word(2);
		assert_ne!(a, b);
		assert_eq!(a, Instruction::new(Op::TypeArray).keyed_result(16).word(1).word(2));
	}

	#[test]
	fn oversized_instructions_are_recorded() {
		let mut buffer = WordBuffer::default();
		buffer.write(Op::Nop, &vec![0; MAX_INSTRUCTION_WORDS]);
		assert_eq!(buffer.oversized(), Some(MAX_INSTRUCTION_WORDS + 1));
	}
}
