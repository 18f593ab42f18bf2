use std::ops::Range;

use logos::Logos;

/// Tokens inside a filter segment. Filter names and arguments are separated by
/// whitespace.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum FilterToken {
	#[regex(r"\s+")]
	Whitespace,
	#[regex(r"[^\s]+")]
	Word,
}

/// Tokens inside a field segment.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldToken {
	#[regex(r"\s+")]
	Whitespace,
	/// Characters that may appear in a field name.
	#[regex(r#"[^#\^/\s:{}"]+"#)]
	NameChars,
	/// Characters that can never appear in a field name.
	#[regex(r#"[#\^/:{}"]"#)]
	Forbidden,
}

/// Split a filter segment into whitespace separated words. Offsets are
/// relative to `source`.
pub(crate) fn filter_words(source: &str) -> Vec<(&str, Range<usize>)> {
	FilterToken::lexer(source)
		.spanned()
		.filter_map(|(token, span)| {
			match token {
				Ok(FilterToken::Word) => Some((&source[span.clone()], span)),
				Ok(FilterToken::Whitespace) | Err(()) => None,
			}
		})
		.collect()
}

/// Tokenize a field segment. Offsets are relative to `source`.
pub(crate) fn field_tokens(source: &str) -> Vec<(FieldToken, Range<usize>)> {
	FieldToken::lexer(source)
		.spanned()
		.filter_map(|(token, span)| token.ok().map(|token| (token, span)))
		.collect()
}

/// Find the span of the field name within a field segment.
///
/// The name is the first run of name characters, extended across internal
/// whitespace as long as another run of name characters follows directly
/// after that whitespace. Whitespace before a forbidden character or the end
/// of the segment is never part of the name.
pub(crate) fn field_name_span(source: &str) -> Option<Range<usize>> {
	let tokens = field_tokens(source);
	let first = tokens
		.iter()
		.position(|(token, _)| *token == FieldToken::NameChars)?;
	let mut span = tokens[first].1.clone();
	let mut cursor = first + 1;

	while let [(FieldToken::Whitespace, _), (FieldToken::NameChars, next), ..] = &tokens[cursor..] {
		span.end = next.end;
		cursor += 2;
	}

	Some(span)
}

/// Return the index of the first `=` not preceded by a backslash.
pub(crate) fn unescaped_equals(source: &str) -> Option<usize> {
	let bytes = source.as_bytes();
	bytes
		.iter()
		.enumerate()
		.find(|(index, byte)| **byte == b'=' && (*index == 0 || bytes[index - 1] != b'\\'))
		.map(|(index, _)| index)
}
