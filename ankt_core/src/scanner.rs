use serde::Serialize;

/// The opening delimiter of a replacement.
pub const REPLACEMENT_OPEN: &str = "{{";
/// The closing delimiter of a replacement.
pub const REPLACEMENT_CLOSE: &str = "}}";

/// One `{{...}}` occurrence found in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplacementMatch<'a> {
	/// The matched text including both delimiters.
	pub text: &'a str,
	/// Byte offset of the first `{`.
	pub start: usize,
	/// Byte offset just after the final `}`.
	pub end: usize,
}

impl ReplacementMatch<'_> {
	/// Offset of the first byte after `{{`.
	pub fn inner_start(&self) -> usize {
		self.start + REPLACEMENT_OPEN.len()
	}

	/// Offset of the first `}` of the closing `}}`.
	pub fn inner_end(&self) -> usize {
		self.end - REPLACEMENT_CLOSE.len()
	}

	pub fn inner(&self) -> &str {
		&self.text[REPLACEMENT_OPEN.len()..self.text.len() - REPLACEMENT_CLOSE.len()]
	}
}

/// Find every non-overlapping `{{...}}` span in `text`, left to right.
///
/// A span is the shortest `{{ ... }}` whose inner text holds no `{` or `}`.
/// When a candidate opening runs into another brace before its `}}`, the scan
/// resumes one byte later, so `{{{Field}}}` matches `{{Field}}`.
pub fn replacement_matches(text: &str) -> Vec<ReplacementMatch<'_>> {
	let bytes = text.as_bytes();
	let mut matches = Vec::new();
	let mut cursor = 0;

	while cursor + 1 < bytes.len() {
		if bytes[cursor] != b'{' || bytes[cursor + 1] != b'{' {
			cursor += 1;
			continue;
		}

		match closing_offset(bytes, cursor + REPLACEMENT_OPEN.len()) {
			Some(close) => {
				let end = close + REPLACEMENT_CLOSE.len();
				matches.push(ReplacementMatch {
					text: &text[cursor..end],
					start: cursor,
					end,
				});
				cursor = end;
			}
			None => cursor += 1,
		}
	}

	tracing::trace!(count = matches.len(), "scanned replacements");
	matches
}

/// Starting at `from`, find the offset of a `}}` reached without crossing any
/// other brace.
fn closing_offset(bytes: &[u8], from: usize) -> Option<usize> {
	let mut index = from;

	while index < bytes.len() {
		match bytes[index] {
			b'{' => return None,
			b'}' => {
				return (bytes.get(index + 1) == Some(&b'}')).then_some(index);
			}
			_ => index += 1,
		}
	}

	None
}
