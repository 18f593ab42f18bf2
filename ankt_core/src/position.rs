use serde::Deserialize;
use serde::Serialize;

/// A location in a source text. `line` and `column` are 1-indexed, `column`
/// counts bytes from the start of the line and `offset` is the absolute byte
/// offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Point {
	pub fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}
}

/// A start/end pair of [`Point`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
	pub start: Point,
	pub end: Point,
}

impl Position {
	pub fn new(
		start_line: usize,
		start_column: usize,
		start_offset: usize,
		end_line: usize,
		end_column: usize,
		end_offset: usize,
	) -> Self {
		Self {
			start: Point::new(start_line, start_column, start_offset),
			end: Point::new(end_line, end_column, end_offset),
		}
	}
}

/// Pre-computed table of line-start byte offsets.
///
/// Built once per text in O(n); each offset lookup is a binary search.
#[derive(Debug, Clone)]
pub struct LineIndex {
	/// Byte offsets of the start of each line. `line_starts[0]` is always 0.
	line_starts: Vec<usize>,
	/// Total byte length of the indexed text.
	len: usize,
}

impl LineIndex {
	pub fn new(text: &str) -> Self {
		let mut line_starts = vec![0];
		for (index, byte) in text.bytes().enumerate() {
			if byte == b'\n' {
				line_starts.push(index + 1);
			}
		}

		Self {
			line_starts,
			len: text.len(),
		}
	}

	pub fn line_count(&self) -> usize {
		self.line_starts.len()
	}

	/// Byte offset of the first byte of the 0-indexed `line`.
	pub fn line_start(&self, line: usize) -> Option<usize> {
		self.line_starts.get(line).copied()
	}

	/// Convert a byte offset into a [`Point`]. Offsets past the end of the
	/// text are clamped to the end.
	pub fn point(&self, offset: usize) -> Point {
		let offset = offset.min(self.len);
		let line_index = match self.line_starts.binary_search(&offset) {
			Ok(exact) => exact,
			Err(insert) => insert.saturating_sub(1),
		};

		Point {
			line: line_index + 1,
			column: offset - self.line_starts[line_index] + 1,
			offset,
		}
	}

	pub fn position(&self, start: usize, end: usize) -> Position {
		Position {
			start: self.point(start),
			end: self.point(end),
		}
	}

	/// Convert a 1-indexed line and byte column back into an offset. Returns
	/// `None` when the line does not exist or the column runs past its end.
	pub fn offset(&self, line: usize, column: usize) -> Option<usize> {
		let line_start = *self.line_starts.get(line.checked_sub(1)?)?;
		let line_end = self
			.line_starts
			.get(line)
			.map_or(self.len, |next| next.saturating_sub(1));
		let offset = line_start + column.checked_sub(1)?;

		(offset <= line_end).then_some(offset)
	}
}
