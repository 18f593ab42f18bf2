use derive_more::Deref;
use derive_more::Display;
use serde::Deserialize;
use serde::Serialize;

/// Shared shape of every parse node.
///
/// `start` is the byte offset of the node's first byte in the original
/// document and `end` is the byte offset just after its last byte. A cursor
/// offset is inside a node when `start <= offset <= end`, so a cursor sitting
/// directly after the final character still counts as inside.
pub trait AstNode {
	fn content(&self) -> &str;
	fn start(&self) -> usize;
	fn end(&self) -> usize;

	fn contains(&self, offset: usize) -> bool {
		self.start() <= offset && offset <= self.end()
	}

	fn len(&self) -> usize {
		self.end() - self.start()
	}

	fn is_empty(&self) -> bool {
		self.start() == self.end()
	}
}

macro_rules! impl_ast_node {
	($($node:ty),+ $(,)?) => {
		$(
			impl AstNode for $node {
				fn content(&self) -> &str {
					&self.content
				}

				fn start(&self) -> usize {
					self.start
				}

				fn end(&self) -> usize {
					self.end
				}
			}
		)+
	};
}

impl_ast_node!(
	TextNode,
	Field,
	FieldSegment,
	Filter,
	FilterArgumentKeyValue,
	FilterSegment,
	Replacement,
);

/// Index of a [`Replacement`] inside [`TemplateDocument::replacements`].
///
/// Used for the lookup-only relations between replacements (parent
/// conditional, linked tag, children). It never owns anything.
#[derive(
	Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("#{_0}")]
#[serde(transparent)]
pub struct ReplacementId(pub usize);

/// The parsed form of one template text: every `{{...}}` occurrence in
/// source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, Serialize, Deserialize)]
pub struct TemplateDocument {
	/// The text this document was parsed from.
	pub content: String,
	/// Replacements in source order. Never overlapping.
	#[deref]
	pub replacements: Vec<Replacement>,
}

impl TemplateDocument {
	pub fn replacement(&self, id: ReplacementId) -> Option<&Replacement> {
		self.replacements.get(id.0)
	}

	/// The first replacement (in document order) containing `offset`.
	pub fn replacement_at(&self, offset: usize) -> Option<&Replacement> {
		crate::find_first_containing(&self.replacements, offset)
	}

	pub fn conditional_starts(&self) -> impl Iterator<Item = &Replacement> {
		self.replacements
			.iter()
			.filter(|replacement| replacement.is_conditional_start())
	}
}

/// A plain slice of text with its absolute offsets. Used for filter names,
/// positional arguments and the pieces of key/value arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNode {
	pub content: String,
	pub start: usize,
	pub end: usize,
}

impl TextNode {
	pub fn new(content: impl Into<String>, start: usize) -> Self {
		let content = content.into();
		let end = start + content.len();

		Self {
			content,
			start,
			end,
		}
	}
}

/// One `{{...}}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
	pub id: ReplacementId,
	/// The full text including the `{{` and `}}` delimiters.
	pub content: String,
	pub start: usize,
	pub end: usize,
	/// The field part. For conditionals this is everything after the marker.
	pub field_segment: FieldSegment,
	pub kind: ReplacementKind,
	/// Nearest enclosing conditional start, if any.
	pub parent_conditional: Option<ReplacementId>,
}

impl Replacement {
	/// The referenced field name, when the field segment parsed.
	pub fn field_name(&self) -> Option<&str> {
		self.field_segment.field.as_ref().map(Field::name)
	}

	pub fn is_standard(&self) -> bool {
		matches!(self.kind, ReplacementKind::Standard { .. })
	}

	pub fn is_conditional(&self) -> bool {
		!self.is_standard()
	}

	pub fn is_conditional_start(&self) -> bool {
		matches!(self.kind, ReplacementKind::ConditionalStart { .. })
	}

	pub fn is_conditional_end(&self) -> bool {
		matches!(self.kind, ReplacementKind::ConditionalEnd { .. })
	}

	pub fn conditional_type(&self) -> Option<ConditionalType> {
		match &self.kind {
			ReplacementKind::ConditionalStart {
				conditional_type, ..
			} => Some(*conditional_type),
			_ => None,
		}
	}

	/// The matching tag of a conditional pair.
	pub fn linked_tag(&self) -> Option<ReplacementId> {
		match &self.kind {
			ReplacementKind::ConditionalStart { linked_tag, .. }
			| ReplacementKind::ConditionalEnd { linked_tag } => *linked_tag,
			ReplacementKind::Standard { .. } => None,
		}
	}

	pub fn child_replacements(&self) -> &[ReplacementId] {
		match &self.kind {
			ReplacementKind::ConditionalStart {
				child_replacements, ..
			} => child_replacements,
			_ => &[],
		}
	}

	pub fn filter_segments(&self) -> &[FilterSegment] {
		match &self.kind {
			ReplacementKind::Standard { filter_segments } => filter_segments,
			_ => &[],
		}
	}

	/// The text between the `{{` and `}}` delimiters.
	pub fn inner(&self) -> &str {
		self.content
			.get(2..self.content.len().saturating_sub(2))
			.unwrap_or_default()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplacementKind {
	/// `{{Field}}` or `{{filter:other:Field}}`.
	Standard {
		/// Filters in source order. The rightmost filter is applied first.
		filter_segments: Vec<FilterSegment>,
	},
	/// `{{#Field}}` or `{{^Field}}`.
	ConditionalStart {
		conditional_type: ConditionalType,
		linked_tag: Option<ReplacementId>,
		/// Replacements directly enclosed by this conditional.
		child_replacements: Vec<ReplacementId>,
	},
	/// `{{/Field}}`.
	ConditionalEnd { linked_tag: Option<ReplacementId> },
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalType {
	/// `{{#Field}}`: rendered when the field has content.
	#[display("filled")]
	Filled,
	/// `{{^Field}}`: rendered when the field is empty.
	#[display("empty")]
	Empty,
}

impl ConditionalType {
	pub fn marker(self) -> char {
		match self {
			Self::Filled => '#',
			Self::Empty => '^',
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSegment {
	pub content: String,
	pub start: usize,
	pub end: usize,
	/// Absent when the segment holds no usable field name.
	pub field: Option<Field>,
}

/// A field name. `content` is the name itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
	pub content: String,
	pub start: usize,
	pub end: usize,
}

impl Field {
	pub fn name(&self) -> &str {
		&self.content
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSegment {
	pub content: String,
	pub start: usize,
	pub end: usize,
	/// Absent when the segment is blank.
	pub filter: Option<Filter>,
}

/// A filter with its arguments, e.g. `tts en_US voices=Bob,Alice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
	/// The filter text from the name to the last argument.
	pub content: String,
	pub start: usize,
	pub end: usize,
	pub name: TextNode,
	pub arguments: Vec<FilterArgument>,
}

impl Filter {
	pub fn name(&self) -> &str {
		&self.name.content
	}

	pub fn positional_arguments(&self) -> impl Iterator<Item = &TextNode> {
		self.arguments.iter().filter_map(|argument| {
			match argument {
				FilterArgument::Positional(node) => Some(node),
				FilterArgument::KeyValue(_) => None,
			}
		})
	}

	pub fn keyed_argument(&self, key: &str) -> Option<&FilterArgumentKeyValue> {
		self.arguments.iter().find_map(|argument| {
			match argument {
				FilterArgument::KeyValue(key_value) if key_value.key_name() == Some(key) => {
					Some(key_value)
				}
				_ => None,
			}
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterArgument {
	Positional(TextNode),
	KeyValue(FilterArgumentKeyValue),
}

impl AstNode for FilterArgument {
	fn content(&self) -> &str {
		match self {
			Self::Positional(node) => node.content(),
			Self::KeyValue(node) => node.content(),
		}
	}

	fn start(&self) -> usize {
		match self {
			Self::Positional(node) => node.start,
			Self::KeyValue(node) => node.start,
		}
	}

	fn end(&self) -> usize {
		match self {
			Self::Positional(node) => node.end,
			Self::KeyValue(node) => node.end,
		}
	}
}

/// `key=value1,value2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterArgumentKeyValue {
	pub content: String,
	pub start: usize,
	pub end: usize,
	/// Absent when the argument starts with the divider.
	pub key: Option<TextNode>,
	/// The run of `=` characters.
	pub divider: TextNode,
	/// Comma separated values, empty parts dropped.
	pub value: Vec<TextNode>,
}

impl FilterArgumentKeyValue {
	pub fn key_name(&self) -> Option<&str> {
		self.key.as_ref().map(|key| key.content.as_str())
	}

	pub fn values(&self) -> impl Iterator<Item = &str> {
		self.value.iter().map(|value| value.content.as_str())
	}
}
