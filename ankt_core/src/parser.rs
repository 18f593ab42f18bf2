use crate::ConditionalType;
use crate::Field;
use crate::FieldSegment;
use crate::Filter;
use crate::FilterArgument;
use crate::FilterArgumentKeyValue;
use crate::FilterSegment;
use crate::Replacement;
use crate::ReplacementId;
use crate::ReplacementKind;
use crate::ReplacementMatch;
use crate::TemplateDocument;
use crate::TextNode;
use crate::lexer::field_name_span;
use crate::lexer::filter_words;
use crate::lexer::unescaped_equals;
use crate::replacement_matches;

/// Separates filters from each other and from the field.
const SEGMENT_DELIMITER: char = ':';

/// Parse a template text into a [`TemplateDocument`].
///
/// This never fails. Malformed replacements produce nodes whose optional
/// children are absent; judging them is left to [`crate::validate`].
pub fn parse_template(content: impl AsRef<str>) -> TemplateDocument {
	let content = content.as_ref();
	let mut replacements: Vec<Replacement> = replacement_matches(content)
		.iter()
		.enumerate()
		.map(|(index, found)| parse_replacement(ReplacementId(index), found))
		.collect();

	link_conditionals(&mut replacements);
	tracing::debug!(replacements = replacements.len(), "parsed template");

	TemplateDocument {
		content: content.to_string(),
		replacements,
	}
}

/// The kind of tag announced by the first non-whitespace character of a
/// replacement.
enum TagMarker {
	Start(ConditionalType),
	End,
}

impl TagMarker {
	fn from_char(ch: char) -> Option<Self> {
		match ch {
			'#' => Some(Self::Start(ConditionalType::Filled)),
			'^' => Some(Self::Start(ConditionalType::Empty)),
			'/' => Some(Self::End),
			_ => None,
		}
	}
}

fn parse_replacement(id: ReplacementId, found: &ReplacementMatch<'_>) -> Replacement {
	let inner = found.inner();
	let inner_start = found.inner_start();
	let trimmed = inner.trim_start();
	let leading = inner.len() - trimmed.len();
	let marker = trimmed.chars().next().and_then(TagMarker::from_char);

	let (field_segment, kind) = if let Some(marker) = marker {
		// Every marker is a single ASCII byte.
		let segment_start = leading + 1;
		let field_segment = parse_field_segment(&inner[segment_start..], inner_start + segment_start);
		let kind = match marker {
			TagMarker::Start(conditional_type) => {
				ReplacementKind::ConditionalStart {
					conditional_type,
					linked_tag: None,
					child_replacements: Vec::new(),
				}
			}
			TagMarker::End => ReplacementKind::ConditionalEnd { linked_tag: None },
		};
		(field_segment, kind)
	} else {
		parse_standard(inner, inner_start)
	};

	Replacement {
		id,
		content: found.text.to_string(),
		start: found.start,
		end: found.end,
		field_segment,
		kind,
		parent_conditional: None,
	}
}

/// Split on `:`; the last segment is the field, everything before it is a
/// filter.
fn parse_standard(inner: &str, inner_start: usize) -> (FieldSegment, ReplacementKind) {
	let mut segments = Vec::new();
	let mut segment_start = 0;

	for (index, _) in inner.match_indices(SEGMENT_DELIMITER) {
		segments.push((segment_start, index));
		segment_start = index + SEGMENT_DELIMITER.len_utf8();
	}

	let field_segment = parse_field_segment(&inner[segment_start..], inner_start + segment_start);
	let filter_segments = segments
		.into_iter()
		.map(|(start, end)| parse_filter_segment(&inner[start..end], inner_start + start))
		.collect();

	(field_segment, ReplacementKind::Standard { filter_segments })
}

fn parse_field_segment(source: &str, start: usize) -> FieldSegment {
	let field = field_name_span(source).map(|span| {
		Field {
			content: source[span.clone()].to_string(),
			start: start + span.start,
			end: start + span.end,
		}
	});

	FieldSegment {
		content: source.to_string(),
		start,
		end: start + source.len(),
		field,
	}
}

fn parse_filter_segment(source: &str, start: usize) -> FilterSegment {
	FilterSegment {
		content: source.to_string(),
		start,
		end: start + source.len(),
		filter: parse_filter(source, start),
	}
}

/// The first word is the filter name, every following word an argument.
fn parse_filter(source: &str, start: usize) -> Option<Filter> {
	let words = filter_words(source);
	let ((name, name_span), arguments) = words.split_first()?;
	let last_end = words.last().map_or(name_span.end, |(_, span)| span.end);

	let arguments = arguments
		.iter()
		.map(|(word, span)| parse_argument(word, start + span.start))
		.collect();

	Some(Filter {
		content: source[name_span.start..last_end].to_string(),
		start: start + name_span.start,
		end: start + last_end,
		name: TextNode::new(*name, start + name_span.start),
		arguments,
	})
}

fn parse_argument(word: &str, start: usize) -> FilterArgument {
	let Some(equals) = unescaped_equals(word) else {
		return FilterArgument::Positional(TextNode::new(word, start));
	};

	let divider_len = word[equals..].bytes().take_while(|byte| *byte == b'=').count();
	let value_start = equals + divider_len;
	let key = (equals > 0).then(|| TextNode::new(&word[..equals], start));
	let divider = TextNode::new(&word[equals..value_start], start + equals);

	let mut value = Vec::new();
	let mut part_start = value_start;
	for part in word[value_start..].split(',') {
		if !part.is_empty() {
			value.push(TextNode::new(part, start + part_start));
		}
		part_start += part.len() + 1;
	}

	FilterArgument::KeyValue(FilterArgumentKeyValue {
		content: word.to_string(),
		start,
		end: start + word.len(),
		key,
		divider,
		value,
	})
}

/// Pair conditional starts with ends and record nesting.
///
/// A single left-to-right pass with a stack of open starts. An end closes the
/// innermost open start whatever its field name is; a name mismatch is a
/// diagnostic, not a parse decision. Every replacement records the innermost
/// open start as its parent and is added to that start's children.
fn link_conditionals(replacements: &mut [Replacement]) {
	let mut open: Vec<ReplacementId> = Vec::new();

	for index in 0..replacements.len() {
		let id = ReplacementId(index);

		if let ReplacementKind::ConditionalEnd { .. } = replacements[index].kind {
			if let Some(start) = open.pop() {
				set_linked_tag(&mut replacements[start.0], id);
				set_linked_tag(&mut replacements[index], start);
			}
		}

		let parent = open.last().copied();
		replacements[index].parent_conditional = parent;

		if let Some(parent) = parent {
			if let ReplacementKind::ConditionalStart {
				child_replacements, ..
			} = &mut replacements[parent.0].kind
			{
				child_replacements.push(id);
			}
		}

		if replacements[index].is_conditional_start() {
			open.push(id);
		}
	}

	if !open.is_empty() {
		tracing::trace!(unclosed = open.len(), "conditionals left open");
	}
}

fn set_linked_tag(replacement: &mut Replacement, other: ReplacementId) {
	match &mut replacement.kind {
		ReplacementKind::ConditionalStart { linked_tag, .. }
		| ReplacementKind::ConditionalEnd { linked_tag } => *linked_tag = Some(other),
		ReplacementKind::Standard { .. } => {}
	}
}
