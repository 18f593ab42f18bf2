use std::collections::BTreeSet;

use crate::AstNode;
use crate::ConditionalType;
use crate::Field;
use crate::FieldSegment;
use crate::Filter;
use crate::FilterArgument;
use crate::FilterSegment;
use crate::Replacement;
use crate::ReplacementId;
use crate::TemplateDocument;

/// Return the first node, in iteration order, containing `offset`.
pub fn find_first_containing<'a, T>(
	nodes: impl IntoIterator<Item = &'a T>,
	offset: usize,
) -> Option<&'a T>
where
	T: AstNode + 'a,
{
	nodes.into_iter().find(|node| node.contains(offset))
}

/// The innermost node under a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAtOffset<'a> {
	/// Inside a field name.
	Field {
		replacement: &'a Replacement,
		field: &'a Field,
	},
	/// Inside a field segment with no field name under the cursor.
	FieldSegment {
		replacement: &'a Replacement,
		segment: &'a FieldSegment,
	},
	/// Inside a filter name.
	Filter {
		replacement: &'a Replacement,
		filter: &'a Filter,
	},
	/// Inside one of a filter's arguments.
	FilterArgument {
		replacement: &'a Replacement,
		filter: &'a Filter,
		argument: &'a FilterArgument,
	},
	/// Inside a filter segment but not on its name or an argument.
	FilterSegment {
		replacement: &'a Replacement,
		segment: &'a FilterSegment,
	},
	/// On the delimiters or markers of a replacement.
	Replacement(&'a Replacement),
}

impl<'a> NodeAtOffset<'a> {
	pub fn replacement(&self) -> &'a Replacement {
		match self {
			Self::Field { replacement, .. }
			| Self::FieldSegment { replacement, .. }
			| Self::Filter { replacement, .. }
			| Self::FilterArgument { replacement, .. }
			| Self::FilterSegment { replacement, .. }
			| Self::Replacement(replacement) => replacement,
		}
	}
}

/// Resolve the innermost node under `offset`.
///
/// Filter segments are checked before the field segment, so a cursor sitting
/// on the `:` between them is reported inside the filter segment it ends.
pub fn node_at_offset(doc: &TemplateDocument, offset: usize) -> Option<NodeAtOffset<'_>> {
	let replacement = doc.replacement_at(offset)?;

	if let Some(segment) = find_first_containing(replacement.filter_segments(), offset) {
		let Some(filter) = &segment.filter else {
			return Some(NodeAtOffset::FilterSegment {
				replacement,
				segment,
			});
		};

		if filter.name.contains(offset) {
			return Some(NodeAtOffset::Filter {
				replacement,
				filter,
			});
		}

		if let Some(argument) = find_first_containing(&filter.arguments, offset) {
			return Some(NodeAtOffset::FilterArgument {
				replacement,
				filter,
				argument,
			});
		}

		return Some(NodeAtOffset::FilterSegment {
			replacement,
			segment,
		});
	}

	let segment = &replacement.field_segment;
	if segment.contains(offset) {
		if let Some(field) = segment.field.as_ref().filter(|field| field.contains(offset)) {
			return Some(NodeAtOffset::Field { replacement, field });
		}

		return Some(NodeAtOffset::FieldSegment {
			replacement,
			segment,
		});
	}

	Some(NodeAtOffset::Replacement(replacement))
}

/// The conditionals enclosing `id`, outermost first.
pub fn ancestors(doc: &TemplateDocument, id: ReplacementId) -> Vec<ReplacementId> {
	let mut chain = Vec::new();
	let mut current = doc.replacement(id).and_then(|r| r.parent_conditional);

	while let Some(parent) = current {
		chain.push(parent);
		current = doc.replacement(parent).and_then(|r| r.parent_conditional);
	}

	chain.reverse();
	chain
}

/// Field names that make no sense at `id`.
///
/// For a standard replacement these are the fields of every enclosing `^`
/// conditional: the field is known to be empty there. For a conditional tag it
/// is the field of every enclosing conditional of either type.
pub fn unavailable_field_names(doc: &TemplateDocument, id: ReplacementId) -> BTreeSet<String> {
	let Some(replacement) = doc.replacement(id) else {
		return BTreeSet::new();
	};
	let only_empty = replacement.is_standard();

	ancestors(doc, id)
		.into_iter()
		.filter_map(|ancestor| doc.replacement(ancestor))
		.filter(|ancestor| {
			!only_empty || ancestor.conditional_type() == Some(ConditionalType::Empty)
		})
		.filter_map(|ancestor| ancestor.field_name().map(ToString::to_string))
		.collect()
}

/// Every replacement whose field is named `name`.
pub fn replacements_with_field<'a>(doc: &'a TemplateDocument, name: &str) -> Vec<&'a Replacement> {
	doc.iter()
		.filter(|replacement| replacement.field_name() == Some(name))
		.collect()
}

/// All distinct field names referenced in the document.
pub fn referenced_field_names(doc: &TemplateDocument) -> BTreeSet<String> {
	doc.iter()
		.filter_map(|replacement| replacement.field_name().map(ToString::to_string))
		.collect()
}
