use derive_more::Display;
use serde::Deserialize;
use serde::Serialize;

use crate::AstNode;
use crate::FilterArgument;
use crate::Replacement;
use crate::ReplacementKind;
use crate::TemplateDocument;

/// Filters every Anki installation understands.
pub const BUILTIN_FILTERS: [(&str, &str); 10] = [
	("text", "Strip HTML from the field, leaving plain text."),
	("furigana", "Render `kanji[reading]` as ruby text."),
	("kana", "Show only the reading of `kanji[reading]` text."),
	("kanji", "Show only the kanji of `kanji[reading]` text."),
	("cloze", "Render cloze deletions of the current card."),
	("cloze-only", "Render only the cloze deletion text, e.g. for TTS."),
	("hint", "Hide the field behind a link that reveals it."),
	("type", "Show an input box to type the answer in."),
	("tts", "Read the field aloud. Usage: `tts en_US voices=Alice speed=1.2`."),
	("tts-voices", "List the available text-to-speech voices."),
];

/// Fields provided by Anki itself rather than by the note type.
pub const SPECIAL_FIELDS: [&str; 8] = [
	"FrontSide",
	"Tags",
	"Type",
	"Deck",
	"Subdeck",
	"Card",
	"CardFlag",
	"CardID",
];

pub fn builtin_filter_description(name: &str) -> Option<&'static str> {
	BUILTIN_FILTERS
		.iter()
		.find(|(builtin, _)| *builtin == name)
		.map(|(_, description)| *description)
}

pub fn is_special_field(name: &str) -> bool {
	SPECIAL_FIELDS.contains(&name)
}

/// Settings for [`validate`]. Structural errors are always reported; the
/// toggles only cover warnings and the name mismatch check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ValidationOptions {
	/// Fields of the note type. Unknown field warnings need at least one.
	pub known_fields: Vec<String>,
	/// Filters from add-ons, accepted on top of [`BUILTIN_FILTERS`].
	pub custom_filters: Vec<String>,
	pub unknown_filters: bool,
	pub unknown_fields: bool,
	pub mismatched_conditionals: bool,
	pub invalid_field_names: bool,
}

impl Default for ValidationOptions {
	fn default() -> Self {
		Self {
			known_fields: Vec::new(),
			custom_filters: Vec::new(),
			unknown_filters: true,
			unknown_fields: true,
			mismatched_conditionals: true,
			invalid_field_names: true,
		}
	}
}

impl ValidationOptions {
	fn is_known_filter(&self, name: &str) -> bool {
		builtin_filter_description(name).is_some() || self.custom_filters.iter().any(|f| f == name)
	}

	fn is_known_field(&self, name: &str) -> bool {
		is_special_field(name) || self.known_fields.iter().any(|f| f == name)
	}
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	#[display("error")]
	Error,
	#[display("warning")]
	Warning,
	#[display("information")]
	Information,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DiagnosticKind {
	MissingField,
	MissingFilter,
	UnclosedConditional { name: Option<String> },
	OrphanConditionalEnd { name: Option<String> },
	MismatchedConditional { expected: String, found: String },
	FilterInConditional,
	InvalidFieldName { segment: String },
	MalformedArgument { argument: String },
	UnknownFilter { name: String },
	UnknownField { name: String },
}

impl DiagnosticKind {
	pub fn code(&self) -> &'static str {
		match self {
			Self::MissingField => "missing_field",
			Self::MissingFilter => "missing_filter",
			Self::UnclosedConditional { .. } => "unclosed_conditional",
			Self::OrphanConditionalEnd { .. } => "orphan_conditional_end",
			Self::MismatchedConditional { .. } => "mismatched_conditional",
			Self::FilterInConditional => "filter_in_conditional",
			Self::InvalidFieldName { .. } => "invalid_field_name",
			Self::MalformedArgument { .. } => "malformed_argument",
			Self::UnknownFilter { .. } => "unknown_filter",
			Self::UnknownField { .. } => "unknown_field",
		}
	}

	pub fn severity(&self) -> Severity {
		match self {
			Self::MissingField
			| Self::MissingFilter
			| Self::UnclosedConditional { .. }
			| Self::OrphanConditionalEnd { .. }
			| Self::MismatchedConditional { .. }
			| Self::FilterInConditional => Severity::Error,
			Self::InvalidFieldName { .. }
			| Self::MalformedArgument { .. }
			| Self::UnknownFilter { .. }
			| Self::UnknownField { .. } => Severity::Warning,
		}
	}

	pub fn message(&self) -> String {
		match self {
			Self::MissingField => "Missing field name".to_string(),
			Self::MissingFilter => "Missing filter name before `:`".to_string(),
			Self::UnclosedConditional { name } => {
				format!("Conditional `{}` is never closed", name.as_deref().unwrap_or(""))
			}
			Self::OrphanConditionalEnd { name } => {
				format!(
					"Closing tag `{}` has no matching opening tag",
					name.as_deref().unwrap_or("")
				)
			}
			Self::MismatchedConditional { expected, found } => {
				format!("Closing tag `{found}` does not match opening tag `{expected}`")
			}
			Self::FilterInConditional => "Filters cannot be used in conditional tags".to_string(),
			Self::InvalidFieldName { segment } => {
				format!("Invalid characters in field name `{}`", segment.trim())
			}
			Self::MalformedArgument { argument } => {
				format!("Filter argument `{argument}` is missing a key before `=`")
			}
			Self::UnknownFilter { name } => format!("Unknown filter `{name}`"),
			Self::UnknownField { name } => format!("Unknown field `{name}`"),
		}
	}
}

/// A problem found in a parsed template, with the byte span it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDiagnostic {
	pub kind: DiagnosticKind,
	pub severity: Severity,
	pub start: usize,
	pub end: usize,
}

impl TemplateDiagnostic {
	fn new(kind: DiagnosticKind, node: &impl AstNode) -> Self {
		Self {
			severity: kind.severity(),
			kind,
			start: node.start(),
			end: node.end(),
		}
	}

	pub fn message(&self) -> String {
		self.kind.message()
	}

	pub fn is_error(&self) -> bool {
		self.severity == Severity::Error
	}
}

/// Turn the structural facts of a parsed template into diagnostics, in
/// document order.
pub fn validate(doc: &TemplateDocument, options: &ValidationOptions) -> Vec<TemplateDiagnostic> {
	let mut diagnostics = Vec::new();

	for replacement in doc.iter() {
		validate_field(replacement, options, &mut diagnostics);

		match &replacement.kind {
			ReplacementKind::Standard { filter_segments } => {
				for segment in filter_segments {
					let Some(filter) = &segment.filter else {
						diagnostics.push(TemplateDiagnostic::new(DiagnosticKind::MissingFilter, segment));
						continue;
					};

					if options.unknown_filters && !options.is_known_filter(filter.name()) {
						diagnostics.push(TemplateDiagnostic::new(
							DiagnosticKind::UnknownFilter {
								name: filter.name().to_string(),
							},
							&filter.name,
						));
					}

					for argument in &filter.arguments {
						if let FilterArgument::KeyValue(key_value) = argument {
							if key_value.key.is_none() {
								diagnostics.push(TemplateDiagnostic::new(
									DiagnosticKind::MalformedArgument {
										argument: key_value.content.clone(),
									},
									key_value,
								));
							}
						}
					}
				}
			}
			ReplacementKind::ConditionalStart { linked_tag, .. } => {
				validate_conditional_filters(replacement, &mut diagnostics);
				if linked_tag.is_none() {
					diagnostics.push(TemplateDiagnostic::new(
						DiagnosticKind::UnclosedConditional {
							name: replacement.field_name().map(ToString::to_string),
						},
						replacement,
					));
				}
			}
			ReplacementKind::ConditionalEnd { linked_tag } => {
				validate_conditional_filters(replacement, &mut diagnostics);
				match linked_tag.and_then(|id| doc.replacement(id)) {
					None => {
						diagnostics.push(TemplateDiagnostic::new(
							DiagnosticKind::OrphanConditionalEnd {
								name: replacement.field_name().map(ToString::to_string),
							},
							replacement,
						));
					}
					Some(start) if options.mismatched_conditionals => {
						if let (Some(expected), Some(found)) = (start.field_name(), replacement.field_name()) {
							if expected != found {
								diagnostics.push(TemplateDiagnostic::new(
									DiagnosticKind::MismatchedConditional {
										expected: expected.to_string(),
										found: found.to_string(),
									},
									replacement,
								));
							}
						}
					}
					Some(_) => {}
				}
			}
		}
	}

	tracing::debug!(diagnostics = diagnostics.len(), "validated template");
	diagnostics
}

fn validate_field(
	replacement: &Replacement,
	options: &ValidationOptions,
	diagnostics: &mut Vec<TemplateDiagnostic>,
) {
	let segment = &replacement.field_segment;
	let Some(field) = &segment.field else {
		diagnostics.push(TemplateDiagnostic::new(DiagnosticKind::MissingField, replacement));
		return;
	};

	// Conditionals report a stray `:` separately.
	let trimmed = if replacement.is_conditional() {
		segment.content.split(':').next().unwrap_or_default().trim()
	} else {
		segment.content.trim()
	};

	if options.invalid_field_names && trimmed != field.content {
		diagnostics.push(TemplateDiagnostic::new(
			DiagnosticKind::InvalidFieldName {
				segment: segment.content.clone(),
			},
			segment,
		));
	}

	if options.unknown_fields
		&& !options.known_fields.is_empty()
		&& !options.is_known_field(field.name())
	{
		diagnostics.push(TemplateDiagnostic::new(
			DiagnosticKind::UnknownField {
				name: field.name().to_string(),
			},
			field,
		));
	}
}

fn validate_conditional_filters(replacement: &Replacement, diagnostics: &mut Vec<TemplateDiagnostic>) {
	if replacement.field_segment.content.contains(':') {
		diagnostics.push(TemplateDiagnostic::new(
			DiagnosticKind::FilterInConditional,
			&replacement.field_segment,
		));
	}
}
