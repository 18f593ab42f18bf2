use std::ops::Range;
use std::str::FromStr;

use derive_more::Display;
use serde::Deserialize;
use serde::Serialize;

use crate::AnktError;
use crate::HtmlScanner;
use crate::MarkupScanner;
use crate::replacement_matches;

/// A sub-language of a card template document.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
	/// The `{{...}}` replacement language.
	#[display("template")]
	Template,
	/// Everything else; the fallback language of a document.
	#[display("html")]
	Html,
	/// Bodies of `<script>` elements.
	#[display("javascript")]
	JavaScript,
	/// Bodies of `<style>` elements.
	#[display("css")]
	Css,
}

impl Language {
	pub const ALL: [Language; 4] = [Self::Template, Self::Html, Self::JavaScript, Self::Css];

	pub fn id(self) -> &'static str {
		match self {
			Self::Template => "template",
			Self::Html => "html",
			Self::JavaScript => "javascript",
			Self::Css => "css",
		}
	}

	pub fn file_extension(self) -> &'static str {
		match self {
			Self::Template => "anki",
			Self::Html => "html",
			Self::JavaScript => "js",
			Self::Css => "css",
		}
	}

	pub fn from_id(id: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|language| language.id() == id)
	}
}

impl FromStr for Language {
	type Err = AnktError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::from_id(value).ok_or_else(|| AnktError::UnknownLanguage(value.to_string()))
	}
}

/// One span of a single language, rendered as a virtual document.
///
/// When `blank_surroundings` is set, `content` has the byte length of the
/// whole source text and everything outside the region's own span (or, for a
/// merged region, outside every span of that language) is blanked. Offsets
/// into `content` are therefore offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRegion {
	pub language: Language,
	pub content: String,
	pub start: usize,
	pub end: usize,
	pub blank_surroundings: bool,
}

impl LanguageRegion {
	pub fn language_id(&self) -> &'static str {
		self.language.id()
	}

	pub fn file_extension(&self) -> &'static str {
		self.language.file_extension()
	}

	pub fn contains(&self, offset: usize) -> bool {
		self.start <= offset && offset <= self.end
	}

	pub fn span(&self) -> Range<usize> {
		self.start..self.end
	}

	/// The region's own text, without surroundings.
	pub fn text(&self) -> &str {
		self.content.get(self.span()).unwrap_or_default()
	}
}

/// Whether a character survives blanking.
fn is_line_terminator(ch: char) -> bool {
	matches!(ch, '\n' | '\r')
}

fn push_blank(output: &mut String, ch: char) {
	if is_line_terminator(ch) {
		output.push(ch);
	} else {
		output.extend(std::iter::repeat_n(' ', ch.len_utf8()));
	}
}

/// Replace every character in `range` with spaces, one per byte, keeping line
/// terminators. The result has exactly the byte length of `text`.
pub fn blank_range(text: &str, range: Range<usize>) -> String {
	let mut output = String::with_capacity(text.len());

	for (index, ch) in text.char_indices() {
		if range.contains(&index) {
			push_blank(&mut output, ch);
		} else {
			output.push(ch);
		}
	}

	output
}

/// Blank everything outside `range`, keeping line terminators.
pub fn blank_surroundings(text: &str, range: Range<usize>) -> String {
	let mut output = String::with_capacity(text.len());

	for (index, ch) in text.char_indices() {
		if range.contains(&index) {
			output.push(ch);
		} else {
			push_blank(&mut output, ch);
		}
	}

	output
}

/// Blank every `{{...}}` span in `text`.
pub fn blank_template_spans(text: &str) -> String {
	let spans: Vec<Range<usize>> = replacement_matches(text)
		.iter()
		.map(|found| found.start..found.end)
		.collect();
	let mut output = String::with_capacity(text.len());
	let mut spans = spans.iter().peekable();

	for (index, ch) in text.char_indices() {
		while spans.peek().is_some_and(|span| span.end <= index) {
			spans.next();
		}

		if spans.peek().is_some_and(|span| span.contains(&index)) {
			push_blank(&mut output, ch);
		} else {
			output.push(ch);
		}
	}

	output
}

/// Split a document into per-occurrence language regions using the default
/// [`HtmlScanner`].
pub fn get_language_regions(text: &str) -> Vec<LanguageRegion> {
	language_regions_with(text, &HtmlScanner)
}

/// Split a document into per-occurrence language regions.
///
/// Order: every template span, then every script/style body, then one html
/// region covering the whole document. Script and style bodies are found on a
/// copy with all template spans blanked, and their content comes from that
/// copy, so template text never leaks into a javascript or css document.
pub fn language_regions_with(text: &str, scanner: &impl MarkupScanner) -> Vec<LanguageRegion> {
	let mut regions: Vec<LanguageRegion> = replacement_matches(text)
		.iter()
		.map(|found| {
			LanguageRegion {
				language: Language::Template,
				content: blank_surroundings(text, found.start..found.end),
				start: found.start,
				end: found.end,
				blank_surroundings: true,
			}
		})
		.collect();

	let without_templates = blank_template_spans(text);
	regions.extend(
		scanner
			.embedded_spans(&without_templates)
			.into_iter()
			.map(|span| {
				LanguageRegion {
					language: span.language,
					content: blank_surroundings(&without_templates, span.start..span.end),
					start: span.start,
					end: span.end,
					blank_surroundings: true,
				}
			}),
	);

	regions.push(LanguageRegion {
		language: Language::Html,
		content: text.to_string(),
		start: 0,
		end: text.len(),
		blank_surroundings: true,
	});

	tracing::debug!(regions = regions.len(), "extracted language regions");
	regions
}

/// Combine all regions of `language` into one virtual document.
///
/// Starts from the first region's content and splices every later region's
/// own text in at its offsets. The merged `start` and `end` are the first
/// region's start and the last region's end.
pub fn merge_language(regions: &[LanguageRegion], language: Language) -> Option<LanguageRegion> {
	let mut matching = regions.iter().filter(|region| region.language == language);
	let mut merged = matching.next()?.clone();

	for region in matching {
		let span = region.span();
		if let Some(text) = region.content.get(span.clone()) {
			if merged.content.is_char_boundary(span.start) && merged.content.is_char_boundary(span.end) {
				merged.content.replace_range(span, text);
			}
		}
		merged.end = region.end;
	}

	Some(merged)
}

/// Merge regions into one per language, in order of first appearance.
pub fn merge_regions(regions: &[LanguageRegion]) -> Vec<LanguageRegion> {
	let mut languages: Vec<Language> = Vec::new();
	for region in regions {
		if !languages.contains(&region.language) {
			languages.push(region.language);
		}
	}

	languages
		.into_iter()
		.filter_map(|language| merge_language(regions, language))
		.collect()
}

/// The merged virtual document for the language under `offset`.
///
/// The language is that of the first per-occurrence region containing the
/// offset; template spans win over script and style bodies, which win over
/// the html fallback. Offsets past the end are clamped.
pub fn get_region_at_position(text: &str, offset: usize) -> LanguageRegion {
	let offset = offset.min(text.len());
	let regions = get_language_regions(text);
	let language = regions
		.iter()
		.find(|region| region.contains(offset))
		.map_or(Language::Html, |region| region.language);

	merge_language(&regions, language).unwrap_or_else(|| {
		LanguageRegion {
			language: Language::Html,
			content: text.to_string(),
			start: 0,
			end: text.len(),
			blank_surroundings: true,
		}
	})
}

/// The merged virtual document for `language`, if the document has any
/// region of it.
pub fn get_region_by_language(text: &str, language: Language) -> Option<LanguageRegion> {
	merge_language(&get_language_regions(text), language)
}
