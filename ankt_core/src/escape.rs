//! Reversible escaping of template text embedded in a markup document.
//!
//! Before a markup virtual document goes to an external formatter, the text of
//! every template span is entity-escaped so the formatter treats it as plain
//! text. The formatter's output is unescaped at the shifted spans afterwards.

use std::ops::Range;

use serde::Serialize;

use crate::Language;
use crate::LanguageRegion;

/// Substitutions applied on escape, in order. Unescape applies them in
/// reverse so `&` is restored last.
const ENTITIES: [(char, &str); 6] = [
	('&', "&amp;"),
	('<', "&lt;"),
	('>', "&gt;"),
	('"', "&quot;"),
	('\'', "&#39;"),
	('/', "&#x2F;"),
];

/// Text after a rewrite, with the rewritten spans at their new offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewrittenText {
	pub text: String,
	pub spans: Vec<Range<usize>>,
}

pub fn escape(value: &str) -> String {
	let mut output = String::with_capacity(value.len());
	for ch in value.chars() {
		match ENTITIES.iter().find(|(plain, _)| *plain == ch) {
			Some((_, entity)) => output.push_str(entity),
			None => output.push(ch),
		}
	}
	output
}

pub fn unescape(value: &str) -> String {
	ENTITIES
		.iter()
		.rev()
		.fold(value.to_string(), |text, (plain, entity)| {
			text.replace(entity, plain.encode_utf8(&mut [0; 4]))
		})
}

/// The spans of every template region, in document order.
pub fn template_spans(regions: &[LanguageRegion]) -> Vec<Range<usize>> {
	let mut spans: Vec<Range<usize>> = regions
		.iter()
		.filter(|region| region.language == Language::Template)
		.map(LanguageRegion::span)
		.collect();
	spans.sort_by_key(|span| span.start);
	spans
}

/// Escape the text of each template span in `text`.
pub fn escape_template_regions(text: &str, spans: &[Range<usize>]) -> RewrittenText {
	rewrite_spans(text, spans, escape)
}

/// Undo [`escape_template_regions`], given the spans it returned.
pub fn unescape_template_regions(text: &str, spans: &[Range<usize>]) -> RewrittenText {
	rewrite_spans(text, spans, unescape)
}

/// Apply `rewrite` to each span in order, shifting every later span by the
/// running length delta. Spans that fall outside the text or off a character
/// boundary are left untouched.
fn rewrite_spans(
	text: &str,
	spans: &[Range<usize>],
	rewrite: impl Fn(&str) -> String,
) -> RewrittenText {
	let mut output = text.to_string();
	let mut shifted = Vec::with_capacity(spans.len());
	let mut delta: isize = 0;

	let mut ordered = spans.to_vec();
	ordered.sort_by_key(|span| span.start);

	for span in ordered {
		let start = span.start.saturating_add_signed(delta);
		let end = span.end.saturating_add_signed(delta);

		let Some(original) = output.get(start..end) else {
			shifted.push(start..end);
			continue;
		};

		let replaced = rewrite(original);
		delta += replaced.len() as isize - (end - start) as isize;
		let new_end = start + replaced.len();
		output.replace_range(start..end, &replaced);
		shifted.push(start..new_end);
	}

	RewrittenText {
		text: output,
		spans: shifted,
	}
}
