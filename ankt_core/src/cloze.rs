use serde::Deserialize;
use serde::Serialize;

use crate::TemplateDocument;

/// A cloze field name offered to the user, e.g. `c2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClozeSuggestion {
	pub num: u64,
	pub name: String,
	/// `true` for the "next number" entry that no tag in the document uses
	/// yet.
	pub synthetic: bool,
}

/// Parse the number out of a cloze field name (`c1`, `c2`, `c007`, ...).
///
/// The name must be exactly `c` followed by digits that are not all zero.
/// Leading zeros are ignored for the numeric value.
pub fn cloze_number(name: &str) -> Option<u64> {
	let digits = name.strip_prefix('c')?;
	if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
		return None;
	}

	let significant = digits.trim_start_matches('0');
	if significant.is_empty() {
		return None;
	}

	significant.parse().ok()
}

/// Collect the cloze fields referenced by conditional tags, ordered by
/// number, with a synthetic `c<n+1>` inserted right after the longest run
/// `c1, c2, ..., c<n>`.
///
/// With `c1`, `c2` and `c4` in the document the result is `c1, c2, c3, c4`
/// where `c3` is synthetic. A document without cloze tags yields only `c1`.
pub fn cloze_suggestions(doc: &TemplateDocument) -> Vec<ClozeSuggestion> {
	let mut found: Vec<ClozeSuggestion> = Vec::new();

	for replacement in doc.iter().filter(|replacement| replacement.is_conditional()) {
		let Some(name) = replacement.field_name() else {
			continue;
		};
		let Some(num) = cloze_number(name) else {
			continue;
		};
		if found.iter().any(|existing| existing.name == name) {
			continue;
		}

		found.push(ClozeSuggestion {
			num,
			name: name.to_string(),
			synthetic: false,
		});
	}

	found.sort_by_key(|suggestion| suggestion.num);

	let mut max_consecutive = 0;
	let mut prefix_len = 0;
	for suggestion in &found {
		if suggestion.num == max_consecutive + 1 {
			max_consecutive += 1;
		} else if suggestion.num > max_consecutive {
			break;
		}
		prefix_len += 1;
	}

	let next = max_consecutive + 1;
	found.insert(
		prefix_len,
		ClozeSuggestion {
			num: next,
			name: format!("c{next}"),
			synthetic: true,
		},
	);

	found
}
