use ankt_core::FieldsConfig;
use ankt_core::FiltersConfig;
use rstest::rstest;
use similar_asserts::assert_eq;
#[allow(unused_imports)]
use tower_lsp_server::ls_types::*;

use super::*;

fn test_uri() -> Uri {
	"file:///tmp/test/back.html"
		.parse::<Uri>()
		.unwrap_or_else(|_| panic!("invalid test URI"))
}

fn make_state_with_config(content: &str, config: AnktConfig) -> (WorkspaceState, Uri) {
	let uri = test_uri();
	let options = config.validation_options();
	let mut documents = HashMap::new();
	documents.insert(uri.clone(), DocumentState::new(content.to_string(), &options));

	let state = WorkspaceState {
		root: None,
		config,
		options,
		documents,
	};

	(state, uri)
}

fn make_state(content: &str) -> (WorkspaceState, Uri) {
	make_state_with_config(content, AnktConfig::default())
}

fn pos(line: u32, character: u32) -> Position {
	Position { line, character }
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
	items.iter().map(|item| item.label.as_str()).collect()
}

fn hover_text(hover: &Hover) -> &str {
	match &hover.contents {
		HoverContents::Markup(markup) => &markup.value,
		_ => panic!("expected markup hover contents"),
	}
}

// ---------------------------------------------------------------------------
// Position conversion
// ---------------------------------------------------------------------------

#[rstest]
#[case::start(pos(0, 0), Some(0))]
#[case::after_two_byte_char(pos(0, 1), Some(2))]
#[case::end_of_first_line(pos(0, 7), Some(8))]
#[case::second_line(pos(1, 0), Some(9))]
#[case::after_surrogate_pair(pos(1, 2), Some(13))]
#[case::end_of_text(pos(1, 3), Some(14))]
#[case::inside_surrogate_pair(pos(1, 1), None)]
#[case::past_end_of_line(pos(0, 20), None)]
#[case::missing_line(pos(5, 0), None)]
fn lsp_position_to_offset_counts_utf16(#[case] position: Position, #[case] expected: Option<usize>) {
	let content = "é{{A}}b\n😀x";
	let lines = LineIndex::new(content);

	assert_eq!(lsp_position_to_offset(content, &lines, position), expected);
}

#[test]
fn offset_to_lsp_position_counts_utf16() {
	let content = "é{{A}}b\n😀x";
	let lines = LineIndex::new(content);

	assert_eq!(offset_to_lsp_position(content, &lines, 0), pos(0, 0));
	assert_eq!(offset_to_lsp_position(content, &lines, 2), pos(0, 1));
	assert_eq!(offset_to_lsp_position(content, &lines, 9), pos(1, 0));
	assert_eq!(offset_to_lsp_position(content, &lines, 13), pos(1, 2));
	assert_eq!(offset_to_lsp_position(content, &lines, 100), pos(1, 3));
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

fn change(range: Option<Range>, text: &str) -> TextDocumentContentChangeEvent {
	#[allow(deprecated)]
	let event = TextDocumentContentChangeEvent {
		range,
		range_length: None,
		text: text.to_string(),
	};
	event
}

#[test]
fn content_changes_apply_in_order() {
	let mut content = "{{Front}}\n{{Back}}".to_string();
	apply_content_changes(&mut content, vec![
		change(
			Some(Range {
				start: pos(0, 2),
				end: pos(0, 7),
			}),
			"Question",
		),
		change(
			Some(Range {
				start: pos(1, 8),
				end: pos(1, 8),
			}),
			"!",
		),
	]);

	assert_eq!(content, "{{Question}}\n{{Back}}!");

	apply_content_changes(&mut content, vec![change(None, "{{Text}}")]);
	assert_eq!(content, "{{Text}}");
}

#[rstest]
#[case::reversed(pos(0, 7), pos(0, 2))]
#[case::out_of_bounds(pos(0, 2), pos(4, 0))]
fn invalid_change_ranges_are_skipped(#[case] start: Position, #[case] end: Position) {
	let mut content = "{{Front}}".to_string();
	apply_content_changes(&mut content, vec![change(Some(Range { start, end }), "x")]);

	assert_eq!(content, "{{Front}}");
}

#[test]
fn document_state_parses_every_template_span() {
	let (state, uri) = make_state("<b>{{Front}}</b>\n<script>let a = '{{Back}}';</script>");
	let doc = &state.documents[&uri];

	assert_eq!(doc.template.len(), 2);
	assert_eq!(doc.template[0].field_name(), Some("Front"));
	assert_eq!(doc.template[0].start, 3);
	assert_eq!(doc.template[1].field_name(), Some("Back"));
	assert_eq!(&doc.content[doc.template[1].start..doc.template[1].end], "{{Back}}");
}

#[test]
fn document_without_template_text_is_empty() {
	let (state, uri) = make_state("<p>plain</p>");

	assert!(state.documents[&uri].template.is_empty());
	assert!(compute_diagnostics(&state, &uri).is_empty());
}

#[test]
fn reload_config_revalidates_open_documents() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
	std::fs::write(tmp.path().join("ankt.toml"), "[fields]\nnames = [\"Front\"]\n")
		.unwrap_or_else(|e| panic!("write failed: {e}"));

	let (mut state, uri) = make_state("{{Front}} {{Back}}");
	assert!(state.documents[&uri].diagnostics.is_empty());

	state.root = Some(tmp.path().to_path_buf());
	state.reload_config();

	assert_eq!(state.options.known_fields, vec!["Front".to_string()]);
	let diagnostics = &state.documents[&uri].diagnostics;
	assert_eq!(diagnostics.len(), 1);
	assert_eq!(diagnostics[0].kind.code(), "unknown_field");
}

#[test]
fn reload_config_with_invalid_toml_falls_back_to_defaults() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
	std::fs::write(tmp.path().join("ankt.toml"), "[fields\nnames = 1")
		.unwrap_or_else(|e| panic!("write failed: {e}"));

	let (mut state, _) = make_state("{{Front}}");
	state.root = Some(tmp.path().to_path_buf());
	state.reload_config();

	assert_eq!(state.config, AnktConfig::default());
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[test]
fn diagnostics_carry_code_severity_and_range() {
	let (state, uri) = make_state("<p>\n{{#Back}}</p>");
	let diagnostics = compute_diagnostics(&state, &uri);

	assert_eq!(diagnostics.len(), 1);
	let diagnostic = &diagnostics[0];
	assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
	assert_eq!(
		diagnostic.code,
		Some(NumberOrString::String("unclosed_conditional".to_string()))
	);
	assert_eq!(diagnostic.source.as_deref(), Some("ankt"));
	assert_eq!(diagnostic.range, Range {
		start: pos(1, 0),
		end: pos(1, 9),
	});
}

#[test]
fn unknown_filter_suggests_close_builtin() {
	let (state, uri) = make_state("{{tex:Front}}");
	let diagnostics = compute_diagnostics(&state, &uri);

	assert_eq!(diagnostics.len(), 1);
	assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
	assert_eq!(
		diagnostics[0].message,
		"Unknown filter `tex`. Did you mean `text`?"
	);
}

#[test]
fn unknown_field_suggests_configured_field() {
	let config = AnktConfig {
		fields: FieldsConfig {
			names: vec!["Front".to_string(), "Back".to_string()],
		},
		..Default::default()
	};
	let (state, uri) = make_state_with_config("{{Frnt}} {{Whatever}}", config);
	let messages: Vec<String> = compute_diagnostics(&state, &uri)
		.into_iter()
		.map(|diagnostic| diagnostic.message)
		.collect();

	assert_eq!(messages, vec![
		"Unknown field `Frnt`. Did you mean `Front`?".to_string(),
		"Unknown field `Whatever`".to_string(),
	]);
}

#[rstest]
#[case::one_edit("tex", Some("text"))]
#[case::exact_match_is_not_a_suggestion("text", None)]
#[case::too_far("zzzz", None)]
#[case::missing_letter("furigan", Some("furigana"))]
fn suggest_similar_filter_name(#[case] name: &str, #[case] expected: Option<&str>) {
	let config = AnktConfig::default();

	assert_eq!(suggest_similar_name(name, filter_names(&config)), expected);
}

#[test]
fn levenshtein_distance_counts_edits() {
	assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
	assert_eq!(levenshtein_distance("", "abc"), 3);
	assert_eq!(levenshtein_distance("same", "same"), 0);
}

// ---------------------------------------------------------------------------
// Completions
// ---------------------------------------------------------------------------

#[test]
fn field_completions_skip_fields_known_to_be_empty() {
	let content = "{{^Empty}}{{#Filled}}{{Fi}}{{/Filled}}{{/Empty}}";
	let (state, uri) = make_state(content);
	let items = compute_completions(&state, &uri, pos(0, 24));
	let labels = labels(&items);

	assert!(labels.contains(&"Filled"));
	assert!(labels.contains(&"FrontSide"));
	assert!(!labels.contains(&"Empty"));
}

#[test]
fn conditional_completions_skip_every_enclosing_field() {
	let content = "{{^Empty}}{{#Filled}}{{#In}}{{/In}}{{/Filled}}{{/Empty}}";
	let (state, uri) = make_state(content);
	let items = compute_completions(&state, &uri, pos(0, 25));
	let labels = labels(&items);

	assert!(labels.contains(&"In"));
	assert!(!labels.contains(&"Empty"));
	assert!(!labels.contains(&"Filled"));
}

#[test]
fn configured_fields_are_offered_with_special_fields_last() {
	let config = AnktConfig {
		fields: FieldsConfig {
			names: vec!["Back".to_string(), "Front".to_string()],
		},
		..Default::default()
	};
	let (state, uri) = make_state_with_config("{{F}}", config);
	let items = compute_completions(&state, &uri, pos(0, 3));

	assert_eq!(labels(&items), vec![
		"Back",
		"F",
		"Front",
		"FrontSide",
		"Tags",
		"Type",
		"Deck",
		"Subdeck",
		"Card",
		"CardFlag",
		"CardID",
	]);
	assert_eq!(items[0].kind, Some(CompletionItemKind::FIELD));
	assert_eq!(items[3].kind, Some(CompletionItemKind::CONSTANT));
}

#[test]
fn conditional_completions_start_with_cloze_numbers() {
	let content = "{{#c1}}a{{/c1}} {{#c2}}";
	let (state, uri) = make_state(content);
	let items = compute_completions(&state, &uri, pos(0, 21));

	assert_eq!(labels(&items)[..3].to_vec(), vec!["c1", "c2", "c3"]);
	assert_eq!(items[2].detail.as_deref(), Some("Next cloze number"));
	assert_eq!(items[0].kind, Some(CompletionItemKind::VALUE));
}

#[test]
fn standard_replacement_gets_no_cloze_completions() {
	let (state, uri) = make_state("{{Fr}}");
	let items = compute_completions(&state, &uri, pos(0, 3));

	assert!(!labels(&items).contains(&"c1"));
}

#[test]
fn filter_completions_include_builtin_and_custom_filters() {
	let config = AnktConfig {
		filters: FiltersConfig {
			custom: vec!["mathjax".to_string()],
		},
		..Default::default()
	};
	let (state, uri) = make_state_with_config("{{te:Front}}", config);
	let items = compute_completions(&state, &uri, pos(0, 3));
	let labels = labels(&items);

	assert_eq!(labels.len(), BUILTIN_FILTERS.len() + 1);
	assert_eq!(labels[0], "text");
	assert_eq!(labels.last(), Some(&"mathjax"));
	assert_eq!(items[0].kind, Some(CompletionItemKind::FUNCTION));
}

#[rstest]
#[case::before_open(0)]
#[case::between_braces(1)]
#[case::between_close_braces(8)]
#[case::after_close(9)]
fn no_completions_on_delimiters(#[case] character: u32) {
	let (state, uri) = make_state("{{Front}}");

	assert!(compute_completions(&state, &uri, pos(0, character)).is_empty());
}

#[test]
fn no_completions_outside_replacements() {
	let (state, uri) = make_state("<p>text</p> {{Front}}");

	assert!(compute_completions(&state, &uri, pos(0, 5)).is_empty());
}

#[test]
fn unclosed_replacement_before_cursor_offers_fields() {
	let (state, uri) = make_state("{{Back}}\n<p>{{Fr");
	let items = compute_completions(&state, &uri, pos(1, 7));
	let labels = labels(&items);

	assert!(labels.contains(&"Back"));
	assert!(labels.contains(&"FrontSide"));
}

#[rstest]
#[case::open("<p>{{Fr", 7, true)]
#[case::closed("<p>{{Fr}} x", 11, false)]
#[case::previous_line("{{Fr\nx", 6, false)]
#[case::no_braces("<p>Fr", 5, false)]
fn detects_open_replacement(#[case] content: &str, #[case] offset: usize, #[case] expected: bool) {
	assert_eq!(inside_open_replacement(content, offset), expected);
}

// ---------------------------------------------------------------------------
// Hover
// ---------------------------------------------------------------------------

#[test]
fn hover_on_field_shows_enclosing_conditionals() {
	let (state, uri) = make_state("{{#A}}{{^B}}{{C}}{{/B}}{{/A}}");
	let hover = compute_hover(&state, &uri, pos(0, 14))
		.unwrap_or_else(|| panic!("expected hover"));

	assert_eq!(hover_text(&hover), "**Field** `C`\n\n**Inside:** `#A` > `^B`");
	assert_eq!(hover.range, Some(Range {
		start: pos(0, 14),
		end: pos(0, 15),
	}));
}

#[test]
fn hover_on_special_field() {
	let (state, uri) = make_state("{{FrontSide}}");
	let hover = compute_hover(&state, &uri, pos(0, 4))
		.unwrap_or_else(|| panic!("expected hover"));

	assert_eq!(hover_text(&hover), "**Field** `FrontSide`\n\nProvided by Anki.");
}

#[rstest]
#[case::builtin("{{text:Front}}", "**Filter** `text`\n\nStrip HTML from the field, leaving plain text.")]
#[case::custom("{{mathjax:Front}}", "**Filter** `mathjax`\n\nCustom filter from `ankt.toml`.")]
#[case::unknown("{{nope:Front}}", "**Filter** `nope`\n\nUnknown filter.")]
fn hover_on_filter(#[case] content: &str, #[case] expected: &str) {
	let config = AnktConfig {
		filters: FiltersConfig {
			custom: vec!["mathjax".to_string()],
		},
		..Default::default()
	};
	let (state, uri) = make_state_with_config(content, config);
	let hover = compute_hover(&state, &uri, pos(0, 3))
		.unwrap_or_else(|| panic!("expected hover"));

	assert_eq!(hover_text(&hover), expected);
}

#[test]
fn hover_on_conditional_markers() {
	let (state, uri) = make_state("{{^Tags}}x{{/Tags}}");

	let start = compute_hover(&state, &uri, pos(0, 2)).unwrap_or_else(|| panic!("expected hover"));
	assert_eq!(
		hover_text(&start),
		"**Conditional** `^Tags`\n\nShown when `Tags` is empty."
	);

	let end = compute_hover(&state, &uri, pos(0, 12)).unwrap_or_else(|| panic!("expected hover"));
	assert_eq!(hover_text(&end), "**Closes** `^Tags`");
}

#[test]
fn hover_on_unclosed_conditional() {
	let (state, uri) = make_state("{{#Back}}");
	let hover = compute_hover(&state, &uri, pos(0, 2)).unwrap_or_else(|| panic!("expected hover"));

	assert_eq!(
		hover_text(&hover),
		"**Conditional** `#Back`\n\nShown when `Back` is filled.\n\n*No matching tag.*"
	);
}

#[test]
fn no_hover_outside_replacements() {
	let (state, uri) = make_state("<p>{{Front}}</p>");

	assert!(compute_hover(&state, &uri, pos(0, 1)).is_none());
}

// ---------------------------------------------------------------------------
// Document Highlights
// ---------------------------------------------------------------------------

#[test]
fn highlights_every_use_of_a_field() {
	let (state, uri) = make_state("{{#A}}{{A}}{{B}}{{/A}}");
	let highlights = compute_document_highlights(&state, &uri, pos(0, 8));

	assert_eq!(highlights, vec![
		DocumentHighlight {
			range: Range {
				start: pos(0, 3),
				end: pos(0, 4),
			},
			kind: Some(DocumentHighlightKind::TEXT),
		},
		DocumentHighlight {
			range: Range {
				start: pos(0, 8),
				end: pos(0, 9),
			},
			kind: Some(DocumentHighlightKind::READ),
		},
		DocumentHighlight {
			range: Range {
				start: pos(0, 19),
				end: pos(0, 20),
			},
			kind: Some(DocumentHighlightKind::TEXT),
		},
	]);
}

#[test]
fn no_highlights_outside_replacements() {
	let (state, uri) = make_state("x {{A}}");

	assert!(compute_document_highlights(&state, &uri, pos(0, 0)).is_empty());
}

// ---------------------------------------------------------------------------
// Document Symbols
// ---------------------------------------------------------------------------

#[test]
fn document_symbols_nest_conditional_contents() {
	let (state, uri) = make_state("{{#A}}{{B}}{{/A}}\n{{text:C}}");
	let symbols = compute_document_symbols(&state, &uri);

	assert_eq!(symbols.len(), 2);

	let conditional = &symbols[0];
	assert_eq!(conditional.name, "#A");
	assert_eq!(conditional.kind, SymbolKind::NAMESPACE);
	assert_eq!(conditional.detail.as_deref(), Some("filled"));
	assert_eq!(conditional.range, Range {
		start: pos(0, 0),
		end: pos(0, 17),
	});
	assert_eq!(conditional.selection_range, Range {
		start: pos(0, 0),
		end: pos(0, 6),
	});

	let children = conditional
		.children
		.as_ref()
		.unwrap_or_else(|| panic!("expected children"));
	assert_eq!(children.len(), 1);
	assert_eq!(children[0].name, "B");
	assert_eq!(children[0].kind, SymbolKind::FIELD);

	assert_eq!(symbols[1].name, "text:C");
	assert!(symbols[1].children.is_none());
}

#[test]
fn unclosed_conditional_symbol_spans_its_tag() {
	let (state, uri) = make_state("{{^A}}x");
	let symbols = compute_document_symbols(&state, &uri);

	assert_eq!(symbols.len(), 1);
	assert_eq!(symbols[0].name, "^A");
	assert_eq!(symbols[0].range.end, pos(0, 6));
}

// ---------------------------------------------------------------------------
// Virtual documents
// ---------------------------------------------------------------------------

fn virtual_params(
	uri: &Uri,
	position: Option<Position>,
	language_id: Option<&str>,
) -> VirtualDocumentParams {
	VirtualDocumentParams {
		text_document: TextDocumentIdentifier { uri: uri.clone() },
		position,
		language_id: language_id.map(ToString::to_string),
	}
}

#[test]
fn virtual_document_by_language_id() {
	let content = "<p>{{Front}}</p><script>a()</script>";
	let (state, uri) = make_state(content);
	let document = compute_virtual_document(&state, &virtual_params(&uri, None, Some("javascript")))
		.unwrap_or_else(|| panic!("expected a virtual document"));

	assert_eq!(document.language_id, "javascript");
	assert_eq!(document.file_extension, "js");
	assert_eq!(document.content.len(), content.len());
	assert_eq!(document.content.trim(), "a()");
	assert_eq!(document.range, Range {
		start: pos(0, 24),
		end: pos(0, 27),
	});
}

#[test]
fn virtual_document_at_position() {
	let content = "<p>{{Front}}</p><style>p {}</style>";
	let (state, uri) = make_state(content);

	let template = compute_virtual_document(&state, &virtual_params(&uri, Some(pos(0, 5)), None))
		.unwrap_or_else(|| panic!("expected a virtual document"));
	assert_eq!(template.language_id, "template");
	assert_eq!(template.content.trim(), "{{Front}}");

	let css = compute_virtual_document(&state, &virtual_params(&uri, Some(pos(0, 24)), None))
		.unwrap_or_else(|| panic!("expected a virtual document"));
	assert_eq!(css.language_id, "css");

	let html = compute_virtual_document(&state, &virtual_params(&uri, Some(pos(0, 1)), None))
		.unwrap_or_else(|| panic!("expected a virtual document"));
	assert_eq!(html.language_id, "html");
	assert_eq!(html.content.len(), content.len());
}

#[rstest]
#[case::unknown_language("python")]
#[case::language_not_in_document("css")]
fn virtual_document_missing(#[case] language_id: &str) {
	let (state, uri) = make_state("<p>{{Front}}</p>");

	assert!(compute_virtual_document(&state, &virtual_params(&uri, None, Some(language_id))).is_none());
}

#[test]
fn virtual_document_params_use_camel_case() {
	let params: VirtualDocumentParams = serde_json::from_value(serde_json::json!({
		"textDocument": { "uri": "file:///tmp/test/back.html" },
		"languageId": "css"
	}))
	.unwrap_or_else(|e| panic!("invalid params: {e}"));

	assert_eq!(params.language_id.as_deref(), Some("css"));
	assert_eq!(params.position, None);
}
