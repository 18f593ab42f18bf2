use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::PathBuf;

use ankt_core::AnktConfig;
use ankt_core::BUILTIN_FILTERS;
use ankt_core::DiagnosticKind;
use ankt_core::Language;
use ankt_core::LineIndex;
use ankt_core::NodeAtOffset;
use ankt_core::Replacement;
use ankt_core::ReplacementKind;
use ankt_core::SPECIAL_FIELDS;
use ankt_core::Severity;
use ankt_core::TemplateDiagnostic;
use ankt_core::TemplateDocument;
use ankt_core::ValidationOptions;
use ankt_core::ancestors;
use ankt_core::builtin_filter_description;
use ankt_core::cloze_suggestions;
use ankt_core::get_region_at_position;
use ankt_core::get_region_by_language;
use ankt_core::is_special_field;
use ankt_core::node_at_offset;
use ankt_core::parse_template;
use ankt_core::referenced_field_names;
use ankt_core::replacements_with_field;
use ankt_core::unavailable_field_names;
use ankt_core::validate;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::LanguageServer;
use tower_lsp_server::jsonrpc::Result as LspResult;
use tower_lsp_server::ls_types::*;

/// Name of the request returning a merged language region of a document.
pub const VIRTUAL_DOCUMENT_METHOD: &str = "ankt/virtualDocument";

/// State for a single open document.
#[derive(Debug, Clone)]
struct DocumentState {
	/// The full text content of the document.
	content: String,
	lines: LineIndex,
	/// Parsed from the merged template region, so offsets match `content`.
	template: TemplateDocument,
	diagnostics: Vec<TemplateDiagnostic>,
}

impl DocumentState {
	fn new(content: String, options: &ValidationOptions) -> Self {
		let lines = LineIndex::new(&content);
		let template = get_region_by_language(&content, Language::Template)
			.map(|region| parse_template(region.content))
			.unwrap_or_default();
		let diagnostics = validate(&template, options);

		Self {
			content,
			lines,
			template,
			diagnostics,
		}
	}

	fn offset_at(&self, position: Position) -> Option<usize> {
		lsp_position_to_offset(&self.content, &self.lines, position)
	}

	fn lsp_position(&self, offset: usize) -> Position {
		offset_to_lsp_position(&self.content, &self.lines, offset)
	}

	fn lsp_range(&self, start: usize, end: usize) -> Range {
		Range {
			start: self.lsp_position(start),
			end: self.lsp_position(end),
		}
	}
}

/// Workspace-level state shared across all LSP requests.
#[derive(Debug, Default)]
struct WorkspaceState {
	/// The workspace root path.
	root: Option<PathBuf>,
	config: AnktConfig,
	options: ValidationOptions,
	/// Open documents keyed by URI.
	documents: HashMap<Uri, DocumentState>,
}

impl WorkspaceState {
	/// Reload `ankt.toml` from the root and revalidate every open document.
	fn reload_config(&mut self) {
		let config = match &self.root {
			Some(root) => {
				AnktConfig::load_or_default(root).unwrap_or_else(|error| {
					tracing::warn!(%error, "failed to load config, using defaults");
					AnktConfig::default()
				})
			}
			None => AnktConfig::default(),
		};

		self.options = config.validation_options();
		self.config = config;

		for doc in self.documents.values_mut() {
			doc.diagnostics = validate(&doc.template, &self.options);
		}
	}

	fn update_document(&mut self, uri: &Uri, content: String) {
		let doc = DocumentState::new(content, &self.options);
		tracing::debug!(uri = uri.as_str(), replacements = doc.template.len(), "updated document");
		self.documents.insert(uri.clone(), doc);
	}
}

/// Convert a byte offset into an LSP `Position` (0-indexed, character in
/// UTF-16 code units).
fn offset_to_lsp_position(content: &str, lines: &LineIndex, offset: usize) -> Position {
	let point = lines.point(offset);
	let line_start = point.offset + 1 - point.column;
	let character = content
		.get(line_start..point.offset)
		.map_or(0, |text| text.encode_utf16().count());

	Position {
		line: point.line.saturating_sub(1) as u32,
		character: character as u32,
	}
}

/// Convert an LSP `Position` (0-indexed line, character in UTF-16 code units)
/// to a byte offset within `content`. Returns `None` if the position is out of
/// bounds.
fn lsp_position_to_offset(content: &str, lines: &LineIndex, position: Position) -> Option<usize> {
	let line_start = lines.line_start(position.line as usize)?;
	let line_end = lines
		.line_start(position.line as usize + 1)
		.map_or(content.len(), |next| next - 1);
	let line = content.get(line_start..line_end)?;

	let mut utf16_offset = 0u32;
	for (byte_idx, c) in line.char_indices() {
		if utf16_offset == position.character {
			return Some(line_start + byte_idx);
		}
		utf16_offset += c.len_utf16() as u32;
	}

	// Position at end of line (past last character).
	(utf16_offset == position.character).then_some(line_start + line.len())
}

/// Apply incremental or full-text changes in order. A range that is out of
/// bounds or ends before it starts is skipped.
fn apply_content_changes(content: &mut String, changes: Vec<TextDocumentContentChangeEvent>) {
	for change in changes {
		let Some(range) = change.range else {
			*content = change.text;
			continue;
		};

		let lines = LineIndex::new(content);
		let start = lsp_position_to_offset(content, &lines, range.start);
		let end = lsp_position_to_offset(content, &lines, range.end);
		match (start, end) {
			(Some(start), Some(end)) if start <= end => {
				content.replace_range(start..end, &change.text);
			}
			_ => tracing::debug!(?range, "skipping invalid change range"),
		}
	}
}

/// Parameters of the `ankt/virtualDocument` request. `language_id` wins over
/// `position` when both are given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDocumentParams {
	pub text_document: TextDocumentIdentifier,
	#[serde(default)]
	pub position: Option<Position>,
	#[serde(default)]
	pub language_id: Option<String>,
}

/// A merged language region ready to hand to another language service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDocument {
	pub language_id: String,
	pub file_extension: String,
	/// Same length as the source document, foreign text blanked.
	pub content: String,
	/// From the first to the last span of the language.
	pub range: Range,
}

/// The ankt language server.
#[derive(Debug)]
pub struct AnktLanguageServer {
	client: Client,
	state: RwLock<WorkspaceState>,
}

impl AnktLanguageServer {
	pub fn new(client: Client) -> Self {
		Self {
			client,
			state: RwLock::new(WorkspaceState::default()),
		}
	}

	/// Publish diagnostics for a single document.
	async fn publish_diagnostics_for(&self, uri: &Uri) {
		let diagnostics = {
			let state = self.state.read().await;
			compute_diagnostics(&state, uri)
		};

		self.client
			.publish_diagnostics(uri.clone(), diagnostics, None)
			.await;
	}

	async fn publish_all_diagnostics(&self) {
		let uris: Vec<Uri> = {
			let state = self.state.read().await;
			state.documents.keys().cloned().collect()
		};

		for uri in uris {
			self.publish_diagnostics_for(&uri).await;
		}
	}

	/// Handle a document being opened or changed: parse it and publish
	/// diagnostics.
	async fn on_document_change(&self, uri: &Uri, content: String) {
		{
			let mut state = self.state.write().await;
			state.update_document(uri, content);
		}
		self.publish_diagnostics_for(uri).await;
	}

	/// Handler for [`VIRTUAL_DOCUMENT_METHOD`].
	pub async fn virtual_document(
		&self,
		params: VirtualDocumentParams,
	) -> LspResult<Option<VirtualDocument>> {
		let state = self.state.read().await;
		Ok(compute_virtual_document(&state, &params))
	}
}

impl LanguageServer for AnktLanguageServer {
	async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
		let root = params
			.workspace_folders
			.as_ref()
			.and_then(|folders| folders.first())
			.and_then(|folder| folder.uri.to_file_path().map(std::borrow::Cow::into_owned))
			.or_else(|| {
				#[allow(deprecated)]
				params
					.root_uri
					.as_ref()
					.and_then(|uri| uri.to_file_path().map(std::borrow::Cow::into_owned))
			});

		{
			let mut state = self.state.write().await;
			state.root = root;
			state.reload_config();
		}

		Ok(InitializeResult {
			capabilities: ServerCapabilities {
				text_document_sync: Some(TextDocumentSyncCapability::Kind(
					TextDocumentSyncKind::INCREMENTAL,
				)),
				hover_provider: Some(HoverProviderCapability::Simple(true)),
				completion_provider: Some(CompletionOptions {
					trigger_characters: Some(
						["{", "#", "^", "/", ":", " "]
							.iter()
							.map(ToString::to_string)
							.collect(),
					),
					..Default::default()
				}),
				document_highlight_provider: Some(OneOf::Left(true)),
				document_symbol_provider: Some(OneOf::Left(true)),
				..Default::default()
			},
			server_info: Some(ServerInfo {
				name: "ankt-lsp".to_string(),
				version: Some(env!("CARGO_PKG_VERSION").to_string()),
			}),
			offset_encoding: None,
		})
	}

	async fn initialized(&self, _: InitializedParams) {
		self.client
			.log_message(MessageType::INFO, "ankt language server initialized")
			.await;
	}

	async fn shutdown(&self) -> LspResult<()> {
		Ok(())
	}

	async fn did_open(&self, params: DidOpenTextDocumentParams) {
		let uri = params.text_document.uri;
		let content = params.text_document.text;
		self.on_document_change(&uri, content).await;
	}

	async fn did_change(&self, params: DidChangeTextDocumentParams) {
		let uri = params.text_document.uri;

		let current_content = {
			let state = self.state.read().await;
			state.documents.get(&uri).map(|doc| doc.content.clone())
		};

		let Some(mut content) = current_content else {
			// Not tracked yet: the last change is the full content.
			if let Some(change) = params.content_changes.into_iter().next_back() {
				self.on_document_change(&uri, change.text).await;
			}
			return;
		};

		apply_content_changes(&mut content, params.content_changes);
		self.on_document_change(&uri, content).await;
	}

	async fn did_save(&self, params: DidSaveTextDocumentParams) {
		let uri = &params.text_document.uri;
		if !uri.path().as_str().ends_with("ankt.toml") {
			return;
		}

		{
			let mut state = self.state.write().await;
			state.reload_config();
		}
		self.client
			.log_message(MessageType::INFO, "ankt.toml reloaded")
			.await;
		self.publish_all_diagnostics().await;
	}

	async fn did_close(&self, params: DidCloseTextDocumentParams) {
		let uri = params.text_document.uri;
		{
			let mut state = self.state.write().await;
			state.documents.remove(&uri);
		}
		// Clear diagnostics for the closed document.
		self.client.publish_diagnostics(uri, Vec::new(), None).await;
	}

	async fn hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
		let uri = &params.text_document_position_params.text_document.uri;
		let position = params.text_document_position_params.position;

		let state = self.state.read().await;
		Ok(compute_hover(&state, uri, position))
	}

	async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
		let uri = &params.text_document_position.text_document.uri;
		let position = params.text_document_position.position;

		let state = self.state.read().await;
		let items = compute_completions(&state, uri, position);

		if items.is_empty() {
			Ok(None)
		} else {
			Ok(Some(CompletionResponse::Array(items)))
		}
	}

	async fn document_highlight(
		&self,
		params: DocumentHighlightParams,
	) -> LspResult<Option<Vec<DocumentHighlight>>> {
		let uri = &params.text_document_position_params.text_document.uri;
		let position = params.text_document_position_params.position;

		let state = self.state.read().await;
		let highlights = compute_document_highlights(&state, uri, position);

		if highlights.is_empty() {
			Ok(None)
		} else {
			Ok(Some(highlights))
		}
	}

	async fn document_symbol(
		&self,
		params: DocumentSymbolParams,
	) -> LspResult<Option<DocumentSymbolResponse>> {
		let uri = &params.text_document.uri;

		let state = self.state.read().await;
		let symbols = compute_document_symbols(&state, uri);

		if symbols.is_empty() {
			Ok(None)
		} else {
			Ok(Some(DocumentSymbolResponse::Nested(symbols)))
		}
	}
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

fn to_lsp_severity(severity: Severity) -> DiagnosticSeverity {
	match severity {
		Severity::Error => DiagnosticSeverity::ERROR,
		Severity::Warning => DiagnosticSeverity::WARNING,
		Severity::Information => DiagnosticSeverity::INFORMATION,
	}
}

/// Convert the template diagnostics of a document. Unknown names get a
/// "did you mean" hint when a close match is known.
fn compute_diagnostics(state: &WorkspaceState, uri: &Uri) -> Vec<Diagnostic> {
	let Some(doc) = state.documents.get(uri) else {
		return Vec::new();
	};

	doc.diagnostics
		.iter()
		.map(|diagnostic| {
			let mut message = diagnostic.message();
			let suggestion = match &diagnostic.kind {
				DiagnosticKind::UnknownFilter { name } => {
					suggest_similar_name(name, filter_names(&state.config))
				}
				DiagnosticKind::UnknownField { name } => {
					suggest_similar_name(name, state.config.fields.names.iter().map(String::as_str))
				}
				_ => None,
			};
			if let Some(suggestion) = suggestion {
				message.push_str(&format!(". Did you mean `{suggestion}`?"));
			}

			Diagnostic {
				range: doc.lsp_range(diagnostic.start, diagnostic.end),
				severity: Some(to_lsp_severity(diagnostic.severity)),
				code: Some(NumberOrString::String(diagnostic.kind.code().to_string())),
				source: Some("ankt".to_string()),
				message,
				..Default::default()
			}
		})
		.collect()
}

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein_distance(a: &str, b: &str) -> usize {
	let b_chars: Vec<char> = b.chars().collect();
	let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
	let mut curr_row = vec![0; b_chars.len() + 1];

	for (i, a_char) in a.chars().enumerate() {
		curr_row[0] = i + 1;
		for (j, b_char) in b_chars.iter().enumerate() {
			let cost = usize::from(a_char != *b_char);
			curr_row[j + 1] = (prev_row[j + 1] + 1)
				.min(curr_row[j] + 1)
				.min(prev_row[j] + cost);
		}
		std::mem::swap(&mut prev_row, &mut curr_row);
	}

	prev_row[b_chars.len()]
}

/// The closest candidate within roughly a third of the name's length.
fn suggest_similar_name<'a>(
	name: &str,
	candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
	let max_distance = (name.chars().count() / 3).max(1);
	candidates
		.into_iter()
		.map(|candidate| (candidate, levenshtein_distance(name, candidate)))
		.filter(|(_, distance)| *distance > 0 && *distance <= max_distance)
		.min_by_key(|(_, distance)| *distance)
		.map(|(candidate, _)| candidate)
}

fn filter_names(config: &AnktConfig) -> impl Iterator<Item = &str> {
	BUILTIN_FILTERS
		.iter()
		.map(|(name, _)| *name)
		.chain(config.filters.custom.iter().map(String::as_str))
}

// ---------------------------------------------------------------------------
// Hover
// ---------------------------------------------------------------------------

fn conditional_label(doc: &TemplateDocument, replacement: &Replacement) -> String {
	let name = replacement.field_name().unwrap_or_default();
	match &replacement.kind {
		ReplacementKind::ConditionalStart {
			conditional_type, ..
		} => format!("{}{name}", conditional_type.marker()),
		ReplacementKind::ConditionalEnd { linked_tag } => {
			linked_tag
				.and_then(|id| doc.replacement(id))
				.filter(|start| start.is_conditional_start())
				.map_or_else(|| format!("/{name}"), |start| conditional_label(doc, start))
		}
		ReplacementKind::Standard { .. } => name.to_string(),
	}
}

/// Compute hover information at a position.
fn compute_hover(state: &WorkspaceState, uri: &Uri, position: Position) -> Option<Hover> {
	let doc = state.documents.get(uri)?;
	let offset = doc.offset_at(position)?;
	let node = node_at_offset(&doc.template, offset)?;

	let (value, start, end) = match node {
		NodeAtOffset::Field { replacement, field } => {
			let mut parts = vec![format!("**Field** `{}`", field.name())];
			if is_special_field(field.name()) {
				parts.push("\n\nProvided by Anki.".to_string());
			}
			let chain: Vec<String> = ancestors(&doc.template, replacement.id)
				.into_iter()
				.filter_map(|id| doc.template.replacement(id))
				.map(|ancestor| format!("`{}`", conditional_label(&doc.template, ancestor)))
				.collect();
			if !chain.is_empty() {
				parts.push(format!("\n\n**Inside:** {}", chain.join(" > ")));
			}
			(parts.join(""), field.start, field.end)
		}
		NodeAtOffset::Filter { filter, .. } => {
			let name = filter.name();
			let description = builtin_filter_description(name).map_or_else(
				|| {
					if state.config.filters.custom.iter().any(|custom| custom == name) {
						"Custom filter from `ankt.toml`.".to_string()
					} else {
						"Unknown filter.".to_string()
					}
				},
				ToString::to_string,
			);
			(
				format!("**Filter** `{name}`\n\n{description}"),
				filter.name.start,
				filter.name.end,
			)
		}
		NodeAtOffset::Replacement(replacement) if replacement.is_conditional() => {
			let label = conditional_label(&doc.template, replacement);
			let name = replacement.field_name().unwrap_or_default();
			let mut value = match replacement.conditional_type() {
				Some(conditional_type) => {
					format!("**Conditional** `{label}`\n\nShown when `{name}` is {conditional_type}.")
				}
				None => format!("**Closes** `{label}`"),
			};
			if replacement.linked_tag().is_none() {
				value.push_str("\n\n*No matching tag.*");
			}
			(value, replacement.start, replacement.end)
		}
		NodeAtOffset::Replacement(_)
		| NodeAtOffset::FieldSegment { .. }
		| NodeAtOffset::FilterArgument { .. }
		| NodeAtOffset::FilterSegment { .. } => return None,
	};

	Some(Hover {
		contents: HoverContents::Markup(MarkupContent {
			kind: MarkupKind::Markdown,
			value,
		}),
		range: Some(doc.lsp_range(start, end)),
	})
}

// ---------------------------------------------------------------------------
// Completions
// ---------------------------------------------------------------------------

/// Whether `offset` follows a `{{` that has not been closed yet on the same
/// line, i.e. the user is typing a new replacement.
fn inside_open_replacement(content: &str, offset: usize) -> bool {
	let Some(before) = content.get(..offset) else {
		return false;
	};
	let line = before.rsplit('\n').next().unwrap_or_default();

	line.rfind("{{")
		.is_some_and(|open| line.rfind("}}").is_none_or(|close| close < open))
}

/// Compute completion items at a position.
fn compute_completions(
	state: &WorkspaceState,
	uri: &Uri,
	position: Position,
) -> Vec<CompletionItem> {
	let Some(doc) = state.documents.get(uri) else {
		return Vec::new();
	};
	let Some(offset) = doc.offset_at(position) else {
		return Vec::new();
	};

	match node_at_offset(&doc.template, offset) {
		Some(NodeAtOffset::Filter { .. } | NodeAtOffset::FilterSegment { .. }) => {
			filter_completions(&state.config)
		}
		Some(NodeAtOffset::FilterArgument { .. }) => Vec::new(),
		Some(node) => {
			let replacement = node.replacement();
			// Nothing to offer on the delimiters themselves.
			if offset < replacement.start + 2 || offset > replacement.end - 2 {
				return Vec::new();
			}

			let mut items = Vec::new();
			if replacement.is_conditional() {
				items.extend(cloze_completions(&doc.template));
			}
			items.extend(field_completions(state, doc, Some(replacement)));
			items
		}
		None if inside_open_replacement(&doc.content, offset) => field_completions(state, doc, None),
		None => Vec::new(),
	}
}

/// Configured, referenced and special field names, minus the fields that
/// cannot be used at `replacement`.
fn field_completions(
	state: &WorkspaceState,
	doc: &DocumentState,
	replacement: Option<&Replacement>,
) -> Vec<CompletionItem> {
	let unavailable = replacement
		.map(|replacement| unavailable_field_names(&doc.template, replacement.id))
		.unwrap_or_default();

	let mut names: BTreeSet<String> = state.config.fields.names.iter().cloned().collect();
	names.extend(referenced_field_names(&doc.template));

	let note_fields = names
		.into_iter()
		.filter(|name| !unavailable.contains(name) && !is_special_field(name))
		.map(|name| {
			CompletionItem {
				label: name,
				kind: Some(CompletionItemKind::FIELD),
				detail: Some("Note field".to_string()),
				sort_text: Some("1".to_string()),
				..Default::default()
			}
		});

	let special_fields = SPECIAL_FIELDS
		.iter()
		.filter(|name| !unavailable.contains(**name))
		.map(|name| {
			CompletionItem {
				label: (*name).to_string(),
				kind: Some(CompletionItemKind::CONSTANT),
				detail: Some("Special field provided by Anki".to_string()),
				sort_text: Some("2".to_string()),
				..Default::default()
			}
		});

	note_fields.chain(special_fields).collect()
}

fn cloze_completions(doc: &TemplateDocument) -> Vec<CompletionItem> {
	cloze_suggestions(doc)
		.into_iter()
		.enumerate()
		.map(|(i, suggestion)| {
			let detail = if suggestion.synthetic {
				"Next cloze number"
			} else {
				"Cloze deletion"
			};
			CompletionItem {
				label: suggestion.name,
				kind: Some(CompletionItemKind::VALUE),
				detail: Some(detail.to_string()),
				sort_text: Some(format!("0{i:02}")),
				..Default::default()
			}
		})
		.collect()
}

/// Built-in filters followed by the custom filters from `ankt.toml`.
fn filter_completions(config: &AnktConfig) -> Vec<CompletionItem> {
	let builtin = BUILTIN_FILTERS.iter().map(|(name, desc)| {
		CompletionItem {
			label: (*name).to_string(),
			kind: Some(CompletionItemKind::FUNCTION),
			detail: Some((*desc).to_string()),
			..Default::default()
		}
	});
	let custom = config.filters.custom.iter().map(|name| {
		CompletionItem {
			label: name.clone(),
			kind: Some(CompletionItemKind::FUNCTION),
			detail: Some("Custom filter".to_string()),
			..Default::default()
		}
	});

	builtin
		.chain(custom)
		.enumerate()
		.map(|(i, item)| {
			CompletionItem {
				sort_text: Some(format!("{i:02}")),
				..item
			}
		})
		.collect()
}

// ---------------------------------------------------------------------------
// Document Highlights
// ---------------------------------------------------------------------------

/// Highlight every field referencing the name under the cursor.
fn compute_document_highlights(
	state: &WorkspaceState,
	uri: &Uri,
	position: Position,
) -> Vec<DocumentHighlight> {
	let Some(doc) = state.documents.get(uri) else {
		return Vec::new();
	};
	let Some(name) = doc
		.offset_at(position)
		.and_then(|offset| node_at_offset(&doc.template, offset))
		.and_then(|node| node.replacement().field_name())
	else {
		return Vec::new();
	};

	replacements_with_field(&doc.template, name)
		.into_iter()
		.filter_map(|replacement| {
			let field = replacement.field_segment.field.as_ref()?;
			let kind = if replacement.is_conditional() {
				DocumentHighlightKind::TEXT
			} else {
				DocumentHighlightKind::READ
			};
			Some(DocumentHighlight {
				range: doc.lsp_range(field.start, field.end),
				kind: Some(kind),
			})
		})
		.collect()
}

// ---------------------------------------------------------------------------
// Document Symbols
// ---------------------------------------------------------------------------

/// Conditional blocks with their contents nested, and standard replacements
/// as leaves.
fn compute_document_symbols(state: &WorkspaceState, uri: &Uri) -> Vec<DocumentSymbol> {
	let Some(doc) = state.documents.get(uri) else {
		return Vec::new();
	};

	doc.template
		.iter()
		.filter(|replacement| replacement.parent_conditional.is_none())
		.filter_map(|replacement| replacement_symbol(doc, replacement))
		.collect()
}

fn replacement_symbol(doc: &DocumentState, replacement: &Replacement) -> Option<DocumentSymbol> {
	if replacement.is_conditional_end() {
		return None;
	}

	let (name, kind, detail) = match replacement.conditional_type() {
		Some(conditional_type) => {
			(
				conditional_label(&doc.template, replacement),
				SymbolKind::NAMESPACE,
				Some(conditional_type.to_string()),
			)
		}
		None => (replacement.inner().trim().to_string(), SymbolKind::FIELD, None),
	};

	let end = replacement
		.linked_tag()
		.and_then(|id| doc.template.replacement(id))
		.map_or(replacement.end, |linked| linked.end);
	let children: Vec<DocumentSymbol> = replacement
		.child_replacements()
		.iter()
		.filter_map(|id| doc.template.replacement(*id))
		.filter_map(|child| replacement_symbol(doc, child))
		.collect();

	#[allow(deprecated)]
	let symbol = DocumentSymbol {
		name: if name.is_empty() {
			replacement.content.clone()
		} else {
			name
		},
		detail,
		kind,
		tags: None,
		deprecated: None,
		range: doc.lsp_range(replacement.start, end),
		selection_range: doc.lsp_range(replacement.start, replacement.end),
		children: (!children.is_empty()).then_some(children),
	};

	Some(symbol)
}

// ---------------------------------------------------------------------------
// Virtual documents
// ---------------------------------------------------------------------------

fn compute_virtual_document(
	state: &WorkspaceState,
	params: &VirtualDocumentParams,
) -> Option<VirtualDocument> {
	let doc = state.documents.get(&params.text_document.uri)?;

	let region = match &params.language_id {
		Some(id) => get_region_by_language(&doc.content, Language::from_id(id)?)?,
		None => {
			let offset = params
				.position
				.and_then(|position| doc.offset_at(position))
				.unwrap_or_default();
			get_region_at_position(&doc.content, offset)
		}
	};

	Some(VirtualDocument {
		language_id: region.language_id().to_string(),
		file_extension: region.file_extension().to_string(),
		range: doc.lsp_range(region.start, region.end),
		content: region.content,
	})
}

/// Start the LSP server on stdin/stdout. Used by the `ankt lsp` CLI
/// subcommand.
pub async fn run_server() {
	let stdin = tokio::io::stdin();
	let stdout = tokio::io::stdout();

	let (service, socket) = tower_lsp_server::LspService::build(AnktLanguageServer::new)
		.custom_method(VIRTUAL_DOCUMENT_METHOD, AnktLanguageServer::virtual_document)
		.finish();
	tower_lsp_server::Server::new(stdin, stdout, socket)
		.serve(service)
		.await;
}

#[cfg(test)]
mod __tests;
