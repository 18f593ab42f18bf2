use std::ops::Range;

use logos::Logos;
use serde::Serialize;

use crate::Language;

/// Finds the spans of embedded languages (script and style bodies) in a
/// markup text.
pub trait MarkupScanner {
	fn embedded_spans(&self, text: &str) -> Vec<EmbeddedSpan>;
}

/// The body of one `<script>` or `<style>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbeddedSpan {
	pub language: Language,
	pub start: usize,
	pub end: usize,
}

/// A small HTML tokenizer that only understands what is needed to find script
/// and style bodies. It follows comments and tag boundaries, so quoted
/// attribute values never open a body.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlScanner;

impl MarkupScanner for HtmlScanner {
	fn embedded_spans(&self, text: &str) -> Vec<EmbeddedSpan> {
		let mut walker = MarkupWalker::new(text);
		walker.process();
		walker.spans
	}
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum MarkupToken {
	#[token("<!--")]
	CommentOpen,
	#[token("-->")]
	CommentClose,
	#[token("<script", ignore(case))]
	ScriptOpen,
	#[token("</script", ignore(case))]
	ScriptClose,
	#[token("<style", ignore(case))]
	StyleOpen,
	#[token("</style", ignore(case))]
	StyleClose,
	#[token(">")]
	TagEnd,
	#[token("\"")]
	DoubleQuote,
	#[token("'")]
	SingleQuote,
	#[token("<")]
	AngleOpen,
	#[token("-")]
	Dash,
	#[regex(r#"[^<>"'\-]+"#)]
	Text,
}

#[derive(Clone, Copy)]
enum MarkupContext {
	/// Plain markup.
	Outside,
	/// Inside `<!-- ... -->`.
	Comment,
	/// Inside any other tag, until its unquoted `>`.
	Tag { quote: Option<MarkupToken> },
	/// Inside the open tag of a script or style element.
	OpenTag {
		language: Language,
		quote: Option<MarkupToken>,
	},
	/// Inside the raw body of a script or style element.
	Body { language: Language, start: usize },
}

struct MarkupWalker<'a> {
	source: &'a str,
	tokens: Vec<(Result<MarkupToken, ()>, Range<usize>)>,
	context: MarkupContext,
	spans: Vec<EmbeddedSpan>,
}

impl<'a> MarkupWalker<'a> {
	fn new(source: &'a str) -> Self {
		Self {
			source,
			tokens: MarkupToken::lexer(source).spanned().collect(),
			context: MarkupContext::Outside,
			spans: Vec::new(),
		}
	}

	/// A tag name only counts when followed by whitespace, `/`, `>` or the end
	/// of the text, so `<scripts>` is not a script.
	fn ends_tag_name(&self, span: &Range<usize>) -> bool {
		self.source
			.as_bytes()
			.get(span.end)
			.is_none_or(|byte| byte.is_ascii_whitespace() || matches!(byte, b'/' | b'>'))
	}

	/// `<` only opens a tag when a name, `/` or `!` follows it.
	fn opens_tag(&self, span: &Range<usize>) -> bool {
		self.source
			.as_bytes()
			.get(span.end)
			.is_some_and(|byte| byte.is_ascii_alphabetic() || matches!(byte, b'/' | b'!'))
	}

	/// A quote starts an attribute value only right after `=`.
	fn opens_attribute_value(&self, span: &Range<usize>) -> bool {
		self.source[..span.start].trim_end().ends_with('=')
	}

	/// The next quote state inside a tag, or `None` when `token` ends the tag.
	fn tag_quote(
		&self,
		quote: Option<MarkupToken>,
		token: MarkupToken,
		span: &Range<usize>,
	) -> Option<Option<MarkupToken>> {
		match (quote, token) {
			(None, MarkupToken::TagEnd) => None,
			(None, MarkupToken::DoubleQuote | MarkupToken::SingleQuote)
				if self.opens_attribute_value(span) =>
			{
				Some(Some(token))
			}
			(Some(open), _) if open == token => Some(None),
			_ => Some(quote),
		}
	}

	fn process(&mut self) {
		for index in 0..self.tokens.len() {
			let (result, span) = self.tokens[index].clone();
			let Ok(token) = result else {
				continue;
			};

			match self.context {
				MarkupContext::Outside => {
					match token {
						MarkupToken::CommentOpen => self.context = MarkupContext::Comment,
						MarkupToken::ScriptOpen if self.ends_tag_name(&span) => {
							self.context = MarkupContext::OpenTag {
								language: Language::JavaScript,
								quote: None,
							};
						}
						MarkupToken::StyleOpen if self.ends_tag_name(&span) => {
							self.context = MarkupContext::OpenTag {
								language: Language::Css,
								quote: None,
							};
						}
						MarkupToken::ScriptOpen
						| MarkupToken::StyleOpen
						| MarkupToken::ScriptClose
						| MarkupToken::StyleClose => {
							self.context = MarkupContext::Tag { quote: None };
						}
						MarkupToken::AngleOpen if self.opens_tag(&span) => {
							self.context = MarkupContext::Tag { quote: None };
						}
						_ => {}
					}
				}
				MarkupContext::Comment => {
					if token == MarkupToken::CommentClose {
						self.context = MarkupContext::Outside;
					}
				}
				MarkupContext::Tag { quote } => {
					self.context = match self.tag_quote(quote, token, &span) {
						Some(quote) => MarkupContext::Tag { quote },
						None => MarkupContext::Outside,
					};
				}
				MarkupContext::OpenTag { language, quote } => {
					self.context = match self.tag_quote(quote, token, &span) {
						Some(quote) => MarkupContext::OpenTag { language, quote },
						None => MarkupContext::Body {
							language,
							start: span.end,
						},
					};
				}
				MarkupContext::Body { language, start } => {
					let closes = match language {
						Language::JavaScript => token == MarkupToken::ScriptClose,
						Language::Css => token == MarkupToken::StyleClose,
						Language::Template | Language::Html => false,
					};

					if closes && self.ends_tag_name(&span) {
						self.spans.push(EmbeddedSpan {
							language,
							start,
							end: span.start,
						});
						self.context = MarkupContext::Outside;
					}
				}
			}
		}

		// An unterminated body runs to the end of the text.
		if let MarkupContext::Body { language, start } = self.context {
			self.spans.push(EmbeddedSpan {
				language,
				start,
				end: self.source.len(),
			});
		}

		tracing::trace!(spans = self.spans.len(), "scanned markup");
	}
}
