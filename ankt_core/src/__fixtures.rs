use crate::*;

/// Two script bodies around one replacement.
pub const TWO_SCRIPTS: &str = "<p>{{Front}}</p><script>a()</script><script>b()</script>";

/// A realistic back template with nested conditionals, a style block and a
/// replacement inside a script string.
pub const CARD_TEMPLATE: &str = "{{FrontSide}}\n<hr id=answer>\n{{#Back}}\n<div \
                                 class=\"back\">{{text:Back}}</div>\n{{^Extra}}<i>no \
                                 extra</i>{{/Extra}}\n{{/Back}}\n<style>\n.card { color: \
                                 red; }\n</style>\n<script>\nconst extra = \
                                 '{{Extra}}';\n</script>\n";

/// Nested conditionals of both types around a standard replacement.
pub const NESTED_CONDITIONALS: &str = "{{^Empty}}{{#Filled}}{{Field}}{{#Inner}}{{/Inner}}{{/Filled}}{{/Empty}}";

pub fn tts_filter() -> Filter {
	Filter {
		content: "tts en_US voices=Bob,Alice speed=1.5".to_string(),
		start: 2,
		end: 38,
		name: TextNode::new("tts", 2),
		arguments: vec![
			FilterArgument::Positional(TextNode::new("en_US", 6)),
			FilterArgument::KeyValue(FilterArgumentKeyValue {
				content: "voices=Bob,Alice".to_string(),
				start: 12,
				end: 28,
				key: Some(TextNode::new("voices", 12)),
				divider: TextNode::new("=", 18),
				value: vec![TextNode::new("Bob", 19), TextNode::new("Alice", 23)],
			}),
			FilterArgument::KeyValue(FilterArgumentKeyValue {
				content: "speed=1.5".to_string(),
				start: 29,
				end: 38,
				key: Some(TextNode::new("speed", 29)),
				divider: TextNode::new("=", 34),
				value: vec![TextNode::new("1.5", 35)],
			}),
		],
	}
}

pub fn field(content: &str, start: usize) -> Field {
	Field {
		content: content.to_string(),
		start,
		end: start + content.len(),
	}
}

pub fn nested_pair_document() -> TemplateDocument {
	parse_template("{{#A}}{{#B}}{{/B}}{{/A}}")
}

/// Every byte outside `span` is a space or the same line terminator as the
/// source.
pub fn is_blanked_outside(content: &str, source: &str, span: std::ops::Range<usize>) -> bool {
	content.len() == source.len()
		&& content
			.bytes()
			.zip(source.bytes())
			.enumerate()
			.filter(|(index, _)| !span.contains(index))
			.all(|(_, (blanked, original))| {
				blanked == b' ' || (blanked == original && matches!(original, b'\n' | b'\r'))
			})
}
