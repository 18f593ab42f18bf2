//! `ankt_core` is the core library for [ankt](https://github.com/ankt-dev/ankt), tooling for Anki card templates. It parses the `{{...}}` replacement language, splits a card template into per-language virtual documents, and reports problems in the template syntax.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Card template (HTML with {{...}} replacements, <script> and <style>)
//!   -> Scanner (finds every {{...}} span)
//!   -> Region engine (template, javascript, css and html regions, blanked to the source length)
//!   -> Parser (fields, filters, arguments, linked conditionals)
//!   -> Queries / cloze suggestions / validation
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading from `ankt.toml`: known fields, custom filters, diagnostic toggles and file discovery.
//! - [`project`] - Directory walking and per-file checks for the command line.
//!
//! ## Key Types
//!
//! - [`TemplateDocument`] - The parsed replacements of one template text.
//! - [`Replacement`] - One `{{...}}` occurrence: a standard replacement or a conditional tag.
//! - [`LanguageRegion`] - A virtual document of one language with the same byte length as its source.
//! - [`TemplateDiagnostic`] - A problem found by [`validate`].
//!
//! ## Quick Start
//!
//! ```rust
//! use ankt_core::Language;
//! use ankt_core::get_region_by_language;
//! use ankt_core::parse_template;
//!
//! let text = "<b>{{Front}}</b><script>let a = 1;</script>";
//! let template = get_region_by_language(text, Language::Template).unwrap();
//! let doc = parse_template(&template.content);
//! assert_eq!(doc[0].field_name(), Some("Front"));
//!
//! let script = get_region_by_language(text, Language::JavaScript).unwrap();
//! assert_eq!(script.content.len(), text.len());
//! assert_eq!(script.content.trim(), "let a = 1;");
//! ```

pub use ast::*;
pub use cloze::*;
pub use config::*;
pub use error::*;
pub use escape::*;
pub use markup::*;
pub use parser::*;
pub use position::*;
pub use project::*;
pub use query::*;
pub use regions::*;
pub use scanner::*;
pub use validate::*;

mod ast;
mod cloze;
pub mod config;
#[allow(unused_assignments)]
mod error;
mod escape;
pub(crate) mod lexer;
mod markup;
mod parser;
mod position;
pub mod project;
mod query;
mod regions;
mod scanner;
mod validate;

#[cfg(test)]
mod __fixtures;
