use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum AnktError {
	#[error(transparent)]
	#[diagnostic(code(ankt::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(ankt::config_parse),
		help("check that ankt.toml is valid TOML with [fields], [filters], [diagnostics] and/or [files] sections")
	)]
	ConfigParse(String),

	#[error("unknown language id: `{0}`")]
	#[diagnostic(
		code(ankt::unknown_language),
		help("supported language ids: template, html, javascript, css")
	)]
	UnknownLanguage(String),

	#[error("invalid exclude pattern `{pattern}`: {reason}")]
	#[diagnostic(
		code(ankt::invalid_exclude),
		help("exclude patterns in ankt.toml follow .gitignore syntax")
	)]
	InvalidExclude { pattern: String, reason: String },

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(ankt::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },
}

pub type AnktResult<T> = Result<T, AnktError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
