use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::AnktError;
use crate::AnktResult;
use crate::ValidationOptions;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["ankt.toml", ".ankt.toml", ".config/ankt.toml"];

/// File extensions scanned for card templates when no `[files]` section is
/// configured.
pub const DEFAULT_TEMPLATE_EXTENSIONS: [&str; 3] = ["html", "anki", "txt"];

/// Configuration loaded from an `ankt.toml` file.
///
/// ```toml
/// [fields]
/// names = ["Front", "Back", "Extra"]
///
/// [filters]
/// custom = ["edit", "mathjax"]
///
/// [diagnostics]
/// unknown_filters = true
/// unknown_fields = true
/// mismatched_conditionals = true
/// invalid_field_names = true
///
/// [files]
/// extensions = ["html", "anki"]
/// exclude = ["build/"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnktConfig {
	/// Note fields known to exist. When empty, unknown field diagnostics are
	/// never produced.
	#[serde(default)]
	pub fields: FieldsConfig,
	/// Filters provided by add-ons on top of the built-in ones.
	#[serde(default)]
	pub filters: FiltersConfig,
	/// Toggles for individual warning kinds.
	#[serde(default)]
	pub diagnostics: DiagnosticsConfig,
	/// Which files `ankt check` picks up when walking a directory.
	#[serde(default)]
	pub files: FilesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsConfig {
	#[serde(default)]
	pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersConfig {
	#[serde(default)]
	pub custom: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct DiagnosticsConfig {
	#[serde(default = "enabled")]
	pub unknown_filters: bool,
	#[serde(default = "enabled")]
	pub unknown_fields: bool,
	#[serde(default = "enabled")]
	pub mismatched_conditionals: bool,
	#[serde(default = "enabled")]
	pub invalid_field_names: bool,
}

impl Default for DiagnosticsConfig {
	fn default() -> Self {
		Self {
			unknown_filters: true,
			unknown_fields: true,
			mismatched_conditionals: true,
			invalid_field_names: true,
		}
	}
}

fn enabled() -> bool {
	true
}

/// Configuration for the files picked up when scanning a directory.
///
/// Exclude patterns follow gitignore syntax and are applied on top of any
/// `.gitignore` rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesConfig {
	#[serde(default = "default_extensions")]
	pub extensions: Vec<String>,
	#[serde(default)]
	pub exclude: Vec<String>,
}

impl Default for FilesConfig {
	fn default() -> Self {
		Self {
			extensions: default_extensions(),
			exclude: Vec::new(),
		}
	}
}

fn default_extensions() -> Vec<String> {
	DEFAULT_TEMPLATE_EXTENSIONS
		.iter()
		.map(ToString::to_string)
		.collect()
}

impl AnktConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> AnktResult<Option<AnktConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::from_toml(&content)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	/// Load the config at `root`, falling back to defaults when absent.
	pub fn load_or_default(root: &Path) -> AnktResult<AnktConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	pub fn from_toml(content: &str) -> AnktResult<AnktConfig> {
		toml::from_str(content).map_err(|e| AnktError::ConfigParse(e.to_string()))
	}

	/// Whether a file should be checked based on its extension.
	pub fn is_template_file(&self, path: &Path) -> bool {
		let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
			return false;
		};

		self.files
			.extensions
			.iter()
			.any(|candidate| candidate.eq_ignore_ascii_case(ext))
	}

	/// Build validation options from the configured fields, filters and
	/// toggles.
	pub fn validation_options(&self) -> ValidationOptions {
		ValidationOptions {
			known_fields: self.fields.names.clone(),
			custom_filters: self.filters.custom.clone(),
			unknown_filters: self.diagnostics.unknown_filters,
			unknown_fields: self.diagnostics.unknown_fields,
			mismatched_conditionals: self.diagnostics.mismatched_conditionals,
			invalid_field_names: self.diagnostics.invalid_field_names,
		}
	}
}
