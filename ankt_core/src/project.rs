use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Serialize;

use crate::AnktConfig;
use crate::AnktError;
use crate::AnktResult;
use crate::Language;
use crate::TemplateDiagnostic;
use crate::ValidationOptions;
use crate::config::CONFIG_FILE_CANDIDATES;
use crate::get_region_by_language;
use crate::parse_template;
use crate::validate;

/// The outcome of checking one template file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
	pub path: PathBuf,
	/// The file text the diagnostic offsets point into.
	pub content: String,
	pub diagnostics: Vec<TemplateDiagnostic>,
}

impl FileReport {
	pub fn error_count(&self) -> usize {
		self.diagnostics.iter().filter(|d| d.is_error()).count()
	}

	pub fn warning_count(&self) -> usize {
		self.diagnostics.len() - self.error_count()
	}

	pub fn has_errors(&self) -> bool {
		self.error_count() > 0
	}
}

/// Validate the template language of a composite document.
///
/// Only the merged template region is parsed. It has the byte length of the
/// source, so diagnostic offsets point straight into `text`.
pub fn check_source(text: &str, options: &ValidationOptions) -> Vec<TemplateDiagnostic> {
	let Some(region) = get_region_by_language(text, Language::Template) else {
		return Vec::new();
	};

	validate(&parse_template(&region.content), options)
}

/// Read and validate one file.
pub fn check_file(path: &Path, options: &ValidationOptions) -> AnktResult<FileReport> {
	let content = std::fs::read_to_string(path)?;
	let diagnostics = check_source(&content, options);
	tracing::debug!(path = %path.display(), diagnostics = diagnostics.len(), "checked file");

	Ok(FileReport {
		path: path.to_path_buf(),
		content,
		diagnostics,
	})
}

/// Every template file below `root`, sorted.
///
/// Hidden directories, `node_modules` and `target` are skipped, as is
/// anything matched by the root `.gitignore` or the configured excludes.
pub fn collect_template_files(root: &Path, config: &AnktConfig) -> AnktResult<Vec<PathBuf>> {
	let gitignore = build_gitignore(root);
	let exclude = build_exclude_matcher(root, &config.files.exclude)?;
	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();

	walk_dir(
		root,
		&mut files,
		&gitignore,
		&exclude,
		config,
		&mut visited_dirs,
	)?;
	files.sort();
	tracing::debug!(root = %root.display(), files = files.len(), "collected template files");

	Ok(files)
}

fn build_exclude_matcher(root: &Path, patterns: &[String]) -> AnktResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			AnktError::InvalidExclude {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}
	builder.build().map_err(|e| {
		AnktError::InvalidExclude {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.is_file() {
		if let Some(error) = builder.add(&gitignore_path) {
			tracing::warn!(path = %gitignore_path.display(), %error, "skipping unreadable .gitignore");
		}
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

fn has_project_config(dir: &Path) -> bool {
	CONFIG_FILE_CANDIDATES
		.iter()
		.any(|candidate| dir.join(candidate).is_file())
}

fn walk_dir(
	dir: &Path,
	files: &mut Vec<PathBuf>,
	gitignore: &Gitignore,
	exclude: &Gitignore,
	config: &AnktConfig,
	visited_dirs: &mut HashSet<PathBuf>,
) -> AnktResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Err(AnktError::SymlinkCycle {
			path: dir.display().to_string(),
		});
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		let is_dir = path.is_dir();

		if is_dir
			&& path
				.file_name()
				.and_then(|n| n.to_str())
				.is_some_and(is_ignored_directory_name)
		{
			continue;
		}

		if gitignore.matched(&path, is_dir).is_ignore() || exclude.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			// Nested projects are checked on their own.
			if has_project_config(&path) {
				continue;
			}
			walk_dir(&path, files, gitignore, exclude, config, visited_dirs)?;
		} else if config.is_template_file(&path) {
			files.push(path);
		}
	}

	Ok(())
}
