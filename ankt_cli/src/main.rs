use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use ankt_cli::AnktCli;
use ankt_cli::Commands;
use ankt_cli::DataOutputFormat;
use ankt_cli::OutputFormat;
use ankt_core::AnktConfig;
use ankt_core::AnktResult;
use ankt_core::AnyEmptyResult;
use ankt_core::DiagnosticKind;
use ankt_core::FileReport;
use ankt_core::Language;
use ankt_core::LanguageRegion;
use ankt_core::LineIndex;
use ankt_core::Severity;
use ankt_core::TemplateDiagnostic;
use ankt_core::TemplateDocument;
use ankt_core::check_file;
use ankt_core::cloze_suggestions;
use ankt_core::collect_template_files;
use ankt_core::get_language_regions;
use ankt_core::get_region_by_language;
use ankt_core::merge_regions;
use ankt_core::parse_template;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = AnktCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_logging(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Check { files, format }) => run_check(&args, files, *format),
		Some(Commands::Regions {
			file,
			language,
			format,
		}) => run_regions(file, language.as_deref(), *format),
		Some(Commands::Parse { file }) => run_parse(file),
		Some(Commands::Cloze { file, format }) => run_cloze(file, *format),
		Some(Commands::Lsp) => run_lsp(),
		None => {
			eprintln!("No subcommand specified. Run `ankt --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<ankt_core::AnktError>() {
			Ok(ankt_err) => {
				let report: miette::Report = (*ankt_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr when `--verbose` is given or `ANKT_LOG` is set. Stdout stays
/// reserved for command output and the LSP transport.
fn init_logging(verbose: bool, use_color: bool) {
	let filter = match EnvFilter::try_from_env("ANKT_LOG") {
		Ok(filter) => filter,
		Err(_) if verbose => EnvFilter::new("ankt_core=debug,ankt_lsp=debug,ankt_cli=debug"),
		Err(_) => return,
	};

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.try_init();
}

fn resolve_root(args: &AnktCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_init(args: &AnktCli) -> AnyEmptyResult {
	let root = resolve_root(args);

	if let Some(existing) = AnktConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let sample_config = "# ankt configuration\n\n# Fields of your note type. When set, \
	                     replacements using any other field are reported.\n[fields]\nnames = \
	                     [\"Front\", \"Back\"]\n\n# Filters added by add-ons, on top of the \
	                     built-in ones.\n[filters]\ncustom = []\n\n# Turn individual warnings \
	                     off.\n[diagnostics]\nunknown_filters = true\nunknown_fields = \
	                     true\nmismatched_conditionals = true\ninvalid_field_names = true\n\n# \
	                     Which files `ankt check` walks.\n[files]\nextensions = [\"html\", \
	                     \"anki\", \"txt\"]\nexclude = []\n";

	std::fs::write(root.join("ankt.toml"), sample_config)?;
	println!("Created ankt.toml");
	println!();
	println!("Next steps:");
	println!("  1. List the fields of your note type under [fields]");
	println!("  2. Run `ankt check` to validate your templates");

	Ok(())
}

fn run_check(args: &AnktCli, files: &[PathBuf], format: OutputFormat) -> AnyEmptyResult {
	let root = resolve_root(args);
	let config = AnktConfig::load_or_default(&root)?;
	let options = config.validation_options();

	let paths = if files.is_empty() {
		collect_template_files(&root, &config)?
	} else {
		files.to_vec()
	};
	tracing::debug!(files = paths.len(), root = %root.display(), "checking templates");

	let reports = paths
		.iter()
		.map(|path| check_file(path, &options))
		.collect::<Result<Vec<_>, _>>()?;

	if args.verbose {
		for report in &reports {
			eprintln!("checked {}", make_relative(&report.path, &root));
		}
	}

	let error_count: usize = reports.iter().map(FileReport::error_count).sum();
	let warning_count: usize = reports.iter().map(FileReport::warning_count).sum();

	match format {
		OutputFormat::Json => print_json_reports(&reports, &root)?,
		OutputFormat::Github => {
			for report in &reports {
				print_github_annotations(report, &root);
			}
			eprintln!("{}", check_summary(reports.len(), error_count, warning_count));
		}
		OutputFormat::Text => {
			for report in &reports {
				let rel = make_relative(&report.path, &root);
				for diagnostic in &report.diagnostics {
					let rendered = diagnostic_to_report(diagnostic, &rel, &report.content);
					eprintln!("{rendered:?}");
				}
			}

			let summary = check_summary(reports.len(), error_count, warning_count);
			if error_count > 0 {
				eprintln!("{} {summary}", colored!("Check failed:", red));
			} else {
				println!("{} {summary}", colored!("Check passed:", green));
			}
		}
	}

	if error_count > 0 {
		process::exit(1);
	}

	Ok(())
}

fn check_summary(files: usize, errors: usize, warnings: usize) -> String {
	format!("{files} file(s) checked, {errors} error(s), {warnings} warning(s).")
}

fn print_json_reports(reports: &[FileReport], root: &Path) -> AnyEmptyResult {
	let files: Vec<serde_json::Value> = reports
		.iter()
		.map(|report| {
			let lines = LineIndex::new(&report.content);
			let diagnostics: Vec<serde_json::Value> = report
				.diagnostics
				.iter()
				.map(|diagnostic| {
					let position = lines.position(diagnostic.start, diagnostic.end);
					serde_json::json!({
						"code": diagnostic.kind.code(),
						"severity": diagnostic.severity.to_string(),
						"message": diagnostic.message(),
						"start": diagnostic.start,
						"end": diagnostic.end,
						"line": position.start.line,
						"column": position.start.column,
						"endLine": position.end.line,
						"endColumn": position.end.column,
					})
				})
				.collect();

			serde_json::json!({
				"file": make_relative(&report.path, root),
				"errors": report.error_count(),
				"warnings": report.warning_count(),
				"diagnostics": diagnostics,
			})
		})
		.collect();

	let output = serde_json::json!({
		"ok": reports.iter().all(|report| !report.has_errors()),
		"files": files,
	});
	println!("{}", serde_json::to_string(&output)?);

	Ok(())
}

fn print_github_annotations(report: &FileReport, root: &Path) {
	let rel = make_relative(&report.path, root);
	let lines = LineIndex::new(&report.content);

	for diagnostic in &report.diagnostics {
		let level = match diagnostic.severity {
			Severity::Error => "error",
			Severity::Warning => "warning",
			Severity::Information => "notice",
		};
		let position = lines.position(diagnostic.start, diagnostic.end);
		println!(
			"::{level} file={rel},line={},col={},endLine={},endColumn={},title={}::{}",
			position.start.line,
			position.start.column,
			position.end.line,
			position.end.column,
			diagnostic.kind.code(),
			diagnostic.message()
		);
	}
}

/// Read a template file, keeping io failures as `AnktError` so they render
/// through miette.
fn read_template(file: &Path) -> AnktResult<String> {
	Ok(std::fs::read_to_string(file)?)
}

fn run_regions(file: &Path, language: Option<&str>, format: DataOutputFormat) -> AnyEmptyResult {
	let content = read_template(file)?;

	let regions: Vec<LanguageRegion> = match language {
		Some(id) => {
			let language = Language::from_str(id)?;
			get_region_by_language(&content, language)
				.into_iter()
				.collect()
		}
		None => merge_regions(&get_language_regions(&content)),
	};

	match format {
		DataOutputFormat::Json => {
			let output: Vec<serde_json::Value> = regions
				.iter()
				.map(|region| {
					serde_json::json!({
						"languageId": region.language_id(),
						"fileExtension": region.file_extension(),
						"start": region.start,
						"end": region.end,
						"content": region.content,
					})
				})
				.collect();
			println!("{}", serde_json::to_string_pretty(&output)?);
		}
		DataOutputFormat::Text => {
			if regions.is_empty() {
				println!("No matching region found.");
			}
			for region in &regions {
				let header = format!(
					"{} ({}..{}, .{})",
					region.language_id(),
					region.start,
					region.end,
					region.file_extension()
				);
				println!("{}", colored!(header, bold));
				println!("{}", region.content);
			}
		}
	}

	Ok(())
}

/// Parse the merged template region of `file`. Offsets in the result point
/// into the file itself.
fn parse_file(file: &Path) -> AnktResult<TemplateDocument> {
	let content = read_template(file)?;
	let doc = get_region_by_language(&content, Language::Template)
		.map(|region| parse_template(region.content))
		.unwrap_or_default();

	Ok(doc)
}

fn run_parse(file: &Path) -> AnyEmptyResult {
	let doc = parse_file(file)?;
	println!("{}", serde_json::to_string_pretty(&doc.replacements)?);

	Ok(())
}

fn run_cloze(file: &Path, format: DataOutputFormat) -> AnyEmptyResult {
	let doc = parse_file(file)?;
	let suggestions = cloze_suggestions(&doc);

	match format {
		DataOutputFormat::Json => println!("{}", serde_json::to_string(&suggestions)?),
		DataOutputFormat::Text => {
			for suggestion in &suggestions {
				if suggestion.synthetic {
					println!("{} (next)", suggestion.name);
				} else {
					println!("{}", suggestion.name);
				}
			}
		}
	}

	Ok(())
}

fn run_lsp() -> AnyEmptyResult {
	let rt = tokio::runtime::Runtime::new()?;
	rt.block_on(ankt_lsp::run_server());
	Ok(())
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

/// Convert a `TemplateDiagnostic` into a `miette::Report` pointing at its
/// span in the file.
fn diagnostic_to_report(
	diagnostic: &TemplateDiagnostic,
	rel_path: &str,
	content: &str,
) -> miette::Report {
	let severity = match diagnostic.severity {
		Severity::Error => miette::Severity::Error,
		Severity::Warning => miette::Severity::Warning,
		Severity::Information => miette::Severity::Advice,
	};

	let help = match &diagnostic.kind {
		DiagnosticKind::UnclosedConditional { name } => {
			Some(format!(
				"add `{{{{/{}}}}}` to close this conditional",
				name.as_deref().unwrap_or_default()
			))
		}
		DiagnosticKind::OrphanConditionalEnd { .. } => {
			Some("remove this tag or add the matching opening tag".to_string())
		}
		DiagnosticKind::MismatchedConditional { expected, .. } => {
			Some(format!("close the conditional with `{{{{/{expected}}}}}`"))
		}
		DiagnosticKind::FilterInConditional => {
			Some("conditional tags only take a field name".to_string())
		}
		DiagnosticKind::UnknownFilter { .. } => {
			Some(
				"built-in filters: text, furigana, kana, kanji, cloze, cloze-only, hint, type, tts, \
				 tts-voices. Declare add-on filters under [filters] in ankt.toml"
					.to_string(),
			)
		}
		DiagnosticKind::UnknownField { .. } => {
			Some("declare the field under [fields] in ankt.toml".to_string())
		}
		_ => None,
	};

	let mut report = miette::MietteDiagnostic::new(diagnostic.message())
		.with_code(format!("ankt::{}", diagnostic.kind.code()))
		.with_severity(severity)
		.with_label(miette::LabeledSpan::at(
			diagnostic.start..diagnostic.end,
			diagnostic.kind.code(),
		));
	if let Some(help) = help {
		report = report.with_help(help);
	}

	miette::Report::new(report)
		.with_source_code(miette::NamedSource::new(rel_path, content.to_string()))
}
