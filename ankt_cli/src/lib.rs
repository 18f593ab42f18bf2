use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Check and inspect Anki card templates.",
	long_about = "ankt is tooling for Anki card templates: HTML with `{{...}}` replacements, \
	              `<script>` and `<style>` blocks.\n\nIt parses the replacement language, \
	              reports mistakes such as unclosed conditionals or unknown filters, and splits a \
	              template into per-language documents for other tools.\n\nQuick start:\n  ankt \
	              init     Create an ankt.toml\n  ankt check    Validate every template in the \
	              project\n  ankt regions  Print the html, javascript and css parts of a template"
)]
pub struct AnktCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output and debug logging.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a sample `ankt.toml` in the project root.
	///
	/// If a config file already exists in any of the discovery locations,
	/// this command is a no-op and exits successfully.
	Init,
	/// Validate card templates.
	///
	/// Checks the given files, or every template file under the project root
	/// when none are given. Fields, filters and warning toggles come from
	/// `ankt.toml`. Exits with a non-zero status code when any error is
	/// found; warnings alone do not fail the check.
	Check {
		/// Files to check. Defaults to every file under `--path` with a
		/// configured template extension.
		files: Vec<PathBuf>,

		/// Output format for check results. Use `text` for rich reports,
		/// `json` for programmatic consumption, or `github` for GitHub
		/// Actions annotations.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Print the merged per-language documents of a template.
	///
	/// Every document has the byte length of the source file, with text of
	/// other languages replaced by spaces.
	Regions {
		/// The template file.
		file: PathBuf,

		/// Only print the region of this language: `template`, `html`,
		/// `javascript` or `css`.
		#[arg(long, short)]
		language: Option<String>,

		/// Output format.
		#[arg(long, value_enum, default_value_t = DataOutputFormat::Text)]
		format: DataOutputFormat,
	},
	/// Print the parsed replacements of a template as JSON.
	Parse {
		/// The template file.
		file: PathBuf,
	},
	/// Print the cloze numbers used by a template and the next free one.
	Cloze {
		/// The template file.
		file: PathBuf,

		/// Output format.
		#[arg(long, value_enum, default_value_t = DataOutputFormat::Text)]
		format: DataOutputFormat,
	},
	/// Start the ankt language server (LSP).
	///
	/// Communicates over stdin/stdout using the Language Server Protocol.
	/// Configure your editor to run `ankt lsp` for card template files.
	///
	/// Provides diagnostics, completion of fields, filters and cloze numbers,
	/// hover, highlights, document symbols and the `ankt/virtualDocument`
	/// request for embedded html, javascript and css.
	Lsp,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable reports with source snippets.
	Text,
	/// JSON output for programmatic consumption. Each diagnostic includes
	/// its code, severity, message and position.
	Json,
	/// GitHub Actions annotation format. Emits `::error`, `::warning` or
	/// `::notice` annotations that appear inline on pull request diffs.
	Github,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DataOutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
