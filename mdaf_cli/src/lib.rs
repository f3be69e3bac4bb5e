use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Embed local files and remote resources into markdown as fenced code blocks.",
	long_about = "mdaf (markdown add files) injects the content of files and urls into markdown \
	              documents wherever an author wrote a directive comment:\n\n  <!-- add-file: \
	              src/main.rs -->\n  <!-- add-web: https://example.com/snippet.py -->\n\nEach \
	              directive is followed by a fenced code block tagged `markdown-add-files`. \
	              Running again replaces those blocks instead of adding new ones.\n\nQuick \
	              start:\n  mdaf init    Create an mdaf.toml\n  mdaf update  Inject content into \
	              every document\n  mdaf check   Verify every document is up to date\n  mdaf \
	              list    Show the directives found in each document"
)]
pub struct MdafCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Directory to scan for documents. Defaults to the current directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output and debug logging.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,

	/// Only process documents whose file name ends with this extension.
	/// Overrides `source_extension` in mdaf.toml. Defaults to `.md`.
	#[arg(long, global = true)]
	pub source_extension: Option<String>,

	/// Extension that replaces the source extension to form the output path.
	/// Overrides `output_extension` in mdaf.toml. Defaults to `.md`, which
	/// rewrites documents in place.
	#[arg(long, global = true)]
	pub output_extension: Option<String>,

	/// Timeout in seconds for resolving a single directive.
	#[arg(long, global = true)]
	pub timeout: Option<u64>,

	/// Maximum number of directives resolved at the same time.
	#[arg(long, global = true)]
	pub max_concurrency: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a commented `mdaf.toml` in the project directory.
	///
	/// If the file already exists, this command is a no-op and exits
	/// successfully.
	Init,
	/// Inject the content of every directive into its document.
	///
	/// Blocks injected by an earlier run are removed first, so running update
	/// repeatedly produces the same output. A document whose directives
	/// cannot all be resolved is reported and left untouched; the other
	/// documents are still written.
	Update {
		/// Preview which outputs would change without writing files.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Watch for file changes and re-run the update automatically.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Check that every output is up to date.
	///
	/// Resolves all directives and compares the result with the current
	/// outputs without writing anything. Exits with a non-zero status code if
	/// any output is stale or any directive fails to resolve.
	Check {
		/// Show a unified diff for each stale output.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results. Use `text` for human-readable
		/// output or `json` for programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List the directives found in each document without resolving them.
	List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
