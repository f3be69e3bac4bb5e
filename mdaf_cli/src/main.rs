use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use mdaf_cli::Commands;
use mdaf_cli::MdafCli;
use mdaf_cli::OutputFormat;
use mdaf_core::ContentResolver;
use mdaf_core::DocumentOutcome;
use mdaf_core::DocumentStatus;
use mdaf_core::MdafConfig;
use mdaf_core::Rewriter;
use mdaf_core::RunOptions;
use mdaf_core::RunReport;
use mdaf_core::WriteMode;
use mdaf_core::discover_documents;
use mdaf_core::normalize_extension;
use mdaf_core::remove_stale_blocks;
use mdaf_core::scan_directives;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
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
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
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
	let args = MdafCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

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

	let result = match args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Update { dry_run, watch }) => run_update(&args, dry_run, watch),
		Some(Commands::Check { diff, format }) => run_check(&args, diff, format),
		Some(Commands::List) => run_list(&args),
		None => {
			eprintln!("No subcommand specified. Run `mdaf --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<mdaf_core::MdafError>() {
			Ok(mdaf_err) => {
				let report: miette::Report = (*mdaf_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `MDAF_LOG` takes precedence over the verbosity flag.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_directive = if verbose { "mdaf_core=debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env("MDAF_LOG").unwrap_or_else(|_| EnvFilter::new(default_directive));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.init();
}

fn resolve_root(args: &MdafCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Merge `mdaf.toml` with command line overrides. The result is fixed for the
/// rest of the run.
fn load_options(args: &MdafCli) -> Result<RunOptions, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = MdafConfig::load(&root)?;
	let mut options = RunOptions::from_config(root, config.as_ref());

	if let Some(extension) = &args.source_extension {
		options.source_extension = normalize_extension(extension);
	}
	if let Some(extension) = &args.output_extension {
		options.output_extension = normalize_extension(extension);
	}
	if let Some(seconds) = args.timeout {
		options.timeout = Duration::from_secs(seconds);
	}
	if let Some(limit) = args.max_concurrency {
		options.max_concurrency = limit.max(1);
	}

	Ok(options)
}

/// Discover documents and run the pipeline over all of them. Returns `None`
/// when no document was found.
fn run_pipeline(
	options: RunOptions,
	mode: WriteMode,
) -> Result<Option<RunReport>, Box<dyn std::error::Error>> {
	let documents = discover_documents(&options)?;
	if documents.is_empty() {
		println!(
			"No documents ending in `{}` found in {}.",
			options.source_extension,
			options.directory.display()
		);
		return Ok(None);
	}

	let resolver = ContentResolver::new(options.timeout);
	let rewriter = Rewriter::new(options, resolver);
	let runtime = tokio::runtime::Runtime::new()?;

	Ok(Some(runtime.block_on(rewriter.run(documents, mode))))
}

fn run_init(args: &MdafCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config_path = root.join("mdaf.toml");

	if config_path.exists() {
		println!("Config file already exists: {}", config_path.display());
		return Ok(());
	}

	let sample_config = "# mdaf configuration\n\n# Documents whose file name ends with this \
	                     extension are processed.\n# source_extension = \".md\"\n\n# Replaces the \
	                     source extension to form the output path.\n# Use the same value to \
	                     rewrite documents in place.\n# output_extension = \".md\"\n\n# Upper \
	                     bound on directives resolved at the same time.\n# max_concurrency = \
	                     16\n\n# Seconds before a single file read or url fetch gives up.\n# \
	                     timeout_secs = 30\n\n# [exclude]\n# patterns = [\"vendor/\"]\n\n# \
	                     [include]\n# patterns = [\"docs/**\"]\n";

	std::fs::write(&config_path, sample_config)?;
	println!("Created {}", config_path.display());
	println!();
	println!("Next steps:");
	println!("  1. Add a directive on its own line in a markdown document:");
	println!("     <!-- add-file: src/main.rs -->");
	println!("  2. Run `mdaf update` to inject the content");

	Ok(())
}

fn run_update(args: &MdafCli, dry_run: bool, watch: bool) -> Result<(), Box<dyn std::error::Error>> {
	let has_failures = run_update_once(args, dry_run)?;

	if !watch || dry_run {
		if has_failures {
			process::exit(1);
		}
		return Ok(());
	}

	// Watch mode
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let root = resolve_root(args);
	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&root, notify::RecursiveMode::Recursive)?;

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, updating...");
		if let Err(e) = run_update_once(args, false) {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

/// Run a single update and return whether any document failed.
fn run_update_once(args: &MdafCli, dry_run: bool) -> Result<bool, Box<dyn std::error::Error>> {
	let options = load_options(args)?;
	let root = options.directory.clone();
	let mode = if dry_run {
		WriteMode::DryRun
	} else {
		WriteMode::Write
	};

	let Some(report) = run_pipeline(options, mode)? else {
		return Ok(false);
	};

	print_failures(&report, &root);

	if dry_run {
		let pending: Vec<_> = report.pending().collect();
		if pending.is_empty() {
			println!("All documents are already up to date.");
		} else {
			println!("Dry run: would update {} document(s):", pending.len());
			for outcome in pending {
				println!("  {}", make_relative(&outcome.output, &root));
			}
		}
		return Ok(!report.is_ok());
	}

	let written: Vec<_> = report.written().collect();
	if written.is_empty() {
		if report.is_ok() {
			println!("All documents are already up to date.");
		}
	} else {
		let blocks: usize = written.iter().map(|outcome| outcome.blocks()).sum();
		println!(
			"{} Updated {} document(s) with {blocks} block(s).",
			colored!("✔", green),
			written.len()
		);

		if args.verbose {
			for outcome in written {
				println!("  {}", make_relative(&outcome.output, &root));
			}
		}
	}

	Ok(!report.is_ok())
}

fn run_check(
	args: &MdafCli,
	show_diff: bool,
	format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let options = load_options(args)?;
	let root = options.directory.clone();

	let Some(report) = run_pipeline(options, WriteMode::DryRun)? else {
		return Ok(());
	};

	let stale: Vec<_> = report.pending().collect();
	let failed: Vec<_> = report.failed().collect();

	if stale.is_empty() && failed.is_empty() {
		match format {
			OutputFormat::Json => println!("{{\"ok\":true,\"stale\":[],\"errors\":[]}}"),
			OutputFormat::Text => println!("Check passed: all documents are up to date."),
		}
		return Ok(());
	}

	match format {
		OutputFormat::Json => {
			let stale_entries: Vec<serde_json::Value> = stale
				.iter()
				.map(|outcome| {
					serde_json::json!({
						"file": make_relative(&outcome.source, &root),
						"output": make_relative(&outcome.output, &root),
						"blocks": outcome.blocks(),
					})
				})
				.collect();
			let error_entries: Vec<serde_json::Value> = failed
				.iter()
				.filter_map(|outcome| {
					outcome.error().map(|error| {
						serde_json::json!({
							"file": make_relative(&outcome.source, &root),
							"target": error.target(),
							"message": error.to_string(),
						})
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": false,
				"stale": stale_entries,
				"errors": error_entries,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			eprintln!("  failed documents: {}", failed.len());
			eprintln!("  stale outputs: {}", stale.len());

			if !failed.is_empty() {
				eprintln!();
				print_failures(&report, &root);
			}

			if !stale.is_empty() {
				eprintln!();
				eprintln!("Stale outputs:");
				for outcome in &stale {
					eprintln!("  {}", make_relative(&outcome.output, &root));

					if show_diff {
						if let DocumentStatus::Pending {
							current, expected, ..
						} = &outcome.status
						{
							print_diff(current.as_deref().unwrap_or_default(), expected);
						}
					}
				}
			}

			eprintln!();
			eprintln!("Run `mdaf update` to fix.");
		}
	}

	process::exit(1);
}

fn run_list(args: &MdafCli) -> Result<(), Box<dyn std::error::Error>> {
	let options = load_options(args)?;
	let root = options.directory.clone();
	let documents = discover_documents(&options)?;

	let mut total = 0;
	for source in &documents {
		let text = std::fs::read_to_string(source)?;
		let scan = scan_directives(&remove_stale_blocks(&text));
		if scan.directives.is_empty() && scan.malformed.is_empty() {
			continue;
		}

		println!("{}", colored!(make_relative(source, &root), bold));
		for directive in &scan.directives {
			println!(
				"  {:>4}  {:<4} {}",
				directive.line, directive.kind, directive.target
			);
		}
		for malformed in &scan.malformed {
			println!(
				"  {:>4}  {} {}",
				malformed.line,
				colored!("skipped:", yellow),
				malformed.reason
			);
		}
		total += scan.directives.len();
	}

	if total == 0 {
		println!("No directives found.");
	} else {
		println!();
		println!("{total} directive(s) in {} document(s).", documents.len());
	}

	Ok(())
}

fn print_failures(report: &RunReport, root: &Path) {
	for outcome in report.failed() {
		if let Some(error) = outcome.error() {
			eprintln!(
				"{} {}: {error}",
				colored!("error:", red),
				make_relative(&outcome.source, root)
			);
		}
	}
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
