use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::MdafError;
use crate::MdafResult;
use crate::resolver::DEFAULT_TIMEOUT;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["mdaf.toml", ".mdaf.toml", ".config/mdaf.toml"];

/// Extension of the documents that are scanned for directives.
pub const DEFAULT_SOURCE_EXTENSION: &str = ".md";

/// Extension the rewritten documents are saved with. Equal to the source
/// extension by default, which rewrites documents in place.
pub const DEFAULT_OUTPUT_EXTENSION: &str = ".md";

/// Maximum number of directive resolutions in flight across a whole run.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Configuration loaded from an `mdaf.toml` file.
///
/// ```toml
/// source_extension = ".md.template"
/// output_extension = ".md"
/// max_concurrency = 8
/// timeout_secs = 10
/// disable_gitignore = false
///
/// [exclude]
/// patterns = ["vendor/", "CHANGELOG.md"]
///
/// [include]
/// patterns = ["docs/**"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct MdafConfig {
	/// Only files whose name ends with this are processed.
	#[serde(default)]
	pub source_extension: Option<String>,
	/// Replaces the source extension to form the output path.
	#[serde(default)]
	pub output_extension: Option<String>,
	/// Upper bound on concurrent resolutions.
	#[serde(default)]
	pub max_concurrency: Option<usize>,
	/// Timeout for a single resolution, in seconds.
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	/// When true, `.gitignore` is not used to skip documents.
	#[serde(default)]
	pub disable_gitignore: bool,
	#[serde(default)]
	pub exclude: ExcludeConfig,
	#[serde(default)]
	pub include: IncludeConfig,
}

/// Gitignore-style patterns for documents and directories to skip. Applied
/// on top of `.gitignore` unless `disable_gitignore` is set.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// Glob patterns, relative to the directory, restricting which documents
/// are processed. Empty means every document is processed.
#[derive(Debug, Default, Deserialize)]
pub struct IncludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl MdafConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if there is no config file.
	pub fn load(root: &Path) -> MdafResult<Option<MdafConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: MdafConfig =
			toml::from_str(&content).map_err(|e| MdafError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}

/// Settings for one run, fixed before any document is read.
///
/// Build with [`RunOptions::from_config`], apply command line overrides, then
/// hand it to [`discover_documents`](crate::discover_documents) and
/// [`Rewriter`](crate::Rewriter).
#[derive(Debug, Clone)]
pub struct RunOptions {
	/// Base directory that is scanned for documents.
	pub directory: PathBuf,
	pub source_extension: String,
	pub output_extension: String,
	pub max_concurrency: usize,
	/// Timeout applied to every resolution.
	pub timeout: Duration,
	pub disable_gitignore: bool,
	pub exclude_patterns: Vec<String>,
	pub include_patterns: Vec<String>,
}

impl Default for RunOptions {
	fn default() -> Self {
		Self {
			directory: PathBuf::from("."),
			source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
			output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
			max_concurrency: DEFAULT_MAX_CONCURRENCY,
			timeout: DEFAULT_TIMEOUT,
			disable_gitignore: false,
			exclude_patterns: Vec::new(),
			include_patterns: Vec::new(),
		}
	}
}

impl RunOptions {
	/// Construct [`RunOptions`] for `directory` from an optional
	/// [`MdafConfig`]. Missing values fall back to the defaults.
	pub fn from_config(directory: impl Into<PathBuf>, config: Option<&MdafConfig>) -> Self {
		let defaults = Self::default();
		let Some(config) = config else {
			return Self {
				directory: directory.into(),
				..defaults
			};
		};

		Self {
			directory: directory.into(),
			source_extension: config
				.source_extension
				.as_deref()
				.map_or(defaults.source_extension, normalize_extension),
			output_extension: config
				.output_extension
				.as_deref()
				.map_or(defaults.output_extension, normalize_extension),
			max_concurrency: config
				.max_concurrency
				.unwrap_or(defaults.max_concurrency)
				.max(1),
			timeout: config
				.timeout_secs
				.map_or(defaults.timeout, Duration::from_secs),
			disable_gitignore: config.disable_gitignore,
			exclude_patterns: config.exclude.patterns.clone(),
			include_patterns: config.include.patterns.clone(),
		}
	}

	/// Where the rewritten form of `source` is written: the source extension
	/// at the end of the file name is swapped for the output extension. A
	/// path that does not end with the source extension maps to itself.
	pub fn output_path(&self, source: &Path) -> PathBuf {
		let Some(name) = source.file_name().and_then(|name| name.to_str()) else {
			return source.to_path_buf();
		};

		match name.strip_suffix(self.source_extension.as_str()) {
			Some(stem) => source.with_file_name(format!("{stem}{}", self.output_extension)),
			None => source.to_path_buf(),
		}
	}

	/// Whether documents are rewritten in place.
	pub fn is_in_place(&self) -> bool {
		self.source_extension == self.output_extension
	}

	/// Whether `path` looks like an output of an earlier run rather than a
	/// source. Only possible when the output extension itself ends with the
	/// source extension (e.g. `.out.md` and `.md`).
	pub fn is_derived_output(&self, path: &Path) -> bool {
		if self.is_in_place() || !self.output_extension.ends_with(&self.source_extension) {
			return false;
		}

		path.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(|name| name.ends_with(&self.output_extension))
	}
}

/// Add the leading `.` to an extension written without one (`md` becomes
/// `.md`).
pub fn normalize_extension(extension: &str) -> String {
	let extension = extension.trim();
	if extension.starts_with('.') {
		extension.to_string()
	} else {
		format!(".{extension}")
	}
}
