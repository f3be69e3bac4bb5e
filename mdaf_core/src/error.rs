use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum MdafError {
	#[error(transparent)]
	#[diagnostic(code(mdaf::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to read document `{path}`: {reason}")]
	#[diagnostic(code(mdaf::read))]
	Read { path: String, reason: String },

	#[error("failed to resolve `{target}`: {reason}")]
	#[diagnostic(
		code(mdaf::resolution),
		help(
			"file targets are relative to the directory of the document; web targets must be \
			 reachable absolute urls"
		)
	)]
	Resolution { target: String, reason: String },

	#[error("resolving `{target}` timed out after {seconds}s")]
	#[diagnostic(
		code(mdaf::resolution_timeout),
		help("raise `timeout_secs` in mdaf.toml or pass `--timeout`")
	)]
	ResolutionTimeout { target: String, seconds: u64 },

	#[error("failed to write `{path}`: {reason}")]
	#[diagnostic(code(mdaf::write))]
	Write { path: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(mdaf::config_parse),
		help("check that mdaf.toml is valid TOML with the documented keys")
	)]
	ConfigParse(String),

	#[error("invalid {kind} pattern `{pattern}`: {reason}")]
	#[diagnostic(code(mdaf::invalid_pattern))]
	InvalidPattern {
		kind: &'static str,
		pattern: String,
		reason: String,
	},

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(mdaf::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },
}

impl MdafError {
	/// The directive target this error is about, when there is one.
	pub fn target(&self) -> Option<&str> {
		match self {
			Self::Resolution { target, .. } | Self::ResolutionTimeout { target, .. } => {
				Some(target)
			}
			_ => None,
		}
	}
}

pub type MdafResult<T> = Result<T, MdafError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
