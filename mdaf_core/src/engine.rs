use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::Directive;
use crate::MalformedDirective;
use crate::MalformedReason;
use crate::MdafError;
use crate::MdafResult;
use crate::RenderedBlock;
use crate::config::RunOptions;
use crate::directive::scan_directives;
use crate::resolver::Resolve;
use crate::stale::remove_stale_blocks;

/// Whether processed documents are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
	/// Write every output whose content changed.
	Write,
	/// Compute outputs without touching the filesystem.
	DryRun,
}

/// A directive paired with the block rendered from its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDirective {
	pub directive: Directive,
	pub block: RenderedBlock,
}

/// The result of running the pipeline over one document's text.
#[derive(Debug, Clone)]
pub struct RenderedText {
	/// The document with fresh blocks injected after every directive.
	pub content: String,
	pub directives: Vec<Directive>,
	/// Markers that were skipped because they could not be read.
	pub malformed: Vec<MalformedDirective>,
}

/// A document read from disk and run through the pipeline, not yet written.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
	pub source: PathBuf,
	pub output: PathBuf,
	/// Text of `source` as read.
	pub original: String,
	pub rendered: RenderedText,
}

/// What happened to one document.
#[derive(Debug)]
#[non_exhaustive]
pub enum DocumentStatus {
	/// The output was written.
	Written { blocks: usize },
	/// The output already had the expected content.
	Unchanged { blocks: usize },
	/// Dry run: the output differs from what would be written.
	Pending {
		blocks: usize,
		/// Current output content, `None` if the output does not exist.
		current: Option<String>,
		expected: String,
	},
	/// Processing stopped and nothing was written.
	Failed(MdafError),
}

/// Outcome for one document in a run.
#[derive(Debug)]
pub struct DocumentOutcome {
	pub source: PathBuf,
	pub output: PathBuf,
	pub status: DocumentStatus,
}

impl DocumentOutcome {
	pub fn is_failed(&self) -> bool {
		matches!(self.status, DocumentStatus::Failed(_))
	}

	/// Number of directives rendered into the output; zero for a failure.
	pub fn blocks(&self) -> usize {
		match self.status {
			DocumentStatus::Written { blocks }
			| DocumentStatus::Unchanged { blocks }
			| DocumentStatus::Pending { blocks, .. } => blocks,
			DocumentStatus::Failed(_) => 0,
		}
	}

	pub fn error(&self) -> Option<&MdafError> {
		match &self.status {
			DocumentStatus::Failed(error) => Some(error),
			_ => None,
		}
	}
}

/// Outcomes of a run in discovery order.
#[derive(Debug, Default)]
pub struct RunReport {
	pub outcomes: Vec<DocumentOutcome>,
}

impl RunReport {
	/// Returns true if no document failed.
	pub fn is_ok(&self) -> bool {
		!self.outcomes.iter().any(DocumentOutcome::is_failed)
	}

	pub fn failed(&self) -> impl Iterator<Item = &DocumentOutcome> {
		self.outcomes.iter().filter(|outcome| outcome.is_failed())
	}

	pub fn written(&self) -> impl Iterator<Item = &DocumentOutcome> {
		self.outcomes
			.iter()
			.filter(|outcome| matches!(outcome.status, DocumentStatus::Written { .. }))
	}

	pub fn pending(&self) -> impl Iterator<Item = &DocumentOutcome> {
		self.outcomes
			.iter()
			.filter(|outcome| matches!(outcome.status, DocumentStatus::Pending { .. }))
	}

	/// Total number of blocks across documents that did not fail.
	pub fn block_count(&self) -> usize {
		self.outcomes.iter().map(DocumentOutcome::blocks).sum()
	}
}

/// Insert each rendered block right after its directive's marker.
///
/// Blocks are inserted from the last marker to the first, so every
/// directive's recorded span is still valid in the text being built and a
/// marker repeated several times receives one block per occurrence. The
/// directives must come from scanning `text`; a span outside it is skipped.
pub fn inject_blocks(text: &str, resolved: &[ResolvedDirective]) -> String {
	let mut order: Vec<&ResolvedDirective> = resolved.iter().collect();
	order.sort_by(|a, b| b.directive.end.cmp(&a.directive.end));

	let mut result = text.to_string();
	for entry in order {
		let end = entry.directive.end;
		debug_assert!(
			result.is_char_boundary(end),
			"directive span {end} does not fit the text"
		);
		if result.is_char_boundary(end) {
			result.insert_str(end, &entry.block.to_string());
		}
	}

	result
}

/// Drives the pipeline for one or many documents.
///
/// Cloning is cheap; clones share the resolver and the pool of resolution
/// permits, so the concurrency limit holds across every document of a run.
pub struct Rewriter<R> {
	options: Arc<RunOptions>,
	resolver: Arc<R>,
	permits: Arc<Semaphore>,
}

impl<R> Clone for Rewriter<R> {
	fn clone(&self) -> Self {
		Self {
			options: Arc::clone(&self.options),
			resolver: Arc::clone(&self.resolver),
			permits: Arc::clone(&self.permits),
		}
	}
}

impl<R: Resolve> Rewriter<R> {
	pub fn new(options: RunOptions, resolver: R) -> Self {
		let permits = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
		Self {
			options: Arc::new(options),
			resolver: Arc::new(resolver),
			permits,
		}
	}

	pub fn options(&self) -> &RunOptions {
		&self.options
	}

	pub fn resolver(&self) -> &R {
		&self.resolver
	}

	/// Process every document concurrently. A failing document never stops
	/// the others; its failure is recorded in the report.
	pub async fn run(&self, documents: Vec<PathBuf>, mode: WriteMode) -> RunReport {
		let count = documents.len();
		let mut tasks = JoinSet::new();

		for (index, source) in documents.into_iter().enumerate() {
			let rewriter = self.clone();
			tasks.spawn(async move { (index, rewriter.process(&source, mode).await) });
		}

		let mut outcomes = Vec::with_capacity(count);
		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok(entry) => outcomes.push(entry),
				Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
				Err(_) => {}
			}
		}

		outcomes.sort_by_key(|(index, _)| *index);
		RunReport {
			outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
		}
	}

	/// Process one document: render it, then write the output if it changed
	/// and `mode` allows it.
	pub async fn process(&self, source: &Path, mode: WriteMode) -> DocumentOutcome {
		let output = self.options.output_path(source);
		let status = match self.process_document(source, &output, mode).await {
			Ok(status) => status,
			Err(error) => {
				tracing::debug!(source = %source.display(), %error, "document failed");
				DocumentStatus::Failed(error)
			}
		};

		DocumentOutcome {
			source: source.to_path_buf(),
			output,
			status,
		}
	}

	async fn process_document(
		&self,
		source: &Path,
		output: &Path,
		mode: WriteMode,
	) -> MdafResult<DocumentStatus> {
		let document = self.render(source).await?;
		let blocks = document.rendered.directives.len();
		let current = if output == source {
			Some(document.original)
		} else {
			tokio::fs::read_to_string(output).await.ok()
		};
		let expected = document.rendered.content;

		if current.as_deref() == Some(expected.as_str()) {
			tracing::debug!(output = %output.display(), "already up to date");
			return Ok(DocumentStatus::Unchanged { blocks });
		}

		if mode == WriteMode::DryRun {
			return Ok(DocumentStatus::Pending {
				blocks,
				current,
				expected,
			});
		}

		tokio::fs::write(output, &expected).await.map_err(|e| {
			MdafError::Write {
				path: output.display().to_string(),
				reason: e.to_string(),
			}
		})?;
		tracing::info!(output = %output.display(), blocks, "wrote document");

		Ok(DocumentStatus::Written { blocks })
	}

	/// Read `source` and run it through the pipeline without writing.
	pub async fn render(&self, source: &Path) -> MdafResult<RenderedDocument> {
		let original = tokio::fs::read_to_string(source).await.map_err(|e| {
			MdafError::Read {
				path: source.display().to_string(),
				reason: e.to_string(),
			}
		})?;
		let document_dir = source.parent().unwrap_or_else(|| Path::new("."));
		let rendered = self.render_text(&original, document_dir).await?;

		Ok(RenderedDocument {
			source: source.to_path_buf(),
			output: self.options.output_path(source),
			original,
			rendered,
		})
	}

	/// Remove stale blocks from `text`, resolve every directive found in the
	/// cleaned text and inject the rendered blocks. File targets are resolved
	/// against `document_dir`.
	pub async fn render_text(&self, text: &str, document_dir: &Path) -> MdafResult<RenderedText> {
		let cleaned = remove_stale_blocks(text);
		let scan = scan_directives(&cleaned);

		for malformed in &scan.malformed {
			match malformed.reason {
				MalformedReason::EmptyTarget => {
					tracing::warn!(
						line = malformed.line,
						marker = %malformed.snippet,
						reason = %malformed.reason,
						"skipping malformed directive"
					);
				}
				MalformedReason::Unterminated => {
					tracing::debug!(
						line = malformed.line,
						marker = %malformed.snippet,
						reason = %malformed.reason,
						"skipping malformed directive"
					);
				}
			}
		}

		let bodies = self.resolve_all(&scan.directives, document_dir).await?;
		let resolved: Vec<ResolvedDirective> = scan
			.directives
			.iter()
			.cloned()
			.zip(bodies)
			.map(|(directive, body)| {
				let block = RenderedBlock::new(directive.language_tag(), body);
				ResolvedDirective { directive, block }
			})
			.collect();

		Ok(RenderedText {
			content: inject_blocks(&cleaned, &resolved),
			directives: scan.directives,
			malformed: scan.malformed,
		})
	}

	/// Resolve all directives concurrently. The first failure aborts the
	/// remaining resolutions and is returned.
	async fn resolve_all(
		&self,
		directives: &[Directive],
		document_dir: &Path,
	) -> MdafResult<Vec<String>> {
		let mut tasks = JoinSet::new();

		for (index, directive) in directives.iter().cloned().enumerate() {
			let resolver = Arc::clone(&self.resolver);
			let permits = Arc::clone(&self.permits);
			let document_dir = document_dir.to_path_buf();
			let timeout = self.options.timeout;

			tasks.spawn(async move {
				let Ok(_permit) = permits.acquire_owned().await else {
					return (index, Err(resolution_cancelled(&directive)));
				};
				let result =
					resolve_with_timeout(&*resolver, &directive, &document_dir, timeout).await;
				(index, result)
			});
		}

		let mut bodies: Vec<Option<String>> = vec![None; directives.len()];
		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((index, Ok(body))) => bodies[index] = Some(body),
				Ok((_, Err(error))) => {
					tasks.abort_all();
					return Err(error);
				}
				Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
				Err(_) => {}
			}
		}

		bodies
			.into_iter()
			.zip(directives)
			.map(|(body, directive)| body.ok_or_else(|| resolution_cancelled(directive)))
			.collect()
	}
}

async fn resolve_with_timeout<R: Resolve>(
	resolver: &R,
	directive: &Directive,
	document_dir: &Path,
	timeout: Duration,
) -> MdafResult<String> {
	tracing::debug!(
		kind = %directive.kind,
		target = %directive.target,
		line = directive.line,
		"resolving directive"
	);

	match tokio::time::timeout(timeout, resolver.resolve(directive, document_dir)).await {
		Ok(result) => result,
		Err(_) => {
			Err(MdafError::ResolutionTimeout {
				target: directive.target.clone(),
				seconds: timeout.as_secs(),
			})
		}
	}
}

/// The resolution never produced a body: its permit pool was closed or its
/// task was cancelled.
fn resolution_cancelled(directive: &Directive) -> MdafError {
	MdafError::Resolution {
		target: directive.target.clone(),
		reason: "resolution was cancelled".to_string(),
	}
}
