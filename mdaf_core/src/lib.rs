//! `mdaf_core` is the engine behind [mdaf](https://github.com/mdaf-rs/mdaf). It
//! embeds local files and remote resources into markdown documents at marked
//! locations, as fenced code blocks that are replaced rather than duplicated
//! when the tool runs again.
//!
//! ## Directives
//!
//! A directive is an HTML comment on its own line:
//!
//! ```markdown
//! <!-- add-file: examples/main.rs -->
//! <!-- add-web: https://example.com/snippet.py -->
//! ```
//!
//! File targets are relative to the directory of the document. After a run,
//! each directive is followed by a block such as:
//!
//! ````markdown
//! <!-- add-file: examples/main.rs -->
//!
//! ``` rs markdown-add-files
//! fn main() {}
//! ```
//! ````
//!
//! The `markdown-add-files` token marks the block as generated, so the next
//! run removes it before injecting fresh content.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Document text
//!   → Stale block remover (drops blocks from the previous run)
//!   → Directive scanner (finds add-file / add-web markers)
//!   → Content resolver (reads files, fetches urls, concurrently)
//!   → Block renderer (fenced block tagged with the target's extension)
//!   → Rewriter (splices blocks after their markers and writes the output)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mdaf_core::ContentResolver;
//! use mdaf_core::MdafConfig;
//! use mdaf_core::Rewriter;
//! use mdaf_core::RunOptions;
//! use mdaf_core::WriteMode;
//! use mdaf_core::discover_documents;
//! use std::path::Path;
//!
//! # async fn example() -> mdaf_core::MdafResult<()> {
//! let root = Path::new(".");
//! let config = MdafConfig::load(root)?;
//! let options = RunOptions::from_config(root, config.as_ref());
//! let documents = discover_documents(&options)?;
//!
//! let resolver = ContentResolver::new(options.timeout);
//! let report = Rewriter::new(options, resolver)
//! 	.run(documents, WriteMode::Write)
//! 	.await;
//!
//! for outcome in report.failed() {
//! 	eprintln!("{} failed", outcome.source.display());
//! }
//! # Ok(())
//! # }
//! ```

pub use config::*;
pub use directive::*;
pub use engine::*;
pub use error::*;
pub use language::*;
pub use project::*;
pub use render::*;
pub use resolver::*;
pub use stale::*;

pub mod config;
mod directive;
mod engine;
#[allow(unused_assignments)]
mod error;
mod language;
pub mod project;
mod render;
pub mod resolver;
mod stale;

#[cfg(test)]
mod __fixtures;
