use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::MdafError;
use crate::MdafResult;
use crate::config::RunOptions;

/// Collect every document under `options.directory` that should be processed,
/// sorted by path.
///
/// A document is a file whose name ends with the source extension. Hidden
/// directories, `node_modules` and `target` are never entered. Files matched
/// by the directory's `.gitignore` (unless `disable_gitignore` is set) or by
/// the `exclude` patterns are skipped, and when `include` patterns are
/// configured only documents whose relative path matches one of them are
/// kept.
pub fn discover_documents(options: &RunOptions) -> MdafResult<Vec<PathBuf>> {
	let root = options.directory.as_path();
	let gitignore = if options.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let walker = Walker {
		root,
		options,
		gitignore,
		custom_exclude: build_exclude_matcher(root, &options.exclude_patterns)?,
		include_set: build_include_set(&options.include_patterns)?,
	};

	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();
	walker.walk_dir(root, &mut files, &mut visited_dirs)?;
	files.sort();

	tracing::debug!(
		count = files.len(),
		root = %root.display(),
		"discovered documents"
	);

	Ok(files)
}

struct Walker<'a> {
	root: &'a Path,
	options: &'a RunOptions,
	gitignore: Gitignore,
	custom_exclude: Gitignore,
	include_set: Option<GlobSet>,
}

impl Walker<'_> {
	fn walk_dir(
		&self,
		dir: &Path,
		files: &mut Vec<PathBuf>,
		visited_dirs: &mut HashSet<PathBuf>,
	) -> MdafResult<()> {
		if !dir.is_dir() {
			return Ok(());
		}

		// Detect symlink cycles by tracking canonical paths.
		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !visited_dirs.insert(canonical) {
			return Err(MdafError::SymlinkCycle {
				path: dir.display().to_string(),
			});
		}

		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();

			if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
				if is_ignored_name(name) {
					continue;
				}
			}

			let is_dir = path.is_dir();
			if self.gitignore.matched(&path, is_dir).is_ignore()
				|| self.custom_exclude.matched(&path, is_dir).is_ignore()
			{
				continue;
			}

			if is_dir {
				self.walk_dir(&path, files, visited_dirs)?;
			} else if self.is_document(&path) {
				files.push(path);
			}
		}

		Ok(())
	}

	fn is_document(&self, path: &Path) -> bool {
		let has_extension = path
			.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(|name| name.ends_with(self.options.source_extension.as_str()));

		if !has_extension || self.options.is_derived_output(path) {
			return false;
		}

		let Some(include_set) = &self.include_set else {
			return true;
		};

		path.strip_prefix(self.root)
			.is_ok_and(|relative| include_set.is_match(relative))
	}
}

fn is_ignored_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

/// Build a `Gitignore` matcher from the directory's `.gitignore` file (if
/// any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Build a `Gitignore` matcher from the `[exclude]` patterns in `mdaf.toml`.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> MdafResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			MdafError::InvalidPattern {
				kind: "exclude",
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}
	builder.build().map_err(|e| {
		MdafError::InvalidPattern {
			kind: "exclude",
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

fn build_include_set(patterns: &[String]) -> MdafResult<Option<GlobSet>> {
	if patterns.is_empty() {
		return Ok(None);
	}

	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| {
			MdafError::InvalidPattern {
				kind: "include",
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
		builder.add(glob);
	}

	builder.build().map(Some).map_err(|e| {
		MdafError::InvalidPattern {
			kind: "include",
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}
