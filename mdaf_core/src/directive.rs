use std::fmt;

use crate::language::language_tag;

/// Token that opens a directive marker. It must immediately follow a
/// newline, so a marker on the very first line of a document is never a
/// directive.
pub const MARKER_OPEN: &str = "\n<!-- add-";
/// Token that closes a directive marker.
pub const MARKER_CLOSE: &str = "-->";

/// The kind of content a directive asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
	/// A local file, relative to the directory of the document.
	File,
	/// A remote resource fetched over HTTP(S).
	Web,
}

impl DirectiveKind {
	pub const ALL: [Self; 2] = [Self::File, Self::Web];

	/// The keyword used in the marker (`file` or `web`).
	pub fn keyword(self) -> &'static str {
		match self {
			Self::File => "file",
			Self::Web => "web",
		}
	}

	/// Classify a trimmed marker body, returning the kind and the target.
	fn classify(body: &str) -> Option<(Self, &str)> {
		Self::ALL.into_iter().find_map(|kind| {
			body.strip_prefix(kind.keyword())
				.and_then(|rest| rest.strip_prefix(':'))
				.map(|target| (kind, target.trim()))
		})
	}
}

impl fmt::Display for DirectiveKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.keyword())
	}
}

/// A directive occurrence found in a document.
///
/// Directives are identified by where they appear, so the same marker
/// written twice produces two independent directives. The byte span is the
/// anchor used when the rendered block is spliced back in, and `marker` is
/// the exact source text covered by that span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
	pub kind: DirectiveKind,
	/// Relative path for [`DirectiveKind::File`], absolute url for
	/// [`DirectiveKind::Web`].
	pub target: String,
	/// Literal marker text, from `<!-- add-` through `-->`.
	pub marker: String,
	/// Byte offset of the start of the marker in the scanned text.
	pub start: usize,
	/// Byte offset just past the end of the marker in the scanned text.
	pub end: usize,
	/// 1-indexed line of the marker.
	pub line: usize,
}

impl Directive {
	/// The marker as it is written in canonical form, e.g.
	/// `<!-- add-file: sub/code.py -->`.
	pub fn canonical_marker(&self) -> String {
		format!("<!-- add-{}: {} -->", self.kind, self.target)
	}

	pub fn language_tag(&self) -> &str {
		language_tag(&self.target)
	}
}

/// Why a marker that looked like a directive was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
	/// A `file:` or `web:` marker with nothing after the colon.
	EmptyTarget,
	/// No `-->` before the next marker or the end of the document.
	Unterminated,
}

impl fmt::Display for MalformedReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::EmptyTarget => f.write_str("directive has an empty target"),
			Self::Unterminated => f.write_str("marker is missing its closing `-->`"),
		}
	}
}

/// A skipped marker. These never fail a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedDirective {
	/// 1-indexed line of the marker.
	pub line: usize,
	/// Start of the marker text, cut at the first line break.
	pub snippet: String,
	pub reason: MalformedReason,
}

/// Directives and skipped markers found in one document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
	pub directives: Vec<Directive>,
	pub malformed: Vec<MalformedDirective>,
}

/// Scan document text for `<!-- add-file: ... -->` and `<!-- add-web: ... -->`
/// markers.
///
/// The text between two consecutive opening tokens is one fragment; only its
/// part before the first `-->` is read. Fragments whose body does not start
/// with `file:` or `web:` are not directives and are skipped without any
/// diagnostic (`<!-- add-note: hello -->` stays plain text).
pub fn scan_directives(text: &str) -> ScanResult {
	let mut result = ScanResult::default();
	let openings: Vec<usize> = text.match_indices(MARKER_OPEN).map(|(i, _)| i).collect();
	let mut line = 1;
	let mut counted_to = 0;

	for (position, &newline) in openings.iter().enumerate() {
		let start = newline + 1;
		line += text[counted_to..start].matches('\n').count();
		counted_to = start;

		let body_start = newline + MARKER_OPEN.len();
		let fragment_end = openings.get(position + 1).copied().unwrap_or(text.len());
		let fragment = &text[body_start..fragment_end];

		let Some(close) = fragment.find(MARKER_CLOSE) else {
			tracing::debug!(line, "skipping unterminated marker");
			result.malformed.push(MalformedDirective {
				line,
				snippet: snippet(&text[start..fragment_end]),
				reason: MalformedReason::Unterminated,
			});
			continue;
		};

		let end = body_start + close + MARKER_CLOSE.len();
		let marker = &text[start..end];
		let Some((kind, target)) = DirectiveKind::classify(fragment[..close].trim()) else {
			tracing::debug!(line, marker, "ignoring marker with unknown directive kind");
			continue;
		};

		if target.is_empty() {
			result.malformed.push(MalformedDirective {
				line,
				snippet: snippet(marker),
				reason: MalformedReason::EmptyTarget,
			});
			continue;
		}

		result.directives.push(Directive {
			kind,
			target: target.to_string(),
			marker: marker.to_string(),
			start,
			end,
			line,
		});
	}

	result
}

fn snippet(text: &str) -> String {
	text.lines().next().unwrap_or_default().to_string()
}
