//! Removal of previously injected blocks.
//!
//! A generated block always starts with two newlines followed by a backtick
//! fence whose info string holds [`SENTINEL`], and ends at the first
//! following line that opens with exactly the same fence. Text after that
//! closing fence on the same line belongs to the marker line the block was
//! spliced into and is kept. Removing every such span gives back the text as
//! it was before the last injection, with the directive markers still in
//! place.
//!
//! Documents whose line endings were converted to CRLF after injection are
//! recognized too: the blank line before the opener may be `\r\n` and
//! every line may carry a trailing `\r`.

use std::ops::Range;

use crate::render::SENTINEL;

const FENCE_LINE_PREFIX: &str = "\n```";

/// Byte ranges of every generated block in `text`, in document order.
///
/// Each range starts at the line breaks before the opening fence and ends
/// just after the closing fence, so anything following the fence on its
/// line (including the line break) is not included.
/// Ranges never overlap. An opener that has no matching closing fence is
/// not a block and is left alone.
pub fn find_stale_blocks(text: &str) -> Vec<Range<usize>> {
	let mut blocks = Vec::new();
	let mut search_from = 0;

	while let Some(found) = text[search_from..].find(FENCE_LINE_PREFIX) {
		let newline = search_from + found;
		let fence_start = newline + 1;
		search_from = fence_start;

		// The fence must follow a blank line.
		let Some(start) = blank_line_start(text, newline) else {
			continue;
		};

		// The opener must be a complete line.
		let Some(opener_len) = text[fence_start..].find('\n') else {
			break;
		};

		let opener = text[fence_start..fence_start + opener_len].trim_end_matches('\r');
		if !opener.contains(SENTINEL) {
			continue;
		}

		let fence = leading_fence(opener);
		match find_closing_fence(text, fence_start + opener_len + 1, fence) {
			Some(end) => {
				blocks.push(start..end);
				search_from = end;
			}
			None => {
				tracing::debug!(offset = start, "generated block opener has no closing fence");
			}
		}
	}

	blocks
}

/// Strip every previously generated block from `text`.
pub fn remove_stale_blocks(text: &str) -> String {
	let blocks = find_stale_blocks(text);
	if blocks.is_empty() {
		return text.to_string();
	}

	let removed: usize = blocks.iter().map(|block| block.end - block.start).sum();
	let mut result = String::with_capacity(text.len() - removed);
	let mut cursor = 0;

	for block in &blocks {
		result.push_str(&text[cursor..block.start]);
		cursor = block.end;
	}

	result.push_str(&text[cursor..]);
	tracing::debug!(count = blocks.len(), "removed stale blocks");
	result
}

/// Start of the line break that precedes the blank line ending at
/// `newline`, or `None` when the line before `newline` is not blank.
fn blank_line_start(text: &str, newline: usize) -> Option<usize> {
	let before = &text[..newline];
	if before.ends_with("\r\n\r") {
		Some(newline - 3)
	} else if before.ends_with('\n') {
		Some(newline - 1)
	} else {
		None
	}
}

fn leading_fence(line: &str) -> &str {
	let len = line.bytes().take_while(|b| *b == b'`').count();
	&line[..len]
}

/// Scan whole lines from `from` for one that opens with `fence` not followed
/// by another backtick. Returns the offset just past that fence.
///
/// Body lines never match: the renderer makes the fence longer than any
/// backtick run that starts a body line.
fn find_closing_fence(text: &str, from: usize, fence: &str) -> Option<usize> {
	let mut line_start = from;

	while line_start < text.len() {
		let line_end = text[line_start..]
			.find('\n')
			.map_or(text.len(), |offset| line_start + offset);
		let line = &text[line_start..line_end];

		if line.starts_with(fence) && !line[fence.len()..].starts_with('`') {
			return Some(line_start + fence.len());
		}

		line_start = line_end + 1;
	}

	None
}
