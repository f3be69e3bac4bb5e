use std::fmt;

/// Token placed in the info string of every generated code fence. Stale
/// block removal only touches fences that carry it.
pub const SENTINEL: &str = "markdown-add-files";

/// Shortest fence the renderer emits.
pub(crate) const MIN_FENCE: usize = 3;

/// Resolved content ready to be spliced into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
	pub language_tag: String,
	/// The resolved content, verbatim.
	pub body: String,
}

impl RenderedBlock {
	pub fn new(language_tag: impl Into<String>, body: impl Into<String>) -> Self {
		Self {
			language_tag: language_tag.into(),
			body: body.into(),
		}
	}

	/// The backtick fence for this block.
	///
	/// Three backticks unless the body has a line that itself opens with three
	/// or more, in which case the fence is one longer than the longest such
	/// run so the body cannot close it early.
	pub fn fence(&self) -> String {
		let longest = self
			.body
			.lines()
			.map(|line| line.trim_start().chars().take_while(|c| *c == '`').count())
			.filter(|run| *run >= MIN_FENCE)
			.max()
			.map_or(MIN_FENCE, |run| run + 1);

		"`".repeat(longest)
	}
}

impl fmt::Display for RenderedBlock {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let fence = self.fence();
		write!(
			f,
			"\n\n{fence} {} {SENTINEL}\n{}\n{fence}",
			self.language_tag, self.body
		)
	}
}

/// Render `body` as a sentinel-tagged fenced code block.
///
/// ```
/// use mdaf_core::render_block;
///
/// assert_eq!(
/// 	render_block("py", "print(1)"),
/// 	"\n\n``` py markdown-add-files\nprint(1)\n```"
/// );
/// ```
pub fn render_block(language_tag: &str, body: &str) -> String {
	RenderedBlock::new(language_tag, body).to_string()
}
