#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;

pub fn mdaf_cmd() -> Command {
	let mut cmd = Command::cargo_bin("mdaf").unwrap_or_else(|e| panic!("mdaf binary: {e}"));
	cmd.env("NO_COLOR", "1").env_remove("MDAF_LOG");
	cmd
}

/// Write `content` to `relative` under `root`, creating parent directories.
pub fn write(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create {parent:?}: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {path:?}: {e}"));
}

pub const DOCUMENT: &str = "line1\n<!-- add-file: sub/code.py -->\nline2";

pub const RENDERED: &str =
	"line1\n<!-- add-file: sub/code.py -->\n\n``` py markdown-add-files\nprint(1)\n```\nline2";
