mod common;

use mdaf_core::AnyEmptyResult;
use predicates::prelude::*;

#[test]
fn check_fails_before_update() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "doc.md", common::DOCUMENT);

	common::mdaf_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicate::str::contains("Check failed."))
		.stderr(predicate::str::contains("doc.md"))
		.stderr(predicate::str::contains("Run `mdaf update` to fix."));

	let content = std::fs::read_to_string(tmp.path().join("doc.md"))?;
	assert_eq!(content, common::DOCUMENT);

	Ok(())
}

#[test]
fn check_passes_after_update() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "doc.md", common::DOCUMENT);

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	common::mdaf_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("Check passed"));

	Ok(())
}

#[test]
fn check_diff_shows_missing_block() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "doc.md", common::DOCUMENT);

	common::mdaf_cmd()
		.arg("check")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicate::str::contains("+print(1)"));

	Ok(())
}

#[test]
fn check_json_reports_stale_and_errors() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "doc.md", common::DOCUMENT);
	common::write(tmp.path(), "broken.md", "<!-- add-file: missing.txt -->\n");

	let output = common::mdaf_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;

	assert_eq!(output.status.code(), Some(1));
	let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["ok"], false);
	assert_eq!(json["stale"][0]["file"], "doc.md");
	assert_eq!(json["stale"][0]["blocks"], 1);
	assert_eq!(json["errors"][0]["file"], "broken.md");
	assert!(
		json["errors"][0]["target"]
			.as_str()
			.is_some_and(|target| target.ends_with("missing.txt"))
	);

	Ok(())
}

#[test]
fn check_json_passes_when_up_to_date() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "doc.md", "# No directives here\n");

	common::mdaf_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("\"ok\":true"));

	Ok(())
}
