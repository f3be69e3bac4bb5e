mod common;

use mdaf_core::AnyEmptyResult;
use predicates::prelude::*;

#[test]
fn update_injects_file_content() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "doc.md", common::DOCUMENT);

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains(
			"Updated 1 document(s) with 1 block(s).",
		));

	let content = std::fs::read_to_string(tmp.path().join("doc.md"))?;
	assert_eq!(content, common::RENDERED);

	Ok(())
}

#[test]
fn update_twice_is_a_noop() -> AnyEmptyResult {
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
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("already up to date"));

	let content = std::fs::read_to_string(tmp.path().join("doc.md"))?;
	assert_eq!(content, common::RENDERED);

	Ok(())
}

#[test]
fn update_picks_up_changed_source_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "doc.md", common::DOCUMENT);

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	common::write(tmp.path(), "sub/code.py", "print(2)");

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("Updated 1 document(s)"));

	let content = std::fs::read_to_string(tmp.path().join("doc.md"))?;
	assert!(content.contains("print(2)"));
	assert!(!content.contains("print(1)"));
	assert_eq!(content.matches("markdown-add-files").count(), 1);

	Ok(())
}

#[test]
fn update_dry_run_does_not_write() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "doc.md", common::DOCUMENT);

	common::mdaf_cmd()
		.arg("update")
		.arg("--dry-run")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("Dry run: would update 1 document(s):"))
		.stdout(predicate::str::contains("doc.md"));

	let content = std::fs::read_to_string(tmp.path().join("doc.md"))?;
	assert_eq!(content, common::DOCUMENT);

	Ok(())
}

#[test]
fn update_isolates_failing_documents() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "good.md.template", common::DOCUMENT);
	common::write(
		tmp.path(),
		"bad.md.template",
		"intro\n<!-- add-file: missing.txt -->\n",
	);

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.arg("--source-extension")
		.arg(".md.template")
		.arg("--output-extension")
		.arg(".md")
		.assert()
		.code(1)
		.stderr(predicate::str::contains("bad.md.template"))
		.stderr(predicate::str::contains("missing.txt"));

	let good = std::fs::read_to_string(tmp.path().join("good.md"))?;
	assert_eq!(good, common::RENDERED);
	assert!(!tmp.path().join("bad.md").exists());

	// Sources are never modified when the output is a separate file.
	let source = std::fs::read_to_string(tmp.path().join("good.md.template"))?;
	assert_eq!(source, common::DOCUMENT);

	Ok(())
}

#[test]
fn update_leaves_unknown_directives_alone() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let document = "# Title\n<!-- add-image: logo.png -->\n";
	common::write(tmp.path(), "doc.md", document);

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("already up to date"));

	let content = std::fs::read_to_string(tmp.path().join("doc.md"))?;
	assert_eq!(content, document);

	Ok(())
}

#[test]
fn update_reports_when_no_documents_found() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "notes.txt", "<!-- add-file: a.txt -->");

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("No documents ending in `.md` found"));

	Ok(())
}

#[test]
fn update_respects_config_extensions() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(
		tmp.path(),
		"mdaf.toml",
		"source_extension = \".src.md\"\noutput_extension = \".md\"\n",
	);
	common::write(tmp.path(), "sub/code.py", "print(1)");
	common::write(tmp.path(), "readme.src.md", common::DOCUMENT);

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let content = std::fs::read_to_string(tmp.path().join("readme.md"))?;
	assert_eq!(content, common::RENDERED);

	Ok(())
}

#[test]
fn update_rejects_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "mdaf.toml", "max_concurrency = \"many\"\n");
	common::write(tmp.path(), "doc.md", common::DOCUMENT);

	common::mdaf_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicate::str::contains("config"));

	Ok(())
}
