mod common;

use ankt_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;
use serde_json::Value;

#[test]
fn check_passes_for_valid_templates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("front.html"),
		"<div>{{Front}}</div>\n{{#Hint}}{{hint:Hint}}{{/Hint}}\n",
	)?;
	std::fs::write(tmp.path().join("back.html"), "{{FrontSide}}\n<hr id=answer>\n{{Back}}\n")?;

	common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Check passed: 2 file(s) checked, 0 error(s), 0 warning(s).",
		));

	Ok(())
}

#[test]
fn check_fails_on_unclosed_conditional() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("back.html"), "<p>\n{{#Back}}{{Back}}\n</p>\n")?;

	common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("ankt::unclosed_conditional"))
		.stderr(predicates::str::contains("Conditional `Back` is never closed"))
		.stderr(predicates::str::contains("add `{{/Back}}` to close this conditional"))
		.stderr(predicates::str::contains("Check failed:"));

	Ok(())
}

#[test]
fn warnings_do_not_fail_the_check() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("front.html"), "{{mathjax:Front}}")?;

	common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stderr(predicates::str::contains("Unknown filter `mathjax`"))
		.stdout(predicates::str::contains("0 error(s), 1 warning(s)"));

	Ok(())
}

#[test]
fn check_uses_fields_and_filters_from_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("ankt.toml"),
		"[fields]\nnames = [\"Front\"]\n\n[filters]\ncustom = [\"mathjax\"]\n",
	)?;
	std::fs::write(tmp.path().join("front.html"), "{{mathjax:Front}} {{Back}} {{Tags}}")?;

	common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stderr(predicates::str::contains("Unknown field `Back`"))
		.stderr(predicates::str::contains("Unknown filter").not())
		.stdout(predicates::str::contains("0 error(s), 1 warning(s)"));

	Ok(())
}

#[test]
fn check_only_the_given_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("good.html"), "{{Front}}")?;
	std::fs::write(tmp.path().join("bad.html"), "{{/Front}}")?;

	common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.arg(tmp.path().join("good.html"))
		.assert()
		.success()
		.stdout(predicates::str::contains("1 file(s) checked"));

	Ok(())
}

#[test]
fn check_skips_ignored_directories_and_other_extensions() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("node_modules"))?;
	std::fs::write(tmp.path().join("node_modules/broken.html"), "{{#A}}")?;
	std::fs::write(tmp.path().join("notes.md"), "{{#A}}")?;
	std::fs::write(tmp.path().join("card.anki"), "{{A}}")?;

	common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("1 file(s) checked"));

	Ok(())
}

#[test]
fn check_json_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("back.html"), "<p>\n  {{/Back}}</p>")?;

	let output = common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.arg("--format")
		.arg("json")
		.output()?;

	assert_eq!(output.status.code(), Some(1));
	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["ok"], false);

	let file = &json["files"][0];
	assert_eq!(file["file"], "back.html");
	assert_eq!(file["errors"], 1);

	let diagnostic = &file["diagnostics"][0];
	assert_eq!(diagnostic["code"], "orphan_conditional_end");
	assert_eq!(diagnostic["severity"], "error");
	assert_eq!(diagnostic["start"], 6);
	assert_eq!(diagnostic["end"], 15);
	assert_eq!(diagnostic["line"], 2);
	assert_eq!(diagnostic["column"], 3);

	Ok(())
}

#[test]
fn check_github_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("front.html"), "{{#A}}\n{{nope:A}}\n")?;

	common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.arg("--format")
		.arg("github")
		.assert()
		.code(1)
		.stdout(predicates::str::contains(
			"::error file=front.html,line=1,col=1,endLine=1,endColumn=7,title=unclosed_conditional::",
		))
		.stdout(predicates::str::contains(
			"::warning file=front.html,line=2,col=3,endLine=2,endColumn=7,title=unknown_filter::Unknown \
			 filter `nope`",
		));

	Ok(())
}

#[test]
fn check_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("ankt.toml"), "[fields\n")?;

	common::ankt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("ankt::config_parse"));

	Ok(())
}
