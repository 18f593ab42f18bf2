use assert_cmd::Command;

pub fn ankt_cmd() -> Command {
	let mut cmd =
		Command::cargo_bin("ankt").unwrap_or_else(|e| panic!("ankt binary not built: {e}"));
	cmd.env("NO_COLOR", "1").env_remove("ANKT_LOG");
	cmd
}
