#![forbid(unsafe_code)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn extract_prints_observation_json() {
	let dir = tempdir().unwrap();
	let log = dir.path().join("run.log");
	std::fs::write(
		&log,
		"p0-1  | Query 0: user=0.5s, item=0.75s\np0-1  | Query 1: user=1.5e-1s, item=0.25s\np0-1  | Average user profile update time: 0.25\n",
	)
	.unwrap();
	let mut cmd = Command::cargo_bin("mpcbench-cli").unwrap();
	cmd.arg("extract").arg(&log);
	cmd.assert()
		.success()
		.stdout(predicate::str::contains("\"avg_user_time\": 0.25"))
		.stdout(predicate::str::contains("\"avg_item_time\": null"))
		.stdout(predicate::str::contains("\"item\": 0.75"))
		.stdout(predicate::str::contains("\"user\": 0.15"));
}

#[test]
fn extract_missing_log_fails() {
	let dir = tempdir().unwrap();
	let mut cmd = Command::cargo_bin("mpcbench-cli").unwrap();
	cmd.arg("extract").arg(dir.path().join("none.log"));
	cmd.assert().failure().stderr(predicate::str::contains("reading"));
}

#[test]
fn extract_logs_at_configured_level() {
	let dir = tempdir().unwrap();
	let log = dir.path().join("run.log");
	std::fs::write(&log, "Query 0: user=0.5s, item=0.75s\n").unwrap();
	std::fs::write(dir.path().join("mpcbench.toml"), "log_level = \"debug\"\n").unwrap();
	let mut cmd = Command::cargo_bin("mpcbench-cli").unwrap();
	cmd.current_dir(dir.path())
		.env_remove("RUST_LOG")
		.env_remove("MPCBENCH_CONFIG")
		.env_remove("MPCBENCH_LOG_LEVEL")
		.arg("extract")
		.arg(&log);
	cmd.assert().success().stderr(predicate::str::contains("extracted"));
}

#[test]
fn extract_is_quiet_at_default_level() {
	let dir = tempdir().unwrap();
	let log = dir.path().join("run.log");
	std::fs::write(&log, "Query 0: user=0.5s, item=0.75s\n").unwrap();
	let mut cmd = Command::cargo_bin("mpcbench-cli").unwrap();
	cmd.current_dir(dir.path())
		.env_remove("RUST_LOG")
		.env_remove("MPCBENCH_CONFIG")
		.env_remove("MPCBENCH_LOG_LEVEL")
		.arg("extract")
		.arg(&log);
	cmd.assert().success().stderr(predicate::str::contains("extracted").not());
}
