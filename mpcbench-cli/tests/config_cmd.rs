#![forbid(unsafe_code)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn config_show_applies_file_and_env() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("bench.toml");
	std::fs::write(&path, "samples = 3\n[ranges]\nq = [2, 8]\n").unwrap();
	let mut cmd = Command::cargo_bin("mpcbench-cli").unwrap();
	cmd.current_dir(dir.path())
		.args(["config", "show"])
		.env("MPCBENCH_CONFIG", &path)
		.env("MPCBENCH_PAUSE_MS", "250")
		.env_remove("MPCBENCH_WORK_DIR")
		.env_remove("MPCBENCH_LOG_LEVEL");
	cmd.assert()
		.success()
		.stdout(predicate::str::contains("samples = 3"))
		.stdout(predicate::str::contains("pause_ms = 250"))
		.stdout(predicate::str::contains("[runner]"));
}

#[test]
fn explicit_config_must_exist() {
	let dir = tempdir().unwrap();
	let mut cmd = Command::cargo_bin("mpcbench-cli").unwrap();
	cmd.current_dir(dir.path()).args(["config", "show", "--config", "absent.toml"]);
	cmd.assert().failure().stderr(predicate::str::contains("loading configuration"));
}

#[test]
fn write_template_refuses_overwrite() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("mpcbench.toml");
	let write = |force: bool| {
		let mut cmd = Command::cargo_bin("mpcbench-cli").unwrap();
		cmd.args(["config", "write-template", "--path"]).arg(&path);
		if force { cmd.arg("--force"); }
		cmd.assert()
	};
	write(false).success();
	let contents = std::fs::read_to_string(&path).unwrap();
	assert!(contents.contains("[ranges]"));
	assert!(contents.contains("compose = [\"docker-compose\"]"));
	write(false).code(2).stderr(predicate::str::contains("refusing to overwrite"));
	write(true).success();
}
