//! Build-and-run cycle of the external protocol.

use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use crate::types::SweepParams;
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Console output of one protocol execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutput {
	/// stdout followed by stderr of the execution step.
	pub raw: String,
	/// Every step exited successfully.
	pub exit_ok: bool,
}

/// Builds and executes the protocol for one sweep point.
///
/// Implementations hold no state across calls. `Err` means a step could not be started at
/// all; a step that ran and failed is reported through [`RunOutput::exit_ok`].
#[async_trait]
pub trait ExternalRunner: Send + Sync {
	async fn execute(&self, params: &SweepParams, work_dir: &Path) -> Result<RunOutput>;
}

/// Compiles the query generator, generates data, then runs the parties with compose.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
	cfg: RunnerConfig,
}

impl ProcessRunner {
	pub fn new(cfg: RunnerConfig) -> Self { Self { cfg } }

	fn generator_exe(&self) -> String { format!("{}{}", self.cfg.generator_bin, std::env::consts::EXE_SUFFIX) }

	async fn step(&self, label: &str, program: &str, args: &[String], work_dir: &Path) -> Result<Output> {
		debug!(step = label, program, ?args, "running");
		let out = Command::new(program)
			.args(args)
			.current_dir(work_dir)
			.kill_on_drop(true)
			.output()
			.await
			.map_err(|e| Error::runner(format!("{label}: failed to start {program}: {e}")))?;
		if !out.status.success() {
			warn!(step = label, status = %out.status, stderr = %String::from_utf8_lossy(&out.stderr).trim(), "step failed");
		}
		Ok(out)
	}

	/// Remove any deployment left by a previous point. Failures here are expected when
	/// nothing is running and are ignored.
	async fn teardown(&self, work_dir: &Path) {
		let (compose, rest) = self.compose();
		let mut down = rest.to_vec();
		down.push("down".into());
		if let Err(e) = self.step("teardown", compose, &down, work_dir).await { debug!("{e}"); }
		let mut rm = vec!["rm".to_string(), "-f".to_string()];
		rm.extend(self.cfg.containers.iter().cloned());
		if let Err(e) = self.step("teardown", &self.cfg.docker, &rm, work_dir).await { debug!("{e}"); }
	}

	fn compose(&self) -> (&str, &[String]) {
		match self.cfg.compose.split_first() {
			Some((program, rest)) => (program.as_str(), rest),
			None => ("docker-compose", &[]),
		}
	}
}

fn failed(out: &Output) -> RunOutput {
	RunOutput { raw: combined(out), exit_ok: false }
}

fn combined(out: &Output) -> String {
	let mut raw = String::from_utf8_lossy(&out.stdout).into_owned();
	raw.push_str(&String::from_utf8_lossy(&out.stderr));
	raw
}

#[async_trait]
impl ExternalRunner for ProcessRunner {
	async fn execute(&self, params: &SweepParams, work_dir: &Path) -> Result<RunOutput> {
		// Children run inside work_dir, so every path handed to them must be absolute.
		let work_dir = tokio::fs::canonicalize(work_dir)
			.await
			.map_err(|e| Error::runner(format!("work dir {}: {e}", work_dir.display())))?;
		let work_dir = work_dir.as_path();
		info!("[1/3] generating initial data and queries ({params})");
		let exe = self.generator_exe();
		let build = [format!("-std={}", self.cfg.std), self.cfg.generator_source.clone(), "-o".into(), exe.clone()];
		let out = self.step("build", &self.cfg.compiler, &build, work_dir).await?;
		if !out.status.success() { return Ok(failed(&out)); }

		let data_dir = work_dir.join(&self.cfg.data_dir);
		tokio::fs::create_dir_all(&data_dir).await?;
		let generator = work_dir.join(&exe);
		let out = self.step("generate", &generator.to_string_lossy(), &[data_dir.to_string_lossy().into_owned()], work_dir).await?;
		if !out.status.success() { return Ok(failed(&out)); }

		info!("[2/3] running MPC protocol");
		self.teardown(work_dir).await;
		let (compose, rest) = self.compose();
		let mut up = rest.to_vec();
		up.extend(["up", "--build", "--force-recreate"].map(String::from));
		let out = self.step("execute", compose, &up, work_dir).await?;
		Ok(RunOutput { raw: combined(&out), exit_ok: out.status.success() })
	}
}
