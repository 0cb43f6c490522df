use crate::error::{Error, Result};
use crate::types::{Axis, SweepParams, DEFAULT_PARAMS};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use tracing::debug;

/// File looked up in the current directory when no explicit config is given.
pub const DEFAULT_CONFIG_FILE: &str = "mpcbench.toml";

/// Harness configuration (`mpcbench.toml`). Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
	pub log_level: String,
	/// Protocol checkout; every external command runs here.
	pub work_dir: PathBuf,
	/// Constants header, relative to `work_dir`.
	pub constants_file: PathBuf,
	/// Chart directory, relative to `work_dir` unless absolute.
	pub output_dir: PathBuf,
	/// Pause between live runs, letting the previous deployment finish tearing down.
	pub pause_ms: u64,
	/// Points per sweep axis.
	pub samples: usize,
	pub defaults: SweepParams,
	pub ranges: SweepRanges,
	pub runner: RunnerConfig,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			log_level: "info".into(),
			work_dir: PathBuf::from("."),
			constants_file: PathBuf::from("constants.hpp"),
			output_dir: PathBuf::from("A4"),
			pause_ms: 1000,
			samples: 5,
			defaults: DEFAULT_PARAMS,
			ranges: SweepRanges::default(),
			runner: RunnerConfig::default(),
		}
	}
}

/// Inclusive `[lo, hi]` sample range per axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepRanges {
	pub q: [u32; 2],
	pub m: [u32; 2],
	pub n: [u32; 2],
}

impl Default for SweepRanges {
	fn default() -> Self { Self { q: [5, 40], m: [1, 50], n: [1, 50] } }
}

impl SweepRanges {
	pub fn get(&self, axis: Axis) -> (u32, u32) {
		let [lo, hi] = match axis { Axis::Q => self.q, Axis::M => self.m, Axis::N => self.n };
		(lo, hi)
	}
}

/// External commands used by the process runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
	pub compiler: String,
	pub std: String,
	pub generator_source: String,
	/// Generator executable name, without the platform suffix.
	pub generator_bin: String,
	pub data_dir: String,
	/// Compose invocation, e.g. `["docker-compose"]` or `["docker", "compose"]`.
	pub compose: Vec<String>,
	pub docker: String,
	/// Containers force-removed before each run.
	pub containers: Vec<String>,
}

impl Default for RunnerConfig {
	fn default() -> Self {
		Self {
			compiler: "g++".into(),
			std: "c++20".into(),
			generator_source: "gen_queries.cpp".into(),
			generator_bin: "gen_queries".into(),
			data_dir: "data".into(),
			compose: vec!["docker-compose".into()],
			docker: "docker".into(),
			containers: vec!["p2".into(), "p1".into(), "p0".into()],
		}
	}
}

impl HarnessConfig {
	pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
		let data = fs::read_to_string(path)?;
		let cfg: Self = toml::from_str(&data)?;
		cfg.validate()?;
		Ok(cfg)
	}

	/// Resolve the effective config: explicit path, then `$MPCBENCH_CONFIG`, then
	/// `./mpcbench.toml`, then defaults; environment overrides are applied last.
	pub fn discover(explicit: Option<&Path>) -> Result<Self> {
		let cfg = match explicit {
			Some(p) => Self::load_from_file(p).map_err(|e| Error::config(format!("{}: {e}", p.display())))?,
			None => {
				let mut candidates: Vec<PathBuf> = Vec::new();
				if let Ok(p) = std::env::var("MPCBENCH_CONFIG") { if !p.trim().is_empty() { candidates.push(PathBuf::from(p)); } }
				candidates.push(PathBuf::from(DEFAULT_CONFIG_FILE));
				match candidates.into_iter().find(|p| p.is_file()) {
					Some(p) => {
						debug!(path = %p.display(), "loading config");
						Self::load_from_file(&p).map_err(|e| Error::config(format!("{}: {e}", p.display())))?
					}
					None => Self::default(),
				}
			}
		};
		cfg.with_env_overrides(|k| std::env::var(k).ok())
	}

	/// Apply `MPCBENCH_LOG_LEVEL`, `MPCBENCH_WORK_DIR` and `MPCBENCH_PAUSE_MS` from `lookup`.
	pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		if let Some(v) = lookup("MPCBENCH_LOG_LEVEL") { self.log_level = v.trim().to_string(); }
		if let Some(v) = lookup("MPCBENCH_WORK_DIR") { if !v.trim().is_empty() { self.work_dir = PathBuf::from(v.trim()); } }
		if let Some(v) = lookup("MPCBENCH_PAUSE_MS") {
			self.pause_ms = v.trim().parse().map_err(|_| Error::config(format!("invalid MPCBENCH_PAUSE_MS: {v}")))?;
		}
		self.validate()?;
		Ok(self)
	}

	pub fn validate(&self) -> Result<()> {
		let allowed = ["trace", "debug", "info", "warn", "error"];
		if !allowed.contains(&self.log_level.as_str()) {
			return Err(Error::config(format!("invalid log_level: {}", self.log_level)));
		}
		if self.samples == 0 {
			return Err(Error::config("samples must be at least 1"));
		}
		for axis in Axis::ALL {
			let (lo, hi) = self.ranges.get(axis);
			if lo > hi {
				return Err(Error::config(format!("invalid range for {axis}: {lo} > {hi}")));
			}
		}
		if self.runner.compose.is_empty() {
			return Err(Error::config("runner.compose must name a program"));
		}
		Ok(())
	}

	pub fn constants_path(&self) -> PathBuf { self.work_dir.join(&self.constants_file) }

	pub fn output_path(&self) -> PathBuf { self.work_dir.join(&self.output_dir) }

	pub fn pause(&self) -> Duration { Duration::from_millis(self.pause_ms) }

	pub fn to_toml_string(&self) -> Result<String> {
		toml::to_string_pretty(self).map_err(|e| Error::config(format!("toml encode error: {e}")))
	}
}
