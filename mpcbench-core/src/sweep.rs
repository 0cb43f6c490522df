//! Sweep orchestration: one axis varies over sampled values while the others hold defaults.
//!
//! Each point runs MUTATE -> EXECUTE -> EXTRACT to completion before the next starts. A
//! point that fails or yields no timings is recorded as missing (`NaN` in the per-axis
//! arrays) and the sweep carries on; only a broken constants header aborts it.

use crate::config::HarnessConfig;
use crate::constants::ConstantsFile;
use crate::error::Result;
use crate::extract::TimingExtractor;
use crate::runner::ExternalRunner;
use crate::types::{Axis, Metric, SweepParams, TimingObservation, DEFAULT_PARAMS};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// `count` evenly spaced samples over `[lo, hi]`, both ends included, truncated to integers.
pub fn linspace(lo: u32, hi: u32, count: usize) -> Vec<u32> {
	match count {
		0 => Vec::new(),
		1 => vec![lo],
		_ => {
			let step = (f64::from(hi) - f64::from(lo)) / (count - 1) as f64;
			(0..count)
				.map(|i| if i == count - 1 { hi } else { (f64::from(lo) + step * i as f64) as u32 })
				.collect()
		}
	}
}

/// Sample values for every axis of a full run, in sweep order.
pub fn plan(cfg: &HarnessConfig, axes: &[Axis]) -> Vec<(Axis, Vec<u32>)> {
	axes.iter()
		.map(|&axis| {
			let (lo, hi) = cfg.ranges.get(axis);
			(axis, linspace(lo, hi, cfg.samples))
		})
		.collect()
}

const SYNTHETIC_BASE: f64 = 0.0005;

/// Deterministic stand-in timings for the `position`-th of `count` samples. Timings grow with
/// the position alone, whatever the sampled values are.
pub fn synthetic_observation(position: usize, count: usize) -> TimingObservation {
	let step = (position + 1) as f64;
	let frac = step / count.max(1) as f64;
	let user = SYNTHETIC_BASE * (1.0 + frac) + 1e-6 * step;
	let item = SYNTHETIC_BASE * (1.0 + 0.5 * frac) + 2e-6 * step;
	TimingObservation { queries: Vec::new(), avg_user_time: Some(user), avg_item_time: Some(item) }
}

/// Parameters mapped to their observation, `None` for a missing point. Keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepResult {
	points: Vec<(SweepParams, Option<TimingObservation>)>,
}

impl SweepResult {
	pub fn new() -> Self { Self::default() }

	/// Insert or replace the observation for `params`.
	pub fn insert(&mut self, params: SweepParams, obs: Option<TimingObservation>) {
		match self.points.iter_mut().find(|(p, _)| *p == params) {
			Some(slot) => slot.1 = obs,
			None => self.points.push((params, obs)),
		}
	}

	/// `None` when `params` was never measured, `Some(None)` when it was measured but missing.
	pub fn get(&self, params: &SweepParams) -> Option<Option<&TimingObservation>> {
		self.points.iter().find(|(p, _)| p == params).map(|(_, o)| o.as_ref())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&SweepParams, Option<&TimingObservation>)> {
		self.points.iter().map(|(p, o)| (p, o.as_ref()))
	}

	pub fn len(&self) -> usize { self.points.len() }

	pub fn is_empty(&self) -> bool { self.points.is_empty() }

	pub fn merge(&mut self, other: &SweepResult) {
		for (p, o) in &other.points { self.insert(*p, o.clone()); }
	}
}

impl FromIterator<(SweepParams, Option<TimingObservation>)> for SweepResult {
	fn from_iter<I: IntoIterator<Item = (SweepParams, Option<TimingObservation>)>>(iter: I) -> Self {
		let mut r = Self::new();
		for (p, o) in iter { r.insert(p, o); }
		r
	}
}

/// Outcome of one axis sweep. The time arrays are position-aligned with `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSweep {
	pub axis: Axis,
	pub values: Vec<u32>,
	pub user_times: Vec<f64>,
	pub item_times: Vec<f64>,
	pub results: SweepResult,
}

impl AxisSweep {
	pub fn times(&self, metric: Metric) -> &[f64] {
		match metric { Metric::User => &self.user_times, Metric::Item => &self.item_times }
	}

	/// Points with no usable user or item time.
	pub fn missing(&self) -> usize {
		self.user_times.iter().zip(&self.item_times).filter(|(u, i)| u.is_nan() || i.is_nan()).count()
	}
}

/// Every axis' points in one result, for cross-axis aggregation.
pub fn merged(sweeps: &[AxisSweep]) -> SweepResult {
	let mut all = SweepResult::new();
	for s in sweeps { all.merge(&s.results); }
	all
}

/// Where observations come from.
pub enum Mode<'a> {
	/// Mutate the header, run the protocol, extract timings from its output.
	Live { constants: &'a ConstantsFile, runner: &'a dyn ExternalRunner, work_dir: &'a Path },
	/// Fabricate deterministic timings without touching anything external.
	Synthetic,
}

pub struct SweepOrchestrator<'a> {
	mode: Mode<'a>,
	extractor: TimingExtractor,
	defaults: SweepParams,
	pause: Duration,
	executed: AtomicBool,
}

impl<'a> SweepOrchestrator<'a> {
	pub fn new(mode: Mode<'a>) -> Self {
		Self {
			mode,
			extractor: TimingExtractor::default(),
			defaults: DEFAULT_PARAMS,
			pause: Duration::from_secs(1),
			executed: AtomicBool::new(false),
		}
	}

	pub fn live(constants: &'a ConstantsFile, runner: &'a dyn ExternalRunner, work_dir: &'a Path) -> Self {
		Self::new(Mode::Live { constants, runner, work_dir })
	}

	pub fn synthetic() -> Self { Self::new(Mode::Synthetic) }

	pub fn with_defaults(mut self, defaults: SweepParams) -> Self { self.defaults = defaults; self }

	/// Pause inserted between successive live executions.
	pub fn with_pause(mut self, pause: Duration) -> Self { self.pause = pause; self }

	pub fn with_extractor(mut self, extractor: TimingExtractor) -> Self { self.extractor = extractor; self }

	/// Sweep `axis` over `values`, in order.
	pub async fn run_axis(&self, axis: Axis, values: &[u32]) -> Result<AxisSweep> {
		let mut sweep = AxisSweep {
			axis,
			values: values.to_vec(),
			user_times: Vec::with_capacity(values.len()),
			item_times: Vec::with_capacity(values.len()),
			results: SweepResult::new(),
		};
		for (idx, &v) in values.iter().enumerate() {
			let params = axis.substitute(self.defaults, v);
			info!("[{axis} sweep] {}/{}: {axis}={v}", idx + 1, values.len());
			let obs = match &self.mode {
				Mode::Synthetic => Some(synthetic_observation(idx, values.len())),
				Mode::Live { constants, runner, work_dir } => self.measure(constants, *runner, work_dir, &params).await?,
			};
			let time = |metric| obs.as_ref().and_then(|o| o.time(metric)).unwrap_or(f64::NAN);
			sweep.user_times.push(time(Metric::User));
			sweep.item_times.push(time(Metric::Item));
			sweep.results.insert(params, obs);
		}
		debug!(axis = %axis, missing = sweep.missing(), "sweep done");
		Ok(sweep)
	}

	/// Run every planned axis, one after another.
	pub async fn run_plan(&self, plan: &[(Axis, Vec<u32>)]) -> Result<Vec<AxisSweep>> {
		let mut out = Vec::with_capacity(plan.len());
		for (axis, values) in plan {
			info!("running {axis} sweep");
			out.push(self.run_axis(*axis, values).await?);
		}
		Ok(out)
	}

	async fn measure(
		&self,
		constants: &ConstantsFile,
		runner: &dyn ExternalRunner,
		work_dir: &Path,
		params: &SweepParams,
	) -> Result<Option<TimingObservation>> {
		if self.executed.swap(true, Ordering::SeqCst) && !self.pause.is_zero() {
			tokio::time::sleep(self.pause).await;
		}
		debug!(%params, "mutate");
		constants.apply(params)?;
		debug!(%params, "execute");
		let out = match runner.execute(params, work_dir).await {
			Ok(out) => out,
			Err(e) => {
				warn!("run failed for {params}: {e}");
				return Ok(None);
			}
		};
		if !out.exit_ok {
			warn!("protocol exited with failure for {params}; recording missing point");
			return Ok(None);
		}
		debug!(%params, "extract");
		let obs = self.extractor.extract(&out.raw);
		if obs.is_empty() {
			warn!("No timing data found for {params}");
			return Ok(None);
		}
		info!("found {} timing measurements", obs.queries.len());
		if let Some(t) = obs.avg_user_time { info!("Average User Update Time: {t:.9} seconds"); }
		if let Some(t) = obs.avg_item_time { info!("Average Item Update Time: {t:.9} seconds"); }
		Ok(Some(obs))
	}
}
