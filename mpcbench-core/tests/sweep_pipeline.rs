//! Orchestrator, aggregation and report driven end to end with a scripted runner.

use async_trait::async_trait;
use mpcbench_core::chart::{BarChart, ChartRenderer, LineChart};
use mpcbench_core::{
	render_report, sweep, AverageStrategy, Axis, ConstantsFile, Error, ExternalRunner, HarnessConfig, Result, RunOutput,
	SweepOrchestrator, SweepParams, TimingExtractor,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

const HEADER: &str = "#pragma once\nconstexpr uint32_t M = 10;  // Number of users\nconstexpr uint32_t N = 50;  // Number of items\nconstexpr uint32_t K = 3;  // Number of features\nconstexpr uint32_t Q = 10; // Number of queries\n";

fn log_for(p: &SweepParams) -> String {
	let t = f64::from(p.q) * 1e-5;
	format!(
		"p0-1  | Query 0: user={t}s, item={t}s\np0-1  | Average user profile update time: {t}\np0-1  | Average item profile update time: {}\n",
		t * 2.0
	)
}

/// Records what the header held when each execution started.
struct ScriptedRunner {
	constants: PathBuf,
	script: fn(&SweepParams) -> Result<RunOutput>,
	seen: Mutex<Vec<(SweepParams, SweepParams)>>,
}

impl ScriptedRunner {
	fn new(constants: PathBuf, script: fn(&SweepParams) -> Result<RunOutput>) -> Self {
		Self { constants, script, seen: Mutex::new(Vec::new()) }
	}
}

#[async_trait]
impl ExternalRunner for ScriptedRunner {
	async fn execute(&self, params: &SweepParams, _work_dir: &Path) -> Result<RunOutput> {
		let on_disk = ConstantsFile::open(&self.constants)?.read()?;
		self.seen.lock().unwrap().push((*params, on_disk));
		(self.script)(params)
	}
}

fn setup() -> (tempfile::TempDir, ConstantsFile) {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("constants.hpp");
	std::fs::write(&path, HEADER).unwrap();
	let handle = ConstantsFile::open(&path).unwrap();
	(dir, handle)
}

#[tokio::test]
async fn failed_point_is_nan_in_place() {
	let (dir, handle) = setup();
	let runner = ScriptedRunner::new(handle.path().to_path_buf(), |p| {
		Ok(RunOutput { raw: log_for(p), exit_ok: p.q != 22 })
	});
	let orch = SweepOrchestrator::live(&handle, &runner, dir.path()).with_pause(Duration::ZERO);
	let s = orch.run_axis(Axis::Q, &[5, 13, 22, 31, 40]).await.unwrap();

	assert_eq!(s.values, vec![5, 13, 22, 31, 40]);
	assert_eq!(s.user_times.len(), 5);
	assert_eq!(s.item_times.len(), 5);
	assert!(s.user_times[2].is_nan() && s.item_times[2].is_nan());
	assert!((s.user_times[4] - 40.0 * 1e-5).abs() < 1e-12);
	assert!((s.item_times[0] - 5.0 * 2e-5).abs() < 1e-12);
	assert_eq!(s.missing(), 1);
	assert_eq!(s.results.len(), 5);
	assert_eq!(s.results.get(&SweepParams::new(10, 20, 3, 22)), Some(None));

	// Header was mutated before every execution.
	let seen = runner.seen.lock().unwrap();
	assert_eq!(seen.len(), 5);
	assert!(seen.iter().all(|(asked, on_disk)| asked == on_disk));
	assert_eq!(handle.read().unwrap(), SweepParams::new(10, 20, 3, 40));
}

#[tokio::test]
async fn runner_errors_and_silent_logs_do_not_abort() {
	let (dir, handle) = setup();
	let runner = ScriptedRunner::new(handle.path().to_path_buf(), |p| match p.m {
		1 => Err(Error::runner("docker-compose: not found")),
		13 => Ok(RunOutput { raw: "P2: Session finished.\n".into(), exit_ok: true }),
		_ => Ok(RunOutput { raw: log_for(p), exit_ok: true }),
	});
	let orch = SweepOrchestrator::live(&handle, &runner, dir.path()).with_pause(Duration::ZERO);
	let s = orch.run_axis(Axis::M, &[1, 13, 25, 37, 50]).await.unwrap();
	assert!(s.user_times[0].is_nan());
	assert!(s.user_times[1].is_nan());
	assert!(s.user_times[2..].iter().all(|t| t.is_finite()));
	assert_eq!(runner.seen.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn vanished_header_is_fatal() {
	let (dir, handle) = setup();
	let runner = ScriptedRunner::new(handle.path().to_path_buf(), |p| Ok(RunOutput { raw: log_for(p), exit_ok: true }));
	std::fs::remove_file(handle.path()).unwrap();
	let orch = SweepOrchestrator::live(&handle, &runner, dir.path()).with_pause(Duration::ZERO);
	let err = orch.run_axis(Axis::N, &[1, 50]).await.unwrap_err();
	assert!(matches!(err, Error::ConfigNotFound { .. }));
	assert!(runner.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn live_plan_uses_configured_defaults() {
	let (dir, handle) = setup();
	let runner = ScriptedRunner::new(handle.path().to_path_buf(), |p| Ok(RunOutput { raw: log_for(p), exit_ok: true }));
	let orch = SweepOrchestrator::live(&handle, &runner, dir.path())
		.with_pause(Duration::ZERO)
		.with_defaults(SweepParams::new(2, 4, 1, 6));
	let sweeps = orch.run_plan(&[(Axis::N, vec![1, 3])]).await.unwrap();
	let asked: Vec<SweepParams> = runner.seen.lock().unwrap().iter().map(|(a, _)| *a).collect();
	assert_eq!(asked, vec![SweepParams::new(2, 1, 1, 6), SweepParams::new(2, 3, 1, 6)]);
	assert_eq!(sweeps.len(), 1);
}

#[tokio::test]
async fn custom_extractor_reads_item_average() {
	let (dir, handle) = setup();
	let runner = ScriptedRunner::new(handle.path().to_path_buf(), |p| {
		Ok(RunOutput { raw: format!("user_update_time: 0.5\nitem_avg_ms={}\n", p.q), exit_ok: true })
	});
	let extractor = TimingExtractor::new().with_item_strategy(AverageStrategy::new("millis", r"item_avg_ms=(\d+)").unwrap());
	let orch = SweepOrchestrator::live(&handle, &runner, dir.path())
		.with_pause(Duration::ZERO)
		.with_extractor(extractor);
	let s = orch.run_axis(Axis::Q, &[5, 13]).await.unwrap();
	assert_eq!(s.user_times, vec![0.5, 0.5]);
	assert_eq!(s.item_times, vec![5.0, 13.0]);
}

#[derive(Default)]
struct RecordingRenderer {
	fail_lines: bool,
	lines: RefCell<Vec<(PathBuf, LineChart)>>,
	bars: RefCell<Vec<(PathBuf, BarChart)>>,
}

impl ChartRenderer for RecordingRenderer {
	fn line_chart(&self, chart: &LineChart, path: &Path) -> Result<()> {
		if self.fail_lines { return Err(Error::chart("backend unavailable")); }
		self.lines.borrow_mut().push((path.to_path_buf(), chart.clone()));
		Ok(())
	}

	fn bar_chart(&self, chart: &BarChart, path: &Path) -> Result<()> {
		self.bars.borrow_mut().push((path.to_path_buf(), chart.clone()));
		Ok(())
	}

	fn extension(&self) -> &'static str { "png" }
}

#[tokio::test]
async fn synthetic_run_renders_full_report() {
	let cfg = HarnessConfig::default();
	let sweeps = SweepOrchestrator::synthetic().run_plan(&sweep::plan(&cfg, &Axis::ALL)).await.unwrap();
	let out = tempfile::tempdir().unwrap();
	let renderer = RecordingRenderer::default();
	let written = render_report(&renderer, &sweeps, out.path()).unwrap();

	let names: Vec<String> = written.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
	for axis in ["q", "m", "n"] {
		for metric in ["user", "item"] {
			assert!(names.contains(&format!("{axis}_vs_{metric}_update.png")), "{names:?}");
		}
	}
	for grouped in ["time_vs_queries.png", "time_vs_users.png", "time_vs_items.png"] {
		assert!(names.contains(&grouped.to_string()));
	}
	assert!(names.contains(&"user_vs_item_comparison.png".to_string()));
	assert_eq!(written.len(), 10);

	let lines = renderer.lines.borrow();
	let (_, grouped_q) = lines.iter().find(|(p, _)| p.ends_with("time_vs_queries.png")).unwrap();
	assert_eq!(grouped_q.series.len(), 2);
	assert_eq!(grouped_q.series[0].label.as_deref(), Some("User (m=10,n=20,k=3)"));
	let xs: Vec<f64> = grouped_q.series[0].points.iter().map(|p| p.0).collect();
	assert_eq!(xs, vec![5.0, 13.0, 22.0, 31.0, 40.0]);

	let bars = renderer.bars.borrow();
	assert_eq!(bars[0].1.labels.len(), 15);
	assert_eq!(bars[0].1.groups.len(), 2);
}

#[tokio::test]
async fn failing_backend_skips_only_failed_charts() {
	let sweeps = SweepOrchestrator::synthetic().run_plan(&[(Axis::Q, vec![5, 40])]).await.unwrap();
	let out = tempfile::tempdir().unwrap();
	let renderer = RecordingRenderer { fail_lines: true, ..RecordingRenderer::default() };
	let written = render_report(&renderer, &sweeps, out.path().join("charts").as_path()).unwrap();
	assert_eq!(written.len(), 1);
	assert!(written[0].ends_with("user_vs_item_comparison.png"));
	assert!(out.path().join("charts").is_dir());
}
