use mpcbench_core::{render_report, sweep, Axis, HarnessConfig, SvgRenderer, SweepOrchestrator};

fn main() -> mpcbench_core::Result<()> {
	let cfg = HarnessConfig::default();
	let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
	let sweeps = rt.block_on(SweepOrchestrator::synthetic().run_plan(&sweep::plan(&cfg, &Axis::ALL)))?;
	for s in &sweeps {
		println!("{}: values={:?} user={:?}", s.axis, s.values, s.user_times);
	}
	let out = std::env::temp_dir().join("mpcbench-synthetic");
	for path in render_report(&SvgRenderer::default(), &sweeps, &out)? {
		println!("wrote {}", path.display());
	}
	Ok(())
}
