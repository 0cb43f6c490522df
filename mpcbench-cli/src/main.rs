#![forbid(unsafe_code)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use console::style;
use mpcbench_core::{
	render_report, sweep, Axis, ConstantsFile, HarnessConfig, ProcessRunner, SvgRenderer, SweepOrchestrator, TimingExtractor,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

mod summary;

#[derive(Debug, Parser)]
#[command(
	name = "mpcbench-cli",
	version,
	about = "Sweep an MPC protocol over its build parameters and chart the update times",
	args_conflicts_with_subcommands = true
)]
struct Cli {
	/// Harness config file (default: $MPCBENCH_CONFIG, then ./mpcbench.toml)
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(flatten)]
	run: RunArgs,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Run every sweep and write the charts (default)
	Run(RunArgs),
	/// Extract timings from a saved protocol log and print them as JSON
	Extract { log: PathBuf },
	/// Config helpers
	Config {
		#[command(subcommand)]
		action: ConfigCmd,
	},
}

#[derive(Debug, Clone, Default, Args)]
struct RunArgs {
	/// Skip the confirmation prompt
	#[arg(short = 'y', long)]
	yes: bool,
	/// Use synthetic timings; nothing is built or executed
	#[arg(short = 'd', long)]
	dry_run: bool,
	/// Protocol working directory (overrides config)
	#[arg(long)]
	work_dir: Option<PathBuf>,
	/// Chart directory (overrides config)
	#[arg(long)]
	out_dir: Option<PathBuf>,
	/// Sweep only these axes, in the given order (q, m, n)
	#[arg(long = "axis")]
	axes: Vec<Axis>,
}

#[derive(Debug, Subcommand)]
enum ConfigCmd {
	/// Print the effective configuration as TOML
	Show,
	/// Write an mpcbench.toml template
	WriteTemplate {
		/// Destination path (default: ./mpcbench.toml)
		#[arg(long)]
		path: Option<PathBuf>,
		/// Overwrite if the file exists
		#[arg(long)]
		force: bool,
	},
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	let filter = init_tracing();
	let cfg = HarnessConfig::discover(cli.config.as_deref());
	match (&filter, &cfg) {
		(Some(handle), Ok(cfg)) => {
			if let Err(e) = handle.reload(EnvFilter::new(&cfg.log_level)) { warn!("log level {} not applied: {e}", cfg.log_level); }
		}
		(_, Err(e)) => debug!("no usable configuration: {e}"),
		_ => {}
	}
	match cli.command {
		None => run(cfg.context("loading configuration")?, cli.run).await,
		Some(Command::Run(args)) => run(cfg.context("loading configuration")?, args).await,
		Some(Command::Extract { log }) => {
			let raw = tokio::fs::read_to_string(&log).await.with_context(|| format!("reading {}", log.display()))?;
			let obs = TimingExtractor::default().extract(&raw);
			debug!(queries = obs.queries.len(), "extracted {}", log.display());
			println!("{}", serde_json::to_string_pretty(&obs)?);
			Ok(())
		}
		Some(Command::Config { action }) => match action {
			ConfigCmd::Show => {
				print!("{}", cfg.context("loading configuration")?.to_toml_string()?);
				Ok(())
			}
			ConfigCmd::WriteTemplate { path, force } => {
				let path = path.unwrap_or_else(|| PathBuf::from(mpcbench_core::config::DEFAULT_CONFIG_FILE));
				if path.exists() && !force {
					eprintln!("refusing to overwrite existing file: {} (use --force)", path.display());
					std::process::exit(2);
				}
				tokio::fs::write(&path, TEMPLATE_MPCBENCH_TOML).await.with_context(|| format!("writing {}", path.display()))?;
				eprintln!("wrote {}", path.display());
				Ok(())
			}
		},
	}
}

/// Install the stderr subscriber. `RUST_LOG` pins the filter; otherwise it starts at `info`
/// and the returned handle lets the configured level replace it.
fn init_tracing() -> Option<reload::Handle<EnvFilter, Registry>> {
	let from_env = EnvFilter::try_from_default_env().ok();
	let pinned = from_env.is_some();
	let (filter, handle) = reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new("info")));
	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(false))
		.init();
	(!pinned).then_some(handle)
}

async fn run(mut cfg: HarnessConfig, args: RunArgs) -> anyhow::Result<()> {
	if let Some(dir) = args.work_dir { cfg.work_dir = dir; }
	if let Some(dir) = args.out_dir { cfg.output_dir = dir; }
	debug!(work_dir = %cfg.work_dir.display(), out_dir = %cfg.output_path().display(), "starting run");

	let axes = if args.axes.is_empty() { Axis::ALL.to_vec() } else { args.axes };
	let plan = sweep::plan(&cfg, &axes);

	println!("{}", style("=".repeat(60)).dim());
	println!("{}", style("MPC Protocol Benchmark").bold().cyan());
	println!("{}", style("=".repeat(60)).dim());
	if args.dry_run {
		println!("{}", style("Dry run: synthetic timings, nothing is built or executed").yellow());
	}
	println!("Sweep parameters:");
	for (axis, values) in &plan {
		println!("  {} ({axis}): {values:?}", axis.noun().to_ascii_lowercase());
	}

	if args.yes {
		println!("\nProceeding automatically (--yes flag provided)...");
	} else if !confirm()? {
		println!("Cancelled.");
		return Ok(());
	}

	let out_dir = cfg.output_path();
	let sweeps = if args.dry_run {
		SweepOrchestrator::synthetic().with_defaults(cfg.defaults).run_plan(&plan).await?
	} else {
		let constants = ConstantsFile::open(cfg.constants_path())
			.with_context(|| format!("constants header in {}", cfg.work_dir.display()))?;
		let runner = ProcessRunner::new(cfg.runner.clone());
		SweepOrchestrator::live(&constants, &runner, &cfg.work_dir)
			.with_defaults(cfg.defaults)
			.with_pause(cfg.pause())
			.run_plan(&plan)
			.await?
	};

	println!("\nSaving charts to {}", out_dir.display());
	let written = render_report(&SvgRenderer::default(), &sweeps, &out_dir)?;
	for path in &written {
		println!("  {} {}", style("saved").green(), path.display());
	}
	println!();
	summary::print(&sweeps);
	Ok(())
}

fn confirm() -> anyhow::Result<bool> {
	print!("\nProceed with all benchmarks? This will run multiple full protocol runs and may take a long time. (y/n): ");
	std::io::stdout().flush()?;
	let mut line = String::new();
	std::io::stdin().lock().read_line(&mut line)?;
	Ok(line.trim().eq_ignore_ascii_case("y"))
}

const TEMPLATE_MPCBENCH_TOML: &str = r#"# mpcbench configuration (template)

log_level = "info"
# Protocol checkout: every external command runs here
work_dir = "."
# Relative to work_dir
constants_file = "constants.hpp"
# Relative to work_dir unless absolute
output_dir = "A4"
# Pause between live runs
pause_ms = 1000
# Points per sweep axis
samples = 5

# Values held for the dimensions a sweep does not vary
[defaults]
m = 10
n = 20
k = 3
q = 10

# Inclusive [lo, hi] sample ranges
[ranges]
q = [5, 40]
m = [1, 50]
n = [1, 50]

[runner]
compiler = "g++"
std = "c++20"
generator_source = "gen_queries.cpp"
generator_bin = "gen_queries"
data_dir = "data"
# Or ["docker", "compose"]
compose = ["docker-compose"]
docker = "docker"
containers = ["p2", "p1", "p0"]
"#;
