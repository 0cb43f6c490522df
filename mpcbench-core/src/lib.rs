#![forbid(unsafe_code)]
//! Measurement pipeline for sweeping an external MPC protocol over its build parameters.
//!
//! [`constants::ConstantsFile`] rewrites the protocol's parameters, a
//! [`runner::ExternalRunner`] builds and runs it, [`extract::TimingExtractor`] recovers
//! timings from the console output, [`sweep::SweepOrchestrator`] drives one axis at a time
//! and [`aggregate`] / [`chart`] turn the collected points into charts.

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod runner;
pub mod sweep;
pub mod types;

pub use aggregate::{flatten_for_comparison, group_by_fixed_dims, Comparison, GroupedSeries, SeriesPoint};
pub use chart::{render_report, ChartRenderer, SvgRenderer};
pub use config::HarnessConfig;
pub use constants::ConstantsFile;
pub use error::{Error, Result};
pub use extract::{AverageStrategy, TimingExtractor};
pub use runner::{ExternalRunner, ProcessRunner, RunOutput};
pub use sweep::{linspace, AxisSweep, Mode, SweepOrchestrator, SweepResult};
pub use types::{Axis, FixedDims, Metric, QueryTiming, SweepParams, TimingObservation, DEFAULT_PARAMS};
