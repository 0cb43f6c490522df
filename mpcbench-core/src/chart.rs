//! Chart rendering behind a small trait, plus the report that turns sweeps into charts.

use crate::aggregate::{flatten_for_comparison, group_by_fixed_dims};
use crate::error::{Error, Result};
use crate::sweep::{merged, AxisSweep};
use crate::types::{Axis, Metric};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const Y_LABEL: &str = "Average Time (s)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
	Circle,
	Square,
}

/// Ordered `(x, y)` points. Non-finite `y` values are gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
	pub label: Option<String>,
	pub points: Vec<(f64, f64)>,
	pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
	pub title: String,
	pub x_label: String,
	pub y_label: String,
	pub series: Vec<Series>,
}

/// Grouped bars: one bar per `(group, label)`, groups side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
	pub title: String,
	pub y_label: String,
	pub labels: Vec<String>,
	pub groups: Vec<(String, Vec<f64>)>,
}

/// Writes a chart image to `path`.
pub trait ChartRenderer {
	fn line_chart(&self, chart: &LineChart, path: &Path) -> Result<()>;
	fn bar_chart(&self, chart: &BarChart, path: &Path) -> Result<()>;
	/// File extension of the images this renderer writes.
	fn extension(&self) -> &'static str;
}

/// SVG output through plotters.
#[derive(Debug, Clone, Copy)]
pub struct SvgRenderer {
	pub size: (u32, u32),
}

impl Default for SvgRenderer {
	fn default() -> Self { Self { size: (960, 600) } }
}

const PALETTE: [RGBColor; 6] = [BLUE, RED, GREEN, MAGENTA, CYAN, BLACK];

fn chart_err(e: impl std::fmt::Display) -> Error { Error::chart(e.to_string()) }

fn padded(lo: f64, hi: f64, frac: f64) -> (f64, f64) {
	if (hi - lo).abs() < f64::EPSILON {
		let pad = if lo == 0.0 { 1.0 } else { lo.abs() * frac.max(0.1) };
		return (lo - pad, hi + pad);
	}
	let pad = (hi - lo) * frac;
	(lo - pad, hi + pad)
}

fn finite_bounds(vals: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
	vals.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
		None => Some((v, v)),
		Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
	})
}

/// Maximal runs of consecutive finite points.
fn finite_runs(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
	points
		.split(|(x, y)| !x.is_finite() || !y.is_finite())
		.filter(|run| !run.is_empty())
		.map(<[_]>::to_vec)
		.collect()
}

impl ChartRenderer for SvgRenderer {
	fn line_chart(&self, chart: &LineChart, path: &Path) -> Result<()> {
		let root = SVGBackend::new(path, self.size).into_drawing_area();
		root.fill(&WHITE).map_err(chart_err)?;
		let all = || chart.series.iter().flat_map(|s| s.points.iter()).filter(|(_, y)| y.is_finite());
		let (x0, x1) = finite_bounds(all().map(|p| p.0)).map_or((0.0, 1.0), |(lo, hi)| padded(lo, hi, 0.05));
		let (y0, y1) = finite_bounds(all().map(|p| p.1)).map_or((0.0, 1.0), |(lo, hi)| padded(lo, hi, 0.1));

		let mut ctx = ChartBuilder::on(&root)
			.caption(chart.title.as_str(), ("sans-serif", 22))
			.margin(15)
			.x_label_area_size(45)
			.y_label_area_size(80)
			.build_cartesian_2d(x0..x1, y0..y1)
			.map_err(chart_err)?;
		ctx.configure_mesh()
			.x_desc(chart.x_label.as_str())
			.y_desc(chart.y_label.as_str())
			.y_label_formatter(&|v| format!("{v:.2e}"))
			.light_line_style(BLACK.mix(0.05))
			.draw()
			.map_err(chart_err)?;

		for (i, s) in chart.series.iter().enumerate() {
			let color = PALETTE[i % PALETTE.len()];
			let line = color.stroke_width(2);
			for run in finite_runs(&s.points) {
				ctx.draw_series(LineSeries::new(run, line)).map_err(chart_err)?;
			}
			let pts = s.points.iter().copied().filter(|(x, y)| x.is_finite() && y.is_finite());
			let anno = match s.marker {
				Marker::Circle => ctx.draw_series(pts.map(|c| Circle::new(c, 4, color.filled()))),
				Marker::Square => ctx.draw_series(pts.map(|c| EmptyElement::at(c) + Rectangle::new([(-4, -4), (4, 4)], color.filled()))),
			}
			.map_err(chart_err)?;
			if let Some(label) = &s.label {
				anno.label(label.as_str()).legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line));
			}
		}
		if chart.series.iter().any(|s| s.label.is_some()) {
			ctx.configure_series_labels()
				.background_style(WHITE.mix(0.8))
				.border_style(BLACK)
				.draw()
				.map_err(chart_err)?;
		}
		root.present().map_err(chart_err)?;
		Ok(())
	}

	fn bar_chart(&self, chart: &BarChart, path: &Path) -> Result<()> {
		let root = SVGBackend::new(path, self.size).into_drawing_area();
		root.fill(&WHITE).map_err(chart_err)?;
		let n = chart.labels.len().max(1) as u32;
		let y1 = finite_bounds(chart.groups.iter().flat_map(|(_, v)| v.iter().copied()))
			.map_or(1.0, |(_, hi)| if hi > 0.0 { hi * 1.1 } else { 1.0 });

		let labels = &chart.labels;
		let mut ctx = ChartBuilder::on(&root)
			.caption(chart.title.as_str(), ("sans-serif", 22))
			.margin(15)
			.x_label_area_size(60)
			.y_label_area_size(80)
			.build_cartesian_2d((0u32..n).into_segmented(), 0.0..y1)
			.map_err(chart_err)?;
		ctx.configure_mesh()
			.disable_x_mesh()
			.x_labels(labels.len().max(1))
			.x_label_formatter(&|v| match v {
				SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
				_ => String::new(),
			})
			.x_label_style(("sans-serif", 10))
			.y_desc(chart.y_label.as_str())
			.y_label_formatter(&|v| format!("{v:.2e}"))
			.draw()
			.map_err(chart_err)?;

		let groups = chart.groups.len().max(1) as f64;
		for (g, (name, values)) in chart.groups.iter().enumerate() {
			let color = PALETTE[g % PALETTE.len()];
			let style = color.mix(0.8).filled();
			// Each label's segment is split evenly between the groups, in pixels.
			let anno = ctx
				.draw_series(values.iter().enumerate().filter(|(_, v)| v.is_finite()).map(|(i, &v)| {
					let i = i as u32;
					let mut bar = Rectangle::new([(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)], style);
					let seg = (self.size.0 as f64 - 110.0) / f64::from(n + 1);
					let w = seg / groups;
					let left = (w * g as f64 + 2.0) as u32;
					let right = (seg - w * (g as f64 + 1.0) + 2.0).max(0.0) as u32;
					bar.set_margin(0, 0, left, right);
					bar
				}))
				.map_err(chart_err)?;
			anno.label(name.as_str()).legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
		}
		ctx.configure_series_labels()
			.background_style(WHITE.mix(0.8))
			.border_style(BLACK)
			.draw()
			.map_err(chart_err)?;
		root.present().map_err(chart_err)?;
		Ok(())
	}

	fn extension(&self) -> &'static str { "svg" }
}

/// Per-(axis, metric) chart of one sweep, `NaN` kept in place for missing points.
pub fn axis_chart(sweep: &AxisSweep, metric: Metric) -> LineChart {
	let points = sweep.values.iter().zip(sweep.times(metric)).map(|(&x, &y)| (f64::from(x), y)).collect();
	LineChart {
		title: format!("{} Update Time vs Number of {}", metric.title(), sweep.axis.noun()),
		x_label: sweep.axis.x_label(),
		y_label: Y_LABEL.into(),
		series: vec![Series { label: None, points, marker: Marker::Circle }],
	}
}

pub fn axis_chart_name(axis: Axis, metric: Metric) -> String { format!("{}_vs_{}_update", axis.name(), metric.name()) }

/// Multi-series chart of every group with a trend along `axis`. `None` when no group qualifies.
pub fn grouped_chart(sweeps: &[AxisSweep], axis: Axis) -> Option<LineChart> {
	let grouped = group_by_fixed_dims(&merged(sweeps), axis);
	let mut series = Vec::new();
	for (key, pts) in grouped.plottable() {
		series.push(Series {
			label: Some(format!("User ({key})")),
			points: pts.iter().map(|p| (f64::from(p.x), p.user)).collect(),
			marker: Marker::Circle,
		});
		series.push(Series {
			label: Some(format!("Item ({key})")),
			points: pts.iter().map(|p| (f64::from(p.x), p.item)).collect(),
			marker: Marker::Square,
		});
	}
	if series.is_empty() { return None; }
	Some(LineChart {
		title: format!("Time vs Number of {}", axis.noun()),
		x_label: axis.x_label(),
		y_label: Y_LABEL.into(),
		series,
	})
}

pub fn grouped_chart_name(axis: Axis) -> String { format!("time_vs_{}", axis.noun().to_ascii_lowercase()) }

pub const COMPARISON_CHART_NAME: &str = "user_vs_item_comparison";

/// User vs item bars over every collected point. `None` when nothing was collected.
pub fn comparison_chart(sweeps: &[AxisSweep]) -> Option<BarChart> {
	let c = flatten_for_comparison(&merged(sweeps));
	if c.is_empty() { return None; }
	Some(BarChart {
		title: "User vs Item Update Time Comparison".into(),
		y_label: Y_LABEL.into(),
		labels: c.labels,
		groups: vec![("User Update".into(), c.user_times), ("Item Update".into(), c.item_times)],
	})
}

/// Render every chart the sweeps support into `out_dir`. A chart that fails to render is
/// logged and skipped; the paths written are returned.
pub fn render_report(renderer: &dyn ChartRenderer, sweeps: &[AxisSweep], out_dir: &Path) -> Result<Vec<PathBuf>> {
	std::fs::create_dir_all(out_dir)?;
	let ext = renderer.extension();
	let mut written = Vec::new();
	let mut save = |name: String, res: Result<()>, path: PathBuf| match res {
		Ok(()) => {
			info!("saved {}", path.display());
			written.push(path);
		}
		Err(e) => warn!("chart {name} not saved: {e}"),
	};

	for sweep in sweeps {
		for metric in Metric::ALL {
			let name = axis_chart_name(sweep.axis, metric);
			let path = out_dir.join(format!("{name}.{ext}"));
			save(name, renderer.line_chart(&axis_chart(sweep, metric), &path), path);
		}
	}
	for axis in sweeps.iter().map(|s| s.axis) {
		let name = grouped_chart_name(axis);
		match grouped_chart(sweeps, axis) {
			Some(chart) => {
				let path = out_dir.join(format!("{name}.{ext}"));
				save(name, renderer.line_chart(&chart, &path), path);
			}
			None => debug!("no series with a trend along {axis}; {name} skipped"),
		}
	}
	if let Some(chart) = comparison_chart(sweeps) {
		let path = out_dir.join(format!("{COMPARISON_CHART_NAME}.{ext}"));
		save(COMPARISON_CHART_NAME.to_string(), renderer.bar_chart(&chart, &path), path);
	}
	Ok(written)
}
