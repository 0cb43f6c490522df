//! Grouping of sweep results into chart series.

use crate::sweep::SweepResult;
use crate::types::{Axis, FixedDims, TimingObservation};
use std::collections::BTreeMap;

/// A single point cannot show a trend.
pub const MIN_TREND_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
	/// Value of the varying dimension.
	pub x: u32,
	pub user: f64,
	pub item: f64,
}

/// Series keyed by the dimensions held constant, each sorted ascending by `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSeries {
	pub axis: Axis,
	series: BTreeMap<FixedDims, Vec<SeriesPoint>>,
}

impl GroupedSeries {
	pub fn get(&self, key: &FixedDims) -> Option<&[SeriesPoint]> { self.series.get(key).map(Vec::as_slice) }

	pub fn iter(&self) -> impl Iterator<Item = (&FixedDims, &[SeriesPoint])> {
		self.series.iter().map(|(k, v)| (k, v.as_slice()))
	}

	/// Series with enough points to draw a line.
	pub fn plottable(&self) -> impl Iterator<Item = (&FixedDims, &[SeriesPoint])> {
		self.iter().filter(|(_, pts)| pts.len() >= MIN_TREND_POINTS)
	}

	pub fn len(&self) -> usize { self.series.len() }

	pub fn is_empty(&self) -> bool { self.series.is_empty() }
}

fn both_times(obs: &TimingObservation) -> Option<(f64, f64)> {
	Some((obs.user_time()?, obs.item_time()?))
}

/// Group every point with both user and item times by the dimensions `varying` holds fixed.
/// Missing points are left out.
pub fn group_by_fixed_dims(results: &SweepResult, varying: Axis) -> GroupedSeries {
	let mut series: BTreeMap<FixedDims, Vec<SeriesPoint>> = BTreeMap::new();
	for (params, obs) in results.iter() {
		let Some((user, item)) = obs.and_then(both_times) else { continue };
		series.entry(varying.fixed_dims(params)).or_default().push(SeriesPoint { x: varying.value_of(params), user, item });
	}
	for pts in series.values_mut() {
		pts.sort_by_key(|p| p.x);
	}
	GroupedSeries { axis: varying, series }
}

/// Side-by-side user/item comparison of every collected point, in collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
	pub labels: Vec<String>,
	pub user_times: Vec<f64>,
	pub item_times: Vec<f64>,
}

impl Comparison {
	pub fn len(&self) -> usize { self.labels.len() }

	pub fn is_empty(&self) -> bool { self.labels.is_empty() }
}

pub fn flatten_for_comparison(results: &SweepResult) -> Comparison {
	let mut out = Comparison::default();
	for (p, obs) in results.iter() {
		let Some((user, item)) = obs.and_then(both_times) else { continue };
		out.labels.push(format!("m={},n={},k={},q={}", p.m, p.n, p.k, p.q));
		out.user_times.push(user);
		out.item_times.push(item);
	}
	out
}
