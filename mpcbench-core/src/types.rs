use serde::{Deserialize, Serialize};
use std::fmt;

/// Build-time protocol parameters: users, items, feature rank, queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepParams {
	pub m: u32,
	pub n: u32,
	pub k: u32,
	pub q: u32,
}

/// Values held for the non-varying dimensions of every sweep.
pub const DEFAULT_PARAMS: SweepParams = SweepParams::new(10, 20, 3, 10);

impl SweepParams {
	pub const fn new(m: u32, n: u32, k: u32, q: u32) -> Self { Self { m, n, k, q } }
}

impl Default for SweepParams {
	fn default() -> Self { DEFAULT_PARAMS }
}

impl fmt::Display for SweepParams {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "m={}, n={}, k={}, q={}", self.m, self.n, self.k, self.q)
	}
}

/// The single dimension varied by one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
	Q,
	M,
	N,
}

impl Axis {
	/// Sweep order used by a full run.
	pub const ALL: [Axis; 3] = [Axis::Q, Axis::M, Axis::N];

	pub fn name(self) -> &'static str {
		match self { Axis::Q => "q", Axis::M => "m", Axis::N => "n" }
	}

	pub fn noun(self) -> &'static str {
		match self { Axis::Q => "Queries", Axis::M => "Users", Axis::N => "Items" }
	}

	pub fn x_label(self) -> String { format!("Number of {} ({})", self.noun(), self.name()) }

	pub fn value_of(self, p: &SweepParams) -> u32 {
		match self { Axis::Q => p.q, Axis::M => p.m, Axis::N => p.n }
	}

	/// `base` with this axis replaced by `value`.
	pub fn substitute(self, base: SweepParams, value: u32) -> SweepParams {
		let mut p = base;
		match self {
			Axis::Q => p.q = value,
			Axis::M => p.m = value,
			Axis::N => p.n = value,
		}
		p
	}

	/// The three parameters this axis holds constant, in m, n, k, q order.
	pub fn fixed_dims(self, p: &SweepParams) -> FixedDims {
		let values = match self {
			Axis::Q => [p.m, p.n, p.k],
			Axis::M => [p.n, p.k, p.q],
			Axis::N => [p.m, p.k, p.q],
		};
		FixedDims { axis: self, values }
	}

	fn fixed_names(self) -> [&'static str; 3] {
		match self {
			Axis::Q => ["m", "n", "k"],
			Axis::M => ["n", "k", "q"],
			Axis::N => ["m", "k", "q"],
		}
	}
}

impl fmt::Display for Axis {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl std::str::FromStr for Axis {
	type Err = crate::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"q" => Ok(Axis::Q),
			"m" => Ok(Axis::M),
			"n" => Ok(Axis::N),
			other => Err(crate::Error::config(format!("unknown sweep axis: {other}"))),
		}
	}
}

/// Grouping key: the values of the three dimensions a sweep holds constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedDims {
	pub axis: Axis,
	pub values: [u32; 3],
}

impl fmt::Display for FixedDims {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let names = self.axis.fixed_names();
		write!(f, "{}={},{}={},{}={}", names[0], self.values[0], names[1], self.values[1], names[2], self.values[2])
	}
}

/// Which side of the protocol a timing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
	User,
	Item,
}

impl Metric {
	pub const ALL: [Metric; 2] = [Metric::User, Metric::Item];

	pub fn name(self) -> &'static str {
		match self { Metric::User => "user", Metric::Item => "item" }
	}

	pub fn title(self) -> &'static str {
		match self { Metric::User => "User", Metric::Item => "Item" }
	}
}

/// One `Query <i>: user=<s>s, item=<s>s` line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryTiming {
	pub index: u32,
	pub user: f64,
	pub item: f64,
}

/// Timings recovered from one protocol execution.
///
/// Per-query timings and the pre-aggregated averages are stored side by side and never
/// reconciled: a log may carry either, both, or (numerically) disagreeing values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingObservation {
	pub queries: Vec<QueryTiming>,
	pub avg_user_time: Option<f64>,
	pub avg_item_time: Option<f64>,
}

impl TimingObservation {
	/// No timing signal of any kind was found.
	pub fn is_empty(&self) -> bool {
		self.queries.is_empty() && self.avg_user_time.is_none() && self.avg_item_time.is_none()
	}

	/// Reported user average, falling back to the mean of the per-query column.
	pub fn user_time(&self) -> Option<f64> {
		self.avg_user_time.or_else(|| mean(self.queries.iter().map(|t| t.user)))
	}

	/// Reported item average, falling back to the mean of the per-query column.
	pub fn item_time(&self) -> Option<f64> {
		self.avg_item_time.or_else(|| mean(self.queries.iter().map(|t| t.item)))
	}

	pub fn time(&self, metric: Metric) -> Option<f64> {
		match metric { Metric::User => self.user_time(), Metric::Item => self.item_time() }
	}
}

fn mean(xs: impl Iterator<Item = f64>) -> Option<f64> {
	let (sum, n) = xs.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
	if n == 0 { None } else { Some(sum / n as f64) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn substitute_touches_only_the_axis() {
		let p = Axis::M.substitute(DEFAULT_PARAMS, 37);
		assert_eq!(p, SweepParams::new(37, 20, 3, 10));
		assert_eq!(Axis::M.value_of(&p), 37);
		assert_eq!(Axis::M.fixed_dims(&p).values, [20, 3, 10]);
		assert_eq!(Axis::M.fixed_dims(&p).to_string(), "n=20,k=3,q=10");
	}

	#[test]
	fn axis_parse() {
		assert_eq!("Q".parse::<Axis>().unwrap(), Axis::Q);
		assert!("k".parse::<Axis>().is_err());
	}

	#[test]
	fn averages_fall_back_to_query_means() {
		let obs = TimingObservation {
			queries: vec![
				QueryTiming { index: 0, user: 1.0, item: 4.0 },
				QueryTiming { index: 1, user: 3.0, item: 6.0 },
			],
			avg_user_time: Some(9.0),
			avg_item_time: None,
		};
		assert_eq!(obs.user_time(), Some(9.0));
		assert_eq!(obs.item_time(), Some(5.0));
		assert!(TimingObservation::default().user_time().is_none());
		assert!(TimingObservation::default().is_empty());
	}
}
