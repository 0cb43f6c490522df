//! Recover timing observations from the protocol's unstructured console output.

use crate::error::Result;
use crate::types::{QueryTiming, TimingObservation};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Decimal with optional exponent, as printed by default C++ stream formatting.
const FLOAT: &str = r"([0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)";

static QUERY_LINE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(&format!(r"Query (\d+): user={FLOAT}s, item={FLOAT}s")).expect("static query pattern")
});

/// A named way of finding one scalar average in the log.
#[derive(Debug, Clone)]
pub struct AverageStrategy {
	pub name: &'static str,
	pattern: Regex,
}

impl AverageStrategy {
	/// `pattern` must expose the value as capture group 1.
	pub fn new(name: &'static str, pattern: &str) -> Result<Self> {
		Ok(Self { name, pattern: Regex::new(pattern)? })
	}

	/// `<prefix><float>` with the prefix matched literally.
	pub fn prefixed(name: &'static str, prefix: &str) -> Self {
		let pattern = Regex::new(&format!("{}{FLOAT}", regex::escape(prefix))).expect("escaped prefix is a valid pattern");
		Self { name, pattern }
	}

	fn find(&self, text: &str) -> Option<f64> {
		self.pattern
			.captures_iter(text)
			.find_map(|c| c.get(1).and_then(|m| m.as_str().parse::<f64>().ok()))
	}
}

/// Parses `Query <i>: user=<f>s, item=<f>s` lines plus optional averages.
///
/// Averages are looked up through ordered strategy lists; the first strategy that matches
/// wins. Extraction never fails: text without any signal gives an empty observation.
#[derive(Debug, Clone)]
pub struct TimingExtractor {
	user: Vec<AverageStrategy>,
	item: Vec<AverageStrategy>,
}

impl Default for TimingExtractor {
	fn default() -> Self {
		Self {
			user: vec![
				AverageStrategy::prefixed("descriptive", "Average user profile update time: "),
				AverageStrategy::prefixed("compact", "user_update_time: "),
			],
			item: vec![
				AverageStrategy::prefixed("descriptive", "Average item profile update time: "),
				AverageStrategy::prefixed("compact", "item_update_time: "),
			],
		}
	}
}

impl TimingExtractor {
	pub fn new() -> Self { Self::default() }

	/// Append a user-side strategy with the lowest priority.
	pub fn with_user_strategy(mut self, s: AverageStrategy) -> Self { self.user.push(s); self }

	/// Append an item-side strategy with the lowest priority.
	pub fn with_item_strategy(mut self, s: AverageStrategy) -> Self { self.item.push(s); self }

	pub fn extract(&self, raw: &str) -> TimingObservation {
		let queries: Vec<QueryTiming> = QUERY_LINE
			.captures_iter(raw)
			.filter_map(|c| {
				Some(QueryTiming {
					index: c[1].parse().ok()?,
					user: c[2].parse().ok()?,
					item: c[3].parse().ok()?,
				})
			})
			.collect();
		let avg_user_time = first_match(&self.user, raw, "user");
		let avg_item_time = first_match(&self.item, raw, "item");
		TimingObservation { queries, avg_user_time, avg_item_time }
	}
}

fn first_match(strategies: &[AverageStrategy], raw: &str, side: &str) -> Option<f64> {
	strategies.iter().find_map(|s| {
		let v = s.find(raw)?;
		debug!(side, strategy = s.name, value = v, "average found");
		Some(v)
	})
}
