use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::StatsError;

/// Empirical hazard of a sentence ending at a given length.
///
/// For each observed length `L`, the hazard is
/// `frequency(L) / tail_count(L)` where `tail_count(L)` is the number of
/// sentences of length `>= L`. This is the survival-analysis hazard:
/// the probability of ending at `L` given that the sentence reached `L`.
///
/// # Invariants
/// - Keys are `>= 1`
/// - Values are in `[0, 1]`
/// - No monotonic trend is assumed
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LengthHazard {
	hazards: HashMap<usize, f64>,
}

impl LengthHazard {
	/// Wraps a precomputed hazard table.
	///
	/// # Errors
	/// Returns `StatsError::InvalidHazard` for a zero length or a value
	/// outside `[0, 1]` (NaN included).
	pub fn new(hazards: HashMap<usize, f64>) -> Result<Self, StatsError> {
		for (&length, &value) in &hazards {
			if length == 0 || !(0.0..=1.0).contains(&value) {
				return Err(StatsError::InvalidHazard { length, value });
			}
		}
		Ok(Self { hazards })
	}

	/// Computes the hazard table from a sentence length histogram.
	///
	/// Lengths with a zero frequency are skipped; length 0 is ignored.
	pub fn from_histogram(histogram: &HashMap<usize, u64>) -> Self {
		// Walk lengths from longest to shortest so the tail count is a running sum.
		let ordered: BTreeMap<usize, u64> = histogram
			.iter()
			.filter(|(length, frequency)| **length > 0 && **frequency > 0)
			.map(|(length, frequency)| (*length, *frequency))
			.collect();

		let mut hazards = HashMap::with_capacity(ordered.len());
		let mut tail_count: u64 = 0;
		for (length, frequency) in ordered.into_iter().rev() {
			tail_count += frequency;
			hazards.insert(length, frequency as f64 / tail_count as f64);
		}

		Self { hazards }
	}

	pub fn get(&self, length: usize) -> Option<f64> {
		self.hazards.get(&length).copied()
	}

	pub fn len(&self) -> usize {
		self.hazards.len()
	}

	pub fn is_empty(&self) -> bool {
		self.hazards.is_empty()
	}
}
