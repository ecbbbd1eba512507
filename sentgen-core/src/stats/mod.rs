//! Read-only n-gram tables consumed by the estimator and the generators.
//!
//! - Occurrence / end-of-sentence counters (`EosCounts`)
//! - Unigram, bigram and trigram statistics (`NGramStatistics`)
//! - Length hazard table (`LengthHazard`)
//! - Follower lists and start candidates (`followers`)
//! - Word ↔ id mapping (`Vocabulary`)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sentence length → hazard probability.
pub mod hazard;

/// Ranked follower lists and sentence start candidates.
pub mod followers;

/// Bidirectional word ↔ id mapping.
pub mod vocabulary;

pub use followers::{Follower, FollowerList, FollowerTables, StartCandidate, StartCandidates};
pub use hazard::LengthHazard;
pub use vocabulary::Vocabulary;

/// Dense identifier of a normalized (lowercased) token.
///
/// Ids are assigned by the import step; nothing in the generation or
/// estimation path allocates new ones.
pub type WordId = u32;

/// Errors raised while assembling a table set.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
	#[error("inconsistent counts for {key}: end count {end} exceeds total {total}")]
	InconsistentCounts { key: String, total: u64, end: u64 },

	#[error("invalid hazard {value} for length {length}")]
	InvalidHazard { length: usize, value: f64 },
}

/// Occurrence counters for a unigram, bigram or trigram.
///
/// # Invariants
/// - `end <= total` (checked by `NGramStatistics::new`)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EosCounts {
	/// Number of times the n-gram was observed.
	pub total: u64,
	/// Number of those observations where the last token ended the sentence.
	pub end: u64,
}

impl EosCounts {
	pub fn new(total: u64, end: u64) -> Self {
		Self { total, end }
	}

	/// Laplace-smoothed end-of-sentence rate: `(end + 1) / (total + 2)`.
	///
	/// Always strictly inside `(0, 1)`, even for `end == 0` or `end == total`.
	pub fn laplace(&self) -> f64 {
		(self.end as f64 + 1.0) / (self.total as f64 + 2.0)
	}

	/// Records one observation.
	pub fn observe(&mut self, is_end: bool) {
		self.total += 1;
		if is_end {
			self.end += 1;
		}
	}

	/// Adds the counters of `other` into `self`.
	pub fn absorb(&mut self, other: &Self) {
		self.total += other.total;
		self.end += other.end;
	}

	fn is_consistent(&self) -> bool {
		self.end <= self.total
	}
}

/// Unigram, bigram and trigram end-of-sentence statistics plus the
/// length hazard table.
///
/// Built once by the import step and then shared read-only
/// (usually behind an `Arc`).
///
/// # Invariants
/// - Every counter satisfies `end <= total`
/// - Trigrams are grouped by their `(w1, w2)` context
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct NGramStatistics {
	unigrams: HashMap<WordId, EosCounts>,
	bigrams: HashMap<(WordId, WordId), EosCounts>,
	trigrams: HashMap<(WordId, WordId), HashMap<WordId, EosCounts>>,
	length_hazard: LengthHazard,
}

impl NGramStatistics {
	/// Assembles a table set, rejecting counters where `end > total`.
	///
	/// # Errors
	/// Returns `StatsError::InconsistentCounts` naming the first offending key.
	pub fn new(
		unigrams: HashMap<WordId, EosCounts>,
		bigrams: HashMap<(WordId, WordId), EosCounts>,
		trigrams: HashMap<(WordId, WordId), HashMap<WordId, EosCounts>>,
		length_hazard: LengthHazard,
	) -> Result<Self, StatsError> {
		for (id, counts) in &unigrams {
			check(counts, || format!("unigram {id}"))?;
		}
		for ((w1, w2), counts) in &bigrams {
			check(counts, || format!("bigram ({w1}, {w2})"))?;
		}
		for ((w1, w2), inner) in &trigrams {
			for (w3, counts) in inner {
				check(counts, || format!("trigram ({w1}, {w2}, {w3})"))?;
			}
		}

		Ok(Self { unigrams, bigrams, trigrams, length_hazard })
	}

	pub fn unigram(&self, w: WordId) -> Option<&EosCounts> {
		self.unigrams.get(&w)
	}

	pub fn bigram(&self, w1: WordId, w2: WordId) -> Option<&EosCounts> {
		self.bigrams.get(&(w1, w2))
	}

	/// Looks up the trigram `(w1, w2, w3)` through its `(w1, w2)` context group.
	pub fn trigram(&self, w1: WordId, w2: WordId, w3: WordId) -> Option<&EosCounts> {
		self.trigrams.get(&(w1, w2))?.get(&w3)
	}

	pub fn length_hazard(&self) -> &LengthHazard {
		&self.length_hazard
	}

	/// Iterates over every unigram counter.
	pub fn unigrams(&self) -> impl Iterator<Item = (WordId, &EosCounts)> {
		self.unigrams.iter().map(|(id, counts)| (*id, counts))
	}

	pub fn unigram_count(&self) -> usize {
		self.unigrams.len()
	}

	pub fn bigram_count(&self) -> usize {
		self.bigrams.len()
	}

	/// Number of distinct `(w1, w2)` trigram contexts.
	pub fn trigram_context_count(&self) -> usize {
		self.trigrams.len()
	}
}

fn check(counts: &EosCounts, key: impl FnOnce() -> String) -> Result<(), StatsError> {
	if counts.is_consistent() {
		Ok(())
	} else {
		Err(StatsError::InconsistentCounts { key: key(), total: counts.total, end: counts.end })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn laplace_is_strictly_inside_unit_interval() {
		assert_eq!(EosCounts::new(0, 0).laplace(), 0.5);
		assert!(EosCounts::new(10, 0).laplace() > 0.0);
		assert!(EosCounts::new(10, 10).laplace() < 1.0);
	}

	#[test]
	fn observe_and_absorb_accumulate() {
		let mut a = EosCounts::default();
		a.observe(false);
		a.observe(true);
		let mut b = EosCounts::new(3, 1);
		b.absorb(&a);
		assert_eq!(b, EosCounts::new(5, 2));
	}

	#[test]
	fn rejects_end_count_above_total() {
		let mut bigrams = HashMap::new();
		bigrams.insert((1, 2), EosCounts::new(1, 2));
		let err = NGramStatistics::new(HashMap::new(), bigrams, HashMap::new(), LengthHazard::default())
			.unwrap_err();
		assert!(matches!(err, StatsError::InconsistentCounts { total: 1, end: 2, .. }));
	}

	#[test]
	fn trigram_lookup_goes_through_context_group() {
		let mut inner = HashMap::new();
		inner.insert(3, EosCounts::new(4, 1));
		let mut trigrams = HashMap::new();
		trigrams.insert((1, 2), inner);
		let stats = NGramStatistics::new(HashMap::new(), HashMap::new(), trigrams, LengthHazard::default())
			.unwrap();

		assert_eq!(stats.trigram(1, 2, 3), Some(&EosCounts::new(4, 1)));
		assert_eq!(stats.trigram(1, 2, 4), None);
		assert_eq!(stats.trigram(2, 1, 3), None);
		assert_eq!(stats.trigram_context_count(), 1);
	}
}
