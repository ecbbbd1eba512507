use std::sync::Arc;

use crate::stats::{NGramStatistics, WordId};

/// Prior used when the corpus has no occurrences at all (about one word in
/// twenty ends a sentence).
pub const EMPTY_CORPUS_PRIOR: f64 = 0.05;

/// Probability returned for sentence lengths absent from the hazard table.
///
/// Rare lengths are far more often mid-sentence positions than endings.
pub const UNKNOWN_LENGTH_PROBABILITY: f64 = 0.01;

/// Hierarchical n-gram estimator of end-of-sentence probabilities.
///
/// Every estimate uses Laplace smoothing `(end + 1) / (total + 2)` and the
/// backoff order is fixed: trigram → bigram → unigram → corpus prior.
/// All methods are pure lookups over the shared read-only statistics.
#[derive(Debug, Clone)]
pub struct BackoffEstimator {
	stats: Arc<NGramStatistics>,
	global_prior: f64,
}

impl BackoffEstimator {
	/// Creates an estimator and computes the corpus-wide EOS prior
	/// `Σ end / Σ total` over all unigrams.
	pub fn new(stats: Arc<NGramStatistics>) -> Self {
		let (total, end) = stats
			.unigrams()
			.fold((0u64, 0u64), |(total, end), (_, counts)| (total + counts.total, end + counts.end));

		let global_prior = if total > 0 {
			end as f64 / total as f64
		} else {
			EMPTY_CORPUS_PRIOR
		};

		Self { stats, global_prior }
	}

	/// Empirical probability that any token ends a sentence.
	pub fn global_prior(&self) -> f64 {
		self.global_prior
	}

	pub fn statistics(&self) -> &NGramStatistics {
		&self.stats
	}

	/// P(EOS | last word). Unknown words get the corpus prior.
	pub fn p_eos_given_word(&self, w3: WordId) -> f64 {
		match self.stats.unigram(w3) {
			Some(counts) => counts.laplace(),
			None => self.global_prior,
		}
	}

	/// P(EOS | last one to three words).
	///
	/// - Trigram `(w1, w2, w3)` when all three are present and observed
	/// - Otherwise bigram `(w2, w3)`
	/// - Otherwise `p_eos_given_word(w3)`
	/// - Otherwise (no `w3`) the corpus prior
	pub fn p_eos_given_context(&self, w1: Option<WordId>, w2: Option<WordId>, w3: Option<WordId>) -> f64 {
		let Some(w3) = w3 else {
			return self.global_prior;
		};

		if let (Some(w1), Some(w2)) = (w1, w2) {
			if let Some(counts) = self.stats.trigram(w1, w2, w3) {
				return counts.laplace();
			}
		}

		if let Some(w2) = w2 {
			if let Some(counts) = self.stats.bigram(w2, w3) {
				return counts.laplace();
			}
		}

		self.p_eos_given_word(w3)
	}

	/// P(EOS | sentence length), straight from the hazard table.
	pub fn p_eos_given_length(&self, length: usize) -> f64 {
		self.stats.length_hazard().get(length).unwrap_or(UNKNOWN_LENGTH_PROBABILITY)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;
	use crate::stats::{EosCounts, LengthHazard};

	fn estimator() -> BackoffEstimator {
		let unigrams = HashMap::from([(1, EosCounts::new(10, 0)), (2, EosCounts::new(10, 5)), (3, EosCounts::new(20, 15))]);
		let bigrams = HashMap::from([((2, 3), EosCounts::new(8, 6))]);
		let trigrams = HashMap::from([((1, 2), HashMap::from([(3, EosCounts::new(2, 2))]))]);
		let hazard = LengthHazard::new(HashMap::from([(3, 0.4)])).unwrap();
		let stats = NGramStatistics::new(unigrams, bigrams, trigrams, hazard).unwrap();
		BackoffEstimator::new(Arc::new(stats))
	}

	#[test]
	fn global_prior_is_end_over_total() {
		assert_eq!(estimator().global_prior(), 20.0 / 40.0);
	}

	#[test]
	fn empty_corpus_prior_is_five_percent() {
		let estimator = BackoffEstimator::new(Arc::new(NGramStatistics::default()));
		assert_eq!(estimator.global_prior(), EMPTY_CORPUS_PRIOR);
		assert_eq!(estimator.p_eos_given_word(42), EMPTY_CORPUS_PRIOR);
	}

	#[test]
	fn word_probability_is_laplace_smoothed() {
		let estimator = estimator();
		assert_eq!(estimator.p_eos_given_word(1), 1.0 / 12.0);
		assert_eq!(estimator.p_eos_given_word(2), 6.0 / 12.0);
		assert_eq!(estimator.p_eos_given_word(99), estimator.global_prior());
	}

	#[test]
	fn trigram_wins_over_bigram_and_unigram() {
		let estimator = estimator();
		assert_eq!(estimator.p_eos_given_context(Some(1), Some(2), Some(3)), 3.0 / 4.0);
	}

	#[test]
	fn backs_off_to_bigram_then_unigram_then_prior() {
		let estimator = estimator();
		// Unknown trigram context falls back to the (2, 3) bigram.
		assert_eq!(estimator.p_eos_given_context(Some(3), Some(2), Some(3)), 7.0 / 10.0);
		// Missing w1 skips the trigram level entirely.
		assert_eq!(estimator.p_eos_given_context(None, Some(2), Some(3)), 7.0 / 10.0);
		// No bigram (1, 3): unigram of w3.
		assert_eq!(estimator.p_eos_given_context(None, Some(1), Some(3)), 16.0 / 22.0);
		assert_eq!(estimator.p_eos_given_context(None, None, Some(3)), 16.0 / 22.0);
		// Unknown w3 and missing w3 both end at the prior.
		assert_eq!(estimator.p_eos_given_context(Some(1), Some(2), Some(77)), estimator.global_prior());
		assert_eq!(estimator.p_eos_given_context(Some(1), Some(2), None), estimator.global_prior());
	}

	#[test]
	fn length_uses_table_then_fixed_fallback() {
		let estimator = estimator();
		assert_eq!(estimator.p_eos_given_length(3), 0.4);
		assert_eq!(estimator.p_eos_given_length(4), UNKNOWN_LENGTH_PROBABILITY);
	}
}
