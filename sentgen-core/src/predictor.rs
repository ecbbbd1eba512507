use std::sync::Arc;

use log::debug;

use crate::classifier::{EosClassifier, Features};
use crate::estimator::BackoffEstimator;
use crate::stats::WordId;

/// Probabilities are clamped to `[LOGIT_EPSILON, 1 - LOGIT_EPSILON]` before the logit.
const LOGIT_EPSILON: f64 = 1e-9;

/// Log-odds `ln(p / (1 - p))` with `p` clamped away from 0 and 1.
///
/// Always finite; inverse of `classifier::sigmoid` on `(0, 1)`.
pub fn safe_logit(p: f64) -> f64 {
	let p = p.clamp(LOGIT_EPSILON, 1.0 - LOGIT_EPSILON);
	(p / (1.0 - p)).ln()
}

/// Classifier features for the sequence ending at its last id.
///
/// - `x1`: logit of P(EOS | last up to three ids)
/// - `x2`: logit of P(EOS | last id)
/// - `x3`: logit of P(EOS | sequence length)
///
/// Returns `None` for an empty sequence.
pub fn eos_features(estimator: &BackoffEstimator, ids: &[WordId]) -> Option<Features> {
	let (&w3, head) = ids.split_last()?;
	let w2 = head.last().copied();
	let w1 = head.len().checked_sub(2).map(|i| head[i]);

	let p_context = estimator.p_eos_given_context(w1, w2, Some(w3));
	let p_word = estimator.p_eos_given_word(w3);
	let p_length = estimator.p_eos_given_length(ids.len());

	Some(Features::new(safe_logit(p_context), safe_logit(p_word), safe_logit(p_length)))
}

/// Combines the backoff estimator and the classifier into one calibrated
/// end-of-sentence probability for a (possibly partial) token sequence.
///
/// Stateless given its two collaborators; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct EosPredictor {
	estimator: Arc<BackoffEstimator>,
	classifier: Arc<EosClassifier>,
}

impl EosPredictor {
	pub fn new(estimator: Arc<BackoffEstimator>, classifier: Arc<EosClassifier>) -> Self {
		Self { estimator, classifier }
	}

	pub fn estimator(&self) -> &BackoffEstimator {
		&self.estimator
	}

	pub fn classifier(&self) -> &EosClassifier {
		&self.classifier
	}

	/// Classifier features for the sequence ending at its last id.
	///
	/// See `eos_features`.
	pub fn features(&self, ids: &[WordId]) -> Option<Features> {
		eos_features(&self.estimator, ids)
	}

	/// Probability that `ids` forms a complete sentence.
	///
	/// An empty sequence returns `0.0` without consulting the estimator.
	pub fn predict_eos_probability(&self, ids: &[WordId]) -> f64 {
		let Some(features) = self.features(ids) else {
			return 0.0;
		};
		let probability = self.classifier.predict_features(&features);
		debug!("EOS prediction: len={} features={:?} -> {:.4}", ids.len(), features, probability);
		probability
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use proptest::prelude::*;

	use super::*;
	use crate::classifier::{Hyperparameters, ModelParameters, sigmoid};
	use crate::stats::{EosCounts, LengthHazard, NGramStatistics};

	fn predictor(params: ModelParameters) -> EosPredictor {
		let unigrams = HashMap::from([(0, EosCounts::new(10, 1)), (1, EosCounts::new(10, 9))]);
		let bigrams = HashMap::from([((0, 1), EosCounts::new(4, 4))]);
		let trigrams = HashMap::from([((1, 0), HashMap::from([(1, EosCounts::new(6, 0))]))]);
		let hazard = LengthHazard::new(HashMap::from([(2, 0.5)])).unwrap();
		let stats = NGramStatistics::new(unigrams, bigrams, trigrams, hazard).unwrap();
		let estimator = BackoffEstimator::new(Arc::new(stats));
		let classifier = EosClassifier::with_parameters(params, Hyperparameters::default());
		EosPredictor::new(Arc::new(estimator), Arc::new(classifier))
	}

	#[test]
	fn empty_sequence_is_never_an_ending() {
		let predictor = predictor(ModelParameters { b: 100.0, ..ModelParameters::default() });
		assert_eq!(predictor.predict_eos_probability(&[]), 0.0);
		assert!(predictor.features(&[]).is_none());
	}

	#[test]
	fn features_use_the_right_window() {
		let predictor = predictor(ModelParameters::default());

		// Single token: context falls back to the unigram.
		let single = predictor.features(&[1]).unwrap();
		assert_eq!(single.x1, safe_logit(10.0 / 12.0));
		assert_eq!(single.x2, safe_logit(10.0 / 12.0));
		assert_eq!(single.x3, safe_logit(0.01));

		// Two tokens: bigram (0, 1), hazard for length 2.
		let pair = predictor.features(&[0, 1]).unwrap();
		assert_eq!(pair.x1, safe_logit(5.0 / 6.0));
		assert_eq!(pair.x3, safe_logit(0.5));

		// Three tokens: trigram (1, 0, 1) wins over everything else.
		let triple = predictor.features(&[1, 0, 1]).unwrap();
		assert_eq!(triple.x1, safe_logit(1.0 / 8.0));
		assert_eq!(triple.x2, safe_logit(10.0 / 12.0));
	}

	#[test]
	fn follows_the_classifier_weights() {
		let leaning_on_word = predictor(ModelParameters { b: 0.0, w1: 0.0, w2: 1.0, w3: 0.0 });
		assert!(leaning_on_word.predict_eos_probability(&[1]) > 0.5);
		assert!(leaning_on_word.predict_eos_probability(&[0]) < 0.5);
	}

	#[test]
	fn logit_never_overflows_at_the_edges() {
		assert!(safe_logit(0.0).is_finite());
		assert!(safe_logit(1.0).is_finite());
		assert!(safe_logit(-3.0).is_finite());
		assert_eq!(safe_logit(0.5), 0.0);
	}

	proptest! {
		#[test]
		fn sigmoid_inverts_safe_logit(p in 1e-6f64..(1.0 - 1e-6)) {
			prop_assert!((sigmoid(safe_logit(p)) - p).abs() < 1e-6);
		}

		#[test]
		fn laplace_word_probability_stays_open(total in 0u64..1_000_000, ratio in 0.0f64..=1.0) {
			let end = (total as f64 * ratio) as u64;
			let p = EosCounts::new(total, end.min(total)).laplace();
			prop_assert!(p > 0.0 && p < 1.0);
		}
	}
}
