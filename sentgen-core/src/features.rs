//! Training set construction for the EOS classifier.

use log::warn;

use crate::classifier::Example;
use crate::corpus::{Corpus, tokenized_sentences};
use crate::estimator::BackoffEstimator;
use crate::predictor::eos_features;
use crate::stats::WordId;

/// Turns tokenized sentences into labelled classifier examples.
///
/// Each sentence of `n` known tokens yields `n` examples, one per prefix:
/// the features are those of the prefix ending at that token, and only the
/// full sentence is labelled as an ending. The length feature is therefore
/// the prefix length, the same value seen while generating.
#[derive(Debug)]
pub struct FeatureBuilder<'a> {
	corpus: &'a Corpus,
	estimator: BackoffEstimator,
}

impl<'a> FeatureBuilder<'a> {
	pub fn new(corpus: &'a Corpus) -> Self {
		Self { corpus, estimator: corpus.estimator() }
	}

	/// Examples for one tokenized sentence.
	///
	/// Tokens missing from the vocabulary are skipped.
	pub fn sentence_examples<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<Example> {
		let ids: Vec<WordId> = tokens
			.iter()
			.filter_map(|token| {
				let id = self.corpus.vocabulary().id_of(token.as_ref());
				if id.is_none() {
					warn!("Skipping unknown token '{}'", token.as_ref());
				}
				id
			})
			.collect();

		let last = ids.len().saturating_sub(1);
		(0..ids.len())
			.filter_map(|i| {
				eos_features(&self.estimator, &ids[..=i]).map(|features| Example { features, label: i == last })
			})
			.collect()
	}

	/// Examples for every sentence of a raw text.
	pub fn text_examples(&self, text: &str) -> Vec<Example> {
		tokenized_sentences(text)
			.iter()
			.flat_map(|sentence| self.sentence_examples(sentence))
			.collect()
	}
}
