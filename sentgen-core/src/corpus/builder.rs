use std::collections::HashMap;
use std::sync::Arc;

use crate::stats::{
	EosCounts, FollowerList, FollowerTables, LengthHazard, NGramStatistics, StartCandidates, StatsError, Vocabulary, WordId,
};

use super::Corpus;

/// Accumulates n-gram counts from tokenized sentences.
///
/// Counts are keyed by token strings so partial builders filled on
/// different threads can be merged before ids are assigned.
///
/// # Notes
/// - Every sentence contributes one end observation to its last unigram,
///   bigram and trigram
/// - Sentences are not deduplicated; repeated sentences weigh more
#[derive(Debug, Default, Clone)]
pub struct CorpusBuilder {
	unigrams: HashMap<String, EosCounts>,
	starts: HashMap<String, u64>,
	bigrams: HashMap<(String, String), EosCounts>,
	trigrams: HashMap<(String, String, String), EosCounts>,
	lengths: HashMap<usize, u64>,
	sentences: u64,
}

impl CorpusBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one tokenized sentence. Empty sentences are ignored.
	pub fn add_sentence<S: AsRef<str>>(&mut self, tokens: &[S]) {
		let tokens: Vec<String> = tokens
			.iter()
			.map(|t| t.as_ref().trim().to_lowercase())
			.filter(|t| !t.is_empty())
			.collect();
		if tokens.is_empty() {
			return;
		}

		let last = tokens.len() - 1;
		self.sentences += 1;
		*self.lengths.entry(tokens.len()).or_default() += 1;
		*self.starts.entry(tokens[0].clone()).or_default() += 1;

		for (i, token) in tokens.iter().enumerate() {
			self.unigrams.entry(token.clone()).or_default().observe(i == last);
		}
		for (i, pair) in tokens.windows(2).enumerate() {
			self.bigrams
				.entry((pair[0].clone(), pair[1].clone()))
				.or_default()
				.observe(i + 1 == last);
		}
		for (i, triple) in tokens.windows(3).enumerate() {
			self.trigrams
				.entry((triple[0].clone(), triple[1].clone(), triple[2].clone()))
				.or_default()
				.observe(i + 2 == last);
		}
	}

	/// Adds every count of `other` into `self`.
	pub fn merge(&mut self, other: &CorpusBuilder) {
		for (word, counts) in &other.unigrams {
			self.unigrams.entry(word.clone()).or_default().absorb(counts);
		}
		for (word, count) in &other.starts {
			*self.starts.entry(word.clone()).or_default() += count;
		}
		for (key, counts) in &other.bigrams {
			self.bigrams.entry(key.clone()).or_default().absorb(counts);
		}
		for (key, counts) in &other.trigrams {
			self.trigrams.entry(key.clone()).or_default().absorb(counts);
		}
		for (length, count) in &other.lengths {
			*self.lengths.entry(*length).or_default() += count;
		}
		self.sentences += other.sentences;
	}

	pub fn sentence_count(&self) -> u64 {
		self.sentences
	}

	pub fn is_empty(&self) -> bool {
		self.sentences == 0
	}

	/// Freezes the counts into an immutable corpus.
	///
	/// Ids are assigned in sorted word order, so the same input always gives
	/// the same ids whatever the chunking.
	///
	/// # Errors
	/// Returns `StatsError` if the assembled tables are inconsistent.
	pub fn build(&self) -> Result<Corpus, StatsError> {
		let mut words: Vec<&String> = self.unigrams.keys().collect();
		words.sort();
		let vocabulary = Vocabulary::from_words(words);
		let id = |word: &String| vocabulary.id_of(word);

		let mut unigrams = HashMap::with_capacity(self.unigrams.len());
		for (word, counts) in &self.unigrams {
			if let Some(w) = id(word) {
				unigrams.insert(w, *counts);
			}
		}

		let mut bigrams = HashMap::with_capacity(self.bigrams.len());
		let mut bigram_followers: HashMap<WordId, Vec<(WordId, u64)>> = HashMap::new();
		for ((a, b), counts) in &self.bigrams {
			if let (Some(w1), Some(w2)) = (id(a), id(b)) {
				bigrams.insert((w1, w2), *counts);
				bigram_followers.entry(w1).or_default().push((w2, counts.total));
			}
		}

		let mut trigrams: HashMap<(WordId, WordId), HashMap<WordId, EosCounts>> = HashMap::new();
		let mut trigram_followers: HashMap<(WordId, WordId), Vec<(WordId, u64)>> = HashMap::new();
		for ((a, b, c), counts) in &self.trigrams {
			if let (Some(w1), Some(w2), Some(w3)) = (id(a), id(b), id(c)) {
				trigrams.entry((w1, w2)).or_default().insert(w3, *counts);
				trigram_followers.entry((w1, w2)).or_default().push((w3, counts.total));
			}
		}

		let starts = self.starts.iter().filter_map(|(word, count)| id(word).map(|w| (w, *count)));
		let start_candidates = StartCandidates::from_counts(starts);

		let followers = FollowerTables::new(
			bigram_followers
				.into_iter()
				.map(|(w, counts)| (w, FollowerList::from_counts(counts)))
				.collect(),
			trigram_followers
				.into_iter()
				.map(|(key, counts)| (key, FollowerList::from_counts(counts)))
				.collect(),
		);

		let hazard = LengthHazard::from_histogram(&self.lengths);
		let statistics = NGramStatistics::new(unigrams, bigrams, trigrams, hazard)?;

		Ok(Corpus::from_parts(vocabulary, Arc::new(statistics), followers, start_candidates, self.sentences))
	}
}
