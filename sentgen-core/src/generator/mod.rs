//! Sentence generation over follower tables.
//!
//! A single routine drives all four generators. It is parametrised by:
//! - a context arity: one previous id (bigram) or two (trigram)
//! - a candidate selection rule: most frequent first (greedy) or
//!   count-weighted random draw (weighted)
//!
//! Generation goes through three phases:
//! - Seeding: resolve the starting context from seed words, start
//!   candidates or any available id
//! - Extending: append admissible followers until a stop condition fires
//! - Terminated: render the ids as lowercase words

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{GenerationSettings, Settings};
use crate::corpus::Corpus;
use crate::predictor::EosPredictor;
use crate::stats::{FollowerList, WordId};

/// Weighted cumulative-sum sampling.
mod sampling;

/// Starting context resolution.
mod seeding;

/// Per-call generation state and loop avoidance.
mod state;

use sampling::weighted_index;
use state::GenerationState;

/// Number of previous ids used to look up followers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextArity {
	Bigram,
	Trigram,
}

impl ContextArity {
	pub fn size(self) -> usize {
		match self {
			ContextArity::Bigram => 1,
			ContextArity::Trigram => 2,
		}
	}
}

/// How the next id is chosen among the followers of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Selection {
	/// Most frequent admissible follower.
	Greedy,
	/// Random follower, proportional to its count.
	Weighted,
}

/// The four named generators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
	BigramGreedy,
	BigramWeighted,
	TrigramGreedy,
	TrigramWeighted,
}

impl Strategy {
	pub const ALL: [Strategy; 4] = [
		Strategy::BigramGreedy,
		Strategy::BigramWeighted,
		Strategy::TrigramGreedy,
		Strategy::TrigramWeighted,
	];

	pub fn arity(self) -> ContextArity {
		match self {
			Strategy::BigramGreedy | Strategy::BigramWeighted => ContextArity::Bigram,
			Strategy::TrigramGreedy | Strategy::TrigramWeighted => ContextArity::Trigram,
		}
	}

	pub fn selection(self) -> Selection {
		match self {
			Strategy::BigramGreedy | Strategy::TrigramGreedy => Selection::Greedy,
			Strategy::BigramWeighted | Strategy::TrigramWeighted => Selection::Weighted,
		}
	}

	/// Algorithm key, e.g. `"tri_greedy"`.
	pub fn key(self) -> &'static str {
		match self {
			Strategy::BigramGreedy => "bi_greedy",
			Strategy::BigramWeighted => "bi_weighted",
			Strategy::TrigramGreedy => "tri_greedy",
			Strategy::TrigramWeighted => "tri_weighted",
		}
	}
}

impl fmt::Display for Strategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}

impl FromStr for Strategy {
	type Err = String;

	/// Accepts `bi_greedy`, `bi-greedy`, `tri_weighted`, ... (case-insensitive).
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let key = s.trim().to_lowercase().replace('-', "_");
		Strategy::ALL
			.into_iter()
			.find(|strategy| strategy.key() == key)
			.ok_or_else(|| format!("Unknown algorithm '{}', expected one of: bi_greedy, bi_weighted, tri_greedy, tri_weighted", s))
	}
}

/// Why a generation stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
	/// No starting context could be resolved.
	NoSeed,
	/// The current context has no followers.
	DeadEnd,
	/// Loop avoidance rejected every candidate tried.
	Exhausted,
	/// The last token matched the stop word.
	StopWord,
	/// The EOS predictor reached the threshold.
	EndOfSentence,
	/// The token cap was reached.
	MaxTokens,
}

/// Parameters of one generation call.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct GenerationRequest {
	/// Preferred starting words; unknown words are ignored.
	pub seeds: Vec<String>,
	/// Maximum number of tokens, seeds included (values below 1 count as 1).
	pub max_tokens: usize,
	/// Stop right after producing this word.
	pub stop_word: Option<String>,
}

impl GenerationRequest {
	pub fn new(max_tokens: usize) -> Self {
		Self { seeds: Vec::new(), max_tokens, stop_word: None }
	}

	pub fn with_seeds<I, S>(mut self, seeds: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.seeds = seeds.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_stop_word(mut self, stop_word: Option<&str>) -> Self {
		self.stop_word = stop_word.map(str::to_owned);
		self
	}
}

/// Result of a generation with its diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
	pub ids: Vec<WordId>,
	pub text: String,
	pub termination: Termination,
}

/// Sentence generator over a shared corpus.
///
/// # Responsibilities
/// - Resolve a starting context (seeding)
/// - Extend it with admissible followers (greedy or weighted)
/// - Stop on dead ends, exhausted candidates, the stop word, the EOS
///   predictor or the token cap
/// - Render the result
///
/// Each generator owns its random source; the corpus and the predictor are
/// shared read-only, so independent generators can run on separate threads.
#[derive(Debug, Clone)]
pub struct Generator {
	corpus: Arc<Corpus>,
	predictor: Option<Arc<EosPredictor>>,
	strategy: Strategy,
	settings: GenerationSettings,
	rng: StdRng,
}

impl Generator {
	/// Creates a generator with default settings and an OS-seeded random source.
	pub fn new(corpus: Arc<Corpus>, strategy: Strategy) -> Self {
		Self {
			corpus,
			predictor: None,
			strategy,
			settings: Settings::default().generation,
			rng: StdRng::from_os_rng(),
		}
	}

	/// Makes every draw reproducible.
	pub fn with_seed(mut self, seed: u64) -> Self {
		self.rng = StdRng::seed_from_u64(seed);
		self
	}

	/// Enables the dynamic end-of-sentence stop.
	pub fn with_predictor(mut self, predictor: Arc<EosPredictor>) -> Self {
		self.predictor = Some(predictor);
		self
	}

	pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn strategy(&self) -> Strategy {
		self.strategy
	}

	pub fn name(&self) -> &'static str {
		self.strategy.key()
	}

	/// Generates with no seed words, the default token cap and no stop word.
	pub fn generate_sentence(&mut self) -> String {
		let request = GenerationRequest::new(self.settings.max_tokens);
		self.generate(&request)
	}

	/// Generates starting from `seeds` when they are known.
	pub fn generate_sentence_from<S: AsRef<str>>(&mut self, seeds: &[S]) -> String {
		let request = GenerationRequest::new(self.settings.max_tokens)
			.with_seeds(seeds.iter().map(|s| s.as_ref().to_owned()));
		self.generate(&request)
	}

	/// Generates with a custom token cap and an optional stop word.
	pub fn generate_sentence_with(&mut self, max_tokens: usize, stop_word: Option<&str>) -> String {
		let request = GenerationRequest::new(max_tokens).with_stop_word(stop_word);
		self.generate(&request)
	}

	/// Generates the rendered sentence for `request`. Never fails; missing data
	/// yields an empty or short string.
	pub fn generate(&mut self, request: &GenerationRequest) -> String {
		self.generate_detailed(request).text
	}

	/// Like `generate`, also returning the ids and the termination reason.
	pub fn generate_detailed(&mut self, request: &GenerationRequest) -> Generation {
		let arity = self.strategy.arity();
		let seed = seeding::resolve(&self.corpus, arity, self.strategy.selection(), &mut self.rng, &request.seeds);
		self.extend(seed, request.max_tokens, request.stop_word.as_deref())
	}

	/// Generates from an explicit starting context of ids.
	///
	/// Only the first `arity` ids are used; an empty slice falls back to the
	/// regular seeding.
	pub fn generate_from_ids(&mut self, start: &[WordId], max_tokens: usize, stop_word: Option<&str>) -> Generation {
		let arity = self.strategy.arity();
		let mut seed: Vec<WordId> = start.iter().copied().take(arity.size()).collect();
		if seed.len() < arity.size() {
			let words: Vec<&str> = seed.iter().filter_map(|id| self.corpus.vocabulary().word(*id)).collect();
			seed = seeding::resolve(&self.corpus, arity, self.strategy.selection(), &mut self.rng, &words);
		}
		self.extend(seed, max_tokens, stop_word)
	}

	fn extend(&mut self, seed: Vec<WordId>, max_tokens: usize, stop_word: Option<&str>) -> Generation {
		let arity = self.strategy.arity();
		let max_tokens = max_tokens.max(1);
		let stop_word = stop_word.map(|w| w.trim().to_lowercase()).filter(|w| !w.is_empty());

		if seed.is_empty() {
			debug!("{}: no starting context available", self.name());
			return self.finish(GenerationState::new(arity, seed), Termination::NoSeed);
		}
		if seed.len() < arity.size() {
			return self.finish(GenerationState::new(arity, seed), Termination::DeadEnd);
		}

		let limit = arity.size().max(max_tokens);
		let mut state = GenerationState::new(arity, seed);
		let corpus = Arc::clone(&self.corpus);

		let termination = loop {
			if state.len() >= limit {
				break Termination::MaxTokens;
			}

			let followers = match self.followers(&corpus, &state) {
				Some(list) if !list.is_empty() => list,
				_ => break Termination::DeadEnd,
			};

			let Some(next) = self.select(followers, &state) else {
				break Termination::Exhausted;
			};
			state.push(next);

			if let Some(stop) = &stop_word {
				let rendered = corpus.vocabulary().word(next).unwrap_or(self.settings.placeholder.as_str());
				if rendered.to_lowercase() == *stop {
					break Termination::StopWord;
				}
			}

			if let Some(predictor) = &self.predictor {
				let probability = predictor.predict_eos_probability(state.ids());
				if probability >= self.settings.eos_threshold {
					debug!("{}: stopping early, length={} p={:.4}", self.name(), state.len(), probability);
					break Termination::EndOfSentence;
				}
			}

			if state.len() >= max_tokens {
				break Termination::MaxTokens;
			}
		};

		self.finish(state, termination)
	}

	fn followers<'c>(&self, corpus: &'c Corpus, state: &GenerationState) -> Option<&'c FollowerList> {
		let last = state.last()?;
		match self.strategy.arity() {
			ContextArity::Bigram => corpus.followers().bigram(last),
			ContextArity::Trigram => corpus.followers().trigram(state.second_last()?, last),
		}
	}

	/// Picks an admissible follower, trying at most `max_attempts` candidates.
	fn select(&mut self, followers: &FollowerList, state: &GenerationState) -> Option<WordId> {
		let attempts = self.settings.max_attempts;
		match self.strategy.selection() {
			Selection::Greedy => followers
				.iter()
				.take(attempts)
				.map(|f| f.next)
				.find(|candidate| state.admits(*candidate)),
			Selection::Weighted => {
				let weights: Vec<u64> = followers.iter().map(|f| f.count).collect();
				(0..attempts)
					.filter_map(|_| weighted_index(&mut self.rng, &weights))
					.map(|i| followers.as_slice()[i].next)
					.find(|candidate| state.admits(*candidate))
			}
		}
	}

	fn finish(&self, state: GenerationState, termination: Termination) -> Generation {
		let ids = state.into_ids();
		let text = self.corpus.vocabulary().render(&ids, &self.settings.placeholder);
		debug!("{}: {:?} after {} tokens", self.name(), termination, ids.len());
		Generation { ids, text, termination }
	}
}
