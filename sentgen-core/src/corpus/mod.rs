//! Corpus import and the frozen lookup tables used by generation.
//!
//! A `Corpus` bundles everything read-only that generators and the EOS
//! estimator need:
//! - the vocabulary (word <-> id)
//! - the n-gram end-of-sentence statistics
//! - the follower tables and the sentence start candidates
//!
//! It is built once from text (`CorpusBuilder`), optionally cached next to
//! the text file as a postcard snapshot, then shared behind an `Arc`.

use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use log::info;
use serde::{Deserialize, Serialize};

use crate::estimator::BackoffEstimator;
use crate::io::{build_output_path, get_filename, read_text};
use crate::stats::{FollowerTables, NGramStatistics, StartCandidates, StatsError, Vocabulary, WordId};

mod builder;
pub mod tokenizer;

pub use builder::CorpusBuilder;

/// Chunks per CPU when building in parallel.
const CHUNKS_PER_CPU: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("snapshot error: {0}")]
	Snapshot(#[from] postcard::Error),
	#[error(transparent)]
	Stats(#[from] StatsError),
	#[error("no sentence found in {0}")]
	Empty(String),
}

/// Immutable tables derived from a text corpus.
///
/// # Invariants
/// - Every id in the statistics, follower tables and start candidates is a
///   valid vocabulary id
/// - Follower lists and start candidates are sorted by count descending
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Corpus {
	vocabulary: Vocabulary,
	statistics: Arc<NGramStatistics>,
	followers: FollowerTables,
	start_candidates: StartCandidates,
	sentence_count: u64,
	#[serde(skip)]
	name: Option<String>,
}

impl Corpus {
	pub(crate) fn from_parts(
		vocabulary: Vocabulary,
		statistics: Arc<NGramStatistics>,
		followers: FollowerTables,
		start_candidates: StartCandidates,
		sentence_count: u64,
	) -> Self {
		Self { vocabulary, statistics, followers, start_candidates, sentence_count, name: None }
	}

	/// Builds a corpus from raw text on the current thread.
	///
	/// Empty text gives an empty corpus; generators then return empty strings.
	pub fn from_text(text: &str) -> Result<Self, CorpusError> {
		let mut builder = CorpusBuilder::new();
		for sentence in tokenized_sentences(text) {
			builder.add_sentence(&sentence);
		}
		Ok(builder.build()?)
	}

	/// Loads a corpus from a text file, going through its binary snapshot.
	///
	/// - If `<stem>.bin` exists next to the file it is loaded directly
	/// - Otherwise the text is split into chunks built on separate threads,
	///   the partial counts are merged and the snapshot is written
	///
	/// # Errors
	/// - `CorpusError::Io` if the file cannot be read or the snapshot written
	/// - `CorpusError::Snapshot` if an existing snapshot is corrupt
	/// - `CorpusError::Empty` if the text holds no sentence
	pub fn from_text_file<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
		let path = path.as_ref();
		let snapshot_path = build_output_path(path, "bin")?;

		let mut corpus = if snapshot_path.exists() {
			info!("Loading corpus snapshot {}", snapshot_path.display());
			Self::load_snapshot(&snapshot_path)?
		} else {
			let text = read_text(path)?;
			let sentences = tokenized_sentences(&text);
			if sentences.is_empty() {
				return Err(CorpusError::Empty(path.display().to_string()));
			}
			info!("Building corpus from {} ({} sentences)", path.display(), sentences.len());
			let corpus = Self::build_parallel(sentences)?;
			corpus.save_snapshot(&snapshot_path)?;
			corpus
		};

		corpus.name = Some(get_filename(path)?);
		Ok(corpus)
	}

	/// Splits the sentences into `cpus * CHUNKS_PER_CPU` chunks, counts each
	/// chunk on its own thread and merges the partial builders.
	fn build_parallel(sentences: Vec<Vec<String>>) -> Result<Self, CorpusError> {
		let chunks = num_cpus::get() * CHUNKS_PER_CPU;
		let chunk_size = sentences.len().div_ceil(chunks).max(1);

		let (tx, rx) = mpsc::channel();
		for chunk in sentences.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk = chunk.to_vec();

			thread::spawn(move || {
				let mut partial = CorpusBuilder::new();
				for sentence in &chunk {
					partial.add_sentence(sentence);
				}
				// The receiver outlives every sender.
				let _ = tx.send(partial);
			});
		}
		drop(tx);

		let mut builder = CorpusBuilder::new();
		for partial in rx.iter() {
			builder.merge(&partial);
		}

		Ok(builder.build()?)
	}

	/// Writes the corpus as a postcard snapshot.
	pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<(), CorpusError> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
		let bytes = std::fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocabulary
	}

	pub fn statistics(&self) -> &NGramStatistics {
		&self.statistics
	}

	/// Shared handle on the statistics, for building an estimator.
	pub fn shared_statistics(&self) -> Arc<NGramStatistics> {
		Arc::clone(&self.statistics)
	}

	pub fn followers(&self) -> &FollowerTables {
		&self.followers
	}

	pub fn start_candidates(&self) -> &StartCandidates {
		&self.start_candidates
	}

	pub fn sentence_count(&self) -> u64 {
		self.sentence_count
	}

	/// File stem of the text the corpus was loaded from, if any.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Backoff estimator over this corpus' statistics.
	pub fn estimator(&self) -> BackoffEstimator {
		BackoffEstimator::new(self.shared_statistics())
	}

	/// Maps tokens to ids, skipping words outside the vocabulary.
	pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<WordId> {
		tokens.iter().filter_map(|t| self.vocabulary.id_of(t.as_ref())).collect()
	}
}

/// Splits text into sentences and tokenizes them, dropping empty ones.
pub fn tokenized_sentences(text: &str) -> Vec<Vec<String>> {
	tokenizer::split_sentences(text)
		.iter()
		.map(|sentence| tokenizer::tokenize(sentence))
		.filter(|tokens| !tokens.is_empty())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	const TEXT: &str = "The cat sat on the mat. The dog sat on the rug! A cat ran.";

	#[test]
	fn from_text_counts_sentences() {
		let corpus = Corpus::from_text(TEXT).unwrap();
		assert_eq!(corpus.sentence_count(), 3);
		assert!(corpus.vocabulary().id_of("MAT").is_some());
		let the = corpus.vocabulary().id_of("the").unwrap();
		assert_eq!(corpus.start_candidates().iter().next().map(|s| s.word), Some(the));
	}

	#[test]
	fn empty_text_gives_empty_corpus() {
		let corpus = Corpus::from_text("  ...  ").unwrap();
		assert!(corpus.vocabulary().is_empty());
		assert_eq!(corpus.sentence_count(), 0);
	}

	#[test]
	fn text_file_writes_and_reuses_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let text_path = dir.path().join("animals.txt");
		std::fs::write(&text_path, TEXT).unwrap();

		let built = Corpus::from_text_file(&text_path).unwrap();
		assert_eq!(built.name(), Some("animals"));
		assert!(dir.path().join("animals.bin").exists());

		// The snapshot wins over the text from now on.
		std::fs::write(&text_path, "Something else entirely.").unwrap();
		let reloaded = Corpus::from_text_file(&text_path).unwrap();
		assert_eq!(reloaded.sentence_count(), built.sentence_count());
		assert_eq!(reloaded.vocabulary().len(), built.vocabulary().len());
		assert_eq!(reloaded.vocabulary().id_of("rug"), built.vocabulary().id_of("rug"));
	}

	#[test]
	fn parallel_build_matches_sequential_build() {
		let text = TEXT.repeat(50);
		let sequential = Corpus::from_text(&text).unwrap();
		let parallel = Corpus::build_parallel(tokenized_sentences(&text)).unwrap();

		assert_eq!(parallel.sentence_count(), 150);
		let v = parallel.vocabulary();
		let (sat, on) = (v.id_of("sat").unwrap(), v.id_of("on").unwrap());
		assert_eq!(parallel.statistics().bigram(sat, on), sequential.statistics().bigram(sat, on));
		assert_eq!(parallel.followers().bigram(sat), sequential.followers().bigram(sat));
	}

	#[test]
	fn empty_file_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let text_path = dir.path().join("empty.txt");
		std::fs::write(&text_path, "\n\n").unwrap();
		assert!(matches!(Corpus::from_text_file(&text_path), Err(CorpusError::Empty(_))));
	}

	#[test]
	fn encode_skips_unknown_words() {
		let corpus = Corpus::from_text(TEXT).unwrap();
		let ids = corpus.encode(&["the", "unicorn", "cat"]);
		assert_eq!(ids.len(), 2);
	}
}
