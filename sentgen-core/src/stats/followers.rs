use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::WordId;

/// One observed continuation of a context.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Follower {
	pub next: WordId,
	pub count: u64,
}

/// Continuations of a context, ranked by count.
///
/// The same list feeds greedy selection (walk from the head) and weighted
/// selection (cumulative sampling over `count`).
///
/// # Invariants
/// - Sorted by `count` descending, ties by ascending `next`
/// - Every `count` is strictly positive
/// - Each `next` appears once
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FollowerList {
	followers: Vec<Follower>,
}

impl FollowerList {
	/// Builds a ranked list from `(next, count)` pairs.
	///
	/// Duplicated ids are summed and zero counts are dropped.
	pub fn from_counts<I>(counts: I) -> Self
	where
		I: IntoIterator<Item = (WordId, u64)>,
	{
		let mut merged: HashMap<WordId, u64> = HashMap::new();
		for (next, count) in counts {
			*merged.entry(next).or_insert(0) += count;
		}

		let mut followers: Vec<Follower> = merged
			.into_iter()
			.filter(|(_, count)| *count > 0)
			.map(|(next, count)| Follower { next, count })
			.collect();
		followers.sort_by(|a, b| b.count.cmp(&a.count).then(a.next.cmp(&b.next)));

		Self { followers }
	}

	/// Most frequent follower.
	pub fn head(&self) -> Option<&Follower> {
		self.followers.first()
	}

	/// Sum of all counts.
	pub fn total(&self) -> u64 {
		self.followers.iter().map(|f| f.count).sum()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Follower> {
		self.followers.iter()
	}

	pub fn as_slice(&self) -> &[Follower] {
		&self.followers
	}

	pub fn len(&self) -> usize {
		self.followers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.followers.is_empty()
	}
}

impl<'a> IntoIterator for &'a FollowerList {
	type Item = &'a Follower;
	type IntoIter = std::slice::Iter<'a, Follower>;

	fn into_iter(self) -> Self::IntoIter {
		self.followers.iter()
	}
}

/// Follower lists for single-word and two-word contexts.
///
/// `openers` indexes the trigram contexts by their first word:
/// `w1 → [(w2, Σ counts of (w1, w2) followers)]`. It answers
/// "which second word best opens a trigram context after `w1`" during
/// seeding without scanning every context.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FollowerTables {
	bigram: HashMap<WordId, FollowerList>,
	trigram: HashMap<(WordId, WordId), FollowerList>,
	openers: HashMap<WordId, FollowerList>,
}

impl FollowerTables {
	/// Builds the tables and derives the openers index from the trigram lists.
	pub fn new(
		bigram: HashMap<WordId, FollowerList>,
		trigram: HashMap<(WordId, WordId), FollowerList>,
	) -> Self {
		let mut opener_counts: HashMap<WordId, Vec<(WordId, u64)>> = HashMap::new();
		for ((w1, w2), list) in &trigram {
			opener_counts.entry(*w1).or_default().push((*w2, list.total()));
		}
		let openers = opener_counts
			.into_iter()
			.map(|(w1, counts)| (w1, FollowerList::from_counts(counts)))
			.collect();

		Self { bigram, trigram, openers }
	}

	pub fn bigram(&self, last: WordId) -> Option<&FollowerList> {
		self.bigram.get(&last)
	}

	pub fn trigram(&self, second_last: WordId, last: WordId) -> Option<&FollowerList> {
		self.trigram.get(&(second_last, last))
	}

	/// Second words that open a trigram context after `first`.
	pub fn openers(&self, first: WordId) -> Option<&FollowerList> {
		self.openers.get(&first)
	}

	pub fn bigram_context_count(&self) -> usize {
		self.bigram.len()
	}

	pub fn trigram_context_count(&self) -> usize {
		self.trigram.len()
	}
}

/// A word observed at the start of a sentence.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartCandidate {
	pub word: WordId,
	pub count: u64,
}

/// Sentence openers ranked by how often they start a sentence.
///
/// # Invariants
/// - Sorted by `count` descending, ties by ascending `word`
/// - Every `count` is strictly positive
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StartCandidates {
	candidates: Vec<StartCandidate>,
}

impl StartCandidates {
	pub fn from_counts<I>(counts: I) -> Self
	where
		I: IntoIterator<Item = (WordId, u64)>,
	{
		let list = FollowerList::from_counts(counts);
		Self {
			candidates: list
				.iter()
				.map(|f| StartCandidate { word: f.next, count: f.count })
				.collect(),
		}
	}

	pub fn iter(&self) -> std::slice::Iter<'_, StartCandidate> {
		self.candidates.iter()
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn follower_list_is_ranked_and_merged() {
		let list = FollowerList::from_counts([(4, 1), (2, 5), (3, 5), (4, 2), (9, 0)]);
		let ranked: Vec<(WordId, u64)> = list.iter().map(|f| (f.next, f.count)).collect();
		assert_eq!(ranked, vec![(2, 5), (3, 5), (4, 3)]);
		assert_eq!(list.total(), 13);
		assert_eq!(list.head().map(|f| f.next), Some(2));
	}

	#[test]
	fn openers_sum_context_followers() {
		let mut trigram = HashMap::new();
		trigram.insert((1, 2), FollowerList::from_counts([(5, 3), (6, 1)]));
		trigram.insert((1, 3), FollowerList::from_counts([(5, 10)]));
		trigram.insert((2, 3), FollowerList::from_counts([(1, 1)]));
		let tables = FollowerTables::new(HashMap::new(), trigram);

		let openers = tables.openers(1).unwrap();
		let ranked: Vec<(WordId, u64)> = openers.iter().map(|f| (f.next, f.count)).collect();
		assert_eq!(ranked, vec![(3, 10), (2, 4)]);
		assert!(tables.openers(5).is_none());
	}

	#[test]
	fn start_candidates_are_sorted_descending() {
		let starts = StartCandidates::from_counts([(7, 1), (3, 9), (5, 4)]);
		let words: Vec<WordId> = starts.iter().map(|c| c.word).collect();
		assert_eq!(words, vec![3, 5, 7]);
	}
}
