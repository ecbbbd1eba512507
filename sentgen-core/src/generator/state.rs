use std::collections::HashSet;

use super::ContextArity;
use crate::stats::WordId;

/// A `(context, candidate)` transition already taken during one generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Signature {
	Pair(WordId, WordId),
	Triple(WordId, WordId, WordId),
}

/// Mutable state of a single `generate` call.
///
/// Tracks the produced ids and the transitions already used, so the same
/// short cycle cannot be walked twice while a word may still reappear in a
/// different context.
///
/// # Invariants
/// - `ids` holds at least `arity.size()` ids once seeding succeeded
/// - Every id appended through `push` passed `admits`
#[derive(Debug)]
pub(crate) struct GenerationState {
	arity: ContextArity,
	ids: Vec<WordId>,
	used: HashSet<Signature>,
}

impl GenerationState {
	pub(crate) fn new(arity: ContextArity, seed: Vec<WordId>) -> Self {
		Self { arity, ids: seed, used: HashSet::new() }
	}

	pub(crate) fn ids(&self) -> &[WordId] {
		&self.ids
	}

	pub(crate) fn into_ids(self) -> Vec<WordId> {
		self.ids
	}

	pub(crate) fn len(&self) -> usize {
		self.ids.len()
	}

	pub(crate) fn last(&self) -> Option<WordId> {
		self.ids.last().copied()
	}

	pub(crate) fn second_last(&self) -> Option<WordId> {
		self.ids.len().checked_sub(2).map(|i| self.ids[i])
	}

	fn signature(&self, candidate: WordId) -> Option<Signature> {
		let last = self.last()?;
		match self.arity {
			ContextArity::Bigram => Some(Signature::Pair(last, candidate)),
			ContextArity::Trigram => Some(Signature::Triple(self.second_last()?, last, candidate)),
		}
	}

	/// Loop-avoidance rules for appending `candidate`:
	/// - not the most recent id
	/// - for trigram contexts, not the second most recent id either
	/// - the `(context, candidate)` transition was not used earlier in this call
	pub(crate) fn admits(&self, candidate: WordId) -> bool {
		if self.last() == Some(candidate) {
			return false;
		}
		if self.arity == ContextArity::Trigram && self.second_last() == Some(candidate) {
			return false;
		}
		match self.signature(candidate) {
			Some(signature) => !self.used.contains(&signature),
			None => false,
		}
	}

	/// Appends `candidate`, recording its transition and sliding the context.
	pub(crate) fn push(&mut self, candidate: WordId) {
		if let Some(signature) = self.signature(candidate) {
			self.used.insert(signature);
		}
		self.ids.push(candidate);
	}
}
