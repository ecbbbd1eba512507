use rand::Rng;

use super::sampling::weighted_index;
use super::{ContextArity, Selection};
use crate::corpus::Corpus;
use crate::stats::{FollowerList, WordId};

/// Resolves the starting context of a generation.
///
/// Slots are filled in this order until `arity.size()` ids are chosen:
/// 1. Known seed words (case-insensitive, unknown ones skipped). For a
///    trigram, a second seed word is kept only if it forms a known context
///    with the first.
/// 2. For the second trigram slot, a word opening a trigram context after
///    the first one.
/// 3. Sentence start candidates.
/// 4. Any vocabulary id not chosen yet, lowest first.
///
/// Greedy selection always takes the most frequent option; weighted
/// selection draws proportionally to the counts.
///
/// May return fewer ids than required when the corpus is too small.
pub(crate) fn resolve<R: Rng + ?Sized, S: AsRef<str>>(
	corpus: &Corpus,
	arity: ContextArity,
	selection: Selection,
	rng: &mut R,
	seeds: &[S],
) -> Vec<WordId> {
	let need = arity.size();
	let vocabulary = corpus.vocabulary();

	let mut chosen: Vec<WordId> = seeds
		.iter()
		.filter_map(|word| vocabulary.id_of(word.as_ref()))
		.take(need)
		.collect();

	if let &[first, second] = chosen.as_slice() {
		if corpus.followers().trigram(first, second).is_none() {
			chosen.truncate(1);
		}
	}

	if chosen.is_empty() {
		chosen.extend(pick_start(corpus, selection, rng, &chosen));
	}

	if need == 2 && chosen.len() == 1 {
		if let Some(openers) = corpus.followers().openers(chosen[0]) {
			chosen.extend(pick_from(openers, selection, rng));
		}
	}

	while chosen.len() < need {
		match pick_start(corpus, selection, rng, &chosen) {
			Some(id) => chosen.push(id),
			None => break,
		}
	}

	if chosen.len() < need {
		let padding: Vec<WordId> = vocabulary
			.ids()
			.filter(|id| !chosen.contains(id))
			.take(need - chosen.len())
			.collect();
		chosen.extend(padding);
	}

	chosen
}

/// Picks a sentence opener not already in `exclude`.
fn pick_start<R: Rng + ?Sized>(
	corpus: &Corpus,
	selection: Selection,
	rng: &mut R,
	exclude: &[WordId],
) -> Option<WordId> {
	let candidates: Vec<(WordId, u64)> = corpus
		.start_candidates()
		.iter()
		.filter(|c| !exclude.contains(&c.word))
		.map(|c| (c.word, c.count))
		.collect();

	match selection {
		Selection::Greedy => candidates.first().map(|(word, _)| *word),
		Selection::Weighted => {
			let weights: Vec<u64> = candidates.iter().map(|(_, count)| *count).collect();
			weighted_index(rng, &weights).map(|i| candidates[i].0)
		}
	}
}

fn pick_from<R: Rng + ?Sized>(list: &FollowerList, selection: Selection, rng: &mut R) -> Option<WordId> {
	match selection {
		Selection::Greedy => list.head().map(|f| f.next),
		Selection::Weighted => {
			let weights: Vec<u64> = list.iter().map(|f| f.count).collect();
			weighted_index(rng, &weights).map(|i| list.as_slice()[i].next)
		}
	}
}
