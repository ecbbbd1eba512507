use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::WordId;

/// Bidirectional mapping between normalized words and their ids.
///
/// Id `i` is the word stored at position `i`, so ids are dense and
/// stable for the lifetime of the snapshot.
///
/// # Invariants
/// - Every stored word is lowercase
/// - `index[words[i]] == i` for every `i`
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
	words: Vec<String>,
	index: HashMap<String, WordId>,
}

impl From<Vec<String>> for Vocabulary {
	fn from(words: Vec<String>) -> Self {
		Self::from_words(words)
	}
}

impl From<Vocabulary> for Vec<String> {
	fn from(vocabulary: Vocabulary) -> Self {
		vocabulary.words
	}
}

impl Vocabulary {
	/// Builds a vocabulary from words in id order.
	///
	/// Words are lowercased; a repeated word keeps its first id and the
	/// duplicate slot is still reserved so later ids do not shift.
	pub fn from_words<I, S>(words: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let words: Vec<String> = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
		let mut vocabulary = Self { words, index: HashMap::new() };
		vocabulary.rebuild_index();
		vocabulary
	}

	fn rebuild_index(&mut self) {
		self.index.clear();
		for (id, word) in self.words.iter().enumerate() {
			self.index.entry(word.clone()).or_insert(id as WordId);
		}
	}

	/// Case-insensitive lookup of a word.
	pub fn id_of(&self, word: &str) -> Option<WordId> {
		let trimmed = word.trim();
		if trimmed.is_empty() {
			return None;
		}
		self.index.get(&trimmed.to_lowercase()).copied()
	}

	pub fn word(&self, id: WordId) -> Option<&str> {
		self.words.get(id as usize).map(String::as_str)
	}

	/// Renders ids as space-separated words; unknown ids become `placeholder`.
	pub fn render(&self, ids: &[WordId], placeholder: &str) -> String {
		ids.iter()
			.map(|id| self.word(*id).unwrap_or(placeholder))
			.collect::<Vec<_>>()
			.join(" ")
	}

	/// Iterates over ids in ascending order.
	pub fn ids(&self) -> impl Iterator<Item = WordId> + '_ {
		(0..self.words.len()).map(|i| i as WordId)
	}

	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lookup_is_case_insensitive() {
		let vocabulary = Vocabulary::from_words(["The", "cat"]);
		assert_eq!(vocabulary.id_of("the"), Some(0));
		assert_eq!(vocabulary.id_of("THE"), Some(0));
		assert_eq!(vocabulary.id_of(" Cat "), Some(1));
		assert_eq!(vocabulary.id_of("dog"), None);
		assert_eq!(vocabulary.id_of(""), None);
	}

	#[test]
	fn render_uses_placeholder_for_unknown_ids() {
		let vocabulary = Vocabulary::from_words(["a", "b"]);
		assert_eq!(vocabulary.render(&[0, 7, 1], "?"), "a ? b");
		assert_eq!(vocabulary.render(&[], "?"), "");
	}

	#[test]
	fn duplicate_word_keeps_first_id() {
		let vocabulary = Vocabulary::from_words(["x", "X", "y"]);
		assert_eq!(vocabulary.id_of("x"), Some(0));
		assert_eq!(vocabulary.id_of("y"), Some(2));
		assert_eq!(vocabulary.len(), 3);
	}
}
