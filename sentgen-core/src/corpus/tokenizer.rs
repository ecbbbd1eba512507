//! Plain-text sentence splitting and word normalization.

/// Splits raw text into sentences.
///
/// A sentence ends at a run of `.`, `!` or `?`, or at a blank line.
/// Single line breaks inside a paragraph are treated as spaces.
/// Returned sentences are trimmed and never empty.
pub fn split_sentences(text: &str) -> Vec<String> {
	let mut sentences = Vec::new();
	let mut current = String::new();

	for paragraph in text.split("\n\n").flat_map(|p| p.split("\r\n\r\n")) {
		let mut chars = paragraph.chars().peekable();
		while let Some(c) = chars.next() {
			if is_terminator(c) {
				while chars.peek().copied().is_some_and(is_terminator) {
					chars.next();
				}
				flush(&mut current, &mut sentences);
			} else if c == '\n' || c == '\r' {
				current.push(' ');
			} else {
				current.push(c);
			}
		}
		flush(&mut current, &mut sentences);
	}

	sentences
}

fn is_terminator(c: char) -> bool {
	matches!(c, '.' | '!' | '?')
}

fn flush(current: &mut String, sentences: &mut Vec<String>) {
	let trimmed = current.trim();
	if !trimmed.is_empty() {
		sentences.push(trimmed.to_owned());
	}
	current.clear();
}

/// Splits a sentence into normalized tokens.
///
/// Each whitespace-separated chunk loses its leading and trailing characters
/// that are not letters, digits or apostrophes, then is lowercased.
/// Chunks that end up empty are dropped.
pub fn tokenize(sentence: &str) -> Vec<String> {
	sentence
		.split_whitespace()
		.map(|raw| raw.trim_matches(|c: char| !is_word_char(c)))
		.filter(|token| !token.is_empty())
		.map(str::to_lowercase)
		.collect()
}

fn is_word_char(c: char) -> bool {
	c.is_alphanumeric() || c == '\''
}
