use std::sync::Arc;

use sentgen_core::corpus::Corpus;
use sentgen_core::generator::{GenerationRequest, Generator, Strategy, Termination};

fn corpus(text: &str) -> Arc<Corpus> {
	Arc::new(Corpus::from_text(text).unwrap())
}

fn count_endings(corpus: Arc<Corpus>, strategy: Strategy, seeds: &[&str], wanted: &str) -> usize {
	let mut generator = Generator::new(corpus, strategy).with_seed(2024);
	let request = GenerationRequest::new(seeds.len() + 1).with_seeds(seeds.iter().copied());
	(0..10_000)
		.filter(|_| generator.generate(&request).ends_with(wanted))
		.count()
}

#[test]
fn bigram_weighted_follows_counts() {
	let corpus = corpus("x y. x y. x y. x z.");
	let hits = count_endings(corpus, Strategy::BigramWeighted, &["x"], " y");
	assert!((6_750..=8_250).contains(&hits), "hits {hits}");
}

#[test]
fn trigram_weighted_follows_counts() {
	let corpus = corpus("w x y. w x y. w x y. w x z.");
	let hits = count_endings(corpus, Strategy::TrigramWeighted, &["w", "x"], " y");
	assert!((6_750..=8_250).contains(&hits), "hits {hits}");
}

#[test]
fn greedy_is_deterministic() {
	let corpus = corpus("the cat sat on the mat. the cat ran. a dog sat on the rug.");
	for strategy in [Strategy::BigramGreedy, Strategy::TrigramGreedy] {
		let first = Generator::new(Arc::clone(&corpus), strategy).generate_sentence();
		for _ in 0..5 {
			assert_eq!(Generator::new(Arc::clone(&corpus), strategy).generate_sentence(), first);
		}
	}
}

#[test]
fn two_word_cycle_terminates() {
	let corpus = corpus("a b a b a b.");
	for strategy in Strategy::ALL {
		let mut generator = Generator::new(Arc::clone(&corpus), strategy).with_seed(3);
		for _ in 0..50 {
			let generation = generator.generate_detailed(&GenerationRequest::new(1000));
			assert!(generation.ids.len() <= 3, "{strategy}: {}", generation.text);
			assert_ne!(generation.termination, Termination::MaxTokens);
		}
	}
}

#[test]
fn output_stays_within_the_token_cap() {
	let text = "one two three four five six seven eight nine ten. ten nine eight seven six five four three two one.";
	let corpus = corpus(text);
	for strategy in Strategy::ALL {
		let mut generator = Generator::new(Arc::clone(&corpus), strategy).with_seed(11);
		for max_tokens in [1, 2, 3, 5, 8] {
			let text = generator.generate_sentence_with(max_tokens, None);
			let words = text.split(' ').count();
			assert!(words <= max_tokens.max(strategy.arity().size()), "{strategy} {max_tokens}: {text}");
		}
	}
}

#[test]
fn every_word_comes_from_the_vocabulary() {
	let corpus = corpus("The quick brown fox jumps over the lazy dog. The dog sleeps. A fox runs over the hill!");
	for strategy in Strategy::ALL {
		let mut generator = Generator::new(Arc::clone(&corpus), strategy).with_seed(5);
		for _ in 0..100 {
			for word in generator.generate_sentence().split(' ') {
				assert!(corpus.vocabulary().id_of(word).is_some(), "{strategy}: {word}");
			}
		}
	}
}

#[test]
fn generators_share_a_corpus_across_threads() {
	let corpus = corpus("the cat sat on the mat. the dog sat on the rug.");
	let handles: Vec<_> = Strategy::ALL
		.into_iter()
		.enumerate()
		.map(|(i, strategy)| {
			let mut generator = Generator::new(Arc::clone(&corpus), strategy).with_seed(i as u64);
			std::thread::spawn(move || generator.generate_sentence())
		})
		.collect();

	for handle in handles {
		assert!(!handle.join().unwrap().is_empty());
	}
}
