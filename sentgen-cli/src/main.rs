use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;

use sentgen_core::classifier::EosClassifier;
use sentgen_core::config::Settings;
use sentgen_core::corpus::{Corpus, tokenizer};
use sentgen_core::features::FeatureBuilder;
use sentgen_core::generator::{GenerationRequest, Generator, Strategy};
use sentgen_core::predictor::EosPredictor;
use sentgen_core::{Hyperparameters, io};

#[derive(Parser)]
#[command(name = "sentgen", about = "EOS-aware n-gram sentence generator")]
struct Cli {
	/// Path to a settings TOML file (defaults are embedded)
	#[arg(long, global = true)]
	settings: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Import a text file and write its binary snapshot next to it
	Build {
		/// Path to the corpus text file
		text: PathBuf,
	},

	/// Train the EOS classifier on a corpus and save it as JSON
	Train {
		/// Path to the corpus text file
		text: PathBuf,
		/// Output path of the JSON model
		#[arg(long)]
		model: PathBuf,
		/// Continue from an existing model instead of starting from zero
		#[arg(long)]
		resume: bool,
	},

	/// Generate sentences
	Generate {
		/// Path to the corpus text file
		text: PathBuf,
		/// JSON model enabling the dynamic end-of-sentence stop
		#[arg(long)]
		model: Option<PathBuf>,
		/// bi_greedy, bi_weighted, tri_greedy or tri_weighted
		#[arg(long, default_value = "tri_weighted")]
		algo: Strategy,
		/// Starting word (repeat for a trigram context)
		#[arg(long = "seed")]
		seeds: Vec<String>,
		/// Maximum number of tokens
		#[arg(long)]
		max: Option<usize>,
		/// Stop right after this word
		#[arg(long)]
		stop: Option<String>,
		/// Seed of the random source, for reproducible output
		#[arg(long)]
		rng_seed: Option<u64>,
		/// Number of sentences to generate
		#[arg(short, long, default_value = "1")]
		n: usize,
	},

	/// Print the EOS probability of every prefix of a sentence
	Eos {
		/// Path to the corpus text file
		text: PathBuf,
		/// JSON model
		#[arg(long)]
		model: PathBuf,
		/// Sentence to score
		sentence: String,
	},
}

fn load_predictor(corpus: &Corpus, model: &Path) -> Result<Arc<EosPredictor>, Box<dyn std::error::Error>> {
	let classifier = EosClassifier::load_model(model)?;
	Ok(Arc::new(EosPredictor::new(Arc::new(corpus.estimator()), Arc::new(classifier))))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let cli = Cli::parse();
	let settings = match &cli.settings {
		Some(path) => Settings::load(path)?,
		None => Settings::default(),
	};

	match cli.command {
		Command::Build { text } => {
			let corpus = Corpus::from_text_file(&text)?;
			println!(
				"{}: {} sentences, {} words, {} bigram contexts, {} trigram contexts",
				corpus.name().unwrap_or("corpus"),
				corpus.sentence_count(),
				corpus.vocabulary().len(),
				corpus.followers().bigram_context_count(),
				corpus.followers().trigram_context_count(),
			);
		}

		Command::Train { text, model, resume } => {
			let corpus = Corpus::from_text_file(&text)?;
			let raw = io::read_text(&text)?;
			let examples = FeatureBuilder::new(&corpus).text_examples(&raw);
			info!("Training on {} examples", examples.len());

			let hyper = Hyperparameters::from(&settings.training);
			let mut classifier = if resume && model.exists() {
				let loaded = EosClassifier::load_model(&model)?;
				EosClassifier::with_parameters(*loaded.parameters(), hyper)
			} else {
				EosClassifier::new(hyper)
			};

			let report = classifier.fit(&examples)?;
			println!(
				"{:?} after {} epochs, loss={:.6} (best {:.6})",
				report.state, report.epochs, report.loss, report.best_loss
			);
			classifier.save_model(&model)?;
		}

		Command::Generate { text, model, algo, seeds, max, stop, rng_seed, n } => {
			let corpus = Arc::new(Corpus::from_text_file(&text)?);
			let mut generator = Generator::new(Arc::clone(&corpus), algo).with_settings(settings.generation.clone());
			if let Some(path) = &model {
				generator = generator.with_predictor(load_predictor(&corpus, path)?);
			}
			if let Some(seed) = rng_seed {
				generator = generator.with_seed(seed);
			}

			let request = GenerationRequest::new(max.unwrap_or(settings.generation.max_tokens))
				.with_seeds(seeds)
				.with_stop_word(stop.as_deref());
			for _ in 0..n {
				println!("{}", generator.generate(&request));
			}
		}

		Command::Eos { text, model, sentence } => {
			let corpus = Corpus::from_text_file(&text)?;
			let predictor = load_predictor(&corpus, &model)?;
			let tokens = tokenizer::tokenize(&sentence);
			let ids = corpus.encode(&tokens);
			for end in 1..=ids.len() {
				let prefix = &ids[..end];
				println!(
					"{:<40} {:.4}",
					corpus.vocabulary().render(prefix, &settings.generation.placeholder),
					predictor.predict_eos_probability(prefix)
				);
			}
		}
	}

	Ok(())
}
