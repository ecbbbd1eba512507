use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};
use log::{info, warn};
use serde::Deserialize;

use sentgen_core::classifier::EosClassifier;
use sentgen_core::config::{GenerationSettings, Settings};
use sentgen_core::corpus::{Corpus, tokenizer};
use sentgen_core::generator::{GenerationRequest, Generator, Strategy};
use sentgen_core::io::{list_corpora, normalize_folder};
use sentgen_core::predictor::EosPredictor;

/// Query parameters of `/v1/generate`.
#[derive(Deserialize)]
struct GenerateParams {
	algo: Option<String>,
	/// Space or comma separated starting words
	seed: Option<String>,
	max_tokens: Option<usize>,
	stop: Option<String>,
}

#[derive(Deserialize)]
struct EosQuery {
	text: Option<String>,
}

#[derive(Deserialize)]
struct CorpusQuery {
	name: Option<String>,
}

/// The loaded corpus and, if a model sits next to it, the EOS predictor.
struct Loaded {
	name: String,
	corpus: Arc<Corpus>,
	predictor: Option<Arc<EosPredictor>>,
}

struct SharedData {
	data_dir: PathBuf,
	settings: GenerationSettings,
	loaded: Option<Loaded>,
}

impl GenerateParams {
	fn strategy(&self) -> Result<Strategy, String> {
		match &self.algo {
			None => Ok(Strategy::TrigramWeighted),
			Some(key) => key.parse(),
		}
	}

	fn request(&self, settings: &GenerationSettings) -> GenerationRequest {
		let seeds = self
			.seed
			.as_deref()
			.unwrap_or("")
			.split(|c: char| c == ',' || c.is_whitespace())
			.filter(|s| !s.is_empty())
			.map(str::to_owned);

		GenerationRequest::new(self.max_tokens.unwrap_or(settings.max_tokens))
			.with_seeds(seeds)
			.with_stop_word(self.stop.as_deref())
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates one sentence from the loaded corpus. The EOS predictor is used
/// when a model was found for the corpus.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let strategy = match query.strategy() {
		Ok(s) => s,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let (corpus, predictor, settings) = {
		let shared_data = match data.lock() {
			Ok(m) => m,
			Err(_) => return HttpResponse::InternalServerError().body("Corpus lock failed"),
		};
		match &shared_data.loaded {
			Some(loaded) => (Arc::clone(&loaded.corpus), loaded.predictor.clone(), shared_data.settings.clone()),
			None => return HttpResponse::Conflict().body("No corpus loaded"),
		}
	};

	let request = query.request(&settings);
	let mut generator = Generator::new(corpus, strategy).with_settings(settings);
	if let Some(predictor) = predictor {
		generator = generator.with_predictor(predictor);
	}

	HttpResponse::Ok().body(generator.generate(&request))
}

/// HTTP GET endpoint `/v1/eos`
///
/// Returns the end-of-sentence probability of `text` as a plain number.
#[get("/v1/eos")]
async fn get_eos(data: web::Data<Mutex<SharedData>>, query: web::Query<EosQuery>) -> impl Responder {
	let text = match &query.text {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty text"),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Corpus lock failed"),
	};
	let Some(loaded) = &shared_data.loaded else {
		return HttpResponse::Conflict().body("No corpus loaded");
	};
	let Some(predictor) = &loaded.predictor else {
		return HttpResponse::Conflict().body(format!("No EOS model for corpus '{}'", loaded.name));
	};

	let ids = loaded.corpus.encode(&tokenizer::tokenize(text));
	HttpResponse::Ok().body(format!("{:.6}", predictor.predict_eos_probability(&ids)))
}

#[get("/v1/corpora")]
async fn get_corpora(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let data_dir = match data.lock() {
		Ok(m) => m.data_dir.clone(),
		Err(_) => return HttpResponse::InternalServerError().body("Corpus lock failed"),
	};
	match list_corpora(&data_dir, "txt") {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list corpora"),
	}
}

/// HTTP PUT endpoint `/v1/load_corpus`
///
/// Loads `<data>/<name>.txt` (through its snapshot) and `<data>/<name>.json`
/// as EOS model when present, replacing the current corpus.
#[put("/v1/load_corpus")]
async fn put_corpus(data: web::Data<Mutex<SharedData>>, query: web::Query<CorpusQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim().to_owned(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};
	if name.contains(['/', '\\']) || name.contains("..") {
		return HttpResponse::BadRequest().body("Invalid corpus name");
	}

	let data_dir = match data.lock() {
		Ok(m) => m.data_dir.clone(),
		Err(_) => return HttpResponse::InternalServerError().body("Corpus lock failed"),
	};

	let corpus = match Corpus::from_text_file(data_dir.join(format!("{name}.txt"))) {
		Ok(c) => Arc::new(c),
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load corpus: {e}")),
	};

	let model_path = data_dir.join(format!("{name}.json"));
	let predictor = if model_path.exists() {
		match EosClassifier::load_model(&model_path) {
			Ok(classifier) => Some(Arc::new(EosPredictor::new(Arc::new(corpus.estimator()), Arc::new(classifier)))),
			Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load model: {e}")),
		}
	} else {
		warn!("No EOS model at {}, generating without it", model_path.display());
		None
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Corpus lock failed"),
	};
	info!("Loaded corpus '{}' ({} words)", name, corpus.vocabulary().len());
	shared_data.loaded = Some(Loaded { name, corpus, predictor });

	HttpResponse::Ok().body("Corpus loaded successfully")
}

/// Main entry point for the server.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000
/// - `SENTGEN_DATA` sets the corpus folder (default `./data`)
/// - `SENTGEN_SETTINGS` points to an optional settings TOML file
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let data_dir = normalize_folder(&std::env::var("SENTGEN_DATA").unwrap_or_else(|_| "./data".to_owned()));
	let settings = match std::env::var("SENTGEN_SETTINGS") {
		Ok(path) => Settings::load(&path).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?,
		Err(_) => Settings::default(),
	};

	let shared_data = SharedData { data_dir, settings: settings.generation, loaded: None };
	let shared_data = web::Data::new(Mutex::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_generated)
			.service(get_eos)
			.service(get_corpora)
			.service(put_corpus)
	})
	.bind(("127.0.0.1", 5000))?
	.run()
	.await
}
