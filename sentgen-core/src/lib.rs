//! End-of-sentence aware n-gram sentence generation.
//!
//! This crate provides:
//! - Corpus import into frozen n-gram statistics and follower tables
//! - A backoff estimator of end-of-sentence (EOS) probabilities
//! - A three-feature logistic regression classifier with JSON persistence
//! - An EOS predictor combining the two
//! - Greedy and weighted generators over bigram and trigram contexts
//!
//! Typical flow: build a `Corpus`, train an `EosClassifier` on examples from
//! `FeatureBuilder`, wrap both in an `EosPredictor` and hand it to a
//! `Generator`.

/// Logistic regression EOS classifier and its JSON model file.
pub mod classifier;

/// TOML settings for generation and training.
pub mod config;

/// Text import into a shared, immutable corpus.
pub mod corpus;

/// Hierarchical backoff EOS probabilities.
pub mod estimator;

/// Classifier training examples from tokenized sentences.
pub mod features;

/// Sentence generators.
pub mod generator;

/// File and folder helpers.
pub mod io;

/// Feature extraction and calibrated EOS probability.
pub mod predictor;

/// Vocabulary, n-gram counts, hazard table and follower lists.
pub mod stats;

pub use classifier::{EosClassifier, Hyperparameters, ModelError, ModelParameters};
pub use config::Settings;
pub use corpus::{Corpus, CorpusBuilder, CorpusError};
pub use estimator::BackoffEstimator;
pub use features::FeatureBuilder;
pub use generator::{GenerationRequest, Generator, Strategy, Termination};
pub use predictor::EosPredictor;
