//! Logistic-regression classifier fusing three log-odds features into one
//! end-of-sentence probability.
//!
//! The classifier learns a bias `b` and weights `w1, w2, w3` for the
//! features:
//! - `x1`: logit of P(EOS | context)
//! - `x2`: logit of P(EOS | word)
//! - `x3`: logit of P(EOS | length)
//!
//! Training is full-batch gradient descent on the mean binary cross-entropy
//! with optional L2 regularization (weights only) and early stopping.

use log::info;

/// Flat JSON persistence of the learned parameters.
mod persistence;

pub use persistence::ModelError;

/// Inputs below this map to probability 0, above its negation to 1.
const SIGMOID_CLAMP: f64 = 40.0;

/// Probabilities are clamped to `[LOSS_EPSILON, 1 - LOSS_EPSILON]` before the log.
const LOSS_EPSILON: f64 = 1e-12;

/// Errors raised by training.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ClassifierError {
	#[error("cannot train or evaluate on an empty example set")]
	EmptyDataset,

	#[error("example {index} has a non-finite feature")]
	NonFiniteFeature { index: usize },
}

/// The three classifier inputs.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Features {
	/// Logit of P(EOS | context).
	pub x1: f64,
	/// Logit of P(EOS | word).
	pub x2: f64,
	/// Logit of P(EOS | length).
	pub x3: f64,
}

impl Features {
	pub fn new(x1: f64, x2: f64, x3: f64) -> Self {
		Self { x1, x2, x3 }
	}

	fn is_finite(&self) -> bool {
		self.x1.is_finite() && self.x2.is_finite() && self.x3.is_finite()
	}
}

/// A labelled training example.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Example {
	pub features: Features,
	/// `true` when the token ends the sentence.
	pub label: bool,
}

impl Example {
	pub fn new(x1: f64, x2: f64, x3: f64, label: bool) -> Self {
		Self { features: Features::new(x1, x2, x3), label }
	}

	fn target(&self) -> f64 {
		if self.label { 1.0 } else { 0.0 }
	}
}

/// Learned parameters: bias plus one weight per feature.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ModelParameters {
	pub b: f64,
	pub w1: f64,
	pub w2: f64,
	pub w3: f64,
}

/// Early stopping rule.
///
/// Training stops once the loss has failed to improve by more than
/// `min_delta` for more than `patience` consecutive epochs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EarlyStopping {
	pub patience: usize,
	pub min_delta: f64,
}

impl Default for EarlyStopping {
	fn default() -> Self {
		Self { patience: 2000, min_delta: 1e-6 }
	}
}

/// Training configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hyperparameters {
	pub learning_rate: f64,
	pub max_epochs: usize,
	/// L2 penalty applied to `w1..w3`, never to the bias.
	pub lambda_l2: f64,
	pub early_stopping: Option<EarlyStopping>,
	/// Stop as `Converged` when the loss changes by less than this between epochs.
	pub convergence_tolerance: Option<f64>,
	/// Log the loss every `log_every` epochs (0 disables progress logs).
	pub log_every: usize,
}

impl Default for Hyperparameters {
	fn default() -> Self {
		Self {
			learning_rate: 0.01,
			max_epochs: 10_000,
			lambda_l2: 0.0,
			early_stopping: Some(EarlyStopping::default()),
			convergence_tolerance: None,
			log_every: 500,
		}
	}
}

/// Where a training run ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainingState {
	Training,
	/// Loss plateaued within `convergence_tolerance`.
	Converged,
	/// Early stopping patience ran out.
	EarlyStopped,
	/// `max_epochs` reached.
	Exhausted,
}

/// Summary of a `fit` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingReport {
	pub state: TrainingState,
	/// Number of completed epochs.
	pub epochs: usize,
	/// Mean binary cross-entropy after the last update.
	pub loss: f64,
	pub best_loss: f64,
}

/// Numerically clamped logistic function.
pub fn sigmoid(z: f64) -> f64 {
	if z < -SIGMOID_CLAMP {
		0.0
	} else if z > SIGMOID_CLAMP {
		1.0
	} else {
		1.0 / (1.0 + (-z).exp())
	}
}

/// Binary end-of-sentence classifier.
///
/// # Responsibilities
/// - Evaluate `sigmoid(b + w1·x1 + w2·x2 + w3·x3)`
/// - Fit the parameters on labelled examples
/// - Save / load the parameters as a flat record
///
/// # Invariants
/// - Parameters only change inside `fit`
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EosClassifier {
	params: ModelParameters,
	hyper: Hyperparameters,
}

impl EosClassifier {
	/// Untrained classifier (all parameters zero, predicts 0.5 everywhere).
	pub fn new(hyper: Hyperparameters) -> Self {
		Self { params: ModelParameters::default(), hyper }
	}

	pub fn with_parameters(params: ModelParameters, hyper: Hyperparameters) -> Self {
		Self { params, hyper }
	}

	pub fn parameters(&self) -> &ModelParameters {
		&self.params
	}

	pub fn hyperparameters(&self) -> &Hyperparameters {
		&self.hyper
	}

	/// Probability of end-of-sentence for the given features. Never fails.
	pub fn predict(&self, x1: f64, x2: f64, x3: f64) -> f64 {
		let p = &self.params;
		sigmoid(p.b + p.w1 * x1 + p.w2 * x2 + p.w3 * x3)
	}

	pub fn predict_features(&self, features: &Features) -> f64 {
		self.predict(features.x1, features.x2, features.x3)
	}

	/// Mean binary cross-entropy over `examples`.
	///
	/// # Errors
	/// Returns `ClassifierError::EmptyDataset` if `examples` is empty.
	pub fn total_loss(&self, examples: &[Example]) -> Result<f64, ClassifierError> {
		if examples.is_empty() {
			return Err(ClassifierError::EmptyDataset);
		}
		Ok(self.mean_loss(examples))
	}

	fn mean_loss(&self, examples: &[Example]) -> f64 {
		let sum: f64 = examples
			.iter()
			.map(|example| {
				let p = self.predict_features(&example.features).clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
				let y = example.target();
				-(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
			})
			.sum();
		sum / examples.len() as f64
	}

	/// Fits the parameters with full-batch gradient descent.
	///
	/// Each epoch:
	/// - averages `error = prediction - label` (times the feature for each weight)
	///   over all examples
	/// - adds `lambda_l2 · w` to each weight gradient
	/// - applies `param -= learning_rate · gradient`
	/// - recomputes the mean loss and checks the stopping rules
	///
	/// Training continues from the current parameters, so repeated calls refine
	/// an existing model.
	///
	/// # Errors
	/// - `ClassifierError::EmptyDataset` if `examples` is empty
	/// - `ClassifierError::NonFiniteFeature` if any feature is NaN or infinite
	pub fn fit(&mut self, examples: &[Example]) -> Result<TrainingReport, ClassifierError> {
		if examples.is_empty() {
			return Err(ClassifierError::EmptyDataset);
		}
		if let Some(index) = examples.iter().position(|e| !e.features.is_finite()) {
			return Err(ClassifierError::NonFiniteFeature { index });
		}

		let hyper = self.hyper;
		let n = examples.len() as f64;

		let mut state = TrainingState::Training;
		let mut best_loss = f64::MAX;
		let mut previous_loss = f64::MAX;
		let mut epochs_since_improvement = 0usize;
		let mut loss = self.mean_loss(examples);
		let mut epochs = 0usize;

		while state == TrainingState::Training {
			if epochs >= hyper.max_epochs {
				state = TrainingState::Exhausted;
				break;
			}

			let (mut db, mut dw1, mut dw2, mut dw3) = (0.0, 0.0, 0.0, 0.0);
			for example in examples {
				let f = &example.features;
				let error = self.predict_features(f) - example.target();
				db += error;
				dw1 += error * f.x1;
				dw2 += error * f.x2;
				dw3 += error * f.x3;
			}
			db /= n;
			dw1 = dw1 / n + hyper.lambda_l2 * self.params.w1;
			dw2 = dw2 / n + hyper.lambda_l2 * self.params.w2;
			dw3 = dw3 / n + hyper.lambda_l2 * self.params.w3;

			self.params.b -= hyper.learning_rate * db;
			self.params.w1 -= hyper.learning_rate * dw1;
			self.params.w2 -= hyper.learning_rate * dw2;
			self.params.w3 -= hyper.learning_rate * dw3;

			loss = self.mean_loss(examples);
			if hyper.log_every > 0 && epochs % hyper.log_every == 0 {
				info!("Epoch {} - loss={:.6}", epochs, loss);
			}
			epochs += 1;

			if let Some(tolerance) = hyper.convergence_tolerance {
				if (previous_loss - loss).abs() < tolerance {
					state = TrainingState::Converged;
				}
			}
			previous_loss = loss;

			if let Some(rule) = hyper.early_stopping {
				if best_loss - loss > rule.min_delta {
					best_loss = loss;
					epochs_since_improvement = 0;
				} else {
					epochs_since_improvement += 1;
					if epochs_since_improvement > rule.patience && state == TrainingState::Training {
						info!("Early stopping triggered at epoch {}", epochs - 1);
						state = TrainingState::EarlyStopped;
					}
				}
			} else {
				best_loss = best_loss.min(loss);
			}
		}

		Ok(TrainingReport { state, epochs, loss, best_loss: best_loss.min(loss) })
	}
}
