use std::fs;
use std::io;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::{EarlyStopping, EosClassifier, Hyperparameters, ModelParameters};

/// Errors raised while reading or writing a model file.
///
/// Any of these at load time means the model is unusable; required fields
/// are never silently defaulted.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),

	#[error("malformed model record: {0}")]
	Json(#[from] serde_json::Error),

	#[error("model record is missing required field '{0}'")]
	MissingField(&'static str),

	#[error("invalid value for {field}: {reason}")]
	InvalidField { field: &'static str, reason: String },
}

/// On-disk layout: a flat JSON object.
///
/// `b, w1, w2, w3` are required; hyperparameters are optional and fall back
/// to `Hyperparameters::default()`.
#[derive(Serialize, Deserialize, Debug, Default)]
struct ModelRecord {
	b: Option<f64>,
	w1: Option<f64>,
	w2: Option<f64>,
	w3: Option<f64>,
	#[serde(rename = "learningRate", skip_serializing_if = "Option::is_none")]
	learning_rate: Option<f64>,
	#[serde(rename = "lambdaL2", skip_serializing_if = "Option::is_none")]
	lambda_l2: Option<f64>,
	#[serde(rename = "maxEpochs", skip_serializing_if = "Option::is_none")]
	max_epochs: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	patience: Option<usize>,
	#[serde(rename = "minDelta", skip_serializing_if = "Option::is_none")]
	min_delta: Option<f64>,
}

fn required(value: Option<f64>, field: &'static str) -> Result<f64, ModelError> {
	let value = value.ok_or(ModelError::MissingField(field))?;
	if !value.is_finite() {
		return Err(ModelError::InvalidField { field, reason: "must be finite".to_owned() });
	}
	Ok(value)
}

impl From<&EosClassifier> for ModelRecord {
	fn from(model: &EosClassifier) -> Self {
		let p = &model.params;
		let h = &model.hyper;
		Self {
			b: Some(p.b),
			w1: Some(p.w1),
			w2: Some(p.w2),
			w3: Some(p.w3),
			learning_rate: Some(h.learning_rate),
			lambda_l2: Some(h.lambda_l2),
			max_epochs: Some(h.max_epochs),
			patience: h.early_stopping.map(|rule| rule.patience),
			min_delta: h.early_stopping.map(|rule| rule.min_delta),
		}
	}
}

impl TryFrom<ModelRecord> for EosClassifier {
	type Error = ModelError;

	fn try_from(record: ModelRecord) -> Result<Self, Self::Error> {
		let params = ModelParameters {
			b: required(record.b, "b")?,
			w1: required(record.w1, "w1")?,
			w2: required(record.w2, "w2")?,
			w3: required(record.w3, "w3")?,
		};

		let defaults = Hyperparameters::default();
		let learning_rate = record.learning_rate.unwrap_or(defaults.learning_rate);
		if !(learning_rate > 0.0 && learning_rate.is_finite()) {
			return Err(ModelError::InvalidField { field: "learningRate", reason: "must be positive".to_owned() });
		}
		let lambda_l2 = record.lambda_l2.unwrap_or(defaults.lambda_l2);
		if !(lambda_l2 >= 0.0 && lambda_l2.is_finite()) {
			return Err(ModelError::InvalidField { field: "lambdaL2", reason: "must be non-negative".to_owned() });
		}

		let early_stopping = match (record.patience, record.min_delta) {
			(None, None) => defaults.early_stopping,
			(patience, min_delta) => {
				let base = EarlyStopping::default();
				Some(EarlyStopping {
					patience: patience.unwrap_or(base.patience),
					min_delta: min_delta.unwrap_or(base.min_delta),
				})
			}
		};

		let hyper = Hyperparameters {
			learning_rate,
			lambda_l2,
			max_epochs: record.max_epochs.unwrap_or(defaults.max_epochs),
			early_stopping,
			..defaults
		};

		Ok(EosClassifier::with_parameters(params, hyper))
	}
}

impl EosClassifier {
	/// Serializes the parameters and hyperparameters as pretty-printed JSON.
	///
	/// # Errors
	/// Returns `ModelError::Json` if serialization fails.
	pub fn to_json(&self) -> Result<String, ModelError> {
		Ok(serde_json::to_string_pretty(&ModelRecord::from(self))?)
	}

	/// Parses a model record.
	///
	/// # Errors
	/// - `ModelError::Json` for malformed JSON or a non-numeric field
	/// - `ModelError::MissingField` when `b`, `w1`, `w2` or `w3` is absent
	/// - `ModelError::InvalidField` for out-of-range hyperparameters
	pub fn from_json(json: &str) -> Result<Self, ModelError> {
		let record: ModelRecord = serde_json::from_str(json)?;
		Self::try_from(record)
	}

	/// Writes the model to `path`, creating parent directories if needed.
	pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
		let path = path.as_ref();
		info!("Saving model at {}", path.display());
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}
		fs::write(path, self.to_json()?)?;
		Ok(())
	}

	/// Reads a model previously written by `save_model`.
	pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
		let json = fs::read_to_string(path)?;
		Self::from_json(&json)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_round_trip_is_exact() {
		let params = ModelParameters { b: -4.542336316034540, w1: 0.1 + 0.2, w2: 1e-300, w3: -7.25 };
		let model = EosClassifier::with_parameters(params, Hyperparameters::default());
		let restored = EosClassifier::from_json(&model.to_json().unwrap()).unwrap();

		assert_eq!(restored.parameters().b.to_bits(), params.b.to_bits());
		assert_eq!(restored.parameters().w1.to_bits(), params.w1.to_bits());
		assert_eq!(restored.parameters().w2.to_bits(), params.w2.to_bits());
		assert_eq!(restored.parameters().w3.to_bits(), params.w3.to_bits());
		assert_eq!(restored.hyperparameters(), model.hyperparameters());
	}

	#[test]
	fn writes_the_flat_field_names() {
		let json = EosClassifier::default().to_json().unwrap();
		let value: serde_json::Value = serde_json::from_str(&json).unwrap();
		for field in ["b", "w1", "w2", "w3", "learningRate", "lambdaL2"] {
			assert!(value.get(field).is_some(), "missing {field}");
		}
	}

	#[test]
	fn missing_required_field_is_an_error() {
		let err = EosClassifier::from_json(r#"{"b": 0.1, "w1": 1.0, "w3": 2.0}"#).unwrap_err();
		assert!(matches!(err, ModelError::MissingField("w2")));
	}

	#[test]
	fn non_numeric_field_is_an_error() {
		let err = EosClassifier::from_json(r#"{"b": "zero", "w1": 1.0, "w2": 1.0, "w3": 2.0}"#).unwrap_err();
		assert!(matches!(err, ModelError::Json(_)));
	}

	#[test]
	fn optional_fields_default() {
		let model = EosClassifier::from_json(r#"{"b": 0.5, "w1": 1.0, "w2": 2.0, "w3": 3.0}"#).unwrap();
		assert_eq!(*model.hyperparameters(), Hyperparameters::default());
		assert_eq!(model.parameters().w3, 3.0);
	}

	#[test]
	fn reads_optional_hyperparameters() {
		let json = r#"{"b": 0, "w1": 0, "w2": 0, "w3": 0, "learningRate": 0.2, "lambdaL2": 0.01}"#;
		let model = EosClassifier::from_json(json).unwrap();
		assert_eq!(model.hyperparameters().learning_rate, 0.2);
		assert_eq!(model.hyperparameters().lambda_l2, 0.01);
	}

	#[test]
	fn rejects_non_positive_learning_rate() {
		let json = r#"{"b": 0, "w1": 0, "w2": 0, "w3": 0, "learningRate": 0.0}"#;
		assert!(matches!(
			EosClassifier::from_json(json),
			Err(ModelError::InvalidField { field: "learningRate", .. })
		));
	}
}
