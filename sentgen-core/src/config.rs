//! Settings loaded from TOML.
//!
//! - `Settings::default()` parses the embedded `default_settings.toml`
//! - `Settings::from_toml_str` / `Settings::load` read a custom file
//!
//! Settings are plain values handed to the components that need them;
//! there is no process-wide instance.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::classifier::{EarlyStopping, Hyperparameters};

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("TOML parse error: {0}")]
	Parse(String),
	#[error("invalid value for {field}: {reason}")]
	InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
	pub generation: GenerationSettings,
	pub training: TrainingSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GenerationSettings {
	pub max_tokens: usize,
	pub eos_threshold: f64,
	pub max_attempts: usize,
	pub placeholder: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrainingSettings {
	pub learning_rate: f64,
	pub max_epochs: usize,
	pub lambda_l2: f64,
	pub early_stopping: bool,
	pub patience: usize,
	pub min_delta: f64,
	#[serde(default)]
	pub log_every: usize,
}

impl Default for Settings {
	fn default() -> Self {
		Self::from_toml_str(DEFAULT_SETTINGS_TOML).expect("embedded settings TOML must be valid")
	}
}

impl Settings {
	/// Parses and validates settings.
	///
	/// # Errors
	/// - `SettingsError::Parse` for malformed TOML or missing sections
	/// - `SettingsError::InvalidValue` for out-of-range values
	pub fn from_toml_str(toml_str: &str) -> Result<Self, SettingsError> {
		let settings: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
		settings.validate()?;
		Ok(settings)
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
		let content = fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	fn validate(&self) -> Result<(), SettingsError> {
		let g = &self.generation;
		let t = &self.training;

		ensure(g.max_tokens >= 1, "generation.max_tokens", "must be at least 1")?;
		ensure((0.0..=1.0).contains(&g.eos_threshold), "generation.eos_threshold", "must be in [0, 1]")?;
		ensure(g.max_attempts >= 1, "generation.max_attempts", "must be at least 1")?;
		ensure(
			t.learning_rate > 0.0 && t.learning_rate.is_finite(),
			"training.learning_rate",
			"must be positive",
		)?;
		ensure(t.lambda_l2 >= 0.0 && t.lambda_l2.is_finite(), "training.lambda_l2", "must be non-negative")?;
		ensure(t.min_delta >= 0.0 && t.min_delta.is_finite(), "training.min_delta", "must be non-negative")?;
		Ok(())
	}
}

fn ensure(condition: bool, field: &str, reason: &str) -> Result<(), SettingsError> {
	if condition {
		Ok(())
	} else {
		Err(SettingsError::InvalidValue { field: field.to_owned(), reason: reason.to_owned() })
	}
}

impl From<&TrainingSettings> for Hyperparameters {
	fn from(t: &TrainingSettings) -> Self {
		Self {
			learning_rate: t.learning_rate,
			max_epochs: t.max_epochs,
			lambda_l2: t.lambda_l2,
			early_stopping: t
				.early_stopping
				.then_some(EarlyStopping { patience: t.patience, min_delta: t.min_delta }),
			convergence_tolerance: None,
			log_every: t.log_every,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn embedded_defaults_parse() {
		let settings = Settings::from_toml_str(DEFAULT_SETTINGS_TOML).unwrap();
		assert_eq!(settings.generation.max_tokens, 1000);
		assert_eq!(settings.generation.eos_threshold, 0.5);
		assert_eq!(settings.generation.max_attempts, 10);
		assert_eq!(settings.generation.placeholder, "?");
	}

	#[test]
	fn training_defaults_match_hyperparameter_defaults() {
		let settings = Settings::default();
		assert_eq!(Hyperparameters::from(&settings.training), Hyperparameters::default());
	}

	#[test]
	fn rejects_threshold_out_of_range() {
		let toml = DEFAULT_SETTINGS_TOML.replace("eos_threshold = 0.5", "eos_threshold = 1.5");
		let err = Settings::from_toml_str(&toml).unwrap_err();
		assert!(matches!(err, SettingsError::InvalidValue { ref field, .. } if field == "generation.eos_threshold"));
	}

	#[test]
	fn rejects_zero_max_tokens() {
		let toml = DEFAULT_SETTINGS_TOML.replace("max_tokens = 1000", "max_tokens = 0");
		assert!(Settings::from_toml_str(&toml).is_err());
	}

	#[test]
	fn missing_section_is_a_parse_error() {
		let err = Settings::from_toml_str("[generation]\nmax_tokens = 5\n").unwrap_err();
		assert!(matches!(err, SettingsError::Parse(_)));
	}

	#[test]
	fn disabling_early_stopping_clears_the_rule() {
		let toml = DEFAULT_SETTINGS_TOML.replace("early_stopping = true", "early_stopping = false");
		let settings = Settings::from_toml_str(&toml).unwrap();
		assert_eq!(Hyperparameters::from(&settings.training).early_stopping, None);
	}
}
