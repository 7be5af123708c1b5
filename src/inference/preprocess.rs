//! Feature Preprocessor
//!
//! Tabular model input is built in two blocks:
//!
//! 1. Seven numeric columns in training order `[N, P, K, temperature,
//!    humidity, ph, rainfall]`, standard-scaled with `(x - mean) / scale`.
//! 2. A one-hot block for one categorical value (soil type or crop label).
//!
//! The scaler and encoders are JSON exports of the training-time artifacts.
//! Column order and vocabulary must match training exactly, so loading
//! rejects a scaler whose feature names differ from the fixed order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

/// Numeric column order expected by every tabular model
pub const NUMERIC_FEATURES: [&str; 7] = ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("unknown category '{value}' (expected one of: {known})")]
    UnknownCategory { value: String, known: String },
    #[error("invalid preprocessing artifact: {0}")]
    InvalidArtifact(String),
    #[error("failed to parse preprocessing artifact: {0}")]
    Json(#[from] serde_json::Error),
}

fn read_artifact(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read artifact: {:?}", path))
}

// ============================================================================
// Numeric features
// ============================================================================

/// Raw numeric inputs for one prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericFeatures {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl NumericFeatures {
    /// Values in `NUMERIC_FEATURES` order
    pub fn to_array(&self) -> [f64; 7] {
        [
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ScalerFile {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; 7],
    scale: [f64; 7],
}

impl StandardScaler {
    pub fn new(mean: [f64; 7], scale: [f64; 7]) -> Result<Self, PreprocessError> {
        if mean.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(PreprocessError::InvalidArtifact(
                "scaler mean/scale must be finite".to_string(),
            ));
        }
        Ok(Self { mean, scale })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json_str(&read_artifact(path)?)
            .with_context(|| format!("Invalid scaler: {:?}", path))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, PreprocessError> {
        let file: ScalerFile = serde_json::from_str(contents)?;

        let names_match = file.feature_names.len() == NUMERIC_FEATURES.len()
            && file
                .feature_names
                .iter()
                .zip(NUMERIC_FEATURES)
                .all(|(name, expected)| name == expected);
        if !names_match {
            return Err(PreprocessError::InvalidArtifact(format!(
                "scaler feature order {:?} does not match {:?}",
                file.feature_names, NUMERIC_FEATURES
            )));
        }

        let mean: [f64; 7] = file.mean.try_into().map_err(|v: Vec<f64>| {
            PreprocessError::InvalidArtifact(format!("scaler mean has {} values, expected 7", v.len()))
        })?;
        let scale: [f64; 7] = file.scale.try_into().map_err(|v: Vec<f64>| {
            PreprocessError::InvalidArtifact(format!("scaler scale has {} values, expected 7", v.len()))
        })?;

        Self::new(mean, scale)
    }

    pub fn transform(&self, features: &NumericFeatures) -> [f32; 7] {
        let raw = features.to_array();
        let mut scaled = [0.0f32; 7];
        for i in 0..7 {
            // Constant training columns carry scale 0
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            scaled[i] = ((raw[i] - self.mean[i]) / scale) as f32;
        }
        scaled
    }
}

// ============================================================================
// Categorical features
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Unseen categories encode as an all-zero block
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<String>,
    #[serde(default)]
    handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    pub fn new(categories: Vec<String>, handle_unknown: HandleUnknown) -> Result<Self, PreprocessError> {
        if categories.is_empty() {
            return Err(PreprocessError::InvalidArtifact("encoder has no categories".to_string()));
        }
        Ok(Self {
            categories,
            handle_unknown,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json_str(&read_artifact(path)?)
            .with_context(|| format!("Invalid encoder: {:?}", path))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, PreprocessError> {
        let raw: OneHotEncoder = serde_json::from_str(contents)?;
        Self::new(raw.categories, raw.handle_unknown)
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Index of `value`: exact match after trimming, then case-insensitive
    fn position(&self, value: &str) -> Option<usize> {
        let value = value.trim();
        self.categories
            .iter()
            .position(|c| c == value)
            .or_else(|| self.categories.iter().position(|c| c.eq_ignore_ascii_case(value)))
    }

    pub fn encode(&self, value: &str) -> Result<Vec<f32>, PreprocessError> {
        let mut block = vec![0.0f32; self.width()];
        match (self.position(value), self.handle_unknown) {
            (Some(index), _) => block[index] = 1.0,
            (None, HandleUnknown::Ignore) => {}
            (None, HandleUnknown::Error) => {
                return Err(PreprocessError::UnknownCategory {
                    value: value.to_string(),
                    known: self.categories.join(", "),
                })
            }
        }
        Ok(block)
    }
}

/// Class index → label, as exported from the training label encoder
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let encoder: LabelEncoder = serde_json::from_str(&read_artifact(path)?)
            .with_context(|| format!("Invalid label encoder: {:?}", path))?;
        if encoder.classes.is_empty() {
            anyhow::bail!("Label encoder {:?} has no classes", path);
        }
        Ok(encoder)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

// ============================================================================
// Combined pipeline
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePreprocessor {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl FeaturePreprocessor {
    pub fn new(scaler: StandardScaler, encoder: OneHotEncoder) -> Self {
        Self { scaler, encoder }
    }

    pub fn load(scaler_path: &Path, encoder_path: &Path) -> Result<Self> {
        Ok(Self::new(StandardScaler::load(scaler_path)?, OneHotEncoder::load(encoder_path)?))
    }

    /// 7 scaled numerics followed by the one-hot block
    pub fn width(&self) -> usize {
        NUMERIC_FEATURES.len() + self.encoder.width()
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn transform(&self, features: &NumericFeatures, category: &str) -> Result<Vec<f32>, PreprocessError> {
        let mut row = Vec::with_capacity(self.width());
        row.extend_from_slice(&self.scaler.transform(features));
        row.extend(self.encoder.encode(category)?);
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SCALER: &str = r#"{
        "feature_names": ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"],
        "mean": [50.0, 53.0, 48.0, 25.6, 71.5, 6.5, 103.5],
        "scale": [36.9, 32.9, 50.6, 5.1, 22.3, 0.77, 54.9]
    }"#;

    const SOIL_ENCODER: &str = r#"{
        "categories": ["Alluvial", "Black", "Clay", "Laterite", "Red"],
        "handle_unknown": "error"
    }"#;

    fn sample() -> NumericFeatures {
        NumericFeatures {
            nitrogen: 90.0,
            phosphorus: 42.0,
            potassium: 43.0,
            temperature: 20.5,
            humidity: 58.0,
            ph: 6.5,
            rainfall: 18.0,
        }
    }

    fn preprocessor() -> FeaturePreprocessor {
        FeaturePreprocessor::new(
            StandardScaler::from_json_str(SCALER).unwrap(),
            OneHotEncoder::from_json_str(SOIL_ENCODER).unwrap(),
        )
    }

    #[test]
    fn test_transform_matches_fixed_vector() {
        let row = preprocessor().transform(&sample(), "Black").unwrap();
        let expected: [f32; 12] = [
            (90.0 - 50.0) / 36.9,
            (42.0 - 53.0) / 32.9,
            (43.0 - 48.0) / 50.6,
            (20.5 - 25.6) / 5.1,
            (58.0 - 71.5) / 22.3,
            0.0,
            (18.0 - 103.5) / 54.9,
            0.0,
            1.0,
            0.0,
            0.0,
            0.0,
        ];
        assert_eq!(row.len(), 12);
        for (actual, expected) in row.iter().zip(expected) {
            assert_abs_diff_eq!(*actual, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let preprocessor = preprocessor();
        let first = preprocessor.transform(&sample(), "Red").unwrap();
        for _ in 0..10 {
            let again = preprocessor.transform(&sample(), "Red").unwrap();
            for (a, b) in first.iter().zip(&again) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_zero_scale_treated_as_one() {
        let scaler = StandardScaler::new([1.0; 7], [0.0; 7]).unwrap();
        let scaled = scaler.transform(&sample());
        assert_abs_diff_eq!(scaled[0], 89.0, epsilon = 1e-6);
    }

    #[test]
    fn test_scaler_rejects_wrong_feature_order() {
        let json = r#"{"feature_names": ["P", "N", "K", "temperature", "humidity", "ph", "rainfall"],
            "mean": [0,0,0,0,0,0,0], "scale": [1,1,1,1,1,1,1]}"#;
        assert!(matches!(
            StandardScaler::from_json_str(json),
            Err(PreprocessError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_scaler_rejects_wrong_length() {
        let json = r#"{"feature_names": ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"],
            "mean": [0,0,0], "scale": [1,1,1,1,1,1,1]}"#;
        assert!(StandardScaler::from_json_str(json).is_err());
    }

    #[test]
    fn test_encoder_matching() {
        let encoder = OneHotEncoder::from_json_str(SOIL_ENCODER).unwrap();
        assert_eq!(encoder.encode(" Clay ").unwrap(), vec![0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(encoder.encode("laterite").unwrap(), vec![0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_policy() {
        let strict = OneHotEncoder::from_json_str(SOIL_ENCODER).unwrap();
        assert!(matches!(
            strict.encode("Peaty"),
            Err(PreprocessError::UnknownCategory { .. })
        ));

        let lenient = OneHotEncoder::new(vec!["rice".into(), "maize".into()], HandleUnknown::Ignore).unwrap();
        assert_eq!(lenient.encode("barley").unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_handle_unknown_defaults_to_error() {
        let encoder = OneHotEncoder::from_json_str(r#"{"categories": ["a"]}"#).unwrap();
        assert!(encoder.encode("b").is_err());
    }

    #[test]
    fn test_label_encoder_decode() {
        let labels = LabelEncoder::new(vec!["apple".into(), "banana".into()]);
        assert_eq!(labels.decode(1), Some("banana"));
        assert_eq!(labels.decode(2), None);
    }
}
