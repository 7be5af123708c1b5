//! Model wrappers and registry
//!
//! Each wrapper pairs an inference engine with the artifacts needed to build
//! its input and interpret its output:
//!
//! - `CropRecommender`: scaler + soil-type encoder in, top-K crops out
//! - `YieldPredictor`: scaler + crop encoder in, tons/hectare out
//! - `DiseaseDetector`: image bytes in, disease class out
//!
//! `ModelRegistry::load` loads every model independently; a model whose
//! artifacts are missing or invalid leaves its slot empty and the service
//! keeps running without it.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;

use super::engine::{InferenceEngine, InferenceError};
use super::image_input::{preprocess_image, ImageInputError, IMAGE_INPUT_SHAPE};
use super::onnx::OnnxModel;
use super::preprocess::{FeaturePreprocessor, LabelEncoder, NumericFeatures, PreprocessError};
use crate::utils::round_to;

pub const CROP_MODEL_FILE: &str = "crop_recommender.onnx";
pub const CROP_SCALER_FILE: &str = "crop_data_scaler.json";
pub const CROP_SOIL_ENCODER_FILE: &str = "crop_soil_encoder.json";
pub const CROP_LABEL_ENCODER_FILE: &str = "crop_label_encoder.json";
pub const YIELD_MODEL_FILE: &str = "yield_predictor.onnx";
pub const YIELD_SCALER_FILE: &str = "yield_scaler.json";
pub const YIELD_CROP_ENCODER_FILE: &str = "yield_crop_encoder.json";
pub const DISEASE_MODEL_FILE: &str = "disease_detector.onnx";
pub const DISEASE_CLASSES_FILE: &str = "class_indices.json";

pub const DEFAULT_TOP_K: usize = 3;
const UNKNOWN_CLASS: &str = "Unknown";

#[derive(Debug, Error)]
pub enum ModelError {
    /// Caller supplied a value the model cannot encode
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    /// Caller supplied bytes that are not a readable image
    #[error(transparent)]
    Image(#[from] ImageInputError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

// ============================================================================
// Crop recommendation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRecommendation {
    pub crop: String,
    pub confidence: f64,
}

pub struct CropRecommender {
    engine: Arc<dyn InferenceEngine>,
    preprocessor: FeaturePreprocessor,
    labels: LabelEncoder,
}

impl CropRecommender {
    pub fn new(engine: Arc<dyn InferenceEngine>, preprocessor: FeaturePreprocessor, labels: LabelEncoder) -> Self {
        Self {
            engine,
            preprocessor,
            labels,
        }
    }

    pub fn load(models_dir: &Path) -> Result<Self> {
        let preprocessor = FeaturePreprocessor::load(
            &models_dir.join(CROP_SCALER_FILE),
            &models_dir.join(CROP_SOIL_ENCODER_FILE),
        )?;
        let labels = LabelEncoder::load(&models_dir.join(CROP_LABEL_ENCODER_FILE))?;
        let engine = OnnxModel::load(&models_dir.join(CROP_MODEL_FILE), &[1, preprocessor.width()])?;
        Ok(Self::new(Arc::new(engine), preprocessor, labels))
    }

    /// Top `k` crops by predicted probability, highest first
    pub fn recommend(
        &self,
        features: &NumericFeatures,
        soil_type: &str,
        k: usize,
    ) -> Result<Vec<CropRecommendation>, ModelError> {
        let row = self.preprocessor.transform(features, soil_type)?;
        let probabilities = self.engine.run(&row)?;
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::NonFinite.into());
        }

        Ok(top_k(&probabilities, k)
            .into_iter()
            .map(|index| CropRecommendation {
                crop: self.labels.decode(index).unwrap_or(UNKNOWN_CLASS).to_string(),
                confidence: round_to(probabilities[index] as f64, 4),
            })
            .collect())
    }
}

/// Indices of the `k` largest values; ties keep the lower index first
pub fn top_k(values: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    indices.truncate(k);
    indices
}

// ============================================================================
// Yield prediction
// ============================================================================

pub struct YieldPredictor {
    engine: Arc<dyn InferenceEngine>,
    preprocessor: FeaturePreprocessor,
}

impl YieldPredictor {
    pub fn new(engine: Arc<dyn InferenceEngine>, preprocessor: FeaturePreprocessor) -> Self {
        Self {
            engine,
            preprocessor,
        }
    }

    pub fn load(models_dir: &Path) -> Result<Self> {
        let preprocessor = FeaturePreprocessor::load(
            &models_dir.join(YIELD_SCALER_FILE),
            &models_dir.join(YIELD_CROP_ENCODER_FILE),
        )?;
        let engine = OnnxModel::load(&models_dir.join(YIELD_MODEL_FILE), &[1, preprocessor.width()])?;
        Ok(Self::new(Arc::new(engine), preprocessor))
    }

    /// Estimated yield in tons per hectare, two decimals
    pub fn predict(&self, features: &NumericFeatures, crop: &str) -> Result<f64, ModelError> {
        let row = self.preprocessor.transform(features, crop)?;
        let output = self.engine.run(&row)?;
        let value = *output.first().ok_or(InferenceError::EmptyOutput)?;
        if !value.is_finite() {
            return Err(InferenceError::NonFinite.into());
        }
        Ok(round_to(value as f64, 2))
    }
}

// ============================================================================
// Disease detection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseDiagnosis {
    pub predicted_disease: String,
    /// Two-decimal string, e.g. "0.97"
    pub confidence: String,
}

pub struct DiseaseDetector {
    engine: Arc<dyn InferenceEngine>,
    class_names: FxHashMap<usize, String>,
}

impl DiseaseDetector {
    pub fn new(engine: Arc<dyn InferenceEngine>, class_names: FxHashMap<usize, String>) -> Self {
        Self { engine, class_names }
    }

    pub fn load(models_dir: &Path) -> Result<Self> {
        let class_names = load_class_indices(&models_dir.join(DISEASE_CLASSES_FILE))?;
        let engine = OnnxModel::load(&models_dir.join(DISEASE_MODEL_FILE), &IMAGE_INPUT_SHAPE)?;
        Ok(Self::new(Arc::new(engine), class_names))
    }

    pub fn detect(&self, image_bytes: &[u8]) -> Result<DiseaseDiagnosis, ModelError> {
        let tensor = preprocess_image(image_bytes)?;
        let scores = self.engine.run(&tensor)?;
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(InferenceError::NonFinite.into());
        }

        let best = top_k(&scores, 1)
            .first()
            .copied()
            .ok_or(InferenceError::EmptyOutput)?;
        let name = self
            .class_names
            .get(&best)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CLASS);

        Ok(DiseaseDiagnosis {
            predicted_disease: name.replace('_', " "),
            confidence: format!("{:.2}", scores[best]),
        })
    }
}

/// `{"Class_Name": index}` → index → class name
pub fn load_class_indices(path: &Path) -> Result<FxHashMap<usize, String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read class indices: {:?}", path))?;
    let by_name: FxHashMap<String, usize> = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid class indices: {:?}", path))?;
    Ok(by_name.into_iter().map(|(name, index)| (index, name)).collect())
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    pub crop_recommender: bool,
    pub yield_predictor: bool,
    pub disease_detector: bool,
}

#[derive(Clone, Default)]
pub struct ModelRegistry {
    pub crop_recommender: Option<Arc<CropRecommender>>,
    pub yield_predictor: Option<Arc<YieldPredictor>>,
    pub disease_detector: Option<Arc<DiseaseDetector>>,
}

impl ModelRegistry {
    pub fn new(
        crop_recommender: Option<CropRecommender>,
        yield_predictor: Option<YieldPredictor>,
        disease_detector: Option<DiseaseDetector>,
    ) -> Self {
        Self {
            crop_recommender: crop_recommender.map(Arc::new),
            yield_predictor: yield_predictor.map(Arc::new),
            disease_detector: disease_detector.map(Arc::new),
        }
    }

    /// No models loaded
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(models_dir: &Path) -> Self {
        tracing::info!("Loading models from {:?}", models_dir);
        Self::new(
            load_or_warn("crop recommender", || CropRecommender::load(models_dir)),
            load_or_warn("yield predictor", || YieldPredictor::load(models_dir)),
            load_or_warn("disease detector", || DiseaseDetector::load(models_dir)),
        )
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            crop_recommender: self.crop_recommender.is_some(),
            yield_predictor: self.yield_predictor.is_some(),
            disease_detector: self.disease_detector.is_some(),
        }
    }
}

fn load_or_warn<T>(name: &str, load: impl FnOnce() -> Result<T>) -> Option<T> {
    match load() {
        Ok(model) => {
            tracing::info!("✓ Loaded {}", name);
            Some(model)
        }
        Err(e) => {
            tracing::warn!("Failed to load {}: {:#}", name, e);
            None
        }
    }
}
