//! Model inference
//!
//! - `engine`: the `InferenceEngine` trait every backend implements
//! - `onnx`: tract-backed ONNX engine
//! - `preprocess`: scaler / one-hot / label artifacts for tabular models
//! - `image_input`: image decode + resize + normalize for the disease model
//! - `models`: typed wrappers and the startup `ModelRegistry`

pub mod engine;
pub mod image_input;
pub mod models;
pub mod onnx;
pub mod preprocess;

pub use engine::{InferenceEngine, InferenceError};
pub use image_input::{preprocess_image, ImageInputError, IMAGE_INPUT_SHAPE};
pub use models::{
    CropRecommendation, CropRecommender, DiseaseDetector, DiseaseDiagnosis, ModelError, ModelRegistry,
    ModelStatus, YieldPredictor, DEFAULT_TOP_K,
};
pub use onnx::OnnxModel;
pub use preprocess::{
    FeaturePreprocessor, HandleUnknown, LabelEncoder, NumericFeatures, OneHotEncoder, PreprocessError,
    StandardScaler, NUMERIC_FEATURES,
};
