//! Inference engine seam
//!
//! A loaded model takes one fixed-shape f32 tensor (flattened, row-major) and
//! returns its first output flattened. Wrappers in `models` only see this
//! trait, so tests substitute scripted engines for real ONNX graphs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("input has {actual} values but the model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("model produced no output")]
    EmptyOutput,
    #[error("model produced a non-finite value")]
    NonFinite,
    #[error("inference runtime error: {0}")]
    Runtime(String),
}

pub trait InferenceEngine: Send + Sync {
    /// Declared input shape, batch dimension included
    fn input_shape(&self) -> &[usize];

    /// Number of f32 values one input must carry
    fn input_len(&self) -> usize {
        self.input_shape().iter().product()
    }

    fn run(&self, input: &[f32]) -> Result<Vec<f32>, InferenceError>;
}

/// Reject inputs whose length differs from the engine's declared shape
pub fn check_input_len(engine: &dyn InferenceEngine, input: &[f32]) -> Result<(), InferenceError> {
    let expected = engine.input_len();
    if input.len() != expected {
        return Err(InferenceError::ShapeMismatch {
            expected,
            actual: input.len(),
        });
    }
    Ok(())
}
