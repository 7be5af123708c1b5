//! ONNX backend (tract)
//!
//! The graph is loaded once, its input pinned to a concrete f32 shape, then
//! optimized into a runnable plan. `run` takes `&self`, so one plan is shared
//! by every request through an `Arc`.

use std::path::Path;

use anyhow::{Context, Result};
use tract_onnx::prelude::*;

use super::engine::{check_input_len, InferenceEngine, InferenceError};

type Plan = TypedRunnableModel<TypedModel>;

pub struct OnnxModel {
    plan: Plan,
    input_shape: Vec<usize>,
}

impl OnnxModel {
    pub fn load(path: &Path, input_shape: &[usize]) -> Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("Failed to read ONNX model: {:?}", path))?
            .with_input_fact(0, f32::fact(input_shape.to_vec()).into())
            .with_context(|| format!("Model {:?} rejects input shape {:?}", path, input_shape))?
            .into_optimized()
            .with_context(|| format!("Failed to optimize model: {:?}", path))?
            .into_runnable()
            .with_context(|| format!("Failed to build runnable plan: {:?}", path))?;

        Ok(Self {
            plan,
            input_shape: input_shape.to_vec(),
        })
    }
}

impl InferenceEngine for OnnxModel {
    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn run(&self, input: &[f32]) -> Result<Vec<f32>, InferenceError> {
        check_input_len(self, input)?;

        let tensor = Tensor::from_shape(&self.input_shape, input)
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let first = outputs.first().ok_or(InferenceError::EmptyOutput)?;
        let values: Vec<f32> = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?
            .iter()
            .copied()
            .collect();

        if values.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file_is_an_error() {
        let err = OnnxModel::load(Path::new("/nonexistent/model.onnx"), &[1, 8]).err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to read ONNX model"));
    }
}
