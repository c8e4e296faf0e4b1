use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info};
use ort::session::Session;
use ort::value::Tensor;

use super::error::ClassifierError;
use super::preprocess::NormalizedTensor;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A pretrained model that maps a normalized (1, 3, 224, 224) tensor to one score per class.
///
/// Implementations are treated as opaque: any failure they report is surfaced to the
/// caller as [`ClassifierError::InferenceFailure`] without retry.
pub trait InferenceEngine: Send + Sync {
    fn infer(&self, input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Arc<E> {
    fn infer(&self, input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
        (**self).infer(input)
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn infer(&self, input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
        (**self).infer(input)
    }
}

/// Inference engine backed by an ONNX Runtime session.
///
/// The model must take a single float input of shape (1, 3, 224, 224); the
/// first output is flattened into the score vector.
#[derive(Debug)]
pub struct OrtEngine {
    session: Session,
    input_name: String,
    model_path: String,
}

impl OrtEngine {
    /// Loads and validates an ONNX model from disk.
    ///
    /// # Errors
    /// - `BuildError` if the file does not exist or the session cannot be created
    /// - `ModelError` if the model does not have exactly one input and at least one output
    pub fn from_file<P: AsRef<Path>>(model_path: P, config: &RuntimeConfig) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(ClassifierError::BuildError(format!("Model file not found: {:?}", model_path)));
        }

        info!("Loading ONNX model from {:?}", model_path);
        let session = create_session_builder(config)?
            .commit_from_file(model_path)
            .map_err(|e| {
                error!("Failed to load model: {}", e);
                ClassifierError::BuildError(format!("Failed to load model: {}", e))
            })?;

        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        let input_name = session.inputs[0].name.clone();
        debug!("Model input name: {}", input_name);

        Ok(Self {
            session,
            input_name,
            model_path: model_path.to_string_lossy().to_string(),
        })
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        let inputs = &session.inputs;
        if inputs.len() != 1 {
            return Err(ClassifierError::ModelError(
                format!("Model must have exactly 1 input (image tensor), found {}", inputs.len())
            ));
        }

        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for class scores".to_string()
            ));
        }

        Ok(())
    }
}

impl InferenceEngine for OrtEngine {
    fn infer(&self, input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
        let tensor = Tensor::from_array(input.as_array().clone())
            .map_err(|e| ClassifierError::InferenceFailure(format!("Failed to create input tensor: {}", e)))?;

        let mut input_tensors = HashMap::new();
        input_tensors.insert(self.input_name.as_str(), tensor);

        let outputs = self.session.run(input_tensors)
            .map_err(|e| ClassifierError::InferenceFailure(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailure(format!("Failed to extract output tensor: {}", e)))?;

        debug!("Model output shape: {:?}", output_tensor.shape());
        Ok(output_tensor.iter().copied().collect())
    }
}
