use std::path::PathBuf;
use log::info;

use super::decision::{DecisionPolicy, ScoreActivation};
use super::engine::{InferenceEngine, OrtEngine};
use super::error::ClassifierError;
use super::labels::ClassLabels;
use super::model::Classifier;
use super::preprocess::ResizeStrategy;
use crate::runtime::RuntimeConfig;

/// A builder for constructing a [`Classifier`] with a fluent interface.
#[derive(Default)]
pub struct ClassifierBuilder {
    model_path: Option<PathBuf>,
    engine: Option<Box<dyn InferenceEngine>>,
    labels: Option<ClassLabels>,
    resize_strategy: ResizeStrategy,
    policy: DecisionPolicy,
    runtime_config: RuntimeConfig,
}

impl std::fmt::Debug for ClassifierBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierBuilder")
            .field("model_path", &self.model_path)
            .field("custom_engine", &self.engine.is_some())
            .field("labels", &self.labels)
            .field("resize_strategy", &self.resize_strategy)
            .field("policy", &self.policy)
            .field("runtime_config", &self.runtime_config)
            .finish()
    }
}

impl ClassifierBuilder {
    /// Creates a builder with the fruit labels, center-crop resizing and the default policy
    ///
    /// # Example
    /// ```
    /// use identifruit::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration used when loading an ONNX model
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Uses the ONNX model at `model_path`; the model is loaded in [`build`](Self::build)
    ///
    /// # Errors
    /// - `BuildError` if the path is empty or an engine source is already set
    pub fn with_model_path(mut self, model_path: impl Into<PathBuf>) -> Result<Self, ClassifierError> {
        let model_path = model_path.into();
        if model_path.as_os_str().is_empty() {
            return Err(ClassifierError::BuildError("Model path cannot be empty".to_string()));
        }
        if self.model_path.is_some() || self.engine.is_some() {
            return Err(ClassifierError::BuildError("Inference engine already set".to_string()));
        }
        self.model_path = Some(model_path);
        Ok(self)
    }

    /// Uses a caller-provided inference engine instead of an ONNX model file
    ///
    /// # Example
    /// ```
    /// use identifruit::{ClassifierBuilder, ClassifierError, InferenceEngine, NormalizedTensor};
    ///
    /// struct AlwaysBanana;
    ///
    /// impl InferenceEngine for AlwaysBanana {
    ///     fn infer(&self, _input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
    ///         let mut scores = vec![0.0; 20];
    ///         scores[1] = 10.0;
    ///         Ok(scores)
    ///     }
    /// }
    ///
    /// # fn main() -> Result<(), ClassifierError> {
    /// let classifier = ClassifierBuilder::new()
    ///     .with_engine(AlwaysBanana)?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_engine<E: InferenceEngine + 'static>(mut self, engine: E) -> Result<Self, ClassifierError> {
        if self.model_path.is_some() || self.engine.is_some() {
            return Err(ClassifierError::BuildError("Inference engine already set".to_string()));
        }
        self.engine = Some(Box::new(engine));
        Ok(self)
    }

    /// Replaces the default fruit labels
    pub fn with_labels(mut self, labels: ClassLabels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_resize_strategy(mut self, strategy: ResizeStrategy) -> Self {
        self.resize_strategy = strategy;
        self
    }

    /// Sets the full decision policy
    ///
    /// # Errors
    /// - `ValidationError` if `min_confidence` is outside `0.0..=1.0`
    pub fn with_decision_policy(mut self, policy: DecisionPolicy) -> Result<Self, ClassifierError> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    /// Sets only the confidence threshold, keeping the current activation
    pub fn with_min_confidence(self, min_confidence: f32) -> Result<Self, ClassifierError> {
        let activation = self.policy.activation;
        self.with_decision_policy(DecisionPolicy { min_confidence, activation })
    }

    pub fn with_activation(mut self, activation: ScoreActivation) -> Self {
        self.policy.activation = activation;
        self
    }

    /// Builds and returns the final Classifier instance
    ///
    /// # Errors
    /// - `BuildError` if neither a model path nor an engine was set
    /// - Any error from loading the ONNX model
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        let (engine, model_path): (Box<dyn InferenceEngine>, Option<String>) = match (self.engine, self.model_path) {
            (Some(engine), None) => (engine, None),
            (None, Some(path)) => {
                let engine = OrtEngine::from_file(&path, &self.runtime_config)?;
                let model_path = engine.model_path().to_string();
                (Box::new(engine), Some(model_path))
            }
            (None, None) => {
                return Err(ClassifierError::BuildError(
                    "A model path or inference engine must be set".to_string()
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ClassifierError::BuildError("Inference engine already set".to_string()));
            }
        };

        let labels = self.labels.unwrap_or_default();
        info!(
            "Classifier ready: {} classes, {:?} resize, min confidence {}",
            labels.len(), self.resize_strategy, self.policy.min_confidence
        );

        Ok(Classifier {
            engine,
            model_path,
            labels,
            resize_strategy: self.resize_strategy,
            policy: self.policy,
        })
    }
}
