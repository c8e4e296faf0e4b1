use std::path::Path;

use image::DynamicImage;
use log::{debug, error, info};

use super::decision::{Decision, DecisionPolicy};
use super::engine::InferenceEngine;
use super::error::ClassifierError;
use super::labels::ClassLabels;
use super::preprocess::{decode_image, preprocess, NormalizedTensor, ResizeStrategy};
use super::ClassifierInfo;

/// The result of classifying one image.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Prediction {
    #[serde(rename = "label", serialize_with = "serialize_decision")]
    pub decision: Decision,
    /// Confidence of the arg-max class on a 0..1 scale
    pub confidence: f32,
    /// Per-class confidences after the score activation, index-aligned with the
    /// classifier's labels (raw scores under `ScoreActivation::Identity`)
    pub probabilities: Vec<f32>,
}

fn serialize_decision<S: serde::Serializer>(decision: &Decision, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(decision.label())
}

impl Prediction {
    pub fn label(&self) -> &str {
        self.decision.label()
    }

    /// The `n` most confident classes as `(label, confidence)`, highest first
    pub fn top_k<'a>(&self, labels: &'a ClassLabels, n: usize) -> Vec<(&'a str, f32)> {
        let mut ranked: Vec<(&str, f32)> = labels
            .iter()
            .zip(self.probabilities.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(n);
        ranked
    }
}

/// An image classifier: preprocessing, inference and the thresholded arg-max decision.
///
/// Each call runs the stages Decode -> Preprocess -> Infer -> Decide once and
/// stops at the first failure. The classifier holds no per-request state and is
/// `Send + Sync`, so it can be shared across threads with `Arc`.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use identifruit::Classifier;
///
/// let classifier = Classifier::builder()
///     .with_model_path("IdentiFruit_Model_V2.onnx")?
///     .build()?;
///
/// let prediction = classifier.classify_file("banana.jpg")?;
/// println!("Predicted fruit: {}", prediction.label());
/// # Ok(())
/// # }
/// ```
pub struct Classifier {
    pub(crate) engine: Box<dyn InferenceEngine>,
    pub(crate) model_path: Option<String>,
    pub(crate) labels: ClassLabels,
    pub(crate) resize_strategy: ResizeStrategy,
    pub(crate) policy: DecisionPolicy,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("model_path", &self.model_path)
            .field("labels", &self.labels)
            .field("resize_strategy", &self.resize_strategy)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's configuration
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            model_path: self.model_path.clone(),
            num_classes: self.labels.len(),
            class_labels: self.labels.as_slice().to_vec(),
            resize_strategy: self.resize_strategy,
            policy: self.policy,
        }
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// Classifies an encoded image (PNG, JPEG, BMP, WebP)
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Prediction, ClassifierError> {
        let image = decode_image(bytes).map_err(|e| {
            error!("Failed to decode image: {}", e);
            e
        })?;
        self.classify_image(&image)
    }

    /// Reads and classifies an image file
    pub fn classify_file<P: AsRef<Path>>(&self, path: P) -> Result<Prediction, ClassifierError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ClassifierError::DecodeFailure(format!("Failed to read {:?}: {}", path, e)))?;
        self.classify_bytes(&bytes)
    }

    /// Classifies an already decoded image
    pub fn classify_image(&self, image: &DynamicImage) -> Result<Prediction, ClassifierError> {
        let tensor = preprocess(image, self.resize_strategy)?;
        let scores = self.infer(&tensor)?;
        Ok(self.decide(&scores))
    }

    /// Runs the engine and checks the shape of its output.
    ///
    /// # Errors
    /// - `EmptyScores` if the engine returned no scores
    /// - `InferenceFailure` if the engine failed, returned the wrong number of scores
    ///   or returned a NaN or infinite score
    pub fn infer(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
        let scores = self.engine.infer(tensor).map_err(|e| {
            error!("Inference failed: {}", e);
            match e {
                ClassifierError::InferenceFailure(_) => e,
                other => ClassifierError::InferenceFailure(other.to_string()),
            }
        })?;

        if scores.is_empty() {
            error!("Inference returned an empty score vector");
            return Err(ClassifierError::EmptyScores);
        }
        if scores.len() != self.labels.len() {
            error!("Expected {} scores, model returned {}", self.labels.len(), scores.len());
            return Err(ClassifierError::InferenceFailure(format!(
                "Model returned {} scores but {} classes are configured",
                scores.len(),
                self.labels.len()
            )));
        }

        if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
            error!("Model returned non-finite score {} at index {}", scores[pos], pos);
            return Err(ClassifierError::InferenceFailure(format!(
                "Model returned non-finite score {} for class {}",
                scores[pos], pos
            )));
        }

        debug!("Raw scores: {:?}", scores);
        Ok(scores)
    }

    /// Applies the decision policy to raw scores
    pub fn decide(&self, scores: &[f32]) -> Prediction {
        let (decision, confidence) = self.policy.decide(scores, &self.labels);
        info!("Decision: {} (confidence {:.1}%)", decision.label(), confidence * 100.0);
        Prediction {
            decision,
            confidence,
            probabilities: self.policy.confidences(scores),
        }
    }
}
