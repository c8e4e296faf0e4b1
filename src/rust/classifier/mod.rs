mod error;
mod model;
pub mod builder;
pub mod decision;
pub mod engine;
pub mod labels;
pub mod preprocess;

pub use error::ClassifierError;
pub use model::{Classifier, Prediction};
pub use builder::ClassifierBuilder;
pub use decision::{Decision, DecisionPolicy, ScoreActivation};
pub use engine::{InferenceEngine, OrtEngine};
pub use labels::{ClassLabels, FRUIT_CLASSES, UNKNOWN_LABEL};
pub use preprocess::{NormalizedTensor, ResizeStrategy};

/// Information about the current configuration of a classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInfo {
    /// Path to the ONNX model file, `None` for a custom engine
    pub model_path: Option<String>,
    /// Number of classes the model distinguishes
    pub num_classes: usize,
    /// Labels of the classes, in model output order
    pub class_labels: Vec<String>,
    /// How input images are resized before inference
    pub resize_strategy: ResizeStrategy,
    /// Thresholding applied to the winning class
    pub policy: DecisionPolicy,
}
