//! Fruit and produce identification from photos.
//!
//! An image is resized (optionally center-cropped), normalized with ImageNet
//! statistics, laid out channel-planar and passed to a pretrained ONNX model.
//! The arg-max class is reported if its confidence clears a threshold, and
//! "Unknown" otherwise.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use identifruit::{Classifier, ResizeStrategy};
//!
//! let classifier = Classifier::builder()
//!     .with_model_path("IdentiFruit_Model_V2.onnx")?
//!     .with_resize_strategy(ResizeStrategy::CenterCrop)
//!     .with_min_confidence(0.6)?
//!     .build()?;
//!
//! let prediction = classifier.classify_file("apple.jpg")?;
//! println!("Predicted fruit: {} ({:.1}%)", prediction.label(), prediction.confidence * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! `Classifier` is `Send + Sync` and can be shared across threads with `Arc`;
//! each classification is independent.

pub mod classifier;
pub mod content;
mod runtime;
pub mod model_manager;

pub use classifier::{
    Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo, ClassLabels, Decision, DecisionPolicy,
    InferenceEngine, NormalizedTensor, OrtEngine, Prediction, ResizeStrategy, ScoreActivation, FRUIT_CLASSES,
    UNKNOWN_LABEL,
};
pub use content::{reference_link, ContentError, ContentStore, FruitContent, JsonContentStore};
pub use runtime::{RuntimeConfig, create_session_builder};
pub use ort::session::builder::GraphOptimizationLevel;
pub use model_manager::{ModelManager, ModelError, ModelInfo};

pub fn init_logger() {
    env_logger::init();
}
