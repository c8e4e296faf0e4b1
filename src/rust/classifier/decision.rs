use log::debug;

use super::error::ClassifierError;
use super::labels::{ClassLabels, UNKNOWN_LABEL};

/// How raw model scores are turned into a 0..1 confidence before thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreActivation {
    /// Scores are logits; confidence is the softmax probability of the winning class
    #[default]
    Softmax,
    /// Scores are already probabilities and are used as-is
    Identity,
}

/// The outcome of classifying one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A known class cleared the confidence threshold
    Label { index: usize, name: String },
    /// No class cleared the threshold, or there were no usable scores
    Unknown,
}

impl Decision {
    /// The display label, [`UNKNOWN_LABEL`] for an unknown decision
    pub fn label(&self) -> &str {
        match self {
            Decision::Label { name, .. } => name,
            Decision::Unknown => UNKNOWN_LABEL,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Decision::Label { index, .. } => Some(*index),
            Decision::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Decision::Unknown)
    }

    /// Key used for content lookups: the lower-cased label, or `None` when unknown
    pub fn lookup_key(&self) -> Option<String> {
        match self {
            Decision::Label { name, .. } => Some(name.to_lowercase()),
            Decision::Unknown => None,
        }
    }
}

/// Thresholding policy applied to the winning class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    /// Minimum confidence in `0.0..=1.0` for a label to be reported
    pub min_confidence: f32,
    pub activation: ScoreActivation,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            activation: ScoreActivation::Softmax,
        }
    }
}

impl DecisionPolicy {
    pub fn new(min_confidence: f32, activation: ScoreActivation) -> Result<Self, ClassifierError> {
        let policy = Self { min_confidence, activation };
        policy.validate()?;
        Ok(policy)
    }

    pub(crate) fn validate(&self) -> Result<(), ClassifierError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ClassifierError::ValidationError(format!(
                "Minimum confidence must be within 0.0..=1.0, got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }

    /// Maps raw scores to per-class confidences according to the activation.
    pub fn confidences(&self, scores: &[f32]) -> Vec<f32> {
        match self.activation {
            ScoreActivation::Softmax => softmax(scores),
            ScoreActivation::Identity => scores.to_vec(),
        }
    }

    /// Picks the arg-max class and applies the threshold.
    ///
    /// Returns the decision together with the winning class's confidence
    /// (0.0 when there is no winner). An empty score vector, or one whose
    /// scores are all equal, is `Unknown` regardless of the threshold.
    pub fn decide(&self, scores: &[f32], labels: &ClassLabels) -> (Decision, f32) {
        let Some(index) = argmax(scores) else {
            debug!("No usable scores, decision is unknown");
            return (Decision::Unknown, 0.0);
        };

        let confidence = self.confidences(scores)[index];
        debug!("Arg-max index {} with confidence {:.4}", index, confidence);

        if is_flat(scores) {
            debug!("All scores are equal, decision is unknown");
            return (Decision::Unknown, confidence);
        }
        // NaN confidence must not clear the threshold
        if !(confidence >= self.min_confidence) {
            return (Decision::Unknown, confidence);
        }

        match labels.get(index) {
            Some(name) => (Decision::Label { index, name: name.to_string() }, confidence),
            None => (Decision::Unknown, confidence),
        }
    }
}

/// Index of the maximum score; ties resolve to the lowest index and NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, max)) if score <= max => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

// A vector of two or more usable scores that are all equal carries no class information.
fn is_flat(scores: &[f32]) -> bool {
    let mut usable = scores.iter().copied().filter(|s| !s.is_nan());
    let Some(first) = usable.next() else {
        return true;
    };
    let mut count = 1;
    for score in usable {
        if score != first {
            return false;
        }
        count += 1;
    }
    count > 1
}

/// Numerically stable softmax. NaN entries get probability 0.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores
        .iter()
        .copied()
        .filter(|s| !s.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return vec![0.0; scores.len()];
    }
    if max == f32::INFINITY {
        // The limit of softmax: the mass is shared by the infinite entries
        let count = scores.iter().filter(|&&s| s == f32::INFINITY).count() as f32;
        return scores
            .iter()
            .map(|&s| if s == f32::INFINITY { 1.0 / count } else { 0.0 })
            .collect();
    }

    let exps: Vec<f32> = scores
        .iter()
        .map(|&s| if s.is_nan() { 0.0 } else { (s - max).exp() })
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
