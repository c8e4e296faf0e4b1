use std::collections::HashSet;
use std::path::Path;

use super::error::ClassifierError;

/// Label reported when no class clears the confidence threshold.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Classes of the bundled fruit model, in output-index order.
pub const FRUIT_CLASSES: [&str; 20] = [
    "Apple", "Banana", "Bell Pepper", "Chilli Pepper", "Corn", "Eggplant",
    "Grapes", "Jalapeno", "Kiwi", "Lemon", "Mango", "Onion", "Orange",
    "Paprika", "Pear", "Pineapple", "Pomegranate", "Sweetcorn", "Tomato", "Watermelon",
];

const MAX_CLASSES: usize = 1000;

/// An ordered list of class names, index-aligned with the model's output vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self::fruits()
    }
}

impl ClassLabels {
    /// The 20 fruit and vegetable classes of the bundled model
    pub fn fruits() -> Self {
        Self {
            names: FRUIT_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Creates a custom label list.
    ///
    /// Labels must be non-empty and unique ignoring case, and at most 1000 labels are accepted.
    pub fn new(names: Vec<impl Into<String>>) -> Result<Self, ClassifierError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if names.is_empty() {
            return Err(ClassifierError::ValidationError("At least one class label is required".into()));
        }
        if names.len() > MAX_CLASSES {
            return Err(ClassifierError::ValidationError(
                format!("Maximum number of classes ({}) exceeded", MAX_CLASSES)
            ));
        }
        if let Some(pos) = names.iter().position(|n| n.trim().is_empty()) {
            return Err(ClassifierError::ValidationError(
                format!("Class label {} cannot be empty", pos + 1)
            ));
        }
        // Compared case-insensitively, like content keys
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|n| !seen.insert(n.trim().to_lowercase())) {
            return Err(ClassifierError::ValidationError(
                format!("Duplicate class label '{}'", dup)
            ));
        }

        Ok(Self { names })
    }

    /// Reads one label per line, skipping blank lines.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::BuildError(format!("Failed to read labels file {:?}: {}", path, e))
        })?;
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>(),
        )
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}
