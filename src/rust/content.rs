//! Per-fruit text content shown next to a prediction.
//!
//! Content is keyed by the lower-cased decided label and consists of two
//! ordered lists: nutritional facts and health benefits.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use lazy_static::lazy_static;
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid content document: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid entry for '{key}': {reason}")]
    InvalidEntry { key: String, reason: String },
}

/// Text content for one fruit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FruitContent {
    pub nutritional_facts: Vec<String>,
    pub health_benefits: Vec<String>,
}

/// A key-value lookup from lower-cased label to [`FruitContent`].
pub trait ContentStore {
    /// Returns `Ok(None)` when there is no entry for `key`.
    fn lookup(&self, key: &str) -> Result<Option<FruitContent>, ContentError>;
}

/// Content loaded from a JSON document.
///
/// The expected shape mirrors a realtime-database export:
///
/// ```json
/// { "fruits": { "apple": { "nutritional_content": ["..."], "health_benefits": ["..."] } } }
/// ```
///
/// A document without a top-level `"fruits"` object is treated as the fruit map
/// itself. Lists may be arrays or objects keyed by integer index.
#[derive(Debug, Clone, Default)]
pub struct JsonContentStore {
    fruits: HashMap<String, FruitContent>,
}

impl JsonContentStore {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ContentError> {
        let path = path.as_ref();
        info!("Loading fruit content from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ContentError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ContentError> {
        let mut root = match value {
            Value::Object(map) => map,
            other => {
                return Err(ContentError::InvalidEntry {
                    key: "<root>".to_string(),
                    reason: format!("expected an object, found {}", type_name(&other)),
                })
            }
        };

        let fruits_map = match root.remove("fruits") {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ContentError::InvalidEntry {
                    key: "fruits".to_string(),
                    reason: format!("expected an object, found {}", type_name(&other)),
                })
            }
            None => root,
        };

        let mut fruits = HashMap::with_capacity(fruits_map.len());
        for (name, entry) in fruits_map {
            let Value::Object(mut entry) = entry else {
                return Err(ContentError::InvalidEntry {
                    key: name,
                    reason: "expected an object".to_string(),
                });
            };
            let content = FruitContent {
                nutritional_facts: parse_list(&name, entry.remove("nutritional_content"))?,
                health_benefits: parse_list(&name, entry.remove("health_benefits"))?,
            };
            fruits.insert(name.trim().to_lowercase(), content);
        }

        debug!("Loaded content for {} fruits", fruits.len());
        Ok(Self { fruits })
    }

    pub fn len(&self) -> usize {
        self.fruits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fruits.is_empty()
    }
}

impl ContentStore for JsonContentStore {
    fn lookup(&self, key: &str) -> Result<Option<FruitContent>, ContentError> {
        let key = key.trim().to_lowercase();
        let found = self.fruits.get(&key).cloned();
        if found.is_none() {
            debug!("No content found for {}", key);
        }
        Ok(found)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn item_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn parse_list(key: &str, value: Option<Value>) -> Result<Vec<String>, ContentError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(item_text)
            .collect()),
        Some(Value::Object(map)) => Ok(ordered_children(map)),
        Some(other) => Err(ContentError::InvalidEntry {
            key: key.to_string(),
            reason: format!("expected a list, found {}", type_name(&other)),
        }),
    }
}

// Integer keys sort numerically and come before any other keys.
fn ordered_children(map: Map<String, Value>) -> Vec<String> {
    let mut children: Vec<(String, Value)> = map.into_iter().collect();
    children.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    children.into_iter().map(|(_, v)| item_text(v)).collect()
}

lazy_static! {
    static ref REFERENCE_LINKS: HashMap<&'static str, &'static str> = HashMap::from([
        ("apple", "https://www.healthline.com/nutrition/foods/apples"),
        ("banana", "https://www.healthline.com/nutrition/foods/bananas"),
        ("bell pepper", "https://www.healthline.com/nutrition/foods/bell-peppers"),
        ("chilli pepper", "https://www.healthline.com/nutrition/foods/chili-peppers"),
        ("corn", "https://www.healthline.com/nutrition/foods/corn"),
        ("eggplant", "https://www.healthline.com/nutrition/foods/eggplant-benefits"),
        ("grapes", "https://www.healthline.com/nutrition/foods/benefits-of-grapes"),
        ("jalapeno", "https://www.healthline.com/nutrition/foods/jalapeno-health-benefits"),
        ("kiwi", "https://www.healthline.com/nutrition/foods/kiwi-benefits"),
        ("lemon", "https://www.healthline.com/nutrition/foods/lemons"),
        ("mango", "https://www.healthline.com/nutrition/foods/mango"),
        ("onion", "https://www.healthline.com/nutrition/foods/onions"),
        ("orange", "https://www.healthline.com/nutrition/foods/oranges"),
        ("paprika", "https://www.healthline.com/nutrition/foods/paprika-benefits"),
        ("pear", "https://www.healthline.com/nutrition/foods/benefits-of-pears"),
        ("pineapple", "https://www.healthline.com/nutrition/foods/benefits-of-pineapple"),
        ("pomegranate", "https://www.healthline.com/nutrition/foods/12-proven-benefits-of-pomegranate"),
        ("sweetcorn", "https://www.healthline.com/nutrition/foods/corn"),
        ("tomato", "https://www.healthline.com/nutrition/foods/tomatoes"),
        ("watermelon", "https://www.healthline.com/nutrition/foods/watermelon"),
    ]);
}

/// Nutrition reference page for a fruit label, matched case-insensitively.
pub fn reference_link(label: &str) -> Option<&'static str> {
    REFERENCE_LINKS.get(label.trim().to_lowercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_links_cover_fruit_classes() {
        for label in crate::FRUIT_CLASSES {
            assert!(reference_link(label).is_some(), "missing link for {}", label);
        }
        assert_eq!(reference_link("SWEETCORN"), reference_link("corn"));
        assert_eq!(reference_link("Unknown"), None);
    }

    #[test]
    fn test_ordered_children_numeric_keys() {
        let map: Map<String, Value> = serde_json::from_str(r#"{"10": "k", "2": "c", "0": "a", "1": "b"}"#).unwrap();
        assert_eq!(ordered_children(map), vec!["a", "b", "c", "k"]);
    }
}
