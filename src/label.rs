//! Raw class labels: the catalog loaded from disk and the parser turning a
//! label such as `Tomato___Early_blight` into a display plant name and condition.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// First label tokens with a fixed display name. Anything else is title-cased.
const KNOWN_PLANTS: &[(&str, &str)] = &[
    ("aloe", "Aloe Vera"),
    ("tomato", "Tomato"),
    ("hibiscus", "Hibiscus"),
];

/// Splits a raw label into `(plant, condition)`.
///
/// Runs of `___` and `__` collapse to a single `_` before splitting. A label
/// with a single token yields an empty condition.
pub fn parse_label(raw_label: &str) -> (String, String) {
    let normalized = raw_label.replace("___", "_").replace("__", "_");
    let mut tokens = normalized.split('_');

    let first = tokens.next().unwrap_or_default();
    let plant = KNOWN_PLANTS
        .iter()
        .find(|(keyword, _)| first.eq_ignore_ascii_case(keyword))
        .map(|(_, display)| display.to_string())
        .unwrap_or_else(|| title_case(first));

    let condition = tokens.map(title_case).collect::<Vec<_>>().join(" ");
    (plant, condition)
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest.
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut in_word = false;
    for ch in word.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Class names index-aligned with the model output vector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelCatalog {
    labels: Vec<String>,
}

impl LabelCatalog {
    pub fn new(labels: Vec<String>) -> Self {
        LabelCatalog { labels }
    }

    /// Reads a JSON array of strings. An empty array is rejected.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| Error::LabelLoad {
            path: path.to_path_buf(),
            reason,
        };

        let raw = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let catalog: LabelCatalog =
            serde_json::from_str(&raw).map_err(|e| load_error(e.to_string()))?;
        if catalog.is_empty() {
            return Err(load_error("label list is empty".to_string()));
        }
        Ok(catalog)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl From<Vec<String>> for LabelCatalog {
    fn from(labels: Vec<String>) -> Self {
        LabelCatalog::new(labels)
    }
}

impl<'a> From<Vec<&'a str>> for LabelCatalog {
    fn from(labels: Vec<&'a str>) -> Self {
        LabelCatalog::new(labels.into_iter().map(str::to_string).collect())
    }
}
