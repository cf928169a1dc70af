use std::collections::HashMap;
use log::{debug, warn};

use super::error::ClassifierError;

/// ID shared by padding and out-of-vocabulary tokens.
pub const UNKNOWN_TOKEN_ID: i64 = 0;

/// Token to ID lookup built once from a line-delimited resource.
///
/// The ID of a token is its position among the non-empty lines of the
/// resource. The table is immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    ids: HashMap<String, i64>,
}

impl Vocabulary {
    /// Builds a vocabulary from tokens in ID order.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids = HashMap::new();
        for (index, token) in tokens.into_iter().enumerate() {
            let token = token.into();
            if ids.contains_key(&token) {
                warn!("Duplicate vocabulary token '{}' at index {}, keeping first ID", token, index);
                continue;
            }
            ids.insert(token, index as i64);
        }
        Self { ids }
    }

    /// Looks up a token, returning [`UNKNOWN_TOKEN_ID`] when it is absent.
    pub fn id_of(&self, token: &str) -> i64 {
        self.ids.get(token).copied().unwrap_or(UNKNOWN_TOKEN_ID)
    }

    pub fn get(&self, token: &str) -> Option<i64> {
        self.ids.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Ordered intent labels. Index `i` names output logit `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLabels {
    labels: Vec<String>,
}

impl IntentLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Splits a resource into its non-empty, trimmed lines.
fn parse_lines<'a>(name: &str, bytes: &'a [u8]) -> Result<Vec<&'a str>, ClassifierError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ClassifierError::resource(name, format!("not valid UTF-8: {}", e)))?;

    let entries: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if entries.is_empty() {
        return Err(ClassifierError::resource(name, "resource is empty"));
    }
    debug!("Parsed {} entries from '{}'", entries.len(), name);
    Ok(entries)
}

/// Parses a vocabulary resource: one token per line, line index = token ID.
pub fn load_vocabulary(name: &str, bytes: &[u8]) -> Result<Vocabulary, ClassifierError> {
    Ok(Vocabulary::from_tokens(parse_lines(name, bytes)?))
}

/// Parses an intent-label resource: one label per line, line index = logit index.
pub fn load_intents(name: &str, bytes: &[u8]) -> Result<IntentLabels, ClassifierError> {
    Ok(IntentLabels::new(parse_lines(name, bytes)?))
}
