//! Translation catalog input definitions.
//!
//! The catalog is served as a JSON list of records. Each record carries an `id`
//! plus one field per language code:
//!
//! ```json
//! [
//!   { "id": "greet", "en": "Hi {0}", "ja": "こんにちは {0}" },
//!   { "id": "tab_about", "en": "About Me" }
//! ]
//! ```

use std::collections::{
    BTreeSet,
    HashMap,
};

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to fetch catalog: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog payload must be a list of records")]
    NotAList,
}

/// Language code → display string for one key.
pub type LanguageStrings = HashMap<String, String>;

/// All translation entries, keyed by translation key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    /// Translation key → per-language strings
    entries: HashMap<String, LanguageStrings>,
}

/// Catalog copy kept in durable storage between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CachedCatalog {
    pub version: String,
    pub data: Catalog,
}

impl Catalog {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses the catalog payload.
    ///
    /// Records without an identifying `id` are skipped with a warning, as are
    /// non-string language fields. Only a payload that is not a JSON list fails.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Array(records) = value else {
            return Err(CatalogError::NotAList);
        };
        Ok(Self::from_records(&records))
    }

    #[must_use]
    pub fn from_records(records: &[Value]) -> Self {
        let mut entries = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let Some(object) = record.as_object() else {
                tracing::warn!(index, "Skipping non-object catalog record");
                continue;
            };

            let Some(key) = object.get("id").and_then(record_id) else {
                tracing::warn!(index, record = %record, "Skipping invalid entry without id");
                continue;
            };

            let mut strings = LanguageStrings::new();
            for (field, value) in object {
                if field == "id" {
                    continue;
                }
                if let Some(text) = value.as_str() {
                    strings.insert(field.clone(), text.to_string());
                } else {
                    tracing::warn!(key = %key, language = %field, "Skipping non-string translation");
                }
            }

            if entries.insert(key.clone(), strings).is_some() {
                tracing::warn!(key = %key, "Duplicate catalog key, later record wins");
            }
        }

        Self { entries }
    }

    /// String for `key` in `language`. Empty strings count as missing.
    #[must_use]
    pub fn lookup(&self, key: &str, language: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|strings| strings.get(language))
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every language code appearing in at least one entry.
    #[must_use]
    pub fn languages(&self) -> BTreeSet<&str> {
        self.entries.values().flat_map(|strings| strings.keys().map(String::as_str)).collect()
    }
}

impl CachedCatalog {
    #[must_use]
    pub fn new(version: impl Into<String>, data: Catalog) -> Self {
        Self { version: version.into(), data }
    }
}

/// Accepts string and numeric ids; empty ids are invalid.
fn record_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
