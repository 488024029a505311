//! Card catalog loading.
//!
//! A raw Scryfall bulk file lists every printing of every card. The catalog
//! keeps the first entry per card name, projects each entry into a flat
//! dotted-key record and a typed [`CardRecord`], and keeps the raw entry for
//! feature extraction.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::card::CardRecord;

/// Errors raised while reading or writing catalog files.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to access catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The catalog must be a JSON array of card objects.
    #[error("catalog file {0} must contain a JSON array of cards")]
    NotAnArray(PathBuf),
}

/// A single flattened attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Arrays are kept whole (`colors`, `card_faces`, ...).
    List(Vec<Value>),
}

impl From<&Value> for FlatValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FlatValue::Null,
            Value::Bool(flag) => FlatValue::Bool(*flag),
            Value::Number(number) => number
                .as_f64()
                .map(FlatValue::Number)
                .unwrap_or(FlatValue::Null),
            Value::String(text) => FlatValue::Text(text.clone()),
            Value::Array(items) => FlatValue::List(items.clone()),
            // Objects never reach here; flattening recurses into them.
            Value::Object(_) => FlatValue::Null,
        }
    }
}

/// A card entry projected to dotted top-level keys, e.g. `image_uris.large`
/// or `legalities.modern`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatRecord {
    fields: BTreeMap<String, FlatValue>,
}

impl FlatRecord {
    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key)? {
            FlatValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            FlatValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[Value]> {
        match self.fields.get(key)? {
            FlatValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Flattens nested objects of a card entry into dotted keys.
///
/// Arrays are not descended into, so `card_faces` stays a single list value.
/// An empty nested object contributes no keys.
pub fn flatten_entry(entry: &Value) -> FlatRecord {
    let mut fields = BTreeMap::new();
    if let Some(object) = entry.as_object() {
        for (key, value) in object {
            flatten_into(&mut fields, key.clone(), value);
        }
    }
    FlatRecord { fields }
}

fn flatten_into(fields: &mut BTreeMap<String, FlatValue>, key: String, value: &Value) {
    match value {
        Value::Object(children) => {
            for (child_key, child) in children {
                flatten_into(fields, format!("{key}.{child_key}"), child);
            }
        }
        other => {
            fields.insert(key, FlatValue::from(other));
        }
    }
}

fn entry_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}

/// Keeps the first entry per card name, preserving first-seen order.
///
/// Entries without a string `name` cannot be keyed and are dropped.
pub fn dedupe_entries(entries: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for entry in entries {
        let Some(name) = entry_name(&entry) else {
            warn!("skipping catalog entry without a name");
            continue;
        };
        if seen.insert(name.to_string()) {
            unique.push(entry);
        }
    }
    unique
}

/// The deduplicated card catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CardRecord>,
    entries: Vec<Value>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog from raw entries. Repeated names keep the first entry.
    pub fn from_entries(entries: Vec<Value>) -> Self {
        let total = entries.len();
        let mut catalog = Catalog::default();
        for entry in dedupe_entries(entries) {
            let flat = flatten_entry(&entry);
            let Some(record) = CardRecord::from_entry(&entry, flat) else {
                continue;
            };
            catalog
                .index
                .insert(record.name.clone(), catalog.records.len());
            catalog.records.push(record);
            catalog.entries.push(entry);
        }
        debug!(total, unique = catalog.len(), "catalog built");
        catalog
    }

    /// Loads a catalog from a JSON array file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let entries = read_entries(path)?;
        let catalog = Self::from_entries(entries);
        info!(path = %path.display(), cards = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Writes the deduplicated entries back out, one object per unique name.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        write_entries(path.as_ref(), &self.entries)
    }

    /// Card names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.name.as_str())
    }

    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    /// Original entries, aligned with [`Catalog::records`].
    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&CardRecord> {
        self.position(name).map(|idx| &self.records[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Counts reported by [`dedupe_catalog_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupeReport {
    pub total: usize,
    pub unique: usize,
}

/// Reads a raw bulk file, keeps the first printing of every card name, and
/// writes the result to `unique_path`.
pub fn dedupe_catalog_file(
    raw_path: impl AsRef<Path>,
    unique_path: impl AsRef<Path>,
) -> Result<DedupeReport, CatalogError> {
    let raw_path = raw_path.as_ref();
    let unique_path = unique_path.as_ref();
    let entries = read_entries(raw_path)?;
    let total = entries.len();
    let unique = dedupe_entries(entries);
    write_entries(unique_path, &unique)?;

    let report = DedupeReport {
        total,
        unique: unique.len(),
    };
    info!(
        raw = %raw_path.display(),
        out = %unique_path.display(),
        total = report.total,
        unique = report.unique,
        "deduplicated catalog"
    );
    Ok(report)
}

fn read_entries(path: &Path) -> Result<Vec<Value>, CatalogError> {
    let file = fs::File::open(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    match value {
        Value::Array(entries) => Ok(entries),
        _ => Err(CatalogError::NotAnArray(path.to_path_buf())),
    }
}

fn write_entries(path: &Path, entries: &[Value]) -> Result<(), CatalogError> {
    let file = fs::File::create(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer(BufWriter::new(file), entries).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}
