//! SKU catalog model
//!
//! The in-memory list of products an analysis run can look for. Entries are
//! ordered, duplicate-free under name normalization, and survive restarts
//! via the `sku_items` table. All mutation goes through `SkuCatalog` so the
//! duplicate invariant cannot be bypassed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::accuracy::normalize_name;

/// Built-in catalog used on first launch and by "reset to defaults"
pub const DEFAULT_SKU_ITEMS: &[&str] = &[
    "Coca-Cola bottles",
    "Pepsi bottles",
    "Water bottles",
    "Energy drinks",
    "Juice boxes",
    "Chips/Crisps",
    "Chocolate bars",
    "Cookies",
    "Milk cartons",
    "Yogurt cups",
];

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("SKU name cannot be blank")]
    BlankName,

    #[error("Duplicate SKU: {0}")]
    Duplicate(String),

    #[error("Index {index} out of range (catalog has {len} items)")]
    OutOfRange { index: usize, len: usize },
}

/// One catalog entry
///
/// `facing_touching` and `shelf_no` are optional planogram hints passed to
/// the detection prompt; they never participate in name matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing_touching: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelf_no: Option<u32>,
}

impl SkuEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            facing_touching: None,
            shelf_no: None,
        }
    }

    /// Entry with leading/trailing whitespace stripped and empty code dropped
    fn cleaned(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.code = self
            .code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }
}

/// Catalog entry as accepted on import: either a bare name string or a
/// full entry object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntrySpec {
    Entry(SkuEntry),
    Name(String),
}

impl CatalogEntrySpec {
    pub fn into_entry(self) -> SkuEntry {
        match self {
            CatalogEntrySpec::Entry(entry) => entry,
            CatalogEntrySpec::Name(name) => SkuEntry::named(name),
        }
    }
}

/// How an imported document combines with the existing catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Discard the current catalog and load the document
    Replace,
    /// Keep the current catalog and append new entries
    Merge,
}

/// Counters returned by bulk add and import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub added: usize,
    pub duplicates: usize,
}

/// Exported catalog document: `{ sku_items, total_items, export_timestamp }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogExport {
    pub sku_items: Vec<SkuEntry>,
    pub total_items: usize,
    pub export_timestamp: DateTime<Utc>,
}

/// Ordered, duplicate-free product list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkuCatalog {
    entries: Vec<SkuEntry>,
}

impl SkuCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for name in DEFAULT_SKU_ITEMS {
            // Defaults are distinct by construction
            let _ = catalog.add(SkuEntry::named(*name));
        }
        catalog
    }

    /// Catalog from arbitrary entries, first spelling wins on collisions
    pub fn from_entries(entries: Vec<SkuEntry>) -> (Self, ImportOutcome) {
        let mut catalog = Self::new();
        let outcome = catalog.merge_entries(entries);
        (catalog, outcome)
    }

    pub fn entries(&self) -> &[SkuEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| normalize_name(&e.name) == key)
    }

    /// Append one entry
    ///
    /// Rejects blank names and names already present under normalization.
    pub fn add(&mut self, entry: SkuEntry) -> Result<(), CatalogError> {
        let entry = entry.cleaned();
        let key = normalize_name(&entry.name);
        if key.is_empty() {
            return Err(CatalogError::BlankName);
        }
        if self.contains_key(&key) {
            return Err(CatalogError::Duplicate(entry.name));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Add one entry per non-blank line of `text`, counting duplicates
    pub fn add_bulk(&mut self, text: &str) -> ImportOutcome {
        let entries = text
            .lines()
            .map(|line| SkuEntry::named(line))
            .collect::<Vec<_>>();
        self.merge_entries(entries)
    }

    fn merge_entries(&mut self, entries: Vec<SkuEntry>) -> ImportOutcome {
        let mut outcome = ImportOutcome {
            added: 0,
            duplicates: 0,
        };
        for entry in entries {
            match self.add(entry) {
                Ok(()) => outcome.added += 1,
                Err(CatalogError::Duplicate(_)) => outcome.duplicates += 1,
                // Blank lines are skipped silently on bulk paths
                Err(_) => {}
            }
        }
        outcome
    }

    /// Replace the entry at `index`
    pub fn edit(&mut self, index: usize, entry: SkuEntry) -> Result<(), CatalogError> {
        if index >= self.entries.len() {
            return Err(CatalogError::OutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let entry = entry.cleaned();
        let key = normalize_name(&entry.name);
        if key.is_empty() {
            return Err(CatalogError::BlankName);
        }
        let collides = self
            .entries
            .iter()
            .enumerate()
            .any(|(i, e)| i != index && normalize_name(&e.name) == key);
        if collides {
            return Err(CatalogError::Duplicate(entry.name));
        }
        self.entries[index] = entry;
        Ok(())
    }

    /// Remove and return the entry at `index`
    pub fn remove(&mut self, index: usize) -> Result<SkuEntry, CatalogError> {
        if index >= self.entries.len() {
            return Err(CatalogError::OutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::with_defaults();
    }

    /// Sort entries A-Z, case-insensitive, stable for equal keys
    pub fn sort_by_name(&mut self) {
        self.entries
            .sort_by(|a, b| normalize_name(&a.name).cmp(&normalize_name(&b.name)));
    }

    /// Case-insensitive substring search; empty term returns everything
    pub fn search(&self, term: &str) -> Vec<(usize, &SkuEntry)> {
        let needle = term.trim().to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| needle.is_empty() || e.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn export(&self) -> CatalogExport {
        CatalogExport {
            sku_items: self.entries.clone(),
            total_items: self.entries.len(),
            export_timestamp: Utc::now(),
        }
    }

    /// Apply an imported entry list, returning add/duplicate counts
    pub fn import(&mut self, mode: ImportMode, items: Vec<CatalogEntrySpec>) -> ImportOutcome {
        let entries = items.into_iter().map(CatalogEntrySpec::into_entry).collect();
        match mode {
            ImportMode::Replace => {
                let (catalog, outcome) = Self::from_entries(entries);
                *self = catalog;
                outcome
            }
            ImportMode::Merge => self.merge_entries(entries),
        }
    }
}
