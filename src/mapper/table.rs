use super::TargetType;
use crate::error::MappingTableError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const BUILTIN_TABLE: &str = include_str!("default_table.json");

/// On-disk form of a mapping table.
#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    version: String,
    entries: Vec<TableEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableEntry {
    source: String,
    target: String,
}

/// A versioned, read-only `source_type -> TargetType` lookup.
///
/// Keys are either a bare source type (`http:request`) or a source type
/// qualified by its variant (`connectoraction:database`). Lookups try the
/// qualified key first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    version: String,
    entries: IndexMap<String, TargetType>,
}

impl MappingTable {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            entries: IndexMap::new(),
        }
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, MappingTableError> {
        Self::from_json_str(BUILTIN_TABLE)
    }

    /// Loads a table from its JSON form:
    /// `{"version": "...", "entries": [{"source": "...", "target": "..."}]}`.
    pub fn from_json_str(json: &str) -> Result<Self, MappingTableError> {
        let file: TableFile =
            serde_json::from_str(json).map_err(|e| MappingTableError::Parse(e.to_string()))?;
        let mut table = Self::new(file.version);
        for entry in file.entries {
            let target = entry.target.parse::<TargetType>().map_err(|_| {
                MappingTableError::UnknownTarget {
                    source_type: entry.source.clone(),
                    target: entry.target.clone(),
                }
            })?;
            if table.entries.contains_key(&entry.source) {
                return Err(MappingTableError::DuplicateEntry(entry.source));
            }
            table.entries.insert(entry.source, target);
        }
        Ok(table)
    }

    pub fn to_json_string(&self) -> Result<String, MappingTableError> {
        let file = TableFile {
            version: self.version.clone(),
            entries: self
                .entries
                .iter()
                .map(|(source, target)| TableEntry {
                    source: source.clone(),
                    target: target.as_str().to_string(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| MappingTableError::Parse(e.to_string()))
    }

    /// Adds or replaces an entry.
    pub fn with_entry(mut self, source: impl Into<String>, target: TargetType) -> Self {
        self.entries.insert(source.into(), target);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<TargetType> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up `source_type:variant`, then `source_type`. Returns the matched key too.
    pub fn lookup(&self, source_type: &str, variant: Option<&str>) -> Option<(TargetType, String)> {
        if let Some(variant) = variant {
            let key = format!("{}:{}", source_type, variant);
            if let Some(target) = self.get(&key) {
                return Some((target, key));
            }
        }
        self.get(source_type)
            .map(|target| (target, source_type.to_string()))
    }
}
