//! Source → destination column renaming.

use crate::error::{SqlGenError, SqlGenResult};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Maps source column names to destination column names.
///
/// Columns without an entry keep their source name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AliasMap {
    aliases: BTreeMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `"source": "destination"` pairs.
    ///
    /// An empty or blank input yields an empty map.
    pub fn from_json(json: &str) -> SqlGenResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        let parsed: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            SqlGenError::configuration(format!("column alias spec is not valid JSON: {e}"))
        })?;
        let serde_json::Value::Object(entries) = parsed else {
            return Err(SqlGenError::configuration(
                "column alias spec must be a JSON object",
            ));
        };

        let mut aliases = BTreeMap::new();
        for (source, dest) in entries {
            let serde_json::Value::String(dest) = dest else {
                return Err(SqlGenError::configuration(format!(
                    "column alias for '{source}' must be a string"
                )));
            };
            aliases.insert(source, dest);
        }
        Ok(Self { aliases })
    }

    pub fn insert(&mut self, source: impl Into<String>, dest: impl Into<String>) -> &mut Self {
        self.aliases.insert(source.into(), dest.into());
        self
    }

    /// Destination name for `source`.
    pub fn map<'a>(&'a self, source: &'a str) -> &'a str {
        self.aliases.get(source).map_or(source, String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Map each source column, failing if two land on the same destination.
    pub fn map_all_unique<S: AsRef<str>>(&self, sources: &[S]) -> SqlGenResult<Vec<String>> {
        let mapped: Vec<String> = sources
            .iter()
            .map(|s| self.map(s.as_ref()).to_string())
            .collect();
        ensure_unique(&mapped)?;
        Ok(mapped)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            aliases: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Fail with [`SqlGenError::DuplicateColumn`] when a name appears more than once.
///
/// Every colliding name is listed once, in first-seen order.
pub fn ensure_unique<S: AsRef<str>>(mapped: &[S]) -> SqlGenResult<()> {
    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(mapped.len());
    for name in mapped {
        *counts.entry(name.as_ref()).or_default() += 1;
    }
    if counts.len() == mapped.len() {
        return Ok(());
    }

    let mut names: Vec<String> = Vec::new();
    for name in mapped {
        let name = name.as_ref();
        if counts[name] > 1 && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    Err(SqlGenError::DuplicateColumn { names })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_falls_back_to_identity() {
        let aliases: AliasMap = [("nm", "name")].into_iter().collect();
        assert_eq!(aliases.map("nm"), "name");
        assert_eq!(aliases.map("id"), "id");
    }

    #[test]
    fn ensure_unique_accepts_distinct() {
        assert!(ensure_unique(&["a", "b", "c"]).is_ok());
        assert!(ensure_unique::<&str>(&[]).is_ok());
    }

    #[test]
    fn ensure_unique_lists_every_collision() {
        let err = ensure_unique(&["a", "x", "b", "x", "a", "c"]).unwrap_err();
        let SqlGenError::DuplicateColumn { names } = err else {
            panic!("expected duplicate column error");
        };
        assert_eq!(names, vec!["a".to_string(), "x".to_string()]);
    }

    #[test]
    fn map_all_unique_detects_alias_collision() {
        let aliases: AliasMap = [("first", "name"), ("last", "name")].into_iter().collect();
        let err = aliases.map_all_unique(&["id", "first", "last"]).unwrap_err();
        assert!(err.is_duplicate_column());
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn alias_onto_existing_column_collides() {
        let aliases: AliasMap = [("nm", "name")].into_iter().collect();
        assert!(aliases.map_all_unique(&["name", "nm"]).is_err());
    }

    #[test]
    fn from_json_object() {
        let aliases = AliasMap::from_json(r#"{"原始表名": "src_table", "b": "beta"}"#).unwrap();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases.map("原始表名"), "src_table");
    }

    #[test]
    fn from_json_blank_is_empty() {
        assert!(AliasMap::from_json("  ").unwrap().is_empty());
        assert!(AliasMap::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn from_json_rejects_malformed() {
        assert!(AliasMap::from_json("{").unwrap_err().is_configuration());
        assert!(AliasMap::from_json("[1, 2]").unwrap_err().is_configuration());
        assert!(AliasMap::from_json(r#"{"a": 1}"#).unwrap_err().is_configuration());
    }
}
