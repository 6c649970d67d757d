//! Resource sets: per-culture value tables with culture fallback.
//!
//! # Invariants
//!
//! 1. **Fallback terminates**: a lookup visits the requested culture's
//!    lineage (`de-AT`, `de`, invariant) and then the explicit fallback
//!    chain, each culture at most once, and returns `None` if none has the key.
//!
//! 2. **Immutable after construction**: a `ResourceSet` is built once and
//!    shared behind `Rc`; lookups never mutate it.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | Key not in any culture on the chain | Returns `None` |
//! | Missing culture | Culture has no table | Falls through the chain |
//! | Empty set | No tables added | All lookups return `None` |

use std::collections::HashMap;

use locbind_core::Culture;

use crate::value::Value;

/// Values for a single culture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTable {
    entries: HashMap<String, Value>,
}

impl ResourceTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all keys in this table.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Parse a flat JSON object of string values.
    ///
    /// ```
    /// use locbind_i18n::catalog::ResourceTable;
    ///
    /// let table = ResourceTable::from_json_str(r#"{"greeting": "Hallo"}"#).unwrap();
    /// assert_eq!(table.get("greeting").and_then(|v| v.as_text()), Some("Hallo"));
    /// ```
    #[cfg(feature = "json")]
    pub fn from_json_str(json: &str) -> Result<Self, crate::provider::ResourceError> {
        let entries: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|err| crate::provider::ResourceError::Parse(err.to_string()))?;
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k, Value::Text(v)))
                .collect(),
        })
    }
}

/// A named collection of per-culture tables.
///
/// # Example
///
/// ```
/// use locbind_core::Culture;
/// use locbind_i18n::catalog::{ResourceSet, ResourceTable};
/// use locbind_i18n::value::Value;
///
/// let mut set = ResourceSet::new("Strings");
/// set.add_culture(Culture::invariant(), ResourceTable::new().with("greeting", "Hello"));
/// set.add_culture(
///     Culture::parse("de").unwrap(),
///     ResourceTable::new().with("greeting", "Hallo"),
/// );
///
/// let de_at = Culture::parse("de-AT").unwrap();
/// assert_eq!(set.lookup("greeting", &de_at), Some(&Value::from("Hallo")));
/// let fr = Culture::parse("fr").unwrap();
/// assert_eq!(set.lookup("greeting", &fr), Some(&Value::from("Hello")));
/// ```
#[derive(Debug, Clone)]
pub struct ResourceSet {
    name: String,
    tables: HashMap<Culture, ResourceTable>,
    fallback_chain: Vec<Culture>,
}

impl ResourceSet {
    /// Create an empty set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: HashMap::new(),
            fallback_chain: Vec::new(),
        }
    }

    /// Name the set is resolved by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add (or replace) the table for a culture.
    pub fn add_culture(&mut self, culture: Culture, table: ResourceTable) {
        self.tables.insert(culture, table);
    }

    /// Builder-style [`add_culture`](Self::add_culture).
    #[must_use]
    pub fn with_culture(mut self, culture: Culture, table: ResourceTable) -> Self {
        self.add_culture(culture, table);
        self
    }

    /// Cultures tried after the requested culture's own lineage.
    ///
    /// Example: `["en"]` makes English the last resort for a set whose
    /// invariant table is incomplete.
    pub fn set_fallback_chain(&mut self, chain: Vec<Culture>) {
        self.fallback_chain = chain;
    }

    /// Look up a value, walking the culture lineage then the fallback chain.
    #[must_use]
    pub fn lookup(&self, key: &str, culture: &Culture) -> Option<&Value> {
        self.lookup_entry(key, culture).map(|(_, value)| value)
    }

    /// Like [`lookup`](Self::lookup), also reporting the culture of the
    /// table that supplied the value. Text values are written in that
    /// culture's conventions, not the requested one's.
    #[must_use]
    pub fn lookup_entry(&self, key: &str, culture: &Culture) -> Option<(&Culture, &Value)> {
        let lineage = culture.lineage();
        lineage
            .iter()
            .chain(
                self.fallback_chain
                    .iter()
                    .filter(|fb| !lineage.contains(fb)),
            )
            .find_map(|c| {
                let (source, table) = self.tables.get_key_value(c)?;
                table.get(key).map(|value| (source, value))
            })
    }

    /// Look up a value in exactly one culture, without fallback.
    #[must_use]
    pub fn lookup_exact(&self, key: &str, culture: &Culture) -> Option<&Value> {
        self.tables.get(culture).and_then(|t| t.get(key))
    }

    /// All cultures that have a table, sorted.
    #[must_use]
    pub fn cultures(&self) -> Vec<&Culture> {
        let mut cultures: Vec<&Culture> = self.tables.keys().collect();
        cultures.sort_unstable();
        cultures
    }

    // -----------------------------------------------------------------
    // Coverage diagnostics
    // -----------------------------------------------------------------

    /// Collect all unique keys across every table, sorted.
    #[must_use]
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .tables
            .values()
            .flat_map(|t| t.keys().map(String::from))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Keys from `reference_keys` that `culture` cannot resolve, even with
    /// fallback. Sorted.
    #[must_use]
    pub fn missing_keys(&self, culture: &Culture, reference_keys: &[&str]) -> Vec<String> {
        let mut missing: Vec<String> = reference_keys
            .iter()
            .filter(|key| self.lookup(key, culture).is_none())
            .map(|key| (*key).to_string())
            .collect();
        missing.sort_unstable();
        missing
    }

    /// Per-culture coverage against [`all_keys`](Self::all_keys).
    #[must_use]
    pub fn coverage_report(&self) -> CoverageReport {
        let all = self.all_keys();
        let reference: Vec<&str> = all.iter().map(String::as_str).collect();
        let total = reference.len();

        let cultures = self
            .cultures()
            .into_iter()
            .map(|culture| {
                let missing = self.missing_keys(culture, &reference);
                let present = total.saturating_sub(missing.len());
                CultureCoverage {
                    culture: culture.clone(),
                    present,
                    missing,
                    coverage_percent: if total == 0 {
                        100.0
                    } else {
                        (present as f32 / total as f32) * 100.0
                    },
                }
            })
            .collect();

        CoverageReport {
            total_keys: total,
            cultures,
        }
    }
}

/// Coverage report for a resource set.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    /// Unique keys across all tables.
    pub total_keys: usize,
    pub cultures: Vec<CultureCoverage>,
}

/// Coverage of a single culture, fallback included.
#[derive(Debug, Clone)]
pub struct CultureCoverage {
    pub culture: Culture,
    pub present: usize,
    /// Unresolvable keys, sorted.
    pub missing: Vec<String>,
    /// `present / total * 100`, or 100 for an empty set.
    pub coverage_percent: f32,
}
