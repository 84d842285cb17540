//! Strategy selection from a JSON configuration document.
//!
//! The document names a strategy and carries per-strategy tuning blocks:
//!
//! ```json
//! {
//!   "map_type": "flat_map",
//!   "map_options": {
//!     "btree_map": { "initial_size": 1000 },
//!     "flat_map": { "initial_size": 1000, "load_factor": 0.75 }
//!   }
//! }
//! ```
//!
//! Missing option blocks fall back to their defaults. Only `map_type` is
//! required. `boost_map` and `std_map` are accepted as older names for
//! `flat_map` and `btree_map`, both as `map_type` and as option block keys.

use std::borrow::Borrow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::btree::BTreeStrategy;
use super::flat::{FlatIter, FlatStrategy};
use super::OrderedMap;
use crate::error::ConfigError;

const DEFAULT_INITIAL_SIZE: usize = 1000;
const DEFAULT_LOAD_FACTOR: f32 = 0.75;

fn default_initial_size() -> usize {
    DEFAULT_INITIAL_SIZE
}

fn default_load_factor() -> f32 {
    DEFAULT_LOAD_FACTOR
}

// ---------------------------------------------------------------------------
// Configuration document
// ---------------------------------------------------------------------------

/// Tuning for the B-tree strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BTreeOptions {
    pub initial_size: usize,
}

impl Default for BTreeOptions {
    fn default() -> Self {
        Self {
            initial_size: DEFAULT_INITIAL_SIZE,
        }
    }
}

/// Tuning for the sorted-vector strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatOptions {
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,
    #[serde(default = "default_load_factor")]
    pub load_factor: f32,
}

impl Default for FlatOptions {
    fn default() -> Self {
        Self {
            initial_size: DEFAULT_INITIAL_SIZE,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

/// Per-strategy option blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    #[serde(alias = "std_map")]
    pub btree_map: BTreeOptions,
    #[serde(alias = "boost_map")]
    pub flat_map: FlatOptions,
}

/// Parsed strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Strategy name, see [`StrategyKind`].
    pub map_type: String,
    #[serde(default)]
    pub map_options: MapOptions,
}

impl MapConfig {
    /// Configuration selecting `kind` with default options.
    #[must_use]
    pub fn for_kind(kind: StrategyKind) -> Self {
        Self {
            map_type: kind.as_str().to_string(),
            map_options: MapOptions::default(),
        }
    }

    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not a valid document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its contents are malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Resolves the configured strategy name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownStrategy`] for unrecognised names.
    pub fn kind(&self) -> Result<StrategyKind, ConfigError> {
        self.map_type.parse()
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::for_kind(StrategyKind::BTree)
    }
}

/// Known strategy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    BTree,
    Flat,
}

impl StrategyKind {
    /// Name used in configuration documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BTree => "btree_map",
            Self::Flat => "flat_map",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "btree_map" | "std_map" => Ok(Self::BTree),
            "flat_map" | "boost_map" => Ok(Self::Flat),
            other => Err(ConfigError::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// The closed set of ordered-map strategies, chosen at construction.
#[derive(Debug, Clone)]
pub enum MapBackend<K, V> {
    BTree(BTreeStrategy<K, V>),
    Flat(FlatStrategy<K, V>),
}

impl<K: Ord, V> MapBackend<K, V> {
    /// Builds the strategy named by `config`, tuned by its option block.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownStrategy`] for an unrecognised
    /// `map_type` and [`ConfigError::InvalidOption`] when the selected
    /// strategy rejects its options.
    pub fn from_config(config: &MapConfig) -> Result<Self, ConfigError> {
        let options = &config.map_options;
        let backend = match config.kind()? {
            StrategyKind::BTree => Self::BTree(BTreeStrategy::new(options.btree_map.initial_size)),
            StrategyKind::Flat => Self::Flat(FlatStrategy::new(
                options.flat_map.initial_size,
                options.flat_map.load_factor,
            )?),
        };
        tracing::debug!(strategy = %backend.kind(), "ordered map strategy selected");
        Ok(backend)
    }

    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::BTree(_) => StrategyKind::BTree,
            Self::Flat(_) => StrategyKind::Flat,
        }
    }
}

/// Iterator over whichever strategy backs a [`MapBackend`].
pub enum BackendIter<'a, K, V> {
    BTree(std::collections::btree_map::Range<'a, K, V>),
    Flat(FlatIter<'a, K, V>),
}

impl<'a, K, V> Iterator for BackendIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::BTree(it) => it.next(),
            Self::Flat(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::BTree(it) => it.size_hint(),
            Self::Flat(it) => it.size_hint(),
        }
    }
}

impl<K: Ord, V> OrderedMap<K, V> for MapBackend<K, V> {
    type Iter<'a>
        = BackendIter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        match self {
            Self::BTree(m) => m.insert(key, value),
            Self::Flat(m) => m.insert(key, value),
        }
    }

    fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Self::BTree(m) => m.remove(key),
            Self::Flat(m) => m.remove(key),
        }
    }

    fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Self::BTree(m) => m.get(key),
            Self::Flat(m) => m.get(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::BTree(m) => m.len(),
            Self::Flat(m) => m.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::BTree(m) => m.clear(),
            Self::Flat(m) => m.clear(),
        }
    }

    fn iter(&self) -> Self::Iter<'_> {
        match self {
            Self::BTree(m) => BackendIter::BTree(m.iter()),
            Self::Flat(m) => BackendIter::Flat(m.iter()),
        }
    }

    fn lower_bound<Q>(&self, key: &Q) -> Self::Iter<'_>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Self::BTree(m) => BackendIter::BTree(m.lower_bound(key)),
            Self::Flat(m) => BackendIter::Flat(m.lower_bound(key)),
        }
    }

    fn upper_bound<Q>(&self, key: &Q) -> Self::Iter<'_>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Self::BTree(m) => BackendIter::BTree(m.upper_bound(key)),
            Self::Flat(m) => BackendIter::Flat(m.upper_bound(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn build(json: &str) -> Result<MapBackend<String, String>, ConfigError> {
        MapBackend::from_config(&MapConfig::from_json(json)?)
    }

    #[test]
    fn selects_configured_strategy() {
        let tree = build(r#"{"map_type": "btree_map"}"#).unwrap();
        assert_eq!(tree.kind(), StrategyKind::BTree);

        let flat = build(
            r#"{"map_type": "flat_map", "map_options": {"flat_map": {"initial_size": 64, "load_factor": 0.5}}}"#,
        )
        .unwrap();
        assert_eq!(flat.kind(), StrategyKind::Flat);
        match flat {
            MapBackend::Flat(inner) => {
                assert!(inner.capacity() >= 64);
                assert!((inner.load_factor() - 0.5).abs() < f32::EPSILON);
            }
            MapBackend::BTree(_) => panic!("expected flat strategy"),
        }
    }

    #[test]
    fn missing_options_use_defaults() {
        let config = MapConfig::from_json(r#"{"map_type": "flat_map"}"#).unwrap();
        assert_eq!(config.map_options.flat_map.initial_size, 1000);
        assert!((config.map_options.flat_map.load_factor - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.map_options.btree_map.initial_size, 1000);

        let partial =
            MapConfig::from_json(r#"{"map_type": "flat_map", "map_options": {"flat_map": {"initial_size": 8}}}"#)
                .unwrap();
        assert_eq!(partial.map_options.flat_map.initial_size, 8);
        assert!((partial.map_options.flat_map.load_factor - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn legacy_strategy_names_are_aliases() {
        let flat = MapConfig::from_json(
            r#"{"map_type": "boost_map", "map_options": {"boost_map": {"initial_size": 32, "load_factor": 0.5}}}"#,
        )
        .unwrap();
        assert_eq!(flat.kind().unwrap(), StrategyKind::Flat);
        assert_eq!(flat.map_options.flat_map.initial_size, 32);
        assert!((flat.map_options.flat_map.load_factor - 0.5).abs() < f32::EPSILON);

        let tree = MapConfig::from_json(
            r#"{"map_type": "std_map", "map_options": {"std_map": {"initial_size": 16}}}"#,
        )
        .unwrap();
        assert_eq!(tree.kind().unwrap(), StrategyKind::BTree);
        assert_eq!(tree.map_options.btree_map.initial_size, 16);
        assert_eq!(MapBackend::<String, String>::from_config(&tree).unwrap().kind(), StrategyKind::BTree);

        // Canonical names are what gets written back.
        assert_eq!(StrategyKind::Flat.to_string(), "flat_map");
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = build(r#"{"map_type": "unknown_map"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStrategy { ref name } if name == "unknown_map"));
        assert_eq!(err.to_string(), "unknown map strategy: unknown_map");
    }

    #[test]
    fn invalid_load_factor_is_rejected() {
        let err = build(r#"{"map_type": "flat_map", "map_options": {"flat_map": {"load_factor": 2.0}}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "load_factor", .. }));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        assert!(matches!(MapConfig::from_json("{"), Err(ConfigError::Parse(_))));
        assert!(matches!(MapConfig::from_json("{}"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn reads_document_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"map_type": "btree_map"}}"#).unwrap();
        let config = MapConfig::from_path(file.path()).unwrap();
        assert_eq!(config.kind().unwrap(), StrategyKind::BTree);

        let missing = MapConfig::from_path(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn every_backend_answers_ordered_queries_alike() {
        for kind in [StrategyKind::BTree, StrategyKind::Flat] {
            let mut map: MapBackend<String, String> =
                MapBackend::from_config(&MapConfig::for_kind(kind)).unwrap();
            for i in 1..=3 {
                assert!(map.insert(format!("key{i}"), format!("value{i}")));
            }
            assert!(!map.insert("key1".to_string(), "other".to_string()));

            let lower = map.lower_bound("key2").next().map(|(k, v)| (k.clone(), v.clone()));
            assert_eq!(lower, Some(("key2".to_string(), "value2".to_string())), "{kind}");

            let upper = map.upper_bound("key2").next().map(|(k, _)| k.clone());
            assert_eq!(upper.as_deref(), Some("key3"), "{kind}");
            assert!(map.upper_bound("key3").next().is_none(), "{kind}");

            let keys: Vec<&String> = map.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, ["key1", "key2", "key3"], "{kind}");

            assert!(map.remove("key2"));
            assert_eq!(map.len(), 2);
            map.clear();
            assert!(map.is_empty(), "{kind}");
        }
    }
}
