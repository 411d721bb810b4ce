//! Profile-local persistence for submitted recommendations.
//!
//! [`KeyValueStore`] is the string-to-string storage seam, shaped like browser
//! local storage. [`LocalStore`] keeps the list of
//! submitted recommendations under one key and repairs corrupted values.

use std::collections::BTreeMap;

use testimonial_core::{
    parse_stored_value, Recommendation, StoredRecommendation, StoredValueError,
    DEFAULT_STORAGE_KEY,
};
use tracing::{debug, error};

/// Default quota applied by persistent backends, matching common browser limits.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("storage quota exceeded: {requested} bytes requested, limit is {quota} bytes")]
    QuotaExceeded { requested: usize, quota: usize },
    #[error("failed to serialize recommendations: {0}")]
    Serialize(String),
}

/// A stored value that does not match the persisted schema.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
#[error("stored value under `{key}` is invalid: {source}")]
pub struct StoreParseError {
    pub key: String,
    #[source]
    pub source: StoredValueError,
}

pub trait KeyValueStore {
    /// # Errors
    /// Returns [`StoreError::Backend`] when the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the whole value under `key`.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the write is rejected; the previous value
    /// is left untouched.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// # Errors
    /// Returns [`StoreError::Backend`] when the backing storage cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Reject a write that would push total usage past `quota`.
///
/// `used_by_others` is the size of every entry except the one being replaced.
///
/// # Errors
/// Returns [`StoreError::QuotaExceeded`] when the new total exceeds the quota.
pub fn ensure_within_quota(
    used_by_others: usize,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> Result<(), StoreError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let requested = used_by_others.saturating_add(key.len()).saturating_add(value.len());
    if requested > quota {
        return Err(StoreError::QuotaExceeded { requested, quota });
    }
    Ok(())
}

/// Ephemeral store for tests and sessions that should not touch disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self { entries: BTreeMap::new(), quota_bytes: Some(quota_bytes) }
    }

    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(key, value)| key.len() + value.len()).sum()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let replaced = self.entries.get(key).map_or(0, |old| key.len() + old.len());
        ensure_within_quota(self.used_bytes() - replaced, key, value, self.quota_bytes)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// The submitted-recommendation list kept under a single storage key.
#[derive(Debug)]
pub struct LocalStore<S> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> LocalStore<S> {
    pub fn new(backend: S) -> Self {
        Self::with_key(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(backend: S, key: impl Into<String>) -> Self {
        Self { backend, key: key.into() }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    /// Read the stored list. Never fails: unreadable storage yields an empty
    /// list, and an invalid value is logged, removed, and treated as empty.
    /// An empty string counts as absent.
    pub fn load(&mut self) -> Vec<Recommendation> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return Vec::new(),
            Err(err) => {
                error!(key = %self.key, error = %err, "failed to read stored recommendations");
                return Vec::new();
            }
        };

        match parse_stored_value(&raw) {
            Ok(records) => records,
            Err(source) => {
                self.repair(&StoreParseError { key: self.key.clone(), source });
                Vec::new()
            }
        }
    }

    /// Append one record by rewriting the whole list in a single write.
    /// Dates are rewritten in the canonical millisecond form.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when serialization or the backend write fails;
    /// the stored value is then unchanged.
    pub fn append(&mut self, record: &Recommendation) -> Result<(), StoreError> {
        let records = self
            .load()
            .iter()
            .chain(std::iter::once(record))
            .map(StoredRecommendation::from_recommendation)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| StoreError::Serialize(err.to_string()))?;
        let raw =
            serde_json::to_string(&records).map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.backend.set(&self.key, &raw).inspect_err(|err| {
            error!(key = %self.key, error = %err, "failed to save recommendation");
        })?;
        debug!(key = %self.key, records = records.len(), "stored recommendations rewritten");
        Ok(())
    }

    /// Drop every submitted recommendation.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] when the key cannot be removed.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.remove(&self.key)
    }

    fn repair(&mut self, err: &StoreParseError) {
        error!(error = %err, "error parsing stored recommendations; clearing key");
        if let Err(remove_err) = self.backend.remove(&self.key) {
            error!(key = %self.key, error = %remove_err, "failed to clear corrupted recommendations");
        }
    }
}

#[cfg(test)]
mod tests {
    use testimonial_core::{parse_timestamp, Origin};

    use super::*;

    fn record(name: &str, date: &str) -> Recommendation {
        let Some(date) = parse_timestamp(date) else {
            panic!("fixture date `{date}` should parse");
        };
        Recommendation {
            name: name.to_string(),
            text: format!("{name} ships reliable code"),
            date,
            origin: Origin::Submitted,
        }
    }

    fn stored_raw<S: KeyValueStore>(store: &LocalStore<S>) -> Option<String> {
        match store.backend().get(store.key()) {
            Ok(raw) => raw,
            Err(err) => panic!("backend read failed: {err}"),
        }
    }

    #[test]
    fn load_returns_empty_when_key_absent() {
        let mut store = LocalStore::new(MemoryKeyValueStore::new());
        assert!(store.load().is_empty());
        assert_eq!(store.key(), DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn append_then_load_preserves_storage_order() {
        let mut store = LocalStore::new(MemoryKeyValueStore::new());
        let seeded = [("Ann", "2026-01-02T00:00:00.000Z"), ("Bo", "2025-12-31T00:00:00.000Z")];
        for (name, date) in seeded {
            if let Err(err) = store.append(&record(name, date)) {
                panic!("append failed: {err}");
            }
        }

        let loaded = store.load();
        assert_eq!(
            loaded,
            vec![
                record("Ann", "2026-01-02T00:00:00.000Z"),
                record("Bo", "2025-12-31T00:00:00.000Z"),
            ]
        );
    }

    #[test]
    fn empty_string_is_treated_as_absent() {
        let mut backend = MemoryKeyValueStore::new();
        if let Err(err) = backend.set(DEFAULT_STORAGE_KEY, "") {
            panic!("seed failed: {err}");
        }
        let mut store = LocalStore::new(backend);

        assert!(store.load().is_empty());
        assert_eq!(stored_raw(&store), Some(String::new()));

        if let Err(err) = store.append(&record("Ann", "2026-01-02T00:00:00.000Z")) {
            panic!("append failed: {err}");
        }
        assert_eq!(store.load(), vec![record("Ann", "2026-01-02T00:00:00.000Z")]);
    }

    #[test]
    fn append_rewrites_existing_dates_canonically() {
        let mut backend = MemoryKeyValueStore::new();
        let raw = r#"[{"name":"Ann","text":"Ann ships reliable code","date":"2026-01-02"}]"#;
        if let Err(err) = backend.set(DEFAULT_STORAGE_KEY, raw) {
            panic!("seed failed: {err}");
        }
        let mut store = LocalStore::new(backend);

        if let Err(err) = store.append(&record("Bo", "2026-01-03T08:00:00.000Z")) {
            panic!("append failed: {err}");
        }

        let Some(rewritten) = stored_raw(&store) else {
            panic!("value should be present after append");
        };
        assert!(rewritten.contains("\"date\":\"2026-01-02T00:00:00.000Z\""), "{rewritten}");
        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn corrupted_value_is_cleared_on_load() {
        let mut backend = MemoryKeyValueStore::new();
        if let Err(err) = backend.set(DEFAULT_STORAGE_KEY, "definitely not json") {
            panic!("seed failed: {err}");
        }
        let mut store = LocalStore::new(backend);

        assert!(store.load().is_empty());
        assert_eq!(stored_raw(&store), None);
    }

    #[test]
    fn structurally_invalid_records_reset_the_whole_key() {
        let mut backend = MemoryKeyValueStore::new();
        let raw = r#"[{"name":"Ann","text":"ok","date":"2026-01-02"},{"name":"Bo","text":"ok"}]"#;
        if let Err(err) = backend.set("custom", raw) {
            panic!("seed failed: {err}");
        }
        let mut store = LocalStore::with_key(backend, "custom");

        assert!(store.load().is_empty());
        assert_eq!(stored_raw(&store), None);
    }

    #[test]
    fn append_over_corrupted_value_starts_fresh() {
        let mut backend = MemoryKeyValueStore::new();
        if let Err(err) = backend.set(DEFAULT_STORAGE_KEY, "{\"oops\":1}") {
            panic!("seed failed: {err}");
        }
        let mut store = LocalStore::new(backend);

        if let Err(err) = store.append(&record("Ann", "2026-01-02T00:00:00.000Z")) {
            panic!("append failed: {err}");
        }
        assert_eq!(store.load(), vec![record("Ann", "2026-01-02T00:00:00.000Z")]);
    }

    #[test]
    fn quota_failure_leaves_prior_value_intact() {
        let mut store = LocalStore::new(MemoryKeyValueStore::with_quota(200));
        if let Err(err) = store.append(&record("Ann", "2026-01-02T00:00:00.000Z")) {
            panic!("first append should fit: {err}");
        }
        let before = stored_raw(&store);

        let result = store.append(&record(&"x".repeat(300), "2026-01-03T00:00:00.000Z"));

        assert!(matches!(result, Err(StoreError::QuotaExceeded { quota: 200, .. })));
        assert_eq!(stored_raw(&store), before);
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn clear_removes_only_the_configured_key() {
        let mut backend = MemoryKeyValueStore::new();
        if let Err(err) = backend.set("theme", "dark") {
            panic!("seed failed: {err}");
        }
        let mut store = LocalStore::new(backend);
        if let Err(err) = store.append(&record("Ann", "2026-01-02T00:00:00.000Z")) {
            panic!("append failed: {err}");
        }

        if let Err(err) = store.clear() {
            panic!("clear failed: {err}");
        }

        assert!(store.load().is_empty());
        assert_eq!(store.backend().get("theme"), Ok(Some("dark".to_string())));
    }

    #[test]
    fn quota_counts_replaced_entry_once() {
        let mut backend = MemoryKeyValueStore::with_quota(10);
        assert_eq!(backend.set("k", "123456789"), Ok(()));
        assert_eq!(backend.set("k", "987654321"), Ok(()));
        assert!(matches!(
            backend.set("k", "1234567890"),
            Err(StoreError::QuotaExceeded { requested: 11, quota: 10 })
        ));
        assert_eq!(backend.used_bytes(), 10);
    }
}
