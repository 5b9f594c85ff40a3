//! # Storage engine
//!
//! A concurrent mapping from key to [`Entry`], guarded by one
//! `parking_lot::RwLock`, mirroring the single-lock `Storage` struct in
//! `original_source/goodies/storage.go` and the strategy-pattern engine
//! surface the teacher workspace (`hkv-engine/src/engine.rs`) exposes as a
//! trait. Every method here is the Rust counterpart of one `Storage` method
//! from that source, translated to the multi-type [`Value`] model.
//!
//! ## Locking discipline
//!
//! Every access that can observe or act on an expired entry takes the
//! exclusive lock, even when it is logically "just a read" (see SPEC_FULL.md
//! §4.2 and §9): this keeps a single lock acquisition pattern across the
//! whole engine instead of an upgradeable-read dance.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::RwLock;

use goodies_common::{GoodiesError, GoodiesResult};

use crate::value::{Entry, Ttl, Value, NEVER_EXPIRES};

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_nanos()
}

fn expiry_from_ttl(ttl: Ttl, default_ttl: Duration) -> u128 {
    let duration = match ttl {
        Ttl::Never => return NEVER_EXPIRES,
        Ttl::Default => default_ttl,
        Ttl::Seconds(s) => Duration::from_secs(s),
    };
    if duration.is_zero() {
        NEVER_EXPIRES
    } else {
        now_nanos() + duration.as_nanos()
    }
}

/// The in-memory, typed, TTL-aware key/value store.
pub struct Store {
    inner: RwLock<HashMap<String, Entry, RandomState>>,
    default_ttl: Duration,
}

impl Store {
    /// Creates an empty store with the given default TTL, used whenever a
    /// caller passes [`Ttl::Default`]. Most callers construct this from a
    /// whole-seconds CLI flag, but tests may pass sub-second durations to
    /// exercise expiry without a real wall-clock wait.
    pub fn new(default_ttl: Duration) -> Self {
        Store {
            inner: RwLock::new(HashMap::default()),
            default_ttl,
        }
    }

    /// Rehydrates a store from a previously-snapshotted map, as done by the
    /// persister at startup (SPEC_FULL.md §4.3).
    pub fn from_map(map: std::collections::HashMap<String, Entry>, default_ttl: Duration) -> Self {
        let mut inner: HashMap<String, Entry, RandomState> = HashMap::default();
        inner.extend(map);
        Store {
            inner: RwLock::new(inner),
            default_ttl,
        }
    }

    /// Returns a plain-`HashMap` snapshot suitable for encoding, after
    /// evicting expired entries under the same lock acquisition (no entry is
    /// ever torn between cleanup and snapshot, per SPEC_FULL.md §5).
    pub fn snapshot_after_cleanup(&self) -> std::collections::HashMap<String, Entry> {
        let mut guard = self.inner.write();
        evict_expired(&mut guard);
        guard.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Full-map cleanup sweep (SPEC_FULL.md §4.2 "Periodic cleanup").
    pub fn cleanup(&self) -> usize {
        let mut guard = self.inner.write();
        evict_expired(&mut guard)
    }

    pub fn set(&self, key: &str, value: String, ttl: Ttl) {
        let expiry_at = expiry_from_ttl(ttl, self.default_ttl);
        let mut guard = self.inner.write();
        guard.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value),
                expiry_at,
            },
        );
        tracing::debug!(key, "Set");
    }

    pub fn get(&self, key: &str) -> GoodiesResult<String> {
        let mut guard = self.inner.write();
        let entry = get_live(&mut guard, key)?;
        match &entry.value {
            Value::Scalar(s) => Ok(s.clone()),
            _ => Err(GoodiesError::TypeMismatch(
                "requested item is not a string".into(),
            )),
        }
    }

    pub fn update(&self, key: &str, value: String, ttl: Ttl) -> GoodiesResult<()> {
        let mut guard = self.inner.write();
        {
            let entry = get_live(&mut guard, key)?;
            if !matches!(entry.value, Value::Scalar(_)) {
                return Err(GoodiesError::TypeMismatch(
                    "requested item is not a string".into(),
                ));
            }
        }
        let expiry_at = expiry_from_ttl(ttl, self.default_ttl);
        guard.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value),
                expiry_at,
            },
        );
        tracing::debug!(key, "Update");
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        let mut guard = self.inner.write();
        guard.remove(key);
        tracing::debug!(key, "Remove");
    }

    pub fn keys(&self) -> Vec<String> {
        let mut guard = self.inner.write();
        evict_expired(&mut guard);
        guard.keys().cloned().collect()
    }

    pub fn list_push(&self, key: &str, value: String) -> GoodiesResult<()> {
        let mut guard = self.inner.write();
        match get_live_opt(&mut guard, key) {
            Some(entry) => {
                let list = entry.value.as_list_mut().ok_or_else(|| {
                    GoodiesError::TypeMismatch(format!("item {key} is not a list"))
                })?;
                list.push(value);
            }
            None => {
                let expiry_at = expiry_from_ttl(Ttl::Default, self.default_ttl);
                guard.insert(
                    key.to_string(),
                    Entry {
                        value: Value::List(vec![value]),
                        expiry_at,
                    },
                );
            }
        }
        tracing::debug!(key, "ListPush");
        Ok(())
    }

    pub fn list_len(&self, key: &str) -> GoodiesResult<usize> {
        let mut guard = self.inner.write();
        match get_live_opt(&mut guard, key) {
            None => Ok(0),
            Some(entry) => match &entry.value {
                Value::List(l) => Ok(l.len()),
                _ => Err(GoodiesError::TypeMismatch(format!(
                    "item {key} is not a list"
                ))),
            },
        }
    }

    pub fn list_get_by_index(&self, key: &str, index: i64) -> GoodiesResult<String> {
        let mut guard = self.inner.write();
        let entry = get_live(&mut guard, key)?;
        let list = entry
            .value
            .as_list()
            .ok_or_else(|| GoodiesError::TypeMismatch(format!("item {key} is not a list")))?;
        Ok(index_in_bounds(list.len(), index)
            .map(|i| list[i].clone())
            .unwrap_or_default())
    }

    pub fn list_remove_index(&self, key: &str, index: i64) -> GoodiesResult<()> {
        let mut guard = self.inner.write();
        match get_live_opt(&mut guard, key) {
            None => Ok(()),
            Some(entry) => {
                let list = entry.value.as_list_mut().ok_or_else(|| {
                    GoodiesError::TypeMismatch(format!("item {key} is not a list"))
                })?;
                if let Some(i) = index_in_bounds(list.len(), index) {
                    list.remove(i);
                }
                Ok(())
            }
        }
    }

    pub fn list_remove_value(&self, key: &str, value: &str) -> GoodiesResult<()> {
        let mut guard = self.inner.write();
        match get_live_opt(&mut guard, key) {
            None => Ok(()),
            Some(entry) => {
                let list = entry.value.as_list_mut().ok_or_else(|| {
                    GoodiesError::TypeMismatch(format!("item {key} is not a list"))
                })?;
                list.retain(|v| v != value);
                Ok(())
            }
        }
    }

    pub fn dict_set(&self, key: &str, dict_key: &str, value: String) -> GoodiesResult<()> {
        let mut guard = self.inner.write();
        match get_live_opt(&mut guard, key) {
            Some(entry) => {
                let dict = entry.value.as_dict_mut().ok_or_else(|| {
                    GoodiesError::TypeMismatch(format!("item {key} is not a dictionary"))
                })?;
                dict.insert(dict_key.to_string(), value);
            }
            None => {
                let expiry_at = expiry_from_ttl(Ttl::Default, self.default_ttl);
                let mut dict = std::collections::HashMap::with_capacity(1);
                dict.insert(dict_key.to_string(), value);
                guard.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Dict(dict),
                        expiry_at,
                    },
                );
            }
        }
        tracing::debug!(key, dict_key, "DictSet");
        Ok(())
    }

    pub fn dict_get(&self, key: &str, dict_key: &str) -> GoodiesResult<String> {
        let mut guard = self.inner.write();
        let entry = get_live(&mut guard, key)?;
        let dict = match &entry.value {
            Value::Dict(d) => d,
            _ => {
                return Err(GoodiesError::TypeMismatch(format!(
                    "item {key} is not a dictionary"
                )))
            }
        };
        dict.get(dict_key)
            .cloned()
            .ok_or_else(|| GoodiesError::DictKeyNotFound(dict_key.to_string()))
    }

    pub fn dict_remove(&self, key: &str, dict_key: &str) -> GoodiesResult<()> {
        let mut guard = self.inner.write();
        let entry = get_live(&mut guard, key)?;
        let dict = entry.value.as_dict_mut().ok_or_else(|| {
            GoodiesError::TypeMismatch(format!("item {key} is not a dictionary"))
        })?;
        dict.remove(dict_key);
        Ok(())
    }

    pub fn dict_has_key(&self, key: &str, dict_key: &str) -> GoodiesResult<bool> {
        let mut guard = self.inner.write();
        let entry = get_live(&mut guard, key)?;
        let dict = match &entry.value {
            Value::Dict(d) => d,
            _ => {
                return Err(GoodiesError::TypeMismatch(format!(
                    "item {key} is not a dictionary"
                )))
            }
        };
        Ok(dict.contains_key(dict_key))
    }

    pub fn set_expiry(&self, key: &str, ttl: Ttl) -> GoodiesResult<()> {
        let mut guard = self.inner.write();
        let entry = get_live(&mut guard, key)?;
        entry.expiry_at = expiry_from_ttl(ttl, self.default_ttl);
        Ok(())
    }
}

/// `list[index]` bounds check allowing a Rust-safe reading of a signed,
/// possibly-negative index: negative and out-of-range indices are both
/// "out of bounds", matching §8's "index ≥ length ⇒ empty, no error" and
/// extending it to reject negatives the same way instead of panicking.
fn index_in_bounds(len: usize, index: i64) -> Option<usize> {
    if index < 0 {
        return None;
    }
    let index = index as usize;
    if index >= len {
        None
    } else {
        Some(index)
    }
}

/// Evicts every expired entry from `map`, returning the number removed.
fn evict_expired(map: &mut HashMap<String, Entry, RandomState>) -> usize {
    let now = now_nanos();
    let before = map.len();
    map.retain(|_, entry| !entry.is_expired(now));
    let removed = before - map.len();
    if removed > 0 {
        tracing::debug!(removed, "cleanup sweep reaped expired entries");
    }
    removed
}

/// Looks up `key`, lazily evicting it first if expired, and returns a
/// mutable reference to the live entry or `NotFound`.
fn get_live<'a>(
    map: &'a mut HashMap<String, Entry, RandomState>,
    key: &str,
) -> GoodiesResult<&'a mut Entry> {
    get_live_opt(map, key).ok_or_else(|| GoodiesError::NotFound(key.to_string()))
}

/// As [`get_live`], but returns `None` instead of an error on absence so
/// create-or-append callers (`ListPush`, `DictSet`) can branch on it.
fn get_live_opt<'a>(
    map: &'a mut HashMap<String, Entry, RandomState>,
    key: &str,
) -> Option<&'a mut Entry> {
    let now = now_nanos();
    if map.get(key).is_some_and(|e| e.is_expired(now)) {
        map.remove(key);
        tracing::trace!(key, "lazily evicted expired entry");
        return None;
    }
    map.get_mut(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn set_then_get_roundtrips() {
        let store = Store::new(Duration::from_secs(30));
        store.set("test", "expected".into(), Ttl::Never);
        assert_eq!(store.get("test").unwrap(), "expected");
        assert!(matches!(store.get("missing"), Err(GoodiesError::NotFound(_))));
    }

    #[test]
    fn default_ttl_expires_entry() {
        let store = Store::new(Duration::from_millis(25));
        store.set("exp", "1".into(), Ttl::Default);
        sleep(Duration::from_millis(10));
        assert_eq!(store.get("exp").unwrap(), "1");
        sleep(Duration::from_millis(30));
        assert!(matches!(store.get("exp"), Err(GoodiesError::NotFound(_))));
    }

    #[test]
    fn ttl_never_survives_past_default() {
        let store = Store::new(Duration::from_millis(10));
        store.set("perm", "v".into(), Ttl::Never);
        sleep(Duration::from_millis(30));
        assert_eq!(store.get("perm").unwrap(), "v");
    }

    #[test]
    fn list_push_len_remove_index() {
        let store = Store::new(Duration::from_secs(30));
        store.list_push("L", "a".into()).unwrap();
        store.list_push("L", "b".into()).unwrap();
        store.list_push("L", "c".into()).unwrap();
        store.list_push("L", "d".into()).unwrap();
        assert_eq!(store.list_len("L").unwrap(), 4);
        store.list_remove_index("L", 0).unwrap();
        assert_eq!(store.list_len("L").unwrap(), 3);
        assert_eq!(store.list_get_by_index("L", 0).unwrap(), "b");
    }

    #[test]
    fn list_get_out_of_range_is_empty_not_error() {
        let store = Store::new(Duration::from_secs(30));
        store.list_push("L", "a".into()).unwrap();
        assert_eq!(store.list_get_by_index("L", 5).unwrap(), "");
        assert_eq!(store.list_get_by_index("L", -1).unwrap(), "");
    }

    #[test]
    fn list_remove_index_out_of_range_is_noop() {
        let store = Store::new(Duration::from_secs(30));
        store.list_push("L", "a".into()).unwrap();
        store.list_remove_index("L", 99).unwrap();
        assert_eq!(store.list_len("L").unwrap(), 1);
    }

    #[test]
    fn list_remove_value_removes_all_occurrences() {
        let store = Store::new(Duration::from_secs(30));
        for v in ["a", "b", "a", "a", "c"] {
            store.list_push("L", v.into()).unwrap();
        }
        store.list_remove_value("L", "a").unwrap();
        assert_eq!(store.list_len("L").unwrap(), 2);
        assert_eq!(store.list_get_by_index("L", 0).unwrap(), "b");
        assert_eq!(store.list_get_by_index("L", 1).unwrap(), "c");
    }

    #[test]
    fn scalar_then_list_push_is_type_mismatch() {
        let store = Store::new(Duration::from_secs(30));
        store.set("v", "s".into(), Ttl::Never);
        assert!(matches!(
            store.list_push("v", "x".into()),
            Err(GoodiesError::TypeMismatch(_))
        ));
    }

    #[test]
    fn list_push_on_expired_key_creates_fresh_list() {
        let store = Store::new(Duration::from_secs(30));
        store.set("L", "scalar".into(), Ttl::Default);
        store.set_expiry("L", Ttl::Seconds(1)).unwrap();
        sleep(Duration::from_millis(1100));
        // "L" is now an expired scalar entry; ListPush must treat it as absent
        // rather than returning TypeMismatch.
        store.list_push("L", "x".into()).unwrap();
        assert_eq!(store.list_len("L").unwrap(), 1);
        assert_eq!(store.list_get_by_index("L", 0).unwrap(), "x");
    }

    #[test]
    fn dict_set_get_has_key() {
        let store = Store::new(Duration::from_secs(30));
        store.dict_set("d", "x", "1".into()).unwrap();
        assert!(store.dict_has_key("d", "x").unwrap());
        assert!(matches!(
            store.dict_get("d", "y"),
            Err(GoodiesError::DictKeyNotFound(_))
        ));
    }

    #[test]
    fn dict_get_on_scalar_is_type_mismatch() {
        let store = Store::new(Duration::from_secs(30));
        store.set("d", "s".into(), Ttl::Never);
        assert!(matches!(
            store.dict_get("d", "x"),
            Err(GoodiesError::TypeMismatch(_))
        ));
    }

    #[test]
    fn set_expiry_on_absent_key_is_not_found() {
        let store = Store::new(Duration::from_secs(30));
        assert!(matches!(
            store.set_expiry("missing", Ttl::Never),
            Err(GoodiesError::NotFound(_))
        ));
    }

    #[test]
    fn cleanup_sweeps_expired_entries() {
        let store = Store::new(Duration::from_secs(30));
        store.set("a", "1".into(), Ttl::Never);
        // manufacture an already-expired entry via a zero-second TTL plus a sleep
        store.set("b", "2".into(), Ttl::Seconds(1));
        sleep(Duration::from_millis(1100));
        let removed = store.cleanup();
        assert_eq!(removed, 1);
        assert!(store.get("a").is_ok());
        assert!(matches!(store.get("b"), Err(GoodiesError::NotFound(_))));
    }

    #[test]
    fn keys_lists_all_live_keys() {
        let store = Store::new(Duration::from_secs(30));
        store.set("a", "1".into(), Ttl::Never);
        store.set("b", "2".into(), Ttl::Never);
        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
