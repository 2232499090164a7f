//! Shared workspace: the concurrent key-value store plus per-task
//! output store every scoped data context ultimately reads through to.
//!
//! Grounded on `internal/builtin/data_store.go`'s `defaultSharedDataStore`:
//! two independent locks (one for `Data`, one for `NodeData`), a
//! pluggable `Codec`, and `Marshal`/`Unmarshal` taking both locks in
//! read/write mode respectively (spec.md §5).

use crate::codec::{Codec, JsonCodec, WorkspaceSnapshot};
use crate::errors::CodecError;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Concurrent `Data: string -> value` + `NodeData: string -> (string ->
/// value)` store, serializable via a pluggable [`Codec`].
pub struct SharedWorkspace {
    data: RwLock<FxHashMap<String, Value>>,
    node_data: RwLock<FxHashMap<String, FxHashMap<String, Value>>>,
    codec: Arc<dyn Codec>,
}

impl Default for SharedWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedWorkspace {
    #[must_use]
    pub fn new() -> Self {
        Self::with_codec(Arc::new(JsonCodec))
    }

    #[must_use]
    pub fn with_codec(codec: Arc<dyn Codec>) -> Self {
        Self {
            data: RwLock::new(FxHashMap::default()),
            node_data: RwLock::new(FxHashMap::default()),
            codec,
        }
    }

    /// Seed the workspace's global `Data` map, e.g. from a prior
    /// snapshot's decoded contents or initial pipeline input.
    #[must_use]
    pub fn seeded(initial: FxHashMap<String, Value>) -> Self {
        let ws = Self::new();
        *ws.data.write() = initial;
        ws
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    /// Sets `key`, returning whether it previously existed (last-writer-wins).
    pub fn set(&self, key: impl Into<String>, value: Value) -> bool {
        let mut guard = self.data.write();
        guard.insert(key.into(), value).is_some()
    }

    /// Upserts `key` unconditionally, discarding the existence flag.
    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.set(key, value);
    }

    pub fn remove(&self, key: &str) {
        self.data.write().remove(key);
    }

    /// Records `node_id`'s output data, replacing any prior entry.
    pub fn set_node_data(&self, node_id: impl Into<String>, data: FxHashMap<String, Value>) {
        self.node_data.write().insert(node_id.into(), data);
    }

    /// Looks up `key` within `node_id`'s recorded output, if any.
    #[must_use]
    pub fn get_node_value(&self, node_id: &str, key: &str) -> Option<Value> {
        self.node_data.read().get(node_id)?.get(key).cloned()
    }

    #[must_use]
    pub fn node_data(&self, node_id: &str) -> Option<FxHashMap<String, Value>> {
        self.node_data.read().get(node_id).cloned()
    }

    /// A clone of the whole global `Data` map, e.g. for inspection or a
    /// caller-side snapshot outside the codec path.
    #[must_use]
    pub fn data_snapshot(&self) -> FxHashMap<String, Value> {
        self.data.read().clone()
    }

    /// Encodes `{data, node_data}` via the configured codec. Takes both
    /// locks in read mode (spec.md §5).
    pub fn marshal(&self) -> Result<Vec<u8>, CodecError> {
        let snapshot = WorkspaceSnapshot {
            data: self.data.read().clone(),
            node_data: self.node_data.read().clone(),
        };
        self.codec.encode(&snapshot)
    }

    /// Decodes a snapshot and replaces both maps, taking both locks in
    /// write mode.
    pub fn unmarshal(&self, bytes: &[u8]) -> Result<(), CodecError> {
        let snapshot = self.codec.decode(bytes)?;
        *self.data.write() = snapshot.data;
        *self.node_data.write() = snapshot.node_data;
        Ok(())
    }

    /// Rebuilds a fresh workspace from a snapshot blob (used to resume a
    /// blocked run), using the given codec.
    pub fn from_snapshot(bytes: &[u8], codec: Arc<dyn Codec>) -> Result<Self, CodecError> {
        let snapshot = codec.decode(bytes)?;
        Ok(Self {
            data: RwLock::new(snapshot.data),
            node_data: RwLock::new(snapshot.node_data),
            codec,
        })
    }

    #[cfg(test)]
    pub(crate) fn snapshot_eq(&self, other: &Self) -> bool {
        *self.data.read() == *other.data.read() && *self.node_data.read() == *other.node_data.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshal_then_unmarshal_round_trips_the_workspace() {
        let ws = SharedWorkspace::new();
        ws.put("a", Value::Int(1));
        ws.set_node_data("t1", FxHashMap::from_iter([("x".to_string(), Value::from("v"))]));

        let bytes = ws.marshal().unwrap();
        let restored = SharedWorkspace::new();
        restored.unmarshal(&bytes).unwrap();

        assert!(ws.snapshot_eq(&restored));
        assert_eq!(restored.get("a"), Some(Value::Int(1)));
        assert_eq!(restored.get_node_value("t1", "x"), Some(Value::from("v")));
    }

    #[test]
    fn last_writer_wins_on_concurrent_key() {
        let ws = SharedWorkspace::new();
        ws.put("k", Value::Int(1));
        ws.put("k", Value::Int(2));
        assert_eq!(ws.get("k"), Some(Value::Int(2)));
    }

    #[test]
    fn missing_node_data_lookup_returns_none() {
        let ws = SharedWorkspace::new();
        assert_eq!(ws.get_node_value("missing", "key"), None);
    }
}
