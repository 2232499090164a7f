//! Pluggable snapshot (de)serialization for the shared workspace.
//!
//! Grounded on `internal/builtin/codec.go`'s `Codec` interface
//! (`Marshal`/`Unmarshal` backed by `jsoniter`); `serde_json` is this
//! crate's equivalent already in the teacher's own dependency table, so
//! `JsonCodec` introduces no new dependency.

use crate::errors::CodecError;
use crate::value::Value;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// The serializable shape of a workspace snapshot: global `Data` plus
/// per-task `NodeData`, matching `internal/builtin/data_store.go`'s
/// `dataStore` struct one field at a time.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceSnapshot {
    pub data: FxHashMap<String, Value>,
    pub node_data: FxHashMap<String, FxHashMap<String, Value>>,
}

/// Encodes/decodes a `WorkspaceSnapshot` to/from an opaque byte blob.
/// Implementations may trade the default's self-describing shape for a
/// length-preserving one when lossless numeric round-tripping matters.
pub trait Codec: Send + Sync {
    fn encode(&self, snapshot: &WorkspaceSnapshot) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<WorkspaceSnapshot, CodecError>;
}

/// Self-describing JSON encoding. The default codec; swappable by
/// constructing `SharedWorkspace::with_codec`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, snapshot: &WorkspaceSnapshot) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(snapshot).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<WorkspaceSnapshot, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
