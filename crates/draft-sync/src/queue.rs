//! Pending-operation queue records.
//!
//! The queue records *intent* to synchronize, decoupled from current-state
//! storage: the sync engine can replay intent even if current state has
//! changed further. Entries live only until their effect is confirmed
//! written to the remote store. Repeated edits to the same record enqueue
//! repeated operations; all are harmless to replay because the remote write
//! is an upsert.

use draft_core::model::{new_id, now_ms};
use serde::{Deserialize, Serialize};

/// Mutation kind recorded in a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

/// Which remote table the operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordTable {
    Documents,
    Scenes,
    Annotations,
}

impl RecordTable {
    pub fn name(self) -> &'static str {
        match self {
            RecordTable::Documents => "documents",
            RecordTable::Scenes => "scenes",
            RecordTable::Annotations => "annotations",
        }
    }
}

/// One not-yet-acknowledged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOp {
    pub id: String,
    pub kind: OpKind,
    pub table: RecordTable,
    /// Identifier of the record the operation targets.
    pub record_id: String,
    /// Snapshot of the record at enqueue time (`Null` for deletes).
    pub payload: serde_json::Value,
    pub queued_at: u64,
}

impl PendingOp {
    pub fn new(
        kind: OpKind,
        table: RecordTable,
        record_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: new_id(),
            kind,
            table,
            record_id: record_id.into(),
            payload,
            queued_at: now_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ops_get_fresh_ids() {
        let a = PendingOp::new(OpKind::Create, RecordTable::Documents, "doc-1", serde_json::Value::Null);
        let b = PendingOp::new(OpKind::Create, RecordTable::Documents, "doc-1", serde_json::Value::Null);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_serde_names() {
        let op = PendingOp::new(OpKind::Delete, RecordTable::Scenes, "scene-1", serde_json::Value::Null);
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"kind\":\"delete\""));
        assert!(json.contains("\"table\":\"scenes\""));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(RecordTable::Documents.name(), "documents");
        assert_eq!(RecordTable::Scenes.name(), "scenes");
        assert_eq!(RecordTable::Annotations.name(), "annotations");
    }
}
