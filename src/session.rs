use crate::error::SnapshotError;
use crate::label::FlowLabel;
use crate::slots::SlotStore;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};

/// The state of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// The node the last turn ended at.
    pub current: FlowLabel,
    pub slots: SlotStore,
    /// Visited labels, oldest first. The last entry is `current`.
    pub history: Vec<FlowLabel>,
    pub turns: u64,
}

impl Session {
    /// A fresh session positioned at `start`.
    pub fn new(id: impl Into<String>, start: FlowLabel) -> Self {
        Self {
            id: id.into(),
            history: vec![start.clone()],
            current: start,
            slots: SlotStore::new(),
            turns: 0,
        }
    }

    /// Serializes the session with bincode so a host can persist it between turns.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        encode_to_vec(self, standard()).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Restores a session saved with `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        decode_from_slice(bytes, standard())
            .map(|(session, _)| session)
            .map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}
