use crate::error::DraftError;
use crate::graph::{GraphModel, NodeId};
use crate::step::WorkflowMeta;
use crate::sync::SyncState;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Unsaved editor state, including provisional identifiers and snapshots.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Draft {
    /// Workflow metadata as JSON; its opaque extra fields are free-form values.
    meta_json: String,
    pub initial_step: Option<NodeId>,
    pub graph: GraphModel,
    pub sync: SyncState,
}

impl Draft {
    pub fn new(
        meta: &WorkflowMeta,
        initial_step: Option<NodeId>,
        graph: GraphModel,
        sync: SyncState,
    ) -> Result<Self, DraftError> {
        let meta_json = serde_json::to_string(meta)
            .map_err(|e| DraftError::Generic(format!("Could not encode workflow metadata: {}", e)))?;
        Ok(Self {
            meta_json,
            initial_step,
            graph,
            sync,
        })
    }

    pub fn meta(&self) -> Result<WorkflowMeta, DraftError> {
        serde_json::from_str(&self.meta_json)
            .map_err(|e| DraftError::Generic(format!("Could not decode workflow metadata: {}", e)))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DraftError> {
        encode_to_vec(self, standard()).map_err(|e| DraftError::Generic(format!("Serialization failed: {}", e)))
    }

    /// Writes the draft to `path` in the bincode format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DraftError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|e| {
            DraftError::Generic(format!("Could not create file '{}': {}", path.display(), e))
        })?;
        file.write_all(&bytes).map_err(|e| {
            DraftError::Generic(format!("Could not write to file '{}': {}", path.display(), e))
        })?;
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DraftError> {
        let path = path.as_ref();
        let mut file = fs::File::open(path)
            .map_err(|e| DraftError::Generic(format!("Could not open file '{}': {}", path.display(), e)))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| {
            DraftError::Generic(format!("Could not read from file '{}': {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DraftError> {
        decode_from_slice(bytes, standard())
            .map(|(draft, _)| draft)
            .map_err(|e| DraftError::Generic(format!("Deserialization failed: {}", e)))
    }
}
