//! Prelude module for convenient imports
//!
//! Re-exports the types most code touching the editor needs.
//!
//! # Example
//!
//! ```rust,no_run
//! use bunki::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/workflow.json")?;
//! let record: WorkflowRecord = serde_json::from_str(&json)?;
//! let loaded = PresentationAdapter::load(record, &LayoutConfig::default())?;
//!
//! let engine = SyncEngine::new(loaded.meta.id, loaded.watermark, loaded.snapshots, NoteConfig::default());
//! let plan = engine.preview(&loaded.graph)?;
//! println!("{} creates, {} updates", plan.creates.len(), plan.updates.len());
//! # Ok(())
//! # }
//! ```

// Editing and sync
pub use crate::editor::WorkflowEditor;
pub use crate::session::{ConnectOutcome, DeletePlan, EditSession, StepUpdate};
pub use crate::sync::{CallOutcome, Notification, NotificationLevel, SaveOutcome, SaveReport, SyncEngine};

// Graph and layout
pub use crate::graph::{Edge, GraphModel, Handle, Node, NodeId, Outcome, StepNode};
pub use crate::layout::{LayoutConfig, LayoutEngine};

// Wire model
pub use crate::adapter::{EditorStatus, LoadWarning, LoadedWorkflow, PresentationAdapter, RenderGraph};
pub use crate::step::{Action, Branch, DatasourceCatalog, Operator, Position, StepId, StepRecord, WorkflowId, WorkflowRecord};

// Stores and configuration
pub use crate::config::{EditorConfig, NoteConfig, StoreConfig};
pub use crate::draft::Draft;
pub use crate::store::{HttpStepStore, InMemoryStepStore, StepStore};

// Error types
pub use crate::error::{EditError, EditorError, SaveError, StoreError, ValidationError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
