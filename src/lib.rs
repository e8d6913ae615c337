//! # Bunki - Editing Core for Conditional Validation Workflows
//!
//! **Bunki** keeps three views of a visually authored workflow consistent while an
//! operator edits it: the presentation graph (condition steps, synthetic success and
//! failure terminals, labeled true/false edges), the flat step list the server stores,
//! and a snapshot of the last confirmed server state used to compute minimal diffs.
//!
//! ## Core Workflow
//!
//! 1.  **Load**: Fetch a [`step::WorkflowRecord`] and turn it into a [`graph::GraphModel`]
//!     with the [`adapter::PresentationAdapter`]. Steps without stored coordinates are
//!     placed by the [`layout::LayoutEngine`].
//! 2.  **Edit**: Mutate the graph through an [`session::EditSession`]. Connections that
//!     would break the one-edge-per-branch / one-parent-per-node rules replace the old
//!     edges instead of failing.
//! 3.  **Save**: The [`sync::SyncEngine`] assigns provisional identifiers to new steps,
//!     resolves every branch into a persisted action, diffs against the snapshots and
//!     issues one bulk-create and one bulk-update call.
//!
//! [`editor::WorkflowEditor`] bundles all of this behind one type.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bunki::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let store = Arc::new(HttpStepStore::new(&StoreConfig::default())?);
//!
//!     tokio_test::block_on(async {
//!         let mut editor = WorkflowEditor::open(store, 7, EditorConfig::default()).await?;
//!
//!         // Add a step and hang it off the initial step's true branch.
//!         let root = editor.initial_step().map(str::to_string);
//!         let session = editor.session_mut();
//!         let check = session.add_step(StepNode::new("Amount", "{{amount}}", Operator::GreaterThan, "100"), None)?;
//!         session.attach_terminal(&check, Branch::True, Outcome::Success, "ok")?;
//!         if let Some(root) = root {
//!             session.connect(&root, Handle::True, &check)?;
//!         }
//!
//!         let outcome = editor.save().await?;
//!         println!("{}", outcome.notification());
//!         Ok::<(), Box<dyn std::error::Error>>(())
//!     })
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod draft;
pub mod editor;
pub mod error;
pub mod graph;
pub mod layout;
pub mod prelude;
pub mod session;
pub mod step;
pub mod store;
pub mod sync;
