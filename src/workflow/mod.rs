//! Workflow step-sequence module.
//!
//! One in-memory store (`WorkflowManager`) plus the read-only projections
//! the editor renders from it.

pub mod model;
pub mod config;
pub mod manager;
pub mod command;
pub mod list_view;
pub mod tree_view;
pub mod panel;
pub mod snapshot;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use model::{BranchTag, EditorContext, LinkedInAction, Placement, Step, StepId, StepKind};
pub use config::{ConditionKind, ConfigMap, StepConfig};
pub use manager::{Position, WorkflowManager};
pub use command::{CommandOutcome, WorkflowCommand};
pub use list_view::{AddMenu, ListView};
pub use tree_view::{AddSlot, MenuAction, TreeView};
pub use panel::ConfigPanel;
pub use snapshot::{SaveAction, SaveRequest, SnapshotInput, WorkflowSnapshot};

#[cfg(feature = "wasm")]
pub use wasm::JsWorkflowManager;
