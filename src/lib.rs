//! Outreach Flow - the step-sequence engine behind the workflow editor.
//!
//! A workflow is an ordered main flow of outreach steps (email, LinkedIn,
//! WhatsApp, Telegram, call, condition). Call and condition steps own two
//! branches that hold further steps, nested to any depth. Every step has a
//! configuration entry that is created and removed together with it.
//!
//! The editor renders the same store two ways: a flat list of the main flow
//! and a recursive tree. Both views are read-only and hand edits back as
//! [`WorkflowCommand`]s.
//!
//! # Example
//!
//! ```rust
//! use outreach_flow::{BranchTag, EditorContext, Position, StepKind, WorkflowManager};
//! use serde_json::json;
//!
//! let mut manager = WorkflowManager::new(EditorContext::new("Q3 Outreach", "2024-07-01"));
//!
//! let email = manager.add_step(StepKind::Email, Position::End);
//! let cond = manager.add_step(StepKind::Condition, Position::End);
//! manager.add_step(
//!     StepKind::WhatsApp,
//!     Position::EndOfBranch { parent: cond.clone(), branch: BranchTag::Yes },
//! );
//!
//! manager.update_config(&cond, "conditionType", json!("email")).unwrap();
//! assert_eq!(manager.step(&cond).unwrap().label, "Email Responded");
//!
//! // Deleting a condition removes everything in its branches.
//! manager.delete_step(&cond).unwrap();
//! assert_eq!(manager.len(), 1);
//! assert!(manager.step(&email).is_some());
//! ```

pub mod error;

// Workflow module
pub mod workflow;

// Re-exports for convenience
pub use error::{WorkflowError, WorkflowResult};
pub use workflow::{
    BranchTag, CommandOutcome, ConditionKind, ConfigPanel, EditorContext, LinkedInAction,
    ListView, Position, SaveAction, SaveRequest, Step, StepConfig, StepId, StepKind, TreeView,
    WorkflowCommand, WorkflowManager, WorkflowSnapshot,
};

#[cfg(feature = "wasm")]
pub use workflow::JsWorkflowManager;
