//! Export/import of a workflow as `{steps, stepConfigs}`.
//!
//! The editor does not persist anything itself. The surrounding page asks
//! for a [`SaveRequest`] when the user clicks Save or Save & Continue and
//! sends it wherever it stores workflows.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::config::ConfigMap;
use super::manager::WorkflowManager;
use super::model::{EditorContext, Step, StepId};
use crate::error::WorkflowResult;

/// Exported state: flat steps (depth first) plus the configuration map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub steps: Vec<Step>,
    pub step_configs: ConfigMap,
}

impl WorkflowSnapshot {
    /// Pretty-printed JSON, `stepConfigs` keys in id order.
    pub fn to_json(&self) -> WorkflowResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Snapshot as read back from JSON.
///
/// Configurations stay raw until the step kinds are known. Context fields
/// may sit next to `steps` in the same object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInput {
    #[serde(flatten)]
    pub context: EditorContext,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub step_configs: HashMap<StepId, JsonValue>,
}

impl SnapshotInput {
    pub fn from_json(json: &str) -> WorkflowResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveAction {
    Save,
    SaveAndContinue,
}

/// Payload handed to the page's save hooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub action: SaveAction,
    #[serde(flatten)]
    pub context: EditorContext,
    pub snapshot: WorkflowSnapshot,
}

impl WorkflowManager {
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            steps: self.steps().into_iter().cloned().collect(),
            step_configs: self.configs().clone(),
        }
    }

    /// Rebuilds a workflow from an exported snapshot.
    ///
    /// Context fields in the snapshot fill in whatever `ctx` leaves empty.
    pub fn from_snapshot(ctx: EditorContext, input: SnapshotInput) -> WorkflowResult<Self> {
        let ctx = merge_context(ctx, input.context);
        Self::from_parts(ctx, input.steps, input.step_configs)
    }

    pub fn from_json(ctx: EditorContext, json: &str) -> WorkflowResult<Self> {
        Self::from_snapshot(ctx, SnapshotInput::from_json(json)?)
    }

    pub fn save_request(&self, action: SaveAction) -> SaveRequest {
        SaveRequest {
            action,
            context: self.context().clone(),
            snapshot: self.snapshot(),
        }
    }
}

fn merge_context(ctx: EditorContext, stored: EditorContext) -> EditorContext {
    EditorContext {
        project_id: ctx.project_id.or(stored.project_id),
        workflow_name: if ctx.workflow_name.is_empty() {
            stored.workflow_name
        } else {
            ctx.workflow_name
        },
        workflow_date: if ctx.workflow_date.is_empty() {
            stored.workflow_date
        } else {
            ctx.workflow_date
        },
    }
}
