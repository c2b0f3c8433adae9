//! WASM bindings for the workflow editor.
//!
//! The React editor owns one `JsWorkflowManager` per editing session and
//! renders whatever the view getters return. Mutation methods never throw:
//! they report success through their return value and log the reason for
//! a refused edit.

use js_sys::Array;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use tracing::warn;
use wasm_bindgen::prelude::*;

use super::list_view::ListView;
use super::manager::{Position, WorkflowManager};
use super::model::{BranchTag, EditorContext, Step, StepId, StepKind};
use super::panel::ConfigPanel;
use super::snapshot::{SaveAction, SnapshotInput};
use super::tree_view::TreeView;
use crate::error::{WorkflowError, WorkflowResult};

/// Serialize a value to JsValue with HashMaps as plain JS objects (not Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::new().serialize_maps_as_objects(true))
}

impl From<WorkflowError> for JsValue {
    fn from(err: WorkflowError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

/// Logs a refused edit and turns it into `false`.
fn accepted(op: &str, result: WorkflowResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(op, error = %err, "edit refused");
            false
        }
    }
}

fn context_from(value: JsValue) -> Result<EditorContext, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(EditorContext::default());
    }
    Ok(from_value(value)?)
}

/// JavaScript-friendly wrapper around WorkflowManager.
#[wasm_bindgen]
pub struct JsWorkflowManager {
    inner: WorkflowManager,
}

#[wasm_bindgen]
impl JsWorkflowManager {
    /// Creates an editor session.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const flow = new JsWorkflowManager(
    ///   { projectId, workflowName: "Q3 Outreach", workflowDate: "2024-07-01" },
    ///   initialSteps,
    /// );
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(context: JsValue, initial_steps: JsValue) -> Result<JsWorkflowManager, JsValue> {
        let ctx = context_from(context)?;
        let steps: Vec<Step> = if initial_steps.is_undefined() || initial_steps.is_null() {
            Vec::new()
        } else {
            from_value(initial_steps)?
        };
        Ok(JsWorkflowManager {
            inner: WorkflowManager::from_steps(ctx, steps)?,
        })
    }

    /// Restores a session from a `{steps, stepConfigs}` JSON string.
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(context: JsValue, json: &str) -> Result<JsWorkflowManager, JsValue> {
        let ctx = context_from(context)?;
        let input = SnapshotInput::from_json(json)?;
        Ok(JsWorkflowManager {
            inner: WorkflowManager::from_snapshot(ctx, input)?,
        })
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Adds a step and returns its id, or `null` for an unknown type.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const cond = flow.addStep("condition", null, "end");
    /// flow.addStep("whatsapp", null, "end", cond, "yes");
    /// flow.addStep("linkedin", "likePost", "above", cond);
    /// ```
    #[wasm_bindgen(js_name = addStep)]
    pub fn add_step(
        &mut self,
        step_type: &str,
        sub_action: Option<String>,
        position: &str,
        reference_id: Option<String>,
        branch: Option<String>,
    ) -> Option<String> {
        let parsed = (|| -> WorkflowResult<(StepKind, Position)> {
            let kind = StepKind::from_parts(step_type, sub_action.as_deref())?;
            let branch = branch
                .as_deref()
                .map(str::parse::<BranchTag>)
                .transpose()?;
            let position = Position::from_parts(position, reference_id.map(StepId::from), branch)?;
            Ok((kind, position))
        })();

        match parsed {
            Ok((kind, position)) => Some(self.inner.add_step(kind, position).to_string()),
            Err(err) => {
                warn!(step_type, error = %err, "add refused");
                None
            }
        }
    }

    /// Deletes a step and its branches. Returns the removed ids (empty if
    /// the id is unknown).
    #[wasm_bindgen(js_name = deleteStep)]
    pub fn delete_step(&mut self, id: &str) -> Array {
        let removed = self.inner.delete_step(&StepId::from(id)).unwrap_or_default();
        removed
            .iter()
            .map(|id| JsValue::from_str(id.as_str()))
            .collect()
    }

    /// Sets a step's delay. Anything but a whole number of days >= 1 is
    /// refused.
    #[wasm_bindgen(js_name = updateDelay)]
    pub fn update_delay(&mut self, id: &str, days: f64) -> bool {
        let result = Step::delay_from_f64(days)
            .and_then(|days| self.inner.update_delay(&StepId::from(id), days));
        accepted("updateDelay", result)
    }

    /// Merges `{field: value}` into a step's configuration.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// flow.updateConfig(cond, "conditionType", "whatsapp"); // label -> "WhatsApp Responded"
    /// ```
    #[wasm_bindgen(js_name = updateConfig)]
    pub fn update_config(&mut self, id: &str, field: &str, value: JsValue) -> bool {
        let value = match from_value::<serde_json::Value>(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(field, error = %err, "config value is not plain JSON");
                return false;
            }
        };
        accepted(
            "updateConfig",
            self.inner.update_config(&StepId::from(id), field, value),
        )
    }

    /// Selects a step, or clears the selection with `null`.
    #[wasm_bindgen(js_name = selectStep)]
    pub fn select_step(&mut self, id: Option<String>) -> bool {
        let id = id.map(StepId::from);
        accepted("selectStep", self.inner.select_step(id.as_ref()))
    }

    #[wasm_bindgen(js_name = moveStep)]
    pub fn move_step(&mut self, id: &str, to: usize) -> bool {
        accepted("moveStep", self.inner.move_step(&StepId::from(id), to))
    }

    #[wasm_bindgen(js_name = relabelStep)]
    pub fn relabel_step(&mut self, id: &str, label: &str) -> bool {
        accepted("relabelStep", self.inner.relabel_step(&StepId::from(id), label))
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    /// Flat steps in depth-first order.
    #[wasm_bindgen(js_name = getSteps)]
    pub fn get_steps(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&self.inner.steps())?)
    }

    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self, id: &str) -> Result<JsValue, JsValue> {
        match self.inner.config(&StepId::from(id)) {
            Some(config) => Ok(to_js_value(config)?),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = selectedId)]
    pub fn selected_id(&self) -> Option<String> {
        self.inner.selected_id().map(|id| id.to_string())
    }

    #[wasm_bindgen(js_name = listView)]
    pub fn list_view(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&ListView::build(&self.inner))?)
    }

    #[wasm_bindgen(js_name = treeView)]
    pub fn tree_view(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&TreeView::build(&self.inner))?)
    }

    #[wasm_bindgen(js_name = configPanel)]
    pub fn config_panel(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&ConfigPanel::build(&self.inner))?)
    }

    // =========================================================================
    // SAVE HOOKS
    // =========================================================================

    /// `{steps, stepConfigs}` for the page's save callback.
    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        Ok(self.inner.snapshot().to_json()?)
    }

    /// Payload for the Save button.
    #[wasm_bindgen(js_name = saveRequest)]
    pub fn save_request(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&self.inner.save_request(SaveAction::Save))?)
    }

    /// Payload for the Save & Continue button.
    #[wasm_bindgen(js_name = saveAndContinueRequest)]
    pub fn save_and_continue_request(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&self.inner.save_request(SaveAction::SaveAndContinue))?)
    }
}
