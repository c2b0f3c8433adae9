//! Flat list projection of the main flow.
//!
//! Only main-flow steps are listed. Call/condition rows show their two
//! branch slots, but branches can only be filled from the tree view, and
//! the "Add New" menu offers Call and Condition only while neither exists
//! anywhere in the workflow.

use serde::Serialize;

use super::command::WorkflowCommand;
use super::manager::{Position, WorkflowManager};
use super::model::{BranchTag, Step, StepId, StepKind};

/// Shown next to affordances that only the tree view provides.
pub const TREE_VIEW_HINT: &str = "Switch to Tree View to add steps inside branches";

/// Shown next to disabled Call/Condition menu entries.
pub const SINGLE_BRANCHING_HINT: &str =
    "Only one Call or Condition fits the list view. Use Tree View to nest more.";

// =============================================================================
// ADD MENU
// =============================================================================

/// One entry of an "Add New" menu.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOption {
    #[serde(flatten)]
    pub kind: StepKind,
    pub label: &'static str,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// The step choices an "Add New" control offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMenu {
    pub options: Vec<AddOption>,
}

impl AddMenu {
    /// Every kind enabled. Used by the tree view everywhere.
    pub fn unrestricted() -> Self {
        Self {
            options: StepKind::ALL
                .iter()
                .map(|kind| AddOption {
                    kind: *kind,
                    label: kind.default_label(),
                    enabled: true,
                    hint: None,
                })
                .collect(),
        }
    }

    /// The list view's menu: Call and Condition are disabled once either
    /// exists anywhere in the workflow, nested steps included.
    pub fn for_list(manager: &WorkflowManager) -> Self {
        let capped = manager.has_branching_step();
        let mut menu = Self::unrestricted();
        for option in menu.options.iter_mut().filter(|o| o.kind.is_branching()) {
            option.enabled = !capped;
            option.hint = capped.then_some(SINGLE_BRANCHING_HINT);
        }
        menu
    }

    pub fn is_enabled(&self, kind: StepKind) -> bool {
        self.options
            .iter()
            .any(|option| option.kind == kind && option.enabled)
    }
}

// =============================================================================
// ROWS
// =============================================================================

/// Read-only preview of one branch slot under a list row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSlotPreview {
    pub branch: BranchTag,
    pub caption: &'static str,
    pub step_count: usize,
    /// Always false: branches are filled from the tree view.
    pub add_enabled: bool,
    pub hint: &'static str,
}

/// One main-flow step as the list shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    /// 1-based position in the main flow.
    pub index: usize,
    pub id: StepId,
    #[serde(flatten)]
    pub kind: StepKind,
    pub label: String,
    pub delay: Option<u32>,
    pub delay_editable: bool,
    pub selected: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branch_slots: Vec<BranchSlotPreview>,
}

// =============================================================================
// LIST VIEW
// =============================================================================

/// The list projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub rows: Vec<ListRow>,
    pub add_menu: AddMenu,
}

impl ListView {
    pub fn build(manager: &WorkflowManager) -> Self {
        let selected = manager.selected_id();
        let rows = manager
            .main_flow()
            .into_iter()
            .enumerate()
            .map(|(i, step)| ListRow {
                index: i + 1,
                id: step.id.clone(),
                kind: step.kind,
                label: step.label.clone(),
                delay: step.delay,
                delay_editable: step.kind.has_delay(),
                selected: selected == Some(&step.id),
                branch_slots: branch_slots(manager, step),
            })
            .collect();

        Self {
            rows,
            add_menu: AddMenu::for_list(manager),
        }
    }

    pub fn row(&self, id: &StepId) -> Option<&ListRow> {
        self.rows.iter().find(|row| &row.id == id)
    }

    /// Appends a step to the main flow, if the menu allows this kind.
    pub fn add_command(&self, kind: StepKind) -> Option<WorkflowCommand> {
        self.add_menu.is_enabled(kind).then(|| WorkflowCommand::AddStep {
            kind,
            position: Position::End,
        })
    }

    pub fn select_command(&self, id: &StepId) -> Option<WorkflowCommand> {
        self.row(id)
            .map(|row| WorkflowCommand::SelectStep(Some(row.id.clone())))
    }

    /// Deletion is confirmed by the host page after the command is applied.
    pub fn delete_command(&self, id: &StepId) -> Option<WorkflowCommand> {
        self.row(id)
            .map(|row| WorkflowCommand::DeleteStep(row.id.clone()))
    }

    /// Delay edit from the inline text input. Invalid input becomes 1 day.
    pub fn delay_command(&self, id: &StepId, input: &str) -> Option<WorkflowCommand> {
        self.row(id)
            .filter(|row| row.delay_editable)
            .map(|row| WorkflowCommand::UpdateDelay {
                id: row.id.clone(),
                days: parse_delay_input(input),
            })
    }
}

/// Parses a delay typed by the user: whole days, at least 1, otherwise 1.
pub fn parse_delay_input(input: &str) -> u32 {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|days| *days >= 1)
        .unwrap_or(1)
}

fn branch_slots(manager: &WorkflowManager, step: &Step) -> Vec<BranchSlotPreview> {
    let Some(branches) = manager.branches(&step.id) else {
        return Vec::new();
    };
    BranchTag::BOTH
        .iter()
        .map(|tag| BranchSlotPreview {
            branch: *tag,
            caption: tag.caption(step.kind),
            step_count: branches.get(*tag).len(),
            add_enabled: false,
            hint: TREE_VIEW_HINT,
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
