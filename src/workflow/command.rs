//! Mutation requests emitted by the list and tree views.
//!
//! Views never hold `&mut WorkflowManager`. They build a `WorkflowCommand`
//! and the owner of the manager applies it.

use serde_json::Value as JsonValue;

use super::manager::{Position, WorkflowManager};
use super::model::{StepId, StepKind};
use crate::error::WorkflowResult;

/// One mutation of the workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowCommand {
    AddStep { kind: StepKind, position: Position },
    DeleteStep(StepId),
    UpdateDelay { id: StepId, days: u32 },
    UpdateConfig { id: StepId, field: String, value: JsonValue },
    SelectStep(Option<StepId>),
    MoveStep { id: StepId, to: usize },
    RelabelStep { id: StepId, label: String },
}

/// What applying a command did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Added(StepId),
    /// Ids removed by a cascade delete, the target first.
    Deleted(Vec<StepId>),
    Updated,
}

impl WorkflowManager {
    /// Applies a command. Errors leave the workflow unchanged.
    pub fn apply(&mut self, command: WorkflowCommand) -> WorkflowResult<CommandOutcome> {
        match command {
            WorkflowCommand::AddStep { kind, position } => {
                Ok(CommandOutcome::Added(self.add_step(kind, position)))
            }
            WorkflowCommand::DeleteStep(id) => self.delete_step(&id).map(CommandOutcome::Deleted),
            WorkflowCommand::UpdateDelay { id, days } => {
                self.update_delay(&id, days).map(|_| CommandOutcome::Updated)
            }
            WorkflowCommand::UpdateConfig { id, field, value } => self
                .update_config(&id, &field, value)
                .map(|_| CommandOutcome::Updated),
            WorkflowCommand::SelectStep(id) => {
                self.select_step(id.as_ref()).map(|_| CommandOutcome::Updated)
            }
            WorkflowCommand::MoveStep { id, to } => {
                self.move_step(&id, to).map(|_| CommandOutcome::Updated)
            }
            WorkflowCommand::RelabelStep { id, label } => {
                self.relabel_step(&id, label).map(|_| CommandOutcome::Updated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{BranchTag, EditorContext};
    use serde_json::json;

    #[test]
    fn test_apply_round() {
        let mut manager = WorkflowManager::new(EditorContext::default());

        let CommandOutcome::Added(cond) = manager
            .apply(WorkflowCommand::AddStep {
                kind: StepKind::Condition,
                position: Position::End,
            })
            .unwrap()
        else {
            panic!("expected an added step");
        };

        let CommandOutcome::Added(child) = manager
            .apply(WorkflowCommand::AddStep {
                kind: StepKind::Email,
                position: Position::EndOfBranch {
                    parent: cond.clone(),
                    branch: BranchTag::Yes,
                },
            })
            .unwrap()
        else {
            panic!("expected an added step");
        };

        manager
            .apply(WorkflowCommand::UpdateConfig {
                id: cond.clone(),
                field: "conditionType".to_string(),
                value: json!("email"),
            })
            .unwrap();
        assert_eq!(manager.step(&cond).unwrap().label, "Email Responded");

        manager
            .apply(WorkflowCommand::UpdateDelay { id: child.clone(), days: 3 })
            .unwrap();
        assert_eq!(manager.step(&child).unwrap().delay, Some(3));

        let outcome = manager.apply(WorkflowCommand::DeleteStep(cond.clone())).unwrap();
        assert_eq!(outcome, CommandOutcome::Deleted(vec![cond, child]));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_apply_error_is_no_op() {
        let mut manager = WorkflowManager::new(EditorContext::default());
        let id = manager.add_step(StepKind::Telegram, Position::End);
        let before = manager.clone();

        assert!(manager
            .apply(WorkflowCommand::RelabelStep {
                id: StepId::new("ghost"),
                label: "x".to_string()
            })
            .is_err());
        assert!(manager
            .apply(WorkflowCommand::UpdateConfig {
                id: id.clone(),
                field: "body".to_string(),
                value: json!("x")
            })
            .is_err());

        assert_eq!(manager.configs(), before.configs());
        assert_eq!(manager.step(&id), before.step(&id));
    }
}
