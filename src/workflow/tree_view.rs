//! Tree projection of the whole workflow, nested branches included.
//!
//! Unlike the list, the tree renders nested branches and lets the user add
//! any kind (calls and conditions included) anywhere, without a cap.

use serde::Serialize;

use super::command::WorkflowCommand;
use super::list_view::AddMenu;
use super::manager::{Position, WorkflowManager};
use super::model::{BranchTag, Step, StepId, StepKind};

/// Context-menu entries every tree node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuAction {
    /// Select the step for the configuration panel.
    Edit,
    AddAbove,
    AddBelow,
    Delete,
}

impl MenuAction {
    pub const ALL: [MenuAction; 4] = [
        MenuAction::Edit,
        MenuAction::AddAbove,
        MenuAction::AddBelow,
        MenuAction::Delete,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::Edit => "Edit",
            MenuAction::AddAbove => "Add Above",
            MenuAction::AddBelow => "Add Below",
            MenuAction::Delete => "Delete",
        }
    }
}

/// An "Add New" control: appends to a branch, or to the main flow when
/// `parent_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSlot {
    pub parent_id: Option<StepId>,
    pub branch: Option<BranchTag>,
}

impl AddSlot {
    pub fn main_flow() -> Self {
        Self {
            parent_id: None,
            branch: None,
        }
    }

    pub fn in_branch(parent: StepId, branch: BranchTag) -> Self {
        Self {
            parent_id: Some(parent),
            branch: Some(branch),
        }
    }

    pub fn position(&self) -> Position {
        match (&self.parent_id, self.branch) {
            (Some(parent), Some(branch)) => Position::EndOfBranch {
                parent: parent.clone(),
                branch,
            },
            _ => Position::End,
        }
    }

    pub fn command(&self, kind: StepKind) -> WorkflowCommand {
        WorkflowCommand::AddStep {
            kind,
            position: self.position(),
        }
    }
}

/// One side of a call/condition step. Children are listed by id; their
/// nodes follow the parent in [`TreeView::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchColumn {
    pub branch: BranchTag,
    pub caption: &'static str,
    pub children: Vec<StepId>,
    pub add_slot: AddSlot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: StepId,
    #[serde(flatten)]
    pub kind: StepKind,
    pub label: String,
    pub delay: Option<u32>,
    pub selected: bool,
    /// 0 for main-flow steps, +1 per enclosing branch.
    pub depth: usize,
    /// Owning call/condition, `None` on the main flow.
    pub parent_id: Option<StepId>,
    pub branch: Option<BranchTag>,
    pub menu: &'static [MenuAction],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<BranchColumn>,
}

/// The tree projection.
///
/// Nodes are stored flat, depth first (each node, then its yes branch,
/// then its no branch), so nesting depth never costs stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    /// Main-flow ids, in order.
    pub roots: Vec<StepId>,
    pub nodes: Vec<TreeNode>,
    /// After the last main-flow step, unless that step is a condition.
    pub trailing_add: Option<AddSlot>,
    /// The single seed control shown when the workflow is empty.
    pub empty_add: Option<AddSlot>,
    pub add_menu: AddMenu,
}

impl TreeView {
    pub fn build(manager: &WorkflowManager) -> Self {
        let selected = manager.selected_id();
        let main_flow = manager.main_flow();

        let mut nodes = Vec::with_capacity(manager.len());
        let mut stack: Vec<(&Step, usize)> = main_flow.iter().rev().map(|s| (*s, 0)).collect();
        while let Some((step, depth)) = stack.pop() {
            let node = build_node(manager, step, depth, selected);
            for column in node.branches.iter().rev() {
                for child in column.children.iter().rev() {
                    if let Some(child) = manager.step(child) {
                        stack.push((child, depth + 1));
                    }
                }
            }
            nodes.push(node);
        }

        let (trailing_add, empty_add) = match main_flow.last() {
            None => (None, Some(AddSlot::main_flow())),
            Some(last) if last.kind == StepKind::Condition => (None, None),
            Some(_) => (Some(AddSlot::main_flow()), None),
        };

        Self {
            roots: main_flow.iter().map(|s| s.id.clone()).collect(),
            nodes,
            trailing_add,
            empty_add,
            add_menu: AddMenu::unrestricted(),
        }
    }

    /// Looks up the node for a step.
    pub fn find(&self, id: &StepId) -> Option<&TreeNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Main-flow nodes, in order.
    pub fn root_nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.roots.iter().filter_map(|id| self.find(id))
    }

    /// Nodes of one branch column, in order.
    pub fn column_nodes<'a>(&'a self, column: &'a BranchColumn) -> impl Iterator<Item = &'a TreeNode> {
        column.children.iter().filter_map(|id| self.find(id))
    }

    /// Translates a context-menu choice into a command. Add actions need the
    /// kind picked from the add menu.
    pub fn menu_command(
        &self,
        id: &StepId,
        action: MenuAction,
        kind: Option<StepKind>,
    ) -> Option<WorkflowCommand> {
        let node = self.find(id)?;
        match action {
            MenuAction::Edit => Some(WorkflowCommand::SelectStep(Some(node.id.clone()))),
            MenuAction::Delete => Some(WorkflowCommand::DeleteStep(node.id.clone())),
            MenuAction::AddAbove => kind.map(|kind| WorkflowCommand::AddStep {
                kind,
                position: Position::Above(node.id.clone()),
            }),
            MenuAction::AddBelow => kind.map(|kind| WorkflowCommand::AddStep {
                kind,
                position: Position::Below(node.id.clone()),
            }),
        }
    }

    /// Total number of rendered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn build_node(
    manager: &WorkflowManager,
    step: &Step,
    depth: usize,
    selected: Option<&StepId>,
) -> TreeNode {
    let branches = if step.kind.is_branching() {
        BranchTag::BOTH
            .iter()
            .map(|tag| BranchColumn {
                branch: *tag,
                caption: tag.caption(step.kind),
                children: manager
                    .branch(&step.id, *tag)
                    .iter()
                    .map(|child| child.id.clone())
                    .collect(),
                add_slot: AddSlot::in_branch(step.id.clone(), *tag),
            })
            .collect()
    } else {
        Vec::new()
    };

    TreeNode {
        id: step.id.clone(),
        kind: step.kind,
        label: step.label.clone(),
        delay: step.delay,
        selected: selected == Some(&step.id),
        depth,
        parent_id: step.parent_id().cloned(),
        branch: step.branch(),
        menu: &MenuAction::ALL,
        branches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::command::CommandOutcome;
    use crate::workflow::model::EditorContext;

    fn added(manager: &mut WorkflowManager, command: WorkflowCommand) -> StepId {
        match manager.apply(command).unwrap() {
            CommandOutcome::Added(id) => id,
            other => panic!("expected an added step, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_state() {
        let view = TreeView::build(&WorkflowManager::default());
        assert!(view.roots.is_empty());
        assert!(view.nodes.is_empty());
        assert_eq!(view.empty_add, Some(AddSlot::main_flow()));
        assert!(view.trailing_add.is_none());
    }

    #[test]
    fn test_seed_from_empty_slot() {
        let mut manager = WorkflowManager::default();
        let view = TreeView::build(&manager);
        let id = added(&mut manager, view.empty_add.unwrap().command(StepKind::Email));

        let view = TreeView::build(&manager);
        assert_eq!(view.roots, vec![id.clone()]);
        let root = view.root_nodes().next().unwrap();
        assert_eq!(root.id, id);
        assert!(root.selected);
        assert_eq!(view.trailing_add, Some(AddSlot::main_flow()));
        assert!(view.empty_add.is_none());
    }

    #[test]
    fn test_no_trailing_add_after_condition() {
        let mut manager = WorkflowManager::default();
        manager.add_step(StepKind::Email, Position::End);
        manager.add_step(StepKind::Condition, Position::End);
        assert!(TreeView::build(&manager).trailing_add.is_none());

        manager.add_step(StepKind::Call, Position::End);
        assert!(TreeView::build(&manager).trailing_add.is_some());
    }

    #[test]
    fn test_nested_branches() {
        let mut manager = WorkflowManager::new(EditorContext::default());
        let call = manager.add_step(StepKind::Call, Position::End);

        let view = TreeView::build(&manager);
        let columns = &view.find(&call).unwrap().branches;
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].caption, "Accepted");
        assert_eq!(columns[1].caption, "Pending");

        // Conditions and calls are addable inside branches, any number of times.
        let cond = added(&mut manager, columns[0].add_slot.command(StepKind::Condition));
        let inner_call = added(&mut manager, columns[1].add_slot.command(StepKind::Call));
        let view = TreeView::build(&manager);
        let cond_node = view.find(&cond).unwrap();
        let deep = added(&mut manager, cond_node.branches[1].add_slot.command(StepKind::Telegram));

        let view = TreeView::build(&manager);
        assert_eq!(view.node_count(), 4);
        let order: Vec<_> = view.nodes.iter().map(|n| n.id.clone()).collect();
        assert_eq!(order, vec![call.clone(), cond.clone(), deep.clone(), inner_call]);

        let cond_node = view.find(&cond).unwrap();
        assert_eq!(cond_node.depth, 1);
        assert_eq!(cond_node.parent_id, Some(call.clone()));
        assert_eq!(cond_node.branch, Some(BranchTag::Yes));
        assert_eq!(cond_node.branches[0].caption, "Yes");
        let no_side: Vec<_> = view.column_nodes(&cond_node.branches[1]).collect();
        assert_eq!(no_side.len(), 1);
        assert_eq!(no_side[0].id, deep);
        assert_eq!(no_side[0].depth, 2);
        assert_eq!(manager.main_flow_ids(), &[call]);
        manager.check_invariants().unwrap();
    }

    #[test]
    fn test_deep_nesting_builds_without_recursion() {
        let mut manager = WorkflowManager::default();
        let mut parent = manager.add_step(StepKind::Condition, Position::End);
        for _ in 1..3000 {
            parent = manager.add_step(
                StepKind::Condition,
                Position::EndOfBranch { parent, branch: BranchTag::Yes },
            );
        }
        manager.check_invariants().unwrap();

        let view = TreeView::build(&manager);
        assert_eq!(view.node_count(), 3000);
        assert_eq!(view.roots.len(), 1);
        assert_eq!(view.find(&parent).unwrap().depth, 2999);
        assert!(view.trailing_add.is_none());

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains(parent.as_str()));
    }

    #[test]
    fn test_menu_commands() {
        let mut manager = WorkflowManager::default();
        let cond = manager.add_step(StepKind::Condition, Position::End);
        let child = manager.add_step(
            StepKind::Email,
            Position::EndOfBranch { parent: cond.clone(), branch: BranchTag::Yes },
        );
        let view = TreeView::build(&manager);
        assert_eq!(view.find(&child).unwrap().menu, &MenuAction::ALL);

        assert!(view.menu_command(&child, MenuAction::AddAbove, None).is_none());
        let above = added(
            &mut manager,
            view.menu_command(&child, MenuAction::AddAbove, Some(StepKind::WhatsApp))
                .unwrap(),
        );
        let below = added(
            &mut manager,
            view.menu_command(&child, MenuAction::AddBelow, Some(StepKind::Call))
                .unwrap(),
        );
        let yes: Vec<_> = manager
            .branch(&cond, BranchTag::Yes)
            .iter()
            .map(|s| s.id.clone())
            .collect();
        assert_eq!(yes, vec![above.clone(), child.clone(), below]);

        manager
            .apply(view.menu_command(&child, MenuAction::Edit, None).unwrap())
            .unwrap();
        assert_eq!(manager.selected_id(), Some(&child));

        let view = TreeView::build(&manager);
        manager
            .apply(view.menu_command(&cond, MenuAction::Delete, None).unwrap())
            .unwrap();
        assert!(manager.is_empty());
        assert!(view.menu_command(&StepId::new("ghost"), MenuAction::Edit, None).is_none());
    }

    #[test]
    fn test_tree_menu_is_unrestricted() {
        let mut manager = WorkflowManager::default();
        manager.add_step(StepKind::Call, Position::End);
        let view = TreeView::build(&manager);
        assert!(view.add_menu.is_enabled(StepKind::Call));
        assert!(view.add_menu.is_enabled(StepKind::Condition));
    }

    #[test]
    fn test_serialized_node() {
        let mut manager = WorkflowManager::default();
        let cond = manager.add_step(StepKind::Condition, Position::End);
        let json = serde_json::to_value(TreeView::build(&manager)).unwrap();
        assert_eq!(json["roots"][0], cond.as_str());
        let root = &json["nodes"][0];
        assert_eq!(root["type"], "condition");
        assert_eq!(root["delay"], serde_json::Value::Null);
        assert_eq!(root["parentId"], serde_json::Value::Null);
        assert_eq!(root["menu"][1], "addAbove");
        assert_eq!(root["branches"][0]["branch"], "yes");
        assert_eq!(root["branches"][0]["addSlot"]["parentId"], root["id"]);
        assert_eq!(json["trailingAdd"], serde_json::Value::Null);
    }
}
