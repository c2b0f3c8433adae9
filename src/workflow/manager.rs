//! Core WorkflowManager: owns the step tree and the configuration map.
//!
//! Steps are stored in an arena (`nodes`) keyed by id. Order lives in the
//! `main_flow` list and in each call/condition node's branch lists. Every
//! mutation updates steps and configurations inside a single `&mut self`
//! call, so the two never drift apart.

use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::config::{ConditionKind, ConfigMap, StepConfig};
use super::model::{Branches, BranchTag, EditorContext, Placement, Step, StepId, StepKind, StepNode};
use crate::error::{WorkflowError, WorkflowResult};

// =============================================================================
// POSITION
// =============================================================================

/// Where `add_step` puts a new step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Directly before the reference, in the reference's own sequence.
    Above(StepId),
    /// Directly after the reference, in the reference's own sequence.
    Below(StepId),
    /// At the end of the main flow.
    End,
    /// At the end of one branch of a call/condition step.
    EndOfBranch { parent: StepId, branch: BranchTag },
}

impl Position {
    /// Builds a position from the loose `(position, referenceId, branch)`
    /// triple the browser editor sends.
    ///
    /// `"above"`/`"below"` without a reference, and `"end"` without both a
    /// reference and a branch, mean the end of the main flow.
    pub fn from_parts(
        position: &str,
        reference: Option<StepId>,
        branch: Option<BranchTag>,
    ) -> WorkflowResult<Self> {
        Ok(match (position, reference, branch) {
            ("above", Some(reference), _) => Position::Above(reference),
            ("below", Some(reference), _) => Position::Below(reference),
            ("above" | "below", None, _) => Position::End,
            ("end", Some(parent), Some(branch)) => Position::EndOfBranch { parent, branch },
            ("end", _, _) => Position::End,
            (other, _, _) => return Err(WorkflowError::UnknownPosition(other.to_string())),
        })
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// In-memory owner of one editing session's steps and configurations.
///
/// All mutation goes through `&mut self`; projections only ever borrow it
/// immutably and hand back [`WorkflowCommand`](super::command::WorkflowCommand)s.
#[derive(Debug, Clone)]
pub struct WorkflowManager {
    ctx: EditorContext,
    main_flow: Vec<StepId>,
    nodes: HashMap<StepId, StepNode>,
    configs: ConfigMap,
    selected: Option<StepId>,
}

impl WorkflowManager {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates an empty workflow.
    pub fn new(ctx: EditorContext) -> Self {
        Self {
            ctx,
            main_flow: Vec::new(),
            nodes: HashMap::new(),
            configs: ConfigMap::new(),
            selected: None,
        }
    }

    /// Seeds the workflow from flat `initialSteps`, giving every step its
    /// default configuration.
    pub fn from_steps(ctx: EditorContext, steps: Vec<Step>) -> WorkflowResult<Self> {
        Self::from_parts(ctx, steps, HashMap::new())
    }

    /// Seeds the workflow from flat steps plus raw configuration objects.
    ///
    /// Sibling order follows the order of `steps`. Steps without a
    /// configuration get defaults; a configuration without a step is an error.
    pub fn from_parts(
        ctx: EditorContext,
        steps: Vec<Step>,
        mut raw_configs: HashMap<StepId, JsonValue>,
    ) -> WorkflowResult<Self> {
        let mut manager = Self::new(ctx);
        let order: Vec<(StepId, Option<Placement>)> = steps
            .iter()
            .map(|s| (s.id.clone(), s.placement.clone()))
            .collect();

        for step in steps {
            if manager.nodes.contains_key(&step.id) {
                return Err(WorkflowError::duplicate_step(step.id.as_str()));
            }
            let raw = raw_configs.remove(&step.id).unwrap_or(JsonValue::Null);
            let config = StepConfig::from_json(step.kind, &manager.ctx, &raw)?;
            manager.configs.insert(step.id.clone(), config);
            manager.nodes.insert(step.id.clone(), StepNode::new(step));
        }

        if let Some(orphan) = raw_configs.keys().next() {
            return Err(WorkflowError::OrphanConfig(orphan.to_string()));
        }

        for (id, placement) in order {
            match placement {
                None => manager.main_flow.push(id),
                Some(p) => {
                    let branches = manager
                        .nodes
                        .get_mut(&p.parent)
                        .and_then(|node| node.branches.as_mut())
                        .ok_or_else(|| {
                            WorkflowError::schema_violation(format!(
                                "step {} is placed under {}, which is not a call or condition step",
                                id, p.parent
                            ))
                        })?;
                    branches.get_mut(p.branch).push(id);
                }
            }
        }

        // Parent cycles leave steps unreachable from the main flow.
        let reachable = manager.subtree_ids(&manager.main_flow).len();
        if reachable != manager.nodes.len() {
            return Err(WorkflowError::schema_violation(format!(
                "{} step(s) are not reachable from the main flow",
                manager.nodes.len() - reachable
            )));
        }

        debug!(steps = manager.nodes.len(), "workflow seeded");
        Ok(manager)
    }

    /// The identifiers this session was opened with.
    pub fn context(&self) -> &EditorContext {
        &self.ctx
    }

    // =========================================================================
    // STEP OPERATIONS
    // =========================================================================

    /// Adds a step and selects it.
    ///
    /// Never fails: a missing reference or a parent that cannot own branches
    /// falls back to appending to the main flow.
    pub fn add_step(&mut self, kind: StepKind, position: Position) -> StepId {
        let id = StepId::generate();
        let placement = self.insert_id(&id, position);

        let mut step = Step::new(id.clone(), kind);
        step.placement = placement;

        debug!(step_id = %id, kind = %kind, branch = ?step.branch(), "step added");
        self.configs
            .insert(id.clone(), StepConfig::defaults(kind, &self.ctx));
        self.nodes.insert(id.clone(), StepNode::new(step));
        self.selected = Some(id.clone());
        id
    }

    /// Deletes a step and everything nested under its branches.
    ///
    /// Returns the removed ids, the step itself first.
    pub fn delete_step(&mut self, id: &StepId) -> WorkflowResult<Vec<StepId>> {
        let (placement, index) = self.locate(id).ok_or_else(|| {
            warn!(step_id = %id, "delete ignored: step not found");
            WorkflowError::step_not_found(id.as_str())
        })?;

        let removed = self.subtree_ids(std::slice::from_ref(id));
        if let Some(sequence) = self.sequence_mut(placement.as_ref()) {
            sequence.remove(index);
        }
        for removed_id in &removed {
            self.nodes.remove(removed_id);
            self.configs.remove(removed_id);
        }
        if self
            .selected
            .as_ref()
            .is_some_and(|selected| removed.contains(selected))
        {
            self.selected = None;
        }

        debug!(step_id = %id, removed = removed.len(), "step deleted");
        Ok(removed)
    }

    /// Sets the wait before a step, in days (at least 1).
    pub fn update_delay(&mut self, id: &StepId, days: u32) -> WorkflowResult<()> {
        let node = self.nodes.get_mut(id).ok_or_else(|| {
            warn!(step_id = %id, "delay update ignored: step not found");
            WorkflowError::step_not_found(id.as_str())
        })?;
        if days < 1 {
            return Err(WorkflowError::InvalidDelay(i64::from(days)));
        }
        if !node.step.kind.has_delay() {
            return Err(WorkflowError::DelayNotApplicable(id.to_string()));
        }
        node.step.delay = Some(days);
        debug!(step_id = %id, days, "delay updated");
        Ok(())
    }

    /// Merges `{field: value}` into a step's configuration.
    ///
    /// Setting `conditionType` on a condition step also relabels it
    /// ("Email Responded", ...). No other field touches the label.
    pub fn update_config(&mut self, id: &StepId, field: &str, value: JsonValue) -> WorkflowResult<()> {
        let node = self.nodes.get_mut(id).ok_or_else(|| {
            warn!(step_id = %id, field, "config update ignored: step not found");
            WorkflowError::step_not_found(id.as_str())
        })?;
        let config = self.configs.get_mut(id).ok_or_else(|| {
            WorkflowError::schema_violation(format!("step {} has no configuration", id))
        })?;

        config.set_field(field, &value)?;
        if node.step.kind == StepKind::Condition && field == "conditionType" {
            node.step.label = condition_label(config.condition_type()).to_string();
        }
        debug!(step_id = %id, field, "config updated");
        Ok(())
    }

    /// Edits a configuration through a typed closure.
    ///
    /// The edit is discarded if it changes the payload to another step
    /// type. A changed condition kind relabels the step.
    pub fn update_config_with<F>(&mut self, id: &StepId, f: F) -> WorkflowResult<()>
    where
        F: FnOnce(&mut StepConfig),
    {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| WorkflowError::step_not_found(id.as_str()))?;
        let config = self.configs.get_mut(id).ok_or_else(|| {
            WorkflowError::schema_violation(format!("step {} has no configuration", id))
        })?;

        let mut edited = config.clone();
        f(&mut edited);
        if !edited.matches(node.step.kind) {
            return Err(WorkflowError::schema_violation(format!(
                "cannot store a {} configuration on a {} step",
                edited.type_name(),
                node.step.kind.type_name()
            )));
        }
        if node.step.kind == StepKind::Condition && edited.condition_type() != config.condition_type() {
            node.step.label = condition_label(edited.condition_type()).to_string();
        }
        *config = edited;
        Ok(())
    }

    /// Typed shortcut for setting a condition step's kind.
    pub fn set_condition_type(&mut self, id: &StepId, kind: Option<ConditionKind>) -> WorkflowResult<()> {
        let value = kind
            .map(|k| JsonValue::String(k.as_str().to_string()))
            .unwrap_or(JsonValue::Null);
        self.update_config(id, "conditionType", value)
    }

    /// Sets or clears the selected step.
    pub fn select_step(&mut self, id: Option<&StepId>) -> WorkflowResult<()> {
        match id {
            None => self.selected = None,
            Some(id) if self.nodes.contains_key(id) => self.selected = Some(id.clone()),
            Some(id) => {
                warn!(step_id = %id, "select ignored: step not found");
                return Err(WorkflowError::step_not_found(id.as_str()));
            }
        }
        Ok(())
    }

    /// Moves a step to `to` within its own sequence (clamped to the end).
    pub fn move_step(&mut self, id: &StepId, to: usize) -> WorkflowResult<()> {
        let (placement, from) = self
            .locate(id)
            .ok_or_else(|| WorkflowError::step_not_found(id.as_str()))?;
        if let Some(sequence) = self.sequence_mut(placement.as_ref()) {
            let moved = sequence.remove(from);
            let to = to.min(sequence.len());
            sequence.insert(to, moved);
            debug!(step_id = %id, from, to, "step moved");
        }
        Ok(())
    }

    /// Replaces a step's caption.
    pub fn relabel_step(&mut self, id: &StepId, label: impl Into<String>) -> WorkflowResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| WorkflowError::step_not_found(id.as_str()))?;
        node.step.label = label.into();
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Step by id, anywhere in the workflow.
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.nodes.get(id).map(|node| &node.step)
    }

    /// Configuration payload of a step.
    pub fn config(&self, id: &StepId) -> Option<&StepConfig> {
        self.configs.get(id)
    }

    /// The whole configuration side table.
    pub fn configs(&self) -> &ConfigMap {
        &self.configs
    }

    /// The branches of a call/condition step.
    pub fn branches(&self, id: &StepId) -> Option<&Branches> {
        self.nodes.get(id).and_then(|node| node.branches.as_ref())
    }

    /// Steps of one branch, in order. Empty for unknown or non-branching ids.
    pub fn branch(&self, parent: &StepId, tag: BranchTag) -> Vec<&Step> {
        self.branches(parent)
            .map(|b| self.resolve(b.get(tag)))
            .unwrap_or_default()
    }

    /// Main-flow ids, in order.
    pub fn main_flow_ids(&self) -> &[StepId] {
        &self.main_flow
    }

    /// Main-flow steps, in order.
    pub fn main_flow(&self) -> Vec<&Step> {
        self.resolve(&self.main_flow)
    }

    /// Every step, depth first: each step followed by its yes branch, then
    /// its no branch.
    pub fn steps(&self) -> Vec<&Step> {
        self.resolve(&self.subtree_ids(&self.main_flow))
    }

    /// The selected step, if any.
    pub fn selected(&self) -> Option<&Step> {
        self.selected.as_ref().and_then(|id| self.step(id))
    }

    /// Id of the selected step, if any.
    pub fn selected_id(&self) -> Option<&StepId> {
        self.selected.as_ref()
    }

    /// Number of steps, branch steps included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the workflow has no steps.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether any step anywhere matches `pred`.
    pub fn any_step<P>(&self, mut pred: P) -> bool
    where
        P: FnMut(&Step) -> bool,
    {
        self.nodes.values().any(|node| pred(&node.step))
    }

    /// Whether a step of `kind` exists anywhere.
    pub fn contains_kind(&self, kind: StepKind) -> bool {
        self.any_step(|s| s.kind == kind)
    }

    /// Whether a call or condition step exists anywhere in the workflow.
    pub fn has_branching_step(&self) -> bool {
        self.any_step(|s| s.kind.is_branching())
    }

    /// Verifies the structural invariants. Used by tests and by the
    /// inspector tool on imported files.
    pub fn check_invariants(&self) -> WorkflowResult<()> {
        let mut seen: HashSet<&StepId> = HashSet::new();
        let mut stack: Vec<(&StepId, Option<Placement>)> =
            self.main_flow.iter().rev().map(|id| (id, None)).collect();

        while let Some((id, expected)) = stack.pop() {
            if !seen.insert(id) {
                return Err(WorkflowError::schema_violation(format!("step {} is listed twice", id)));
            }
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| WorkflowError::schema_violation(format!("dangling step id {}", id)))?;
            let step = &node.step;
            if step.placement != expected {
                return Err(WorkflowError::schema_violation(format!(
                    "step {} has placement {:?}, expected {:?}",
                    id, step.placement, expected
                )));
            }
            if node.branches.is_some() != step.kind.is_branching() {
                return Err(WorkflowError::schema_violation(format!(
                    "step {} ({}) has mismatched branches",
                    id, step.kind
                )));
            }
            match (step.kind.has_delay(), step.delay) {
                (true, Some(d)) if d >= 1 => {}
                (false, None) => {}
                (_, delay) => {
                    return Err(WorkflowError::schema_violation(format!(
                        "step {} ({}) has invalid delay {:?}",
                        id, step.kind, delay
                    )))
                }
            }
            match self.configs.get(id) {
                Some(config) if config.matches(step.kind) => {}
                Some(config) => {
                    return Err(WorkflowError::schema_violation(format!(
                        "step {} ({}) carries a {} configuration",
                        id,
                        step.kind,
                        config.type_name()
                    )))
                }
                None => {
                    return Err(WorkflowError::schema_violation(format!(
                        "step {} has no configuration",
                        id
                    )))
                }
            }
            if let Some(branches) = &node.branches {
                for tag in BranchTag::BOTH.iter().rev() {
                    let placement = Placement {
                        parent: id.clone(),
                        branch: *tag,
                    };
                    for child in branches.get(*tag).iter().rev() {
                        stack.push((child, Some(placement.clone())));
                    }
                }
            }
        }

        if seen.len() != self.nodes.len() {
            return Err(WorkflowError::schema_violation(format!(
                "{} step(s) are not reachable from the main flow",
                self.nodes.len() - seen.len()
            )));
        }
        if self.configs.len() != self.nodes.len() {
            if let Some(orphan) = self.configs.ids().find(|id| !self.nodes.contains_key(*id)) {
                return Err(WorkflowError::OrphanConfig(orphan.to_string()));
            }
        }
        if let Some(selected) = &self.selected {
            if !self.nodes.contains_key(selected) {
                return Err(WorkflowError::schema_violation(format!(
                    "selected step {} does not exist",
                    selected
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    /// Puts `id` into the sequence `position` names and returns the
    /// placement the new step takes.
    fn insert_id(&mut self, id: &StepId, position: Position) -> Option<Placement> {
        match position {
            Position::End => {
                self.main_flow.push(id.clone());
                None
            }
            Position::Above(reference) => self.insert_relative(id, &reference, 0),
            Position::Below(reference) => self.insert_relative(id, &reference, 1),
            Position::EndOfBranch { parent, branch } => {
                match self.nodes.get_mut(&parent).and_then(|n| n.branches.as_mut()) {
                    Some(branches) => {
                        branches.get_mut(branch).push(id.clone());
                        Some(Placement { parent, branch })
                    }
                    None => {
                        warn!(parent = %parent, "no branching step to attach to, appending to main flow");
                        self.main_flow.push(id.clone());
                        None
                    }
                }
            }
        }
    }

    fn insert_relative(&mut self, id: &StepId, reference: &StepId, offset: usize) -> Option<Placement> {
        let Some((placement, index)) = self.locate(reference) else {
            warn!(reference = %reference, "reference step not found, appending to main flow");
            self.main_flow.push(id.clone());
            return None;
        };
        match self.sequence_mut(placement.as_ref()) {
            Some(sequence) => {
                sequence.insert(index + offset, id.clone());
                placement
            }
            None => {
                self.main_flow.push(id.clone());
                None
            }
        }
    }

    /// Finds a step's placement and its index within that sequence.
    fn locate(&self, id: &StepId) -> Option<(Option<Placement>, usize)> {
        let placement = self.nodes.get(id)?.step.placement.clone();
        let index = self
            .sequence(placement.as_ref())?
            .iter()
            .position(|s| s == id)?;
        Some((placement, index))
    }

    fn sequence(&self, placement: Option<&Placement>) -> Option<&[StepId]> {
        match placement {
            None => Some(self.main_flow.as_slice()),
            Some(p) => self
                .nodes
                .get(&p.parent)?
                .branches
                .as_ref()
                .map(|b| b.get(p.branch)),
        }
    }

    fn sequence_mut(&mut self, placement: Option<&Placement>) -> Option<&mut Vec<StepId>> {
        match placement {
            None => Some(&mut self.main_flow),
            Some(p) => self
                .nodes
                .get_mut(&p.parent)?
                .branches
                .as_mut()
                .map(|b| b.get_mut(p.branch)),
        }
    }

    /// `roots` and everything nested under them, depth first.
    fn subtree_ids(&self, roots: &[StepId]) -> Vec<StepId> {
        let mut out = Vec::new();
        let mut visited: HashSet<&StepId> = HashSet::new();
        let mut stack: Vec<&StepId> = roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push(id.clone());
            if let Some(branches) = &node.branches {
                stack.extend(branches.no.iter().rev());
                stack.extend(branches.yes.iter().rev());
            }
        }
        out
    }

    fn resolve(&self, ids: &[StepId]) -> Vec<&Step> {
        ids.iter().filter_map(|id| self.step(id)).collect()
    }
}

impl Default for WorkflowManager {
    fn default() -> Self {
        Self::new(EditorContext::default())
    }
}

/// Label for a condition step with the given kind chosen.
fn condition_label(kind: Option<ConditionKind>) -> &'static str {
    kind.map(|k| k.label())
        .unwrap_or_else(|| StepKind::Condition.default_label())
}

// =============================================================================
// TESTS
// =============================================================================
