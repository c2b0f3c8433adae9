//! Data models for the workflow step sequence.
//!
//! Steps live in an arena keyed by id. The main flow is an ordered list of
//! ids; every call/condition node owns two ordered child lists, one per
//! branch tag. The flat `{branch, parentId}` form used by the browser editor
//! is only an interchange format (`FlatStep`).

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{WorkflowError, WorkflowResult};

// =============================================================================
// STEP ID
// =============================================================================

/// Opaque step identifier, unique within an editing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrowed id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StepId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// =============================================================================
// STEP KIND
// =============================================================================

/// LinkedIn actions a step can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkedInAction {
    Message,
    LikePost,
    Repost,
    Comment,
}

impl LinkedInAction {
    pub const ALL: [LinkedInAction; 4] = [
        LinkedInAction::Message,
        LinkedInAction::LikePost,
        LinkedInAction::Repost,
        LinkedInAction::Comment,
    ];

    /// Wire name, as the browser editor spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkedInAction::Message => "message",
            LinkedInAction::LikePost => "likePost",
            LinkedInAction::Repost => "repost",
            LinkedInAction::Comment => "comment",
        }
    }
}

impl FromStr for LinkedInAction {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(LinkedInAction::Message),
            "likePost" => Ok(LinkedInAction::LikePost),
            "repost" => Ok(LinkedInAction::Repost),
            "comment" => Ok(LinkedInAction::Comment),
            other => Err(WorkflowError::UnknownSubAction(other.to_string())),
        }
    }
}

/// What a step does. LinkedIn steps carry their sub-action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Email,
    LinkedIn(LinkedInAction),
    WhatsApp,
    Telegram,
    Call,
    Condition,
}

impl StepKind {
    /// Every addable choice, in menu order.
    pub const ALL: [StepKind; 9] = [
        StepKind::Email,
        StepKind::LinkedIn(LinkedInAction::Message),
        StepKind::LinkedIn(LinkedInAction::LikePost),
        StepKind::LinkedIn(LinkedInAction::Repost),
        StepKind::LinkedIn(LinkedInAction::Comment),
        StepKind::WhatsApp,
        StepKind::Telegram,
        StepKind::Call,
        StepKind::Condition,
    ];

    /// Parses the `(type, subAction)` pair used by the browser editor.
    pub fn from_parts(step_type: &str, sub_action: Option<&str>) -> WorkflowResult<Self> {
        let kind = match step_type {
            "email" => StepKind::Email,
            "linkedin" => {
                let sub = sub_action.ok_or_else(|| {
                    WorkflowError::schema_violation("linkedin step requires a subAction")
                })?;
                return Ok(StepKind::LinkedIn(sub.parse()?));
            }
            "whatsapp" => StepKind::WhatsApp,
            "telegram" => StepKind::Telegram,
            "call" => StepKind::Call,
            "condition" => StepKind::Condition,
            other => return Err(WorkflowError::UnknownStepType(other.to_string())),
        };
        if let Some(sub) = sub_action {
            return Err(WorkflowError::schema_violation(format!(
                "subAction '{}' is only valid on linkedin steps",
                sub
            )));
        }
        Ok(kind)
    }

    /// The `type` string.
    pub fn type_name(&self) -> &'static str {
        match self {
            StepKind::Email => "email",
            StepKind::LinkedIn(_) => "linkedin",
            StepKind::WhatsApp => "whatsapp",
            StepKind::Telegram => "telegram",
            StepKind::Call => "call",
            StepKind::Condition => "condition",
        }
    }

    /// LinkedIn action, `None` for every other kind.
    pub fn sub_action(&self) -> Option<LinkedInAction> {
        match self {
            StepKind::LinkedIn(action) => Some(*action),
            _ => None,
        }
    }

    /// Caption assigned at creation time.
    pub fn default_label(&self) -> &'static str {
        match self {
            StepKind::Email => "Send Email Message",
            StepKind::LinkedIn(LinkedInAction::Message) => "LinkedIn Message",
            StepKind::LinkedIn(LinkedInAction::LikePost) => "Like a Post",
            StepKind::LinkedIn(LinkedInAction::Repost) => "Repost",
            StepKind::LinkedIn(LinkedInAction::Comment) => "Comment on a Post",
            StepKind::WhatsApp => "Send Whatsapp Message",
            StepKind::Telegram => "Send Telegram Message",
            StepKind::Call => "Call",
            StepKind::Condition => "Condition",
        }
    }

    /// Call and condition steps own a pair of branches.
    pub fn is_branching(&self) -> bool {
        matches!(self, StepKind::Call | StepKind::Condition)
    }

    /// Conditions evaluate immediately and never wait.
    pub fn has_delay(&self) -> bool {
        !matches!(self, StepKind::Condition)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::LinkedIn(action) => write!(f, "linkedin/{}", action.as_str()),
            other => f.write_str(other.type_name()),
        }
    }
}

/// Serialized as `{"type": ..., "subAction": ...}` so views can flatten it
/// next to their own fields.
impl Serialize for StepKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sub_action = self.sub_action();
        let mut map = serializer.serialize_map(Some(1 + usize::from(sub_action.is_some())))?;
        map.serialize_entry("type", self.type_name())?;
        if let Some(action) = sub_action {
            map.serialize_entry("subAction", action.as_str())?;
        }
        map.end()
    }
}

// =============================================================================
// BRANCHES
// =============================================================================

/// Which branch of a call/condition a step sits in.
///
/// Call branches use the same tags as condition branches; only their
/// captions differ ("Accepted"/"Pending").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchTag {
    #[serde(alias = "accepted")]
    Yes,
    #[serde(alias = "pending")]
    No,
}

impl BranchTag {
    pub const BOTH: [BranchTag; 2] = [BranchTag::Yes, BranchTag::No];

    /// Wire name: `"yes"` or `"no"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchTag::Yes => "yes",
            BranchTag::No => "no",
        }
    }

    /// Column caption under a parent of the given kind.
    pub fn caption(&self, parent: StepKind) -> &'static str {
        match (parent, self) {
            (StepKind::Call, BranchTag::Yes) => "Accepted",
            (StepKind::Call, BranchTag::No) => "Pending",
            (_, BranchTag::Yes) => "Yes",
            (_, BranchTag::No) => "No",
        }
    }
}

impl FromStr for BranchTag {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" | "accepted" => Ok(BranchTag::Yes),
            "no" | "pending" => Ok(BranchTag::No),
            other => Err(WorkflowError::UnknownBranch(other.to_string())),
        }
    }
}

/// Where a nested step hangs: the owning call/condition and the branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placement {
    pub parent: StepId,
    pub branch: BranchTag,
}

/// The two ordered child sequences of a call/condition step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branches {
    pub yes: Vec<StepId>,
    pub no: Vec<StepId>,
}

impl Branches {
    /// Ids of one branch, in order.
    pub fn get(&self, tag: BranchTag) -> &[StepId] {
        match tag {
            BranchTag::Yes => &self.yes,
            BranchTag::No => &self.no,
        }
    }

    /// Mutable ids of one branch.
    pub fn get_mut(&mut self, tag: BranchTag) -> &mut Vec<StepId> {
        match tag {
            BranchTag::Yes => &mut self.yes,
            BranchTag::No => &mut self.no,
        }
    }

    /// True when neither branch holds a step.
    pub fn is_empty(&self) -> bool {
        self.yes.is_empty() && self.no.is_empty()
    }

    /// All direct children, yes branch first.
    pub fn children(&self) -> impl Iterator<Item = &StepId> {
        self.yes.iter().chain(self.no.iter())
    }
}

// =============================================================================
// STEP
// =============================================================================

/// One action in the outreach sequence.
///
/// Serializes to the flat shape the browser editor uses
/// (`{id, type, subAction, label, delay, branch, parentId}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "FlatStep", try_from = "FlatStep")]
pub struct Step {
    pub id: StepId,
    pub kind: StepKind,
    pub label: String,
    /// Days to wait before running. Always `None` for conditions.
    pub delay: Option<u32>,
    /// `None` for main-flow steps.
    pub placement: Option<Placement>,
}

impl Step {
    /// Delay given to new non-condition steps.
    pub const DEFAULT_DELAY: u32 = 1;

    /// Creates a main-flow step with the default label and delay.
    pub fn new(id: impl Into<StepId>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: kind.default_label().to_string(),
            delay: kind.has_delay().then_some(Self::DEFAULT_DELAY),
            placement: None,
        }
    }

    /// Builder: Set label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builder: Set delay. Ignored for conditions.
    pub fn with_delay(mut self, days: u32) -> Self {
        if self.kind.has_delay() {
            self.delay = Some(days);
        }
        self
    }

    /// Builder: Place inside a branch of `parent`.
    pub fn in_branch(mut self, parent: impl Into<StepId>, branch: BranchTag) -> Self {
        self.placement = Some(Placement {
            parent: parent.into(),
            branch,
        });
        self
    }

    /// Checks a delay that arrives as a plain number (JS callers): whole
    /// days from 1 to `u32::MAX`.
    pub fn delay_from_f64(days: f64) -> WorkflowResult<u32> {
        if days.fract() != 0.0 || !(1.0..=f64::from(u32::MAX)).contains(&days) {
            return Err(WorkflowError::InvalidDelay(days as i64));
        }
        Ok(days as u32)
    }

    /// Branch this step sits in, `None` on the main flow.
    pub fn branch(&self) -> Option<BranchTag> {
        self.placement.as_ref().map(|p| p.branch)
    }

    /// Owning call/condition step, `None` on the main flow.
    pub fn parent_id(&self) -> Option<&StepId> {
        self.placement.as_ref().map(|p| &p.parent)
    }

    /// True for steps outside any branch.
    pub fn is_main_flow(&self) -> bool {
        self.placement.is_none()
    }
}

/// Flat interchange record for a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatStep {
    pub id: StepId,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_action: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<i64>,
    #[serde(default)]
    pub branch: Option<BranchTag>,
    #[serde(default)]
    pub parent_id: Option<StepId>,
}

impl From<Step> for FlatStep {
    fn from(step: Step) -> Self {
        let (branch, parent_id) = match step.placement {
            Some(p) => (Some(p.branch), Some(p.parent)),
            None => (None, None),
        };
        FlatStep {
            id: step.id,
            step_type: step.kind.type_name().to_string(),
            sub_action: step.kind.sub_action().map(|a| a.as_str().to_string()),
            label: Some(step.label),
            delay: step.delay.map(i64::from),
            branch,
            parent_id,
        }
    }
}

impl TryFrom<FlatStep> for Step {
    type Error = WorkflowError;

    fn try_from(flat: FlatStep) -> Result<Self, Self::Error> {
        let kind = StepKind::from_parts(&flat.step_type, flat.sub_action.as_deref())?;

        let placement = match (flat.branch, flat.parent_id) {
            (None, None) => None,
            (Some(branch), Some(parent)) => Some(Placement { parent, branch }),
            _ => {
                return Err(WorkflowError::schema_violation(format!(
                    "step {}: branch and parentId must be set together",
                    flat.id
                )))
            }
        };

        // Out-of-range delays fall back to the default, as the editor does.
        let delay = if kind.has_delay() {
            let days = flat
                .delay
                .and_then(|d| u32::try_from(d).ok())
                .filter(|d| *d >= 1)
                .unwrap_or(Step::DEFAULT_DELAY);
            Some(days)
        } else {
            None
        };

        Ok(Step {
            label: flat
                .label
                .unwrap_or_else(|| kind.default_label().to_string()),
            id: flat.id,
            kind,
            delay,
            placement,
        })
    }
}

// =============================================================================
// STEP NODE
// =============================================================================

/// Arena entry: a step and, for call/condition, its branches.
#[derive(Debug, Clone, PartialEq)]
pub struct StepNode {
    pub step: Step,
    pub branches: Option<Branches>,
}

impl StepNode {
    /// Node with empty branches for call/condition steps, none otherwise.
    pub fn new(step: Step) -> Self {
        let branches = step.kind.is_branching().then(Branches::default);
        Self { step, branches }
    }
}

// =============================================================================
// EDITOR CONTEXT
// =============================================================================

/// Identifiers handed in by the surrounding page.
///
/// The engine only threads them into default configuration values and
/// save requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorContext {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub workflow_name: String,
    #[serde(default)]
    pub workflow_date: String,
}

impl EditorContext {
    /// Context without a project id.
    pub fn new(workflow_name: impl Into<String>, workflow_date: impl Into<String>) -> Self {
        Self {
            project_id: None,
            workflow_name: workflow_name.into(),
            workflow_date: workflow_date.into(),
        }
    }

    /// Builder: Set project id.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Default recipient line for new email steps.
    pub fn default_recipient(&self) -> String {
        format!("{} - {}", self.workflow_name, self.workflow_date)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_table() {
        let expected = [
            (StepKind::Email, "Send Email Message"),
            (StepKind::LinkedIn(LinkedInAction::Message), "LinkedIn Message"),
            (StepKind::LinkedIn(LinkedInAction::LikePost), "Like a Post"),
            (StepKind::LinkedIn(LinkedInAction::Repost), "Repost"),
            (StepKind::LinkedIn(LinkedInAction::Comment), "Comment on a Post"),
            (StepKind::WhatsApp, "Send Whatsapp Message"),
            (StepKind::Telegram, "Send Telegram Message"),
            (StepKind::Call, "Call"),
            (StepKind::Condition, "Condition"),
        ];
        for (kind, label) in expected {
            assert_eq!(kind.default_label(), label);
        }
    }

    #[test]
    fn test_kind_from_parts() {
        assert_eq!(StepKind::from_parts("email", None).unwrap(), StepKind::Email);
        assert_eq!(
            StepKind::from_parts("linkedin", Some("likePost")).unwrap(),
            StepKind::LinkedIn(LinkedInAction::LikePost)
        );
        assert!(matches!(
            StepKind::from_parts("fax", None),
            Err(WorkflowError::UnknownStepType(_))
        ));
        assert!(matches!(
            StepKind::from_parts("linkedin", Some("poke")),
            Err(WorkflowError::UnknownSubAction(_))
        ));
        assert!(StepKind::from_parts("linkedin", None).is_err());
        assert!(StepKind::from_parts("email", Some("message")).is_err());
    }

    #[test]
    fn test_new_step_delay_rules() {
        let email = Step::new("a", StepKind::Email);
        assert_eq!(email.delay, Some(1));
        assert!(email.is_main_flow());

        let cond = Step::new("b", StepKind::Condition).with_delay(3);
        assert_eq!(cond.delay, None);
    }

    #[test]
    fn test_delay_from_f64() {
        assert_eq!(Step::delay_from_f64(3.0), Ok(3));
        assert_eq!(Step::delay_from_f64(-1.0), Err(WorkflowError::InvalidDelay(-1)));
        assert_eq!(Step::delay_from_f64(0.0), Err(WorkflowError::InvalidDelay(0)));
        assert!(Step::delay_from_f64(1.5).is_err());
        assert!(Step::delay_from_f64(f64::NAN).is_err());
        assert!(Step::delay_from_f64(4_294_967_296.0).is_err());
    }

    #[test]
    fn test_branch_captions() {
        assert_eq!(BranchTag::Yes.caption(StepKind::Condition), "Yes");
        assert_eq!(BranchTag::No.caption(StepKind::Condition), "No");
        assert_eq!(BranchTag::Yes.caption(StepKind::Call), "Accepted");
        assert_eq!(BranchTag::No.caption(StepKind::Call), "Pending");
    }

    #[test]
    fn test_step_serializes_flat() {
        let step = Step::new("w1", StepKind::WhatsApp).in_branch("c1", BranchTag::Yes);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["id"], "w1");
        assert_eq!(json["type"], "whatsapp");
        assert_eq!(json["label"], "Send Whatsapp Message");
        assert_eq!(json["delay"], 1);
        assert_eq!(json["branch"], "yes");
        assert_eq!(json["parentId"], "c1");

        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_flat_step_accepts_call_branch_aliases() {
        let json = serde_json::json!({
            "id": "x",
            "type": "linkedin",
            "subAction": "comment",
            "branch": "pending",
            "parentId": "call-1"
        });
        let step: Step = serde_json::from_value(json).unwrap();
        assert_eq!(step.kind, StepKind::LinkedIn(LinkedInAction::Comment));
        assert_eq!(step.label, "Comment on a Post");
        assert_eq!(step.branch(), Some(BranchTag::No));
    }

    #[test]
    fn test_flat_step_rejects_half_placement() {
        let json = serde_json::json!({ "id": "x", "type": "email", "branch": "yes" });
        assert!(serde_json::from_value::<Step>(json).is_err());
    }

    #[test]
    fn test_flat_step_delay_defaults() {
        let json = serde_json::json!({ "id": "x", "type": "telegram", "delay": 0 });
        let step: Step = serde_json::from_value(json).unwrap();
        assert_eq!(step.delay, Some(1));

        let json = serde_json::json!({ "id": "c", "type": "condition", "delay": 4 });
        let step: Step = serde_json::from_value(json).unwrap();
        assert_eq!(step.delay, None);
    }

    #[test]
    fn test_default_recipient() {
        let ctx = EditorContext::new("Spring Launch", "2024-03-01");
        assert_eq!(ctx.default_recipient(), "Spring Launch - 2024-03-01");
    }
}
