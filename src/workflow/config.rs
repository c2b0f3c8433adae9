//! Per-step configuration payloads and the id-keyed configuration map.
//!
//! The payload shape depends on the step kind. Field names on the wire are
//! the camelCase names the browser editor binds its inputs to.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::model::{EditorContext, StepId, StepKind};
use crate::error::{WorkflowError, WorkflowResult};

// =============================================================================
// CONDITION KIND
// =============================================================================

/// Which prior outcome a condition step checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Email,
    WhatsApp,
    Telegram,
    Call,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 4] = [
        ConditionKind::Email,
        ConditionKind::WhatsApp,
        ConditionKind::Telegram,
        ConditionKind::Call,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Email => "email",
            ConditionKind::WhatsApp => "whatsapp",
            ConditionKind::Telegram => "telegram",
            ConditionKind::Call => "call",
        }
    }

    /// Label a condition step takes once this kind is chosen.
    pub fn label(&self) -> &'static str {
        match self {
            ConditionKind::Email => "Email Responded",
            ConditionKind::WhatsApp => "WhatsApp Responded",
            ConditionKind::Telegram => "Telegram Responded",
            ConditionKind::Call => "Call Responded",
        }
    }
}

impl FromStr for ConditionKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ConditionKind::Email),
            "whatsapp" => Ok(ConditionKind::WhatsApp),
            "telegram" => Ok(ConditionKind::Telegram),
            "call" => Ok(ConditionKind::Call),
            other => Err(WorkflowError::UnknownConditionType(other.to_string())),
        }
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInConfig {
    pub message: String,
}

/// Shared by WhatsApp and Telegram steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessengerConfig {
    pub to: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    pub condition_type: Option<ConditionKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallConfig {
    pub opening_line: String,
    pub website_url: String,
    pub call_prompt: String,
}

/// Configuration payload for one step.
///
/// Serialized untagged: each variant is exactly the plain object the editor
/// stores. Reading one back needs the step kind, see [`StepConfig::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepConfig {
    Email(EmailConfig),
    LinkedIn(LinkedInConfig),
    WhatsApp(MessengerConfig),
    Telegram(MessengerConfig),
    Condition(ConditionConfig),
    Call(CallConfig),
}

impl StepConfig {
    /// Type-appropriate defaults for a freshly created step.
    pub fn defaults(kind: StepKind, ctx: &EditorContext) -> Self {
        match kind {
            StepKind::Email => StepConfig::Email(EmailConfig {
                to: ctx.default_recipient(),
                ..Default::default()
            }),
            StepKind::LinkedIn(_) => StepConfig::LinkedIn(LinkedInConfig::default()),
            StepKind::WhatsApp => StepConfig::WhatsApp(MessengerConfig::default()),
            StepKind::Telegram => StepConfig::Telegram(MessengerConfig::default()),
            StepKind::Condition => StepConfig::Condition(ConditionConfig::default()),
            StepKind::Call => StepConfig::Call(CallConfig::default()),
        }
    }

    /// Rebuilds a payload from an imported object: defaults first, then every
    /// known field present in `value`. Unknown keys are ignored.
    pub fn from_json(kind: StepKind, ctx: &EditorContext, value: &JsonValue) -> WorkflowResult<Self> {
        let mut config = Self::defaults(kind, ctx);
        match value {
            JsonValue::Null => {}
            JsonValue::Object(map) => {
                for field in config.fields() {
                    if let Some(v) = map.get(*field) {
                        config.set_field(field, v)?;
                    }
                }
            }
            _ => {
                return Err(WorkflowError::serialization(format!(
                    "configuration for a {} step must be an object",
                    kind.type_name()
                )))
            }
        }
        Ok(config)
    }

    /// The step type this payload belongs to.
    pub fn type_name(&self) -> &'static str {
        match self {
            StepConfig::Email(_) => "email",
            StepConfig::LinkedIn(_) => "linkedin",
            StepConfig::WhatsApp(_) => "whatsapp",
            StepConfig::Telegram(_) => "telegram",
            StepConfig::Condition(_) => "condition",
            StepConfig::Call(_) => "call",
        }
    }

    /// Whether this payload has the shape `kind` expects.
    pub fn matches(&self, kind: StepKind) -> bool {
        self.type_name() == kind.type_name()
    }

    /// Editable field names, in form order.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            StepConfig::Email(_) => &["to", "cc", "bcc", "subject", "body"],
            StepConfig::LinkedIn(_) => &["message"],
            StepConfig::WhatsApp(_) | StepConfig::Telegram(_) => &["to", "message"],
            StepConfig::Condition(_) => &["conditionType"],
            StepConfig::Call(_) => &["openingLine", "websiteUrl", "callPrompt"],
        }
    }

    /// Reads one field as JSON.
    pub fn get_field(&self, field: &str) -> Option<JsonValue> {
        let text = |s: &String| Some(JsonValue::String(s.clone()));
        match (self, field) {
            (StepConfig::Email(c), "to") => text(&c.to),
            (StepConfig::Email(c), "cc") => text(&c.cc),
            (StepConfig::Email(c), "bcc") => text(&c.bcc),
            (StepConfig::Email(c), "subject") => text(&c.subject),
            (StepConfig::Email(c), "body") => text(&c.body),
            (StepConfig::LinkedIn(c), "message") => text(&c.message),
            (StepConfig::WhatsApp(c) | StepConfig::Telegram(c), "to") => text(&c.to),
            (StepConfig::WhatsApp(c) | StepConfig::Telegram(c), "message") => text(&c.message),
            (StepConfig::Condition(c), "conditionType") => Some(
                c.condition_type
                    .map(|k| JsonValue::String(k.as_str().to_string()))
                    .unwrap_or(JsonValue::Null),
            ),
            (StepConfig::Call(c), "openingLine") => text(&c.opening_line),
            (StepConfig::Call(c), "websiteUrl") => text(&c.website_url),
            (StepConfig::Call(c), "callPrompt") => text(&c.call_prompt),
            _ => None,
        }
    }

    /// Merges `{field: value}` into the payload.
    ///
    /// Nothing changes when the field is foreign to this payload or the value
    /// has the wrong shape.
    pub fn set_field(&mut self, field: &str, value: &JsonValue) -> WorkflowResult<()> {
        let type_name = self.type_name();
        let slot: &mut String = match (self, field) {
            (StepConfig::Condition(c), "conditionType") => {
                c.condition_type = parse_condition_type(value)?;
                return Ok(());
            }
            (StepConfig::Email(c), "to") => &mut c.to,
            (StepConfig::Email(c), "cc") => &mut c.cc,
            (StepConfig::Email(c), "bcc") => &mut c.bcc,
            (StepConfig::Email(c), "subject") => &mut c.subject,
            (StepConfig::Email(c), "body") => &mut c.body,
            (StepConfig::LinkedIn(c), "message") => &mut c.message,
            (StepConfig::WhatsApp(c) | StepConfig::Telegram(c), "to") => &mut c.to,
            (StepConfig::WhatsApp(c) | StepConfig::Telegram(c), "message") => &mut c.message,
            (StepConfig::Call(c), "openingLine") => &mut c.opening_line,
            (StepConfig::Call(c), "websiteUrl") => &mut c.website_url,
            (StepConfig::Call(c), "callPrompt") => &mut c.call_prompt,
            _ => return Err(WorkflowError::unknown_config_field(type_name, field)),
        };
        *slot = text_value(field, value)?;
        Ok(())
    }

    /// The chosen condition kind, for condition payloads.
    pub fn condition_type(&self) -> Option<ConditionKind> {
        match self {
            StepConfig::Condition(c) => c.condition_type,
            _ => None,
        }
    }
}

fn text_value(field: &str, value: &JsonValue) -> WorkflowResult<String> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Null => Ok(String::new()),
        other => Err(WorkflowError::invalid_config_value(
            field,
            format!("expected a string, got {}", other),
        )),
    }
}

fn parse_condition_type(value: &JsonValue) -> WorkflowResult<Option<ConditionKind>> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) if s.is_empty() => Ok(None),
        JsonValue::String(s) => s.parse().map(Some),
        other => Err(WorkflowError::invalid_config_value(
            "conditionType",
            format!("expected a string or null, got {}", other),
        )),
    }
}

// =============================================================================
// CONFIG MAP
// =============================================================================

/// Side table of configuration payloads keyed by step id.
///
/// Entries are ordered by id so exports are byte-for-byte reproducible.
/// Read access is public; only the workflow manager inserts and removes
/// entries, always together with the matching step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigMap {
    entries: BTreeMap<StepId, StepConfig>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload for `id`, if the step exists.
    pub fn get(&self, id: &StepId) -> Option<&StepConfig> {
        self.entries.get(id)
    }

    /// Whether `id` has a payload.
    pub fn contains(&self, id: &StepId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of payloads.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Step ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &StepId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StepId, &StepConfig)> {
        self.entries.iter()
    }

    pub(crate) fn get_mut(&mut self, id: &StepId) -> Option<&mut StepConfig> {
        self.entries.get_mut(id)
    }

    pub(crate) fn insert(&mut self, id: StepId, config: StepConfig) {
        self.entries.insert(id, config);
    }

    pub(crate) fn remove(&mut self, id: &StepId) -> Option<StepConfig> {
        self.entries.remove(id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
