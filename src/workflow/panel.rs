//! Right-hand configuration panel.
//!
//! Shows the selected step's configuration as a type-specific form. The
//! panel only ever edits configuration; it never adds or removes steps.

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::command::WorkflowCommand;
use super::config::{ConditionKind, StepConfig};
use super::manager::WorkflowManager;
use super::model::{StepId, StepKind};

/// Tabs of the call editor. Other editors are a single form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PanelTab {
    #[serde(rename = "Call Flow")]
    CallFlow,
    #[serde(rename = "Call Configuration")]
    CallConfiguration,
}

impl PanelTab {
    pub fn title(&self) -> &'static str {
        match self {
            PanelTab::CallFlow => "Call Flow",
            PanelTab::CallConfiguration => "Call Configuration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelField {
    pub name: &'static str,
    pub caption: &'static str,
    pub value: JsonValue,
    pub multiline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<PanelTab>,
}

/// One entry of the condition-kind picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOption {
    pub value: ConditionKind,
    pub label: &'static str,
    pub selected: bool,
}

/// Form for the selected step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelEditor {
    pub step_id: StepId,
    #[serde(flatten)]
    pub kind: StepKind,
    pub label: String,
    pub fields: Vec<PanelField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub condition_options: Vec<ConditionOption>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tabs: Vec<PanelTab>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ConfigPanel {
    /// Nothing selected: the illustration placeholder.
    Empty,
    Editor(PanelEditor),
}

impl ConfigPanel {
    pub fn build(manager: &WorkflowManager) -> Self {
        let Some(step) = manager.selected() else {
            return ConfigPanel::Empty;
        };
        let Some(config) = manager.config(&step.id) else {
            return ConfigPanel::Empty;
        };

        let fields = config
            .fields()
            .iter()
            .copied()
            .filter(|name| *name != "conditionType")
            .map(|name| PanelField {
                name,
                caption: field_caption(name),
                value: config.get_field(name).unwrap_or(JsonValue::Null),
                multiline: matches!(name, "body" | "message" | "callPrompt"),
                tab: field_tab(config, name),
            })
            .collect();

        let condition_options = match config {
            StepConfig::Condition(c) => ConditionKind::ALL
                .iter()
                .map(|kind| ConditionOption {
                    value: *kind,
                    label: kind.label(),
                    selected: c.condition_type == Some(*kind),
                })
                .collect(),
            _ => Vec::new(),
        };

        let tabs = if step.kind == StepKind::Call {
            vec![PanelTab::CallFlow, PanelTab::CallConfiguration]
        } else {
            Vec::new()
        };

        ConfigPanel::Editor(PanelEditor {
            step_id: step.id.clone(),
            kind: step.kind,
            label: step.label.clone(),
            fields,
            condition_options,
            tabs,
        })
    }

    pub fn editor(&self) -> Option<&PanelEditor> {
        match self {
            ConfigPanel::Empty => None,
            ConfigPanel::Editor(editor) => Some(editor),
        }
    }
}

impl PanelEditor {
    pub fn field(&self, name: &str) -> Option<&PanelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Command for a form edit. Fields the form does not show are refused.
    pub fn edit_command(&self, field: &str, value: impl Into<JsonValue>) -> Option<WorkflowCommand> {
        let known = self.field(field).is_some()
            || (field == "conditionType" && !self.condition_options.is_empty());
        known.then(|| WorkflowCommand::UpdateConfig {
            id: self.step_id.clone(),
            field: field.to_string(),
            value: value.into(),
        })
    }

    /// Command for picking a condition kind.
    pub fn condition_command(&self, kind: Option<ConditionKind>) -> Option<WorkflowCommand> {
        let value = kind
            .map(|k| JsonValue::String(k.as_str().to_string()))
            .unwrap_or(JsonValue::Null);
        self.edit_command("conditionType", value)
    }
}

fn field_caption(name: &str) -> &'static str {
    match name {
        "to" => "To",
        "cc" => "Cc",
        "bcc" => "Bcc",
        "subject" => "Subject",
        "body" => "Body",
        "message" => "Message",
        "openingLine" => "Opening Line",
        "websiteUrl" => "Website URL",
        "callPrompt" => "Call Prompt",
        _ => "",
    }
}

fn field_tab(config: &StepConfig, name: &str) -> Option<PanelTab> {
    match (config, name) {
        (StepConfig::Call(_), "websiteUrl") => Some(PanelTab::CallConfiguration),
        (StepConfig::Call(_), _) => Some(PanelTab::CallFlow),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::manager::Position;
    use crate::workflow::model::{EditorContext, LinkedInAction};
    use serde_json::json;

    fn manager() -> WorkflowManager {
        WorkflowManager::new(EditorContext::new("Q3 Outreach", "2024-07-01"))
    }

    #[test]
    fn test_empty_without_selection() {
        let mut manager = manager();
        assert_eq!(ConfigPanel::build(&manager), ConfigPanel::Empty);

        manager.add_step(StepKind::Email, Position::End);
        manager.select_step(None).unwrap();
        assert!(ConfigPanel::build(&manager).editor().is_none());
    }

    #[test]
    fn test_email_editor() {
        let mut manager = manager();
        let id = manager.add_step(StepKind::Email, Position::End);
        let panel = ConfigPanel::build(&manager);
        let editor = panel.editor().unwrap();

        assert_eq!(editor.step_id, id);
        let names: Vec<_> = editor.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["to", "cc", "bcc", "subject", "body"]);
        assert_eq!(editor.field("to").unwrap().value, json!("Q3 Outreach - 2024-07-01"));
        assert!(editor.field("body").unwrap().multiline);
        assert!(!editor.field("subject").unwrap().multiline);
        assert!(editor.tabs.is_empty());
        assert!(editor.condition_options.is_empty());

        manager
            .apply(editor.edit_command("subject", "Quick question").unwrap())
            .unwrap();
        assert_eq!(
            manager.config(&id).unwrap().get_field("subject"),
            Some(json!("Quick question"))
        );
        assert!(editor.edit_command("callPrompt", "x").is_none());
        assert!(editor.condition_command(Some(ConditionKind::Email)).is_none());
    }

    #[test]
    fn test_linkedin_editor_has_message_only() {
        let mut manager = manager();
        manager.add_step(StepKind::LinkedIn(LinkedInAction::Comment), Position::End);
        let panel = ConfigPanel::build(&manager);
        let editor = panel.editor().unwrap();
        assert_eq!(editor.label, "Comment on a Post");
        assert_eq!(editor.fields.len(), 1);
        assert_eq!(editor.fields[0].name, "message");
    }

    #[test]
    fn test_call_editor_tabs() {
        let mut manager = manager();
        manager.add_step(StepKind::Call, Position::End);
        let panel = ConfigPanel::build(&manager);
        let editor = panel.editor().unwrap();

        assert_eq!(editor.tabs, vec![PanelTab::CallFlow, PanelTab::CallConfiguration]);
        assert_eq!(editor.field("openingLine").unwrap().tab, Some(PanelTab::CallFlow));
        assert_eq!(editor.field("callPrompt").unwrap().tab, Some(PanelTab::CallFlow));
        assert_eq!(
            editor.field("websiteUrl").unwrap().tab,
            Some(PanelTab::CallConfiguration)
        );
    }

    #[test]
    fn test_condition_picker_relabels() {
        let mut manager = manager();
        let cond = manager.add_step(StepKind::Condition, Position::End);
        let panel = ConfigPanel::build(&manager);
        let editor = panel.editor().unwrap();
        assert!(editor.fields.is_empty());
        assert_eq!(editor.condition_options.len(), 4);
        assert!(editor.condition_options.iter().all(|o| !o.selected));

        manager
            .apply(editor.condition_command(Some(ConditionKind::Telegram)).unwrap())
            .unwrap();
        assert_eq!(manager.step(&cond).unwrap().label, "Telegram Responded");

        let panel = ConfigPanel::build(&manager);
        let selected: Vec<_> = panel
            .editor()
            .unwrap()
            .condition_options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, vec![ConditionKind::Telegram]);
        assert_eq!(panel.editor().unwrap().label, "Telegram Responded");
    }

    #[test]
    fn test_serialized_panel() {
        let json = serde_json::to_value(ConfigPanel::Empty).unwrap();
        assert_eq!(json, json!({ "state": "empty" }));

        let mut manager = manager();
        manager.add_step(StepKind::Call, Position::End);
        let json = serde_json::to_value(ConfigPanel::build(&manager)).unwrap();
        assert_eq!(json["state"], "editor");
        assert_eq!(json["type"], "call");
        assert_eq!(json["tabs"], json!(["Call Flow", "Call Configuration"]));
    }
}
