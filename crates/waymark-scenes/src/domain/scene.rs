//! Scene definitions.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use waymark_core::progress::RuntimeProgress;

use super::condition::Condition;
use super::step::Step;
use super::trigger::{Trigger, TriggerEvent};

/// A versioned, data-described step script plus the triggers and condition
/// that let it start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDefinition {
    /// Unique scene id.
    pub id: String,
    /// Content version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Display-only title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Display-only description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Any of these makes the scene eligible.
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// Must hold for the scene to start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// The script.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Higher wins when several scenes match one event.
    #[serde(default)]
    pub priority: i32,
    /// Asset references owned by presentation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}

impl SceneDefinition {
    /// Creates a scene with no triggers and default priority.
    #[must_use]
    pub fn new(id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            version: default_version(),
            title: String::new(),
            description: String::new(),
            triggers: Vec::new(),
            condition: None,
            steps,
            priority: 0,
            assets: BTreeMap::new(),
        }
    }

    /// Adds a trigger.
    #[must_use]
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the start condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Returns whether any declared trigger accepts `event`.
    #[must_use]
    pub fn responds_to(&self, event: &TriggerEvent) -> bool {
        self.triggers.iter().any(|trigger| trigger.matches(event))
    }

    /// Returns whether the start condition holds. No condition always holds.
    #[must_use]
    pub fn condition_holds(&self, progress: &RuntimeProgress) -> bool {
        self.condition
            .as_ref()
            .is_none_or(|condition| condition.is_satisfied(progress))
    }

    /// Lists authoring defects: duplicate labels, jumps to undefined labels,
    /// empty choices and scenes no event can start. Defects are reported,
    /// not rejected; undefined jumps interrupt the scene when reached.
    #[must_use]
    pub fn lint(&self) -> Vec<String> {
        let mut findings = Vec::new();
        let mut labels = HashSet::new();
        for step in &self.steps {
            if let Step::Label { name } = step {
                if !labels.insert(name.as_str()) {
                    findings.push(format!("duplicate label `{name}`"));
                }
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            for target in step.jump_targets() {
                if !labels.contains(target) {
                    findings.push(format!(
                        "step {index} ({}) jumps to undefined label `{target}`",
                        step.kind()
                    ));
                }
            }
            if matches!(step, Step::Choice { options, .. } if options.is_empty()) {
                findings.push(format!("step {index} (choice) has no options"));
            }
        }
        if self.triggers.is_empty() {
            findings.push("scene declares no triggers".to_owned());
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_deserializing() {
        let scene: SceneDefinition = serde_json::from_str(
            r#"{"id":"home-intro","triggers":[{"type":"enter-screen","screen":"home"}],"steps":[{"type":"end"}]}"#,
        )
        .unwrap();

        assert_eq!(scene.version, 1);
        assert_eq!(scene.priority, 0);
        assert!(scene.condition.is_none());
        assert!(scene.lint().is_empty());
    }

    #[test]
    fn test_lint_reports_undefined_and_duplicate_labels() {
        let scene = SceneDefinition::new(
            "broken",
            vec![
                Step::Label {
                    name: "a".to_owned(),
                },
                Step::Label {
                    name: "a".to_owned(),
                },
                Step::Goto {
                    label: "nowhere".to_owned(),
                },
            ],
        )
        .with_trigger(Trigger::FirstLaunch);

        let findings = scene.lint();

        assert_eq!(findings.len(), 2);
        assert!(findings[0].contains("duplicate label `a`"));
        assert!(findings[1].contains("undefined label `nowhere`"));
    }

    #[test]
    fn test_condition_holds_without_condition() {
        let scene = SceneDefinition::new("s", vec![Step::End]);

        assert!(scene.condition_holds(&RuntimeProgress::default()));
    }
}
