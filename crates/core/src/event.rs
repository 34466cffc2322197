//! Interaction Events
//!
//! Structured records of notable occurrences in a session, shaped for an
//! append-only analytics/audit store (xAPI-style statements). The recorder
//! only builds records; it never performs I/O. Sessions buffer the records
//! and callers receive them through `Session::drain_outputs`.

use crate::activity::{Activity, HelpLevel, Objective, SubTask};
use crate::evaluator::OutcomeTag;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Locale-keyed text, e.g. `{"en-US": "completed"}`.
pub type LanguageMap = BTreeMap<String, String>;

const VERB_BASE_IRI: &str = "http://adlnet.gov/expapi/verbs/";

/// Envelope fields shared by every event a recorder builds.
///
/// Constructed once by the host and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Home page of the account system that learner ids belong to.
    pub actor_home_page: String,
    /// Locale used as the key of every language map.
    pub locale: String,
    /// Object type for dispensed help items.
    pub help_object_type: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            actor_home_page: "http://example.com/aita".to_string(),
            locale: "en-US".to_string(),
            help_object_type: "http://adlnet.gov/expapi/activities/community".to_string(),
        }
    }
}

/// The closed set of verbs a session emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Experienced,
    Attempted,
    Completed,
    Interacted,
}

impl Verb {
    pub fn name(&self) -> &'static str {
        match self {
            Verb::Experienced => "experienced",
            Verb::Attempted => "attempted",
            Verb::Completed => "completed",
            Verb::Interacted => "interacted",
        }
    }

    pub fn iri(&self) -> String {
        format!("{}{}", VERB_BASE_IRI, self.name())
    }
}

// --- Wire shape ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub home_page: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub object_type: String,
    pub name: String,
    pub account: Account,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerbRef {
    pub id: String,
    pub display: LanguageMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    pub name: LanguageMap,
    pub description: LanguageMap,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventObject {
    pub id: String,
    pub definition: ObjectDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_activity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

/// One immutable interaction record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionEvent {
    pub actor: Actor,
    pub verb: VerbRef,
    pub object: EventObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EventResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<EventContext>,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    /// Convenience accessor for the verb's short name, e.g. `"completed"`.
    pub fn verb_name(&self) -> &str {
        self.verb.id.rsplit('/').next().unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.result.as_ref().and_then(|r| r.success) == Some(true)
    }
}

/// Builds interaction events for a single learner.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    config: Arc<EnvelopeConfig>,
    actor: Actor,
}

impl EventRecorder {
    pub fn new(config: Arc<EnvelopeConfig>, learner_id: &str) -> Self {
        let actor = Actor {
            object_type: "Agent".to_string(),
            name: learner_id.to_string(),
            account: Account {
                home_page: config.actor_home_page.clone(),
                name: learner_id.to_string(),
            },
        };
        Self { config, actor }
    }

    fn text(&self, value: &str) -> LanguageMap {
        BTreeMap::from([(self.config.locale.clone(), value.to_string())])
    }

    fn build(
        &self,
        verb: Verb,
        object: EventObject,
        result: Option<EventResult>,
        context: Option<EventContext>,
    ) -> InteractionEvent {
        InteractionEvent {
            actor: self.actor.clone(),
            verb: VerbRef {
                id: verb.iri(),
                display: self.text(verb.name()),
            },
            object,
            result,
            context,
            timestamp: Utc::now(),
        }
    }

    fn sub_task_object(&self, sub_task: &SubTask) -> EventObject {
        EventObject {
            id: sub_task.id.clone(),
            definition: ObjectDefinition {
                name: self.text(&sub_task.title),
                description: self.text(&sub_task.description),
                object_type: sub_task.object_type.clone(),
                interaction_type: sub_task.interaction_type.clone(),
            },
        }
    }

    fn activity_object(&self, activity: &Activity) -> EventObject {
        EventObject {
            id: activity.id.clone(),
            definition: ObjectDefinition {
                name: self.text(&activity.title),
                description: self.text(&activity.description),
                object_type: activity.object_type.clone(),
                interaction_type: None,
            },
        }
    }

    fn child_of(parent_id: &str) -> EventContext {
        EventContext {
            parent_activity_id: Some(parent_id.to_string()),
            extensions: None,
        }
    }

    /// The learner was shown the activity's learning objective.
    pub fn experienced_objective(&self, activity: &Activity, objective: &Objective) -> InteractionEvent {
        let object = EventObject {
            id: objective.id.clone(),
            definition: ObjectDefinition {
                name: self.text(&objective.name),
                description: self.text(&objective.description),
                object_type: objective.object_type.clone(),
                interaction_type: None,
            },
        };
        self.build(Verb::Experienced, object, None, Some(Self::child_of(&activity.id)))
    }

    /// The learner was shown the activity overview. Carries the ordered
    /// sub-task names as context.
    pub fn experienced_activity(&self, activity: &Activity) -> InteractionEvent {
        let mut extensions = Map::new();
        extensions.insert("sub_task_overview".to_string(), json!(activity.sub_task_names()));
        let context = EventContext {
            parent_activity_id: None,
            extensions: Some(extensions),
        };
        self.build(Verb::Experienced, self.activity_object(activity), None, Some(context))
    }

    /// A sub-task prompt was introduced.
    pub fn experienced_sub_task(&self, activity: &Activity, sub_task: &SubTask) -> InteractionEvent {
        self.build(
            Verb::Experienced,
            self.sub_task_object(sub_task),
            None,
            Some(Self::child_of(&activity.id)),
        )
    }

    /// The learner answered a sub-task.
    pub fn attempted(
        &self,
        activity: &Activity,
        sub_task: &SubTask,
        tag: &OutcomeTag,
        response: &str,
        attempt: u32,
    ) -> InteractionEvent {
        let result = EventResult {
            success: Some(*tag == OutcomeTag::Correct),
            response: Some(response.to_string()),
            ..Default::default()
        };
        let mut extensions = Map::new();
        extensions.insert("identified_intention".to_string(), json!(tag.as_str()));
        extensions.insert("attempt".to_string(), json!(attempt));
        let context = EventContext {
            parent_activity_id: Some(activity.id.clone()),
            extensions: Some(extensions),
        };
        self.build(Verb::Attempted, self.sub_task_object(sub_task), Some(result), Some(context))
    }

    /// A sub-task was answered correctly.
    pub fn completed_sub_task(
        &self,
        activity: &Activity,
        sub_task: &SubTask,
        attempts: u32,
        help_used: usize,
    ) -> InteractionEvent {
        let mut extensions = Map::new();
        extensions.insert("attempts_taken".to_string(), json!(attempts));
        extensions.insert("help_levels_used".to_string(), json!(help_used));
        let result = EventResult {
            success: Some(true),
            completion: Some(true),
            extensions: Some(extensions),
            ..Default::default()
        };
        self.build(
            Verb::Completed,
            self.sub_task_object(sub_task),
            Some(result),
            Some(Self::child_of(&activity.id)),
        )
    }

    /// A help level was dispensed for a sub-task.
    pub fn dispensed_help(&self, sub_task: &SubTask, level: &HelpLevel) -> InteractionEvent {
        let object = EventObject {
            id: format!("{}/help/{}", sub_task.id, level.id),
            definition: ObjectDefinition {
                name: self.text(&format!("Help for {}: {}", sub_task.name, level.kind)),
                description: self.text(&level.content),
                object_type: self.config.help_object_type.clone(),
                interaction_type: None,
            },
        };
        self.build(Verb::Interacted, object, None, Some(Self::child_of(&sub_task.id)))
    }

    /// Every sub-task of the activity has been resolved.
    pub fn completed_activity(
        &self,
        activity: &Activity,
        succeeded: usize,
        exhausted: usize,
    ) -> InteractionEvent {
        let mut extensions = Map::new();
        extensions.insert("sub_tasks_succeeded".to_string(), json!(succeeded));
        extensions.insert("sub_tasks_exhausted".to_string(), json!(exhausted));
        let result = EventResult {
            success: Some(true),
            completion: Some(true),
            extensions: Some(extensions),
            ..Default::default()
        };
        self.build(Verb::Completed, self.activity_object(activity), Some(result), None)
    }
}
