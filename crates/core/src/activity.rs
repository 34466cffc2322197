//! Activity Definitions
//!
//! An activity is the top-level instructional unit a session walks through.
//! It is decomposed into ordered sub-tasks, each with its own response rules,
//! attempt limit, and graduated help ladder.
//!
//! Authored content arrives as loosely-shaped JSON. The `Authored*` records
//! mirror that shape with every field optional; they are validated exactly
//! once into the immutable records below, filling gaps with generic copy so
//! a defect in authoring never aborts a learner's turn.

use crate::evaluator::OutcomeTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Attempt limit used when a sub-task does not author one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_ACTIVITY_NAME: &str = "our new topic";
const DEFAULT_SUB_TASK_PROMPT: &str = "Let's work on this part.";
const DEFAULT_RULE_FEEDBACK: &str = "Let's look at that a different way.";
const DEFAULT_HELP_CONTENT: &str = "Take another look at the question and think about what it is asking.";

const ACTIVITY_TYPE_LESSON: &str = "http://adlnet.gov/expapi/activities/lesson";
const ACTIVITY_TYPE_INTERACTION: &str = "http://adlnet.gov/expapi/activities/interaction";
const ACTIVITY_TYPE_OBJECTIVE: &str = "http://adlnet.gov/expapi/activities/objective";

/// Broad category of an activity, used to phrase the opening goal statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    MathProblemSet,
    ReadingComprehension,
    Other(String),
}

impl ActivityKind {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("math_problem_set") => ActivityKind::MathProblemSet,
            Some("reading_comprehension") => ActivityKind::ReadingComprehension,
            Some(other) => ActivityKind::Other(other.to_string()),
            None => ActivityKind::Other(String::new()),
        }
    }
}

/// The learning objective an activity is built around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Objective {
    pub id: String,
    pub name: String,
    pub description: String,
    pub object_type: String,
}

/// A validated, immutable activity definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    /// Catalog key the activity is looked up by.
    pub key: String,
    /// Stable IRI identifying the activity in interaction events.
    pub id: String,
    /// Learner-facing name, e.g. "Reading: The Lost Kite".
    pub name: String,
    /// Name used in event object definitions.
    pub title: String,
    pub description: String,
    pub object_type: String,
    pub subject: Option<String>,
    pub kind: ActivityKind,
    /// One-sentence summary read out after the goal statement.
    pub details: Option<String>,
    pub objective: Option<Objective>,
    pub sub_tasks: Vec<SubTask>,
}

impl Activity {
    /// Names of every sub-task, in order.
    pub fn sub_task_names(&self) -> Vec<String> {
        self.sub_tasks.iter().map(|st| st.name.clone()).collect()
    }
}

/// A single prompt within an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTask {
    pub id: String,
    pub name: String,
    /// The question or instruction shown to the learner.
    pub prompt: String,
    pub title: String,
    pub description: String,
    pub object_type: String,
    /// xAPI interaction type (`choice`, `fill-in`, `numeric`, ...).
    pub interaction_type: Option<String>,
    /// Authored rules, evaluated in declaration order.
    pub rules: Vec<ResponseRule>,
    pub correct_keywords: Vec<String>,
    /// Always at least 1.
    pub max_attempts: u32,
    pub help_levels: Vec<HelpLevel>,
}

/// An authored classification rule for a sub-task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseRule {
    pub keywords: Vec<String>,
    pub tag: OutcomeTag,
    pub feedback: String,
    pub follow_up: Option<String>,
}

/// The form a help level takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpKind {
    Hint,
    Explanation,
    Example,
    DemonstrationStep,
}

impl HelpKind {
    /// Parses an authored kind; `None` for anything unrecognized.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "hint" => Some(HelpKind::Hint),
            "explanation" => Some(HelpKind::Explanation),
            "example" => Some(HelpKind::Example),
            "demonstration_step" => Some(HelpKind::DemonstrationStep),
            _ => None,
        }
    }

    /// A missing kind is a hint. An unrecognized one is too, with a warning.
    fn from_authored(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return HelpKind::Hint;
        };
        HelpKind::parse(raw).unwrap_or_else(|| {
            warn!(kind = %raw, "Unknown help kind; treating as a hint");
            HelpKind::Hint
        })
    }
}

impl fmt::Display for HelpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelpKind::Hint => write!(f, "hint"),
            HelpKind::Explanation => write!(f, "explanation"),
            HelpKind::Example => write!(f, "example"),
            HelpKind::DemonstrationStep => write!(f, "demonstration step"),
        }
    }
}

/// One rung of a sub-task's help ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpLevel {
    /// Zero-based position in the ladder.
    pub position: usize,
    pub id: String,
    pub kind: HelpKind,
    pub content: String,
}

// --- Authored (unvalidated) records ---

/// An activity exactly as authored in a catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthoredActivity {
    pub key: String,
    pub object_id: Option<String>,
    pub name: Option<String>,
    pub object_name: Option<String>,
    pub object_description: Option<String>,
    pub object_type: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub details: Option<String>,
    pub objective: Option<AuthoredObjective>,
    pub sub_tasks: Vec<AuthoredSubTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthoredObjective {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub object_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthoredSubTask {
    pub object_id: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "description")]
    pub prompt: Option<String>,
    pub object_name: Option<String>,
    pub object_description: Option<String>,
    pub object_type: Option<String>,
    pub interaction_type: Option<String>,
    #[serde(alias = "response_evaluations")]
    pub rules: Vec<AuthoredRule>,
    pub correct_answer_keywords: Vec<String>,
    pub max_attempts: Option<u32>,
    pub help_levels: Vec<AuthoredHelpLevel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthoredRule {
    pub keywords: Vec<String>,
    #[serde(alias = "status")]
    pub tag: Option<String>,
    pub feedback: Option<String>,
    #[serde(alias = "next_action_prompt")]
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthoredHelpLevel {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub content: Option<String>,
}

/// Returns the trimmed value if it is non-blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Lowercases and trims keywords, dropping blanks.
fn clean_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl AuthoredActivity {
    /// Validates the authored payload into an immutable `Activity`.
    ///
    /// The caller is responsible for rejecting an empty `key`; every other
    /// gap is filled with default copy.
    pub fn validate(self) -> Activity {
        let key = self.key.trim().to_string();
        let id = present(self.object_id).unwrap_or_else(|| format!("urn:aita:activity:{}", key));
        let name = present(self.name).unwrap_or_else(|| {
            warn!(activity = %key, "Activity has no name; using default copy");
            DEFAULT_ACTIVITY_NAME.to_string()
        });
        let details = present(self.details);
        let title = present(self.object_name).unwrap_or_else(|| name.clone());
        let description = present(self.object_description)
            .or_else(|| details.clone())
            .unwrap_or_default();

        let objective = self.objective.map(|o| Objective {
            id: present(o.id).unwrap_or_else(|| format!("{}/objective", id)),
            name: present(o.name).unwrap_or_else(|| "Activity Objective".to_string()),
            description: present(o.description).unwrap_or_else(|| "Objective".to_string()),
            object_type: present(o.object_type)
                .unwrap_or_else(|| ACTIVITY_TYPE_OBJECTIVE.to_string()),
        });

        let sub_tasks = self
            .sub_tasks
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.validate(&id, index))
            .collect();

        Activity {
            key,
            id,
            name,
            title,
            description,
            object_type: present(self.object_type)
                .unwrap_or_else(|| ACTIVITY_TYPE_LESSON.to_string()),
            subject: present(self.subject),
            kind: ActivityKind::parse(self.kind.as_deref()),
            details,
            objective,
            sub_tasks,
        }
    }
}

impl AuthoredSubTask {
    fn validate(self, activity_id: &str, index: usize) -> SubTask {
        let id = present(self.object_id)
            .unwrap_or_else(|| format!("{}/subtask/{}", activity_id, index + 1));
        let name = present(self.name).unwrap_or_else(|| format!("part {}", index + 1));
        let prompt = present(self.prompt).unwrap_or_else(|| {
            warn!(sub_task = %id, "Sub-task has no prompt; using default copy");
            DEFAULT_SUB_TASK_PROMPT.to_string()
        });
        let max_attempts = match self.max_attempts {
            Some(0) => {
                warn!(sub_task = %id, "max_attempts of 0 raised to 1");
                1
            }
            Some(n) => n,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let rules = self
            .rules
            .into_iter()
            .map(|r| ResponseRule {
                keywords: clean_keywords(r.keywords),
                tag: r
                    .tag
                    .as_deref()
                    .map(OutcomeTag::parse)
                    .unwrap_or(OutcomeTag::IncorrectGeneric),
                feedback: present(r.feedback).unwrap_or_else(|| DEFAULT_RULE_FEEDBACK.to_string()),
                follow_up: present(r.follow_up),
            })
            .collect();

        let help_levels = self
            .help_levels
            .into_iter()
            .enumerate()
            .map(|(position, h)| HelpLevel {
                position,
                id: present(h.id).unwrap_or_else(|| format!("level{}", position)),
                kind: HelpKind::from_authored(h.kind.as_deref()),
                content: present(h.content).unwrap_or_else(|| DEFAULT_HELP_CONTENT.to_string()),
            })
            .collect();

        SubTask {
            title: present(self.object_name).unwrap_or_else(|| name.clone()),
            description: present(self.object_description).unwrap_or_else(|| prompt.clone()),
            object_type: present(self.object_type)
                .unwrap_or_else(|| ACTIVITY_TYPE_INTERACTION.to_string()),
            interaction_type: present(self.interaction_type),
            correct_keywords: clean_keywords(self.correct_answer_keywords),
            id,
            name,
            prompt,
            rules,
            max_attempts,
            help_levels,
        }
    }
}
