//! Tutoring Session Engine
//!
//! A `Session` walks one learner through one activity, a sub-task at a time.
//! It is driven entirely by its caller: `start_activity` once, then
//! `process_input` for every learner utterance, with `drain_outputs` after
//! each call to collect what the tutor said and the interaction events that
//! were recorded.
//!
//! Every operation runs to completion synchronously. A session is private,
//! unsynchronized state; the host serializes calls for a given session and
//! may run any number of distinct sessions side by side.
//!
//! Sub-task lifecycle:
//!
//! ```text
//! NotStarted -> ActivityIntroduced -> SubTaskActive -> SubTaskSucceeded | SubTaskExhausted
//!                                          ^                   |
//!                                          +---- next ---------+--> ActivityComplete
//! ```

use crate::activity::{Activity, ActivityKind, SubTask};
use crate::catalog::Catalog;
use crate::evaluator::{self, OutcomeTag};
use crate::event::{EnvelopeConfig, EventRecorder, InteractionEvent};
use crate::help::{self, HelpStep};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const NOTHING_ACTIVE: &str = "There's no active activity or sub-task to respond to.";
const ALREADY_COMPLETE: &str = "This activity is already complete. Please start a new activity.";
const ALREADY_STARTED: &str = "This session already has an activity. Please start a new session.";
const NO_SUB_TASKS: &str = "Looks like this activity has no sub-tasks defined yet!";
const HELP_EXHAUSTED: &str = "I've given all the help I have for this part. Let's try your best!";
const RETRY_PROMPT: &str = "Please try answering the question again, or type 'help'.";

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    ActivityIntroduced,
    SubTaskActive,
    SubTaskSucceeded,
    SubTaskExhausted,
    /// Terminal.
    ActivityComplete,
}

/// How a sub-task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Succeeded,
    Exhausted,
}

/// Per-sub-task counters. Both reset when a sub-task is introduced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubTaskCounters {
    pub attempts: u32,
    pub help_dispensed: usize,
}

/// Everything produced since the previous drain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outputs {
    pub messages: Vec<String>,
    pub events: Vec<InteractionEvent>,
    pub complete: bool,
}

/// Mutable state for one learner working through one activity.
pub struct Session {
    catalog: Arc<dyn Catalog>,
    envelope: Arc<EnvelopeConfig>,
    recorder: Option<EventRecorder>,
    activity: Option<Arc<Activity>>,
    phase: Phase,
    index: usize,
    counters: SubTaskCounters,
    resolutions: Vec<Resolution>,
    complete: bool,
    messages: Vec<String>,
    events: Vec<InteractionEvent>,
}

impl Session {
    /// Creates a session in the `NotStarted` phase.
    pub fn new(catalog: Arc<dyn Catalog>, envelope: Arc<EnvelopeConfig>) -> Self {
        Self {
            catalog,
            envelope,
            recorder: None,
            activity: None,
            phase: Phase::NotStarted,
            index: 0,
            counters: SubTaskCounters::default(),
            resolutions: Vec::new(),
            complete: false,
            messages: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Index of the current sub-task. Equals the sub-task count once every
    /// sub-task has been resolved.
    pub fn sub_task_index(&self) -> usize {
        self.index
    }

    pub fn counters(&self) -> SubTaskCounters {
        self.counters
    }

    pub fn activity(&self) -> Option<&Arc<Activity>> {
        self.activity.as_ref()
    }

    pub fn current_sub_task(&self) -> Option<&SubTask> {
        self.activity.as_ref()?.sub_tasks.get(self.index)
    }

    /// Resolutions of the sub-tasks finished so far, in order.
    pub fn resolutions(&self) -> &[Resolution] {
        &self.resolutions
    }

    fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn record(&mut self, build: impl FnOnce(&EventRecorder) -> InteractionEvent) {
        if let Some(recorder) = &self.recorder {
            let event = build(recorder);
            self.events.push(event);
        }
    }

    fn finish(&mut self) {
        self.complete = true;
        self.phase = Phase::ActivityComplete;
    }

    /// Looks up the activity and introduces it along with its first sub-task.
    ///
    /// A catalog miss or an activity without sub-tasks completes the session
    /// immediately. A session runs a single activity; calling this again
    /// only produces a notice.
    pub fn start_activity(&mut self, learner_id: &str, activity_key: &str) {
        if self.phase != Phase::NotStarted {
            warn!(activity = %activity_key, "start_activity called on a session that already started");
            self.say(ALREADY_STARTED);
            return;
        }

        self.index = 0;
        self.counters = SubTaskCounters::default();
        self.resolutions.clear();
        self.recorder = Some(EventRecorder::new(self.envelope.clone(), learner_id));

        let Some(activity) = self.catalog.lookup(learner_id, activity_key) else {
            info!(learner = %learner_id, activity = %activity_key, "Activity not found in catalog");
            self.say(format!(
                "Sorry, I couldn't find an activity with key: {}",
                activity_key
            ));
            self.finish();
            return;
        };

        info!(
            learner = %learner_id,
            activity = %activity_key,
            sub_tasks = activity.sub_tasks.len(),
            "Starting activity"
        );
        self.activity = Some(activity.clone());
        self.phase = Phase::ActivityIntroduced;

        self.say(goal_statement(&activity));
        if let Some(objective) = &activity.objective {
            self.record(|r| r.experienced_objective(&activity, objective));
        }
        if let Some(details) = &activity.details {
            self.say(details_line(details));
        }

        if activity.sub_tasks.is_empty() {
            warn!(activity = %activity_key, "Activity has no sub-tasks; completing immediately");
            self.say(NO_SUB_TASKS);
            self.finish();
            return;
        }

        self.say(format!(
            "To achieve our goal of {}, we're going to work through these parts together:",
            activity.name.to_lowercase()
        ));
        for (i, name) in activity.sub_task_names().iter().enumerate() {
            self.say(format!("  {}. {}", i + 1, name));
        }
        self.record(|r| r.experienced_activity(&activity));

        self.say("Let's get started!");
        self.introduce_sub_task(&activity, 0);
    }

    /// Presents sub-task `index` and resets its counters.
    fn introduce_sub_task(&mut self, activity: &Activity, index: usize) {
        let sub_task = &activity.sub_tasks[index];
        self.index = index;
        self.counters = SubTaskCounters::default();
        self.phase = Phase::SubTaskActive;

        self.say(format!("--- Starting Part {}: {} ---", index + 1, sub_task.name));
        self.say(sub_task.prompt.clone());
        self.record(|r| r.experienced_sub_task(activity, sub_task));
        debug!(sub_task = %sub_task.id, index, "Sub-task introduced");
    }

    /// Handles one learner utterance for the current sub-task.
    pub fn process_input(&mut self, utterance: &str) {
        if self.complete {
            self.say(ALREADY_COMPLETE);
            return;
        }

        let Some(activity) = self.activity.clone() else {
            self.say(NOTHING_ACTIVE);
            self.finish();
            return;
        };
        let Some(sub_task) = activity.sub_tasks.get(self.index) else {
            self.say(NOTHING_ACTIVE);
            self.finish();
            return;
        };

        self.counters.attempts += 1;
        let attempt = self.counters.attempts;
        let outcome = evaluator::evaluate(utterance, sub_task);
        debug!(
            sub_task = %sub_task.id,
            attempt,
            outcome = %outcome.tag,
            "Evaluated learner response"
        );

        self.say(outcome.feedback.clone());
        self.record(|r| r.attempted(&activity, sub_task, &outcome.tag, utterance, attempt));

        let resolution = if outcome.tag == OutcomeTag::Correct {
            let help_used = self.counters.help_dispensed;
            self.record(|r| r.completed_sub_task(&activity, sub_task, attempt, help_used));
            self.say(format!("Great job on completing: {}!", sub_task.name));
            Some(Resolution::Succeeded)
        } else {
            if outcome.tag.wants_help() {
                self.dispense_help(sub_task);
            } else if let Some(follow_up) = &outcome.follow_up {
                self.say(follow_up.clone());
            }

            if attempt >= sub_task.max_attempts {
                self.say(format!(
                    "It looks like we're still stuck on {}. That's okay!",
                    sub_task.name
                ));
                Some(Resolution::Exhausted)
            } else {
                self.say(RETRY_PROMPT);
                None
            }
        };

        if let Some(resolution) = resolution {
            self.resolve(&activity, resolution);
        }
    }

    /// Dispenses the next help level, or apologizes once the ladder is used up.
    fn dispense_help(&mut self, sub_task: &SubTask) {
        match help::next(sub_task, self.counters.help_dispensed) {
            HelpStep::Level(level) => {
                self.say(format!("Hint ({}): {}", level.kind, level.content));
                self.record(|r| r.dispensed_help(sub_task, level));
                self.counters.help_dispensed += 1;
            }
            HelpStep::Exhausted => {
                debug!(sub_task = %sub_task.id, "Help ladder exhausted");
                self.say(HELP_EXHAUSTED);
            }
        }
    }

    /// Closes the current sub-task and moves to the next one or finishes.
    fn resolve(&mut self, activity: &Activity, resolution: Resolution) {
        self.phase = match resolution {
            Resolution::Succeeded => Phase::SubTaskSucceeded,
            Resolution::Exhausted => Phase::SubTaskExhausted,
        };
        self.resolutions.push(resolution);
        info!(
            activity = %activity.key,
            index = self.index,
            ?resolution,
            attempts = self.counters.attempts,
            "Sub-task resolved"
        );

        let next = self.index + 1;
        if next < activity.sub_tasks.len() {
            self.introduce_sub_task(activity, next);
            return;
        }

        self.index = activity.sub_tasks.len();
        self.say(format!(
            "We've completed all parts of {}! Well done!",
            activity.name
        ));
        let succeeded = self
            .resolutions
            .iter()
            .filter(|r| **r == Resolution::Succeeded)
            .count();
        let exhausted = self.resolutions.len() - succeeded;
        self.record(|r| r.completed_activity(activity, succeeded, exhausted));
        self.finish();
        info!(activity = %activity.key, succeeded, exhausted, "Activity complete");
    }

    /// Takes everything produced since the last drain, leaving the buffers empty.
    pub fn drain_outputs(&mut self) -> Outputs {
        Outputs {
            messages: std::mem::take(&mut self.messages),
            events: std::mem::take(&mut self.events),
            complete: self.complete,
        }
    }
}

/// The opening line for an activity, phrased by kind and subject.
fn goal_statement(activity: &Activity) -> String {
    let name = activity.name.to_lowercase();
    match (&activity.kind, activity.subject.as_deref()) {
        (ActivityKind::MathProblemSet, _) => {
            format!("Alright! Our goal for this session is to get comfortable with {}.", name)
        }
        (_, Some("Literature")) => {
            format!("Great! In this part, we'll focus on understanding {}.", name)
        }
        (ActivityKind::ReadingComprehension, _) | (_, Some("Reading")) => {
            format!("Okay! We're going to be working on {}.", name)
        }
        _ => format!("Today, we're going to learn about {}!", name),
    }
}

fn details_line(details: &str) -> String {
    format!("Specifically, we'll be {}", details.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::AuthoredActivity;
    use crate::catalog::MockCatalog;
    use mockall::predicate::eq;

    fn single_task_activity() -> Arc<Activity> {
        let raw: AuthoredActivity = serde_json::from_value(serde_json::json!({
            "key": "capitals",
            "name": "Capitals",
            "objective": { "name": "Know capitals" },
            "sub_tasks": [{
                "name": "France",
                "prompt": "What is the capital of France?",
                "correct_answer_keywords": ["paris"],
                "max_attempts": 2,
                "help_levels": [{ "type": "hint", "content": "It has the Eiffel Tower." }]
            }]
        }))
        .unwrap();
        Arc::new(raw.validate())
    }

    fn session_with(activity: Option<Arc<Activity>>) -> Session {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_lookup()
            .with(eq("student1"), eq("capitals"))
            .times(1)
            .return_const(activity);
        Session::new(Arc::new(catalog), Arc::new(EnvelopeConfig::default()))
    }

    #[test]
    fn test_start_looks_up_learner_and_key_once() {
        let mut session = session_with(Some(single_task_activity()));
        session.start_activity("student1", "capitals");

        assert_eq!(session.phase(), Phase::SubTaskActive);
        assert_eq!(session.sub_task_index(), 0);
        let out = session.drain_outputs();
        assert!(!out.complete);
        assert_eq!(out.messages[0], "Today, we're going to learn about capitals!");
        assert!(out.messages.contains(&"What is the capital of France?".to_string()));
        let verbs: Vec<_> = out.events.iter().map(|e| e.verb_name().to_string()).collect();
        assert_eq!(verbs, vec!["experienced", "experienced", "experienced"]);
    }

    #[test]
    fn test_second_start_is_a_notice_only() {
        let mut session = session_with(Some(single_task_activity()));
        session.start_activity("student1", "capitals");
        session.drain_outputs();

        session.start_activity("student1", "capitals");
        let out = session.drain_outputs();
        assert_eq!(out.messages, vec![ALREADY_STARTED.to_string()]);
        assert!(out.events.is_empty());
        assert_eq!(session.phase(), Phase::SubTaskActive);
    }

    #[test]
    fn test_catalog_miss_completes_with_single_apology() {
        let mut session = session_with(None);
        session.start_activity("student1", "capitals");

        let out = session.drain_outputs();
        assert!(out.complete);
        assert_eq!(
            out.messages,
            vec!["Sorry, I couldn't find an activity with key: capitals".to_string()]
        );
        assert!(out.events.is_empty());
        assert_eq!(session.phase(), Phase::ActivityComplete);
    }

    #[test]
    fn test_input_before_start_forces_completion() {
        let catalog = MockCatalog::new();
        let mut session = Session::new(Arc::new(catalog), Arc::new(EnvelopeConfig::default()));
        session.process_input("paris");

        let out = session.drain_outputs();
        assert!(out.complete);
        assert_eq!(out.messages, vec![NOTHING_ACTIVE.to_string()]);
        assert!(out.events.is_empty());
    }

    #[test]
    fn test_help_exhausted_apology_does_not_advance_counter() {
        let mut session = session_with(Some(single_task_activity()));
        session.start_activity("student1", "capitals");
        session.drain_outputs();

        session.process_input("help");
        assert_eq!(session.counters().help_dispensed, 1);
        let out = session.drain_outputs();
        assert!(out.messages.contains(&"Hint (hint): It has the Eiffel Tower.".to_string()));
        assert!(out.events.iter().any(|e| e.verb_name() == "interacted"));

        session.process_input("help");
        let out = session.drain_outputs();
        assert!(out.messages.contains(&HELP_EXHAUSTED.to_string()));
        assert!(out.events.iter().all(|e| e.verb_name() != "interacted"));
        assert!(out.complete);
    }

    #[test]
    fn test_goal_statement_by_kind_and_subject() {
        let mut activity = (*single_task_activity()).clone();
        activity.kind = ActivityKind::MathProblemSet;
        assert!(goal_statement(&activity).starts_with("Alright!"));

        activity.kind = ActivityKind::Other(String::new());
        activity.subject = Some("Literature".into());
        assert!(goal_statement(&activity).starts_with("Great!"));

        activity.subject = Some("Reading".into());
        assert!(goal_statement(&activity).starts_with("Okay!"));
    }

    #[test]
    fn test_details_line_follows_goal_statement() {
        let mut activity = (*single_task_activity()).clone();
        activity.details = Some("Naming the Capital of France.".into());
        let mut session = session_with(Some(Arc::new(activity)));
        session.start_activity("student1", "capitals");

        let out = session.drain_outputs();
        assert_eq!(
            out.messages[1],
            "Specifically, we'll be naming the capital of france."
        );
    }
}
