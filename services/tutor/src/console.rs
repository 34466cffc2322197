//! Drives a single session from a line-oriented reader.
//!
//! Each turn is: call into the session, drain it, print the tutor messages,
//! and hand the events to the sink. A sink failure is logged and the
//! conversation carries on.

use crate::event_log::EventSink;
use aita_core::{Outputs, Session};
use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::{error, info};

/// What happened over a whole conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSummary {
    pub turns: usize,
    pub events_logged: usize,
    pub events_dropped: usize,
    pub complete: bool,
}

fn deliver<W: Write>(
    outputs: Outputs,
    out: &mut W,
    sink: &mut dyn EventSink,
    summary: &mut ConversationSummary,
) -> Result<()> {
    for message in &outputs.messages {
        writeln!(out, "AI: {}", message)?;
    }
    out.flush()?;

    match sink.append(&outputs.events) {
        Ok(written) => summary.events_logged += written,
        Err(e) => {
            error!(error = %e, dropped = outputs.events.len(), "Failed to log interaction events");
            summary.events_dropped += outputs.events.len();
        }
    }
    summary.complete = outputs.complete;
    Ok(())
}

/// Starts `activity_key` for `learner_id` and feeds it lines from `input`
/// until the activity completes or the input ends.
pub fn run_conversation<R: BufRead, W: Write>(
    session: &mut Session,
    learner_id: &str,
    activity_key: &str,
    input: R,
    out: &mut W,
    sink: &mut dyn EventSink,
) -> Result<ConversationSummary> {
    let mut summary = ConversationSummary::default();

    session.start_activity(learner_id, activity_key);
    deliver(session.drain_outputs(), out, sink, &mut summary)?;

    let mut lines = input.lines();
    while !summary.complete {
        write!(out, "You: ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            info!("Input closed before the activity completed");
            break;
        };
        let line = line?;
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }

        session.process_input(utterance);
        summary.turns += 1;
        deliver(session.drain_outputs(), out, sink, &mut summary)?;
    }

    info!(
        turns = summary.turns,
        events = summary.events_logged,
        complete = summary.complete,
        "Conversation finished"
    );
    Ok(summary)
}
