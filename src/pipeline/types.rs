//! Shared types for the triage run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::channels::Message;
use crate::llm::Score;

// ── Triage decision ─────────────────────────────────────────────────

/// Outcome of scoring one message.
#[derive(Debug, Clone, Copy)]
pub struct TriageDecision<'a> {
    pub message: &'a Message,
    pub score: Option<Score>,
    pub forward: bool,
}

impl<'a> TriageDecision<'a> {
    /// Forward only when a valid score meets the threshold.
    pub fn decide(message: &'a Message, score: Option<Score>, threshold: f64) -> Self {
        Self {
            message,
            score,
            forward: score.is_some_and(|s| s.meets(threshold)),
        }
    }
}

// ── Run report ──────────────────────────────────────────────────────

/// Counters for a single triage run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Folder members with unread messages.
    pub candidate_dialogs: usize,
    /// Dialogs whose messages were all scored.
    pub dialogs_processed: usize,
    pub dialogs_marked_read: usize,
    pub messages_fetched: usize,
    /// Messages that got a valid score.
    pub messages_scored: usize,
    /// Messages with text for which no score was available.
    pub messages_unscored: usize,
    /// Messages without text.
    pub messages_skipped: usize,
    pub messages_forwarded: usize,
    pub fetch_failures: usize,
    pub forward_failures: usize,
    /// Batches dropped because the target channel was not found.
    pub forwards_skipped: usize,
    pub mark_read_failures: usize,
    pub cancelled: bool,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            candidate_dialogs: 0,
            dialogs_processed: 0,
            dialogs_marked_read: 0,
            messages_fetched: 0,
            messages_scored: 0,
            messages_unscored: 0,
            messages_skipped: 0,
            messages_forwarded: 0,
            fetch_failures: 0,
            forward_failures: 0,
            forwards_skipped: 0,
            mark_read_failures: 0,
            cancelled: false,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn had_failures(&self) -> bool {
        self.fetch_failures + self.forward_failures + self.mark_read_failures > 0
    }
}
