//! Channel forwarder: selects folder channels with unread posts, scores each
//! post, forwards the interesting ones to a target channel and marks the
//! source read.
//!
//! Work is strictly sequential. Per dialog the order is score → forward →
//! mark read, and the dialog is marked read whether or not forwarding worked.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::channels::{Dialog, MessagingTransport, channels, with_unread};
use crate::error::PipelineError;
use crate::pipeline::folder;
use crate::pipeline::triage::TriageService;
use crate::pipeline::types::{RunReport, TriageDecision};

/// Run parameters.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Chat folder to scan. `None` means no folder, so nothing is scanned.
    pub folder_name: Option<String>,
    /// Exact title of the channel interesting posts are forwarded to.
    pub target_channel: Option<String>,
    /// Minimum score to forward, in `[0, 1]`.
    pub threshold: f64,
    /// Pause after each processed dialog.
    pub pause: Duration,
}

enum Flow {
    Continue,
    Cancelled,
}

pub struct Forwarder {
    transport: Arc<dyn MessagingTransport>,
    triage: Arc<TriageService>,
    config: ForwarderConfig,
}

impl Forwarder {
    pub fn new(
        transport: Arc<dyn MessagingTransport>,
        triage: Arc<TriageService>,
        config: ForwarderConfig,
    ) -> Self {
        Self {
            transport,
            triage,
            config,
        }
    }

    /// Process every folder channel with unread messages once.
    ///
    /// Only a failure to list dialogs aborts the run. Everything else is
    /// logged, counted in the report, and the run moves on. Setting
    /// `shutdown` stops the run before the next dialog or message; a dialog
    /// interrupted mid-way is neither forwarded nor marked read.
    pub async fn run(&self, shutdown: &AtomicBool) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::start();

        let dialogs = self.transport.list_dialogs().await?;
        let candidates = self.candidates(&dialogs).await;
        report.candidate_dialogs = candidates.len();

        let target = self.resolve_target(&dialogs);
        info!(
            candidates = candidates.len(),
            target = target.map(|t| t.name.as_str()).unwrap_or("<none>"),
            "Starting triage run"
        );

        for (i, dialog) in candidates.iter().enumerate() {
            if shutdown.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }

            if target.is_some_and(|t| *t == *dialog) {
                debug!(dialog = %dialog.name, "Skipping target channel");
                continue;
            }

            if let Flow::Cancelled = self.process_dialog(dialog, target, shutdown, &mut report).await {
                report.cancelled = true;
                break;
            }

            if i + 1 < candidates.len() && !self.config.pause.is_zero() {
                tokio::time::sleep(self.config.pause).await;
            }
        }

        if report.cancelled {
            info!("Triage run cancelled");
        }
        Ok(report.finish())
    }

    /// Broadcast channels in the configured folder that have unread messages.
    /// Supergroups are left alone even when the folder lists them.
    async fn candidates(&self, dialogs: &[Dialog]) -> Vec<Dialog> {
        let Some(name) = self.config.folder_name.as_deref() else {
            warn!("No chat folder configured, nothing to scan");
            return Vec::new();
        };

        let folders = match self.transport.list_folders().await {
            Ok(folders) => folders,
            Err(e) => {
                error!("Failed to list chat folders: {e}");
                return Vec::new();
            }
        };

        let Some(folder) = folder::find_folder(&folders, name) else {
            warn!(folder = name, "Chat folder not found");
            return Vec::new();
        };

        let members = folder::members(folder, dialogs);
        debug!(folder = name, members = members.len(), "Resolved folder members");
        with_unread(channels(&members))
    }

    fn resolve_target<'a>(&self, dialogs: &'a [Dialog]) -> Option<&'a Dialog> {
        let name = self.config.target_channel.as_deref()?;
        let found = dialogs.iter().find(|d| d.is_channel() && d.name == name);
        if found.is_none() {
            error!(target = name, "Target channel not found");
        }
        found
    }

    async fn process_dialog(
        &self,
        dialog: &Dialog,
        target: Option<&Dialog>,
        shutdown: &AtomicBool,
        report: &mut RunReport,
    ) -> Flow {
        let messages = match self.transport.get_unread_messages(dialog).await {
            Ok(messages) => messages,
            Err(e) => {
                error!(dialog = %dialog.name, "Failed to fetch unread messages: {e}");
                report.fetch_failures += 1;
                return Flow::Continue;
            }
        };
        report.messages_fetched += messages.len();

        let mut interesting = Vec::new();
        for message in &messages {
            if shutdown.load(Ordering::Relaxed) {
                return Flow::Cancelled;
            }

            let Some(text) = message.text() else {
                report.messages_skipped += 1;
                continue;
            };

            let score = self.triage.get_is_post_interesting(text).await;
            let decision = TriageDecision::decide(message, score, self.config.threshold);
            match decision.score {
                Some(score) => {
                    report.messages_scored += 1;
                    debug!(
                        dialog = %dialog.name,
                        message_id = message.id,
                        %score,
                        forward = decision.forward,
                        "Scored message"
                    );
                }
                None => {
                    report.messages_unscored += 1;
                    warn!(dialog = %dialog.name, message_id = message.id, "No score for message");
                }
            }

            if decision.forward {
                interesting.push(decision.message.id);
            }
        }

        if !interesting.is_empty() {
            self.forward(dialog, target, &interesting, report).await;
        }

        match self.transport.mark_read(dialog).await {
            Ok(()) => report.dialogs_marked_read += 1,
            Err(e) => {
                error!(dialog = %dialog.name, "Failed to mark dialog read: {e}");
                report.mark_read_failures += 1;
            }
        }

        report.dialogs_processed += 1;
        Flow::Continue
    }

    async fn forward(
        &self,
        dialog: &Dialog,
        target: Option<&Dialog>,
        message_ids: &[i64],
        report: &mut RunReport,
    ) {
        let Some(target) = target else {
            error!(
                dialog = %dialog.name,
                count = message_ids.len(),
                "No target channel, interesting messages not forwarded"
            );
            report.forwards_skipped += 1;
            return;
        };

        match self.transport.forward_messages(dialog, target, message_ids).await {
            Ok(()) => {
                info!(
                    from = %dialog.name,
                    to = %target.name,
                    count = message_ids.len(),
                    "Forwarded interesting messages"
                );
                report.messages_forwarded += message_ids.len();
            }
            Err(e) => {
                error!(dialog = %dialog.name, "Failed to forward messages: {e}");
                report.forward_failures += 1;
            }
        }
    }
}
