//! Channel triage pipeline.
//!
//! A run flows through:
//! 1. `folder`: pick the dialogs that belong to the configured chat folder
//! 2. `TriageService::get_is_post_interesting()`: cached LLM scoring
//! 3. `Forwarder`: forward what clears the threshold, then mark read

pub mod folder;
pub mod forwarder;
pub mod triage;
pub mod types;

pub use forwarder::{Forwarder, ForwarderConfig};
pub use triage::TriageService;
pub use types::{RunReport, TriageDecision};
