//! Channel Triage: scores unread channel posts with an LLM and forwards the
//! interesting ones to a single digest channel.

pub mod cache;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
