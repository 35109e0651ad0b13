//! Canonical push events.
//!
//! The backend's socket payloads use several historical field spellings and
//! event names. The transport layer normalizes all of them into this enum;
//! nothing past the boundary ever sees a raw payload.

use serde::{Deserialize, Serialize};

use super::Section;

/// A normalized server-push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PushEvent {
    /// A job for `section` started server-side.
    TaskStarted { section: Section },
    /// Progress report for a running job. When `error` is set the job
    /// failed and `percent` must be ignored.
    Progress {
        section: Section,
        percent: u8,
        error: Option<String>,
    },
    /// Address-correction counters (the `cep` sub-channel). Carries record
    /// counts, not a percentage.
    AddressFix { total: u64, updated: u64 },
    /// A job for `section` finished and its artifact is ready.
    TaskEnded { section: Section },
}

impl PushEvent {
    /// The section this event targets, if it is section-scoped.
    pub fn section(&self) -> Option<Section> {
        match self {
            Self::TaskStarted { section }
            | Self::Progress { section, .. }
            | Self::TaskEnded { section } => Some(*section),
            Self::AddressFix { .. } => None,
        }
    }
}
