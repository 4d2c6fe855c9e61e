use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::migration::error::MigrationError;

/// Status of a family's last migration attempt
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationStatus {
    /// No attempt recorded yet
    #[default]
    NotStarted,
    /// An attempt started and has not reported back; the process likely died mid-run
    InProgress,
    /// The family reached its target version
    Succeeded,
    /// The last attempt failed; the next run retries from the stored version
    Failed,
}

/// Diagnostic record of one family's migration attempts, stored as JSON under
/// `migration:{family}`.
///
/// The stored schema version decides what runs. This record only explains what happened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Current status
    pub status: MigrationStatus,

    /// Number of attempts
    pub attempts: u32,

    /// Version found when the last attempt started
    pub from_version: Option<u32>,

    /// Version the last attempt aimed for
    pub target_version: Option<u32>,

    /// Version reached by the last attempt
    pub reached_version: Option<u32>,

    /// Timestamp of the first attempt
    pub started_at: Option<DateTime<Utc>>,

    /// Timestamp of the last attempt
    pub last_attempted_at: Option<DateTime<Utc>>,

    /// Timestamp of the last success
    pub completed_at: Option<DateTime<Utc>>,

    /// Last error code (if any)
    pub last_error_code: Option<String>,

    /// Last error message (if any)
    pub last_error_message: Option<String>,
}

impl MigrationRecord {
    /// An empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of an attempt.
    pub fn begin(&mut self, from_version: u32, target_version: u32) {
        let now = Utc::now();
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.status = MigrationStatus::InProgress;
        self.attempts += 1;
        self.from_version = Some(from_version);
        self.target_version = Some(target_version);
        self.last_attempted_at = Some(now);
    }

    /// Marks the attempt as successful at `reached_version`.
    pub fn succeed(&mut self, reached_version: u32) {
        self.status = MigrationStatus::Succeeded;
        self.reached_version = Some(reached_version);
        self.completed_at = Some(Utc::now());
        self.last_error_code = None;
        self.last_error_message = None;
    }

    /// Marks the attempt as failed.
    pub fn fail(&mut self, error: &MigrationError) {
        self.status = MigrationStatus::Failed;
        self.last_error_code = Some(error.code().to_string());
        self.last_error_message = Some(error.to_string());
    }
}
