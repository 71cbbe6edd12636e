//! Job lifecycle state machine, per-row outcome actions, and dedup
//! strategies.
//!
//! All three enums are closed: status strings stored in the database are
//! constrained by CHECK constraints that mirror the `ALL` lists here, and
//! every legal lifecycle move is enumerated in [`MigrationStatus::
//! can_transition`] so illegal transitions are rejected structurally
//! rather than by string comparisons scattered across handlers.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Migration Job Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a migration job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    Uploaded,
    Mapped,
    Validated,
    Running,
    Completed,
    Failed,
    Cancelled,
    RolledBack,
}

impl MigrationStatus {
    /// Return the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploaded => "uploaded",
            Self::Mapped => "mapped",
            Self::Validated => "validated",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Parse a status string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "uploaded" => Some(Self::Uploaded),
            "mapped" => Some(Self::Mapped),
            "validated" => Some(Self::Validated),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "rolled_back" => Some(Self::RolledBack),
            _ => None,
        }
    }

    /// All valid status values, in lifecycle order.
    pub const ALL: &'static [&'static str] = &[
        "pending",
        "uploaded",
        "mapped",
        "validated",
        "running",
        "completed",
        "failed",
        "cancelled",
        "rolled_back",
    ];

    /// The full transition table.
    ///
    /// Self-loops model re-runnable steps: a file can be re-uploaded, a
    /// mapping re-saved, a validation re-run. Backward moves model the
    /// inspect-and-fix loop: `validated -> mapped` when the mapping is
    /// edited (the prior validation no longer applies), and `mapped |
    /// validated -> uploaded` when a corrected source file replaces the
    /// old one.
    pub fn can_transition(self, next: MigrationStatus) -> bool {
        use MigrationStatus::*;
        matches!(
            (self, next),
            (Pending, Uploaded)
                | (Uploaded, Uploaded | Mapped)
                | (Mapped, Uploaded | Mapped | Validated)
                | (Validated, Uploaded | Mapped | Validated | Running)
                | (Running, Completed | Failed | Cancelled)
                | (Completed | Cancelled, RolledBack)
        )
    }

    /// Statuses from which no further transition exists.
    ///
    /// `completed` and `cancelled` are quasi-terminal: rollback is the
    /// only move left, so they are not listed here.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::RolledBack)
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record Action
// ---------------------------------------------------------------------------

/// Outcome recorded for a single source row during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    Created,
    Updated,
    Skipped,
    Failed,
}

impl RecordAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "skipped" => Some(Self::Skipped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// All valid action values.
    pub const ALL: &'static [&'static str] = &["created", "updated", "skipped", "failed"];
}

impl std::fmt::Display for RecordAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Dedup Strategy
// ---------------------------------------------------------------------------

/// Policy applied when a source row matches an existing target record by
/// unique-field values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Leave the existing record untouched.
    #[default]
    Skip,
    /// Overwrite the existing record's mapped fields.
    Update,
    /// Fill only fields that are currently empty on the existing record.
    Merge,
}

impl DedupStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Update => "update",
            Self::Merge => "merge",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "skip" => Some(Self::Skip),
            "update" => Some(Self::Update),
            "merge" => Some(Self::Merge),
            _ => None,
        }
    }

    /// All valid strategy values.
    pub const ALL: &'static [&'static str] = &["skip", "update", "merge"];
}

impl std::fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use MigrationStatus::*;

    // -- MigrationStatus ------------------------------------------------------

    #[test]
    fn status_round_trip() {
        for s in MigrationStatus::ALL {
            let status = MigrationStatus::from_str(s).unwrap();
            assert_eq!(status.as_str(), *s);
        }
    }

    #[test]
    fn status_unknown_returns_none() {
        assert!(MigrationStatus::from_str("paused").is_none());
        assert!(MigrationStatus::from_str("").is_none());
    }

    #[test]
    fn status_display_matches_as_str() {
        let s = RolledBack;
        assert_eq!(format!("{s}"), "rolled_back");
    }

    #[test]
    fn status_all_has_nine_entries() {
        assert_eq!(MigrationStatus::ALL.len(), 9);
    }

    #[test]
    fn happy_path_transitions_allowed() {
        assert!(Pending.can_transition(Uploaded));
        assert!(Uploaded.can_transition(Mapped));
        assert!(Mapped.can_transition(Validated));
        assert!(Validated.can_transition(Running));
        assert!(Running.can_transition(Completed));
        assert!(Completed.can_transition(RolledBack));
        assert!(Cancelled.can_transition(RolledBack));
    }

    #[test]
    fn rerun_self_loops_allowed() {
        assert!(Uploaded.can_transition(Uploaded));
        assert!(Mapped.can_transition(Mapped));
        assert!(Validated.can_transition(Validated));
    }

    #[test]
    fn mapping_edit_invalidates_validation() {
        assert!(Validated.can_transition(Mapped));
    }

    #[test]
    fn corrected_source_can_be_reuploaded() {
        assert!(Mapped.can_transition(Uploaded));
        assert!(Validated.can_transition(Uploaded));
        assert!(!Running.can_transition(Uploaded));
        assert!(!Completed.can_transition(Uploaded));
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for next in MigrationStatus::ALL {
            let next = MigrationStatus::from_str(next).unwrap();
            assert!(!Failed.can_transition(next), "failed -> {next}");
            assert!(!RolledBack.can_transition(next), "rolled_back -> {next}");
        }
    }

    #[test]
    fn cannot_skip_ahead() {
        assert!(!Pending.can_transition(Mapped));
        assert!(!Pending.can_transition(Running));
        assert!(!Uploaded.can_transition(Validated));
        assert!(!Mapped.can_transition(Running));
        assert!(!Completed.can_transition(Running));
    }

    #[test]
    fn cannot_move_backwards_from_running() {
        assert!(!Running.can_transition(Validated));
        assert!(!Running.can_transition(Mapped));
        assert!(!Running.can_transition(Running));
    }

    #[test]
    fn failed_is_not_rollbackable() {
        assert!(!Failed.can_transition(RolledBack));
    }

    #[test]
    fn terminal_flags() {
        assert!(Failed.is_terminal());
        assert!(RolledBack.is_terminal());
        assert!(!Completed.is_terminal());
        assert!(!Cancelled.is_terminal());
        assert!(!Running.is_terminal());
    }

    // -- RecordAction ---------------------------------------------------------

    #[test]
    fn action_round_trip() {
        for s in RecordAction::ALL {
            let action = RecordAction::from_str(s).unwrap();
            assert_eq!(action.as_str(), *s);
        }
    }

    #[test]
    fn action_unknown_returns_none() {
        assert!(RecordAction::from_str("merged").is_none());
    }

    #[test]
    fn action_all_has_four_entries() {
        assert_eq!(RecordAction::ALL.len(), 4);
    }

    // -- DedupStrategy --------------------------------------------------------

    #[test]
    fn strategy_round_trip() {
        for s in DedupStrategy::ALL {
            let strategy = DedupStrategy::from_str(s).unwrap();
            assert_eq!(strategy.as_str(), *s);
        }
    }

    #[test]
    fn strategy_defaults_to_skip() {
        assert_eq!(DedupStrategy::default(), DedupStrategy::Skip);
    }

    #[test]
    fn strategy_unknown_returns_none() {
        assert!(DedupStrategy::from_str("replace").is_none());
    }
}
