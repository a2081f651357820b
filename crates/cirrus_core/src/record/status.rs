//! Record lifecycle status.

use std::fmt;

/// Lifecycle status of a record.
///
/// ```text
/// New ──save──▶ Saving ──ok──▶ Saved ──set──▶ Modified ──save──▶ Saving
///                  │                                              │
///                  └──────── failure: back to New / Modified ◀────┘
/// Saved / Modified ──delete──▶ Deleted (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    /// Never saved; has no identifier.
    New,
    /// A save is in flight.
    Saving,
    /// Persisted with no local edits.
    Saved,
    /// Persisted with local edits not yet sent.
    Modified,
    /// Deleted on the server.
    Deleted,
}

impl RecordStatus {
    /// Returns true if the record exists on the server.
    pub fn is_persisted(&self) -> bool {
        matches!(self, RecordStatus::Saved | RecordStatus::Modified)
    }

    /// Returns true if the record can no longer be used.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Deleted)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordStatus::New => "new",
            RecordStatus::Saving => "saving",
            RecordStatus::Saved => "saved",
            RecordStatus::Modified => "modified",
            RecordStatus::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(RecordStatus::Saved.is_persisted());
        assert!(RecordStatus::Modified.is_persisted());
        assert!(!RecordStatus::New.is_persisted());
        assert!(!RecordStatus::Saving.is_persisted());
        assert!(RecordStatus::Deleted.is_terminal());
        assert_eq!(RecordStatus::Modified.to_string(), "modified");
    }
}
