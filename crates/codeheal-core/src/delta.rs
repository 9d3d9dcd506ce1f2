//! C3 — the error delta: classifies how the *current* diagnostic packet
//! relates to the packet from the previous attempt.

use serde::{Deserialize, Serialize};

use crate::packet::DiagnosticPacket;

/// How the current packet relates to the prior attempt's packet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorDelta {
    /// No prior attempt to compare against.
    First,
    /// The prior attempt had an error and this one is clean.
    Resolved,
    /// Same cluster id as the prior attempt's leading error.
    SameError { moved: bool },
    /// The error present now is a different cluster than before.
    Mutated,
}

/// Compute the delta between the previous attempt's packet (if any) and the
/// current one, comparing on the leading (first) diagnostic entry's cluster
/// id, as the retry loop only ever targets one error at a time.
pub fn compute_delta(
    previous: Option<&DiagnosticPacket>,
    current: &DiagnosticPacket,
) -> ErrorDelta {
    let previous = match previous {
        None => return ErrorDelta::First,
        Some(p) => p,
    };

    if previous.is_clean() {
        return ErrorDelta::First;
    }

    if current.is_clean() {
        return ErrorDelta::Resolved;
    }

    let prev_entry = &previous.entries[0];
    let curr_entry = &current.entries[0];

    if prev_entry.cluster_id == curr_entry.cluster_id {
        let moved = prev_entry.file != curr_entry.file || prev_entry.line != curr_entry.line;
        ErrorDelta::SameError { moved }
    } else {
        ErrorDelta::Mutated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{DiagnosticEntry, PacketStatus, Severity};
    use std::collections::BTreeMap;

    fn entry(cluster_id: &str, file: Option<&str>, line: Option<u32>) -> DiagnosticEntry {
        DiagnosticEntry {
            id: format!("e:{cluster_id}"),
            code: "SYN001".to_string(),
            family: "syntax".to_string(),
            severity: Severity::Error,
            message: "msg".to_string(),
            file: file.map(|s| s.to_string()),
            line,
            column: None,
            captures: BTreeMap::new(),
            cluster_id: cluster_id.to_string(),
            hint: None,
            confidence: 0.9,
            difficulty: None,
        }
    }

    fn packet_with(entries: Vec<DiagnosticEntry>) -> DiagnosticPacket {
        let status = if entries.is_empty() {
            PacketStatus::Clean
        } else {
            PacketStatus::Error
        };
        DiagnosticPacket::new(status, entries, "raw".to_string(), None)
    }

    #[test]
    fn test_first_attempt_has_no_previous() {
        let current = packet_with(vec![entry("SYN001:x", Some("a.py"), Some(1))]);
        assert_eq!(compute_delta(None, &current), ErrorDelta::First);
    }

    #[test]
    fn test_resolved_when_current_is_clean() {
        let previous = packet_with(vec![entry("SYN001:x", Some("a.py"), Some(1))]);
        let current = packet_with(vec![]);
        assert_eq!(compute_delta(Some(&previous), &current), ErrorDelta::Resolved);
    }

    #[test]
    fn test_same_error_without_movement() {
        let previous = packet_with(vec![entry("SYN001:x", Some("a.py"), Some(1))]);
        let current = packet_with(vec![entry("SYN001:x", Some("a.py"), Some(1))]);
        assert_eq!(
            compute_delta(Some(&previous), &current),
            ErrorDelta::SameError { moved: false }
        );
    }

    #[test]
    fn test_same_error_moved_to_new_location() {
        let previous = packet_with(vec![entry("SYN001:x", Some("a.py"), Some(1))]);
        let current = packet_with(vec![entry("SYN001:x", Some("a.py"), Some(5))]);
        assert_eq!(
            compute_delta(Some(&previous), &current),
            ErrorDelta::SameError { moved: true }
        );
    }

    #[test]
    fn test_mutated_when_cluster_changes() {
        let previous = packet_with(vec![entry("SYN001:x", Some("a.py"), Some(1))]);
        let current = packet_with(vec![entry("RES001:y", Some("a.py"), Some(1))]);
        assert_eq!(compute_delta(Some(&previous), &current), ErrorDelta::Mutated);
    }
}
