//! C2 — the immutable diagnostic packet the classifier (C1) produces and
//! every downstream component (delta, confidence, cascade) consumes.
//!
//! A packet's `packet_hash` is computed over every other field via canonical
//! JSON + SHA-256; `DiagnosticPacket::verify_hash` lets C11's retry loop
//! detect tampering of a packet carried forward between attempts (the
//! "ground truth" the fatal `HealError::GroundTruthTampered` guards).

use serde::{Deserialize, Serialize};

use crate::canonical::sha256_hex;

/// Diagnostic severity, ordered so `Error > Warning > Hint`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hint,
    Warning,
    Error,
}

/// A single structured diagnostic extracted from raw tool output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticEntry {
    /// `e:` + short sha1 of `{line, code, captures}`, the original
    /// re-banker's error id.
    pub id: String,
    pub code: String,
    pub family: String,
    pub severity: Severity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Named regex captures from the detector that matched.
    pub captures: std::collections::BTreeMap<String, String>,
    /// `"{code}:{captures[cluster_key]}"` when the category declares a
    /// cluster key, else just `code`.
    pub cluster_id: String,
    pub hint: Option<String>,
    pub confidence: f64,
    /// Taxonomy-declared fix difficulty in `[0, 1]`, feeding the confidence
    /// scorer's complexity penalty. `None` when the taxonomy declares no
    /// opinion for this category.
    pub difficulty: Option<f64>,
}

impl DiagnosticEntry {
    pub fn with_location(mut self, file: Option<String>, line: Option<u32>) -> Self {
        self.file = file;
        self.line = line;
        self
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Whether a packet represents a clean run or captured at least one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketStatus {
    Clean,
    Error,
}

/// The immutable diagnostic packet.
///
/// Construct via [`DiagnosticPacket::new`], which computes and fills in
/// `packet_hash`. Any subsequent field mutation invalidates the hash —
/// there is deliberately no setter; callers that need to change content
/// must build a new packet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticPacket {
    pub status: PacketStatus,
    pub entries: Vec<DiagnosticEntry>,
    pub raw_excerpt: String,
    pub source_lang: Option<String>,
    pub packet_hash: String,
}

impl DiagnosticPacket {
    /// Build a new packet and compute its hash over the supplied content.
    pub fn new(
        status: PacketStatus,
        entries: Vec<DiagnosticEntry>,
        raw_excerpt: String,
        source_lang: Option<String>,
    ) -> Self {
        let mut packet = Self {
            status,
            entries,
            raw_excerpt,
            source_lang,
            packet_hash: String::new(),
        };
        packet.packet_hash = packet.compute_hash();
        packet
    }

    /// Recompute the hash a packet with this content *should* have.
    pub fn compute_hash(&self) -> String {
        let value = serde_json::json!({
            "status": self.status,
            "entries": self.entries,
            "raw_excerpt": self.raw_excerpt,
            "source_lang": self.source_lang,
        });
        sha256_hex(&value)
    }

    /// `true` if `packet_hash` matches the content — the hash-invariant
    /// check the retry loop runs on every packet it carries forward.
    pub fn verify_hash(&self) -> bool {
        self.packet_hash == self.compute_hash()
    }

    /// Highest severity among this packet's entries, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.entries.iter().map(|e| e.severity).max()
    }

    pub fn is_clean(&self) -> bool {
        matches!(self.status, PacketStatus::Clean)
    }
}
