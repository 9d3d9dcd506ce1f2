//! C1 — the diagnostic classifier ("re-banker"): turns raw tool output into
//! a [`DiagnosticPacket`].
//!
//! Mirrors the original `rebanker/classify.py`: lines are scanned in order,
//! blank lines are skipped, and the first detector (in taxonomy order) whose
//! regex matches a line wins — first-match-wins, not best-match.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::short_sha1_id;
use crate::packet::{DiagnosticEntry, DiagnosticPacket, PacketStatus};
use crate::taxonomy::{guess_file_from_text, CompiledDetector};

/// Tunables for a classification run, in the spirit of the teacher's
/// `DiagnosticsParserConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    /// Stop scanning after this many entries have been produced.
    pub max_entries: usize,
    /// Restrict matching to detectors whose `langs` includes this language,
    /// or match language-agnostic detectors (`langs` empty) regardless.
    pub lang: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_entries: 200,
            lang: None,
        }
    }
}

/// Classify raw multi-line tool output into a [`DiagnosticPacket`].
pub fn classify_blob(
    detectors: &[CompiledDetector],
    raw_output: &str,
    config: &ClassifierConfig,
) -> DiagnosticPacket {
    let mut entries = Vec::new();

    for line in raw_output.lines() {
        if entries.len() >= config.max_entries {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        if let Some(entry) = match_line(detectors, line, raw_output, config) {
            entries.push(entry);
        }
    }

    let status = if entries.is_empty() {
        PacketStatus::Clean
    } else {
        PacketStatus::Error
    };

    DiagnosticPacket::new(status, entries, raw_output.to_string(), config.lang.clone())
}

fn match_line(
    detectors: &[CompiledDetector],
    line: &str,
    full_text: &str,
    config: &ClassifierConfig,
) -> Option<DiagnosticEntry> {
    for detector in detectors {
        if !lang_applies(detector, config.lang.as_deref()) {
            continue;
        }
        for pattern in &detector.patterns {
            if let Some(caps) = pattern.captures(line) {
                let mut captures = BTreeMap::new();
                for name in &detector.capture_names {
                    if let Some(m) = caps.name(name) {
                        captures.insert(name.clone(), m.as_str().to_string());
                    }
                }

                let id_source = serde_json::json!({
                    "line": line,
                    "code": detector.code,
                    "captures": captures,
                });
                let id = short_sha1_id(&id_source, "e:");

                let cluster_id = cluster_id(&detector.code, &detector.cluster_key, &captures);
                let (file, line_no) = extract_location(&captures, full_text);

                return Some(
                    DiagnosticEntry {
                        id,
                        code: detector.code.clone(),
                        family: detector.family.clone(),
                        severity: detector.severity,
                        message: line.trim().to_string(),
                        file: file.clone(),
                        line: line_no,
                        column: None,
                        captures,
                        cluster_id,
                        hint: detector.hint.clone(),
                        confidence: detector.confidence,
                        difficulty: detector.difficulty,
                    }
                    .with_location(file, line_no),
                );
            }
        }
    }
    None
}

fn lang_applies(detector: &CompiledDetector, lang: Option<&str>) -> bool {
    if detector.langs.is_empty() {
        return true;
    }
    match lang {
        Some(l) => detector.langs.iter().any(|dl| dl == l),
        None => true,
    }
}

fn cluster_id(
    code: &str,
    cluster_key: &Option<String>,
    captures: &BTreeMap<String, String>,
) -> String {
    match cluster_key {
        Some(key) => match captures.get(key) {
            Some(value) => format!("{code}:{value}"),
            None => code.to_string(),
        },
        None => code.to_string(),
    }
}

fn extract_location(
    captures: &BTreeMap<String, String>,
    full_text: &str,
) -> (Option<String>, Option<u32>) {
    let file = captures
        .get("file")
        .cloned()
        .or_else(|| guess_file_from_text(full_text));
    let line_no = captures.get("line").and_then(|s| s.parse::<u32>().ok());
    (file, line_no)
}
