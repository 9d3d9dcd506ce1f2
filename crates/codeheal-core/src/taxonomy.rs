//! Error taxonomy: the detector tables the classifier (C1) matches raw tool
//! output against.
//!
//! Structure follows the original re-banker's taxonomy contract: a taxonomy
//! is `families[].categories[].detectors[]`. A category carries the fields
//! that get attached to every diagnostic it produces (`code`, `severity`,
//! `difficulty`, `hint`, `confidence`, an optional `cluster_key`); a detector
//! carries the regexes that recognize it, restricted to a set of languages.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HealError, Result};
use crate::packet::Severity;

/// One regex-driven detector within a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSpec {
    /// Regex patterns; a line matches the detector if any pattern matches.
    pub regex: Vec<String>,
    /// Languages this detector applies to (e.g. "py", "rs", "ts"); empty
    /// means "any language".
    #[serde(default)]
    pub langs: Vec<String>,
    /// Named capture groups to extract from a successful match.
    #[serde(default)]
    pub capture: Vec<String>,
}

/// A category groups one or more detectors under a shared diagnostic code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    pub code: String,
    pub severity: Severity,
    /// How hard a fix for this category is to get right, in `[0, 1]` —
    /// feeds the confidence scorer's complexity penalty. `None` when a
    /// taxonomy declares no opinion, in which case the caller's own
    /// historical complexity estimate (if any) is used instead.
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Which captured field (if any) clusters diagnostics of this category
    /// together (e.g. the offending symbol name).
    #[serde(default)]
    pub cluster_key: Option<String>,
    pub detectors: Vec<DetectorSpec>,
}

fn default_confidence() -> f64 {
    0.5
}

/// A family groups related categories (e.g. "python_syntax", "js_runtime").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilySpec {
    pub name: String,
    pub categories: Vec<CategorySpec>,
}

/// The full taxonomy: every family the classifier knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    pub families: Vec<FamilySpec>,
}

impl Taxonomy {
    /// Load a taxonomy from a YAML document.
    pub fn from_yaml(src: &str) -> Result<Self> {
        serde_yaml::from_str(src).map_err(|e| HealError::TaxonomyLoad(e.to_string()))
    }

    /// The embedded default taxonomy, covering the syntax/resolution/logic
    /// families and the Python/JS runtime codes named in the spec.
    pub fn embedded_default() -> Self {
        embedded_default_taxonomy()
    }
}

/// A compiled detector, ready for line matching: `CategorySpec` fields
/// flattened in, with its regexes pre-compiled.
#[derive(Debug, Clone)]
pub struct CompiledDetector {
    pub family: String,
    pub code: String,
    pub severity: Severity,
    pub difficulty: Option<f64>,
    pub hint: Option<String>,
    pub confidence: f64,
    pub cluster_key: Option<String>,
    pub langs: Vec<String>,
    pub capture_names: Vec<String>,
    pub patterns: Vec<Regex>,
}

/// Compile every detector in `taxonomy` into a flat, ordered list.
///
/// Detectors are tried in taxonomy-file order; the classifier is
/// first-match-wins, so earlier families/categories take precedence.
pub fn compile_detectors(taxonomy: &Taxonomy) -> Result<Vec<CompiledDetector>> {
    let mut compiled = Vec::new();
    for family in &taxonomy.families {
        for category in &family.categories {
            for detector in &category.detectors {
                let mut patterns = Vec::with_capacity(detector.regex.len());
                for pattern in &detector.regex {
                    patterns.push(Regex::new(pattern)?);
                }
                compiled.push(CompiledDetector {
                    family: family.name.clone(),
                    code: category.code.clone(),
                    severity: category.severity,
                    difficulty: category.difficulty.clone(),
                    hint: category.hint.clone(),
                    confidence: category.confidence,
                    cluster_key: category.cluster_key.clone(),
                    langs: detector.langs.clone(),
                    capture_names: detector.capture.clone(),
                    patterns,
                });
            }
        }
    }
    Ok(compiled)
}

fn detector(regex: &str, langs: &[&str], capture: &[&str]) -> DetectorSpec {
    DetectorSpec {
        regex: vec![regex.to_string()],
        langs: langs.iter().map(|s| s.to_string()).collect(),
        capture: capture.iter().map(|s| s.to_string()).collect(),
    }
}

fn category(
    code: &str,
    severity: Severity,
    confidence: f64,
    difficulty: f64,
    hint: &str,
    cluster_key: Option<&str>,
    detectors: Vec<DetectorSpec>,
) -> CategorySpec {
    CategorySpec {
        code: code.to_string(),
        severity,
        difficulty: Some(difficulty),
        hint: Some(hint.to_string()),
        confidence,
        cluster_key: cluster_key.map(|s| s.to_string()),
        detectors,
    }
}

/// The taxonomy compiled into the binary so classification works with zero
/// configuration. Families: syntax, resolution, logic/runtime, covering the
/// `SYN.*` / `RES.*` / `LOG.*` and `PY_*` / `JS_*` codes.
fn embedded_default_taxonomy() -> Taxonomy {
    let syntax = FamilySpec {
        name: "syntax".to_string(),
        categories: vec![
            category(
                "SYN001",
                Severity::Error,
                0.97,
                0.1,
                "unexpected token in source",
                Some("symbol"),
                vec![
                    detector(
                        r"SyntaxError:\s*(?P<message>.+)",
                        &["py"],
                        &["message"],
                    ),
                    detector(
                        r"error\[E\d+\]:\s*expected .*?found (?P<symbol>\S+)",
                        &["rs"],
                        &["symbol"],
                    ),
                ],
            ),
            category(
                "SYN002",
                Severity::Error,
                0.95,
                0.15,
                "unterminated string or bracket",
                None,
                vec![detector(
                    r"(?i)unterminated (string|bracket|paren)",
                    &["py", "js", "ts"],
                    &[],
                )],
            ),
        ],
    };

    let resolution = FamilySpec {
        name: "resolution".to_string(),
        categories: vec![
            category(
                "RES001",
                Severity::Error,
                0.9,
                0.3,
                "unresolved import or module",
                Some("module"),
                vec![
                    detector(
                        r"ModuleNotFoundError: No module named '(?P<module>[\w.]+)'",
                        &["py"],
                        &["module"],
                    ),
                    detector(
                        r"error\[E0433\]:.*unresolved (import|module) `(?P<module>[\w:]+)`",
                        &["rs"],
                        &["module"],
                    ),
                ],
            ),
            category(
                "RES002",
                Severity::Error,
                0.85,
                0.35,
                "name not found in scope",
                Some("symbol"),
                vec![detector(
                    r"NameError: name '(?P<symbol>\w+)' is not defined",
                    &["py"],
                    &["symbol"],
                )],
            ),
        ],
    };

    let logic = FamilySpec {
        name: "logic".to_string(),
        categories: vec![
            category(
                "LOG001",
                Severity::Error,
                0.6,
                0.6,
                "assertion failed",
                Some("symbol"),
                vec![detector(
                    r"AssertionError(?::\s*(?P<symbol>.+))?",
                    &["py"],
                    &["symbol"],
                )],
            ),
            category(
                "LOG002",
                Severity::Error,
                0.55,
                0.65,
                "unhandled exception at runtime",
                None,
                vec![
                    detector(r"Traceback \(most recent call last\)", &["py"], &[]),
                    detector(r"(?P<message>\w+Error): (?P<detail>.+)", &["py"], &["message", "detail"]),
                ],
            ),
            category(
                "PY_RUNTIME",
                Severity::Error,
                0.55,
                0.6,
                "python runtime error",
                None,
                vec![detector(r#"(?i)^\s*File "(?P<file>[^"]+)", line (?P<line>\d+)"#, &["py"], &["file", "line"])],
            ),
            category(
                "JS_RUNTIME",
                Severity::Error,
                0.55,
                0.6,
                "javascript/node runtime error",
                None,
                vec![detector(
                    r"(?:Uncaught |)(?P<message>\w*Error): (?P<detail>.+)",
                    &["js", "ts"],
                    &["message", "detail"],
                )],
            ),
        ],
    };

    Taxonomy {
        families: vec![syntax, resolution, logic],
    }
}

/// Locates a plausible source file mentioned in free text, mirroring the
/// original `_guess_file_from_text` heuristic.
pub fn guess_file_from_text(text: &str) -> Option<String> {
    let re = Regex::new(r"([\w./\\-]+\.(?:py|ts|js|php|json|sql|rs))").ok()?;
    re.captures(text).map(|c| c[1].to_string())
}

/// Bucket a severity for coarse confidence weighting downstream (unused by
/// the classifier directly, exposed for the confidence scorer's component
/// lookups).
pub fn severity_bucket(severity: Severity) -> &'static str {
    match severity {
        Severity::Hint => "hint",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

/// Per-family defaults, used when a taxonomy omits a field (mirrors the
/// original's inherit-from-family-defaults behavior). Kept as a lookup
/// rather than mutating `CategorySpec` so the taxonomy file stays the
/// single source of truth.
pub fn family_default_langs(families: &[FamilySpec]) -> HashMap<String, Vec<String>> {
    families
        .iter()
        .map(|f| {
            let langs: Vec<String> = f
                .categories
                .iter()
                .flat_map(|c| c.detectors.iter().flat_map(|d| d.langs.clone()))
                .collect();
            (f.name.clone(), langs)
        })
        .collect()
}
