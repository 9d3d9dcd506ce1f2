//! The sandbox contract (C7): request/outcome types and the pluggable
//! `SandboxBackend` trait. Real code execution is out of scope (see
//! spec Non-goals); `LocalSandbox` is the only shipped backend and performs
//! a deterministic pseudo-execution, but a real backend can be dropped in
//! behind this trait without touching the orchestrator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::SandboxResult;

/// How strongly a patch is isolated from the host environment while it
/// runs. Ordered from most to least isolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    Full,
    Partial,
    None,
}

/// Caps a sandbox run is expected to respect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResourceLimits {
    pub max_execution_time_ms: u64,
    pub max_memory_mb: u64,
    pub max_cpu_percent: u8,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_execution_time_ms: 30_000,
            max_memory_mb: 500,
            max_cpu_percent: 80,
        }
    }
}

/// A single test in the sandbox's fixed five-test battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Syntax,
    Unit,
    Integration,
    Performance,
    Security,
}

impl TestType {
    /// The fixed battery every sandbox run executes, in order.
    pub const BATTERY: [TestType; 5] = [
        TestType::Syntax,
        TestType::Unit,
        TestType::Integration,
        TestType::Performance,
        TestType::Security,
    ];
}

/// The result of one test in the battery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub test_type: TestType,
    pub passed: bool,
    pub execution_time_ms: u64,
    pub error_message: Option<String>,
}

/// A request to run a patch through the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SandboxRequest {
    pub patch_content: String,
    pub isolation: IsolationLevel,
    pub resource_limits: ResourceLimits,
}

/// The outcome of a sandbox run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SandboxOutcome {
    pub success: bool,
    pub isolation: IsolationLevel,
    pub execution_time_ms: u64,
    pub memory_mb: u64,
    pub cpu_percent: u8,
    pub side_effects: Vec<String>,
    pub tests: Vec<TestResult>,
    /// Top-level summary of why the run failed, distinct from any single
    /// test's own `error_message` — `None` when `success` is `true`.
    pub error_message: Option<String>,
}

impl SandboxOutcome {
    pub fn failed_tests(&self) -> Vec<&TestResult> {
        self.tests.iter().filter(|t| !t.passed).collect()
    }
}

/// A pluggable sandbox execution backend.
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    async fn execute(&self, request: &SandboxRequest) -> SandboxResult<SandboxOutcome>;
}
