//! `LocalSandbox`: the only shipped `SandboxBackend`.
//!
//! Performs a deterministic pseudo-execution keyed off patch content length,
//! mirroring the original `SandboxExecution`'s test-battery simulation:
//! syntax and performance always pass; unit/integration/security are
//! deterministic functions of `patch_content.len()` so the same patch always
//! produces the same verdict (no real code is ever executed, per the
//! sandbox contract's Non-goals).

use async_trait::async_trait;

use super::contract::{
    IsolationLevel, SandboxBackend, SandboxOutcome, SandboxRequest, TestResult, TestType,
};
use super::error::SandboxResult;

/// The only shipped sandbox backend: simulates execution without running
/// any code.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSandbox;

impl LocalSandbox {
    pub fn new() -> Self {
        Self
    }

    fn isolation_metrics(isolation: IsolationLevel) -> (u64, u64, u8, Vec<String>) {
        match isolation {
            IsolationLevel::Full => (1500, 45, 15, vec![]),
            IsolationLevel::Partial => (1200, 38, 12, vec!["logged_warning".to_string()]),
            IsolationLevel::None => (800, 25, 8, vec!["potential_system_impact".to_string()]),
        }
    }

    fn simulate_test(test_type: TestType, patch_len: usize) -> TestResult {
        let (passed, error_message) = match test_type {
            TestType::Syntax => (true, None),
            TestType::Unit => {
                let ok = patch_len % 3 != 0;
                (ok, (!ok).then(|| "unit test suite failed".to_string()))
            }
            TestType::Integration => {
                let ok = patch_len % 5 != 0;
                (
                    ok,
                    (!ok).then(|| "integration test suite failed".to_string()),
                )
            }
            TestType::Performance => (true, None),
            TestType::Security => {
                let ok = patch_len % 7 != 0;
                (ok, (!ok).then(|| "security scan flagged an issue".to_string()))
            }
        };
        TestResult {
            test_type,
            passed,
            execution_time_ms: 50,
            error_message,
        }
    }
}

#[async_trait]
impl SandboxBackend for LocalSandbox {
    async fn execute(&self, request: &SandboxRequest) -> SandboxResult<SandboxOutcome> {
        let (execution_time_ms, memory_mb, cpu_percent, side_effects) =
            Self::isolation_metrics(request.isolation);

        let patch_len = request.patch_content.len();
        let tests: Vec<TestResult> = TestType::BATTERY
            .iter()
            .map(|t| Self::simulate_test(*t, patch_len))
            .collect();

        let success = tests.iter().all(|t| t.passed);
        let error_message = tests
            .iter()
            .find(|t| !t.passed)
            .and_then(|t| t.error_message.clone());

        Ok(SandboxOutcome {
            success,
            isolation: request.isolation,
            execution_time_ms,
            memory_mb,
            cpu_percent,
            side_effects,
            tests,
            error_message,
        })
    }
}
