//! Diagnostics for the sandbox runtime. Nothing here is needed for
//! correct execution.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;

use crate::config::Preset;
use crate::error::ExecutionStatus;
use crate::sandbox::Sandbox;

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub supported: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfTestReport {
    pub passed: bool,
    pub results: BTreeMap<&'static str, bool>,
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct HealthChecker {
    _private: (),
}

static INSTANCE: OnceLock<HealthChecker> = OnceLock::new();

/// Shared [`HealthChecker`].
pub fn health_checker() -> &'static HealthChecker {
    HealthChecker::instance()
}

impl HealthChecker {
    pub fn instance() -> &'static HealthChecker {
        INSTANCE.get_or_init(|| HealthChecker { _private: () })
    }

    pub fn check_environment_support(&self) -> EnvironmentReport {
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        let before = Instant::now();
        std::thread::sleep(Duration::from_millis(1));
        if before.elapsed().is_zero() {
            issues.push("Monotonic clock does not advance; timeouts cannot fire".to_string());
        }

        match std::thread::available_parallelism() {
            Ok(n) if n.get() > 1 => recommendations.push(
                "Run long evaluations on a worker thread to keep the interface responsive"
                    .to_string(),
            ),
            Ok(_) => {}
            Err(e) => recommendations.push(format!("Could not query available parallelism: {e}")),
        }

        EnvironmentReport {
            supported: issues.is_empty(),
            issues,
            recommendations,
        }
    }

    /// Runs a small battery of executions: basic execution, global
    /// isolation and the timeout mechanism.
    pub fn test_basic_functionality(&self) -> SelfTestReport {
        let mut results = BTreeMap::new();
        let mut errors = Vec::new();

        let mut record = |name: &'static str, outcome: Result<(), String>| {
            if let Err(e) = &outcome {
                errors.push(format!("{name}: {e}"));
            }
            results.insert(name, outcome.is_ok());
        };

        record("basic_execution", {
            let result = Sandbox::new(Preset::Basic.config()).execute("return 1 + 1", None);
            match result.result {
                Some(value) if value == json!(2) => Ok(()),
                other => Err(format!("expected 2, got {other:?}")),
            }
        });

        record("global_isolation", {
            let code = "return [typeof window, typeof process, typeof eval].join(',')";
            let result = Sandbox::new(Preset::Basic.config()).execute(code, None);
            match result.result {
                Some(value) if value == json!("undefined,undefined,undefined") => Ok(()),
                other => Err(format!("host globals leaked: {other:?}")),
            }
        });

        record("timeout_mechanism", {
            let config = Preset::Basic.config().with_timeout(Duration::from_millis(50));
            let result = Sandbox::new(config).execute("while (true) {}", None);
            match result.status {
                ExecutionStatus::Timeout => Ok(()),
                other => Err(format!("expected a timeout, got {other:?}")),
            }
        });

        let passed = errors.is_empty();
        if !passed {
            log::warn!(target: "sandbox", "self test failed: {errors:?}");
        }
        SelfTestReport {
            passed,
            results,
            errors,
        }
    }
}
