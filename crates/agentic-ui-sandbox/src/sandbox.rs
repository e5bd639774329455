use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::config::SandboxConfig;
use crate::error::{ErrorKind, ExecutionStatus, SandboxError};
use crate::interpreter::{Interpreter, Interrupt};
use crate::parser::parse_program;
use crate::value::Value;

/// One execution. Nothing is kept between runs.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SandboxError>,
    pub execution_time: Duration,
    pub status: ExecutionStatus,
    /// Lines written through `console`.
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Idle,
    Executing,
}

/// Stops the running execution at its next loop iteration or call.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Raw outcome before the result crosses back into JSON.
pub(crate) struct Outcome {
    pub value: Result<Value, (ExecutionStatus, SandboxError)>,
    pub logs: Vec<String>,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct Sandbox {
    config: SandboxConfig,
    globals: Map<String, Json>,
    state: SandboxState,
    cancel: Arc<AtomicBool>,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            globals: Map::new(),
            state: SandboxState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn state(&self) -> SandboxState {
        self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancel.clone())
    }

    /// Adds a host global visible to every later execution. Forbidden
    /// names are refused and `false` is returned.
    pub fn set_global(&mut self, name: impl Into<String>, value: Json) -> bool {
        let name = name.into();
        if self.config.is_forbidden(&name) {
            log::warn!(target: "sandbox", "refusing forbidden global {name:?}");
            return false;
        }
        self.globals.insert(name, value);
        true
    }

    /// Runs `code` as a function body. `injected` entries become its
    /// parameters.
    pub fn execute(&mut self, code: &str, injected: Option<&Map<String, Json>>) -> ExecutionResult {
        let params = injected
            .map(|map| {
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect()
            })
            .unwrap_or_default();
        let outcome = self.run_program(code, Vec::new(), params);
        match outcome.value {
            Ok(value) => ExecutionResult {
                success: true,
                result: value.to_json(),
                error: None,
                execution_time: outcome.elapsed,
                status: ExecutionStatus::Success,
                logs: outcome.logs,
            },
            Err((status, error)) => ExecutionResult {
                success: false,
                result: None,
                error: Some(error),
                execution_time: outcome.elapsed,
                status,
                logs: outcome.logs,
            },
        }
    }

    pub(crate) fn run_program(
        &mut self,
        code: &str,
        extra_globals: Vec<(String, Value)>,
        params: Vec<(String, Value)>,
    ) -> Outcome {
        self.state = SandboxState::Executing;
        self.cancel.store(false, Ordering::Relaxed);
        let start = Instant::now();

        let (value, logs) = match parse_program(code, self.config.max_call_stack_depth) {
            Err(error) => (Err((ExecutionStatus::Failed, error)), Vec::new()),
            Ok(program) => {
                let mut interp = Interpreter::new(&self.config, start + self.config.timeout)
                    .with_cancel(self.cancel.clone());
                for (name, json) in &self.globals {
                    interp.define_global(name, Value::from_json(json));
                }
                for (name, value) in extra_globals {
                    interp.define_global(&name, value);
                }
                let value = interp.run(&program, params).map_err(|interrupt| {
                    let status = match &interrupt {
                        Interrupt::Cancelled => ExecutionStatus::Cancelled,
                        Interrupt::Abort(e) if e.kind == ErrorKind::Timeout => {
                            ExecutionStatus::Timeout
                        }
                        _ => ExecutionStatus::Failed,
                    };
                    (status, interrupt.into_error())
                });
                (value, interp.take_console())
            }
        };

        let elapsed = start.elapsed();
        match &value {
            Ok(_) => log::debug!(target: "sandbox", "execution succeeded in {elapsed:?}"),
            Err((status, error)) => log::debug!(
                target: "sandbox",
                "execution ended {status:?} in {elapsed:?}: {} {}",
                error.kind,
                error.message
            ),
        }
        self.state = SandboxState::Idle;
        Outcome {
            value,
            logs,
            elapsed,
        }
    }
}
