//! # agentic-ui-sandbox
//!
//! Runs small untrusted scripts (chart formulas, schema bindings, model
//! supplied snippets) in a JavaScript-like language without ever touching
//! the host. Isolation comes from an explicit allow-list: the interpreter
//! only knows the globals a [`SandboxConfig`] lets through, and every other
//! identifier reads as `undefined`.
//!
//! ## Pipeline
//!
//! ```text
//! source → lexer (logos) → parser → AST → interpreter → ExecutionResult
//! ```
//!
//! ## Guards
//!
//! - a deadline checked on every loop iteration and call ([`ErrorKind::Timeout`])
//! - call depth and syntactic nesting ([`ErrorKind::ResourceLimit`])
//! - a size cap on strings and arrays ([`ErrorKind::MemoryLimit`])
//! - prototype plumbing such as `constructor` ([`ErrorKind::SecurityViolation`])
//!
//! ## Example
//!
//! ```
//! use agentic_ui_sandbox::{quick_execute, safe_math_eval};
//!
//! assert_eq!(safe_math_eval("(1 + 2) * 3 - 4").unwrap(), 5.0);
//! let value = quick_execute("return [1, 2, 3].map(x => x * 2)", None, None).unwrap();
//! assert_eq!(value, serde_json::json!([2, 4, 6]));
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod health;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod sandbox;
pub mod value;

pub use config::{Preset, SandboxConfig};
pub use error::{ErrorKind, ExecutionStatus, SandboxError};
pub use health::{EnvironmentReport, HealthChecker, SelfTestReport, health_checker};
pub use sandbox::{CancelHandle, ExecutionResult, Sandbox, SandboxState};

use serde_json::{Map, Value as Json};

use crate::interpreter::math_prelude;
use crate::value::Value;

/// A sandbox configured from a preset name; unknown names give `basic`.
pub fn create_configured_sandbox(preset: &str) -> Sandbox {
    Sandbox::new(Preset::from_name(preset).config())
}

/// Runs `code` once under the basic preset.
pub fn run_in_sandbox(
    code: &str,
    globals: Option<&Map<String, Json>>,
    injected: Option<&Map<String, Json>>,
) -> ExecutionResult {
    let mut sandbox = Sandbox::new(SandboxConfig::default());
    if let Some(globals) = globals {
        for (name, value) in globals {
            sandbox.set_global(name.clone(), value.clone());
        }
    }
    sandbox.execute(code, injected)
}

/// [`run_in_sandbox`] with failures as `Err`. An `undefined` result is
/// `null`.
pub fn quick_execute(
    code: &str,
    globals: Option<&Map<String, Json>>,
    injected: Option<&Map<String, Json>>,
) -> Result<Json, SandboxError> {
    let result = run_in_sandbox(code, globals, injected);
    if result.success {
        return Ok(result.result.unwrap_or(Json::Null));
    }
    Err(match result.error {
        Some(error) if !error.message.is_empty() => error,
        Some(error) => SandboxError::new(error.kind, "Code execution failed"),
        None => SandboxError::runtime("Code execution failed"),
    })
}

fn is_safe_math_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_ascii_whitespace()
        || matches!(c, '+' | '-' | '*' | '/' | '%' | '(' | ')' | '.' | ',' | '_')
}

/// Evaluates an arithmetic expression. Math functions and constants are
/// available with or without the `Math.` prefix.
///
/// Input outside digits, letters, whitespace and `+ - * / % ( ) . , _` is
/// rejected before anything runs, and a result that is not a finite number
/// is an error.
pub fn safe_math_eval(expression: &str) -> Result<f64, SandboxError> {
    if expression.trim().is_empty() || !expression.chars().all(is_safe_math_char) {
        return Err(SandboxError::new(
            ErrorKind::UnsafeInput,
            "Expression contains unsafe characters",
        ));
    }
    let mut sandbox = create_configured_sandbox(Preset::Restricted.as_str());
    let outcome = sandbox.run_program(&format!("return ({expression})"), math_prelude(), Vec::new());
    match outcome.value {
        Ok(Value::Number(n)) if n.is_finite() => Ok(n),
        Ok(_) => Err(SandboxError::runtime("Result is not a valid number")),
        Err((_, error)) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("1 + 1", 2.0)]
    #[case("(1 + 2) * 3 - 4", 5.0)]
    #[case("Math.sqrt(16)", 4.0)]
    #[case("sqrt(16) + abs(-1)", 5.0)]
    #[case("ceil(1.2) + floor(1.8) + round(1.5)", 5.0)]
    #[case("max(1, 7, 3)", 7.0)]
    #[case("10 % 4", 2.0)]
    fn math_expressions(#[case] expr: &str, #[case] expected: f64) {
        assert_eq!(safe_math_eval(expr).unwrap(), expected);
    }

    #[test]
    fn math_constants() {
        assert_eq!(safe_math_eval("Math.PI").unwrap(), std::f64::consts::PI);
        assert_eq!(safe_math_eval("E").unwrap(), std::f64::consts::E);
    }

    #[rstest]
    #[case("1 + 1; eval(\"bad\")")]
    #[case("a = 1")]
    #[case("x => x")]
    #[case("")]
    fn unsafe_input_is_rejected_before_running(#[case] expr: &str) {
        let err = safe_math_eval(expr).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsafeInput);
        assert_eq!(err.message, "Expression contains unsafe characters");
    }

    #[test]
    fn invalid_expression_is_a_syntax_error() {
        let err = safe_math_eval("invalid expression").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[rstest]
    #[case("1 / 0")]
    #[case("sqrt(-1)")]
    #[case("undefinedName")]
    fn non_finite_results_are_rejected(#[case] expr: &str) {
        let err = safe_math_eval(expr).unwrap_err();
        assert_eq!(err.message, "Result is not a valid number");
    }

    #[test]
    fn quick_execute_returns_json() {
        assert_eq!(quick_execute("return 1 + 1", None, None).unwrap(), json!(2));
        assert_eq!(quick_execute("let x = 1", None, None).unwrap(), Json::Null);
    }

    #[test]
    fn quick_execute_with_globals_and_params() {
        let mut globals = Map::new();
        globals.insert("customVar".into(), json!("custom"));
        let mut injected = Map::new();
        injected.insert("param".into(), json!("injected"));
        let value = quick_execute("return customVar + ' ' + param", Some(&globals), Some(&injected));
        assert_eq!(value.unwrap(), json!("custom injected"));
    }

    #[test]
    fn quick_execute_surfaces_thrown_message() {
        let err = quick_execute("throw new Error('test error')", None, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RuntimeError);
        assert_eq!(err.message, "test error");
    }

    #[test]
    fn quick_execute_falls_back_to_generic_message() {
        let err = quick_execute("throw new Error()", None, None).unwrap_err();
        assert_eq!(err.message, "Code execution failed");
    }

    #[test]
    fn configured_sandbox_uses_preset() {
        let sandbox = create_configured_sandbox("restricted");
        assert_eq!(sandbox.config().timeout.as_millis(), 1000);
        let fallback = create_configured_sandbox("nope");
        assert_eq!(fallback.config(), &Preset::Basic.config());
    }
}
