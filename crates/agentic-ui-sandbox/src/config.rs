use std::fmt;
use std::time::Duration;

/// Globals the basic preset exposes.
pub const DEFAULT_ALLOWED_GLOBALS: &[&str] = &[
    "console",
    "Math",
    "JSON",
    "Date",
    "Array",
    "Object",
    "String",
    "Number",
    "Boolean",
    "Error",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
];

/// Never resolvable, whatever the allow list says.
pub const DEFAULT_FORBIDDEN_GLOBALS: &[&str] = &[
    "eval",
    "Function",
    "window",
    "document",
    "globalThis",
    "global",
    "self",
    "top",
    "parent",
    "frames",
    "location",
    "navigator",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "XMLHttpRequest",
    "fetch",
    "WebSocket",
    "Worker",
    "importScripts",
    "process",
    "require",
    "module",
    "exports",
];

const DOM_GLOBALS: &[&str] = &["window", "document", "navigator", "location"];

pub const DEFAULT_MAX_CALL_STACK_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub allowed_globals: Vec<String>,
    pub forbidden_globals: Vec<String>,
    pub allow_console: bool,
    /// Gates `Date`.
    pub allow_timers: bool,
    pub timeout: Duration,
    /// Assigning to an undeclared name fails instead of creating a global.
    pub strict_mode: bool,
    pub allow_dom: bool,
    /// Upper bound in bytes for strings and arrays built by the code. Only
    /// those allocations are counted.
    pub max_memory_usage: usize,
    /// Limits both call depth and syntactic nesting.
    pub max_call_stack_depth: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Preset::Basic.config()
    }
}

impl SandboxConfig {
    /// Deny always wins; `console` and `Date` also need their switches.
    pub fn is_allowed(&self, name: &str) -> bool {
        if self.forbidden_globals.iter().any(|g| g == name) {
            return false;
        }
        if DOM_GLOBALS.contains(&name) && !self.allow_dom {
            return false;
        }
        match name {
            "console" if !self.allow_console => false,
            "Date" if !self.allow_timers => false,
            _ => self.allowed_globals.iter().any(|g| g == name),
        }
    }

    pub fn is_forbidden(&self, name: &str) -> bool {
        self.forbidden_globals.iter().any(|g| g == name)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_call_stack_depth(mut self, depth: usize) -> Self {
        self.max_call_stack_depth = depth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Basic,
    Secure,
    Restricted,
}

impl Preset {
    /// Unknown names fall back to [`Preset::Basic`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "basic" => Preset::Basic,
            "secure" => Preset::Secure,
            "restricted" => Preset::Restricted,
            other => {
                log::warn!("unknown sandbox preset {other:?}, using basic");
                Preset::Basic
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Basic => "basic",
            Preset::Secure => "secure",
            Preset::Restricted => "restricted",
        }
    }

    pub fn config(self) -> SandboxConfig {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        let basic = SandboxConfig {
            allowed_globals: owned(DEFAULT_ALLOWED_GLOBALS),
            forbidden_globals: owned(DEFAULT_FORBIDDEN_GLOBALS),
            allow_console: true,
            allow_timers: true,
            timeout: Duration::from_millis(3000),
            strict_mode: false,
            allow_dom: false,
            max_memory_usage: 50 * 1024 * 1024,
            max_call_stack_depth: DEFAULT_MAX_CALL_STACK_DEPTH,
        };
        match self {
            Preset::Basic => basic,
            Preset::Secure => SandboxConfig {
                allow_console: false,
                allow_timers: false,
                timeout: Duration::from_millis(2000),
                strict_mode: true,
                ..basic
            },
            Preset::Restricted => SandboxConfig {
                allowed_globals: owned(&["Math", "JSON", "String", "Number"]),
                allow_console: false,
                allow_timers: false,
                timeout: Duration::from_millis(1000),
                strict_mode: true,
                max_memory_usage: 1024 * 1024,
                ..basic
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Preset::Basic, true, 3000, false)]
    #[case(Preset::Secure, false, 2000, true)]
    #[case(Preset::Restricted, false, 1000, true)]
    fn preset_values(
        #[case] preset: Preset,
        #[case] console: bool,
        #[case] timeout_ms: u64,
        #[case] strict: bool,
    ) {
        let config = preset.config();
        assert_eq!(config.allow_console, console);
        assert_eq!(config.timeout, Duration::from_millis(timeout_ms));
        assert_eq!(config.strict_mode, strict);
    }

    #[test]
    fn restricted_allows_four_globals() {
        let config = Preset::Restricted.config();
        assert_eq!(config.allowed_globals, ["Math", "JSON", "String", "Number"]);
        assert_eq!(config.max_memory_usage, 1024 * 1024);
        assert!(!config.is_allowed("console"));
    }

    #[test]
    fn unknown_preset_is_basic() {
        assert_eq!(Preset::from_name("unknown"), Preset::Basic);
        assert_eq!(Preset::from_name(" Secure "), Preset::Secure);
    }

    #[test]
    fn deny_wins_over_allow() {
        let mut config = Preset::Basic.config();
        config.allowed_globals.push("eval".into());
        assert!(!config.is_allowed("eval"));
        assert!(config.is_allowed("Math"));
    }

    #[test]
    fn switches_gate_console_and_date() {
        let mut config = Preset::Basic.config();
        assert!(config.is_allowed("console"));
        assert!(config.is_allowed("Date"));
        config.allow_console = false;
        config.allow_timers = false;
        assert!(!config.is_allowed("console"));
        assert!(!config.is_allowed("Date"));
    }
}
