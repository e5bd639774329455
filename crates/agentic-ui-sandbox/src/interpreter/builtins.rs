//! Host functions reachable from scripts, and the methods of strings,
//! arrays and numbers.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value as Json;

use super::{Exec, Interpreter};
use crate::value::{Object, Value, number_to_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Abs,
    Ceil,
    Floor,
    Round,
    Trunc,
    Sign,
    Sqrt,
    Cbrt,
    Pow,
    Exp,
    Log,
    Log10,
    Log2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Hypot,
    Min,
    Max,
    Random,
}

const MATH_FNS: &[MathFn] = &[
    MathFn::Abs,
    MathFn::Ceil,
    MathFn::Floor,
    MathFn::Round,
    MathFn::Trunc,
    MathFn::Sign,
    MathFn::Sqrt,
    MathFn::Cbrt,
    MathFn::Pow,
    MathFn::Exp,
    MathFn::Log,
    MathFn::Log10,
    MathFn::Log2,
    MathFn::Sin,
    MathFn::Cos,
    MathFn::Tan,
    MathFn::Asin,
    MathFn::Acos,
    MathFn::Atan,
    MathFn::Atan2,
    MathFn::Hypot,
    MathFn::Min,
    MathFn::Max,
    MathFn::Random,
];

const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("PI", std::f64::consts::PI),
    ("E", std::f64::consts::E),
    ("LN2", std::f64::consts::LN_2),
    ("LN10", std::f64::consts::LN_10),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("SQRT2", std::f64::consts::SQRT_2),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
];

impl MathFn {
    pub fn name(self) -> &'static str {
        match self {
            MathFn::Abs => "abs",
            MathFn::Ceil => "ceil",
            MathFn::Floor => "floor",
            MathFn::Round => "round",
            MathFn::Trunc => "trunc",
            MathFn::Sign => "sign",
            MathFn::Sqrt => "sqrt",
            MathFn::Cbrt => "cbrt",
            MathFn::Pow => "pow",
            MathFn::Exp => "exp",
            MathFn::Log => "log",
            MathFn::Log10 => "log10",
            MathFn::Log2 => "log2",
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Tan => "tan",
            MathFn::Asin => "asin",
            MathFn::Acos => "acos",
            MathFn::Atan => "atan",
            MathFn::Atan2 => "atan2",
            MathFn::Hypot => "hypot",
            MathFn::Min => "min",
            MathFn::Max => "max",
            MathFn::Random => "random",
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        let x = args.first().copied().unwrap_or(f64::NAN);
        let y = args.get(1).copied().unwrap_or(f64::NAN);
        match self {
            MathFn::Abs => x.abs(),
            MathFn::Ceil => x.ceil(),
            MathFn::Floor => x.floor(),
            // halves round toward +Infinity
            MathFn::Round => (x + 0.5).floor(),
            MathFn::Trunc => x.trunc(),
            MathFn::Sign => {
                if x.is_nan() || x == 0.0 {
                    x
                } else {
                    x.signum()
                }
            }
            MathFn::Sqrt => x.sqrt(),
            MathFn::Cbrt => x.cbrt(),
            MathFn::Pow => x.powf(y),
            MathFn::Exp => x.exp(),
            MathFn::Log => x.ln(),
            MathFn::Log10 => x.log10(),
            MathFn::Log2 => x.log2(),
            MathFn::Sin => x.sin(),
            MathFn::Cos => x.cos(),
            MathFn::Tan => x.tan(),
            MathFn::Asin => x.asin(),
            MathFn::Acos => x.acos(),
            MathFn::Atan => x.atan(),
            MathFn::Atan2 => x.atan2(y),
            MathFn::Hypot => args.iter().map(|a| a * a).sum::<f64>().sqrt(),
            MathFn::Min => args.iter().copied().fold(f64::INFINITY, |acc, a| {
                if a.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(a) }
            }),
            MathFn::Max => args.iter().copied().fold(f64::NEG_INFINITY, |acc, a| {
                if a.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(a) }
            }),
            MathFn::Random => random_unit(),
        }
    }
}

/// Uniform in `[0, 1)` from the low 53 bits of a v4 UUID, which are all
/// random.
fn random_unit() -> f64 {
    let bits = uuid::Uuid::new_v4().as_u128() & ((1u128 << 53) - 1);
    bits as f64 / (1u64 << 53) as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Native {
    Math(MathFn),
    JsonParse,
    JsonStringify,
    ConsoleLog,
    ConsoleInfo,
    ConsoleWarn,
    ConsoleError,
    DateNow,
    StringCtor,
    NumberCtor,
    BooleanCtor,
    ErrorCtor,
    ParseInt,
    ParseFloat,
    IsNaN,
    IsFinite,
    ArrayIsArray,
    ObjectKeys,
    ObjectValues,
    ObjectEntries,
}

impl Native {
    pub fn name(self) -> &'static str {
        match self {
            Native::Math(f) => f.name(),
            Native::JsonParse => "parse",
            Native::JsonStringify => "stringify",
            Native::ConsoleLog => "log",
            Native::ConsoleInfo => "info",
            Native::ConsoleWarn => "warn",
            Native::ConsoleError => "error",
            Native::DateNow => "now",
            Native::StringCtor => "String",
            Native::NumberCtor => "Number",
            Native::BooleanCtor => "Boolean",
            Native::ErrorCtor => "Error",
            Native::ParseInt => "parseInt",
            Native::ParseFloat => "parseFloat",
            Native::IsNaN => "isNaN",
            Native::IsFinite => "isFinite",
            Native::ArrayIsArray => "isArray",
            Native::ObjectKeys => "keys",
            Native::ObjectValues => "values",
            Native::ObjectEntries => "entries",
        }
    }

    /// Usable with `new`.
    pub fn is_constructor(self) -> bool {
        matches!(
            self,
            Native::ErrorCtor | Native::StringCtor | Native::NumberCtor | Native::BooleanCtor
        )
    }
}

fn namespace(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::object(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn math_object() -> Value {
    let functions = MATH_FNS
        .iter()
        .map(|f| (f.name(), Value::Native(Native::Math(*f))));
    let constants = MATH_CONSTANTS
        .iter()
        .map(|(name, value)| (*name, Value::Number(*value)));
    namespace(functions.chain(constants))
}

/// Host value for an allow-listed global name.
pub(super) fn global(name: &str) -> Option<Value> {
    Some(match name {
        "Math" => math_object(),
        "JSON" => namespace([
            ("parse", Value::Native(Native::JsonParse)),
            ("stringify", Value::Native(Native::JsonStringify)),
        ]),
        "console" => namespace([
            ("log", Value::Native(Native::ConsoleLog)),
            ("debug", Value::Native(Native::ConsoleLog)),
            ("info", Value::Native(Native::ConsoleInfo)),
            ("warn", Value::Native(Native::ConsoleWarn)),
            ("error", Value::Native(Native::ConsoleError)),
        ]),
        "Date" => namespace([("now", Value::Native(Native::DateNow))]),
        "Array" => namespace([("isArray", Value::Native(Native::ArrayIsArray))]),
        "Object" => namespace([
            ("keys", Value::Native(Native::ObjectKeys)),
            ("values", Value::Native(Native::ObjectValues)),
            ("entries", Value::Native(Native::ObjectEntries)),
        ]),
        "String" => Value::Native(Native::StringCtor),
        "Number" => Value::Native(Native::NumberCtor),
        "Boolean" => Value::Native(Native::BooleanCtor),
        "Error" => Value::Native(Native::ErrorCtor),
        "parseInt" => Value::Native(Native::ParseInt),
        "parseFloat" => Value::Native(Native::ParseFloat),
        "isNaN" => Value::Native(Native::IsNaN),
        "isFinite" => Value::Native(Native::IsFinite),
        _ => return None,
    })
}

/// Bare math functions and constants for expression evaluation, so
/// `sqrt(16)` works without the `Math.` prefix.
pub(crate) fn math_prelude() -> Vec<(String, Value)> {
    let mut prelude: Vec<(String, Value)> = MATH_FNS
        .iter()
        .filter(|f| **f != MathFn::Random)
        .map(|f| (f.name().to_string(), Value::Native(Native::Math(*f))))
        .collect();
    prelude.extend(
        MATH_CONSTANTS
            .iter()
            .map(|(name, value)| (name.to_string(), Value::Number(*value))),
    );
    prelude
}

/// `{ name, message }`, the shape `new Error(...)` produces.
pub(crate) fn error_value(name: &str, message: impl Into<String>) -> Value {
    let message: String = message.into();
    let mut object = Object::default();
    object.set("name", Value::str(name));
    object.set("message", Value::str(message));
    Value::object(object)
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

pub(super) fn call_native(interp: &mut Interpreter<'_>, native: Native, args: Vec<Value>) -> Exec<Value> {
    let first = arg(&args, 0);
    Ok(match native {
        Native::Math(f) => {
            let numbers: Vec<f64> = args.iter().map(Value::to_number).collect();
            Value::Number(f.apply(&numbers))
        }
        Native::JsonParse => {
            let text = first.to_js_string();
            match serde_json::from_str::<Json>(&text) {
                Ok(json) => {
                    let value = Value::from_json(&json);
                    interp.guard_size(&value)?;
                    value
                }
                Err(e) => return Err(interp.throw("SyntaxError", format!("Invalid JSON: {e}"))),
            }
        }
        Native::JsonStringify => match first.to_json() {
            None => Value::Undefined,
            Some(json) => {
                let pretty = arg(&args, 2).to_number() > 0.0;
                let text = if pretty {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                };
                match text {
                    Ok(text) => Value::str(text),
                    Err(e) => return Err(interp.throw("TypeError", e.to_string())),
                }
            }
        },
        Native::ConsoleLog | Native::ConsoleInfo | Native::ConsoleWarn | Native::ConsoleError => {
            let line = args.iter().map(display).collect::<Vec<_>>().join(" ");
            match native {
                Native::ConsoleWarn => log::warn!(target: "sandbox", "{line}"),
                Native::ConsoleError => log::error!(target: "sandbox", "{line}"),
                _ => log::info!(target: "sandbox", "{line}"),
            }
            interp.console.push(line);
            Value::Undefined
        }
        Native::DateNow => {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            Value::Number(millis as f64)
        }
        Native::StringCtor => match args.first() {
            Some(value) => Value::str(value.to_js_string()),
            None => Value::str(""),
        },
        Native::NumberCtor => match args.first() {
            Some(value) => Value::Number(value.to_number()),
            None => Value::Number(0.0),
        },
        Native::BooleanCtor => Value::Bool(first.truthy()),
        Native::ErrorCtor => {
            let message = if first.is_nullish() {
                String::new()
            } else {
                first.to_js_string()
            };
            error_value("Error", message)
        }
        Native::ParseInt => {
            let radix = arg(&args, 1).to_number();
            let radix = if radix.is_finite() && radix != 0.0 {
                Some(radix as u32)
            } else {
                None
            };
            Value::Number(parse_int(&first.to_js_string(), radix))
        }
        Native::ParseFloat => Value::Number(parse_float(&first.to_js_string())),
        Native::IsNaN => Value::Bool(first.to_number().is_nan()),
        Native::IsFinite => Value::Bool(first.to_number().is_finite()),
        Native::ArrayIsArray => Value::Bool(matches!(first, Value::Array(_))),
        Native::ObjectKeys | Native::ObjectValues | Native::ObjectEntries => {
            let pairs: Vec<(String, Value)> = match &first {
                Value::Object(object) => object
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                Value::Array(items) => items
                    .borrow()
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v.clone()))
                    .collect(),
                Value::Str(s) => s
                    .chars()
                    .enumerate()
                    .map(|(i, c)| (i.to_string(), Value::str(c.to_string())))
                    .collect(),
                _ => Vec::new(),
            };
            Value::array(
                pairs
                    .into_iter()
                    .map(|(k, v)| match native {
                        Native::ObjectKeys => Value::str(k),
                        Native::ObjectValues => v,
                        _ => Value::array(vec![Value::str(k), v]),
                    })
                    .collect(),
            )
        }
    })
}

/// Console rendering: objects and arrays as JSON, everything else as
/// `String(value)`.
fn display(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => value
            .to_json()
            .and_then(|json| serde_json::to_string(&json).ok())
            .unwrap_or_else(|| value.to_js_string()),
        _ => value.to_js_string(),
    }
}

fn parse_int(text: &str, radix: Option<u32>) -> f64 {
    let text = text.trim();
    let (negative, text) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = match radix {
        Some(16) | None
            if text.starts_with("0x") || text.starts_with("0X") =>
        {
            (16, &text[2..])
        }
        Some(r) if (2..=36).contains(&r) => (r, text),
        Some(_) => return f64::NAN,
        None => (10, text),
    };
    let mut value: Option<f64> = None;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => value = Some(value.unwrap_or(0.0) * f64::from(radix) + f64::from(d)),
            None => break,
        }
    }
    match value {
        Some(v) if negative => -v,
        Some(v) => v,
        None => f64::NAN,
    }
}

/// Longest numeric prefix, as `parseFloat` reads it.
fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    for (word, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if text.starts_with(word) {
            return value;
        }
    }
    let mut end = 0;
    let mut best = f64::NAN;
    for (i, c) in text.char_indices() {
        if !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
            break;
        }
        end = i + c.len_utf8();
        if let Ok(value) = text[..end].parse::<f64>() {
            best = value;
        }
    }
    if end == 0 { f64::NAN } else { best }
}

/// Maps a possibly negative JS index onto `0..=len`.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

/// Methods of primitives and arrays. `None` when the receiver has no such
/// method.
pub(super) fn call_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    key: &str,
    args: Vec<Value>,
) -> Exec<Option<Value>> {
    if key == "toString" {
        return Ok(Some(match receiver {
            Value::Number(n) => match arg(&args, 0).to_number() {
                radix if radix.is_finite() && radix as u32 != 10 && (2.0..=36.0).contains(&radix) => {
                    Value::str(to_radix(*n, radix as u32))
                }
                _ => Value::str(number_to_string(*n)),
            },
            _ => Value::str(receiver.to_js_string()),
        }));
    }
    match receiver {
        Value::Str(s) => string_method(interp, s, key, &args),
        Value::Array(items) => array_method(interp, items, key, args),
        Value::Number(n) => Ok(number_method(*n, key, &args)),
        _ => Ok(None),
    }
}

fn to_radix(n: f64, radix: u32) -> String {
    if !n.is_finite() || n.fract() != 0.0 {
        return number_to_string(n);
    }
    let negative = n < 0.0;
    let mut value = n.abs() as u64;
    let mut digits = Vec::new();
    loop {
        let digit = (value % u64::from(radix)) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        value /= u64::from(radix);
        if value == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

fn number_method(n: f64, key: &str, args: &[Value]) -> Option<Value> {
    match key {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_finite() { digits.clamp(0.0, 100.0) as usize } else { 0 };
            if n.is_finite() {
                Some(Value::str(format!("{n:.digits$}")))
            } else {
                Some(Value::str(number_to_string(n)))
            }
        }
        "valueOf" => Some(Value::Number(n)),
        _ => None,
    }
}

fn string_method(
    interp: &mut Interpreter<'_>,
    s: &str,
    key: &str,
    args: &[Value],
) -> Exec<Option<Value>> {
    let text_arg = |i: usize| arg(args, i).to_js_string();
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let substring = |start: usize, end: usize| -> String {
        if start >= end {
            String::new()
        } else {
            chars[start..end].iter().collect()
        }
    };
    let char_offset = |byte: usize| s[..byte].chars().count();
    Ok(Some(match key {
        "toUpperCase" => Value::str(s.to_uppercase()),
        "toLowerCase" => Value::str(s.to_lowercase()),
        "trim" => Value::str(s.trim()),
        "trimStart" => Value::str(s.trim_start()),
        "trimEnd" => Value::str(s.trim_end()),
        "includes" => Value::Bool(s.contains(text_arg(0).as_str())),
        "startsWith" => Value::Bool(s.starts_with(text_arg(0).as_str())),
        "endsWith" => Value::Bool(s.ends_with(text_arg(0).as_str())),
        "indexOf" => Value::Number(
            s.find(text_arg(0).as_str())
                .map_or(-1.0, |byte| char_offset(byte) as f64),
        ),
        "lastIndexOf" => Value::Number(
            s.rfind(text_arg(0).as_str())
                .map_or(-1.0, |byte| char_offset(byte) as f64),
        ),
        "charAt" => {
            let i = arg(args, 0).to_number();
            let i = if i.is_nan() { 0.0 } else { i };
            Value::str(
                (i >= 0.0)
                    .then(|| chars.get(i as usize))
                    .flatten()
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            )
        }
        "slice" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let end = relative_index(&arg(args, 1), len, len);
            Value::str(substring(start, end))
        }
        "substring" => {
            let clamp = |v: &Value, default: usize| {
                if matches!(v, Value::Undefined) {
                    return default;
                }
                let n = v.to_number();
                if n.is_nan() || n < 0.0 { 0 } else { (n as usize).min(len) }
            };
            let a = clamp(&arg(args, 0), 0);
            let b = clamp(&arg(args, 1), len);
            Value::str(substring(a.min(b), a.max(b)))
        }
        "split" => {
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::str(s)],
                Some(sep) => {
                    let sep = sep.to_js_string();
                    if sep.is_empty() {
                        chars.iter().map(|c| Value::str(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::str).collect()
                    }
                }
            };
            let parts = Value::array(parts);
            interp.guard_size(&parts)?;
            parts
        }
        "repeat" => {
            let count = arg(args, 0).to_number();
            if count < 0.0 || !count.is_finite() {
                return Err(interp.throw("RangeError", "Invalid count value"));
            }
            let count = count as usize;
            interp.guard_bytes(s.len().saturating_mul(count))?;
            Value::str(s.repeat(count))
        }
        "padStart" | "padEnd" => {
            let target = arg(args, 0).to_number();
            let target = if target.is_finite() && target > 0.0 { target as usize } else { 0 };
            let fill = match args.get(1) {
                None | Some(Value::Undefined) => " ".to_string(),
                Some(v) => v.to_js_string(),
            };
            if target <= len || fill.is_empty() {
                Value::str(s)
            } else {
                interp.guard_bytes(target.saturating_mul(4))?;
                let pad: String = fill.chars().cycle().take(target - len).collect();
                if key == "padStart" {
                    Value::str(pad + s)
                } else {
                    Value::str(format!("{s}{pad}"))
                }
            }
        }
        "replace" => Value::str(s.replacen(text_arg(0).as_str(), &text_arg(1), 1)),
        "replaceAll" => {
            let replaced = s.replace(text_arg(0).as_str(), &text_arg(1));
            interp.guard_bytes(replaced.len())?;
            Value::str(replaced)
        }
        "concat" => {
            let mut out = s.to_string();
            for value in args {
                out.push_str(&value.to_js_string());
            }
            interp.guard_bytes(out.len())?;
            Value::str(out)
        }
        _ => return Ok(None),
    }))
}

type Items = std::rc::Rc<std::cell::RefCell<Vec<Value>>>;

fn array_method(
    interp: &mut Interpreter<'_>,
    items: &Items,
    key: &str,
    args: Vec<Value>,
) -> Exec<Option<Value>> {
    // callbacks may mutate the array, so they iterate a snapshot
    let snapshot = || items.borrow().clone();
    let callback = arg(&args, 0);
    Ok(Some(match key {
        "push" => {
            let len = {
                let mut items = items.borrow_mut();
                items.extend(args);
                items.len()
            };
            interp.guard_bytes(len.saturating_mul(std::mem::size_of::<Value>()))?;
            Value::Number(len as f64)
        }
        "pop" => items.borrow_mut().pop().unwrap_or(Value::Undefined),
        "shift" => {
            let mut items = items.borrow_mut();
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        }
        "unshift" => {
            let mut items = items.borrow_mut();
            for (i, value) in args.into_iter().enumerate() {
                items.insert(i, value);
            }
            Value::Number(items.len() as f64)
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_js_string(),
            };
            let joined = items
                .borrow()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect::<Vec<_>>()
                .join(&sep);
            interp.guard_bytes(joined.len())?;
            Value::str(joined)
        }
        "includes" => {
            let needle = arg(&args, 0);
            Value::Bool(items.borrow().iter().any(|v| same_value_zero(v, &needle)))
        }
        "indexOf" => {
            let needle = arg(&args, 0);
            Value::Number(
                items
                    .borrow()
                    .iter()
                    .position(|v| v.strict_equals(&needle))
                    .map_or(-1.0, |i| i as f64),
            )
        }
        "slice" => {
            let items = snapshot();
            let len = items.len();
            let start = relative_index(&arg(&args, 0), len, 0);
            let end = relative_index(&arg(&args, 1), len, len);
            Value::array(if start < end { items[start..end].to_vec() } else { Vec::new() })
        }
        "concat" => {
            let mut out = snapshot();
            for value in args {
                match value {
                    Value::Array(more) => out.extend(more.borrow().iter().cloned()),
                    other => out.push(other),
                }
            }
            let out = Value::array(out);
            interp.guard_size(&out)?;
            out
        }
        "reverse" => {
            items.borrow_mut().reverse();
            Value::Array(items.clone())
        }
        "forEach" => {
            for (i, item) in snapshot().into_iter().enumerate() {
                interp.call_value(&callback, vec![item, Value::Number(i as f64)], "callback")?;
            }
            Value::Undefined
        }
        "map" => {
            let mut out = Vec::new();
            for (i, item) in snapshot().into_iter().enumerate() {
                out.push(interp.call_value(&callback, vec![item, Value::Number(i as f64)], "callback")?);
            }
            Value::array(out)
        }
        "filter" => {
            let mut out = Vec::new();
            for (i, item) in snapshot().into_iter().enumerate() {
                if interp
                    .call_value(&callback, vec![item.clone(), Value::Number(i as f64)], "callback")?
                    .truthy()
                {
                    out.push(item);
                }
            }
            Value::array(out)
        }
        "find" | "findIndex" | "some" | "every" => {
            let mut found = None;
            for (i, item) in snapshot().into_iter().enumerate() {
                let hit = interp
                    .call_value(&callback, vec![item.clone(), Value::Number(i as f64)], "callback")?
                    .truthy();
                if hit != (key == "every") {
                    found = Some((i, item));
                    break;
                }
            }
            match key {
                "find" => found.map_or(Value::Undefined, |(_, item)| item),
                "findIndex" => Value::Number(found.map_or(-1.0, |(i, _)| i as f64)),
                "some" => Value::Bool(found.is_some()),
                _ => Value::Bool(found.is_none()),
            }
        }
        "reduce" => {
            let mut values = snapshot().into_iter().enumerate();
            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match values.next() {
                    Some((_, first)) => first,
                    None => {
                        return Err(interp.throw(
                            "TypeError",
                            "Reduce of empty array with no initial value",
                        ));
                    }
                },
            };
            for (i, item) in values {
                acc = interp.call_value(
                    &callback,
                    vec![acc, item, Value::Number(i as f64)],
                    "callback",
                )?;
            }
            acc
        }
        "sort" => {
            let mut values = snapshot();
            if callback.is_callable() {
                insertion_sort(&mut values, |a, b| {
                    let result = interp.call_value(&callback, vec![a.clone(), b.clone()], "comparator")?;
                    Ok(result.to_number() > 0.0)
                })?;
            } else {
                // undefined sorts last, everything else by string form
                insertion_sort(&mut values, |a, b| {
                    Ok(match (a, b) {
                        (Value::Undefined, _) => !matches!(b, Value::Undefined),
                        (_, Value::Undefined) => false,
                        _ => a.to_js_string() > b.to_js_string(),
                    })
                })?;
            }
            *items.borrow_mut() = values;
            Value::Array(items.clone())
        }
        _ => return Ok(None),
    }))
}

/// Stable, and tolerant of comparators that are not a total order.
fn insertion_sort(
    values: &mut [Value],
    mut greater: impl FnMut(&Value, &Value) -> Exec<bool>,
) -> Exec<()> {
    for i in 1..values.len() {
        let mut j = i;
        while j > 0 && greater(&values[j - 1], &values[j])? {
            values.swap(j - 1, j);
            j -= 1;
        }
    }
    Ok(())
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}
