//! Runtime values and their bridge to `serde_json`.
//!
//! Host data only ever crosses the sandbox boundary as JSON: globals and
//! injected parameters come in through [`Value::from_json`], results leave
//! through [`Value::to_json`]. Functions and natives never leave.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Number, Value as Json};

use crate::ast::FunctionDef;
use crate::interpreter::{Native, ScopeId};

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<Closure>),
    Native(Native),
}

/// A user function together with the scope it was created in.
#[derive(Debug)]
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub scope: ScopeId,
}

/// Property bag that keeps insertion order.
#[derive(Debug, Clone, Default)]
pub struct Object {
    props: Vec<(String, Value)>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.props.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.props.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut object = Object::default();
        for (k, v) in iter {
            object.set(k, v);
        }
        object
    }
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => string_to_number(s),
            Value::Array(items) => {
                let items = items.borrow();
                match items.as_slice() {
                    [] => 0.0,
                    [only] => only.to_number(),
                    _ => f64::NAN,
                }
            }
            _ => f64::NAN,
        }
    }

    /// JavaScript `String(value)`.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".into(),
            Value::Function(c) => format!(
                "function {}() {{ [code] }}",
                c.def.name.as_deref().unwrap_or_default()
            ),
            Value::Native(n) => format!("function {}() {{ [native code] }}", n.name()),
        }
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a == b,
            _ => false,
        }
    }

    /// `==` for primitives; objects compare by identity.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_) | Value::Str(_) | Value::Bool(_), Value::Number(_))
            | (Value::Number(_) | Value::Bool(_), Value::Str(_))
            | (Value::Str(_) | Value::Number(_), Value::Bool(_)) => {
                self.to_number() == other.to_number()
            }
            _ => self.strict_equals(other),
        }
    }

    /// Rough heap footprint, used for the memory guard.
    pub fn approx_size(&self) -> usize {
        match self {
            Value::Str(s) => s.len(),
            Value::Array(items) => items.borrow().len() * std::mem::size_of::<Value>(),
            Value::Object(object) => object.borrow().len() * 2 * std::mem::size_of::<Value>(),
            _ => 0,
        }
    }

    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::str(s.as_str()),
            Json::Array(items) => Value::array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// `None` for values JSON cannot express (`undefined`, functions).
    /// Non-finite numbers become `null`, as `JSON.stringify` does.
    pub fn to_json(&self) -> Option<Json> {
        self.to_json_depth(0)
    }

    fn to_json_depth(&self, depth: usize) -> Option<Json> {
        // cyclic structures stop here instead of recursing forever
        if depth > MAX_JSON_DEPTH {
            return Some(Json::Null);
        }
        Some(match self {
            Value::Undefined | Value::Function(_) | Value::Native(_) => return None,
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Str(s) => Json::String(s.to_string()),
            Value::Array(items) => Json::Array(
                items
                    .borrow()
                    .iter()
                    .map(|v| v.to_json_depth(depth + 1).unwrap_or(Json::Null))
                    .collect(),
            ),
            Value::Object(object) => {
                let mut map = Map::new();
                for (k, v) in object.borrow().iter() {
                    if let Some(json) = v.to_json_depth(depth + 1) {
                        map.insert(k.to_string(), json);
                    }
                }
                Json::Object(map)
            }
        })
    }
}

const MAX_JSON_DEPTH: usize = 64;

/// Integral values keep an integer representation so `2` stays `2`.
fn number_to_json(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Json::Null, Json::Number)
}

/// JavaScript `Number(string)`.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// JavaScript number formatting for the common cases.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.into()
    } else if n == 0.0 {
        "0".into()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let exp = format!("{n:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    } else if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(2.0, "2")]
    #[case(-0.0, "0")]
    #[case(0.5, "0.5")]
    #[case(1e21, "1e+21")]
    #[case(1e-7, "1e-7")]
    #[case(f64::NAN, "NaN")]
    #[case(f64::NEG_INFINITY, "-Infinity")]
    fn formats_numbers(#[case] n: f64, #[case] expected: &str) {
        assert_eq!(number_to_string(n), expected);
    }

    #[rstest]
    #[case("  42 ", 42.0)]
    #[case("", 0.0)]
    #[case("0x10", 16.0)]
    #[case("1e3", 1000.0)]
    fn parses_numeric_strings(#[case] s: &str, #[case] expected: f64) {
        assert_eq!(string_to_number(s), expected);
    }

    #[test]
    fn non_numeric_strings_are_nan() {
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
    }

    #[test]
    fn json_bridge_keeps_shape() {
        let json = json!({"name": "x", "items": [1, 2.5, null, true], "nested": {"a": "b"}});
        assert_eq!(Value::from_json(&json).to_json(), Some(json));
    }

    #[test]
    fn json_drops_what_it_cannot_express() {
        assert_eq!(Value::Undefined.to_json(), None);
        assert_eq!(Value::Number(f64::INFINITY).to_json(), Some(Json::Null));
        let obj = Value::object([("u".to_string(), Value::Undefined)].into_iter().collect());
        assert_eq!(obj.to_json(), Some(json!({})));
    }

    #[test]
    fn equality() {
        assert!(Value::Number(1.0).loose_equals(&Value::str("1")));
        assert!(!Value::Number(1.0).strict_equals(&Value::str("1")));
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::str("").truthy());
        assert!(Value::array(vec![]).truthy());
        assert!(!Value::Number(f64::NAN).truthy());
    }
}
