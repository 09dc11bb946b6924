//! JavaScript value types
//!
//! This module defines the runtime representation of JavaScript values and the
//! abstract coercion operations (ToNumber, ToString, ToPropertyKey, ...).

use crate::error::{messages, Error, Result};
use crate::runtime::object::Object;
use crate::runtime::property::PropertyKey;
use crate::runtime::symbol::Symbol;
use std::fmt;
use std::rc::Rc;

/// Immutable, cheaply cloned string storage
pub type JsString = Rc<str>;

/// 2^53 - 1, the largest length an array-like may report
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// A JavaScript value
///
/// `PartialEq` follows SameValue: `NaN == NaN`, `+0 != -0`, and an `Int` equals
/// a `Float` holding the same number.
#[derive(Clone)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer number (never -0)
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    String(JsString),
    /// Symbol
    Symbol(Symbol),
    /// Object (includes arrays, functions, proxies, etc.)
    Object(Object),
}

/// Hint passed to ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    Number,
    String,
}

impl PreferredType {
    /// The hint string handed to `@@toPrimitive`
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferredType::Default => "default",
            PreferredType::Number => "number",
            PreferredType::String => "string",
        }
    }
}

impl Value {
    /// Build a number value, using the integer representation when exact
    pub fn number(n: f64) -> Value {
        if n.fract() == 0.0
            && n.abs() <= MAX_SAFE_INTEGER as f64
            && !(n == 0.0 && n.is_sign_negative())
        {
            Value::Int(n as i64)
        } else {
            Value::Float(n)
        }
    }

    /// Check if value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is nullish (null or undefined)
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check if value is an object
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Borrow the object, if this is one
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Borrow the string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric value, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Check if value is a callable object
    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(|o| o.is_callable())
    }

    /// Check if value is a constructor
    pub fn is_constructor(&self) -> bool {
        self.as_object().is_some_and(|o| o.is_constructor())
    }

    /// Get the typeof string
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Object(obj) => {
                if obj.is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// Convert to boolean (truthiness)
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Symbol(_) | Value::Object(_) => true,
        }
    }

    /// ToPrimitive
    pub fn to_primitive(&self, hint: PreferredType) -> Result<Value> {
        match self {
            Value::Object(obj) => obj.to_primitive(hint),
            other => Ok(other.clone()),
        }
    }

    /// ToNumber
    pub fn to_number(&self) -> Result<f64> {
        Ok(match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::String(s) => string_to_number(s),
            Value::Symbol(_) => return Err(Error::type_error(messages::SYMBOL_TO_NUMBER)),
            Value::Object(_) => return self.to_primitive(PreferredType::Number)?.to_number(),
        })
    }

    /// ToIntegerOrInfinity
    pub fn to_integer_or_infinity(&self) -> Result<f64> {
        if let Value::Int(i) = self {
            return Ok(*i as f64);
        }
        let n = self.to_number()?;
        if n.is_nan() {
            return Ok(0.0);
        }
        if n.is_infinite() {
            return Ok(n);
        }
        Ok(n.trunc() + 0.0)
    }

    /// ToLength: clamp to `[0, 2^53 - 1]`
    pub fn to_length(&self) -> Result<i64> {
        let n = self.to_integer_or_infinity()?;
        if n <= 0.0 {
            Ok(0)
        } else if n >= MAX_SAFE_INTEGER as f64 {
            Ok(MAX_SAFE_INTEGER)
        } else {
            Ok(n as i64)
        }
    }

    /// ToString
    pub fn to_js_string(&self) -> Result<JsString> {
        Ok(match self {
            Value::String(s) => s.clone(),
            Value::Symbol(_) => return Err(Error::type_error(messages::SYMBOL_TO_STRING)),
            Value::Object(_) => return self.to_primitive(PreferredType::String)?.to_js_string(),
            other => other.to_string().into(),
        })
    }

    /// ToPropertyKey
    pub fn to_property_key(&self) -> Result<PropertyKey> {
        match self {
            Value::Symbol(sym) => Ok(PropertyKey::Symbol(sym.clone())),
            Value::Int(i) if *i >= 0 && *i < u32::MAX as i64 => Ok(PropertyKey::Index(*i as u32)),
            Value::String(s) => Ok(PropertyKey::from(s.clone())),
            Value::Object(_) => self.to_primitive(PreferredType::String)?.to_property_key(),
            other => Ok(PropertyKey::from(other.to_js_string()?)),
        }
    }

    /// SameValue
    pub fn same_value(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            _ => self.same_non_number(other),
        }
    }

    /// SameValueZero
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self.same_non_number(other),
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self.same_non_number(other),
        }
    }

    fn same_non_number(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }

    /// Abstract equality (==)
    pub fn loose_equals(&self, other: &Value) -> Result<bool> {
        match (self, other) {
            (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => Ok(true),
            (Value::Null | Value::Undefined, _) | (_, Value::Null | Value::Undefined) => Ok(false),
            (Value::Object(_), Value::Object(_)) => Ok(self.strict_equals(other)),
            (Value::Object(_), _) => self.to_primitive(PreferredType::Default)?.loose_equals(other),
            (_, Value::Object(_)) => self.loose_equals(&other.to_primitive(PreferredType::Default)?),
            (Value::Symbol(_), _) | (_, Value::Symbol(_)) => Ok(self.strict_equals(other)),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            _ => Ok(self.to_number()? == other.to_number()?),
        }
    }
}

/// Parse a string per the StringToNumber grammar
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        let mut acc = 0.0f64;
        for c in digits.chars() {
            match c.to_digit(radix) {
                Some(d) => acc = acc * radix as f64 + d as f64,
                None => return f64::NAN,
            }
        }
        return acc;
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a number the way Number.prototype.toString does for radix 10
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = n.abs();
    if !(1e-6..1e21).contains(&abs) {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    format!("{}", n)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Symbol(sym) => write!(f, "{}", sym),
            Value::Object(obj) => write!(f, "[object {}]", obj.class_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Float(n) if *n == 0.0 && n.is_sign_negative() => write!(f, "-0"),
            Value::Object(obj) => write!(f, "{:?}", obj),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::number(i as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<JsString> for Value {
    fn from(s: JsString) -> Self {
        Value::String(s)
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<&Object> for Value {
    fn from(obj: &Object) -> Self {
        Value::Object(obj.clone())
    }
}

impl From<Option<Object>> for Value {
    fn from(obj: Option<Object>) -> Self {
        obj.map_or(Value::Null, Value::Object)
    }
}
