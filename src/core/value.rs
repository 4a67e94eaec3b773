// src/core/value.rs

//! The closed set of value shapes a flag can carry.
//!
//! A flag's default `Value` doubles as its parsing schema: the coercion engine
//! (`core::coerce`) reads the variant of the example value to decide how a
//! literal is interpreted. Composite variants keep an example element so that
//! empty collections still know their element type.

use crate::core::timefmt;
use chrono::{DateTime, FixedOffset, TimeDelta};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// A type that knows how to read itself from text, used for flag values whose
/// shape is not one of the built-in variants.
pub trait TextValue: fmt::Debug {
    /// A short, human readable name of the underlying type.
    fn type_name(&self) -> &'static str;

    /// Parses `text` into a new value of the same type.
    fn unmarshal_text(&self, text: &str) -> Result<Rc<dyn TextValue>, String>;

    /// Renders the value as text that `unmarshal_text` accepts.
    fn marshal_text(&self) -> String;
}

/// Adapts any `FromStr + Display` type into a `TextValue`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T>(pub T);

impl<T> TextValue for Parsed<T>
where
    T: FromStr + fmt::Display + fmt::Debug + 'static,
    T::Err: fmt::Display,
{
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn unmarshal_text(&self, text: &str) -> Result<Rc<dyn TextValue>, String> {
        text.parse::<T>()
            .map(|v| Rc::new(Parsed(v)) as Rc<dyn TextValue>)
            .map_err(|e| e.to_string())
    }

    fn marshal_text(&self) -> String {
        self.0.to_string()
    }
}

/// A complex number with `f64` parts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex64 {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

impl Complex64 {
    /// Builds a complex number from its parts.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl fmt::Display for Complex64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}{:+}i)", self.re, self.im)
    }
}

/// A dynamically shaped flag value.
#[derive(Debug, Clone)]
pub enum Value {
    /// A boolean switch.
    Bool(bool),
    /// Signed integers of each width.
    I8(i8),
    #[allow(missing_docs)]
    I16(i16),
    #[allow(missing_docs)]
    I32(i32),
    #[allow(missing_docs)]
    I64(i64),
    /// Unsigned integers of each width.
    U8(u8),
    #[allow(missing_docs)]
    U16(u16),
    #[allow(missing_docs)]
    U32(u32),
    #[allow(missing_docs)]
    U64(u64),
    /// Floating point numbers.
    F32(f32),
    #[allow(missing_docs)]
    F64(f64),
    /// A complex number.
    Complex(Complex64),
    /// Plain text.
    String(String),
    /// A point in time with its offset.
    Time(DateTime<FixedOffset>),
    /// A signed span of time.
    Duration(TimeDelta),
    /// A user type parsed through its own text capability.
    Text(Rc<dyn TextValue>),
    /// A growable list. `elem` is the example every item is parsed against.
    Slice {
        /// Example element.
        elem: Box<Value>,
        /// Current items.
        items: Vec<Value>,
    },
    /// A fixed-length list; `items.len()` is the declared length.
    Array {
        /// Example element.
        elem: Box<Value>,
        /// Current items.
        items: Vec<Value>,
    },
    /// An unordered key/value collection with unique keys.
    Map {
        /// Example key.
        key: Box<Value>,
        /// Example value.
        value: Box<Value>,
        /// Current entries, in insertion order.
        entries: Vec<(Value, Value)>,
    },
    /// Named fields, decoded positionally.
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// An empty slice whose items are parsed like `elem`.
    pub fn slice_of(elem: Value) -> Self {
        Self::Slice {
            elem: Box::new(elem),
            items: Vec::new(),
        }
    }

    /// A slice pre-filled with `items`, parsed like `elem`.
    pub fn slice_with(elem: Value, items: Vec<Value>) -> Self {
        Self::Slice {
            elem: Box::new(elem),
            items,
        }
    }

    /// A fixed-length array of `len` copies of `elem`.
    pub fn array_of(elem: Value, len: usize) -> Self {
        Self::Array {
            items: vec![elem.clone(); len],
            elem: Box::new(elem),
        }
    }

    /// An empty map with the given key and value examples.
    pub fn map_of(key: Value, value: Value) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
            entries: Vec::new(),
        }
    }

    /// A list of strings.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::slice_with(
            Self::String(String::new()),
            items.into_iter().map(|s| Self::String(s.into())).collect(),
        )
    }

    /// Wraps a `FromStr + Display` value into `Value::Text`.
    pub fn text<T>(value: T) -> Self
    where
        T: FromStr + fmt::Display + fmt::Debug + 'static,
        T::Err: fmt::Display,
    {
        Self::Text(Rc::new(Parsed(value)))
    }

    /// A short name of the value's shape, used in messages.
    pub fn kind_name(&self) -> String {
        match self {
            Self::Bool(_) => "bool".into(),
            Self::I8(_) => "i8".into(),
            Self::I16(_) => "i16".into(),
            Self::I32(_) => "i32".into(),
            Self::I64(_) => "i64".into(),
            Self::U8(_) => "u8".into(),
            Self::U16(_) => "u16".into(),
            Self::U32(_) => "u32".into(),
            Self::U64(_) => "u64".into(),
            Self::F32(_) => "f32".into(),
            Self::F64(_) => "f64".into(),
            Self::Complex(_) => "complex".into(),
            Self::String(_) => "string".into(),
            Self::Time(_) => "time".into(),
            Self::Duration(_) => "duration".into(),
            Self::Text(t) => t.type_name().into(),
            Self::Slice { elem, .. } => format!("[]{}", elem.kind_name()),
            Self::Array { elem, items } => format!("[{}]{}", items.len(), elem.kind_name()),
            Self::Map { key, value, .. } => {
                format!("map[{}]{}", key.kind_name(), value.kind_name())
            }
            Self::Struct(_) => "struct".into(),
        }
    }

    /// True for variants that accumulate across repeated hits.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Slice { .. } | Self::Map { .. })
    }

    /// True for any integer, float or complex variant.
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some() || matches!(self, Self::Complex(_))
    }

    /// The zero value of the same shape.
    pub fn zeroed(&self) -> Self {
        match self {
            Self::Bool(_) => Self::Bool(false),
            Self::I8(_) => Self::I8(0),
            Self::I16(_) => Self::I16(0),
            Self::I32(_) => Self::I32(0),
            Self::I64(_) => Self::I64(0),
            Self::U8(_) => Self::U8(0),
            Self::U16(_) => Self::U16(0),
            Self::U32(_) => Self::U32(0),
            Self::U64(_) => Self::U64(0),
            Self::F32(_) => Self::F32(0.0),
            Self::F64(_) => Self::F64(0.0),
            Self::Complex(_) => Self::Complex(Complex64::default()),
            Self::String(_) => Self::String(String::new()),
            Self::Time(t) => Self::Time(*t),
            Self::Duration(_) => Self::Duration(TimeDelta::zero()),
            Self::Text(t) => Self::Text(Rc::clone(t)),
            Self::Slice { elem, .. } => Self::Slice {
                elem: elem.clone(),
                items: Vec::new(),
            },
            Self::Array { elem, items } => Self::Array {
                elem: elem.clone(),
                items: vec![elem.zeroed(); items.len()],
            },
            Self::Map { key, value, .. } => Self::Map {
                key: key.clone(),
                value: value.clone(),
                entries: Vec::new(),
            },
            Self::Struct(fields) => Self::Struct(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.zeroed()))
                    .collect(),
            ),
        }
    }

    /// Merges a later hit into an accumulated collection.
    ///
    /// Slices append, maps overwrite per key; every other shape is replaced.
    pub fn merged(self, later: Value) -> Self {
        match (self, later) {
            (Self::Slice { elem, mut items }, Self::Slice { items: more, .. }) => {
                items.extend(more);
                Self::Slice { elem, items }
            }
            (
                Self::Map {
                    key,
                    value,
                    mut entries,
                },
                Self::Map { entries: more, .. },
            ) => {
                for (k, v) in more {
                    upsert(&mut entries, k, v);
                }
                Self::Map {
                    key,
                    value,
                    entries,
                }
            }
            (_, later) => later,
        }
    }

    /// The boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer variant widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I8(v) => Some(i64::from(*v)),
            Self::I16(v) => Some(i64::from(*v)),
            Self::I32(v) => Some(i64::from(*v)),
            Self::I64(v) => Some(*v),
            Self::U8(v) => Some(i64::from(*v)),
            Self::U16(v) => Some(i64::from(*v)),
            Self::U32(v) => Some(i64::from(*v)),
            Self::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Any unsigned integer variant (or non-negative signed one) as `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    /// Any integer or float variant as `f64`; wide integers may lose precision.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            Self::U64(v) => Some(*v as f64),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// The string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The items of a slice or array.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::Slice { items, .. } | Self::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Looks up a map entry by the rendered form of its key.
    pub fn map_get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map { entries, .. } => entries
                .iter()
                .find(|(k, _)| k.to_string() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// A JSON rendering for debug printers.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Bool(b) => Json::Bool(*b),
            Self::F32(v) => serde_json::json!(v),
            Self::F64(v) => serde_json::json!(v),
            Self::U64(v) => serde_json::json!(v),
            Self::String(s) => Json::String(s.clone()),
            Self::Slice { items, .. } | Self::Array { items, .. } => {
                Json::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Map { entries, .. } => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Self::Struct(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.to_json()))
                    .collect(),
            ),
            other => match other.as_i64() {
                Some(v) => serde_json::json!(v),
                None => Json::String(other.to_string()),
            },
        }
    }

    fn write_literal(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Complex(c) => write!(f, "{c}"),
            Self::String(s) if nested => f.write_str(&quote_if_needed(s)),
            Self::String(s) => f.write_str(s),
            Self::Time(t) => f.write_str(&t.to_rfc3339()),
            Self::Duration(d) => f.write_str(&timefmt::format_duration(*d)),
            Self::Text(t) if nested => f.write_str(&quote_if_needed(&t.marshal_text())),
            Self::Text(t) => f.write_str(&t.marshal_text()),
            Self::Slice { items, .. } | Self::Array { items, .. } => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    item.write_literal(f, true)?;
                }
                f.write_str("]")
            }
            Self::Struct(fields) => {
                f.write_str("[")?;
                for (i, (_, item)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    item.write_literal(f, true)?;
                }
                f.write_str("]")
            }
            Self::Map { entries, .. } => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    k.write_literal(f, true)?;
                    f.write_str(":")?;
                    v.write_literal(f, true)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_literal(f, false)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a == b,
            (Self::F64(a), Self::F64(b)) => a == b,
            (Self::Complex(a), Self::Complex(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => {
                a.type_name() == b.type_name() && a.marshal_text() == b.marshal_text()
            }
            (Self::Slice { items: a, .. }, Self::Slice { items: b, .. })
            | (Self::Array { items: a, .. }, Self::Array { items: b, .. }) => a == b,
            (Self::Map { entries: a, .. }, Self::Map { entries: b, .. }) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.iter().any(|(k2, v2)| k == k2 && v == v2))
            }
            (Self::Struct(a), Self::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Inserts or replaces a map entry keyed by value equality.
pub(crate) fn upsert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}

/// Characters that force a nested string to be quoted when rendered.
const LITERAL_SPECIALS: &[char] = &['[', ']', '{', '}', '(', ')', ',', ':', '=', '"', '\'', '\\'];

fn quote_if_needed(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || LITERAL_SPECIALS.contains(&c));
    if !needs_quotes {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_renders_literal_grammar() {
        let v = Value::slice_with(
            Value::map_of(Value::from(""), Value::slice_of(Value::I64(0))),
            vec![Value::Map {
                key: Box::new(Value::from("")),
                value: Box::new(Value::slice_of(Value::I64(0))),
                entries: vec![(
                    Value::from("a"),
                    Value::slice_with(Value::I64(0), vec![Value::I64(8), Value::I64(9)]),
                )],
            }],
        );
        assert_eq!(v.to_string(), "[{a:[8,9]}]");
    }

    #[test]
    fn test_nested_strings_are_quoted_when_needed() {
        let v = Value::strings(["plain", "with space", "a,b"]);
        assert_eq!(v.to_string(), r#"[plain,"with space","a,b"]"#);
        assert_eq!(Value::from("with space").to_string(), "with space");
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = Value::Map {
            key: Box::new(Value::from("")),
            value: Box::new(Value::I64(0)),
            entries: vec![(Value::from("x"), Value::I64(1)), (Value::from("y"), Value::I64(2))],
        };
        let b = Value::Map {
            key: Box::new(Value::from("")),
            value: Box::new(Value::I64(0)),
            entries: vec![(Value::from("y"), Value::I64(2)), (Value::from("x"), Value::I64(1))],
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_merged_appends_slices_and_overwrites_map_keys() {
        let first = Value::strings(["a"]);
        let merged = first.merged(Value::strings(["b", "c"]));
        assert_eq!(merged, Value::strings(["a", "b", "c"]));

        let mut m1 = Value::map_of(Value::from(""), Value::I64(0));
        if let Value::Map { entries, .. } = &mut m1 {
            entries.push((Value::from("k"), Value::I64(1)));
        }
        let mut m2 = Value::map_of(Value::from(""), Value::I64(0));
        if let Value::Map { entries, .. } = &mut m2 {
            entries.push((Value::from("k"), Value::I64(5)));
            entries.push((Value::from("j"), Value::I64(6)));
        }
        let merged = m1.merged(m2);
        assert_eq!(merged.map_get("k"), Some(&Value::I64(5)));
        assert_eq!(merged.map_get("j"), Some(&Value::I64(6)));
    }

    #[test]
    fn test_zeroed_keeps_shape() {
        let arr = Value::Array {
            elem: Box::new(Value::I64(0)),
            items: vec![Value::I64(3), Value::I64(4)],
        };
        assert_eq!(
            arr.zeroed(),
            Value::Array {
                elem: Box::new(Value::I64(0)),
                items: vec![Value::I64(0), Value::I64(0)],
            }
        );
        assert_eq!(Value::Bool(true).zeroed(), Value::Bool(false));
    }

    #[test]
    fn test_text_values_compare_by_rendering() {
        let a = Value::text("127.0.0.1".parse::<std::net::IpAddr>().unwrap());
        let b = Value::text("127.0.0.1".parse::<std::net::IpAddr>().unwrap());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "127.0.0.1");
    }
}
