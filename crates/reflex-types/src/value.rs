//! Dynamically typed values passed to and returned from methods

use std::fmt;
use std::sync::Arc;

use crate::object::Instance;

/// Argument or result value
///
/// Reference values (`Str`, `List`, `Object`) are cheap to clone.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// 64-bit float
    F64(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Ordered immutable list
    List(Arc<[Value]>),
    /// Object reference
    Object(Instance),
}

impl Value {
    /// Create a string value
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Create a list value
    pub fn list(items: impl Into<Vec<Value>>) -> Self {
        Value::List(Arc::from(items.into()))
    }

    /// Check if this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as boolean if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i32 if this is an i32
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as i64, widening i32
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(i) => Some(*i as i64),
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get list items if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the object reference if this is an object
    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Runtime type name, as used in error messages
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::I32(_) => "i32".to_string(),
            Value::I64(_) => "i64".to_string(),
            Value::F64(_) => "f64".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Object(obj) => obj.class().name().to_string(),
        }
    }

    /// Stable 32-bit hash code
    ///
    /// Never change these formulas: composite keys built from them may be
    /// compared across the whole process lifetime.
    pub fn hash_code(&self) -> i32 {
        match self {
            Value::Null => 0,
            Value::Bool(true) => 1231,
            Value::Bool(false) => 1237,
            Value::I32(i) => *i,
            Value::I64(i) => fold64(*i as u64),
            Value::F64(f) => {
                // All NaNs hash alike
                let bits = if f.is_nan() { f64::NAN.to_bits() } else { f.to_bits() };
                fold64(bits)
            }
            Value::Str(s) => s
                .encode_utf16()
                .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32)),
            Value::List(items) => items
                .iter()
                .fold(1i32, |h, item| h.wrapping_mul(31).wrapping_add(item.hash_code())),
            Value::Object(obj) => fold64(obj.id().raw()),
        }
    }
}

fn fold64(bits: u64) -> i32 {
    (bits ^ (bits >> 32)) as i32
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(i) => write!(f, "{}i32", i),
            Value::I64(i) => write!(f, "{}i64", i),
            Value::F64(x) => write!(f, "{}f64", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(obj) => write!(f, "{}@{}", obj.class().name(), obj.id().raw()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(i) => write!(f, "{}", i),
            Value::I64(i) => write!(f, "{}", i),
            Value::F64(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "{}@{}", obj.class().name(), obj.id().raw()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::I32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::I64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Instance> for Value {
    fn from(obj: Instance) -> Self {
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_hash_code() {
        // 31-multiplier recurrence over UTF-16 units
        assert_eq!(Value::str("").hash_code(), 0);
        assert_eq!(Value::str("a").hash_code(), 97);
        assert_eq!(Value::str("ab").hash_code(), 97 * 31 + 98);
        assert_eq!(Value::str("inner").hash_code(), 100355670);
    }

    #[test]
    fn test_scalar_hash_codes() {
        assert_eq!(Value::Bool(true).hash_code(), 1231);
        assert_eq!(Value::Bool(false).hash_code(), 1237);
        assert_eq!(Value::I32(-7).hash_code(), -7);
        assert_eq!(Value::I64(1).hash_code(), 1);
        assert_eq!(Value::I64(1 << 32).hash_code(), 1);
        assert_eq!(Value::F64(f64::NAN).hash_code(), Value::F64(-f64::NAN).hash_code());
    }

    #[test]
    fn test_list_hash_is_ordered() {
        let a = Value::list(vec![Value::I32(1), Value::I32(2)]);
        let b = Value::list(vec![Value::I32(2), Value::I32(1)]);
        assert_eq!(a.hash_code(), 31 * (31 + 1) + 2);
        assert_ne!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::str("x"), Value::from("x"));
        assert_ne!(Value::I32(1), Value::I64(1));
        assert_eq!(Value::Null, Value::default());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::I32(3).as_i64(), Some(3));
        assert_eq!(Value::I64(3).as_i32(), None);
        assert_eq!(Value::str("hi").as_str(), Some("hi"));
        assert!(Value::Null.is_null());
        assert_eq!(Value::F64(1.5).type_name(), "f64");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::I64(7).to_string(), "7");
        assert_eq!(format!("{:?}", Value::I64(7)), "7i64");
        assert_eq!(Value::list(vec![Value::I32(1), Value::str("a")]).to_string(), "[1, a]");
    }
}
