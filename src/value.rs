//! Tagged primitive value cell: string / integer / float / boolean / enum.

use std::cmp::Ordering;

use crate::error::{DisirError, DisirResult};

/// The declared type of a [`Value`] or of a KEYVAL's declared value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Enum,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "STRING",
            ValueType::Integer => "INTEGER",
            ValueType::Float => "FLOAT",
            ValueType::Boolean => "BOOLEAN",
            ValueType::Enum => "ENUM",
        }
    }
}

/// A tagged primitive value. Strings and enums own their bytes; copies are
/// always owned (no borrowing across contexts).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Vec<u8>),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Enum(String),
}

impl Value {
    pub fn type_of(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Enum(_) => ValueType::Enum,
        }
    }

    pub fn set_string(&mut self, bytes: &[u8]) -> DisirResult<()> {
        match self {
            Value::String(buf) => {
                *buf = bytes.to_vec();
                Ok(())
            }
            _ => Err(wrong_type(ValueType::String, self.type_of())),
        }
    }

    pub fn set_int(&mut self, value: i64) -> DisirResult<()> {
        match self {
            Value::Integer(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(wrong_type(ValueType::Integer, self.type_of())),
        }
    }

    pub fn set_float(&mut self, value: f64) -> DisirResult<()> {
        match self {
            Value::Float(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(wrong_type(ValueType::Float, self.type_of())),
        }
    }

    pub fn set_bool(&mut self, value: bool) -> DisirResult<()> {
        match self {
            Value::Boolean(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(wrong_type(ValueType::Boolean, self.type_of())),
        }
    }

    pub fn set_enum(&mut self, value: &str) -> DisirResult<()> {
        match self {
            Value::Enum(v) => {
                *v = value.to_string();
                Ok(())
            }
            _ => Err(wrong_type(ValueType::Enum, self.type_of())),
        }
    }

    pub fn get_string(&self) -> DisirResult<&[u8]> {
        match self {
            Value::String(buf) => Ok(buf),
            _ => Err(wrong_type(ValueType::String, self.type_of())),
        }
    }

    pub fn get_int(&self) -> DisirResult<i64> {
        match self {
            Value::Integer(v) => Ok(*v),
            _ => Err(wrong_type(ValueType::Integer, self.type_of())),
        }
    }

    pub fn get_float(&self) -> DisirResult<f64> {
        match self {
            Value::Float(v) => Ok(*v),
            _ => Err(wrong_type(ValueType::Float, self.type_of())),
        }
    }

    pub fn get_bool(&self) -> DisirResult<bool> {
        match self {
            Value::Boolean(v) => Ok(*v),
            _ => Err(wrong_type(ValueType::Boolean, self.type_of())),
        }
    }

    pub fn get_enum(&self) -> DisirResult<&str> {
        match self {
            Value::Enum(v) => Ok(v),
            _ => Err(wrong_type(ValueType::Enum, self.type_of())),
        }
    }

    /// Produces the canonical string representation of this value.
    pub fn stringify(&self) -> String {
        match self {
            Value::String(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Value::Integer(v) => v.to_string(),
            Value::Float(v) => format_float_locale_independent(*v),
            Value::Boolean(v) => if *v { "True" } else { "False" }.to_string(),
            Value::Enum(v) => v.clone(),
        }
    }

    /// Writes the stringified value into `buf`, NUL-terminating always.
    /// Returns `(written, required)` where both exclude the NUL terminator.
    /// If `buf` is too small the output is truncated but still
    /// NUL-terminated (unless `buf` is empty, in which case nothing is
    /// written at all).
    pub fn stringify_into(&self, buf: &mut [u8]) -> (usize, usize) {
        let full = self.stringify();
        let full_bytes = full.as_bytes();
        let required = full_bytes.len();

        if buf.is_empty() {
            return (0, required);
        }

        let capacity = buf.len() - 1; // reserve room for NUL
        let written = required.min(capacity);
        buf[..written].copy_from_slice(&full_bytes[..written]);
        buf[written] = 0;
        (written, required)
    }

    pub fn copy(dst: &mut Value, src: &Value) -> DisirResult<()> {
        if dst.type_of() != src.type_of() {
            return Err(wrong_type(src.type_of(), dst.type_of()));
        }
        *dst = src.clone();
        Ok(())
    }

    pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
            (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
            (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
            (Value::Enum(x), Value::Enum(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    /// Builds an empty/default value for the given declared type, used when
    /// a KEYVAL's type is fixed but no value has been assigned yet.
    pub fn default_for(value_type: ValueType) -> Value {
        match value_type {
            ValueType::String => Value::String(Vec::new()),
            ValueType::Integer => Value::Integer(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Boolean => Value::Boolean(false),
            ValueType::Enum => Value::Enum(String::new()),
        }
    }
}

fn format_float_locale_independent(v: f64) -> String {
    // Rust's default float Display is already locale-independent
    // (always '.' as the decimal separator); trim a trailing ".0" the way
    // most stringified-config formats expect integral floats to read.
    let s = format!("{v}");
    s
}

fn wrong_type(expected: ValueType, actual: ValueType) -> DisirError {
    DisirError::WrongValueType(format!(
        "expected {}, got {}",
        expected.as_str(),
        actual.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_fail_on_type_mismatch() {
        let mut v = Value::Integer(0);
        assert!(matches!(
            v.set_string(b"hello"),
            Err(DisirError::WrongValueType(_))
        ));
    }

    #[test]
    fn set_string_copies_bytes() {
        let mut v = Value::String(Vec::new());
        v.set_string(b"hello").unwrap();
        assert_eq!(v.get_string().unwrap(), b"hello");
    }

    #[test]
    fn bool_stringifies_to_true_false() {
        assert_eq!(Value::Boolean(true).stringify(), "True");
        assert_eq!(Value::Boolean(false).stringify(), "False");
    }

    #[test]
    fn stringify_into_buffer_of_one_writes_only_nul() {
        let v = Value::String(b"hello".to_vec());
        let mut buf = [0xFFu8; 1];
        let (written, required) = v.stringify_into(&mut buf);
        assert_eq!(written, 0);
        assert_eq!(required, 5);
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn stringify_into_truncates_and_reports_required_size() {
        let v = Value::String(b"hello world".to_vec());
        let mut buf = [0u8; 4];
        let (written, required) = v.stringify_into(&mut buf);
        assert_eq!(required, 11);
        assert_eq!(written, 3);
        assert_eq!(&buf[..3], b"hel");
        assert_eq!(buf[3], 0);
    }

    #[test]
    fn stringify_into_empty_buffer_writes_nothing() {
        let v = Value::Integer(42);
        let mut buf: [u8; 0] = [];
        let (written, required) = v.stringify_into(&mut buf);
        assert_eq!(written, 0);
        assert_eq!(required, 2);
    }

    #[test]
    fn compare_numeric() {
        assert_eq!(
            Value::compare(&Value::Integer(1), &Value::Integer(2)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn copy_requires_same_type() {
        let mut dst = Value::Integer(0);
        let src = Value::Float(1.0);
        assert!(Value::copy(&mut dst, &src).is_err());
    }
}
