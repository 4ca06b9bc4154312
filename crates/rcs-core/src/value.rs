//! Register and flag values exposed by name.

use std::fmt;

use thiserror::Error;

/// Error for register and flag access by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("no such register: {0}")]
    NoSuchRegister(String),
    #[error("no such flag: {0}")]
    NoSuchFlag(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// A register or flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
}

impl Value {
    /// Widen to an unsigned integer.
    #[must_use]
    pub fn as_usize(self) -> usize {
        match self {
            Value::Bool(v) => usize::from(v),
            Value::U8(v) => usize::from(v),
            Value::U16(v) => usize::from(v),
        }
    }

    /// Narrow an integer into the same variant as `self`, rejecting
    /// values that do not fit.
    pub fn with_usize(self, v: usize) -> Result<Value, ValueError> {
        match self {
            Value::Bool(_) => match v {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                _ => Err(ValueError::InvalidValue(v.to_string())),
            },
            Value::U8(_) => u8::try_from(v)
                .map(Value::U8)
                .map_err(|_| ValueError::InvalidValue(format!("${v:x}"))),
            Value::U16(_) => u16::try_from(v)
                .map(Value::U16)
                .map_err(|_| ValueError::InvalidValue(format!("${v:x}"))),
        }
    }
}

/// Narrow an address or value to 8 bits, rejecting overflow.
pub fn narrow8(value: usize) -> Result<u8, ValueError> {
    u8::try_from(value).map_err(|_| ValueError::InvalidValue(format!("${value:x}")))
}

/// Narrow an address or value to 16 bits, rejecting overflow.
pub fn narrow16(value: usize) -> Result<u16, ValueError> {
    u16::try_from(value).map_err(|_| ValueError::InvalidValue(format!("${value:x}")))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:02x}"),
            Value::U16(v) => write!(f, "{v:04x}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}
