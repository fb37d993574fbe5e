//! Typed property values: the 11 scalar property types and the raw `Bytes`
//! accessor used to read them back out of a decoded record.

use crate::error::{Error, Result};
use std::fmt;

/// The 11 scalar property types a property can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    TinyInt,
    UnsignedTinyInt,
    SmallInt,
    UnsignedSmallInt,
    Integer,
    UnsignedInteger,
    BigInt,
    UnsignedBigInt,
    Real,
    Text,
    Blob,
}

impl PropertyType {
    /// Fixed byte width for fixed-width numeric types; `None` for `Text`/`Blob`.
    pub fn fixed_width(self) -> Option<usize> {
        use PropertyType::*;
        match self {
            TinyInt | UnsignedTinyInt => Some(1),
            SmallInt | UnsignedSmallInt => Some(2),
            Integer | UnsignedInteger => Some(4),
            BigInt | UnsignedBigInt => Some(8),
            Real => Some(8),
            Text | Blob => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        use PropertyType::*;
        match self {
            TinyInt => "TINYINT",
            UnsignedTinyInt => "UNSIGNED_TINYINT",
            SmallInt => "SMALLINT",
            UnsignedSmallInt => "UNSIGNED_SMALLINT",
            Integer => "INTEGER",
            UnsignedInteger => "UNSIGNED_INTEGER",
            BigInt => "BIGINT",
            UnsignedBigInt => "UNSIGNED_BIGINT",
            Real => "REAL",
            Text => "TEXT",
            Blob => "BLOB",
        }
    }

    pub fn parse(s: &str) -> Option<PropertyType> {
        use PropertyType::*;
        Some(match s {
            "TINYINT" => TinyInt,
            "UNSIGNED_TINYINT" => UnsignedTinyInt,
            "SMALLINT" => SmallInt,
            "UNSIGNED_SMALLINT" => UnsignedSmallInt,
            "INTEGER" => Integer,
            "UNSIGNED_INTEGER" => UnsignedInteger,
            "BIGINT" => BigInt,
            "UNSIGNED_BIGINT" => UnsignedBigInt,
            "REAL" => Real,
            "TEXT" => Text,
            "BLOB" => Blob,
            _ => return None,
        })
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw property value as stored in a record: host-native byte order,
/// no type tag of its own (the type lives in the schema catalog).
///
/// Numeric accessors raise [`Error::EmptyPropertyValue`] when the value is
/// unset. `to_text` is the one exception: following the original engine, a
/// missing text value decodes to an empty string rather than raising.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn empty() -> Self {
        Bytes(Vec::new())
    }

    pub fn from_raw(bytes: Vec<u8>) -> Self {
        Bytes(bytes)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.0
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn from_text(s: &str) -> Self {
        Bytes(s.as_bytes().to_vec())
    }

    pub fn from_blob(b: &[u8]) -> Self {
        Bytes(b.to_vec())
    }

    pub fn from_tiny_int(v: i8) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    pub fn from_tiny_int_u(v: u8) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    pub fn from_small_int(v: i16) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    pub fn from_small_int_u(v: u16) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    pub fn from_int(v: i32) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    pub fn from_int_u(v: u32) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    pub fn from_bigint(v: i64) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    pub fn from_bigint_u(v: u64) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    pub fn from_real(v: f64) -> Self {
        Bytes(v.to_ne_bytes().to_vec())
    }

    fn require_len(&self, n: usize) -> Result<&[u8]> {
        if self.0.is_empty() {
            return Err(Error::EmptyPropertyValue);
        }
        if self.0.len() != n {
            return Err(Error::Internal(format!(
                "expected {} byte value, found {}",
                n,
                self.0.len()
            )));
        }
        Ok(&self.0)
    }

    pub fn to_tiny_int(&self) -> Result<i8> {
        let b = self.require_len(1)?;
        Ok(i8::from_ne_bytes([b[0]]))
    }

    pub fn to_tiny_int_u(&self) -> Result<u8> {
        let b = self.require_len(1)?;
        Ok(b[0])
    }

    pub fn to_small_int(&self) -> Result<i16> {
        let b = self.require_len(2)?;
        Ok(i16::from_ne_bytes([b[0], b[1]]))
    }

    pub fn to_small_int_u(&self) -> Result<u16> {
        let b = self.require_len(2)?;
        Ok(u16::from_ne_bytes([b[0], b[1]]))
    }

    pub fn to_int(&self) -> Result<i32> {
        let b = self.require_len(4)?;
        Ok(i32::from_ne_bytes(b.try_into().unwrap()))
    }

    pub fn to_int_u(&self) -> Result<u32> {
        let b = self.require_len(4)?;
        Ok(u32::from_ne_bytes(b.try_into().unwrap()))
    }

    pub fn to_bigint(&self) -> Result<i64> {
        let b = self.require_len(8)?;
        Ok(i64::from_ne_bytes(b.try_into().unwrap()))
    }

    pub fn to_bigint_u(&self) -> Result<u64> {
        let b = self.require_len(8)?;
        Ok(u64::from_ne_bytes(b.try_into().unwrap()))
    }

    pub fn to_real(&self) -> Result<f64> {
        let b = self.require_len(8)?;
        Ok(f64::from_ne_bytes(b.try_into().unwrap()))
    }

    /// Returns an empty string rather than an error when unset, matching
    /// the original engine's `Record::getText`.
    pub fn to_text(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        String::from_utf8_lossy(&self.0).into_owned()
    }

    pub fn to_blob(&self) -> Vec<u8> {
        self.0.clone()
    }
}

/// A decoded, typed value — used by the filter engine's comparators where
/// the scalar kind (not just raw bytes) is needed up front.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    TinyInt(i8),
    UnsignedTinyInt(u8),
    SmallInt(i16),
    UnsignedSmallInt(u16),
    Integer(i32),
    UnsignedInteger(u32),
    BigInt(i64),
    UnsignedBigInt(u64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn decode(ty: PropertyType, bytes: &Bytes) -> Result<Value> {
        Ok(match ty {
            PropertyType::TinyInt => Value::TinyInt(bytes.to_tiny_int()?),
            PropertyType::UnsignedTinyInt => Value::UnsignedTinyInt(bytes.to_tiny_int_u()?),
            PropertyType::SmallInt => Value::SmallInt(bytes.to_small_int()?),
            PropertyType::UnsignedSmallInt => Value::UnsignedSmallInt(bytes.to_small_int_u()?),
            PropertyType::Integer => Value::Integer(bytes.to_int()?),
            PropertyType::UnsignedInteger => Value::UnsignedInteger(bytes.to_int_u()?),
            PropertyType::BigInt => Value::BigInt(bytes.to_bigint()?),
            PropertyType::UnsignedBigInt => Value::UnsignedBigInt(bytes.to_bigint_u()?),
            PropertyType::Real => Value::Real(bytes.to_real()?),
            PropertyType::Text => Value::Text(bytes.to_text()),
            PropertyType::Blob => Value::Blob(bytes.to_blob()),
        })
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::TinyInt(_) => PropertyType::TinyInt,
            Value::UnsignedTinyInt(_) => PropertyType::UnsignedTinyInt,
            Value::SmallInt(_) => PropertyType::SmallInt,
            Value::UnsignedSmallInt(_) => PropertyType::UnsignedSmallInt,
            Value::Integer(_) => PropertyType::Integer,
            Value::UnsignedInteger(_) => PropertyType::UnsignedInteger,
            Value::BigInt(_) => PropertyType::BigInt,
            Value::UnsignedBigInt(_) => PropertyType::UnsignedBigInt,
            Value::Real(_) => PropertyType::Real,
            Value::Text(_) => PropertyType::Text,
            Value::Blob(_) => PropertyType::Blob,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_round_trip() {
        let b = Bytes::from_int(-42);
        assert_eq!(b.to_int().unwrap(), -42);
    }

    #[test]
    fn empty_text_does_not_error() {
        let b = Bytes::empty();
        assert_eq!(b.to_text(), "");
    }

    #[test]
    fn empty_numeric_errors() {
        let b = Bytes::empty();
        assert_eq!(b.to_int().unwrap_err(), Error::EmptyPropertyValue);
    }

    #[test]
    fn value_decode_respects_schema_type() {
        let b = Bytes::from_real(3.5);
        let v = Value::decode(PropertyType::Real, &b).unwrap();
        assert_eq!(v, Value::Real(3.5));
    }
}
