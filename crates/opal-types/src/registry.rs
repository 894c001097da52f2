//! Per-type operation dispatch.

use crate::array::ArrayType;
use crate::boolean::BooleanType;
use crate::date::DateType;
use crate::decimal::DecimalType;
use crate::integer::IntegerType;
use crate::timestamp::TimestampType;
use crate::value::{Value, ValueData};
use crate::varlen::VarlenType;
use bytes::{Bytes, BytesMut};
use opal_common::types::TypeId;
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;
use std::cmp::Ordering;

/// The closed operation set every SQL type provides.
///
/// Handlers are stateless; all mutable state lives in [`Value`].
/// Comparison results are BOOLEAN values, NULL when three-valued logic
/// requires it. Unsupported operations fail with a typed error.
pub trait SqlType: Send + Sync {
    /// The type id this handler serves.
    fn type_id(&self) -> TypeId;

    /// True iff the payload fits in a fixed tuple slot.
    fn is_inlined(&self, val: &Value) -> bool;

    fn compare_eq(&self, left: &Value, right: &Value) -> Result<Value>;
    fn compare_ne(&self, left: &Value, right: &Value) -> Result<Value>;
    fn compare_lt(&self, left: &Value, right: &Value) -> Result<Value>;
    fn compare_le(&self, left: &Value, right: &Value) -> Result<Value>;
    fn compare_gt(&self, left: &Value, right: &Value) -> Result<Value>;
    fn compare_ge(&self, left: &Value, right: &Value) -> Result<Value>;

    /// Debug/cast form; NULL maps to a type-specific sentinel string.
    fn format(&self, val: &Value) -> String;

    /// Hashes the value. Equality under `compare_eq` implies equal
    /// hashes.
    fn hash(&self, val: &Value) -> Result<u64>;

    /// Mixes the value's hash into `seed`.
    fn hash_combine(&self, val: &Value, seed: &mut u64) -> Result<()> {
        let h = self.hash(val)?;
        combine_hash(seed, h);
        Ok(())
    }

    /// Writes the value to a byte stream.
    fn serialize_to(&self, val: &Value, out: &mut BytesMut) -> Result<()>;

    /// Writes the value into a fixed tuple slot. Variable-length
    /// payloads draw their backing buffer from `pool` when one is
    /// given, from the heap otherwise.
    fn serialize_into(&self, val: &Value, slot: &mut [u8], pool: Option<&VarlenPool>)
        -> Result<()>;

    /// Reads a value from a byte stream.
    fn deserialize_from(&self, input: &mut Bytes) -> Result<Value>;

    /// Reads a value from a fixed tuple slot. Variable-length values
    /// come back as borrowed views; no reference count is taken.
    fn deserialize_slot(&self, slot: &[u8]) -> Result<Value>;

    /// Copies a serialized slot to another slot. For pool-allocated
    /// variable-length payloads this copies the pointer word and bumps
    /// the pool reference count.
    fn shallow_copy(&self, dest: &mut [u8], src: &[u8], pool: Option<&VarlenPool>) -> Result<()>;

    /// Creates a copy equal under `compare_eq`.
    fn copy(&self, val: &Value) -> Value;

    /// Converts the value to the target type; disallowed targets fail
    /// with `NotCoercible`.
    fn cast_as(&self, val: &Value, target: TypeId) -> Result<Value>;
}

/// Looks up the handler for a type id.
///
/// The registry is built once from static, stateless handler instances
/// and never mutated, so reads require no synchronization.
pub fn type_of(type_id: TypeId) -> Result<&'static dyn SqlType> {
    static BOOLEAN: BooleanType = BooleanType;
    static TINYINT: IntegerType = IntegerType::new(TypeId::TinyInt);
    static SMALLINT: IntegerType = IntegerType::new(TypeId::SmallInt);
    static INTEGER: IntegerType = IntegerType::new(TypeId::Integer);
    static BIGINT: IntegerType = IntegerType::new(TypeId::BigInt);
    static DECIMAL: DecimalType = DecimalType;
    static TIMESTAMP: TimestampType = TimestampType;
    static DATE: DateType = DateType;
    static VARCHAR: VarlenType = VarlenType::new(TypeId::Varchar);
    static VARBINARY: VarlenType = VarlenType::new(TypeId::Varbinary);
    static ARRAY: ArrayType = ArrayType;

    Ok(match type_id {
        TypeId::Boolean => &BOOLEAN,
        TypeId::TinyInt => &TINYINT,
        TypeId::SmallInt => &SMALLINT,
        TypeId::Integer => &INTEGER,
        TypeId::BigInt => &BIGINT,
        TypeId::Decimal => &DECIMAL,
        TypeId::Timestamp => &TIMESTAMP,
        TypeId::Date => &DATE,
        TypeId::Varchar => &VARCHAR,
        TypeId::Varbinary => &VARBINARY,
        TypeId::Array => &ARRAY,
        TypeId::Invalid => return Err(OpalError::UnsupportedType(type_id)),
    })
}

/// Mixes `hash` into `seed`.
pub(crate) fn combine_hash(seed: &mut u64, hash: u64) {
    *seed ^= hash
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

/// Hashes a byte range.
pub(crate) fn hash_bytes(bytes: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Three-valued prelude for symmetric comparison operators: a NULL on
/// either side yields a NULL BOOLEAN.
pub(crate) fn null_compare(left: &Value, right: &Value) -> Option<Value> {
    if left.is_null() || right.is_null() {
        Some(Value::null(TypeId::Boolean))
    } else {
        None
    }
}

/// Inequality prelude for fixed-width types: a NULL right operand
/// yields NULL; a NULL left operand differs from any non-null right
/// operand.
pub(crate) fn null_compare_not_equals(left: &Value, right: &Value) -> Option<Value> {
    if right.is_null() {
        Some(Value::null(TypeId::Boolean))
    } else if left.is_null() {
        Some(Value::boolean(true))
    } else {
        None
    }
}

/// Orders two non-null numeric values, widening to f64 when a DECIMAL
/// operand is involved.
pub(crate) fn numeric_ord(left: &Value, right: &Value) -> Ordering {
    debug_assert!(!left.is_null() && !right.is_null());
    let decimal = matches!(left.data(), ValueData::Decimal(_))
        || matches!(right.data(), ValueData::Decimal(_));
    if decimal {
        let (a, b) = (
            left.as_f64().unwrap_or(f64::NAN),
            right.as_f64().unwrap_or(f64::NAN),
        );
        a.total_cmp(&b)
    } else {
        let (a, b) = (
            left.as_i64().unwrap_or(i64::MIN),
            right.as_i64().unwrap_or(i64::MIN),
        );
        a.cmp(&b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_all_concrete_types() {
        for type_id in [
            TypeId::Boolean,
            TypeId::TinyInt,
            TypeId::SmallInt,
            TypeId::Integer,
            TypeId::BigInt,
            TypeId::Decimal,
            TypeId::Timestamp,
            TypeId::Date,
            TypeId::Varchar,
            TypeId::Varbinary,
            TypeId::Array,
        ] {
            let handler = type_of(type_id).unwrap();
            assert_eq!(handler.type_id(), type_id);
        }
    }

    #[test]
    fn test_registry_rejects_invalid() {
        assert!(matches!(
            type_of(TypeId::Invalid),
            Err(OpalError::UnsupportedType(TypeId::Invalid))
        ));
    }

    #[test]
    fn test_registry_returns_stable_handles() {
        let a = type_of(TypeId::Integer).unwrap() as *const dyn SqlType;
        let b = type_of(TypeId::Integer).unwrap() as *const dyn SqlType;
        assert_eq!(a as *const u8, b as *const u8);
    }

    #[test]
    fn test_combine_hash_mixes_seed() {
        let mut seed = 0u64;
        combine_hash(&mut seed, 1234);
        let once = seed;
        combine_hash(&mut seed, 1234);
        assert_ne!(seed, once);
        assert_ne!(once, 0);
    }

    #[test]
    fn test_hash_bytes_is_deterministic() {
        assert_eq!(hash_bytes(b"abc"), hash_bytes(b"abc"));
        assert_ne!(hash_bytes(b"abc"), hash_bytes(b"abd"));
    }

    #[test]
    fn test_numeric_ord_widens_to_decimal() {
        let a = Value::integer(2);
        let b = Value::decimal(2.5);
        assert_eq!(numeric_ord(&a, &b), Ordering::Less);
        assert_eq!(numeric_ord(&b, &a), Ordering::Greater);
        assert_eq!(numeric_ord(&a, &Value::bigint(2)), Ordering::Equal);
    }
}
