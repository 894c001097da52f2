//! Tagged SQL values.

use crate::registry::type_of;
use bytes::{Bytes, BytesMut};
use opal_common::types::{
    TypeId, BIGINT_NULL, BOOLEAN_NULL, DATE_NULL, DECIMAL_NULL, INTEGER_NULL, SMALLINT_NULL,
    TIMESTAMP_NULL, TINYINT_NULL, VARLEN_MAX_LEN,
};
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;
use std::sync::Arc;

/// A single SQL value: a type id plus its payload.
///
/// Fixed-width payloads are inlined scalars; NULL is encoded as the
/// type's sentinel value. Variable-length payloads are a `(data, len)`
/// pair whose bytes live in caller memory, pool memory, or a buffer
/// owned by this value. Ownership of pool memory is conveyed by the
/// pool's reference count, never by the `Value` itself.
///
/// All typed operations (comparison, hashing, casting, serialization)
/// dispatch through the per-type registry.
#[derive(Clone, Debug)]
pub struct Value {
    type_id: TypeId,
    data: ValueData,
}

#[derive(Clone, Debug)]
pub(crate) enum ValueData {
    Boolean(i8),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Decimal(f64),
    Timestamp(u64),
    Date(u32),
    Varlen(Varlen),
}

/// Variable-length payload: a byte range plus its length.
///
/// `len == VARLEN_MAX_LEN` marks SQL NULL (no data) or the +infinity
/// bound used for index key comparisons (data marker present).
#[derive(Clone, Debug)]
pub(crate) struct Varlen {
    pub(crate) data: VarlenData,
    pub(crate) len: u32,
}

#[derive(Clone, Debug)]
pub(crate) enum VarlenData {
    /// SQL NULL.
    Null,
    /// The +infinity length bound.
    Max,
    /// Bytes owned by this value.
    Owned(Arc<[u8]>),
    /// Borrowed view into caller or pool memory.
    View(*const u8),
}

impl Varlen {
    pub(crate) fn bytes(&self) -> &[u8] {
        match &self.data {
            VarlenData::Null | VarlenData::Max => &[],
            VarlenData::Owned(b) => &b[..self.len as usize],
            // SAFETY: view values are constructed from a pointer that
            // stays readable for `len` bytes while the backing storage
            // (caller memory or a pool block) is alive; keeping it
            // alive is the constructor caller's obligation.
            VarlenData::View(p) => unsafe { std::slice::from_raw_parts(*p, self.len as usize) },
        }
    }
}

impl Value {
    /// Creates a BOOLEAN value.
    pub fn boolean(v: bool) -> Value {
        Value::from_data(TypeId::Boolean, ValueData::Boolean(v as i8))
    }

    /// Creates a TINYINT value. The sentinel `TINYINT_NULL` is NULL.
    pub fn tinyint(v: i8) -> Value {
        Value::from_data(TypeId::TinyInt, ValueData::TinyInt(v))
    }

    /// Creates a SMALLINT value.
    pub fn smallint(v: i16) -> Value {
        Value::from_data(TypeId::SmallInt, ValueData::SmallInt(v))
    }

    /// Creates an INTEGER value.
    pub fn integer(v: i32) -> Value {
        Value::from_data(TypeId::Integer, ValueData::Integer(v))
    }

    /// Creates a BIGINT value.
    pub fn bigint(v: i64) -> Value {
        Value::from_data(TypeId::BigInt, ValueData::BigInt(v))
    }

    /// Creates a DECIMAL value.
    pub fn decimal(v: f64) -> Value {
        Value::from_data(TypeId::Decimal, ValueData::Decimal(v))
    }

    /// Creates a TIMESTAMP value (microseconds since the Unix epoch).
    pub fn timestamp(v: u64) -> Value {
        Value::from_data(TypeId::Timestamp, ValueData::Timestamp(v))
    }

    /// Creates a DATE value (days since the Unix epoch).
    pub fn date(v: u32) -> Value {
        Value::from_data(TypeId::Date, ValueData::Date(v))
    }

    /// Creates a VARCHAR value owning a copy of `s`.
    ///
    /// Storage carries a trailing NUL terminator which is counted in
    /// the length but is not part of the semantic value.
    pub fn varchar(s: &str) -> Value {
        Value::varchar_from_bytes(s.as_bytes())
    }

    /// Creates a VARBINARY value owning a copy of `bytes`.
    pub fn varbinary(bytes: &[u8]) -> Value {
        Value::from_data(
            TypeId::Varbinary,
            ValueData::Varlen(Varlen {
                data: VarlenData::Owned(bytes.into()),
                len: bytes.len() as u32,
            }),
        )
    }

    /// Creates the +infinity bound for index key comparisons of the
    /// given variable-length type.
    pub fn varlen_max(type_id: TypeId) -> Value {
        debug_assert!(type_id.is_varlen());
        Value::from_data(
            type_id,
            ValueData::Varlen(Varlen {
                data: VarlenData::Max,
                len: VARLEN_MAX_LEN,
            }),
        )
    }

    /// Creates the SQL NULL of the given type.
    pub fn null(type_id: TypeId) -> Value {
        let data = match type_id {
            TypeId::Boolean => ValueData::Boolean(BOOLEAN_NULL),
            TypeId::TinyInt => ValueData::TinyInt(TINYINT_NULL),
            TypeId::SmallInt => ValueData::SmallInt(SMALLINT_NULL),
            TypeId::Integer => ValueData::Integer(INTEGER_NULL),
            TypeId::BigInt => ValueData::BigInt(BIGINT_NULL),
            TypeId::Decimal => ValueData::Decimal(DECIMAL_NULL),
            TypeId::Timestamp => ValueData::Timestamp(TIMESTAMP_NULL),
            TypeId::Date => ValueData::Date(DATE_NULL),
            TypeId::Varchar | TypeId::Varbinary | TypeId::Array | TypeId::Invalid => {
                ValueData::Varlen(Varlen {
                    data: VarlenData::Null,
                    len: VARLEN_MAX_LEN,
                })
            }
        };
        Value::from_data(type_id, data)
    }

    pub(crate) fn from_data(type_id: TypeId, data: ValueData) -> Value {
        Value { type_id, data }
    }

    /// VARCHAR from raw bytes, appending the NUL terminator.
    pub(crate) fn varchar_from_bytes(bytes: &[u8]) -> Value {
        let mut storage = Vec::with_capacity(bytes.len() + 1);
        storage.extend_from_slice(bytes);
        storage.push(0);
        let len = storage.len() as u32;
        Value::from_data(
            TypeId::Varchar,
            ValueData::Varlen(Varlen {
                data: VarlenData::Owned(storage.into()),
                len,
            }),
        )
    }

    /// Variable-length value owning `bytes`, with an explicit length.
    pub(crate) fn varlen_owned(type_id: TypeId, bytes: Arc<[u8]>, len: u32) -> Value {
        debug_assert!(bytes.len() >= len as usize);
        Value::from_data(
            type_id,
            ValueData::Varlen(Varlen {
                data: VarlenData::Owned(bytes),
                len,
            }),
        )
    }

    /// Variable-length value viewing `len` bytes at `ptr` without
    /// taking ownership or a reference count.
    ///
    /// The caller keeps the backing storage alive for the lifetime of
    /// the returned value.
    pub(crate) fn varlen_view(type_id: TypeId, ptr: *const u8, len: u32) -> Value {
        Value::from_data(
            type_id,
            ValueData::Varlen(Varlen {
                data: VarlenData::View(ptr),
                len,
            }),
        )
    }

    /// Returns the type id of this value.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn data(&self) -> &ValueData {
        &self.data
    }

    /// Returns true if this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        match &self.data {
            ValueData::Boolean(v) => *v == BOOLEAN_NULL,
            ValueData::TinyInt(v) => *v == TINYINT_NULL,
            ValueData::SmallInt(v) => *v == SMALLINT_NULL,
            ValueData::Integer(v) => *v == INTEGER_NULL,
            ValueData::BigInt(v) => *v == BIGINT_NULL,
            ValueData::Decimal(v) => *v == DECIMAL_NULL,
            ValueData::Timestamp(v) => *v == TIMESTAMP_NULL,
            ValueData::Date(v) => *v == DATE_NULL,
            ValueData::Varlen(v) => matches!(v.data, VarlenData::Null),
        }
    }

    /// Returns true if this is the BOOLEAN value TRUE.
    pub fn is_true(&self) -> bool {
        matches!(self.data, ValueData::Boolean(1))
    }

    /// Returns true if this is the BOOLEAN value FALSE.
    pub fn is_false(&self) -> bool {
        matches!(self.data, ValueData::Boolean(0))
    }

    /// Returns the BOOLEAN payload, or None for NULL or non-boolean
    /// values.
    pub fn as_boolean(&self) -> Option<bool> {
        match self.data {
            ValueData::Boolean(v) if v != BOOLEAN_NULL => Some(v != 0),
            _ => None,
        }
    }

    /// Returns the TIMESTAMP payload, or None for NULL or
    /// non-timestamp values.
    pub fn as_timestamp(&self) -> Option<u64> {
        match self.data {
            ValueData::Timestamp(v) if v != TIMESTAMP_NULL => Some(v),
            _ => None,
        }
    }

    /// Widens any non-null integer payload to i64.
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self.data {
            ValueData::TinyInt(v) if v != TINYINT_NULL => Some(v as i64),
            ValueData::SmallInt(v) if v != SMALLINT_NULL => Some(v as i64),
            ValueData::Integer(v) if v != INTEGER_NULL => Some(v as i64),
            ValueData::BigInt(v) if v != BIGINT_NULL => Some(v),
            _ => None,
        }
    }

    /// Widens any non-null numeric payload to f64.
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self.data {
            ValueData::Decimal(v) if v != DECIMAL_NULL => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Raw byte range of a variable-length value. Empty for NULL, the
    /// length sentinel, and non-varlen values.
    pub fn varlen_bytes(&self) -> &[u8] {
        match &self.data {
            ValueData::Varlen(v) => v.bytes(),
            _ => &[],
        }
    }

    /// Length field of a variable-length value; `VARLEN_MAX_LEN` marks
    /// NULL and the +infinity bound. Returns 0 for non-varlen values.
    pub fn varlen_len(&self) -> u32 {
        match &self.data {
            ValueData::Varlen(v) => v.len,
            _ => 0,
        }
    }

    /// Verifies that `other` can be compared against this value.
    ///
    /// Values of the same type are always comparable, numeric types
    /// are comparable with each other, and VARCHAR compares against
    /// VARBINARY as raw bytes.
    pub fn check_comparable(&self, other: &Value) -> Result<()> {
        let comparable = self.type_id == other.type_id
            || (self.type_id.is_numeric() && other.type_id.is_numeric())
            || (matches!(self.type_id, TypeId::Varchar | TypeId::Varbinary)
                && matches!(other.type_id, TypeId::Varchar | TypeId::Varbinary));
        if comparable {
            Ok(())
        } else {
            Err(OpalError::TypeMismatch {
                left: self.type_id,
                right: other.type_id,
            })
        }
    }

    /// SQL equality; the result is a BOOLEAN value, NULL when an
    /// operand is NULL.
    pub fn compare_equals(&self, other: &Value) -> Result<Value> {
        type_of(self.type_id)?.compare_eq(self, other)
    }

    /// SQL inequality. A NULL right operand yields NULL; a NULL left
    /// operand differs from any non-null right operand.
    pub fn compare_not_equals(&self, other: &Value) -> Result<Value> {
        type_of(self.type_id)?.compare_ne(self, other)
    }

    /// SQL less-than.
    pub fn compare_less_than(&self, other: &Value) -> Result<Value> {
        type_of(self.type_id)?.compare_lt(self, other)
    }

    /// SQL less-than-or-equal.
    pub fn compare_less_than_equals(&self, other: &Value) -> Result<Value> {
        type_of(self.type_id)?.compare_le(self, other)
    }

    /// SQL greater-than.
    pub fn compare_greater_than(&self, other: &Value) -> Result<Value> {
        type_of(self.type_id)?.compare_gt(self, other)
    }

    /// SQL greater-than-or-equal.
    pub fn compare_greater_than_equals(&self, other: &Value) -> Result<Value> {
        type_of(self.type_id)?.compare_ge(self, other)
    }

    /// Returns true if the payload fits in a fixed tuple slot.
    pub fn is_inlined(&self) -> bool {
        type_of(self.type_id)
            .map(|t| t.is_inlined(self))
            .unwrap_or(false)
    }

    /// Hashes this value. Values equal under [`compare_equals`] hash
    /// to the same result.
    ///
    /// [`compare_equals`]: Value::compare_equals
    pub fn hash_value(&self) -> Result<u64> {
        type_of(self.type_id)?.hash(self)
    }

    /// Mixes this value's hash into `seed`.
    pub fn hash_combine(&self, seed: &mut u64) -> Result<()> {
        type_of(self.type_id)?.hash_combine(self, seed)
    }

    /// Creates a copy equal under [`compare_equals`]. Variable-length
    /// views stay shallow; no reference count is taken.
    ///
    /// [`compare_equals`]: Value::compare_equals
    pub fn copy(&self) -> Value {
        type_of(self.type_id)
            .map(|t| t.copy(self))
            .unwrap_or_else(|_| self.clone())
    }

    /// Converts this value to the target type.
    pub fn cast_as(&self, target: TypeId) -> Result<Value> {
        type_of(self.type_id)?.cast_as(self, target)
    }

    /// Serializes this value to a byte stream.
    pub fn serialize_to(&self, out: &mut BytesMut) -> Result<()> {
        type_of(self.type_id)?.serialize_to(self, out)
    }

    /// Serializes this value into a fixed tuple slot, drawing
    /// variable-length storage from `pool` when one is given.
    pub fn serialize_into(&self, slot: &mut [u8], pool: Option<&VarlenPool>) -> Result<()> {
        type_of(self.type_id)?.serialize_into(self, slot, pool)
    }

    /// Deserializes a value of the given type from a byte stream.
    pub fn deserialize_from(type_id: TypeId, input: &mut Bytes) -> Result<Value> {
        type_of(type_id)?.deserialize_from(input)
    }

    /// Deserializes a value of the given type from a fixed tuple slot.
    pub fn deserialize_slot(type_id: TypeId, slot: &[u8]) -> Result<Value> {
        type_of(type_id)?.deserialize_slot(slot)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match type_of(self.type_id) {
            Ok(t) => write!(f, "{}", t.format(self)),
            Err(_) => write!(f, "invalid"),
        }
    }
}
