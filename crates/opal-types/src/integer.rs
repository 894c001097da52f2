//! Integer type handlers (TINYINT through BIGINT).

use crate::registry::{
    hash_bytes, null_compare, null_compare_not_equals, numeric_ord, SqlType,
};
use crate::value::{Value, ValueData};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use opal_common::types::TypeId;
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;
use std::cmp::Ordering;

/// One handler instance serves each of the four integer widths; the
/// width is carried in the type id.
pub(crate) struct IntegerType {
    id: TypeId,
}

/// Builds an integer value of the given width from a widened i64,
/// range-checking against the width and excluding the null sentinel.
pub(crate) fn integer_value_of(raw: i64, target: TypeId) -> Result<Value> {
    debug_assert!(target.is_integer());
    match target {
        TypeId::TinyInt if raw > i8::MIN as i64 && raw <= i8::MAX as i64 => {
            Ok(Value::tinyint(raw as i8))
        }
        TypeId::SmallInt if raw > i16::MIN as i64 && raw <= i16::MAX as i64 => {
            Ok(Value::smallint(raw as i16))
        }
        TypeId::Integer if raw > i32::MIN as i64 && raw <= i32::MAX as i64 => {
            Ok(Value::integer(raw as i32))
        }
        TypeId::BigInt if raw > i64::MIN => Ok(Value::bigint(raw)),
        _ => Err(OpalError::ValueOutOfRange { target }),
    }
}

impl IntegerType {
    pub(crate) const fn new(id: TypeId) -> Self {
        Self { id }
    }

    fn width(&self) -> usize {
        match self.id {
            TypeId::TinyInt => 1,
            TypeId::SmallInt => 2,
            TypeId::Integer => 4,
            _ => 8,
        }
    }

    fn null_name(&self) -> &'static str {
        match self.id {
            TypeId::TinyInt => "tinyint_null",
            TypeId::SmallInt => "smallint_null",
            TypeId::Integer => "integer_null",
            _ => "bigint_null",
        }
    }

    fn compare(left: &Value, right: &Value, op: fn(Ordering) -> bool) -> Result<Value> {
        left.check_comparable(right)?;
        if let Some(null) = null_compare(left, right) {
            return Ok(null);
        }
        Ok(Value::boolean(op(numeric_ord(left, right))))
    }
}

impl SqlType for IntegerType {
    fn type_id(&self) -> TypeId {
        self.id
    }

    fn is_inlined(&self, _val: &Value) -> bool {
        true
    }

    fn compare_eq(&self, left: &Value, right: &Value) -> Result<Value> {
        Self::compare(left, right, Ordering::is_eq)
    }

    fn compare_ne(&self, left: &Value, right: &Value) -> Result<Value> {
        left.check_comparable(right)?;
        if let Some(v) = null_compare_not_equals(left, right) {
            return Ok(v);
        }
        Ok(Value::boolean(numeric_ord(left, right).is_ne()))
    }

    fn compare_lt(&self, left: &Value, right: &Value) -> Result<Value> {
        Self::compare(left, right, Ordering::is_lt)
    }

    fn compare_le(&self, left: &Value, right: &Value) -> Result<Value> {
        Self::compare(left, right, Ordering::is_le)
    }

    fn compare_gt(&self, left: &Value, right: &Value) -> Result<Value> {
        Self::compare(left, right, Ordering::is_gt)
    }

    fn compare_ge(&self, left: &Value, right: &Value) -> Result<Value> {
        Self::compare(left, right, Ordering::is_ge)
    }

    fn format(&self, val: &Value) -> String {
        match val.as_i64() {
            Some(v) => v.to_string(),
            None => self.null_name().to_string(),
        }
    }

    fn hash(&self, val: &Value) -> Result<u64> {
        let raw = val.as_i64().unwrap_or(i64::MIN);
        Ok(hash_bytes(&raw.to_le_bytes()))
    }

    fn serialize_to(&self, val: &Value, out: &mut BytesMut) -> Result<()> {
        match *val.data() {
            ValueData::TinyInt(v) => out.put_i8(v),
            ValueData::SmallInt(v) => out.put_i16_le(v),
            ValueData::Integer(v) => out.put_i32_le(v),
            ValueData::BigInt(v) => out.put_i64_le(v),
            _ => {
                return Err(OpalError::UnsupportedOperation {
                    type_id: self.id,
                    op: "serialize",
                })
            }
        }
        Ok(())
    }

    fn serialize_into(
        &self,
        val: &Value,
        slot: &mut [u8],
        _pool: Option<&VarlenPool>,
    ) -> Result<()> {
        let width = self.width();
        if slot.len() < width {
            return Err(OpalError::Truncated {
                need: width,
                have: slot.len(),
            });
        }
        match *val.data() {
            ValueData::TinyInt(v) => slot[..1].copy_from_slice(&v.to_le_bytes()),
            ValueData::SmallInt(v) => slot[..2].copy_from_slice(&v.to_le_bytes()),
            ValueData::Integer(v) => slot[..4].copy_from_slice(&v.to_le_bytes()),
            ValueData::BigInt(v) => slot[..8].copy_from_slice(&v.to_le_bytes()),
            _ => {
                return Err(OpalError::UnsupportedOperation {
                    type_id: self.id,
                    op: "serialize",
                })
            }
        }
        Ok(())
    }

    fn deserialize_from(&self, input: &mut Bytes) -> Result<Value> {
        let width = self.width();
        if input.remaining() < width {
            return Err(OpalError::Truncated {
                need: width,
                have: input.remaining(),
            });
        }
        let data = match self.id {
            TypeId::TinyInt => ValueData::TinyInt(input.get_i8()),
            TypeId::SmallInt => ValueData::SmallInt(input.get_i16_le()),
            TypeId::Integer => ValueData::Integer(input.get_i32_le()),
            _ => ValueData::BigInt(input.get_i64_le()),
        };
        Ok(Value::from_data(self.id, data))
    }

    fn deserialize_slot(&self, slot: &[u8]) -> Result<Value> {
        let width = self.width();
        if slot.len() < width {
            return Err(OpalError::Truncated {
                need: width,
                have: slot.len(),
            });
        }
        let data = match self.id {
            TypeId::TinyInt => ValueData::TinyInt(slot[0] as i8),
            TypeId::SmallInt => ValueData::SmallInt(i16::from_le_bytes([slot[0], slot[1]])),
            TypeId::Integer => {
                ValueData::Integer(i32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]))
            }
            _ => ValueData::BigInt(i64::from_le_bytes([
                slot[0], slot[1], slot[2], slot[3], slot[4], slot[5], slot[6], slot[7],
            ])),
        };
        Ok(Value::from_data(self.id, data))
    }

    fn shallow_copy(&self, dest: &mut [u8], src: &[u8], _pool: Option<&VarlenPool>) -> Result<()> {
        let width = self.width();
        if dest.len() < width || src.len() < width {
            return Err(OpalError::Truncated {
                need: width,
                have: dest.len().min(src.len()),
            });
        }
        dest[..width].copy_from_slice(&src[..width]);
        Ok(())
    }

    fn copy(&self, val: &Value) -> Value {
        val.clone()
    }

    fn cast_as(&self, val: &Value, target: TypeId) -> Result<Value> {
        match target {
            t if t.is_integer() => {
                if val.is_null() {
                    return Ok(Value::null(t));
                }
                let raw = val.as_i64().ok_or(OpalError::UnsupportedOperation {
                    type_id: self.id,
                    op: "cast",
                })?;
                integer_value_of(raw, t)
            }
            TypeId::Decimal => match val.as_i64() {
                Some(raw) => Ok(Value::decimal(raw as f64)),
                None => Ok(Value::null(TypeId::Decimal)),
            },
            TypeId::Varchar => match val.as_i64() {
                Some(raw) => Ok(Value::varchar(&raw.to_string())),
                None => Ok(Value::null(TypeId::Varchar)),
            },
            _ => Err(OpalError::NotCoercible {
                from: self.id,
                to: target,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_comparisons() {
        let a = Value::integer(10);
        let b = Value::integer(20);

        assert!(a.compare_equals(&a).unwrap().is_true());
        assert!(a.compare_equals(&b).unwrap().is_false());
        assert!(a.compare_not_equals(&b).unwrap().is_true());
        assert!(a.compare_less_than(&b).unwrap().is_true());
        assert!(a.compare_less_than_equals(&a).unwrap().is_true());
        assert!(b.compare_greater_than(&a).unwrap().is_true());
        assert!(b.compare_greater_than_equals(&b).unwrap().is_true());
    }

    #[test]
    fn test_cross_width_comparisons() {
        let a = Value::tinyint(5);
        let b = Value::bigint(5);
        let c = Value::smallint(7);

        assert!(a.compare_equals(&b).unwrap().is_true());
        assert!(a.compare_less_than(&c).unwrap().is_true());
        assert!(c.compare_greater_than(&b).unwrap().is_true());
    }

    #[test]
    fn test_integer_decimal_comparison() {
        let a = Value::integer(2);
        let b = Value::decimal(2.5);

        assert!(a.compare_less_than(&b).unwrap().is_true());
        assert!(b.compare_greater_than(&a).unwrap().is_true());
        assert!(a.compare_equals(&Value::decimal(2.0)).unwrap().is_true());
    }

    #[test]
    fn test_integer_null_propagation() {
        let a = Value::integer(10);
        let null = Value::null(TypeId::Integer);

        assert!(a.compare_equals(&null).unwrap().is_null());
        assert!(a.compare_less_than(&null).unwrap().is_null());
        assert!(a.compare_not_equals(&null).unwrap().is_null());
        assert!(null.compare_not_equals(&a).unwrap().is_true());
        assert!(null.compare_not_equals(&null).unwrap().is_null());
    }

    #[test]
    fn test_integer_format() {
        assert_eq!(Value::tinyint(-3).to_string(), "-3");
        assert_eq!(Value::bigint(1_000_000).to_string(), "1000000");
        assert_eq!(Value::null(TypeId::TinyInt).to_string(), "tinyint_null");
        assert_eq!(Value::null(TypeId::Integer).to_string(), "integer_null");
        assert_eq!(Value::null(TypeId::BigInt).to_string(), "bigint_null");
    }

    #[test]
    fn test_integer_hash_follows_equality() {
        let a = Value::integer(77);
        let b = Value::integer(77);
        assert!(a.compare_equals(&b).unwrap().is_true());
        assert_eq!(a.hash_value().unwrap(), b.hash_value().unwrap());
        assert_ne!(
            a.hash_value().unwrap(),
            Value::integer(78).hash_value().unwrap()
        );
    }

    #[test]
    fn test_integer_stream_roundtrip() {
        for v in [
            Value::tinyint(-5),
            Value::smallint(300),
            Value::integer(-70_000),
            Value::bigint(1_234_567_890_123),
            Value::null(TypeId::Integer),
        ] {
            let mut out = BytesMut::new();
            v.serialize_to(&mut out).unwrap();
            let mut input = out.freeze();
            let back = Value::deserialize_from(v.type_id(), &mut input).unwrap();
            if v.is_null() {
                assert!(back.is_null());
            } else {
                assert!(v.compare_equals(&back).unwrap().is_true());
            }
        }
    }

    #[test]
    fn test_integer_slot_roundtrip() {
        let v = Value::integer(-12345);
        let mut slot = [0u8; 4];
        v.serialize_into(&mut slot, None).unwrap();
        let back = Value::deserialize_slot(TypeId::Integer, &slot).unwrap();
        assert!(v.compare_equals(&back).unwrap().is_true());
    }

    #[test]
    fn test_integer_slot_too_small() {
        let v = Value::bigint(1);
        let mut slot = [0u8; 4];
        assert!(matches!(
            v.serialize_into(&mut slot, None),
            Err(OpalError::Truncated { need: 8, have: 4 })
        ));
    }

    #[test]
    fn test_integer_casts() {
        let v = Value::integer(100);

        assert!(v
            .cast_as(TypeId::TinyInt)
            .unwrap()
            .compare_equals(&Value::tinyint(100))
            .unwrap()
            .is_true());
        assert!(v
            .cast_as(TypeId::BigInt)
            .unwrap()
            .compare_equals(&Value::bigint(100))
            .unwrap()
            .is_true());
        assert_eq!(v.cast_as(TypeId::Varchar).unwrap().to_string(), "100");
        assert!(v
            .cast_as(TypeId::Decimal)
            .unwrap()
            .compare_equals(&Value::decimal(100.0))
            .unwrap()
            .is_true());
    }

    #[test]
    fn test_integer_cast_out_of_range() {
        let v = Value::integer(1000);
        assert!(matches!(
            v.cast_as(TypeId::TinyInt),
            Err(OpalError::ValueOutOfRange {
                target: TypeId::TinyInt
            })
        ));
    }

    #[test]
    fn test_integer_cast_not_coercible() {
        let v = Value::integer(1);
        assert!(matches!(
            v.cast_as(TypeId::Timestamp),
            Err(OpalError::NotCoercible { .. })
        ));
    }

    #[test]
    fn test_integer_null_cast() {
        let null = Value::null(TypeId::Integer);
        assert!(null.cast_as(TypeId::BigInt).unwrap().is_null());
        assert!(null.cast_as(TypeId::Varchar).unwrap().is_null());
        assert_eq!(
            null.cast_as(TypeId::BigInt).unwrap().type_id(),
            TypeId::BigInt
        );
    }

    #[test]
    fn test_integer_cast_closure() {
        let v = Value::smallint(-42);
        let same = v.cast_as(v.type_id()).unwrap();
        assert!(v.compare_equals(&same).unwrap().is_true());
    }

    #[test]
    fn test_integer_copy_preserves_equality() {
        let v = Value::bigint(987);
        let c = v.copy();
        assert!(v.compare_equals(&c).unwrap().is_true());
        assert_eq!(v.hash_value().unwrap(), c.hash_value().unwrap());
    }
}
