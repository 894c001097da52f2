//! BOOLEAN type handler.

use crate::registry::{hash_bytes, null_compare, null_compare_not_equals, SqlType};
use crate::value::{Value, ValueData};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use opal_common::types::{TypeId, BOOLEAN_NULL};
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;
use std::cmp::Ordering;

pub(crate) struct BooleanType;

impl BooleanType {
    fn raw(val: &Value) -> i8 {
        match val.data() {
            ValueData::Boolean(v) => *v,
            _ => BOOLEAN_NULL,
        }
    }

    fn compare(left: &Value, right: &Value, op: fn(Ordering) -> bool) -> Result<Value> {
        left.check_comparable(right)?;
        if let Some(null) = null_compare(left, right) {
            return Ok(null);
        }
        Ok(Value::boolean(op(Self::raw(left).cmp(&Self::raw(right)))))
    }
}

impl SqlType for BooleanType {
    fn type_id(&self) -> TypeId {
        TypeId::Boolean
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
        Ok(Value::boolean(Self::raw(left) != Self::raw(right)))
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
        if val.is_null() {
            return "boolean_null".to_string();
        }
        if Self::raw(val) != 0 { "true" } else { "false" }.to_string()
    }

    fn hash(&self, val: &Value) -> Result<u64> {
        Ok(hash_bytes(&[Self::raw(val) as u8]))
    }

    fn serialize_to(&self, val: &Value, out: &mut BytesMut) -> Result<()> {
        out.put_i8(Self::raw(val));
        Ok(())
    }

    fn serialize_into(
        &self,
        val: &Value,
        slot: &mut [u8],
        _pool: Option<&VarlenPool>,
    ) -> Result<()> {
        if slot.is_empty() {
            return Err(OpalError::Truncated { need: 1, have: 0 });
        }
        slot[0] = Self::raw(val) as u8;
        Ok(())
    }

    fn deserialize_from(&self, input: &mut Bytes) -> Result<Value> {
        if input.remaining() < 1 {
            return Err(OpalError::Truncated {
                need: 1,
                have: input.remaining(),
            });
        }
        Ok(Value::from_data(
            TypeId::Boolean,
            ValueData::Boolean(input.get_i8()),
        ))
    }

    fn deserialize_slot(&self, slot: &[u8]) -> Result<Value> {
        if slot.is_empty() {
            return Err(OpalError::Truncated { need: 1, have: 0 });
        }
        Ok(Value::from_data(
            TypeId::Boolean,
            ValueData::Boolean(slot[0] as i8),
        ))
    }

    fn shallow_copy(&self, dest: &mut [u8], src: &[u8], _pool: Option<&VarlenPool>) -> Result<()> {
        if dest.is_empty() || src.is_empty() {
            return Err(OpalError::Truncated { need: 1, have: 0 });
        }
        dest[0] = src[0];
        Ok(())
    }

    fn copy(&self, val: &Value) -> Value {
        val.clone()
    }

    fn cast_as(&self, val: &Value, target: TypeId) -> Result<Value> {
        match target {
            TypeId::Boolean => Ok(val.copy()),
            TypeId::Varchar => {
                if val.is_null() {
                    return Ok(Value::null(TypeId::Varchar));
                }
                Ok(Value::varchar(&self.format(val)))
            }
            _ => Err(OpalError::NotCoercible {
                from: TypeId::Boolean,
                to: target,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_comparisons() {
        let t = Value::boolean(true);
        let f = Value::boolean(false);

        assert!(t.compare_equals(&t).unwrap().is_true());
        assert!(t.compare_equals(&f).unwrap().is_false());
        assert!(t.compare_not_equals(&f).unwrap().is_true());
        assert!(f.compare_less_than(&t).unwrap().is_true());
        assert!(t.compare_greater_than(&f).unwrap().is_true());
        assert!(t.compare_greater_than_equals(&t).unwrap().is_true());
    }

    #[test]
    fn test_boolean_null_propagation() {
        let t = Value::boolean(true);
        let null = Value::null(TypeId::Boolean);

        assert!(t.compare_equals(&null).unwrap().is_null());
        assert!(null.compare_equals(&t).unwrap().is_null());
        assert!(t.compare_less_than(&null).unwrap().is_null());

        // Inequality: NULL right yields NULL, NULL left differs.
        assert!(t.compare_not_equals(&null).unwrap().is_null());
        assert!(null.compare_not_equals(&t).unwrap().is_true());
        assert!(null.compare_not_equals(&null).unwrap().is_null());
    }

    #[test]
    fn test_boolean_mismatch_rejected() {
        let t = Value::boolean(true);
        assert!(t.compare_equals(&Value::integer(1)).is_err());
    }

    #[test]
    fn test_boolean_format() {
        assert_eq!(Value::boolean(true).to_string(), "true");
        assert_eq!(Value::boolean(false).to_string(), "false");
        assert_eq!(Value::null(TypeId::Boolean).to_string(), "boolean_null");
    }

    #[test]
    fn test_boolean_hash_follows_equality() {
        let a = Value::boolean(true);
        let b = Value::boolean(true);
        assert_eq!(a.hash_value().unwrap(), b.hash_value().unwrap());
        assert_ne!(
            a.hash_value().unwrap(),
            Value::boolean(false).hash_value().unwrap()
        );
    }

    #[test]
    fn test_boolean_stream_roundtrip() {
        for v in [Value::boolean(true), Value::boolean(false), Value::null(TypeId::Boolean)] {
            let mut out = BytesMut::new();
            v.serialize_to(&mut out).unwrap();
            let mut input = out.freeze();
            let back = Value::deserialize_from(TypeId::Boolean, &mut input).unwrap();
            if v.is_null() {
                assert!(back.is_null());
            } else {
                assert!(v.compare_equals(&back).unwrap().is_true());
            }
        }
    }

    #[test]
    fn test_boolean_slot_roundtrip() {
        let v = Value::boolean(true);
        let mut slot = [0u8; 1];
        v.serialize_into(&mut slot, None).unwrap();
        let back = Value::deserialize_slot(TypeId::Boolean, &slot).unwrap();
        assert!(v.compare_equals(&back).unwrap().is_true());
    }

    #[test]
    fn test_boolean_cast() {
        let t = Value::boolean(true);
        assert!(t.cast_as(TypeId::Boolean).unwrap().is_true());

        let s = t.cast_as(TypeId::Varchar).unwrap();
        assert_eq!(s.to_string(), "true");

        assert!(Value::null(TypeId::Boolean)
            .cast_as(TypeId::Varchar)
            .unwrap()
            .is_null());
        assert!(matches!(
            t.cast_as(TypeId::Timestamp),
            Err(OpalError::NotCoercible { .. })
        ));
    }

    #[test]
    fn test_boolean_cast_closure() {
        let t = Value::boolean(true);
        let same = t.cast_as(t.type_id()).unwrap();
        assert!(t.compare_equals(&same).unwrap().is_true());
    }
}
