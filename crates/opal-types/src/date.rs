//! DATE type handler.
//!
//! Dates are days since the Unix epoch, stored as u32 with `DATE_NULL`
//! (the maximum value) marking SQL NULL.

use crate::registry::{hash_bytes, null_compare, null_compare_not_equals, SqlType};
use crate::value::{Value, ValueData};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{Days, NaiveDate};
use opal_common::types::{TypeId, DATE_NULL};
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;
use std::cmp::Ordering;

pub(crate) struct DateType;

impl DateType {
    fn raw(val: &Value) -> u32 {
        match val.data() {
            ValueData::Date(v) => *v,
            _ => DATE_NULL,
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

impl SqlType for DateType {
    fn type_id(&self) -> TypeId {
        TypeId::Date
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
            return "date_null".to_string();
        }
        let raw = Self::raw(val);
        let date = NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_days(Days::new(raw as u64)));
        match date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => raw.to_string(),
        }
    }

    fn hash(&self, val: &Value) -> Result<u64> {
        Ok(hash_bytes(&Self::raw(val).to_le_bytes()))
    }

    fn serialize_to(&self, val: &Value, out: &mut BytesMut) -> Result<()> {
        out.put_u32_le(Self::raw(val));
        Ok(())
    }

    fn serialize_into(
        &self,
        val: &Value,
        slot: &mut [u8],
        _pool: Option<&VarlenPool>,
    ) -> Result<()> {
        if slot.len() < 4 {
            return Err(OpalError::Truncated {
                need: 4,
                have: slot.len(),
            });
        }
        slot[..4].copy_from_slice(&Self::raw(val).to_le_bytes());
        Ok(())
    }

    fn deserialize_from(&self, input: &mut Bytes) -> Result<Value> {
        if input.remaining() < 4 {
            return Err(OpalError::Truncated {
                need: 4,
                have: input.remaining(),
            });
        }
        Ok(Value::from_data(
            TypeId::Date,
            ValueData::Date(input.get_u32_le()),
        ))
    }

    fn deserialize_slot(&self, slot: &[u8]) -> Result<Value> {
        if slot.len() < 4 {
            return Err(OpalError::Truncated {
                need: 4,
                have: slot.len(),
            });
        }
        let raw = u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
        Ok(Value::from_data(TypeId::Date, ValueData::Date(raw)))
    }

    fn shallow_copy(&self, dest: &mut [u8], src: &[u8], _pool: Option<&VarlenPool>) -> Result<()> {
        if dest.len() < 4 || src.len() < 4 {
            return Err(OpalError::Truncated {
                need: 4,
                have: dest.len().min(src.len()),
            });
        }
        dest[..4].copy_from_slice(&src[..4]);
        Ok(())
    }

    fn copy(&self, val: &Value) -> Value {
        val.clone()
    }

    fn cast_as(&self, val: &Value, target: TypeId) -> Result<Value> {
        match target {
            TypeId::Date => Ok(val.copy()),
            TypeId::Varchar => {
                if val.is_null() {
                    return Ok(Value::null(TypeId::Varchar));
                }
                Ok(Value::varchar(&self.format(val)))
            }
            _ => Err(OpalError::NotCoercible {
                from: TypeId::Date,
                to: target,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_comparisons() {
        let a = Value::date(100);
        let b = Value::date(200);

        assert!(a.compare_less_than(&b).unwrap().is_true());
        assert!(a.compare_equals(&a).unwrap().is_true());
        assert!(b.compare_greater_than_equals(&a).unwrap().is_true());
    }

    #[test]
    fn test_date_null_propagation() {
        let a = Value::date(100);
        let null = Value::null(TypeId::Date);

        assert!(a.compare_equals(&null).unwrap().is_null());
        assert!(a.compare_not_equals(&null).unwrap().is_null());
        assert!(null.compare_not_equals(&a).unwrap().is_true());
    }

    #[test]
    fn test_date_format() {
        assert_eq!(Value::date(0).to_string(), "1970-01-01");
        assert_eq!(Value::date(365).to_string(), "1971-01-01");
        assert_eq!(Value::null(TypeId::Date).to_string(), "date_null");
    }

    #[test]
    fn test_date_stream_roundtrip() {
        for v in [Value::date(12345), Value::null(TypeId::Date)] {
            let mut out = BytesMut::new();
            v.serialize_to(&mut out).unwrap();
            let mut input = out.freeze();
            let back = Value::deserialize_from(TypeId::Date, &mut input).unwrap();
            if v.is_null() {
                assert!(back.is_null());
            } else {
                assert!(v.compare_equals(&back).unwrap().is_true());
            }
        }
    }

    #[test]
    fn test_date_slot_roundtrip() {
        let v = Value::date(20_000);
        let mut slot = [0u8; 4];
        v.serialize_into(&mut slot, None).unwrap();
        let back = Value::deserialize_slot(TypeId::Date, &slot).unwrap();
        assert!(v.compare_equals(&back).unwrap().is_true());
    }

    #[test]
    fn test_date_cast() {
        let v = Value::date(365);
        assert_eq!(v.cast_as(TypeId::Varchar).unwrap().to_string(), "1971-01-01");
        assert!(matches!(
            v.cast_as(TypeId::Integer),
            Err(OpalError::NotCoercible { .. })
        ));
    }
}
