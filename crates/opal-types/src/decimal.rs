//! DECIMAL type handler.

use crate::registry::{
    hash_bytes, null_compare, null_compare_not_equals, numeric_ord, SqlType,
};
use crate::value::{Value, ValueData};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use opal_common::types::{TypeId, DECIMAL_NULL};
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;
use std::cmp::Ordering;

pub(crate) struct DecimalType;

impl DecimalType {
    fn raw(val: &Value) -> f64 {
        match val.data() {
            ValueData::Decimal(v) => *v,
            _ => DECIMAL_NULL,
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

impl SqlType for DecimalType {
    fn type_id(&self) -> TypeId {
        TypeId::Decimal
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
        if val.is_null() {
            return "decimal_null".to_string();
        }
        Self::raw(val).to_string()
    }

    fn hash(&self, val: &Value) -> Result<u64> {
        Ok(hash_bytes(&Self::raw(val).to_bits().to_le_bytes()))
    }

    fn serialize_to(&self, val: &Value, out: &mut BytesMut) -> Result<()> {
        out.put_f64_le(Self::raw(val));
        Ok(())
    }

    fn serialize_into(
        &self,
        val: &Value,
        slot: &mut [u8],
        _pool: Option<&VarlenPool>,
    ) -> Result<()> {
        if slot.len() < 8 {
            return Err(OpalError::Truncated {
                need: 8,
                have: slot.len(),
            });
        }
        slot[..8].copy_from_slice(&Self::raw(val).to_le_bytes());
        Ok(())
    }

    fn deserialize_from(&self, input: &mut Bytes) -> Result<Value> {
        if input.remaining() < 8 {
            return Err(OpalError::Truncated {
                need: 8,
                have: input.remaining(),
            });
        }
        Ok(Value::from_data(
            TypeId::Decimal,
            ValueData::Decimal(input.get_f64_le()),
        ))
    }

    fn deserialize_slot(&self, slot: &[u8]) -> Result<Value> {
        if slot.len() < 8 {
            return Err(OpalError::Truncated {
                need: 8,
                have: slot.len(),
            });
        }
        let bits = f64::from_le_bytes([
            slot[0], slot[1], slot[2], slot[3], slot[4], slot[5], slot[6], slot[7],
        ]);
        Ok(Value::from_data(TypeId::Decimal, ValueData::Decimal(bits)))
    }

    fn shallow_copy(&self, dest: &mut [u8], src: &[u8], _pool: Option<&VarlenPool>) -> Result<()> {
        if dest.len() < 8 || src.len() < 8 {
            return Err(OpalError::Truncated {
                need: 8,
                have: dest.len().min(src.len()),
            });
        }
        dest[..8].copy_from_slice(&src[..8]);
        Ok(())
    }

    fn copy(&self, val: &Value) -> Value {
        val.clone()
    }

    fn cast_as(&self, val: &Value, target: TypeId) -> Result<Value> {
        match target {
            TypeId::Decimal => Ok(val.copy()),
            TypeId::Varchar => {
                if val.is_null() {
                    return Ok(Value::null(TypeId::Varchar));
                }
                Ok(Value::varchar(&self.format(val)))
            }
            _ => Err(OpalError::NotCoercible {
                from: TypeId::Decimal,
                to: target,
            }),
        }
    }
}
