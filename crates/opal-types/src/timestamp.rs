//! TIMESTAMP type handler.
//!
//! Timestamps are microseconds since the Unix epoch, stored as u64
//! with `TIMESTAMP_NULL` (the maximum value) marking SQL NULL.

use crate::registry::{hash_bytes, null_compare, null_compare_not_equals, SqlType};
use crate::value::{Value, ValueData};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use opal_common::types::{TypeId, TIMESTAMP_NULL};
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;
use std::cmp::Ordering;

pub(crate) struct TimestampType;

/// Parses the textual timestamp forms produced by `format`, plus a
/// bare date. Used by the VARCHAR cast path.
pub(crate) fn parse_timestamp(text: &str) -> Result<u64> {
    let trimmed = text.trim().trim_end_matches("+00").trim_end();
    let micros = if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        dt.and_utc().timestamp_micros()
    } else if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        match d.and_hms_opt(0, 0, 0) {
            Some(dt) => dt.and_utc().timestamp_micros(),
            None => -1,
        }
    } else {
        -1
    };
    u64::try_from(micros).map_err(|_| OpalError::InvalidFormat {
        target: TypeId::Timestamp,
        input: text.to_string(),
    })
}

impl TimestampType {
    fn raw(val: &Value) -> u64 {
        match val.data() {
            ValueData::Timestamp(v) => *v,
            _ => TIMESTAMP_NULL,
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

impl SqlType for TimestampType {
    fn type_id(&self) -> TypeId {
        TypeId::Timestamp
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
            return "timestamp_null".to_string();
        }
        let raw = Self::raw(val);
        match i64::try_from(raw)
            .ok()
            .and_then(DateTime::from_timestamp_micros)
        {
            Some(dt) => format!("{}+00", dt.format("%Y-%m-%d %H:%M:%S%.6f")),
            None => raw.to_string(),
        }
    }

    fn hash(&self, val: &Value) -> Result<u64> {
        Ok(hash_bytes(&Self::raw(val).to_le_bytes()))
    }

    fn serialize_to(&self, val: &Value, out: &mut BytesMut) -> Result<()> {
        out.put_u64_le(Self::raw(val));
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
            TypeId::Timestamp,
            ValueData::Timestamp(input.get_u64_le()),
        ))
    }

    fn deserialize_slot(&self, slot: &[u8]) -> Result<Value> {
        if slot.len() < 8 {
            return Err(OpalError::Truncated {
                need: 8,
                have: slot.len(),
            });
        }
        let raw = u64::from_le_bytes([
            slot[0], slot[1], slot[2], slot[3], slot[4], slot[5], slot[6], slot[7],
        ]);
        Ok(Value::from_data(TypeId::Timestamp, ValueData::Timestamp(raw)))
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
            TypeId::Timestamp => Ok(val.copy()),
            TypeId::Varchar => {
                if val.is_null() {
                    return Ok(Value::null(TypeId::Varchar));
                }
                Ok(Value::varchar(&self.format(val)))
            }
            _ => Err(OpalError::NotCoercible {
                from: TypeId::Timestamp,
                to: target,
            }),
        }
    }
}
