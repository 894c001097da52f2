//! ARRAY type handler.
//!
//! Arrays participate in the registry so that every concrete type id
//! resolves to a handler, but element access lives with the expression
//! layer; the scalar operation set is not defined for them.

use crate::registry::SqlType;
use crate::value::Value;
use bytes::{Bytes, BytesMut};
use opal_common::types::TypeId;
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;

pub(crate) struct ArrayType;

fn unsupported<T>(op: &'static str) -> Result<T> {
    Err(OpalError::UnsupportedOperation {
        type_id: TypeId::Array,
        op,
    })
}

impl SqlType for ArrayType {
    fn type_id(&self) -> TypeId {
        TypeId::Array
    }

    fn is_inlined(&self, _val: &Value) -> bool {
        false
    }

    fn compare_eq(&self, _left: &Value, _right: &Value) -> Result<Value> {
        unsupported("compare")
    }

    fn compare_ne(&self, _left: &Value, _right: &Value) -> Result<Value> {
        unsupported("compare")
    }

    fn compare_lt(&self, _left: &Value, _right: &Value) -> Result<Value> {
        unsupported("compare")
    }

    fn compare_le(&self, _left: &Value, _right: &Value) -> Result<Value> {
        unsupported("compare")
    }

    fn compare_gt(&self, _left: &Value, _right: &Value) -> Result<Value> {
        unsupported("compare")
    }

    fn compare_ge(&self, _left: &Value, _right: &Value) -> Result<Value> {
        unsupported("compare")
    }

    fn format(&self, val: &Value) -> String {
        if val.is_null() {
            "array_null".to_string()
        } else {
            "array".to_string()
        }
    }

    fn hash(&self, _val: &Value) -> Result<u64> {
        unsupported("hash")
    }

    fn serialize_to(&self, _val: &Value, _out: &mut BytesMut) -> Result<()> {
        unsupported("serialize")
    }

    fn serialize_into(
        &self,
        _val: &Value,
        _slot: &mut [u8],
        _pool: Option<&VarlenPool>,
    ) -> Result<()> {
        unsupported("serialize")
    }

    fn deserialize_from(&self, _input: &mut Bytes) -> Result<Value> {
        unsupported("deserialize")
    }

    fn deserialize_slot(&self, _slot: &[u8]) -> Result<Value> {
        unsupported("deserialize")
    }

    fn shallow_copy(&self, _dest: &mut [u8], _src: &[u8], _pool: Option<&VarlenPool>) -> Result<()> {
        unsupported("shallow copy")
    }

    fn copy(&self, val: &Value) -> Value {
        val.clone()
    }

    fn cast_as(&self, _val: &Value, target: TypeId) -> Result<Value> {
        Err(OpalError::NotCoercible {
            from: TypeId::Array,
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_operations_are_unsupported() {
        let null = Value::null(TypeId::Array);

        assert!(matches!(
            null.compare_equals(&null),
            Err(OpalError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            null.hash_value(),
            Err(OpalError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            null.serialize_to(&mut BytesMut::new()),
            Err(OpalError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            null.cast_as(TypeId::Varchar),
            Err(OpalError::NotCoercible { .. })
        ));
    }

    #[test]
    fn test_array_format_and_copy() {
        let null = Value::null(TypeId::Array);
        assert_eq!(null.to_string(), "array_null");
        assert!(null.copy().is_null());
        assert!(!null.is_inlined());
    }
}
