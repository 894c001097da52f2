//! VARCHAR/VARBINARY type handler.
//!
//! A variable-length value is a `(data, len)` pair. The length field
//! doubles as the NULL sentinel and as the +infinity bound used for
//! index key comparisons when equal to `VARLEN_MAX_LEN`. In a tuple
//! slot the value is a pointer word addressing a buffer laid out as a
//! little-endian u32 length followed by that many payload bytes; when
//! the buffer came from a pool, the 8 bytes before the length word are
//! the pool's atomic reference count.

use crate::integer::integer_value_of;
use crate::registry::{hash_bytes, null_compare, SqlType};
use crate::timestamp::parse_timestamp;
use crate::value::Value;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use opal_common::types::{TypeId, VARLEN_MAX_LEN};
use opal_common::{OpalError, Result};
use opal_memory::VarlenPool;
use std::cmp::Ordering;
use std::ptr::NonNull;
use std::sync::Arc;

const PTR_SIZE: usize = std::mem::size_of::<usize>();
const LEN_SIZE: usize = std::mem::size_of::<u32>();

pub(crate) struct VarlenType {
    id: TypeId,
}

fn read_ptr_word(slot: &[u8]) -> Result<usize> {
    if slot.len() < PTR_SIZE {
        return Err(OpalError::Truncated {
            need: PTR_SIZE,
            have: slot.len(),
        });
    }
    let mut word = [0u8; PTR_SIZE];
    word.copy_from_slice(&slot[..PTR_SIZE]);
    Ok(usize::from_ne_bytes(word))
}

fn write_ptr_word(slot: &mut [u8], addr: usize) -> Result<()> {
    if slot.len() < PTR_SIZE {
        return Err(OpalError::Truncated {
            need: PTR_SIZE,
            have: slot.len(),
        });
    }
    slot[..PTR_SIZE].copy_from_slice(&addr.to_ne_bytes());
    Ok(())
}

impl VarlenType {
    pub(crate) const fn new(id: TypeId) -> Self {
        Self { id }
    }

    /// The byte range carrying the value's meaning: the full range for
    /// VARBINARY, the range without the trailing NUL terminator for
    /// VARCHAR.
    fn semantic_bytes<'a>(&self, val: &'a Value) -> &'a [u8] {
        let bytes = val.varlen_bytes();
        if self.id == TypeId::Varchar && !bytes.is_empty() {
            &bytes[..bytes.len() - 1]
        } else {
            bytes
        }
    }

    fn text<'a>(&self, val: &'a Value) -> Result<&'a str> {
        std::str::from_utf8(self.semantic_bytes(val)).map_err(|_| OpalError::InvalidFormat {
            target: self.id,
            input: String::from_utf8_lossy(val.varlen_bytes()).into_owned(),
        })
    }

    fn compare(left: &Value, right: &Value, op: fn(Ordering) -> bool) -> Result<Value> {
        left.check_comparable(right)?;
        if let Some(null) = null_compare(left, right) {
            return Ok(null);
        }
        let (ll, rl) = (left.varlen_len(), right.varlen_len());
        if ll == VARLEN_MAX_LEN || rl == VARLEN_MAX_LEN {
            // The +infinity bound reduces to a length comparison.
            return Ok(Value::boolean(op(ll.cmp(&rl))));
        }
        // Unsigned lexicographic byte order; on a common prefix the
        // shorter range sorts less.
        Ok(Value::boolean(op(left
            .varlen_bytes()
            .cmp(right.varlen_bytes()))))
    }
}

impl SqlType for VarlenType {
    fn type_id(&self) -> TypeId {
        self.id
    }

    fn is_inlined(&self, _val: &Value) -> bool {
        false
    }

    fn compare_eq(&self, left: &Value, right: &Value) -> Result<Value> {
        Self::compare(left, right, Ordering::is_eq)
    }

    fn compare_ne(&self, left: &Value, right: &Value) -> Result<Value> {
        Self::compare(left, right, Ordering::is_ne)
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
            return "varlen_null".to_string();
        }
        if val.varlen_len() == VARLEN_MAX_LEN {
            return "varlen_max".to_string();
        }
        String::from_utf8_lossy(self.semantic_bytes(val)).into_owned()
    }

    fn hash(&self, val: &Value) -> Result<u64> {
        Ok(hash_bytes(self.semantic_bytes(val)))
    }

    fn serialize_to(&self, val: &Value, out: &mut BytesMut) -> Result<()> {
        let len = val.varlen_len();
        out.put_u32_le(len);
        if len != VARLEN_MAX_LEN {
            out.put_slice(val.varlen_bytes());
        }
        Ok(())
    }

    fn serialize_into(
        &self,
        val: &Value,
        slot: &mut [u8],
        pool: Option<&VarlenPool>,
    ) -> Result<()> {
        if val.is_null() {
            return write_ptr_word(slot, 0);
        }
        let len = val.varlen_len();
        debug_assert_ne!(len, VARLEN_MAX_LEN, "length sentinel is not storable");
        let bytes = val.varlen_bytes();
        let size = len as usize + LEN_SIZE;

        let dest = match pool {
            Some(pool) => pool
                .allocate(size)
                .ok_or(OpalError::PoolExhausted { size })?
                .as_ptr(),
            // Heap fallback when no pool exists; the slot owner frees
            // it with the surrounding tuple storage.
            None => Box::into_raw(vec![0u8; size].into_boxed_slice()) as *mut u8,
        };
        // SAFETY: `dest` addresses `size` writable bytes from either
        // allocation source.
        unsafe {
            std::ptr::copy_nonoverlapping(len.to_le_bytes().as_ptr(), dest, LEN_SIZE);
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), dest.add(LEN_SIZE), len as usize);
        }
        write_ptr_word(slot, dest as usize)
    }

    fn deserialize_from(&self, input: &mut Bytes) -> Result<Value> {
        if input.remaining() < LEN_SIZE {
            return Err(OpalError::Truncated {
                need: LEN_SIZE,
                have: input.remaining(),
            });
        }
        let len = input.get_u32_le();
        if len == VARLEN_MAX_LEN {
            return Ok(Value::null(self.id));
        }
        if input.remaining() < len as usize {
            return Err(OpalError::Truncated {
                need: len as usize,
                have: input.remaining(),
            });
        }
        let bytes = input.split_to(len as usize);
        Ok(Value::varlen_owned(self.id, Arc::from(&bytes[..]), len))
    }

    fn deserialize_slot(&self, slot: &[u8]) -> Result<Value> {
        let addr = read_ptr_word(slot)?;
        if addr == 0 {
            return Ok(Value::null(self.id));
        }
        let ptr = addr as *const u8;
        // SAFETY: a non-null slot word was written by serialize_into
        // and addresses a live buffer holding a little-endian length
        // followed by that many payload bytes.
        let len = unsafe {
            let mut word = [0u8; LEN_SIZE];
            std::ptr::copy_nonoverlapping(ptr, word.as_mut_ptr(), LEN_SIZE);
            u32::from_le_bytes(word)
        };
        debug_assert_ne!(len, VARLEN_MAX_LEN, "slot holds a bad length");
        // The returned view takes no reference count.
        Ok(Value::varlen_view(self.id, unsafe { ptr.add(LEN_SIZE) }, len))
    }

    fn shallow_copy(&self, dest: &mut [u8], src: &[u8], pool: Option<&VarlenPool>) -> Result<()> {
        let Some(pool) = pool else {
            return Err(OpalError::UnsupportedOperation {
                type_id: self.id,
                op: "shallow copy without a pool",
            });
        };
        let addr = read_ptr_word(src)?;
        write_ptr_word(dest, addr)?;
        if let Some(ptr) = NonNull::new(addr as *mut u8) {
            debug_assert!(
                pool.owns(ptr.as_ptr()),
                "shallow copy of a non-pool allocation"
            );
            // SAFETY: the source slot holds a live pool allocation with
            // a positive reference count.
            unsafe { pool.add_ref(ptr) };
        }
        Ok(())
    }

    fn copy(&self, val: &Value) -> Value {
        val.clone()
    }

    fn cast_as(&self, val: &Value, target: TypeId) -> Result<Value> {
        match target {
            TypeId::Boolean => {
                if val.is_null() {
                    return Ok(Value::null(TypeId::Boolean));
                }
                match self.text(val)?.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" | "yes" => Ok(Value::boolean(true)),
                    "false" | "f" | "0" | "no" => Ok(Value::boolean(false)),
                    other => Err(OpalError::InvalidFormat {
                        target: TypeId::Boolean,
                        input: other.to_string(),
                    }),
                }
            }
            t if t.is_integer() => {
                if val.is_null() {
                    return Ok(Value::null(t));
                }
                let text = self.text(val)?.trim();
                let raw = text.parse::<i64>().map_err(|_| OpalError::InvalidFormat {
                    target: t,
                    input: text.to_string(),
                })?;
                integer_value_of(raw, t)
            }
            TypeId::Timestamp => {
                if val.is_null() {
                    return Ok(Value::null(TypeId::Timestamp));
                }
                Ok(Value::timestamp(parse_timestamp(self.text(val)?)?))
            }
            TypeId::Varchar => {
                if target == self.id {
                    return Ok(val.copy());
                }
                if val.is_null() {
                    return Ok(Value::null(TypeId::Varchar));
                }
                Ok(Value::varchar_from_bytes(self.semantic_bytes(val)))
            }
            TypeId::Varbinary => {
                if target == self.id {
                    return Ok(val.copy());
                }
                if val.is_null() {
                    return Ok(Value::null(TypeId::Varbinary));
                }
                Ok(Value::varbinary(self.semantic_bytes(val)))
            }
            _ => Err(OpalError::NotCoercible {
                from: self.id,
                to: target,
            }),
        }
    }
}
