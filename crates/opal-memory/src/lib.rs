//! Variable-length memory pool for OpalDB.
//!
//! This crate provides the allocator backing variable-length column
//! values:
//! - Fixed-capacity buffers holding equal-sized blocks with an
//!   occupancy bitmap
//! - A segregated free-list pool handing out reference-counted
//!   allocations
//! - Empty-buffer reclamation above a per-list watermark

mod bitmap;
mod buffer;
mod pool;

pub use buffer::Buffer;
pub use pool::{
    PoolConfig, VarlenPool, BUFFER_SIZE, LARGE_LIST_ID, MAX_EMPTY_NUM, MAX_LIST_NUM,
    MAX_POOL_SIZE, MIN_BLOCK_SIZE, REF_COUNT_SIZE,
};
