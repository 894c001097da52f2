//! Segregated free-list pool for variable-length allocations.

use crate::buffer::Buffer;
use parking_lot::Mutex;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::debug;

/// Default capacity of a non-large buffer in bytes.
pub const BUFFER_SIZE: usize = 1 << 17;
/// Smallest block size served by list 0.
pub const MIN_BLOCK_SIZE: usize = 16;
/// Number of segregated free lists.
pub const MAX_LIST_NUM: usize = 15;
/// The list serving oversized allocations, one block per buffer.
pub const LARGE_LIST_ID: usize = MAX_LIST_NUM - 1;
/// Empty buffers retained per list before eviction kicks in.
pub const MAX_EMPTY_NUM: usize = 4;
/// Default upper bound on the sum of buffer capacities.
pub const MAX_POOL_SIZE: u64 = 1 << 60;
/// Size of the atomic reference count embedded before each payload.
pub const REF_COUNT_SIZE: usize = std::mem::size_of::<AtomicI64>();

/// Configuration for the variable-length pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Capacity of each non-large buffer in bytes. Must be a
    /// power-of-two multiple of `MIN_BLOCK_SIZE` so it divides evenly
    /// into blocks.
    pub buffer_size: usize,
    /// Upper bound on the sum of buffer capacities.
    pub max_pool_size: u64,
    /// Empty buffers retained per list before eviction.
    pub max_empty_buffers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
            max_pool_size: MAX_POOL_SIZE,
            max_empty_buffers: MAX_EMPTY_NUM,
        }
    }
}

/// One segregated free list: its buffers plus the count of empty ones.
#[derive(Debug, Default)]
struct BufferList {
    buffers: Vec<Buffer>,
    empty_count: usize,
}

/// A memory pool that quickly allocates variable-length chunks for
/// clients.
///
/// List `i < LARGE_LIST_ID` serves blocks of `MIN_BLOCK_SIZE << i`
/// bytes from buffers of `buffer_size` capacity; the large list serves
/// oversized requests with one block per buffer. Every allocated block
/// embeds an 8-byte atomic reference count immediately before the
/// payload pointer handed to the caller:
///
/// ```text
/// +------------------+---------+
/// | 8 byte ref count | payload |
/// +------------------+---------+
///                    ^ returned pointer
/// ```
///
/// Each list is guarded by its own mutex; refcount updates are atomic
/// and never touch a lock. The pool-wide budget check reads `pool_size`
/// without a lock, so the bound is soft by up to one buffer's capacity.
pub struct VarlenPool {
    lists: [Mutex<BufferList>; MAX_LIST_NUM],
    /// Sum of buffer capacities currently held.
    pool_size: AtomicU64,
    config: PoolConfig,
}

/// Returns the free list id serving `need` bytes:
/// `ceil(log2(need / MIN_BLOCK_SIZE))`, clamped to the large list.
fn list_id_for(need: usize) -> usize {
    let blocks = need.div_ceil(MIN_BLOCK_SIZE);
    if blocks <= 1 {
        return 0;
    }
    let id = (usize::BITS - (blocks - 1).leading_zeros()) as usize;
    id.min(LARGE_LIST_ID)
}

impl VarlenPool {
    /// Creates a pool with the default configuration.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates a pool with the given configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            lists: std::array::from_fn(|_| Mutex::new(BufferList::default())),
            pool_size: AtomicU64::new(0),
            config,
        }
    }

    /// Allocates a contiguous chunk of `size` bytes.
    ///
    /// On success the returned payload pointer is 8-byte aligned and
    /// carries a reference count of 1. Returns None when creating the
    /// backing buffer would exceed the pool budget; exhaustion is never
    /// an error, callers decide fatal-or-fallback.
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let need = size + REF_COUNT_SIZE;
        let list_id = list_id_for(need);
        let mut list = self.lists[list_id].lock();

        let pos = list.buffers.iter().position(|b| {
            !b.is_full() && (list_id != LARGE_LIST_ID || b.block_size() >= need)
        });
        let reused = pos.is_some();

        let idx = match pos {
            Some(idx) => idx,
            None => {
                let (capacity, block_size) = if list_id == LARGE_LIST_ID {
                    let rounded = need.next_multiple_of(8);
                    (rounded, rounded)
                } else {
                    let block_size = MIN_BLOCK_SIZE << list_id;
                    (self.config.buffer_size.max(block_size), block_size)
                };
                if self.pool_size.load(Ordering::Relaxed) + capacity as u64
                    > self.config.max_pool_size
                {
                    return None;
                }
                self.pool_size.fetch_add(capacity as u64, Ordering::Relaxed);
                debug!(list_id, capacity, block_size, "created buffer");
                list.buffers.push(Buffer::new(capacity, block_size));
                list.buffers.len() - 1
            }
        };

        let was_empty = list.buffers[idx].is_empty();
        let block = list.buffers[idx]
            .allocate()
            .expect("selected buffer has a free block");
        if reused && was_empty {
            debug_assert!(list.empty_count > 0);
            list.empty_count -= 1;
        }

        // SAFETY: the block is at least REF_COUNT_SIZE + size bytes
        // and 8-byte aligned, so its first word is a valid AtomicI64.
        unsafe { (*(block.as_ptr() as *const AtomicI64)).store(1, Ordering::Release) };
        // SAFETY: the block extends REF_COUNT_SIZE + size bytes past
        // its base, so the payload pointer stays in bounds.
        Some(unsafe { NonNull::new_unchecked(block.as_ptr().add(REF_COUNT_SIZE)) })
    }

    /// Adds one to the reference count of a pool allocation.
    ///
    /// # Safety
    /// `payload` must have been returned by [`allocate`] on this pool
    /// and its reference count must still be positive.
    ///
    /// [`allocate`]: VarlenPool::allocate
    pub unsafe fn add_ref(&self, payload: NonNull<u8>) {
        let rc = unsafe { Self::ref_count_cell(payload.as_ptr()) };
        let prev = rc.fetch_add(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "add_ref on a freed block");
    }

    /// Reads the reference count of a pool allocation.
    ///
    /// # Safety
    /// `payload` must have been returned by [`allocate`] on this pool
    /// and its reference count must still be positive.
    ///
    /// [`allocate`]: VarlenPool::allocate
    pub unsafe fn ref_count(&self, payload: NonNull<u8>) -> i64 {
        unsafe { Self::ref_count_cell(payload.as_ptr()) }.load(Ordering::Acquire)
    }

    /// Subtracts one from the reference count of a pool allocation,
    /// returning the block to its buffer when the count reaches zero.
    ///
    /// Acquire-release ordering guarantees that the thread observing
    /// zero also observes all payload writes performed before the final
    /// decrement.
    ///
    /// # Safety
    /// `payload` must have been returned by [`allocate`] on this pool
    /// and its reference count must still be positive; the caller must
    /// not touch the payload afterwards.
    ///
    /// [`allocate`]: VarlenPool::allocate
    pub unsafe fn free(&self, payload: NonNull<u8>) {
        let rc = unsafe { Self::ref_count_cell(payload.as_ptr()) };
        let prev = rc.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "double free");
        if prev == 1 {
            self.release_block(payload.as_ptr());
        }
    }

    /// Returns true if `payload` points into a buffer owned by this
    /// pool.
    pub fn owns(&self, payload: *const u8) -> bool {
        let block = payload.wrapping_sub(REF_COUNT_SIZE);
        self.lists
            .iter()
            .any(|list| list.lock().buffers.iter().any(|b| b.contains(block)))
    }

    /// Reclaims surplus empty buffers above the per-list watermark.
    ///
    /// Live blocks are never relocated: clients hold raw payload
    /// pointers, so compaction is restricted to empty buffers.
    pub fn compact(&self) {
        for (list_id, list) in self.lists.iter().enumerate() {
            let mut list = list.lock();
            while list.empty_count > self.config.max_empty_buffers {
                let Some(idx) = list.buffers.iter().position(|b| b.is_empty()) else {
                    break;
                };
                let buffer = list.buffers.swap_remove(idx);
                list.empty_count -= 1;
                self.pool_size
                    .fetch_sub(buffer.capacity() as u64, Ordering::Relaxed);
                debug!(list_id, capacity = buffer.capacity(), "compacted empty buffer");
            }
        }
    }

    /// Total bytes of buffer capacity currently held by the pool.
    pub fn total_allocated_space(&self) -> u64 {
        self.pool_size.load(Ordering::Relaxed)
    }

    /// Upper bound on the sum of buffer capacities.
    pub fn maximum_pool_size(&self) -> u64 {
        self.config.max_pool_size
    }

    /// Number of empty buffers retained by the given list, or None if
    /// `list_id` is out of range.
    pub fn empty_count_by_list(&self, list_id: usize) -> Option<usize> {
        self.lists.get(list_id).map(|list| list.lock().empty_count)
    }

    /// # Safety
    /// `payload` must point REF_COUNT_SIZE bytes past a live block base.
    #[inline]
    unsafe fn ref_count_cell<'a>(payload: *const u8) -> &'a AtomicI64 {
        unsafe { &*(payload.sub(REF_COUNT_SIZE) as *const AtomicI64) }
    }

    /// Marks the block holding `payload` free, destroying its buffer if
    /// it became empty while the list is at the empty-buffer watermark.
    fn release_block(&self, payload: *const u8) {
        let block = payload.wrapping_sub(REF_COUNT_SIZE);
        for (list_id, list) in self.lists.iter().enumerate() {
            let mut list = list.lock();
            let Some(idx) = list.buffers.iter().position(|b| b.contains(block)) else {
                continue;
            };
            list.buffers[idx].free(block);
            if list.buffers[idx].is_empty() {
                if list.empty_count >= self.config.max_empty_buffers {
                    let buffer = list.buffers.swap_remove(idx);
                    self.pool_size
                        .fetch_sub(buffer.capacity() as u64, Ordering::Relaxed);
                    debug!(
                        list_id,
                        capacity = buffer.capacity(),
                        "destroyed surplus empty buffer"
                    );
                } else {
                    list.empty_count += 1;
                }
            }
            return;
        }
        debug_assert!(false, "pointer not owned by pool");
    }
}

impl Default for VarlenPool {
    fn default() -> Self {
        Self::new()
    }
}
