#![expect(
    unsafe_code,
    reason = "arena-backed nodes live behind `&self`; writes into a freshly \
              reserved, not-yet-linked slice are exclusive to the inserting \
              thread until the publishing CAS makes them reachable",
)]

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use strata_row::RowRef;

use crate::node_heights::{random_height, MAX_HEIGHT};

/// Node index `0` is the sentinel head; it is never a valid insert target,
/// so `0` doubles as the "no successor" value in the pointer pool.
const HEAD: u32 = 0;

/// A node's row, as byte-arena offsets rather than slices, so that `Node`
/// itself is `Copy` and trivial to stash behind an `UnsafeCell`.
#[derive(Clone, Copy)]
struct RowSlot {
    key_offset: u32,
    key_len: u32,
    value_offset: u32,
    value_len: u32,
    version: u64,
}

/// Everything about a node except its forward pointers, which live in the
/// separate pointer pool (sliced per node by `ptr_base`/`height`) so that the
/// node pool's element size does not depend on `MAX_HEIGHT`.
#[derive(Clone, Copy)]
struct NodeData {
    row: RowSlot,
    ptr_base: u32,
    height: u8,
}

/// A concurrent, insert-only, multi-version ordered map.
///
/// Three fixed-capacity arenas back the whole structure: a byte arena for key
/// and value bytes, a node pool, and a forward-pointer pool. All three are
/// bump-allocated with a single atomic `fetch_add` per insert; none of them
/// ever shrinks or frees a single entry; the structure grows until one arena
/// is exhausted, at which point [`insert`](Skiplist::insert) starts returning
/// `false` and the caller is expected to retire the whole skiplist.
///
/// Every atomic access in this type uses [`Ordering::SeqCst`]. A
/// finer-grained Acquire/Release scheme is possible (the level-0 CAS is the
/// only operation that truly needs to be a release/acquire pair — see the
/// design notes), but `SeqCst` is the safe, obviously-correct default and the
/// structure is not performance-critical enough at this size to justify
/// auditing a weaker one.
pub struct Skiplist {
    bytes: Box<[UnsafeCell<u8>]>,
    byte_cursor: AtomicUsize,

    nodes: Box<[UnsafeCell<MaybeUninit<NodeData>>]>,
    node_cursor: AtomicUsize,

    pointers: Box<[AtomicU32]>,
    pointer_cursor: AtomicUsize,

    height_seed: AtomicU64,
}

// SAFETY: every `UnsafeCell`-wrapped slot is written at most once, by
// whichever thread's `fetch_add` uniquely reserved that slot, and is never
// read by another thread until that write happens-before a `SeqCst` CAS or
// load that thread observes. No two threads ever hold overlapping reserved
// ranges.
unsafe impl Sync for Skiplist {}

impl Skiplist {
    /// Builds an empty skiplist with the given fixed arena capacities.
    ///
    /// `pointer_capacity` must be at least `MAX_HEIGHT` to hold the
    /// sentinel head's own forward-pointer run; smaller values make every
    /// insert fail immediately.
    #[must_use]
    pub fn new(byte_capacity: usize, node_capacity: usize, pointer_capacity: usize) -> Self {
        let nodes: Box<[_]> = (0..=node_capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        let pointers: Box<[_]> = (0..pointer_capacity).map(|_| AtomicU32::new(HEAD)).collect();
        let bytes: Box<[_]> = (0..byte_capacity).map(|_| UnsafeCell::new(0u8)).collect();

        // SAFETY: index 0 was just allocated above, and no other thread has
        // a handle to this not-yet-returned `Skiplist` yet.
        unsafe {
            (*nodes[0].get()).write(NodeData {
                row: RowSlot { key_offset: 0, key_len: 0, value_offset: 0, value_len: 0, version: 0 },
                ptr_base: 0,
                height: MAX_HEIGHT as u8,
            });
        }

        Self {
            bytes,
            byte_cursor: AtomicUsize::new(0),
            nodes,
            node_cursor: AtomicUsize::new(1),
            pointers,
            pointer_cursor: AtomicUsize::new(MAX_HEIGHT),
            height_seed: AtomicU64::new(0),
        }
    }

    /// Copies `key` and `value` into the arena and links a new node holding
    /// `(key, value, version)`.
    ///
    /// Returns `false`, committing nothing, iff the byte arena, the node
    /// pool, or the pointer pool would overflow. Capacity is reserved from
    /// all three arenas before any is checked, so a failed insert may still
    /// burn arena space in the arenas that *did* have room — that space is
    /// simply dead until the whole skiplist is retired (see the type docs).
    pub fn insert(&self, key: &[u8], value: &[u8], version: u64) -> bool {
        let byte_offset = self.byte_cursor.fetch_add(key.len() + value.len(), Ordering::SeqCst);
        let node_idx = self.node_cursor.fetch_add(1, Ordering::SeqCst);
        let height = random_height(self.height_seed.fetch_add(1, Ordering::SeqCst));
        let ptr_base = self.pointer_cursor.fetch_add(height, Ordering::SeqCst);

        let bytes_ok = byte_offset + key.len() + value.len() <= self.bytes.len();
        let nodes_ok = node_idx < self.nodes.len();
        let pointers_ok = ptr_base + height <= self.pointers.len();

        if !bytes_ok || !nodes_ok || !pointers_ok {
            if !bytes_ok {
                log::warn!("skiplist insert rejected: byte arena exhausted");
            }
            if !nodes_ok {
                log::warn!("skiplist insert rejected: node pool exhausted");
            }
            if !pointers_ok {
                log::warn!("skiplist insert rejected: pointer pool exhausted");
            }
            return false;
        }

        // SAFETY: `[byte_offset, byte_offset + key.len() + value.len())` was
        // uniquely reserved by this call's `fetch_add` and is within bounds.
        unsafe {
            let dst = self.bytes.as_ptr().add(byte_offset).cast::<u8>().cast_mut();
            std::ptr::copy_nonoverlapping(key.as_ptr(), dst, key.len());
            std::ptr::copy_nonoverlapping(value.as_ptr(), dst.add(key.len()), value.len());
        }

        let row = RowSlot {
            key_offset: byte_offset as u32,
            key_len: key.len() as u32,
            value_offset: (byte_offset + key.len()) as u32,
            value_len: value.len() as u32,
            version,
        };

        // SAFETY: `node_idx` was uniquely reserved above and is within
        // bounds; no other thread can observe this index until it is linked
        // into level 0 below.
        unsafe {
            (*self.nodes[node_idx].get()).write(NodeData { row, ptr_base: ptr_base as u32, height: height as u8 });
        }

        for level in 0..height {
            loop {
                let pred = self.find_level_predecessor(level, &row);
                let succ = self.forward(pred, level);

                // Publish the new node's own forward pointer for this level
                // before attempting to make it reachable; nothing else can
                // observe it yet, so this can be a plain store.
                self.pointers[ptr_base + level].store(succ, Ordering::SeqCst);

                let pred_slot = &self.pointers[self.ptr_base_of(pred) + level];
                match pred_slot.compare_exchange(succ, node_idx as u32, Ordering::SeqCst, Ordering::SeqCst) {
                    Ok(_) => break,
                    Err(_) => continue,
                }
            }
        }

        true
    }

    /// Returns the value of the first row with exactly `key` in total order
    /// (i.e. the smallest version among rows sharing that key), if any.
    #[must_use]
    pub fn find(&self, key: &[u8]) -> Option<Box<[u8]>> {
        let pred = self.find_predecessor_before(key, 0);
        let candidate = self.forward(pred, 0);
        if candidate == HEAD {
            return None;
        }
        let row = self.row_ref(candidate);
        (row.key == key).then(|| row.value.to_vec().into_boxed_slice())
    }

    /// Returns an iterator positioned at the first live node.
    #[must_use]
    pub fn iter(&self) -> super::SkiplistIter<'_> {
        super::SkiplistIter::new(self)
    }

    fn ptr_base_of(&self, node_idx: u32) -> usize {
        // SAFETY: `node_idx` is always either `HEAD` or a previously
        // published node index, both of which have had their `NodeData`
        // written before becoming reachable.
        unsafe { (*self.nodes[node_idx as usize].get()).assume_init_ref().ptr_base as usize }
    }

    pub(crate) fn height_of(&self, node_idx: u32) -> usize {
        // SAFETY: see `ptr_base_of`.
        unsafe { (*self.nodes[node_idx as usize].get()).assume_init_ref().height as usize }
    }

    pub(crate) fn forward(&self, node_idx: u32, level: usize) -> u32 {
        if level >= self.height_of(node_idx) {
            return HEAD;
        }
        self.pointers[self.ptr_base_of(node_idx) + level].load(Ordering::SeqCst)
    }

    pub(crate) fn row_ref(&self, node_idx: u32) -> RowRef<'_> {
        // SAFETY: see `ptr_base_of`; the byte ranges named by a published
        // node's offsets were fully written before publication.
        let row = unsafe { (*self.nodes[node_idx as usize].get()).assume_init_ref().row };
        RowRef {
            key: self.byte_slice(row.key_offset as usize, row.key_len as usize),
            value: self.byte_slice(row.value_offset as usize, row.value_len as usize),
            version: row.version,
        }
    }

    fn byte_slice(&self, offset: usize, len: usize) -> &[u8] {
        // SAFETY: `UnsafeCell<u8>` has the same layout as `u8`; the range
        // was written once, before publication, and is never mutated again.
        unsafe { std::slice::from_raw_parts(self.bytes.as_ptr().add(offset).cast::<u8>(), len) }
    }

    /// Walks level `level` from the head, stopping at the last node whose
    /// row is strictly less than `row`.
    fn find_level_predecessor(&self, level: usize, row: &RowSlot) -> u32 {
        let target = RowRef {
            key: self.byte_slice(row.key_offset as usize, row.key_len as usize),
            value: &[],
            version: row.version,
        };
        let mut cur = HEAD;
        loop {
            let next = self.forward(cur, level);
            if next == HEAD || self.row_ref(next) >= target {
                return cur;
            }
            cur = next;
        }
    }

    /// Top-down descent to the predecessor of the first row with key `>=
    /// key`, for levels `from_level..MAX_HEIGHT` down to `from_level`
    /// (inclusive), returning the level-`from_level` predecessor.
    fn find_predecessor_before(&self, key: &[u8], from_level: usize) -> u32 {
        let mut cur = HEAD;
        let mut level = MAX_HEIGHT;
        while level > from_level {
            level -= 1;
            loop {
                let next = self.forward(cur, level);
                if next == HEAD || self.row_ref(next).key >= key {
                    break;
                }
                cur = next;
            }
        }
        cur
    }

    pub(crate) fn seek_predecessor(&self, key: &[u8]) -> u32 {
        self.find_predecessor_before(key, 0)
    }
}
