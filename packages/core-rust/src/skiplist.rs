//! Concurrent ordered store backed by a lazy, lock-based skip list.
//!
//! Readers never lock: forward links are [`ArcSwapOption`] cells, so a
//! traversal is a chain of atomic loads. Writers lock only the predecessor
//! nodes they are about to relink, validate that nothing moved underneath
//! them, and retry otherwise. Removal is two-phase: the victim is first
//! marked (logical delete, the linearization point) and then unlinked from
//! every level it occupies.
//!
//! Nodes are reference counted, so an [`Iter`] that still points at an
//! unlinked node keeps walking forward from it safely.

use std::cmp::Ordering as KeyOrdering;
use std::fmt;
use std::hint;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use rand::Rng;

/// Maximum tower height. With p = 1/2 this comfortably covers tens of
/// millions of keys.
pub const MAX_HEIGHT: usize = 24;

struct Node {
    key: Bytes,
    value: ArcSwap<Bytes>,
    next: Box<[ArcSwapOption<Node>]>,
    lock: Mutex<()>,
    marked: AtomicBool,
    fully_linked: AtomicBool,
}

impl Node {
    fn new(key: Bytes, value: Bytes, height: usize) -> Self {
        Self {
            key,
            value: ArcSwap::from_pointee(value),
            next: (0..height).map(|_| ArcSwapOption::empty()).collect(),
            lock: Mutex::new(()),
            marked: AtomicBool::new(false),
            fully_linked: AtomicBool::new(false),
        }
    }

    fn height(&self) -> usize {
        self.next.len()
    }

    fn next(&self, level: usize) -> Option<Arc<Node>> {
        self.next[level].load_full()
    }

    fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    fn is_fully_linked(&self) -> bool {
        self.fully_linked.load(Ordering::Acquire)
    }

    /// A node is visible once fully linked and until it is marked.
    fn is_live(&self) -> bool {
        self.is_fully_linked() && !self.is_marked()
    }

    fn value(&self) -> Bytes {
        Bytes::clone(&self.value.load())
    }

    fn entry(&self) -> (Bytes, Bytes) {
        (self.key.clone(), self.value())
    }
}

/// Predecessors and successors of a key at every level.
struct Search {
    /// Highest level at which a node with exactly the searched key was seen.
    found: Option<usize>,
    preds: Vec<Arc<Node>>,
    succs: Vec<Option<Arc<Node>>>,
}

/// Concurrent byte-keyed ordered map.
///
/// Many threads may call [`upsert`](Self::upsert), [`lookup`](Self::lookup)
/// and [`remove`](Self::remove) at once; operations on unrelated keys only
/// contend when they share a predecessor node. Keys are ordered
/// byte-lexicographically and at most one live record exists per key.
///
/// Upserts are linearizable: an existing record's value is replaced in place
/// while holding that record's lock, after re-checking it has not been
/// removed. Concurrent upserts to one key therefore apply in some total
/// order and readers never see the key vanish in between.
pub struct SkipList {
    head: Arc<Node>,
    len: AtomicUsize,
}

impl SkipList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: Arc::new(Node::new(Bytes::new(), Bytes::new(), MAX_HEIGHT)),
            len: AtomicUsize::new(0),
        }
    }

    /// Inserts `key` or replaces its value. Returns the previous value.
    pub fn upsert(&self, key: Bytes, value: Bytes) -> Option<Bytes> {
        let height = random_height();
        loop {
            let search = self.find(&key);

            if let Some(node) = search.found.and_then(|level| search.succs[level].clone()) {
                if node.is_marked() {
                    // Being removed; wait for the unlink before inserting anew.
                    hint::spin_loop();
                    continue;
                }
                while !node.is_fully_linked() {
                    hint::spin_loop();
                }
                let _guard = node.lock.lock();
                if node.is_marked() {
                    continue;
                }
                let previous = node.value.swap(Arc::new(value));
                return Some(Bytes::clone(&previous));
            }

            if self.try_link(&search, &key, &value, height) {
                return None;
            }
        }
    }

    /// Returns the value stored under `key`, if any. Never blocks.
    #[must_use]
    pub fn lookup(&self, key: &[u8]) -> Option<Bytes> {
        self.seek(key, true)
            .filter(|node| node.key.as_ref() == key && node.is_live())
            .map(|node| node.value())
    }

    /// Returns whether a live record exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.lookup(key).is_some()
    }

    /// Removes `key`. Returns `true` iff this call removed a live record.
    pub fn remove(&self, key: &[u8]) -> bool {
        let Some(victim) = self.mark(key) else {
            return false;
        };
        self.unlink(&victim);
        self.len.fetch_sub(1, Ordering::Relaxed);
        true
    }

    /// Number of live records. Approximate while writers are active.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every record present when the call started.
    ///
    /// Not atomic: records inserted concurrently may survive.
    pub fn clear(&self) {
        let keys: Vec<Bytes> = self.accessor().iter().map(|(key, _)| key).collect();
        for key in keys {
            self.remove(&key);
        }
    }

    /// Opens a scoped ordered view of the list.
    #[must_use]
    pub fn accessor(&self) -> Accessor<'_> {
        Accessor { list: self }
    }

    fn find(&self, key: &[u8]) -> Search {
        let mut preds = vec![Arc::clone(&self.head); MAX_HEIGHT];
        let mut succs: Vec<Option<Arc<Node>>> = vec![None; MAX_HEIGHT];
        let mut found = None;

        let mut pred = Arc::clone(&self.head);
        for level in (0..MAX_HEIGHT).rev() {
            let mut curr = pred.next(level);
            while let Some(node) = curr.clone() {
                if node.key.as_ref() >= key {
                    break;
                }
                curr = node.next(level);
                pred = node;
            }
            if found.is_none() && curr.as_ref().is_some_and(|n| n.key.as_ref() == key) {
                found = Some(level);
            }
            preds[level] = Arc::clone(&pred);
            succs[level] = curr;
        }

        Search {
            found,
            preds,
            succs,
        }
    }

    /// First node at level 0 whose key is `>= key` (or `> key` when not
    /// `inclusive`). The node may be marked or not yet fully linked.
    fn seek(&self, key: &[u8], inclusive: bool) -> Option<Arc<Node>> {
        let mut pred = Arc::clone(&self.head);
        let mut curr = None;
        for level in (0..MAX_HEIGHT).rev() {
            curr = pred.next(level);
            while let Some(node) = curr.clone() {
                let advance = match node.key.as_ref().cmp(key) {
                    KeyOrdering::Less => true,
                    KeyOrdering::Equal => !inclusive,
                    KeyOrdering::Greater => false,
                };
                if !advance {
                    break;
                }
                curr = node.next(level);
                pred = node;
            }
        }
        curr
    }

    /// Links a fresh node between the searched predecessors and successors.
    /// Returns `false` if validation failed and the caller must search again.
    fn try_link(&self, search: &Search, key: &Bytes, value: &Bytes, height: usize) -> bool {
        let mut guards: Vec<MutexGuard<'_, ()>> = Vec::with_capacity(height);
        let mut locked: Option<&Arc<Node>> = None;

        for level in 0..height {
            let pred = &search.preds[level];
            let succ = search.succs[level].as_ref();
            if locked.map_or(true, |prev| !Arc::ptr_eq(prev, pred)) {
                guards.push(pred.lock.lock());
                locked = Some(pred);
            }
            let valid = !pred.is_marked()
                && succ.map_or(true, |s| !s.is_marked())
                && same_node(pred.next(level).as_ref(), succ);
            if !valid {
                return false;
            }
        }

        let node = Arc::new(Node::new(key.clone(), value.clone(), height));
        for level in 0..height {
            node.next[level].store(search.succs[level].clone());
        }
        for level in 0..height {
            search.preds[level].next[level].store(Some(Arc::clone(&node)));
        }
        node.fully_linked.store(true, Ordering::Release);
        self.len.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Logically deletes the live node for `key`, returning it for unlinking.
    fn mark(&self, key: &[u8]) -> Option<Arc<Node>> {
        let search = self.find(key);
        let level = search.found?;
        let node = search.succs[level].clone()?;
        // A node found below its top level is still being linked in.
        if !node.is_fully_linked() || node.height() - 1 != level || node.is_marked() {
            return None;
        }

        {
            let _guard = node.lock.lock();
            if node.is_marked() {
                return None;
            }
            node.marked.store(true, Ordering::Release);
        }
        Some(node)
    }

    fn unlink(&self, victim: &Arc<Node>) {
        let height = victim.height();
        loop {
            let search = self.find(&victim.key);
            let mut guards: Vec<MutexGuard<'_, ()>> = Vec::with_capacity(height);
            let mut locked: Option<&Arc<Node>> = None;
            let mut valid = true;

            for level in 0..height {
                let pred = &search.preds[level];
                if locked.map_or(true, |prev| !Arc::ptr_eq(prev, pred)) {
                    guards.push(pred.lock.lock());
                    locked = Some(pred);
                }
                valid = !pred.is_marked()
                    && pred
                        .next(level)
                        .is_some_and(|next| Arc::ptr_eq(&next, victim));
                if !valid {
                    break;
                }
            }
            if !valid {
                continue;
            }

            for level in (0..height).rev() {
                search.preds[level].next[level].store(victim.next(level));
            }
            return;
        }
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SkipList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipList").field("len", &self.len()).finish()
    }
}

impl Drop for SkipList {
    fn drop(&mut self) {
        // Cut links front to back so dropping a long chain never recurses.
        for level in 1..MAX_HEIGHT {
            self.head.next[level].store(None);
        }
        let mut cursor = self.head.next[0].swap(None);
        while let Some(node) = cursor {
            for level in 1..node.height() {
                node.next[level].store(None);
            }
            cursor = node.next[0].swap(None);
        }
    }
}

fn same_node(a: Option<&Arc<Node>>, b: Option<&Arc<Node>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn random_height() -> usize {
    let mut rng = rand::rng();
    let mut height = 1;
    while height < MAX_HEIGHT && rng.random_bool(0.5) {
        height += 1;
    }
    height
}

/// Scoped, ordered view into a [`SkipList`].
///
/// Iterators obtained from an accessor walk keys in ascending order and
/// skip records that are removed while the walk is in progress.
#[derive(Debug, Clone, Copy)]
pub struct Accessor<'a> {
    list: &'a SkipList,
}

impl<'a> Accessor<'a> {
    /// Iterates all live records from the smallest key.
    #[must_use]
    pub fn iter(&self) -> Iter<'a> {
        Iter::new(self.list.head.next(0))
    }

    /// Returns the record stored under `key`, if any.
    #[must_use]
    pub fn find(&self, key: &[u8]) -> Option<(Bytes, Bytes)> {
        self.list
            .seek(key, true)
            .filter(|node| node.key.as_ref() == key && node.is_live())
            .map(|node| node.entry())
    }

    /// Iterates from the first key `>= key`.
    #[must_use]
    pub fn lower_bound(&self, key: &[u8]) -> Iter<'a> {
        Iter::new(self.list.seek(key, true))
    }

    /// Iterates from the first key `> key`.
    #[must_use]
    pub fn upper_bound(&self, key: &[u8]) -> Iter<'a> {
        Iter::new(self.list.seek(key, false))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Ascending iterator over `(key, value)` pairs. An exhausted iterator is
/// the end marker.
pub struct Iter<'a> {
    next: Option<Arc<Node>>,
    _list: PhantomData<&'a SkipList>,
}

impl Iter<'_> {
    fn new(start: Option<Arc<Node>>) -> Self {
        Self {
            next: start,
            _list: PhantomData,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = (Bytes, Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.next.take() {
            self.next = node.next(0);
            if node.is_live() {
                return Some(node.entry());
            }
        }
        None
    }
}
