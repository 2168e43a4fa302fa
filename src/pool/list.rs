use std::sync::Arc;

use parking_lot::Mutex;

/// Handle into an [`IntrusiveList`]'s backing arena.
///
/// Carries a generation counter alongside the slot index so a handle whose
/// slot has since been freed and reused for an unrelated value is rejected
/// rather than silently aliasing the new occupant. This is the arena-based
/// realization of the "back-reference handle" from the design notes: it
/// avoids the aliasing hazard a raw index alone would have.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

struct Slot<V> {
    value: Option<V>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    generation: u32,
}

struct Arena<V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
}

impl<V> Arena<V> {
    fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    fn alloc(&mut self, value: V, prev: Option<NodeId>, next: Option<NodeId>) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            slot.prev = prev;
            slot.next = next;
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                value: Some(value),
                prev,
                next,
                generation: 0,
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn slot(&self, node: NodeId) -> Option<&Slot<V>> {
        let slot = self.slots.get(node.index as usize)?;
        if slot.generation != node.generation || slot.value.is_none() {
            return None;
        }
        Some(slot)
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut Slot<V>> {
        let slot = self.slots.get_mut(node.index as usize)?;
        if slot.generation != node.generation || slot.value.is_none() {
            return None;
        }
        Some(slot)
    }

    fn free_slot(&mut self, node: NodeId) -> Option<V> {
        let slot = self.slots.get_mut(node.index as usize)?;
        if slot.generation != node.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.prev = None;
        slot.next = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);
        Some(value)
    }
}

/// A doubly-linked list of opaque values backed by a slab arena, supporting
/// O(1) `push_front`/`pop_front`/`remove`/`splice_at`.
///
/// The arena is shared (via `Arc<Mutex<_>>`) between a list and any list
/// produced by splitting it off with [`splice_at`](Self::splice_at), since
/// both keep indexing into the same slot storage after the split. The extra
/// mutex is uncontended in the common case (structural edits to a given
/// `IntrusiveList` only ever happen while the caller already holds the
/// pool-level lock that serializes access to it), but it is load-bearing
/// once a splice has produced two independently-owned lists: a background
/// task draining the split-off segment and the live list recycling freed
/// slots via further pushes are then genuinely concurrent.
pub struct IntrusiveList<V> {
    arena: Arc<Mutex<Arena<V>>>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<V> IntrusiveList<V> {
    pub fn new() -> Self {
        IntrusiveList {
            arena: Arc::new(Mutex::new(Arena::new())),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Option<NodeId> {
        self.head
    }

    pub fn back(&self) -> Option<NodeId> {
        self.tail
    }

    /// `node`'s head-ward (fresher) neighbor, or `None` if `node` is the
    /// head, already detached, or stale.
    pub fn prev(&self, node: NodeId) -> Option<NodeId> {
        self.arena.lock().slot(node)?.prev
    }

    /// Borrow the value at `node` without removing it.
    pub fn inspect<R>(&self, node: NodeId, f: impl FnOnce(&V) -> R) -> Option<R> {
        let arena = self.arena.lock();
        let slot = arena.slot(node)?;
        slot.value.as_ref().map(f)
    }

    pub fn push_front(&mut self, value: V) -> NodeId {
        let mut arena = self.arena.lock();
        let node = arena.alloc(value, None, self.head);
        if let Some(head) = self.head {
            if let Some(slot) = arena.slot_mut(head) {
                slot.prev = Some(node);
            }
        } else {
            self.tail = Some(node);
        }
        drop(arena);
        self.head = Some(node);
        self.len += 1;
        node
    }

    pub fn pop_front(&mut self) -> Option<V> {
        let node = self.head?;
        self.remove(node)
    }

    /// Unlink `node` from this list and return its value. Idempotent: a
    /// stale or already-detached handle returns `None`.
    pub fn remove(&mut self, node: NodeId) -> Option<V> {
        let mut arena = self.arena.lock();
        let (prev, next) = {
            let slot = arena.slot(node)?;
            (slot.prev, slot.next)
        };
        if let Some(prev) = prev {
            if let Some(slot) = arena.slot_mut(prev) {
                slot.next = next;
            }
        }
        if let Some(next) = next {
            if let Some(slot) = arena.slot_mut(next) {
                slot.prev = prev;
            }
        }
        let value = arena.free_slot(node);
        drop(arena);
        if value.is_some() {
            if self.head == Some(node) {
                self.head = next;
            }
            if self.tail == Some(node) {
                self.tail = prev;
            }
            self.len -= 1;
        }
        value
    }

    /// Remove the current tail only if it is still `expected`. Used by the
    /// shrink victim walk's guard: a concurrent `Acquire` may already have
    /// taken the back-reference this call was about to evict.
    pub fn remove_back_if(&mut self, expected: NodeId) -> Option<V> {
        if self.tail == Some(expected) {
            self.remove(expected)
        } else {
            None
        }
    }

    /// Detach the tail-ward suffix starting at (and including) `node`
    /// through the current tail, returning it as a new list. `node`
    /// becomes the returned list's head; `node`'s former head-ward
    /// neighbor becomes this list's new tail.
    ///
    /// `k` must equal the length of the returned (extracted) segment; the
    /// caller is responsible for `node` and `k` agreeing with one another
    /// (this mirrors the source behaviour's unchecked contract) — it is not
    /// re-derived here. `from_back` is asserted `true`: every caller in
    /// this crate splices the stale tail-ward suffix off, so the symmetric
    /// head-ward variant implied by the spec's signature is left
    /// unimplemented rather than built and never exercised.
    pub fn splice_at(&mut self, node: NodeId, k: usize, from_back: bool) -> IntrusiveList<V> {
        debug_assert!(from_back, "only tail-ward splice is supported");
        debug_assert!(k <= self.len, "splice length exceeds list length");

        let old_tail = self.tail;
        let mut arena = self.arena.lock();
        let retained_tail = arena.slot(node).and_then(|slot| slot.prev);

        if let Some(rt) = retained_tail {
            if let Some(slot) = arena.slot_mut(rt) {
                slot.next = None;
            }
        }
        if let Some(slot) = arena.slot_mut(node) {
            slot.prev = None;
        }
        drop(arena);

        if retained_tail.is_none() {
            self.head = None;
        }
        self.tail = retained_tail;
        self.len -= k;

        IntrusiveList {
            arena: Arc::clone(&self.arena),
            head: Some(node),
            tail: old_tail,
            len: k,
        }
    }
}

impl<V> Default for IntrusiveList<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_front_and_front_back_order() {
        let mut list = IntrusiveList::new();
        assert!(list.front().is_none());
        for v in [1, 3, 89, 24, 45, 78, 7] {
            list.push_front(v);
        }
        assert_eq!(list.len(), 7);
        assert_eq!(list.inspect(list.front().unwrap(), |v| *v), Some(7));
        assert_eq!(list.inspect(list.back().unwrap(), |v| *v), Some(1));
    }

    #[test]
    fn pop_front_is_lifo() {
        let mut list = IntrusiveList::new();
        assert_eq!(list.pop_front(), None);
        let values = [1, 3, 89, 24, 45, 78, 7];
        for v in values {
            list.push_front(v);
        }
        for v in values.iter().rev() {
            assert_eq!(list.pop_front(), Some(*v));
        }
        assert_eq!(list.pop_front(), None);
    }

    #[test]
    fn remove_is_idempotent_on_detached_node() {
        let mut list = IntrusiveList::new();
        let n1 = list.push_front(1);
        let n2 = list.push_front(2);
        assert_eq!(list.remove(n1), Some(1));
        assert_eq!(list.remove(n1), None);
        assert_eq!(list.len(), 1);
        assert_eq!(list.remove(n2), Some(2));
    }

    #[test]
    fn remove_reused_slot_does_not_alias_stale_handle() {
        let mut list = IntrusiveList::new();
        let n1 = list.push_front(1);
        assert_eq!(list.remove(n1), Some(1));
        // recycles the freed slot
        let n2 = list.push_front(2);
        assert_eq!(list.remove(n1), None, "stale generation must not alias n2");
        assert_eq!(list.remove(n2), Some(2));
    }

    #[test]
    fn remove_back_if_guards_against_stale_target() {
        let mut list = IntrusiveList::new();
        let n1 = list.push_front(1);
        let _n2 = list.push_front(2);
        // back() is n1; a mismatched expectation is a no-op
        assert_eq!(list.remove_back_if(_n2), None);
        assert_eq!(list.remove_back_if(n1), Some(1));
    }

    #[test]
    fn splice_at_extracts_tail_suffix() {
        let mut list = IntrusiveList::new();
        // push_front means values end up tail-to-head as: 7,78,45,24,89,3,1 (front..back)
        for v in [1, 3, 89, 24, 45, 78, 7] {
            list.push_front(v);
        }
        // victims are the stalest 3: 89, 3, 1 (from the tail inward)
        let mut cursor = list.back().unwrap(); // 1
        cursor = list.prev(cursor).unwrap(); // 3
        cursor = list.prev(cursor).unwrap(); // 89

        let mut evicted = list.splice_at(cursor, 3, true);
        assert_eq!(list.len(), 4);
        assert_eq!(evicted.len(), 3);

        let mut popped = Vec::new();
        while let Some(v) = evicted.pop_front() {
            popped.push(v);
        }
        assert_eq!(popped, vec![89, 3, 1]);

        let mut remaining = Vec::new();
        while let Some(v) = list.pop_front() {
            remaining.push(v);
        }
        assert_eq!(remaining, vec![7, 78, 45, 24]);
    }

    #[test]
    fn splice_entire_list_from_head() {
        let mut list = IntrusiveList::new();
        for v in [1, 3, 89] {
            list.push_front(v);
        }
        let head = list.front().unwrap();
        let len = list.len();
        let mut evicted = list.splice_at(head, len, true);
        assert!(list.is_empty());
        assert_eq!(evicted.len(), 3);
        let mut popped = Vec::new();
        while let Some(v) = evicted.pop_front() {
            popped.push(v);
        }
        assert_eq!(popped, vec![89, 3, 1]);
    }
}
