use parking_lot::Mutex;

use super::list::{IntrusiveList, NodeId};

/// Per-server idle list: `ServerPool.id`/`addr` are the registry entry;
/// `backrefs` holds, back-to-front in recency order, the `NodeId` of every
/// node this server currently has sitting in the shared LRU.
///
/// Grounded on `ConnPool` (`original_source/connmap.go`): `id`, `addr`,
/// a mutex-guarded `list`. The list's values there are shared-LRU element
/// pointers (`*LruElement`); here they are `NodeId` handles into the shared
/// LRU's arena instead, since pointers aren't an option.
pub struct ServerPool {
    pub id: u16,
    pub addr: String,
    backrefs: Mutex<IntrusiveList<NodeId>>,
}

impl ServerPool {
    pub fn new(id: u16, addr: String) -> Self {
        ServerPool {
            id,
            addr,
            backrefs: Mutex::new(IntrusiveList::new()),
        }
    }

    pub fn idle_count(&self) -> usize {
        self.backrefs.lock().len()
    }

    /// Push a new back-reference to the front (`ConnPool::put`).
    pub fn put_back_ref(&self, shared_node: NodeId) -> NodeId {
        self.backrefs.lock().push_front(shared_node)
    }

    /// Pop the most recently released back-reference (`ConnPool::get`).
    pub fn take_back_ref(&self) -> Option<NodeId> {
        self.backrefs.lock().pop_front()
    }

    /// Remove `backref` from this server's list, but only if it is still
    /// the current tail. Used by the shrink victim walk: guards against a
    /// concurrent `acquire` already having popped it
    /// (`original_source/connmap.go`'s `findShrinkPos`: `back != nil &&
    /// back.Value == lastpos`).
    pub fn remove_back_ref_if_tail(&self, backref: NodeId) -> bool {
        self.backrefs.lock().remove_back_if(backref).is_some()
    }

    /// Drain every back-reference, in pop order. Used by `close`/`shutdown`
    /// to walk a server's own list and reclaim the corresponding shared-LRU
    /// nodes (`ConnMap::CloseConnPool`).
    pub fn drain_back_refs(&self) -> Vec<NodeId> {
        let mut list = self.backrefs.lock();
        let mut out = Vec::with_capacity(list.len());
        while let Some(node) = list.pop_front() {
            out.push(node);
        }
        out
    }
}
