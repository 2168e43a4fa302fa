use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::dial::Dialer;
use crate::error::{PoolError, Result};

use super::list::IntrusiveList;
use super::server::ServerPool;

/// Registry width. A `u16` server id is always in range, so the only
/// rejection case is an id `>= MAX_SERVERS`.
pub const MAX_SERVERS: usize = 10_000;
/// Default/maximum idle-connection capacity.
pub const MAX_CONNS: usize = 20_000;
/// Shrink trigger: start evicting once the shared LRU exceeds this fraction
/// of capacity.
pub const HIGH_WATER_RATIO: f64 = 0.9;
/// Shrinker wake period, racing the edge-triggered notify.
pub const SHRINK_SPAN: Duration = Duration::from_millis(100);

/// A shared-LRU node's payload: which server it belongs to (so the shrink
/// walk can find that server's own back-reference list) and the connection
/// itself.
struct Entry<C> {
    server_id: u16,
    conn: C,
}

struct Inner<C> {
    registry: Vec<Option<Arc<ServerPool>>>,
    shared_lru: IntrusiveList<Entry<C>>,
}

/// The two-level pool: one shared LRU of idle connections, threaded through
/// each server's own back-reference list.
///
/// Grounded on `ConnMap` (`original_source/connmap.go`): `cm` is this
/// crate's `registry`, `sharedConnLru` is `shared_lru`, `isAvaliable`,
/// `isShrinking` and `shrinkDeamonRunning` are the three booleans below
/// (kept as atomics rather than fields behind `M`, since none of them need
/// to be read-modify-written alongside a registry/list edit), and
/// `shrinkChan` is the `Notify`.
pub struct SharedLruPool<D: Dialer> {
    inner: Mutex<Inner<D::Conn>>,
    dialer: D,
    config: PoolConfig,
    available: AtomicBool,
    shrinking: AtomicBool,
    shrinker_running: AtomicBool,
    pub(crate) shutdown_flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl<D: Dialer> SharedLruPool<D> {
    pub fn new(dialer: D, mut config: PoolConfig) -> Self {
        // `NewConnMap`: `if capx > DefaultMaxConnections { capx = DefaultMaxConnections }`
        config.capacity = config.capacity.min(MAX_CONNS);
        let mut registry = Vec::with_capacity(MAX_SERVERS);
        registry.resize_with(MAX_SERVERS, || None);
        SharedLruPool {
            inner: Mutex::new(Inner {
                registry,
                shared_lru: IntrusiveList::new(),
            }),
            dialer,
            config,
            available: AtomicBool::new(false),
            shrinking: AtomicBool::new(false),
            shrinker_running: AtomicBool::new(false),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub(crate) fn shrink_span(&self) -> Duration {
        self.config.shrink_span
    }

    pub(crate) fn notify_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    /// Marks the pool available and, the first time only, spawns the
    /// shrinker daemon (`ConnMap::Start`).
    pub fn start(self: &Arc<Self>) {
        self.available.store(true, Ordering::Release);
        if self
            .shrinker_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let pool = Arc::clone(self);
            tokio::spawn(async move {
                super::shrinker::run(pool).await;
            });
        }
    }

    /// Register a server under `id`. Idempotent if `id`/`addr` already match
    /// the existing entry; conflicting otherwise (`ConnMap::AddServer`).
    pub fn add_server(&self, id: u16, addr: impl Into<String>) -> Result<()> {
        if !self.available.load(Ordering::Acquire) {
            return Err(PoolError::Unavailable);
        }
        let addr = addr.into();
        if addr.is_empty() {
            return Err(PoolError::EmptyAddr);
        }
        if id as usize >= MAX_SERVERS {
            return Err(PoolError::WrongServerId);
        }

        let mut inner = self.inner.lock();
        match &inner.registry[id as usize] {
            Some(existing) => {
                if existing.addr == addr {
                    Ok(())
                } else {
                    Err(PoolError::Conflict)
                }
            }
            None => {
                inner.registry[id as usize] = Some(Arc::new(ServerPool::new(id, addr)));
                Ok(())
            }
        }
    }

    /// Take an idle connection for `id`, dialing a fresh one if none is idle
    /// (`ConnMap::Get`).
    pub async fn acquire(&self, id: u16) -> Result<D::Conn> {
        if !self.available.load(Ordering::Acquire) {
            return Err(PoolError::Unavailable);
        }
        if id as usize >= MAX_SERVERS {
            return Err(PoolError::WrongServerId);
        }

        let (server, backref) = {
            let inner = self.inner.lock();
            let server = inner.registry[id as usize]
                .clone()
                .ok_or(PoolError::NoSuchServer)?;
            let backref = server.take_back_ref();
            (server, backref)
        };

        match backref {
            None => {
                debug!(server = id, "no idle connection, dialing");
                self.dialer.dial(&server.addr).await.map_err(PoolError::Dial)
            }
            Some(node) => {
                let mut inner = self.inner.lock();
                match inner.shared_lru.remove(node) {
                    Some(entry) => Ok(entry.conn),
                    None => {
                        debug_assert!(
                            false,
                            "back-reference and shared LRU out of sync for server {id}"
                        );
                        warn!(server = id, "back-reference pointed at a missing LRU node");
                        Err(PoolError::Unknown)
                    }
                }
            }
        }
    }

    /// Return a connection to `id`'s idle list (`ConnMap::Put`). The
    /// connection is dropped (closing it) rather than pooled if the pool is
    /// unavailable or `id` has no server registered.
    pub async fn release(self: &Arc<Self>, id: u16, conn: D::Conn) {
        if !self.available.load(Ordering::Acquire) || id as usize >= MAX_SERVERS {
            return;
        }

        let len = {
            let mut inner = self.inner.lock();
            let server = match inner.registry[id as usize].clone() {
                Some(server) => server,
                None => return,
            };
            let node = inner.shared_lru.push_front(Entry { server_id: id, conn });
            server.put_back_ref(node);
            inner.shared_lru.len()
        };

        if len > self.config.high_water_mark() {
            self.notify.notify_one();
        }
    }

    /// Unregister a server and, in the background, drain and close its idle
    /// connections (`ConnMap::DelServer`/`CloseConnPool`).
    ///
    /// A concurrent `acquire` that already cloned this server's `Arc` before
    /// the registry slot was cleared may still dial a fresh connection
    /// against the now-removed address; this mirrors the source behaviour
    /// and is not guarded against.
    pub fn del_server(self: &Arc<Self>, id: u16) {
        if !self.available.load(Ordering::Acquire) || id as usize >= MAX_SERVERS {
            return;
        }

        let server = {
            let mut inner = self.inner.lock();
            inner.registry[id as usize].take()
        };

        if let Some(server) = server {
            let pool = Arc::clone(self);
            tokio::spawn(async move {
                pool.close_server_pool(&server).await;
            });
        }
    }

    async fn close_server_pool(&self, server: &ServerPool) {
        loop {
            let node = match server.take_back_ref() {
                Some(node) => node,
                None => break,
            };
            let entry = {
                let mut inner = self.inner.lock();
                inner.shared_lru.remove(node)
            };
            // dropping `entry` here closes the connection
            drop(entry);
        }
    }

    /// Evict the stalest entries once the shared LRU crosses the high-water
    /// mark (`ConnMap::shrink`/`findShrinkPos`). Invoked by the shrinker
    /// daemon; idempotent under concurrent invocation via `shrinking`.
    pub(crate) async fn shrink(self: &Arc<Self>) {
        if !self.available.load(Ordering::Acquire) {
            return;
        }
        if self
            .shrinking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let evicted = {
            let mut inner = self.inner.lock();
            let need = inner.shared_lru.len() as isize - self.config.high_water_mark() as isize;
            if need <= 0 {
                None
            } else {
                let need = need as usize;
                let mut cursor = inner.shared_lru.back();
                let mut actual = 0usize;
                let mut segment_head = None;
                while actual < need {
                    let node = match cursor {
                        Some(node) => node,
                        None => break,
                    };
                    if let Some(server_id) = inner.shared_lru.inspect(node, |e| e.server_id) {
                        if let Some(server) = &inner.registry[server_id as usize] {
                            server.remove_back_ref_if_tail(node);
                        }
                    }
                    segment_head = Some(node);
                    actual += 1;
                    cursor = inner.shared_lru.prev(node);
                }
                segment_head.map(|head| inner.shared_lru.splice_at(head, actual, true))
            }
        };

        self.shrinking.store(false, Ordering::Release);

        if let Some(evicted) = evicted {
            if !evicted.is_empty() {
                debug!(count = evicted.len(), "shrunk shared LRU");
            }
            Self::close_all_conn(evicted);
        }
    }

    /// Mark the pool unavailable and evict and close every idle connection
    /// across every server (`ConnMap::Close`). Idempotent.
    pub async fn close(self: &Arc<Self>) {
        let evicted = {
            let mut inner = self.inner.lock();
            self.available.store(false, Ordering::Release);
            for slot in inner.registry.iter_mut() {
                *slot = None;
            }
            if inner.shared_lru.is_empty() {
                None
            } else {
                let head = inner.shared_lru.front().unwrap();
                let len = inner.shared_lru.len();
                Some(inner.shared_lru.splice_at(head, len, true))
            }
        };
        self.shrinking.store(false, Ordering::Release);
        if let Some(evicted) = evicted {
            Self::close_all_conn(evicted);
        }
    }

    /// Drain `list`, dropping each entry's connection as it comes off the
    /// front. `splice_at` shares its arena with the list it split from, so
    /// the returned list's slots stay occupied until each one is actually
    /// `remove`d (which `pop_front` does) — merely dropping the
    /// `IntrusiveList` handle itself frees no slots and closes nothing.
    /// Mirrors `ConnMap::closeAllConn`'s `PopFront` loop.
    fn close_all_conn(mut list: IntrusiveList<Entry<D::Conn>>) {
        while let Some(entry) = list.pop_front() {
            drop(entry.conn);
        }
    }

    /// `close` followed by tearing down the shrinker daemon
    /// (`ConnMap::ShutDown`). Idempotent: closing an already-closed pool is
    /// a no-op, and the daemon exits on its next wake regardless of how
    /// many times this is called.
    pub async fn shutdown(self: &Arc<Self>) {
        if self.available.load(Ordering::Acquire) {
            self.close().await;
        }
        self.shutdown_flag.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub fn idle_len(&self) -> usize {
        self.inner.lock().shared_lru.len()
    }
}
