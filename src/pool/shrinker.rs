use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::time;
use tracing::debug;

use crate::dial::Dialer;

use super::shared::SharedLruPool;

/// Background task woken either by `SharedLruPool::release` crossing the
/// high-water mark or by the `SHRINK_SPAN` timer, whichever comes first,
/// and calls `shrink` each time.
///
/// Grounded on `ConnMap::shrinkDaemon` (`original_source/connmap.go`), whose
/// `select` raced a channel receive against `time.After`. Rust's
/// `tokio::sync::Notify` has no "closed" state to race against, so this
/// loop's exit condition is an explicit `shutdown_flag` checked on every
/// wake instead of relying on the channel-closed branch of `select`
/// (the source's own `break` there only escapes the inner `select`, not the
/// outer `for` loop, and never actually stops the daemon).
pub(crate) async fn run<D: Dialer>(pool: Arc<SharedLruPool<D>>) {
    let notify = pool.notify_handle();
    let mut ticker = time::interval(pool.shrink_span());
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = notify.notified() => {}
            _ = ticker.tick() => {}
        }

        if pool.shutdown_flag.load(Ordering::Acquire) {
            debug!("shrinker daemon exiting");
            break;
        }

        pool.shrink().await;
    }
}
