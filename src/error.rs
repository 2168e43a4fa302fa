use std::fmt;
use std::io;

/// Errors surfaced across the pool's public API.
///
/// `Display` renders the bit-exact stable identifiers from the wire
/// protocol this pool's clients already speak (`UnAvaliable`, `NotExist`,
/// ...), spelling included, so existing clients parsing error strings keep
/// working.
#[derive(Debug)]
pub enum PoolError {
    /// The pool has not been started, or has been closed.
    Unavailable,
    /// `id` is out of the `[0, MAX_SERVERS)` range.
    WrongServerId,
    /// No server is registered under `id`.
    NoSuchServer,
    /// `AddServer` was called with an empty address.
    EmptyAddr,
    /// `AddServer` was called for an `id` already bound to a different
    /// address.
    Conflict,
    /// Reserved identifier carried over from the prior wire protocol for a
    /// server-count cap. No operation in this crate raises it (the
    /// registry's width is fixed at `MAX_SERVERS` rather than a separately
    /// enforced count), but it is kept so a client matching on the string
    /// does not need a migration.
    MoreServer,
    /// Dialing a fresh connection failed. Propagated verbatim from the
    /// configured [`crate::dial::Dialer`].
    Dial(io::Error),
    /// A bijection invariant between the shared LRU and a server's
    /// back-reference list was violated. Must never occur; see
    /// `SharedLruPool::acquire`.
    Unknown,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Unavailable => f.write_str("UnAvaliable"),
            PoolError::WrongServerId => f.write_str("WrongServerId"),
            PoolError::NoSuchServer => f.write_str("NotExist"),
            PoolError::EmptyAddr => f.write_str("EmptyIp"),
            PoolError::Conflict => f.write_str("ConflictServerInfo"),
            PoolError::MoreServer => f.write_str("MoreServer"),
            PoolError::Dial(e) => write!(f, "{}", e),
            PoolError::Unknown => f.write_str("UnkownError"),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Dial(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
