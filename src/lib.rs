pub mod config;
pub mod dial;
pub mod error;
pub mod pool;

pub use config::{init_tracing, PoolConfig};
pub use dial::{Dialer, TcpDialer};
pub use error::{PoolError, Result};
pub use pool::SharedLruPool;
