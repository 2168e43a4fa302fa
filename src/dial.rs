use async_trait::async_trait;
use tokio::net::TcpStream;

/// The pool's only collaborator with the outside world: opening a fresh
/// connection to a server's address when the idle lists are empty.
///
/// Kept as a trait (rather than hard-wiring `TcpStream`) so the pool itself
/// stays free of any real I/O and is exercisable against an in-memory fake,
/// matching how `core::pool::stream::StreamManager` keeps its own transport
/// (`TcpStream`/`UnixStream`) behind the `Stream` boxed-trait boundary
/// instead of baking a concrete socket type into `ConnectionPool`.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Conn: Send + 'static;

    async fn dial(&self, addr: &str) -> std::io::Result<Self::Conn>;
}

/// Production dialer: plain TCP, no TLS, no retry.
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Conn = TcpStream;

    async fn dial(&self, addr: &str) -> std::io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }
}
