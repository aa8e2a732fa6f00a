// Connection handling module
// Accepts a single TCP connection and serves HTTP/1.1 on it

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::handler::{self, DispatchContext};

/// Per-connection limits taken from the performance configuration
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub keep_alive: bool,
    /// Upper bound on a connection's lifetime
    pub timeout: Duration,
    pub max_connections: Option<u64>,
}

/// Accept a connection if the connection limit allows it, then serve it in a
/// spawned task.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: &Arc<DispatchContext>,
    limits: ConnectionLimits,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = limits.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            warn!(
                active = prev_count,
                max = max_conn,
                %peer_addr,
                "Max connections reached, connection rejected"
            );
            drop(stream);
            return;
        }
    }

    debug!(%peer_addr, "Accepted connection");
    handle_connection(stream, peer_addr, Arc::clone(ctx), limits, Arc::clone(conn_counter));
}

fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: Arc<DispatchContext>,
    limits: ConnectionLimits,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(limits.keep_alive);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, peer_addr, Arc::clone(&ctx))),
        );

        match tokio::time::timeout(limits.timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(%peer_addr, error = %err, "Failed to serve connection"),
            Err(_) => warn!(
                %peer_addr,
                seconds = limits.timeout.as_secs(),
                "Connection timed out"
            ),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
