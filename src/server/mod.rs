//! Server module
//!
//! Binds a listener, accepts connections and serves each one with HTTP/1.1 until
//! [`Server::stop`] is called.

pub mod connection;
pub mod listener;
pub mod signal;

pub use connection::ConnectionLimits;
pub use listener::create_reusable_listener;
pub use signal::shutdown_signal;

use crate::config::Config;
use crate::handler::DispatchContext;
use crate::routing::Router;
use crate::security::RateLimiter;
use connection::accept_connection;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// HTTP/1.1 front end for a [`Router`]
pub struct Server {
    context: Arc<DispatchContext>,
    limits: ConnectionLimits,
    active: Arc<AtomicUsize>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    pub fn new(router: Router, config: &Config) -> Self {
        let rate_limiter = config.rate_limit.enabled.then(|| {
            Arc::new(RateLimiter::new(
                config.rate_limit.requests_per_second,
                config.rate_limit.burst,
            ))
        });

        let performance = &config.performance;
        let limits = ConnectionLimits {
            keep_alive: performance.keep_alive_timeout > 0,
            timeout: Duration::from_secs(performance.read_timeout.max(performance.write_timeout)),
            max_connections: performance.max_connections,
        };

        Self {
            context: Arc::new(DispatchContext {
                router,
                max_body_size: config.http.max_body_size,
                server_name: config.http.server_name.clone(),
                access_log: config.logging.access_log,
                access_log_format: config.logging.access_log_format.clone(),
                rate_limiter,
            }),
            limits,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: watch::channel(false).0,
        }
    }

    pub fn router(&self) -> &Router {
        &self.context.router
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Bind `addr` and serve until [`stop`](Self::stop)
    pub async fn listen_and_serve(&self, addr: SocketAddr) -> io::Result<()> {
        let listener = create_reusable_listener(addr)?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until [`stop`](Self::stop)
    ///
    /// Connections accepted before the stop keep running to completion.
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return Ok(());
        }
        info!(addr = %listener.local_addr()?, "Server listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &self.context, self.limits, &self.active);
                    }
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
                _ = shutdown.changed() => break,
            }
        }

        info!("Server stopped accepting connections");
        Ok(())
    }

    /// Stop every [`serve`](Self::serve) loop of this server
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{handle_fn, Request};
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::Response;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn explode() -> crate::routing::HttpResponse {
        panic!("handler exploded")
    }

    async fn start() -> (Arc<Server>, SocketAddr, tokio::task::JoinHandle<io::Result<()>>) {
        let config = Config::from_toml(
            r#"
            [logging]
            access_log = false

            [http]
            max_body_size = 8
            "#,
        )
        .unwrap();

        let router = Router::new();
        router
            .handle(
                "GET",
                "/hello/:name",
                handle_fn(|req: Request| async move {
                    let name = req.param("name").unwrap_or_default().to_string();
                    Response::new(Full::new(Bytes::from(format!("hello {name}"))))
                }),
            )
            .await;
        router
            .handle("GET", "/boom", handle_fn(|_| async { explode() }))
            .await;
        router
            .handle(
                "POST",
                "/upload",
                handle_fn(|_| async { Response::new(Full::new(Bytes::from("stored"))) }),
            )
            .await;

        let server = Arc::new(Server::new(router, &config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let serving = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve(listener).await })
        };
        (server, addr, serving)
    }

    async fn roundtrip(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_routes_over_tcp() {
        let (server, addr, serving) = start().await;

        let resp = roundtrip(
            addr,
            "GET /hello/bob HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(resp.starts_with("HTTP/1.1 200 OK"), "{resp}");
        assert!(resp.to_lowercase().contains("server: waypost"), "{resp}");
        assert!(resp.ends_with("hello bob"), "{resp}");

        let resp = roundtrip(
            addr,
            "GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(resp.starts_with("HTTP/1.1 404"), "{resp}");

        server.stop();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_panic_does_not_take_down_server() {
        let (server, addr, serving) = start().await;

        let resp = roundtrip(
            addr,
            "GET /boom HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(resp.starts_with("HTTP/1.1 500"), "{resp}");

        let resp = roundtrip(
            addr,
            "GET /hello/again HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(resp.starts_with("HTTP/1.1 200 OK"), "{resp}");

        server.stop();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_body_limit() {
        let (server, addr, serving) = start().await;

        let resp = roundtrip(
            addr,
            "POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\nConnection: close\r\n\r\nabcd",
        )
        .await;
        assert!(resp.starts_with("HTTP/1.1 200 OK"), "{resp}");

        let resp = roundtrip(
            addr,
            "POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Length: 20\r\nConnection: close\r\n\r\n01234567890123456789",
        )
        .await;
        assert!(resp.starts_with("HTTP/1.1 413"), "{resp}");

        server.stop();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_serve() {
        let config = Config::from_toml("").unwrap();
        let server = Server::new(Router::new(), &config);
        server.stop();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        server.serve(listener).await.unwrap();
        assert_eq!(server.active_connections(), 0);
    }
}
