// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept connections on `listener` until `shutdown` completes
///
/// Once `shutdown` resolves the listener is closed and open connections get
/// `performance.shutdown_timeout` seconds to finish their current response.
/// Whatever is still running after that is left to be dropped with the
/// runtime.
pub async fn start_server_loop<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = io::Result<&'static str>>,
{
    tokio::pin!(shutdown);
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &graceful);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            signal = &mut shutdown => {
                match signal {
                    Ok(name) => logger::log_debug(&format!("{name} received")),
                    Err(e) => logger::log_error(&format!("Signal handler failed: {e}")),
                }
                break;
            }
        }
    }

    drop(listener);
    logger::log_shutdown(state.active_connections.load(Ordering::SeqCst));

    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    if tokio::time::timeout(grace, graceful.shutdown()).await.is_err() {
        logger::log_warning(&format!(
            "[Shutdown] {} connections still open after {}s, closing them",
            state.active_connections.load(Ordering::SeqCst),
            grace.as_secs()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_reusable_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    struct TestServer {
        addr: std::net::SocketAddr,
        stop: tokio::sync::oneshot::Sender<()>,
        handle: tokio::task::JoinHandle<io::Result<()>>,
        _dir: tempfile::TempDir,
    }

    async fn spawn_server(delay_secs: f64) -> TestServer {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.bin");
        std::fs::write(&file, b"0123456789abcdefghij").unwrap();

        let config: Config = format!(
            r#"
            [logging]
            access_log = false

            [transfer]
            chunk_bytes = 4
            delay_secs = {delay_secs:?}

            [[routes]]
            url = "/data"
            type = "file"
            path = '{}'
            "#,
            file.display()
        )
        .parse()
        .unwrap();
        let state = Arc::new(AppState::new(config).unwrap());

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(start_server_loop(listener, state, async move {
            let _ = stop_rx.await;
            Ok::<_, io::Error>("test")
        }));

        TestServer {
            addr,
            stop,
            handle,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_serves_range_over_tcp() {
        let server = spawn_server(0.0).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        let request = concat!(
            "GET /data HTTP/1.1\r\n",
            "Host: localhost\r\n",
            "Range: bytes=10-15\r\n",
            "Connection: close\r\n\r\n",
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let response = String::from_utf8(raw).unwrap();

        assert!(response.starts_with("HTTP/1.1 206 Partial Content\r\n"));
        assert!(response.to_ascii_lowercase().contains("content-range: bytes 10-15/20"));
        assert!(response.ends_with("\r\n\r\nabcdef"));

        server.stop.send(()).unwrap();
        assert!(server.handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_running_transfer() {
        // Five chunks, 100 ms apart
        let server = spawn_server(0.1).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream
            .write_all(b"GET /data HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        // The head arriving proves the connection was accepted
        let mut raw = vec![0u8; 1024];
        let n = stream.read(&mut raw).await.unwrap();
        raw.truncate(n);
        assert!(raw.starts_with(b"HTTP/1.1 200 OK\r\n"));

        server.stop.send(()).unwrap();
        let stopped = tokio::time::timeout(Duration::from_secs(5), server.handle)
            .await
            .unwrap()
            .unwrap();
        assert!(stopped.is_ok());

        // The body was complete and the keep-alive connection closed
        // before the loop returned
        let rest = tokio::time::timeout(Duration::from_millis(50), stream.read_to_end(&mut raw))
            .await
            .unwrap();
        assert!(rest.is_ok());
        assert!(raw.ends_with(b"\r\n\r\n0123456789abcdefghij"));
    }
}
