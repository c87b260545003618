//! Host socket-authorization boundary

use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::task;
use tracing::debug;

/// Synchronous host callback deciding whether a freshly created socket may
/// be used (e.g. routed outside a capture tunnel).
pub type Protector = Arc<dyn Fn(RawFd) -> bool + Send + Sync>;

/// Open a TCP connection, clearing the new socket with the host first.
///
/// The callback runs off the scheduler thread and the verdict is marshaled
/// back; a denied or failed check surfaces as `PermissionDenied` and the
/// socket never carries traffic.
pub async fn connect(addr: &str, protector: Option<Protector>) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;

    if let Some(protector) = protector {
        let fd = stream.as_raw_fd();
        let allowed = task::spawn_blocking(move || protector(fd))
            .await
            .unwrap_or(false);
        if !allowed {
            debug!(fd, "socket authorization denied");
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "socket authorization denied",
            ));
        }
    }

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_authorized_socket_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let asked = Arc::new(AtomicBool::new(false));
        let observer = asked.clone();
        let protector: Protector = Arc::new(move |_fd| {
            observer.store(true, Ordering::SeqCst);
            true
        });

        let stream = connect(&addr, Some(protector)).await.unwrap();
        assert!(asked.load(Ordering::SeqCst));
        drop(stream);
    }

    #[tokio::test]
    async fn test_denied_socket_is_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let protector: Protector = Arc::new(|_fd| false);

        let error = connect(&addr, Some(protector)).await.unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_no_protector_connects_directly() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        connect(&addr, None).await.unwrap();
    }
}
