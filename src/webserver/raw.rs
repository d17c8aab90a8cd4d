/// Faults that break HTTP framing, written directly to the TCP socket
///
/// These responses cannot be produced through the router: hyper would
/// refuse a body shorter than its Content-Length and never emits non-HTTP
/// bytes. The accept loop peeks at the request line of every connection
/// and diverts these paths here before hyper sees the socket.
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

use crate::config::FaultConfig;
use crate::logger::{self, LogTag};

pub const TRUNCATED_PATH: &str = "/api/error/truncated";
pub const GARBAGE_PATH: &str = "/api/error/garbage";

/// First bytes of a JSON object that never finishes
pub const TRUNCATED_BODY: &str =
    r#"{ "message": "This is the start of a valid JSON object, but it will die soon...""#;

/// Not an HTTP status line, not UTF-8
pub const GARBAGE_BYTES: &[u8] = b"\x00\x01\x02GARBAGE\xff\xfe\xfd NOT-HTTP \x1b[0m\r\n\x00";

const PEEK_BUFFER: usize = 2048;
const PEEK_RETRY: Duration = Duration::from_millis(5);
const CLASSIFY_DEADLINE: Duration = Duration::from_secs(2);
const DRAIN_DEADLINE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFault {
    Truncated,
    Garbage,
}

impl RawFault {
    /// Classify from the start of a request; `None` means "let hyper serve it"
    pub fn from_request_head(head: &[u8]) -> Option<Self> {
        let line_end = head.iter().position(|&b| b == b'\r' || b == b'\n')?;
        let line = std::str::from_utf8(&head[..line_end]).ok()?;

        let mut parts = line.split_ascii_whitespace();
        if parts.next()? != "GET" {
            return None;
        }
        let path = parts.next()?.split('?').next()?;

        match path {
            TRUNCATED_PATH => Some(RawFault::Truncated),
            GARBAGE_PATH => Some(RawFault::Garbage),
            _ => None,
        }
    }
}

/// Peek (without consuming) until the request line is complete
///
/// Gives up after a short deadline and hands the socket to hyper, which
/// has its own handling for slow or broken clients.
pub async fn classify(stream: &TcpStream) -> io::Result<Option<RawFault>> {
    let mut buf = [0u8; PEEK_BUFFER];
    let deadline = Instant::now() + CLASSIFY_DEADLINE;

    loop {
        let n = stream.peek(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }

        let head = &buf[..n];
        if head.contains(&b'\n') || n == buf.len() {
            return Ok(RawFault::from_request_head(head));
        }

        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(PEEK_RETRY).await;
    }
}

/// Full truncated response: headers promise more than the body delivers
pub fn truncated_response(declared_length: usize) -> Vec<u8> {
    let declared = declared_length.max(TRUNCATED_BODY.len() + 1);
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        declared, TRUNCATED_BODY
    )
    .into_bytes()
}

/// Write the fault to the socket, then close it
pub async fn inject(fault: RawFault, mut stream: TcpStream, faults: &FaultConfig) -> io::Result<()> {
    drain_request_head(&mut stream).await;

    match fault {
        RawFault::Truncated => {
            stream
                .write_all(&truncated_response(faults.truncated_declared_length))
                .await?;
            stream.flush().await?;
            tokio::time::sleep(Duration::from_millis(faults.truncate_after_ms)).await;
            logger::info(LogTag::Faults, "Destroying socket for truncated response");
        }
        RawFault::Garbage => {
            stream.write_all(GARBAGE_BYTES).await?;
            stream.flush().await?;
            logger::info(LogTag::Faults, "Wrote garbage bytes, closing socket");
        }
    }

    drop(stream);
    Ok(())
}

/// Consume the request head so closing the socket is a FIN, not a reset
async fn drain_request_head(stream: &mut TcpStream) {
    let mut head = Vec::with_capacity(PEEK_BUFFER);
    let mut chunk = [0u8; 512];

    let read_head = async {
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    head.extend_from_slice(&chunk[..n]);
                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
            }
        }
    };

    if timeout(DRAIN_DEADLINE, read_head).await.is_err() {
        logger::debug(LogTag::Faults, "Request head incomplete; closing anyway");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_fault_paths() {
        assert_eq!(
            RawFault::from_request_head(b"GET /api/error/truncated HTTP/1.1\r\nHost: x\r\n"),
            Some(RawFault::Truncated)
        );
        assert_eq!(
            RawFault::from_request_head(b"GET /api/error/garbage?x=1 HTTP/1.1\r\n"),
            Some(RawFault::Garbage)
        );
    }

    #[test]
    fn test_other_requests_pass_through() {
        assert_eq!(RawFault::from_request_head(b"GET /api/get HTTP/1.1\r\n"), None);
        assert_eq!(
            RawFault::from_request_head(b"POST /api/error/truncated HTTP/1.1\r\n"),
            None
        );
        assert_eq!(
            RawFault::from_request_head(b"GET /api/error/truncated/extra HTTP/1.1\r\n"),
            None
        );
        // Incomplete request line
        assert_eq!(RawFault::from_request_head(b"GET /api/error/trunc"), None);
    }

    #[test]
    fn test_truncated_response_declares_more_than_it_sends() {
        let response = String::from_utf8(truncated_response(1024)).unwrap();
        let (headers, body) = response.split_once("\r\n\r\n").unwrap();

        assert!(headers.starts_with("HTTP/1.1 200 OK"));
        assert!(headers.contains("Content-Length: 1024"));
        assert_eq!(body, TRUNCATED_BODY);
        assert!(body.len() < 1024);
    }

    #[test]
    fn test_truncated_length_is_clamped() {
        let response = String::from_utf8(truncated_response(1)).unwrap();
        let expected = format!("Content-Length: {}", TRUNCATED_BODY.len() + 1);
        assert!(response.contains(&expected));
    }

    #[test]
    fn test_garbage_is_not_http() {
        assert!(!GARBAGE_BYTES.starts_with(b"HTTP/"));
    }
}
