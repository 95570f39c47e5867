/*!
 * Interactive Session
 * Pattern waits and line writes against a spawned tool's terminal
 */

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ansi;
use crate::error::{PairError, Result};

const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Matched,
    Eof,
}

pub struct Session<T> {
    io: T,
    buffer: Vec<u8>,
    closed: bool,
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: T) -> Self {
        Self {
            io,
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Wait until `pattern` shows up in the output or the stream ends.
    pub async fn expect(&mut self, pattern: &str, timeout: Option<Duration>) -> Result<Expected> {
        tracing::debug!("Waiting for {:?}", pattern);
        with_timeout(pattern, timeout, self.read_until(pattern.as_bytes())).await
    }

    pub async fn expect_eof(&mut self, timeout: Option<Duration>) -> Result<()> {
        with_timeout("<eof>", timeout, self.read_until(&[])).await?;
        Ok(())
    }

    /// Write one line. Once the tool has gone away the line is dropped.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        if self.closed {
            tracing::warn!("Session closed, not sending {:?}", line);
            return Ok(());
        }

        tracing::debug!("Sending {:?}", line);
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');

        let written = async {
            self.io.write_all(&data).await?;
            self.io.flush().await
        }
        .await;

        match written {
            Ok(()) => Ok(()),
            Err(err) if peer_gone(&err) => {
                tracing::warn!("Tool went away while sending {:?}: {}", line, err);
                self.closed = true;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// An empty needle only matches at end of stream.
    async fn read_until(&mut self, needle: &[u8]) -> io::Result<Expected> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if !needle.is_empty() {
                if let Some(end) = find(&self.buffer, needle) {
                    self.buffer.drain(..end);
                    return Ok(Expected::Matched);
                }
            }

            if self.closed {
                return Ok(Expected::Eof);
            }

            let len = match self.io.read(&mut chunk).await {
                Ok(len) => len,
                Err(err) if peer_gone(&err) => 0,
                Err(err) => return Err(err),
            };
            if len == 0 {
                tracing::debug!("Tool output closed");
                self.closed = true;
                continue;
            }

            let output = &chunk[..len];
            tracing::debug!(
                target: "bluetoothctl",
                "{}",
                ansi::strip(&String::from_utf8_lossy(output)).trim_end()
            );
            // Nothing left to match while draining to end of stream
            if !needle.is_empty() {
                self.buffer.extend_from_slice(output);
            }
        }
    }
}

async fn with_timeout<F>(pattern: &str, timeout: Option<Duration>, wait: F) -> Result<Expected>
where
    F: std::future::Future<Output = io::Result<Expected>>,
{
    match timeout {
        None => Ok(wait.await?),
        Some(waited) => match tokio::time::timeout(waited, wait).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PairError::PromptTimeout {
                pattern: pattern.to_string(),
                waited,
            }),
        },
    }
}

/// End offset of the first occurrence of `needle`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|start| start + needle.len())
}

fn peer_gone(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    ) || err.raw_os_error() == Some(libc::EIO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn expect_consumes_output_through_match() {
        let (local, mut remote) = duplex(256);
        let mut session = Session::new(local);

        remote.write_all(b"[bluetooth]# first [bluetooth]# ").await.unwrap();

        assert_eq!(session.expect("#", None).await.unwrap(), Expected::Matched);
        assert_eq!(session.expect("#", None).await.unwrap(), Expected::Matched);
        assert_eq!(session.buffer, b" ");
    }

    #[tokio::test]
    async fn expect_reports_eof_when_tool_exits() {
        let (local, remote) = duplex(256);
        let mut session = Session::new(local);
        drop(remote);

        assert_eq!(session.expect("#", None).await.unwrap(), Expected::Eof);
        assert!(session.closed);
    }

    #[tokio::test(start_paused = true)]
    async fn expect_times_out_without_prompt() {
        let (local, _remote) = duplex(256);
        let mut session = Session::new(local);

        let err = session
            .expect("#", Some(Duration::from_secs(30)))
            .await
            .unwrap_err();
        match err {
            PairError::PromptTimeout { pattern, waited } => {
                assert_eq!(pattern, "#");
                assert_eq!(waited, Duration::from_secs(30));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn send_after_close_is_dropped() {
        let (local, remote) = duplex(256);
        let mut session = Session::new(local);
        drop(remote);

        session.expect_eof(None).await.unwrap();
        session.send_line("quit").await.unwrap();
    }

    #[tokio::test]
    async fn send_to_vanished_peer_marks_closed() {
        let (local, remote) = duplex(256);
        let mut session = Session::new(local);
        drop(remote);

        session.send_line("remove AA:BB").await.unwrap();
        assert!(session.closed);
    }

    #[tokio::test]
    async fn draining_to_eof_does_not_buffer_output() {
        let (local, mut remote) = duplex(256);
        let mut session = Session::new(local);

        let chatter = tokio::spawn(async move {
            for _ in 0..64 {
                remote.write_all(b"[CHG] Device AA:BB RSSI: -60\r\n").await.unwrap();
            }
        });

        session.expect_eof(None).await.unwrap();
        chatter.await.unwrap();
        assert!(session.buffer.is_empty());
    }

    #[test]
    fn find_returns_match_end() {
        assert_eq!(find(b"abc#def", b"#"), Some(4));
        assert_eq!(find(b"abc", b"#"), None);
        assert_eq!(find(b"Enter PIN code: ", b"PIN code"), Some(14));
    }
}
