//! Byte channels a session can run over.
//!
//! The session only needs three things from a channel: a read with a bounded
//! wait, a blocking write and a way to tear it down. [`TcpTransport`] talks to
//! a real device; [`ChannelTransport`] connects to an in-process peer and is
//! what the integration tests script a fake console against.
//!
//! Every transport carries a [`CloseSignal`]. Raising it from another thread
//! makes a pending [`Transport::read_chunk`] fail instead of waiting out its
//! deadline.
//!
//! [`TcpTransport`]: crate::TcpTransport

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Longest single wait of a polling read before the close flag is checked.
pub const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A duplex byte channel with bounded reads.
pub trait Transport: Send {
    /// Wait up to `max_wait` for the next chunk of bytes.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. End of stream and a
    /// raised close signal are errors.
    fn read_chunk(&mut self, max_wait: Duration) -> io::Result<Option<Vec<u8>>>;

    /// Write all bytes to the channel.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Tear the channel down. Further reads and writes fail.
    fn shutdown(&mut self) -> io::Result<()>;

    /// Handle that closes this transport from any thread.
    fn close_signal(&self) -> CloseSignal;
}

/// Cross-thread close flag shared by a transport and its owners.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CloseSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CloseSignal { tx: Arc::new(tx) }
    }

    /// Raise the flag. Idempotent.
    pub fn close(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver for async waiters (`wait_for(|closed| *closed)`).
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "session closed")
}

pub(crate) fn eof_error() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by peer")
}

// ============================================================================
// In-process channel transport
// ============================================================================

/// Session side of an in-process byte channel.
pub struct ChannelTransport {
    rx: Receiver<Vec<u8>>,
    tx: Sender<Vec<u8>>,
    close: CloseSignal,
    shut_down: bool,
}

/// Device side of an in-process byte channel.
///
/// Dropping the peer looks like the device hanging up.
#[derive(Clone)]
pub struct ChannelPeer {
    rx: Receiver<Vec<u8>>,
    tx: Sender<Vec<u8>>,
}

impl ChannelTransport {
    /// Create a connected transport/peer pair.
    pub fn pair() -> (ChannelTransport, ChannelPeer) {
        let (to_peer_tx, to_peer_rx) = crossbeam_channel::unbounded();
        let (to_session_tx, to_session_rx) = crossbeam_channel::unbounded();
        let transport = ChannelTransport {
            rx: to_session_rx,
            tx: to_peer_tx,
            close: CloseSignal::new(),
            shut_down: false,
        };
        let peer = ChannelPeer {
            rx: to_peer_rx,
            tx: to_session_tx,
        };
        (transport, peer)
    }
}

impl Transport for ChannelTransport {
    fn read_chunk(&mut self, max_wait: Duration) -> io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + max_wait;
        loop {
            if self.shut_down || self.close.is_closed() {
                return Err(closed_error());
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            // Short slices so a close from another thread is noticed promptly.
            let slice = (deadline - now).min(CLOSE_POLL_INTERVAL);
            match self.rx.recv_timeout(slice) {
                Ok(data) => return Ok(Some(data)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(eof_error()),
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.shut_down || self.close.is_closed() {
            return Err(closed_error());
        }
        self.tx
            .send(data.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer hung up"))
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.shut_down = true;
        Ok(())
    }

    fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }
}

impl ChannelPeer {
    /// Send bytes to the session. Returns `false` once the session is gone.
    pub fn send(&self, data: impl AsRef<[u8]>) -> bool {
        self.tx.send(data.as_ref().to_vec()).is_ok()
    }

    /// Receive the next chunk the session wrote.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Receive without waiting.
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }

    /// Collect everything the session writes until `needle` shows up or
    /// `timeout` passes. Returns the bytes seen so far either way.
    pub fn read_until(&self, needle: &[u8], timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut seen = Vec::new();
        while !contains(&seen, needle) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(data) => seen.extend_from_slice(&data),
                Err(_) => break,
            }
        }
        seen
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_pair_is_bidirectional() {
        let (mut transport, peer) = ChannelTransport::pair();
        assert!(peer.send(b"User name:"));
        let chunk = transport.read_chunk(Duration::from_millis(100)).unwrap();
        assert_eq!(chunk.as_deref(), Some(&b"User name:"[..]));

        transport.write_all(b"admin\r\n").unwrap();
        assert_eq!(peer.recv_timeout(Duration::from_millis(100)), Some(b"admin\r\n".to_vec()));
    }

    #[test]
    fn test_read_times_out_with_none() {
        let (mut transport, _peer) = ChannelTransport::pair();
        let started = Instant::now();
        let chunk = transport.read_chunk(Duration::from_millis(60)).unwrap();
        assert!(chunk.is_none());
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_peer_drop_is_eof() {
        let (mut transport, peer) = ChannelTransport::pair();
        drop(peer);
        let err = transport.read_chunk(Duration::from_millis(50)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_close_from_other_thread_interrupts_read() {
        let (mut transport, _peer) = ChannelTransport::pair();
        let signal = transport.close_signal();
        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            signal.close();
        });

        let started = Instant::now();
        let err = transport.read_chunk(Duration::from_secs(10)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
        assert!(started.elapsed() < Duration::from_secs(2));
        closer.join().unwrap();
    }

    #[test]
    fn test_close_signal_is_shared() {
        let signal = CloseSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_closed());
        signal.close();
        signal.close();
        assert!(clone.is_closed());
        assert!(*clone.subscribe().borrow());
    }

    #[test]
    fn test_shutdown_rejects_writes() {
        let (mut transport, _peer) = ChannelTransport::pair();
        transport.shutdown().unwrap();
        assert!(transport.write_all(b"exit\r\n").is_err());
    }
}
