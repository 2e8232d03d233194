//! TCP transport for real consoles.
//!
//! The session API is blocking, so the transport owns a single-threaded tokio
//! runtime and blocks on it for every read and write. A read races the
//! bounded wait against the close signal.

use crate::transport::{closed_error, eof_error, CloseSignal, Transport};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tracing::{debug, trace};

/// Read buffer size; console output arrives in small bursts.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Telnet-style TCP connection to an OLT.
pub struct TcpTransport {
    runtime: Runtime,
    stream: Option<TcpStream>,
    peer: String,
    close: CloseSignal,
}

impl TcpTransport {
    /// Connect to `host:port`, giving up after `timeout`.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let peer = format!("{}:{}", host, port);

        let stream = runtime.block_on(async {
            match tokio::time::timeout(timeout, TcpStream::connect(&peer)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no answer within {:?}", timeout),
                )),
            }
        })?;
        stream.set_nodelay(true)?;
        debug!(peer = %peer, "connected");

        Ok(TcpTransport {
            runtime,
            stream: Some(stream),
            peer,
            close: CloseSignal::new(),
        })
    }

    /// The `host:port` this transport is connected to.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Transport for TcpTransport {
    fn read_chunk(&mut self, max_wait: Duration) -> io::Result<Option<Vec<u8>>> {
        let mut closed = self.close.subscribe();
        let stream = match self.stream.as_mut() {
            Some(stream) if !self.close.is_closed() => stream,
            _ => return Err(closed_error()),
        };
        let mut buf = [0u8; READ_CHUNK_SIZE];

        let result = self.runtime.block_on(async {
            tokio::select! {
                _ = closed.wait_for(|closed| *closed) => Err(closed_error()),
                read = tokio::time::timeout(max_wait, stream.read(&mut buf)) => match read {
                    Err(_) => Ok(None),
                    Ok(Ok(0)) => Err(eof_error()),
                    Ok(Ok(n)) => Ok(Some(n)),
                    Ok(Err(e)) => Err(e),
                },
            }
        });

        let chunk = result?.map(|n| buf[..n].to_vec());
        if let Some(chunk) = &chunk {
            trace!(peer = %self.peer, bytes = chunk.len(), "read");
        }
        Ok(chunk)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let runtime = &self.runtime;
        let stream = match self.stream.as_mut() {
            Some(stream) if !self.close.is_closed() => stream,
            _ => return Err(closed_error()),
        };
        runtime.block_on(async {
            stream.write_all(data).await?;
            stream.flush().await
        })
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!(peer = %self.peer, "closing connection");
            self.runtime.block_on(stream.shutdown())?;
        }
        Ok(())
    }

    fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
