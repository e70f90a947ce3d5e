//! Blocking-to-async body bridge
//!
//! The body of an artifact download is written by the synchronous copier on
//! the blocking pool. [`ChannelWriter`] is its `io::Write` end, [`ChannelBody`]
//! the hyper body that drains the same bounded channel on the connection task.

use std::io::{self, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::body::{Body, Bytes, Frame};
use tokio::sync::mpsc;

type Chunk = io::Result<Bytes>;

/// Create a connected writer and body buffering at most `capacity` chunks
pub fn channel(capacity: usize) -> (ChannelWriter, ChannelBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelWriter { tx }, ChannelBody { rx })
}

/// Response body fed by a [`ChannelWriter`]
///
/// Ends when every writer is dropped; an aborted writer ends it with an error,
/// which makes hyper drop the connection instead of finishing the response.
#[derive(Debug)]
pub struct ChannelBody {
    rx: mpsc::Receiver<Chunk>,
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.rx
            .poll_recv(cx)
            .map(|chunk| chunk.map(|res| res.map(Frame::data)))
    }
}

/// Blocking writer side of a [`ChannelBody`]
///
/// Must only be used outside the async runtime (e.g. in `spawn_blocking`).
#[derive(Debug, Clone)]
pub struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
}

impl ChannelWriter {
    /// End the body with `error`
    pub fn abort(self, error: io::Error) {
        // Receiver gone means the client is gone too
        let _ = self.tx.blocking_send(Err(error));
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
