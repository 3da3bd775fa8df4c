//! In-memory, bounded byte pipe between two processes.
//!
//! The write side can be closed with an error marker: the reader then
//! fails with that error instead of seeing a clean end-of-stream. The
//! reader sees end-of-stream only once every writer handle is gone.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;
use tokio_util::sync::PollSender;

/// Number of chunks buffered before writers wait on the reader.
const PIPE_CAPACITY: usize = 16;

/// Largest chunk handed over in a single write.
const MAX_CHUNK: usize = 32 * 1024;

type Chunk = io::Result<Vec<u8>>;

/// Create a connected writer/reader pair.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (sender, receiver) = mpsc::channel(PIPE_CAPACITY);
    let writer = PipeWriter {
        poll: PollSender::new(sender.clone()),
        sender,
    };
    let reader = PipeReader {
        receiver,
        pending: Vec::new(),
        offset: 0,
        done: false,
    };
    (writer, reader)
}

fn closed_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "read side of pipe closed")
}

/// Write side of a [`pipe`]. Clones share the same stream.
#[derive(Clone)]
pub struct PipeWriter {
    sender: mpsc::Sender<Chunk>,
    poll: PollSender<Chunk>,
}

impl PipeWriter {
    /// Drop this handle.
    ///
    /// The reader sees end-of-stream only after every clone is dropped too,
    /// so this is not a close while another clone is alive.
    pub fn close(self) {}

    /// Close the stream, failing the reader's next read with `error`.
    pub async fn close_with_error(self, error: io::Error) {
        // A dropped reader has nothing left to observe.
        let _ = self.sender.send(Err(error)).await;
    }
}

impl AsyncWrite for PipeWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        if ready!(self.poll.poll_reserve(cx)).is_err() {
            return Poll::Ready(Err(closed_pipe()));
        }

        let len = buf.len().min(MAX_CHUNK);
        self.poll
            .send_item(Ok(buf[..len].to_vec()))
            .map_err(|_| closed_pipe())?;
        Poll::Ready(Ok(len))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll.close();
        Poll::Ready(Ok(()))
    }
}

/// Read side of a [`pipe`].
pub struct PipeReader {
    receiver: mpsc::Receiver<Chunk>,
    pending: Vec<u8>,
    offset: usize,
    done: bool,
}

impl AsyncRead for PipeReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        loop {
            if this.offset < this.pending.len() {
                let len = buf.remaining().min(this.pending.len() - this.offset);
                buf.put_slice(&this.pending[this.offset..this.offset + len]);
                this.offset += len;
                return Poll::Ready(Ok(()));
            }

            if this.done {
                return Poll::Ready(Ok(()));
            }

            match ready!(this.receiver.poll_recv(cx)) {
                Some(Ok(chunk)) => {
                    this.pending = chunk;
                    this.offset = 0;
                }
                Some(Err(error)) => {
                    this.done = true;
                    return Poll::Ready(Err(error));
                }
                None => {
                    this.done = true;
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}
