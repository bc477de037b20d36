use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

/// Creates a connected injector/reader pair.
pub fn injected_channel() -> (Injector, InjectedStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Injector { tx },
        InjectedStream {
            rx,
            pending: Bytes::new(),
        },
    )
}

/// Writing end of an internal byte stream.
///
/// Dropping the injector (or calling [`Injector::finish`]) signals end-of-stream.
#[derive(Debug)]
pub struct Injector {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl Injector {
    /// Appends a chunk. Never waits; data fed after the reader is gone is dropped.
    pub fn feed(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let _ = self.tx.send(Bytes::copy_from_slice(data));
    }

    pub fn finish(self) {}
}

/// Reading end of an internal byte stream, yielding chunks in feed order.
#[derive(Debug)]
pub struct InjectedStream {
    rx: mpsc::UnboundedReceiver<Bytes>,
    pending: Bytes,
}

impl AsyncRead for InjectedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        while this.pending.is_empty() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(chunk) => this.pending = chunk,
                None => return Poll::Ready(Ok(())),
            }
        }
        let n = std::cmp::min(buf.remaining(), this.pending.len());
        buf.put_slice(&this.pending.split_to(n));
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_chunks_are_read_in_order_until_finish() {
        let (injector, mut stream) = injected_channel();
        injector.feed(b"\x02lp\n");
        injector.feed(b"");
        injector.feed(b"\x035 dfA\nhello\0");
        injector.finish();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"\x02lp\n\x035 dfA\nhello\0");
    }

    #[tokio::test]
    async fn test_small_reads_split_pending_chunk() {
        let (injector, mut stream) = injected_channel();
        injector.feed(b"abcdef");
        drop(injector);

        let mut two = [0u8; 2];
        stream.read_exact(&mut two).await.unwrap();
        assert_eq!(&two, b"ab");
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"cdef");
    }

    #[tokio::test]
    async fn test_feed_after_reader_dropped_is_ignored() {
        let (injector, stream) = injected_channel();
        drop(stream);
        injector.feed(b"lost");
    }
}
