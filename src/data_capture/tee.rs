use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use super::injector::Injector;
use crate::error_handling::types::CaptureError;

/// Size of a single relay read.
pub const BUFSIZE: usize = 4096;

/// Duplicates one byte source into writable sinks and internal injectors.
///
/// Each chunk is pushed to every injector first, then written to every sink,
/// waiting for each write to be flushed before the next read. When the source
/// is exhausted, any read/write fails or the close signal is raised, every
/// injector receives end-of-stream and every sink is shut down, exactly once.
pub struct StreamTee<R, W> {
    label: String,
    source: R,
    sinks: Vec<W>,
    injectors: Vec<Injector>,
    close: Option<watch::Receiver<bool>>,
}

impl<R, W> StreamTee<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(label: impl Into<String>, source: R) -> Self {
        Self {
            label: label.into(),
            source,
            sinks: Vec::new(),
            injectors: Vec::new(),
            close: None,
        }
    }

    pub fn sink(mut self, sink: W) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn injector(mut self, injector: Injector) -> Self {
        self.injectors.push(injector);
        self
    }

    /// Stops reading once `close` holds `true`, as if the source had ended.
    pub fn close_on(mut self, close: watch::Receiver<bool>) -> Self {
        self.close = Some(close);
        self
    }

    /// Runs the tee to completion and returns the number of bytes relayed.
    pub async fn run(mut self) -> Result<u64, CaptureError> {
        let copied = self.pump().await;
        self.finalize().await;
        copied
    }

    async fn pump(&mut self) -> Result<u64, CaptureError> {
        let mut buf = vec![0u8; BUFSIZE];
        let mut total = 0u64;
        loop {
            let n = match self.close.as_mut() {
                Some(close) => tokio::select! {
                    read = self.source.read(&mut buf) => read?,
                    Ok(_) = close.wait_for(|closed| *closed) => {
                        debug!("{} closed after {} byte(s)", self.label, total);
                        return Ok(total);
                    }
                },
                None => self.source.read(&mut buf).await?,
            };
            if n == 0 {
                debug!("{} EOF after {} byte(s)", self.label, total);
                return Ok(total);
            }
            let chunk = &buf[..n];
            for injector in &self.injectors {
                injector.feed(chunk);
            }
            for sink in self.sinks.iter_mut() {
                sink.write_all(chunk).await?;
                sink.flush().await?;
            }
            total += n as u64;
            let preview = &chunk[..std::cmp::min(n, 64)];
            trace!(
                "{} relayed {} bytes: {}{}",
                self.label,
                n,
                String::from_utf8_lossy(preview),
                if n > 64 { " ..." } else { "" }
            );
        }
    }

    async fn finalize(&mut self) {
        for injector in self.injectors.drain(..) {
            injector.finish();
        }
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.shutdown().await {
                debug!("{} sink close failed: {}", self.label, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_capture::injector::injected_channel;
    use std::io;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_relays_fragmented_source_to_every_sink_and_injector() {
        let source = Builder::new()
            .read(b"\x02lp\n\x03")
            .read(b"5 dfA\nhel")
            .read(b"lo\0")
            .build();
        let (injector, mut copy) = injected_channel();
        let mut first = Vec::new();
        let mut second = Vec::new();

        let total = StreamTee::new("test", source)
            .sink(&mut first)
            .sink(&mut second)
            .injector(injector)
            .run()
            .await
            .unwrap();

        let expected: &[u8] = b"\x02lp\n\x035 dfA\nhello\0";
        assert_eq!(total, expected.len() as u64);
        assert_eq!(first, expected);
        assert_eq!(second, expected);

        let mut injected = Vec::new();
        copy.read_to_end(&mut injected).await.unwrap();
        assert_eq!(injected, expected);
    }

    #[tokio::test]
    async fn test_source_error_still_finalizes_injectors() {
        let source = Builder::new()
            .read(b"partial")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (injector, mut copy) = injected_channel();
        let mut sink = Vec::new();

        let err = StreamTee::new("test", source)
            .sink(&mut sink)
            .injector(injector)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::TcpStreamError(_)));
        assert_eq!(sink, b"partial");

        let mut injected = Vec::new();
        copy.read_to_end(&mut injected).await.unwrap();
        assert_eq!(injected, b"partial");
    }

    #[tokio::test]
    async fn test_sink_shutdown_on_eof() {
        let (mut near, far) = tokio::io::duplex(64);
        let source: &[u8] = b"abc";
        let (_, far_write) = tokio::io::split(far);

        StreamTee::new("test", source)
            .sink(far_write)
            .run()
            .await
            .unwrap();

        let mut received = Vec::new();
        near.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"abc");
    }

    #[tokio::test]
    async fn test_close_signal_ends_pending_read() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (injector, mut copy) = injected_channel();
        let (close_tx, close_rx) = watch::channel(false);
        let mut sink = Vec::new();

        writer.write_all(b"first").await.unwrap();
        let tee = StreamTee::new("test", reader)
            .sink(&mut sink)
            .injector(injector)
            .close_on(close_rx);
        let (total, _) = tokio::join!(tee.run(), async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            close_tx.send(true).unwrap();
        });

        // The writer is still open: only the signal ended the relay.
        assert_eq!(total.unwrap(), 5);
        assert_eq!(sink, b"first");
        let mut injected = Vec::new();
        copy.read_to_end(&mut injected).await.unwrap();
        assert_eq!(injected, b"first");
        drop(writer);
    }

    #[tokio::test]
    async fn test_empty_source_without_destinations() {
        let source: &[u8] = b"";
        let total = StreamTee::<_, Vec<u8>>::new("test", source).run().await.unwrap();
        assert_eq!(total, 0);
    }
}
