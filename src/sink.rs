//! File-backed destination stage and the chain drive loop.
//!
//! The sink sits at the downstream end of the chain. It owns the shared
//! chunk buffer and the destination descriptor, and it is the only
//! component that issues pulls: one before the first write, and one more
//! after each chunk lands. There is never more than one chunk in flight.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWrite, AsyncWriteExt, SeekFrom};

use crate::encoding::Encoding;
use crate::error::{Result, SiphonError};
use crate::options::{SinkOptions, WriteMode};
use crate::stage::{Completion, Pull, Stage};

/// Consecutive zero-byte write confirmations tolerated before the chain is
/// failed with [`SiphonError::WriteStalled`].
pub const MAX_ZERO_WRITE_RETRIES: u32 = 3;

/// Destination stage writing to a file.
///
/// Construct, bind the upstream chain with [`bind_source`], then drive it
/// with [`run`]; or use [`copy_from`] to do both. `run` consumes the sink,
/// so the completion value is produced exactly once.
///
/// [`bind_source`]: FileSink::bind_source
/// [`run`]: FileSink::run
/// [`copy_from`]: FileSink::copy_from
pub struct FileSink {
    path: Option<PathBuf>,
    file: Option<File>,
    options: SinkOptions,
    encoding: Encoding,
    /// Destination write offset. Advanced only by bytes the destination
    /// actually confirms.
    pos: u64,
    bytes_written: u64,
    /// The chain's single shared buffer. Allocated lazily on the first
    /// pull and reused for every fulfillment afterwards.
    buffer: Vec<u8>,
    source: Option<Box<dyn Stage>>,
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("file", &self.file)
            .field("options", &self.options)
            .field("encoding", &self.encoding)
            .field("pos", &self.pos)
            .field("bytes_written", &self.bytes_written)
            .field("buffer", &self.buffer)
            .field("source", &self.source.as_ref().map(|_| "dyn Stage"))
            .finish()
    }
}

impl FileSink {
    /// Create a sink for `path` with default options.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, SinkOptions::default())
    }

    /// Create a sink for `path`. Option validation runs here, before any
    /// descriptor is opened.
    pub fn with_options(path: impl AsRef<Path>, options: SinkOptions) -> Result<Self> {
        let encoding = options.validate()?;
        Ok(Self {
            path: Some(path.as_ref().to_path_buf()),
            file: None,
            pos: options.start as u64,
            options,
            encoding,
            bytes_written: 0,
            buffer: Vec::new(),
            source: None,
        })
    }

    /// Wrap a pre-opened handle with explicit options; the open step is
    /// skipped.
    pub fn from_file_with_options(file: std::fs::File, options: SinkOptions) -> Result<Self> {
        let encoding = options.validate()?;
        Ok(Self {
            path: None,
            file: Some(File::from_std(file)),
            pos: options.start as u64,
            options,
            encoding,
            bytes_written: 0,
            buffer: Vec::new(),
            source: None,
        })
    }

    /// Wrap a pre-opened handle with default options.
    pub fn from_file(file: std::fs::File) -> Self {
        Self {
            path: None,
            file: Some(File::from_std(file)),
            options: SinkOptions::default(),
            encoding: Encoding::default(),
            pos: 0,
            bytes_written: 0,
            buffer: Vec::new(),
            source: None,
        }
    }

    /// The validated encoding this sink was constructed with.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Total bytes the destination has confirmed so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Bind the upstream stage. A sink drives exactly one chain, so
    /// binding a second source is rejected with `InvalidState`.
    pub fn bind_source(&mut self, source: Box<dyn Stage>) -> Result<()> {
        if self.source.is_some() {
            return Err(SiphonError::InvalidState("sink already has a bound source"));
        }
        self.source = Some(source);
        tracing::debug!("source bound to sink");
        Ok(())
    }

    /// Bind `source` and drive the chain to completion.
    pub async fn copy_from(mut self, source: Box<dyn Stage>) -> Result<u64> {
        self.bind_source(source)?;
        self.run().await
    }

    /// Drive the bound chain to completion. Returns the total number of
    /// bytes the destination confirmed.
    ///
    /// On a terminal error every stage in the chain is closed, the
    /// destination included, before the error is returned.
    pub async fn run(mut self) -> Result<u64> {
        let mut source = match self.source.take() {
            Some(source) => source,
            None => return Err(SiphonError::InvalidState("run called before bind_source")),
        };
        let mut completion = Completion::new();
        match self.drive(source.as_mut()).await {
            Ok(total) => {
                completion.complete();
                Ok(total)
            }
            Err(err) => {
                // Terminal error: tear down the whole chain. The first
                // error wins; secondary close failures are only logged.
                if let Err(close_err) = source.close().await {
                    tracing::warn!(error = %close_err, "upstream close failed during teardown");
                }
                self.file.take();
                completion.complete();
                Err(err)
            }
        }
    }

    async fn drive(&mut self, source: &mut dyn Stage) -> Result<u64> {
        // Open before the first pull, matching bind-time open semantics:
        // an immediate end of input still produces an empty destination.
        self.open_destination().await?;
        if self.buffer.is_empty() {
            self.buffer = vec![0u8; self.options.buffer_size];
        }
        loop {
            match source.pull(&mut self.buffer).await? {
                Pull::Data(n) => {
                    let written = self.write_chunk(n).await?;
                    self.pos += written as u64;
                    self.bytes_written += written as u64;
                    tracing::trace!(bytes = written, pos = self.pos, "chunk written");
                }
                Pull::End => {
                    self.close_destination().await?;
                    source.close().await?;
                    tracing::debug!(total = self.bytes_written, "chain complete");
                    return Ok(self.bytes_written);
                }
            }
        }
    }

    /// Write the first `len` buffered bytes at the current cursor.
    async fn write_chunk(&mut self, len: usize) -> Result<usize> {
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => return Err(SiphonError::InvalidState("destination descriptor missing")),
        };
        // Append mode positions itself; everything else writes at the cursor.
        if self.options.mode != WriteMode::Append {
            file.seek(SeekFrom::Start(self.pos))
                .await
                .map_err(SiphonError::Write)?;
        }
        write_all_confirmed(file, &self.buffer[..len], MAX_ZERO_WRITE_RETRIES).await
    }

    async fn open_destination(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }
        let path = match &self.path {
            Some(path) => path.clone(),
            None => {
                return Err(SiphonError::InvalidArgument(
                    "sink requires a path or a pre-opened file".to_string(),
                ))
            }
        };
        let mut open = OpenOptions::new();
        open.write(true);
        match self.options.mode {
            WriteMode::Truncate => {
                open.create(true).truncate(true);
            }
            WriteMode::Append => {
                open.create(true).append(true);
            }
            WriteMode::CreateNew => {
                open.create_new(true);
            }
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open.mode(self.options.permissions);
        }
        let file = open.open(&path).await.map_err(|source| SiphonError::Open {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), mode = ?self.options.mode, "opened destination");
        self.file = Some(file);
        Ok(())
    }

    /// Close the destination after end of input. A flush-to-disk failure
    /// here reaches the caller like any write failure would.
    async fn close_destination(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            if self.options.auto_close {
                file.sync_all().await.map_err(SiphonError::Close)?;
            }
        }
        Ok(())
    }
}

/// Write `chunk` fully to `writer`, returning the number of bytes the
/// writer confirmed.
///
/// A non-zero partial confirmation continues with the remainder of the
/// chunk. Zero-byte confirmations with no error are retried up to
/// `max_zero_retries` consecutive times, then escalated to
/// [`SiphonError::WriteStalled`] rather than looping indefinitely.
async fn write_all_confirmed<W>(writer: &mut W, chunk: &[u8], max_zero_retries: u32) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0usize;
    let mut zero_writes = 0u32;
    while written < chunk.len() {
        let n = writer
            .write(&chunk[written..])
            .await
            .map_err(SiphonError::Write)?;
        if n == 0 {
            zero_writes += 1;
            if zero_writes > max_zero_retries {
                return Err(SiphonError::WriteStalled {
                    retries: zero_writes,
                });
            }
            tokio::task::yield_now().await;
            continue;
        }
        zero_writes = 0;
        written += n;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Writer that always confirms zero bytes.
    struct ZeroWriter;

    impl AsyncWrite for ZeroWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(0))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Writer that confirms at most `cap` bytes per call.
    struct TrickleWriter {
        out: Vec<u8>,
        cap: usize,
    }

    impl AsyncWrite for TrickleWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            let n = buf.len().min(self.cap);
            self.out.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn write_all_confirmed_single_pass() {
        let mut writer = Cursor::new(Vec::new());
        let n = write_all_confirmed(&mut writer, b"hello", MAX_ZERO_WRITE_RETRIES)
            .await
            .unwrap();
        assert_eq!(n, 5);
        assert_eq!(writer.into_inner(), b"hello");
    }

    #[tokio::test]
    async fn write_all_confirmed_continues_partial_writes() {
        let mut writer = TrickleWriter {
            out: Vec::new(),
            cap: 3,
        };
        let n = write_all_confirmed(&mut writer, b"hello world", MAX_ZERO_WRITE_RETRIES)
            .await
            .unwrap();
        assert_eq!(n, 11);
        assert_eq!(writer.out, b"hello world");
    }

    #[tokio::test]
    async fn zero_byte_writes_escalate_to_stall() {
        let mut writer = ZeroWriter;
        let err = write_all_confirmed(&mut writer, b"hello", MAX_ZERO_WRITE_RETRIES)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SiphonError::WriteStalled {
                retries
            } if retries == MAX_ZERO_WRITE_RETRIES + 1
        ));
    }

    #[tokio::test]
    async fn empty_chunk_confirms_nothing() {
        let mut writer = ZeroWriter;
        let n = write_all_confirmed(&mut writer, b"", MAX_ZERO_WRITE_RETRIES)
            .await
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn negative_start_fails_before_open() {
        let options = SinkOptions {
            start: -1,
            ..Default::default()
        };
        let err = FileSink::with_options("/nonexistent/dest", options).unwrap_err();
        assert!(matches!(err, SiphonError::OutOfRange { start: -1 }));
    }

    #[test]
    fn second_bind_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path().join("dest")).unwrap();
        sink.bind_source(Box::new(NullSource)).unwrap();
        let err = sink.bind_source(Box::new(NullSource)).unwrap_err();
        assert!(matches!(err, SiphonError::InvalidState(_)));
    }

    #[tokio::test]
    async fn run_before_bind_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("dest")).unwrap();
        let err = sink.run().await.unwrap_err();
        assert!(matches!(err, SiphonError::InvalidState(_)));
    }

    /// Origin that ends immediately.
    struct NullSource;

    #[async_trait::async_trait]
    impl Stage for NullSource {
        async fn pull(&mut self, _buf: &mut [u8]) -> Result<Pull> {
            Ok(Pull::End)
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }
}
