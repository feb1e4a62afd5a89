//! File-backed origin stage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use crate::encoding::Encoding;
use crate::error::{Result, SiphonError};
use crate::options::SourceOptions;
use crate::stage::{LinkState, Pull, Stage};

/// Origin stage reading from a file.
///
/// The descriptor is opened lazily on the first pull unless a pre-opened
/// handle was supplied. Each pull performs exactly one physical read into
/// the shared buffer; a new read begins only when the next pull arrives, so
/// there is never any read-ahead.
#[derive(Debug)]
pub struct FileSource {
    path: Option<PathBuf>,
    file: Option<File>,
    options: SourceOptions,
    encoding: Encoding,
    /// Current read offset, advanced by bytes actually read.
    pos: u64,
    positioned: bool,
    link: LinkState,
}

impl FileSource {
    /// Create a source for `path` with default options.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, SourceOptions::default())
    }

    /// Create a source for `path`. Option validation runs here, before any
    /// descriptor is opened.
    pub fn with_options(path: impl AsRef<Path>, options: SourceOptions) -> Result<Self> {
        let encoding = options.validate()?;
        Ok(Self {
            path: Some(path.as_ref().to_path_buf()),
            file: None,
            pos: options.start as u64,
            positioned: options.start == 0,
            options,
            encoding,
            link: LinkState::default(),
        })
    }

    /// Wrap a pre-opened handle; the open step is skipped.
    pub fn from_file(file: std::fs::File) -> Self {
        // Default options always validate.
        Self {
            path: None,
            file: Some(File::from_std(file)),
            options: SourceOptions::default(),
            encoding: Encoding::default(),
            pos: 0,
            positioned: true,
            link: LinkState::default(),
        }
    }

    /// Wrap a pre-opened handle with explicit options.
    pub fn from_file_with_options(file: std::fs::File, options: SourceOptions) -> Result<Self> {
        let encoding = options.validate()?;
        Ok(Self {
            path: None,
            file: Some(File::from_std(file)),
            pos: options.start as u64,
            positioned: options.start == 0,
            options,
            encoding,
            link: LinkState::default(),
        })
    }

    /// The validated encoding this source was constructed with.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Current read offset.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Open the descriptor if needed and apply the one-time start offset.
    async fn ensure_open(&mut self) -> Result<()> {
        if self.file.is_none() {
            let path = match &self.path {
                Some(path) => path.clone(),
                None => {
                    return Err(SiphonError::InvalidArgument(
                        "source requires a path or a pre-opened file".to_string(),
                    ))
                }
            };
            let file = File::open(&path)
                .await
                .map_err(|source| SiphonError::Open {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(path = %path.display(), "opened origin");
            self.file = Some(file);
        }
        if !self.positioned {
            if let Some(file) = self.file.as_mut() {
                file.seek(SeekFrom::Start(self.pos))
                    .await
                    .map_err(SiphonError::Read)?;
            }
            self.positioned = true;
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for FileSource {
    async fn pull(&mut self, buf: &mut [u8]) -> Result<Pull> {
        self.link.begin_pull()?;
        if let Err(err) = self.ensure_open().await {
            self.link.terminate();
            return Err(err);
        }
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => {
                self.link.terminate();
                return Err(SiphonError::InvalidState("origin descriptor missing"));
            }
        };
        let n = match file.read(buf).await {
            Ok(n) => n,
            Err(source) => {
                self.link.terminate();
                return Err(SiphonError::Read(source));
            }
        };
        if n == 0 {
            self.link.fulfill(Pull::End);
            tracing::debug!(pos = self.pos, "origin reached end of input");
            return Ok(Pull::End);
        }
        self.pos += n as u64;
        self.link.fulfill(Pull::Data(n));
        tracing::trace!(bytes = n, pos = self.pos, "origin chunk read");
        Ok(Pull::Data(n))
    }

    async fn close(&mut self) -> Result<()> {
        self.link.terminate();
        if self.options.auto_close {
            // Read descriptors have nothing to flush; dropping releases them.
            self.file.take();
        }
        Ok(())
    }
}
