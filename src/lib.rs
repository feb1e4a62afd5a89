//! # siphon
//!
//! Pull-driven byte copy chains: a file [`FileSource`], a file
//! [`FileSink`], and optional [`TransformStage`]s in between, linked by a
//! shared pull protocol and a single reusable chunk buffer.
//!
//! ## Architecture
//!
//! - **Pull, not push**: the sink asks its upstream for the next chunk and
//!   writes it before asking again, so flow control is one request in
//!   flight per link instead of push-based backpressure.
//! - **One buffer**: the sink owns the chunk buffer and lends it up the
//!   chain by mutable reference for each fulfillment.
//!
//! ## Example
//!
//! ```ignore
//! use siphon::{FileSink, FileSource, PassThrough, TransformStage};
//!
//! #[tokio::main]
//! async fn main() -> siphon::Result<()> {
//!     let source = Box::new(FileSource::new("origin.bin")?);
//!     let chain = Box::new(TransformStage::new(PassThrough, source));
//!     let total = FileSink::new("copy.bin")?.copy_from(chain).await?;
//!     println!("copied {total} bytes");
//!     Ok(())
//! }
//! ```

pub mod encoding;
pub mod error;
pub mod options;
pub mod sink;
pub mod source;
pub mod stage;
pub mod transform;

pub use encoding::Encoding;
pub use error::{Result, SiphonError};
pub use options::{SinkOptions, SourceOptions, WriteMode, DEFAULT_BUFFER_SIZE};
pub use sink::FileSink;
pub use source::FileSource;
pub use stage::{Pull, Stage};
pub use transform::{InPlaceFn, PassThrough, Transform, TransformStage};
