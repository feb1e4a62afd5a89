//! File-to-file copy through two passthrough stages.
//!
//! This example demonstrates:
//! - Building a chain: source, two transforms, sink
//! - Driving it with `copy_from` and reading the completion value
//!
//! ```sh
//! cargo run --example file_copy -- <path>
//! ```
//!
//! Copies `<path>` to `<path>_`.

use siphon::{FileSink, FileSource, PassThrough, TransformStage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: file_copy <path>")?;

    let source = Box::new(FileSource::new(&path)?);
    let inner = Box::new(TransformStage::new(PassThrough, source));
    let chain = Box::new(TransformStage::new(PassThrough, inner));

    let sink = FileSink::new(format!("{path}_"))?;
    let total = sink.copy_from(chain).await?;

    println!("done: {total} bytes");
    Ok(())
}
