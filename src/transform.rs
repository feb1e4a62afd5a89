//! Intermediate chain stages that mutate chunk bytes in flight.

use async_trait::async_trait;

use crate::error::Result;
use crate::stage::{LinkState, Pull, Stage};

/// In-place mutation of one data chunk.
///
/// Implementations must not change the number of bytes in the chunk: chunk
/// boundaries belong to the chain, not the transform. A transform that
/// cannot work in place allocates its own scratch buffer inside `apply` and
/// copies the result back.
pub trait Transform: Send {
    /// Mutate one chunk. An error terminates the whole chain.
    fn apply(&mut self, chunk: &mut [u8]) -> Result<()>;
}

/// Identity transform; relays chunks untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl Transform for PassThrough {
    fn apply(&mut self, _chunk: &mut [u8]) -> Result<()> {
        Ok(())
    }
}

/// Adapter turning a closure into a [`Transform`].
pub struct InPlaceFn<F>(pub F);

impl<F> Transform for InPlaceFn<F>
where
    F: FnMut(&mut [u8]) + Send,
{
    fn apply(&mut self, chunk: &mut [u8]) -> Result<()> {
        (self.0)(chunk);
        Ok(())
    }
}

/// Chain stage wrapping a [`Transform`].
///
/// Relays every pull to its own upstream, applies the transform to data
/// chunks before replying downstream, and passes end/error through
/// unchanged in both status and ordering.
pub struct TransformStage<T> {
    upstream: Box<dyn Stage>,
    transform: T,
    link: LinkState,
}

impl<T: Transform> TransformStage<T> {
    /// Bind `transform` in front of `upstream`.
    pub fn new(transform: T, upstream: Box<dyn Stage>) -> Self {
        Self {
            upstream,
            transform,
            link: LinkState::default(),
        }
    }
}

#[async_trait]
impl<T: Transform> Stage for TransformStage<T> {
    async fn pull(&mut self, buf: &mut [u8]) -> Result<Pull> {
        self.link.begin_pull()?;
        match self.upstream.pull(buf).await {
            Ok(Pull::Data(n)) => {
                if let Err(err) = self.transform.apply(&mut buf[..n]) {
                    self.link.terminate();
                    return Err(err);
                }
                self.link.fulfill(Pull::Data(n));
                Ok(Pull::Data(n))
            }
            Ok(Pull::End) => {
                self.link.fulfill(Pull::End);
                Ok(Pull::End)
            }
            Err(err) => {
                self.link.terminate();
                Err(err)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.link.terminate();
        self.upstream.close().await
    }
}
