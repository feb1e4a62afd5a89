//! The link protocol shared by every chain stage.
//!
//! A chain is a tower of owned stages: the sink owns its upstream stage,
//! each transform owns its own upstream, and the ultimate upstream is a
//! source. Data moves by pulls issued downstream-to-upstream; every pull is
//! answered exactly once with data, end of input, or an error.
//!
//! Each link steps through `Idle -> Requested -> Fulfilled`, re-entering
//! `Requested` on the next pull, until a terminal response (end or error)
//! moves it to `Terminated`. At most one pull is outstanding per link at any
//! time: `pull` takes `&mut self` and the caller awaits its future, so a
//! second outstanding pull is unrepresentable. [`LinkState`] makes the
//! remaining hazard, pulling on a terminated link, a deterministic
//! `InvalidState` error instead of undefined behavior.

use async_trait::async_trait;

use crate::error::{Result, SiphonError};

/// Response to a fulfilled pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// This many bytes were placed at the front of the shared buffer.
    Data(usize),
    /// Physical end of input. Terminal: the link accepts no further pulls.
    End,
}

/// One stage in a pull chain.
///
/// Implemented by sources (fulfill pulls with physical reads) and
/// transforms (relay pulls upstream, mutate data chunks in flight). The
/// sink is not a `Stage`: it sits at the downstream end and drives the
/// chain.
#[async_trait]
pub trait Stage: Send {
    /// Fulfill one pull request, placing any data at the front of `buf`.
    ///
    /// `buf` is the chain's single shared buffer, lent by the sink for the
    /// duration of this fulfillment. Errors are terminal for the link.
    async fn pull(&mut self, buf: &mut [u8]) -> Result<Pull>;

    /// Tear down this stage and everything upstream of it.
    ///
    /// Called after end of input and after a terminal error. Must be
    /// idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// Per-link protocol state.
///
/// Stages drive their own tracker through the transitions; the tracker
/// rejects pulls that arrive after a terminal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No pull has been issued yet.
    #[default]
    Idle,
    /// A pull is outstanding.
    Requested,
    /// The last pull was answered with data.
    Fulfilled,
    /// End or error was delivered. No further pulls are permitted.
    Terminated,
}

impl LinkState {
    /// Record an incoming pull. Fails on a terminated link or when a pull
    /// is already outstanding.
    pub fn begin_pull(&mut self) -> Result<()> {
        match self {
            Self::Idle | Self::Fulfilled => {
                *self = Self::Requested;
                Ok(())
            }
            Self::Requested => Err(SiphonError::InvalidState(
                "pull already outstanding on this link",
            )),
            Self::Terminated => Err(SiphonError::InvalidState("pull on a terminated link")),
        }
    }

    /// Record the response to the outstanding pull.
    pub fn fulfill(&mut self, pull: Pull) {
        *self = match pull {
            Pull::Data(_) => Self::Fulfilled,
            Pull::End => Self::Terminated,
        };
    }

    /// Force the link into the terminal state (error delivery, teardown).
    pub fn terminate(&mut self) {
        *self = Self::Terminated;
    }

    /// Whether a terminal response has been delivered.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

/// Single-use completion token.
///
/// The drive loop arms one of these and must complete it exactly once; a
/// second completion panics rather than silently reporting twice.
#[derive(Debug, Default)]
pub struct Completion {
    done: bool,
}

impl Completion {
    /// Create an armed token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the chain complete. Panics if already completed.
    pub fn complete(&mut self) {
        assert!(!self.done, "chain completion delivered twice");
        self.done = true;
    }

    /// Whether the chain has completed.
    pub fn is_complete(&self) -> bool {
        self.done
    }
}
