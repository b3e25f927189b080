//! Issue-order gating of read responses.
//!
//! Every outbound read gets a strictly increasing sequence number. A response
//! is applied only if its number is above the watermark of the newest read
//! that has already settled, so a slow response to an old query can never
//! overwrite the result of a newer one.

use crate::domain::{FeedError, Result};

/// Sequence number attached to an outbound read.
pub type Seq = u64;

/// Numbers outbound reads and admits only responses newer than the last
/// settled one.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    last_issued: Seq,
    last_settled: Seq,
}

impl RequestSequencer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_issued: 0,
            last_settled: 0,
        }
    }

    /// Allocates the sequence number for a new read.
    pub fn issue(&mut self) -> Seq {
        self.last_issued += 1;
        self.last_issued
    }

    /// Admits a response for read `seq`, advancing the watermark.
    ///
    /// Failed reads are admitted the same way: once the newest read has
    /// settled, responses to older reads are stale whatever its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::StaleResponse`] if a read issued at or after `seq`
    /// has already settled.
    pub fn admit(&mut self, seq: Seq) -> Result<()> {
        if seq <= self.last_settled {
            tracing::debug!(seq, watermark = self.last_settled, "discarding stale response");
            return Err(FeedError::StaleResponse { seq });
        }
        self.last_settled = seq;
        Ok(())
    }

    /// Whether the most recently issued read has not settled yet.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.last_issued > self.last_settled
    }

    /// Sequence number of the newest read sent.
    #[must_use]
    pub const fn last_issued(&self) -> Seq {
        self.last_issued
    }

    /// Watermark: the newest read whose response was admitted.
    #[must_use]
    pub const fn last_settled(&self) -> Seq {
        self.last_settled
    }
}
