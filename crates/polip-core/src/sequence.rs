//! Sequence counter: the per-device anti-replay value.
//!
//! The counter is advanced after every verified round trip and wraps to
//! zero at the rollover bound. It is the only mutable part of a session.

use std::num::NonZeroU64;

use crate::error::CoreError;

/// The local envelope counter and its optional exclusive upper bound.
///
/// Invariant: `value < rollover` whenever a rollover is set, except after
/// [`resync`](Self::resync) with an out-of-range server value, which the
/// next [`advance`](Self::advance) folds back to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceState {
    value: u64,
    rollover: Option<NonZeroU64>,
}

impl SequenceState {
    /// Create a counter, checking the rollover invariant.
    pub fn new(value: u64, rollover: Option<u64>) -> Result<Self, CoreError> {
        let rollover = match rollover {
            Some(r) => Some(NonZeroU64::new(r).ok_or(CoreError::ZeroRollover)?),
            None => None,
        };
        if let Some(r) = rollover {
            if value >= r.get() {
                return Err(CoreError::ValueOutOfRange {
                    value,
                    rollover: r.get(),
                });
            }
        }
        Ok(Self { value, rollover })
    }

    /// A counter with no rollover bound.
    pub const fn unbounded(value: u64) -> Self {
        Self {
            value,
            rollover: None,
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn rollover(&self) -> Option<u64> {
        self.rollover.map(NonZeroU64::get)
    }

    /// The next counter value.
    ///
    /// Wraps to zero at the rollover bound, or at `u64::MAX` when unbounded.
    #[must_use]
    pub fn advance(self) -> Self {
        let next = self.value.wrapping_add(1);
        let next = match self.rollover {
            Some(r) if next >= r.get() => 0,
            _ => next,
        };
        Self {
            value: next,
            ..self
        }
    }

    /// Overwrite the value with the server's authoritative counter.
    #[must_use]
    pub fn resync(self, authoritative: u64) -> Self {
        Self {
            value: authoritative,
            ..self
        }
    }
}

impl Default for SequenceState {
    fn default() -> Self {
        Self::unbounded(0)
    }
}
