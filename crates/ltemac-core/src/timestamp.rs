use core::fmt;

use serde::{Deserialize, Serialize};

/// Absolute capture timestamp of a frame, in microseconds since the epoch used by the capture.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CaptureTs(pub u64);

impl CaptureTs {
    pub fn from_millis(ms: u64) -> Self {
        CaptureTs(ms * 1000)
    }

    pub fn from_secs_nsecs(secs: u64, nsecs: u32) -> Self {
        CaptureTs(secs * 1_000_000 + (nsecs / 1000) as u64)
    }

    /// Microseconds elapsed since `earlier`. Saturates at zero if `earlier` is in the future.
    pub fn elapsed_us(self, earlier: CaptureTs) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Whole milliseconds elapsed since `earlier`, truncated.
    pub fn elapsed_ms(self, earlier: CaptureTs) -> u32 {
        (self.elapsed_us(earlier) / 1000).min(u32::MAX as u64) as u32
    }
}

impl fmt::Display for CaptureTs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

impl fmt::Debug for CaptureTs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}
