use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy, Serialize, Deserialize)]
pub enum Direction {
    /// Uplink
    Ul,
    /// Downlink
    Dl,
}

impl Direction {
    #[inline]
    pub fn is_ul(&self) -> bool {
        matches!(self, Direction::Ul)
    }

    #[inline]
    pub fn is_dl(&self) -> bool {
        matches!(self, Direction::Dl)
    }

    /// Index usable for per-direction arrays
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Direction::Ul => 0,
            Direction::Dl => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ul => write!(f, "UL"),
            Direction::Dl => write!(f, "DL"),
        }
    }
}
