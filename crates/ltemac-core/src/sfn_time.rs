use core::fmt;

use serde::{Deserialize, Serialize};

use crate::EngineErr;

/// Number of system frames before the SFN wraps back to 0
pub const SFN_WRAP: u16 = 1024;

/// Value of integer subframe time where it wraps back to 0.
pub const SUBFRAME_INT_WRAP: i32 = SFN_WRAP as i32 * 10;

/// Difference between two int times, handling wrap-around of the system frame number.
pub fn subframe_int_diff(a: i32, b: i32) -> i32 {
    let mut diff = a - b;
    while diff < -SUBFRAME_INT_WRAP / 2 { diff += SUBFRAME_INT_WRAP; }
    while diff >= SUBFRAME_INT_WRAP / 2 { diff -= SUBFRAME_INT_WRAP; }
    diff
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SfnTime {
    /// System frame number, from 0 to 1023
    pub sfn: u16,
    /// Subframe number, from 0 to 9
    pub sf: u8,
}

impl SfnTime {
    pub fn new(sfn: u16, sf: u8) -> Result<SfnTime, EngineErr> {
        let t = SfnTime { sfn, sf };
        if !t.is_valid() {
            return Err(EngineErr::InvalidValue {
                field: if sfn >= SFN_WRAP { "sfn" } else { "sf" },
                value: if sfn >= SFN_WRAP { sfn as u64 } else { sf as u64 },
            });
        }
        Ok(t)
    }

    pub fn is_valid(self) -> bool {
        self.sfn < SFN_WRAP && self.sf <= 9
    }

    pub fn to_int(self) -> i32 {
        self.sfn as i32 * 10 + self.sf as i32
    }

    /// Converts an i32 subframe time into an SfnTime, wrapping around at 1024 frames
    pub fn from_int(time: i32) -> SfnTime {
        let t = time.rem_euclid(SUBFRAME_INT_WRAP);
        SfnTime {
            sfn: (t / 10) as u16,
            sf: (t % 10) as u8,
        }
    }

    /// Add a number of subframes to an SfnTime
    pub fn add_subframes(self, num: i32) -> SfnTime {
        SfnTime::from_int(self.to_int() + num)
    }

    /// Signed difference between two SfnTimes in subframes, closest wrap interpretation
    pub fn diff(self, b: Self) -> i32 {
        subframe_int_diff(self.to_int(), b.to_int())
    }

    /// Number of subframes to step forward from `earlier` to reach this time.
    /// Always in 0..SUBFRAME_INT_WRAP, as time is assumed to only move forward.
    pub fn forward_from(self, earlier: Self) -> u32 {
        (self.to_int() - earlier.to_int()).rem_euclid(SUBFRAME_INT_WRAP) as u32
    }
}

impl fmt::Display for SfnTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4}/{}", self.sfn, self.sf)
    }
}

impl fmt::Debug for SfnTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4}/{}", self.sfn, self.sf)
    }
}
