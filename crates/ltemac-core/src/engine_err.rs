use crate::FrameNum;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineErr {
    /// No per-packet MAC context was available for the frame. Nothing is tracked for it.
    MissingContext { frame: FrameNum },
    /// HARQ process id or transport block slot outside the range valid for the direction
    InvalidHarqId { harq_id: u8, tb_slot: u8 },
    /// A control element whose body length does not match what its type mandates
    InvalidCeLength { field: &'static str, expected: usize, found: usize },
    /// A value outside its permitted range
    InvalidValue { field: &'static str, value: u64 },
}

/// Checks whether a value lies within an inclusive range. If not, returns EngineErr::InvalidValue
#[macro_export]
macro_rules! expect_range {
    ($value:ident, $range:expr) => {
        $crate::expect_range!(@inner $value, $range, stringify!($value))
    };
    ($value:expr, $range:expr, $field:expr) => {
        $crate::expect_range!(@inner $value, $range, $field)
    };

    (@inner $value:expr, $range:expr, $field:expr) => {{
        let val = $value;
        if $range.contains(&val) {
            Ok(())
        } else {
            Err($crate::EngineErr::InvalidValue {
                field: $field,
                value: val as u64,
            })
        }
    }};
}

/// Checks the body length of a control element. If wrong, returns EngineErr::InvalidCeLength
#[macro_export]
macro_rules! expect_ce_len {
    ($body:expr, $expected:expr, $field:expr) => {{
        let found = $body.len();
        if found == $expected {
            Ok(())
        } else {
            Err($crate::EngineErr::InvalidCeLength {
                field: $field,
                expected: $expected,
                found,
            })
        }
    }};
}
