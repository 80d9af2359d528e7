//! Core utilities for the LTE MAC inference engine
//!
//! This crate provides fundamental types and utilities used across the workspace:
//! - SfnTime for system frame number / subframe timing
//! - CaptureTs for wall-clock capture timestamps
//! - RNTI and UE identity types
//! - Common macros and debug utilities

pub mod debug;
pub mod direction;
pub mod engine_err;
pub mod rnti;
pub mod sfn_time;
pub mod timestamp;

// Re-export commonly used items
pub use direction::Direction;
pub use engine_err::EngineErr;
pub use rnti::*;
pub use sfn_time::SfnTime;
pub use timestamp::CaptureTs;

/// Version string, including git revision when built from a checkout
pub const ENGINE_VERSION: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"),
    "-",
    git_version::git_version!(fallback = "unknown")
);

/// Frame sequence number, as assigned by the capture in replay order.
/// Numbering starts at 1; strictly increasing on the first pass.
pub type FrameNum = u32;

/// Index of a MAC PDU within one frame. A single captured frame may carry
/// several MAC PDUs, each of which is processed as its own event.
pub type PduInstance = u16;

/// UE identifier as assigned by the capturing entity. Unlike the RNTI, it stays
/// stable across RNTI reassignment and is what RRC configuration is keyed on.
pub type UeId = u16;
