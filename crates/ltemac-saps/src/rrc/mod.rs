use serde::{Deserialize, Serialize};

use ltemac_core::{EngineErr, FrameNum, UeId, expect_range};

/// Short DRX cycle parameters, both in subframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortCycleParams {
    /// drx-ShortCycle, subframes
    pub cycle: u16,
    /// drxShortCycleTimer, in multiples of the short cycle
    pub timer: u16,
}

/// DRX-Config as signalled by RRC. All timer lengths are in subframes (PDCCH subframes for FDD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrxConfigParams {
    /// longDRX-Cycle
    pub long_cycle: u16,
    /// drxStartOffset
    pub cycle_offset: u16,
    pub on_duration_timer: u16,
    pub inactivity_timer: u16,
    pub retransmission_timer: u16,
    #[serde(default)]
    pub short_cycle: Option<ShortCycleParams>,
}

impl DrxConfigParams {
    pub fn validate(&self) -> Result<(), EngineErr> {
        expect_range!(self.long_cycle, 10..=10240, "long_cycle")?;
        expect_range!(self.cycle_offset, 0..self.long_cycle, "cycle_offset")?;
        expect_range!(self.on_duration_timer, 1..=200, "on_duration_timer")?;
        expect_range!(self.inactivity_timer, 0..=2560, "inactivity_timer")?;
        expect_range!(self.retransmission_timer, 1..=33, "retransmission_timer")?;
        if let Some(sc) = self.short_cycle {
            expect_range!(sc.cycle, 2..=640, "short_cycle")?;
            expect_range!(sc.timer, 1..=16, "short_cycle_timer")?;
            if self.long_cycle % sc.cycle != 0 {
                return Err(EngineErr::InvalidValue { field: "short_cycle", value: sc.cycle as u64 });
            }
        }
        Ok(())
    }
}

/// RRC installed or replaced the DRX configuration of a UE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrcDrxConfigReq {
    pub ueid: UeId,
    pub frame: FrameNum,
    pub params: DrxConfigParams,
}

/// RRC released the DRX configuration of a UE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrcDrxReleaseReq {
    pub ueid: UeId,
    pub frame: FrameNum,
}

/// extendedBSR-Sizes-r10 was signalled for a UE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrcExtBsrSizesReq {
    pub ueid: UeId,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServingCell {
    PCell,
    PSCell,
}

/// simultaneousPUCCH-PUSCH was signalled for a UE, for the given cell group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrcSimultPucchPuschReq {
    pub ueid: UeId,
    pub cell: ServingCell,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RlcMode {
    Tm,
    Um,
    Am,
}

/// A logical channel was mapped onto a data radio bearer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrcChannelMappingReq {
    pub ueid: UeId,
    pub lcid: u8,
    pub drb_id: u8,
    pub rlc_mode: RlcMode,
    /// RLC sequence number length in bits, for UM and AM bearers
    #[serde(default)]
    pub sn_len: Option<u8>,
}

impl RrcChannelMappingReq {
    /// DRBs may use LCIDs 3..=10, and the extended range 32..=38
    pub fn validate(&self) -> Result<(), EngineErr> {
        if !(3..=10).contains(&self.lcid) && !(32..=38).contains(&self.lcid) {
            return Err(EngineErr::InvalidValue { field: "lcid", value: self.lcid as u64 });
        }
        expect_range!(self.drb_id, 1..=32, "drb_id")?;
        Ok(())
    }
}
