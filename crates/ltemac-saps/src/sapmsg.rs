use serde::{Deserialize, Serialize};

use crate::mac::MacFrameEvent;
use crate::rrc::*;

/// Everything the engine consumes, in capture order.
/// Serialized with an explicit `kind` tag so recorded traces stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SapMsg {
    /// A MAC PDU was decoded. `ctx` is absent when the host could not attach
    /// MAC context to the frame (e.g. heuristic detection failed upstream).
    MacFrameInd { frame: ltemac_core::FrameNum, ctx: Option<MacFrameEvent> },

    RrcDrxConfigReq(RrcDrxConfigReq),
    RrcDrxReleaseReq(RrcDrxReleaseReq),
    RrcExtBsrSizesReq(RrcExtBsrSizesReq),
    RrcSimultPucchPuschReq(RrcSimultPucchPuschReq),
    RrcChannelMappingReq(RrcChannelMappingReq),
}

impl SapMsg {
    pub fn get_name(&self) -> &'static str {
        match self {
            SapMsg::MacFrameInd { .. } => "MacFrameInd",
            SapMsg::RrcDrxConfigReq(_) => "RrcDrxConfigReq",
            SapMsg::RrcDrxReleaseReq(_) => "RrcDrxReleaseReq",
            SapMsg::RrcExtBsrSizesReq(_) => "RrcExtBsrSizesReq",
            SapMsg::RrcSimultPucchPuschReq(_) => "RrcSimultPucchPuschReq",
            SapMsg::RrcChannelMappingReq(_) => "RrcChannelMappingReq",
        }
    }
}
