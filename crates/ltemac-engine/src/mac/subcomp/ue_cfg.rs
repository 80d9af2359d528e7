use std::collections::HashMap;

use ltemac_core::{EngineErr, UeId};
use ltemac_saps::rrc::{RlcMode, RrcChannelMappingReq, ServingCell};

/// Data radio bearer a logical channel is mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrbMapping {
    pub drb_id: u8,
    pub rlc_mode: RlcMode,
    pub sn_len: Option<u8>,
}

/// Per-UE settings signalled by RRC that affect how MAC PDUs of the UE are to be read
#[derive(Debug, Clone, Default)]
pub struct UeCfg {
    pub ext_bsr_sizes: bool,
    pub simult_pucch_pusch_pcell: bool,
    pub simult_pucch_pusch_pscell: bool,
    drb_mappings: HashMap<u8, DrbMapping>,
}

impl UeCfg {
    pub fn drb_for_lcid(&self, lcid: u8) -> Option<&DrbMapping> {
        self.drb_mappings.get(&lcid)
    }
}

pub struct UeCfgTable {
    ues: HashMap<UeId, UeCfg>,
}

impl UeCfgTable {
    pub fn new() -> Self {
        Self { ues: HashMap::new() }
    }

    pub fn reset(&mut self) {
        self.ues.clear();
    }

    pub fn get(&self, ueid: UeId) -> Option<&UeCfg> {
        self.ues.get(&ueid)
    }

    pub fn set_ext_bsr_sizes(&mut self, ueid: UeId, enabled: bool) {
        self.ues.entry(ueid).or_default().ext_bsr_sizes = enabled;
    }

    pub fn set_simult_pucch_pusch(&mut self, ueid: UeId, cell: ServingCell, enabled: bool) {
        let ue = self.ues.entry(ueid).or_default();
        match cell {
            ServingCell::PCell => ue.simult_pucch_pusch_pcell = enabled,
            ServingCell::PSCell => ue.simult_pucch_pusch_pscell = enabled,
        }
    }

    /// Maps an LCID onto a DRB, replacing any earlier mapping of that LCID
    pub fn set_channel_mapping(&mut self, req: &RrcChannelMappingReq) -> Result<(), EngineErr> {
        req.validate()?;
        let mapping = DrbMapping { drb_id: req.drb_id, rlc_mode: req.rlc_mode, sn_len: req.sn_len };
        let ue = self.ues.entry(req.ueid).or_default();
        if let Some(old) = ue.drb_mappings.insert(req.lcid, mapping) {
            tracing::debug!("ue_cfg: ueid {} lcid {} remapped from drb {} to drb {}", req.ueid, req.lcid, old.drb_id, req.drb_id);
        }
        Ok(())
    }

    pub fn drb_for_lcid(&self, ueid: UeId, lcid: u8) -> Option<&DrbMapping> {
        self.ues.get(&ueid)?.drb_for_lcid(lcid)
    }
}

impl Default for UeCfgTable {
    fn default() -> Self {
        Self::new()
    }
}
