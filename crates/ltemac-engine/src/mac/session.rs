use ltemac_config::SharedConfig;
use ltemac_core::{Direction, EngineErr, FrameNum, PduInstance, UeId, assert_warn};
use ltemac_saps::mac::MacFrameEvent;
use ltemac_saps::rrc::{RrcChannelMappingReq, RrcDrxConfigReq, RrcDrxReleaseReq, RrcExtBsrSizesReq, RrcSimultPucchPuschReq};
use ltemac_saps::sapmsg::SapMsg;

use crate::mac::annotations::{Anomaly, FrameAnnotations};
use crate::mac::subcomp::cr_match::{CrMatcher, CrResult};
use crate::mac::subcomp::drx::{DrxConfig, DrxFrameSnapshot, DrxSimulator, DrxTrigger};
use crate::mac::subcomp::harq_resend::{HarqAnomaly, HarqObservation, HarqResendDetector, RetransmissionLink};
use crate::mac::subcomp::result_cache::FrameKey;
use crate::mac::subcomp::sr_tracker::{SrResult, SrTracker};
use crate::mac::subcomp::tti_counter::{TtiCounter, TtiResult};
use crate::mac::subcomp::ue_cfg::{UeCfg, UeCfgTable};

pub type SessionId = uuid::Uuid;

/// All cross-frame state for one loaded capture.
///
/// Frames are fed in capture order on the first pass, during which every component updates its
/// tables and caches what it concluded. Later passes (the host re-dissecting a frame when the user
/// selects it, filters, ...) must pass `is_first_pass = false` and only read back those cached
/// results, in any order. Loading a new capture means calling `reset()`.
pub struct MacSession {
    id: SessionId,
    config: SharedConfig,
    span: tracing::Span,
    last_frame: FrameNum,

    harq_ul: HarqResendDetector,
    harq_dl: HarqResendDetector,
    drx: DrxSimulator,
    sr: SrTracker,
    cr: CrMatcher,
    tti: TtiCounter,
    ue_cfg: UeCfgTable,
}

impl MacSession {
    pub fn new(config: SharedConfig) -> Self {
        let id = SessionId::new_v4();
        tracing::info!("mac session {} created", id);
        Self {
            id,
            span: tracing::info_span!("session", id = %id),
            last_frame: 0,
            harq_ul: HarqResendDetector::new(&config, Direction::Ul),
            harq_dl: HarqResendDetector::new(&config, Direction::Dl),
            drx: DrxSimulator::new(&config),
            sr: SrTracker::new(),
            cr: CrMatcher::new(),
            tti: TtiCounter::new(&config),
            ue_cfg: UeCfgTable::new(),
            config,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Drops everything learned so far, for a new capture
    pub fn reset(&mut self) {
        let _span = self.span.clone().entered();
        tracing::info!("resetting session state");
        self.last_frame = 0;
        self.harq_ul.reset();
        self.harq_dl.reset();
        self.drx.reset();
        self.sr.reset();
        self.cr.reset();
        self.tti.reset();
        self.ue_cfg.reset();
    }

    /// Dispatches a message from the host. MAC frames yield their annotations.
    /// RRC primitives are only applied on the first pass.
    pub fn handle_sapmsg(&mut self, msg: &SapMsg, is_first_pass: bool) -> Result<Option<FrameAnnotations>, EngineErr> {
        tracing::trace!("handle_sapmsg: {}", msg.get_name());
        match msg {
            SapMsg::MacFrameInd { frame, ctx } => self.process_frame(*frame, ctx.as_ref(), is_first_pass).map(Some),
            _ if !is_first_pass => Ok(None),
            SapMsg::RrcDrxConfigReq(req) => self.rx_drx_config(req).map(|_| None),
            SapMsg::RrcDrxReleaseReq(req) => {
                self.rx_drx_release(req);
                Ok(None)
            }
            SapMsg::RrcExtBsrSizesReq(req) => {
                self.rx_ext_bsr_sizes(req);
                Ok(None)
            }
            SapMsg::RrcSimultPucchPuschReq(req) => {
                self.rx_simult_pucch_pusch(req);
                Ok(None)
            }
            SapMsg::RrcChannelMappingReq(req) => self.rx_channel_mapping(req).map(|_| None),
        }
    }

    pub fn rx_drx_config(&mut self, req: &RrcDrxConfigReq) -> Result<(), EngineErr> {
        req.params.validate()?;
        if self.config.config().analysis.drx {
            let _span = self.span.clone().entered();
            self.drx.install_config(req.ueid, req.params, req.frame);
        }
        Ok(())
    }

    pub fn rx_drx_release(&mut self, req: &RrcDrxReleaseReq) {
        if self.config.config().analysis.drx {
            let _span = self.span.clone().entered();
            self.drx.release_config(req.ueid, req.frame);
        }
    }

    pub fn rx_ext_bsr_sizes(&mut self, req: &RrcExtBsrSizesReq) {
        self.ue_cfg.set_ext_bsr_sizes(req.ueid, req.enabled);
    }

    pub fn rx_simult_pucch_pusch(&mut self, req: &RrcSimultPucchPuschReq) {
        self.ue_cfg.set_simult_pucch_pusch(req.ueid, req.cell, req.enabled);
    }

    pub fn rx_channel_mapping(&mut self, req: &RrcChannelMappingReq) -> Result<(), EngineErr> {
        self.ue_cfg.set_channel_mapping(req)
    }

    /// Runs one MAC PDU through every enabled component and collects what they have to say
    /// about it. A frame without MAC context is rejected and leaves all state untouched.
    pub fn process_frame(&mut self, frame: FrameNum, ctx: Option<&MacFrameEvent>, is_first_pass: bool) -> Result<FrameAnnotations, EngineErr> {
        let Some(ev) = ctx else {
            tracing::debug!(frame = frame, "no mac context, skipping");
            return Err(EngineErr::MissingContext { frame });
        };
        assert_warn!(ev.frame == frame, "context for frame {} delivered as frame {}", ev.frame, frame);

        let _span = self.span.clone().entered();
        if is_first_pass {
            assert_warn!(ev.frame >= self.last_frame, "frame {} after frame {} on first pass", ev.frame, self.last_frame);
            self.last_frame = ev.frame;
        }

        let analysis = self.config.config().analysis.clone();
        let ue_specific = ev.rnti_type.is_ue_specific();
        let key: FrameKey = (ev.frame, ev.pdu_instance);
        let mut ann = FrameAnnotations::new(ev.frame, ev.pdu_instance, ev.direction, ev.rnti);

        // HARQ resends
        let harq_enabled = match ev.direction {
            Direction::Ul => analysis.ul_resends,
            Direction::Dl => analysis.dl_resends,
        };
        if harq_enabled && ue_specific {
            if let Some(harq_id) = ev.harq_id {
                let obs = HarqObservation {
                    rnti: ev.rnti,
                    harq_id,
                    tb_slot: ev.tb_slot,
                    ndi: ev.ndi,
                    content: &ev.pdu,
                    full_len: ev.full_len(),
                    retx_count: ev.retx_count,
                    frame: ev.frame,
                    pdu_instance: ev.pdu_instance,
                    ts: ev.ts,
                };
                ann.harq = match ev.direction {
                    Direction::Ul => self.harq_ul.observe(&obs, is_first_pass),
                    Direction::Dl => self.harq_dl.observe(&obs, is_first_pass),
                };
            }
        }

        // UEs per TTI
        if analysis.ues_per_tti && ue_specific {
            ann.tti = self.tti.count(ev.direction, ev.subframe, key, ev.ts, is_first_pass);
            ann.tti_over_limit = ann.tti.is_some_and(|t| t.exceeds(self.config.config().tti.max_ues_per_tti));
        }

        // Scheduling requests
        if analysis.sr {
            if let Some(event) = ev.sr_event {
                ann.sr = self.sr.on_event(ev.rnti, event, key, ev.ts, is_first_pass);
            }
        }

        // Contention resolution
        if analysis.contention_resolution {
            match ev.direction {
                Direction::Ul => {
                    if let Some(sdu) = &ev.ces.ccch_sdu {
                        self.cr.record_msg3(ev.rnti, sdu, ev.frame, ev.ts, is_first_pass);
                    }
                }
                Direction::Dl => {
                    if let Some(body) = &ev.ces.cr_identity {
                        ann.cr = self.cr.resolve(ev.rnti, body, key, ev.ts, is_first_pass);
                    }
                }
            }
        }

        // DRX, last, as its triggers depend on what HARQ concluded
        if analysis.drx && ue_specific {
            match ev.sfn_time() {
                Some(time) => {
                    let triggers = Self::drx_triggers(ev, ann.harq.as_ref());
                    ann.drx = self.drx.on_mac_event(ev.ueid, key, time, ev.ts, &triggers, is_first_pass);
                }
                None => tracing::trace!(frame = ev.frame, "drx: no sfn for ueid {}", ev.ueid),
            }
        }

        Ok(ann)
    }

    /// Translates a MAC PDU into the DRX timer events it causes
    fn drx_triggers(ev: &MacFrameEvent, harq: Option<&RetransmissionLink>) -> Vec<DrxTrigger> {
        let mut triggers = Vec::new();
        let is_new_data = ev.retx_count == 0 && harq.is_none_or(|l| !l.is_resend());
        match ev.direction {
            Direction::Ul => {
                if is_new_data {
                    triggers.push(DrxTrigger::NewUlData);
                }
            }
            Direction::Dl => {
                if let Some(harq_id) = ev.harq_id {
                    triggers.push(DrxTrigger::DlTransmission { harq_id });
                    if !ev.crc_ok {
                        triggers.push(DrxTrigger::DlCrcFailure { harq_id });
                    }
                }
                if ev.crc_ok && is_new_data {
                    triggers.push(DrxTrigger::NewDlData);
                }
                if let Some(kind) = ev.ces.drx_command {
                    triggers.push(DrxTrigger::Command(kind));
                }
            }
        }
        triggers
    }

    pub fn harq_link(&self, direction: Direction, frame: FrameNum, pdu_instance: PduInstance) -> Option<&RetransmissionLink> {
        match direction {
            Direction::Ul => self.harq_ul.link(frame, pdu_instance),
            Direction::Dl => self.harq_dl.link(frame, pdu_instance),
        }
    }

    pub fn drx_snapshot(&self, frame: FrameNum, pdu_instance: PduInstance) -> Option<&DrxFrameSnapshot> {
        self.drx.snapshot((frame, pdu_instance))
    }

    pub fn drx_config(&self, ueid: UeId) -> Option<&DrxConfig> {
        self.drx.config(ueid)
    }

    pub fn sr_result(&self, frame: FrameNum, pdu_instance: PduInstance) -> Option<&SrResult> {
        self.sr.result(frame, pdu_instance)
    }

    pub fn cr_result(&self, frame: FrameNum, pdu_instance: PduInstance) -> Option<&CrResult> {
        self.cr.result(frame, pdu_instance)
    }

    pub fn tti_result(&self, direction: Direction, frame: FrameNum, pdu_instance: PduInstance) -> Option<&TtiResult> {
        self.tti.result(direction, (frame, pdu_instance))
    }

    pub fn ue_cfg(&self, ueid: UeId) -> Option<&UeCfg> {
        self.ue_cfg.get(ueid)
    }

    /// Every anomaly found so far, ordered by frame and PDU instance
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut out: Vec<(FrameKey, Anomaly)> = Vec::new();

        for (direction, det) in [(Direction::Ul, &self.harq_ul), (Direction::Dl, &self.harq_dl)] {
            for (key, link) in det.links() {
                if let Some(HarqAnomaly::OriginalTxNotFound { retx_count }) = link.anomaly {
                    out.push((*key, Anomaly::OriginalTxNotFound { frame: key.0, direction, retx_count }));
                }
            }
        }
        for (key, res) in self.sr.results() {
            if let SrResult::InvalidEvent { state, event } = *res {
                out.push((*key, Anomaly::InvalidSrEvent { frame: key.0, state, event }));
            }
        }
        for (key, res) in self.cr.results() {
            match *res {
                CrResult::NoMsg3 => out.push((*key, Anomaly::CrNoMsg3 { frame: key.0 })),
                CrResult::NotMatched { msg3_frame, .. } => out.push((*key, Anomaly::CrNotMatched { frame: key.0, msg3_frame })),
                CrResult::Matched { .. } => {}
            }
        }
        let limit = self.config.config().tti.max_ues_per_tti;
        for direction in [Direction::Ul, Direction::Dl] {
            for (key, res) in self.tti.results(direction) {
                if res.exceeds(limit) {
                    out.push((*key, Anomaly::TtiOverLimit { frame: key.0, direction, ues_in_tti: res.ues_in_tti }));
                }
            }
        }

        // Stable, so anomalies of one PDU keep the order above
        out.sort_by_key(|(key, _)| *key);
        out.into_iter().map(|(_, a)| a).collect()
    }
}
