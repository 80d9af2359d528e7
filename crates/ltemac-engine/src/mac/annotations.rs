use std::fmt;

use ltemac_core::{Direction, FrameNum, PduInstance, Rnti};
use ltemac_saps::mac::SrEvent;

use crate::mac::subcomp::cr_match::CrResult;
use crate::mac::subcomp::drx::DrxFrameSnapshot;
use crate::mac::subcomp::harq_resend::RetransmissionLink;
use crate::mac::subcomp::sr_tracker::{SrResult, SrState};
use crate::mac::subcomp::tti_counter::TtiResult;

/// Everything the engine inferred for one MAC PDU, for the rendering layer.
/// Fields are None when the component is disabled or had nothing to say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAnnotations {
    pub frame: FrameNum,
    pub pdu_instance: PduInstance,
    pub direction: Direction,
    pub rnti: Rnti,

    pub harq: Option<RetransmissionLink>,
    pub drx: Option<DrxFrameSnapshot>,
    pub sr: Option<SrResult>,
    pub cr: Option<CrResult>,
    pub tti: Option<TtiResult>,
    /// More UEs in this TTI than the configured limit
    pub tti_over_limit: bool,
}

impl FrameAnnotations {
    pub fn new(frame: FrameNum, pdu_instance: PduInstance, direction: Direction, rnti: Rnti) -> Self {
        Self {
            frame,
            pdu_instance,
            direction,
            rnti,
            harq: None,
            drx: None,
            sr: None,
            cr: None,
            tti: None,
            tti_over_limit: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.harq.is_none() && self.drx.is_none() && self.sr.is_none() && self.cr.is_none() && self.tti.is_none()
    }

    /// True if these annotations, from a replay, still carry everything `first` concluded on
    /// the first pass. A replay may only add forward links: the HARQ `next` link, and an SR
    /// result written back once the SR was answered.
    pub fn extends(&self, first: &FrameAnnotations) -> bool {
        let harq_kept = match (&first.harq, &self.harq) {
            (None, None) => true,
            (Some(f), Some(r)) => f.previous == r.previous && f.anomaly == r.anomaly && (f.next.is_none() || f.next == r.next),
            _ => false,
        };
        let sr_kept = first.sr.is_none() || first.sr == self.sr;

        (self.frame, self.pdu_instance, self.direction, self.rnti) == (first.frame, first.pdu_instance, first.direction, first.rnti)
            && harq_kept
            && sr_kept
            && self.drx == first.drx
            && self.cr == first.cr
            && self.tti == first.tti
            && self.tti_over_limit == first.tti_over_limit
    }
}

/// A suspicious finding, collected across all components for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    InvalidSrEvent { frame: FrameNum, state: SrState, event: SrEvent },
    OriginalTxNotFound { frame: FrameNum, direction: Direction, retx_count: u8 },
    CrNotMatched { frame: FrameNum, msg3_frame: FrameNum },
    CrNoMsg3 { frame: FrameNum },
    TtiOverLimit { frame: FrameNum, direction: Direction, ues_in_tti: u16 },
}

impl Anomaly {
    pub fn frame(&self) -> FrameNum {
        match self {
            Anomaly::InvalidSrEvent { frame, .. }
            | Anomaly::OriginalTxNotFound { frame, .. }
            | Anomaly::CrNotMatched { frame, .. }
            | Anomaly::CrNoMsg3 { frame }
            | Anomaly::TtiOverLimit { frame, .. } => *frame,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::InvalidSrEvent { frame, state, event } => {
                write!(f, "#{} SR: unexpected {:?} in state {:?}", frame, event, state)
            }
            Anomaly::OriginalTxNotFound { frame, direction, retx_count } => {
                write!(f, "#{} {} HARQ: retransmission #{} but original tx not found", frame, direction, retx_count)
            }
            Anomaly::CrNotMatched { frame, msg3_frame } => {
                write!(f, "#{} CR: identity does not match Msg3 in frame {}", frame, msg3_frame)
            }
            Anomaly::CrNoMsg3 { frame } => write!(f, "#{} CR: no Msg3 seen for this RNTI", frame),
            Anomaly::TtiOverLimit { frame, direction, ues_in_tti } => {
                write!(f, "#{} {} TTI: {} UEs scheduled", frame, direction, ues_in_tti)
            }
        }
    }
}
