use std::collections::HashMap;

use ltemac_config::{CfgResendWindow, SharedConfig};
use ltemac_core::{CaptureTs, Direction, EngineErr, FrameNum, PduInstance, Rnti};

use crate::mac::subcomp::result_cache::{FrameKey, ResultCache};

/// Number of uplink HARQ processes (FDD)
pub const UL_HARQ_PROCESSES: usize = 8;
/// Number of downlink HARQ processes, covering TDD configurations
pub const DL_HARQ_PROCESSES: usize = 15;
/// Transport blocks per downlink HARQ process (spatial multiplexing)
pub const DL_TB_SLOTS: usize = 2;

/// One end of a resend link: the other PDU and the time between the two
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendLink {
    pub frame: FrameNum,
    pub pdu_instance: PduInstance,
    pub elapsed_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarqAnomaly {
    /// The PDU claims to be a retransmission, but no matching earlier transmission was seen
    OriginalTxNotFound { retx_count: u8 },
}

/// Resend relationship of one frame with the previous and next transmission on its HARQ process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetransmissionLink {
    /// The transmission this frame repeats
    pub previous: Option<ResendLink>,
    /// The later transmission that repeats this frame
    pub next: Option<ResendLink>,
    pub anomaly: Option<HarqAnomaly>,
}

impl RetransmissionLink {
    pub fn is_resend(&self) -> bool {
        self.previous.is_some()
    }
}

/// Everything the detector needs to know about one PDU
#[derive(Debug, Clone, Copy)]
pub struct HarqObservation<'a> {
    pub rnti: Rnti,
    pub harq_id: u8,
    pub tb_slot: u8,
    pub ndi: bool,
    /// PDU bytes as captured, possibly truncated
    pub content: &'a [u8],
    /// Length of the PDU before truncation
    pub full_len: usize,
    pub retx_count: u8,
    pub frame: FrameNum,
    pub pdu_instance: PduInstance,
    pub ts: CaptureTs,
}

impl HarqObservation<'_> {
    fn key(&self) -> FrameKey {
        (self.frame, self.pdu_instance)
    }
}

/// Most recent PDU seen on one HARQ process (and transport block)
#[derive(Debug, Clone, Default)]
struct HarqSnapshot {
    in_use: bool,
    content: Vec<u8>,
    full_len: usize,
    ndi: bool,
    frame: FrameNum,
    pdu_instance: PduInstance,
    ts: CaptureTs,
}

/// Per-RNTI shadow of the HARQ process buffers, one slot per (process, transport block)
struct HarqBuffer {
    slots: Vec<HarqSnapshot>,
}

impl HarqBuffer {
    fn new(num_slots: usize) -> Self {
        Self { slots: vec![HarqSnapshot::default(); num_slots] }
    }
}

/// Detects HARQ resends by comparing each PDU against the one last seen on the same process.
/// One instance per direction. Only the immediately preceding transmission on a process is
/// retained, so a resend is always linked to the transmission directly before it.
pub struct HarqResendDetector {
    direction: Direction,
    window: CfgResendWindow,
    snapshot_len: usize,
    buffers: HashMap<Rnti, HarqBuffer>,
    results: ResultCache<FrameKey, RetransmissionLink>,
}

impl HarqResendDetector {
    pub fn new(config: &SharedConfig, direction: Direction) -> Self {
        let cfg = config.config();
        let window = match direction {
            Direction::Ul => cfg.harq.ul_window,
            Direction::Dl => cfg.harq.dl_window,
        };
        Self {
            direction,
            window,
            snapshot_len: cfg.harq.snapshot_len,
            buffers: HashMap::new(),
            results: ResultCache::new(),
        }
    }

    pub fn reset(&mut self) {
        self.buffers.clear();
        self.results.clear();
    }

    fn num_processes(&self) -> usize {
        match self.direction {
            Direction::Ul => UL_HARQ_PROCESSES,
            Direction::Dl => DL_HARQ_PROCESSES,
        }
    }

    fn num_tb_slots(&self) -> usize {
        match self.direction {
            Direction::Ul => 1,
            Direction::Dl => DL_TB_SLOTS,
        }
    }

    /// Maps (harq_id, tb_slot) onto an index in the per-RNTI buffer
    fn slot_index(&self, harq_id: u8, tb_slot: u8) -> Result<usize, EngineErr> {
        if harq_id as usize >= self.num_processes() || tb_slot as usize >= self.num_tb_slots() {
            return Err(EngineErr::InvalidHarqId { harq_id, tb_slot });
        }
        Ok(harq_id as usize * self.num_tb_slots() + tb_slot as usize)
    }

    /// Processes one PDU. On the first pass, compares it against the last PDU on its HARQ process,
    /// records any resend link in both directions and makes this PDU the new reference for the
    /// process. On later passes, returns what was recorded the first time.
    /// Returns None if the HARQ id is out of range, or on replay of a frame never seen.
    pub fn observe(&mut self, obs: &HarqObservation, is_first_pass: bool) -> Option<RetransmissionLink> {
        let idx = match self.slot_index(obs.harq_id, obs.tb_slot) {
            Ok(idx) => idx,
            Err(e) => {
                tracing::debug!(frame = obs.frame, "harq {}: skipping rnti {}: {:?}", self.direction, obs.rnti, e);
                return None;
            }
        };

        if !is_first_pass {
            return self.results.get(&obs.key()).cloned();
        }

        let num_slots = self.num_processes() * self.num_tb_slots();
        let window = self.window;
        let stored_len = obs.content.len().min(self.snapshot_len);
        let content = &obs.content[..stored_len];

        let buffer = self.buffers.entry(obs.rnti).or_insert_with(|| HarqBuffer::new(num_slots));
        let slot = &mut buffer.slots[idx];

        let mut previous = None;
        if slot.in_use && slot.frame < obs.frame {
            let elapsed_ms = obs.ts.elapsed_ms(slot.ts);
            let cmp_len = stored_len.min(slot.content.len());
            if slot.full_len == obs.full_len
                && slot.ndi == obs.ndi
                && slot.content[..cmp_len] == content[..cmp_len]
                && window.contains(elapsed_ms)
            {
                previous = Some(ResendLink { frame: slot.frame, pdu_instance: slot.pdu_instance, elapsed_ms });
            }
        }

        // Whatever the outcome, this PDU is what the next one on this process compares against
        slot.in_use = true;
        slot.content.clear();
        slot.content.extend_from_slice(content);
        slot.full_len = obs.full_len;
        slot.ndi = obs.ndi;
        slot.frame = obs.frame;
        slot.pdu_instance = obs.pdu_instance;
        slot.ts = obs.ts;

        if let Some(prev) = previous {
            tracing::debug!(frame = obs.frame, "<- harq {} rnti {} id {}: resend of frame {} ({} ms)",
                self.direction, obs.rnti, obs.harq_id, prev.frame, prev.elapsed_ms);
            self.results
                .get_or_create((prev.frame, prev.pdu_instance), RetransmissionLink::default)
                .next = Some(ResendLink { frame: obs.frame, pdu_instance: obs.pdu_instance, elapsed_ms: prev.elapsed_ms });
        }

        let anomaly = if previous.is_none() && obs.retx_count > 0 {
            tracing::warn!(frame = obs.frame, "harq {} rnti {} id {}: retx count {} but original tx not found",
                self.direction, obs.rnti, obs.harq_id, obs.retx_count);
            Some(HarqAnomaly::OriginalTxNotFound { retx_count: obs.retx_count })
        } else {
            None
        };

        let entry = self.results.get_or_create(obs.key(), RetransmissionLink::default);
        entry.previous = previous;
        entry.anomaly = anomaly;
        Some(entry.clone())
    }

    /// Cached link for one PDU, for the rendering layer
    pub fn link(&self, frame: FrameNum, pdu_instance: PduInstance) -> Option<&RetransmissionLink> {
        self.results.get(&(frame, pdu_instance))
    }

    pub fn links(&self) -> impl Iterator<Item = (&FrameKey, &RetransmissionLink)> {
        self.results.iter()
    }
}
