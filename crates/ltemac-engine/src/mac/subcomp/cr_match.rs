use std::collections::HashMap;

use ltemac_core::{CaptureTs, EngineErr, FrameNum, PduInstance, Rnti, expect_ce_len};
use ltemac_saps::mac::CR_IDENTITY_LEN;

use crate::mac::subcomp::result_cache::{FrameKey, ResultCache};

/// Outcome of checking a Contention Resolution Identity against Msg3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrResult {
    /// No Msg3 was seen for the RNTI
    NoMsg3,
    Matched { msg3_frame: FrameNum, elapsed_ms: u32 },
    NotMatched { msg3_frame: FrameNum, elapsed_ms: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Msg3Record {
    identity: [u8; CR_IDENTITY_LEN],
    frame: FrameNum,
    ts: CaptureTs,
}

fn check_identity(body: &[u8]) -> Result<(), EngineErr> {
    expect_ce_len!(body, CR_IDENTITY_LEN, "cr_identity")
}

/// Matches the UE Contention Resolution Identity sent on the downlink with the
/// CCCH SDU (Msg3) it is supposed to echo. Only the latest Msg3 per RNTI is kept.
pub struct CrMatcher {
    msg3: HashMap<Rnti, Msg3Record>,
    results: ResultCache<FrameKey, CrResult>,
}

impl CrMatcher {
    pub fn new() -> Self {
        Self {
            msg3: HashMap::new(),
            results: ResultCache::new(),
        }
    }

    pub fn reset(&mut self) {
        self.msg3.clear();
        self.results.clear();
    }

    /// Records an uplink CCCH SDU. SDUs shorter than the identity are ignored.
    pub fn record_msg3(&mut self, rnti: Rnti, sdu: &[u8], frame: FrameNum, ts: CaptureTs, is_first_pass: bool) {
        if !is_first_pass {
            return;
        }
        let Some(prefix) = sdu.get(..CR_IDENTITY_LEN) else {
            tracing::debug!(frame = frame, "cr: rnti {} ccch sdu too short ({} bytes)", rnti, sdu.len());
            return;
        };
        let mut identity = [0u8; CR_IDENTITY_LEN];
        identity.copy_from_slice(prefix);
        if let Some(old) = self.msg3.insert(rnti, Msg3Record { identity, frame, ts }) {
            tracing::debug!(frame = frame, "cr: rnti {} msg3 replaces the one in frame {}", rnti, old.frame);
        }
    }

    /// Checks a Contention Resolution Identity CE body against the last Msg3 of the RNTI.
    /// Computed on the first pass, replayed afterwards. Malformed bodies yield `None`.
    pub fn resolve(&mut self, rnti: Rnti, body: &[u8], key: FrameKey, ts: CaptureTs, is_first_pass: bool) -> Option<CrResult> {
        let frame = key.0;
        if let Err(e) = check_identity(body) {
            tracing::warn!(frame = frame, "cr: rnti {} ignoring identity CE: {:?}", rnti, e);
            return None;
        }

        if !is_first_pass {
            return self.results.get(&key).copied();
        }

        let result = match self.msg3.get(&rnti) {
            None => CrResult::NoMsg3,
            Some(m) => {
                let elapsed_ms = ts.elapsed_ms(m.ts);
                if m.identity[..] == body[..] {
                    CrResult::Matched { msg3_frame: m.frame, elapsed_ms }
                } else {
                    tracing::warn!(frame = frame, "cr: rnti {} identity {:02x?} does not match msg3 {:02x?} in frame {}",
                        rnti, body, m.identity, m.frame);
                    CrResult::NotMatched { msg3_frame: m.frame, elapsed_ms }
                }
            }
        };
        self.results.put(key, result);
        Some(result)
    }

    pub fn result(&self, frame: FrameNum, pdu_instance: PduInstance) -> Option<&CrResult> {
        self.results.get(&(frame, pdu_instance))
    }

    pub fn results(&self) -> impl Iterator<Item = (&FrameKey, &CrResult)> {
        self.results.iter()
    }
}

impl Default for CrMatcher {
    fn default() -> Self {
        Self::new()
    }
}
