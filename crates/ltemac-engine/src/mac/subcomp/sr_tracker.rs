use std::collections::HashMap;

use ltemac_core::{CaptureTs, FrameNum, PduInstance, Rnti};
use ltemac_saps::mac::SrEvent;

use crate::mac::subcomp::result_cache::{FrameKey, ResultCache};

/// Scheduling Request state of one RNTI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SrState {
    /// No SR pending
    #[default]
    Idle,
    /// An SR was sent and not yet answered
    Outstanding,
    /// The UE gave up on its last SR
    Failed,
}

/// Outcome of SR tracking, for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrResult {
    /// This grant answers the SR sent in `sr_frame`
    GrantAnsweringSr { sr_frame: FrameNum, elapsed_ms: u32 },
    /// This failure ends the SR sent in `sr_frame`
    FailureAnsweringSr { sr_frame: FrameNum, elapsed_ms: u32 },
    /// This SR was answered by a grant in `grant_frame`
    SrLeadsToGrant { grant_frame: FrameNum, elapsed_ms: u32 },
    /// This SR ended in failure in `failure_frame`
    SrLeadsToFailure { failure_frame: FrameNum, elapsed_ms: u32 },
    /// The event was not expected in the state the RNTI was in
    InvalidEvent { state: SrState, event: SrEvent },
}

impl SrResult {
    pub fn is_invalid(&self) -> bool {
        matches!(self, SrResult::InvalidEvent { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SrUeState {
    state: SrState,
    last_sr_frame: FrameNum,
    last_sr_instance: PduInstance,
    last_sr_ts: CaptureTs,
    last_grant_frame: FrameNum,
}

/// Effect of one event on the SR state machine
enum SrTransition {
    /// Move to the given state, nothing to report
    To(SrState),
    /// Answer the outstanding SR and move to the given state
    Answer(SrState),
    /// Unexpected event, state unchanged
    Invalid,
}

fn transition(state: SrState, event: SrEvent) -> SrTransition {
    use SrEvent::*;
    use SrState::*;
    match (state, event) {
        (Idle, Request) => SrTransition::To(Outstanding),
        // Most grants are not prompted by an SR
        (Idle, Grant) => SrTransition::To(Idle),
        (Idle, Failure) => SrTransition::Invalid,

        (Outstanding, Request) => SrTransition::Invalid,
        (Outstanding, Grant) => SrTransition::Answer(Idle),
        (Outstanding, Failure) => SrTransition::Answer(Failed),

        (Failed, Request) => SrTransition::To(Outstanding),
        (Failed, Grant) => SrTransition::To(Idle),
        (Failed, Failure) => SrTransition::Invalid,
    }
}

/// Links Scheduling Requests with the grant or failure that ends them
pub struct SrTracker {
    ues: HashMap<Rnti, SrUeState>,
    results: ResultCache<FrameKey, SrResult>,
}

impl SrTracker {
    pub fn new() -> Self {
        Self {
            ues: HashMap::new(),
            results: ResultCache::new(),
        }
    }

    pub fn reset(&mut self) {
        self.ues.clear();
        self.results.clear();
    }

    pub fn state(&self, rnti: Rnti) -> SrState {
        self.ues.get(&rnti).map(|ue| ue.state).unwrap_or_default()
    }

    /// Frame of the most recent grant seen for the RNTI, whether or not it answered an SR
    pub fn last_grant_frame(&self, rnti: Rnti) -> Option<FrameNum> {
        self.ues.get(&rnti).map(|ue| ue.last_grant_frame).filter(|f| *f != 0)
    }

    /// Feeds one SR related event through the state machine of its RNTI.
    /// When an outstanding SR is answered, both the answering frame and the SR frame get a
    /// result. On later passes, only the stored result for `key` is returned.
    pub fn on_event(&mut self, rnti: Rnti, event: SrEvent, key: FrameKey, ts: CaptureTs, is_first_pass: bool) -> Option<SrResult> {
        if !is_first_pass {
            return self.results.get(&key).copied();
        }
        let (frame, pdu_instance) = key;

        let ue = self.ues.entry(rnti).or_default();
        let from = ue.state;
        match transition(from, event) {
            SrTransition::To(next) => {
                if event == SrEvent::Request {
                    ue.last_sr_frame = frame;
                    ue.last_sr_instance = pdu_instance;
                    ue.last_sr_ts = ts;
                }
                if event == SrEvent::Grant {
                    ue.last_grant_frame = frame;
                }
                if next != from {
                    tracing::debug!(frame = frame, "sr: rnti {} {:?} -> {:?} on {:?}", rnti, from, next, event);
                }
                ue.state = next;
            }
            SrTransition::Answer(next) => {
                let sr_frame = ue.last_sr_frame;
                let sr_key = (sr_frame, ue.last_sr_instance);
                let elapsed_ms = ts.elapsed_ms(ue.last_sr_ts);
                let (answer, back) = if event == SrEvent::Grant {
                    ue.last_grant_frame = frame;
                    (
                        SrResult::GrantAnsweringSr { sr_frame, elapsed_ms },
                        SrResult::SrLeadsToGrant { grant_frame: frame, elapsed_ms },
                    )
                } else {
                    (
                        SrResult::FailureAnsweringSr { sr_frame, elapsed_ms },
                        SrResult::SrLeadsToFailure { failure_frame: frame, elapsed_ms },
                    )
                };
                ue.state = next;
                tracing::debug!(frame = frame, "<- sr: rnti {} {:?} answers SR in frame {} ({} ms)", rnti, event, sr_frame, elapsed_ms);

                self.results.put(key, answer);
                self.results.put(sr_key, back);
            }
            SrTransition::Invalid => {
                tracing::warn!(frame = frame, "sr: rnti {} unexpected {:?} in state {:?}", rnti, event, from);
                self.results.put(key, SrResult::InvalidEvent { state: from, event });
            }
        }
        self.results.get(&key).copied()
    }

    pub fn result(&self, frame: FrameNum, pdu_instance: PduInstance) -> Option<&SrResult> {
        self.results.get(&(frame, pdu_instance))
    }

    pub fn results(&self) -> impl Iterator<Item = (&FrameKey, &SrResult)> {
        self.results.iter()
    }
}

impl Default for SrTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltemac_core::debug;

    const RNTI: Rnti = Rnti(7);

    fn ms(v: u64) -> CaptureTs {
        CaptureTs::from_millis(v)
    }

    #[test]
    fn test_sr_answered_by_grant() {
        debug::setup_logging_verbose();
        let mut sr = SrTracker::new();
        assert_eq!(sr.on_event(RNTI, SrEvent::Request, (50, 0), ms(1000), true), None);
        assert_eq!(sr.state(RNTI), SrState::Outstanding);

        let r = sr.on_event(RNTI, SrEvent::Grant, (55, 0), ms(1040), true);
        assert_eq!(r, Some(SrResult::GrantAnsweringSr { sr_frame: 50, elapsed_ms: 40 }));
        assert_eq!(sr.result(50, 0), Some(&SrResult::SrLeadsToGrant { grant_frame: 55, elapsed_ms: 40 }));
        assert_eq!(sr.state(RNTI), SrState::Idle);
        assert_eq!(sr.last_grant_frame(RNTI), Some(55));

        // Replays
        assert_eq!(sr.on_event(RNTI, SrEvent::Request, (50, 0), ms(1000), false), Some(SrResult::SrLeadsToGrant { grant_frame: 55, elapsed_ms: 40 }));
        assert_eq!(sr.on_event(RNTI, SrEvent::Grant, (55, 0), ms(1040), false), r);
        assert_eq!(sr.state(RNTI), SrState::Idle);
    }

    #[test]
    fn test_failure_then_recovery() {
        let mut sr = SrTracker::new();
        sr.on_event(RNTI, SrEvent::Request, (1, 0), ms(0), true);
        let r = sr.on_event(RNTI, SrEvent::Failure, (9, 0), ms(80), true);
        assert_eq!(r, Some(SrResult::FailureAnsweringSr { sr_frame: 1, elapsed_ms: 80 }));
        assert_eq!(sr.result(1, 0), Some(&SrResult::SrLeadsToFailure { failure_frame: 9, elapsed_ms: 80 }));
        assert_eq!(sr.state(RNTI), SrState::Failed);

        // Grant after failure: back to idle, nothing linked
        assert_eq!(sr.on_event(RNTI, SrEvent::Grant, (12, 0), ms(100), true), None);
        assert_eq!(sr.state(RNTI), SrState::Idle);
    }

    #[test]
    fn test_failed_then_new_request() {
        let mut sr = SrTracker::new();
        sr.on_event(RNTI, SrEvent::Request, (1, 0), ms(0), true);
        sr.on_event(RNTI, SrEvent::Failure, (2, 0), ms(10), true);
        sr.on_event(RNTI, SrEvent::Request, (3, 0), ms(20), true);
        assert_eq!(sr.state(RNTI), SrState::Outstanding);
        let r = sr.on_event(RNTI, SrEvent::Grant, (4, 0), ms(26), true);
        assert_eq!(r, Some(SrResult::GrantAnsweringSr { sr_frame: 3, elapsed_ms: 6 }));
    }

    #[test]
    fn test_invalid_events() {
        let mut sr = SrTracker::new();
        let r = sr.on_event(RNTI, SrEvent::Failure, (1, 0), ms(0), true);
        assert_eq!(r, Some(SrResult::InvalidEvent { state: SrState::Idle, event: SrEvent::Failure }));
        assert_eq!(sr.state(RNTI), SrState::Idle);

        sr.on_event(RNTI, SrEvent::Request, (2, 0), ms(5), true);
        let r = sr.on_event(RNTI, SrEvent::Request, (3, 0), ms(10), true);
        assert_eq!(r, Some(SrResult::InvalidEvent { state: SrState::Outstanding, event: SrEvent::Request }));
        // The first SR is still the one that gets answered
        let r = sr.on_event(RNTI, SrEvent::Grant, (4, 0), ms(15), true);
        assert_eq!(r, Some(SrResult::GrantAnsweringSr { sr_frame: 2, elapsed_ms: 10 }));
    }

    #[test]
    fn test_every_pair_handled() {
        let states = [SrState::Idle, SrState::Outstanding, SrState::Failed];
        let events = [SrEvent::Request, SrEvent::Grant, SrEvent::Failure];
        let mut invalid = 0;
        for s in states {
            for e in events {
                if matches!(transition(s, e), SrTransition::Invalid) {
                    invalid += 1;
                }
            }
        }
        assert_eq!(invalid, 3);
    }

    #[test]
    fn test_rntis_are_independent() {
        let mut sr = SrTracker::new();
        sr.on_event(Rnti(1), SrEvent::Request, (1, 0), ms(0), true);
        assert_eq!(sr.state(Rnti(2)), SrState::Idle);
        assert!(sr.on_event(Rnti(2), SrEvent::Grant, (2, 0), ms(4), true).is_none());
        assert_eq!(sr.state(Rnti(1)), SrState::Outstanding);
    }

    #[test]
    fn test_answer_written_back_to_sr_pdu() {
        let mut sr = SrTracker::new();
        sr.on_event(Rnti(8), SrEvent::Request, (50, 0), ms(1000), true);
        sr.on_event(RNTI, SrEvent::Request, (50, 1), ms(1000), true);

        let grant = sr.on_event(RNTI, SrEvent::Grant, (55, 0), ms(1040), true);
        let failure = sr.on_event(Rnti(9), SrEvent::Failure, (55, 1), ms(1040), true);
        assert_eq!(grant, Some(SrResult::GrantAnsweringSr { sr_frame: 50, elapsed_ms: 40 }));
        assert_eq!(failure, Some(SrResult::InvalidEvent { state: SrState::Idle, event: SrEvent::Failure }));

        assert_eq!(sr.result(50, 1), Some(&SrResult::SrLeadsToGrant { grant_frame: 55, elapsed_ms: 40 }));
        assert_eq!(sr.result(50, 0), None);
        assert_eq!(sr.on_event(RNTI, SrEvent::Grant, (55, 0), ms(1040), false), grant);
    }
}
