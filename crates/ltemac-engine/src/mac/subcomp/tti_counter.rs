use ltemac_config::SharedConfig;
use ltemac_core::{CaptureTs, Direction};

use crate::mac::subcomp::result_cache::{FrameKey, ResultCache};

/// Position of a PDU among those scheduled in the same TTI and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtiResult {
    pub ues_in_tti: u16,
}

impl TtiResult {
    pub fn exceeds(&self, limit: Option<u16>) -> bool {
        limit.is_some_and(|l| self.ues_in_tti > l)
    }
}

#[derive(Debug, Default)]
struct TtiTracker {
    subframe: Option<u8>,
    start_ts: CaptureTs,
    count: u16,
}

/// Counts UEs scheduled per TTI, separately per direction
pub struct TtiCounter {
    window_us: u64,
    trackers: [TtiTracker; 2],
    results: [ResultCache<FrameKey, TtiResult>; 2],
}

impl TtiCounter {
    pub fn new(config: &SharedConfig) -> Self {
        Self {
            window_us: config.config().tti.window_us,
            trackers: Default::default(),
            results: Default::default(),
        }
    }

    pub fn reset(&mut self) {
        self.trackers = Default::default();
        for r in &mut self.results {
            r.clear();
        }
    }

    pub fn count(&mut self, direction: Direction, subframe: u8, key: FrameKey, ts: CaptureTs, is_first_pass: bool) -> Option<TtiResult> {
        let dir = direction.index();
        if !is_first_pass {
            return self.results[dir].get(&key).copied();
        }

        let tracker = &mut self.trackers[dir];
        if tracker.subframe == Some(subframe) && ts.elapsed_us(tracker.start_ts) < self.window_us {
            tracker.count = tracker.count.saturating_add(1);
        } else {
            tracker.subframe = Some(subframe);
            tracker.start_ts = ts;
            tracker.count = 1;
        }
        let result = TtiResult { ues_in_tti: tracker.count };
        self.results[dir].put(key, result);
        Some(result)
    }

    pub fn result(&self, direction: Direction, key: FrameKey) -> Option<&TtiResult> {
        self.results[direction.index()].get(&key)
    }

    pub fn results(&self, direction: Direction) -> impl Iterator<Item = (&FrameKey, &TtiResult)> {
        self.results[direction.index()].iter()
    }
}
