use std::collections::HashMap;

use ltemac_config::SharedConfig;
use ltemac_core::{CaptureTs, FrameNum, SfnTime, UeId};
use ltemac_saps::mac::DrxCommandKind;
use ltemac_saps::rrc::DrxConfigParams;

use crate::mac::subcomp::result_cache::{FrameKey, ResultCache};

/// HARQ processes for which DRX keeps RTT and retransmission timers
pub const DRX_HARQ_PROCESSES: usize = 8;

/// DRX configuration currently in force for a UE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrxConfig {
    pub params: DrxConfigParams,
    pub installed_in_frame: FrameNum,
    pub previous_config_frame: Option<FrameNum>,
}

/// A DRX timer, for querying snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrxTimer {
    OnDuration,
    Inactivity,
    HarqRtt(u8),
    Retransmission(u8),
    ShortCycle,
}

/// Running DRX state of a UE. Timers hold the absolute tick at which they expire;
/// a timer is running while the current tick is below its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrxRunningState {
    /// Monotonic subframe counter, unaffected by SFN wraparound
    pub ticks: u64,
    /// SFN/subframe the counter currently corresponds to
    pub time: Option<SfnTime>,
    pub last_ts: Option<CaptureTs>,

    pub on_duration: Option<u64>,
    pub inactivity: Option<u64>,
    pub harq_rtt: [Option<u64>; DRX_HARQ_PROCESSES],
    pub retransmission: [Option<u64>; DRX_HARQ_PROCESSES],
    pub short_cycle_timer: Option<u64>,
    pub in_short_cycle: bool,
}

impl DrxRunningState {
    fn expiry(&self, timer: DrxTimer) -> Option<u64> {
        match timer {
            DrxTimer::OnDuration => self.on_duration,
            DrxTimer::Inactivity => self.inactivity,
            DrxTimer::HarqRtt(id) => self.harq_rtt.get(id as usize).copied().flatten(),
            DrxTimer::Retransmission(id) => self.retransmission.get(id as usize).copied().flatten(),
            DrxTimer::ShortCycle => self.short_cycle_timer,
        }
    }

    pub fn is_running(&self, timer: DrxTimer) -> bool {
        self.remaining(timer).is_some()
    }

    /// Subframes left before the timer expires, None if it is not running
    pub fn remaining(&self, timer: DrxTimer) -> Option<u64> {
        match self.expiry(timer) {
            Some(e) if e > self.ticks => Some(e - self.ticks),
            _ => None,
        }
    }

    /// Whether the UE is monitoring the PDCCH
    pub fn is_active_time(&self) -> bool {
        self.is_running(DrxTimer::OnDuration)
            || self.is_running(DrxTimer::Inactivity)
            || (0..DRX_HARQ_PROCESSES as u8).any(|id| self.is_running(DrxTimer::Retransmission(id)))
    }

    /// Stops every timer except on-duration, and leaves the short cycle
    fn clear_timers_except_on_duration(&mut self) {
        self.inactivity = None;
        self.harq_rtt = [None; DRX_HARQ_PROCESSES];
        self.retransmission = [None; DRX_HARQ_PROCESSES];
        self.short_cycle_timer = None;
        self.in_short_cycle = false;
    }

    fn clear_timers(&mut self) {
        self.on_duration = None;
        self.clear_timers_except_on_duration();
    }
}

/// DRX state before and after the event(s) of one MAC PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrxFrameSnapshot {
    pub config: DrxConfig,
    pub before: DrxRunningState,
    pub after: DrxRunningState,
    /// Set if the time gap since the previous event was too large to step through
    pub state_reset: bool,
}

/// What a MAC PDU means for the DRX timers of its UE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrxTrigger {
    /// New (not resent) uplink data was scheduled
    NewUlData,
    /// New downlink data was received with good CRC
    NewDlData,
    /// A downlink transmission on the given HARQ process
    DlTransmission { harq_id: u8 },
    /// Downlink data on the given HARQ process failed CRC
    DlCrcFailure { harq_id: u8 },
    Command(DrxCommandKind),
}

struct UeDrx {
    config: DrxConfig,
    /// False after an RRC release; events are ignored until a new configuration arrives
    valid: bool,
    state: DrxRunningState,
}

impl UeDrx {
    fn on_duration_start(&self, time: SfnTime) -> bool {
        let p = &self.config.params;
        let abs = time.to_int() as u32;
        match p.short_cycle {
            Some(sc) if self.state.in_short_cycle => {
                abs % sc.cycle as u32 == p.cycle_offset as u32 % sc.cycle as u32
            }
            _ => abs % p.long_cycle as u32 == p.cycle_offset as u32,
        }
    }

    /// Moves the state forward by exactly one subframe and applies timer expiries
    fn step(&mut self) {
        let Some(time) = self.state.time else {
            return;
        };
        let p = self.config.params;
        let s = &mut self.state;
        s.ticks += 1;
        let time = time.add_subframes(1);
        s.time = Some(time);
        let now = s.ticks;

        if s.in_short_cycle && s.short_cycle_timer.is_none_or(|e| e <= now) {
            tracing::trace!("drx: short cycle ended at {}", time);
            s.in_short_cycle = false;
            s.short_cycle_timer = None;
        }

        if s.on_duration.is_some_and(|e| e <= now) {
            s.on_duration = None;
        }
        if self.on_duration_start(time) {
            self.state.on_duration = Some(now + p.on_duration_timer as u64);
        }

        let s = &mut self.state;
        for id in 0..DRX_HARQ_PROCESSES {
            if s.retransmission[id].is_some_and(|e| e <= now) {
                s.retransmission[id] = None;
            }
            if s.harq_rtt[id].is_some_and(|e| e <= now) {
                s.harq_rtt[id] = None;
                s.retransmission[id] = Some(now + p.retransmission_timer as u64);
            }
        }

        if s.inactivity.is_some_and(|e| e <= now) {
            s.inactivity = None;
            if let Some(sc) = p.short_cycle {
                tracing::trace!("drx: inactivity expired at {}, entering short cycle", time);
                s.in_short_cycle = true;
                s.short_cycle_timer = Some(now + sc.timer as u64 * sc.cycle as u64);
            }
        }
    }

    /// Places the counter at `time` without stepping through the subframes before it.
    /// The on-duration timer still starts if `time` is a cycle start.
    fn anchor(&mut self, time: SfnTime) {
        self.state.time = Some(time);
        if self.on_duration_start(time) {
            self.state.on_duration = Some(self.state.ticks + self.config.params.on_duration_timer as u64);
        }
    }

    /// Brings the state up to `target`. Returns true if the state had to be reset.
    fn advance(&mut self, target: SfnTime, ts: CaptureTs, reset_gap_ms: u32) -> bool {
        let (Some(last_time), Some(last_ts)) = (self.state.time, self.state.last_ts) else {
            // First event for this configuration
            self.anchor(target);
            self.state.last_ts = Some(ts);
            return false;
        };

        let gap_ms = ts.elapsed_ms(last_ts);
        self.state.last_ts = Some(ts);
        if gap_ms >= reset_gap_ms {
            // Too long to tell how many SFN wraps passed; the timers can't be trusted
            tracing::debug!("drx: {} ms gap, resetting timers", gap_ms);
            self.state.clear_timers();
            self.state.ticks += gap_ms as u64;
            self.anchor(target);
            return true;
        }

        let steps = target.forward_from(last_time);
        for _ in 0..steps {
            self.step();
        }
        false
    }

    fn apply(&mut self, trigger: DrxTrigger, harq_rtt_len: u16) {
        let p = self.config.params;
        let s = &mut self.state;
        let now = s.ticks;
        match trigger {
            DrxTrigger::NewUlData | DrxTrigger::NewDlData => {
                s.inactivity = Some(now + p.inactivity_timer as u64);
            }
            DrxTrigger::DlTransmission { harq_id } => {
                if let Some(t) = s.retransmission.get_mut(harq_id as usize) {
                    *t = None;
                }
            }
            DrxTrigger::DlCrcFailure { harq_id } => {
                if let Some(t) = s.harq_rtt.get_mut(harq_id as usize) {
                    *t = Some(now + harq_rtt_len as u64);
                }
            }
            DrxTrigger::Command(kind) => {
                s.on_duration = None;
                s.inactivity = None;
                if kind == DrxCommandKind::LongDrx {
                    s.in_short_cycle = false;
                    s.short_cycle_timer = None;
                }
            }
        }
    }
}

/// Reconstructs the DRX timers of each UE from the traffic seen for it
pub struct DrxSimulator {
    reset_gap_ms: u32,
    harq_rtt_len: u16,
    ues: HashMap<UeId, UeDrx>,
    snapshots: ResultCache<FrameKey, DrxFrameSnapshot>,
}

impl DrxSimulator {
    pub fn new(config: &SharedConfig) -> Self {
        let cfg = config.config();
        Self {
            reset_gap_ms: cfg.drx.reset_gap_ms,
            harq_rtt_len: cfg.drx.harq_rtt_subframes,
            ues: HashMap::new(),
            snapshots: ResultCache::new(),
        }
    }

    pub fn reset(&mut self) {
        self.ues.clear();
        self.snapshots.clear();
    }

    /// Installs or replaces the DRX configuration of a UE.
    /// A replacement stops all running timers except on-duration.
    pub fn install_config(&mut self, ueid: UeId, params: DrxConfigParams, frame: FrameNum) {
        match self.ues.get_mut(&ueid) {
            Some(ue) => {
                let previous = ue.config.installed_in_frame;
                tracing::info!(frame = frame, "drx: ueid {} reconfigured (previous config in frame {})",
                    ueid, previous);
                ue.config = DrxConfig {
                    params,
                    installed_in_frame: frame,
                    previous_config_frame: Some(previous),
                };
                ue.valid = true;
                ue.state.clear_timers_except_on_duration();
            }
            None => {
                tracing::info!(frame = frame, "drx: ueid {} configured, long cycle {} offset {}",
                    ueid, params.long_cycle, params.cycle_offset);
                self.ues.insert(ueid, UeDrx {
                    config: DrxConfig { params, installed_in_frame: frame, previous_config_frame: None },
                    valid: true,
                    state: DrxRunningState::default(),
                });
            }
        }
    }

    /// Marks the DRX configuration of a UE as released. The entry is kept.
    pub fn release_config(&mut self, ueid: UeId, frame: FrameNum) {
        match self.ues.get_mut(&ueid) {
            Some(ue) => {
                tracing::info!(frame = frame, "drx: ueid {} released", ueid);
                ue.valid = false;
            }
            None => tracing::debug!(frame = frame, "drx: release for unconfigured ueid {}", ueid),
        }
    }

    pub fn config(&self, ueid: UeId) -> Option<&DrxConfig> {
        self.ues.get(&ueid).filter(|ue| ue.valid).map(|ue| &ue.config)
    }

    /// Current running state of a UE, as of the last event processed for it
    pub fn state(&self, ueid: UeId) -> Option<&DrxRunningState> {
        self.ues.get(&ueid).filter(|ue| ue.valid).map(|ue| &ue.state)
    }

    /// Advances the UE's timers to the time of this PDU, then applies its triggers. Before and after
    /// snapshots are stored on the first pass and returned unchanged on later passes.
    /// Returns None for UEs without a valid DRX configuration.
    pub fn on_mac_event(
        &mut self,
        ueid: UeId,
        key: FrameKey,
        time: SfnTime,
        ts: CaptureTs,
        triggers: &[DrxTrigger],
        is_first_pass: bool,
    ) -> Option<DrxFrameSnapshot> {
        if !is_first_pass {
            return self.snapshots.get(&key).copied();
        }

        let ue = self.ues.get_mut(&ueid).filter(|ue| ue.valid)?;
        let state_reset = ue.advance(time, ts, self.reset_gap_ms);
        let before = ue.state;
        for trigger in triggers {
            ue.apply(*trigger, self.harq_rtt_len);
        }
        let snapshot = DrxFrameSnapshot {
            config: ue.config,
            before,
            after: ue.state,
            state_reset,
        };
        tracing::trace!(frame = key.0, "drx: ueid {} at {} active {} -> {}",
            ueid, time, before.is_active_time(), snapshot.after.is_active_time());
        self.snapshots.put(key, snapshot);
        Some(snapshot)
    }

    pub fn snapshot(&self, key: FrameKey) -> Option<&DrxFrameSnapshot> {
        self.snapshots.get(&key)
    }
}
