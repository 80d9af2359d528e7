use std::sync::Arc;

/// Uplink resends may come as blind repeats, allow up to roughly 4 HARQ round trips
pub const DEFAULT_UL_RESEND_MAX_MS: u32 = 33;
pub const DEFAULT_UL_RESEND_MIN_MS: u32 = 0;
/// Downlink resends follow one HARQ RTT, with some jitter
pub const DEFAULT_DL_RESEND_MIN_MS: u32 = 8;
pub const DEFAULT_DL_RESEND_MAX_MS: u32 = 13;
/// Bytes of each PDU kept for resend comparison
pub const DEFAULT_HARQ_SNAPSHOT_LEN: usize = 2048;

/// Wall clock gap after which DRX state is considered lost and reset instead of stepped
pub const DEFAULT_DRX_RESET_GAP_MS: u32 = 9000;
/// HARQ RTT timer, FDD
pub const DEFAULT_DRX_HARQ_RTT_SUBFRAMES: u16 = 8;

/// Events on the same subframe within this window are counted as the same TTI
pub const DEFAULT_TTI_WINDOW_US: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfgResendWindow {
    pub min_ms: u32,
    pub max_ms: u32,
}

impl CfgResendWindow {
    #[inline]
    pub fn contains(&self, elapsed_ms: u32) -> bool {
        elapsed_ms >= self.min_ms && elapsed_ms <= self.max_ms
    }
}

#[derive(Debug, Clone)]
pub struct CfgHarq {
    pub ul_window: CfgResendWindow,
    pub dl_window: CfgResendWindow,
    pub snapshot_len: usize,
}

impl Default for CfgHarq {
    fn default() -> Self {
        Self {
            ul_window: CfgResendWindow { min_ms: DEFAULT_UL_RESEND_MIN_MS, max_ms: DEFAULT_UL_RESEND_MAX_MS },
            dl_window: CfgResendWindow { min_ms: DEFAULT_DL_RESEND_MIN_MS, max_ms: DEFAULT_DL_RESEND_MAX_MS },
            snapshot_len: DEFAULT_HARQ_SNAPSHOT_LEN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgDrx {
    pub reset_gap_ms: u32,
    pub harq_rtt_subframes: u16,
}

impl Default for CfgDrx {
    fn default() -> Self {
        Self {
            reset_gap_ms: DEFAULT_DRX_RESET_GAP_MS,
            harq_rtt_subframes: DEFAULT_DRX_HARQ_RTT_SUBFRAMES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgTti {
    pub window_us: u64,
    /// Occupancy above this count is flagged. None disables the check.
    pub max_ues_per_tti: Option<u16>,
}

impl Default for CfgTti {
    fn default() -> Self {
        Self {
            window_us: DEFAULT_TTI_WINDOW_US,
            max_ues_per_tti: None,
        }
    }
}

/// Switches for the individual trackers
#[derive(Debug, Clone)]
pub struct CfgAnalysis {
    pub ul_resends: bool,
    pub dl_resends: bool,
    pub drx: bool,
    pub sr: bool,
    pub contention_resolution: bool,
    pub ues_per_tti: bool,
}

impl Default for CfgAnalysis {
    fn default() -> Self {
        Self {
            ul_resends: true,
            dl_resends: true,
            drx: true,
            sr: true,
            contention_resolution: true,
            ues_per_tti: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub debug_log: Option<String>,
    pub harq: CfgHarq,
    pub drx: CfgDrx,
    pub tti: CfgTti,
    pub analysis: CfgAnalysis,
}

impl EngineConfig {
    /// Validate that all configuration fields hold usable values.
    pub fn validate(&self) -> Result<(), &str> {
        if self.harq.ul_window.min_ms > self.harq.ul_window.max_ms {
            return Err("harq ul window: min_ms exceeds max_ms");
        }
        if self.harq.dl_window.min_ms > self.harq.dl_window.max_ms {
            return Err("harq dl window: min_ms exceeds max_ms");
        }
        if self.harq.snapshot_len == 0 {
            return Err("harq snapshot_len must be nonzero");
        }
        if self.drx.reset_gap_ms == 0 {
            return Err("drx reset_gap_ms must be nonzero");
        }
        // Stepping relies on the gap being shorter than one SFN wrap (10.24 s)
        if self.drx.reset_gap_ms >= 10240 {
            return Err("drx reset_gap_ms must be below the 10240 ms SFN period");
        }
        if self.drx.harq_rtt_subframes == 0 {
            return Err("drx harq_rtt_subframes must be nonzero");
        }
        if self.tti.window_us == 0 {
            return Err("tti window_us must be nonzero");
        }
        if self.tti.max_ues_per_tti == Some(0) {
            return Err("tti max_ues_per_tti must be nonzero when set");
        }
        Ok(())
    }
}

/// Read-only configuration, shared between a session and its trackers.
#[derive(Clone)]
pub struct SharedConfig {
    cfg: Arc<EngineConfig>,
}

impl SharedConfig {
    pub fn from_config(cfg: EngineConfig) -> Result<Self, String> {
        cfg.validate().map_err(|e| format!("Invalid engine configuration: {}", e))?;
        Ok(Self { cfg: Arc::new(cfg) })
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.cfg)
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self { cfg: Arc::new(EngineConfig::default()) }
    }
}
