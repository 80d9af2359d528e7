use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use super::engine_config::{CfgAnalysis, CfgDrx, CfgHarq, CfgResendWindow, CfgTti, EngineConfig, SharedConfig};

/// Build `SharedConfig` from a TOML configuration string
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    let expected_config_version = "0.1";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref harq) = root.harq {
        if !harq.extra.is_empty() {
            return Err(format!("Unrecognized fields: harq::{:?}", sorted_keys(&harq.extra)).into());
        }
    }
    if let Some(ref drx) = root.drx {
        if !drx.extra.is_empty() {
            return Err(format!("Unrecognized fields: drx::{:?}", sorted_keys(&drx.extra)).into());
        }
    }
    if let Some(ref tti) = root.tti {
        if !tti.extra.is_empty() {
            return Err(format!("Unrecognized fields: tti::{:?}", sorted_keys(&tti.extra)).into());
        }
    }
    if let Some(ref analysis) = root.analysis {
        if !analysis.extra.is_empty() {
            return Err(format!("Unrecognized fields: analysis::{:?}", sorted_keys(&analysis.extra)).into());
        }
    }

    let mut cfg = EngineConfig {
        debug_log: root.debug_log,
        ..Default::default()
    };

    if let Some(harq) = root.harq {
        apply_harq_patch(&mut cfg.harq, harq);
    }
    if let Some(drx) = root.drx {
        apply_drx_patch(&mut cfg.drx, drx);
    }
    if let Some(tti) = root.tti {
        apply_tti_patch(&mut cfg.tti, tti);
    }
    if let Some(analysis) = root.analysis {
        apply_analysis_patch(&mut cfg.analysis, analysis);
    }

    Ok(SharedConfig::from_config(cfg)?)
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_harq_patch(dst: &mut CfgHarq, src: HarqDto) {
    if let Some(v) = src.ul_min_ms {
        dst.ul_window.min_ms = v;
    }
    if let Some(v) = src.ul_max_ms {
        dst.ul_window.max_ms = v;
    }
    if let Some(v) = src.dl_min_ms {
        dst.dl_window.min_ms = v;
    }
    if let Some(v) = src.dl_max_ms {
        dst.dl_window.max_ms = v;
    }
    if let Some(v) = src.snapshot_len {
        dst.snapshot_len = v;
    }
}

fn apply_drx_patch(dst: &mut CfgDrx, src: DrxDto) {
    if let Some(v) = src.reset_gap_ms {
        dst.reset_gap_ms = v;
    }
    if let Some(v) = src.harq_rtt_subframes {
        dst.harq_rtt_subframes = v;
    }
}

fn apply_tti_patch(dst: &mut CfgTti, src: TtiDto) {
    if let Some(v) = src.window_us {
        dst.window_us = v;
    }
    // Option
    dst.max_ues_per_tti = src.max_ues_per_tti;
}

fn apply_analysis_patch(dst: &mut CfgAnalysis, src: AnalysisDto) {
    if let Some(v) = src.ul_resends {
        dst.ul_resends = v;
    }
    if let Some(v) = src.dl_resends {
        dst.dl_resends = v;
    }
    if let Some(v) = src.drx {
        dst.drx = v;
    }
    if let Some(v) = src.sr {
        dst.sr = v;
    }
    if let Some(v) = src.contention_resolution {
        dst.contention_resolution = v;
    }
    if let Some(v) = src.ues_per_tti {
        dst.ues_per_tti = v;
    }
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    #[serde(default)]
    harq: Option<HarqDto>,

    #[serde(default)]
    drx: Option<DrxDto>,

    #[serde(default)]
    tti: Option<TtiDto>,

    #[serde(default)]
    analysis: Option<AnalysisDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct HarqDto {
    pub ul_min_ms: Option<u32>,
    pub ul_max_ms: Option<u32>,
    pub dl_min_ms: Option<u32>,
    pub dl_max_ms: Option<u32>,
    pub snapshot_len: Option<usize>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct DrxDto {
    pub reset_gap_ms: Option<u32>,
    pub harq_rtt_subframes: Option<u16>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct TtiDto {
    pub window_us: Option<u64>,
    pub max_ues_per_tti: Option<u16>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct AnalysisDto {
    pub ul_resends: Option<bool>,
    pub dl_resends: Option<bool>,
    pub drx: Option<bool>,
    pub sr: Option<bool>,
    pub contention_resolution: Option<bool>,
    pub ues_per_tti: Option<bool>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}
