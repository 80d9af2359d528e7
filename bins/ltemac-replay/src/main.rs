use clap::Parser;

use std::fs::File;
use std::io::{BufRead, BufReader};

use ltemac_config::{SharedConfig, toml_config};
use ltemac_core::{Direction, ENGINE_VERSION, EngineErr, debug};
use ltemac_engine::mac::subcomp::cr_match::CrResult;
use ltemac_engine::mac::subcomp::sr_tracker::SrResult;
use ltemac_engine::{FrameAnnotations, MacSession};
use ltemac_saps::sapmsg::SapMsg;

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

/// Reads a JSON-lines trace. Empty lines and lines starting with '#' are skipped.
fn load_trace(path: &str) -> Vec<SapMsg> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: cannot open trace {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let mut msgs = Vec::new();
    for (lineno, line) in BufReader::new(f).lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error: reading {} line {}: {}", path, lineno + 1, e);
                std::process::exit(1);
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<SapMsg>(line) {
            Ok(msg) => msgs.push(msg),
            Err(e) => {
                eprintln!("Error: {} line {}: {}", path, lineno + 1, e);
                std::process::exit(1);
            }
        }
    }
    msgs
}

/// One-line rendering of the annotations of a PDU
fn describe(ann: &FrameAnnotations) -> String {
    let mut parts = vec![format!("#{}.{} {} rnti {}", ann.frame, ann.pdu_instance, ann.direction, ann.rnti)];
    if let Some(h) = &ann.harq {
        if let Some(p) = h.previous {
            parts.push(format!("resend of #{} (+{} ms)", p.frame, p.elapsed_ms));
        }
        if let Some(n) = h.next {
            parts.push(format!("resent in #{} (+{} ms)", n.frame, n.elapsed_ms));
        }
        if let Some(a) = h.anomaly {
            parts.push(format!("{:?}", a));
        }
    }
    if let Some(sr) = &ann.sr {
        parts.push(match sr {
            SrResult::GrantAnsweringSr { sr_frame, elapsed_ms } => format!("grant for SR #{} (+{} ms)", sr_frame, elapsed_ms),
            SrResult::FailureAnsweringSr { sr_frame, elapsed_ms } => format!("SR #{} failed (+{} ms)", sr_frame, elapsed_ms),
            SrResult::SrLeadsToGrant { grant_frame, elapsed_ms } => format!("SR granted in #{} (+{} ms)", grant_frame, elapsed_ms),
            SrResult::SrLeadsToFailure { failure_frame, elapsed_ms } => format!("SR failed in #{} (+{} ms)", failure_frame, elapsed_ms),
            SrResult::InvalidEvent { state, event } => format!("SR {:?} invalid in {:?}", event, state),
        });
    }
    if let Some(cr) = &ann.cr {
        parts.push(match cr {
            CrResult::Matched { msg3_frame, elapsed_ms } => format!("CR matches Msg3 #{} (+{} ms)", msg3_frame, elapsed_ms),
            CrResult::NotMatched { msg3_frame, .. } => format!("CR does NOT match Msg3 #{}", msg3_frame),
            CrResult::NoMsg3 => "CR without Msg3".to_string(),
        });
    }
    if let Some(d) = &ann.drx {
        parts.push(format!(
            "DRX {} -> {}{}",
            if d.before.is_active_time() { "active" } else { "sleep" },
            if d.after.is_active_time() { "active" } else { "sleep" },
            if d.state_reset { " (reset)" } else { "" }
        ));
    }
    if let Some(t) = &ann.tti {
        parts.push(format!("{} UEs in TTI{}", t.ues_in_tti, if ann.tti_over_limit { " (over limit)" } else { "" }));
    }
    parts.join(", ")
}

/// Runs every message through the session once. Returns the per-message annotations.
fn run_pass(session: &mut MacSession, msgs: &[SapMsg], is_first_pass: bool) -> Vec<Option<FrameAnnotations>> {
    let mut out = Vec::with_capacity(msgs.len());
    for msg in msgs {
        match session.handle_sapmsg(msg, is_first_pass) {
            Ok(ann) => out.push(ann),
            Err(EngineErr::MissingContext { frame }) => {
                tracing::debug!(frame = frame, "frame without mac context");
                out.push(None);
            }
            Err(e) => {
                if is_first_pass {
                    tracing::warn!("rejected {}: {:?}", msg.get_name(), e);
                }
                out.push(None);
            }
        }
    }
    out
}

/// Number of messages whose replay no longer carries what the first pass concluded
fn count_lost(first: &[Option<FrameAnnotations>], replay: &[Option<FrameAnnotations>]) -> usize {
    first
        .iter()
        .zip(replay)
        .filter(|&(f, r)| match (f, r) {
            (Some(f), Some(r)) => !r.extends(f),
            _ => f.is_some() != r.is_some(),
        })
        .count()
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "LTE MAC trace replay",
    long_about = "Replays a JSON-lines trace of MAC frame events and RRC primitives through the cross-frame inference engine"
)]
struct Args {
    /// Trace file (required)
    #[arg(help = "JSON-lines trace, one SapMsg per line")]
    trace: String,

    #[arg(short = 'c', long = "config", help = "TOML config with tracking parameters")]
    config: Option<String>,

    #[arg(short = 'p', long = "passes", default_value_t = 2, help = "Number of replay passes after the first pass")]
    passes: usize,

    #[arg(short = 'q', long = "quiet", help = "Only print the anomaly summary")]
    quiet: bool,
}

fn main() {
    eprintln!("[+] LTE MAC trace replay {}", ENGINE_VERSION);

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => load_config_from_toml(path),
        None => SharedConfig::default(),
    };
    let _log_guard = debug::setup_logging_default(cfg.config().debug_log.clone());

    let msgs = load_trace(&args.trace);
    let mut session = MacSession::new(cfg);
    tracing::info!("session {}: {} messages from {}", session.id(), msgs.len(), args.trace);

    let first = run_pass(&mut session, &msgs, true);

    // Later passes must agree with each other; compared to the first pass they only add forward links
    let mut reference: Option<Vec<Option<FrameAnnotations>>> = None;
    let mut mismatches = 0;
    for pass in 0..args.passes {
        let res = run_pass(&mut session, &msgs, false);
        match &reference {
            None => {
                let lost = count_lost(&first, &res);
                if lost > 0 {
                    eprintln!("Error: replay pass {} lost first-pass results in {} messages", pass + 1, lost);
                }
                mismatches += lost;
                reference = Some(res);
            }
            Some(r) => {
                let diff = r.iter().zip(&res).filter(|(a, b)| a != b).count();
                if diff > 0 {
                    eprintln!("Error: replay pass {} differs from the first replay in {} messages", pass + 1, diff);
                }
                mismatches += diff;
            }
        }
    }

    if !args.quiet {
        let shown = reference.as_ref().unwrap_or(&first);
        for ann in shown.iter().flatten() {
            println!("{}", describe(ann));
        }
    }

    let count = |dir: Direction| {
        first
            .iter()
            .flatten()
            .filter(|a| a.direction == dir && a.harq.as_ref().is_some_and(|h| h.is_resend()))
            .count()
    };
    let anomalies = session.anomalies();
    println!();
    println!("frames: {}, UL resends: {}, DL resends: {}", first.iter().flatten().count(), count(Direction::Ul), count(Direction::Dl));
    println!("anomalies: {}", anomalies.len());
    for a in &anomalies {
        println!("  {}", a);
    }

    if mismatches > 0 {
        std::process::exit(2);
    }
}
