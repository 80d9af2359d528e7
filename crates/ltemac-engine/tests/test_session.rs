mod common;

use common::{SessionTest, default_test_config, harq_event, mac_event};
use ltemac_core::{CaptureTs, Direction, EngineErr, debug};
use ltemac_engine::Anomaly;
use ltemac_engine::mac::subcomp::cr_match::CrResult;
use ltemac_engine::mac::subcomp::drx::DrxTimer;
use ltemac_engine::mac::subcomp::harq_resend::{HarqAnomaly, ResendLink};
use ltemac_engine::mac::subcomp::sr_tracker::{SrResult, SrState};
use ltemac_saps::mac::{DrxCommandKind, SrEvent};
use ltemac_saps::rrc::{DrxConfigParams, RrcDrxConfigReq, RrcDrxReleaseReq};
use ltemac_saps::sapmsg::SapMsg;

const RNTI: u16 = 0x3d;
const PDU_A: [u8; 5] = [0x3d, 0x21, 0x02, 0x1f, 0x00];
const PDU_B: [u8; 5] = [0x3d, 0x21, 0x02, 0x1f, 0x01];

fn drx_params() -> DrxConfigParams {
    DrxConfigParams {
        long_cycle: 40,
        cycle_offset: 0,
        on_duration_timer: 10,
        inactivity_timer: 20,
        retransmission_timer: 4,
        short_cycle: None,
    }
}

#[test]
fn test_ul_resend_linked_both_ways() {
    debug::setup_logging_verbose();
    let mut test = SessionTest::new(default_test_config());
    let content: Vec<u8> = (0..40u8).map(|b| b.wrapping_mul(37)).collect();

    let a = test.submit_event(harq_event(100, Direction::Ul, RNTI, 0, 3, &content));
    assert_eq!(a.harq.unwrap().previous, None);

    let b = test.submit_event(harq_event(103, Direction::Ul, RNTI, 24, 3, &content));
    assert_eq!(b.harq.unwrap().previous, Some(ResendLink { frame: 100, pdu_instance: 0, elapsed_ms: 24 }));

    let s = &test.session;
    assert_eq!(s.harq_link(Direction::Ul, 100, 0).unwrap().next, Some(ResendLink { frame: 103, pdu_instance: 0, elapsed_ms: 24 }));
    assert!(s.harq_link(Direction::Dl, 100, 0).is_none());
}

#[test]
fn test_ul_window_bounds() {
    let mut test = SessionTest::new(default_test_config());
    test.submit_event(harq_event(1, Direction::Ul, RNTI, 0, 0, &PDU_A));
    let b = test.submit_event(harq_event(2, Direction::Ul, RNTI, 33, 0, &PDU_A));
    assert!(b.harq.unwrap().is_resend());
    let c = test.submit_event(harq_event(3, Direction::Ul, RNTI, 67, 0, &PDU_A));
    assert!(!c.harq.unwrap().is_resend());
}

#[test]
fn test_dl_window_bounds() {
    let mut test = SessionTest::new(default_test_config());
    test.submit_event(harq_event(200, Direction::Dl, RNTI, 0, 5, &PDU_A));
    let b = test.submit_event(harq_event(210, Direction::Dl, RNTI, 10, 5, &PDU_A));
    assert_eq!(b.harq.unwrap().previous, Some(ResendLink { frame: 200, pdu_instance: 0, elapsed_ms: 10 }));

    // 16 ms is too late for a DL resend
    let c = test.submit_event(harq_event(226, Direction::Dl, RNTI, 26, 5, &PDU_A));
    assert!(!c.harq.unwrap().is_resend());

    // 4 ms is too early
    let d = test.submit_event(harq_event(227, Direction::Dl, RNTI, 30, 5, &PDU_A));
    assert!(!d.harq.unwrap().is_resend());
}

#[test]
fn test_resend_requires_same_content_and_ndi() {
    let mut test = SessionTest::new(default_test_config());
    test.submit_event(harq_event(1, Direction::Ul, RNTI, 0, 1, &PDU_A));
    let b = test.submit_event(harq_event(2, Direction::Ul, RNTI, 8, 1, &PDU_B));
    assert!(!b.harq.unwrap().is_resend());

    let mut ev = harq_event(3, Direction::Ul, RNTI, 16, 1, &PDU_B);
    ev.ndi = true;
    let c = test.submit_event(ev);
    assert!(!c.harq.unwrap().is_resend());
}

#[test]
fn test_retx_without_original() {
    let mut test = SessionTest::new(default_test_config());
    let mut ev = harq_event(7, Direction::Ul, RNTI, 0, 2, &PDU_A);
    ev.retx_count = 2;
    let a = test.submit_event(ev);
    assert_eq!(a.harq.unwrap().anomaly, Some(HarqAnomaly::OriginalTxNotFound { retx_count: 2 }));
    assert_eq!(
        test.session.anomalies(),
        vec![Anomaly::OriginalTxNotFound { frame: 7, direction: Direction::Ul, retx_count: 2 }]
    );
}

#[test]
fn test_non_ue_rnti_not_tracked() {
    let mut test = SessionTest::new(default_test_config());
    let mut ev = harq_event(1, Direction::Dl, 0xffff, 0, 0, &PDU_A);
    ev.rnti_type = ltemac_core::RntiType::Si;
    let a = test.submit_event(ev);
    assert!(a.is_empty());
}

#[test]
fn test_sr_then_grant() {
    let mut test = SessionTest::new(default_test_config());
    let mut ev = mac_event(50, Direction::Ul, RNTI, 1000);
    ev.sr_event = Some(SrEvent::Request);
    assert_eq!(test.submit_event(ev).sr, None);

    let mut ev = mac_event(55, Direction::Dl, RNTI, 1040);
    ev.sr_event = Some(SrEvent::Grant);
    let a = test.submit_event(ev);
    assert_eq!(a.sr, Some(SrResult::GrantAnsweringSr { sr_frame: 50, elapsed_ms: 40 }));
    assert_eq!(test.session.sr_result(50, 0), Some(&SrResult::SrLeadsToGrant { grant_frame: 55, elapsed_ms: 40 }));

    // Failure while idle
    let mut ev = mac_event(60, Direction::Ul, RNTI, 1100);
    ev.sr_event = Some(SrEvent::Failure);
    let a = test.submit_event(ev);
    assert_eq!(a.sr, Some(SrResult::InvalidEvent { state: SrState::Idle, event: SrEvent::Failure }));
    assert_eq!(
        test.session.anomalies(),
        vec![Anomaly::InvalidSrEvent { frame: 60, state: SrState::Idle, event: SrEvent::Failure }]
    );
}

#[test]
fn test_pdus_sharing_a_frame() {
    let mut test = SessionTest::new(default_test_config());
    let content: Vec<u8> = (0..40u8).collect();

    test.submit_event(harq_event(100, Direction::Ul, RNTI, 0, 3, &content));
    let mut ev = mac_event(101, Direction::Ul, 7, 1);
    ev.sr_event = Some(SrEvent::Request);
    test.submit_event(ev);

    // Two PDUs in frame 103: a resend plus a grant for RNTI 7, then a stray failure for RNTI 8
    let mut ev = harq_event(103, Direction::Ul, RNTI, 24, 3, &content);
    ev.sr_event = Some(SrEvent::Grant);
    let a = test.submit_event(ev);
    assert_eq!(a.harq.as_ref().unwrap().previous, Some(ResendLink { frame: 100, pdu_instance: 0, elapsed_ms: 24 }));
    assert!(a.sr.is_none());

    let mut ev = harq_event(103, Direction::Ul, 8, 24, 3, &content);
    ev.pdu_instance = 1;
    ev.sr_event = Some(SrEvent::Failure);
    let b = test.submit_event(ev);
    assert!(!b.harq.as_ref().unwrap().is_resend());
    assert_eq!(b.sr, Some(SrResult::InvalidEvent { state: SrState::Idle, event: SrEvent::Failure }));

    let mut ev = mac_event(103, Direction::Dl, 7, 24);
    ev.pdu_instance = 2;
    ev.sr_event = Some(SrEvent::Grant);
    let c = test.submit_event(ev);
    assert_eq!(c.sr, Some(SrResult::GrantAnsweringSr { sr_frame: 101, elapsed_ms: 23 }));

    let replay = test.replay();
    assert_eq!(replay[2].as_ref(), Some(&a));
    assert_eq!(replay[3].as_ref(), Some(&b));
    assert_eq!(replay[4].as_ref(), Some(&c));

    let s = &test.session;
    assert_eq!(s.harq_link(Direction::Ul, 100, 0).unwrap().next, Some(ResendLink { frame: 103, pdu_instance: 0, elapsed_ms: 24 }));
    assert_eq!(s.sr_result(101, 0), Some(&SrResult::SrLeadsToGrant { grant_frame: 103, elapsed_ms: 23 }));
    assert_eq!(s.sr_result(103, 1), b.sr.as_ref());
}

#[test]
fn test_contention_resolution() {
    let mut test = SessionTest::new(default_test_config());
    let mut ev = mac_event(10, Direction::Ul, RNTI, 100);
    ev.ces.ccch_sdu = Some(vec![1, 2, 3, 4, 5, 6, 0x40, 0x41]);
    test.submit_event(ev);

    let mut ev = mac_event(12, Direction::Dl, RNTI, 112);
    ev.ces.cr_identity = Some(vec![1, 2, 3, 4, 5, 6]);
    let a = test.submit_event(ev);
    assert_eq!(a.cr, Some(CrResult::Matched { msg3_frame: 10, elapsed_ms: 12 }));

    let mut ev = mac_event(13, Direction::Dl, RNTI, 113);
    ev.ces.cr_identity = Some(vec![1, 2, 3, 4, 5, 9]);
    let a = test.submit_event(ev);
    assert_eq!(a.cr, Some(CrResult::NotMatched { msg3_frame: 10, elapsed_ms: 13 }));

    let mut ev = mac_event(14, Direction::Dl, RNTI + 1, 114);
    ev.ces.cr_identity = Some(vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(test.submit_event(ev).cr, Some(CrResult::NoMsg3));

    // Wrong length: no verdict at all
    let mut ev = mac_event(15, Direction::Dl, RNTI, 115);
    ev.ces.cr_identity = Some(vec![1, 2, 3, 4, 5]);
    assert_eq!(test.submit_event(ev).cr, None);

    assert_eq!(
        test.session.anomalies(),
        vec![Anomaly::CrNotMatched { frame: 13, msg3_frame: 10 }, Anomaly::CrNoMsg3 { frame: 14 }]
    );
}

#[test]
fn test_ues_per_tti() {
    let mut cfg = default_test_config();
    cfg.tti.max_ues_per_tti = Some(2);
    let mut test = SessionTest::new(cfg);

    let mut results = Vec::new();
    for (i, rnti) in [0x40u16, 0x41, 0x42].into_iter().enumerate() {
        let mut ev = mac_event(30 + i as u32, Direction::Dl, rnti, 500);
        ev.ts = CaptureTs(500_000 + 100 * i as u64);
        results.push(test.submit_event(ev));
    }
    assert_eq!(results.iter().map(|a| a.tti.unwrap().ues_in_tti).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(!results[1].tti_over_limit);
    assert!(results[2].tti_over_limit);
    assert_eq!(
        test.session.anomalies(),
        vec![Anomaly::TtiOverLimit { frame: 32, direction: Direction::Dl, ues_in_tti: 3 }]
    );

    // Next subframe
    let a = test.submit_event(mac_event(33, Direction::Dl, 0x40, 501));
    assert_eq!(a.tti.unwrap().ues_in_tti, 1);
}

#[test]
fn test_drx_timers_follow_traffic() {
    let mut test = SessionTest::new(default_test_config());
    test.submit(SapMsg::RrcDrxConfigReq(RrcDrxConfigReq { ueid: RNTI, frame: 1, params: drx_params() }))
        .unwrap();
    assert_eq!(test.session.drx_config(RNTI).unwrap().installed_in_frame, 1);

    // First event lands on a cycle start (subframe 1000): on-duration runs from there.
    // New UL data starts the inactivity timer
    let a = test.submit_event(mac_event(2, Direction::Ul, RNTI, 1000));
    let drx = a.drx.unwrap();
    assert_eq!(drx.before.remaining(DrxTimer::OnDuration), Some(10));
    assert!(drx.before.is_active_time());
    assert_eq!(drx.after.remaining(DrxTimer::Inactivity), Some(20));

    // DRX Command stops it again
    let mut ev = mac_event(3, Direction::Dl, RNTI, 1005);
    ev.ces.drx_command = Some(DrxCommandKind::Drx);
    let drx = test.submit_event(ev).drx.unwrap();
    assert_eq!(drx.before.remaining(DrxTimer::Inactivity), Some(15));
    assert!(!drx.after.is_active_time());

    // On-duration starts at the cycle boundary (subframe 1040)
    let mut ev = mac_event(4, Direction::Ul, RNTI, 1040);
    ev.retx_count = 1;
    let drx = test.submit_event(ev).drx.unwrap();
    assert_eq!(drx.before.remaining(DrxTimer::OnDuration), Some(10));
    assert_eq!(drx.before, drx.after);
    assert!(!drx.state_reset);

    // A long silence resets the state instead of stepping through it
    let drx = test.submit_event(mac_event(5, Direction::Ul, RNTI, 11_010)).drx.unwrap();
    assert!(drx.state_reset);
    assert!(!drx.before.is_active_time());

    // Nothing tracked after release
    test.submit(SapMsg::RrcDrxReleaseReq(RrcDrxReleaseReq { ueid: RNTI, frame: 6 })).unwrap();
    assert!(test.submit_event(mac_event(7, Direction::Ul, RNTI, 11_020)).drx.is_none());
    assert!(test.session.drx_snapshot(5, 0).is_some());
    assert!(test.session.drx_snapshot(7, 0).is_none());
}

#[test]
fn test_drx_crc_failure_starts_retransmission_timer() {
    let mut test = SessionTest::new(default_test_config());
    test.submit(SapMsg::RrcDrxConfigReq(RrcDrxConfigReq { ueid: RNTI, frame: 1, params: drx_params() }))
        .unwrap();

    let mut ev = harq_event(2, Direction::Dl, RNTI, 2000, 4, &PDU_A);
    ev.crc_ok = false;
    let drx = test.submit_event(ev).drx.unwrap();
    assert_eq!(drx.after.remaining(DrxTimer::HarqRtt(4)), Some(8));
    assert!(drx.after.remaining(DrxTimer::Inactivity).is_none());

    // HARQ RTT expired at 2008, retransmission timer runs until 2012
    let drx = test.submit_event(mac_event(3, Direction::Ul, RNTI, 2010)).drx.unwrap();
    assert_eq!(drx.before.remaining(DrxTimer::Retransmission(4)), Some(2));
    assert!(drx.before.is_active_time());

    // The resend on that process stops it
    let drx = test.submit_event(harq_event(4, Direction::Dl, RNTI, 2011, 4, &PDU_A)).drx.unwrap();
    assert!(drx.before.is_running(DrxTimer::Retransmission(4)));
    assert!(!drx.after.is_running(DrxTimer::Retransmission(4)));
}

#[test]
fn test_invalid_drx_config_rejected() {
    let mut test = SessionTest::new(default_test_config());
    let mut params = drx_params();
    params.cycle_offset = 40;
    let res = test.submit(SapMsg::RrcDrxConfigReq(RrcDrxConfigReq { ueid: RNTI, frame: 1, params }));
    assert!(matches!(res, Err(EngineErr::InvalidValue { field: "cycle_offset", .. })));
    assert!(test.session.drx_config(RNTI).is_none());
}

#[test]
fn test_disabled_analysis() {
    let mut cfg = default_test_config();
    cfg.analysis.ul_resends = false;
    cfg.analysis.sr = false;
    let mut test = SessionTest::new(cfg);

    test.submit_event(harq_event(1, Direction::Ul, RNTI, 0, 0, &PDU_A));
    let mut ev = harq_event(2, Direction::Ul, RNTI, 8, 0, &PDU_A);
    ev.sr_event = Some(SrEvent::Failure);
    let a = test.submit_event(ev);
    assert!(a.harq.is_none());
    assert!(a.sr.is_none());
    assert!(test.session.anomalies().is_empty());

    // Downlink is still on
    test.submit_event(harq_event(3, Direction::Dl, RNTI, 20, 0, &PDU_A));
    let a = test.submit_event(harq_event(4, Direction::Dl, RNTI, 28, 0, &PDU_A));
    assert!(a.harq.unwrap().is_resend());
}

#[test]
fn test_missing_context_leaves_state_alone() {
    let mut test = SessionTest::new(default_test_config());
    test.submit_event(harq_event(1, Direction::Ul, RNTI, 0, 0, &PDU_A));
    let res = test.submit(SapMsg::MacFrameInd { frame: 2, ctx: None });
    assert_eq!(res, Err(EngineErr::MissingContext { frame: 2 }));
    let a = test.submit_event(harq_event(3, Direction::Ul, RNTI, 8, 0, &PDU_A));
    assert_eq!(a.harq.unwrap().previous, Some(ResendLink { frame: 1, pdu_instance: 0, elapsed_ms: 8 }));
}

#[test]
fn test_replay_returns_final_state() {
    let mut test = SessionTest::new(default_test_config());
    test.submit_event(harq_event(100, Direction::Ul, RNTI, 0, 3, &PDU_A));
    test.submit_event(harq_event(108, Direction::Ul, RNTI, 8, 3, &PDU_A));
    let mut ev = mac_event(109, Direction::Ul, RNTI, 9);
    ev.sr_event = Some(SrEvent::Request);
    test.submit_event(ev);
    let mut ev = mac_event(110, Direction::Dl, RNTI, 14);
    ev.sr_event = Some(SrEvent::Grant);
    test.submit_event(ev);

    let replay = test.replay();
    // Links pointing forward are only known once the later frame was seen
    assert_eq!(test.first_pass[0].as_ref().unwrap().harq.as_ref().unwrap().next, None);
    assert_eq!(
        replay[0].as_ref().unwrap().harq.as_ref().unwrap().next,
        Some(ResendLink { frame: 108, pdu_instance: 0, elapsed_ms: 8 })
    );
    assert_eq!(test.first_pass[2].as_ref().unwrap().sr, None);
    assert_eq!(replay[2].as_ref().unwrap().sr, Some(SrResult::SrLeadsToGrant { grant_frame: 110, elapsed_ms: 5 }));

    // Backward links are there from the start
    assert_eq!(test.first_pass[1], replay[1]);
    assert_eq!(test.first_pass[3], replay[3]);

    // Out of order replays change nothing
    let single = test.replay_one(1);
    assert_eq!(single, replay[1]);
    assert_eq!(test.replay(), replay);
}

#[test]
fn test_reset() {
    let mut test = SessionTest::new(default_test_config());
    let mut ev = harq_event(1, Direction::Ul, RNTI, 0, 0, &PDU_A);
    ev.retx_count = 1;
    test.submit_event(ev);
    assert_eq!(test.session.anomalies().len(), 1);

    test.session.reset();
    assert!(test.session.anomalies().is_empty());
    assert!(test.session.harq_link(Direction::Ul, 1, 0).is_none());

    // Same frame numbers can be fed again, as for a newly loaded capture
    let a = test.submit_event(harq_event(1, Direction::Ul, RNTI, 0, 0, &PDU_A));
    assert_eq!(a.harq.unwrap().anomaly, None);
}
