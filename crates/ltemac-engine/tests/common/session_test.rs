use ltemac_config::{EngineConfig, SharedConfig};
use ltemac_core::{CaptureTs, Direction, EngineErr, FrameNum, Rnti, RntiType};
use ltemac_engine::{FrameAnnotations, MacSession};
use ltemac_saps::mac::MacFrameEvent;
use ltemac_saps::sapmsg::SapMsg;

/// Creates a default config for testing. It can still be modified as needed
/// before passing it to the SessionTest constructor
pub fn default_test_config() -> EngineConfig {
    EngineConfig::default()
}

/// Builds a MAC event for a C-RNTI at the given capture time (in ms since capture start).
/// SFN and subframe follow from the timestamp, one subframe per millisecond.
pub fn mac_event(frame: FrameNum, direction: Direction, rnti: u16, ms: u64) -> MacFrameEvent {
    let subframes = ms % 10240;
    MacFrameEvent {
        frame,
        pdu_instance: 0,
        ts: CaptureTs::from_millis(ms),
        direction,
        rnti: Rnti(rnti),
        rnti_type: RntiType::C,
        ueid: rnti,
        sfn: Some((subframes / 10) as u16),
        subframe: (subframes % 10) as u8,
        harq_id: None,
        tb_slot: 0,
        ndi: false,
        crc_ok: true,
        retx_count: 0,
        pdu: Vec::new(),
        pdu_len: None,
        ces: Default::default(),
        sr_event: None,
    }
}

/// Same as mac_event, with a PDU on the given HARQ process
pub fn harq_event(frame: FrameNum, direction: Direction, rnti: u16, ms: u64, harq_id: u8, pdu: &[u8]) -> MacFrameEvent {
    let mut ev = mac_event(frame, direction, rnti, ms);
    ev.harq_id = Some(harq_id);
    ev.pdu = pdu.to_vec();
    ev
}

/// Feeds a session the way a dissector host does: every message once on the first pass,
/// then any number of replays. Keeps the recorded messages and the first-pass outputs.
pub struct SessionTest {
    pub session: MacSession,
    pub msgs: Vec<SapMsg>,
    pub first_pass: Vec<Option<FrameAnnotations>>,
}

impl SessionTest {
    pub fn new(config: EngineConfig) -> Self {
        let shared = SharedConfig::from_config(config).expect("valid test config");
        Self {
            session: MacSession::new(shared),
            msgs: Vec::new(),
            first_pass: Vec::new(),
        }
    }

    /// Processes a message on the first pass and records it for later replays
    pub fn submit(&mut self, msg: SapMsg) -> Result<Option<FrameAnnotations>, EngineErr> {
        let res = self.session.handle_sapmsg(&msg, true);
        self.first_pass.push(res.clone().ok().flatten());
        self.msgs.push(msg);
        res
    }

    /// Submits a MAC event and returns its first-pass annotations
    pub fn submit_event(&mut self, ev: MacFrameEvent) -> FrameAnnotations {
        let frame = ev.frame;
        self.submit(SapMsg::MacFrameInd { frame, ctx: Some(ev) })
            .expect("event accepted")
            .expect("mac frame yields annotations")
    }

    /// Replays the message with the given index
    pub fn replay_one(&mut self, index: usize) -> Option<FrameAnnotations> {
        self.session.handle_sapmsg(&self.msgs[index], false).expect("replay accepted")
    }

    /// Replays all recorded messages in order
    pub fn replay(&mut self) -> Vec<Option<FrameAnnotations>> {
        (0..self.msgs.len()).map(|i| self.replay_one(i)).collect()
    }
}
