use serde::{Deserialize, Serialize};

use ltemac_core::{CaptureTs, Direction, FrameNum, PduInstance, Rnti, RntiType, SfnTime, UeId};

/// LCID of the uplink CCCH, on which Msg3 is carried
pub const LCID_CCCH: u8 = 0;

/// Length of the UE Contention Resolution Identity, and of the Msg3 prefix it echoes
pub const CR_IDENTITY_LEN: usize = 6;

/// Scheduling Request related event, as classified by the MAC parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SrEvent {
    /// The UE sent an SR on PUCCH
    Request,
    /// An uplink grant was seen for the UE
    Grant,
    /// The UE gave up on SR (sr-TransMax reached)
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrxCommandKind {
    /// DRX Command MAC CE (LCID 30)
    Drx,
    /// Long DRX Command MAC CE (LCID 29)
    LongDrx,
}

/// Control elements and SDUs of interest to the cross-frame trackers.
/// Everything else in the PDU is irrelevant here and not carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacControlElements {
    /// DL: DRX Command or Long DRX Command CE present
    #[serde(default)]
    pub drx_command: Option<DrxCommandKind>,

    /// DL: UE Contention Resolution Identity CE body. Should be exactly 6 bytes.
    #[serde(default)]
    pub cr_identity: Option<Vec<u8>>,

    /// UL: SDU on LCID 0 (CCCH), i.e. Msg3
    #[serde(default)]
    pub ccch_sdu: Option<Vec<u8>>,
}

/// The per-PDU event handed to the engine by the MAC PDU parser.
/// One is produced for each MAC PDU instance in a frame, in capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacFrameEvent {
    pub frame: FrameNum,
    #[serde(default)]
    pub pdu_instance: PduInstance,
    pub ts: CaptureTs,
    pub direction: Direction,

    pub rnti: Rnti,
    pub rnti_type: RntiType,
    pub ueid: UeId,

    /// System frame number, when the capturing entity reports it
    #[serde(default)]
    pub sfn: Option<u16>,
    /// Subframe number, 0 to 9
    pub subframe: u8,

    /// HARQ process id, when known
    #[serde(default)]
    pub harq_id: Option<u8>,
    /// DL only: transport block (codeword) slot, 0 or 1
    #[serde(default)]
    pub tb_slot: u8,
    #[serde(default)]
    pub ndi: bool,
    #[serde(default = "default_true")]
    pub crc_ok: bool,
    /// Retransmission count as reported on the wire, 0 for a new transmission
    #[serde(default)]
    pub retx_count: u8,

    /// Raw PDU bytes, possibly truncated to the capture snapshot length
    #[serde(default)]
    pub pdu: Vec<u8>,
    /// Length of the PDU before any truncation
    #[serde(default)]
    pub pdu_len: Option<usize>,

    #[serde(default)]
    pub ces: MacControlElements,

    #[serde(default)]
    pub sr_event: Option<SrEvent>,
}

fn default_true() -> bool {
    true
}

impl MacFrameEvent {
    /// Returns the combined SFN/subframe time, if the SFN is known and both values are in range
    pub fn sfn_time(&self) -> Option<SfnTime> {
        let sfn = self.sfn?;
        SfnTime::new(sfn, self.subframe).ok()
    }

    /// Original on-air length of the PDU
    pub fn full_len(&self) -> usize {
        self.pdu_len.unwrap_or(self.pdu.len())
    }

    pub fn is_retx_on_wire(&self) -> bool {
        self.retx_count > 0
    }
}
