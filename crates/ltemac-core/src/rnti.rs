use core::fmt;

use serde::{Deserialize, Serialize};

/// Radio Network Temporary Identifier, the addressing handle for a UE on the channel
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rnti(pub u16);

impl fmt::Display for Rnti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Rnti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RNTI({})", self.0)
    }
}

/// RNTI class, as signalled by the capturing entity alongside the RNTI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RntiType {
    NoRnti,
    /// Paging
    P,
    /// Random access
    Ra,
    /// Cell
    C,
    /// System information
    Si,
    /// Semi-persistent scheduling
    Sps,
    /// MBMS
    M,
    /// Sidelink BCH
    SlBch,
    /// Sidelink
    Sl,
    /// Single-cell MBMS
    Sc,
    /// Group
    G,
}

impl RntiType {
    /// Only UE-specific RNTIs carry traffic whose HARQ / SR / DRX behaviour is tracked
    pub fn is_ue_specific(&self) -> bool {
        matches!(self, RntiType::C | RntiType::Sps)
    }
}
