//! Primitives exchanged between the inference engine and its collaborators
//!
//! - `mac`: per-PDU frame events produced by the MAC PDU parser
//! - `rrc`: per-UE configuration signalled by the RRC layer
//! - `sapmsg`: a tagged envelope over all of the above, in capture order

pub mod mac;
pub mod rrc;
pub mod sapmsg;

pub use sapmsg::*;
