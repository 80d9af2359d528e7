pub mod cr_match;
pub mod drx;
pub mod harq_resend;
pub mod result_cache;
pub mod sr_tracker;
pub mod tti_counter;
pub mod ue_cfg;
