pub mod mac;

// Re-export commonly used items
pub use mac::annotations::{Anomaly, FrameAnnotations};
pub use mac::session::MacSession;
