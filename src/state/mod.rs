pub mod latency;
pub mod session_store;

pub use latency::LatencyStats;
pub use session_store::{MemorySession, SessionId, SessionRegistry, SessionStore};
