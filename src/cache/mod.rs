//! Cache Module
//!
//! Document-backed cache store with TTL expiration, plus the repository
//! handle handed out by the manager.

mod clock;
mod codec;
mod record;
mod repository;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::ValueCodec;
pub use record::CacheRecord;
pub use repository::Repository;
pub use store::{CacheStore, FOREVER_MINUTES};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
