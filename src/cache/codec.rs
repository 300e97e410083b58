//! Value Codec Module
//!
//! Optional encode/decode step (e.g. encryption) applied to serialized values
//! at the storage boundary.

use std::fmt;

use crate::error::Result;

/// Pluggable transform between the serialized value and its stored form.
///
/// When a store has a codec, `encode` runs on every write and `decode` on
/// every read. Without one, values are stored as plain JSON text.
pub trait ValueCodec: Send + Sync + fmt::Debug {
    /// Turns serialized JSON into the stored payload.
    fn encode(&self, plain: String) -> Result<String>;

    /// Turns a stored payload back into serialized JSON.
    fn decode(&self, stored: String) -> Result<String>;
}
