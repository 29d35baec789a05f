//! Transport layer for the DDS238 protocol
//!
//! A [`Channel`] moves raw bytes to and from the meter. [`Link`] puts the
//! protocol's exchange discipline on top of a channel: drain stale input,
//! write, wait for the expected number of bytes, validate, drain again.

pub mod error;
pub mod link;
pub mod memory;
pub mod serial;

pub use error::{Error, Result};
pub use link::{Link, LinkConfig};
pub use memory::{MemoryChannel, Script};
pub use serial::SerialChannel;

use async_trait::async_trait;

/// Byte channel to a single meter
#[async_trait]
pub trait Channel: Send {
    /// Open the underlying line
    async fn open(&mut self) -> Result<()>;

    /// Close the underlying line
    async fn close(&mut self) -> Result<()>;

    /// Check if open
    fn is_open(&self) -> bool;

    /// Queue raw bytes for sending
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Push queued bytes onto the line
    async fn flush(&mut self) -> Result<()>;

    /// Number of received bytes waiting to be read
    async fn bytes_available(&mut self) -> Result<usize>;

    /// Read one pending byte
    async fn read_byte(&mut self) -> Result<u8>;

    /// Port name or description, for logs
    fn name(&self) -> String;
}
