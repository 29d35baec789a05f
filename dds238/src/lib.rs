//! # dds238
//!
//! Rust driver for DDS238-4 W single-phase energy meters on a serial line.
//!
//! ## Features
//!
//! - Typed command and response frames with checksum validation
//! - Async/await API using Tokio
//! - Rate limited reads against a caller-owned snapshot
//! - Error classification and counters per session
//! - Raw hex passthrough for diagnostics
//!
//! ## Quick Start
//!
//! ```no_run
//! use dds238::{Meter, MeterSnapshot};
//!
//! #[tokio::main]
//! async fn main() -> dds238::Result<()> {
//!     let mut meter = Meter::new("/dev/ttyUSB0");
//!     let mut snapshot = MeterSnapshot::new();
//!
//!     meter.open().await?;
//!
//!     meter.get_measurement(&mut snapshot, true).await?;
//!     println!("{}", snapshot.measurement.data);
//!
//!     meter.set_power_cut(false, &mut snapshot).await?;
//!
//!     meter.close().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod meter;

// Re-exports
pub use error::{Error, Result};
pub use meter::Meter;

// Re-export types
pub use dds238_core::{Command, ErrorCode, ErrorKind, ErrorType, Session};
pub use dds238_transport::{Channel, MemoryChannel, Script, SerialChannel};
pub use dds238_types::{
    CutReason, LimitPurchaseData, MeasurementData, MeterSnapshot, PowerCompanyData, PowerCutData,
};
