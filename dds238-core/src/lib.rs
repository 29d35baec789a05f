//! # dds238-core
//!
//! Core protocol implementation for DDS238 energy meters.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding
//! - Checksum calculation
//! - Command and response definitions
//! - Response validation and field decoding
//! - Error taxonomy and session bookkeeping
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod constants;
pub mod decode;
pub mod error;
pub mod frame;
pub mod raw;
pub mod session;
pub mod validate;

pub use command::{Command, CommandKind, MessageType, ResponseKind};
pub use decode::{decode, Decoded};
pub use error::{Error, ErrorCode, ErrorKind, ErrorType, Result};
pub use frame::Frame;
pub use session::Session;
pub use validate::{validate, Expectation, Response};
