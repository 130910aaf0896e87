//! Byte transport abstraction for VISCA buses.
//!
//! The protocol engine only needs three things from the wire:
//! - write a complete frame
//! - read one byte with a timeout
//! - ask whether unread bytes are waiting
//!
//! This is the lowest layer of the workspace. Everything else builds on top of
//! the [`BusTransport`] trait provided here.

pub mod error;
pub mod scripted;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use scripted::{ScriptEvent, ScriptedTransport};
pub use traits::BusTransport;

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialTransport};
