//! VISCA bus controller.
//!
//! This is the "just works" layer. One [`BusController`] owns the transport,
//! serialises exchanges on the shared wire, tracks which command sockets are
//! still running, and assigns device addresses.

pub mod address;
pub mod bus;
pub mod command;
pub mod config;
pub mod error;
pub mod session;

pub use address::{ADDRESS_SET, IF_CLEAR_ALL, IF_CLEAR_ALL_REPLY};
pub use bus::BusController;
pub use command::{
    CameraCommand, DatascreenMode, DigitalEffect, Direction, Inquiry, InquiryValue, MemoryAction,
    PictureEffect, PowerState, VideoSystem, WideMode, MAX_EFFECT_LEVEL, MAX_PAN_SPEED, MAX_PRESET,
    MAX_TILT_SPEED, MAX_ZOOM_SPEED,
};
pub use config::BusConfig;
pub use error::{BusError, Result};
pub use session::{SessionTable, SocketKey, SocketStatus};
