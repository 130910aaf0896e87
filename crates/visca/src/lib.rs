//! VISCA camera control over multidrop serial buses.
//!
//! One controller talks to up to seven daisy-chained cameras or pan-tilt
//! heads on a single serial line. This crate re-exports the layers:
//!
//! # Crate Structure
//!
//! - [`transport`]: byte transport abstraction (serial port, scripted in-memory bus)
//! - [`frame`]: packet codec, nibble-packed integers and device error decoding
//! - [`bus`]: bus controller with socket completion tracking, enumeration and
//!   the camera command table

/// Re-export transport types.
pub mod transport {
    pub use visca_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use visca_frame::*;
}

/// Re-export bus controller types.
pub mod bus {
    pub use visca_bus::*;
}
