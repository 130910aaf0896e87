//! VISCA frame encoding and decoding.
//!
//! Every frame on the bus is:
//! - A 1-byte header carrying sender, broadcast flag and recipient
//! - A 1-14 byte message
//! - The 0xFF terminator
//!
//! Integers inside messages are nibble-packed so no payload byte can collide
//! with the terminator. Error replies are decoded into [`DeviceError`] and
//! always surface as failures.

pub mod category;
pub mod codec;
pub mod device_error;
pub mod error;
pub mod nibble;
pub mod reader;
pub mod writer;

pub use category::{
    category_name, device_class_name, CAMERA, COMMAND, INQUIRY, INTERFACE, PAN_TILTER,
};
pub use codec::{
    decode_frame, encode_exchange, DeviceAddress, MessageType, ParsedReply, Recipient,
    BROADCAST_HEADER, CONTROLLER_ID, MAX_FRAME_LEN, MAX_PAYLOAD, MIN_FRAME_LEN, NETWORK_CHANGE,
    TERMINATOR,
};
pub use device_error::{decode_device_error, DeviceError};
pub use error::{FrameError, Result};
pub use nibble::{
    decode_signed, decode_word, encode_signed, encode_word, PAN_LIMIT, TILT_LIMIT, WORD_LEN,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
