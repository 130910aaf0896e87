//! Message category and device class bytes.
//!
//! A request message starts with a category byte (command or inquiry)
//! followed by the device class it is aimed at.

/// Request that changes device state; answered by ACK then Completion.
pub const COMMAND: u8 = 0x01;

/// Request that reads device state; answered by a single data reply.
pub const INQUIRY: u8 = 0x09;

/// Interface board of the device.
pub const INTERFACE: u8 = 0x00;

/// Camera block.
pub const CAMERA: u8 = 0x04;

/// Pan/tilt head.
pub const PAN_TILTER: u8 = 0x06;

/// Returns a human-readable name for a category byte.
pub fn category_name(byte: u8) -> &'static str {
    match byte {
        COMMAND => "COMMAND",
        INQUIRY => "INQUIRY",
        _ => "UNKNOWN",
    }
}

/// Returns a human-readable name for a device class byte.
pub fn device_class_name(byte: u8) -> &'static str {
    match byte {
        INTERFACE => "INTERFACE",
        CAMERA => "CAMERA",
        PAN_TILTER => "PAN_TILTER",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(category_name(0x01), "COMMAND");
        assert_eq!(category_name(0x09), "INQUIRY");
        assert_eq!(category_name(0x30), "UNKNOWN");
        assert_eq!(device_class_name(0x06), "PAN_TILTER");
        assert_eq!(device_class_name(0x07), "UNKNOWN");
    }
}
