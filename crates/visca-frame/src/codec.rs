use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::category::{category_name, device_class_name, COMMAND, INQUIRY};
use crate::device_error::decode_device_error;
use crate::error::{FrameError, Result};

/// Last byte of every frame.
pub const TERMINATOR: u8 = 0xFF;

/// Header + one message byte + terminator.
pub const MIN_FRAME_LEN: usize = 3;

/// Largest frame allowed on the bus.
pub const MAX_FRAME_LEN: usize = 16;

/// Largest message between header and terminator.
pub const MAX_PAYLOAD: usize = MAX_FRAME_LEN - 2;

/// Bus id of the controller. Fixed by the protocol.
pub const CONTROLLER_ID: u8 = 0;

/// Header of a broadcast sent by the controller.
pub const BROADCAST_HEADER: u8 = HEADER_FIXED | BROADCAST_FLAG;

/// QQ byte of the 3-byte frame a device emits when the bus topology changed.
pub const NETWORK_CHANGE: u8 = 0x38;

const HEADER_FIXED: u8 = 0x80;
const BROADCAST_FLAG: u8 = 0x08;
const ID_MASK: u8 = 0x07;

/// Address of a single device on the bus (1..=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Lowest assignable address.
    pub const MIN: u8 = 1;
    /// Highest assignable address.
    pub const MAX: u8 = 7;

    /// Validate a device address.
    pub fn new(id: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&id) {
            return Err(FrameError::InvalidArgument(format!(
                "device address {id} outside {}..={}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(id))
    }

    /// Raw 3-bit id.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self> {
        Self::new(id)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who an outgoing frame is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// One device.
    Device(DeviceAddress),
    /// Every device on the bus.
    Broadcast,
}

impl From<DeviceAddress> for Recipient {
    fn from(address: DeviceAddress) -> Self {
        Recipient::Device(address)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Device(address) => write!(f, "{address}"),
            Recipient::Broadcast => write!(f, "*"),
        }
    }
}

/// Meaning of the QQ byte (second byte of a frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Outgoing command (`QQ == 0x01`).
    Command,
    /// Outgoing inquiry (`QQ == 0x09`).
    Inquiry,
    /// Command accepted into a socket (high nibble 4).
    Ack,
    /// Command finished, or inquiry answered on socket 0 (high nibble 5).
    Completion,
    /// Error reply (high nibble 6).
    Error,
    /// Anything else; carries the high nibble.
    Other(u8),
}

impl MessageType {
    /// Classify a QQ byte.
    pub fn from_qq(qq: u8) -> Self {
        match qq {
            COMMAND => MessageType::Command,
            INQUIRY => MessageType::Inquiry,
            _ => match qq >> 4 {
                4 => MessageType::Ack,
                5 => MessageType::Completion,
                6 => MessageType::Error,
                other => MessageType::Other(other),
            },
        }
    }
}

/// A frame received from (or, in tests, sent to) the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// The complete frame including header and terminator.
    pub raw: Bytes,
    /// Bus id of the sender (3 bits).
    pub sender: u8,
    /// Whether the broadcast flag was set.
    pub broadcast: bool,
    /// Recipient id (3 bits). Meaningless when `broadcast` is set.
    pub recipient: u8,
    /// Classification of the QQ byte.
    pub message_type: MessageType,
    /// Socket number from the low nibble of the QQ byte.
    pub socket: u8,
    /// Everything between header and terminator, QQ byte included.
    pub payload: Bytes,
}

impl ParsedReply {
    /// Bytes following the QQ byte, e.g. the data of an inquiry reply.
    pub fn data(&self) -> &[u8] {
        &self.payload[1..]
    }

    /// The frame as it appeared on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Total wire length.
    pub fn wire_size(&self) -> usize {
        self.raw.len()
    }
}

impl fmt::Display for ParsedReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let to = if self.broadcast {
            "*".to_string()
        } else {
            self.recipient.to_string()
        };
        write!(f, "[{} => {}] {}", self.sender, to, hex(&self.raw))
    }
}

/// Encode an outgoing frame from the controller.
///
/// Wire format:
/// ```text
/// ┌───────────────────────────┬──────────────────┬──────┐
/// │ Header (1B)               │ Message          │ 0xFF │
/// │ 1 s2 s1 s0 | b r2 r1 r0   │ (1-14 bytes)     │      │
/// └───────────────────────────┴──────────────────┴──────┘
/// ```
/// `s` is the controller id (always 0), `b` the broadcast flag and `r` the
/// recipient id when not broadcasting.
pub fn encode_exchange(recipient: Recipient, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.is_empty() || payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let target = match recipient {
        Recipient::Broadcast => BROADCAST_FLAG,
        Recipient::Device(address) => address.get() & ID_MASK,
    };
    let header = HEADER_FIXED | ((CONTROLLER_ID & ID_MASK) << 4) | target;

    dst.reserve(payload.len() + 2);
    dst.put_u8(header);
    dst.put_slice(payload);
    dst.put_u8(TERMINATOR);
    Ok(())
}

/// Decode one complete frame.
///
/// Error replies never come back as data: they are decoded into
/// [`FrameError::Device`]. The 3-byte network change notice yields
/// [`FrameError::NetworkChange`].
pub fn decode_frame(raw: &[u8]) -> Result<ParsedReply> {
    if raw.is_empty() {
        return Err(FrameError::Framing("empty frame".to_string()));
    }
    if raw.len() < MIN_FRAME_LEN {
        return Err(FrameError::Framing(format!(
            "frame too short ({} bytes, min {MIN_FRAME_LEN})",
            raw.len()
        )));
    }
    if raw.len() > MAX_FRAME_LEN {
        return Err(FrameError::Framing(format!(
            "frame too long ({} bytes, max {MAX_FRAME_LEN})",
            raw.len()
        )));
    }
    if raw[raw.len() - 1] != TERMINATOR {
        return Err(FrameError::Framing(format!(
            "frame not terminated: {}",
            hex(raw)
        )));
    }

    let header = raw[0];
    let qq = raw[1];

    if raw.len() == 3 && qq == NETWORK_CHANGE {
        return Err(FrameError::NetworkChange);
    }

    let socket = qq & 0x0F;
    let message_type = MessageType::from_qq(qq);

    if message_type == MessageType::Error {
        if raw.len() != 4 {
            return Err(FrameError::Framing(format!(
                "error reply must be 4 bytes, got {}",
                hex(raw)
            )));
        }
        return Err(FrameError::Device {
            sender: (header >> 4) & ID_MASK,
            error: decode_device_error(socket, raw[2]),
        });
    }

    let raw = Bytes::copy_from_slice(raw);
    let payload = raw.slice(1..raw.len() - 1);

    Ok(ParsedReply {
        sender: (header >> 4) & ID_MASK,
        broadcast: header & BROADCAST_FLAG != 0,
        recipient: header & ID_MASK,
        message_type,
        socket,
        payload,
        raw,
    })
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decoded one-line summary of a raw frame for trace output.
///
/// Requests name their category and device class; replies name their kind
/// and socket.
pub(crate) fn describe(raw: &[u8]) -> String {
    let (Some(&header), Some(&qq)) = (raw.first(), raw.get(1)) else {
        return hex(raw);
    };
    let sender = (header >> 4) & ID_MASK;
    let route = if header & BROADCAST_FLAG != 0 {
        format!("[{sender} => *]")
    } else {
        format!("[{sender} => {}]", header & ID_MASK)
    };

    let socket = qq & 0x0F;
    match MessageType::from_qq(qq) {
        MessageType::Command | MessageType::Inquiry => match raw.get(2) {
            Some(&rr) if raw.len() > MIN_FRAME_LEN => {
                format!("{route} {} {}", category_name(qq), device_class_name(rr))
            }
            _ => format!("{route} {}", category_name(qq)),
        },
        MessageType::Ack => format!("{route} ACK socket {socket}"),
        MessageType::Completion => format!("{route} COMPLETION socket {socket}"),
        MessageType::Error => format!("{route} ERROR socket {socket}"),
        MessageType::Other(_) => format!("{route} QQ {qq:02x}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_error::DeviceError;

    fn encode(recipient: Recipient, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_exchange(recipient, payload, &mut buf).unwrap();
        buf
    }

    fn device(id: u8) -> Recipient {
        Recipient::Device(DeviceAddress::new(id).unwrap())
    }

    #[test]
    fn header_for_device_and_broadcast() {
        assert_eq!(
            encode(device(1), &[0x01, 0x04, 0x00, 0x02]).as_ref(),
            &[0x81, 0x01, 0x04, 0x00, 0x02, 0xFF]
        );
        assert_eq!(
            encode(Recipient::Broadcast, &[0x30, 0x01]).as_ref(),
            &[0x88, 0x30, 0x01, 0xFF]
        );
        assert_eq!(encode(device(7), &[0x09])[0], 0x87);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let recipients = (1..=7).map(device).chain(std::iter::once(Recipient::Broadcast));
        for recipient in recipients {
            for len in 1..=MAX_PAYLOAD {
                let mut payload = vec![COMMAND];
                payload.extend((1..len).map(|i| i as u8));

                let wire = encode(recipient, &payload);
                let frame = decode_frame(&wire).unwrap();

                assert_eq!(frame.sender, CONTROLLER_ID);
                match recipient {
                    Recipient::Broadcast => assert!(frame.broadcast),
                    Recipient::Device(address) => {
                        assert!(!frame.broadcast);
                        assert_eq!(frame.recipient, address.get());
                    }
                }
                assert_eq!(frame.payload.as_ref(), payload.as_slice());
                assert_eq!(frame.message_type, MessageType::Command);
            }
        }
    }

    #[test]
    fn payload_bounds() {
        let mut buf = BytesMut::new();
        let err = encode_exchange(device(1), &[], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 0, .. }));

        let err = encode_exchange(device(1), &[0u8; 15], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 15, max: 14 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn device_address_bounds() {
        assert!(DeviceAddress::new(0).is_err());
        assert!(DeviceAddress::new(8).is_err());
        assert_eq!(DeviceAddress::try_from(3).unwrap().get(), 3);
    }

    #[test]
    fn unterminated_frames_rejected() {
        for raw in [
            &[0x90, 0x41, 0x00][..],
            &[0x90, 0x50, 0x02, 0xFE][..],
            &[0x90, 0x60, 0x41, 0x00][..],
            &[0x90, 0x38, 0x00][..],
        ] {
            assert!(matches!(decode_frame(raw), Err(FrameError::Framing(_))));
        }
    }

    #[test]
    fn short_and_long_frames_rejected() {
        assert!(matches!(decode_frame(&[]), Err(FrameError::Framing(_))));
        assert!(matches!(decode_frame(&[0xFF]), Err(FrameError::Framing(_))));
        assert!(matches!(
            decode_frame(&[0x90, 0xFF]),
            Err(FrameError::Framing(_))
        ));
        let mut long = vec![0x90, 0x50];
        long.extend([0x00; 15]);
        long.push(0xFF);
        assert!(matches!(decode_frame(&long), Err(FrameError::Framing(_))));
    }

    #[test]
    fn ack_completion_and_inquiry_reply() {
        let ack = decode_frame(&[0x90, 0x41, 0xFF]).unwrap();
        assert_eq!(ack.sender, 1);
        assert_eq!(ack.recipient, 0);
        assert_eq!(ack.message_type, MessageType::Ack);
        assert_eq!(ack.socket, 1);

        let done = decode_frame(&[0xA0, 0x52, 0xFF]).unwrap();
        assert_eq!(done.sender, 2);
        assert_eq!(done.message_type, MessageType::Completion);
        assert_eq!(done.socket, 2);

        let inquiry = decode_frame(&[0x90, 0x50, 0x02, 0xFF]).unwrap();
        assert_eq!(inquiry.socket, 0);
        assert_eq!(inquiry.data(), &[0x02]);
    }

    #[test]
    fn network_change_is_distinct() {
        let err = decode_frame(&[0x90, 0x38, 0xFF]).unwrap_err();
        assert!(matches!(err, FrameError::NetworkChange));

        // Only the 3-byte form is a topology notice.
        let frame = decode_frame(&[0x90, 0x38, 0x01, 0xFF]).unwrap();
        assert_eq!(frame.message_type, MessageType::Other(3));
    }

    #[test]
    fn error_replies_always_fail() {
        let err = decode_frame(&[0x90, 0x62, 0x41, 0xFF]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Device {
                sender: 1,
                error: DeviceError::CommandNotExecutable { socket: 2 }
            }
        ));

        let err = decode_frame(&[0xA0, 0x60, 0x02, 0xFF]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Device {
                sender: 2,
                error: DeviceError::SyntaxError
            }
        ));
    }

    #[test]
    fn malformed_error_reply_is_framing() {
        let err = decode_frame(&[0x90, 0x60, 0xFF]).unwrap_err();
        assert!(matches!(err, FrameError::Framing(_)));
        let err = decode_frame(&[0x90, 0x61, 0x41, 0x00, 0xFF]).unwrap_err();
        assert!(matches!(err, FrameError::Framing(_)));
    }

    #[test]
    fn message_type_classification() {
        assert_eq!(MessageType::from_qq(0x01), MessageType::Command);
        assert_eq!(MessageType::from_qq(0x09), MessageType::Inquiry);
        assert_eq!(MessageType::from_qq(0x4F), MessageType::Ack);
        assert_eq!(MessageType::from_qq(0x50), MessageType::Completion);
        assert_eq!(MessageType::from_qq(0x6F), MessageType::Error);
        assert_eq!(MessageType::from_qq(0x30), MessageType::Other(3));
    }

    #[test]
    fn display_shows_route_and_hex() {
        let frame = decode_frame(&[0x88, 0x30, 0x02, 0xFF]).unwrap();
        assert_eq!(frame.to_string(), "[0 => *] 88 30 02 ff");
    }

    #[test]
    fn describe_names_category_and_device_class() {
        assert_eq!(
            describe(&[0x81, 0x01, 0x06, 0x04, 0xFF]),
            "[0 => 1] COMMAND PAN_TILTER"
        );
        assert_eq!(
            describe(&[0x82, 0x09, 0x04, 0x00, 0xFF]),
            "[0 => 2] INQUIRY CAMERA"
        );
        assert_eq!(describe(&[0x88, 0x30, 0x01, 0xFF]), "[0 => *] QQ 30");
    }

    #[test]
    fn describe_names_reply_kind_and_socket() {
        assert_eq!(describe(&[0x90, 0x41, 0xFF]), "[1 => 0] ACK socket 1");
        assert_eq!(
            describe(&[0xA0, 0x52, 0xFF]),
            "[2 => 0] COMPLETION socket 2"
        );
        assert_eq!(
            describe(&[0x90, 0x60, 0x02, 0xFF]),
            "[1 => 0] ERROR socket 0"
        );
        assert_eq!(describe(&[0x90]), "90");
    }
}
