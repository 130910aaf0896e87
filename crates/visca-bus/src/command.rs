//! Camera and pan-tilt command table.
//!
//! Every feature command is one row: a device class, an opcode and an
//! argument builder. [`BusController::command`] and
//! [`BusController::inquire`] are the only dispatchers; nothing here touches
//! the wire directly.

use std::fmt;
use std::time::Duration;

use tracing::debug;
use visca_frame::{
    decode_signed, decode_word, encode_signed, encode_word, DeviceAddress, MessageType,
    ParsedReply, CAMERA, COMMAND, INQUIRY, INTERFACE, PAN_LIMIT, PAN_TILTER, TILT_LIMIT, WORD_LEN,
};
use visca_transport::BusTransport;

use crate::bus::BusController;
use crate::error::{BusError, Result};

/// Fastest pan drive speed.
pub const MAX_PAN_SPEED: u8 = 0x18;
/// Fastest tilt drive speed.
pub const MAX_TILT_SPEED: u8 = 0x14;
/// Fastest variable zoom speed.
pub const MAX_ZOOM_SPEED: u8 = 0x07;
/// Highest memory preset number.
pub const MAX_PRESET: u8 = 5;
/// Highest digital effect level.
pub const MAX_EFFECT_LEVEL: u8 = 0x3F;

/// Direction of a continuous pan-tilt drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    Stop,
}

impl Direction {
    /// Pan (left/right) and tilt (up/down) drive codes. `3` holds the axis.
    fn codes(self) -> (u8, u8) {
        match self {
            Direction::Up => (0x03, 0x01),
            Direction::Down => (0x03, 0x02),
            Direction::Left => (0x01, 0x03),
            Direction::Right => (0x02, 0x03),
            Direction::UpLeft => (0x01, 0x01),
            Direction::UpRight => (0x02, 0x01),
            Direction::DownLeft => (0x01, 0x02),
            Direction::DownRight => (0x02, 0x02),
            Direction::Stop => (0x03, 0x03),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideMode {
    Off = 0x00,
    Cinema = 0x01,
    Full = 0x02,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureEffect {
    Off = 0x00,
    Pastel = 0x01,
    NegativeArt = 0x02,
    Sepia = 0x03,
    BlackWhite = 0x04,
    Solarize = 0x05,
    Mosaic = 0x06,
    Slim = 0x07,
    Stretch = 0x08,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitalEffect {
    Off = 0x00,
    Still = 0x01,
    Flash = 0x02,
    Lumi = 0x03,
    Trail = 0x04,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAction {
    Reset = 0x00,
    Set = 0x01,
    Recall = 0x02,
}

/// On-screen data display of the pan-tilter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatascreenMode {
    On = 0x02,
    Off = 0x03,
    Toggle = 0x10,
}

/// A feature command addressed to one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCommand {
    Power(bool),
    /// Minutes without a command before standby; 0 disables.
    AutoPowerOff(u16),
    ZoomStop,
    ZoomTele,
    ZoomWide,
    /// Variable speed 0-7.
    ZoomTeleSpeed(u8),
    /// Variable speed 0-7.
    ZoomWideSpeed(u8),
    /// Absolute zoom position (optical 0-4000, digital up to 7000).
    ZoomDirect(u16),
    DigitalZoom(bool),
    WideMode(WideMode),
    Mirror(bool),
    Freeze(bool),
    PictureEffect(PictureEffect),
    DigitalEffect(DigitalEffect),
    DigitalEffectLevel(u8),
    Memory(MemoryAction, u8),
    Datascreen(DatascreenMode),
    /// Continuous drive. Speeds for a held axis are ignored by the device.
    PanTiltDrive {
        direction: Direction,
        pan_speed: u8,
        tilt_speed: u8,
    },
    /// Move to an absolute position (pan +/-1440, tilt +/-360).
    PanTiltAbsolute {
        pan_speed: u8,
        tilt_speed: u8,
        pan: i16,
        tilt: i16,
    },
    PanTiltHome,
    PanTiltReset,
}

impl CameraCommand {
    /// Drive in `direction` with the default speeds.
    pub fn drive(direction: Direction) -> Self {
        CameraCommand::PanTiltDrive {
            direction,
            pan_speed: MAX_PAN_SPEED,
            tilt_speed: MAX_TILT_SPEED,
        }
    }

    /// Device class and opcode.
    fn target(&self) -> (u8, u8) {
        match self {
            Self::Power(_) => (CAMERA, 0x00),
            Self::AutoPowerOff(_) => (CAMERA, 0x40),
            Self::ZoomStop
            | Self::ZoomTele
            | Self::ZoomWide
            | Self::ZoomTeleSpeed(_)
            | Self::ZoomWideSpeed(_) => (CAMERA, 0x07),
            Self::ZoomDirect(_) => (CAMERA, 0x47),
            Self::DigitalZoom(_) => (CAMERA, 0x06),
            Self::WideMode(_) => (CAMERA, 0x60),
            Self::Mirror(_) => (CAMERA, 0x61),
            Self::Freeze(_) => (CAMERA, 0x62),
            Self::PictureEffect(_) => (CAMERA, 0x63),
            Self::DigitalEffect(_) => (CAMERA, 0x64),
            Self::DigitalEffectLevel(_) => (CAMERA, 0x65),
            Self::Memory(..) => (CAMERA, 0x3F),
            Self::Datascreen(_) => (PAN_TILTER, 0x06),
            Self::PanTiltDrive { .. } => (PAN_TILTER, 0x01),
            Self::PanTiltAbsolute { .. } => (PAN_TILTER, 0x02),
            Self::PanTiltHome => (PAN_TILTER, 0x04),
            Self::PanTiltReset => (PAN_TILTER, 0x05),
        }
    }

    /// Bytes following the opcode.
    fn args(&self) -> Result<Vec<u8>> {
        let args = match *self {
            Self::Power(on) | Self::DigitalZoom(on) | Self::Mirror(on) | Self::Freeze(on) => {
                vec![switch(on)]
            }
            Self::AutoPowerOff(minutes) => encode_word(minutes).to_vec(),
            Self::ZoomStop => vec![0x00],
            Self::ZoomTele => vec![0x02],
            Self::ZoomWide => vec![0x03],
            Self::ZoomTeleSpeed(speed) => {
                vec![0x20 | check(speed, MAX_ZOOM_SPEED, "zoom speed")?]
            }
            Self::ZoomWideSpeed(speed) => {
                vec![0x30 | check(speed, MAX_ZOOM_SPEED, "zoom speed")?]
            }
            Self::ZoomDirect(position) => encode_word(position).to_vec(),
            Self::WideMode(mode) => vec![mode as u8],
            Self::PictureEffect(effect) => vec![effect as u8],
            Self::DigitalEffect(effect) => vec![effect as u8],
            Self::DigitalEffectLevel(level) => {
                vec![check(level, MAX_EFFECT_LEVEL, "digital effect level")?]
            }
            Self::Memory(action, preset) => {
                vec![action as u8, check(preset, MAX_PRESET, "preset")?]
            }
            Self::Datascreen(mode) => vec![mode as u8],
            Self::PanTiltDrive {
                direction,
                pan_speed,
                tilt_speed,
            } => {
                let (lr, ud) = direction.codes();
                vec![
                    check(pan_speed, MAX_PAN_SPEED, "pan speed")?,
                    check(tilt_speed, MAX_TILT_SPEED, "tilt speed")?,
                    lr,
                    ud,
                ]
            }
            Self::PanTiltAbsolute {
                pan_speed,
                tilt_speed,
                pan,
                tilt,
            } => {
                let mut args = Vec::with_capacity(2 + 2 * WORD_LEN);
                args.push(check(pan_speed, MAX_PAN_SPEED, "pan speed")?);
                args.push(check(tilt_speed, MAX_TILT_SPEED, "tilt speed")?);
                args.extend_from_slice(&encode_signed(pan, PAN_LIMIT)?);
                args.extend_from_slice(&encode_signed(tilt, TILT_LIMIT)?);
                args
            }
            Self::PanTiltHome | Self::PanTiltReset => Vec::new(),
        };
        Ok(args)
    }

    /// Full message payload, e.g. `01 04 00 02` for power on.
    pub fn payload(&self) -> Result<Vec<u8>> {
        let (class, opcode) = self.target();
        let mut payload = vec![COMMAND, class, opcode];
        payload.extend(self.args()?);
        Ok(payload)
    }
}

fn switch(on: bool) -> u8 {
    if on {
        0x02
    } else {
        0x03
    }
}

fn check(value: u8, max: u8, what: &str) -> Result<u8> {
    if value > max {
        return Err(BusError::InvalidArgument(format!(
            "{what} {value} out of range (max {max})"
        )));
    }
    Ok(value)
}

/// A query answered on socket 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inquiry {
    Power,
    ZoomPosition,
    /// Interface version block, returned raw.
    Version,
    CameraId,
    VideoSystem,
    PanTiltPosition,
}

impl Inquiry {
    fn target(self) -> (u8, u8) {
        match self {
            Inquiry::Power => (CAMERA, 0x00),
            Inquiry::ZoomPosition => (CAMERA, 0x47),
            Inquiry::Version => (INTERFACE, 0x02),
            Inquiry::CameraId => (CAMERA, 0x22),
            Inquiry::VideoSystem => (PAN_TILTER, 0x23),
            Inquiry::PanTiltPosition => (PAN_TILTER, 0x12),
        }
    }

    /// Full message payload, e.g. `09 04 00` for the power inquiry.
    pub fn payload(self) -> Vec<u8> {
        let (class, opcode) = self.target();
        vec![INQUIRY, class, opcode]
    }

    /// Interpret the data bytes of the reply.
    pub fn decode(self, data: &[u8]) -> Result<InquiryValue> {
        let value = match self {
            Inquiry::Power => InquiryValue::Power(PowerState::from_byte(single(self, data)?)),
            Inquiry::ZoomPosition => InquiryValue::ZoomPosition(decode_word(data)?),
            Inquiry::Version => InquiryValue::Version(data.to_vec()),
            Inquiry::CameraId => InquiryValue::CameraId(decode_word(data)?),
            Inquiry::VideoSystem => InquiryValue::VideoSystem(VideoSystem(single(self, data)?)),
            Inquiry::PanTiltPosition => {
                if data.len() != 2 * WORD_LEN {
                    return Err(short_reply(self, data));
                }
                InquiryValue::PanTiltPosition {
                    pan: decode_signed(&data[..WORD_LEN])?,
                    tilt: decode_signed(&data[WORD_LEN..])?,
                }
            }
        };
        Ok(value)
    }
}

fn single(inquiry: Inquiry, data: &[u8]) -> Result<u8> {
    match data {
        [byte] => Ok(*byte),
        _ => Err(short_reply(inquiry, data)),
    }
}

fn short_reply(inquiry: Inquiry, data: &[u8]) -> BusError {
    BusError::Protocol(format!(
        "{inquiry:?} reply carries {} data bytes",
        data.len()
    ))
}

/// Decoded answer to an [`Inquiry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InquiryValue {
    Power(PowerState),
    ZoomPosition(u16),
    Version(Vec<u8>),
    CameraId(u16),
    VideoSystem(VideoSystem),
    PanTiltPosition { pan: i16, tilt: i16 },
}

impl fmt::Display for InquiryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InquiryValue::Power(state) => write!(f, "{state}"),
            InquiryValue::ZoomPosition(position) => write!(f, "{position}"),
            InquiryValue::Version(raw) => {
                for (i, byte) in raw.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            InquiryValue::CameraId(id) => write!(f, "{id}"),
            InquiryValue::VideoSystem(system) => write!(f, "{system}"),
            InquiryValue::PanTiltPosition { pan, tilt } => write!(f, "pan={pan} tilt={tilt}"),
        }
    }
}

/// Camera power as reported by the power inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
    /// Power supply fault.
    Error,
    Unknown(u8),
}

impl PowerState {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x02 => PowerState::On,
            0x03 => PowerState::Off,
            0x04 => PowerState::Error,
            other => PowerState::Unknown(other),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => f.write_str("on"),
            PowerState::Off => f.write_str("off"),
            PowerState::Error => f.write_str("error"),
            PowerState::Unknown(byte) => write!(f, "unknown (0x{byte:x})"),
        }
    }
}

/// Video output format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSystem(pub u8);

impl VideoSystem {
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "1920x1080p60",
            1 => "1920x1080p30",
            2 => "1920x1080i60",
            3 => "1280x720p60",
            4 => "1280x720p30",
            5 => "640x480p60",
            8 => "1920x1080p50",
            9 => "1920x1080p25",
            10 => "1920x1080i50",
            11 => "1280x720p50",
            12 => "1280x720p25",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for VideoSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown (0x{:x})", self.0),
        }
    }
}

impl<T: BusTransport> BusController<T> {
    /// Send a feature command and return the immediate reply (normally an ACK).
    pub fn command(&self, device: DeviceAddress, command: &CameraCommand) -> Result<ParsedReply> {
        let payload = command.payload()?;
        debug!(%device, ?command, "command");
        self.exchange(device.into(), &payload)
    }

    /// Send a feature command and wait for it to finish.
    ///
    /// Waits at most [`BusConfig::completion_timeout`](crate::BusConfig).
    pub fn execute(&self, device: DeviceAddress, command: &CameraCommand) -> Result<()> {
        self.execute_within(device, command, self.config().completion_timeout)
    }

    /// [`execute`](Self::execute) with an explicit completion timeout.
    pub fn execute_within(
        &self,
        device: DeviceAddress,
        command: &CameraCommand,
        timeout: Duration,
    ) -> Result<()> {
        let reply = self.command(device, command)?;
        match reply.message_type {
            MessageType::Ack => self.wait_for_completion(&reply, timeout),
            MessageType::Completion => Ok(()),
            _ => Err(BusError::Protocol(format!(
                "unexpected reply to command: {reply}"
            ))),
        }
    }

    /// Run an inquiry and decode its answer.
    pub fn inquire(&self, device: DeviceAddress, inquiry: Inquiry) -> Result<InquiryValue> {
        let reply = self.exchange(device.into(), &inquiry.payload())?;
        if reply.message_type != MessageType::Completion || reply.socket != 0 {
            return Err(BusError::Protocol(format!(
                "unexpected reply to {inquiry:?} inquiry: {reply}"
            )));
        }
        let value = inquiry.decode(reply.data())?;
        debug!(%device, ?inquiry, %value, "inquiry answered");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use visca_transport::ScriptedTransport;

    use crate::config::BusConfig;

    use super::*;

    fn controller(bus: &ScriptedTransport) -> BusController<ScriptedTransport> {
        BusController::with_config(
            bus.clone(),
            BusConfig {
                read_timeout: Duration::from_millis(30),
                completion_timeout: Duration::from_millis(200),
                ..BusConfig::default()
            },
        )
    }

    fn cam(id: u8) -> DeviceAddress {
        DeviceAddress::new(id).unwrap()
    }

    #[test]
    fn camera_payloads() {
        let cases: &[(CameraCommand, &[u8])] = &[
            (CameraCommand::Power(true), &[0x01, 0x04, 0x00, 0x02]),
            (CameraCommand::Power(false), &[0x01, 0x04, 0x00, 0x03]),
            (
                CameraCommand::AutoPowerOff(0x1234),
                &[0x01, 0x04, 0x40, 0x01, 0x02, 0x03, 0x04],
            ),
            (CameraCommand::ZoomStop, &[0x01, 0x04, 0x07, 0x00]),
            (CameraCommand::ZoomTeleSpeed(5), &[0x01, 0x04, 0x07, 0x25]),
            (CameraCommand::ZoomWideSpeed(0), &[0x01, 0x04, 0x07, 0x30]),
            (
                CameraCommand::ZoomDirect(4000),
                &[0x01, 0x04, 0x47, 0x00, 0x0F, 0x0A, 0x00],
            ),
            (CameraCommand::DigitalZoom(false), &[0x01, 0x04, 0x06, 0x03]),
            (
                CameraCommand::WideMode(WideMode::Cinema),
                &[0x01, 0x04, 0x60, 0x01],
            ),
            (CameraCommand::Mirror(true), &[0x01, 0x04, 0x61, 0x02]),
            (
                CameraCommand::PictureEffect(PictureEffect::Stretch),
                &[0x01, 0x04, 0x63, 0x08],
            ),
            (
                CameraCommand::DigitalEffect(DigitalEffect::Trail),
                &[0x01, 0x04, 0x64, 0x04],
            ),
            (
                CameraCommand::Memory(MemoryAction::Recall, 3),
                &[0x01, 0x04, 0x3F, 0x02, 0x03],
            ),
        ];
        for (command, expected) in cases {
            assert_eq!(command.payload().unwrap(), *expected, "{command:?}");
        }
    }

    #[test]
    fn pan_tilt_payloads() {
        assert_eq!(
            CameraCommand::drive(Direction::UpLeft).payload().unwrap(),
            vec![0x01, 0x06, 0x01, 0x18, 0x14, 0x01, 0x01]
        );
        assert_eq!(
            CameraCommand::drive(Direction::Stop).payload().unwrap(),
            vec![0x01, 0x06, 0x01, 0x18, 0x14, 0x03, 0x03]
        );
        assert_eq!(
            CameraCommand::PanTiltAbsolute {
                pan_speed: 0x18,
                tilt_speed: 0x14,
                pan: -1,
                tilt: 360,
            }
            .payload()
            .unwrap(),
            vec![
                0x01, 0x06, 0x02, 0x18, 0x14, 0x00, 0x0F, 0x0F, 0x0F, 0x00, 0x01, 0x06, 0x08
            ]
        );
        assert_eq!(
            CameraCommand::Datascreen(DatascreenMode::Toggle)
                .payload()
                .unwrap(),
            vec![0x01, 0x06, 0x06, 0x10]
        );
        assert_eq!(
            CameraCommand::PanTiltHome.payload().unwrap(),
            vec![0x01, 0x06, 0x04]
        );
    }

    #[test]
    fn out_of_range_arguments() {
        let bad = [
            CameraCommand::ZoomTeleSpeed(8),
            CameraCommand::DigitalEffectLevel(0x40),
            CameraCommand::Memory(MemoryAction::Set, 6),
            CameraCommand::PanTiltDrive {
                direction: Direction::Left,
                pan_speed: 0x19,
                tilt_speed: 0,
            },
            CameraCommand::PanTiltAbsolute {
                pan_speed: 1,
                tilt_speed: 1,
                pan: 1441,
                tilt: 0,
            },
            CameraCommand::PanTiltAbsolute {
                pan_speed: 1,
                tilt_speed: 1,
                pan: 0,
                tilt: -361,
            },
        ];
        for command in bad {
            assert!(
                matches!(command.payload(), Err(BusError::InvalidArgument(_))),
                "{command:?}"
            );
        }
    }

    #[test]
    fn invalid_command_is_never_sent() {
        let bus = ScriptedTransport::new();
        let ctl = controller(&bus);
        let err = ctl
            .command(cam(1), &CameraCommand::Memory(MemoryAction::Set, 9))
            .unwrap_err();
        assert!(matches!(err, BusError::InvalidArgument(_)));
        assert!(bus.written().is_empty());
    }

    #[test]
    fn execute_waits_for_completion() {
        let bus = ScriptedTransport::new();
        bus.push_reply(&[0xA0, 0x41, 0xFF, 0xA0, 0x51, 0xFF]);
        let ctl = controller(&bus);

        ctl.execute(cam(2), &CameraCommand::PanTiltHome).unwrap();
        assert_eq!(bus.written(), vec![vec![0x82, 0x01, 0x06, 0x04, 0xFF]]);
        assert_eq!(ctl.socket_status(2, 1), None);
    }

    #[test]
    fn execute_times_out_without_completion() {
        let bus = ScriptedTransport::new();
        bus.push_reply(&[0x90, 0x41, 0xFF]);
        let ctl = controller(&bus);

        let err = ctl.execute(cam(1), &CameraCommand::ZoomTele).unwrap_err();
        assert!(matches!(err, BusError::Timeout(_)));
    }

    #[test]
    fn inquire_power() {
        let bus = ScriptedTransport::new();
        bus.push_reply(&[0x90, 0x50, 0x02, 0xFF]);
        let ctl = controller(&bus);

        let value = ctl.inquire(cam(1), Inquiry::Power).unwrap();
        assert_eq!(value, InquiryValue::Power(PowerState::On));
        assert_eq!(bus.written(), vec![vec![0x81, 0x09, 0x04, 0x00, 0xFF]]);
    }

    #[test]
    fn inquire_pan_tilt_position() {
        let bus = ScriptedTransport::new();
        bus.push_reply(&[
            0x90, 0x50, 0x0F, 0x0A, 0x06, 0x00, 0x00, 0x01, 0x06, 0x08, 0xFF,
        ]);
        let ctl = controller(&bus);

        let value = ctl.inquire(cam(1), Inquiry::PanTiltPosition).unwrap();
        assert_eq!(
            value,
            InquiryValue::PanTiltPosition {
                pan: -1440,
                tilt: 360
            }
        );
    }

    #[test]
    fn inquire_video_system_and_version() {
        let bus = ScriptedTransport::new();
        bus.push_reply(&[0x90, 0x50, 0x08, 0xFF]);
        bus.push_reply(&[0x90, 0x50, 0x00, 0x20, 0x04, 0x0A, 0x02, 0xFF]);
        let ctl = controller(&bus);

        let value = ctl.inquire(cam(1), Inquiry::VideoSystem).unwrap();
        assert_eq!(value.to_string(), "1920x1080p50");

        let value = ctl.inquire(cam(1), Inquiry::Version).unwrap();
        assert_eq!(value.to_string(), "00 20 04 0a 02");
    }

    #[test]
    fn inquiry_with_wrong_shape() {
        let bus = ScriptedTransport::new();
        bus.push_reply(&[0x90, 0x50, 0x02, 0x03, 0xFF]);
        bus.push_reply(&[0x90, 0x41, 0xFF]);
        let ctl = controller(&bus);

        assert!(matches!(
            ctl.inquire(cam(1), Inquiry::Power),
            Err(BusError::Protocol(_))
        ));
        assert!(matches!(
            ctl.inquire(cam(1), Inquiry::CameraId),
            Err(BusError::Protocol(_))
        ));
    }

    #[test]
    fn display_names() {
        assert_eq!(PowerState::from_byte(4).to_string(), "error");
        assert_eq!(PowerState::from_byte(9).to_string(), "unknown (0x9)");
        assert_eq!(VideoSystem(6).to_string(), "unknown (0x6)");
        assert_eq!(VideoSystem(3).name(), Some("1280x720p60"));
    }
}
