use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use visca_bus::InquiryValue;
use visca_frame::{MessageType, ParsedReply};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput {
    sender: u8,
    broadcast: bool,
    message_type: String,
    socket: u8,
    data: String,
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
}

impl ReplyOutput {
    fn new(reply: &ParsedReply, completed: Option<bool>) -> Self {
        Self {
            sender: reply.sender,
            broadcast: reply.broadcast,
            message_type: message_type_name(reply.message_type),
            socket: reply.socket,
            data: hex(reply.data()),
            raw: hex(reply.as_bytes()),
            completed,
        }
    }
}

/// Print the reply to a single exchange. `completed` is set when the
/// caller waited for the command's completion.
pub fn print_reply(reply: &ParsedReply, completed: Option<bool>, format: OutputFormat) {
    let out = ReplyOutput::new(reply, completed);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SENDER", "TYPE", "SOCKET", "DATA", "COMPLETED"])
                .add_row(vec![
                    out.sender.to_string(),
                    out.message_type.clone(),
                    out.socket.to_string(),
                    out.data.clone(),
                    out.completed.map_or_else(|| "-".to_string(), |c| c.to_string()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{reply} type={}", out.message_type),
        OutputFormat::Raw => println!("{}", out.raw),
    }
}

#[derive(Serialize)]
struct EnumerateOutput {
    devices: u8,
    first_address: u8,
    last_address: u8,
}

pub fn print_enumeration(count: u8, first_address: u8, format: OutputFormat) {
    let out = EnumerateOutput {
        devices: count,
        first_address,
        last_address: first_address + count - 1,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICES", "ADDRESSES"])
                .add_row(vec![
                    out.devices.to_string(),
                    format!("{}-{}", out.first_address, out.last_address),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "{} device(s) at addresses {}-{}",
            out.devices, out.first_address, out.last_address
        ),
        OutputFormat::Raw => println!("{}", out.devices),
    }
}

#[derive(Serialize)]
struct InquiryOutput {
    device: u8,
    inquiry: &'static str,
    value: serde_json::Value,
    display: String,
}

pub fn print_inquiry(device: u8, inquiry: &'static str, value: &InquiryValue, format: OutputFormat) {
    let out = InquiryOutput {
        device,
        inquiry,
        value: inquiry_json(value),
        display: value.to_string(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "INQUIRY", "VALUE"])
                .add_row(vec![
                    out.device.to_string(),
                    out.inquiry.to_string(),
                    out.display.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("device {} {}: {}", device, inquiry, out.display),
        OutputFormat::Raw => println!("{}", out.display),
    }
}

fn inquiry_json(value: &InquiryValue) -> serde_json::Value {
    match value {
        InquiryValue::Power(state) => serde_json::json!(state.to_string()),
        InquiryValue::ZoomPosition(position) => serde_json::json!(position),
        InquiryValue::Version(raw) => serde_json::json!(hex(raw)),
        InquiryValue::CameraId(id) => serde_json::json!(id),
        InquiryValue::VideoSystem(system) => serde_json::json!({
            "code": system.0,
            "name": system.name(),
        }),
        InquiryValue::PanTiltPosition { pan, tilt } => serde_json::json!({
            "pan": pan,
            "tilt": tilt,
        }),
    }
}

fn print_json<T: Serialize>(out: &T) {
    println!(
        "{}",
        serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
    );
}

fn message_type_name(message_type: MessageType) -> String {
    match message_type {
        MessageType::Command => "command".to_string(),
        MessageType::Inquiry => "inquiry".to_string(),
        MessageType::Ack => "ack".to_string(),
        MessageType::Completion => "completion".to_string(),
        MessageType::Error => "error".to_string(),
        MessageType::Other(nibble) => format!("other({nibble:x})"),
    }
}

pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
