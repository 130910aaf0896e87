use tracing::debug;
use visca_bus::BusConfig;
use visca_frame::{MessageType, Recipient, MAX_PAYLOAD};

use crate::cmd::{device_address, parse_duration, BusOptions, SendArgs};
use crate::exit::{bus_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: SendArgs, bus: &BusOptions, format: OutputFormat) -> CliResult<i32> {
    let payload = parse_hex(&args.hex)?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let recipient = match args.device {
        Some(id) if !args.broadcast => Recipient::Device(device_address(id)?),
        _ => Recipient::Broadcast,
    };

    let controller = bus.open(BusConfig::default())?;
    let reply = controller
        .exchange(recipient, &payload)
        .map_err(|err| bus_error("exchange failed", err))?;

    let completed = if args.wait && reply.message_type == MessageType::Ack {
        debug!(socket = reply.socket, "waiting for completion");
        controller
            .wait_for_completion(&reply, wait_timeout)
            .map_err(|err| bus_error("completion failed", err))?;
        Some(true)
    } else {
        None
    };

    print_reply(&reply, completed, format);
    Ok(SUCCESS)
}

/// Parse message bytes written as hex pairs.
///
/// Pairs may be separated by whitespace, commas or colons and may carry a
/// `0x` prefix, so `"01 04 00 02"`, `"0x01,0x04"` and `"01040002"` all work.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let mut bytes = Vec::new();
    for token in input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .filter(|t| !t.is_empty())
    {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if token.len() % 2 != 0 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CliError::new(USAGE, format!("invalid hex bytes: {token:?}")));
        }
        for pair in token.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex bytes: {token:?}")))?;
            let byte = u8::from_str_radix(pair, 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex bytes: {token:?}")))?;
            bytes.push(byte);
        }
    }

    if bytes.is_empty() {
        return Err(CliError::new(USAGE, "--hex must contain at least one byte"));
    }
    if bytes.len() > MAX_PAYLOAD {
        return Err(CliError::new(
            USAGE,
            format!("--hex has {} bytes, max {MAX_PAYLOAD}", bytes.len()),
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_accepts_common_spellings() {
        let expected = vec![0x01, 0x04, 0x00, 0x02];
        assert_eq!(parse_hex("01 04 00 02").unwrap(), expected);
        assert_eq!(parse_hex("0x01,0x04,0x00,0x02").unwrap(), expected);
        assert_eq!(parse_hex("01040002").unwrap(), expected);
        assert_eq!(parse_hex("01:04:00:02").unwrap(), expected);
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        for bad in ["", "  ", "0", "zz", "01 0g", "010"] {
            assert_eq!(parse_hex(bad).unwrap_err().code, USAGE, "{bad:?}");
        }
    }

    #[test]
    fn parse_hex_rejects_oversized_messages() {
        let fifteen = vec!["01"; 15].join(" ");
        assert!(parse_hex(&fifteen).is_err());
        let fourteen = vec!["01"; 14].join(" ");
        assert_eq!(parse_hex(&fourteen).unwrap().len(), 14);
    }
}
