use visca_bus::BusConfig;

use crate::cmd::BusOptions;
use crate::exit::{bus_error, CliResult, SUCCESS};

pub fn run(bus: &BusOptions) -> CliResult<i32> {
    let controller = bus.open(BusConfig::default())?;
    controller
        .clear_all_interfaces()
        .map_err(|err| bus_error("interface clear failed", err))?;
    tracing::info!("all interfaces cleared");
    Ok(SUCCESS)
}
