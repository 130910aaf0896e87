use visca_bus::BusConfig;

use crate::cmd::{BusOptions, EnumerateArgs};
use crate::exit::{bus_error, CliResult, SUCCESS};
use crate::output::{print_enumeration, OutputFormat};

pub fn run(args: EnumerateArgs, bus: &BusOptions, format: OutputFormat) -> CliResult<i32> {
    let controller = bus.open(BusConfig {
        first_address: args.first_address,
        ..BusConfig::default()
    })?;
    let count = controller
        .enumerate_bus()
        .map_err(|err| bus_error("enumeration failed", err))?;

    print_enumeration(count, args.first_address, format);
    Ok(SUCCESS)
}
