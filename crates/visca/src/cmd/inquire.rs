use visca_bus::BusConfig;

use crate::cmd::{device_address, BusOptions, InquireArgs};
use crate::exit::{bus_error, CliResult, SUCCESS};
use crate::output::{print_inquiry, OutputFormat};

pub fn run(args: InquireArgs, bus: &BusOptions, format: OutputFormat) -> CliResult<i32> {
    let device = device_address(args.device)?;
    let controller = bus.open(BusConfig::default())?;
    let value = controller
        .inquire(device, args.what.inquiry())
        .map_err(|err| bus_error("inquiry failed", err))?;

    print_inquiry(device.get(), args.what.name(), &value, format);
    Ok(SUCCESS)
}
