use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("visca {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: visca");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("VISCA_BUILD_TARGET").unwrap_or(std::env::consts::ARCH)
    );
    println!(
        "profile: {}",
        option_env!("VISCA_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "serial: baud={} framing=8N1",
        visca_transport::SerialConfig::DEFAULT_BAUD_RATE
    );

    Ok(SUCCESS)
}
