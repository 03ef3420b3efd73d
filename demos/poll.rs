//! Opens every supported HID controller and logs the events it produces.
//!
//! ```text
//! RUST_LOG=ginput=debug cargo run --example poll -- [config.toml]
//! ```
//!
//! The mouse/keyboard side is an empty virtual source; a config file must
//! select it with `mkb_source = "virtual"`. Only HID devices generate events. Stops after 30 seconds or when the last device is gone.

use ginput::backends::virtual_input::{VirtualJoysticks, VirtualMkb};
use ginput::hid::logitech::LogitechWheelDriver;
use ginput::hid::steam::SteamControllerDriver;
use ginput::hid::transport::HidapiTransport;
use ginput::{
    GinputConfig, HidInput, LocalReactor, LogCallback, Manager, SourceKind, SourceRegistry,
};
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ginput::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => GinputConfig::from_path(path)?,
        None => GinputConfig {
            mkb_source: SourceKind::Virtual,
            ..GinputConfig::default()
        },
    };

    let reactor = LocalReactor::new();
    let hid = HidInput::new()
        .with_transport(HidapiTransport::new(reactor.completions())?)
        .with_driver(SteamControllerDriver::new())
        .with_driver(LogitechWheelDriver::new());
    let sources = SourceRegistry::new()
        .with_mkb(VirtualMkb::new())
        .with_js(VirtualJoysticks::new());

    let mut manager = Manager::new(config, sources, hid)?;
    manager.init_configured(Box::new(reactor), Box::new(LogCallback::new()))?;

    let snapshot = manager.snapshot();
    println!("{}", snapshot.to_json()?);
    if snapshot.joysticks.is_empty() {
        info!("no supported HID controller found");
        return Ok(());
    }

    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(30) {
        if let Err(e) = manager.periodic_task() {
            error!(error = %e, "periodic task failed");
        }
        if manager.hid().open_count() == 0 {
            info!("all HID devices gone");
            break;
        }
        std::thread::sleep(Duration::from_millis(4));
    }
    manager.quit();
    Ok(())
}
