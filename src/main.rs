//! rotary-radio-daemon: signal decoder and session controller for a
//! rotary-dial telephone kiosk
//!
//! The daemon:
//! - Samples the hook switch and pulse contact on a dedicated thread
//! - Decodes hook changes and dialed numbers with hardware debouncing
//! - Runs one interaction mode per dialed number, cancelled on hangup
//! - Rings the mechanical bell when a timer expires

mod config;
mod decoder;
mod events;
mod hardware;
mod lifecycle;
mod services;
mod session;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::decoder::{HookState, SharedHook};
use crate::hardware::{Bell, GpioBell, Sampler, SilentBell, SysfsLines};
use crate::lifecycle::ShutdownSignal;
use crate::services::{ConsoleSpeech, LogMusic, OfflineBrain, Services};
use crate::session::Controller;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "rotary-radio-daemon starting"
    );

    let config = Arc::new(Config::load()?);
    info!(
        gpio_root = %config.hardware.gpio_root.display(),
        hook_pin = config.hardware.hook_pin,
        dial_pin = config.hardware.dial_pin,
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();

    // Sampler -> controller
    let hook = SharedHook::new(HookState::Replaced);
    let (dispatcher, subscription) = events::channel(config.dial_queue);

    let bell: Arc<dyn Bell> = match GpioBell::open(&config.hardware) {
        Ok(bell) => Arc::new(bell),
        Err(e) => {
            warn!(error = %e, "bell outputs unavailable, timers will be silent");
            Arc::new(SilentBell)
        }
    };

    let services = Services {
        speech: Arc::new(ConsoleSpeech::stdin()),
        brain: Arc::new(OfflineBrain),
        music: Arc::new(LogMusic),
        bell,
    };

    let mut sampler = Sampler::new(config.hardware.clone(), config.timing.clone(), hook.clone());

    // Held only when the lines cannot be opened, so the controller keeps waiting
    let mut _parked = None;
    match SysfsLines::open(&config.hardware) {
        Ok(lines) => match sampler.start(lines, dispatcher) {
            Ok(()) => info!("signal sampler started"),
            Err(e) => error!(error = %e, "failed to start signal sampler"),
        },
        Err(e) => {
            error!(error = %e, "failed to open phone lines");
            warn!("continuing without phone lines - check GPIO permissions");
            _parked = Some(dispatcher);
        }
    }

    let mut controller = Controller::new(services, Arc::clone(&config), hook, subscription);

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = controller.run() => {
            info!("session controller exited");
        }

        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(error = %e, "failed to install signal handlers"),
            }
        }
    }

    info!("shutting down...");
    if sampler.is_running() {
        sampler.stop();
    }
    info!("rotary-radio-daemon stopped");

    Ok(())
}
