//! Mechanical bell driven through an H-bridge
//!
//! The hammer strikes by alternating the two bridge inputs once per stroke.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::lines::{LineError, SysfsPin};
use crate::config::HardwareConfig;

/// Actuator that rings the phone's bell. Blocks for the ring duration.
pub trait Bell: Send + Sync {
    fn ring(&self, duration: Duration) -> Result<(), LineError>;
}

/// Bell wired to two GPIO outputs
pub struct GpioBell {
    pins: Mutex<[SysfsPin; 2]>,
    stroke: Duration,
}

impl GpioBell {
    pub fn open(config: &HardwareConfig) -> Result<Self, LineError> {
        let [a, b] = config.bell_pins;
        Ok(Self {
            pins: Mutex::new([
                SysfsPin::output(&config.gpio_root, a)?,
                SysfsPin::output(&config.gpio_root, b)?,
            ]),
            stroke: config.bell_stroke(),
        })
    }
}

impl Bell for GpioBell {
    fn ring(&self, duration: Duration) -> Result<(), LineError> {
        info!(duration_ms = duration.as_millis() as u64, "ringing bell");
        let mut pins = self.pins.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let [strike, release] = &mut *pins;

        let deadline = Instant::now() + duration;
        let mut result = Ok(());
        while Instant::now() < deadline {
            if let Err(e) = stroke(strike, release, self.stroke) {
                result = Err(e);
                break;
            }
        }

        // Always leave the coil unpowered
        let silence = strike.write(false).and_then(|_| release.write(false));
        if let Err(e) = &silence {
            warn!(?e, "failed to silence bell");
        }
        info!("bell silent");
        result.and(silence)
    }
}

/// One strike and return of the hammer
fn stroke(strike: &mut SysfsPin, release: &mut SysfsPin, pause: Duration) -> Result<(), LineError> {
    strike.write(true)?;
    release.write(false)?;
    thread::sleep(pause);
    strike.write(false)?;
    release.write(true)?;
    thread::sleep(pause);
    Ok(())
}

/// Stand-in used when the bell outputs cannot be opened
pub struct SilentBell;

impl Bell for SilentBell {
    fn ring(&self, duration: Duration) -> Result<(), LineError> {
        info!(duration_ms = duration.as_millis() as u64, "bell unavailable, ring skipped");
        Ok(())
    }
}
