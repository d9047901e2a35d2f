//! Signal sampler running on a dedicated thread
//!
//! Polls the hook and dial lines at a fixed cadence, runs the decoding
//! pipeline and hands events to the dispatcher. Never touches async I/O and
//! never waits on the session controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::lines::SignalLines;
use crate::config::{HardwareConfig, TimingConfig};
use crate::decoder::{DialPipeline, SharedHook};
use crate::events::Dispatcher;

/// Errors that can occur when starting the sampler
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("sampler is already running")]
    AlreadyRunning,

    #[error("failed to spawn sampler thread: {0}")]
    ThreadSpawn(String),
}

/// Owns the polling thread
pub struct Sampler {
    hardware: HardwareConfig,
    timing: TimingConfig,
    hook: SharedHook,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Sampler {
    pub fn new(hardware: HardwareConfig, timing: TimingConfig, hook: SharedHook) -> Self {
        Self {
            hardware,
            timing,
            hook,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Spawn the sampling thread over `lines`, publishing into `dispatcher`
    pub fn start<L>(&mut self, lines: L, dispatcher: Dispatcher) -> Result<(), SamplerError>
    where
        L: SignalLines + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SamplerError::AlreadyRunning);
        }

        let ctx = SampleLoop {
            hardware: self.hardware.clone(),
            timing: self.timing.clone(),
            hook: self.hook.clone(),
            running: Arc::clone(&self.running),
        };

        let handle = thread::Builder::new()
            .name("signal-sampler".to_string())
            .spawn(move || {
                info!("sampler thread started");
                let running = Arc::clone(&ctx.running);
                ctx.run(lines, dispatcher);
                running.store(false, Ordering::SeqCst);
                info!("sampler thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SamplerError::ThreadSpawn(e.to_string())
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Ask the thread to exit and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("sampler thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct SampleLoop {
    hardware: HardwareConfig,
    timing: TimingConfig,
    hook: SharedHook,
    running: Arc<AtomicBool>,
}

impl SampleLoop {
    fn run<L: SignalLines>(self, mut lines: L, dispatcher: Dispatcher) {
        let interval = self.timing.sample_interval();
        let mut failures: u64 = 0;
        let mut pipeline: Option<DialPipeline> = None;

        while self.running.load(Ordering::SeqCst) {
            match lines.sample() {
                Ok(sample) => {
                    if failures > 0 {
                        info!(failures, "line reads recovered");
                        failures = 0;
                    }
                    let now = Instant::now();
                    match pipeline.as_mut() {
                        Some(pipeline) => {
                            for event in pipeline.tick(now, sample) {
                                dispatcher.publish(event);
                            }
                        }
                        None => {
                            let seeded = DialPipeline::new(
                                self.hook.clone(),
                                sample,
                                now,
                                &self.hardware,
                                &self.timing,
                            );
                            info!(hook = %seeded.hook_state(), "decoder seeded");
                            pipeline = Some(seeded);
                        }
                    }
                }
                Err(e) => {
                    // Only this tick is lost
                    failures += 1;
                    if failures == 1 {
                        warn!(error = %e, "line read failed, retrying");
                    } else {
                        debug!(error = %e, failures, "line read failed");
                    }
                }
            }

            if dispatcher.is_closed() {
                info!("dispatcher closed, sampler exiting");
                break;
            }
            thread::sleep(interval);
        }
    }
}
