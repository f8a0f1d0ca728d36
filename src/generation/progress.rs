use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;

const MIN_TICK: Duration = Duration::from_millis(1);

/// Locally simulated progress shown while a job is running
///
/// The value has no relation to real backend progress. It grows by a random
/// amount per tick, never decreases, and stays at or below `cap` until
/// [`complete`](Self::complete) sets it to 100.
#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    value: f64,
    cap: f64,
    max_increment: f64,
}

impl ProgressSimulator {
    pub fn new(cap: f64, max_increment: f64) -> Self {
        Self {
            value: 0.0,
            cap: cap.clamp(0.0, 100.0),
            max_increment: max_increment.max(0.0),
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.progress_cap, config.progress_max_increment)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Advance one tick
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if self.value >= self.cap {
            return self.value;
        }
        if self.max_increment > 0.0 {
            let step = rng.gen_range(0.0..self.max_increment);
            self.value = (self.value + step).min(self.cap);
        }
        self.value
    }

    /// Real completion was observed
    pub fn complete(&mut self) -> f64 {
        self.value = 100.0;
        self.value
    }
}

/// Run the simulator on a fixed period, publishing each value
///
/// The first tick fires one period after start; a zero period is treated as
/// one millisecond. The task ends when `cancel` fires or every receiver is
/// gone, and hands the simulator and sender back so the owner can publish
/// the final value.
pub fn spawn_progress(
    mut simulator: ProgressSimulator,
    period: Duration,
    progress: watch::Sender<f64>,
    cancel: CancellationToken,
) -> JoinHandle<(ProgressSimulator, watch::Sender<f64>)> {
    let period = period.max(MIN_TICK);

    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if progress.is_closed() {
                        break;
                    }
                    progress.send_replace(simulator.tick(&mut rng));
                }
            }
        }
        (simulator, progress)
    })
}
