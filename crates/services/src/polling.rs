//! Download-progress polling timer.
//!
//! The controller owns at most one periodic task. The task does no I/O of
//! its own: every period it posts a tick event into the owner's channel, and
//! the owner turns each tick into exactly one fetch.

use shared::modules::RegistrySnapshot;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub struct PollingController<E> {
    period: Duration,
    ticks: UnboundedSender<E>,
    make_tick: fn() -> E,
    timer: Option<JoinHandle<()>>,
}

impl<E: Send + 'static> PollingController<E> {
    pub fn new(period: Duration, ticks: UnboundedSender<E>, make_tick: fn() -> E) -> Self {
        Self {
            period,
            ticks,
            make_tick,
            timer: None,
        }
    }

    /// Start or stop the timer so it runs iff some module is downloading.
    pub fn on_snapshot_updated(&mut self, snapshot: &RegistrySnapshot) {
        let needed = snapshot.any_downloading();
        match (needed, self.timer.is_some()) {
            (true, false) => self.start(),
            (false, true) => {
                tracing::info!("no active downloads, stopping poll");
                self.stop();
            }
            _ => {}
        }
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Cancel the timer, if any. Fetches already issued are not affected.
    pub fn dispose(&mut self) {
        self.stop();
    }

    fn start(&mut self) {
        tracing::info!(period_ms = self.period.as_millis() as u64, "starting download poll");
        let period = self.period;
        let ticks = self.ticks.clone();
        let make_tick = self.make_tick;

        self.timer = Some(tokio::spawn(async move {
            // First tick one full period from now, like a browser interval.
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(make_tick()).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<E> Drop for PollingController<E> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
