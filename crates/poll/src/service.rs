//! Timer loop that runs the reporter periodically.

use std::{sync::Arc, time::Duration};

use {
    compat_config::PollConfig,
    compat_state::SettingsUpdate,
    tokio::{
        sync::{Mutex, Notify, RwLock},
        task::JoinHandle,
        time::Instant,
    },
    tracing::{debug, error, info},
};

use crate::{ConfigureReport, Reporter, Result, RunOutcome};

/// Runs [`Reporter::check_and_vote`] after an initial delay and then on a
/// fixed interval. Runs never overlap: the job executes on the timer task
/// itself.
pub struct PollScheduler {
    reporter: Arc<Reporter>,
    initial_delay: Duration,
    interval: Duration,
    settings_change_delay: Duration,
    next_run: Mutex<Instant>,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    wake_notify: Arc<Notify>,
    running: RwLock<bool>,
    last_outcome: RwLock<Option<RunOutcome>>,
}

impl PollScheduler {
    pub fn new(reporter: Arc<Reporter>, config: &PollConfig) -> Arc<Self> {
        Self::with_timing(
            reporter,
            Duration::from_secs(config.initial_delay_secs),
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.settings_change_delay_secs),
        )
    }

    pub fn with_timing(
        reporter: Arc<Reporter>,
        initial_delay: Duration,
        interval: Duration,
        settings_change_delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            reporter,
            initial_delay,
            interval,
            settings_change_delay,
            next_run: Mutex::new(Instant::now() + initial_delay),
            timer_handle: Mutex::new(None),
            wake_notify: Arc::new(Notify::new()),
            running: RwLock::new(false),
            last_outcome: RwLock::new(None),
        })
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    /// Start the timer loop. The first run happens after the initial delay.
    pub async fn start(self: &Arc<Self>) {
        let mut handle = self.timer_handle.lock().await;
        if handle.is_some() {
            debug!("poll scheduler already started");
            return;
        }
        *self.next_run.lock().await = Instant::now() + self.initial_delay;
        *self.running.write().await = true;

        let svc = Arc::clone(self);
        *handle = Some(tokio::spawn(async move {
            svc.timer_loop().await;
        }));
        info!(
            initial_delay_secs = self.initial_delay.as_secs(),
            interval_secs = self.interval.as_secs(),
            "poll scheduler started"
        );
    }

    /// Stop the timer loop. A run in progress is aborted; its marker expires
    /// on its own.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.wake_notify.notify_one();

        let mut handle = self.timer_handle.lock().await;
        if let Some(h) = handle.take() {
            h.abort();
        }
        info!("poll scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run as soon as the loop is free.
    pub async fn trigger(&self) {
        self.schedule_in(Duration::ZERO).await;
    }

    /// Move the next run to `delay` from now.
    pub async fn schedule_in(&self, delay: Duration) {
        *self.next_run.lock().await = Instant::now() + delay;
        self.wake_notify.notify_one();
        debug!(delay_ms = delay.as_millis() as u64, "poll rescheduled");
    }

    /// Apply new settings and, when they warrant it, schedule a run shortly
    /// after.
    pub async fn configure(&self, update: SettingsUpdate) -> Result<ConfigureReport> {
        let report = self.reporter.configure(update).await?;
        if report.poll_requested {
            self.schedule_in(self.settings_change_delay).await;
        }
        Ok(report)
    }

    pub async fn last_outcome(&self) -> Option<RunOutcome> {
        *self.last_outcome.read().await
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: &Arc<Self>) {
        loop {
            if !*self.running.read().await {
                break;
            }

            let next_run = *self.next_run.lock().await;
            if next_run > Instant::now() {
                let notify = Arc::clone(&self.wake_notify);
                tokio::select! {
                    () = tokio::time::sleep_until(next_run) => {},
                    () = notify.notified() => {
                        debug!("poll loop woken by notify");
                        continue;
                    },
                }
            }

            if !*self.running.read().await {
                break;
            }

            *self.next_run.lock().await = Instant::now() + self.interval;
            self.run_once().await;
        }
    }

    async fn run_once(&self) {
        let started = Instant::now();
        match self.reporter.check_and_vote().await {
            Ok(outcome) => {
                debug!(
                    ?outcome,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "poll run done"
                );
                *self.last_outcome.write().await = Some(outcome);
            },
            Err(e) => error!(error = %e, "poll run failed"),
        }
    }
}
