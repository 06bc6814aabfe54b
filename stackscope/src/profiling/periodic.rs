//! Fixed-period background tasks
//!
//! Each [`PeriodicTask`] owns one named OS thread that runs its job, then
//! waits for either the next tick or a stop signal. The first run happens
//! immediately after start.
//!
//! ```text
//! start ──► job() ──► select! { stop ──► exit
//!             ▲                 tick ──┐
//!             └────────────────────────┘
//! ```
//!
//! A failing job stops its own task and reports a [`TaskFault`] on the fault
//! channel; the owner decides what to do with it.

use crossbeam_channel::{bounded, select, tick, Sender, TryRecvError};
use log::{debug, error, info};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::domain::ProfilerError;

/// A job failure that stopped its periodic task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFault {
    pub task: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl PeriodicTask {
    /// Spawn the task thread and run `job` every `period`.
    ///
    /// # Errors
    /// Returns an error if the OS thread cannot be spawned
    pub fn start<F, E>(
        name: &'static str,
        period: Duration,
        faults: Sender<TaskFault>,
        mut job: F,
    ) -> Result<Self, ProfilerError>
    where
        F: FnMut() -> Result<(), E> + Send + 'static,
        E: Display,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name(format!("stackscope-{name}"))
            .spawn(move || {
                let ticker = tick(period);
                loop {
                    if matches!(stop_rx.try_recv(), Ok(()) | Err(TryRecvError::Disconnected)) {
                        break;
                    }

                    if let Err(e) = job() {
                        error!("{name} task failed, stopping: {e}");
                        flag.store(false, Ordering::SeqCst);
                        let _ = faults.try_send(TaskFault { task: name, message: e.to_string() });
                        return;
                    }

                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {}
                    }
                }
                flag.store(false, Ordering::SeqCst);
                debug!("{name} task exited");
            })
            .map_err(ProfilerError::TaskSpawnFailed)?;

        info!("Started {name} task every {}ms", period.as_millis());
        Ok(Self { name, period, stop_tx: Some(stop_tx), handle: Some(handle), running })
    }

    /// Cancel the task. Calling this more than once is harmless.
    ///
    /// Returns once a run in progress has finished; no run starts afterwards.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
            self.running.store(false, Ordering::SeqCst);
            if let Some(handle) = self.handle.take() {
                if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                    error!("{} task panicked", self.name);
                }
            }
            info!("Stopped {} task", self.name);
        }
    }

    /// False once stopped or after the job failed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
