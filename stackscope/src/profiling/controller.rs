//! # Profiler Controller
//!
//! Owns the two periodic tasks and the state they share.
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!  sampling task ───►│ Sampler (Arc<Mutex>)         │──► CpuSnapshot ──┐
//!                    └──────────────────────────────┘                  │
//!                    ┌──────────────────────────────┐                  ▼
//!  refresh task  ───►│ ThreadMonitor (Arc<Mutex>)   │──► ThreadSnapshot ──► sinks
//!                    └──────────────────────────────┘
//! ```
//!
//! Both tasks query the same [`ProcessIntrospector`]. A task whose tick fails
//! stops itself and reports on [`Profiler::faults`]; resuming is explicit.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::info;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::introspection::ProcessIntrospector;
use super::periodic::{PeriodicTask, TaskFault};
use super::publish::{PublicationSink, SnapshotStore};
use super::sampler::Sampler;
use super::thread_refresh::ThreadMonitor;
use crate::analysis::CpuSnapshot;
use crate::classification::ProfiledPackages;
use crate::config::{ProfilerConfig, SharedConfig};
use crate::domain::{IntrospectionError, ProfilerError};
use crate::thread_data::ThreadSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerState {
    /// Connected, not sampling
    Ready,
    /// Sampling task alive
    Running,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a tick needs, cloned into each task thread.
#[derive(Clone)]
struct Engine {
    introspector: Arc<dyn ProcessIntrospector>,
    config: SharedConfig,
    sampler: Arc<Mutex<Sampler>>,
    monitor: Arc<Mutex<ThreadMonitor>>,
    sinks: Arc<[Arc<dyn PublicationSink>]>,
}

impl Engine {
    fn sample_tick(&self) -> Result<Arc<CpuSnapshot>, IntrospectionError> {
        if !self.introspector.is_reachable() {
            return Err(IntrospectionError::Unreachable("process did not respond".into()));
        }
        let now = Instant::now();
        let dumps = self.introspector.thread_dumps()?;
        let config = self.config.snapshot();

        // Publish before releasing the sampler so snapshots leave in version order
        let mut sampler = lock(&self.sampler);
        let snapshot = Arc::new(sampler.sample(&dumps, &config, now));
        self.publish_profile(&snapshot);
        drop(sampler);
        Ok(snapshot)
    }

    fn refresh_tick(&self) -> Result<Arc<ThreadSnapshot>, IntrospectionError> {
        let config = self.config.snapshot();
        let mut monitor = lock(&self.monitor);
        let snapshot =
            Arc::new(monitor.refresh(self.introspector.as_ref(), &config, Instant::now())?);
        self.publish_threads(&snapshot);
        drop(monitor);
        Ok(snapshot)
    }

    fn publish_profile(&self, snapshot: &Arc<CpuSnapshot>) {
        for sink in self.sinks.iter() {
            sink.publish_profile(Arc::clone(snapshot));
        }
    }

    fn publish_threads(&self, snapshot: &Arc<ThreadSnapshot>) {
        for sink in self.sinks.iter() {
            sink.publish_threads(Arc::clone(snapshot));
        }
    }
}

pub struct Profiler {
    engine: Engine,
    store: Arc<SnapshotStore>,
    sampling_task: Mutex<Option<PeriodicTask>>,
    refresh_task: Mutex<Option<PeriodicTask>>,
    fault_tx: Sender<TaskFault>,
    fault_rx: Receiver<TaskFault>,
}

impl Profiler {
    #[must_use]
    pub fn new(introspector: Arc<dyn ProcessIntrospector>, config: ProfilerConfig) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let sinks: Vec<Arc<dyn PublicationSink>> = vec![Arc::clone(&store) as Arc<dyn PublicationSink>];
        let (fault_tx, fault_rx) = unbounded();
        Self {
            engine: Engine {
                introspector,
                config: SharedConfig::new(config),
                sampler: Arc::new(Mutex::new(Sampler::new())),
                monitor: Arc::new(Mutex::new(ThreadMonitor::new())),
                sinks: sinks.into(),
            },
            store,
            sampling_task: Mutex::new(None),
            refresh_task: Mutex::new(None),
            fault_tx,
            fault_rx,
        }
    }

    /// Also publish to `sink`. Applies to tasks started afterwards.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn PublicationSink>) -> Self {
        let mut sinks = self.engine.sinks.to_vec();
        sinks.push(sink);
        self.engine.sinks = sinks.into();
        self
    }

    /// Start sampling at the configured period, restarting it if running.
    ///
    /// # Errors
    /// Returns an error if the period is zero or the task thread cannot start
    pub fn resume_sampling(&self) -> Result<(), ProfilerError> {
        let period_ms = self.engine.config.snapshot().sampling_period_ms;
        if period_ms == 0 {
            return Err(ProfilerError::InvalidSamplingPeriod(period_ms));
        }

        let mut slot = lock(&self.sampling_task);
        if let Some(mut task) = slot.take() {
            task.stop();
        }
        let engine = self.engine.clone();
        let task = PeriodicTask::start(
            "sampling",
            std::time::Duration::from_millis(period_ms),
            self.fault_tx.clone(),
            move || engine.sample_tick().map(drop),
        )?;
        *slot = Some(task);
        Ok(())
    }

    /// Stop sampling. The model is kept.
    pub fn suspend_sampling(&self) {
        if let Some(mut task) = lock(&self.sampling_task).take() {
            task.stop();
        }
    }

    #[must_use]
    pub fn state(&self) -> ProfilerState {
        match lock(&self.sampling_task).as_ref() {
            Some(task) if task.is_running() => ProfilerState::Running,
            _ => ProfilerState::Ready,
        }
    }

    /// Change the sampling period; a running sampler is re-armed with it.
    ///
    /// # Errors
    /// Returns an error if `period_ms` is zero or re-arming fails
    pub fn set_sampling_period(&self, period_ms: u64) -> Result<(), ProfilerError> {
        if period_ms == 0 {
            return Err(ProfilerError::InvalidSamplingPeriod(period_ms));
        }
        self.engine.config.update(|config| config.sampling_period_ms = period_ms);
        info!("Sampling period set to {period_ms}ms");

        if self.state() == ProfilerState::Running {
            self.resume_sampling()?;
        }
        Ok(())
    }

    /// Replace the profiled package set; applies from the next tick.
    pub fn set_profiled_packages(&self, packages: ProfiledPackages) {
        self.engine.config.update(|config| config.profiled_packages = packages);
    }

    /// Start the thread/dependency refresh, restarting it if running.
    ///
    /// # Errors
    /// Returns an error if the period is zero or the task thread cannot start
    pub fn start_refresh(&self) -> Result<(), ProfilerError> {
        let config = self.engine.config.snapshot();
        if config.refresh_period_ms == 0 {
            return Err(ProfilerError::InvalidRefreshPeriod(config.refresh_period_ms));
        }

        let mut slot = lock(&self.refresh_task);
        if let Some(mut task) = slot.take() {
            task.stop();
        }
        let engine = self.engine.clone();
        let task = PeriodicTask::start(
            "refresh",
            config.refresh_period(),
            self.fault_tx.clone(),
            move || engine.refresh_tick().map(drop),
        )?;
        *slot = Some(task);
        Ok(())
    }

    pub fn stop_refresh(&self) {
        if let Some(mut task) = lock(&self.refresh_task).take() {
            task.stop();
        }
    }

    /// Run one sampling tick on the calling thread.
    ///
    /// # Errors
    /// Returns an error if the process is unreachable or stacks cannot be read
    pub fn sample_now(&self) -> Result<Arc<CpuSnapshot>, ProfilerError> {
        Ok(self.engine.sample_tick()?)
    }

    /// Run one thread refresh on the calling thread.
    ///
    /// # Errors
    /// Returns an error if the process is unreachable or threads cannot be read
    pub fn refresh_now(&self) -> Result<Arc<ThreadSnapshot>, ProfilerError> {
        Ok(self.engine.refresh_tick()?)
    }

    /// Empty both models and publish the empty snapshot.
    pub fn clear_profile(&self) {
        let mut sampler = lock(&self.engine.sampler);
        let snapshot = Arc::new(sampler.clear_model());
        self.engine.publish_profile(&snapshot);
        drop(sampler);
        info!("Profile cleared");
    }

    /// Stop both tasks and drop all per-connection state.
    pub fn disconnect(&self) {
        self.suspend_sampling();
        self.stop_refresh();

        let mut sampler = lock(&self.engine.sampler);
        self.engine.publish_profile(&Arc::new(sampler.reset()));
        drop(sampler);

        let mut monitor = lock(&self.engine.monitor);
        self.engine.publish_threads(&Arc::new(monitor.reset()));
        drop(monitor);
        info!("Disconnected, profiler state reset");
    }

    /// Latest published CPU model.
    #[must_use]
    pub fn profile(&self) -> Arc<CpuSnapshot> {
        self.store.profile()
    }

    /// Latest published thread view.
    #[must_use]
    pub fn threads(&self) -> Arc<ThreadSnapshot> {
        self.store.threads()
    }

    /// Faults of tasks that stopped themselves.
    #[must_use]
    pub fn faults(&self) -> &Receiver<TaskFault> {
        &self.fault_rx
    }

    #[must_use]
    pub fn config(&self) -> &SharedConfig {
        &self.engine.config
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        self.suspend_sampling();
        self.stop_refresh();
    }
}
