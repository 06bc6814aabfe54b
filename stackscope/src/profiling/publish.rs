//! Publication of snapshots to readers
//!
//! Every tick produces a new immutable snapshot. Sinks receive it behind an
//! `Arc`; the previously published value is replaced, never mutated.

use crossbeam_channel::{Sender, TrySendError};
use log::debug;
use std::sync::{Arc, PoisonError, RwLock};

use crate::analysis::CpuSnapshot;
use crate::thread_data::ThreadSnapshot;

/// Receives snapshots after each sampling tick and each thread refresh.
pub trait PublicationSink: Send + Sync {
    fn publish_profile(&self, snapshot: Arc<CpuSnapshot>);

    fn publish_threads(&self, snapshot: Arc<ThreadSnapshot>);
}

/// Latest published snapshots, readable from any thread.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    profile: RwLock<Arc<CpuSnapshot>>,
    threads: RwLock<Arc<ThreadSnapshot>>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current CPU model snapshot.
    #[must_use]
    pub fn profile(&self) -> Arc<CpuSnapshot> {
        Arc::clone(&self.profile.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Current thread view.
    #[must_use]
    pub fn threads(&self) -> Arc<ThreadSnapshot> {
        Arc::clone(&self.threads.read().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Snapshots older than the stored one are dropped, so readers never go back.
impl PublicationSink for SnapshotStore {
    fn publish_profile(&self, snapshot: Arc<CpuSnapshot>) {
        let mut current = self.profile.write().unwrap_or_else(PoisonError::into_inner);
        if snapshot.version() < current.version() {
            debug!("Dropping stale profile v{} (have v{})", snapshot.version(), current.version());
            return;
        }
        *current = snapshot;
    }

    fn publish_threads(&self, snapshot: Arc<ThreadSnapshot>) {
        let mut current = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        if snapshot.version < current.version {
            debug!("Dropping stale thread view v{} (have v{})", snapshot.version, current.version);
            return;
        }
        *current = snapshot;
    }
}

#[derive(Debug, Clone)]
pub enum Publication {
    Profile(Arc<CpuSnapshot>),
    Threads(Arc<ThreadSnapshot>),
}

/// Forwards snapshots to a channel; drops them if the receiver lags behind.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Publication>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: Sender<Publication>) -> Self {
        Self { tx }
    }

    fn send(&self, publication: Publication) {
        match self.tx.try_send(publication) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Publication channel full, snapshot dropped"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl PublicationSink for ChannelSink {
    fn publish_profile(&self, snapshot: Arc<CpuSnapshot>) {
        self.send(Publication::Profile(snapshot));
    }

    fn publish_threads(&self, snapshot: Arc<ThreadSnapshot>) {
        self.send(Publication::Threads(snapshot));
    }
}
