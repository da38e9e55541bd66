//! Activation lifecycle
//!
//! The helper is started on demand by the bus and leaves again once it has
//! been idle long enough. Only one privileged plymouth operation may run at
//! a time.

use crate::error::HelperError;
use crate::plymouth::{CommandRunner, Invocation};
use ptp_common::config::PlymouthConfig;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

const IDLE: u8 = 0;

/// What currently holds the operation slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationKind {
    Preview = 1,
    SetDefault = 2,
}

impl OperationKind {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(OperationKind::Preview),
            2 => Some(OperationKind::SetDefault),
            _ => None,
        }
    }
}

/// Exclusive slot for the plymouth operation in flight
#[derive(Debug, Default)]
pub struct OperationSlot {
    state: AtomicU8,
}

impl OperationSlot {
    pub fn try_acquire(self: &Arc<Self>, kind: OperationKind) -> Result<OperationGuard, HelperError> {
        self.state
            .compare_exchange(IDLE, kind as u8, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| HelperError::Busy)?;
        Ok(OperationGuard(Arc::clone(self)))
    }

    pub fn current(&self) -> Option<OperationKind> {
        OperationKind::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_busy(&self) -> bool {
        self.current().is_some()
    }
}

/// Releases the slot when dropped
#[derive(Debug)]
pub struct OperationGuard(Arc<OperationSlot>);

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.0.state.store(IDLE, Ordering::Release);
    }
}

/// Last time anything happened plus the method calls still being served,
/// shared between the interface and the watchdog
#[derive(Debug, Clone)]
pub struct Activity {
    tx: Arc<watch::Sender<Instant>>,
    calls: Arc<AtomicUsize>,
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Instant::now());
        Self {
            tx: Arc::new(tx),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn touch(&self) {
        self.tx.send_replace(Instant::now());
    }

    /// Mark a method call as in flight until the guard drops
    ///
    /// Calls can sit in a polkit password prompt for a long time; the
    /// helper must not exit under them.
    pub fn begin_call(&self) -> CallGuard {
        self.calls.fetch_add(1, Ordering::AcqRel);
        self.touch();
        CallGuard(self.clone())
    }

    pub fn calls_in_flight(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }

    fn subscribe(&self) -> watch::Receiver<Instant> {
        self.tx.subscribe()
    }
}

#[derive(Debug)]
pub struct CallGuard(Activity);

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.0.calls.fetch_sub(1, Ordering::AcqRel);
        self.0.touch();
    }
}

/// Resolve once `timeout` passes with no activity, no call in flight and
/// no operation running
pub async fn wait_for_idle(activity: Activity, slot: Arc<OperationSlot>, timeout: Duration) {
    let mut changes = activity.subscribe();

    loop {
        match tokio::time::timeout(timeout, changes.changed()).await {
            Ok(Ok(())) => continue,
            Ok(Err(_)) => return,
            Err(_) if slot.is_busy() || activity.calls_in_flight() > 0 => {
                tracing::debug!("Idle timeout reached while busy, waiting");
            }
            Err(_) => return,
        }
    }
}

/// Tell plymouthd to quit if a preview holds the slot at shutdown
///
/// Returns whether a quit was sent. A running set-default is left alone.
pub async fn stop_preview_on_exit(
    slot: &OperationSlot,
    config: &PlymouthConfig,
    runner: &dyn CommandRunner,
) -> bool {
    if slot.current() != Some(OperationKind::Preview) {
        return false;
    }

    tracing::info!("Stopping preview in progress");
    let quit = Invocation::new(&config.plymouth, ["quit"]);
    if let Err(e) = runner.run(&quit).await {
        tracing::warn!("Could not stop plymouthd: {}", e);
    }
    true
}

/// Resolve on SIGTERM or SIGINT
pub async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = term.recv() => tracing::info!("Received SIGTERM"),
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("Received SIGINT");
        }
    }
    Ok(())
}
