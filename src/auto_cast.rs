//! Periodic auto-cast sweep.
//!
//! A single async task walks the configured entries, tapping each hotkey and
//! pausing for the entry's interval, then pauses once more for the default
//! interval before the next sweep. Every pause races the stop signal.

use crate::backend::{InputBackend, TAP_HOLD};
use crate::config::AutoCastSkill;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the sweep reads from its owner on every iteration.
pub trait AutoCastSource: Send + Sync + 'static {
    /// Fresh copy of the entries and the default interval.
    fn snapshot(&self) -> (Vec<AutoCastSkill>, Duration);

    /// Whether taps may still fire.
    fn active(&self) -> bool;

    fn backend(&self) -> Arc<dyn InputBackend>;
}

struct Sweep {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Idle when no sweep task exists, Running otherwise.
#[derive(Default)]
pub struct AutoCastScheduler {
    sweep: Mutex<Option<Sweep>>,
}

impl AutoCastScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the sweep on `runtime`. A no-op while a sweep is still running.
    pub fn start(&self, runtime: &Handle, source: Arc<dyn AutoCastSource>) -> bool {
        let mut sweep = self.sweep.lock();
        if sweep.as_ref().is_some_and(|s| !s.task.is_finished()) {
            return false;
        }

        let (stop, stop_rx) = watch::channel(false);
        let task = runtime.spawn(run_sweeps(source, stop_rx));
        *sweep = Some(Sweep { stop, task });
        info!("auto-cast started");
        true
    }

    /// Signal the sweep to stop. The task is not awaited; it exits at its next
    /// stop check.
    pub fn stop(&self) {
        if let Some(sweep) = self.sweep.lock().take() {
            let _ = sweep.stop.send(true);
            info!("auto-cast stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.sweep
            .lock()
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }
}

/// Sleep for `duration` unless stopped first. Returns `false` when stopped.
async fn pause(stop: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    let stopped = tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        // A dropped sender counts as a stop.
        _ = stop.wait_for(|stopped| *stopped) => true,
    };
    !stopped
}

async fn run_sweeps(source: Arc<dyn AutoCastSource>, mut stop: watch::Receiver<bool>) {
    let mut sweeps: u64 = 0;

    'outer: loop {
        if *stop.borrow() || !source.active() {
            break;
        }

        let (skills, default_interval) = source.snapshot();
        let backend = source.backend();

        for skill in &skills {
            if *stop.borrow() || !source.active() {
                break 'outer;
            }

            let tapper = Arc::clone(&backend);
            let hotkey = skill.hotkey.clone();
            let tapped = tokio::task::spawn_blocking(move || tapper.tap(&hotkey, TAP_HOLD))
                .await
                .unwrap_or(false);
            if !tapped {
                warn!(hotkey = %skill.hotkey, backend = backend.name(), "auto-cast tap failed");
            }

            if !pause(&mut stop, skill.interval.unwrap_or(default_interval)).await {
                break 'outer;
            }
        }

        if !pause(&mut stop, default_interval).await {
            break;
        }
        sweeps += 1;
    }

    debug!(sweeps, "auto-cast sweep exited");
}
