//! Runs macros on background tasks, at most one run per macro name.

use crate::action::Macro;
use crate::backend::InputBackend;
use crate::sequencer::{run_sequence, SequenceOutcome};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Tracks in-flight macro runs by name.
///
/// Each run is tagged with a generation so a run that outlives [`clear`]
/// cannot remove the entry of a newer run of the same macro.
///
/// [`clear`]: MacroRunner::clear
#[derive(Default)]
pub struct MacroRunner {
    in_flight: Mutex<HashMap<String, u64>>,
    generation: AtomicU64,
}

impl MacroRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `m` on the blocking pool of `runtime` unless a run with the same
    /// name is already in flight. Returns whether a run was started.
    ///
    /// `keep_going` is checked before every action.
    pub fn execute<F>(
        self: &Arc<Self>,
        runtime: &Handle,
        m: Macro,
        backend: Arc<dyn InputBackend>,
        keep_going: F,
    ) -> bool
    where
        F: Fn() -> bool + Send + 'static,
    {
        let id = {
            let mut in_flight = self.in_flight.lock();
            if in_flight.contains_key(&m.name) {
                debug!(name = %m.name, "macro already running, trigger ignored");
                return false;
            }
            let id = self.generation.fetch_add(1, Ordering::SeqCst);
            in_flight.insert(m.name.clone(), id);
            id
        };

        info!(name = %m.name, actions = m.actions.len(), backend = backend.name(), "macro started");

        let runner = Arc::clone(self);
        runtime.spawn_blocking(move || {
            let outcome = run_sequence(&m.actions, backend.as_ref(), keep_going);
            match outcome {
                SequenceOutcome::Completed { executed } => {
                    debug!(name = %m.name, executed, "macro finished")
                }
                SequenceOutcome::Abandoned { executed } => {
                    info!(name = %m.name, executed, "macro abandoned")
                }
            }
            runner.finish(&m.name, id);
        });

        true
    }

    fn finish(&self, name: &str, id: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(name) == Some(&id) {
            in_flight.remove(name);
        }
    }

    /// Names of the macros currently running, sorted.
    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.in_flight.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.in_flight.lock().contains_key(name)
    }

    /// Forget every in-flight run. The runs themselves are not waited for.
    pub fn clear(&self) {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.is_empty() {
            debug!(count = in_flight.len(), "abandoning in-flight macros");
        }
        in_flight.clear();
    }
}
