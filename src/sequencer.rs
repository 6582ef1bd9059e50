//! Executes actions against an input backend.
//!
//! Everything here blocks the calling thread (`KeyHold`, `Delay`, tap and click
//! settle times), so callers run it on a dedicated blocking task and never on
//! the key listener thread.

use crate::action::Action;
use crate::backend::{InputBackend, TAP_HOLD};
use std::thread;
use tracing::{debug, warn};

/// How a run over an action list ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every action was attempted.
    Completed { executed: usize },
    /// The keep-going check failed before the list was exhausted.
    Abandoned { executed: usize },
}

impl SequenceOutcome {
    pub fn executed(&self) -> usize {
        match self {
            Self::Completed { executed } | Self::Abandoned { executed } => *executed,
        }
    }
}

/// Execute one action. Returns `false` if any backend call failed.
///
/// An empty key makes `KeyPress` and `KeyHold` a successful no-op.
pub fn execute_action(action: &Action, backend: &dyn InputBackend) -> bool {
    match action {
        Action::KeyPress { key } => {
            if key.trim().is_empty() {
                return true;
            }
            backend.tap(key, TAP_HOLD)
        }

        Action::KeyHold { key, duration } => {
            if key.trim().is_empty() {
                return true;
            }
            let pressed = backend.press(key);
            thread::sleep(*duration);
            let released = backend.release(key);
            pressed && released
        }

        Action::MouseClick { button } => backend.click(*button),

        Action::Delay { duration } => {
            thread::sleep(*duration);
            true
        }

        Action::Combo { keys } => {
            let mut ok = true;
            for key in keys {
                ok &= backend.press(key);
            }
            // Reverse order so the first key (usually a modifier) is held longest.
            for key in keys.iter().rev() {
                ok &= backend.release(key);
            }
            ok
        }
    }
}

/// Execute `actions` in order, asking `keep_going` before each one.
///
/// A failed action is logged and skipped; it never aborts the run. Once
/// `keep_going` returns `false` the remaining actions are dropped.
pub fn run_sequence<F>(actions: &[Action], backend: &dyn InputBackend, keep_going: F) -> SequenceOutcome
where
    F: Fn() -> bool,
{
    for (executed, action) in actions.iter().enumerate() {
        if !keep_going() {
            debug!(executed, remaining = actions.len() - executed, "sequence abandoned");
            return SequenceOutcome::Abandoned { executed };
        }
        if !execute_action(action, backend) {
            warn!(action = %action, backend = backend.name(), "action failed");
        }
    }

    SequenceOutcome::Completed {
        executed: actions.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::MouseButton;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    impl InputBackend for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }
        fn available(&self) -> bool {
            true
        }
        fn press(&self, key: &str) -> bool {
            self.events.lock().push(format!("down {key}"));
            key != "bogus"
        }
        fn release(&self, key: &str) -> bool {
            self.events.lock().push(format!("up {key}"));
            key != "bogus"
        }
        fn click(&self, button: MouseButton) -> bool {
            self.events.lock().push(format!("click {button}"));
            true
        }
    }

    #[test]
    fn test_combo_releases_in_reverse() {
        let backend = Recorder::default();
        assert!(execute_action(&Action::combo(["k1", "k2", "k3"]), &backend));
        assert_eq!(
            backend.events(),
            ["down k1", "down k2", "down k3", "up k3", "up k2", "up k1"]
        );
    }

    #[test]
    fn test_key_press_taps_once() {
        let backend = Recorder::default();
        assert!(execute_action(&Action::key_press("q"), &backend));
        assert_eq!(backend.events(), ["down q", "up q"]);
    }

    #[test]
    fn test_empty_key_is_noop() {
        let backend = Recorder::default();
        assert!(execute_action(&Action::key_press(""), &backend));
        assert!(execute_action(
            &Action::key_hold(" ", Duration::from_millis(5)),
            &backend
        ));
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_key_hold_blocks_for_duration() {
        let backend = Recorder::default();
        let start = Instant::now();
        assert!(execute_action(
            &Action::key_hold("e", Duration::from_millis(40)),
            &backend
        ));
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(backend.events(), ["down e", "up e"]);
    }

    #[test]
    fn test_delay_touches_no_input() {
        let backend = Recorder::default();
        let start = Instant::now();
        assert!(execute_action(&Action::delay(Duration::from_millis(20)), &backend));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_failed_action_does_not_abort_run() {
        let backend = Recorder::default();
        let actions = [
            Action::key_press("bogus"),
            Action::mouse_click(MouseButton::Right),
        ];
        let outcome = run_sequence(&actions, &backend, || true);
        assert_eq!(outcome, SequenceOutcome::Completed { executed: 2 });
        assert_eq!(backend.events(), ["down bogus", "click right"]);
    }

    #[test]
    fn test_run_abandons_when_disabled() {
        let backend = Recorder::default();
        let enabled = AtomicBool::new(true);
        let actions = [
            Action::key_press("a"),
            Action::key_press("b"),
            Action::key_press("c"),
        ];

        let outcome = run_sequence(&actions, &backend, || {
            let keep = enabled.load(Ordering::SeqCst);
            // Disable after the first action has been allowed through.
            enabled.store(false, Ordering::SeqCst);
            keep
        });

        assert_eq!(outcome, SequenceOutcome::Abandoned { executed: 1 });
        assert_eq!(outcome.executed(), 1);
        assert_eq!(backend.events(), ["down a", "up a"]);
    }
}
