use parking_lot::Mutex;
use quickcast::config::AutoCastSkill;
use quickcast::{
    Action, CastError, Engine, FallbackBackend, InputBackend, KeyEvent, KeyHandler, KeyListener,
    MouseButton, Result, SettingsStore,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backend that records every call with a timestamp.
#[derive(Default)]
struct RecordingBackend {
    events: Mutex<Vec<(String, Instant)>>,
}

impl RecordingBackend {
    fn events(&self) -> Vec<String> {
        self.events.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|(e, _)| e == event).count()
    }

    fn times(&self, event: &str) -> Vec<Instant> {
        self.events
            .lock()
            .iter()
            .filter(|(e, _)| e == event)
            .map(|(_, t)| *t)
            .collect()
    }

    fn record(&self, event: String) {
        self.events.lock().push((event, Instant::now()));
    }
}

impl InputBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }
    fn available(&self) -> bool {
        true
    }
    fn press(&self, key: &str) -> bool {
        self.record(format!("down {key}"));
        true
    }
    fn release(&self, key: &str) -> bool {
        self.record(format!("up {key}"));
        true
    }
    fn click(&self, button: MouseButton) -> bool {
        self.record(format!("click {button}"));
        true
    }
}

#[derive(Default)]
struct ListenerState {
    handler: Option<Arc<dyn KeyHandler>>,
    bindings: Vec<String>,
    attaches: usize,
}

/// Listener driven by the test: `emit` delivers a key event to the engine.
#[derive(Clone)]
struct ManualListener {
    state: Arc<Mutex<ListenerState>>,
    available: bool,
    consumes: bool,
}

impl ManualListener {
    fn new() -> Self {
        Self {
            state: Arc::default(),
            available: true,
            consumes: false,
        }
    }

    fn emit(&self, event: KeyEvent) {
        let handler = self.state.lock().handler.clone();
        if let Some(handler) = handler {
            handler.on_key(&event);
        }
    }

    fn press(&self, c: char) {
        self.emit(KeyEvent::char(c));
    }

    fn bindings(&self) -> Vec<String> {
        self.state.lock().bindings.clone()
    }

    fn attaches(&self) -> usize {
        self.state.lock().attaches
    }
}

impl KeyListener for ManualListener {
    fn available(&self) -> bool {
        self.available
    }

    fn consumes_keys(&self) -> bool {
        self.consumes
    }

    fn attach(&self, handler: Arc<dyn KeyHandler>, bindings: &[String]) -> Result<()> {
        if !self.available {
            return Err(CastError::unavailable("manual listener disabled"));
        }
        let mut state = self.state.lock();
        state.handler = Some(handler);
        state.bindings = bindings.to_vec();
        state.attaches += 1;
        Ok(())
    }

    fn rebind(&self, bindings: &[String]) -> Result<()> {
        self.state.lock().bindings = bindings.to_vec();
        Ok(())
    }

    fn detach(&self) {
        self.state.lock().handler = None;
    }

    fn is_attached(&self) -> bool {
        self.state.lock().handler.is_some()
    }
}

fn engine_with(listener: &ManualListener) -> (Engine, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::default());
    let engine = Engine::with_parts(
        SettingsStore::new("unused.json"),
        Box::new(listener.clone()),
        backend.clone(),
        backend.clone(),
    )
    .unwrap();
    (engine, backend)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_hotkey_keeps_listener_attached() {
    let listener = ManualListener::new();
    let (mut engine, backend) = engine_with(&listener);
    engine.start().unwrap();
    assert!(engine.is_running() && engine.is_enabled());

    listener.emit(KeyEvent::named("F9"));
    assert!(engine.is_running());
    assert!(!engine.is_enabled());
    assert!(listener.is_attached());

    // Disabled: quick-cast keys are dropped.
    listener.press('q');
    settle().await;
    assert!(backend.events().is_empty());

    listener.emit(KeyEvent::named("f9"));
    assert!(engine.is_enabled());
    assert_eq!(listener.attaches(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_quick_cast_clicks_at_cursor() {
    let listener = ManualListener::new();
    let (mut engine, backend) = engine_with(&listener);
    engine.start().unwrap();

    listener.press('Q');
    settle().await;
    assert_eq!(backend.events(), ["click left"]);

    engine.set_quick_cast_enabled(false);
    listener.press('q');
    settle().await;
    assert_eq!(backend.count("click left"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_quick_cast_replays_consumed_key() {
    let mut listener = ManualListener::new();
    listener.consumes = true;
    let (mut engine, backend) = engine_with(&listener);
    engine.start().unwrap();

    listener.press('w');
    settle().await;
    assert_eq!(backend.events(), ["down w", "up w", "click left"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_consuming_listener_holds_only_toggle_while_disabled() {
    let mut listener = ManualListener::new();
    listener.consumes = true;
    let (mut engine, backend) = engine_with(&listener);
    engine.add_macro("potion", "h", Vec::new()).unwrap();
    engine.start().unwrap();
    assert!(listener.bindings().contains(&"q".to_string()));
    assert!(listener.bindings().contains(&"h".to_string()));

    listener.emit(KeyEvent::named("f9"));
    assert!(!engine.is_enabled());
    assert_eq!(listener.bindings(), ["f9"]);

    // Edits while disabled keep the reduced set.
    engine.add_macro("mana", "j", Vec::new()).unwrap();
    assert_eq!(listener.bindings(), ["f9"]);

    listener.press('q');
    settle().await;
    assert!(backend.events().is_empty());

    listener.emit(KeyEvent::named("f9"));
    assert!(engine.is_enabled());
    let bindings = listener.bindings();
    for key in ["f9", "q", "h", "j"] {
        assert!(bindings.contains(&key.to_string()), "{key} missing from {bindings:?}");
    }
}

#[tokio::test]
async fn test_consuming_listener_skips_quick_cast_without_backend() {
    let mut listener = ManualListener::new();
    listener.consumes = true;
    let mut engine = Engine::with_parts(
        SettingsStore::new("unused.json"),
        Box::new(listener.clone()),
        Arc::new(FallbackBackend),
        Arc::new(FallbackBackend),
    )
    .unwrap();
    engine.add_macro("potion", "h", Vec::new()).unwrap();
    engine.start().unwrap();

    let bindings = listener.bindings();
    assert_eq!(bindings[0], "f9");
    assert!(bindings.contains(&"h".to_string()));
    for slot in engine.settings().quick_cast.hotkeys.values() {
        assert!(!bindings.contains(slot), "{slot} should not be bound");
    }
}

#[tokio::test]
async fn test_passive_listener_keeps_all_bindings_while_disabled() {
    let listener = ManualListener::new();
    let (mut engine, _backend) = engine_with(&listener);
    engine.start().unwrap();
    engine.toggle();
    assert!(listener.bindings().contains(&"q".to_string()));
}

#[tokio::test]
async fn test_chord_toggle_hotkey() {
    let listener = ManualListener::new();
    let (mut engine, _backend) = engine_with(&listener);
    engine.set_global_hotkey("Ctrl+Shift+P").unwrap();
    engine.start().unwrap();
    assert_eq!(listener.bindings()[0], "ctrl+shift+p");

    // The bare key is not the chord.
    listener.press('p');
    assert!(engine.is_enabled());
    listener.emit(KeyEvent::char('p').with_modifiers(["shift"]));
    assert!(engine.is_enabled());

    listener.emit(KeyEvent::char('P').with_modifiers(["ctrl", "shift"]));
    assert!(!engine.is_enabled());

    listener.emit(KeyEvent::named("ctrl+shift+p"));
    assert!(engine.is_enabled());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_macro_runs_at_most_once() {
    let listener = ManualListener::new();
    let (mut engine, backend) = engine_with(&listener);
    engine
        .add_macro(
            "slow",
            "x",
            vec![
                Action::delay(Duration::from_millis(150)),
                Action::key_press("z"),
            ],
        )
        .unwrap();
    engine.start().unwrap();

    listener.press('x');
    listener.press('x');
    assert_eq!(engine.running_macros(), ["slow"]);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(engine.running_macros().is_empty());
    assert_eq!(backend.count("down z"), 1);

    // Finished runs can be triggered again.
    listener.press('x');
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(backend.count("down z"), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disable_abandons_macro_mid_sequence() {
    let listener = ManualListener::new();
    let (mut engine, backend) = engine_with(&listener);
    engine
        .add_macro(
            "combo",
            "x",
            vec![
                Action::key_press("a"),
                Action::delay(Duration::from_millis(150)),
                Action::key_press("b"),
            ],
        )
        .unwrap();
    engine.start().unwrap();

    listener.press('x');
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!engine.toggle());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(backend.events(), ["down a", "up a"]);
    assert!(engine.running_macros().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_auto_cast_sweep_lower_bound() {
    let listener = ManualListener::new();
    let (mut engine, backend) = engine_with(&listener);
    engine
        .add_auto_cast_skill("1", Some(Duration::from_millis(80)))
        .unwrap();
    engine.add_auto_cast_skill("2", None).unwrap();
    engine
        .set_auto_cast_interval(Duration::from_millis(50))
        .unwrap();
    engine.start().unwrap();
    assert!(!engine.status().auto_cast_active);

    engine.set_auto_cast_enabled(true);
    assert!(engine.status().auto_cast_active);

    tokio::time::sleep(Duration::from_millis(600)).await;
    engine.stop();

    let ones = backend.times("down 1");
    assert!(ones.len() >= 2, "expected two sweeps, got {:?}", backend.events());
    // 80ms for "1", 50ms default for "2", then the 50ms sweep pause.
    assert!(ones[1] - ones[0] >= Duration::from_millis(180));
    assert!(backend.count("down 2") >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_auto_cast_follows_toggle() {
    let listener = ManualListener::new();
    let (mut engine, _backend) = engine_with(&listener);
    engine.add_auto_cast_skill("1", None).unwrap();
    engine.set_auto_cast_enabled(true);
    engine.start().unwrap();
    assert!(engine.status().auto_cast_active);

    engine.toggle();
    assert!(!engine.status().auto_cast_active);

    engine.toggle();
    assert!(engine.status().auto_cast_active);

    engine.stop();
    assert!(!engine.status().auto_cast_active);
}

#[tokio::test]
async fn test_remove_auto_cast_skill() {
    let listener = ManualListener::new();
    let (engine, _backend) = engine_with(&listener);

    assert!(!engine.remove_auto_cast_skill("q"));

    engine.add_auto_cast_skill("q", None).unwrap();
    engine
        .add_auto_cast_skill("w", Some(Duration::from_secs(1)))
        .unwrap();
    assert!(matches!(
        engine.add_auto_cast_skill("Q", None),
        Err(CastError::DuplicateAutoCast(_))
    ));

    assert!(engine.remove_auto_cast_skill("q"));
    assert_eq!(
        engine.settings().auto_cast.skills,
        vec![AutoCastSkill::new("w", Some(Duration::from_secs(1)))]
    );
    assert!(!engine.remove_auto_cast_skill("q"));
}

#[tokio::test]
async fn test_duplicate_macro_rejected() {
    let listener = ManualListener::new();
    let (engine, _backend) = engine_with(&listener);

    engine.add_macro("m", "x", Vec::new()).unwrap();
    assert!(matches!(
        engine.add_macro("m", "y", Vec::new()),
        Err(CastError::DuplicateMacro(_))
    ));
    assert_eq!(engine.settings().macros.len(), 1);
    assert!(engine.remove_macro("m"));
    assert!(!engine.remove_macro("m"));
}

#[tokio::test]
async fn test_start_fails_without_listener() {
    let mut listener = ManualListener::new();
    listener.available = false;
    let (mut engine, _backend) = engine_with(&listener);

    assert!(matches!(engine.start(), Err(CastError::Unavailable(_))));
    assert!(!engine.is_running());
    assert!(!engine.is_enabled());
    assert!(!engine.toggle());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_detaches_and_clears_macros() {
    let listener = ManualListener::new();
    let (mut engine, backend) = engine_with(&listener);
    engine
        .add_macro(
            "long",
            "x",
            vec![
                Action::delay(Duration::from_millis(200)),
                Action::key_press("z"),
            ],
        )
        .unwrap();
    engine.start().unwrap();

    listener.press('x');
    assert_eq!(engine.running_macros(), ["long"]);

    engine.stop();
    assert!(!engine.is_running());
    assert!(!listener.is_attached());
    assert!(engine.running_macros().is_empty());

    // Events fed after stop go nowhere.
    engine.handle_key(&KeyEvent::char('q'));
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(backend.events().is_empty());
}

#[tokio::test]
async fn test_binding_changes_reach_listener() {
    let listener = ManualListener::new();
    let (mut engine, _backend) = engine_with(&listener);
    engine.start().unwrap();
    assert!(listener.bindings().contains(&"q".to_string()));

    engine.add_macro("potion", "h", Vec::new()).unwrap();
    assert!(listener.bindings().contains(&"h".to_string()));

    engine.set_global_hotkey("F8").unwrap();
    assert_eq!(listener.bindings()[0], "f8");

    engine.set_quick_cast_enabled(false);
    assert!(!listener.bindings().contains(&"q".to_string()));
}

#[tokio::test]
async fn test_save_and_reload_settings() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("settings.json");
    let backend = Arc::new(RecordingBackend::default());

    let engine = Engine::with_parts(
        SettingsStore::new(&path),
        Box::new(ManualListener::new()),
        backend.clone(),
        backend.clone(),
    )?;
    let actions = vec![Action::key_press("a"), Action::combo(["ctrl", "b"])];
    engine.add_macro("m", "x", actions.clone())?;
    engine.save_settings()?;

    let fresh = Engine::with_parts(
        SettingsStore::new(&path),
        Box::new(ManualListener::new()),
        backend.clone(),
        backend,
    )?;
    assert!(fresh.settings().macros.is_empty());
    fresh.reload_settings()?;

    let settings = fresh.settings();
    let m = settings.find_macro("m").unwrap();
    assert_eq!(m.hotkey, "x");
    assert_eq!(m.actions, actions);

    // A broken file keeps what was loaded.
    std::fs::write(&path, "[]")?;
    assert!(fresh.reload_settings().is_err());
    assert!(fresh.settings().find_macro("m").is_some());
    Ok(())
}

#[tokio::test]
async fn test_backend_preference() {
    let listener = ManualListener::new();
    let (engine, _backend) = engine_with(&listener);

    assert!(engine.status().low_level_active);
    assert_eq!(engine.set_backend_preference(false), "recording");
    assert!(!engine.status().low_level_active);
}
