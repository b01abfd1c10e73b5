use std::cell::{Cell, RefCell};

use futures::channel::oneshot;
use futures::executor::{LocalPool, block_on};

use super::*;
use crate::error::StorageFailure;
use crate::store::MemoryBackend;
use crate::surface::HeadlessSurface;

const KEY: &str = "dark_mode";

// =============================================================
// Helpers
// =============================================================

/// Memory backend with switchable failures and optionally held writes.
#[derive(Default)]
struct ScriptedBackend {
    memory: MemoryBackend,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    hold_writes: Cell<bool>,
    held: RefCell<Vec<oneshot::Sender<()>>>,
}

impl ScriptedBackend {
    fn release_one(&self) {
        let sender = self.held.borrow_mut().remove(0);
        sender.send(()).unwrap();
    }
}

#[async_trait::async_trait(?Send)]
impl StorageBackend for Rc<ScriptedBackend> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFailure> {
        if self.fail_reads.get() {
            return Err(StorageFailure::new("runtime disconnected"));
        }
        self.memory.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFailure> {
        if self.hold_writes.get() {
            let (tx, rx) = oneshot::channel();
            self.held.borrow_mut().push(tx);
            rx.await.map_err(|_| StorageFailure::new("write abandoned"))?;
        }
        if self.fail_writes.get() {
            return Err(StorageFailure::new("quota exceeded"));
        }
        self.memory.set(key, value).await
    }
}

fn controller(
    backend: &Rc<ScriptedBackend>,
    surface: &HeadlessSurface,
    policy: WriteFailurePolicy,
) -> Rc<ToggleController<Rc<ScriptedBackend>, HeadlessSurface>> {
    Rc::new(ToggleController::new(
        PreferenceStore::new(Rc::clone(backend), KEY),
        surface.clone(),
        policy,
    ))
}

fn seeded(value: &str) -> Rc<ScriptedBackend> {
    Rc::new(ScriptedBackend { memory: MemoryBackend::new().with_value(KEY, value), ..Default::default() })
}

// =============================================================
// Initialization
// =============================================================

#[test]
fn new_controller_is_uninitialized() {
    let ctrl = controller(&Rc::default(), &HeadlessSurface::new(), WriteFailurePolicy::Keep);
    assert_eq!(ctrl.state(), ControllerState::Uninitialized);
    assert_eq!(ctrl.current(), None);
}

#[test]
fn init_on_empty_store_applies_and_persists_dark() {
    let backend = Rc::new(ScriptedBackend::default());
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);

    assert_eq!(block_on(ctrl.init()).unwrap(), ThemePreference::Dark);
    assert_eq!(ctrl.state(), ControllerState::Dark);
    assert!(!surface.marker_present());
    assert_eq!(backend.memory.raw(KEY).as_deref(), Some("yes"));
    assert_eq!(backend.memory.writes(), 1);
}

#[test]
fn init_with_stored_light_applies_marker_without_writing() {
    let backend = seeded("no");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);

    assert_eq!(block_on(ctrl.init()).unwrap(), ThemePreference::Light);
    assert_eq!(ctrl.state(), ControllerState::Light);
    assert!(surface.marker_present());
    assert_eq!(backend.memory.writes(), 0);
}

#[test]
fn init_with_stored_dark_does_not_write() {
    let backend = seeded("yes");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);

    assert_eq!(block_on(ctrl.init()).unwrap(), ThemePreference::Dark);
    assert_eq!(surface.applied(), vec![ThemePreference::Dark]);
    assert_eq!(backend.memory.writes(), 0);
}

#[test]
fn init_with_invalid_stored_value_defaults_to_dark() {
    let backend = seeded("sometimes");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);

    assert_eq!(block_on(ctrl.init()).unwrap(), ThemePreference::Dark);
    assert_eq!(backend.memory.raw(KEY).as_deref(), Some("yes"));
}

#[test]
fn init_survives_failed_default_write() {
    let backend = Rc::new(ScriptedBackend::default());
    backend.fail_writes.set(true);
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);

    assert_eq!(block_on(ctrl.init()).unwrap(), ThemePreference::Dark);
    assert_eq!(ctrl.state(), ControllerState::Dark);
    assert_eq!(backend.memory.raw(KEY), None);
}

#[test]
fn init_read_failure_leaves_page_untouched() {
    let backend = Rc::new(ScriptedBackend::default());
    backend.fail_reads.set(true);
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);

    let err = block_on(ctrl.init()).unwrap_err();
    assert!(matches!(err, ThemeError::StorageRead(_)));
    assert_eq!(ctrl.state(), ControllerState::Uninitialized);
    assert!(surface.applied().is_empty());
}

#[test]
fn second_init_does_not_reread_storage() {
    let backend = seeded("no");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);
    block_on(ctrl.init()).unwrap();

    backend.fail_reads.set(true);
    assert_eq!(block_on(ctrl.init()).unwrap(), ThemePreference::Light);
    assert_eq!(surface.applied().len(), 1);
}

// =============================================================
// Toggle
// =============================================================

#[test]
fn toggle_before_init_is_ignored() {
    let backend = Rc::new(ScriptedBackend::default());
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);

    assert_eq!(block_on(ctrl.toggle()).unwrap(), ToggleOutcome::Uninitialized);
    assert!(surface.applied().is_empty());
    assert_eq!(backend.memory.writes(), 0);
}

#[test]
fn toggle_flips_page_state_and_storage() {
    let backend = seeded("yes");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);
    block_on(ctrl.init()).unwrap();

    assert_eq!(block_on(ctrl.toggle()).unwrap(), ToggleOutcome::Switched(ThemePreference::Light));
    assert_eq!(ctrl.state(), ControllerState::Light);
    assert!(surface.marker_present());
    assert_eq!(backend.memory.raw(KEY).as_deref(), Some("no"));
}

#[test]
fn toggle_twice_returns_to_start() {
    for start in ["yes", "no"] {
        let backend = seeded(start);
        let surface = HeadlessSurface::new();
        let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);
        let initial = block_on(ctrl.init()).unwrap();

        block_on(ctrl.toggle()).unwrap();
        block_on(ctrl.toggle()).unwrap();

        assert_eq!(ctrl.current(), Some(initial));
        assert_eq!(surface.shown(), initial);
        assert_eq!(backend.memory.raw(KEY).as_deref(), Some(start));
    }
}

#[test]
fn toggle_notifies_change_callback_on_success() {
    let backend = seeded("yes");
    let ctrl = controller(&backend, &HeadlessSurface::new(), WriteFailurePolicy::Keep);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    ctrl.on_change(move |theme| sink.borrow_mut().push(theme));
    block_on(ctrl.init()).unwrap();

    block_on(ctrl.toggle()).unwrap();
    block_on(ctrl.toggle()).unwrap();

    assert_eq!(*seen.borrow(), vec![ThemePreference::Light, ThemePreference::Dark]);
}

#[test]
fn init_does_not_notify_change_callback() {
    let ctrl = controller(&Rc::default(), &HeadlessSurface::new(), WriteFailurePolicy::Keep);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    ctrl.on_change(move |_| counter.set(counter.get() + 1));

    block_on(ctrl.init()).unwrap();
    assert_eq!(calls.get(), 0);
}

#[test]
fn failed_write_with_keep_policy_leaves_storage_behind() {
    let backend = seeded("yes");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    ctrl.on_change(move |_| counter.set(counter.get() + 1));
    block_on(ctrl.init()).unwrap();

    backend.fail_writes.set(true);
    let err = block_on(ctrl.toggle()).unwrap_err();

    assert!(matches!(err, ThemeError::StorageWrite(_)));
    assert!(surface.marker_present());
    assert_eq!(ctrl.current(), Some(ThemePreference::Light));
    assert_eq!(backend.memory.raw(KEY).as_deref(), Some("yes"));
    assert_eq!(calls.get(), 0);
    assert!(!ctrl.is_pending());
}

#[test]
fn failed_write_with_rollback_policy_reverts_page() {
    let backend = seeded("yes");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Rollback);
    block_on(ctrl.init()).unwrap();

    backend.fail_writes.set(true);
    assert!(block_on(ctrl.toggle()).is_err());

    assert!(!surface.marker_present());
    assert_eq!(ctrl.current(), Some(ThemePreference::Dark));
    assert_eq!(
        surface.applied(),
        vec![ThemePreference::Dark, ThemePreference::Light, ThemePreference::Dark]
    );
}

#[test]
fn toggle_recovers_after_transient_write_failure() {
    let backend = seeded("yes");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Rollback);
    block_on(ctrl.init()).unwrap();

    backend.fail_writes.set(true);
    assert!(block_on(ctrl.toggle()).is_err());
    backend.fail_writes.set(false);

    assert_eq!(block_on(ctrl.toggle()).unwrap(), ToggleOutcome::Switched(ThemePreference::Light));
    assert_eq!(backend.memory.raw(KEY).as_deref(), Some("no"));
}

// =============================================================
// Binding and activation
// =============================================================

#[test]
fn bind_before_init_mounts_nothing() {
    let surface = HeadlessSurface::new();
    let ctrl = controller(&Rc::default(), &surface, WriteFailurePolicy::Keep);
    let pool = LocalPool::new();

    assert!(!ctrl.bind(pool.spawner()));
    assert!(!surface.is_mounted());
}

#[test]
fn bind_without_anchor_is_a_noop() {
    let backend = seeded("no");
    let surface = HeadlessSurface::without_anchor();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);
    let pool = LocalPool::new();

    assert!(!block_on(ctrl.start(pool.spawner())).unwrap());
    assert!(surface.marker_present());
    assert!(!surface.is_mounted());
}

#[test]
fn start_propagates_read_failure_without_binding() {
    let backend = Rc::new(ScriptedBackend::default());
    backend.fail_reads.set(true);
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);
    let pool = LocalPool::new();

    assert!(block_on(ctrl.start(pool.spawner())).is_err());
    assert!(!surface.is_mounted());
}

#[test]
fn activation_runs_toggle_on_spawner() {
    let backend = seeded("yes");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);
    let mut pool = LocalPool::new();
    assert!(block_on(ctrl.start(pool.spawner())).unwrap());

    assert!(surface.activate());
    pool.run_until_stalled();

    assert_eq!(ctrl.state(), ControllerState::Light);
    assert_eq!(backend.memory.raw(KEY).as_deref(), Some("no"));
}

#[test]
fn activation_during_pending_write_is_ignored() {
    let backend = seeded("yes");
    let surface = HeadlessSurface::new();
    let ctrl = controller(&backend, &surface, WriteFailurePolicy::Keep);
    let mut pool = LocalPool::new();
    assert!(block_on(ctrl.start(pool.spawner())).unwrap());
    backend.hold_writes.set(true);

    surface.activate();
    pool.run_until_stalled();
    assert!(ctrl.is_pending());
    assert!(surface.is_busy());
    assert!(surface.marker_present());

    surface.activate();
    pool.run_until_stalled();
    assert_eq!(backend.held.borrow().len(), 1);

    backend.release_one();
    pool.run_until_stalled();

    assert!(!ctrl.is_pending());
    assert!(!surface.is_busy());
    assert_eq!(ctrl.state(), ControllerState::Light);
    assert!(surface.marker_present());
    assert_eq!(backend.memory.raw(KEY).as_deref(), Some("no"));
}

#[test]
fn independent_controllers_do_not_share_state() {
    let first = controller(&seeded("yes"), &HeadlessSurface::new(), WriteFailurePolicy::Keep);
    let second = controller(&seeded("yes"), &HeadlessSurface::new(), WriteFailurePolicy::Keep);
    block_on(first.init()).unwrap();
    block_on(second.init()).unwrap();

    block_on(first.toggle()).unwrap();

    assert_eq!(first.state(), ControllerState::Light);
    assert_eq!(second.state(), ControllerState::Dark);
}

#[test]
fn from_config_uses_configured_key() {
    let config = ThemeConfig { storage_key: "theme".into(), ..ThemeConfig::default() };
    let backend = MemoryBackend::new();
    let ctrl = ToggleController::from_config(backend.clone(), HeadlessSurface::new(), &config);

    block_on(ctrl.init()).unwrap();

    assert_eq!(backend.raw("theme").as_deref(), Some("yes"));
    assert_eq!(backend.raw(KEY), None);
}
