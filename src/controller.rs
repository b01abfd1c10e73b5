//! Theme toggle controller.
//!
//! Owns the in-memory preference for one page and keeps the page marker in
//! step with it. Lifecycle:
//!
//! 1. [`ToggleController::init`] reads storage once and applies the result
//!    (persisting `dark` when nothing is stored).
//! 2. [`ToggleController::bind`] mounts the toggle control. Only possible after
//!    init, so a click can never race the initial read.
//! 3. Each activation runs [`ToggleController::toggle`]: apply the complement
//!    immediately, then persist it.
//!
//! TRADE-OFFS
//! ==========
//! Toggles are single-flight. An activation while a write is pending is
//! dropped rather than queued, so the last persisted value always matches the
//! last theme the controller settled on.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::config::{ThemeConfig, WriteFailurePolicy};
use crate::error::ThemeError;
use crate::preference::ThemePreference;
use crate::store::{PreferenceStore, StorageBackend};
use crate::surface::{Activation, ThemeSurface};

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

/// Observable controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Dark,
    Light,
}

/// Result of a toggle request that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The page switched and the new value was persisted.
    Switched(ThemePreference),
    /// A previous toggle is still writing; this one was ignored.
    Busy,
    /// [`ToggleController::init`] has not completed.
    Uninitialized,
}

type ChangeCallback = Rc<dyn Fn(ThemePreference)>;

pub struct ToggleController<B, D> {
    store: PreferenceStore<B>,
    surface: D,
    policy: WriteFailurePolicy,
    current: Cell<Option<ThemePreference>>,
    pending: Cell<bool>,
    on_change: RefCell<Option<ChangeCallback>>,
}

impl<B, D> std::fmt::Debug for ToggleController<B, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToggleController")
            .field("key", &self.store.key())
            .field("policy", &self.policy)
            .field("current", &self.current.get())
            .field("pending", &self.pending.get())
            .finish_non_exhaustive()
    }
}

impl<B: StorageBackend, D: ThemeSurface> ToggleController<B, D> {
    pub fn new(store: PreferenceStore<B>, surface: D, policy: WriteFailurePolicy) -> Self {
        Self {
            store,
            surface,
            policy,
            current: Cell::new(None),
            pending: Cell::new(false),
            on_change: RefCell::new(None),
        }
    }

    /// Build a controller using the storage key and failure policy from `config`.
    pub fn from_config(backend: B, surface: D, config: &ThemeConfig) -> Self {
        Self::new(PreferenceStore::new(backend, config.storage_key.clone()), surface, config.on_write_failure)
    }

    /// Last theme the controller settled on, `None` before init.
    #[must_use]
    pub fn current(&self) -> Option<ThemePreference> {
        self.current.get()
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        match self.current.get() {
            None => ControllerState::Uninitialized,
            Some(ThemePreference::Dark) => ControllerState::Dark,
            Some(ThemePreference::Light) => ControllerState::Light,
        }
    }

    /// Whether a toggle write is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Register the callback run after every successful toggle. Replaces any
    /// previous callback.
    pub fn on_change(&self, callback: impl Fn(ThemePreference) + 'static) {
        *self.on_change.borrow_mut() = Some(Rc::new(callback));
    }

    /// Read the stored preference and apply it to the page.
    ///
    /// With nothing stored, applies and persists `dark`; a failure of that
    /// write is logged and does not fail init. A second call returns the
    /// current theme without touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::StorageRead`] if the read fails. The page is left
    /// untouched and the controller stays uninitialized.
    pub async fn init(&self) -> Result<ThemePreference, ThemeError> {
        if let Some(theme) = self.current.get() {
            return Ok(theme);
        }

        let stored = match self.store.get().await {
            Ok(stored) => stored,
            Err(e) => {
                log::error!("theme init aborted: {e}");
                return Err(e);
            }
        };

        let theme = stored.unwrap_or_default();
        self.surface.apply(theme);
        self.current.set(Some(theme));

        if stored.is_some() {
            log::debug!("theme restored: {theme}");
        } else {
            log::info!("no stored theme, defaulting to {theme}");
            if let Err(e) = self.store.set(theme).await {
                log::warn!("failed to persist default theme: {e}");
            }
        }
        Ok(theme)
    }

    /// Flip the theme: apply the complement, then persist it.
    ///
    /// On a write failure the configured [`WriteFailurePolicy`] decides
    /// whether the page stays on the new theme or reverts. The change callback
    /// only runs on success.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::StorageWrite`] if persisting fails.
    pub async fn toggle(&self) -> Result<ToggleOutcome, ThemeError> {
        let Some(current) = self.current.get() else {
            log::debug!("toggle ignored: controller not initialized");
            return Ok(ToggleOutcome::Uninitialized);
        };
        let Some(_flight) = InFlight::begin(&self.pending, &self.surface) else {
            log::debug!("toggle ignored: write in flight");
            return Ok(ToggleOutcome::Busy);
        };

        let next = current.toggled();
        self.surface.apply(next);

        match self.store.set(next).await {
            Ok(()) => {
                self.current.set(Some(next));
                log::debug!("theme switched: {current} -> {next}");
                self.notify(next);
                Ok(ToggleOutcome::Switched(next))
            }
            Err(e) => {
                match self.policy {
                    WriteFailurePolicy::Keep => {
                        self.current.set(Some(next));
                        log::warn!("{e}; page stays on {next}, storage still holds {current}");
                    }
                    WriteFailurePolicy::Rollback => {
                        self.surface.apply(current);
                        log::warn!("{e}; reverted page to {current}");
                    }
                }
                Err(e)
            }
        }
    }

    fn notify(&self, theme: ThemePreference) {
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            callback(theme);
        }
    }
}

impl<B, D> ToggleController<B, D>
where
    B: StorageBackend + 'static,
    D: ThemeSurface + 'static,
{
    /// Mount the toggle control. Each activation spawns one
    /// [`toggle`](Self::toggle) on `spawner`.
    ///
    /// Returns `false` when the controller is not initialized or the page has
    /// no anchor element; neither is an error.
    pub fn bind<S>(self: &Rc<Self>, spawner: S) -> bool
    where
        S: LocalSpawn + 'static,
    {
        let Some(theme) = self.current.get() else {
            log::warn!("toggle not mounted: controller not initialized");
            return false;
        };

        // The control lives as long as the page, so its handler keeps the
        // controller alive.
        let controller = Rc::clone(self);
        let on_activate: Activation = Rc::new(move || {
            let controller = Rc::clone(&controller);
            let task = async move {
                if let Ok(ToggleOutcome::Switched(theme)) = controller.toggle().await {
                    log::trace!("toggle task settled on {theme}");
                }
            };
            if let Err(e) = spawner.spawn_local(task) {
                log::error!("failed to spawn toggle task: {e}");
            }
        });

        let mounted = self.surface.mount_toggle(theme, on_activate);
        if !mounted {
            log::info!("anchor element missing; toggle not mounted");
        }
        mounted
    }

    /// [`init`](Self::init) followed by [`bind`](Self::bind).
    ///
    /// # Errors
    ///
    /// Propagates the read error from init; nothing is bound in that case.
    pub async fn start<S>(self: &Rc<Self>, spawner: S) -> Result<bool, ThemeError>
    where
        S: LocalSpawn + 'static,
    {
        self.init().await?;
        Ok(self.bind(spawner))
    }
}

/// Marks a toggle write as in flight until dropped.
struct InFlight<'a, D: ThemeSurface> {
    pending: &'a Cell<bool>,
    surface: &'a D,
}

impl<'a, D: ThemeSurface> InFlight<'a, D> {
    fn begin(pending: &'a Cell<bool>, surface: &'a D) -> Option<Self> {
        if pending.replace(true) {
            return None;
        }
        surface.set_busy(true);
        Some(Self { pending, surface })
    }
}

impl<D: ThemeSurface> Drop for InFlight<'_, D> {
    fn drop(&mut self) {
        self.pending.set(false);
        self.surface.set_busy(false);
    }
}
