//! Page-side effects: the root theme marker and the toggle control.
//!
//! SYSTEM CONTEXT
//! ==============
//! The controller never touches the DOM directly. The browser build provides
//! a web-sys implementation; [`HeadlessSurface`] records the same effects in
//! memory so the controller can run natively.

use std::cell::RefCell;
use std::rc::Rc;

use crate::preference::ThemePreference;

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

/// Handler invoked on each activation of the toggle control.
pub type Activation = Rc<dyn Fn()>;

pub trait ThemeSurface {
    /// Set or clear the root marker so the page shows `theme`. Idempotent.
    fn apply(&self, theme: ThemePreference);

    /// Insert the toggle control under the anchor element and route its
    /// activations to `on_activate`.
    ///
    /// Returns `false`, with no changes to the page, when the anchor is missing.
    fn mount_toggle(&self, theme: ThemePreference, on_activate: Activation) -> bool;

    /// Flag the control as busy while a write is in flight.
    fn set_busy(&self, _busy: bool) {}
}

/// In-memory surface. Clones share state, so a test can keep one handle
/// while the controller owns another.
#[derive(Clone)]
pub struct HeadlessSurface {
    inner: Rc<RefCell<HeadlessInner>>,
}

struct HeadlessInner {
    marker: bool,
    anchor: bool,
    toggle: Option<Activation>,
    busy: bool,
    applied: Vec<ThemePreference>,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::with_anchor(true)
    }
}

impl std::fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("HeadlessSurface")
            .field("marker", &inner.marker)
            .field("anchor", &inner.anchor)
            .field("mounted", &inner.toggle.is_some())
            .field("busy", &inner.busy)
            .finish()
    }
}

impl HeadlessSurface {
    /// A page whose anchor element exists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A page without the anchor element.
    #[must_use]
    pub fn without_anchor() -> Self {
        Self::with_anchor(false)
    }

    fn with_anchor(anchor: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(HeadlessInner {
                marker: false,
                anchor,
                toggle: None,
                busy: false,
                applied: Vec::new(),
            })),
        }
    }

    /// Whether the root marker class is currently set.
    #[must_use]
    pub fn marker_present(&self) -> bool {
        self.inner.borrow().marker
    }

    /// Theme the marker currently encodes.
    #[must_use]
    pub fn shown(&self) -> ThemePreference {
        if self.marker_present() { ThemePreference::Light } else { ThemePreference::Dark }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.borrow().toggle.is_some()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.borrow().busy
    }

    /// Every theme passed to [`ThemeSurface::apply`], in order.
    #[must_use]
    pub fn applied(&self) -> Vec<ThemePreference> {
        self.inner.borrow().applied.clone()
    }

    /// Simulate a click on the mounted control. Returns `false` if nothing is
    /// mounted.
    pub fn activate(&self) -> bool {
        let handler = self.inner.borrow().toggle.clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

impl ThemeSurface for HeadlessSurface {
    fn apply(&self, theme: ThemePreference) {
        let mut inner = self.inner.borrow_mut();
        inner.marker = theme.marker_present();
        inner.applied.push(theme);
    }

    fn mount_toggle(&self, _theme: ThemePreference, on_activate: Activation) -> bool {
        let mut inner = self.inner.borrow_mut();
        if !inner.anchor {
            return false;
        }
        inner.toggle = Some(on_activate);
        true
    }

    fn set_busy(&self, busy: bool) {
        self.inner.borrow_mut().busy = busy;
    }
}
