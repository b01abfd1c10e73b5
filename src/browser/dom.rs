//! web-sys implementation of [`ThemeSurface`].

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Function;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Event, HtmlElement, HtmlImageElement};

use super::storage::property;
use crate::config::ThemeConfig;
use crate::preference::ThemePreference;
use crate::surface::{Activation, ThemeSurface};

const TOGGLE_STYLE: &str =
    "display: flex; height: 100%; justify-content: center; align-items: center; margin-left: 28px; cursor: pointer;";
const ICON_STYLE: &str = "height: 60%; transition: filter 0.3s ease;";
const ICON_CLASS: &str = "logo-lea";
const DARK_ICON_FILTER: &str = "invert(1) brightness(1.2)";

/// Theme surface over the live document. Clones share the mounted control.
#[derive(Clone)]
pub struct DomSurface {
    document: Document,
    config: Rc<ThemeConfig>,
    control: Rc<RefCell<Option<HtmlElement>>>,
    icon: Rc<RefCell<Option<HtmlImageElement>>>,
}

impl DomSurface {
    #[must_use]
    pub fn new(document: Document, config: &ThemeConfig) -> Self {
        Self {
            document,
            config: Rc::new(config.clone()),
            control: Rc::new(RefCell::new(None)),
            icon: Rc::new(RefCell::new(None)),
        }
    }

    /// Invert the icon on dark pages so it stays visible.
    pub fn refresh_icon(&self, theme: ThemePreference) {
        let Some(icon) = self.icon.borrow().clone() else {
            return;
        };
        let filter = if theme.is_dark() { DARK_ICON_FILTER } else { "none" };
        if let Err(e) = icon.style().set_property("filter", filter) {
            log::warn!("failed to update toggle icon: {e:?}");
        }
    }

    fn build_toggle(&self, on_activate: Activation) -> Result<(HtmlElement, HtmlImageElement), JsValue> {
        let control: HtmlElement = self.document.create_element("a")?.dyn_into()?;
        control.set_id(&self.config.toggle_id);
        control.set_title(&self.config.toggle_title);
        control.set_attribute("role", "button")?;
        control.style().set_css_text(TOGGLE_STYLE);

        let icon: HtmlImageElement = self.document.create_element("img")?.dyn_into()?;
        icon.set_src(&icon_url(&self.config.icon_path));
        icon.set_alt(&self.config.toggle_title);
        icon.set_class_name(ICON_CLASS);
        icon.style().set_css_text(ICON_STYLE);
        control.append_child(&icon)?;

        let handler = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            event.prevent_default();
            on_activate();
        });
        control.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())?;
        // The control is never removed, so the handler lives for the page.
        handler.forget();

        Ok((control, icon))
    }
}

impl ThemeSurface for DomSurface {
    fn apply(&self, theme: ThemePreference) {
        let Some(root) = self.document.document_element() else {
            log::warn!("document has no root element; theme not applied");
            return;
        };
        let classes = root.class_list();
        let marker = self.config.marker_class.as_str();
        let result = if theme.marker_present() { classes.add_1(marker) } else { classes.remove_1(marker) };
        if let Err(e) = result {
            log::warn!("failed to apply {theme} theme: {e:?}");
        }
    }

    fn mount_toggle(&self, theme: ThemePreference, on_activate: Activation) -> bool {
        let Some(anchor) = self.document.get_element_by_id(&self.config.anchor_id) else {
            return false;
        };
        let (control, icon) = match self.build_toggle(on_activate) {
            Ok(built) => built,
            Err(e) => {
                log::error!("failed to build theme toggle: {e:?}");
                return false;
            }
        };
        if let Err(e) = anchor.append_child(&control) {
            log::error!("failed to insert theme toggle: {e:?}");
            return false;
        }
        *self.control.borrow_mut() = Some(control);
        *self.icon.borrow_mut() = Some(icon);
        self.refresh_icon(theme);
        true
    }

    fn set_busy(&self, busy: bool) {
        let Some(control) = self.control.borrow().clone() else {
            return;
        };
        if let Err(e) = control.set_attribute("aria-busy", if busy { "true" } else { "false" }) {
            log::debug!("failed to set aria-busy: {e:?}");
        }
    }
}

/// Resolve an extension-relative asset path through `chrome.runtime.getURL`.
fn icon_url(path: &str) -> String {
    let resolved = property(&js_sys::global(), "chrome")
        .and_then(|chrome| property(&chrome, "runtime"))
        .and_then(|runtime| {
            let get_url = property(&runtime, "getURL")?.dyn_into::<Function>();
            match get_url {
                Ok(get_url) => match get_url.call1(&runtime, &JsValue::from_str(path)) {
                    Ok(url) => url.as_string(),
                    Err(_) => None,
                },
                Err(_) => None,
            }
        });
    resolved.unwrap_or_else(|| path.to_owned())
}
