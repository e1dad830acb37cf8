use crate::app::{App, AppState};
use crate::dispatch::MessageHook;
use crate::invoke::ControlShared;
use crate::{
    AccessibilityAdapter, AmbientProperty, ColorRef, ControlEvents, ControlState, Cursor, Error,
    Font, NativeHandle, Platform, PropertyStore, Rect, Region, Result, RightToLeft, Site, Size,
    State, State2, WindowStyle,
};
use core::any::Any;
use core::sync::atomic::{AtomicU64, Ordering};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{debug, trace, warn};

static NEXT_CONTROL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a control. Stays the same across any number of
/// handle recreations.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct ControlId(u64);

impl ControlId {
    fn next() -> Self {
        ControlId(NEXT_CONTROL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for ControlId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A control. Cloning gives another reference to the same control.
#[derive(Clone)]
pub struct Control {
    pub(crate) inner: Rc<ControlInner>,
}

static_assertions::assert_not_impl_any!(Control: Send, Sync);

/// Derived from control state at creation; never taken from requested styles.
const MANAGED_STYLES: WindowStyle = WindowStyle::CHILD
    .union(WindowStyle::VISIBLE)
    .union(WindowStyle::DISABLED)
    .union(WindowStyle::TAB_STOP);

const FRAME_STYLES: WindowStyle = WindowStyle::BORDER
    .union(WindowStyle::CAPTION)
    .union(WindowStyle::SYS_MENU)
    .union(WindowStyle::THICK_FRAME);

pub(crate) struct ControlInner {
    pub(crate) app: Rc<AppState>,
    pub(crate) shared: Arc<ControlShared>,
    pub(crate) state: ControlState,
    pub(crate) properties: RefCell<PropertyStore>,
    pub(crate) bounds: Cell<Rect>,
    pub(crate) client_size: Cell<Size>,
    pub(crate) class_name: String,
    pub(crate) extra_style: Cell<WindowStyle>,
    pub(crate) parent: RefCell<Weak<ControlInner>>,
    pub(crate) children: RefCell<Vec<Control>>,
    pub(crate) events: ControlEvents,
    pub(crate) hook: RefCell<Option<Rc<dyn MessageHook>>>,
    pub(crate) accessibility: Option<Rc<dyn AccessibilityAdapter>>,
    pub(crate) site: Option<Rc<dyn Site>>,
}

impl Drop for ControlInner {
    fn drop(&mut self) {
        let id = self.shared.id;
        self.shared.disposed.store(true, Ordering::Release);
        self.shared.fail_pending(|| Error::Disposed("control was dropped"));
        if let Some(handle) = self.shared.window.release() {
            self.app.remove_route(handle);
            if self.app.platform.is_window(handle) {
                trace!("control {} dropped, destroying {:?}", id, handle);
                if let Err(e) = self.app.platform.destroy_window(handle) {
                    warn!("control {}: failed to destroy window on drop: {}", id, e);
                }
            }
        }
        self.app.unregister(id);
    }
}

pub struct ControlBuilder<'a> {
    app: &'a App,
    parent: Option<&'a Control>,
    text: Option<&'a str>,
    bounds: Rect,
    class_name: Option<&'a str>,
    style: WindowStyle,
    visible: bool,
    top_level: bool,
    site: Option<Rc<dyn Site>>,
    accessibility: Option<Rc<dyn AccessibilityAdapter>>,
}

impl<'a> ControlBuilder<'a> {
    pub fn parent(&mut self, parent: &'a Control) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    pub fn text(&mut self, text: &'a str) -> &mut Self {
        self.text = Some(text);
        self
    }

    pub fn bounds(&mut self, bounds: Rect) -> &mut Self {
        self.bounds = bounds;
        self
    }

    /// The native window class. Defaults to the app's control class.
    pub fn class_name(&mut self, class_name: &'a str) -> &mut Self {
        self.class_name = Some(class_name);
        self
    }

    /// Extra style bits, added to whatever the control's state implies.
    pub fn style(&mut self, style: WindowStyle) -> &mut Self {
        self.style = style;
        self
    }

    pub fn visible(&mut self, visible: bool) -> &mut Self {
        self.visible = visible;
        self
    }

    pub fn top_level(&mut self, top_level: bool) -> &mut Self {
        self.top_level = top_level;
        self
    }

    pub fn site(&mut self, site: Rc<dyn Site>) -> &mut Self {
        self.site = Some(site);
        self
    }

    pub fn accessibility(&mut self, adapter: Rc<dyn AccessibilityAdapter>) -> &mut Self {
        self.accessibility = Some(adapter);
        self
    }

    /// Constructs the control. No native handle is created yet.
    pub fn build(&self) -> Result<Control> {
        let app = &self.app.state;
        let id = ControlId::next();

        let state = ControlState::default();
        state.set_state(State::VISIBLE, self.visible);
        state.set_state(State::TOP_LEVEL, self.top_level);

        let mut properties = PropertyStore::new();
        if let Some(text) = self.text {
            properties.set_object(app.slots.text, text.to_string());
        }

        let inner = Rc::new(ControlInner {
            app: Rc::clone(app),
            shared: Arc::new(ControlShared::new(id, Arc::clone(&app.link))),
            state,
            properties: RefCell::new(properties),
            bounds: Cell::new(self.bounds),
            client_size: Cell::new(self.bounds.size()),
            class_name: self
                .class_name
                .map(str::to_string)
                .unwrap_or_else(|| app.settings.control_class_name.clone()),
            extra_style: Cell::new(self.style - MANAGED_STYLES),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            events: ControlEvents::default(),
            hook: RefCell::new(None),
            accessibility: self.accessibility.clone(),
            site: self.site.clone(),
        });
        app.register(id, Rc::downgrade(&inner));
        let control = Control { inner };
        debug!("constructed control {} ({})", id, control.inner.class_name);

        if let Some(parent) = self.parent {
            parent.add_child(&control)?;
        }
        Ok(control)
    }
}

impl PartialEq for Control {
    fn eq(&self, other: &Control) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Control {}

impl core::fmt::Debug for Control {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Control")
            .field("id", &self.id())
            .field("class_name", &self.inner.class_name)
            .field("handle", &self.handle())
            .finish()
    }
}

impl Control {
    pub fn new(app: &App) -> Result<Control> {
        Self::builder(app).build()
    }

    pub fn builder(app: &App) -> ControlBuilder<'_> {
        ControlBuilder {
            app,
            parent: None,
            text: None,
            bounds: Rect::default(),
            class_name: None,
            style: WindowStyle::empty(),
            visible: true,
            top_level: false,
            site: None,
            accessibility: None,
        }
    }

    pub fn id(&self) -> ControlId {
        self.inner.shared.id
    }

    pub fn class_name(&self) -> &str {
        &self.inner.class_name
    }

    pub fn platform(&self) -> Rc<dyn Platform> {
        Rc::clone(&self.inner.app.platform)
    }

    /// The current native handle, or `None`. Never creates one.
    pub fn handle(&self) -> Option<NativeHandle> {
        self.inner.shared.window.handle()
    }

    pub fn is_handle_created(&self) -> bool {
        self.inner.shared.window.is_live()
    }

    pub fn state(&self) -> &ControlState {
        &self.inner.state
    }

    pub fn get_state(&self, flag: State) -> bool {
        self.inner.state.get_state(flag)
    }

    pub fn get_state2(&self, flag: State2) -> bool {
        self.inner.state.get_state2(flag)
    }

    pub fn properties(&self) -> Ref<'_, PropertyStore> {
        self.inner.properties.borrow()
    }

    pub fn properties_mut(&self) -> RefMut<'_, PropertyStore> {
        self.inner.properties.borrow_mut()
    }

    pub fn events(&self) -> &ControlEvents {
        &self.inner.events
    }

    pub fn site(&self) -> Option<Rc<dyn Site>> {
        self.inner.site.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.get_state(State::DISPOSED)
    }

    pub fn is_disposing(&self) -> bool {
        self.get_state(State::DISPOSING)
    }

    pub fn created(&self) -> bool {
        self.get_state(State::CREATED)
    }

    pub(crate) fn check_not_disposed(&self) -> Result<()> {
        if self.is_disposed() || self.is_disposing() {
            Err(Error::Disposed("control"))
        } else {
            Ok(())
        }
    }

    pub(crate) fn ensure_consistent(&self) {
        debug_assert!(
            self.inner.state.is_consistent(),
            "control {} has contradictory state {:?}",
            self.id(),
            self.inner.state.bits()
        );
    }

    /// Replaces the message hook, which sees every message before the
    /// control's own handling.
    pub fn set_message_hook<H: MessageHook + 'static>(&self, hook: H) {
        *self.inner.hook.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn clear_message_hook(&self) {
        self.inner.hook.borrow_mut().take();
    }

    // Tree ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Control> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Control { inner })
    }

    pub fn children(&self) -> Vec<Control> {
        self.inner.children.borrow().clone()
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &Control) -> bool {
        let mut current = Some(other.clone());
        while let Some(c) = current {
            if c == *self {
                return true;
            }
            current = c.parent();
        }
        false
    }

    /// Walks up to the outermost ancestor.
    pub fn top_level_control(&self) -> Control {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn add_child(&self, child: &Control) -> Result<()> {
        self.check_not_disposed()?;
        child.check_not_disposed()?;
        if child.top_level() {
            return Err(Error::InvalidOperation(
                "a top-level control cannot be added to another control",
            ));
        }
        if child.contains(self) {
            return Err(Error::InvalidOperation(
                "a control cannot be a child of itself or of one of its descendants",
            ));
        }
        if !Rc::ptr_eq(&self.inner.app, &child.inner.app) {
            return Err(Error::InvalidOperation(
                "controls of different apps cannot be combined",
            ));
        }
        if let Some(old) = child.parent() {
            if old == *self {
                return Ok(());
            }
            old.remove_child(child)?;
        }

        let rtl_before = child.right_to_left();
        self.inner.children.borrow_mut().push(child.clone());
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        *child.inner.shared.parent.lock() = Arc::downgrade(&self.inner.shared);
        trace!("control {}: added child {}", self.id(), child.id());

        if let Some(handle) = self.handle() {
            if let Some(child_handle) = child.handle() {
                self.platform().set_parent(child_handle, Some(handle))?;
                child.inner.state.set_state2(State2::PARKED, false);
            } else if self.created() && child.visible() {
                child.create_control()?;
            }
        }

        child.inner.events.parent_changed.raise(child, &());
        for property in [
            AmbientProperty::Font,
            AmbientProperty::BackColor,
            AmbientProperty::ForeColor,
            AmbientProperty::Cursor,
        ] {
            child.on_parent_ambient_changed(property);
        }
        if child.right_to_left() != rtl_before {
            child.on_right_to_left_changed()?;
        }
        self.inner.app.layout.init_layout(child, false);
        Ok(())
    }

    /// Detaches `child`. A live child handle moves to the parking window.
    pub fn remove_child(&self, child: &Control) -> Result<()> {
        let removed = {
            let mut children = self.inner.children.borrow_mut();
            let before = children.len();
            children.retain(|c| c != child);
            children.len() != before
        };
        if !removed {
            return Err(Error::InvalidOperation("control is not a child of this control"));
        }
        child.detach_from_parent();

        if let Some(child_handle) = child.handle() {
            let parking = self.inner.app.parking_window()?;
            self.platform().set_parent(child_handle, Some(parking))?;
            child.inner.state.set_state2(State2::PARKED, true);
        }
        child.inner.events.parent_changed.raise(child, &());
        Ok(())
    }

    pub(crate) fn detach_from_parent(&self) {
        *self.inner.parent.borrow_mut() = Weak::new();
        *self.inner.shared.parent.lock() = std::sync::Weak::new();
    }

    // Simple state ------------------------------------------------------------

    pub fn visible(&self) -> bool {
        self.get_state(State::VISIBLE)
    }

    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.check_not_disposed()?;
        if visible == self.visible() {
            return Ok(());
        }
        self.inner.state.set_state(State::VISIBLE, visible);
        if !visible {
            self.inner.state.set_state(State::FOCUSED, false);
        }
        match self.handle() {
            Some(handle) => self.platform().show_window(handle, visible),
            None => {
                let parent_created = self.parent().map_or(false, |p| p.is_handle_created());
                if visible && parent_created {
                    self.create_control()?;
                }
            }
        }
        self.inner.events.visible_changed.raise(self, &visible);
        self.ensure_consistent();
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.get_state(State::ENABLED)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.check_not_disposed()?;
        self.inner.state.set_state(State::ENABLED, enabled);
        if let Some(handle) = self.handle() {
            self.platform().enable_window(handle, enabled);
        }
        Ok(())
    }

    pub fn tab_stop(&self) -> bool {
        self.get_state(State::TAB_STOP)
    }

    pub fn set_tab_stop(&self, tab_stop: bool) -> Result<()> {
        self.check_not_disposed()?;
        self.inner.state.set_state(State::TAB_STOP, tab_stop);
        if let Some(handle) = self.handle() {
            let platform = self.platform();
            let mut style = platform.style(handle);
            style.set(WindowStyle::TAB_STOP, tab_stop);
            platform.set_style(handle, style)?;
        }
        Ok(())
    }

    /// Styles requested on top of the ones the control derives from its
    /// own state.
    pub fn style(&self) -> WindowStyle {
        self.inner.extra_style.get()
    }

    /// Frame styles are applied to the live window. Any other change needs a
    /// new handle and recreates it.
    pub fn set_style(&self, style: WindowStyle) -> Result<()> {
        self.check_not_disposed()?;
        let style = style - MANAGED_STYLES;
        let changed = self.inner.extra_style.replace(style) ^ style;
        if changed.is_empty() {
            return Ok(());
        }
        let Some(handle) = self.handle() else {
            return Ok(());
        };
        if FRAME_STYLES.contains(changed) {
            let platform = self.platform();
            let live = (platform.style(handle) - FRAME_STYLES) | (style & FRAME_STYLES);
            platform.set_style(handle, live)?;
            Ok(())
        } else {
            self.recreate_handle()
        }
    }

    pub fn top_level(&self) -> bool {
        self.get_state(State::TOP_LEVEL)
    }

    /// Changing this on a live control recreates its handle.
    pub fn set_top_level(&self, top_level: bool) -> Result<()> {
        self.check_not_disposed()?;
        if top_level == self.top_level() {
            return Ok(());
        }
        if top_level && self.parent().is_some() {
            return Err(Error::InvalidOperation(
                "a control with a parent cannot become top-level",
            ));
        }
        self.inner.state.set_state(State::TOP_LEVEL, top_level);
        self.recreate_handle()
    }

    pub fn is_mirrored(&self) -> bool {
        self.get_state(State::MIRRORED)
    }

    // Text ------------------------------------------------------------------

    pub fn text(&self) -> String {
        self.properties()
            .get_object::<String>(self.inner.app.slots.text)
            .map(|s| s.as_ref().clone())
            .unwrap_or_default()
    }

    pub fn set_text(&self, text: &str) -> Result<()> {
        self.check_not_disposed()?;
        if self.text() == text {
            return Ok(());
        }
        self.properties_mut()
            .set_object(self.inner.app.slots.text, text.to_string());
        if let Some(handle) = self.handle() {
            self.platform().set_window_text(handle, text)?;
        }
        self.inner.events.text_changed.raise(self, &());
        Ok(())
    }

    // Geometry ----------------------------------------------------------------

    pub fn bounds(&self) -> Rect {
        self.inner.bounds.get()
    }

    pub fn client_size(&self) -> Size {
        self.inner.client_size.get()
    }

    pub fn set_bounds(&self, bounds: Rect) -> Result<()> {
        self.check_not_disposed()?;
        match self.handle() {
            Some(handle) => {
                if bounds != self.bounds() {
                    self.platform().set_window_pos(handle, bounds)?;
                }
                // The move and size messages usually did this already.
                self.sync_bounds_from_window(handle);
            }
            None => {
                self.inner.client_size.set(bounds.size());
                self.update_bounds(bounds);
            }
        }
        Ok(())
    }

    pub fn set_location(&self, x: i32, y: i32) -> Result<()> {
        let b = self.bounds();
        self.set_bounds(Rect::new(x, y, b.width, b.height))
    }

    pub fn set_size(&self, width: i32, height: i32) -> Result<()> {
        let b = self.bounds();
        self.set_bounds(Rect::new(b.x, b.y, width, height))
    }

    pub(crate) fn sync_bounds_from_window(&self, handle: NativeHandle) {
        let platform = self.platform();
        if let Some(size) = platform.client_size(handle) {
            self.inner.client_size.set(size);
        }
        if let Some(rect) = platform.window_rect(handle) {
            self.update_bounds(rect);
        }
    }

    fn update_bounds(&self, bounds: Rect) {
        if self.inner.bounds.replace(bounds) != bounds {
            trace!("control {}: bounds now {:?}", self.id(), bounds);
            self.inner.events.bounds_changed.raise(self, &bounds);
            self.inner.app.layout.init_layout(self, true);
        }
    }

    // Focus -------------------------------------------------------------------

    /// Moves keyboard focus to this control. Returns false if it has no
    /// handle or the platform refused.
    pub fn focus(&self) -> bool {
        match self.handle() {
            Some(handle) => match self.platform().set_focus(handle) {
                Ok(()) => true,
                Err(e) => {
                    debug!("control {}: focus refused: {}", self.id(), e);
                    false
                }
            },
            None => false,
        }
    }

    pub fn focused(&self) -> bool {
        self.handle().is_some() && self.platform().focused() == self.handle()
    }

    /// True if this control or one of its descendants has focus.
    pub fn contains_focus(&self) -> bool {
        let Some(handle) = self.handle() else {
            return false;
        };
        let platform = self.platform();
        match platform.focused() {
            Some(focused) => focused == handle || platform.is_child(handle, focused),
            None => false,
        }
    }

    // Region, tag, name -------------------------------------------------------

    pub fn region(&self) -> Option<Rc<Region>> {
        self.properties().get_object::<Region>(self.inner.app.slots.region)
    }

    pub fn set_region(&self, region: Option<Region>) -> Result<()> {
        self.check_not_disposed()?;
        let slot = self.inner.app.slots.region;
        match region {
            Some(region) => self.properties_mut().set_object(slot, region),
            None => {
                self.properties_mut().remove_object(slot);
            }
        }
        if let Some(handle) = self.handle() {
            let region = self.region();
            self.platform().set_window_region(handle, region.as_deref())?;
        }
        Ok(())
    }

    pub fn tag<T: Any>(&self) -> Option<Rc<T>> {
        self.properties().get_object::<T>(self.inner.app.slots.tag)
    }

    pub fn set_tag<T: Any>(&self, tag: T) -> Result<()> {
        self.check_not_disposed()?;
        self.properties_mut().set_object(self.inner.app.slots.tag, tag);
        Ok(())
    }

    pub fn name(&self) -> String {
        if let Some(name) = self.properties().get_object::<String>(self.inner.app.slots.name) {
            return name.as_ref().clone();
        }
        self.inner
            .site
            .as_ref()
            .and_then(|s| s.name())
            .unwrap_or_default()
    }

    pub fn set_name(&self, name: &str) -> Result<()> {
        self.check_not_disposed()?;
        self.properties_mut()
            .set_object(self.inner.app.slots.name, name.to_string());
        Ok(())
    }

    // Ambient properties --------------------------------------------------------

    /// The control's own font if set, else its parent's, else the site's, else
    /// the default.
    pub fn font(&self) -> Rc<Font> {
        if let Some(font) = self.properties().get_object::<Font>(self.inner.app.slots.font) {
            return font;
        }
        if let Some(parent) = self.parent() {
            return parent.font();
        }
        self.inner
            .site
            .as_ref()
            .and_then(|s| s.ambient_font())
            .unwrap_or_else(Font::default_font)
    }

    pub fn set_font(&self, font: Option<Rc<Font>>) -> Result<()> {
        self.check_not_disposed()?;
        let slot = self.inner.app.slots.font;
        match font {
            Some(font) => self.properties_mut().set_object_rc(slot, font),
            None => {
                self.properties_mut().remove_object(slot);
            }
        }
        self.on_ambient_changed(AmbientProperty::Font);
        Ok(())
    }

    pub fn back_color(&self) -> ColorRef {
        if let Some(color) = self.properties().get_color(self.inner.app.slots.back_color) {
            return color;
        }
        if let Some(parent) = self.parent() {
            return parent.back_color();
        }
        self.inner
            .site
            .as_ref()
            .and_then(|s| s.ambient_back_color())
            .unwrap_or(ColorRef::CONTROL)
    }

    pub fn set_back_color(&self, color: Option<ColorRef>) -> Result<()> {
        self.check_not_disposed()?;
        let slot = self.inner.app.slots.back_color;
        match color {
            Some(color) => self.properties_mut().set_color(slot, color),
            None => {
                self.properties_mut().remove_color(slot);
            }
        }
        self.on_ambient_changed(AmbientProperty::BackColor);
        Ok(())
    }

    pub fn fore_color(&self) -> ColorRef {
        if let Some(color) = self.properties().get_color(self.inner.app.slots.fore_color) {
            return color;
        }
        if let Some(parent) = self.parent() {
            return parent.fore_color();
        }
        self.inner
            .site
            .as_ref()
            .and_then(|s| s.ambient_fore_color())
            .unwrap_or(ColorRef::CONTROL_TEXT)
    }

    pub fn set_fore_color(&self, color: Option<ColorRef>) -> Result<()> {
        self.check_not_disposed()?;
        let slot = self.inner.app.slots.fore_color;
        match color {
            Some(color) => self.properties_mut().set_color(slot, color),
            None => {
                self.properties_mut().remove_color(slot);
            }
        }
        self.on_ambient_changed(AmbientProperty::ForeColor);
        Ok(())
    }

    pub fn cursor(&self) -> Cursor {
        let own = self.properties().get_integer(self.inner.app.slots.cursor);
        if let Some(cursor) = own.and_then(|raw| Cursor::try_from(raw).ok()) {
            return cursor;
        }
        if let Some(parent) = self.parent() {
            return parent.cursor();
        }
        self.inner
            .site
            .as_ref()
            .and_then(|s| s.ambient_cursor())
            .unwrap_or(Cursor::Default)
    }

    pub fn set_cursor(&self, cursor: Option<Cursor>) -> Result<()> {
        self.check_not_disposed()?;
        let slot = self.inner.app.slots.cursor;
        match cursor {
            Some(cursor) => self.properties_mut().set_integer(slot, cursor.into()),
            None => {
                self.properties_mut().remove_integer(slot);
            }
        }
        self.on_ambient_changed(AmbientProperty::Cursor);
        Ok(())
    }

    fn has_own(&self, property: AmbientProperty) -> bool {
        let slots = &self.inner.app.slots;
        let properties = self.properties();
        match property {
            AmbientProperty::Font => properties.contains_object(slots.font),
            AmbientProperty::BackColor => properties.contains_color(slots.back_color),
            AmbientProperty::ForeColor => properties.contains_color(slots.fore_color),
            AmbientProperty::Cursor => properties.contains_integer(slots.cursor),
        }
    }

    fn on_ambient_changed(&self, property: AmbientProperty) {
        if property == AmbientProperty::Font {
            if let Some(handle) = self.handle() {
                if let Err(e) = self.platform().set_window_font(handle, &self.font()) {
                    warn!("control {}: failed to apply font: {}", self.id(), e);
                }
            }
        }
        self.inner.events.ambient_changed.raise(self, &property);
        for child in self.children() {
            child.on_parent_ambient_changed(property);
        }
    }

    fn on_parent_ambient_changed(&self, property: AmbientProperty) {
        if !self.has_own(property) {
            self.on_ambient_changed(property);
        }
    }

    // Right to left -------------------------------------------------------------

    /// The effective setting: `Inherit` resolves through the parent, and
    /// resolves to `No` at the top.
    pub fn right_to_left(&self) -> RightToLeft {
        let own = self
            .properties()
            .get_integer(self.inner.app.slots.right_to_left)
            .and_then(|raw| RightToLeft::try_from(raw).ok())
            .unwrap_or(RightToLeft::Inherit);
        match own {
            RightToLeft::Inherit => self
                .parent()
                .map_or(RightToLeft::No, |parent| parent.right_to_left()),
            other => other,
        }
    }

    pub fn set_right_to_left(&self, value: RightToLeft) -> Result<()> {
        self.check_not_disposed()?;
        let before = self.right_to_left();
        self.properties_mut()
            .set_integer(self.inner.app.slots.right_to_left, value.into());
        if self.right_to_left() != before {
            self.on_right_to_left_changed()?;
        }
        Ok(())
    }

    /// Raw integer form, as a designer would pass it.
    pub fn set_right_to_left_raw(&self, value: i32) -> Result<()> {
        self.set_right_to_left(RightToLeft::try_from(value)?)
    }

    fn inherits_right_to_left(&self) -> bool {
        self.properties()
            .get_integer(self.inner.app.slots.right_to_left)
            .map_or(true, |raw| raw == i32::from(RightToLeft::Inherit))
    }

    fn on_right_to_left_changed(&self) -> Result<()> {
        self.inner.events.right_to_left_changed.raise(self, &());
        self.recreate_handle()?;
        for child in self.children() {
            if child.inherits_right_to_left() {
                child.on_right_to_left_changed()?;
            }
        }
        Ok(())
    }
}
