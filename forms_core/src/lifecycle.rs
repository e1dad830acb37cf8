//! Creating, destroying and recreating a control's native handle.
//!
//! Recreation keeps the control's identity, properties, children and
//! pending cross-thread calls. Children with live handles are moved to the
//! parking window for the duration, so destroying the old handle does not
//! take them down with it.

use crate::dispatch::WindowTarget;
use crate::platform::MessageTarget;
use crate::{
    Control, CreateParams, Error, ExStyle, NativeError, NativeHandle, Result, RightToLeft, State,
    State2, WindowStyle,
};
use core::sync::atomic::Ordering;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use tracing::{debug, error, trace, warn};

/// Marks a recreation in progress for as long as it lives.
struct RecreateGuard<'a> {
    control: &'a Control,
}

impl<'a> RecreateGuard<'a> {
    fn new(control: &'a Control) -> Self {
        control.inner.state.set_state(State::RECREATE, true);
        control.inner.shared.recreating.store(true, Ordering::Release);
        Self { control }
    }
}

impl Drop for RecreateGuard<'_> {
    fn drop(&mut self) {
        let inner = &self.control.inner;
        inner.state.set_state(State::RECREATE, false);
        inner.shared.recreating.store(false, Ordering::Release);
        self.control.ensure_consistent();
    }
}

impl Control {
    /// What the platform is asked for when this control's handle is created.
    pub fn create_params(&self) -> Result<CreateParams> {
        let inner = &self.inner;
        let top_level = self.top_level();

        let mut style =
            inner.extra_style.get() | WindowStyle::CLIP_CHILDREN | WindowStyle::CLIP_SIBLINGS;
        style.set(WindowStyle::CHILD, !top_level);
        style.set(WindowStyle::VISIBLE, self.visible());
        style.set(WindowStyle::DISABLED, !self.enabled());
        style.set(WindowStyle::TAB_STOP, self.tab_stop());

        let mut ex_style = ExStyle::empty();
        if self.right_to_left() == RightToLeft::Yes {
            ex_style |= ExStyle::LAYOUT_RTL | ExStyle::RTL_READING;
        }

        let parent = if top_level {
            None
        } else {
            match self.parent().and_then(|p| p.handle()) {
                Some(parent) => Some(parent),
                None => Some(inner.app.parking_window()?),
            }
        };

        let bounds = self.bounds();
        Ok(CreateParams {
            class_name: inner.class_name.clone(),
            caption: self.text(),
            style,
            ex_style,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            parent,
        })
    }

    /// Creates the native handle if there is none. Children that were
    /// created before get their handles back too.
    pub fn create_handle(&self) -> Result<()> {
        self.check_not_disposed()?;
        if self.is_handle_created() {
            return Ok(());
        }
        let state = &self.inner.state;
        if state.get_state(State::CREATING_HANDLE) {
            return Err(Error::InvalidOperation("window handle is already being created"));
        }

        state.set_state(State::CREATING_HANDLE, true);
        let result = self.create_handle_core();
        state.set_state(State::CREATING_HANDLE, false);
        self.ensure_consistent();
        result
    }

    fn create_handle_core(&self) -> Result<()> {
        let inner = &self.inner;
        let platform = self.platform();
        let params = self.create_params()?;
        debug!(
            "control {}: creating handle, class {:?}, parent {:?}",
            self.id(),
            params.class_name,
            params.parent
        );

        let target: Rc<dyn MessageTarget> = Rc::new(WindowTarget::new(self));
        let handle = platform.create_window(&params, target).map_err(|e| {
            warn!("control {}: handle creation failed: {}", self.id(), e);
            Error::HandleCreation(e)
        })?;
        self.attach_handle(handle)?;

        let parked = params.parent.is_some() && params.parent == inner.app.parking_window_if_any();
        inner.state.set_state2(State2::PARKED, parked);
        inner
            .state
            .set_state(State::MIRRORED, params.ex_style.contains(ExStyle::LAYOUT_RTL));

        // Whatever creation could not carry.
        let text = self.text();
        if text.chars().count() > platform.max_creation_caption() {
            platform.set_window_text(handle, &text)?;
        }
        if let Some(region) = self.region() {
            platform.set_window_region(handle, Some(&region))?;
        }
        platform.set_window_font(handle, &self.font())?;
        self.sync_bounds_from_window(handle);

        self.create_child_handles(handle)?;
        self.on_handle_created();
        Ok(())
    }

    fn create_child_handles(&self, handle: NativeHandle) -> Result<()> {
        let platform = self.platform();
        for child in self.children() {
            match child.handle() {
                Some(child_handle) => {
                    if platform.parent(child_handle) != Some(handle) {
                        platform.set_parent(child_handle, Some(handle))?;
                        child.inner.state.set_state2(State2::PARKED, false);
                        self.inner.app.layout.init_layout(&child, false);
                    }
                }
                None if child.created() && child.visible() => child.create_handle()?,
                None => {}
            }
        }
        Ok(())
    }

    /// Moves child windows onto the parking window: those under `under`, or
    /// every child with a handle when `under` is `None`.
    fn park_children(&self, under: Option<NativeHandle>) -> Result<Vec<Control>> {
        let platform = self.platform();
        let children: Vec<Control> = self
            .children()
            .into_iter()
            .filter(|child| match (child.handle(), under) {
                (Some(h), Some(parent)) => platform.parent(h) == Some(parent),
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect();
        if !children.is_empty() {
            let parking = self.inner.app.parking_window()?;
            for child in &children {
                if let Some(child_handle) = child.handle() {
                    platform.set_parent(child_handle, Some(parking))?;
                    child.inner.state.set_state2(State2::PARKED, true);
                }
            }
        }
        Ok(children)
    }

    fn attach_handle(&self, handle: NativeHandle) -> Result<()> {
        self.inner.shared.closing.store(false, Ordering::SeqCst);
        self.inner.shared.window.assign(handle)?;
        self.inner.app.add_route(handle, self.id());
        Ok(())
    }

    pub(crate) fn detach_handle(&self) -> Option<NativeHandle> {
        let handle = self.inner.shared.window.release()?;
        self.inner.app.remove_route(handle);
        trace!("control {}: released {:?}", self.id(), handle);
        if !self.inner.state.get_state(State::RECREATE) {
            // Anything that slipped in between DESTROY and now.
            self.inner
                .shared
                .fail_pending(|| Error::Disposed("window handle was destroyed"));
        }
        Some(handle)
    }

    fn on_handle_created(&self) {
        let inner = &self.inner;
        inner.state.set_state2(State2::HANDLE_NOTIFIED, true);
        inner.events.handle_created.raise(self, &());
        if let Some(adapter) = &inner.accessibility {
            if catch_unwind(AssertUnwindSafe(|| adapter.handle_created(self))).is_err() {
                error!("control {}: accessibility adapter panicked on create", self.id());
            }
        }
        inner.app.layout.init_layout(self, false);

        // Work queued against the previous handle.
        if inner.shared.has_pending() {
            inner.shared.post_callback();
        }
    }

    pub(crate) fn on_handle_destroyed(&self) {
        let inner = &self.inner;
        let recreating = inner.state.get_state(State::RECREATE);
        trace!("control {}: handle destroyed, recreating {}", self.id(), recreating);

        if !recreating {
            inner
                .shared
                .close_queue(|| Error::Disposed("window handle was destroyed"));
        }

        if inner.state.get_state2(State2::HANDLE_NOTIFIED) {
            inner.state.set_state2(State2::HANDLE_NOTIFIED, false);
            inner.events.handle_destroyed.raise(self, &());
            if let Some(adapter) = &inner.accessibility {
                if catch_unwind(AssertUnwindSafe(|| adapter.handle_destroyed(self))).is_err() {
                    error!("control {}: accessibility adapter panicked on destroy", self.id());
                }
            }
        }
        inner.state.set_state(State::FOCUSED, false);
        inner.state.set_state2(State2::PARKED, false);
    }

    /// Makes the control usable: creates its handle if needed and marks it
    /// created, then does the same for its visible children.
    pub fn create_control(&self) -> Result<()> {
        self.check_not_disposed()?;
        if !self.is_handle_created() {
            self.create_handle()?;
        }
        if !self.created() {
            self.inner.state.set_state(State::CREATED, true);
            debug!("control {}: created", self.id());
            self.inner.events.created.raise(self, &());
        }
        for child in self.children() {
            if child.visible() && !child.created() {
                child.create_control()?;
            }
        }
        Ok(())
    }

    /// Destroys the native handle. The control itself stays usable, and a
    /// later `create_handle` builds a new one.
    pub fn destroy_handle(&self) -> Result<()> {
        let Some(handle) = self.handle() else {
            return Ok(());
        };
        let state = &self.inner.state;
        if state.get_state(State::DESTROYING) {
            return Ok(());
        }

        state.set_state(State::DESTROYING, true);
        debug!("control {}: destroying {:?}", self.id(), handle);
        let result = self.platform().destroy_window(handle);

        // The destroy messages normally released the handle already.
        if self.handle() == Some(handle) {
            trace!("control {}: no destroy notification, releasing", self.id());
            self.on_handle_destroyed();
            self.detach_handle();
        }
        state.set_state(State::DESTROYING, false);
        self.ensure_consistent();

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.code == NativeError::INVALID_WINDOW_HANDLE => {
                warn!("control {}: handle was already gone: {}", self.id(), e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Destroys and recreates the handle, keeping everything else. Does
    /// nothing if there is no handle.
    ///
    /// If creating the new handle fails, the control is left without one and
    /// not created; calls still queued on it fail.
    pub fn recreate_handle(&self) -> Result<()> {
        self.check_not_disposed()?;
        if !self.is_handle_created() || self.get_state(State::RECREATE) {
            return Ok(());
        }
        let inner = &self.inner;
        let platform = self.platform();
        let was_created = self.created();
        debug!("control {}: recreating handle", self.id());

        let _guard = RecreateGuard::new(self);
        let had_focus = self.contains_focus();

        let parked = self.park_children(None)?;
        self.destroy_handle()?;

        let created = if was_created {
            self.create_control()
        } else {
            self.create_handle()
        };
        if let Err(e) = created {
            error!("control {}: recreating handle failed: {}", self.id(), e);
            if let Some(handle) = self.handle() {
                // Creation got as far as a new handle. Take it down again
                // without taking the children that made it under it.
                if let Err(e) = self.park_children(Some(handle)) {
                    warn!("control {}: parking children of {:?}: {}", self.id(), handle, e);
                }
                if let Err(e) = self.destroy_handle() {
                    warn!("control {}: destroying {:?}: {}", self.id(), handle, e);
                }
            }
            inner.state.set_state(State::CREATED, false);
            inner
                .shared
                .fail_pending(|| Error::InvalidOperation("window handle recreation failed"));
            return Err(e);
        }

        if let Some(handle) = self.handle() {
            for child in parked {
                if let Some(child_handle) = child.handle() {
                    if platform.parent(child_handle) != Some(handle) {
                        platform.set_parent(child_handle, Some(handle))?;
                        child.inner.state.set_state2(State2::PARKED, false);
                        inner.app.layout.init_layout(&child, false);
                    }
                }
            }
        }

        if had_focus {
            self.focus();
        }
        Ok(())
    }

    /// Destroys the handle for good, disposes every child, and releases all
    /// properties. Calls after this fail with [`Error::Disposed`]. Disposing
    /// twice does nothing.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if self.is_disposed() || self.is_disposing() {
            return;
        }
        debug!("control {}: disposing", self.id());
        inner.state.set_state(State::DISPOSING, true);
        inner.shared.disposed.store(true, Ordering::Release);

        if let Err(e) = self.destroy_handle() {
            warn!("control {}: destroying handle during dispose: {}", self.id(), e);
        }
        for child in self.children() {
            child.dispose();
        }
        inner.children.borrow_mut().clear();
        inner.shared.fail_pending(|| Error::Disposed("control was disposed"));

        if let Some(parent) = self.parent() {
            parent.inner.children.borrow_mut().retain(|c| c != self);
        }
        self.detach_from_parent();
        inner.properties.borrow_mut().clear();

        inner.state.set_state(State::CREATED, false);
        inner.state.set_state(State::DISPOSING, false);
        inner.state.set_state(State::DISPOSED, true);
        inner.app.unregister(self.id());
        self.ensure_consistent();

        inner.events.disposed.raise(self, &());
        inner.events.clear();
        self.clear_message_hook();
    }
}
