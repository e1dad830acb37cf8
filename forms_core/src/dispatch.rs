//! Routes native messages to the control that owns the window.

use crate::control::ControlInner;
use crate::platform::MessageTarget;
use crate::{Control, Msg, NativeHandle, RawMessage, State};
use std::rc::{Rc, Weak};
use tracing::trace;

/// Sees every message sent to a control before the control handles it.
/// Returning `Some` consumes the message.
pub trait MessageHook {
    fn hook(&self, control: &Control, msg: &RawMessage) -> Option<isize>;
}

impl<F> MessageHook for F
where
    F: Fn(&Control, &RawMessage) -> Option<isize>,
{
    fn hook(&self, control: &Control, msg: &RawMessage) -> Option<isize> {
        self(control, msg)
    }
}

/// What the platform holds for each control window. It does not keep the
/// control alive.
pub(crate) struct WindowTarget {
    control: Weak<ControlInner>,
}

impl WindowTarget {
    pub(crate) fn new(control: &Control) -> Self {
        Self {
            control: Rc::downgrade(&control.inner),
        }
    }
}

impl MessageTarget for WindowTarget {
    fn wnd_proc(&self, handle: NativeHandle, msg: &RawMessage) -> Option<isize> {
        let inner = self.control.upgrade()?;
        Control { inner }.wnd_proc(handle, msg)
    }
}

impl Control {
    pub(crate) fn wnd_proc(&self, handle: NativeHandle, raw: &RawMessage) -> Option<isize> {
        let hook = self.inner.hook.borrow().clone();
        if let Some(hook) = hook {
            if let Some(result) = hook.hook(self, raw) {
                return Some(result);
            }
        }

        let owned = self.handle() == Some(handle);
        match Msg::parse(raw, self.inner.app.link.thread_callback) {
            Msg::Destroy => {
                if owned {
                    self.on_handle_destroyed();
                }
                None
            }
            Msg::NcDestroy => {
                if owned {
                    self.detach_handle();
                }
                None
            }
            Msg::Move { .. } | Msg::Size { .. } => {
                self.sync_bounds_from_window(handle);
                None
            }
            Msg::SetFocus => {
                self.inner.state.set_state(State::FOCUSED, self.visible());
                self.inner.events.got_focus.raise(self, &());
                None
            }
            Msg::KillFocus => {
                self.inner.state.set_state(State::FOCUSED, false);
                self.inner.events.lost_focus.raise(self, &());
                None
            }
            Msg::ShowWindow { visible } => {
                if self.visible() != visible {
                    self.inner.state.set_state(State::VISIBLE, visible);
                    if !visible {
                        self.inner.state.set_state(State::FOCUSED, false);
                    }
                    self.inner.events.visible_changed.raise(self, &visible);
                }
                None
            }
            Msg::ThreadCallback => {
                trace!("control {}: draining invoke queue", self.id());
                self.invoke_marshaled_callbacks();
                Some(0)
            }
            Msg::Create | Msg::SetText | Msg::Close | Msg::Unknown(_) => None,
        }
    }

    /// Sends `msg` to this control's window and waits for the result.
    /// Returns `None` if there is no handle.
    pub fn send_message(&self, msg: RawMessage) -> Option<isize> {
        let handle = self.handle()?;
        Some(self.platform().send_message(handle, msg))
    }
}
