//! The native windowing subsystem, as seen by controls.
//!
//! A [`Platform`] lives on one affinity thread and performs every operation
//! that touches native windows. The only part of it that may be used from
//! other threads is the [`MessagePoster`] it hands out.
//!
//! Two backends are provided. [`headless::HeadlessPlatform`] keeps its
//! windows in memory and runs anywhere; it is what the tests use.
//! `win32::Win32Platform` drives real windows and is only built on Windows.

use crate::msg::{MessageId, RawMessage};
use crate::{Font, Rect, Region, Size};
use bitflags::bitflags;
use core::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

pub mod headless;
#[cfg(windows)]
pub mod win32;

/// Opaque identifier of a native window. Never zero.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NativeHandle(NonZeroUsize);

impl NativeHandle {
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(NativeHandle)
    }

    pub fn as_raw(self) -> usize {
        self.0.get()
    }
}

/// An error reported by the native windowing subsystem.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error("native error {code}: {message}")]
pub struct NativeError {
    pub code: u32,
    pub message: String,
}

impl NativeError {
    pub const INVALID_WINDOW_HANDLE: u32 = 1400;
    pub const NOT_ENOUGH_MEMORY: u32 = 8;
    pub const CANNOT_FIND_WND_CLASS: u32 = 1407;

    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_handle(handle: NativeHandle) -> Self {
        Self::new(
            Self::INVALID_WINDOW_HANDLE,
            format!("invalid window handle {:#x}", handle.as_raw()),
        )
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
    pub struct WindowStyle: u32 {
        const POPUP = 0x8000_0000;
        const CHILD = 0x4000_0000;
        const VISIBLE = 0x1000_0000;
        const DISABLED = 0x0800_0000;
        const CLIP_SIBLINGS = 0x0400_0000;
        const CLIP_CHILDREN = 0x0200_0000;
        const CAPTION = 0x00C0_0000;
        const BORDER = 0x0080_0000;
        const SYS_MENU = 0x0008_0000;
        const THICK_FRAME = 0x0004_0000;
        const TAB_STOP = 0x0001_0000;
        const OVERLAPPED_WINDOW = 0x00CF_0000;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
    pub struct ExStyle: u32 {
        const TOOL_WINDOW = 0x0000_0080;
        const RTL_READING = 0x0000_2000;
        const LEFT_SCROLLBAR = 0x0000_4000;
        const CONTROL_PARENT = 0x0001_0000;
        const LAYOUT_RTL = 0x0040_0000;
    }
}

/// Everything the platform needs to create one window.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateParams {
    pub class_name: String,
    pub caption: String,
    pub style: WindowStyle,
    pub ex_style: ExStyle,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub parent: Option<NativeHandle>,
}

impl CreateParams {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Receives the messages delivered to one native window.
pub trait MessageTarget {
    /// Returns `None` if the message was not handled, in which case the
    /// platform applies its default processing.
    fn wnd_proc(&self, handle: NativeHandle, msg: &RawMessage) -> Option<isize>;
}

/// A message pulled from the affinity thread's queue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Retrieved {
    Message {
        handle: Option<NativeHandle>,
        msg: RawMessage,
    },
    Quit(i32),
    /// Nothing arrived before the timeout.
    Empty,
}

/// The thread-safe half of a platform: posts a message to a window's queue
/// without waiting for it to be processed.
pub trait MessagePoster: Send + Sync {
    fn post(&self, handle: NativeHandle, msg: RawMessage) -> Result<(), NativeError>;
}

pub trait Platform {
    fn create_window(
        &self,
        params: &CreateParams,
        target: Rc<dyn MessageTarget>,
    ) -> Result<NativeHandle, NativeError>;

    /// Destroys `handle` and all of its native descendants.
    fn destroy_window(&self, handle: NativeHandle) -> Result<(), NativeError>;

    fn is_window(&self, handle: NativeHandle) -> bool;

    fn set_parent(
        &self,
        child: NativeHandle,
        parent: Option<NativeHandle>,
    ) -> Result<(), NativeError>;

    fn parent(&self, handle: NativeHandle) -> Option<NativeHandle>;

    /// True if `child` is a (possibly indirect) descendant of `parent`.
    fn is_child(&self, parent: NativeHandle, child: NativeHandle) -> bool;

    /// Delivers `msg` synchronously and returns the handler's result.
    fn send_message(&self, handle: NativeHandle, msg: RawMessage) -> isize;

    fn default_window_proc(&self, handle: NativeHandle, msg: &RawMessage) -> isize;

    /// Returns the same id for the same name for the life of the process.
    fn register_message(&self, name: &str) -> Result<MessageId, NativeError>;

    fn poster(&self) -> Arc<dyn MessagePoster>;

    fn window_text(&self, handle: NativeHandle) -> String;

    fn set_window_text(&self, handle: NativeHandle, text: &str) -> Result<(), NativeError>;

    /// Longest caption that creation applies in full. Longer text must be
    /// set after creation.
    fn max_creation_caption(&self) -> usize;

    /// Window bounds relative to the parent's client area.
    fn window_rect(&self, handle: NativeHandle) -> Option<Rect>;

    fn client_size(&self, handle: NativeHandle) -> Option<Size>;

    fn set_window_pos(&self, handle: NativeHandle, bounds: Rect) -> Result<(), NativeError>;

    fn style(&self, handle: NativeHandle) -> WindowStyle;

    fn set_style(&self, handle: NativeHandle, style: WindowStyle) -> Result<(), NativeError>;

    fn extended_style(&self, handle: NativeHandle) -> ExStyle;

    fn set_extended_style(&self, handle: NativeHandle, style: ExStyle) -> Result<(), NativeError>;

    fn set_window_region(
        &self,
        handle: NativeHandle,
        region: Option<&Region>,
    ) -> Result<(), NativeError>;

    fn set_window_font(&self, handle: NativeHandle, font: &Font) -> Result<(), NativeError>;

    fn show_window(&self, handle: NativeHandle, visible: bool);

    fn enable_window(&self, handle: NativeHandle, enabled: bool);

    fn focused(&self) -> Option<NativeHandle>;

    fn set_focus(&self, handle: NativeHandle) -> Result<(), NativeError>;

    /// Takes the next message from this thread's queue, waiting at most
    /// `timeout` (or forever, for `None`).
    fn next_message(&self, timeout: Option<Duration>) -> Retrieved;

    fn dispatch(&self, handle: Option<NativeHandle>, msg: RawMessage);

    fn post_quit(&self, exit_code: i32);
}

/// The backend used when an app is not given one explicitly.
pub fn default_platform() -> Result<Rc<dyn Platform>, NativeError> {
    #[cfg(windows)]
    {
        Ok(Rc::new(win32::Win32Platform::new()?))
    }
    #[cfg(not(windows))]
    {
        Ok(Rc::new(headless::HeadlessPlatform::new()))
    }
}
