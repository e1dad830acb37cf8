//! Base machinery for forms-style controls that wrap native windows.
//!
//! A [`Control`] owns at most one native window handle at a time. The handle
//! is created on demand, may be destroyed and recreated (to apply styles that
//! cannot change on a live window) any number of times, and is destroyed for
//! good when the control is disposed. The control's identity, geometry and
//! properties survive all of that.
//!
//! Controls are bound to the thread that runs their [`App`]. Other threads
//! reach them through an [`Invoker`], which queues closures for the affinity
//! thread and wakes it with a registered window message.
//!
//! Optional per-control attributes live in a sparse [`PropertyStore`] keyed
//! by [`PropertySlot`]s, so a control only pays for what it sets.

mod accessibility;
mod ambient;
mod app;
mod color;
mod control;
mod dispatch;
mod error;
mod events;
mod font;
mod handle;
mod invoke;
mod layout;
mod lifecycle;
pub mod msg;
pub mod platform;
pub mod property_store;
pub mod state;

pub use accessibility::AccessibilityAdapter;
pub use ambient::{AmbientProperty, Cursor, RightToLeft, Site};
pub use app::{App, AppBuilder, Settings, UnhandledPanic};
pub use color::ColorRef;
pub use control::{Control, ControlBuilder, ControlId};
pub use dispatch::MessageHook;
pub use error::{Error, Result};
pub use events::{ControlEvents, Event, EventHandler, Subscription};
pub use font::{Font, FontBuilder, FontQuality};
pub use handle::NativeHandleOwner;
pub use invoke::{sync_context, CancellationToken, InvokeContext, InvokeHandle, Invoker};
pub use layout::{LayoutEngine, NullLayout};
pub use msg::{MessageId, Msg, RawMessage};
pub use platform::{CreateParams, ExStyle, NativeError, NativeHandle, Platform, WindowStyle};
pub use property_store::{PropertySlot, PropertyStore, SlotRegistry};
pub use state::{ControlState, State, State2};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Position and size of a window, relative to its parent's client area.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// A clip region, as a union of rectangles in window coordinates.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self { rects: vec![rect] }
    }

    pub fn union(mut self, rect: Rect) -> Self {
        self.rects.push(rect);
        self
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn contains(&self, point: Point) -> bool {
        self.rects.iter().any(|r| {
            point.x >= r.x && point.x < r.right() && point.y >= r.y && point.y < r.bottom()
        })
    }
}
