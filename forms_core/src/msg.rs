//! Translates `RawMessage` to `Msg`

use crate::{Point, Size};

/// Opaque native message identifier.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MessageId(pub u32);

impl MessageId {
    pub const CREATE: MessageId = MessageId(0x0001);
    pub const DESTROY: MessageId = MessageId(0x0002);
    pub const MOVE: MessageId = MessageId(0x0003);
    pub const SIZE: MessageId = MessageId(0x0005);
    pub const SET_FOCUS: MessageId = MessageId(0x0007);
    pub const KILL_FOCUS: MessageId = MessageId(0x0008);
    pub const SET_TEXT: MessageId = MessageId(0x000C);
    pub const CLOSE: MessageId = MessageId(0x0010);
    pub const SHOW_WINDOW: MessageId = MessageId(0x0018);
    pub const NC_DESTROY: MessageId = MessageId(0x0082);
    /// First id available for private messages.
    pub const USER: MessageId = MessageId(0x0400);
}

/// A message as delivered by the platform.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct RawMessage {
    pub id: MessageId,
    pub wparam: usize,
    pub lparam: isize,
}

impl RawMessage {
    pub fn new(id: MessageId, wparam: usize, lparam: isize) -> Self {
        Self { id, wparam, lparam }
    }

    pub fn simple(id: MessageId) -> Self {
        Self::new(id, 0, 0)
    }
}

#[derive(Debug)]
pub enum Msg<'a> {
    Create,
    Destroy,
    NcDestroy,
    Move { x: i16, y: i16 },
    Size { width: i16, height: i16 },
    SetFocus,
    KillFocus,
    ShowWindow { visible: bool },
    SetText,
    Close,
    /// The registered message that asks the owner to drain its pending
    /// cross-thread calls.
    ThreadCallback,
    Unknown(&'a RawMessage),
}

impl<'a> Msg<'a> {
    pub fn parse(raw: &'a RawMessage, thread_callback: MessageId) -> Self {
        match raw.id {
            MessageId::CREATE => Self::Create,
            MessageId::DESTROY => Self::Destroy,
            MessageId::NC_DESTROY => Self::NcDestroy,

            MessageId::MOVE => Self::Move {
                x: get_x_lparam(raw.lparam),
                y: get_y_lparam(raw.lparam),
            },

            MessageId::SIZE => Self::Size {
                width: get_x_lparam(raw.lparam),
                height: get_y_lparam(raw.lparam),
            },

            MessageId::SET_FOCUS => Self::SetFocus,
            MessageId::KILL_FOCUS => Self::KillFocus,

            MessageId::SHOW_WINDOW => Self::ShowWindow {
                visible: raw.wparam != 0,
            },

            MessageId::SET_TEXT => Self::SetText,
            MessageId::CLOSE => Self::Close,

            id if id == thread_callback => Self::ThreadCallback,

            _ => Self::Unknown(raw),
        }
    }
}

pub(crate) fn get_x_lparam(lparam: isize) -> i16 {
    (lparam & 0xffff) as i16
}

pub(crate) fn get_y_lparam(lparam: isize) -> i16 {
    ((lparam >> 16) & 0xffff) as i16
}

pub(crate) fn make_lparam(lo: i32, hi: i32) -> isize {
    (((hi as u32 & 0xffff) << 16) | (lo as u32 & 0xffff)) as i32 as isize
}

pub(crate) fn move_message(location: Point) -> RawMessage {
    RawMessage::new(MessageId::MOVE, 0, make_lparam(location.x, location.y))
}

pub(crate) fn size_message(size: Size) -> RawMessage {
    RawMessage::new(MessageId::SIZE, 0, make_lparam(size.width, size.height))
}
