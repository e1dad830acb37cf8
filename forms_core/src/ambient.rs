//! Ambient properties: values a control inherits from its parent or its
//! site when it has not been given its own.

use crate::{ColorRef, Error, Font};
use std::rc::Rc;

/// A design host or container that can supply ambient values. Every method
/// has a "no opinion" default, in which case the static defaults apply.
pub trait Site {
    fn name(&self) -> Option<String> {
        None
    }

    fn design_mode(&self) -> bool {
        false
    }

    fn ambient_font(&self) -> Option<Rc<Font>> {
        None
    }

    fn ambient_back_color(&self) -> Option<ColorRef> {
        None
    }

    fn ambient_fore_color(&self) -> Option<ColorRef> {
        None
    }

    fn ambient_cursor(&self) -> Option<Cursor> {
        None
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AmbientProperty {
    Font,
    BackColor,
    ForeColor,
    Cursor,
}

macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $value:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        #[repr(i32)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl TryFrom<i32> for $name {
            type Error = Error;

            fn try_from(value: i32) -> Result<Self, Error> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    _ => Err(Error::InvalidEnumArgument {
                        name: stringify!($name),
                        value,
                    }),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                value as i32
            }
        }
    };
}

int_enum! {
    pub enum Cursor {
        Default = 0,
        Arrow = 1,
        IBeam = 2,
        Wait = 3,
        Hand = 4,
        SizeAll = 5,
    }
}

int_enum! {
    /// Whether the control lays out its contents right to left. Changing it
    /// on a live control recreates the handle, since mirroring is fixed when
    /// a native window is created.
    pub enum RightToLeft {
        No = 0,
        Yes = 1,
        Inherit = 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_round_into_enums() {
        assert_eq!(RightToLeft::try_from(1).unwrap(), RightToLeft::Yes);
        assert_eq!(i32::from(Cursor::Hand), 4);
        match Cursor::try_from(42) {
            Err(Error::InvalidEnumArgument { name, value }) => {
                assert_eq!(name, "Cursor");
                assert_eq!(value, 42);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
