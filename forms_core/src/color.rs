/// A color in the native `0x00BBGGRR` layout.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct ColorRef(u32);

impl ColorRef {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> ColorRef {
        ColorRef((r as u32) | ((g as u32) << 8) | ((b as u32) << 16))
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// R is in the low byte.
    pub const fn from_u32_bgr(u: u32) -> Self {
        Self(u & 0x00ff_ffff)
    }

    /// Bits 24..31 are ignored.
    /// Bits 16..23 are R
    /// Bits 8..15 are G
    /// Bits 0..7 are B
    pub const fn from_u32_rgb(u: u32) -> Self {
        let u = ((u >> 16) & 0xff) // R
        | (u & 0xff00) // G
        | ((u & 0xff) << 16);
        Self(u)
    }

    pub const fn r(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub const fn b(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }
}

impl core::fmt::Debug for ColorRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

macro_rules! well_known_colors {
    (
        $($name:ident = $hex:expr,)*
    ) => {
        impl ColorRef {
            $(
                pub const $name: ColorRef = ColorRef::from_u32_rgb($hex);
            )*
        }
    }
}

well_known_colors! {
    BLACK = 0x00_00_00,
    WHITE = 0xff_ff_ff,
    RED = 0xff_00_00,
    GREEN = 0x00_ff_00,
    BLUE = 0x00_00_ff,
    CONTROL = 0xf0_f0_f0,
    CONTROL_TEXT = 0x00_00_00,
}
