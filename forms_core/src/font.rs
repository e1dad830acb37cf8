use std::rc::Rc;

/// A logical font description. Backends turn it into a native font object
/// when it is applied to a window.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Font {
    face_name: String,
    height: i32,
    width: i32,
    italic: bool,
    underline: bool,
    strikeout: bool,
    quality: FontQuality,
}

impl Font {
    pub fn new(font_family: &str, height: i32) -> Rc<Font> {
        Self::builder(font_family, height).build()
    }

    pub fn builder(face_name: &str, height: i32) -> FontBuilder<'_> {
        FontBuilder {
            height,
            width: 0,
            face_name,
            italic: false,
            underline: false,
            strikeout: false,
            quality: FontQuality::ClearType,
        }
    }

    /// The font used when neither the control, its ancestors nor its site
    /// supply one.
    pub fn default_font() -> Rc<Font> {
        Font::new("Segoe UI", 15)
    }

    pub fn face_name(&self) -> &str {
        &self.face_name
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn is_italic(&self) -> bool {
        self.italic
    }

    pub fn is_underline(&self) -> bool {
        self.underline
    }

    pub fn is_strikeout(&self) -> bool {
        self.strikeout
    }

    pub fn quality(&self) -> FontQuality {
        self.quality
    }
}

pub struct FontBuilder<'a> {
    height: i32,
    width: i32,
    face_name: &'a str,
    italic: bool,
    underline: bool,
    strikeout: bool,
    quality: FontQuality,
}

impl<'a> FontBuilder<'a> {
    pub fn build(&self) -> Rc<Font> {
        Rc::new(Font {
            face_name: self.face_name.to_string(),
            height: self.height,
            width: self.width,
            italic: self.italic,
            underline: self.underline,
            strikeout: self.strikeout,
            quality: self.quality,
        })
    }

    pub fn width(&mut self, width: i32) -> &mut Self {
        self.width = width;
        self
    }

    pub fn italic(&mut self) -> &mut Self {
        self.italic = true;
        self
    }

    pub fn underline(&mut self) -> &mut Self {
        self.underline = true;
        self
    }

    pub fn strikeout(&mut self) -> &mut Self {
        self.strikeout = true;
        self
    }

    pub fn quality(&mut self, quality: FontQuality) -> &mut Self {
        self.quality = quality;
        self
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FontQuality {
    AntiAliased,
    ClearType,
    Default,
    Draft,
    NonAntiAliased,
    Proof,
}

impl FontQuality {
    /// The `*_QUALITY` value the native font API expects.
    pub fn to_native(self) -> u32 {
        match self {
            FontQuality::Default => 0,
            FontQuality::Draft => 1,
            FontQuality::Proof => 2,
            FontQuality::NonAntiAliased => 3,
            FontQuality::AntiAliased => 4,
            FontQuality::ClearType => 5,
        }
    }
}
