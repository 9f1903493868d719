//! In-memory page model.
//!
//! Everything is laid out in points with the origin at the top left of the
//! page and Y growing downwards; the writer flips coordinates when lowering to
//! PDF operations.

mod font;
pub mod layout;
mod writer;

pub use font::{BuiltinFace, Font};

/// An RGB colour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const fn new_rgb_bytes(r: u8, g: u8, b: u8) -> Colour {
        Colour { r, g, b }
    }

    pub const fn new_grey(v: u8) -> Colour {
        Colour { r: v, g: v, b: v }
    }
}

pub mod colours {
    use super::Colour;

    pub const BLACK: Colour = Colour::new_grey(0);
    pub const TEXT: Colour = Colour::new_grey(30);
    pub const FURNITURE: Colour = Colour::new_grey(128);
    pub const FURNITURE_RULE: Colour = Colour::new_grey(200);
    pub const RULE: Colour = Colour::new_grey(191);
    pub const QUOTE: Colour = Colour::new_grey(100);
    pub const LINK: Colour = Colour::new_rgb_bytes(3, 102, 214);
    pub const INLINE_CODE: Colour = Colour::new_rgb_bytes(175, 40, 80);
    pub const CODE_BACKGROUND: Colour = Colour::new_rgb_bytes(246, 248, 250);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontId(usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(usize);

/// A font reference at a specific size.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpanFont {
    pub id: FontId,
    pub size: f32,
}

impl SpanFont {
    pub fn with_size(self, size: f32) -> SpanFont {
        SpanFont { id: self.id, size }
    }
}

/// A run of text positioned by the left end of its baseline.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanLayout {
    pub text: String,
    pub font: SpanFont,
    pub colour: Colour,
    pub coords: (f32, f32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleLayout {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub thickness: f32,
    pub colour: Colour,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FillLayout {
    pub rect: Rect,
    pub colour: Colour,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageLayout {
    pub image: ImageId,
    pub position: Rect,
}

/// What a page is for; decides which furniture it receives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PageKind {
    Title,
    Contents,
    Body,
}

/// Header and footer marks, kept apart from the page content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Furniture {
    pub spans: Vec<SpanLayout>,
    pub rules: Vec<RuleLayout>,
}

#[derive(Clone, Debug)]
pub struct Page {
    pub kind: PageKind,
    pub width: f32,
    pub height: f32,
    pub fills: Vec<FillLayout>,
    pub images: Vec<ImageLayout>,
    pub rules: Vec<RuleLayout>,
    pub spans: Vec<SpanLayout>,
    pub furniture: Furniture,
}

impl Page {
    pub fn new(kind: PageKind, width: f32, height: f32) -> Page {
        Page {
            kind,
            width,
            height,
            fills: Vec::new(),
            images: Vec::new(),
            rules: Vec::new(),
            spans: Vec::new(),
            furniture: Furniture::default(),
        }
    }

    pub fn add_span(&mut self, span: SpanLayout) {
        self.spans.push(span);
    }

    pub fn add_rule(&mut self, rule: RuleLayout) {
        self.rules.push(rule);
    }

    pub fn add_fill(&mut self, fill: FillLayout) {
        self.fills.push(fill);
    }

    pub fn add_image(&mut self, image: ImageLayout) {
        self.images.push(image);
    }

    /// Content text in drawing order, one span per line.
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<&str>>()
            .join("\n")
    }

    pub fn furniture_text(&self) -> String {
        self.furniture
            .spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<&str>>()
            .join("\n")
    }
}

/// A decoded raster image and its pixel dimensions.
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub(crate) raw: printpdf::image::RawImage,
}

impl Image {
    /// Decode PNG or JPEG bytes.
    pub fn decode(bytes: &[u8]) -> anyhow::Result<Image> {
        let mut warnings = Vec::new();
        let raw = printpdf::image::RawImage::decode_from_bytes(bytes, &mut warnings)
            .map_err(|e| anyhow::anyhow!("Failed to decode image: {e}"))?;
        Ok(Image {
            width: raw.width as u32,
            height: raw.height as u32,
            raw,
        })
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Info {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// A document under construction: registered fonts and images plus pages in
/// final order.
pub struct Document {
    pub info: Info,
    fonts: Vec<Font>,
    images: Vec<Image>,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(info: Info) -> Document {
        Document {
            info,
            fonts: Vec::new(),
            images: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn add_font(&mut self, font: Font) -> FontId {
        self.fonts.push(font);
        FontId(self.fonts.len() - 1)
    }

    pub fn font(&self, id: FontId) -> &Font {
        &self.fonts[id.0]
    }

    pub fn add_image(&mut self, image: Image) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    /// Append a page, returning its index.
    pub fn add_page(&mut self, page: Page) -> usize {
        self.pages.push(page);
        self.pages.len() - 1
    }

    /// Insert pages so the first of them lands at `index`.
    pub fn insert_pages(&mut self, index: usize, pages: Vec<Page>) {
        let index = index.min(self.pages.len());
        self.pages.splice(index..index, pages);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
