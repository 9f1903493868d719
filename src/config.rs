use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Title used when none is configured.
pub const UNTITLED_TITLE: &str = "Evidence Document";

/// Physical page size of the output document.
#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Debug, Default)]
pub enum PageSize {
    #[default]
    #[serde(alias = "a4")]
    A4,
    #[serde(alias = "letter")]
    Letter,
}

impl PageSize {
    /// Width and height in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::A4 => write!(f, "A4"),
            PageSize::Letter => write!(f, "Letter"),
        }
    }
}

impl FromStr for PageSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            other => Err(anyhow!("Unknown page size `{other}`, expected `A4` or `Letter`")),
        }
    }
}

/// Page margins in points (1/72 inch).
#[derive(Copy, Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn all(pt: f32) -> Margins {
        Margins {
            top: pt,
            bottom: pt,
            left: pt,
            right: pt,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Margins::all(72.0)
    }
}

/// Options for a single Markdown to PDF conversion.
///
/// Every field has a default so a partial TOML file is enough to override
/// just the settings that matter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversionOptions {
    /// Document title, shown on the title page and in page headers
    pub title: String,
    pub author: Option<String>,
    pub subject: Option<String>,
    /// Task reference shown on the title page and in the left of the header
    pub task_ref: Option<String>,
    /// Collection window shown on the title page and in the right of the header
    pub window: Option<String>,
    /// Additional key/value pairs listed on the title page
    pub metadata: BTreeMap<String, String>,

    pub page_size: PageSize,
    pub margins: Margins,

    /// Raster image (PNG/JPEG) drawn at the top of the title page
    pub header_image: Option<PathBuf>,
    /// Height of the header image in points
    pub header_image_height: f32,
    pub generate_toc: bool,
    /// Deepest heading level listed in the table of contents
    pub toc_depth: u8,
    /// Syntax highlighting theme for code blocks
    pub syntax_theme: String,
    pub show_page_numbers: bool,
    pub confidential: bool,

    /// Body font family name, or a path prefix like `./fonts/MyFont`
    pub font_family: String,
    /// Monospace font family used for code
    pub mono_font_family: String,
    pub font_size: f32,
    pub code_font_size: f32,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        ConversionOptions {
            title: String::new(),
            author: None,
            subject: None,
            task_ref: None,
            window: None,
            metadata: BTreeMap::new(),
            page_size: PageSize::A4,
            margins: Margins::default(),
            header_image: None,
            header_image_height: 100.0,
            generate_toc: true,
            toc_depth: 3,
            syntax_theme: "github".to_string(),
            show_page_numbers: true,
            confidential: true,
            font_family: "Helvetica".to_string(),
            mono_font_family: "Courier".to_string(),
            font_size: 11.0,
            code_font_size: 9.0,
        }
    }
}

impl ConversionOptions {
    /// Load options from a TOML file, filling anything missing with defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ConversionOptions> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to load {} contents", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML in {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).with_context(|| "Failed to serialize options to TOML")
    }

    /// Title to display, never empty.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED_TITLE
        } else {
            &self.title
        }
    }

    pub fn header_image_height_or_default(&self) -> f32 {
        if self.header_image_height > 0.0 {
            self.header_image_height
        } else {
            100.0
        }
    }
}
