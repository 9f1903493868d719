//! Font resolution and the inline style stack.
//!
//! Fonts are looked up by family name in the usual system font directories,
//! or loaded from a path prefix using the `{base}-{Variant}.ttf` naming
//! convention. Anything that fails to resolve falls back to the built-in PDF
//! fonts, so there is always a usable font for every style.

use crate::document::{BuiltinFace, Document, Font, FontId, SpanFont};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const FONT_DIRECTORIES: &[&str] = &[
    "/usr/share/fonts",
    "/usr/local/share/fonts",
    "~/.fonts",
    "~/.local/share/fonts",
    "/System/Library/Fonts",
    "/Library/Fonts",
    "~/Library/Fonts",
    "C:\\Windows\\Fonts",
];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Well-known substitutes for the PDF base font names, which are rarely
/// installed as files under their own names.
fn family_aliases(family: &str) -> Vec<String> {
    let aliases: &[&str] = match family.to_ascii_lowercase().as_str() {
        "helvetica" | "sans" | "sans-serif" => &["Arial", "Liberation Sans", "DejaVu Sans"],
        "courier" | "courier new" | "monospace" | "mono" => {
            &["Courier New", "Liberation Mono", "DejaVu Sans Mono"]
        }
        "times" | "times new roman" | "serif" => &["Liberation Serif", "DejaVu Serif"],
        _ => &[],
    };
    std::iter::once(family.to_string())
        .chain(aliases.iter().map(|a| a.to_string()))
        .collect()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
    Mono,
}

impl FontStyle {
    const ALL: [FontStyle; 4] = [
        FontStyle::Regular,
        FontStyle::Bold,
        FontStyle::Italic,
        FontStyle::Mono,
    ];

    fn index(self) -> usize {
        match self {
            FontStyle::Regular => 0,
            FontStyle::Bold => 1,
            FontStyle::Italic => 2,
            FontStyle::Mono => 3,
        }
    }

    fn variant_names(self) -> &'static [&'static str] {
        match self {
            FontStyle::Regular | FontStyle::Mono => &["Regular", "", "Book", "Roman"],
            FontStyle::Bold => &["Bold"],
            FontStyle::Italic => &["Italic", "It", "Oblique"],
        }
    }

    fn builtin(self) -> BuiltinFace {
        match self {
            FontStyle::Regular => BuiltinFace::Helvetica,
            FontStyle::Bold => BuiltinFace::HelveticaBold,
            FontStyle::Italic => BuiltinFace::HelveticaOblique,
            FontStyle::Mono => BuiltinFace::Courier,
        }
    }
}

/// An index of font files found under the system font directories, keyed by
/// lower-cased file name.
#[derive(Debug, Default)]
pub struct FontLocator {
    files: HashMap<String, PathBuf>,
}

impl FontLocator {
    pub fn scan_system() -> FontLocator {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let dirs = FONT_DIRECTORIES.iter().filter_map(|dir| match dir.strip_prefix("~/") {
            Some(rest) => home.as_ref().map(|home| home.join(rest)),
            None => Some(PathBuf::from(dir)),
        });
        FontLocator::scan(dirs)
    }

    pub fn scan<I: IntoIterator<Item = PathBuf>>(dirs: I) -> FontLocator {
        let mut files = HashMap::new();
        for dir in dirs {
            if !dir.is_dir() {
                continue;
            }
            let walk = ignore::WalkBuilder::new(&dir)
                .standard_filters(false)
                .follow_links(true)
                .max_depth(Some(6))
                .build();
            for entry in walk.flatten() {
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let is_font = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
                if !is_font {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    files
                        .entry(name.to_ascii_lowercase())
                        .or_insert_with(|| entry.path().to_path_buf());
                }
            }
        }
        log::debug!("indexed {} font files", files.len());
        FontLocator { files }
    }

    /// Find a file for `family` in the given style, trying the common
    /// `Family-Bold`, `FamilyBold`, and `Family Bold` spellings.
    pub fn find(&self, family: &str, style: FontStyle) -> Option<PathBuf> {
        for family in family_aliases(family) {
            let compact: String = family.chars().filter(|c| !c.is_whitespace()).collect();
            let mut bases = vec![family.clone()];
            if compact != family {
                bases.push(compact);
            }
            for base in bases.iter() {
                for variant in style.variant_names() {
                    for stem in variant_stems(base, variant) {
                        for ext in FONT_EXTENSIONS {
                            let name = format!("{stem}.{ext}").to_ascii_lowercase();
                            if let Some(path) = self.files.get(&name) {
                                return Some(path.clone());
                            }
                        }
                    }
                }
            }
        }
        None
    }
}

fn variant_stems(base: &str, variant: &str) -> Vec<String> {
    if variant.is_empty() {
        vec![base.to_string()]
    } else {
        vec![
            format!("{base}-{variant}"),
            format!("{base}{variant}"),
            format!("{base} {variant}"),
            format!("{base}_{variant}"),
        ]
    }
}

fn is_path_like(family: &str) -> bool {
    family.contains('/') || family.contains('\\')
}

/// Resolve a path-prefix family like `./fonts/MyFont` to
/// `./fonts/MyFont-Regular.ttf` and friends.
fn find_prefixed_font_file(base: &Path, style: FontStyle) -> Option<PathBuf> {
    let has_font_extension = base
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
    if has_font_extension {
        // a direct file can only stand in for its own style
        return match style {
            FontStyle::Regular | FontStyle::Mono if base.exists() => Some(base.to_path_buf()),
            _ => None,
        };
    }

    for variant in style.variant_names() {
        for ext in FONT_EXTENSIONS {
            let path = if variant.is_empty() {
                base.with_extension(ext)
            } else {
                PathBuf::from(format!("{}-{}.{}", base.display(), variant, ext))
            };
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

fn load_font_file(path: &Path) -> Result<Font> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read font file: {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Font::load(name, data).with_context(|| format!("Failed to parse font file: {}", path.display()))
}

/// Owns the fonts registered for one document and tracks the active style.
#[derive(Debug)]
pub struct FontManager {
    loaded: [Option<FontId>; 4],
    builtin: [FontId; 4],
    current: FontStyle,
    stack: Vec<FontStyle>,
    body_size: f32,
    code_size: f32,
}

impl FontManager {
    /// Register the built-in fallbacks with `doc`. No font files are loaded
    /// until [`FontManager::load_fonts`] is called.
    pub fn new(doc: &mut Document, body_size: f32, code_size: f32) -> FontManager {
        let builtin = FontStyle::ALL.map(|style| doc.add_font(Font::builtin(style.builtin())));
        FontManager {
            loaded: [None; 4],
            builtin,
            current: FontStyle::Regular,
            stack: Vec::new(),
            body_size,
            code_size,
        }
    }

    /// Resolve and load the four styles from the system font directories.
    /// Failures are logged and leave that style on its fallback.
    pub fn load_fonts(&mut self, doc: &mut Document, family: &str, mono_family: &str) {
        let needs_locator = !is_path_like(family) || !is_path_like(mono_family);
        let locator = if needs_locator {
            FontLocator::scan_system()
        } else {
            FontLocator::default()
        };
        self.load_fonts_with(doc, &locator, family, mono_family);
    }

    pub fn load_fonts_with(
        &mut self,
        doc: &mut Document,
        locator: &FontLocator,
        family: &str,
        mono_family: &str,
    ) {
        for style in FontStyle::ALL {
            let family = match style {
                FontStyle::Mono => mono_family,
                _ => family,
            };
            let path = if is_path_like(family) {
                find_prefixed_font_file(Path::new(family), style)
            } else {
                locator.find(family, style)
            };
            let Some(path) = path else {
                log::debug!("no {style:?} font file found for family `{family}`");
                continue;
            };
            match load_font_file(&path) {
                Ok(font) => {
                    log::debug!("loaded {style:?} font from {}", path.display());
                    self.loaded[style.index()] = Some(doc.add_font(font));
                }
                Err(e) => log::warn!("Skipping font {}: {e:#}", path.display()),
            }
        }

        if self.loaded.iter().all(Option::is_none) {
            log::warn!(
                "No fonts could be loaded for `{family}` / `{mono_family}`, using the built-in PDF fonts"
            );
        }
    }

    pub fn is_loaded(&self, style: FontStyle) -> bool {
        self.loaded[style.index()].is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.iter().filter(|f| f.is_some()).count()
    }

    /// Resolve `style` to a registered font. Bold and italic fall back to the
    /// loaded regular face, then to their built-in face. Regular and mono go
    /// straight to their built-in face, so code never ends up in a
    /// proportional font.
    pub fn font_id(&self, style: FontStyle) -> FontId {
        if let Some(id) = self.loaded[style.index()] {
            return id;
        }
        let regular_stand_in = match style {
            FontStyle::Bold | FontStyle::Italic => self.loaded[FontStyle::Regular.index()],
            FontStyle::Regular | FontStyle::Mono => None,
        };
        regular_stand_in.unwrap_or(self.builtin[style.index()])
    }

    pub fn size_for(&self, style: FontStyle) -> f32 {
        match style {
            FontStyle::Mono => self.code_size,
            _ => self.body_size,
        }
    }

    /// The font for `style` at its configured size.
    pub fn font(&self, style: FontStyle) -> SpanFont {
        SpanFont {
            id: self.font_id(style),
            size: self.size_for(style),
        }
    }

    pub fn style(&self) -> FontStyle {
        self.current
    }

    pub fn current(&self) -> SpanFont {
        self.font(self.current)
    }

    /// Make `style` the active style. Setting the same style twice is a no-op.
    pub fn set_style(&mut self, style: FontStyle) -> SpanFont {
        self.current = style;
        self.current()
    }

    pub fn push_style(&mut self, style: FontStyle) -> SpanFont {
        self.stack.push(self.current);
        self.set_style(style)
    }

    /// Return to the style active before the last push; the base is regular.
    pub fn pop_style(&mut self) -> SpanFont {
        let previous = self.stack.pop().unwrap_or(FontStyle::Regular);
        self.set_style(previous)
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Bullet glyph for unordered lists; the built-in fonts lack U+2022.
    pub fn bullet(&self, doc: &Document) -> &'static str {
        if doc.font(self.font_id(FontStyle::Regular)).is_builtin() {
            "-"
        } else {
            "\u{2022}"
        }
    }
}
