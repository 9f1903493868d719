use anyhow::{anyhow, Result};
use owned_ttf_parser::{AsFaceRef, OwnedFace};
use printpdf::font::ParsedFont;
use std::borrow::Cow;
use std::fmt;

/// The standard PDF fonts every viewer ships, used when no font file resolves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinFace {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    Courier,
}

// advance widths in 1/1000 em for ASCII 32..=126, from the Adobe core font metrics
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

impl BuiltinFace {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinFace::Helvetica => "Helvetica",
            BuiltinFace::HelveticaBold => "Helvetica-Bold",
            BuiltinFace::HelveticaOblique => "Helvetica-Oblique",
            BuiltinFace::Courier => "Courier",
        }
    }

    pub(crate) fn pdf_font(&self) -> printpdf::font::BuiltinFont {
        use printpdf::font::BuiltinFont;
        match self {
            BuiltinFace::Helvetica => BuiltinFont::Helvetica,
            BuiltinFace::HelveticaBold => BuiltinFont::HelveticaBold,
            BuiltinFace::HelveticaOblique => BuiltinFont::HelveticaOblique,
            BuiltinFace::Courier => BuiltinFont::Courier,
        }
    }

    fn advance(&self, c: char) -> u16 {
        let table = match self {
            BuiltinFace::Courier => return 600,
            BuiltinFace::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
            BuiltinFace::Helvetica | BuiltinFace::HelveticaOblique => &HELVETICA_WIDTHS,
        };
        let code = c as u32;
        if (32..=126).contains(&code) {
            table[(code - 32) as usize]
        } else {
            556
        }
    }

    fn ascender(&self) -> f32 {
        match self {
            BuiltinFace::Courier => 0.629,
            _ => 0.718,
        }
    }

    fn descender(&self) -> f32 {
        match self {
            BuiltinFace::Courier => 0.157,
            _ => 0.207,
        }
    }
}

enum Source {
    Builtin(BuiltinFace),
    Embedded {
        face: OwnedFace,
        parsed: Box<ParsedFont>,
    },
}

/// A font registered with a document, with the metrics layout needs.
pub struct Font {
    name: String,
    source: Source,
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("name", &self.name)
            .field("builtin", &self.is_builtin())
            .finish()
    }
}

impl Font {
    pub fn builtin(face: BuiltinFace) -> Font {
        Font {
            name: face.name().to_string(),
            source: Source::Builtin(face),
        }
    }

    /// Parse a TrueType/OpenType font from raw file contents.
    pub fn load<S: Into<String>>(name: S, data: Vec<u8>) -> Result<Font> {
        let name = name.into();
        let mut warnings = Vec::new();
        let parsed = ParsedFont::from_bytes(&data, 0, &mut warnings)
            .ok_or_else(|| anyhow!("Failed to parse font {name} for embedding"))?;
        let face = OwnedFace::from_vec(data, 0)
            .map_err(|e| anyhow!("Failed to parse font {name}: {e:?}"))?;
        Ok(Font {
            name,
            source: Source::Embedded {
                face,
                parsed: Box::new(parsed),
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, Source::Builtin(_))
    }

    pub fn builtin_face(&self) -> Option<BuiltinFace> {
        match self.source {
            Source::Builtin(face) => Some(face),
            Source::Embedded { .. } => None,
        }
    }

    pub(crate) fn parsed(&self) -> Option<&ParsedFont> {
        match &self.source {
            Source::Builtin(_) => None,
            Source::Embedded { parsed, .. } => Some(parsed.as_ref()),
        }
    }

    /// Advance of `c` as a fraction of the em square.
    fn advance_em(&self, c: char) -> f32 {
        match &self.source {
            Source::Builtin(face) => {
                let c = builtin_substitute(c).and_then(|s| s.chars().next()).unwrap_or(c);
                face.advance(c) as f32 / 1000.0
            }
            Source::Embedded { face, .. } => {
                let face = face.as_face_ref();
                let upem = face.units_per_em() as f32;
                face.glyph_index(c)
                    .or_else(|| face.glyph_index('?'))
                    .and_then(|g| face.glyph_hor_advance(g))
                    .map(|advance| advance as f32 / upem)
                    .unwrap_or(0.5)
            }
        }
    }

    pub fn width_of_char(&self, c: char, size: f32) -> f32 {
        self.advance_em(c) * size
    }

    pub fn ascent(&self, size: f32) -> f32 {
        match &self.source {
            Source::Builtin(face) => face.ascender() * size,
            Source::Embedded { face, .. } => {
                let face = face.as_face_ref();
                face.ascender() as f32 / face.units_per_em() as f32 * size
            }
        }
    }

    /// Distance below the baseline, as a positive number.
    pub fn descent(&self, size: f32) -> f32 {
        match &self.source {
            Source::Builtin(face) => face.descender() * size,
            Source::Embedded { face, .. } => {
                let face = face.as_face_ref();
                (face.descender() as f32).abs() / face.units_per_em() as f32 * size
            }
        }
    }

    /// Baseline-to-baseline distance for consecutive lines.
    pub fn line_height(&self, size: f32) -> f32 {
        match &self.source {
            Source::Builtin(_) => size * 1.2,
            Source::Embedded { face, .. } => {
                let face = face.as_face_ref();
                let gap = face.line_gap() as f32 / face.units_per_em() as f32 * size;
                (self.ascent(size) + self.descent(size) + gap).max(size * 1.15)
            }
        }
    }

    /// Text as the PDF writer will encode it. Built-in fonts only cover
    /// WinAnsi, so common punctuation is folded to ASCII and anything else
    /// outside Latin-1 becomes `?`.
    pub fn encodable<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if !self.is_builtin() || text.chars().all(|c| (c as u32) < 256) {
            return Cow::Borrowed(text);
        }
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if (c as u32) < 256 {
                out.push(c);
            } else if let Some(s) = builtin_substitute(c) {
                out.push_str(s);
            } else {
                out.push('?');
            }
        }
        Cow::Owned(out)
    }
}

fn builtin_substitute(c: char) -> Option<&'static str> {
    match c {
        '\u{2018}' | '\u{2019}' => Some("'"),
        '\u{201c}' | '\u{201d}' => Some("\""),
        '\u{2013}' | '\u{2014}' | '\u{2212}' => Some("-"),
        '\u{2022}' => Some("\u{b7}"),
        '\u{2026}' => Some("..."),
        '\u{2713}' | '\u{2714}' => Some("x"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_measure_builtin_fonts() {
        let courier = Font::builtin(BuiltinFace::Courier);
        assert!((courier.width_of_char('W', 10.0) - 6.0).abs() < 1e-4);
        assert!((courier.width_of_char('i', 10.0) - 6.0).abs() < 1e-4);

        let helvetica = Font::builtin(BuiltinFace::Helvetica);
        let bold = Font::builtin(BuiltinFace::HelveticaBold);
        assert!(helvetica.width_of_char('i', 10.0) < helvetica.width_of_char('W', 10.0));
        assert!(bold.width_of_char('b', 10.0) > helvetica.width_of_char('b', 10.0));
        assert!((helvetica.line_height(10.0) - 12.0).abs() < 1e-4);
    }

    #[test]
    fn can_fold_text_for_builtin_fonts() {
        let helvetica = Font::builtin(BuiltinFace::Helvetica);
        assert_eq!(helvetica.encodable("plain"), "plain");
        assert_eq!(helvetica.encodable("\u{2018}q\u{2019} \u{2026}"), "'q' ...");
        assert_eq!(helvetica.encodable("caf\u{e9} \u{4e2d}"), "caf\u{e9} ?");
    }

    #[test]
    fn rejects_garbage_font_data() {
        assert!(Font::load("garbage", vec![0, 1, 2, 3]).is_err());
    }
}
