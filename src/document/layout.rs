//! Text measurement and line breaking.

use super::{Colour, Document, Font, SpanFont};

pub fn width_of_text(text: &str, font: &Font, size: f32) -> f32 {
    text.chars().map(|c| font.width_of_char(c, size)).sum()
}

/// Shorten `text` with a trailing ellipsis until it fits in `max_width`.
pub fn truncate_to_width(text: &str, font: &Font, size: f32, max_width: f32) -> String {
    if width_of_text(text, font, size) <= max_width {
        return text.to_string();
    }
    let ellipsis = "...";
    let budget = max_width - width_of_text(ellipsis, font, size);
    let mut out = String::new();
    let mut width = 0.0;
    for c in text.chars() {
        let w = font.width_of_char(c, size);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(c);
    }
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push_str(ellipsis);
    out
}

/// A piece of styled text waiting to be laid out.
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub text: String,
    pub font: SpanFont,
    pub colour: Colour,
}

/// A span within a laid out line, positioned relative to the line start.
#[derive(Clone, Debug, PartialEq)]
pub struct LineSpan {
    pub x: f32,
    pub text: String,
    pub font: SpanFont,
    pub colour: Colour,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub spans: Vec<LineSpan>,
    pub width: f32,
    /// Largest font size that touched this line, even if it holds no text.
    pub size: f32,
    sized_by: Option<SpanFont>,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn touch(&mut self, font: SpanFont) {
        if self.sized_by.map_or(true, |f| font.size > f.size) {
            self.sized_by = Some(font);
            self.size = font.size;
        }
    }

    fn push(&mut self, text: &str, width: f32, font: SpanFont, colour: Colour) {
        self.touch(font);
        if let Some(last) = self.spans.last_mut() {
            if last.font == font && last.colour == colour {
                last.text.push_str(text);
                self.width += width;
                return;
            }
        }
        self.spans.push(LineSpan {
            x: self.width,
            text: text.to_string(),
            font,
            colour,
        });
        self.width += width;
    }

    fn trim_end(&mut self, doc: &Document) {
        if let Some(last) = self.spans.last_mut() {
            let trimmed = last.text.trim_end().len();
            if trimmed < last.text.len() {
                let font = doc.font(last.font.id);
                let removed = width_of_text(&last.text[trimmed..], font, last.font.size);
                last.text.truncate(trimmed);
                self.width -= removed;
            }
        }
    }

    /// Distance from the top of the line to its baseline.
    pub fn ascent(&self, doc: &Document) -> f32 {
        let fallback = self
            .sized_by
            .map(|f| doc.font(f.id).ascent(f.size))
            .unwrap_or(0.0);
        self.spans
            .iter()
            .map(|s| doc.font(s.font.id).ascent(s.font.size))
            .fold(fallback, f32::max)
    }

    pub fn height(&self, doc: &Document) -> f32 {
        let fallback = self
            .sized_by
            .map(|f| doc.font(f.id).line_height(f.size))
            .unwrap_or(0.0);
        self.spans
            .iter()
            .map(|s| doc.font(s.font.id).line_height(s.font.size))
            .fold(fallback, f32::max)
    }
}

/// Greedy word wrap of styled runs into lines no wider than `max_width`.
///
/// Newlines inside a run force a break. Words wider than a whole line are
/// split between characters.
pub fn break_lines(doc: &Document, runs: &[Run], max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::default();

    for run in runs {
        let font = doc.font(run.font.id);
        for (i, segment) in run.text.split('\n').enumerate() {
            if i > 0 {
                current.touch(run.font);
                current.trim_end(doc);
                lines.push(std::mem::take(&mut current));
            }
            for word in segment.split_inclusive(' ') {
                let word = if current.is_empty() {
                    word.trim_start()
                } else {
                    word
                };
                if word.is_empty() {
                    continue;
                }

                let visible = width_of_text(word.trim_end(), font, run.font.size);
                if !current.is_empty() && current.width + visible > max_width {
                    current.trim_end(doc);
                    lines.push(std::mem::take(&mut current));
                }

                let word = if current.is_empty() {
                    word.trim_start()
                } else {
                    word
                };
                let width = width_of_text(word, font, run.font.size);
                if current.is_empty() && visible > max_width {
                    split_long_word(doc, &mut lines, &mut current, word, run, max_width);
                } else {
                    current.push(word, width, run.font, run.colour);
                }
            }
        }
    }

    if !current.is_empty() {
        current.trim_end(doc);
        lines.push(current);
    }
    lines
}

fn split_long_word(
    doc: &Document,
    lines: &mut Vec<Line>,
    current: &mut Line,
    word: &str,
    run: &Run,
    max_width: f32,
) {
    let font = doc.font(run.font.id);
    let mut piece = String::new();
    let mut width = 0.0;
    for c in word.chars() {
        let w = font.width_of_char(c, run.font.size);
        if !piece.is_empty() && width + w > max_width {
            current.push(&piece, width, run.font, run.colour);
            lines.push(std::mem::take(current));
            piece.clear();
            width = 0.0;
        }
        piece.push(c);
        width += w;
    }
    if !piece.is_empty() {
        current.push(&piece, width, run.font, run.colour);
    }
}
