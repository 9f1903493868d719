//! Fenced and indented code blocks.
//!
//! Code is highlighted into coloured tokens, split into its source lines and
//! wrapped between characters where a line is wider than the block. Each
//! wrapped line gets its own page break check, so a block only moves to a new
//! page when its next line would cross the content end.

use super::context::RenderContext;
use crate::document::{colours, Colour, FillLayout, Rect, SpanLayout};
use crate::fonts::FontStyle;
use crate::highlight::ColouredToken;

const CODE_BLOCK_SPACING: f32 = 8.0;
const CODE_INSET: f32 = 10.0;

/// One wrapped line of code as coloured segments.
type CodeLine = Vec<(String, Colour)>;

/// Split tokens on newlines and wrap every source line to `max_width`.
fn wrap_code_lines<F>(tokens: &[ColouredToken], max_width: f32, measure: F) -> Vec<CodeLine>
where
    F: Fn(&str) -> f32,
{
    let mut source_lines: Vec<CodeLine> = vec![Vec::new()];
    for token in tokens {
        for (i, piece) in token.text.split('\n').enumerate() {
            if i > 0 {
                source_lines.push(Vec::new());
            }
            let piece = piece.replace('\t', "    ").replace('\r', "");
            if !piece.is_empty() {
                if let Some(line) = source_lines.last_mut() {
                    line.push((piece, token.colour));
                }
            }
        }
    }
    // the final newline of a block does not start another line
    if source_lines.len() > 1 && source_lines.last().is_some_and(|l| l.is_empty()) {
        source_lines.pop();
    }

    let mut wrapped = Vec::new();
    for line in source_lines {
        let mut current: CodeLine = Vec::new();
        let mut width = 0.0;
        for (text, colour) in line {
            let mut rest = text.as_str();
            while !rest.is_empty() {
                let available = max_width - width;
                let mut fitted = 0;
                let mut fitted_width = 0.0;
                for (idx, c) in rest.char_indices() {
                    let w = measure(&rest[idx..idx + c.len_utf8()]);
                    if fitted_width + w > available && !(fitted == 0 && current.is_empty()) {
                        break;
                    }
                    fitted_width += w;
                    fitted = idx + c.len_utf8();
                }
                if fitted > 0 {
                    current.push((rest[..fitted].to_string(), colour));
                    width += fitted_width;
                    rest = &rest[fitted..];
                }
                if !rest.is_empty() {
                    wrapped.push(std::mem::take(&mut current));
                    width = 0.0;
                }
            }
        }
        wrapped.push(current);
    }
    wrapped
}

impl RenderContext<'_> {
    /// Vertical advance of one line of code.
    pub fn code_line_height(&self) -> f32 {
        let font = self.fonts.font(FontStyle::Mono);
        self.doc.font(font.id).line_height(font.size)
    }

    pub(crate) fn render_code_block(&mut self, code: &str, language: Option<&str>) {
        let tokens = match language {
            Some(language) => self.highlighter.highlight_code(code, language),
            None => match self.highlighter.detect_language(code) {
                Some(language) => self.highlighter.highlight_code(code, &language),
                None => vec![ColouredToken::plain(code)],
            },
        };

        let font = self.fonts.push_style(FontStyle::Mono);
        let face = self.doc.font(font.id);
        let left = self.text_left();
        let right = self.layout.content_right();
        let text_width = (right - left - 2.0 * CODE_INSET).max(font.size);
        let lines = wrap_code_lines(&tokens, text_width, |s| {
            s.chars().map(|c| face.width_of_char(c, font.size)).sum()
        });
        let line_height = self.code_line_height();
        let ascent = face.ascent(font.size);
        let descent = face.descent(font.size);
        let baseline_offset = ascent + (line_height - ascent - descent) / 2.0;

        self.skip(CODE_BLOCK_SPACING);
        for line in lines {
            self.ensure_space(line_height);
            let top = self.cursor_y;
            let page = self.page();
            page.add_fill(FillLayout {
                rect: Rect {
                    x1: left,
                    y1: top,
                    x2: right,
                    y2: top + line_height,
                },
                colour: colours::CODE_BACKGROUND,
            });
            let mut x = left + CODE_INSET;
            for (text, colour) in line {
                let width = {
                    let face = self.doc.font(font.id);
                    text.chars().map(|c| face.width_of_char(c, font.size)).sum::<f32>()
                };
                self.page().add_span(SpanLayout {
                    text,
                    font,
                    colour,
                    coords: (x, top + baseline_offset),
                });
                x += width;
            }
            self.cursor_y += line_height;
        }
        self.skip(CODE_BLOCK_SPACING);
        self.fonts.pop_style();
    }
}
