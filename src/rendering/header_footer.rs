//! Header and footer furniture.
//!
//! Furniture is stamped in a single pass once every page exists, so footers
//! can show the final page count. Headers carry the task reference (left),
//! the document title (centre) and the collection window (right) and only
//! appear on body pages. Footers carry the generation date (left), the page
//! number (centre) and a confidentiality marker (right) and appear on every
//! page, the title page included.

use super::page_layout::PageLayout;
use crate::document::layout::width_of_text;
use crate::document::{colours, Document, Font, PageKind, RuleLayout, SpanFont, SpanLayout};
use crate::fonts::{FontManager, FontStyle};

const FURNITURE_SIZE: f32 = 9.0;
const MAX_HEADER_TITLE_CHARS: usize = 40;
const RULE_OFFSET: f32 = 12.0;
const RULE_THICKNESS: f32 = 0.5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Position {
    Left,
    Centre,
    Right,
}

/// Shorten long titles to fit the header: 37 characters plus an ellipsis.
pub fn header_title(title: &str) -> String {
    if title.chars().count() > MAX_HEADER_TITLE_CHARS {
        let mut short: String = title.chars().take(MAX_HEADER_TITLE_CHARS - 3).collect();
        short.push_str("...");
        short
    } else {
        title.to_string()
    }
}

pub fn page_label(page: usize, total: usize) -> String {
    format!("Page {page} of {total}")
}

impl PageLayout<'_> {
    fn calculate_x_position(&self, position: Position, text_width: f32) -> f32 {
        match position {
            Position::Left => self.content_left(),
            Position::Centre => self.content_left() + (self.content_width() - text_width) / 2.0,
            Position::Right => self.content_right() - text_width,
        }
    }

    fn furniture_span(
        &self,
        text: String,
        font: &Font,
        span_font: SpanFont,
        position: Position,
        baseline: f32,
    ) -> SpanLayout {
        let width = width_of_text(&text, font, span_font.size);
        SpanLayout {
            coords: (self.calculate_x_position(position, width), baseline),
            text,
            font: span_font,
            colour: colours::FURNITURE,
        }
    }

    fn furniture_rule(&self, y: f32) -> RuleLayout {
        RuleLayout {
            from: (self.content_left(), y),
            to: (self.content_right(), y),
            thickness: RULE_THICKNESS,
            colour: colours::FURNITURE_RULE,
        }
    }

    /// Header marks for one page: task left, title centre, window right, and
    /// a rule underneath.
    pub fn header(&self, font: &Font, span_font: SpanFont) -> (Vec<SpanLayout>, RuleLayout) {
        let top = self.margins().top / 2.0;
        let baseline = top + font.ascent(span_font.size);
        let opts = self.opts;

        let mut spans = Vec::new();
        let mut add = |text: Option<String>, position: Position| {
            if let Some(text) = text.filter(|t| !t.is_empty()) {
                spans.push(self.furniture_span(text, font, span_font, position, baseline));
            }
        };
        add(opts.task_ref.clone(), Position::Left);
        add(Some(header_title(opts.display_title())), Position::Centre);
        add(opts.window.clone(), Position::Right);

        (spans, self.furniture_rule(top + RULE_OFFSET))
    }

    /// Footer marks for one page: date left, page number centre,
    /// confidentiality right, and a rule above.
    pub fn footer(
        &self,
        font: &Font,
        span_font: SpanFont,
        page: usize,
        total: usize,
    ) -> (Vec<SpanLayout>, RuleLayout) {
        let top = self.height() - self.margins().bottom / 2.0;
        // descenders must stay on the page even with a tiny bottom margin
        let baseline = (top + font.ascent(span_font.size))
            .min(self.height() - font.descent(span_font.size));
        let opts = self.opts;

        let span = |text: String, position: Position| {
            self.furniture_span(text, font, span_font, position, baseline)
        };
        let mut spans = vec![span(self.generated_date(), Position::Left)];
        if opts.show_page_numbers {
            spans.push(span(page_label(page, total), Position::Centre));
        }
        if opts.confidential {
            spans.push(span("Confidential".to_string(), Position::Right));
        }

        (spans, self.furniture_rule(top - RULE_OFFSET))
    }

    /// Stamp headers and footers on every page. Must run after all content
    /// and contents pages are in their final order.
    pub fn render_furniture(&self, doc: &mut Document, fonts: &FontManager) {
        let span_font = fonts.font(FontStyle::Regular).with_size(FURNITURE_SIZE);
        let total = doc.page_count();

        let mut marks = Vec::with_capacity(total);
        {
            let font = doc.font(span_font.id);
            for (i, page) in doc.pages.iter().enumerate() {
                let mut spans = Vec::new();
                let mut rules = Vec::new();
                if page.kind == PageKind::Body {
                    let (header, rule) = self.header(font, span_font);
                    spans.extend(header);
                    rules.push(rule);
                }
                let (footer, rule) = self.footer(font, span_font, i + 1, total);
                spans.extend(footer);
                rules.push(rule);
                marks.push((spans, rules));
            }
        }

        for (page, (spans, rules)) in doc.pages.iter_mut().zip(marks) {
            page.furniture.spans = spans;
            page.furniture.rules = rules;
        }
        log::debug!("stamped furniture on {total} pages");
    }
}
