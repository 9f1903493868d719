//! The mutable state threaded through a document walk: the cursor, the page
//! being filled, pending inline runs and the block nesting that decides where
//! text starts.

use super::page_layout::PageLayout;
use super::table_of_contents::TocGenerator;
use crate::document::layout::{break_lines, width_of_text, Run};
use crate::document::{colours, Colour, Document, Page, PageKind, SpanFont, SpanLayout};
use crate::fonts::{FontManager, FontStyle};
use crate::highlight::SyntaxHighlighter;

/// Tolerance for page break decisions so content that exactly fills the
/// remaining space does not spill onto a new page.
pub(crate) const BREAK_EPSILON: f32 = 0.01;

pub(crate) const LIST_INDENT: f32 = 20.0;
pub(crate) const QUOTE_INDENT: f32 = 15.0;
const MARKER_GAP: f32 = 6.0;

pub(crate) struct ListState {
    /// Next number for ordered lists
    pub next: Option<u64>,
}

pub(crate) struct TableState {
    pub columns: usize,
    pub column: usize,
    pub row_top: f32,
}

pub(crate) struct CodeBuffer {
    pub language: Option<String>,
    pub text: String,
}

/// Tags currently open in the event stream, so each end event can be matched
/// to the start that opened it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Open {
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    List,
    Item,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Link,
    Image,
    FootnoteDefinition,
    Other,
}

pub struct RenderContext<'r> {
    pub(crate) doc: Document,
    pub(crate) fonts: FontManager,
    pub(crate) layout: &'r PageLayout<'r>,
    pub(crate) highlighter: &'r SyntaxHighlighter,
    pub(crate) toc: Option<&'r mut TocGenerator>,
    reserved_pages: usize,
    page_index: usize,
    pub(crate) cursor_y: f32,

    pub(crate) runs: Vec<Run>,
    pub(crate) pending_marker: Option<String>,
    pub(crate) lists: Vec<ListState>,
    pub(crate) quote_depth: usize,
    pub(crate) link_depth: usize,
    pub(crate) heading: Option<u8>,
    pub(crate) code: Option<CodeBuffer>,
    pub(crate) table: Option<TableState>,
    pub(crate) open: Vec<Open>,
}

impl<'r> RenderContext<'r> {
    /// Start a walk on a fresh body page. `reserved_pages` contents pages will
    /// be inserted after the title page later, and body page numbers account
    /// for them.
    pub fn new(
        doc: Document,
        fonts: FontManager,
        layout: &'r PageLayout<'r>,
        highlighter: &'r SyntaxHighlighter,
        toc: Option<&'r mut TocGenerator>,
        reserved_pages: usize,
    ) -> RenderContext<'r> {
        let mut ctx = RenderContext {
            doc,
            fonts,
            layout,
            highlighter,
            toc,
            reserved_pages,
            page_index: 0,
            cursor_y: 0.0,
            runs: Vec::new(),
            pending_marker: None,
            lists: Vec::new(),
            quote_depth: 0,
            link_depth: 0,
            heading: None,
            code: None,
            table: None,
            open: Vec::new(),
        };
        ctx.new_page();
        ctx
    }

    pub fn finish(mut self) -> (Document, FontManager) {
        self.flush_inline();
        if self.fonts.stack_depth() > 0 {
            log::debug!(
                "{} inline styles left open at end of document",
                self.fonts.stack_depth()
            );
        }
        (self.doc, self.fonts)
    }

    /// Final 1-based number of the page being filled.
    pub fn page_number(&self) -> usize {
        self.page_index + 1 + self.reserved_pages
    }

    pub fn page(&mut self) -> &mut Page {
        &mut self.doc.pages[self.page_index]
    }

    fn new_page(&mut self) {
        let page = self.layout.new_page(PageKind::Body);
        self.page_index = self.doc.add_page(page);
        self.cursor_y = self.layout.content_start_y(PageKind::Body);
    }

    fn at_page_top(&self) -> bool {
        self.cursor_y <= self.layout.content_start_y(PageKind::Body) + BREAK_EPSILON
    }

    /// Start a new page unless `needed` more points fit above the content
    /// end. A fresh page is never broken again, even if `needed` exceeds
    /// the whole band.
    pub fn ensure_space(&mut self, needed: f32) {
        let limit = self.layout.content_end_y() + BREAK_EPSILON;
        if self.cursor_y + needed > limit && !self.at_page_top() {
            log::debug!(
                "page break after page {} at y={:.1} (needed {:.1})",
                self.page_number(),
                self.cursor_y,
                needed
            );
            self.new_page();
        }
    }

    /// Move the cursor down for spacing, never past the content end.
    pub fn skip(&mut self, dy: f32) {
        if self.at_page_top() {
            return;
        }
        self.cursor_y = (self.cursor_y + dy).min(self.layout.content_end_y());
    }

    pub(crate) fn in_list_item(&self) -> bool {
        self.open.contains(&Open::Item)
    }

    /// Left edge for text at the current nesting.
    pub fn text_left(&self) -> f32 {
        self.layout.content_left()
            + self.quote_depth as f32 * QUOTE_INDENT
            + self.lists.len() as f32 * LIST_INDENT
    }

    pub(crate) fn text_width(&self) -> f32 {
        (self.layout.content_right() - self.text_left()).max(LIST_INDENT)
    }

    pub(crate) fn text_size(&self) -> f32 {
        let body = self.fonts.size_for(FontStyle::Regular);
        match self.heading {
            Some(level) => heading_size(level).max(body),
            None => body,
        }
    }

    fn run_colour(&self, base: Colour) -> Colour {
        if self.link_depth > 0 {
            colours::LINK
        } else if self.quote_depth > 0 {
            colours::QUOTE
        } else {
            base
        }
    }

    /// Queue text in the active style.
    pub(crate) fn push_text(&mut self, text: &str) {
        let font = self.fonts.current().with_size(self.text_size());
        let colour = self.run_colour(colours::TEXT);
        self.push_run(text, font, colour);
    }

    /// Queue inline code: the mono face at the surrounding size.
    pub(crate) fn push_code(&mut self, text: &str) {
        let font = self.fonts.font(FontStyle::Mono).with_size(self.text_size());
        let colour = self.run_colour(colours::INLINE_CODE);
        self.push_run(text, font, colour);
    }

    fn push_run(&mut self, text: &str, font: SpanFont, colour: Colour) {
        match self.runs.last_mut() {
            Some(last) if last.font == font && last.colour == colour => last.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_string(),
                font,
                colour,
            }),
        }
    }

    /// Lay out queued runs as wrapped lines at the cursor, breaking pages
    /// between lines as needed. A pending list marker goes on the first line.
    pub fn flush_inline(&mut self) {
        if self.runs.is_empty() && self.pending_marker.is_none() {
            return;
        }
        let runs = std::mem::take(&mut self.runs);
        let left = self.text_left();
        let lines = break_lines(&self.doc, &runs, self.text_width());

        if lines.is_empty() {
            if let Some(marker) = self.pending_marker.take() {
                let font = self.fonts.font(FontStyle::Regular);
                let height = self.doc.font(font.id).line_height(font.size);
                self.ensure_space(height);
                let baseline = self.cursor_y + self.doc.font(font.id).ascent(font.size);
                self.draw_marker(marker, left, baseline);
                self.cursor_y += height;
            }
            return;
        }

        for line in lines {
            let height = line.height(&self.doc);
            self.ensure_space(height);
            let baseline = self.cursor_y + line.ascent(&self.doc);
            if let Some(marker) = self.pending_marker.take() {
                self.draw_marker(marker, left, baseline);
            }
            let page = &mut self.doc.pages[self.page_index];
            for span in line.spans {
                page.add_span(SpanLayout {
                    text: span.text,
                    font: span.font,
                    colour: span.colour,
                    coords: (left + span.x, baseline),
                });
            }
            self.cursor_y += height;
        }
    }

    fn draw_marker(&mut self, marker: String, left: f32, baseline: f32) {
        let font = self.fonts.font(FontStyle::Regular);
        let width = width_of_text(&marker, self.doc.font(font.id), font.size);
        let x = (left - width - MARKER_GAP).max(self.layout.content_left());
        self.page().add_span(SpanLayout {
            text: marker,
            font,
            colour: colours::TEXT,
            coords: (x, baseline),
        });
    }

    /// Record the current position against the next contents entry.
    pub(crate) fn stamp_heading(&mut self, level: u8) {
        let page = self.page_number();
        let y = self.cursor_y;
        if let Some(toc) = self.toc.as_deref_mut() {
            if toc.includes_level(level) && !toc.stamp_next(page, y) {
                log::debug!("heading on page {page} has no contents entry left to stamp");
            }
        }
    }
}

/// Font size for a heading level: 16pt for level 1 down to 11pt.
pub fn heading_size(level: u8) -> f32 {
    (18.0 - level as f32 * 2.0).max(11.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_size_headings() {
        assert_eq!(heading_size(1), 16.0);
        assert_eq!(heading_size(2), 14.0);
        assert_eq!(heading_size(3), 12.0);
        assert_eq!(heading_size(4), 11.0);
        assert_eq!(heading_size(6), 11.0);
    }
}
