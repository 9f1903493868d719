//! Dispatch of Markdown events onto the render context.

use super::context::{CodeBuffer, ListState, Open, RenderContext, TableState};
use crate::document::layout::truncate_to_width;
use crate::document::{colours, RuleLayout, SpanLayout};
use crate::fonts::FontStyle;
use crate::markdown::{fence_language, heading_level};
use anyhow::Result;
use pulldown_cmark::{CodeBlockKind, Event, Tag};

const HEADING_SPACE_BEFORE: f32 = 12.0;
const HEADING_SPACE_AFTER: f32 = 8.0;
const HEADING_BREAK_CHECK: f32 = 40.0;
const PARAGRAPH_SPACING: f32 = 6.0;
const BLOCK_BREAK_CHECK: f32 = 20.0;
const LIST_SPACING: f32 = 4.0;
const ITEM_SPACING: f32 = 2.0;
const RULE_SPACE: f32 = 12.0;
const TABLE_SPACING: f32 = 8.0;
const TABLE_ROW_HEIGHT: f32 = 16.0;
const TABLE_CELL_PADDING: f32 = 4.0;

impl RenderContext<'_> {
    /// Apply one event to the document.
    pub fn render_event(&mut self, event: &Event<'_>) -> Result<()> {
        if let Some(code) = self.code.as_mut() {
            match event {
                Event::Text(text) => {
                    code.text.push_str(text);
                    return Ok(());
                }
                Event::End(_) => {}
                _ => return Ok(()),
            }
        }

        match event {
            Event::Start(tag) => self.enter(tag),
            Event::End(_) => self.exit(),
            Event::Text(text) => self.push_text(text),
            Event::Code(text) => self.push_code(text),
            Event::InlineMath(text) | Event::DisplayMath(text) => self.push_code(text),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => {
                if self.table.is_some() {
                    self.push_text(" ");
                } else {
                    self.push_text("\n");
                }
            }
            Event::TaskListMarker(checked) => {
                self.push_text(if *checked { "[x] " } else { "[ ] " });
            }
            Event::FootnoteReference(label) => self.push_text(&format!("[{label}]")),
            Event::Rule => self.horizontal_rule(),
            other => {
                log::debug!("skipping {other:?} on page {}", self.page_number());
            }
        }
        Ok(())
    }

    fn enter(&mut self, tag: &Tag<'_>) {
        let open = match tag {
            Tag::Paragraph => {
                if self.table.is_none() {
                    if !self.in_list_item() {
                        self.skip(PARAGRAPH_SPACING);
                    }
                    self.ensure_space(BLOCK_BREAK_CHECK);
                }
                Open::Paragraph
            }
            Tag::Heading { level, .. } => {
                let level = heading_level(*level);
                self.flush_inline();
                self.skip(HEADING_SPACE_BEFORE);
                self.ensure_space(HEADING_BREAK_CHECK);
                self.stamp_heading(level);
                self.heading = Some(level);
                self.fonts.push_style(FontStyle::Bold);
                Open::Heading
            }
            Tag::BlockQuote(..) => {
                self.flush_inline();
                self.skip(LIST_SPACING);
                self.quote_depth += 1;
                Open::BlockQuote
            }
            Tag::CodeBlock(kind) => {
                self.flush_inline();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => fence_language(info).map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(CodeBuffer {
                    language,
                    text: String::new(),
                });
                Open::CodeBlock
            }
            Tag::List(start) => {
                self.flush_inline();
                if self.lists.is_empty() {
                    self.skip(LIST_SPACING);
                }
                self.lists.push(ListState { next: *start });
                Open::List
            }
            Tag::Item => {
                self.flush_inline();
                self.ensure_space(BLOCK_BREAK_CHECK);
                let marker = match self.lists.last_mut().and_then(|list| list.next.as_mut()) {
                    Some(n) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    None => self.fonts.bullet(&self.doc).to_string(),
                };
                self.pending_marker = Some(marker);
                Open::Item
            }
            Tag::Table(alignments) => {
                self.flush_inline();
                self.skip(TABLE_SPACING);
                self.table = Some(TableState {
                    columns: alignments.len().max(1),
                    column: 0,
                    row_top: self.cursor_y,
                });
                Open::Table
            }
            Tag::TableHead => {
                self.fonts.push_style(FontStyle::Bold);
                self.start_row();
                Open::TableHead
            }
            Tag::TableRow => {
                self.start_row();
                Open::TableRow
            }
            Tag::TableCell => {
                self.runs.clear();
                Open::TableCell
            }
            Tag::Emphasis => {
                self.fonts.push_style(FontStyle::Italic);
                Open::Emphasis
            }
            Tag::Strong => {
                self.fonts.push_style(FontStyle::Bold);
                Open::Strong
            }
            Tag::Link { .. } => {
                self.link_depth += 1;
                Open::Link
            }
            Tag::Image { .. } => {
                self.fonts.push_style(FontStyle::Italic);
                self.push_text("[image: ");
                Open::Image
            }
            Tag::FootnoteDefinition(label) => {
                self.flush_inline();
                self.skip(PARAGRAPH_SPACING);
                self.push_text(&format!("[{label}] "));
                Open::FootnoteDefinition
            }
            _ => Open::Other,
        };
        self.open.push(open);
    }

    fn exit(&mut self) {
        let Some(open) = self.open.pop() else {
            log::debug!("unbalanced end event");
            return;
        };
        match open {
            Open::Paragraph => {
                if self.table.is_none() {
                    self.flush_inline();
                    if self.in_list_item() {
                        self.skip(ITEM_SPACING);
                    } else {
                        self.skip(PARAGRAPH_SPACING);
                    }
                }
            }
            Open::Heading => {
                self.flush_inline();
                self.fonts.pop_style();
                self.heading = None;
                self.skip(HEADING_SPACE_AFTER);
            }
            Open::BlockQuote => {
                self.flush_inline();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.skip(LIST_SPACING);
            }
            Open::CodeBlock => {
                if let Some(code) = self.code.take() {
                    self.render_code_block(&code.text, code.language.as_deref());
                }
            }
            Open::List => {
                self.flush_inline();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.skip(LIST_SPACING);
                }
            }
            Open::Item => {
                self.flush_inline();
                self.skip(ITEM_SPACING);
            }
            Open::Table => {
                self.table = None;
                self.skip(TABLE_SPACING);
            }
            Open::TableHead => {
                self.end_row();
                self.fonts.pop_style();
                let y = self.cursor_y - TABLE_CELL_PADDING / 2.0;
                let (from, to) = (self.text_left(), self.layout.content_right());
                self.page().add_rule(RuleLayout {
                    from: (from, y),
                    to: (to, y),
                    thickness: 0.75,
                    colour: colours::RULE,
                });
            }
            Open::TableRow => self.end_row(),
            Open::TableCell => {
                self.draw_cell();
                if let Some(table) = self.table.as_mut() {
                    table.column += 1;
                }
            }
            Open::Emphasis | Open::Strong => {
                self.fonts.pop_style();
            }
            Open::Link => {
                self.link_depth = self.link_depth.saturating_sub(1);
            }
            Open::Image => {
                self.push_text("]");
                self.fonts.pop_style();
            }
            Open::FootnoteDefinition => self.flush_inline(),
            Open::Other => {}
        }
    }

    fn horizontal_rule(&mut self) {
        self.flush_inline();
        self.ensure_space(RULE_SPACE);
        let y = self.cursor_y + RULE_SPACE / 2.0;
        let (from, to) = (self.text_left(), self.layout.content_right());
        self.page().add_rule(RuleLayout {
            from: (from, y),
            to: (to, y),
            thickness: 0.75,
            colour: colours::RULE,
        });
        self.cursor_y += RULE_SPACE;
    }

    fn start_row(&mut self) {
        self.ensure_space(BLOCK_BREAK_CHECK);
        let y = self.cursor_y;
        if let Some(table) = self.table.as_mut() {
            table.column = 0;
            table.row_top = y;
        }
    }

    fn end_row(&mut self) {
        self.cursor_y += TABLE_ROW_HEIGHT;
    }

    /// Draw the queued cell text on one line in its fixed-width column,
    /// truncating anything that does not fit.
    fn draw_cell(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        let Some(table) = self.table.as_ref() else {
            return;
        };
        if table.column >= table.columns {
            log::debug!("dropping table cell beyond {} columns", table.columns);
            return;
        }
        let Some(font) = runs.first().map(|r| r.font) else {
            return;
        };

        let left = self.text_left();
        let cell_width = (self.layout.content_right() - left) / table.columns as f32;
        let x = left + table.column as f32 * cell_width + TABLE_CELL_PADDING / 2.0;
        let text: String = runs
            .iter()
            .map(|r| r.text.replace('\n', " "))
            .collect::<String>()
            .trim()
            .to_string();
        let face = self.doc.font(font.id);
        let text = truncate_to_width(&text, face, font.size, cell_width - TABLE_CELL_PADDING);
        let baseline = table.row_top + face.ascent(font.size);
        let colour = runs.first().map(|r| r.colour).unwrap_or(colours::TEXT);

        self.page().add_span(SpanLayout {
            text,
            font,
            colour,
            coords: (x, baseline),
        });
    }
}
