//! Table of contents.
//!
//! Headings are collected in one pass over the parsed events before the body
//! is laid out. Since the number of contents pages only depends on the number
//! of entries, it is known up front: body pages are numbered as if the
//! contents pages were already in place, each heading stamps its entry as it
//! is reached, and the contents pages are rendered and inserted after the
//! title page once every entry carries its final page number.

use super::page_layout::PageLayout;
use crate::document::layout::{truncate_to_width, width_of_text};
use crate::document::{colours, Document, Page, PageKind, RuleLayout, SpanLayout};
use crate::fonts::{FontManager, FontStyle};
use crate::markdown::heading_level;
use pulldown_cmark::{Event, Tag};

pub const CONTENTS_TITLE: &str = "Table of Contents";
const TITLE_SIZE: f32 = 18.0;
const TITLE_ADVANCE: f32 = 30.0;
const ENTRY_SIZE: f32 = 11.0;
const ENTRY_ADVANCE: f32 = 16.0;
const LEVEL_INDENT: f32 = 20.0;
const DEFAULT_DEPTH: u8 = 3;
const MAX_LINK_SLUG: usize = 50;

#[derive(Clone, Debug, PartialEq)]
pub struct TocEntry {
    pub level: u8,
    pub title: String,
    /// Final 1-based page number, 0 until stamped
    pub page: usize,
    /// Cursor position of the heading on its page, 0 until stamped
    pub y: f32,
    pub link: String,
}

/// Lower-case the title and collapse every run of non-alphanumeric
/// characters into a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    let slug: String = slug.chars().take(MAX_LINK_SLUG).collect();
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug)]
pub struct TocGenerator {
    entries: Vec<TocEntry>,
    max_depth: u8,
    next_unstamped: usize,
}

impl TocGenerator {
    /// `max_depth` is clamped to 1..=6; 0 selects the default depth of 3.
    pub fn new(max_depth: u8) -> TocGenerator {
        let max_depth = match max_depth {
            0 => DEFAULT_DEPTH,
            d => d.min(6),
        };
        TocGenerator {
            entries: Vec::new(),
            max_depth,
            next_unstamped: 0,
        }
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TocEntry> {
        self.entries
    }

    pub fn includes_level(&self, level: u8) -> bool {
        (1..=self.max_depth).contains(&level)
    }

    /// Add an entry. Headings deeper than the maximum depth are ignored.
    pub fn add_entry(&mut self, level: u8, title: &str, page: usize, y: f32) {
        if !self.includes_level(level) {
            return;
        }
        let title = title.trim().to_string();
        let link = format!("heading-{}-{}", self.entries.len(), slugify(&title));
        self.entries.push(TocEntry {
            level,
            title,
            page,
            y,
            link,
        });
    }

    /// Collect every heading within the maximum depth, in document order.
    pub fn collect_from_events(&mut self, events: &[Event<'_>]) {
        let mut current: Option<(u8, String)> = None;
        // inline tags open inside the heading being collected
        let mut nested = 0usize;
        for event in events {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    current = Some((heading_level(*level), String::new()));
                    nested = 0;
                }
                Event::Start(_) if current.is_some() => nested += 1,
                Event::End(_) if nested > 0 => nested -= 1,
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, title)) = current.as_mut() {
                        title.push_str(text);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some((_, title)) = current.as_mut() {
                        title.push(' ');
                    }
                }
                Event::End(_) => {
                    if let Some((level, title)) = current.take() {
                        self.add_entry(level, &title, 0, 0.0);
                    }
                }
                _ => {}
            }
        }
        log::debug!("collected {} contents entries", self.entries.len());
    }

    /// Record where the next unstamped heading landed. Entries are stamped
    /// strictly in document order; returns false once every entry is stamped.
    pub fn stamp_next(&mut self, page: usize, y: f32) -> bool {
        match self.entries.get_mut(self.next_unstamped) {
            Some(entry) => {
                entry.page = page;
                entry.y = y;
                self.next_unstamped += 1;
                true
            }
            None => false,
        }
    }

    fn entries_per_page(layout: &PageLayout, first: bool) -> usize {
        let mut band = layout.content_end_y() - layout.content_start_y(PageKind::Contents);
        if first {
            band -= TITLE_ADVANCE;
        }
        ((band / ENTRY_ADVANCE).floor() as usize).max(1)
    }

    /// Number of contents pages the current entries need.
    pub fn page_count(&self, layout: &PageLayout) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        let first = Self::entries_per_page(layout, true);
        let rest = Self::entries_per_page(layout, false);
        let remaining = self.entries.len().saturating_sub(first);
        1 + remaining.div_ceil(rest)
    }

    /// Lay out the contents pages from the entries as they currently stand.
    pub fn render(&self, doc: &Document, fonts: &FontManager, layout: &PageLayout) -> Vec<Page> {
        let title_font = fonts.font(FontStyle::Bold).with_size(TITLE_SIZE);
        let entry_font = fonts.font(FontStyle::Regular).with_size(ENTRY_SIZE);
        let font = doc.font(entry_font.id);

        let mut pages = Vec::new();
        let mut remaining: &[TocEntry] = &self.entries;
        while !remaining.is_empty() {
            let first = pages.is_empty();
            let mut page = layout.new_page(PageKind::Contents);
            let mut y = layout.content_start_y(PageKind::Contents);

            if first {
                page.add_span(SpanLayout {
                    text: CONTENTS_TITLE.to_string(),
                    font: title_font,
                    colour: colours::BLACK,
                    coords: (
                        layout.content_left(),
                        y + doc.font(title_font.id).ascent(TITLE_SIZE),
                    ),
                });
                y += TITLE_ADVANCE;
            }

            let take = Self::entries_per_page(layout, first).min(remaining.len());
            let (chunk, rest) = remaining.split_at(take);
            for entry in chunk {
                let baseline = y + font.ascent(ENTRY_SIZE);
                let x = layout.content_left() + (entry.level as f32 - 1.0) * LEVEL_INDENT;

                let number = entry.page.to_string();
                let number_width = width_of_text(&number, font, ENTRY_SIZE);
                let number_x = layout.content_right() - number_width;

                let title_space = (number_x - x - 12.0).max(0.0);
                let title = truncate_to_width(&entry.title, font, ENTRY_SIZE, title_space);
                let title_width = width_of_text(&title, font, ENTRY_SIZE);

                let leader_from = x + title_width + 4.0;
                let leader_to = number_x - 4.0;
                if leader_to > leader_from {
                    page.add_rule(RuleLayout {
                        from: (leader_from, baseline),
                        to: (leader_to, baseline),
                        thickness: 0.5,
                        colour: colours::RULE,
                    });
                }

                page.add_span(SpanLayout {
                    text: title,
                    font: entry_font,
                    colour: colours::TEXT,
                    coords: (x, baseline),
                });
                page.add_span(SpanLayout {
                    text: number,
                    font: entry_font,
                    colour: colours::TEXT,
                    coords: (number_x, baseline),
                });
                y += ENTRY_ADVANCE;
            }

            pages.push(page);
            remaining = rest;
        }
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionOptions;
    use crate::document::Info;
    use crate::markdown;
    use chrono::Local;

    #[test]
    fn can_slugify_titles() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  What's new?! (v2) "), "what-s-new-v2");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify(&"x".repeat(80)).len(), 50);
    }

    #[test]
    fn can_clamp_depth() {
        assert_eq!(TocGenerator::new(0).max_depth(), 3);
        assert_eq!(TocGenerator::new(9).max_depth(), 6);
        assert_eq!(TocGenerator::new(2).max_depth(), 2);
    }

    #[test]
    fn can_collect_headings_within_depth() {
        let events = markdown::parse(
            "# Overview\n\ntext\n\n## Scope `v1`\n\n### Details\n\nmore\n\n## *Key* Findings\n",
        );
        let mut toc = TocGenerator::new(2);
        toc.collect_from_events(&events);

        let titles: Vec<(u8, &str)> = toc
            .entries()
            .iter()
            .map(|e| (e.level, e.title.as_str()))
            .collect();
        assert_eq!(
            titles,
            vec![(1, "Overview"), (2, "Scope v1"), (2, "Key Findings")]
        );
        assert_eq!(toc.entries()[1].link, "heading-1-scope-v1");
        assert!(toc.entries().iter().all(|e| e.page == 0 && e.y == 0.0));
    }

    #[test]
    fn can_stamp_in_order() {
        let mut toc = TocGenerator::new(3);
        toc.add_entry(1, "One", 0, 0.0);
        toc.add_entry(2, "Two", 0, 0.0);

        assert!(toc.stamp_next(3, 100.0));
        assert!(toc.stamp_next(4, 92.0));
        assert!(!toc.stamp_next(5, 92.0));
        assert_eq!(toc.entries()[0].page, 3);
        assert_eq!(toc.entries()[1].page, 4);
    }

    #[test]
    fn can_plan_contents_pages() {
        let opts = ConversionOptions::default();
        let layout = PageLayout::new(&opts, Local::now());
        // A4 with 72pt margins: 678pt band, 40 entries below the title, 42 after
        let mut toc = TocGenerator::new(1);
        assert_eq!(toc.page_count(&layout), 0);
        for i in 0..40 {
            toc.add_entry(1, &format!("Entry {i}"), 0, 0.0);
        }
        assert_eq!(toc.page_count(&layout), 1);
        toc.add_entry(1, "One more", 0, 0.0);
        assert_eq!(toc.page_count(&layout), 2);
        for i in 0..42 {
            toc.add_entry(1, &format!("Extra {i}"), 0, 0.0);
        }
        assert_eq!(toc.page_count(&layout), 3);

        let mut doc = Document::new(Info::default());
        let fonts = FontManager::new(&mut doc, 11.0, 9.0);
        let pages = toc.render(&doc, &fonts, &layout);
        assert_eq!(pages.len(), toc.page_count(&layout));
        for page in pages.iter() {
            for span in page.spans.iter() {
                assert!(span.coords.1 <= layout.content_end_y());
            }
        }
    }

    #[test]
    fn can_render_entries() {
        let opts = ConversionOptions::default();
        let layout = PageLayout::new(&opts, Local::now());
        let mut doc = Document::new(Info::default());
        let fonts = FontManager::new(&mut doc, 11.0, 9.0);

        let mut toc = TocGenerator::new(3);
        toc.add_entry(1, "Introduction", 3, 92.0);
        toc.add_entry(2, "Background", 4, 92.0);

        let pages = toc.render(&doc, &fonts, &layout);
        assert_eq!(pages.len(), 1);
        let spans = &pages[0].spans;
        assert_eq!(spans[0].text, CONTENTS_TITLE);
        assert_eq!(spans[1].text, "Introduction");
        assert_eq!(spans[2].text, "3");
        assert_eq!(spans[3].text, "Background");
        assert!(spans[3].coords.0 > spans[1].coords.0);
        assert_eq!(pages[0].rules.len(), 2);
    }
}
