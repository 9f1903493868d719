//! Markdown to PDF rendering orchestration.
//!
//! A conversion runs in a fixed order:
//!
//! 1. The source is parsed into an owned event stream.
//! 2. Fonts are resolved; anything missing falls back to the built-in PDF
//!    fonts.
//! 3. Headings are collected for the table of contents, and the number of
//!    contents pages they need is computed so body page numbers are final
//!    from the start.
//! 4. The title page is drawn.
//! 5. The body is walked event by event with a single [`RenderContext`],
//!    paginating as it goes and stamping each heading's contents entry.
//! 6. The contents pages are rendered with the resolved page numbers and
//!    inserted straight after the title page.
//! 7. Headers and footers are stamped on every page now that the page count
//!    is known.
//!
//! Nothing is written to disk until [`Rendered::write_to`] is called, so a
//! failed conversion never leaves a partial file behind.

mod code_block;
mod context;
mod header_footer;
mod page_layout;
mod table_of_contents;
mod walk;

pub use context::{heading_size, RenderContext};
pub use header_footer::{header_title, page_label};
pub use page_layout::{PageLayout, FOOTER_BAND, HEADER_BAND};
pub use table_of_contents::{slugify, TocEntry, TocGenerator, CONTENTS_TITLE};

use crate::config::ConversionOptions;
use crate::document::{Document, Info, PageKind};
use crate::fonts::FontManager;
use crate::highlight::SyntaxHighlighter;
use crate::markdown;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;

/// A fully laid out document, ready to be written.
pub struct Rendered {
    pub document: Document,
    pub toc: Vec<TocEntry>,
    pub contents_pages: usize,
}

impl Rendered {
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Serialize and write the PDF, returning the number of bytes written.
    pub fn write_to<P: AsRef<Path>>(self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let bytes = self.document.into_pdf_bytes();
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write PDF file {}", path.display()))?;
        Ok(bytes.len())
    }
}

pub struct Renderer<'o> {
    opts: &'o ConversionOptions,
    highlighter: SyntaxHighlighter,
    generated: DateTime<Local>,
}

impl<'o> Renderer<'o> {
    pub fn new(opts: &'o ConversionOptions) -> Renderer<'o> {
        Renderer {
            opts,
            highlighter: SyntaxHighlighter::new(&opts.syntax_theme),
            generated: Local::now(),
        }
    }

    /// Fix the generation timestamp shown on the title page and in footers.
    pub fn with_generated(mut self, generated: DateTime<Local>) -> Renderer<'o> {
        self.generated = generated;
        self
    }

    fn validate(&self, layout: &PageLayout) -> Result<()> {
        let opts = self.opts;
        if opts.font_size <= 0.0 || opts.code_font_size <= 0.0 {
            bail!(
                "Font sizes must be positive (body {}pt, code {}pt)",
                opts.font_size,
                opts.code_font_size
            );
        }
        let band = layout.content_end_y() - layout.content_start_y(PageKind::Body);
        if band < 40.0 || layout.content_width() < 40.0 {
            bail!(
                "Page margins leave no room for content ({:.0}pt x {:.0}pt)",
                layout.content_width(),
                band
            );
        }
        Ok(())
    }

    pub fn render(&self, source: &str) -> Result<Rendered> {
        let opts = self.opts;
        let layout = PageLayout::new(opts, self.generated);
        self.validate(&layout)?;

        let events = markdown::parse(source);
        log::debug!("parsed {} markdown events", events.len());

        let mut doc = Document::new(Info {
            title: Some(opts.display_title().to_string()),
            author: opts.author.clone(),
            subject: opts.subject.clone(),
        });
        let mut fonts = FontManager::new(&mut doc, opts.font_size, opts.code_font_size);
        fonts.load_fonts(&mut doc, &opts.font_family, &opts.mono_font_family);

        let mut toc = TocGenerator::new(opts.toc_depth);
        if opts.generate_toc {
            toc.collect_from_events(&events);
        }
        let contents_pages = toc.page_count(&layout);

        let mut title_page = layout.new_page(PageKind::Title);
        let content_y = layout
            .render_title_page(&mut doc, &fonts, &mut title_page)
            .with_context(|| "Failed to render title page")?;
        doc.add_page(title_page);
        log::debug!("title page content ends at y={content_y:.1}");

        let toc_ref = if opts.generate_toc { Some(&mut toc) } else { None };
        let mut ctx = RenderContext::new(
            doc,
            fonts,
            &layout,
            &self.highlighter,
            toc_ref,
            contents_pages,
        );
        for event in events.iter() {
            ctx.render_event(event).with_context(|| {
                format!("Failed to render document on page {}", ctx.page_number())
            })?;
        }
        let (mut doc, fonts) = ctx.finish();

        if contents_pages > 0 {
            let pages = toc.render(&doc, &fonts, &layout);
            debug_assert_eq!(pages.len(), contents_pages);
            doc.insert_pages(1, pages);
        }

        layout.render_furniture(&mut doc, &fonts);

        log::info!(
            "rendered {} pages ({} contents pages, {} headings)",
            doc.page_count(),
            contents_pages,
            toc.entries().len()
        );
        Ok(Rendered {
            document: doc,
            toc: toc.into_entries(),
            contents_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Margins;
    use crate::document::Page;
    use chrono::TimeZone;

    /// Options that resolve to the built-in fonts without probing the system,
    /// so layout is the same on every machine.
    fn test_options() -> ConversionOptions {
        ConversionOptions {
            title: "Evidence Document".to_string(),
            font_family: "./no-such-fonts/Body".to_string(),
            mono_font_family: "./no-such-fonts/Mono".to_string(),
            ..Default::default()
        }
    }

    fn render(opts: &ConversionOptions, source: &str) -> Rendered {
        let generated = Local
            .with_ymd_and_hms(2024, 3, 5, 12, 0, 0)
            .single()
            .expect("valid date");
        Renderer::new(opts)
            .with_generated(generated)
            .render(source)
            .expect("can render document")
    }

    fn body_pages(rendered: &Rendered) -> Vec<&Page> {
        rendered
            .document
            .pages
            .iter()
            .filter(|p| p.kind == PageKind::Body)
            .collect()
    }

    fn paragraphs(n: usize) -> String {
        (0..n)
            .map(|i| {
                format!("Paragraph {i} with enough words to be a realistic line of body text.")
            })
            .collect::<Vec<String>>()
            .join("\n\n")
    }

    fn code_block(lines: usize) -> String {
        let body: Vec<String> = (0..lines).map(|i| format!("line {i}")).collect();
        format!("```\n{}\n```\n", body.join("\n"))
    }

    #[test]
    fn single_paragraph_without_toc_is_two_pages() {
        let opts = ConversionOptions {
            generate_toc: false,
            ..test_options()
        };
        let rendered = render(&opts, "Just one short paragraph.\n");
        assert_eq!(rendered.page_count(), 2);
        assert_eq!(rendered.contents_pages, 0);
        assert_eq!(rendered.document.pages[0].kind, PageKind::Title);
        assert_eq!(rendered.document.pages[1].kind, PageKind::Body);
        assert!(rendered.document.pages[1].text().contains("Just one short paragraph."));
    }

    #[test]
    fn document_without_headings_has_no_contents_page() {
        let rendered = render(&test_options(), "Some text.\n");
        assert_eq!(rendered.contents_pages, 0);
        assert_eq!(rendered.page_count(), 2);
        assert!(rendered.toc.is_empty());
    }

    #[test]
    fn content_stays_inside_content_region() {
        let opts = test_options();
        let source = format!(
            "# Findings\n\n{}\n\n{}\n\n- item one\n- item two\n\n> quoted text\n\n| a | b |\n|---|---|\n| 1 | 2 |\n",
            paragraphs(60),
            code_block(90)
        );
        let rendered = render(&opts, &source);
        let layout = PageLayout::new(&opts, Local::now());
        let start = layout.content_start_y(PageKind::Body);
        let end = layout.content_end_y();

        let pages = body_pages(&rendered);
        assert!(pages.len() > 2);
        for page in pages {
            for span in page.spans.iter() {
                assert!(span.coords.1 >= start, "{:?} above content start", span.text);
                assert!(span.coords.1 <= end, "{:?} below content end", span.text);
            }
            for fill in page.fills.iter() {
                assert!(fill.rect.y1 >= start - 0.01 && fill.rect.y2 <= end + 0.01);
            }
        }
    }

    #[test]
    fn page_count_is_idempotent() {
        let opts = test_options();
        let source = format!("# One\n\n{}\n\n## Two\n\n{}\n", paragraphs(30), code_block(40));
        let first = render(&opts, &source);
        let second = render(&opts, &source);
        assert_eq!(first.page_count(), second.page_count());
        let titles = |r: &Rendered| -> Vec<(u8, String)> {
            r.toc.iter().map(|e| (e.level, e.title.clone())).collect()
        };
        assert_eq!(titles(&first), titles(&second));
    }

    #[test]
    fn contents_lists_headings_within_depth() {
        let opts = ConversionOptions {
            toc_depth: 2,
            ..test_options()
        };
        let source = "# Introduction\n\nFirst paragraph.\n\n## Scope\n\nSecond paragraph.\n\n### Detail\n";
        let rendered = render(&opts, source);

        let titles: Vec<&str> = rendered.toc.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Introduction", "Scope"]);
        assert_eq!(rendered.contents_pages, 1);

        let contents = &rendered.document.pages[1];
        assert_eq!(contents.kind, PageKind::Contents);
        let text = contents.text();
        assert!(text.contains(CONTENTS_TITLE));
        assert!(text.contains("Introduction"));
        assert!(text.contains("Scope"));
        assert!(!text.contains("Detail"));
        let intro = text.find("Introduction").expect("has introduction");
        let scope = text.find("Scope").expect("has scope");
        assert!(intro < scope);
    }

    #[test]
    fn contents_page_numbers_resolve_to_heading_pages() {
        let opts = test_options();
        let source = format!(
            "# First\n\n{}\n\n# Second\n\n{}\n\n# Third\n",
            paragraphs(40),
            paragraphs(40)
        );
        let rendered = render(&opts, &source);

        let mut last = (0, 0.0);
        for entry in rendered.toc.iter() {
            assert!(entry.page > 0);
            assert!((entry.page, entry.y) > last, "entries stamped in order");
            last = (entry.page, entry.y);

            let page = &rendered.document.pages[entry.page - 1];
            assert_eq!(page.kind, PageKind::Body);
            assert!(page.text().contains(&entry.title));
        }

        let contents = rendered.document.pages[1].text();
        for entry in rendered.toc.iter() {
            assert!(contents.contains(&entry.page.to_string()));
        }
        // first heading lands on the first body page, right after the contents
        assert_eq!(rendered.toc[0].page, 2 + rendered.contents_pages);
    }

    #[test]
    fn footers_number_every_page() {
        let opts = test_options();
        let source = format!("# Heading\n\n{}\n", paragraphs(80));
        let rendered = render(&opts, &source);
        let total = rendered.page_count();
        assert!(total >= 3);

        for (i, page) in rendered.document.pages.iter().enumerate() {
            let furniture = page.furniture_text();
            assert!(furniture.contains(&format!("Page {} of {}", i + 1, total)));
            assert!(furniture.contains("2024-03-05"));
            assert_eq!(furniture.contains("Evidence Document"), page.kind == PageKind::Body);
        }
    }

    #[test]
    fn code_block_that_exactly_fills_the_page_does_not_break() {
        // margins chosen so the body band is exactly 56 lines of 10pt code
        let opts = ConversionOptions {
            generate_toc: false,
            margins: Margins::all(65.0),
            code_font_size: 10.0,
            ..test_options()
        };
        let layout = PageLayout::new(&opts, Local::now());
        let band = layout.content_end_y() - layout.content_start_y(PageKind::Body);
        assert!((band - 672.0).abs() < 1e-3);

        let fits = render(&opts, &code_block(56));
        assert_eq!(fits.page_count(), 2);

        let spills = render(&opts, &code_block(57));
        assert_eq!(spills.page_count(), 3);
        let last_page = &spills.document.pages[2];
        assert_eq!(last_page.text(), "line 56");
        assert_eq!(spills.document.pages[1].spans.len(), 56);
    }

    #[test]
    fn nonexistent_fonts_and_header_image_still_render() {
        let opts = ConversionOptions {
            font_family: "NoSuchFamilyXyz".to_string(),
            mono_font_family: "NoSuchMonoXyz".to_string(),
            header_image: Some("/no/such/dir/banner.png".into()),
            ..test_options()
        };
        let rendered = render(&opts, "# Title\n\nBody text with `code`.\n");
        assert_eq!(rendered.page_count(), 3);
        assert!(rendered.document.pages[0].images.is_empty());
    }

    #[test]
    fn inline_styles_use_their_fonts() {
        let opts = ConversionOptions {
            generate_toc: false,
            ..test_options()
        };
        let rendered = render(&opts, "plain **bold** *italic* `code` [link](https://example.com)\n");
        let doc = &rendered.document;
        let spans = &doc.pages[1].spans;
        let font_of = |text: &str| {
            let span = spans
                .iter()
                .find(|s| s.text.contains(text))
                .unwrap_or_else(|| panic!("no span containing {text}"));
            (doc.font(span.font.id).name().to_string(), span.colour)
        };
        assert_eq!(font_of("plain").0, "Helvetica");
        assert_eq!(font_of("bold").0, "Helvetica-Bold");
        assert_eq!(font_of("italic").0, "Helvetica-Oblique");
        assert_eq!(font_of("code").0, "Courier");
        assert_eq!(font_of("link").1, crate::document::colours::LINK);
    }

    #[test]
    fn can_render_lists_tables_and_quotes() {
        let opts = ConversionOptions {
            generate_toc: false,
            ..test_options()
        };
        let source = "\
1. first
2. second
   - nested
- [x] done

> a quote

---

| Name | Value |
|------|-------|
| alpha | a very long cell value that will never fit inside its fixed width column |

![diagram](diagram.png)
";
        let rendered = render(&opts, source);
        let page = &rendered.document.pages[1];
        let text = page.text();
        for expected in ["1.", "2.", "first", "nested", "[x] done", "a quote", "Name", "alpha", "[image: diagram]"] {
            assert!(text.contains(expected), "missing {expected:?} in {text}");
        }
        assert!(text.contains("..."), "long cell is truncated");
        // thematic break plus the rule under the table header
        assert_eq!(page.rules.len(), 2);

        let nested = page.spans.iter().find(|s| s.text == "nested").expect("nested item");
        let first = page.spans.iter().find(|s| s.text == "first").expect("first item");
        assert!(nested.coords.0 > first.coords.0);
    }

    #[test]
    fn rejects_impossible_margins() {
        let opts = ConversionOptions {
            margins: Margins::all(400.0),
            ..test_options()
        };
        assert!(Renderer::new(&opts).render("text").is_err());
    }

    #[test]
    fn can_write_pdf() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join("out.pdf");
        let rendered = render(&test_options(), "# Hello\n\nWorld.\n");
        let written = rendered.write_to(&path).expect("can write pdf");
        let bytes = std::fs::read(&path).expect("can read pdf");
        assert_eq!(bytes.len(), written);
        assert!(bytes.starts_with(b"%PDF"));
    }
}
