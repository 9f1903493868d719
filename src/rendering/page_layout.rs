//! Page geometry and the title page.
//!
//! Every page reserves a footer band above the bottom margin; body pages also
//! reserve a header band below the top margin. The title page and contents
//! pages have no header, so their content starts right at the top margin.

use crate::config::{ConversionOptions, Margins};
use crate::document::layout::{break_lines, truncate_to_width, Run};
use crate::document::{colours, Document, Image, ImageLayout, Page, PageKind, Rect, SpanLayout};
use crate::fonts::{FontManager, FontStyle};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;

pub const HEADER_BAND: f32 = 20.0;
pub const FOOTER_BAND: f32 = 20.0;

const TITLE_SIZE: f32 = 24.0;
const TITLE_INFO_SIZE: f32 = 11.0;
const TITLE_INFO_ADVANCE: f32 = 16.0;
const HEADER_IMAGE_GAP: f32 = 20.0;

pub struct PageLayout<'a> {
    pub(crate) opts: &'a ConversionOptions,
    width: f32,
    height: f32,
    generated: DateTime<Local>,
}

impl<'a> PageLayout<'a> {
    pub fn new(opts: &'a ConversionOptions, generated: DateTime<Local>) -> PageLayout<'a> {
        let (width, height) = opts.page_size.dimensions();
        PageLayout {
            opts,
            width,
            height,
            generated,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn margins(&self) -> &Margins {
        &self.opts.margins
    }

    pub fn content_left(&self) -> f32 {
        self.opts.margins.left
    }

    pub fn content_right(&self) -> f32 {
        self.width - self.opts.margins.right
    }

    pub fn content_width(&self) -> f32 {
        self.content_right() - self.content_left()
    }

    /// Highest Y content may be written at on a page of this kind.
    pub fn content_start_y(&self, kind: PageKind) -> f32 {
        match kind {
            PageKind::Body => self.opts.margins.top + HEADER_BAND,
            PageKind::Title | PageKind::Contents => self.opts.margins.top,
        }
    }

    /// Lowest Y content may reach before a page break is required.
    pub fn content_end_y(&self) -> f32 {
        self.height - self.opts.margins.bottom - FOOTER_BAND
    }

    pub fn new_page(&self, kind: PageKind) -> Page {
        Page::new(kind, self.width, self.height)
    }

    /// Date shown in footers.
    pub fn generated_date(&self) -> String {
        self.generated.format("%Y-%m-%d").to_string()
    }

    /// Date shown on the title page.
    pub fn generated_long_date(&self) -> String {
        self.generated.format("%B %-d, %Y").to_string()
    }

    fn place_header_image(&self, doc: &mut Document, page: &mut Page, path: &Path, y: f32) -> Result<f32> {
        if !path.exists() {
            log::warn!(
                "Header image {} does not exist, continuing without it",
                path.display()
            );
            return Ok(y);
        }

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read header image {}", path.display()))?;
        let image = Image::decode(&bytes)
            .with_context(|| format!("Failed to load header image {}", path.display()))?;

        let available = self.content_width();
        let aspect = image.aspect_ratio();
        let mut height = self.opts.header_image_height_or_default();
        let mut width = height * aspect;
        if width > available {
            width = available;
            height = width / aspect;
        }
        let x = self.content_left() + (available - width) / 2.0;

        let id = doc.add_image(image);
        page.add_image(ImageLayout {
            image: id,
            position: Rect {
                x1: x,
                y1: y,
                x2: x + width,
                y2: y + height,
            },
        });
        Ok(y + height + HEADER_IMAGE_GAP)
    }

    fn title_page_details(&self) -> Vec<String> {
        let opts = self.opts;
        let mut details = Vec::new();
        if let Some(author) = &opts.author {
            details.push(format!("Author: {author}"));
        }
        if let Some(task) = &opts.task_ref {
            details.push(format!("Task: {task}"));
        }
        if let Some(window) = &opts.window {
            details.push(format!("Collection Window: {window}"));
        }
        details.push(format!("Generated: {}", self.generated_long_date()));
        if let Some(subject) = &opts.subject {
            details.push(format!("Subject: {subject}"));
        }
        for (key, value) in opts.metadata.iter() {
            details.push(format!("{key}: {value}"));
        }
        details
    }

    /// Draw the title page and return the Y where further content may begin.
    ///
    /// Title lines and details that would cross the content end are left
    /// off the page with a warning.
    pub fn render_title_page(
        &self,
        doc: &mut Document,
        fonts: &FontManager,
        page: &mut Page,
    ) -> Result<f32> {
        let mut y = self.content_start_y(PageKind::Title);
        let end = self.content_end_y();

        if let Some(path) = &self.opts.header_image {
            y = self.place_header_image(doc, page, path, y)?;
        }

        let title_font = fonts.font(FontStyle::Bold).with_size(TITLE_SIZE);
        let runs = [Run {
            text: self.opts.display_title().to_string(),
            font: title_font,
            colour: colours::BLACK,
        }];
        let title_lines = break_lines(doc, &runs, self.content_width());
        let title_line_height = doc.font(title_font.id).line_height(TITLE_SIZE);
        let title_total = title_lines.len();
        for (i, line) in title_lines.into_iter().enumerate() {
            if y + title_line_height > end {
                log::warn!(
                    "Title does not fit on the title page, dropping {} of {title_total} lines",
                    title_total - i
                );
                break;
            }
            let baseline = y + line.ascent(doc);
            for span in line.spans {
                page.add_span(SpanLayout {
                    text: span.text,
                    font: span.font,
                    colour: span.colour,
                    coords: (self.content_left() + span.x, baseline),
                });
            }
            y += title_line_height;
        }
        y = (y + TITLE_INFO_ADVANCE).min(end);

        let info_font = fonts.font(FontStyle::Regular).with_size(TITLE_INFO_SIZE);
        let font = doc.font(info_font.id);
        let details = self.title_page_details();
        let detail_total = details.len();
        for (i, detail) in details.into_iter().enumerate() {
            if y + TITLE_INFO_ADVANCE > end {
                log::warn!(
                    "Title page is full, dropping {} of {detail_total} detail lines",
                    detail_total - i
                );
                break;
            }
            page.add_span(SpanLayout {
                text: truncate_to_width(&detail, font, TITLE_INFO_SIZE, self.content_width()),
                font: info_font,
                colour: colours::TEXT,
                coords: (self.content_left(), y + font.ascent(TITLE_INFO_SIZE)),
            });
            y += TITLE_INFO_ADVANCE;
        }

        Ok((y + 40.0).min(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSize;
    use crate::document::Info;
    use chrono::TimeZone;

    fn generated() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 5, 12, 0, 0)
            .single()
            .expect("valid date")
    }

    #[test]
    fn can_compute_content_bands() {
        let opts = ConversionOptions::default();
        let layout = PageLayout::new(&opts, generated());
        assert_eq!(layout.content_start_y(PageKind::Title), 72.0);
        assert_eq!(layout.content_start_y(PageKind::Contents), 72.0);
        assert_eq!(layout.content_start_y(PageKind::Body), 92.0);
        assert_eq!(layout.content_end_y(), 842.0 - 72.0 - 20.0);
        assert_eq!(layout.content_width(), 595.0 - 144.0);

        let opts = ConversionOptions {
            page_size: PageSize::Letter,
            ..Default::default()
        };
        let layout = PageLayout::new(&opts, generated());
        assert_eq!(layout.content_end_y(), 792.0 - 92.0);
    }

    #[test]
    fn can_format_generation_dates() {
        let opts = ConversionOptions::default();
        let layout = PageLayout::new(&opts, generated());
        assert_eq!(layout.generated_date(), "2024-03-05");
        assert_eq!(layout.generated_long_date(), "March 5, 2024");
    }

    #[test]
    fn can_render_title_page() {
        let opts = ConversionOptions {
            title: "Quarterly Access Review".to_string(),
            task_ref: Some("TASK-42".to_string()),
            window: Some("2024-01-01 to 2024-03-31".to_string()),
            ..Default::default()
        };
        let layout = PageLayout::new(&opts, generated());
        let mut doc = Document::new(Info::default());
        let fonts = FontManager::new(&mut doc, 11.0, 9.0);
        let mut page = layout.new_page(PageKind::Title);

        let y = layout
            .render_title_page(&mut doc, &fonts, &mut page)
            .expect("can render title page");

        let text = page.text();
        assert!(text.contains("Quarterly Access Review"));
        assert!(text.contains("Task: TASK-42"));
        assert!(text.contains("Collection Window: 2024-01-01 to 2024-03-31"));
        assert!(text.contains("Generated: March 5, 2024"));
        assert!(y > layout.content_start_y(PageKind::Title));
        assert!(y < layout.content_end_y());
    }

    #[test]
    fn title_page_details_stay_inside_content_band() {
        let metadata = (0..100)
            .map(|i| (format!("Exhibit {i:03}"), format!("evidence item {i}")))
            .collect();
        let opts = ConversionOptions {
            title: "A very long investigation title ".repeat(40),
            metadata,
            ..Default::default()
        };
        let layout = PageLayout::new(&opts, generated());
        let mut doc = Document::new(Info::default());
        let fonts = FontManager::new(&mut doc, 11.0, 9.0);
        let mut page = layout.new_page(PageKind::Title);

        let y = layout
            .render_title_page(&mut doc, &fonts, &mut page)
            .expect("can render title page");

        let start = layout.content_start_y(PageKind::Title);
        let end = layout.content_end_y();
        assert!(!page.spans.is_empty());
        for span in page.spans.iter() {
            assert!(span.coords.1 >= start, "{:?} above content band", span.text);
            assert!(span.coords.1 <= end, "{:?} below content band", span.text);
        }
        assert!(y <= end);
        assert!(!page.text().contains("Exhibit 099"));
    }

    #[test]
    fn can_place_jpeg_header_image() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join("banner.jpg");
        let banner = image::RgbImage::from_pixel(40, 10, image::Rgb([20, 60, 140]));
        banner
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .expect("can encode jpeg");

        let opts = ConversionOptions {
            header_image: Some(path),
            header_image_height: 50.0,
            ..Default::default()
        };
        let layout = PageLayout::new(&opts, generated());
        let mut doc = Document::new(Info::default());
        let fonts = FontManager::new(&mut doc, 11.0, 9.0);
        let mut page = layout.new_page(PageKind::Title);

        layout
            .render_title_page(&mut doc, &fonts, &mut page)
            .expect("jpeg header image decodes");
        assert_eq!(page.images.len(), 1);
        let position = page.images[0].position;
        assert!((position.height() - 50.0).abs() < 1e-3);
        assert!((position.width() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn missing_header_image_is_skipped() {
        let opts = ConversionOptions {
            header_image: Some("/definitely/not/here/logo.png".into()),
            ..Default::default()
        };
        let layout = PageLayout::new(&opts, generated());
        let mut doc = Document::new(Info::default());
        let fonts = FontManager::new(&mut doc, 11.0, 9.0);
        let mut page = layout.new_page(PageKind::Title);

        layout
            .render_title_page(&mut doc, &fonts, &mut page)
            .expect("missing image is not fatal");
        assert!(page.images.is_empty());
    }

    #[test]
    fn undecodable_header_image_is_fatal() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"this is not a png").expect("can write");

        let opts = ConversionOptions {
            header_image: Some(path),
            ..Default::default()
        };
        let layout = PageLayout::new(&opts, generated());
        let mut doc = Document::new(Info::default());
        let fonts = FontManager::new(&mut doc, 11.0, 9.0);
        let mut page = layout.new_page(PageKind::Title);

        assert!(layout.render_title_page(&mut doc, &fonts, &mut page).is_err());
    }
}
