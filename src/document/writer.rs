//! Lowers the page model to printpdf operations.

use super::{Colour, Document, FillLayout, Font, ImageLayout, Info, Page, RuleLayout, SpanLayout};
use crate::config::UNTITLED_TITLE;
use printpdf::color::Color;
use printpdf::graphics::{LinePoint, PaintMode, Point, Polygon, PolygonRing, WindingOrder};
use printpdf::matrix::TextMatrix;
use printpdf::ops::Op;
use printpdf::text::TextItem;
use printpdf::xobject::{XObject, XObjectTransform};
use printpdf::{FontId, Mm, PdfDocument, PdfPage, PdfSaveOptions, Pt, Rgb, XObjectId};

fn pdf_colour(colour: Colour) -> Color {
    Color::Rgb(Rgb::new(
        colour.r as f32 / 255.0,
        colour.g as f32 / 255.0,
        colour.b as f32 / 255.0,
        None,
    ))
}

fn rect_polygon(x1: f32, y1: f32, x2: f32, y2: f32, mode: PaintMode) -> Polygon {
    let points = [(x1, y1), (x2, y1), (x2, y2), (x1, y2)]
        .into_iter()
        .map(|(x, y)| LinePoint {
            p: Point { x: Pt(x), y: Pt(y) },
            bezier: false,
        })
        .collect();
    Polygon {
        rings: vec![PolygonRing { points }],
        mode,
        winding_order: WindingOrder::EvenOdd,
    }
}

struct PageWriter<'d> {
    fonts: &'d [Font],
    image_sizes: &'d [(u32, u32)],
    font_ids: &'d [Option<FontId>],
    image_ids: &'d [XObjectId],
    height: f32,
    ops: Vec<Op>,
}

impl PageWriter<'_> {
    fn fill(&mut self, fill: &FillLayout) {
        let r = &fill.rect;
        self.ops.push(Op::SetFillColor {
            col: pdf_colour(fill.colour),
        });
        self.ops.push(Op::DrawPolygon {
            polygon: rect_polygon(
                r.x1,
                self.height - r.y2,
                r.x2,
                self.height - r.y1,
                PaintMode::Fill,
            ),
        });
    }

    fn image(&mut self, image: &ImageLayout) {
        let (width, height) = self.image_sizes[image.image.0];
        let pos = &image.position;
        self.ops.push(Op::UseXobject {
            id: self.image_ids[image.image.0].clone(),
            transform: XObjectTransform {
                translate_x: Some(Pt(pos.x1)),
                translate_y: Some(Pt(self.height - pos.y2)),
                scale_x: Some(pos.width() / width.max(1) as f32),
                scale_y: Some(pos.height() / height.max(1) as f32),
                rotate: None,
                dpi: Some(72.0),
            },
        });
    }

    fn rule(&mut self, rule: &RuleLayout) {
        let points = [rule.from, rule.to]
            .into_iter()
            .map(|(x, y)| LinePoint {
                p: Point {
                    x: Pt(x),
                    y: Pt(self.height - y),
                },
                bezier: false,
            })
            .collect();
        self.ops.push(Op::SetOutlineColor {
            col: pdf_colour(rule.colour),
        });
        self.ops.push(Op::SetOutlineThickness {
            pt: Pt(rule.thickness),
        });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing { points }],
                mode: PaintMode::Stroke,
                winding_order: WindingOrder::EvenOdd,
            },
        });
    }

    fn span(&mut self, span: &SpanLayout) {
        if span.text.is_empty() {
            return;
        }
        let font = &self.fonts[span.font.id.0];
        let text = font.encodable(&span.text).into_owned();
        let size = Pt(span.font.size);
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetFillColor {
            col: pdf_colour(span.colour),
        });
        match (font.builtin_face(), &self.font_ids[span.font.id.0]) {
            (_, Some(id)) => self.ops.push(Op::SetFontSize {
                size,
                font: id.clone(),
            }),
            (Some(face), None) => self.ops.push(Op::SetFontSizeBuiltinFont {
                size,
                font: face.pdf_font(),
            }),
            (None, None) => {}
        }
        self.ops.push(Op::SetTextMatrix {
            matrix: TextMatrix::Translate(Pt(span.coords.0), Pt(self.height - span.coords.1)),
        });
        let items = vec![TextItem::Text(text)];
        match (font.builtin_face(), &self.font_ids[span.font.id.0]) {
            (_, Some(id)) => self.ops.push(Op::WriteText {
                items,
                font: id.clone(),
            }),
            (Some(face), None) => self.ops.push(Op::WriteTextBuiltinFont {
                items,
                font: face.pdf_font(),
            }),
            (None, None) => {}
        }
        self.ops.push(Op::EndTextSection);
    }

    fn write(mut self, page: &Page) -> Vec<Op> {
        for fill in page.fills.iter() {
            self.fill(fill);
        }
        for image in page.images.iter() {
            self.image(image);
        }
        for rule in page.rules.iter().chain(page.furniture.rules.iter()) {
            self.rule(rule);
        }
        for span in page.spans.iter().chain(page.furniture.spans.iter()) {
            self.span(span);
        }
        self.ops
    }
}

/// An empty printpdf document carrying the title, author and subject.
fn pdf_document(info: &Info) -> PdfDocument {
    let title = info.title.as_deref().unwrap_or(UNTITLED_TITLE);
    let mut pdf = PdfDocument::new(title);
    if let Some(author) = &info.author {
        pdf.metadata.info.author = author.clone();
    }
    if let Some(subject) = &info.subject {
        pdf.metadata.info.subject = subject.clone();
    }
    pdf
}

impl Document {
    /// Serialize the document to PDF bytes.
    pub fn into_pdf_bytes(self) -> Vec<u8> {
        let Document {
            info,
            fonts,
            images,
            pages,
        } = self;
        let mut pdf = pdf_document(&info);

        let font_ids: Vec<Option<FontId>> = fonts
            .iter()
            .map(|font| font.parsed().map(|parsed| pdf.add_font(parsed)))
            .collect();

        let mut image_sizes = Vec::with_capacity(images.len());
        let mut image_ids = Vec::with_capacity(images.len());
        for image in images {
            let id = XObjectId::new();
            image_sizes.push((image.width, image.height));
            pdf.resources
                .xobjects
                .map
                .insert(id.clone(), XObject::Image(image.raw));
            image_ids.push(id);
        }

        let page_count = pages.len();
        pdf.pages = pages
            .iter()
            .map(|page| {
                let writer = PageWriter {
                    fonts: &fonts,
                    image_sizes: &image_sizes,
                    font_ids: &font_ids,
                    image_ids: &image_ids,
                    height: page.height,
                    ops: Vec::new(),
                };
                let ops = writer.write(page);
                let width: Mm = Pt(page.width).into();
                let height: Mm = Pt(page.height).into();
                PdfPage::new(width, height, ops)
            })
            .collect();

        let mut warnings = Vec::new();
        let bytes = pdf.save(&PdfSaveOptions::default(), &mut warnings);
        log::debug!(
            "wrote {} pages ({} bytes, {} warnings)",
            page_count,
            bytes.len(),
            warnings.len()
        );
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::pdf_document;
    use crate::document::{
        colours, BuiltinFace, Document, Font, Info, Page, PageKind, SpanFont, SpanLayout,
    };

    #[test]
    fn can_carry_document_info() {
        let pdf = pdf_document(&Info {
            title: Some("Access Review".to_string()),
            author: Some("J. Analyst".to_string()),
            subject: Some("Quarterly audit".to_string()),
        });
        assert_eq!(pdf.metadata.info.document_title, "Access Review");
        assert_eq!(pdf.metadata.info.author, "J. Analyst");
        assert_eq!(pdf.metadata.info.subject, "Quarterly audit");

        let untitled = pdf_document(&Info::default());
        assert_eq!(untitled.metadata.info.document_title, "Evidence Document");
    }

    #[test]
    fn can_write_builtin_font_document() {
        let mut doc = Document::new(Info {
            title: Some("Test".to_string()),
            ..Default::default()
        });
        let id = doc.add_font(Font::builtin(BuiltinFace::Helvetica));
        let mut page = Page::new(PageKind::Body, 595.0, 842.0);
        page.add_span(SpanLayout {
            text: "Hello".to_string(),
            font: SpanFont { id, size: 11.0 },
            colour: colours::TEXT,
            coords: (72.0, 100.0),
        });
        doc.add_page(page);

        let bytes = doc.into_pdf_bytes();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
