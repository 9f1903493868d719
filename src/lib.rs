//! Convert Markdown documents into paginated, styled PDFs.
//!
//! The output has a title page, optional contents pages, headers and
//! footers, and syntax highlighted code blocks. Most callers only need
//! [`convert_markdown_to_pdf`]. [`Renderer`] keeps the laid out document in
//! memory for inspection before writing.

pub mod config;
pub mod document;
pub mod fonts;
pub mod highlight;
pub mod markdown;
pub mod rendering;

pub use config::{ConversionOptions, Margins, PageSize};
pub use rendering::{Rendered, Renderer, TocEntry};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Summary of a finished conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderStats {
    pub output: PathBuf,
    pub page_count: usize,
    pub contents_pages: usize,
    pub toc: Vec<TocEntry>,
}

/// Read `input`, render it and write the PDF to `output`.
///
/// The PDF is fully rendered in memory before anything is written, so
/// `output` is left untouched when the conversion fails.
pub fn convert_markdown_to_pdf<I, O>(
    input: I,
    output: O,
    opts: &ConversionOptions,
) -> Result<RenderStats>
where
    I: AsRef<Path>,
    O: AsRef<Path>,
{
    let input = input.as_ref();
    let output = output.as_ref();
    log::info!("converting {} to {}", input.display(), output.display());

    let source = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read markdown file {}", input.display()))?;
    let rendered = Renderer::new(opts)
        .render(&source)
        .with_context(|| format!("Failed to render {}", input.display()))?;

    let page_count = rendered.page_count();
    let contents_pages = rendered.contents_pages;
    let toc = rendered.toc.clone();
    let bytes = rendered.write_to(output)?;
    log::info!("wrote {} ({page_count} pages, {bytes} bytes)", output.display());

    Ok(RenderStats {
        output: output.to_path_buf(),
        page_count,
        contents_pages,
        toc,
    })
}
