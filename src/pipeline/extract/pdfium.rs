//! Native pdfium backend: page text as Markdown lines, embedded rasters as figures.
//!
//! pdfium has no layout model, so the Markdown is plain text lines and the
//! post-processor does all of the structural work. It needs no Python and
//! the library is downloaded and cached by `pdfium-auto` on first use.
//!
//! Set `PDFIUM_LIB_PATH` to bind an existing library instead of downloading.

use super::{Extraction, ExtractionBackend};
use crate::error::Paper2MdError;
use image::imageops::FilterType;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BACKEND: &str = "pdfium";

/// Bound once per process; pdfium's C library keeps global state.
static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

fn pdfium() -> Result<&'static Pdfium, Paper2MdError> {
    PDFIUM.get_or_try_init(|| {
        pdfium_auto::bind_pdfium_silent().map_err(|e| Paper2MdError::BackendNotInstalled {
            backend: BACKEND.into(),
            hint: format!(
                "{e}\nPDFium is downloaded automatically on first use. Check your \
                 internet connection, or set PDFIUM_LIB_PATH=/path/to/libpdfium."
            ),
        })
    })
}

/// pdfium text and image extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumBackend;

fn failed(detail: impl Into<String>) -> Paper2MdError {
    Paper2MdError::ExtractionFailed {
        backend: BACKEND.into(),
        detail: detail.into(),
    }
}

/// Join per-page text into Markdown: trimmed lines, pages split by a blank line.
fn pages_to_markdown(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| {
            page.replace("\r\n", "\n")
                .replace('\r', "\n")
                .lines()
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Target size for an image scaled by `scale`, never below 1 px.
fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let w = (width as f32 * scale).round().max(1.0) as u32;
    let h = (height as f32 * scale).round().max(1.0) as u32;
    (w, h)
}

fn save_picture(
    image: DynamicImage,
    scale: f32,
    work_dir: &Path,
    index: usize,
) -> Result<PathBuf, image::ImageError> {
    let image = if (scale - 1.0).abs() > f32::EPSILON {
        let (w, h) = scaled_dimensions(image.width(), image.height(), scale);
        image.resize_exact(w, h, FilterType::Lanczos3)
    } else {
        image
    };
    let path = work_dir.join(format!("picture{index}.png"));
    image.save_with_format(&path, image::ImageFormat::Png)?;
    Ok(path)
}

impl ExtractionBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn extract(
        &self,
        pdf: &Path,
        work_dir: &Path,
        images_scale: f32,
    ) -> Result<Extraction, Paper2MdError> {
        let pdfium = pdfium()?;
        let document = pdfium
            .load_pdf_from_file(pdf, None)
            .map_err(|e| failed(format!("cannot open '{}': {:?}", pdf.display(), e)))?;

        let page_count = document.pages().len();
        info!("PDF loaded: {} pages", page_count);

        let mut texts = Vec::with_capacity(page_count as usize);
        let mut images = Vec::new();

        for (page_index, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| failed(format!("page {}: text unavailable: {:?}", page_index + 1, e)))?;
            texts.push(text.all());

            for object in page.objects().iter() {
                let Some(image_object) = object.as_image_object() else {
                    continue;
                };
                let raw = match image_object.get_raw_image() {
                    Ok(raw) => raw,
                    Err(e) => {
                        debug!("page {}: skipping unreadable image: {:?}", page_index + 1, e);
                        continue;
                    }
                };
                match save_picture(raw, images_scale, work_dir, images.len() + 1) {
                    Ok(path) => images.push(path),
                    Err(e) => debug!("page {}: cannot save image: {}", page_index + 1, e),
                }
            }
        }

        let markdown = pages_to_markdown(&texts);
        debug!(
            markdown_bytes = markdown.len(),
            pictures = images.len(),
            "pdfium extraction"
        );
        Ok(Extraction { markdown, images })
    }
}
