//! Figure selection: drop logos and badges, renumber the rest.
//!
//! Extraction backends return every picture on every page, including
//! publisher logos, ORCID badges and tiny icons. Those are rejected by size.
//! Survivors are copied into the document's `img/` directory as
//! `figure1.png, figure2.png, …` in document order, which is the naming the
//! figure embedder matches against captions.

use crate::error::{FigureError, Paper2MdError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions treated as figure images.
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Minimum dimensions for an image to count as a figure.
///
/// An image failing **any** threshold is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFilter {
    pub min_width: u32,
    pub min_height: u32,
    pub min_area: u64,
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self {
            min_width: 200,
            min_height: 150,
            min_area: 40_000,
        }
    }
}

impl ImageFilter {
    /// Whether an image of `width × height` pixels is kept.
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        width >= self.min_width
            && height >= self.min_height
            && u64::from(width) * u64::from(height) >= self.min_area
    }
}

/// Result of [`select_figures`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FigureSelection {
    /// Written figure files, in document order.
    pub figures: Vec<PathBuf>,
    /// Images rejected by the size filter.
    pub dropped: usize,
    /// Non-fatal problems met along the way.
    pub errors: Vec<FigureError>,
}

impl FigureSelection {
    /// File names of the written figures, as the post-processor expects them.
    pub fn file_names(&self) -> Vec<String> {
        self.figures
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Filter `candidates` and copy survivors into `img_dir` as `figureN.<ext>`.
///
/// Candidates are taken in the given (document) order. An image whose size
/// cannot be read is kept, since the filter cannot judge it, and recorded
/// in [`FigureSelection::errors`].
pub fn select_figures(
    candidates: &[PathBuf],
    filter: &ImageFilter,
    img_dir: &Path,
) -> Result<FigureSelection, Paper2MdError> {
    let mut selection = FigureSelection::default();
    if candidates.is_empty() {
        return Ok(selection);
    }

    std::fs::create_dir_all(img_dir).map_err(|e| Paper2MdError::OutputWriteFailed {
        path: img_dir.to_path_buf(),
        source: e,
    })?;

    for candidate in candidates {
        match image::image_dimensions(candidate) {
            Ok((w, h)) if !filter.accepts(w, h) => {
                debug!("Dropping {} ({}x{} px)", candidate.display(), w, h);
                selection.dropped += 1;
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Cannot read size of {}: {}", candidate.display(), e);
                selection.errors.push(FigureError::Unreadable {
                    path: candidate.clone(),
                    detail: e.to_string(),
                });
            }
        }

        let ext = candidate
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or_else(|| "png".to_string());
        let target = img_dir.join(format!("figure{}.{}", selection.figures.len() + 1, ext));

        match std::fs::copy(candidate, &target) {
            Ok(_) => selection.figures.push(target),
            Err(e) => {
                warn!("Cannot copy {}: {}", candidate.display(), e);
                selection.errors.push(FigureError::CopyFailed {
                    path: candidate.clone(),
                    detail: e.to_string(),
                });
            }
        }
    }

    debug!(
        kept = selection.figures.len(),
        dropped = selection.dropped,
        "figure selection"
    );
    Ok(selection)
}

/// Image file names (`png`, `jpg`, `jpeg`) directly inside `dir`, sorted.
///
/// A missing directory yields an empty list.
pub fn list_image_files(dir: &Path) -> Result<Vec<String>, Paper2MdError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| Paper2MdError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(w, h, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn filter_thresholds() {
        let f = ImageFilter::default();
        assert!(f.accepts(400, 300));
        assert!(!f.accepts(199, 500), "too narrow");
        assert!(!f.accepts(500, 149), "too short");
        assert!(!f.accepts(200, 150), "area 30k below 40k");
        assert!(f.accepts(200, 200));
    }

    #[test]
    fn selects_and_renumbers() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let img_dir = out.path().join("img");

        let candidates = vec![
            write_png(src.path(), "picture1.png", 64, 64),
            write_png(src.path(), "picture2.png", 400, 300),
            write_png(src.path(), "picture3.png", 120, 40),
            write_png(src.path(), "picture4.png", 640, 480),
        ];

        let sel = select_figures(&candidates, &ImageFilter::default(), &img_dir).unwrap();
        assert_eq!(sel.dropped, 2);
        assert!(sel.errors.is_empty());
        assert_eq!(sel.file_names(), vec!["figure1.png", "figure2.png"]);
        let (w, _) = image::image_dimensions(img_dir.join("figure2.png")).unwrap();
        assert_eq!(w, 640);
    }

    #[test]
    fn unreadable_image_kept_with_error() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let bogus = src.path().join("picture1.png");
        std::fs::write(&bogus, b"not a png").unwrap();

        let sel = select_figures(&[bogus], &ImageFilter::default(), out.path()).unwrap();
        assert_eq!(sel.file_names(), vec!["figure1.png"]);
        assert!(matches!(sel.errors[0], FigureError::Unreadable { .. }));
    }

    #[test]
    fn missing_source_is_copy_error() {
        let out = TempDir::new().unwrap();
        let missing = out.path().join("gone.jpg");
        let sel = select_figures(&[missing], &ImageFilter::default(), out.path()).unwrap();
        assert!(sel.figures.is_empty());
        assert!(sel
            .errors
            .iter()
            .any(|e| matches!(e, FigureError::CopyFailed { .. })));
    }

    #[test]
    fn empty_candidates_create_nothing() {
        let out = TempDir::new().unwrap();
        let img_dir = out.path().join("img");
        let sel = select_figures(&[], &ImageFilter::default(), &img_dir).unwrap();
        assert!(sel.figures.is_empty());
        assert!(!img_dir.exists());
    }

    #[test]
    fn lists_images_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["figure2.png", "figure1.JPG", "notes.txt", "figure3.jpeg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();
        let names = list_image_files(dir.path()).unwrap();
        assert_eq!(names, vec!["figure1.JPG", "figure2.png", "figure3.jpeg"]);
    }

    #[test]
    fn missing_dir_lists_nothing() {
        assert!(list_image_files(Path::new("/no/such/img")).unwrap().is_empty());
    }
}
