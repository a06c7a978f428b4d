//! Docling backend: run a bundled Python helper and read its manifest.
//!
//! The helper (`docling.py`, embedded at compile time) converts the PDF,
//! saves every picture as `pictureN.png` in the work directory and writes
//! `manifest.json` with the Markdown and the picture names. Its exit code
//! distinguishes "docling is not importable" from "conversion failed".

use super::{Extraction, ExtractionBackend};
use crate::error::Paper2MdError;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

const HELPER_SCRIPT: &str = include_str!("docling.py");
const MANIFEST: &str = "manifest.json";

const EXIT_NOT_INSTALLED: i32 = 3;

const BACKEND: &str = "docling";

/// Docling through a Python interpreter.
#[derive(Debug, Clone)]
pub struct DoclingBackend {
    python: String,
}

impl DoclingBackend {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    markdown: String,
    #[serde(default)]
    images: Vec<String>,
}

/// Parse the helper's manifest, resolving image names against `work_dir`.
fn parse_manifest(json: &str, work_dir: &Path) -> Result<Extraction, Paper2MdError> {
    let manifest: Manifest =
        serde_json::from_str(json).map_err(|e| Paper2MdError::ExtractionFailed {
            backend: BACKEND.into(),
            detail: format!("invalid manifest: {}", e),
        })?;
    Ok(Extraction {
        markdown: manifest.markdown,
        images: manifest
            .images
            .iter()
            .map(|name| work_dir.join(name))
            .collect(),
    })
}

/// Last few non-empty stderr lines; Python tracebacks end with the useful part.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "helper exited without a message".to_string()
    } else {
        tail
    }
}

impl ExtractionBackend for DoclingBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn extract(
        &self,
        pdf: &Path,
        work_dir: &Path,
        images_scale: f32,
    ) -> Result<Extraction, Paper2MdError> {
        info!("Extracting {} with docling", pdf.display());

        let output = Command::new(&self.python)
            .arg("-c")
            .arg(HELPER_SCRIPT)
            .arg(pdf)
            .arg(work_dir)
            .arg(images_scale.to_string())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    Paper2MdError::BackendNotInstalled {
                        backend: BACKEND.into(),
                        hint: format!(
                            "Python interpreter '{}' not found. Install Python 3 or pass --python.",
                            self.python
                        ),
                    }
                } else {
                    Paper2MdError::ExtractionFailed {
                        backend: BACKEND.into(),
                        detail: format!("could not start '{}': {}", self.python, e),
                    }
                }
            })?;

        match output.status.code() {
            Some(0) => {}
            Some(EXIT_NOT_INSTALLED) => {
                return Err(Paper2MdError::BackendNotInstalled {
                    backend: BACKEND.into(),
                    hint: "Install with: pip install docling (downloads ~500 MB of models on \
                           first use), or use --backend pdfium."
                        .into(),
                });
            }
            _ => {
                return Err(Paper2MdError::ExtractionFailed {
                    backend: BACKEND.into(),
                    detail: format!("{}: {}", output.status, stderr_tail(&output.stderr)),
                });
            }
        }

        let manifest_path = work_dir.join(MANIFEST);
        let json = std::fs::read_to_string(&manifest_path).map_err(|e| {
            Paper2MdError::ExtractionFailed {
                backend: BACKEND.into(),
                detail: format!("missing {}: {}", manifest_path.display(), e),
            }
        })?;
        let extraction = parse_manifest(&json, work_dir)?;
        debug!(
            markdown_bytes = extraction.markdown.len(),
            pictures = extraction.images.len(),
            "docling extraction"
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn manifest_parsing() {
        let json = r##"{"markdown": "# T\n\nBody", "images": ["picture1.png", "picture2.png"]}"##;
        let ex = parse_manifest(json, Path::new("/work")).unwrap();
        assert_eq!(ex.markdown, "# T\n\nBody");
        assert_eq!(
            ex.images,
            vec![
                PathBuf::from("/work/picture1.png"),
                PathBuf::from("/work/picture2.png")
            ]
        );
    }

    #[test]
    fn manifest_without_images() {
        let ex = parse_manifest(r#"{"markdown": "x"}"#, Path::new("/w")).unwrap();
        assert!(ex.images.is_empty());
    }

    #[test]
    fn bad_manifest_is_extraction_failure() {
        let err = parse_manifest("{", Path::new("/w")).unwrap_err();
        assert!(matches!(err, Paper2MdError::ExtractionFailed { .. }));
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let stderr = b"a\nb\n\nc\nd\ne\nf\ng\n";
        assert_eq!(stderr_tail(stderr), "c\nd\ne\nf\ng");
        assert_eq!(stderr_tail(b""), "helper exited without a message");
    }

    #[test]
    fn missing_interpreter_is_not_installed() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = DoclingBackend::new("paper2md-no-such-python");
        let err = backend
            .extract(Path::new("x.pdf"), dir.path(), 2.0)
            .unwrap_err();
        assert!(matches!(err, Paper2MdError::BackendNotInstalled { .. }));
    }

    #[test]
    fn helper_script_is_embedded() {
        assert!(HELPER_SCRIPT.contains("manifest.json"));
        assert!(HELPER_SCRIPT.contains("EXIT_NOT_INSTALLED = 3"));
    }
}
