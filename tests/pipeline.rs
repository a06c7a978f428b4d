//! Integration tests for the public API that need no PDF tooling.
//!
//! Extraction is replaced by an in-memory backend, so everything from
//! figure selection to the written files runs for real.

use image::{Rgb, RgbImage};
use paper2md::{
    convert_batch, convert_with_backend, discover_pdfs, postprocess_file, process_markdown,
    process_markdown_with, AgentOutcome, BatchOptions, ConversionConfig, ConversionProgressCallback,
    Extraction, ExtractionBackend, Paper2MdError, PostprocessOptions,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PAPER: &str = "# Hermes: A Multi-Tiered I/O Buffering System

Abstract -Modern high-performance computing (HPC) systems add tiers of
storage between memory and the parallel ﬁle system [1].

Index Terms -Layered I/O, Hierarchical Buffering

## I. INTRODUCTION

Deep memory hierarchies [2]–[4] help, but data placement is hard [5].

2.1 Design Goals. Hermes must be transparent to applications.

2.1.1 Placement

The data placement engine (DPE) decides where buffers go (Fig. 1).

Figure 1: Hermes architecture overview.

- 1) Policies:
The DPE supports several policies.

A. Appendix

Lettered text stays as it is.

## References

[1] J. Lofstead et al. Adaptable I/O. 2008.
[2] A. Kougkas et al. Hermes. 2018.
[3] B. Other. Tiers. 2019.
[4] C. Third. Buffers. 2020.
[5] D. Fourth. Placement. 2021.
";

struct InMemory {
    markdown: &'static str,
    /// (width, height) of each picture to produce.
    pictures: Vec<(u32, u32)>,
}

impl ExtractionBackend for InMemory {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn extract(&self, _pdf: &Path, work_dir: &Path, _scale: f32) -> Result<Extraction, Paper2MdError> {
        let images = self
            .pictures
            .iter()
            .enumerate()
            .map(|(i, (w, h))| {
                let path = work_dir.join(format!("picture{}.png", i + 1));
                RgbImage::from_pixel(*w, *h, Rgb([200, 100, 50]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect();
        Ok(Extraction {
            markdown: self.markdown.to_string(),
            images,
        })
    }
}

/// Route the crate's `tracing` output through the test harness (`RUST_LOG=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.5\n%fake\n").unwrap();
    path
}

// ── Post-processing ──────────────────────────────────────────────────────────

#[test]
fn full_paper_structure() {
    init_tracing();
    let md = process_markdown(PAPER, &["figure1.png"]);

    assert!(md.contains("## Abstract\n\nModern high-performance"));
    assert!(md.contains("## Index Terms\n\nLayered I/O"));
    assert!(md.contains("### 2.1 Design Goals\n\nHermes must be transparent"));
    assert!(md.contains("#### 2.1.1 Placement"));
    assert!(md.contains("### 1) Policies\n\nThe DPE supports"));
    assert!(md.contains("A. Appendix\n"), "lettered sections are left alone");
    assert!(!md.contains("# A. Appendix"));

    assert!(md.contains("![Figure 1](./img/figure1.png)\n\nFigure 1: Hermes architecture"));
    assert_eq!(md.matches("![Figure 1]").count(), 1);

    assert!(md.contains("file system [[1]](#ref-1)"), "ligature fixed and cited");
    assert!(md.contains("[[2]](#ref-2), [[3]](#ref-3), [[4]](#ref-4) help"));
    for n in 1..=5 {
        assert!(md.contains(&format!(r#"<a id="ref-{n}"></a>[{n}]"#)));
    }
    // Reference entries themselves are not turned into links.
    assert!(!md.contains("[[1]](#ref-1) J. Lofstead"));
}

#[test]
fn pipeline_is_idempotent() {
    let once = process_markdown(PAPER, &["figure1.png", "figure2.png"]);
    let twice = process_markdown(&once, &["figure1.png", "figure2.png"]);
    assert_eq!(once, twice);
}

#[test]
fn citations_link_without_bibliography() {
    let md = process_markdown::<&str>("Caching [7] and `[2]` matter.", &[]);
    assert_eq!(md, "Caching [[7]](#ref-7) and `[2]` matter.");
}

#[test]
fn no_images_means_no_embedding() {
    let md = process_markdown::<&str>(PAPER, &[]);
    assert!(!md.contains("!["));
}

#[test]
fn custom_image_base_and_dehyphenation() {
    let options = PostprocessOptions {
        image_base: "assets/".into(),
        dehyphenate: true,
        ..PostprocessOptions::default()
    };
    let md = process_markdown_with(
        "The buf-\nfering layer.\n\nFig. 2. Layers.",
        &["fig2.png"],
        &options,
    );
    assert!(md.contains("The buffering layer."));
    assert!(md.contains("![Figure 2](assets/fig2.png)"));
}

// ── Single conversion ────────────────────────────────────────────────────────

#[derive(Default)]
struct Counter {
    stages: AtomicUsize,
    completed: AtomicUsize,
}

impl ConversionProgressCallback for Counter {
    fn on_stage_start(&self, _stage: paper2md::Stage) {
        self.stages.fetch_add(1, Ordering::SeqCst);
    }

    fn on_conversion_complete(&self, _output: &Path) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn convert_writes_expected_layout() {
    init_tracing();
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let pdf = write_pdf(src.path(), "hermes.pdf");
    let counter = Arc::new(Counter::default());
    let config = ConversionConfig::builder()
        .keep_raw(true)
        .progress_callback(counter.clone())
        .build()
        .unwrap();
    let backend = Arc::new(InMemory {
        markdown: PAPER,
        pictures: vec![(48, 48), (800, 600), (300, 40), (640, 480)],
    });

    let output = convert_with_backend(pdf.to_str().unwrap(), out.path(), &config, backend)
        .await
        .unwrap();

    let doc = out.path().join("hermes");
    assert_eq!(output.markdown_path, doc.join("hermes.md"));
    assert_eq!(output.raw_path.as_deref(), Some(doc.join("hermes_raw.md").as_path()));
    assert_eq!(output.figures, vec!["figure1.png", "figure2.png"]);
    assert_eq!(output.unembedded_figures, vec!["figure2.png"]);
    assert_eq!(output.stats.images_extracted, 4);
    assert_eq!(output.stats.images_dropped, 2);
    assert!(output.figure_errors.is_empty());
    assert_eq!(output.agent, AgentOutcome::Disabled);

    let md = std::fs::read_to_string(&output.markdown_path).unwrap();
    assert!(md.contains("![Figure 1](./img/figure1.png)"));
    assert_eq!(
        image::image_dimensions(doc.join("img/figure1.png")).unwrap(),
        (800, 600)
    );
    assert_eq!(std::fs::read_to_string(doc.join("hermes_raw.md")).unwrap(), PAPER);

    assert_eq!(counter.completed.load(Ordering::SeqCst), 1);
    assert!(counter.stages.load(Ordering::SeqCst) >= 4);

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["agent"]["status"], "disabled");
}

#[tokio::test]
async fn invalid_input_is_rejected_before_extraction() {
    let out = TempDir::new().unwrap();
    let backend = Arc::new(InMemory {
        markdown: PAPER,
        pictures: vec![],
    });
    let err = convert_with_backend("ftp://host/x.pdf", out.path(), &ConversionConfig::default(), backend)
        .await
        .unwrap_err();
    assert!(matches!(err, Paper2MdError::InvalidInput { .. }));
}

// ── postprocess_file ─────────────────────────────────────────────────────────

#[tokio::test]
async fn postprocess_file_uses_sibling_img_dir() {
    let dir = TempDir::new().unwrap();
    let md = dir.path().join("hermes.md");
    std::fs::write(&md, PAPER).unwrap();
    let img = dir.path().join("img");
    std::fs::create_dir(&img).unwrap();
    std::fs::write(img.join("figure1.png"), b"png").unwrap();
    std::fs::write(img.join("README.txt"), b"not an image").unwrap();

    let report = postprocess_file(&md, None, None, &PostprocessOptions::default())
        .await
        .unwrap();
    assert_eq!(report.images_available, 1);
    assert!(report.unembedded_figures.is_empty());
    assert!(report.output_bytes > 0);

    let processed = std::fs::read_to_string(&md).unwrap();
    assert!(processed.contains("![Figure 1](./img/figure1.png)"));

    // Running again changes nothing.
    postprocess_file(&md, None, None, &PostprocessOptions::default())
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&md).unwrap(), processed);
}

#[tokio::test]
async fn postprocess_file_with_explicit_dirs() {
    let dir = TempDir::new().unwrap();
    let md = dir.path().join("in.md");
    std::fs::write(&md, "Fig. 3: Results.\n").unwrap();
    let figs = dir.path().join("figs");
    std::fs::create_dir(&figs).unwrap();
    std::fs::write(figs.join("figure3.jpg"), b"jpg").unwrap();
    let target = dir.path().join("out.md");

    let report = postprocess_file(&md, Some(&figs), Some(&target), &PostprocessOptions::default())
        .await
        .unwrap();
    assert_eq!(report.output_path, target);
    assert_eq!(std::fs::read_to_string(&md).unwrap(), "Fig. 3: Results.\n");
    assert!(std::fs::read_to_string(&target)
        .unwrap()
        .contains("![Figure 3](./img/figure3.jpg)"));
}

// ── Batch ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_discovery_selection_and_summary() {
    init_tracing();
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdf(src.path(), "a.pdf");
    std::fs::write(src.path().join("b.pdf"), b"<html>not a pdf</html>").unwrap();
    write_pdf(src.path(), "c.PDF");
    std::fs::write(src.path().join("notes.md"), b"# notes").unwrap();

    let pdfs = discover_pdfs(src.path()).unwrap();
    assert_eq!(pdfs.len(), 3);

    let options = BatchOptions {
        skip: 1,
        limit: Some(1),
        concurrency: 1,
    };
    let selected = options.select(&pdfs);
    assert_eq!(selected, vec![src.path().join("b.pdf")]);

    let summary = convert_batch(&selected, out.path(), &ConversionConfig::default(), &options)
        .await
        .unwrap();
    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.failed(), 1);
    assert!(summary.items[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("not a valid PDF")));

    let text = std::fs::read_to_string(out.path().join("batch_summary.log")).unwrap();
    assert!(text.contains("BATCH CONVERSION SUMMARY"));
    assert!(text.contains("[FAILED]"));
    assert!(text.contains("b.pdf"));
    assert!(out.path().join("logs/b.log").is_file());
}
